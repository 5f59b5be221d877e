//! Game Logic Module
//!
//! All gameplay simulation code. Deterministic for a given seed and request
//! stream: every collection is a BTreeMap and every random draw comes from
//! the world's seeded RNG.
//!
//! ## Module Structure
//!
//! - `types`, `error`, `config`: shared vocabulary, failure kinds and tuning
//! - `stats`, `inventory`, `pickup`, `weapon`, `container`, `character`: components
//! - `probe`: line probes over level geometry and actor spheres
//! - `world`: the authoritative actor store
//! - `interact`, `controller`, `respawn`: character behaviour
//! - `rpc`: validated client requests
//! - `tick`: authoritative simulation loop
//! - `events`: one-way notifications for presentation
//! - `replication`, `replica`: per-observer snapshots and the client copy

pub mod types;
pub mod error;
pub mod config;
pub mod stats;
pub mod probe;
pub mod inventory;
pub mod pickup;
pub mod weapon;
pub mod container;
pub mod character;
pub mod world;
pub mod interact;
pub mod controller;
pub mod respawn;
pub mod rpc;
pub mod tick;
pub mod events;
pub mod replication;
pub mod replica;

// Re-export key types
pub use types::{ActorId, AmmoType, Attachment, ControllerId, NetRole, PickupType};
pub use error::{GameError, GameResult};
pub use config::GameConfig;
pub use stats::StatTracker;
pub use probe::{HitResult, Level, LineProbe};
pub use world::World;
pub use rpc::{RpcEnvelope, ServerRpc};
pub use tick::{tick, TickResult};
pub use events::GameEvent;
pub use replication::ReplicationUpdate;
pub use replica::{ClientReplica, RepNotify};
