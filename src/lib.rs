//! # Survival Server
//!
//! Server-authoritative gameplay core for a multiplayer survival game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SURVIVAL SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── rng.rs      - Seeded Xorshift128+ PRNG                  │
//! │  ├── hash.rs     - State hashing for divergence checks       │
//! │  └── timer.rs    - Delayed and repeating callbacks           │
//! │                                                              │
//! │  game/           - Gameplay (authoritative)                  │
//! │  ├── stats.rs    - Health, hunger, thirst, stamina           │
//! │  ├── probe.rs    - Line probes against the scene             │
//! │  ├── inventory.rs- Item slots, drops and transfers           │
//! │  ├── weapon.rs   - Magazine, reload, shot validation         │
//! │  ├── controller.rs - Character actions and death             │
//! │  ├── respawn.rs  - Spawn points and respawn timers           │
//! │  ├── rpc.rs      - Validated client requests                 │
//! │  ├── tick.rs     - Authoritative simulation loop             │
//! │  └── replica.rs  - Observer copy and client intents          │
//! │                                                              │
//! │  network/        - Sessions (non-deterministic)              │
//! │  ├── protocol.rs - Message types                             │
//! │  └── session.rs  - Session management and fan-out            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority
//!
//! Only the `World` mutates gameplay state. Observers hold a
//! `ClientReplica`, apply replication updates to it, and turn player intent
//! into `ServerRpc`s that the authority validates before running.
//!
//! Given identical requests and seed, the world produces identical state
//! hashes: collections are `BTreeMap`s and all randomness comes from the
//! seeded RNG.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use core::timer::{TimerHandle, TimerService};
pub use game::{
    ActorId, ClientReplica, ControllerId, GameConfig, GameError, GameEvent, GameResult, Level,
    ReplicationUpdate, ServerRpc, StatTracker, World,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
