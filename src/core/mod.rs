//! Core primitives shared by the simulation.
//!
//! Seeded randomness, state hashing and the timer service. Nothing in here
//! knows about characters or items.

pub mod rng;
pub mod hash;
pub mod timer;

// Re-export core types
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash, StateHasher};
pub use timer::{Fired, TimerHandle, TimerService};
