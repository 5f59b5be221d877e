//! Network Layer
//!
//! Session plumbing between clients and the authoritative world.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod protocol;
pub mod session;

pub use protocol::{ClientMessage, ServerMessage, ServerError, ErrorCode};
pub use session::{GameSession, SessionConfig, SessionError, SessionId, SessionState, SessionManager};
