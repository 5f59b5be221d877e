//! Gameplay Errors
//!
//! Every failure a client can provoke maps onto one of four kinds. None of
//! them is fatal: the request dispatcher logs the error at debug level and
//! drops the request, leaving state untouched.

use crate::game::types::{ActorId, AmmoType, ControllerId};

/// Why an operation left state untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    /// Target missing, stale or of the wrong kind.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Caller does not own what it referenced, or is not the authority.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Nothing to spend: empty magazine, no reserve ammo, stat already full.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Container already opened by another character.
    #[error("container {container} is already opened by {opener}")]
    OwnershipConflict {
        /// Container that was requested
        container: ActorId,
        /// Character that holds it open
        opener: ActorId,
    },
}

impl GameError {
    /// Actor id did not resolve.
    pub fn missing(id: ActorId) -> Self {
        GameError::InvalidRequest(format!("{id} does not exist"))
    }

    /// Controller has no pawn to act through.
    pub fn no_pawn(controller: ControllerId) -> Self {
        GameError::InvalidRequest(format!("{controller} has no living pawn"))
    }

    /// Mutation attempted off the authority.
    pub fn not_authority() -> Self {
        GameError::PermissionDenied("not the authority".to_string())
    }

    /// Character does not hold the item.
    pub fn not_owner(character: ActorId, item: ActorId) -> Self {
        GameError::PermissionDenied(format!("{character} does not hold {item}"))
    }

    /// No reserve ammunition.
    pub fn no_ammo(ammo_type: AmmoType) -> Self {
        GameError::ResourceExhausted(format!("no {} ammo", ammo_type.name()))
    }
}

/// Result alias for gameplay operations.
pub type GameResult<T> = Result<T, GameError>;
