//! Protocol Messages
//!
//! Wire format between a client replica and the session.
//! All messages are serialized as JSON for debugging ease,
//! with optional binary (bincode) for production.

use serde::{Serialize, Deserialize};

use crate::game::events::GameEvent;
use crate::game::replication::ReplicationUpdate;
use crate::game::rpc::ServerRpc;
use crate::game::types::{ActorId, ControllerId};
use crate::game::world::MovementUpdate;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Validated request for the authority.
    Request {
        /// The request
        request: ServerRpc,
    },

    /// Movement-layer state for the pawn.
    Movement {
        /// New kinematic state
        update: MovementUpdate,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back
        timestamp: u64,
    },

    /// Player is leaving the session.
    Leave,
}

impl From<ServerRpc> for ClientMessage {
    fn from(request: ServerRpc) -> Self {
        ClientMessage::Request { request }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join accepted.
    Welcome {
        /// Assigned controller
        controller: ControllerId,
        /// First pawn
        pawn: ActorId,
        /// Session tick at join
        tick: u64,
    },

    /// Scoped world state after a tick.
    Replicate {
        /// Snapshot for this observer
        update: ReplicationUpdate,
    },

    /// Event in this observer's scope.
    Event {
        /// The event
        event: GameEvent,
    },

    /// Pong response.
    Pong {
        /// Echoed client timestamp
        timestamp: u64,
        /// Session tick
        server_tick: u64,
    },

    /// Error message.
    Error(ServerError),

    /// Session is closing.
    Shutdown {
        /// Why
        reason: String,
    },
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
///
/// Gameplay rejections never produce one; they are dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Message could not be decoded.
    InvalidMessage,
    /// Session is full.
    SessionFull,
    /// Session has closed.
    SessionClosed,
    /// Sender has not joined.
    NotJoined,
    /// Internal error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use crate::game::events::{CameraShakeKind, EventPriority, EventScope, GameEventData};
    use crate::game::probe::HitResult;

    #[test]
    fn test_client_request_json_roundtrip() {
        let msg = ClientMessage::from(ServerRpc::Attack {
            client_hit: HitResult::none(),
            aim_point: Some(Vec3::new(1.0, 2.0, 3.0)),
        });

        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"request\""));
        assert!(json.contains("\"rpc\":\"attack\""));
        assert_eq!(ClientMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_unit_request_json_shape() {
        let json = ClientMessage::from(ServerRpc::Interact).to_json().unwrap();
        assert_eq!(json, r#"{"type":"request","request":{"rpc":"interact"}}"#);
        assert_eq!(ClientMessage::Leave.to_json().unwrap(), r#"{"type":"leave"}"#);
    }

    #[test]
    fn test_server_event_json_roundtrip() {
        let msg = ServerMessage::Event {
            event: GameEvent::new(
                12,
                EventPriority::Presentation,
                EventScope::Owner(ControllerId(3)),
                GameEventData::CameraShake { shake: CameraShakeKind::Hit },
            ),
        };

        let json = msg.to_json().unwrap();
        assert!(json.contains("camera_shake"));
        match ServerMessage::from_json(&json).unwrap() {
            ServerMessage::Event { event } => {
                assert_eq!(event.tick, 12);
                assert_eq!(event.data, GameEventData::CameraShake { shake: CameraShakeKind::Hit });
            }
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[test]
    fn test_binary_serialization_movement() {
        // Tagged enums (#[serde(tag = "type")]) do not decode under bincode,
        // so binary is exercised on flat payloads
        let update = MovementUpdate {
            position: Vec3::new(10.0, -4.0, 90.0),
            velocity: Vec3::new(600.0, 0.0, 0.0),
            yaw: 45.0,
            is_falling: false,
        };

        let bytes = bincode::serialize(&update).unwrap();
        let parsed: MovementUpdate = bincode::deserialize(&bytes).unwrap();
        assert_eq!(parsed, update);
    }

    #[test]
    fn test_error_codes() {
        let msg = ServerMessage::Error(ServerError {
            code: ErrorCode::SessionFull,
            message: "Session is full".to_string(),
        });
        let json = msg.to_json().unwrap();
        assert!(json.contains("session_full"));
    }
}
