//! Game Session Management
//!
//! Binds connected clients to one authoritative `World`. Inbound messages
//! queue per controller and are drained in controller order at the start of
//! each tick; after the tick every controller receives its own scoped
//! replication update plus the events addressed to it.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::core::rng::derive_session_seed;
use crate::game::config::GameConfig;
use crate::game::error::GameError;
use crate::game::probe::Level;
use crate::game::rpc::{RpcEnvelope, ServerRpc};
use crate::game::tick::{tick, TickResult};
use crate::game::types::ControllerId;
use crate::game::world::World;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerError, ServerMessage};

/// Unique session identifier.
pub type SessionId = [u8; 16];

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting players and ticking.
    Running,
    /// Session closed.
    Closed,
}

/// Configuration for a game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Simulation rate (Hz).
    pub tick_rate: u32,
    /// Maximum connected players.
    pub max_players: usize,
    /// Outbound queue depth per player.
    pub channel_capacity: usize,
    /// Fixed world seed; derived from the session id when unset.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: crate::TICK_RATE,
            max_players: 16,
            channel_capacity: 256,
            seed: None,
        }
    }
}

impl SessionConfig {
    /// Simulation time covered by one tick.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate.max(1)))
    }
}

/// A client connected to a session.
#[derive(Debug)]
pub struct SessionClient {
    /// Controller assigned on join.
    pub controller: ControllerId,
    /// Messages waiting for the next tick, in arrival order.
    inbox: VecDeque<ClientMessage>,
    /// Message channel to this client.
    pub sender: mpsc::Sender<ServerMessage>,
}

impl SessionClient {
    /// Queue a message for this client, dropping it if the queue is full.
    fn send(&self, message: ServerMessage) {
        match self.sender.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(controller = %self.controller, "Outbound queue full, message dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(controller = %self.controller, "Outbound channel closed");
            }
        }
    }
}

/// A game session.
pub struct GameSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Current state.
    pub state: SessionState,
    /// Session configuration.
    pub config: SessionConfig,
    /// Authoritative world.
    world: World,
    /// Connected clients.
    clients: BTreeMap<ControllerId, SessionClient>,
    /// When session was created.
    created_at: Instant,
}

impl GameSession {
    /// Create a new session over `level`.
    pub fn new(id: SessionId, config: SessionConfig, game: GameConfig, level: Level) -> Self {
        let seed = config.seed.unwrap_or_else(|| derive_session_seed(&id));
        debug!(session = %hex::encode(&id[..4]), seed, "Session created");

        Self {
            id,
            state: SessionState::Running,
            config,
            world: World::new(game, level, seed),
            clients: BTreeMap::new(),
            created_at: Instant::now(),
        }
    }

    /// Add a client: assigns a controller and spawns its first pawn.
    pub fn join(&mut self, sender: mpsc::Sender<ServerMessage>) -> Result<ControllerId, SessionError> {
        if self.state == SessionState::Closed {
            return Err(SessionError::SessionClosed);
        }

        if self.clients.len() >= self.config.max_players {
            let _ = sender.try_send(ServerMessage::Error(ServerError {
                code: ErrorCode::SessionFull,
                message: SessionError::SessionFull.to_string(),
            }));
            return Err(SessionError::SessionFull);
        }

        let controller = self.world.add_controller();
        let pawn = match self.world.post_login(controller) {
            Ok(pawn) => pawn,
            Err(e) => {
                self.world.controllers.remove(&controller);
                return Err(e.into());
            }
        };

        let client = SessionClient {
            controller,
            inbox: VecDeque::new(),
            sender,
        };
        client.send(ServerMessage::Welcome {
            controller,
            pawn,
            tick: self.world.tick,
        });
        self.clients.insert(controller, client);

        info!(session = %hex::encode(&self.id[..4]), %controller, %pawn, "Player joined");
        Ok(controller)
    }

    /// Remove a client. Its pawn dies and no respawn follows.
    pub fn leave(&mut self, controller: ControllerId) -> Result<(), SessionError> {
        if self.clients.remove(&controller).is_none() {
            return Err(SessionError::PlayerNotFound);
        }
        self.world.logout(controller)?;
        info!(session = %hex::encode(&self.id[..4]), %controller, "Player left");
        Ok(())
    }

    /// Queue a message for the next tick.
    pub fn enqueue(&mut self, controller: ControllerId, message: ClientMessage) -> Result<(), SessionError> {
        if self.state == SessionState::Closed {
            return Err(SessionError::SessionClosed);
        }
        let client = self.clients.get_mut(&controller).ok_or(SessionError::PlayerNotFound)?;
        client.inbox.push_back(message);
        Ok(())
    }

    /// Run a single game tick.
    ///
    /// Requests and movement from one sender run inside the tick in the
    /// order they were enqueued. Pings are answered while draining, and
    /// leaves take effect after the tick.
    pub fn run_tick(&mut self) -> Option<TickResult> {
        if self.state != SessionState::Running {
            return None;
        }

        let mut requests = Vec::new();
        let mut leaving = Vec::new();
        for (controller, client) in self.clients.iter_mut() {
            while let Some(message) = client.inbox.pop_front() {
                match message {
                    ClientMessage::Request { request } => {
                        requests.push(RpcEnvelope { caller: *controller, rpc: request });
                    }
                    ClientMessage::Movement { update } => {
                        requests.push(RpcEnvelope { caller: *controller, rpc: ServerRpc::Move { update } });
                    }
                    ClientMessage::Ping { timestamp } => {
                        client.send(ServerMessage::Pong {
                            timestamp,
                            server_tick: self.world.tick,
                        });
                    }
                    ClientMessage::Leave => {
                        leaving.push(*controller);
                        client.inbox.clear();
                    }
                }
            }
        }

        let result = tick(&mut self.world, &requests, self.config.frame_duration());

        for controller in leaving {
            if let Err(e) = self.leave(controller) {
                debug!(%controller, error = %e, "Leave failed");
            }
        }

        for (controller, client) in &self.clients {
            client.send(ServerMessage::Replicate {
                update: self.world.replicate_for(*controller),
            });
            for event in result.events.iter().filter(|e| e.scope.includes(*controller)) {
                client.send(ServerMessage::Event { event: event.clone() });
            }
        }

        Some(result)
    }

    /// Close the session and notify every client.
    pub fn close(&mut self, reason: &str) {
        if self.state == SessionState::Closed {
            return;
        }
        for client in self.clients.values() {
            client.send(ServerMessage::Shutdown { reason: reason.to_string() });
        }
        let controllers: Vec<ControllerId> = self.clients.keys().copied().collect();
        for controller in controllers {
            let _ = self.leave(controller);
        }
        self.state = SessionState::Closed;
        info!(
            session = %hex::encode(&self.id[..4]),
            uptime = ?self.created_at.elapsed(),
            "Session closed"
        );
    }

    /// Authoritative world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world, for level scripting between ticks.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Get player count.
    pub fn player_count(&self) -> usize {
        self.clients.len()
    }

    /// Get current tick.
    pub fn current_tick(&self) -> u64 {
        self.world.tick
    }
}

/// Session errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// Session is full.
    #[error("Session is full")]
    SessionFull,
    /// Session has closed.
    #[error("Session is closed")]
    SessionClosed,
    /// Player not found.
    #[error("Player not found")]
    PlayerNotFound,
    /// The world refused the operation.
    #[error(transparent)]
    Game(#[from] GameError),
}

// =============================================================================
// SESSION MANAGER
// =============================================================================

/// Manages all active sessions.
pub struct SessionManager {
    /// Active sessions.
    sessions: RwLock<BTreeMap<SessionId, Arc<RwLock<GameSession>>>>,
}

impl SessionManager {
    /// Create new session manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a new session.
    pub async fn create_session(&self, config: SessionConfig, game: GameConfig, level: Level) -> SessionId {
        let id = uuid::Uuid::new_v4().into_bytes();
        let session = GameSession::new(id, config, game, level);

        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Arc::new(RwLock::new(session)));
        id
    }

    /// Get a session by ID.
    pub async fn get_session(&self, id: &SessionId) -> Option<Arc<RwLock<GameSession>>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// Remove a session.
    pub async fn remove_session(&self, id: &SessionId) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
    }

    /// Get active session count.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Cleanup closed sessions.
    pub async fn cleanup(&self) {
        let mut sessions = self.sessions.write().await;
        let mut to_remove = Vec::new();

        for (id, session) in sessions.iter() {
            let s = session.read().await;
            if s.state == SessionState::Closed {
                to_remove.push(*id);
            }
        }

        for id in to_remove {
            sessions.remove(&id);
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::events::{CameraShakeKind, GameEventData};

    fn create_test_session() -> GameSession {
        let config = SessionConfig { seed: Some(7), ..Default::default() };
        GameSession::new([0; 16], config, GameConfig::default(), Level::flat(0.0))
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(message) = rx.try_recv() {
            out.push(message);
        }
        out
    }

    #[tokio::test]
    async fn test_join_sends_welcome() {
        let mut session = create_test_session();
        let (tx, mut rx) = mpsc::channel(10);

        let controller = session.join(tx).unwrap();
        assert_eq!(session.player_count(), 1);

        match rx.try_recv().unwrap() {
            ServerMessage::Welcome { controller: c, pawn, tick } => {
                assert_eq!(c, controller);
                assert_eq!(tick, 0);
                assert_eq!(session.world().pawn_of(controller), Some(pawn));
            }
            other => panic!("Wrong message type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_session_full() {
        let config = SessionConfig { max_players: 2, ..Default::default() };
        let mut session = GameSession::new([0; 16], config, GameConfig::default(), Level::flat(0.0));

        for _ in 0..2 {
            let (tx, _rx) = mpsc::channel(10);
            session.join(tx).unwrap();
        }

        let (tx, mut rx) = mpsc::channel(10);
        assert!(matches!(session.join(tx), Err(SessionError::SessionFull)));
        assert!(matches!(
            rx.try_recv().unwrap(),
            ServerMessage::Error(ServerError { code: ErrorCode::SessionFull, .. })
        ));
        assert_eq!(session.world().controllers.len(), 2);
    }

    #[tokio::test]
    async fn test_requests_run_on_tick() {
        let mut session = create_test_session();
        let (tx, mut rx) = mpsc::channel(32);
        let controller = session.join(tx).unwrap();
        let pawn = session.world().pawn_of(controller).unwrap();
        drain(&mut rx);

        session
            .enqueue(controller, ServerRpc::Crouch { crouching: true }.into())
            .unwrap();
        assert!(!session.world().characters[&pawn].is_crouching);

        let result = session.run_tick().unwrap();
        assert_eq!(result.applied, 1);
        assert!(session.world().characters[&pawn].is_crouching);

        let update = drain(&mut rx)
            .into_iter()
            .find_map(|m| match m {
                ServerMessage::Replicate { update } => Some(update),
                _ => None,
            })
            .unwrap();
        assert_eq!(update.tick, 1);
        assert!(update.character(pawn).unwrap().is_crouching);
    }

    #[tokio::test]
    async fn test_movement_keeps_sender_order() {
        use crate::game::types::PickupType;
        use crate::game::world::MovementUpdate;
        use glam::Vec3;

        let mut session = create_test_session();
        let (tx, mut rx) = mpsc::channel(32);
        let controller = session.join(tx).unwrap();
        let pawn = session.world().pawn_of(controller).unwrap();
        drain(&mut rx);

        let (at, start) = {
            let world = session.world();
            let character = &world.characters[&pawn];
            let at = character.eye_position(&world.config.combat) + character.view_forward() * 300.0;
            (at, character.position)
        };
        let food = session.world_mut().spawn_pickup(PickupType::Food, None, at);

        // Interact from the spawn point, then walk out of reach
        let away = MovementUpdate {
            position: start + Vec3::Y * 2000.0,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            is_falling: false,
        };
        session.enqueue(controller, ServerRpc::Interact.into()).unwrap();
        session.enqueue(controller, ClientMessage::Movement { update: away }).unwrap();

        let result = session.run_tick().unwrap();
        assert_eq!(result.applied, 2);
        assert!(session.world().does_possess_item(pawn, food));
        assert_eq!(session.world().characters[&pawn].position, away.position);
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let mut session = create_test_session();
        let (tx, mut rx) = mpsc::channel(32);
        let controller = session.join(tx).unwrap();
        drain(&mut rx);

        session.enqueue(controller, ClientMessage::Ping { timestamp: 1234 }).unwrap();
        session.run_tick();

        assert!(drain(&mut rx).iter().any(|m| matches!(
            m,
            ServerMessage::Pong { timestamp: 1234, server_tick: 0 }
        )));
    }

    #[tokio::test]
    async fn test_owner_scoped_events() {
        let mut session = create_test_session();
        let (tx_a, mut rx_a) = mpsc::channel(64);
        let (tx_b, mut rx_b) = mpsc::channel(64);
        let a = session.join(tx_a).unwrap();
        let b = session.join(tx_b).unwrap();
        let pawn_b = session.world().pawn_of(b).unwrap();
        drain(&mut rx_a);
        drain(&mut rx_b);

        session.world_mut().take_damage(pawn_b, 10.0, Some(a)).unwrap();
        session.run_tick();

        let is_hit_shake = |m: &ServerMessage| matches!(
            m,
            ServerMessage::Event { event } if event.data == GameEventData::CameraShake { shake: CameraShakeKind::Hit }
        );
        assert!(drain(&mut rx_b).iter().any(is_hit_shake));
        assert!(!drain(&mut rx_a).iter().any(is_hit_shake));
    }

    #[tokio::test]
    async fn test_leave_kills_pawn() {
        let mut session = create_test_session();
        let (tx, _rx) = mpsc::channel(32);
        let controller = session.join(tx).unwrap();
        let pawn = session.world().pawn_of(controller).unwrap();

        session.enqueue(controller, ClientMessage::Leave).unwrap();
        session.run_tick();

        assert_eq!(session.player_count(), 0);
        assert!(session.world().characters[&pawn].is_dead);
        assert!(!session.world().controllers.contains_key(&controller));
        assert!(matches!(session.leave(controller), Err(SessionError::PlayerNotFound)));
    }

    #[tokio::test]
    async fn test_closed_session_rejects() {
        let mut session = create_test_session();
        let (tx, mut rx) = mpsc::channel(32);
        let controller = session.join(tx).unwrap();
        drain(&mut rx);

        session.close("maintenance");
        assert!(drain(&mut rx).iter().any(|m| matches!(m, ServerMessage::Shutdown { .. })));
        assert!(session.run_tick().is_none());
        assert!(matches!(
            session.enqueue(controller, ClientMessage::Leave),
            Err(SessionError::SessionClosed)
        ));
        let (tx, _rx) = mpsc::channel(1);
        assert!(matches!(session.join(tx), Err(SessionError::SessionClosed)));
    }

    #[tokio::test]
    async fn test_session_manager() {
        let manager = SessionManager::new();
        let id = manager
            .create_session(SessionConfig::default(), GameConfig::default(), Level::flat(0.0))
            .await;
        assert_eq!(manager.session_count().await, 1);

        let session = manager.get_session(&id).await.unwrap();
        session.write().await.close("done");

        manager.cleanup().await;
        assert_eq!(manager.session_count().await, 0);
        assert!(manager.get_session(&id).await.is_none());
    }
}
