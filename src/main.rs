//! Survival Game Server
//!
//! Runs an authoritative session with two scripted clients. Each client keeps
//! a replica fed by replication updates and sends intents through it, the
//! same path a real front end would take.

use anyhow::Context;
use glam::Vec3;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use survival::{
    ClientReplica, ControllerId, GameConfig, Level, ServerRpc, TICK_RATE, VERSION,
    game::{
        events::GameEventData,
        replica::RepNotify,
        types::{AmmoType, PickupType},
        world::MovementUpdate,
    },
    network::{ClientMessage, ServerMessage, SessionConfig, SessionManager},
};

/// Seconds of simulated play.
const DEMO_SECONDS: u64 = 8;

/// One scripted client.
struct Bot {
    name: &'static str,
    controller: ControllerId,
    replica: ClientReplica,
    inbox: mpsc::Receiver<ServerMessage>,
}

impl Bot {
    /// Feed everything received since the last tick into the replica.
    fn pump(&mut self) -> usize {
        let mut events = 0;
        while let Ok(message) = self.inbox.try_recv() {
            match message {
                ServerMessage::Replicate { update } => {
                    for notify in self.replica.apply(update) {
                        match notify {
                            RepNotify::Died { character } => {
                                info!(bot = self.name, %character, "Saw a death");
                            }
                            RepNotify::PawnChanged { pawn: Some(pawn) } => {
                                info!(bot = self.name, %pawn, "Possessed new pawn");
                            }
                            _ => {}
                        }
                    }
                }
                ServerMessage::Event { event } => {
                    events += 1;
                    if let GameEventData::CharacterDied { character, killer } = event.data {
                        info!(bot = self.name, %character, ?killer, "Death event");
                    }
                }
                ServerMessage::Welcome { pawn, .. } => {
                    info!(bot = self.name, %pawn, "Welcome");
                }
                ServerMessage::Shutdown { reason } => {
                    info!(bot = self.name, %reason, "Server shutting down");
                }
                ServerMessage::Error(e) => warn!(bot = self.name, code = ?e.code, "{}", e.message),
                ServerMessage::Pong { .. } => {}
            }
        }
        events
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Survival Server v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let game = GameConfig::from_env();
    game.validate().context("invalid game config")?;

    let mut level = Level::flat(0.0);
    level.spawn_points = vec![Vec3::new(0.0, 0.0, 90.0)];

    let session_config = SessionConfig { seed: Some(12345), ..Default::default() };
    let frame = session_config.frame_duration();
    let capacity = session_config.channel_capacity;

    let manager = SessionManager::new();
    let session_id = manager
        .create_session(session_config, game.clone(), level.clone())
        .await;
    let session = manager
        .get_session(&session_id)
        .await
        .context("session vanished after creation")?;
    info!("Session ID: {}", hex::encode(session_id));

    let mut bots = Vec::new();
    for name in ["scavenger", "raider"] {
        let (tx, rx) = mpsc::channel(capacity);
        let controller = session.write().await.join(tx)?;
        bots.push(Bot {
            name,
            controller,
            replica: ClientReplica::new(controller, game.clone(), level.clone()),
            inbox: rx,
        });
    }

    // Loot laid out along the first bot's line of sight
    {
        let mut s = session.write().await;
        let world = s.world_mut();
        let origin = world
            .pawn_of(bots[0].controller)
            .and_then(|p| world.actor_position(p))
            .context("first bot has no pawn")?;
        if let Some(raider) = world.pawn_of(bots[1].controller) {
            // Step the raider out of the shared spawn point
            world.update_movement(raider, MovementUpdate {
                position: origin + Vec3::Y * 600.0,
                velocity: Vec3::ZERO,
                yaw: 0.0,
                is_falling: false,
            })?;
        }
        world.spawn_weapon("AR-15", origin + Vec3::X * 200.0)?;
        world.spawn_ammo(AmmoType::Assault, 60, origin + Vec3::X * 300.0);
        world.spawn_pickup(PickupType::Food, None, origin + Vec3::X * 400.0);
    }

    let total_ticks = DEMO_SECONDS * u64::from(TICK_RATE);
    let mut interval = tokio::time::interval(frame);
    let mut total_events = 0;

    info!("Running {} ticks...", total_ticks);

    for t in 0..total_ticks {
        interval.tick().await;

        for bot in bots.iter_mut() {
            total_events += bot.pump();
        }

        // Scavenger loots, then shoots; raider just sprints about
        let scavenger = &bots[0];
        let intents: Vec<ServerRpc> = match t {
            5 | 15 | 25 => scavenger.replica.interact().into_iter().collect(),
            35 => scavenger.replica.aim(true).into_iter().collect(),
            40..=200 if t % 20 == 0 => scavenger.replica.attack(None).into_iter().collect(),
            220 => scavenger.replica.reload().into_iter().collect(),
            _ => Vec::new(),
        };
        let scavenger_id = scavenger.controller;

        let raider = &bots[1];
        let raider_intents: Vec<ServerRpc> = match t {
            60 => raider.replica.start_sprint().unwrap_or_default(),
            180 => raider.replica.stop_sprint().into_iter().collect(),
            240 => raider.replica.jump().into_iter().collect(),
            _ => Vec::new(),
        };
        let raider_id = raider.controller;

        let mut s = session.write().await;
        for rpc in intents {
            s.enqueue(scavenger_id, ClientMessage::from(rpc))?;
        }
        for rpc in raider_intents {
            s.enqueue(raider_id, ClientMessage::from(rpc))?;
        }
        let Some(result) = s.run_tick() else { break };
        drop(s);

        if result.tick % u64::from(TICK_RATE) == 0 {
            for bot in &bots {
                if let Some(stats) = bot.replica.player_stats_string() {
                    info!(
                        tick = result.tick,
                        bot = bot.name,
                        hash = %bot.replica.state_hash().map(|h| hex::encode(&h[..4])).unwrap_or_default(),
                        "{}",
                        stats
                    );
                }
            }
        }
    }

    session.write().await.close("demo finished");
    for bot in bots.iter_mut() {
        total_events += bot.pump();
    }
    manager.cleanup().await;

    info!("Total events delivered: {}", total_events);
    info!("Sessions remaining: {}", manager.session_count().await);
    Ok(())
}
