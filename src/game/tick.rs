//! Authoritative Simulation Tick
//!
//! One server frame:
//! 1. advance the tick counter
//! 2. dispatch client requests in arrival order (validate, then perform)
//! 3. advance the timer service and run every elapsed callback
//! 4. collect the frame's events in (tick, priority) order
//!
//! Timer callbacks may find their target gone (a corpse destroyed, a reload
//! cancelled). Such stale callbacks are dropped.

use std::time::Duration;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::timer::{Fired, TimerHandle};
use crate::game::error::{GameError, GameResult};
use crate::game::events::GameEvent;
use crate::game::rpc::RpcEnvelope;
use crate::game::types::{ActorId, ControllerId};
use crate::game::world::World;

/// Deferred callback payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerEvent {
    /// Hunger and thirst decay
    StatDecay(ActorId),
    /// Stamina regeneration
    StaminaRegen(ActorId),
    /// Stamina drain while sprinting
    SprintDrain(ActorId),
    /// Reload finished
    ReloadComplete(ActorId),
    /// Corpse removal
    DestroyActor(ActorId),
    /// Spawn a replacement pawn
    Respawn(ControllerId),
}

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Tick that was simulated
    pub tick: u64,
    /// Events generated this tick, ordered by priority
    pub events: Vec<GameEvent>,
    /// Requests that passed validation and ran
    pub applied: usize,
    /// Requests dropped by validation or by a failed perform
    pub dropped: usize,
    /// Timer callbacks that ran
    pub timers_fired: usize,
}

/// Run one simulation tick.
///
/// # Arguments
///
/// * `world` - The world (will be mutated)
/// * `requests` - Client requests for this tick, already in per-sender order
/// * `dt` - Simulation time covered by this frame
pub fn tick(world: &mut World, requests: &[RpcEnvelope], dt: Duration) -> TickResult {
    let mut result = TickResult::default();

    // 0. Advance tick counter
    world.tick += 1;
    result.tick = world.tick;

    // 1. Client requests
    for request in requests {
        if world.dispatch(request.caller, request.rpc.clone()) {
            result.applied += 1;
        } else {
            result.dropped += 1;
        }
    }

    // 2. Deferred callbacks
    for fired in world.timers.advance(dt) {
        #[cfg(feature = "debug-tracing")]
        tracing::trace!(handle = ?fired.handle, at = ?fired.at, event = ?fired.event, "Timer fired");

        result.timers_fired += 1;
        if let Err(e) = world.handle_timer(&fired) {
            debug!(event = ?fired.event, error = %e, "Dropped stale timer callback");
        }
    }

    // 3. Events in delivery order (stable within a priority)
    result.events = world.take_events();
    result.events.sort();
    result
}

impl World {
    /// Run one elapsed timer callback.
    pub fn handle_timer(&mut self, fired: &Fired<TimerEvent>) -> GameResult<()> {
        match fired.event {
            TimerEvent::StatDecay(character) => self.handle_stat_decay(character),
            TimerEvent::StaminaRegen(character) => {
                let pawn = self.characters.get_mut(&character).ok_or_else(|| GameError::missing(character))?;
                if pawn.is_alive() {
                    pawn.stats.regenerate_stamina();
                }
                Ok(())
            }
            TimerEvent::SprintDrain(character) => self.handle_sprint_drain(character),
            TimerEvent::ReloadComplete(character) => self.finish_reload(character, fired.handle).map(|_| ()),
            TimerEvent::DestroyActor(actor) => {
                if self.destroy_actor(actor) {
                    Ok(())
                } else {
                    Err(GameError::missing(actor))
                }
            }
            TimerEvent::Respawn(controller) => self.spawn_for(controller).map(|_| ()),
        }
    }

    /// Hunger and thirst decay; starvation kills through the death cascade.
    fn handle_stat_decay(&mut self, character: ActorId) -> GameResult<()> {
        let pawn = self.characters.get_mut(&character).ok_or_else(|| GameError::missing(character))?;
        if !pawn.is_alive() {
            return Ok(());
        }
        if pawn.stats.decay()? {
            self.die(character, None)?;
        }
        Ok(())
    }

    /// Is `handle` the reload pending on `character`?
    pub(crate) fn is_current_reload(&self, character: ActorId, handle: TimerHandle) -> bool {
        self.characters
            .get(&character)
            .map(|c| c.reload_timer == Some(handle))
            .unwrap_or(false)
    }
}

// =============================================================================
// TESTS
// =============================================================================
