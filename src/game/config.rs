//! Gameplay Configuration
//!
//! Tuning values for stats, inventory, combat and respawn, plus the weapon
//! table. Loaded once at startup from JSON; every field has a default so a
//! partial file only overrides what it names.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::game::types::AmmoType;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV_VAR: &str = "SURVIVAL_CONFIG";

/// Config loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// File was not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Values parsed but are unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// =============================================================================
// STAT TUNING
// =============================================================================

/// Vital stat tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StatConfig {
    /// Upper bound for health, hunger, thirst and stamina
    pub max_value: f32,
    /// Starting health
    pub initial_health: f32,
    /// Starting hunger
    pub initial_hunger: f32,
    /// Starting thirst
    pub initial_thirst: f32,
    /// Starting stamina
    pub initial_stamina: f32,
    /// Seconds between hunger/thirst decay ticks
    pub decay_interval_secs: f32,
    /// Hunger lost per decay tick
    pub hunger_decay: f32,
    /// Thirst lost per decay tick
    pub thirst_decay: f32,
    /// Health lost when a decrement leaves hunger at zero
    pub hunger_damage: f32,
    /// Health lost when a decrement leaves thirst at zero
    pub thirst_damage: f32,
    /// Hunger at or above this heals on decrement
    pub hunger_healing_threshold: f32,
    /// Thirst at or above this heals on decrement
    pub thirst_healing_threshold: f32,
    /// Health restored by a well-fed decrement
    pub hunger_healing_amount: f32,
    /// Health restored by a well-watered decrement
    pub thirst_healing_amount: f32,
    /// Seconds between stamina regen ticks
    pub stamina_regen_interval_secs: f32,
    /// Stamina restored per regen tick
    pub stamina_regen: f32,
    /// Seconds between sprint drain ticks
    pub sprint_drain_interval_secs: f32,
    /// Stamina lost per sprint drain tick while moving
    pub sprint_drain: f32,
    /// Sprint and jump need strictly more stamina than this
    pub min_action_stamina: f32,
    /// Stamina spent per jump
    pub jump_cost: f32,
}

impl Default for StatConfig {
    fn default() -> Self {
        Self {
            max_value: 100.0,
            initial_health: 100.0,
            initial_hunger: 100.0,
            initial_thirst: 100.0,
            initial_stamina: 100.0,
            decay_interval_secs: 3.0,
            hunger_decay: 0.3,
            thirst_decay: 0.5,
            hunger_damage: 2.0,
            thirst_damage: 2.0,
            hunger_healing_threshold: 80.0,
            thirst_healing_threshold: 80.0,
            hunger_healing_amount: 0.5,
            thirst_healing_amount: 0.5,
            stamina_regen_interval_secs: 1.0,
            stamina_regen: 1.0,
            sprint_drain_interval_secs: 1.0,
            sprint_drain: 2.0,
            min_action_stamina: 10.0,
            jump_cost: 10.0,
        }
    }
}

impl StatConfig {
    /// Decay period.
    pub fn decay_interval(&self) -> Duration {
        Duration::from_secs_f32(self.decay_interval_secs)
    }

    /// Stamina regen period.
    pub fn stamina_regen_interval(&self) -> Duration {
        Duration::from_secs_f32(self.stamina_regen_interval_secs)
    }

    /// Sprint drain period.
    pub fn sprint_drain_interval(&self) -> Duration {
        Duration::from_secs_f32(self.sprint_drain_interval_secs)
    }
}

// =============================================================================
// INVENTORY
// =============================================================================

/// Inventory and drop placement tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Item slots per character
    pub character_capacity: usize,
    /// Item slots per storage container
    pub container_capacity: usize,
    /// Lower bound of the horizontal drop scatter
    pub drop_offset_min: f32,
    /// Upper bound of the horizontal drop scatter
    pub drop_offset_max: f32,
    /// How far below the scatter point to search for a floor
    pub drop_probe_depth: f32,
    /// Effect size for pickups spawned without an explicit amount
    pub default_pickup_amount: f32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            character_capacity: 16,
            container_capacity: 16,
            drop_offset_min: -50.0,
            drop_offset_max: 100.0,
            drop_probe_depth: 2000.0,
            default_pickup_amount: 30.0,
        }
    }
}

// =============================================================================
// COMBAT
// =============================================================================

/// Probe distances, melee and shot validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Forward reach of the interact probe
    pub interact_range: f32,
    /// Forward reach of the melee probe
    pub melee_range: f32,
    /// Damage dealt by an unarmed hit
    pub melee_damage: f32,
    /// Forward reach of a weapon shot
    pub weapon_range: f32,
    /// Max distance between client and server trace endpoints.
    /// `None` skips the distance comparison.
    pub shot_tolerance: Option<f32>,
    /// Eye height above the character origin
    pub eye_height: f32,
    /// Muzzle distance in front of the eye
    pub muzzle_forward: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            interact_range: 600.0,
            melee_range: 750.0,
            melee_damage: 20.0,
            weapon_range: 4000.0,
            shot_tolerance: Some(15.0),
            eye_height: 64.0,
            muzzle_forward: 40.0,
        }
    }
}

// =============================================================================
// RESPAWN
// =============================================================================

/// Death and respawn timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RespawnConfig {
    /// Seconds from death to the replacement character
    pub respawn_delay_secs: f32,
    /// Seconds a corpse stays in the world
    pub destroy_delay_secs: f32,
    /// Used when the level has no spawn points
    pub default_spawn: Vec3,
}

impl Default for RespawnConfig {
    fn default() -> Self {
        Self {
            respawn_delay_secs: 5.0,
            destroy_delay_secs: 10.0,
            default_spawn: Vec3::new(-400.0, 50.0, 200.0),
        }
    }
}

impl RespawnConfig {
    /// Respawn delay.
    pub fn respawn_delay(&self) -> Duration {
        Duration::from_secs_f32(self.respawn_delay_secs)
    }

    /// Corpse lifetime.
    pub fn destroy_delay(&self) -> Duration {
        Duration::from_secs_f32(self.destroy_delay_secs)
    }
}

// =============================================================================
// WEAPON TABLE
// =============================================================================

/// One row of the weapon table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponData {
    /// Mesh asset reference (presentation only)
    pub mesh: String,
    /// Rounds per magazine
    pub magazine_size: u32,
    /// Ammunition consumed
    pub ammo_type: AmmoType,
    /// Seconds to reload
    pub reload_time_secs: f32,
    /// Damage per validated hit
    pub damage: f32,
    /// Sound cue played on fire
    pub fire_sound: String,
    /// Emitter played at the muzzle
    pub muzzle_effect: String,
    /// Emitter played at the impact point
    pub impact_effect: String,
}

impl WeaponData {
    fn row(mesh: &str, magazine_size: u32, ammo_type: AmmoType, reload: f32, damage: f32) -> Self {
        Self {
            mesh: mesh.to_string(),
            magazine_size,
            ammo_type,
            reload_time_secs: reload,
            damage,
            fire_sound: format!("{mesh}_Fire"),
            muzzle_effect: "MuzzleFlash".to_string(),
            impact_effect: "BulletImpact".to_string(),
        }
    }

    /// Reload duration.
    pub fn reload_time(&self) -> Duration {
        Duration::from_secs_f32(self.reload_time_secs)
    }
}

/// Read-only weapon configuration keyed by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeaponTable {
    rows: BTreeMap<String, WeaponData>,
}

impl Default for WeaponTable {
    fn default() -> Self {
        let mut rows = BTreeMap::new();
        rows.insert("AR-15".to_string(), WeaponData::row("SK_AR15", 30, AmmoType::Assault, 2.0, 20.0));
        rows.insert("Sniper".to_string(), WeaponData::row("SK_Sniper", 5, AmmoType::Sniper, 3.5, 90.0));
        rows.insert("Shotgun".to_string(), WeaponData::row("SK_Shotgun", 8, AmmoType::Shotgun, 3.0, 45.0));
        Self { rows }
    }
}

impl WeaponTable {
    /// Look up a row by weapon name.
    pub fn get(&self, name: &str) -> Option<&WeaponData> {
        self.rows.get(name)
    }

    /// Add or replace a row.
    pub fn insert(&mut self, name: impl Into<String>, data: WeaponData) {
        self.rows.insert(name.into(), data);
    }

    /// Iterate rows in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &WeaponData)> {
        self.rows.iter()
    }
}

// =============================================================================
// GAME CONFIG
// =============================================================================

/// Complete gameplay configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Vital stats
    pub stats: StatConfig,
    /// Inventory and drops
    pub inventory: InventoryConfig,
    /// Probes and damage
    pub combat: CombatConfig,
    /// Death and respawn
    pub respawn: RespawnConfig,
    /// Weapon rows
    pub weapons: WeaponTable,
}

impl GameConfig {
    /// Parse from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Load the file named by `SURVIVAL_CONFIG`, or fall back to defaults.
    pub fn from_env() -> Self {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => match Self::load(&path) {
                Ok(config) => {
                    info!(%path, "Loaded game config");
                    config
                }
                Err(e) => {
                    warn!(%path, error = %e, "Falling back to default game config");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stats.max_value <= 0.0 {
            return Err(ConfigError::Invalid("stats.max_value must be positive".into()));
        }
        let intervals = [
            self.stats.decay_interval_secs,
            self.stats.stamina_regen_interval_secs,
            self.stats.sprint_drain_interval_secs,
        ];
        if intervals.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ConfigError::Invalid("stat intervals must be positive".into()));
        }
        let delays = [self.respawn.respawn_delay_secs, self.respawn.destroy_delay_secs];
        if delays.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(ConfigError::Invalid("respawn delays must be non-negative".into()));
        }
        if self.inventory.drop_offset_min > self.inventory.drop_offset_max {
            return Err(ConfigError::Invalid("drop offset range is inverted".into()));
        }
        for (name, row) in self.weapons.iter() {
            if row.magazine_size == 0 || !row.reload_time_secs.is_finite() || row.reload_time_secs < 0.0 {
                return Err(ConfigError::Invalid(format!("weapon {name} has an unusable row")));
            }
        }
        Ok(())
    }
}
