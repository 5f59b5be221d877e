//! State Hashing for Diagnostics
//!
//! Deterministic hashing of authoritative world state. Each replication
//! update carries the hash so observers and tooling can detect divergence.

use glam::Vec3;
use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for world state.
///
/// Wraps SHA-256. Order of updates is critical.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for world state.
    pub fn for_world_state() -> Self {
        Self::new(b"SURVIVAL_STATE_V1")
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f32 by bit pattern.
    #[inline]
    pub fn update_f32(&mut self, value: f32) {
        self.hasher.update(value.to_bits().to_le_bytes());
    }

    /// Update with a Vec3.
    #[inline]
    pub fn update_vec3(&mut self, value: Vec3) {
        self.update_f32(value.x);
        self.update_f32(value.y);
        self.update_f32(value.z);
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Update with an optional id; `None` hashes as a distinct marker.
    #[inline]
    pub fn update_opt_u32(&mut self, value: Option<u32>) {
        match value {
            Some(v) => {
                self.update_u8(1);
                self.update_u32(v);
            }
            None => self.update_u8(0),
        }
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute a world state hash.
///
/// Tick and rng state always go first; `add_state` appends the rest.
pub fn compute_state_hash<F>(tick: u64, rng_state: [u64; 2], add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_world_state();
    hasher.update_u64(tick);
    hasher.update_u64(rng_state[0]);
    hasher.update_u64(rng_state[1]);
    add_state(&mut hasher);
    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_world_state();
            hasher.update_u32(100);
            hasher.update_f32(5.5);
            hasher.update_vec3(Vec3::new(1.0, 2.0, 3.0));
            hasher.update_bool(true);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(1);
            h.update_u32(2);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_u32(2);
            h.update_u32(1);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_optional_marker() {
        let none = {
            let mut h = StateHasher::new(b"opt");
            h.update_opt_u32(None);
            h.finalize()
        };
        let zero = {
            let mut h = StateHasher::new(b"opt");
            h.update_opt_u32(Some(0));
            h.finalize()
        };
        assert_ne!(none, zero);
    }

    #[test]
    fn test_compute_state_hash() {
        let hash = compute_state_hash(100, [1, 2], |h| h.update_f32(5.0));
        let hash2 = compute_state_hash(100, [1, 2], |h| h.update_f32(5.0));
        assert_eq!(hash, hash2);

        let hash3 = compute_state_hash(101, [1, 2], |h| h.update_f32(5.0));
        assert_ne!(hash, hash3);
    }
}
