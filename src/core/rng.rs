//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ seeded through SplitMix64. Every random decision the
//! authority makes (drop scatter, spawn point selection) is drawn from one
//! `DeterministicRng` owned by the world, so a session replayed from the same
//! seed and the same request stream lands items in the same places.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use survival::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Create an RNG keyed to a session id.
    pub fn for_session(session_id: &[u8; 16]) -> Self {
        Self::new(derive_session_seed(session_id))
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        (self.next_u64() % max as u64) as u32
    }

    /// Generate a random f32 in [0, 1).
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        // 24 mantissa bits keep every value exactly representable
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Generate a random f32 in [min, max).
    #[inline]
    pub fn next_f32_range(&mut self, min: f32, max: f32) -> f32 {
        if min >= max {
            return min;
        }
        min + (max - min) * self.next_f32()
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(slice.len() as u32) as usize;
            Some(&slice[idx])
        }
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a world seed from a session id.
pub fn derive_session_seed(session_id: &[u8; 16]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"SURVIVAL_SEED_V1");
    hasher.update(session_id);
    let hash = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_int() {
        let mut rng = DeterministicRng::new(1234);

        for _ in 0..1000 {
            assert!(rng.next_int(100) < 100);
        }

        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.next_int(1), 0);
    }

    #[test]
    fn test_next_f32_range() {
        let mut rng = DeterministicRng::new(9999);

        for _ in 0..1000 {
            let v = rng.next_f32_range(-50.0, 100.0);
            assert!((-50.0..100.0).contains(&v));
        }

        // Degenerate range collapses to min
        assert_eq!(rng.next_f32_range(5.0, 5.0), 5.0);
    }

    #[test]
    fn test_choose() {
        let mut rng = DeterministicRng::new(7);
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());

        let points = [1, 2, 3];
        for _ in 0..50 {
            assert!(points.contains(rng.choose(&points).unwrap()));
        }
    }

    #[test]
    fn test_session_seed() {
        let a = derive_session_seed(&[1; 16]);
        assert_eq!(a, derive_session_seed(&[1; 16]));
        assert_ne!(a, derive_session_seed(&[2; 16]));
    }

    #[test]
    fn test_state_checkpoint() {
        let mut rng = DeterministicRng::new(5555);
        rng.next_u64();
        let saved = rng.state();
        let expected = rng.next_u64();

        rng.set_state(saved);
        assert_eq!(rng.next_u64(), expected);
    }
}
