//! Deterministic seed hierarchy.
//!
//! A master seed generates deterministic sub-seeds for each `(stream, index)`
//! pair, e.g. `("mc_path", 17)` or `("boosted_trees", 0)`. Sub-seeds are
//! derived via BLAKE3 hashing, independently of thread scheduling order, so
//! parallel Monte Carlo paths are identical regardless of thread count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic seed hierarchy scoped to one invocation.
#[derive(Debug, Clone)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Use `seed` when given, otherwise draw a fresh master seed from the
    /// OS-seeded thread RNG. Either way no shared RNG state is touched
    /// afterwards.
    pub fn from_optional(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::new(seed),
            None => Self::new(rand::thread_rng().gen()),
        }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for `(stream, index)`.
    ///
    /// Derivation is order independent: calling `sub_seed("a", 0)` then
    /// `sub_seed("b", 0)` gives the same values as the reverse order.
    pub fn sub_seed(&self, stream: &str, index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Create a seeded StdRng for `(stream, index)`.
    pub fn rng_for(&self, stream: &str, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_seeds_are_deterministic() {
        let hierarchy = SeedHierarchy::new(42);
        assert_eq!(
            hierarchy.sub_seed("mc_path", 0),
            hierarchy.sub_seed("mc_path", 0)
        );
    }

    #[test]
    fn different_streams_different_seeds() {
        let hierarchy = SeedHierarchy::new(42);
        assert_ne!(
            hierarchy.sub_seed("mc_path", 0),
            hierarchy.sub_seed("boosted_trees", 0)
        );
    }

    #[test]
    fn different_indices_different_seeds() {
        let hierarchy = SeedHierarchy::new(42);
        assert_ne!(
            hierarchy.sub_seed("mc_path", 0),
            hierarchy.sub_seed("mc_path", 1)
        );
    }

    #[test]
    fn derivation_order_independent() {
        let hierarchy = SeedHierarchy::new(42);

        let a_first = hierarchy.sub_seed("a", 3);
        let b_second = hierarchy.sub_seed("b", 3);

        let b_first = hierarchy.sub_seed("b", 3);
        let a_second = hierarchy.sub_seed("a", 3);

        assert_eq!(a_first, a_second);
        assert_eq!(b_first, b_second);
    }

    #[test]
    fn different_master_seeds_different_output() {
        assert_ne!(
            SeedHierarchy::new(42).sub_seed("mc_path", 0),
            SeedHierarchy::new(43).sub_seed("mc_path", 0)
        );
    }

    #[test]
    fn explicit_seed_is_kept() {
        assert_eq!(SeedHierarchy::from_optional(Some(7)).master_seed(), 7);
    }
}
