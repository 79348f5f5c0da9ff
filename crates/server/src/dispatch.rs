//! Batch selection policy.
//!
//! Dispatch distinguishes new work from re-verification with a single
//! discrete draw: uniform over `{0, ..., reputation}`, where zero means
//! "verify". A fresh worker (reputation 0) is therefore verified on every
//! dispatch until it builds a track record, while a worker with reputation
//! `R` is re-verified with probability `1/(R+1)`.

use rand::Rng;

/// Decide whether this dispatch should hand out an already-finished batch
/// as a known-answer challenge.
pub fn verification_draw<R: Rng>(rng: &mut R, reputation: i64) -> bool {
    let bound = reputation.max(0) as u64;
    rng.random_range(0..=bound) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn zero_reputation_always_verifies() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!(verification_draw(&mut rng, 0));
        }
    }

    #[test]
    fn negative_reputation_is_clamped() {
        // Penalised-but-not-yet-disabled states must still always verify.
        let mut rng = StdRng::seed_from_u64(7);
        assert!(verification_draw(&mut rng, -5));
    }

    #[test]
    fn draw_probability_follows_reputation() {
        // P(verify | reputation R) = 1/(R+1), checked over 10^4 trials.
        let trials = 10_000u32;
        for reputation in [1i64, 4, 9, 99] {
            let mut rng = StdRng::seed_from_u64(42);
            let hits = (0..trials)
                .filter(|_| verification_draw(&mut rng, reputation))
                .count() as f64;
            let observed = hits / trials as f64;
            let expected = 1.0 / (reputation as f64 + 1.0);
            let tolerance = 4.0 * (expected * (1.0 - expected) / trials as f64).sqrt();
            assert!(
                (observed - expected).abs() < tolerance,
                "reputation {reputation}: observed {observed}, expected {expected}"
            );
        }
    }
}
