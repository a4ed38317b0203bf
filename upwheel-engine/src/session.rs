//! A wheel, its accumulated results and the RNG stream that drives it.

use crate::apply::apply_upgrades;
use crate::constants::SPIN_STREAM_TAG;
use crate::data::{Upgrade, Wheel};
use crate::document::Document;
use crate::error::{ApplyError, CapacityError, ResultsError};
use crate::results::{SavedResults, UpgradeResults};
use crate::spinner::{Remaining, remaining_for_wheel, spin_many};
use crate::summary::render_summary;
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::Sha256;

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

/// Seed for the spin stream, domain-separated from the user seed so the same
/// seed fed elsewhere yields an unrelated sequence.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        // HMAC accepts keys of any length.
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Owns a wheel together with its results and a reproducible spin stream.
#[derive(Debug, Clone)]
pub struct SpinSession {
    wheel: Wheel,
    results: UpgradeResults,
    rng: CountingRng<ChaCha20Rng>,
    seed: u64,
}

impl SpinSession {
    /// Start with empty results; the same seed always replays the same spins.
    #[must_use]
    pub fn new(wheel: Wheel, seed: u64) -> Self {
        Self {
            wheel,
            results: UpgradeResults::new(),
            rng: CountingRng::new(derive_stream_seed(seed, SPIN_STREAM_TAG)),
            seed,
        }
    }

    /// Continue from previously saved results.
    ///
    /// # Errors
    ///
    /// Returns a [`ResultsError`] when the saved results belong to a
    /// different wheel.
    pub fn restore(wheel: Wheel, saved: SavedResults, seed: u64) -> Result<Self, ResultsError> {
        let results = saved.restore(&wheel)?;
        log::debug!(
            "restored {} selections for wheel '{}'",
            results.total_selections(),
            wheel.display_name
        );
        Ok(Self {
            results,
            ..Self::new(wheel, seed)
        })
    }

    #[must_use]
    pub const fn wheel(&self) -> &Wheel {
        &self.wheel
    }

    #[must_use]
    pub const fn results(&self) -> &UpgradeResults {
        &self.results
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// RNG draws consumed so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.rng.draws()
    }

    #[must_use]
    pub fn remaining(&self) -> Remaining {
        remaining_for_wheel(&self.wheel, &self.results)
    }

    /// Spin `spins` times, keeping results untouched if the batch fails.
    ///
    /// # Errors
    ///
    /// See [`spin_many`].
    pub fn spin(&mut self, spins: u32) -> Result<Vec<&Upgrade>, CapacityError> {
        spin_many(&self.wheel, &mut self.results, spins, &mut self.rng)
    }

    /// Forget every selection. The RNG stream keeps its position.
    pub fn reset(&mut self) {
        self.results.clear();
    }

    /// Apply the current results to `targets`, returning updated copies.
    ///
    /// # Errors
    ///
    /// See [`apply_upgrades`].
    pub fn apply(&self, targets: &[Document]) -> Result<Vec<Document>, ApplyError> {
        apply_upgrades(&self.wheel, &self.results, targets)
    }

    /// Summary text for the current results, headed by `version` when given.
    ///
    /// # Errors
    ///
    /// See [`render_summary`].
    pub fn summary(&self, version: Option<&str>) -> Result<String, ApplyError> {
        render_summary(&self.wheel, &self.results, version)
    }

    #[must_use]
    pub fn saved(&self) -> SavedResults {
        SavedResults::capture(&self.wheel, &self.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Progression, UpgradeKind, UpgradePath, WeightedChoice};
    use crate::document::Scalar;

    fn wheel() -> Wheel {
        let path: UpgradePath = ["Game".to_string(), "lives".to_string()]
            .into_iter()
            .collect();
        let lives = Upgrade::new(
            "Lives",
            UpgradeKind::Override,
            path,
            Progression::with_values(vec![Scalar::Integer(4), Scalar::Integer(5)]),
        );
        let bonus = Upgrade::new(
            "Bonus",
            UpgradeKind::Manual,
            std::iter::once("Game".to_string()).collect(),
            Progression::with_values(vec![Scalar::Integer(1)]),
        );
        Wheel::new("Game")
            .with_game("Game")
            .with_choice(WeightedChoice::upgrade("Lives", 2, lives))
            .with_choice(WeightedChoice::upgrade("Bonus", 1, bonus))
    }

    #[test]
    fn derived_seed_is_stable_and_tag_dependent() {
        assert_eq!(
            derive_stream_seed(42, SPIN_STREAM_TAG),
            derive_stream_seed(42, SPIN_STREAM_TAG)
        );
        assert_ne!(
            derive_stream_seed(42, SPIN_STREAM_TAG),
            derive_stream_seed(42, b"other")
        );
        assert_ne!(
            derive_stream_seed(42, SPIN_STREAM_TAG),
            derive_stream_seed(43, SPIN_STREAM_TAG)
        );
    }

    #[test]
    fn same_seed_replays_same_results() {
        let mut first = SpinSession::new(wheel(), 7);
        let mut second = SpinSession::new(wheel(), 7);
        first.spin(2).unwrap();
        second.spin(1).unwrap();
        second.spin(1).unwrap();
        assert_eq!(first.results(), second.results());
        assert!(first.draws() > 0);
    }

    #[test]
    fn capacity_runs_out_and_reset_restores_it() {
        let mut session = SpinSession::new(wheel(), 1);
        assert_eq!(session.remaining(), Remaining::Finite(3.0));
        session.spin(3).unwrap();
        assert_eq!(session.remaining(), Remaining::Finite(0.0));
        assert!(session.spin(1).is_err());
        assert_eq!(session.results().total_selections(), 3);

        session.reset();
        assert!(session.results().is_empty());
        assert_eq!(session.remaining(), Remaining::Finite(3.0));
    }

    #[test]
    fn saved_results_round_trip_through_restore() {
        let mut session = SpinSession::new(wheel(), 3);
        session.spin(2).unwrap();
        let saved = session.saved();

        let restored = SpinSession::restore(wheel(), saved.clone(), 9).unwrap();
        assert_eq!(restored.results(), session.results());
        assert_eq!(restored.seed(), 9);

        assert!(SpinSession::restore(Wheel::new("Other"), saved, 9).is_err());
    }
}
