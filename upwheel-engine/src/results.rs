//! Accumulated selection counts per upgrade.

use crate::data::{Upgrade, UpgradeKey, Wheel};
use crate::error::ResultsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from upgrade to how many times it has been selected.
///
/// Counts are always positive; an absent key means zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<UpgradeKey, u32>", into = "BTreeMap<UpgradeKey, u32>")]
pub struct UpgradeResults {
    counts: BTreeMap<UpgradeKey, u32>,
}

impl UpgradeResults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selections recorded for `key`, zero when never selected.
    #[must_use]
    pub fn count(&self, key: &UpgradeKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn count_for(&self, upgrade: &Upgrade) -> u32 {
        self.count(upgrade.key())
    }

    /// Record one more selection and return the new count.
    pub fn increment(&mut self, key: &UpgradeKey) -> u32 {
        let count = self.counts.entry(key.clone()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct upgrades selected at least once.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all selection counts.
    #[must_use]
    pub fn total_selections(&self) -> u64 {
        self.counts.values().map(|count| u64::from(*count)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UpgradeKey, u32)> {
        self.counts.iter().map(|(key, count)| (key, *count))
    }

    /// Check that every recorded key belongs to `wheel`.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError::UnknownUpgrade`] for the first key the wheel
    /// does not contain.
    pub fn check_against(&self, wheel: &Wheel) -> Result<(), ResultsError> {
        for key in self.counts.keys() {
            if wheel.find_upgrade(key).is_none() {
                return Err(ResultsError::UnknownUpgrade(key.clone()));
            }
        }
        Ok(())
    }
}

impl From<BTreeMap<UpgradeKey, u32>> for UpgradeResults {
    fn from(mut counts: BTreeMap<UpgradeKey, u32>) -> Self {
        counts.retain(|_, count| *count > 0);
        Self { counts }
    }
}

impl From<UpgradeResults> for BTreeMap<UpgradeKey, u32> {
    fn from(results: UpgradeResults) -> Self {
        results.counts
    }
}

/// Results bundled with the fingerprint of the wheel that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedResults {
    pub wheel_fingerprint: u64,
    pub counts: UpgradeResults,
}

impl SavedResults {
    #[must_use]
    pub fn capture(wheel: &Wheel, results: &UpgradeResults) -> Self {
        Self {
            wheel_fingerprint: wheel.fingerprint(),
            counts: results.clone(),
        }
    }

    /// Recover the counts, refusing results saved against another wheel.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError::FingerprintMismatch`] when the wheel changed
    /// since the results were saved, or [`ResultsError::UnknownUpgrade`] when
    /// a key cannot be found on it.
    pub fn restore(self, wheel: &Wheel) -> Result<UpgradeResults, ResultsError> {
        let expected = wheel.fingerprint();
        if self.wheel_fingerprint != expected {
            return Err(ResultsError::FingerprintMismatch {
                expected,
                found: self.wheel_fingerprint,
            });
        }
        self.counts.check_against(wheel)?;
        Ok(self.counts)
    }
}
