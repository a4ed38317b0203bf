//! Weighted spins that honor per-upgrade exhaustion.
//!
//! Every draw consults the running [`UpgradeResults`], so later draws of a
//! batch see the exhaustion caused by earlier ones.

use crate::data::{ChoiceTarget, Upgrade, WeightedChoice, Wheel};
use crate::error::CapacityError;
use crate::numbers::{count_to_f64, len_to_f64};
use crate::results::UpgradeResults;
use rand::Rng;
use std::fmt;

/// How many more selections something can absorb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Remaining {
    Unlimited,
    /// Finite capacity, always a whole number of selections.
    Finite(f64),
}

impl Remaining {
    /// Whether at least one more selection is possible.
    #[must_use]
    pub fn is_available(self) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Finite(left) => left > 0.0,
        }
    }

    #[must_use]
    pub const fn finite(self) -> Option<f64> {
        match self {
            Self::Unlimited => None,
            Self::Finite(left) => Some(left),
        }
    }

    /// Whether `spins` more selections fit.
    #[must_use]
    pub fn allows(self, spins: u32) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Finite(left) => left >= count_to_f64(spins),
        }
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Finite(left) => write!(f, "{left}"),
        }
    }
}

/// Remaining selections for a single upgrade.
///
/// An explicit limit caps the count; without one, a values list with no
/// increment runs out at its length; anything with an increment is unlimited.
/// A fractional limit from `atMost` admits only the whole counts below it.
#[must_use]
pub fn remaining_for_upgrade(upgrade: &Upgrade, results: &UpgradeResults) -> Remaining {
    let used = count_to_f64(results.count_for(upgrade));
    let progression = upgrade.progression();
    if let Some(limit) = progression.limit {
        Remaining::Finite(limit.floor() - used)
    } else if progression.increment.is_none() {
        Remaining::Finite(len_to_f64(progression.values.len()) - used)
    } else {
        Remaining::Unlimited
    }
}

/// Remaining spins for a wheel: the sum over every reachable upgrade, or
/// unlimited as soon as any reachable upgrade is.
#[must_use]
pub fn remaining_for_wheel(wheel: &Wheel, results: &UpgradeResults) -> Remaining {
    let mut total = 0.0;
    for choice in &wheel.choices {
        match remaining_for_choice(choice, results) {
            Remaining::Unlimited => return Remaining::Unlimited,
            Remaining::Finite(left) => total += left.max(0.0),
        }
    }
    Remaining::Finite(total)
}

fn remaining_for_choice(choice: &WeightedChoice, results: &UpgradeResults) -> Remaining {
    match &choice.target {
        ChoiceTarget::Wheel(wheel) => remaining_for_wheel(wheel, results),
        ChoiceTarget::Upgrade(upgrade) => remaining_for_upgrade(upgrade, results),
    }
}

fn choose_weighted<R: Rng + ?Sized>(weights: &[(usize, u32)], rng: &mut R) -> Option<usize> {
    let total_weight: u64 = weights.iter().map(|(_, weight)| u64::from(*weight)).sum();
    if total_weight == 0 {
        return None;
    }

    let roll = rng.gen_range(0..total_weight);
    let mut current = 0;
    for (idx, weight) in weights {
        current += u64::from(*weight);
        if roll < current {
            return Some(*idx);
        }
    }

    weights.last().map(|(idx, _)| *idx)
}

/// Draw one terminal upgrade from `wheel`, descending through nested wheels.
///
/// Choices whose target is exhausted are excluded before drawing; the rest
/// are picked in proportion to their weight. Does not record the draw.
///
/// # Errors
///
/// Returns [`CapacityError::Exhausted`] naming the wheel at which no choice
/// remained selectable.
pub fn spin_once<'w, R: Rng + ?Sized>(
    wheel: &'w Wheel,
    results: &UpgradeResults,
    rng: &mut R,
) -> Result<&'w Upgrade, CapacityError> {
    let mut current = wheel;
    loop {
        let available: Vec<(usize, u32)> = current
            .choices
            .iter()
            .enumerate()
            .filter(|(_, choice)| remaining_for_choice(choice, results).is_available())
            .map(|(idx, choice)| (idx, choice.weight))
            .collect();
        let Some(idx) = choose_weighted(&available, rng) else {
            return Err(CapacityError::Exhausted {
                wheel: current.display_name.clone(),
            });
        };
        let choice = &current.choices[idx];
        log::trace!("wheel '{}' landed on '{}'", current.display_name, choice.name);
        match &choice.target {
            ChoiceTarget::Wheel(next) => current = next,
            ChoiceTarget::Upgrade(upgrade) => return Ok(upgrade),
        }
    }
}

/// Spin `wheel` `spins` times, recording every draw in `results`.
///
/// The batch is atomic: on any error `results` is left exactly as it was.
/// Returns the drawn upgrades in draw order.
///
/// # Errors
///
/// Returns [`CapacityError::InsufficientCapacity`] before drawing when the
/// wheel's finite capacity is below `spins`, or [`CapacityError::Exhausted`]
/// if a nested wheel runs dry mid-batch.
pub fn spin_many<'w, R: Rng + ?Sized>(
    wheel: &'w Wheel,
    results: &mut UpgradeResults,
    spins: u32,
    rng: &mut R,
) -> Result<Vec<&'w Upgrade>, CapacityError> {
    let capacity = remaining_for_wheel(wheel, results);
    if !capacity.allows(spins) {
        return Err(CapacityError::InsufficientCapacity {
            wheel: wheel.display_name.clone(),
            capacity: capacity.finite().unwrap_or_default(),
            requested: spins,
        });
    }

    let mut scratch = results.clone();
    let mut drawn = Vec::new();
    for _ in 0..spins {
        let upgrade = spin_once(wheel, &scratch, rng)?;
        scratch.increment(upgrade.key());
        drawn.push(upgrade);
    }
    *results = scratch;
    log::debug!(
        "spun wheel '{}' {spins} times; {} upgrades now selected",
        wheel.display_name,
        results.len()
    );
    Ok(drawn)
}

/// Spin a fresh set of results from nothing.
///
/// # Errors
///
/// Same as [`spin_many`].
pub fn spin_upgrades<R: Rng + ?Sized>(
    wheel: &Wheel,
    spins: u32,
    rng: &mut R,
) -> Result<UpgradeResults, CapacityError> {
    let mut results = UpgradeResults::new();
    spin_many(wheel, &mut results, spins, rng)?;
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Progression, UpgradeKind, UpgradePath};
    use crate::document::Scalar;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn upgrade(id: &str, progression: Progression) -> Upgrade {
        let path: UpgradePath = ["G".to_string(), id.to_string()].into_iter().collect();
        Upgrade::new(id, UpgradeKind::Override, path, progression)
    }

    fn values(count: i64) -> Progression {
        Progression::with_values((1..=count).map(Scalar::Integer).collect())
    }

    #[test]
    fn upgrade_remaining_follows_progression_shape() {
        let mut results = UpgradeResults::new();
        let listed = upgrade("listed", values(3));
        let capped = upgrade("capped", Progression::with_increment(1).limit(2.0));
        let open = upgrade("open", Progression::with_increment(1));

        assert_eq!(remaining_for_upgrade(&listed, &results), Remaining::Finite(3.0));
        assert_eq!(remaining_for_upgrade(&capped, &results), Remaining::Finite(2.0));
        assert_eq!(remaining_for_upgrade(&open, &results), Remaining::Unlimited);

        results.increment(listed.key());
        results.increment(capped.key());
        assert_eq!(remaining_for_upgrade(&listed, &results), Remaining::Finite(2.0));
        assert_eq!(remaining_for_upgrade(&capped, &results), Remaining::Finite(1.0));
    }

    #[test]
    fn wheel_capacity_sums_nested_upgrades() {
        let inner = Wheel::new("inner")
            .with_choice(WeightedChoice::upgrade("b", 1, upgrade("b", values(2))))
            .with_choice(WeightedChoice::upgrade("c", 1, upgrade("c", values(1))));
        let wheel = Wheel::new("outer")
            .with_choice(WeightedChoice::upgrade("a", 1, upgrade("a", values(3))))
            .with_choice(WeightedChoice::wheel("inner", 1, inner));
        assert_eq!(
            remaining_for_wheel(&wheel, &UpgradeResults::new()),
            Remaining::Finite(6.0)
        );
    }

    #[test]
    fn one_unlimited_upgrade_makes_the_wheel_unlimited() {
        let wheel = Wheel::new("mixed")
            .with_choice(WeightedChoice::upgrade("a", 5, upgrade("a", values(1))))
            .with_choice(WeightedChoice::upgrade(
                "b",
                1,
                upgrade("b", Progression::with_increment(1)),
            ));
        assert_eq!(
            remaining_for_wheel(&wheel, &UpgradeResults::new()),
            Remaining::Unlimited
        );
    }

    #[test]
    fn exhausted_choices_are_never_drawn() {
        let spent = upgrade("spent", values(1));
        let fresh = upgrade("fresh", values(5));
        let wheel = Wheel::new("w")
            .with_choice(WeightedChoice::upgrade("spent", 1000, spent.clone()))
            .with_choice(WeightedChoice::upgrade("fresh", 1, fresh.clone()));
        let mut results = UpgradeResults::new();
        results.increment(spent.key());

        let mut rng = ChaCha20Rng::seed_from_u64(11);
        for _ in 0..50 {
            let drawn = spin_once(&wheel, &results, &mut rng).unwrap();
            assert_eq!(drawn.key(), fresh.key());
        }
    }

    #[test]
    fn spin_once_fails_when_everything_is_spent() {
        let only = upgrade("only", values(1));
        let wheel = Wheel::new("tiny").with_choice(WeightedChoice::upgrade("only", 1, only.clone()));
        let mut results = UpgradeResults::new();
        results.increment(only.key());
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        assert_eq!(
            spin_once(&wheel, &results, &mut rng),
            Err(CapacityError::Exhausted {
                wheel: "tiny".to_string()
            })
        );
    }

    #[test]
    fn spin_many_counts_every_draw() {
        let wheel = Wheel::new("w")
            .with_choice(WeightedChoice::upgrade("a", 1, upgrade("a", values(2))))
            .with_choice(WeightedChoice::upgrade("b", 1, upgrade("b", values(2))));
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut results = UpgradeResults::new();
        let drawn = spin_many(&wheel, &mut results, 4, &mut rng).unwrap();
        assert_eq!(drawn.len(), 4);
        assert_eq!(results.total_selections(), 4);
        assert_eq!(remaining_for_wheel(&wheel, &results), Remaining::Finite(0.0));
    }

    #[test]
    fn spin_many_rejects_oversized_batches_without_side_effects() {
        let a = upgrade("a", values(2));
        let wheel = Wheel::new("w").with_choice(WeightedChoice::upgrade("a", 1, a.clone()));
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        let mut results = UpgradeResults::new();
        results.increment(a.key());
        let before = results.clone();

        let err = spin_many(&wheel, &mut results, 2, &mut rng).unwrap_err();
        assert_eq!(
            err,
            CapacityError::InsufficientCapacity {
                wheel: "w".to_string(),
                capacity: 1.0,
                requested: 2
            }
        );
        assert_eq!(results, before);
    }

    #[test]
    fn fractional_capacity_blocks_the_last_partial_spin() {
        let a = upgrade("a", Progression::with_values(vec![Scalar::Integer(1)]).increment(2).limit(2.5));
        let wheel = Wheel::new("w").with_choice(WeightedChoice::upgrade("a", 1, a));
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let mut results = UpgradeResults::new();
        spin_many(&wheel, &mut results, 2, &mut rng).unwrap();
        assert_eq!(remaining_for_wheel(&wheel, &results), Remaining::Finite(0.0));
        assert!(spin_many(&wheel, &mut results, 1, &mut rng).is_err());
    }

    #[test]
    fn fractional_limits_sum_as_whole_counts() {
        let capped = |id| {
            upgrade(
                id,
                Progression::with_values(vec![Scalar::Integer(1)])
                    .increment(2)
                    .limit(2.5),
            )
        };
        let wheel = Wheel::new("w")
            .with_choice(WeightedChoice::upgrade("a", 1, capped("a")))
            .with_choice(WeightedChoice::upgrade("b", 1, capped("b")));
        let mut results = UpgradeResults::new();
        assert_eq!(remaining_for_wheel(&wheel, &results), Remaining::Finite(4.0));

        let mut rng = ChaCha20Rng::seed_from_u64(17);
        assert!(matches!(
            spin_many(&wheel, &mut results, 5, &mut rng),
            Err(CapacityError::InsufficientCapacity { requested: 5, .. })
        ));
        spin_many(&wheel, &mut results, 4, &mut rng).unwrap();
        assert_eq!(remaining_for_wheel(&wheel, &results), Remaining::Finite(0.0));
        for upgrade in wheel.upgrades() {
            assert_eq!(results.count_for(upgrade), 2);
            assert!(crate::progression::value(upgrade, 2).is_ok());
        }
    }

    #[test]
    fn choose_weighted_walks_cumulative_weights() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(choose_weighted(&[], &mut rng), None);
        assert_eq!(choose_weighted(&[(4, 0)], &mut rng), None);
        assert_eq!(choose_weighted(&[(2, 0), (7, 3)], &mut rng), Some(7));
    }
}
