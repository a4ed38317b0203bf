//! Progression macros and the selection-count to value calculator.

use crate::constants::{MACRO_ONE_PER, MACRO_UNIQUE};
use crate::data::{Progression, Upgrade};
use crate::document::Scalar;
use crate::error::ProgressionError;
use crate::numbers::{count_to_f64, i64_to_f64, len_to_i64};

/// Names accepted wherever a progression may be given as a string.
pub const MACRO_NAMES: [&str; 2] = [MACRO_ONE_PER, MACRO_UNIQUE];

/// Expand a progression macro. Entries are literal progressions, never
/// references to other macros.
#[must_use]
pub fn macro_progression(name: &str) -> Option<Progression> {
    match name {
        MACRO_ONE_PER => Some(Progression::with_increment(1)),
        MACRO_UNIQUE => Some(Progression::with_values(vec![Scalar::Integer(1)])),
        _ => None,
    }
}

/// Value produced by `upgrade` once it has been selected `count` times.
///
/// # Errors
///
/// Returns [`ProgressionError::NonPositiveCount`] for a zero count,
/// [`ProgressionError::LimitExceeded`] past the progression's limit, and the
/// remaining variants for progressions that cannot produce a value.
pub fn value(upgrade: &Upgrade, count: u32) -> Result<Scalar, ProgressionError> {
    let progression = upgrade.progression();
    let key = || upgrade.key().clone();

    if count == 0 {
        return Err(ProgressionError::NonPositiveCount {
            upgrade: key(),
            count,
        });
    }
    if let Some(limit) = progression.limit
        && count_to_f64(count) > limit
    {
        return Err(ProgressionError::LimitExceeded {
            upgrade: key(),
            limit,
            count,
        });
    }

    let values = &progression.values;
    let Some(last) = values.last() else {
        let increment = progression
            .increment
            .ok_or_else(|| ProgressionError::MissingValues { upgrade: key() })?;
        return i64::from(count)
            .checked_mul(increment)
            .map(Scalar::Integer)
            .ok_or_else(|| ProgressionError::Overflow {
                upgrade: key(),
                count,
            });
    };

    let index = usize::try_from(count).unwrap_or(usize::MAX);
    if index <= values.len() {
        return Ok(values[index - 1].clone());
    }

    let increment = progression
        .increment
        .ok_or_else(|| ProgressionError::MissingIncrement {
            upgrade: key(),
            len: values.len(),
        })?;
    let steps = i64::from(count) - len_to_i64(values.len());
    match last {
        Scalar::Integer(base) => steps
            .checked_mul(increment)
            .and_then(|delta| base.checked_add(delta))
            .map(Scalar::Integer)
            .ok_or_else(|| ProgressionError::Overflow {
                upgrade: key(),
                count,
            }),
        Scalar::Float(base) => Ok(Scalar::Float(
            base + i64_to_f64(steps) * i64_to_f64(increment),
        )),
        other => Err(ProgressionError::NonNumericBase {
            upgrade: key(),
            value: other.clone(),
        }),
    }
}
