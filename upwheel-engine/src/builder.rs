//! Conversion of validated wheel documents into the typed wheel model.
//!
//! The owning game is threaded down the walk: a node only replaces it when it
//! declares its own. Every upgrade gets its [`UpgradeKey`] here; repeated
//! `path#id` pairs are told apart by their wheel position.

use crate::constants::{
    DEFAULT_CHOICE_WEIGHT, KEY_AT_MOST, KEY_GAME, KEY_INCREMENT, KEY_LIMIT, KEY_NAME, KEY_PATH,
    KEY_PROGRESSION, KEY_TYPE, KEY_UPGRADE, KEY_VALUES, KEY_WEIGHT, KEY_WHEEL,
    UPGRADE_TYPE_MANUAL,
};
use crate::data::{
    Progression, Upgrade, UpgradeKey, UpgradeKind, UpgradePath, WeightedChoice, Wheel,
};
use crate::document::{DocPath, Document, DocumentMap, Scalar};
use crate::error::{SchemaError, SchemaViolation};
use crate::numbers::{i64_to_f64, len_to_f64};
use crate::progression::macro_progression;
use crate::schema::validate_wheel_document;
use std::collections::HashSet;

/// Validate `document` and build its wheel.
///
/// # Errors
///
/// Returns the first [`SchemaError`] raised by validation or building. No
/// partial wheel is ever returned.
pub fn load_wheel_document(document: &Document) -> Result<Wheel, SchemaError> {
    validate_wheel_document(document)?;
    build_wheel(document)
}

/// Build a wheel from a document that already passed validation.
///
/// # Errors
///
/// Returns a [`SchemaError`] if the document violates an invariant the
/// builder depends on, or if two upgrades still share a key after
/// position-qualifying the later one.
pub fn build_wheel(document: &Document) -> Result<Wheel, SchemaError> {
    let mut builder = TreeBuilder::default();
    let wheel = builder.wheel(document, &DocPath::root(), None, &[])?;
    log::debug!(
        "built wheel '{}' with {} upgrades",
        wheel.display_name,
        builder.seen.len()
    );
    Ok(wheel)
}

fn schema_err(location: DocPath, violation: SchemaViolation) -> SchemaError {
    SchemaError::new(location, violation)
}

fn as_map<'a>(node: &'a Document, location: &DocPath) -> Result<&'a DocumentMap, SchemaError> {
    node.as_map().ok_or_else(|| {
        schema_err(
            location.clone(),
            SchemaViolation::NotAMap {
                found: node.kind_name(),
            },
        )
    })
}

fn display_name(map: &DocumentMap) -> String {
    map.get(KEY_NAME)
        .or_else(|| map.get(KEY_GAME))
        .and_then(Document::as_str)
        .unwrap_or_default()
        .to_string()
}

fn choice_weight(map: &DocumentMap, location: &DocPath) -> Result<u32, SchemaError> {
    let Some(weight) = map.get(KEY_WEIGHT).and_then(Document::as_integer) else {
        return Ok(DEFAULT_CHOICE_WEIGHT);
    };
    u32::try_from(weight)
        .ok()
        .filter(|weight| *weight > 0)
        .ok_or_else(|| {
            schema_err(
                location.key(KEY_WEIGHT),
                SchemaViolation::NotPositive {
                    key: KEY_WEIGHT,
                    value: weight,
                },
            )
        })
}

#[derive(Default)]
struct TreeBuilder {
    seen: HashSet<UpgradeKey>,
}

impl TreeBuilder {
    fn wheel(
        &mut self,
        node: &Document,
        location: &DocPath,
        inherited_game: Option<&str>,
        site: &[usize],
    ) -> Result<Wheel, SchemaError> {
        let map = as_map(node, location)?;
        let game = map
            .get(KEY_GAME)
            .and_then(Document::as_str)
            .or(inherited_game);

        let mut wheel = Wheel::new(display_name(map));
        wheel.game_name = game.map(str::to_string);

        let choices_location = location.key(KEY_WHEEL);
        let choices = map
            .get(KEY_WHEEL)
            .and_then(Document::as_sequence)
            .unwrap_or_default();
        for (index, choice) in choices.iter().enumerate() {
            let choice_location = choices_location.index(index);
            let mut choice_site = site.to_vec();
            choice_site.push(index);
            let choice_map = as_map(choice, &choice_location)?;
            let name = display_name(choice_map);
            let weight = choice_weight(choice_map, &choice_location)?;

            if choice_map.contains_key(KEY_WHEEL) {
                let sub_wheel = self.wheel(choice, &choice_location, game, &choice_site)?;
                wheel.choices.push(WeightedChoice::wheel(name, weight, sub_wheel));
            } else if let Some(upgrade) = choice_map.get(KEY_UPGRADE) {
                let upgrade_location = choice_location.key(KEY_UPGRADE);
                let upgrade =
                    self.upgrade(upgrade, &upgrade_location, game, &name, &choice_site)?;
                wheel.choices.push(WeightedChoice::upgrade(name, weight, upgrade));
            } else {
                return Err(schema_err(choice_location, SchemaViolation::EmptyChoice));
            }
        }
        Ok(wheel)
    }

    fn upgrade(
        &mut self,
        node: &Document,
        location: &DocPath,
        game: Option<&str>,
        id: &str,
        site: &[usize],
    ) -> Result<Upgrade, SchemaError> {
        let map = as_map(node, location)?;
        let Some(game) = game.filter(|game| !game.is_empty()) else {
            return Err(schema_err(location.clone(), SchemaViolation::NoGame));
        };

        let mut path: UpgradePath = match map.get(KEY_PATH) {
            Some(Document::Sequence(segments)) => segments
                .iter()
                .filter_map(Document::as_str)
                .map(str::to_string)
                .collect(),
            Some(Document::Scalar(Scalar::String(segment))) if !segment.is_empty() => {
                std::iter::once(segment.clone()).collect()
            }
            _ => UpgradePath::new(),
        };
        if path.first().map(String::as_str) != Some(game) {
            path.insert(0, game.to_string());
        }

        let kind = if map.get(KEY_TYPE).and_then(Document::as_str) == Some(UPGRADE_TYPE_MANUAL) {
            UpgradeKind::Manual
        } else {
            UpgradeKind::Override
        };

        let progression_location = location.key(KEY_PROGRESSION);
        let progression = map
            .get(KEY_PROGRESSION)
            .ok_or_else(|| {
                schema_err(
                    location.clone(),
                    SchemaViolation::MissingKey {
                        key: KEY_PROGRESSION,
                    },
                )
            })
            .and_then(|node| build_progression(node, &progression_location))?;

        let mut upgrade = Upgrade::new(id, kind, path, progression);
        if self.seen.contains(upgrade.key()) {
            upgrade = upgrade.placed_at(site);
            log::debug!(
                "upgrade {} is offered more than once; keyed as {}",
                upgrade.label(),
                upgrade.key()
            );
        }
        if !self.seen.insert(upgrade.key().clone()) {
            return Err(schema_err(
                location.clone(),
                SchemaViolation::DuplicateUpgrade(upgrade.key().to_string()),
            ));
        }
        log::trace!("built upgrade {}", upgrade.key());
        Ok(upgrade)
    }
}

fn build_progression(node: &Document, location: &DocPath) -> Result<Progression, SchemaError> {
    if let Some(name) = node.as_str() {
        return macro_progression(name).ok_or_else(|| {
            schema_err(
                location.clone(),
                SchemaViolation::UnknownMacro(name.to_string()),
            )
        });
    }

    let map = as_map(node, location)?;
    let at_most = map.get(KEY_AT_MOST).and_then(Document::as_integer);
    let increment = map.get(KEY_INCREMENT).and_then(Document::as_integer);
    let values: Vec<Scalar> = match map.get(KEY_VALUES) {
        Some(Document::Sequence(items)) => items
            .iter()
            .filter_map(Document::as_scalar)
            .cloned()
            .collect(),
        Some(Document::Scalar(single)) => vec![single.clone()],
        _ => Vec::new(),
    };

    if !map.contains_key(KEY_VALUES) && increment.is_none() {
        return Err(schema_err(
            location.clone(),
            SchemaViolation::NoValuesOrIncrement,
        ));
    }

    let mut limit = map
        .get(KEY_LIMIT)
        .and_then(Document::as_integer)
        .map(i64_to_f64);

    if let (Some(increment), None, Some(at_most)) = (increment, limit, at_most) {
        if increment == 0 {
            return Err(schema_err(
                location.key(KEY_INCREMENT),
                SchemaViolation::ZeroIncrementWithAtMost,
            ));
        }
        let last_value = match values.last() {
            Some(last) => last.as_f64().ok_or_else(|| {
                schema_err(
                    location.key(KEY_VALUES),
                    SchemaViolation::NonNumericAtMostBase {
                        found: last.kind_name(),
                    },
                )
            })?,
            None => 0.0,
        };
        // Unrounded: a fractional limit admits every whole count below it.
        let remaining_steps = (i64_to_f64(at_most) - last_value) / i64_to_f64(increment);
        limit = Some(len_to_f64(values.len()) + remaining_steps);
    }

    Ok(Progression {
        limit,
        values,
        increment,
    })
}
