//! Merging selected upgrades into target configuration documents.

use crate::constants::{HEADER_KEY, HEADER_VERSION_KEY};
use crate::data::{Upgrade, Wheel};
use crate::document::{Document, DocumentMap, Scalar};
use crate::error::ApplyError;
use crate::progression::value;
use crate::results::UpgradeResults;
use std::collections::BTreeSet;

/// Every selected upgrade with its count, ordered by path, then id, then key.
pub(crate) fn sorted_selections<'w>(
    wheel: &'w Wheel,
    results: &UpgradeResults,
) -> Result<Vec<(&'w Upgrade, u32)>, ApplyError> {
    let mut selections = results
        .iter()
        .map(|(key, count)| {
            wheel
                .find_upgrade(key)
                .map(|upgrade| (upgrade, count))
                .ok_or_else(|| ApplyError::UnknownUpgrade(key.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    selections.sort_by(|(a, _), (b, _)| {
        a.path()
            .cmp(b.path())
            .then_with(|| a.id().cmp(b.id()))
            .then_with(|| a.key().cmp(b.key()))
    });
    Ok(selections)
}

/// Merge `update` into `target`.
///
/// Nested maps merge key by key; any other value replaces what was there.
/// A non-map value sitting where the update needs a map is replaced by one.
pub fn deep_merge(target: &mut DocumentMap, update: DocumentMap) {
    for (key, incoming) in update {
        match incoming {
            Document::Map(nested) => {
                let slot = target.entry(key).or_insert_with(Document::map);
                if !matches!(slot, Document::Map(_)) {
                    *slot = Document::map();
                }
                if let Document::Map(existing) = slot {
                    deep_merge(existing, nested);
                }
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}

/// Single-branch map mirroring `path` with `leaf` at the end.
/// Returns `None` for an empty path.
#[must_use]
pub fn nested_update(path: &[String], leaf: Scalar) -> Option<DocumentMap> {
    let (last, parents) = path.split_last()?;
    let mut node = DocumentMap::new();
    node.insert(last.clone(), Document::Scalar(leaf));
    for step in parents.iter().rev() {
        let mut parent = DocumentMap::new();
        parent.insert(step.clone(), Document::Map(node));
        node = parent;
    }
    Some(node)
}

fn declares_game(document: &Document, game: &str) -> bool {
    document.contains_key(game)
}

/// Apply `results` to copies of `targets`.
///
/// Each override upgrade is merged into every target whose top level holds
/// its game. Manual upgrades never touch a document. The inputs are left
/// untouched; the returned documents line up with `targets`.
///
/// # Errors
///
/// Returns [`ApplyError::UnknownUpgrade`] for results the wheel does not
/// contain, or [`ApplyError::Progression`] when a value cannot be produced.
pub fn apply_upgrades(
    wheel: &Wheel,
    results: &UpgradeResults,
    targets: &[Document],
) -> Result<Vec<Document>, ApplyError> {
    let mut updated = targets.to_vec();
    for (upgrade, count) in sorted_selections(wheel, results)? {
        if upgrade.is_manual() {
            continue;
        }
        let leaf = value(upgrade, count)?;
        let Some(update) = nested_update(upgrade.path(), leaf) else {
            continue;
        };
        for document in &mut updated {
            if !declares_game(document, upgrade.game()) {
                continue;
            }
            if let Document::Map(map) = document {
                deep_merge(map, update.clone());
            }
        }
        log::debug!("applied {} x{count}", upgrade.key());
    }
    Ok(updated)
}

/// Games with selected upgrades that no target document declares, sorted.
///
/// # Errors
///
/// Returns [`ApplyError::UnknownUpgrade`] for results the wheel does not
/// contain.
pub fn missing_games(
    wheel: &Wheel,
    results: &UpgradeResults,
    targets: &[Document],
) -> Result<Vec<String>, ApplyError> {
    let games: BTreeSet<&str> = sorted_selections(wheel, results)?
        .into_iter()
        .map(|(upgrade, _)| upgrade.game())
        .filter(|game| !targets.iter().any(|document| declares_game(document, game)))
        .collect();
    Ok(games.into_iter().map(str::to_string).collect())
}

/// Copy of `document` with a `upwheel: { version }` block as its first key.
///
/// Non-map documents are returned unchanged.
#[must_use]
pub fn with_version_header(document: &Document, version: &str) -> Document {
    let Document::Map(original) = document else {
        return document.clone();
    };
    let mut header = DocumentMap::new();
    header.insert(HEADER_VERSION_KEY.to_string(), Document::from(version));
    let mut headed = DocumentMap::with_capacity(original.len() + 1);
    headed.insert(HEADER_KEY.to_string(), Document::Map(header));
    for (key, node) in original {
        headed.insert(key.clone(), node.clone());
    }
    Document::Map(headed)
}
