//! Typed wheel model: progressions, upgrades, weighted choices and wheels.
//!
//! A [`Wheel`] tree is built once per loaded document and never mutated
//! afterwards. Upgrades are addressed by an [`UpgradeKey`] fixed at build time.

use crate::constants::{KEY_ID_SEPARATOR, KEY_PATH_SEPARATOR, KEY_SITE_SEPARATOR};
use crate::document::Scalar;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Config path of an upgrade. The first segment is always the owning game.
pub type UpgradePath = SmallVec<[String; 4]>;

/// Rule mapping a selection count to a realized value.
///
/// `values[n - 1]` is the value after `n` selections; past the end of the list
/// each further selection adds `increment`. With no values at all, the value
/// is `n * increment`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Progression {
    /// Cap on selections. Explicit limits are whole numbers; limits derived
    /// from `atMost` may be fractional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<i64>,
}

impl Progression {
    #[must_use]
    pub fn with_values(values: Vec<Scalar>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_increment(increment: i64) -> Self {
        Self {
            increment: Some(increment),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: f64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn increment(mut self, increment: i64) -> Self {
        self.increment = Some(increment);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeKind {
    /// Writes its value at `path` in the target config.
    Override,
    /// Has no config key; only reported in the summary.
    Manual,
}

/// Stable identity of an upgrade: its path joined with `.`, then `#id`.
///
/// When several choices share path and id, all but the first also carry
/// `@` and their wheel position, e.g. `G.hints#Hint@1.0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpgradeKey(String);

impl UpgradeKey {
    #[must_use]
    pub fn new(path: &[String], id: &str) -> Self {
        let sep = KEY_PATH_SEPARATOR.to_string();
        Self(format!("{}{KEY_ID_SEPARATOR}{id}", path.join(&sep)))
    }

    /// This key qualified by a wheel position (choice indexes joined by `.`).
    #[must_use]
    pub fn at_site(&self, site: &[usize]) -> Self {
        let site: Vec<String> = site.iter().map(ToString::to_string).collect();
        Self(format!(
            "{}{KEY_SITE_SEPARATOR}{}",
            self.0,
            site.join(&KEY_PATH_SEPARATOR.to_string())
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UpgradeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, path-addressed modification.
#[derive(Debug, Clone, PartialEq)]
pub struct Upgrade {
    id: String,
    kind: UpgradeKind,
    path: UpgradePath,
    progression: Progression,
    key: UpgradeKey,
}

impl Upgrade {
    /// Build an upgrade. `path` must be non-empty and start with the game.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: UpgradeKind,
        path: UpgradePath,
        progression: Progression,
    ) -> Self {
        let id = id.into();
        let key = UpgradeKey::new(&path, &id);
        Self {
            id,
            kind,
            path,
            progression,
            key,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn kind(&self) -> UpgradeKind {
        self.kind
    }

    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    #[must_use]
    pub const fn progression(&self) -> &Progression {
        &self.progression
    }

    #[must_use]
    pub const fn key(&self) -> &UpgradeKey {
        &self.key
    }

    /// `path#id` without any wheel position, shared by same-named copies.
    #[must_use]
    pub fn label(&self) -> UpgradeKey {
        UpgradeKey::new(&self.path, &self.id)
    }

    /// Re-key this upgrade to its position in the wheel.
    #[must_use]
    pub fn placed_at(mut self, site: &[usize]) -> Self {
        self.key = self.key.at_site(site);
        self
    }

    /// Owning game name (first path segment).
    #[must_use]
    pub fn game(&self) -> &str {
        self.path.first().map_or("", String::as_str)
    }

    #[must_use]
    pub const fn is_manual(&self) -> bool {
        matches!(self.kind, UpgradeKind::Manual)
    }
}

impl fmt::Display for Upgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// What a choice resolves to once picked.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceTarget {
    Wheel(Wheel),
    Upgrade(Upgrade),
}

/// One weighted option on a wheel.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedChoice {
    pub name: String,
    pub weight: u32,
    pub target: ChoiceTarget,
}

impl WeightedChoice {
    #[must_use]
    pub fn wheel(name: impl Into<String>, weight: u32, wheel: Wheel) -> Self {
        Self {
            name: name.into(),
            weight,
            target: ChoiceTarget::Wheel(wheel),
        }
    }

    #[must_use]
    pub fn upgrade(name: impl Into<String>, weight: u32, upgrade: Upgrade) -> Self {
        Self {
            name: name.into(),
            weight,
            target: ChoiceTarget::Upgrade(upgrade),
        }
    }
}

/// Named group of weighted choices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Wheel {
    pub display_name: String,
    pub game_name: Option<String>,
    pub choices: Vec<WeightedChoice>,
}

impl Wheel {
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_game(mut self, game: impl Into<String>) -> Self {
        self.game_name = Some(game.into());
        self
    }

    #[must_use]
    pub fn with_choice(mut self, choice: WeightedChoice) -> Self {
        self.choices.push(choice);
        self
    }

    /// Every terminal upgrade reachable from this wheel, depth-first in
    /// declaration order.
    #[must_use]
    pub fn upgrades(&self) -> Vec<&Upgrade> {
        let mut found = Vec::new();
        self.collect_upgrades(&mut found);
        found
    }

    fn collect_upgrades<'a>(&'a self, found: &mut Vec<&'a Upgrade>) {
        for choice in &self.choices {
            match &choice.target {
                ChoiceTarget::Wheel(wheel) => wheel.collect_upgrades(found),
                ChoiceTarget::Upgrade(upgrade) => found.push(upgrade),
            }
        }
    }

    #[must_use]
    pub fn find_upgrade(&self, key: &UpgradeKey) -> Option<&Upgrade> {
        self.choices.iter().find_map(|choice| match &choice.target {
            ChoiceTarget::Wheel(wheel) => wheel.find_upgrade(key),
            ChoiceTarget::Upgrade(upgrade) => (upgrade.key() == key).then_some(upgrade),
        })
    }

    /// Distinct game names referenced by the wheel's upgrades, in first-seen order.
    #[must_use]
    pub fn games(&self) -> Vec<&str> {
        let mut games: Vec<&str> = Vec::new();
        for upgrade in self.upgrades() {
            if !games.contains(&upgrade.game()) {
                games.push(upgrade.game());
            }
        }
        games
    }

    /// Stable hash of the wheel's upgrade identities, used to bind saved
    /// results to the wheel that produced them.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut keys: Vec<&UpgradeKey> = self.upgrades().into_iter().map(Upgrade::key).collect();
        keys.sort();
        let mut hasher = XxHash64::with_seed(0);
        for key in keys {
            hasher.write(key.as_str().as_bytes());
            hasher.write_u8(0);
        }
        hasher.finish()
    }
}
