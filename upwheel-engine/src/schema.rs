//! Structural validation of wheel documents.
//!
//! The walk is recursive descent with the owning game threaded down as an
//! argument. The first violation aborts validation.

use crate::constants::{
    KEY_AT_MOST, KEY_GAME, KEY_INCREMENT, KEY_LIMIT, KEY_NAME, KEY_PATH, KEY_PROGRESSION,
    KEY_TYPE, KEY_UPGRADE, KEY_VALUES, KEY_WEIGHT, KEY_WHEEL, PROGRESSION_KEYS,
    UPGRADE_CHOICE_KEYS, UPGRADE_KEYS, UPGRADE_TYPE_MANUAL, WHEEL_KEYS,
};
use crate::document::{DocPath, Document, DocumentMap};
use crate::error::{SchemaError, SchemaViolation};
use crate::progression::macro_progression;

/// Value shapes a key may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    String,
    Integer,
    Sequence,
    Map,
    StringOrSequence,
    StringOrMap,
    ScalarOrSequence,
}

impl Expect {
    fn accepts(self, value: &Document) -> bool {
        match self {
            Self::String => value.as_str().is_some(),
            Self::Integer => value.as_integer().is_some(),
            Self::Sequence => value.as_sequence().is_some(),
            Self::Map => value.as_map().is_some(),
            Self::StringOrSequence => value.as_str().is_some() || value.as_sequence().is_some(),
            Self::StringOrMap => value.as_str().is_some() || value.as_map().is_some(),
            Self::ScalarOrSequence => value.as_scalar().is_some() || value.as_sequence().is_some(),
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Sequence => "a sequence",
            Self::Map => "a map",
            Self::StringOrSequence => "a string or sequence",
            Self::StringOrMap => "a string or map",
            Self::ScalarOrSequence => "a scalar or sequence",
        }
    }
}

/// Allowed keys of one node kind with the shape each must hold.
struct NodeShape {
    keys: &'static [&'static str],
    expects: &'static [Expect],
}

const WHEEL_SHAPE: NodeShape = NodeShape {
    keys: &WHEEL_KEYS,
    expects: &[Expect::String, Expect::String, Expect::Integer, Expect::Sequence],
};

const UPGRADE_CHOICE_SHAPE: NodeShape = NodeShape {
    keys: &UPGRADE_CHOICE_KEYS,
    expects: &[Expect::String, Expect::Integer, Expect::Map],
};

const UPGRADE_SHAPE: NodeShape = NodeShape {
    keys: &UPGRADE_KEYS,
    expects: &[Expect::StringOrSequence, Expect::StringOrMap, Expect::String],
};

const PROGRESSION_SHAPE: NodeShape = NodeShape {
    keys: &PROGRESSION_KEYS,
    expects: &[
        Expect::Integer,
        Expect::Integer,
        Expect::ScalarOrSequence,
        Expect::Integer,
    ],
};

fn fail<T>(location: DocPath, violation: SchemaViolation) -> Result<T, SchemaError> {
    Err(SchemaError::new(location, violation))
}

fn check_fields(
    map: &DocumentMap,
    shape: &NodeShape,
    location: &DocPath,
) -> Result<(), SchemaError> {
    for (key, value) in map {
        let Some(position) = shape.keys.iter().position(|allowed| allowed == key) else {
            return fail(
                location.key(key),
                SchemaViolation::UnexpectedKey {
                    key: key.clone(),
                    allowed: shape.keys,
                },
            );
        };
        let expect = shape.expects[position];
        if !expect.accepts(value) {
            return fail(
                location.key(key),
                SchemaViolation::WrongType {
                    key: key.clone(),
                    expected: expect.label(),
                    found: value.kind_name(),
                },
            );
        }
    }
    Ok(())
}

fn require_map<'a>(
    node: &'a Document,
    location: &DocPath,
) -> Result<&'a DocumentMap, SchemaError> {
    match node.as_map() {
        Some(map) => Ok(map),
        None => fail(
            location.clone(),
            SchemaViolation::NotAMap {
                found: node.kind_name(),
            },
        ),
    }
}

fn check_positive(
    map: &DocumentMap,
    key: &'static str,
    location: &DocPath,
) -> Result<(), SchemaError> {
    match map.get(key).and_then(Document::as_integer) {
        Some(value) if value <= 0 => fail(
            location.key(key),
            SchemaViolation::NotPositive { key, value },
        ),
        _ => Ok(()),
    }
}

/// Validate a whole wheel document.
///
/// # Errors
///
/// Returns the first [`SchemaError`] found, qualified with its location.
pub fn validate_wheel_document(document: &Document) -> Result<(), SchemaError> {
    if !document.contains_key(KEY_WHEEL) {
        return fail(DocPath::root(), SchemaViolation::RootNotWheel);
    }
    validate_wheel(document, &DocPath::root(), None)
}

fn validate_wheel(
    node: &Document,
    location: &DocPath,
    inherited_game: Option<&str>,
) -> Result<(), SchemaError> {
    let map = require_map(node, location)?;
    check_fields(map, &WHEEL_SHAPE, location)?;
    check_positive(map, KEY_WEIGHT, location)?;

    let declared_game = map.get(KEY_GAME).and_then(Document::as_str);
    if let (Some(inherited), Some(declared)) = (inherited_game, declared_game)
        && !inherited.is_empty()
        && inherited != declared
    {
        return fail(
            location.key(KEY_GAME),
            SchemaViolation::GameConflict {
                declared: declared.to_string(),
                inherited: inherited.to_string(),
            },
        );
    }

    if !map.contains_key(KEY_NAME) && !map.contains_key(KEY_GAME) {
        return fail(location.clone(), SchemaViolation::MissingName);
    }

    let game = declared_game.or(inherited_game);
    let choices_location = location.key(KEY_WHEEL);
    let choices = map
        .get(KEY_WHEEL)
        .and_then(Document::as_sequence)
        .unwrap_or_default();
    for (index, choice) in choices.iter().enumerate() {
        let choice_location = choices_location.index(index);
        let is_wheel = choice.contains_key(KEY_WHEEL);
        let is_upgrade = choice.contains_key(KEY_UPGRADE);
        match (is_wheel, is_upgrade) {
            (true, true) => return fail(choice_location, SchemaViolation::AmbiguousChoice),
            (true, false) => validate_wheel(choice, &choice_location, game)?,
            (false, true) => validate_upgrade_choice(choice, &choice_location, game)?,
            (false, false) => {
                require_map(choice, &choice_location)?;
                return fail(choice_location, SchemaViolation::EmptyChoice);
            }
        }
    }
    Ok(())
}

fn validate_upgrade_choice(
    node: &Document,
    location: &DocPath,
    game: Option<&str>,
) -> Result<(), SchemaError> {
    let map = require_map(node, location)?;
    check_fields(map, &UPGRADE_CHOICE_SHAPE, location)?;

    let Some(upgrade) = map.get(KEY_UPGRADE) else {
        return fail(
            location.clone(),
            SchemaViolation::MissingKey { key: KEY_UPGRADE },
        );
    };
    if !map.contains_key(KEY_WEIGHT) {
        return fail(
            location.clone(),
            SchemaViolation::MissingKey { key: KEY_WEIGHT },
        );
    }
    check_positive(map, KEY_WEIGHT, location)?;

    validate_upgrade(upgrade, &location.key(KEY_UPGRADE), game)
}

fn validate_upgrade(
    node: &Document,
    location: &DocPath,
    game: Option<&str>,
) -> Result<(), SchemaError> {
    let map = require_map(node, location)?;
    check_fields(map, &UPGRADE_SHAPE, location)?;

    if game.is_none_or(str::is_empty) {
        return fail(location.clone(), SchemaViolation::NoGame);
    }

    let is_manual = map.get(KEY_TYPE).and_then(Document::as_str) == Some(UPGRADE_TYPE_MANUAL);
    if is_manual && map.contains_key(KEY_PATH) {
        return fail(location.key(KEY_PATH), SchemaViolation::ManualWithPath);
    }

    if let Some(segments) = map.get(KEY_PATH).and_then(Document::as_sequence) {
        let path_location = location.key(KEY_PATH);
        for (index, segment) in segments.iter().enumerate() {
            if segment.as_str().is_none() {
                return fail(
                    path_location.index(index),
                    SchemaViolation::WrongType {
                        key: KEY_PATH.to_string(),
                        expected: Expect::String.label(),
                        found: segment.kind_name(),
                    },
                );
            }
        }
    }

    let Some(progression) = map.get(KEY_PROGRESSION) else {
        return fail(
            location.clone(),
            SchemaViolation::MissingKey {
                key: KEY_PROGRESSION,
            },
        );
    };
    validate_progression(progression, &location.key(KEY_PROGRESSION))
}

fn validate_progression(node: &Document, location: &DocPath) -> Result<(), SchemaError> {
    if let Some(name) = node.as_str() {
        return match macro_progression(name) {
            Some(_) => Ok(()),
            None => fail(
                location.clone(),
                SchemaViolation::UnknownMacro(name.to_string()),
            ),
        };
    }

    let map = require_map(node, location)?;
    check_fields(map, &PROGRESSION_SHAPE, location)?;

    if map.contains_key(KEY_AT_MOST) && map.contains_key(KEY_LIMIT) {
        return fail(location.clone(), SchemaViolation::AtMostWithLimit);
    }
    check_positive(map, KEY_LIMIT, location)?;

    let values = map.get(KEY_VALUES);
    if let Some(Document::Sequence(items)) = values {
        let values_location = location.key(KEY_VALUES);
        for (index, item) in items.iter().enumerate() {
            if item.as_scalar().is_none() {
                return fail(
                    values_location.index(index),
                    SchemaViolation::WrongType {
                        key: KEY_VALUES.to_string(),
                        expected: "a scalar",
                        found: item.kind_name(),
                    },
                );
            }
        }
    }

    if let (Some(limit), Some(values)) = (map.get(KEY_LIMIT).and_then(Document::as_integer), values)
    {
        let count = values.as_sequence().map_or(1, <[Document]>::len);
        if crate::numbers::len_to_i64(count) < limit {
            return fail(
                location.clone(),
                SchemaViolation::LimitValuesMismatch { limit },
            );
        }
    }

    if values.is_none() && !map.contains_key(KEY_INCREMENT) {
        return fail(location.clone(), SchemaViolation::NoValuesOrIncrement);
    }

    if map.contains_key(KEY_AT_MOST) && map.contains_key(KEY_INCREMENT) {
        if map.get(KEY_INCREMENT).and_then(Document::as_integer) == Some(0) {
            return fail(
                location.key(KEY_INCREMENT),
                SchemaViolation::ZeroIncrementWithAtMost,
            );
        }
        let last = match values {
            Some(Document::Sequence(items)) => items.last(),
            other => other,
        };
        if let Some(last) = last
            && last.as_scalar().and_then(|scalar| scalar.as_f64()).is_none()
        {
            return fail(
                location.key(KEY_VALUES),
                SchemaViolation::NonNumericAtMostBase {
                    found: last.kind_name(),
                },
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> Document {
        serde_json::from_str(json).expect("fixture parses")
    }

    fn violation(json: &str) -> (String, SchemaViolation) {
        let err = validate_wheel_document(&doc(json)).expect_err("document should be rejected");
        (err.location.to_string(), err.violation)
    }

    #[test]
    fn accepts_nested_wheel_with_macros() {
        let document = doc(
            r#"{
                "name": "Root",
                "wheel": [
                    {"game": "Racer", "weight": 2, "wheel": [
                        {"name": "Faster", "weight": 3,
                         "upgrade": {"path": ["car", "speed"], "progression": "ONE_PER"}},
                        {"name": "Lucky", "weight": 1,
                         "upgrade": {"type": "manual", "progression": "UNIQUE"}}
                    ]},
                    {"name": "Extras", "game": "Puzzler", "wheel": [
                        {"name": "Hints", "weight": 1,
                         "upgrade": {"path": "hints", "progression": {"values": [1, 2], "increment": 1, "atMost": 5}}}
                    ]}
                ]
            }"#,
        );
        assert_eq!(validate_wheel_document(&document), Ok(()));
    }

    #[test]
    fn root_must_be_a_wheel() {
        let (location, kind) = violation(r#"{"name": "x"}"#);
        assert_eq!(location, "$");
        assert_eq!(kind, SchemaViolation::RootNotWheel);
    }

    #[test]
    fn unexpected_keys_are_named() {
        let (location, kind) = violation(r#"{"name": "x", "colour": "red", "wheel": []}"#);
        assert_eq!(location, "$.colour");
        assert!(matches!(kind, SchemaViolation::UnexpectedKey { key, .. } if key == "colour"));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let (location, kind) = violation(r#"{"name": 4, "wheel": []}"#);
        assert_eq!(location, "$.name");
        assert!(matches!(kind, SchemaViolation::WrongType { found: "integer", .. }));
    }

    #[test]
    fn wheel_needs_name_or_game() {
        let (_, kind) = violation(r#"{"wheel": []}"#);
        assert_eq!(kind, SchemaViolation::MissingName);
    }

    #[test]
    fn redeclaring_a_different_game_fails() {
        let (location, kind) = violation(
            r#"{"game": "A", "wheel": [{"game": "B", "wheel": []}]}"#,
        );
        assert_eq!(location, "$.wheel[0].game");
        assert_eq!(
            kind,
            SchemaViolation::GameConflict {
                declared: "B".into(),
                inherited: "A".into()
            }
        );
    }

    #[test]
    fn redeclaring_the_same_game_is_fine() {
        let document = doc(r#"{"game": "A", "wheel": [{"game": "A", "wheel": []}]}"#);
        assert_eq!(validate_wheel_document(&document), Ok(()));
    }

    #[test]
    fn choice_must_be_exactly_one_kind() {
        let (location, kind) = violation(
            r#"{"game": "A", "wheel": [{"wheel": [], "upgrade": {}}]}"#,
        );
        assert_eq!(location, "$.wheel[0]");
        assert_eq!(kind, SchemaViolation::AmbiguousChoice);

        let (_, kind) = violation(r#"{"game": "A", "wheel": [{"name": "lonely"}]}"#);
        assert_eq!(kind, SchemaViolation::EmptyChoice);
    }

    #[test]
    fn upgrade_choice_requires_weight() {
        let (_, kind) = violation(
            r#"{"game": "A", "wheel": [{"upgrade": {"progression": "ONE_PER"}}]}"#,
        );
        assert_eq!(kind, SchemaViolation::MissingKey { key: "weight" });
    }

    #[test]
    fn weights_must_be_positive() {
        let (location, kind) = violation(
            r#"{"game": "A", "wheel": [{"weight": 0, "upgrade": {"progression": "ONE_PER"}}]}"#,
        );
        assert_eq!(location, "$.wheel[0].weight");
        assert_eq!(
            kind,
            SchemaViolation::NotPositive {
                key: "weight",
                value: 0
            }
        );
    }

    #[test]
    fn upgrade_needs_a_game() {
        let (location, kind) = violation(
            r#"{"name": "Root", "wheel": [{"weight": 1, "upgrade": {"progression": "ONE_PER"}}]}"#,
        );
        assert_eq!(location, "$.wheel[0].upgrade");
        assert_eq!(kind, SchemaViolation::NoGame);
    }

    #[test]
    fn manual_upgrades_cannot_have_paths() {
        let (_, kind) = violation(
            r#"{"game": "A", "wheel": [{"weight": 1,
                "upgrade": {"type": "manual", "path": "x", "progression": "UNIQUE"}}]}"#,
        );
        assert_eq!(kind, SchemaViolation::ManualWithPath);
    }

    #[test]
    fn upgrade_requires_progression() {
        let (_, kind) = violation(
            r#"{"game": "A", "wheel": [{"weight": 1, "upgrade": {"path": "x"}}]}"#,
        );
        assert_eq!(kind, SchemaViolation::MissingKey { key: "progression" });
    }

    #[test]
    fn unknown_macro_is_rejected() {
        let (location, kind) = violation(
            r#"{"game": "A", "wheel": [{"weight": 1, "upgrade": {"progression": "TWICE"}}]}"#,
        );
        assert_eq!(location, "$.wheel[0].upgrade.progression");
        assert_eq!(kind, SchemaViolation::UnknownMacro("TWICE".into()));
    }

    #[test]
    fn at_most_and_limit_are_exclusive() {
        let (_, kind) = violation(
            r#"{"game": "A", "wheel": [{"weight": 1,
                "upgrade": {"progression": {"increment": 1, "atMost": 4, "limit": 2}}}]}"#,
        );
        assert_eq!(kind, SchemaViolation::AtMostWithLimit);
    }

    #[test]
    fn fewer_values_than_limit_is_rejected() {
        let (_, kind) = violation(
            r#"{"game": "A", "wheel": [{"weight": 1,
                "upgrade": {"progression": {"values": [1, 2], "limit": 3}}}]}"#,
        );
        assert_eq!(kind, SchemaViolation::LimitValuesMismatch { limit: 3 });
    }

    #[test]
    fn more_values_than_limit_passes() {
        let document = doc(
            r#"{"game": "A", "wheel": [{"weight": 1,
                "upgrade": {"progression": {"values": [1, 2, 3], "limit": 2}}}]}"#,
        );
        assert_eq!(validate_wheel_document(&document), Ok(()));
    }

    #[test]
    fn progression_needs_values_or_increment() {
        let (_, kind) = violation(
            r#"{"game": "A", "wheel": [{"weight": 1, "upgrade": {"progression": {"limit": 2}}}]}"#,
        );
        assert_eq!(kind, SchemaViolation::NoValuesOrIncrement);
    }

    #[test]
    fn at_most_needs_nonzero_increment_and_numeric_base() {
        let (_, kind) = violation(
            r#"{"game": "A", "wheel": [{"weight": 1,
                "upgrade": {"progression": {"increment": 0, "atMost": 4}}}]}"#,
        );
        assert_eq!(kind, SchemaViolation::ZeroIncrementWithAtMost);

        let (_, kind) = violation(
            r#"{"game": "A", "wheel": [{"weight": 1,
                "upgrade": {"progression": {"values": ["low"], "increment": 1, "atMost": 4}}}]}"#,
        );
        assert_eq!(kind, SchemaViolation::NonNumericAtMostBase { found: "string" });
    }

    #[test]
    fn path_segments_must_be_strings() {
        let (location, _) = violation(
            r#"{"game": "A", "wheel": [{"weight": 1,
                "upgrade": {"path": ["a", 3], "progression": "ONE_PER"}}]}"#,
        );
        assert_eq!(location, "$.wheel[0].upgrade.path[1]");
    }
}
