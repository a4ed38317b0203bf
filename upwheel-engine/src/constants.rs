//! Centralized keys and fixed values for wheel documents.
//!
//! Every document key the validator and builder recognize lives here, so the
//! two walks can never disagree about spelling.

// Wheel document keys ------------------------------------------------------
pub const KEY_NAME: &str = "name";
pub const KEY_GAME: &str = "game";
pub const KEY_WEIGHT: &str = "weight";
pub const KEY_WHEEL: &str = "wheel";
pub const KEY_UPGRADE: &str = "upgrade";
pub const KEY_PATH: &str = "path";
pub const KEY_PROGRESSION: &str = "progression";
pub const KEY_TYPE: &str = "type";
pub const KEY_AT_MOST: &str = "atMost";
pub const KEY_LIMIT: &str = "limit";
pub const KEY_VALUES: &str = "values";
pub const KEY_INCREMENT: &str = "increment";

pub const WHEEL_KEYS: [&str; 4] = [KEY_NAME, KEY_GAME, KEY_WEIGHT, KEY_WHEEL];
pub const UPGRADE_CHOICE_KEYS: [&str; 3] = [KEY_NAME, KEY_WEIGHT, KEY_UPGRADE];
pub const UPGRADE_KEYS: [&str; 3] = [KEY_PATH, KEY_PROGRESSION, KEY_TYPE];
pub const PROGRESSION_KEYS: [&str; 4] = [KEY_AT_MOST, KEY_LIMIT, KEY_VALUES, KEY_INCREMENT];

/// Value of `type` marking an upgrade with no config key of its own.
pub const UPGRADE_TYPE_MANUAL: &str = "manual";

// Progression macros -------------------------------------------------------
pub const MACRO_ONE_PER: &str = "ONE_PER";
pub const MACRO_UNIQUE: &str = "UNIQUE";

/// Weight assigned to sub-wheel choices that do not declare one.
pub const DEFAULT_CHOICE_WEIGHT: u32 = 1;

// Output -------------------------------------------------------------------
pub const SUMMARY_INDENT: &str = "  ";
pub const HEADER_KEY: &str = "upwheel";
pub const HEADER_VERSION_KEY: &str = "version";

/// Separator between path segments inside an upgrade key.
pub const KEY_PATH_SEPARATOR: char = '.';
/// Separator between the joined path and the upgrade id inside a key.
pub const KEY_ID_SEPARATOR: char = '#';
/// Separator before the wheel position that tells apart upgrades which share
/// both path and id.
pub const KEY_SITE_SEPARATOR: char = '@';

/// Domain tag used when deriving the spin stream from a user seed.
pub(crate) const SPIN_STREAM_TAG: &[u8] = b"upwheel.spin";
