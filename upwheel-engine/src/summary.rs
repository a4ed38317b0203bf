//! Human-readable, YAML-shaped summary of selected upgrades.

use crate::apply::sorted_selections;
use crate::constants::{HEADER_KEY, HEADER_VERSION_KEY, SUMMARY_INDENT};
use crate::data::Wheel;
use crate::error::ApplyError;
use crate::progression::value;
use crate::results::UpgradeResults;
use std::fmt::Write as _;

fn indent(level: usize) -> String {
    SUMMARY_INDENT.repeat(level)
}

/// Render the summary for `results`, optionally headed by a version block.
///
/// Entries are sorted by path. Path steps shared with the previous entry
/// are not repeated. Manual upgrades become comments under their game.
///
/// # Errors
///
/// Returns [`ApplyError`] for results the wheel does not contain or values
/// the progression cannot produce.
pub fn render_summary(
    wheel: &Wheel,
    results: &UpgradeResults,
    version: Option<&str>,
) -> Result<String, ApplyError> {
    let mut output = String::new();
    if let Some(version) = version {
        let _ = writeln!(output, "{HEADER_KEY}:");
        let _ = writeln!(output, "{}{HEADER_VERSION_KEY}: {version}", indent(1));
    }

    let mut last_path: &[String] = &[];
    for (upgrade, count) in sorted_selections(wheel, results)? {
        let current = upgrade.path();
        let leaf = value(upgrade, count)?;

        if upgrade.is_manual() {
            let game = upgrade.game();
            if last_path.first().map(String::as_str) != Some(game) {
                let _ = writeln!(output, "{game}:");
            }
            let _ = writeln!(output, "{}# MANUAL - {}: {leaf}", indent(1), upgrade.id());
        } else {
            let shared = current
                .iter()
                .zip(last_path)
                .take_while(|(step, previous)| step == previous)
                .count();
            for (depth, step) in current.iter().enumerate().skip(shared) {
                if depth + 1 < current.len() {
                    let _ = writeln!(output, "{}{step}:", indent(depth));
                } else {
                    let _ = writeln!(output, "{}{step}: {leaf}", indent(depth));
                }
            }
        }
        last_path = current;
    }
    Ok(output)
}
