use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use upwheel_engine::{ApplyError, SpinSession, value};

/// One selected upgrade and the value it currently realizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionLine {
    pub key: String,
    pub game: String,
    pub id: String,
    pub manual: bool,
    pub count: u32,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub wheel: String,
    pub seed: u64,
    pub spins: u32,
    pub rng_draws: u64,
    pub drawn: Vec<String>,
    pub remaining: String,
    pub selections: Vec<SelectionLine>,
    pub missing_games: Vec<String>,
    pub written: Vec<String>,
}

impl RunReport {
    /// Snapshot of `session` after a run.
    ///
    /// # Errors
    ///
    /// Returns an [`ApplyError`] if a selection cannot produce its value.
    pub fn from_session(
        session: &SpinSession,
        spins: u32,
        drawn: Vec<String>,
    ) -> Result<Self, ApplyError> {
        let wheel = session.wheel();
        let mut selections = Vec::new();
        for (key, count) in session.results().iter() {
            let upgrade = wheel
                .find_upgrade(key)
                .ok_or_else(|| ApplyError::UnknownUpgrade(key.clone()))?;
            selections.push(SelectionLine {
                key: key.to_string(),
                game: upgrade.game().to_string(),
                id: upgrade.id().to_string(),
                manual: upgrade.is_manual(),
                count,
                value: value(upgrade, count)?.to_string(),
            });
        }
        Ok(Self {
            wheel: wheel.display_name.clone(),
            seed: session.seed(),
            spins,
            rng_draws: session.draws(),
            drawn,
            remaining: session.remaining().to_string(),
            selections,
            missing_games: Vec::new(),
            written: Vec::new(),
        })
    }
}

pub fn generate_console_report<W: Write + ?Sized>(out: &mut W, report: &RunReport) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Spin Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=======================".cyan())?;
    writeln!(out, "Wheel: {}", report.wheel.bold())?;
    writeln!(out, "Seed: {}", report.seed)?;
    writeln!(out, "Spins this run: {}", report.spins)?;
    writeln!(out, "Remaining capacity: {}", report.remaining)?;
    writeln!(out)?;

    if !report.drawn.is_empty() {
        writeln!(out, "{}", "🎡 Drawn".bright_yellow().bold())?;
        for (idx, name) in report.drawn.iter().enumerate() {
            writeln!(out, "  {:>3}. {name}", idx + 1)?;
        }
        writeln!(out)?;
    }

    if report.selections.is_empty() {
        writeln!(out, "No upgrades selected.")?;
    } else {
        writeln!(out, "{}", "⬆️  Selected upgrades".bright_yellow().bold())?;
        for line in &report.selections {
            let tag = if line.manual {
                "MANUAL".magenta()
            } else {
                "SET".green()
            };
            writeln!(
                out,
                "  {tag:>6} {} x{} -> {}",
                line.key.bold(),
                line.count,
                line.value
            )?;
        }
    }

    if !report.missing_games.is_empty() {
        writeln!(out)?;
        writeln!(
            out,
            "{} no target document for: {}",
            "⚠️ ".yellow(),
            report.missing_games.join(", ").yellow()
        )?;
    }

    if !report.written.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "💾 Written".bright_green().bold())?;
        for path in &report.written {
            writeln!(out, "  • {path}")?;
        }
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(out: &mut W, report: &RunReport) -> Result<()> {
    let json_output = serde_json::to_string_pretty(report)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RunReport {
        RunReport {
            wheel: "Weekly".to_string(),
            seed: 9,
            spins: 2,
            rng_draws: 2,
            drawn: vec!["Faster".to_string(), "Extra Life".to_string()],
            remaining: "unlimited".to_string(),
            selections: vec![
                SelectionLine {
                    key: "Racer.speed#Faster".to_string(),
                    game: "Racer".to_string(),
                    id: "Faster".to_string(),
                    manual: false,
                    count: 1,
                    value: "5".to_string(),
                },
                SelectionLine {
                    key: "Quest#Extra Life".to_string(),
                    game: "Quest".to_string(),
                    id: "Extra Life".to_string(),
                    manual: true,
                    count: 1,
                    value: "1".to_string(),
                },
            ],
            missing_games: vec!["Quest".to_string()],
            written: vec!["out/upgraded-racer.json".to_string()],
        }
    }

    #[test]
    fn console_report_lists_everything() {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        generate_console_report(&mut buffer, &sample()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("Wheel: Weekly"));
        assert!(text.contains("Racer.speed#Faster x1 -> 5"));
        assert!(text.contains("MANUAL Quest#Extra Life"));
        assert!(text.contains("no target document for: Quest"));
        assert!(text.contains("out/upgraded-racer.json"));
    }

    #[test]
    fn json_report_is_machine_readable() {
        let mut buffer = Vec::new();
        generate_json_report(&mut buffer, &sample()).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed["wheel"], "Weekly");
        assert_eq!(parsed["selections"][1]["manual"], true);
        assert_eq!(parsed["missing_games"][0], "Quest");
    }
}
