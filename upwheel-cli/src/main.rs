mod config;
mod io;
mod report;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};

use config::CliConfig;
use io::{
    FileResultsStorage, FileWheelLoader, prefixed_file_name, read_document, split_csv,
    write_document, write_text,
};
use report::{RunReport, generate_console_report, generate_json_report};
use upwheel_engine::{
    Document, Remaining, SpinSession, UpgradeEngine, missing_games, remaining_for_upgrade,
    with_version_header,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored, human-readable summary
    Console,
    /// Machine-readable JSON
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "upwheel", version)]
#[command(about = "Spin weighted upgrade wheels and apply the results to game configs")]
struct Args {
    /// Wheel definition file (JSON or YAML)
    #[arg(long)]
    wheel: PathBuf,

    /// Game documents to upgrade, JSON or YAML (comma-separated)
    #[arg(long, default_value = "")]
    games: String,

    /// Number of spins to perform
    #[arg(long, default_value_t = 0)]
    spins: u32,

    /// Seed for the spin stream; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Continue from results saved by an earlier run
    #[arg(long)]
    results: Option<PathBuf>,

    /// Directory receiving results, upgraded documents and the summary
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// List every upgrade on the wheel and exit
    #[arg(long)]
    list_upgrades: bool,

    /// Print the wheel's remaining capacity and exit
    #[arg(long)]
    capacity: bool,

    /// Output settings file (JSON or YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(&args)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run(args: &Args) -> Result<()> {
    let config = CliConfig::load(args.config.as_deref())?;
    let engine = UpgradeEngine::new(
        FileWheelLoader::new(&args.wheel),
        FileResultsStorage::new(&args.output_dir, config.overwrite),
    );
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut session = open_session(args, &engine, seed)?;

    if maybe_list_upgrades(args, &session)? || maybe_print_capacity(args, &session)? {
        return Ok(());
    }

    if args.report == ReportFormat::Console {
        announce_banner();
    }

    let drawn: Vec<String> = if args.spins > 0 {
        session
            .spin(args.spins)
            .context("spinning the wheel")?
            .into_iter()
            .map(|upgrade| upgrade.id().to_string())
            .collect()
    } else {
        Vec::new()
    };
    log::info!("spun {} times with seed {seed}", args.spins);

    let mut report = RunReport::from_session(&session, args.spins, drawn)?;
    if session.results().is_empty() {
        log::warn!("no upgrades selected; nothing to save");
    } else {
        let (written, missing) = save_outputs(args, &config, &engine, &session)?;
        report.written = written;
        report.missing_games = missing;
    }

    write_report(args, &report)
}

type FileEngine = UpgradeEngine<FileWheelLoader, FileResultsStorage>;

fn open_session(args: &Args, engine: &FileEngine, seed: u64) -> Result<SpinSession> {
    let Some(path) = &args.results else {
        return engine
            .create_session(seed)
            .with_context(|| format!("loading wheel {}", args.wheel.display()));
    };
    let (storage, name) = FileResultsStorage::for_file(path);
    UpgradeEngine::new(FileWheelLoader::new(&args.wheel), storage)
        .resume_session(&name, seed)
        .with_context(|| format!("resuming from {}", path.display()))?
        .with_context(|| format!("no saved results at {}", path.display()))
}

fn maybe_list_upgrades(args: &Args, session: &SpinSession) -> Result<bool> {
    if !args.list_upgrades {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(
        output_target.writer(),
        "Upgrades on {}:",
        session.wheel().display_name
    )?;
    for upgrade in session.wheel().upgrades() {
        let kind = if upgrade.is_manual() { "manual" } else { "set" };
        let remaining = match remaining_for_upgrade(upgrade, session.results()) {
            Remaining::Unlimited => "unlimited".to_string(),
            Remaining::Finite(left) => format!("{} left", left.max(0.0)),
        };
        writeln!(
            output_target.writer(),
            "  {:40} {kind:6} {remaining}",
            upgrade.key().as_str()
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn maybe_print_capacity(args: &Args, session: &SpinSession) -> Result<bool> {
    if !args.capacity {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(
        output_target.writer(),
        "{}: {}",
        session.wheel().display_name,
        session.remaining()
    )?;
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎡 Upwheel".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

/// Write saved results, upgraded documents and the summary. Returns the
/// written paths and the games that had no target document.
fn save_outputs(
    args: &Args,
    config: &CliConfig,
    engine: &FileEngine,
    session: &SpinSession,
) -> Result<(Vec<String>, Vec<String>)> {
    let mut written = Vec::new();
    let header = config.version_header.then_some(VERSION);

    if args.spins > 0 {
        engine
            .save_session(&config.results_file_name, session)
            .context("saving results")?;
        written.push(display(&args.output_dir.join(&config.results_file_name)));
    }

    let game_paths: Vec<PathBuf> = split_csv(&args.games)
        .into_iter()
        .map(PathBuf::from)
        .collect();
    let targets = game_paths
        .iter()
        .map(|path| {
            read_document::<Document>(path)
                .with_context(|| format!("loading game {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let missing = missing_games(session.wheel(), session.results(), &targets)?;
    if !missing.is_empty() {
        log::warn!(
            "no target document for {}; those upgrades are only summarized",
            missing.join(", ")
        );
    }

    let upgraded = session.apply(&targets)?;
    for (source, document) in game_paths.iter().zip(upgraded) {
        let document = match header {
            Some(version) => with_version_header(&document, version),
            None => document,
        };
        let path = args
            .output_dir
            .join(prefixed_file_name(&config.output_prefix, source));
        write_document(&path, &document, config.overwrite)?;
        written.push(display(&path));
    }

    let summary_path = args.output_dir.join(&config.summary_file_name);
    write_text(&summary_path, &session.summary(header)?, config.overwrite)?;
    written.push(display(&summary_path));

    Ok((written, missing))
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn write_report(args: &Args, report: &RunReport) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Json => generate_json_report(&mut output_target, report)?,
        ReportFormat::Console => generate_console_report(&mut output_target, report)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHEEL: &str = r#"{"game": "Racer", "wheel": [
        {"name": "Faster", "weight": 1, "upgrade": {"path": ["car", "speed"], "progression": {"values": [5, 10], "increment": 2}}},
        {"name": "Pit Crew", "weight": 1, "upgrade": {"type": "manual", "progression": "UNIQUE"}}
    ]}"#;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "upwheel-main-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn base_args(dir: &Path) -> Args {
        let wheel = dir.join("wheel.json");
        std::fs::write(&wheel, WHEEL).unwrap();
        Args {
            wheel,
            games: String::new(),
            spins: 0,
            seed: Some(1337),
            results: None,
            output_dir: dir.join("out"),
            report: ReportFormat::Json,
            list_upgrades: false,
            capacity: false,
            config: None,
            output: Some(dir.join("report.txt")),
            verbose: false,
        }
    }

    #[test]
    fn list_upgrades_writes_every_key() {
        let dir = temp_dir("list");
        let mut args = base_args(&dir);
        args.list_upgrades = true;
        run(&args).unwrap();
        let content = std::fs::read_to_string(dir.join("report.txt")).unwrap();
        assert!(content.contains("Upgrades on Racer:"));
        assert!(content.contains("Racer.car.speed#Faster"));
        assert!(content.contains("Racer#Pit Crew"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn capacity_reports_unlimited_wheels() {
        let dir = temp_dir("capacity");
        let mut args = base_args(&dir);
        args.capacity = true;
        run(&args).unwrap();
        let content = std::fs::read_to_string(dir.join("report.txt")).unwrap();
        assert_eq!(content.trim(), "Racer: unlimited");
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn spinning_writes_results_documents_and_summary() {
        let dir = temp_dir("spin");
        let game = dir.join("alice.json");
        std::fs::write(&game, r#"{"name": "alice", "Racer": {"car": {"speed": 1}}}"#).unwrap();
        let mut args = base_args(&dir);
        args.spins = 3;
        args.games = game.display().to_string();
        run(&args).unwrap();

        let out = dir.join("out");
        let upgraded: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join("upgraded-alice.json")).unwrap())
                .unwrap();
        assert_eq!(upgraded["upwheel"]["version"], VERSION);
        assert_eq!(upgraded["name"], "alice");
        assert!(out.join("upwheelResults.json").exists());
        let summary = std::fs::read_to_string(out.join("upwheelSummary.yaml")).unwrap();
        assert!(summary.starts_with("upwheel:\n"));

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("report.txt")).unwrap())
                .unwrap();
        assert_eq!(report["spins"], 3);
        assert_eq!(report["drawn"].as_array().map(Vec::len), Some(3));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn resumed_results_must_exist() {
        let dir = temp_dir("resume");
        let mut args = base_args(&dir);
        args.results = Some(dir.join("nowhere.json"));
        let err = run(&args).unwrap_err();
        assert!(format!("{err:#}").contains("no saved results"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        writeln!(target, "hello").unwrap();
        target.flush().unwrap();
    }
}
