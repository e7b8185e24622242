//! laser-kinematics CLI
//!
//! Pose-tracking kinematics aligned to laser stimulation events.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use laser_kinematics::{
    audit::create_shared_log_with_persistence,
    batch::{run_batch, Manifest, ManifestEntry},
    config::{AnalysisConfig, Config},
    core::{ExportBuilder, ExportTable, SubjectReport, SummaryExport},
    core::summary::FailedSubject,
    FirstFramePolicy, VERSION,
};

#[derive(Parser)]
#[command(name = "laser-kinematics")]
#[command(version = VERSION)]
#[command(about = "Pose-tracking kinematics aligned to laser stimulation events", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single subject
    Analyze {
        /// DeepLabCut coordinate CSV
        #[arg(long)]
        coordinates: PathBuf,

        /// Laser event file (.json or .csv)
        #[arg(long)]
        events: PathBuf,

        /// Subject identifier (defaults to the event file name prefix)
        #[arg(long)]
        subject: Option<String>,

        /// Directory for the summary export
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Analyze every subject listed in a JSON manifest
    Batch {
        /// Manifest file
        manifest: PathBuf,

        /// Worker threads
        #[arg(long, short, default_value = "1")]
        jobs: usize,

        /// Directory for the summary export
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Show cumulative run statistics
    Status,

    /// Show configuration
    Config {
        /// Write the effective configuration back to the config file
        #[arg(long)]
        save: bool,
    },
}

/// Per-run overrides of the configured analysis parameters.
#[derive(Args)]
struct AnalysisArgs {
    /// Video frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Number of laser events to analyze
    #[arg(long)]
    event_count: Option<usize>,

    /// Outlier threshold in standard deviations
    #[arg(long)]
    threshold: Option<f64>,

    /// Velocity lookback in seconds
    #[arg(long)]
    velocity_window: Option<f64>,

    /// Pre/post sample offset in seconds
    #[arg(long)]
    align_offset: Option<f64>,

    /// Handling of an outlier at frame 0
    #[arg(long, value_enum)]
    first_frame: Option<FirstFrameArg>,

    /// Only analyze the first N frames
    #[arg(long)]
    max_frames: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FirstFrameArg {
    Skip,
    Wrap,
}

impl AnalysisArgs {
    fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(count) = self.event_count {
            config.event_count = count;
        }
        if let Some(threshold) = self.threshold {
            config.threshold_multiplier = threshold;
        }
        if let Some(window) = self.velocity_window {
            config.velocity_window_secs = window;
        }
        if let Some(offset) = self.align_offset {
            config.align_offset_secs = offset;
        }
        if let Some(policy) = self.first_frame {
            config.first_frame_policy = match policy {
                FirstFrameArg::Skip => FirstFramePolicy::Skip,
                FirstFrameArg::Wrap => FirstFramePolicy::Wrap,
            };
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Analyze {
            coordinates,
            events,
            subject,
            output,
            analysis,
        } => cmd_analyze(config, coordinates, events, subject, output, &analysis),
        Commands::Batch {
            manifest,
            jobs,
            output,
            analysis,
        } => cmd_batch(config, &manifest, jobs, output, &analysis),
        Commands::Status => cmd_status(&config),
        Commands::Config { save } => cmd_config(&config, save),
    });

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    config.context("could not load configuration")
}

fn cmd_analyze(
    mut config: Config,
    coordinates: PathBuf,
    events: PathBuf,
    subject: Option<String>,
    output: Option<PathBuf>,
    analysis: &AnalysisArgs,
) -> anyhow::Result<()> {
    analysis.apply(&mut config.analysis);
    config.analysis.validate()?;
    config.ensure_directories()?;

    let entry = ManifestEntry {
        coordinates,
        events,
        subject,
    };
    let ledger = create_shared_log_with_persistence(config.data_path.join("ledger.json"));

    let report = match entry.analyze(&config.analysis) {
        Ok(report) => report,
        Err(e) => {
            ledger.record_failure();
            save_ledger(&ledger);
            return Err(e.into());
        }
    };
    ledger.record_subject(&report);

    print_report(&report);

    let export = ExportBuilder::new().build(&config.analysis, vec![report], Vec::new());
    write_export(&export, output.unwrap_or_else(|| config.export_path.clone()))?;
    save_ledger(&ledger);
    Ok(())
}

fn cmd_batch(
    mut config: Config,
    manifest: &Path,
    jobs: usize,
    output: Option<PathBuf>,
    analysis: &AnalysisArgs,
) -> anyhow::Result<()> {
    analysis.apply(&mut config.analysis);
    config.analysis.validate()?;
    config.ensure_directories()?;

    let manifest = Manifest::load(manifest)
        .with_context(|| format!("could not load manifest {manifest:?}"))?;
    if manifest.subjects.is_empty() {
        bail!("manifest lists no subjects");
    }

    println!("laser-kinematics v{VERSION}");
    println!("Analyzing {} subject(s) on {jobs} thread(s)", manifest.subjects.len());
    println!();

    let ledger = create_shared_log_with_persistence(config.data_path.join("ledger.json"));
    let results = run_batch(&manifest.subjects, &config.analysis, jobs, &ledger);

    let mut reports = Vec::new();
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(report) => {
                print_report(&report);
                reports.push(report);
            }
            Err(e) => {
                eprintln!("Warning: {e}");
                failed.push(FailedSubject {
                    subject: e.subject.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    if reports.is_empty() {
        save_ledger(&ledger);
        bail!("no subject could be analyzed");
    }

    let export = ExportBuilder::new().build(&config.analysis, reports, failed);
    println!("Group means over {} subject(s):", export.group.subjects);
    println!("  Velocity @ laser on:  {}", pair(export.group.velocity_on));
    println!("  Velocity @ laser off: {}", pair(export.group.velocity_off));
    println!("  Angle @ laser on:     {}", pair(export.group.angle_on));
    println!("  Angle @ laser off:    {}", pair(export.group.angle_off));
    println!();

    write_export(&export, output.unwrap_or_else(|| config.export_path.clone()))?;
    save_ledger(&ledger);

    println!();
    println!("{}", ledger.summary());
    Ok(())
}

fn cmd_status(config: &Config) -> anyhow::Result<()> {
    println!("laser-kinematics Status");
    println!("=======================");
    println!();

    let stats_path = config.data_path.join("ledger.json");
    if stats_path.exists() {
        let ledger = create_shared_log_with_persistence(stats_path);
        println!("{}", ledger.summary());
    } else {
        println!("No previous run data found.");
    }
    Ok(())
}

fn cmd_config(config: &Config, save: bool) -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        config.save()?;
        println!();
        println!("Saved to {:?}", Config::config_path());
    }
    Ok(())
}

fn print_report(report: &SubjectReport) {
    let summary = &report.summary;
    println!(
        "[{}] {} frames, {} events, {} positions corrected, distance {:.1}",
        summary.subject,
        report.frames,
        report.events,
        report.corrected_frames(),
        report.total_displacement
    );
    println!("  Velocity @ laser on:  {}", pair(summary.velocity_on));
    println!("  Velocity @ laser off: {}", pair(summary.velocity_off));
    println!("  Angle @ laser on:     {}", pair(summary.angle_on));
    println!("  Angle @ laser off:    {}", pair(summary.angle_off));
    if !report.degenerate_angle_frames.is_empty() {
        println!(
            "  ({} frames with undefined body angle)",
            report.degenerate_angle_frames.len()
        );
    }
    println!();
}

fn pair(window: laser_kinematics::AlignedWindow) -> String {
    format!("pre {:.3} -> post {:.3}", window.pre, window.post)
}

/// Write the JSON export and the wide CSV table side by side.
fn write_export(export: &SummaryExport, dir: PathBuf) -> anyhow::Result<()> {
    std::fs::create_dir_all(&dir).with_context(|| format!("could not create {dir:?}"))?;
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");

    let json_path = dir.join(format!("summary_{stamp}.json"));
    let json = serde_json::to_string_pretty(export)?;
    std::fs::write(&json_path, json).with_context(|| format!("could not write {json_path:?}"))?;

    let table: ExportTable = export.subjects.iter().map(|r| r.summary.clone()).collect();
    let csv_path = dir.join(format!("summary_{stamp}.csv"));
    std::fs::write(&csv_path, table.to_csv())
        .with_context(|| format!("could not write {csv_path:?}"))?;

    println!("Exported {} subject(s) to {:?}", export.subjects.len(), json_path);
    println!("Export table written to {csv_path:?}");
    Ok(())
}

fn save_ledger(ledger: &laser_kinematics::SharedRunLog) {
    if let Err(e) = ledger.save() {
        eprintln!("Warning: Could not save run ledger: {e}");
    }
}
