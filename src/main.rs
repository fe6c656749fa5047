//! Twotone - binary outcome tracker
//!
//! Command-line front end: replay a sequence through the predictor ensemble,
//! classify a single frame, or monitor an image file that a screenshot tool
//! keeps refreshing.

use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use twotone::{
    spawn_monitor, CaptureRegion, CaptureSource, Engine, FileCaptureSource, MonitorEvent,
    MonitorHandle, Outcome, OutcomeEntry, RegionClassifier, Sensitivity, Settings, Tracker, TrackerSnapshot,
    TwotoneError, DEBOUNCE_MS,
};

/// Entries shown by the `Recent:` line.
const RECENT_SHOWN: usize = 20;

#[derive(Parser)]
#[command(name = "twotone")]
#[command(version)]
#[command(about = "Track binary outcomes, score heuristic predictors, sample a screen region", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (defaults to <config dir>/twotone/settings.json)
    #[arg(short, long, global = true, env = "TWOTONE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a sequence of outcomes through a fresh tracker
    Replay {
        /// Outcomes, e.g. "AAOAO" or "alpha,omega,alpha"
        sequence: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify one image and apply the detection rule
    Classify {
        /// Image file
        image: PathBuf,

        /// Capture region as x,y,width,height
        #[arg(short, long)]
        region: Option<CaptureRegion>,

        /// Detection threshold in percent (10-50, step 5)
        #[arg(short, long, env = "TWOTONE_SENSITIVITY")]
        sensitivity: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sample an image file every 30 seconds and record detections
    ///
    /// Reads commands from stdin while running: `a`/`alpha`, `o`/`omega`,
    /// `clear`, `sensitivity N`, `status`, `stop`.
    Monitor {
        /// Image file refreshed by an external screenshot tool
        image: Option<PathBuf>,

        /// Capture region as x,y,width,height
        #[arg(short, long)]
        region: Option<CaptureRegion>,

        /// Detection threshold in percent (10-50, step 5)
        #[arg(short, long, env = "TWOTONE_SENSITIVITY")]
        sensitivity: Option<u32>,

        /// Exit after this many sampling cycles
        #[arg(long, value_name = "N")]
        max_ticks: Option<u64>,
    },

    /// Inspect settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective settings as JSON
    Show,

    /// Check the settings file
    Validate,

    /// Print the settings file location
    Path,

    /// Write default settings to the settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "twotone=debug,info"
    } else {
        "twotone=info,warn"
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        let code = e
            .downcast_ref::<TwotoneError>()
            .map_or(1, TwotoneError::exit_code);
        std::process::exit(code);
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings_path = match cli.config {
        Some(path) => path,
        None => Settings::default_path()?,
    };

    match cli.command {
        Commands::Replay { sequence, json } => {
            let outcomes = Outcome::parse_sequence(&sequence)?;
            let mut tracker = Tracker::new();
            let start = Utc::now();
            for (i, outcome) in outcomes.iter().enumerate() {
                let at = start + Duration::milliseconds(DEBOUNCE_MS * i as i64);
                tracker.dispatch(*outcome, at);
            }

            let snapshot = tracker.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot);
            }
        }

        Commands::Classify {
            image,
            region,
            sensitivity,
            json,
        } => {
            let settings = Settings::load(&settings_path)?;
            let region = resolve_region(region, &settings)?;
            let sensitivity = resolve_sensitivity(sensitivity, &settings)?;

            let stream = FileCaptureSource::new(&image).acquire().await?;
            let raster = stream.read_region(region).await?;
            let sample = RegionClassifier::new().classify(&raster);
            let detected = sample.decide(sensitivity);

            if json {
                let output = serde_json::json!({
                    "image": image,
                    "region": region,
                    "sensitivity": sensitivity,
                    "leftBlue": sample.left_blue,
                    "rightPurple": sample.right_purple,
                    "detected": detected,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("\n{} {} at {}", "Classify:".cyan().bold(), image.display(), region);
                println!("{}", "─".repeat(40));
                println!("   Left blue:     {:>6.1}%", sample.left_blue * 100.0);
                println!("   Right purple:  {:>6.1}%", sample.right_purple * 100.0);
                println!("   Threshold:     {:>6}", sensitivity.to_string());
                match detected {
                    Some(outcome) => println!("   Detected:      {}", outcome.to_string().green().bold()),
                    None => println!("   Detected:      {}", "nothing".yellow()),
                }
            }
        }

        Commands::Monitor {
            image,
            region,
            sensitivity,
            max_ticks,
        } => {
            let settings = Settings::load(&settings_path)?;
            let region = resolve_region(region, &settings)?;
            let sensitivity = resolve_sensitivity(sensitivity, &settings)?;
            let image = image.or_else(|| settings.frame_path.clone()).ok_or_else(|| {
                TwotoneError::invalid_config("framePath", "pass an image path or set framePath in settings")
            })?;

            monitor(&image, region, sensitivity, &settings, max_ticks).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let settings = Settings::load(&settings_path)?;
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            ConfigAction::Validate => {
                let settings = Settings::load(&settings_path)?;
                settings
                    .validate()
                    .map_err(|reason| TwotoneError::invalid_config("settings", reason))?;
                println!(
                    "{} {} is valid",
                    "OK".green().bold(),
                    settings_path.display()
                );
            }
            ConfigAction::Path => {
                println!("{}", settings_path.display());
            }
            ConfigAction::Init { force } => {
                if settings_path.exists() && !force {
                    return Err(TwotoneError::config_with_path(
                        "settings file already exists (use --force to overwrite)",
                        settings_path,
                    )
                    .into());
                }
                Settings::default().save(&settings_path)?;
                println!(
                    "{} wrote {}",
                    "OK".green().bold(),
                    settings_path.display()
                );
            }
        },
    }

    Ok(())
}

fn resolve_region(flag: Option<CaptureRegion>, settings: &Settings) -> twotone::Result<CaptureRegion> {
    let region = flag.or(settings.region).ok_or_else(|| {
        TwotoneError::invalid_config("region", "pass --region x,y,width,height or set region in settings")
    })?;
    region.validate()?;
    Ok(region)
}

fn resolve_sensitivity(flag: Option<u32>, settings: &Settings) -> twotone::Result<Sensitivity> {
    match flag {
        Some(value) => Sensitivity::new(value),
        None => settings.sensitivity(),
    }
}

// =============================================================================
// Monitor
// =============================================================================

/// A line typed while monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StdinCommand {
    Record(Outcome),
    Clear,
    Sensitivity(u32),
    Status,
    Stop,
}

fn parse_command(line: &str) -> Result<StdinCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".to_string());
    };

    match head.to_lowercase().as_str() {
        "clear" => Ok(StdinCommand::Clear),
        "status" | "s" => Ok(StdinCommand::Status),
        "stop" | "quit" | "q" => Ok(StdinCommand::Stop),
        "sensitivity" => words
            .next()
            .and_then(|value| value.parse().ok())
            .map(StdinCommand::Sensitivity)
            .ok_or_else(|| "usage: sensitivity <10-50>".to_string()),
        other => other
            .parse::<Outcome>()
            .map(StdinCommand::Record)
            .map_err(|_| format!("unknown command '{}'", head)),
    }
}

async fn monitor(
    image: &Path,
    region: CaptureRegion,
    sensitivity: Sensitivity,
    settings: &Settings,
    max_ticks: Option<u64>,
) -> anyhow::Result<()> {
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let engine = Engine::new(FileCaptureSource::new(image))
        .with_capture_timeout(settings.capture_timeout())
        .with_events(event_tx);
    let (handle, task) = spawn_monitor(engine);

    handle.start(region, sensitivity).await?;
    println!(
        "{} sampling {} every 30s, type a/o to record, 'stop' to finish",
        "Monitor:".cyan().bold(),
        image.display()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match parse_command(&line) {
                    Ok(StdinCommand::Stop) => break,
                    Ok(command) => run_command(&handle, command).await?,
                    Err(message) => eprintln!("{} {}", "Warning:".yellow(), message),
                },
                None => stdin_open = false,
            },
            event = events.recv() => {
                let Some(event) = event else { break };
                if matches!(event, MonitorEvent::Tick { .. } | MonitorEvent::FrameFailed { .. }) {
                    ticks += 1;
                }
                print_event(&event);
                if matches!(event, MonitorEvent::Recorded(_)) {
                    print_best(&handle.snapshot().await?);
                }
                if max_ticks.is_some_and(|max| ticks >= max) {
                    break;
                }
            }
        }
    }

    handle.shutdown().await?;
    let engine = task.await?;
    print_snapshot(&engine.snapshot());
    Ok(())
}

async fn run_command(handle: &MonitorHandle, command: StdinCommand) -> anyhow::Result<()> {
    match command {
        StdinCommand::Record(outcome) => {
            // the resulting Recorded/Debounced event is printed by the event loop
            handle.add_outcome(outcome).await?;
        }
        StdinCommand::Clear => {
            handle.clear().await?;
            println!("{} History cleared", "OK".green());
        }
        StdinCommand::Sensitivity(value) => match handle.set_sensitivity(value).await {
            Ok(sensitivity) => println!("{} Sensitivity set to {}", "OK".green(), sensitivity),
            Err(e) if e.is_validation() => eprintln!("{} {}", "Warning:".yellow(), e),
            Err(e) => return Err(e.into()),
        },
        StdinCommand::Status => print_snapshot(&handle.snapshot().await?),
        StdinCommand::Stop => {}
    }
    Ok(())
}

fn print_event(event: &MonitorEvent) {
    match event {
        MonitorEvent::Started {
            session_id,
            region,
            sensitivity,
        } => println!(
            "   Session {} started: region {}, threshold {}",
            session_id, region, sensitivity
        ),
        MonitorEvent::Tick {
            tick,
            sample,
            detected,
            ..
        } => {
            let detected = detected.map_or_else(|| "-".dimmed().to_string(), |o| o.to_string().bold().to_string());
            println!(
                "   [{:>4}] blue {:>5.1}%  purple {:>5.1}%  {}",
                tick,
                sample.left_blue * 100.0,
                sample.right_purple * 100.0,
                detected
            );
        }
        MonitorEvent::Recorded(entry) => println!(
            "{} #{} {}",
            "Recorded:".green().bold(),
            entry.id,
            entry.result
        ),
        MonitorEvent::Debounced {
            outcome,
            since_last_ms,
        } => println!(
            "{} {} ({}ms after the previous entry)",
            "Skipped:".yellow(),
            outcome,
            since_last_ms
        ),
        MonitorEvent::FrameFailed { tick, message, .. } => {
            eprintln!("{} [{:>4}] {}", "Warning:".yellow(), tick, message)
        }
        MonitorEvent::Stopped { ticks, .. } => {
            println!("   Monitoring stopped after {} cycles", ticks)
        }
    }
}

fn print_best(snapshot: &TrackerSnapshot) {
    println!(
        "   Best: {}, next: {}",
        snapshot.best_method.bold(),
        snapshot.best_forecast
    );
}

/// Compact form of the newest entries, e.g. `AAOAO`.
fn recent_sequence(history: &[OutcomeEntry]) -> String {
    let skip = history.len().saturating_sub(RECENT_SHOWN);
    history[skip..].iter().map(|entry| entry.result.short()).collect()
}

fn print_snapshot(snapshot: &TrackerSnapshot) {
    let stats = &snapshot.stats;
    println!("\n{} {} outcomes", "History:".cyan().bold(), stats.total);
    println!("{}", "─".repeat(40));
    println!("   Alpha: {}", stats.alpha);
    println!("   Omega: {}", stats.omega);
    if let Some((outcome, length)) = stats.current_streak {
        println!("   Streak: {} x{}", outcome, length);
    }
    if !snapshot.history.is_empty() {
        println!("   Recent: {}", recent_sequence(&snapshot.history));
    }

    println!("\n{} ", "Methods:".cyan().bold());
    println!("{}", "─".repeat(40));
    for method in &snapshot.methods {
        let line = format!(
            "   {:<20} {:>3}/{:<3} {:>6.1}%",
            method.name, method.correct, method.predictions, method.accuracy_percent
        );
        if method.name == snapshot.best_method {
            println!("{} {}", line.green().bold(), "(best)".green());
        } else {
            println!("{}", line);
        }
    }

    print_best(snapshot);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outcome_commands() {
        assert_eq!(parse_command("a"), Ok(StdinCommand::Record(Outcome::Alpha)));
        assert_eq!(parse_command(" Omega "), Ok(StdinCommand::Record(Outcome::Omega)));
    }

    #[test]
    fn test_parse_control_commands() {
        assert_eq!(parse_command("clear"), Ok(StdinCommand::Clear));
        assert_eq!(parse_command("stop"), Ok(StdinCommand::Stop));
        assert_eq!(parse_command("q"), Ok(StdinCommand::Stop));
        assert_eq!(parse_command("status"), Ok(StdinCommand::Status));
        assert_eq!(parse_command("sensitivity 35"), Ok(StdinCommand::Sensitivity(35)));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("sensitivity").is_err());
        assert!(parse_command("sensitivity high").is_err());
        assert!(parse_command("beta").is_err());
        assert!(parse_command("   ").is_err());
    }

    #[test]
    fn test_resolve_region_prefers_flag() {
        let settings = Settings {
            region: Some(CaptureRegion::new(0, 0, 100, 100).unwrap()),
            ..Settings::default()
        };
        let flag = CaptureRegion::new(10, 10, 200, 200).unwrap();
        assert_eq!(resolve_region(Some(flag), &settings).unwrap(), flag);
        assert_eq!(
            resolve_region(None, &settings).unwrap(),
            CaptureRegion::new(0, 0, 100, 100).unwrap()
        );
        assert!(resolve_region(None, &Settings::default()).is_err());
    }

    #[test]
    fn test_recent_sequence_keeps_newest() {
        let start = Utc::now();
        let history: Vec<OutcomeEntry> = (0..25)
            .map(|i| OutcomeEntry {
                id: i,
                result: if i < 24 { Outcome::Alpha } else { Outcome::Omega },
                observed_at: start,
            })
            .collect();
        let recent = recent_sequence(&history);
        assert_eq!(recent.len(), RECENT_SHOWN);
        assert!(recent.ends_with("AO"));
        assert_eq!(recent_sequence(&history[..2]), "AA");
    }

    #[test]
    fn test_resolve_sensitivity() {
        let settings = Settings::default();
        assert_eq!(resolve_sensitivity(None, &settings).unwrap().percent(), 30);
        assert_eq!(resolve_sensitivity(Some(45), &settings).unwrap().percent(), 45);
        assert!(resolve_sensitivity(Some(44), &settings).is_err());
    }
}
