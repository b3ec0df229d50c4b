//! Hands-free pointer control driven by recorded or streamed face landmarks.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use head_pointer::{
    app::PointerApp,
    calibration::CalibrationStore,
    config::{Config, EXAMPLE_CONFIG},
    cursor_control::{CursorActuator, LoggingCursor, X11Cursor},
    source::ReplaySource,
};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long, default_value = "config.yaml")]
    config: PathBuf,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive the cursor from a landmark stream
    Run(StreamArgs),

    /// Run the guided calibration and store the result
    Calibrate(StreamArgs),

    /// Show configuration and calibration status
    Status,

    /// Write an example configuration file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug)]
struct StreamArgs {
    /// Landmark recording (JSON lines, one frame per line)
    #[arg(short, long)]
    landmarks: PathBuf,

    /// Log cursor actions instead of moving the real pointer
    #[arg(long)]
    dry_run: bool,

    /// Screen size for dry runs, as WIDTHxHEIGHT
    #[arg(long, default_value = "1920x1080", value_parser = parse_screen)]
    screen: (u32, u32),
}

fn parse_screen(value: &str) -> std::result::Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{value}'"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("invalid width: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("invalid height: {e}"))?;
    if w == 0 || h == 0 {
        return Err("screen dimensions must be positive".to_string());
    }
    Ok((w, h))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    match args.command {
        Command::Run(stream) => stream_command(&args.config, &stream, false),
        Command::Calibrate(stream) => stream_command(&args.config, &stream, true),
        Command::Status => status(&args.config),
        Command::InitConfig { output, force } => init_config(&output, force),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn stream_command(config_path: &Path, stream: &StreamArgs, calibrate: bool) -> Result<()> {
    let config = load_config(config_path)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl-C handler")?;

    if stream.dry_run {
        let (w, h) = stream.screen;
        info!("Dry run on a {}x{} screen", w, h);
        drive(config, LoggingCursor::new(w, h), &stream.landmarks, calibrate, &cancel)
    } else {
        let cursor = X11Cursor::connect(None).context("Cursor control unavailable")?;
        drive(config, cursor, &stream.landmarks, calibrate, &cancel)
    }
}

fn drive<A: CursorActuator>(
    config: Config,
    actuator: A,
    landmarks: &Path,
    calibrate: bool,
    cancel: &AtomicBool,
) -> Result<()> {
    let mut app = PointerApp::new(config, actuator)?;
    let mut source = ReplaySource::open(landmarks)
        .with_context(|| format!("Failed to open {}", landmarks.display()))?;

    if calibrate {
        app.start_calibration();
        app.begin_collection(Instant::now())?;
    } else {
        app.activate(Instant::now())?;
    }

    let summary = app.run(&mut source, cancel);
    app.shutdown();
    let summary = summary?;

    info!(
        "Processed {} frames: {} triggers, {} clicks ({} failed)",
        summary.frames, summary.triggers, summary.clicks, summary.failed_clicks
    );
    if app.cursor().failed_moves() > 0 {
        warn!("{} cursor moves failed", app.cursor().failed_moves());
    }

    if calibrate {
        match summary.calibration_outcome {
            Some(Ok(())) => {
                if let Some(record) = app.calibration_record() {
                    println!("{}", serde_json::to_string_pretty(&record.quality_metrics)?);
                }
            }
            Some(Err(failure)) => bail!("Calibration failed: {failure}"),
            None => bail!("Landmark stream ended before calibration finished"),
        }
    }
    Ok(())
}

fn status(config_path: &Path) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    println!("Configuration: {}", config_path.display());
    match config.validate() {
        Ok(()) => println!("  valid"),
        Err(e) => println!("  invalid: {e}"),
    }

    let store = CalibrationStore::new(&config.calibration.file);
    println!("Calibration file: {}", store.path().display());
    match store.load()? {
        Some(record) if record.is_calibrated() => {
            println!("  calibrated at {:.0} (UNIX seconds)", record.timestamp);
            println!("  points: {}", record.sample_count);
            println!(
                "  accuracy {:.1}px, precision {:.1}px, completeness {:.0}%",
                record.quality_metrics.accuracy,
                record.quality_metrics.precision,
                record.quality_metrics.completeness * 100.0
            );
        }
        Some(_) => println!("  present but not calibrated"),
        None => println!("  not calibrated"),
    }
    Ok(())
}

fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }
    std::fs::write(output, EXAMPLE_CONFIG)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote example configuration to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_screen() {
        assert_eq!(parse_screen("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_screen("800X600"), Ok((800, 600)));
        assert!(parse_screen("1920").is_err());
        assert!(parse_screen("0x600").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let args = Args::try_parse_from(["head-pointer", "-d", "run", "--landmarks", "a.jsonl", "--dry-run"]).unwrap();
        assert!(args.debug);
        assert!(matches!(args.command, Command::Run(ref s) if s.dry_run && s.screen == (1920, 1080)));
    }
}
