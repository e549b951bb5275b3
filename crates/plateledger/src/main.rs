//! `platerec` - CLI for plateledger
//!
//! This binary records license plate detections into the on-device ledger
//! and answers queries against it.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use clap::Parser;

use plateledger::cli::{
    Cli, Command, ConfigCommand, HistoryCommand, LogCommand, OutputFormat, RecentCommand,
};
use plateledger::{init_logging, normalize_plate, Config, DetectionLedger};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Log(log_cmd) => handle_log(&config, &log_cmd),
        Command::History(history_cmd) => handle_history(&config, &history_cmd),
        Command::Recent(recent_cmd) => handle_recent(&config, &recent_cmd),
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_log(config: &Config, cmd: &LogCommand) -> Result<(), Box<dyn std::error::Error>> {
    let image = image::open(&cmd.image)?;
    let ledger = DetectionLedger::open(config)?;

    let outcome = ledger.log_detection(&cmd.plate, cmd.confidence, &image);
    println!("{outcome}");

    if outcome.is_failure() {
        std::process::exit(1);
    }
    Ok(())
}

fn handle_history(
    config: &Config,
    cmd: &HistoryCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = DetectionLedger::open(config)?;
    let sightings = ledger.plate_history(&cmd.plate, cmd.limit)?;

    match cmd.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&sightings)?);
        }
        OutputFormat::Plain => {
            for sighting in &sightings {
                println!(
                    "{}\t{:.4}",
                    sighting.timestamp.to_rfc3339(),
                    sighting.confidence
                );
            }
        }
        OutputFormat::Table => {
            let plate = normalize_plate(&cmd.plate);
            if sightings.is_empty() {
                println!("No sightings of {plate}");
                return Ok(());
            }

            println!("Sightings of {plate} ({})", sightings.len());
            println!();
            println!("{:<36} {:>10}", "TIMESTAMP", "CONFIDENCE");
            for sighting in &sightings {
                println!(
                    "{:<36} {:>10.4}",
                    sighting.timestamp.to_rfc3339(),
                    sighting.confidence
                );
            }
        }
    }
    Ok(())
}

fn handle_recent(config: &Config, cmd: &RecentCommand) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = DetectionLedger::open(config)?;
    let detections = ledger.recent(cmd.limit)?;

    match cmd.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&detections)?);
        }
        OutputFormat::Plain => {
            for detection in &detections {
                println!(
                    "{}\t{}\t{:.4}\t{}",
                    detection.timestamp.to_rfc3339(),
                    detection.plate_text,
                    detection.confidence,
                    detection.image_path
                );
            }
        }
        OutputFormat::Table => {
            if detections.is_empty() {
                println!("No detections recorded");
                return Ok(());
            }

            println!(
                "{:>6} {:<36} {:<12} {:>10}  {}",
                "ID", "TIMESTAMP", "PLATE", "CONFIDENCE", "IMAGE"
            );
            for detection in &detections {
                println!(
                    "{:>6} {:<36} {:<12} {:>10.4}  {}",
                    detection.id.unwrap_or_default(),
                    detection.timestamp.to_rfc3339(),
                    detection.plate_text,
                    detection.confidence,
                    detection.image_path
                );
            }
        }
    }
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = DetectionLedger::open(config)?;
    let stats = ledger.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "crops_dir": config.crops_dir(),
            "dedup_window_ms": config.dedup.window_ms,
            "total_detections": stats.total_detections,
            "unique_plates": stats.unique_plates,
            "oldest_detection": stats.oldest_detection,
            "newest_detection": stats.newest_detection,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("platerec status");
        println!("---------------");
        println!("Database:       {}", config.database_path().display());
        println!("Crops:          {}", config.crops_dir().display());
        println!("Dedup window:   {} ms", config.dedup.window_ms);
        println!("Detections:     {}", stats.total_detections);
        println!("Unique plates:  {}", stats.unique_plates);
        if let Some(oldest) = stats.oldest_detection {
            println!("Oldest:         {}", oldest.to_rfc3339());
        }
        if let Some(newest) = stats.newest_detection {
            println!("Newest:         {}", newest.to_rfc3339());
        }
        println!("Database size:  {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Base directory:   {}", config.base_dir().display());
                println!("  Database path:    {}", config.database_path().display());
                println!("  Crops directory:  {}", config.crops_dir().display());
                println!();
                println!("[Dedup]");
                println!("  Window:           {} ms", config.dedup.window_ms);
                println!();
                println!("[Image]");
                println!("  JPEG quality:     {}", config.image.jpeg_quality);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
