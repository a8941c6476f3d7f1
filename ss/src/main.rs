//! slotsched - priority-aware update scheduler
//!
//! CLI entry point for the demo scenarios.

use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use slotsched::cli::{Cli, Command, OutputFormat, generate_after_help};
use slotsched::config::Config;
use slotsched::demo::{DemoValue, Transcript, directory, run_search_scenario, run_toggle_scenario};
use slotsched::scheduler::{SchedulerStats, SlotUpdate, UpdateStatus};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slotsched")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("slotsched.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Build command with dynamic after_help that shows the log location
    let cmd = Cli::command().after_help(generate_after_help());

    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    let cli_log_level = cli.effective_log_level();
    setup_logging(cli_log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Demo { format } => {
            debug!(%format, "main: matched Demo command");
            cmd_demo(&config, format).await
        }
        Command::Search { query, format } => {
            debug!(%query, %format, "main: matched Search command");
            cmd_search(&config, &query, format).await
        }
        Command::Users { format } => {
            debug!(%format, "main: matched Users command");
            cmd_users(format)
        }
        Command::Config => {
            debug!("main: matched Config command");
            cmd_config(&config)
        }
    }
}

/// Run the slow list with urgent toggles
async fn cmd_demo(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_demo: called");
    let transcript = run_toggle_scenario(config.scheduler.clone(), &config.demo).await?;
    print_transcript("Slow list with urgent toggles", &transcript, format)
}

/// Type a query against the user directory
async fn cmd_search(config: &Config, query: &str, format: OutputFormat) -> Result<()> {
    debug!(%query, %format, "cmd_search: called");
    let transcript = run_search_scenario(config.scheduler.clone(), &config.demo, query).await?;
    print_transcript(&format!("Searching users for {:?}", query), &transcript, format)
}

/// List the mock user directory
fn cmd_users(format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_users: called");
    let users = directory();
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&users)?);
        }
        OutputFormat::Text => {
            for user in &users {
                println!("{:>3}  {:<10} {}", user.id, user.name.bold(), user.bio.dimmed());
            }
        }
    }
    Ok(())
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config).context("Failed to serialize config")?);
    Ok(())
}

fn print_transcript(title: &str, transcript: &Transcript, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            // One JSON object per line: events first, then the summary
            for event in &transcript.events {
                println!("{}", serde_json::to_string(event)?);
            }
            let summary = serde_json::json!({
                "outcomes": transcript.outcomes,
                "finals": transcript.finals,
                "stats": transcript.stats,
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
        OutputFormat::Text => {
            println!("{}", title.bold());
            for event in &transcript.events {
                println!("  {}", format_event(event));
            }
            println!();
            println!("{}", "Final state".bold());
            for snap in &transcript.finals {
                let value = snap.value.as_ref().map(DemoValue::to_string).unwrap_or_else(|| "-".to_string());
                println!("  {:<8} v{:<3} {}", snap.slot.as_str().cyan(), snap.version, value);
            }
            println!();
            print_stats(&transcript.stats);
        }
    }
    Ok(())
}

fn format_event(event: &SlotUpdate<DemoValue>) -> String {
    let status = match event.status {
        UpdateStatus::Applied => "applied".green(),
        UpdateStatus::Pending => "pending".yellow(),
        UpdateStatus::Failed => "failed".red(),
    };
    let value = event.value.as_ref().map(DemoValue::to_string).unwrap_or_else(|| "-".to_string());
    match &event.error {
        Some(error) => format!("{:<8} {:<9} {} ({})", event.slot.as_str().cyan(), status, value, error),
        None => format!("{:<8} {:<9} {}", event.slot.as_str().cyan(), status, value),
    }
}

fn print_stats(stats: &SchedulerStats) {
    println!("{}", "Scheduler stats".bold());
    println!("  Urgent applied:      {}", stats.urgent_applied);
    println!("  Deferred submitted:  {}", stats.deferred_submitted);
    println!("  Deferred applied:    {}", stats.deferred_applied);
    println!("  Deferred superseded: {}", stats.deferred_superseded);
    println!("  Deferred cancelled:  {}", stats.deferred_cancelled);
    println!("  Stale discarded:     {}", stats.stale_discarded);
    println!("  Producer failures:   {}", stats.producer_failures);
    println!("  Peak queue depth:    {}", stats.peak_queue_depth);
}
