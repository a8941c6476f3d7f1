//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// slotsched - priority-aware update scheduler
#[derive(Parser)]
#[command(
    name = "ss",
    about = "Priority-aware update scheduler demo: urgent updates interrupt deferred work",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Shorthand for --log-level DEBUG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Effective CLI log level: explicit level wins over --verbose
    pub fn effective_log_level(&self) -> Option<String> {
        debug!(log_level = ?self.log_level, verbose = self.verbose, "Cli::effective_log_level: called");
        match (&self.log_level, self.verbose) {
            (Some(level), _) => Some(level.clone()),
            (None, true) => Some("DEBUG".to_string()),
            (None, false) => None,
        }
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the slow-list scenario: deferred posts interrupted by urgent toggles
    Demo {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Type a query keystroke by keystroke with a deferred user filter
    Search {
        /// Query to type
        query: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the mock user directory
    Users {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slotsched")
        .join("logs")
        .join("slotsched.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with the log location
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    format!("Logs are written to: {}\n", get_log_path().display())
}

/// Output format for command results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "OutputFormat::from_str: called");
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => {
                debug!(%s, "OutputFormat::from_str: unknown format");
                Err(format!("Unknown format: {}. Use: text or json", s))
            }
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_demo() {
        let cli = Cli::parse_from(["ss", "demo"]);
        assert!(matches!(
            cli.command,
            Command::Demo {
                format: OutputFormat::Text
            }
        ));
    }

    #[test]
    fn test_cli_parse_demo_json() {
        let cli = Cli::parse_from(["ss", "demo", "--format", "json"]);
        assert!(matches!(
            cli.command,
            Command::Demo {
                format: OutputFormat::Json
            }
        ));
    }

    #[test]
    fn test_cli_parse_search() {
        let cli = Cli::parse_from(["ss", "search", "ros"]);
        match cli.command {
            Command::Search { query, format } => {
                assert_eq!(query, "ros");
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_users_and_config() {
        let cli = Cli::parse_from(["ss", "users"]);
        assert!(matches!(cli.command, Command::Users { .. }));

        let cli = Cli::parse_from(["ss", "config"]);
        assert!(matches!(cli.command, Command::Config));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from(["ss", "-c", "/tmp/x.yml", "-v", "users"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.yml")));
        assert!(cli.verbose);
        assert_eq!(cli.effective_log_level().as_deref(), Some("DEBUG"));

        let cli = Cli::parse_from(["ss", "users", "--log-level", "trace", "--verbose"]);
        assert_eq!(cli.effective_log_level().as_deref(), Some("trace"));

        let cli = Cli::parse_from(["ss", "users"]);
        assert!(cli.effective_log_level().is_none());
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["ss"]).is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("PLAIN".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_log_path_location() {
        let path = get_log_path();
        assert!(path.ends_with("slotsched/logs/slotsched.log"));
    }
}
