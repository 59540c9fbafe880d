//! Command-line interface

use crate::config::EnvManager;
use crate::utils::{format_duration, parse_duration, parse_workers};
use clap::Parser;
use std::time::Duration;

/// ktest - fixed-rate HTTP load generator with latency percentiles
#[derive(Parser, Debug, Clone)]
#[command(name = "ktest")]
#[command(version, about, long_about = None)]
#[command(after_long_help = EnvManager::display_env_help())]
pub struct Cli {
    /// Endpoint URL to send load to
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Test duration, e.g. 30s, 5m, 1m30s (bare numbers are seconds) [default: 5m]
    #[arg(short, long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Target requests per second [default: 100]
    #[arg(short, long)]
    pub rps: Option<u32>,

    /// Concurrent workers or `auto`; 0 sends one request per tick and waits for it
    #[arg(short, long, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(endpoint) = &self.endpoint {
            if endpoint.trim().is_empty() {
                return Err("--endpoint cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command-line Overrides:\n");
        if let Some(endpoint) = &self.endpoint {
            summary.push_str(&format!("  Endpoint: {}\n", endpoint));
        }
        if let Some(duration) = self.duration {
            summary.push_str(&format!("  Duration: {}\n", format_duration(duration)));
        }
        if let Some(rps) = self.rps {
            summary.push_str(&format!("  Target RPS: {}\n", rps));
        }
        if let Some(workers) = self.workers {
            summary.push_str(&format!("  Workers: {}\n", workers));
        }
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  JSON output: {}\n", self.json));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_basic() {
        let cli = Cli::parse_from(["ktest", "--endpoint", "http://svc:8080", "--duration", "30s", "--rps", "50"]);
        assert_eq!(cli.endpoint.as_deref(), Some("http://svc:8080"));
        assert_eq!(cli.duration, Some(Duration::from_secs(30)));
        assert_eq!(cli.rps, Some(50));
        assert_eq!(cli.workers, None);
        assert!(!cli.json);
        assert!(!cli.verbose);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_defaults_are_unset() {
        let cli = Cli::parse_from(["ktest"]);
        assert!(cli.endpoint.is_none());
        assert!(cli.duration.is_none());
        assert!(cli.rps.is_none());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_parsing_all_options() {
        let cli = Cli::parse_from([
            "ktest",
            "-e", "https://example.com/ping",
            "-d", "1m30s",
            "-r", "200",
            "-w", "32",
            "--json",
            "--no-color",
            "--verbose",
            "--debug",
        ]);

        assert_eq!(cli.duration, Some(Duration::from_secs(90)));
        assert_eq!(cli.rps, Some(200));
        assert_eq!(cli.workers, Some(32));
        assert!(cli.json);
        assert!(cli.no_color);
        assert!(cli.verbose);
        assert!(cli.debug);
    }

    #[test]
    fn test_workers_auto() {
        let cli = Cli::parse_from(["ktest", "-e", "http://localhost", "--workers", "auto"]);
        assert_eq!(cli.workers, Some(crate::types::DispatchMode::auto_workers()));

        assert!(Cli::try_parse_from(["ktest", "--workers", "lots"]).is_err());
    }

    #[test]
    fn test_bare_number_duration_is_seconds() {
        let cli = Cli::parse_from(["ktest", "--duration", "45"]);
        assert_eq!(cli.duration, Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Cli::try_parse_from(["ktest", "--duration", "soon"]).is_err());
        assert!(Cli::try_parse_from(["ktest", "--duration", "-5s"]).is_err());
        assert!(Cli::try_parse_from(["ktest", "--rps", "fast"]).is_err());
        assert!(Cli::try_parse_from(["ktest", "--rps", "-1"]).is_err());
        assert!(Cli::try_parse_from(["ktest", "--unknown"]).is_err());
    }

    #[test]
    fn test_cli_validation() {
        let cli = Cli::parse_from(["ktest", "--color", "--no-color"]);
        assert!(cli.validate().unwrap_err().contains("--color and --no-color"));

        let cli = Cli::parse_from(["ktest", "--endpoint", " "]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_use_colors_method() {
        let cli = Cli::parse_from(["ktest", "--color"]);
        assert!(cli.use_colors());

        let cli = Cli::parse_from(["ktest", "--no-color"]);
        assert!(!cli.use_colors());
    }

    #[test]
    fn test_config_summary() {
        let cli = Cli::parse_from(["ktest", "--endpoint", "http://svc", "--duration", "2m", "--no-color"]);
        let summary = cli.get_config_summary();
        assert!(summary.contains("Endpoint: http://svc"));
        assert!(summary.contains("Duration: 2m0s"));
        assert!(summary.contains("Colored output: false"));
        assert!(!summary.contains("Target RPS"));
    }
}
