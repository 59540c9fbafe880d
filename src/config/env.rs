//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::models::config::MAX_RATE;
use crate::utils::{duration_to_millis, parse_duration, parse_workers};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists; variables already set win
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {} file: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "KTEST_ENDPOINT" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid KTEST_ENDPOINT value '{}': {}", value, e)))?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!("KTEST_ENDPOINT must use http or https: {}", value)));
                }
            }
            "KTEST_DURATION" => {
                let millis = parse_duration(value)
                    .and_then(duration_to_millis)
                    .map_err(|e| AppError::config(format!("Invalid KTEST_DURATION value '{}': {}", value, e)))?;
                if millis == 0 {
                    return Err(AppError::config("KTEST_DURATION must be greater than 0"));
                }
            }
            "KTEST_RPS" => {
                let rate: u32 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid KTEST_RPS value '{}': {}", value, e)))?;
                if rate == 0 {
                    return Err(AppError::config("KTEST_RPS must be greater than 0"));
                }
                if rate > MAX_RATE {
                    return Err(AppError::config(format!("KTEST_RPS must be at most {}", MAX_RATE)));
                }
            }
            "KTEST_WORKERS" => {
                parse_workers(value)
                    .map_err(|e| AppError::config(format!("Invalid KTEST_WORKERS value '{}': {}", value, e)))?;
            }
            "ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("KTEST_ENDPOINT", "URL to send load to", "http://my-service.default.svc:8080/health"),
            ("KTEST_DURATION", "Load test duration", "30s, 5m, 1m30s"),
            ("KTEST_RPS", "Target requests per second", "100"),
            ("KTEST_WORKERS", "Concurrent workers (0 = one request per tick)", "0, 64, auto"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<16} {}\n", var, description));
            help.push_str(&format!("  {:<16} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        warnings
    }
}
