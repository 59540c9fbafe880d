//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::Config,
    utils::{duration_to_millis, format_duration},
};

/// Configuration parser that layers defaults, `.env`, environment and CLI flags
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        self.cli.validate().map_err(AppError::validation)?;

        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;

        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(endpoint) = &self.cli.endpoint {
            config.endpoint = Some(endpoint.trim().to_string());
        }

        if let Some(duration) = self.cli.duration {
            config.duration_ms = duration_to_millis(duration)
                .map_err(|e| AppError::config(format!("Invalid --duration value: {}", e)))?;
        }

        if let Some(rps) = self.cli.rps {
            config.rate = rps;
        }

        if let Some(workers) = self.cli.workers {
            config.workers = workers;
        }

        if self.cli.color {
            config.enable_color = true;
        } else if self.cli.no_color || !self.cli.use_colors() {
            config.enable_color = false;
        }

        // CLI-only switches
        config.json_output = self.cli.json;
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!(
                "Final config: endpoint={}, duration={}, rps={}, workers={}, enable_color={}",
                config.endpoint.as_deref().unwrap_or("<unset>"),
                format_duration(config.duration()),
                config.rate,
                config.workers,
                config.enable_color
            );
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Endpoint: {}", config.endpoint.as_deref().unwrap_or("<unset>")));
    summary.push(format!("Duration: {}", format_duration(config.duration())));
    summary.push(format!("Target RPS: {}", config.rate));
    summary.push(format!("Dispatch: {}", config.dispatch_mode().name()));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("JSON Output: {}", config.json_output));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
