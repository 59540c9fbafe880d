//! ktest - fixed-rate HTTP load generator
//!
//! Sends `GET` requests to one endpoint at a constant rate for a bounded time
//! and prints request counts, error rate, throughput and latency percentiles.

use clap::Parser;
use ktest::{
    cli::Cli,
    client::HttpSampler,
    config::{display_config_summary, load_config, EnvManager},
    error::{AppError, ErrorReporter, Result},
    executor::LoadEngine,
    log_debug, log_warn,
    logging::LoggerFactory,
    output::OutputFormatterFactory,
    PKG_NAME, VERSION,
};
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    if let Err(e) = run_application(cli).await {
        reporter.report_error(&e);
        print_error_suggestions(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        eprintln!("{} v{}", PKG_NAME, VERSION);
        eprintln!(
            "Built {} for {} (commit {})",
            env!("BUILD_TIME"),
            env!("TARGET_TRIPLE"),
            option_env!("GIT_COMMIT").unwrap_or("unknown")
        );
        eprintln!("{}", cli.get_config_summary());
    }

    let config = load_config(cli)?;
    colored::control::set_override(config.enable_color);

    let logger_factory = LoggerFactory::new(config.clone());
    let app_logger = logger_factory.create_logger("MAIN").await;

    for warning in EnvManager::validate_current_env() {
        log_warn!(app_logger, "{}", warning);
    }
    log_debug!(app_logger, "Configuration loaded:\n{}", display_config_summary(&config));

    let run_config = config.to_load_test_config()?;
    let run_logger = Arc::new(logger_factory.create_run_logger().await);

    let sampler = HttpSampler::new(&run_config.endpoint)?.with_logger(run_logger.clone());
    let engine = LoadEngine::new(run_config, Arc::new(sampler)).with_logger(run_logger);

    let formatter = OutputFormatterFactory::create_formatter(config.json_output, config.enable_color);
    let banner = formatter.format_banner(engine.config())?;
    if !banner.is_empty() {
        println!("{}", banner);
    }

    let cancel = CancellationToken::new();
    tokio::spawn(handle_ctrl_c(cancel.clone()));

    let summary = engine.run(cancel).await?;

    println!("{}", formatter.format_summary(engine.config(), &summary)?);

    Ok(())
}

/// First Ctrl+C stops the run and still prints the report; a second one aborts
async fn handle_ctrl_c(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    eprintln!("\nReceived Ctrl+C, stopping load and reporting collected samples...");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    eprintln!("\nReceived second Ctrl+C, aborting immediately.");
    process::exit(130);
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Pass the target with --endpoint or KTEST_ENDPOINT");
            eprintln!("  - Endpoints must start with http:// or https://");
            eprintln!("  - --rps and --duration must be greater than zero");
            eprintln!("  - Check your .env file format");
        }
        AppError::Network(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check that the endpoint host resolves and is reachable");
            eprintln!("  - Verify firewall and proxy settings");
        }
        _ => {}
    }
}
