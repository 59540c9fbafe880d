//! Report rendering
//!
//! Turns a run's configuration and [`MetricsSummary`] into text for the
//! terminal or JSON for scripts. Rendering is pure; callers decide where the
//! result is printed.

use crate::{
    error::Result,
    models::{LoadTestConfig, MetricsSummary},
    utils::format_duration,
};
use colored::*;
use serde::Serialize;

/// Formats the run banner and the final report
pub trait ReportFormatter: Send + Sync {
    /// Lines printed before the run starts
    fn format_banner(&self, config: &LoadTestConfig) -> Result<String>;

    /// The final report
    fn format_summary(&self, config: &LoadTestConfig, summary: &MetricsSummary) -> Result<String>;
}

/// Human-readable report, optionally colored
pub struct TextFormatter {
    use_color: bool,
}

impl TextFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn header(&self, title: &str) -> String {
        let underline = "=".repeat(title.chars().count());
        if self.use_color {
            format!("{}\n{}", title.bold().cyan(), underline.cyan())
        } else {
            format!("{}\n{}", title, underline)
        }
    }

    fn error_rate(&self, summary: &MetricsSummary) -> String {
        let text = format!("{:.2}%", summary.error_rate);
        if !self.use_color {
            return text;
        }
        match summary.error_rate {
            rate if rate == 0.0 => text.green().to_string(),
            rate if rate < 5.0 => text.yellow().to_string(),
            _ => text.red().to_string(),
        }
    }

    fn count(&self, value: u64, color: Color) -> String {
        if self.use_color && value > 0 {
            value.to_string().color(color).to_string()
        } else {
            value.to_string()
        }
    }
}

impl ReportFormatter for TextFormatter {
    fn format_banner(&self, config: &LoadTestConfig) -> Result<String> {
        let mut output = String::from("Running performance test...\n");
        output.push_str(&format!("  Endpoint: {}\n", config.endpoint));
        output.push_str(&format!("  Duration: {}\n", format_duration(config.duration)));
        output.push_str(&format!("  Target RPS: {}\n", config.target_rate));
        Ok(output)
    }

    fn format_summary(&self, _config: &LoadTestConfig, summary: &MetricsSummary) -> Result<String> {
        Ok(render_text(summary, self.use_color))
    }
}

/// Machine-readable report
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonReport<'a> {
    endpoint: &'a str,
    target_rate: u32,
    #[serde(with = "crate::models::metrics::duration_ms")]
    configured_duration: std::time::Duration,
    dispatch: String,
    summary: &'a MetricsSummary,
}

impl ReportFormatter for JsonFormatter {
    fn format_banner(&self, _config: &LoadTestConfig) -> Result<String> {
        Ok(String::new())
    }

    fn format_summary(&self, config: &LoadTestConfig, summary: &MetricsSummary) -> Result<String> {
        let report = JsonReport {
            endpoint: &config.endpoint,
            target_rate: config.target_rate,
            configured_duration: config.duration,
            dispatch: config.dispatch.name(),
            summary,
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

/// Output formatting factory
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    pub fn create_formatter(json: bool, use_color: bool) -> Box<dyn ReportFormatter> {
        if json {
            Box::new(JsonFormatter)
        } else {
            Box::new(TextFormatter::new(use_color))
        }
    }
}

/// Render the "Performance Test Results" block
pub fn render_text(summary: &MetricsSummary, use_color: bool) -> String {
    let formatter = TextFormatter::new(use_color);
    let mut output = String::from("\n");

    output.push_str(&formatter.header("Performance Test Results"));
    output.push('\n');
    output.push_str(&format!("Duration:         {}\n", format_duration(summary.elapsed)));
    output.push_str(&format!("Total Requests:   {}\n", summary.total_requests));
    output.push_str(&format!("Successful:       {}\n", formatter.count(summary.success_count, Color::Green)));
    output.push_str(&format!("Failed:           {}\n", formatter.count(summary.failure_count, Color::Red)));
    output.push_str(&format!("Error Rate:       {}\n", formatter.error_rate(summary)));
    output.push('\n');
    output.push_str("Latency Metrics:\n");
    output.push_str(&format!("  Average:        {}\n", format_duration(summary.average_latency)));
    output.push_str(&format!("  P95:            {}\n", format_duration(summary.p95_latency)));
    output.push_str(&format!("  P99:            {}\n", format_duration(summary.p99_latency)));
    output.push('\n');
    output.push_str(&format!("Throughput:       {:.2} req/s\n", summary.throughput));

    output
}

/// Serialize a summary on its own
pub fn render_json(summary: &MetricsSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}
