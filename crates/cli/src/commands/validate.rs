//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{Frame, RunBlueprint};
use dispatcher::FrameFilter;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    capacity: usize,
    workers: usize,
    connection_count: usize,
    destination_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    capacity: blueprint.buffer.capacity,
                    workers: blueprint.dispatch.workers,
                    connection_count: blueprint.connections.len(),
                    destination_count: blueprint.destinations().len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RunBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let filter = FrameFilter::new();

    // Routes whose every frame the dispatcher drops, whatever the payload
    for (idx, connection) in blueprint.connections.iter().enumerate() {
        let empty = Frame::new(connection.route(), 0, Vec::new());
        if let Err(reason) = filter.validate(&empty) {
            warnings.push(format!(
                "connections[{idx}] {} -> {} is always rejected ({reason})",
                connection.source_id, connection.destination_id
            ));
        }
    }

    let mut sources: Vec<_> = blueprint.connections.iter().map(|c| &c.source).collect();
    sources.sort();
    sources.dedup();
    if sources.len() < blueprint.connections.len() {
        warnings.push("Several connections read the same source file".to_string());
    }

    if blueprint.dispatch.drain_window_ms == 0 {
        warnings.push("dispatch.drain_window_ms is 0 - dispatchers stop immediately".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Capacity: {} bytes", summary.capacity);
            println!("  Workers: {}", summary.workers);
            println!("  Connections: {}", summary.connection_count);
            println!("  Destinations: {}", summary.destination_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
