//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::RunBlueprint;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig, StopHandle};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    info!(
        capacity = blueprint.buffer.capacity,
        workers = blueprint.dispatch.workers,
        drain_window_ms = blueprint.dispatch.drain_window_ms,
        connections = blueprint.connections.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });

    let signal_task = tokio::spawn(forward_shutdown_signal(pipeline.stop_handle()));

    info!("Starting pipeline...");
    let result = pipeline.run().await;
    signal_task.abort();

    let report = result.context("Pipeline execution failed")?;
    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize run report")?;
        println!("{}", json);
    } else {
        report.print_summary();
    }

    info!("muxd finished");
    Ok(())
}

/// Apply command-line overrides on top of the loaded file
fn apply_overrides(blueprint: &mut RunBlueprint, args: &RunArgs) {
    if let Some(workers) = args.workers {
        info!(workers, "Overriding dispatcher workers from CLI");
        blueprint.dispatch.workers = workers;
    }
    if let Some(capacity) = args.capacity {
        info!(capacity, "Overriding ring capacity from CLI");
        blueprint.buffer.capacity = capacity;
    }
    if let Some(window) = args.drain_window_ms {
        info!(drain_window_ms = window, "Overriding drain window from CLI");
        blueprint.dispatch.drain_window_ms = window;
    }
    if let Some(policy) = args.drain_policy {
        blueprint.dispatch.drain_policy = policy.into();
    }
    if let Some(ref dir) = args.output_dir {
        info!(output_dir = %dir.display(), "Overriding sink output directory from CLI");
        blueprint.sinks.output_dir = dir.clone();
    }
    if args.no_pacing {
        blueprint.dispatch.pacing = false;
    }
}

/// Stop the pipeline on Ctrl+C or SIGTERM
async fn forward_shutdown_signal(stop: StopHandle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, stopping pipeline...");
    stop.stop();
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &RunBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Buffer:");
    println!("  Capacity: {} bytes", blueprint.buffer.capacity);
    println!("  Wait timeout: {} ms", blueprint.buffer.wait_timeout_ms);

    println!("\nDispatch:");
    println!("  Workers: {}", blueprint.dispatch.workers);
    println!("  Drain window: {} ms", blueprint.dispatch.drain_window_ms);
    println!("  Drain policy: {:?}", blueprint.dispatch.drain_policy);
    println!("  Pacing: {}", blueprint.dispatch.pacing);

    println!("\nSinks:");
    println!("  Kind: {:?}", blueprint.sinks.kind);
    println!("  Output dir: {}", blueprint.sinks.output_dir.display());

    println!("\nConnections ({}):", blueprint.connections.len());
    for conn in &blueprint.connections {
        println!(
            "  - {} -> {} ({})",
            conn.source_id,
            conn.destination_id,
            conn.source.display()
        );
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use contracts::DrainPolicy;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["muxd", "run"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Run(args) => args,
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut blueprint = RunBlueprint::default();
        let args = run_args(&[
            "--workers",
            "2",
            "--capacity",
            "4096",
            "--drain-window-ms",
            "250",
            "--drain-policy",
            "until-idle",
            "-o",
            "/tmp/muxd-out",
            "--no-pacing",
        ]);

        apply_overrides(&mut blueprint, &args);

        assert_eq!(blueprint.dispatch.workers, 2);
        assert_eq!(blueprint.buffer.capacity, 4096);
        assert_eq!(blueprint.dispatch.drain_window_ms, 250);
        assert_eq!(blueprint.dispatch.drain_policy, DrainPolicy::UntilIdle);
        assert_eq!(blueprint.sinks.output_dir, std::path::PathBuf::from("/tmp/muxd-out"));
        assert!(!blueprint.dispatch.pacing);
    }

    #[test]
    fn test_no_overrides_keep_file_values() {
        let mut blueprint = RunBlueprint::default();
        let before = blueprint.clone();
        apply_overrides(&mut blueprint, &run_args(&[]));

        assert_eq!(blueprint.dispatch.workers, before.dispatch.workers);
        assert_eq!(blueprint.buffer.capacity, before.buffer.capacity);
        assert_eq!(blueprint.dispatch.pacing, before.dispatch.pacing);
    }

    #[tokio::test]
    async fn test_out_of_range_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("muxd.toml");
        std::fs::write(
            &config,
            r#"
            [[connections]]
            source_id = 1
            destination_id = 11
            source = "input1.txt"
            "#,
        )
        .unwrap();
        let config = config.display().to_string();
        let capacity = usize::MAX.to_string();

        let args = run_args(&["-c", config.as_str(), "--capacity", capacity.as_str()]);
        let err = run_pipeline(&args).await.unwrap_err();
        assert!(err.to_string().contains("Configuration validation failed"), "got: {err}");
    }

    #[tokio::test]
    async fn test_missing_config_is_reported() {
        let args = run_args(&["-c", "/nonexistent/muxd.toml"]);
        let err = run_pipeline(&args).await.unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }
}
