//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{DrainPolicy, EndpointId, RunBlueprint, SinkType};
use ring_buffer::LENGTH_HEADER_LEN;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    buffer: BufferInfo,
    dispatch: DispatchInfo,
    sinks: SinkInfo,
    destinations: Vec<EndpointId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    connections: Vec<ConnectionInfo>,
}

#[derive(Serialize)]
struct BufferInfo {
    capacity: usize,
    wait_timeout_ms: u64,
    /// Largest encoded frame the ring can ever hold
    max_message_len: usize,
}

#[derive(Serialize)]
struct DispatchInfo {
    workers: usize,
    drain_window_ms: u64,
    drain_policy: DrainPolicy,
    max_payload: usize,
    pacing: bool,
}

#[derive(Serialize)]
struct SinkInfo {
    kind: SinkType,
    output_dir: String,
}

#[derive(Serialize)]
struct ConnectionInfo {
    source_id: EndpointId,
    destination_id: EndpointId,
    source: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args.connections);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &RunBlueprint, with_connections: bool) -> ConfigInfo {
    let connections = if with_connections {
        blueprint
            .connections
            .iter()
            .map(|c| ConnectionInfo {
                source_id: c.source_id,
                destination_id: c.destination_id,
                source: c.source.display().to_string(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        buffer: BufferInfo {
            capacity: blueprint.buffer.capacity,
            wait_timeout_ms: blueprint.buffer.wait_timeout_ms,
            max_message_len: blueprint
                .buffer
                .capacity
                .saturating_sub(LENGTH_HEADER_LEN + 1),
        },
        dispatch: DispatchInfo {
            workers: blueprint.dispatch.workers,
            drain_window_ms: blueprint.dispatch.drain_window_ms,
            drain_policy: blueprint.dispatch.drain_policy,
            max_payload: blueprint.dispatch.max_payload,
            pacing: blueprint.dispatch.pacing,
        },
        sinks: SinkInfo {
            kind: blueprint.sinks.kind,
            output_dir: blueprint.sinks.output_dir.display().to_string(),
        },
        destinations: blueprint.destinations(),
        connections,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                    muxd Configuration                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Version: {}\n", info.version);

    println!("Buffer");
    println!("   ├─ Capacity: {} bytes", info.buffer.capacity);
    println!("   ├─ Wait timeout: {} ms", info.buffer.wait_timeout_ms);
    println!("   └─ Max message: {} bytes", info.buffer.max_message_len);

    println!("\nDispatch");
    println!("   ├─ Workers: {}", info.dispatch.workers);
    println!("   ├─ Drain window: {} ms", info.dispatch.drain_window_ms);
    println!("   ├─ Drain policy: {:?}", info.dispatch.drain_policy);
    println!("   ├─ Max payload: {} bytes", info.dispatch.max_payload);
    println!("   └─ Pacing: {}", info.dispatch.pacing);

    println!("\nSinks");
    println!("   ├─ Kind: {:?}", info.sinks.kind);
    println!("   ├─ Output dir: {}", info.sinks.output_dir);
    println!("   └─ Destinations: {:?}", info.destinations);

    if !info.connections.is_empty() {
        println!("\nConnections ({})", info.connections.len());
        for conn in &info.connections {
            println!(
                "   ├─ {} -> {} ({})",
                conn.source_id, conn.destination_id, conn.source
            );
        }
    }

    println!();
}
