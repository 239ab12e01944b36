//! itermux: iTerm2 automation tool server.
//! Single process: stdio tool server, dispatcher, tracker and bridge.

use anyhow::Context;
use clap::Parser;

use itermux_bridge::{BridgeConfig, ScriptBridge};

mod catalog;
mod cli;
mod monitor;
mod server;
#[cfg(test)]
mod testing;
mod tools;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // stdout carries protocol frames and tool output; logs go to stderr.
    let filter = std::env::var("ITERMUX_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = args.bridge_config();
    let monitor_interval = args.monitor_interval();
    let command = args.command.unwrap_or(cli::Command::Serve);

    match command {
        cli::Command::Serve => {
            let mut dispatcher = tools::ToolDispatcher::new(start_bridge(config))
                .with_monitor_interval(monitor_interval);
            server::serve_stdio(&mut dispatcher).await?;
            tracing::info!(
                panes = dispatcher.tracker().pane_count(),
                "itermux stopped"
            );
        }
        cli::Command::Call(opts) => {
            let arguments: serde_json::Value = serde_json::from_str(&opts.arguments)
                .with_context(|| format!("tool arguments are not JSON: {}", opts.arguments))?;
            let mut dispatcher = tools::ToolDispatcher::new(start_bridge(config))
                .with_monitor_interval(monitor_interval);
            let result = dispatcher.call(&opts.tool, arguments).await;
            println!("{}", result.text);
            if result.is_error {
                std::process::exit(1);
            }
        }
        cli::Command::Tools => {
            println!("{}", serde_json::to_string_pretty(&catalog::catalog())?);
        }
    }

    Ok(())
}

/// Build the bridge, first clearing scripts a crashed run left behind.
fn start_bridge(config: BridgeConfig) -> ScriptBridge {
    let bridge = ScriptBridge::new(config);
    if let Err(e) = bridge.sweep_stale_artifacts() {
        tracing::warn!("stale script sweep failed: {e}");
    }
    bridge
}
