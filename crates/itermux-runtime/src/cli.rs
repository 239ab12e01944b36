//! CLI definition using clap derive.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use itermux_bridge::BridgeConfig;

#[derive(Parser)]
#[command(name = "itermux", about = "iTerm2 automation tool server")]
pub struct Cli {
    /// Python interpreter with the `iterm2` package installed
    #[arg(long, global = true, env = "ITERMUX_PYTHON", default_value = "python3")]
    pub python: String,

    /// Directory for transient bridge scripts (default: OS temp dir)
    #[arg(long, global = true, env = "ITERMUX_SCRIPT_DIR")]
    pub script_dir: Option<PathBuf>,

    /// Step budget enforced inside each bridge script
    #[arg(long, global = true, env = "ITERMUX_STEP_TIMEOUT", default_value = "30")]
    pub step_timeout_secs: u64,

    /// Wall clock enforced on each bridge process
    #[arg(long, global = true, env = "ITERMUX_PROCESS_TIMEOUT", default_value = "35")]
    pub process_timeout_secs: u64,

    /// Age above which leftover bridge scripts are deleted at startup
    #[arg(long, global = true, default_value = "300")]
    pub stale_after_secs: u64,

    /// Polling interval of monitor-session in milliseconds
    #[arg(long, global = true, default_value = "1000")]
    pub monitor_interval_ms: u64,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Serve tools over stdio JSON-RPC (default)
    Serve,
    /// Run a single tool and print its text result
    Call(CallOpts),
    /// Print the tool catalog as JSON
    Tools,
}

#[derive(clap::Args)]
pub struct CallOpts {
    /// Tool name, e.g. open-terminal
    pub tool: String,

    /// Tool arguments as a JSON object
    #[arg(default_value = "{}")]
    pub arguments: String,
}

impl Cli {
    pub fn bridge_config(&self) -> BridgeConfig {
        let defaults = BridgeConfig::default();
        BridgeConfig {
            interpreter: self.python.clone(),
            script_dir: self.script_dir.clone().unwrap_or(defaults.script_dir),
            step_timeout: Duration::from_secs(self.step_timeout_secs),
            process_timeout: Duration::from_secs(self.process_timeout_secs),
            stale_after: Duration::from_secs(self.stale_after_secs),
        }
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms.max(1))
    }
}
