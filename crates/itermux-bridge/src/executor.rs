//! AutomationBridge trait and ScriptBridge (process-per-call executor).
//!
//! One interpreter process per call. The invoking side enforces its own
//! wall clock on top of the harness step budget and kills the process when
//! it expires. The script artifact is owned by the call and removed on
//! every exit path.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;

use crate::artifact::{self, write_script};
use crate::error::BridgeError;
use crate::harness::render_script;
use crate::step::Step;

/// Fields written by the harness on success.
pub type Payload = serde_json::Map<String, Value>;

/// Executes step lists against the terminal. Enables mock injection for
/// testing.
pub trait AutomationBridge {
    fn execute(&self, steps: &[Step]) -> impl Future<Output = Result<Payload, BridgeError>> + Send;
}

impl<T: AutomationBridge + Sync + ?Sized> AutomationBridge for &T {
    fn execute(&self, steps: &[Step]) -> impl Future<Output = Result<Payload, BridgeError>> + Send {
        (**self).execute(steps)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Interpreter used to run the rendered script.
    pub interpreter: String,
    /// Directory for transient scripts.
    pub script_dir: PathBuf,
    /// Budget enforced inside the harness.
    pub step_timeout: Duration,
    /// Wall clock enforced here, including interpreter startup.
    pub process_timeout: Duration,
    /// Scripts older than this are swept at startup.
    pub stale_after: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            script_dir: std::env::temp_dir(),
            step_timeout: Duration::from_secs(30),
            process_timeout: Duration::from_secs(35),
            stale_after: Duration::from_secs(300),
        }
    }
}

/// Real bridge: renders the harness and runs it with the configured
/// interpreter.
#[derive(Debug, Clone, Default)]
pub struct ScriptBridge {
    config: BridgeConfig,
}

impl ScriptBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Remove scripts left behind by crashed processes.
    pub fn sweep_stale_artifacts(&self) -> std::io::Result<usize> {
        artifact::sweep_stale_artifacts(&self.config.script_dir, self.config.stale_after)
    }

    /// Run an already rendered script and parse its single JSON line.
    pub async fn run_script(&self, source: &str) -> Result<Payload, BridgeError> {
        let script = write_script(&self.config.script_dir, source)?;

        let child = Command::new(&self.config.interpreter)
            .arg(script.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(BridgeError::Spawn)?;

        // On timeout the future is dropped together with the child, and
        // kill_on_drop terminates the process.
        let output =
            match tokio::time::timeout(self.config.process_timeout, child.wait_with_output()).await
            {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        "bridge script exceeded {}s, killed",
                        self.config.process_timeout.as_secs_f64()
                    );
                    return Err(BridgeError::Timeout {
                        after: self.config.process_timeout,
                    });
                }
            };

        if let Err(e) = script.close() {
            tracing::warn!("failed to remove bridge script: {e}");
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        log_stderr(&stderr);

        if !output.status.success() {
            return Err(BridgeError::ExitStatus {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        parse_payload(&String::from_utf8_lossy(&output.stdout), self.config.step_timeout)
    }
}

impl AutomationBridge for ScriptBridge {
    async fn execute(&self, steps: &[Step]) -> Result<Payload, BridgeError> {
        let source = render_script(steps, self.config.step_timeout)
            .map_err(|e| BridgeError::Protocol(format!("cannot encode steps: {e}")))?;
        tracing::debug!(steps = steps.len(), "running bridge script");
        self.run_script(&source).await
    }
}

fn log_stderr(stderr: &str) {
    for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("Warning") {
            tracing::debug!("bridge: {line}");
        } else {
            tracing::warn!("bridge stderr: {line}");
        }
    }
}

/// Parse harness stdout: the last non-empty line must be a JSON object.
///
/// An `error` field turns into the matching [`BridgeError`]; everything
/// else is returned as the success payload.
pub fn parse_payload(stdout: &str, step_timeout: Duration) -> Result<Payload, BridgeError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| BridgeError::Protocol("bridge produced no output".to_string()))?;

    let value: Value = serde_json::from_str(line)
        .map_err(|e| BridgeError::Protocol(format!("unparseable bridge output: {e}")))?;
    let Value::Object(payload) = value else {
        return Err(BridgeError::Protocol(
            "bridge output is not a JSON object".to_string(),
        ));
    };

    let Some(error) = payload.get("error") else {
        return Ok(payload);
    };
    let message = match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let kind = payload
        .get("errorType")
        .and_then(Value::as_str)
        .unwrap_or("Error")
        .to_string();

    Err(match kind.as_str() {
        "TimeoutError" => BridgeError::Timeout {
            after: step_timeout,
        },
        "ConnectionError" | "ConnectionRefusedError" => BridgeError::Connection(message),
        _ => BridgeError::Domain {
            kind,
            message,
            traceback: payload
                .get("traceback")
                .and_then(Value::as_str)
                .map(String::from),
        },
    })
}
