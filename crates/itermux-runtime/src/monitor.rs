//! Session monitor: poll advisory variables and log changes.
//!
//! Each poll is one bridge call reading the working directory, the
//! foreground job and the prompt flag. The first snapshot is always
//! recorded; afterwards only snapshots that differ from the previous one.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::time::{Instant, MissedTickBehavior, interval};

use itermux_bridge::{AutomationBridge, BridgeError, Payload, Step};

pub const DEFAULT_DURATION_SECS: f64 = 10.0;
pub const MAX_DURATION_SECS: f64 = 300.0;

const CWD_KEY: &str = "cwd";
const JOB_KEY: &str = "job";
const PROMPT_KEY: &str = "at_prompt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub working_directory: Option<String>,
    pub foreground_job: Option<String>,
    pub at_prompt: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorEntry {
    pub at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub initial: bool,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorReport {
    pub requested_secs: f64,
    pub realized_secs: f64,
    pub polls: u32,
    pub entries: Vec<MonitorEntry>,
}

impl MonitorReport {
    pub fn changes(&self) -> usize {
        self.entries.iter().filter(|e| !e.initial).count()
    }

    pub fn last_snapshot(&self) -> Option<&SessionSnapshot> {
        self.entries.last().map(|e| &e.snapshot)
    }
}

/// Clamp a caller-supplied duration to `1..=300` seconds.
pub fn clamp_duration(secs: f64) -> Duration {
    let secs = if secs.is_finite() { secs } else { DEFAULT_DURATION_SECS };
    Duration::from_secs_f64(secs.clamp(1.0, MAX_DURATION_SECS))
}

pub fn snapshot_steps(session_id: &str) -> Vec<Step> {
    vec![
        Step::find_session(session_id),
        Step::read_variable("path", CWD_KEY),
        Step::read_variable("jobName", JOB_KEY),
        Step::ReadPromptState {
            key: PROMPT_KEY.to_string(),
        },
    ]
}

pub fn snapshot_from_payload(payload: &Payload) -> SessionSnapshot {
    let text = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    SessionSnapshot {
        working_directory: text(CWD_KEY),
        foreground_job: text(JOB_KEY),
        at_prompt: payload
            .get(PROMPT_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

/// Change log: keeps the first snapshot and every one that differs from
/// its predecessor.
#[derive(Debug, Default)]
pub struct ChangeLog {
    last: Option<SessionSnapshot>,
    entries: Vec<MonitorEntry>,
}

impl ChangeLog {
    /// Returns true if the snapshot was recorded.
    pub fn observe(&mut self, snapshot: SessionSnapshot, elapsed: Duration, at: DateTime<Utc>) -> bool {
        if self.last.as_ref() == Some(&snapshot) {
            return false;
        }
        self.entries.push(MonitorEntry {
            at,
            elapsed_secs: elapsed.as_secs_f64(),
            initial: self.last.is_none(),
            snapshot: snapshot.clone(),
        });
        self.last = Some(snapshot);
        true
    }

    pub fn into_entries(self) -> Vec<MonitorEntry> {
        self.entries
    }
}

/// A poll failed; `partial` holds everything recorded before it.
#[derive(Debug, thiserror::Error)]
#[error("monitoring stopped after {} poll(s): {source}", .partial.polls)]
pub struct MonitorError {
    pub partial: MonitorReport,
    #[source]
    pub source: BridgeError,
}

/// Poll `session_id` every `every` until `duration` has elapsed.
///
/// Blocks the caller for the whole window. Any failed poll ends the run.
pub async fn monitor_session<B: AutomationBridge>(
    bridge: &B,
    session_id: &str,
    duration: Duration,
    every: Duration,
) -> Result<MonitorReport, MonitorError> {
    let steps = snapshot_steps(session_id);
    let started = Instant::now();
    let deadline = started + duration;
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut log = ChangeLog::default();
    let mut polls = 0u32;
    loop {
        ticker.tick().await;
        if Instant::now() >= deadline {
            break;
        }
        let payload = match bridge.execute(&steps).await {
            Ok(payload) => payload,
            Err(source) => {
                tracing::warn!(session_id, polls, "monitor poll failed: {source}");
                return Err(MonitorError {
                    partial: MonitorReport {
                        requested_secs: duration.as_secs_f64(),
                        realized_secs: started.elapsed().as_secs_f64(),
                        polls,
                        entries: log.into_entries(),
                    },
                    source,
                });
            }
        };
        polls += 1;
        let snapshot = snapshot_from_payload(&payload);
        if log.observe(snapshot, started.elapsed(), Utc::now()) {
            tracing::debug!(session_id, polls, "monitor snapshot recorded");
        }
    }

    Ok(MonitorReport {
        requested_secs: duration.as_secs_f64(),
        realized_secs: started.elapsed().as_secs_f64(),
        polls,
        entries: log.into_entries(),
    })
}
