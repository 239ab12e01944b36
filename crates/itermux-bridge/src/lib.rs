//! itermux-bridge: iTerm2 automation IO boundary.
//! Turns a structured step list into a throwaway Python script, runs it
//! out of process with a hard timeout, and parses the single JSON line it
//! prints. No hierarchy bookkeeping here: that belongs to the caller.

pub mod artifact;
pub mod error;
pub mod executor;
pub mod harness;
pub mod listing;
pub mod step;

pub use artifact::{ARTIFACT_PREFIX, ARTIFACT_SUFFIX, sweep_stale_artifacts};
pub use error::BridgeError;
pub use executor::{AutomationBridge, BridgeConfig, Payload, ScriptBridge, parse_payload};
pub use harness::render_script;
pub use listing::{LiveSession, LiveTab, LiveWindow, parse_listing};
pub use step::Step;
