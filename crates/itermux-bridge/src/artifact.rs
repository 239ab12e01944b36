//! Transient script artifacts: creation and stale sweep.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;

pub const ARTIFACT_PREFIX: &str = "itermux-bridge-";
pub const ARTIFACT_SUFFIX: &str = ".py";

/// Write `source` to a fresh script file in `dir`.
///
/// The returned handle deletes the file when dropped, whichever way the
/// invocation ends.
pub(crate) fn write_script(dir: &Path, source: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(ARTIFACT_PREFIX)
        .suffix(ARTIFACT_SUFFIX)
        .tempfile_in(dir)?;
    file.write_all(source.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Delete bridge scripts in `dir` last modified more than `older_than` ago.
///
/// Leftovers only exist if a previous process died mid-call. Returns the
/// number of files removed; individual failures are logged and skipped.
pub fn sweep_stale_artifacts(dir: &Path, older_than: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(ARTIFACT_PREFIX) || !name.ends_with(ARTIFACT_SUFFIX) {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!("cannot stat {name}: {e}");
                continue;
            }
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= older_than {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("failed to remove stale bridge script {name}: {e}"),
        }
    }
    if removed > 0 {
        tracing::info!("removed {removed} stale bridge script(s) from {}", dir.display());
    }
    Ok(removed)
}
