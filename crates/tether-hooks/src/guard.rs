use anyhow::Context;
use std::path::PathBuf;
use tether_core::{content_hash, NEW_FILE_SENTINEL};

/// Result of comparing a claimed pre-image hash with the live file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardStatus {
    Ok,
    /// The file changed since the caller read it.
    Stale { current_hash: String },
    /// The caller believed the file existed, but it does not.
    Conflict,
}

/// Optimistic concurrency over workspace files, keyed by content hash.
///
/// Read-time only: nothing is locked between the check and the write.
#[derive(Debug, Clone)]
pub struct ConcurrencyGuard {
    root: PathBuf,
}

impl ConcurrencyGuard {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Compare `claimed_hash` against `rel_path` as it is right now.
    pub fn check(&self, rel_path: &str, claimed_hash: &str) -> anyhow::Result<GuardStatus> {
        let full = self.root.join(rel_path);
        match std::fs::read(&full) {
            Ok(bytes) => {
                let current_hash = content_hash(&bytes);
                if current_hash == claimed_hash {
                    Ok(GuardStatus::Ok)
                } else {
                    Ok(GuardStatus::Stale { current_hash })
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if claimed_hash == NEW_FILE_SENTINEL {
                    Ok(GuardStatus::Ok)
                } else {
                    Ok(GuardStatus::Conflict)
                }
            }
            Err(e) => Err(e).with_context(|| format!("reading {}", full.display())),
        }
    }

    /// Fingerprint to hand an agent as its next `initial_hash`.
    pub fn fingerprint(&self, rel_path: &str) -> anyhow::Result<String> {
        let full = self.root.join(rel_path);
        match std::fs::read(&full) {
            Ok(bytes) => Ok(content_hash(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(NEW_FILE_SENTINEL.to_string()),
            Err(e) => Err(e).with_context(|| format!("reading {}", full.display())),
        }
    }
}
