//! Artifact writing and verification
//!
//! Serializes a resolved document to one or more destination roots with
//! owner-only permissions, and reports per-destination sizes and digests
//! for operator verification.

use std::fs;
use std::path::{Path, PathBuf};

use envdist_engine::Tier;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Artifact files are readable and writable by the owner only.
pub const ARTIFACT_MODE: u32 = 0o600;

/// Errors raised while writing an artifact.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Verification record for one written destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub lines: usize,
    pub sha256: String,
}

/// Relative artifact path under an output root:
/// `<service>/<tier>/<service>.<tier>.env`.
pub fn artifact_relpath(service: &str, tier: Tier) -> PathBuf {
    PathBuf::from(service)
        .join(tier.as_str())
        .join(format!("{service}.{tier}.env"))
}

/// Compute the hex SHA-256 digest of artifact content.
pub fn content_sha256(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Removes the temporary sibling on every exit path unless the rename
/// into place disarmed it.
struct TempCleanup {
    path: PathBuf,
    armed: bool,
}

impl Drop for TempCleanup {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Write `content` to `dest` with mode 600.
///
/// The content goes to a temporary sibling first and is renamed into place,
/// so the destination is either absent (or its previous version) or fully
/// written, never partial.
pub fn write_artifact(content: &str, dest: &Path) -> Result<ArtifactReport, WriteError> {
    let io_err = |source| WriteError::Io {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = dest.with_extension("env.tmp");
    let mut cleanup = TempCleanup {
        path: tmp.clone(),
        armed: true,
    };

    fs::write(&tmp, content).map_err(io_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(ARTIFACT_MODE)).map_err(io_err)?;
    }

    fs::rename(&tmp, dest).map_err(io_err)?;
    cleanup.armed = false;

    Ok(ArtifactReport {
        path: dest.to_path_buf(),
        bytes: content.len() as u64,
        lines: content.lines().count(),
        sha256: content_sha256(content),
    })
}

/// Write `content` to every destination.
///
/// Stops at the first failing destination; destinations already written are
/// not rolled back. Best-effort across destinations, not transactional.
pub fn write_all(content: &str, dests: &[PathBuf]) -> Result<Vec<ArtifactReport>, WriteError> {
    let mut reports = Vec::with_capacity(dests.len());
    for dest in dests {
        reports.push(write_artifact(content, dest)?);
    }
    Ok(reports)
}

/// Whether every written destination carries the same digest.
pub fn destinations_identical(reports: &[ArtifactReport]) -> bool {
    reports
        .windows(2)
        .all(|pair| pair[0].sha256 == pair[1].sha256)
}
