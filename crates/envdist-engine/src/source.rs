//! Override file location for one (service, tier) pair.
//!
//! A service directory may carry up to three override files, consulted in
//! fixed precedence order: `.env`, `.env.<tier>`, `.env.<tier>.local`.
//! Later files override earlier ones at resolution time.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::Tier;

/// Substring that marks a file as a template. Template files are never
/// processed, regardless of tier.
pub const TEMPLATE_MARKER: &str = "example";

/// Errors raised while locating or reading override files.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("service directory not found: {0}")]
    MissingServiceDir(PathBuf),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Position of an override file in the precedence chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideKind {
    Base,
    Tier,
    TierLocal,
}

/// Descriptor for one candidate override file.
#[derive(Debug, Clone, Serialize)]
pub struct OverrideFile {
    pub kind: OverrideKind,
    pub path: PathBuf,
    /// Whether the file exists. Absent files are skipped, never an error.
    pub present: bool,
    /// Whether the path marks the file as a template.
    pub template: bool,
}

impl OverrideFile {
    fn locate(kind: OverrideKind, path: PathBuf) -> Self {
        let present = path.is_file();
        let template = path.to_string_lossy().contains(TEMPLATE_MARKER);
        Self {
            kind,
            path,
            present,
            template,
        }
    }

    /// A file takes part in the merge when it exists and is not a template.
    pub fn contributes(&self) -> bool {
        self.present && !self.template
    }
}

/// The ordered trio of candidate override files for one (service, tier).
#[derive(Debug, Clone, Serialize)]
pub struct SourceSet {
    pub service_dir: PathBuf,
    pub tier: Tier,
    /// Candidates in precedence order: base, tier, tier-local.
    pub files: [OverrideFile; 3],
}

impl SourceSet {
    /// Locate the candidate override files under `service_dir` for `tier`.
    ///
    /// Missing files are tagged absent rather than failing; only a missing
    /// service directory is an error.
    pub fn locate(service_dir: &Path, tier: Tier) -> Result<Self, SourceError> {
        if !service_dir.is_dir() {
            return Err(SourceError::MissingServiceDir(service_dir.to_path_buf()));
        }

        let files = [
            OverrideFile::locate(OverrideKind::Base, service_dir.join(".env")),
            OverrideFile::locate(OverrideKind::Tier, service_dir.join(format!(".env.{tier}"))),
            OverrideFile::locate(
                OverrideKind::TierLocal,
                service_dir.join(format!(".env.{tier}.local")),
            ),
        ];

        Ok(Self {
            service_dir: service_dir.to_path_buf(),
            tier,
            files,
        })
    }

    /// A source set is usable only when the base or the tier file
    /// contributes. A `.local` file on its own is never sufficient.
    pub fn usable(&self) -> bool {
        self.files[0].contributes() || self.files[1].contributes()
    }

    /// Files that take part in the merge, in precedence order.
    pub fn contributing(&self) -> impl Iterator<Item = &OverrideFile> {
        self.files.iter().filter(|f| f.contributes())
    }
}
