//! Source staging
//!
//! The pull step copies raw `.env*` files from each service repository
//! checkout into the staging root, where the engine picks them up. Only
//! top-level `.env*` files are staged; everything else in the repository
//! is ignored.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Errors raised while staging a service's sources.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("repository directory not found: {0}")]
    MissingRepoDir(PathBuf),

    #[error("failed to stage {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What `pull` did for one service.
#[derive(Debug, Clone)]
pub struct PullReport {
    pub service: String,
    /// File names copied into the staging directory, sorted.
    pub staged: Vec<String>,
    pub warning: Option<String>,
}

/// Copy the top-level `.env*` files from `repo_dir` into `staging_dir`,
/// overwriting stale copies. Template files are copied as-is; the engine
/// excludes them later.
pub fn pull_service(repo_dir: &Path, staging_dir: &Path) -> Result<Vec<String>, StagingError> {
    if !repo_dir.is_dir() {
        return Err(StagingError::MissingRepoDir(repo_dir.to_path_buf()));
    }

    fs::create_dir_all(staging_dir).map_err(|source| StagingError::Io {
        path: staging_dir.to_path_buf(),
        source,
    })?;

    let mut staged = Vec::new();
    for entry in WalkDir::new(repo_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| StagingError::Io {
            path: repo_dir.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(".env") {
            continue;
        }
        let dest = staging_dir.join(&name);
        fs::copy(entry.path(), &dest).map_err(|source| StagingError::Io {
            path: dest.clone(),
            source,
        })?;
        staged.push(name);
    }

    Ok(staged)
}
