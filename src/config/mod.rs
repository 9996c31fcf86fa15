//! Run configuration
//!
//! Parses and validates `envdist.toml`, which names the managed services,
//! the filesystem roots, and the resolver strategy. The service list and
//! roots are explicit configuration rather than hard-coded conventions, so
//! the engine can run against synthetic temporary roots in tests.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use envdist_engine::{Strategy, Tier};
use serde::{Deserialize, Serialize};

/// Errors that can occur when loading or validating the run config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("no services configured")]
    NoServices,

    #[error("duplicate service name: '{0}'")]
    DuplicateService(String),

    #[error("invalid service name '{0}': must contain only alphanumeric characters, dashes, and underscores")]
    InvalidServiceName(String),

    #[error("no output roots configured")]
    NoOutputRoots,

    #[error("resolver max_depth must be at least 1")]
    InvalidMaxDepth,
}

/// Run configuration (`envdist.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Schema version for forward compatibility.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Services whose configuration is managed (e.g. `["bor-db"]`).
    #[serde(default)]
    pub services: Vec<String>,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

fn default_schema_version() -> u32 {
    1
}

/// Filesystem roots the run operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root holding one checked-out repository per service; `pull` reads
    /// `.env*` files from `<repos_root>/<service>/`.
    #[serde(default = "default_repos_root")]
    pub repos_root: PathBuf,

    /// Root the engine reads override files from, one subdirectory per
    /// service.
    #[serde(default = "default_staging_root")]
    pub staging_root: PathBuf,

    /// Destination roots for resolved artifacts. Every root receives an
    /// identical copy.
    #[serde(default = "default_output_roots")]
    pub output_roots: Vec<PathBuf>,
}

fn default_repos_root() -> PathBuf {
    PathBuf::from("repos")
}

fn default_staging_root() -> PathBuf {
    PathBuf::from("staging")
}

fn default_output_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("dist")]
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            repos_root: default_repos_root(),
            staging_root: default_staging_root(),
            output_roots: default_output_roots(),
        }
    }
}

/// Resolver strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Iteration bound for the fixed-point strategy.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    8
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            max_depth: default_max_depth(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// One substitution pass over literal bindings. Matches the historical
    /// behavior of the shell-based tooling this replaces.
    #[default]
    SinglePass,
    /// Iterate substitution to convergence before emitting.
    FixedPoint,
}

impl ResolverConfig {
    pub fn strategy(&self) -> Strategy {
        match self.strategy {
            StrategyKind::SinglePass => Strategy::SinglePass,
            StrategyKind::FixedPoint => Strategy::FixedPoint {
                max_depth: self.max_depth,
            },
        }
    }
}

impl RunConfig {
    /// Load the run config from a specific path.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse the run config from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if !is_valid_name(service) {
                return Err(ConfigError::InvalidServiceName(service.clone()));
            }
            if !seen.insert(service) {
                return Err(ConfigError::DuplicateService(service.clone()));
            }
        }

        if self.paths.output_roots.is_empty() {
            return Err(ConfigError::NoOutputRoots);
        }

        if self.resolver.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth);
        }

        Ok(())
    }

    /// Whether `service` is in the managed set.
    pub fn has_service(&self, service: &str) -> bool {
        self.services.iter().any(|s| s == service)
    }

    /// The staged source directory for one service.
    pub fn service_dir(&self, service: &str) -> PathBuf {
        self.paths.staging_root.join(service)
    }

    /// The repository checkout directory for one service.
    pub fn repo_dir(&self, service: &str) -> PathBuf {
        self.paths.repos_root.join(service)
    }

    /// Artifact destinations for one (service, tier), one per output root.
    pub fn artifact_paths(&self, service: &str, tier: Tier) -> Vec<PathBuf> {
        self.paths
            .output_roots
            .iter()
            .map(|root| root.join(crate::artifact::artifact_relpath(service, tier)))
            .collect()
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
