//! Remote target inventory
//!
//! Parses and validates the target inventory file (`targets.toml`). Each
//! target entry describes a remote host that receives resolved artifacts
//! via the push step.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Target inventory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetInventory {
    /// Schema version for forward compatibility.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// List of targets.
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetEntry>,
}

fn default_schema_version() -> u32 {
    1
}

/// A single deployment target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetEntry {
    /// Unique identifier for this target (must be unique across inventory).
    pub name: String,

    /// SSH hostname or IP address.
    pub host: String,

    /// SSH port (default: 22).
    #[serde(default = "default_port")]
    pub port: u16,

    /// SSH user (default: "deploy").
    #[serde(default = "default_user")]
    pub user: String,

    /// Remote root directory that receives artifacts.
    pub path: String,

    /// Path to SSH private key.
    #[serde(alias = "identity_file")]
    pub ssh_key_path: Option<String>,
}

fn default_port() -> u16 {
    22
}

fn default_user() -> String {
    "deploy".to_string()
}

/// Errors that can occur when loading or validating the target inventory.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("failed to read inventory file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("inventory file not found: {0}")]
    NotFound(PathBuf),

    #[error("duplicate target name: '{0}'")]
    DuplicateName(String),

    #[error("target '{name}': missing required field '{field}'")]
    MissingField { name: String, field: String },

    #[error("target '{name}': invalid value for '{field}': {reason}")]
    InvalidValue {
        name: String,
        field: String,
        reason: String,
    },
}

impl TargetInventory {
    /// Load the target inventory from a specific path.
    pub fn load(path: &Path) -> Result<Self, InventoryError> {
        if !path.exists() {
            return Err(InventoryError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse the target inventory from a TOML string.
    pub fn parse(content: &str) -> Result<Self, InventoryError> {
        let inventory: TargetInventory = toml::from_str(content)?;
        inventory.validate()?;
        Ok(inventory)
    }

    fn validate(&self) -> Result<(), InventoryError> {
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(&target.name) {
                return Err(InventoryError::DuplicateName(target.name.clone()));
            }
        }
        for target in &self.targets {
            target.validate()?;
        }
        Ok(())
    }

    /// Get a target by name.
    pub fn get(&self, name: &str) -> Option<&TargetEntry> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Target names, for error messages.
    pub fn names(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.name.as_str()).collect()
    }
}

impl TargetEntry {
    fn validate(&self) -> Result<(), InventoryError> {
        if self.name.is_empty() {
            return Err(InventoryError::MissingField {
                name: "(unnamed)".to_string(),
                field: "name".to_string(),
            });
        }

        if !self
            .name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        {
            return Err(InventoryError::InvalidValue {
                name: self.name.clone(),
                field: "name".to_string(),
                reason: "name must contain only alphanumeric characters, dashes, and underscores"
                    .to_string(),
            });
        }

        if self.host.is_empty() {
            return Err(InventoryError::MissingField {
                name: self.name.clone(),
                field: "host".to_string(),
            });
        }

        if self.port == 0 {
            return Err(InventoryError::InvalidValue {
                name: self.name.clone(),
                field: "port".to_string(),
                reason: "port cannot be 0".to_string(),
            });
        }

        if self.user.is_empty() {
            return Err(InventoryError::InvalidValue {
                name: self.name.clone(),
                field: "user".to_string(),
                reason: "user cannot be empty".to_string(),
            });
        }

        if self.path.is_empty() {
            return Err(InventoryError::MissingField {
                name: self.name.clone(),
                field: "path".to_string(),
            });
        }

        Ok(())
    }

    /// `user@host` form used on the rsync command line.
    pub fn ssh_destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Expanded SSH key path (resolves `~` to the home directory).
    pub fn expanded_ssh_key_path(&self) -> Option<PathBuf> {
        self.ssh_key_path.as_ref().map(|p| {
            if let Some(rest) = p.strip_prefix("~/") {
                if let Ok(home) = std::env::var("HOME") {
                    return PathBuf::from(home).join(rest);
                }
            }
            PathBuf::from(p)
        })
    }
}
