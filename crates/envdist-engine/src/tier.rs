//! Environment tiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Deployment environment tier, determining which override files are
/// consulted (`.env.<tier>` and `.env.<tier>.local`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Development,
    Production,
}

impl Tier {
    /// All tiers, in the order a full batch processes them.
    pub const ALL: [Tier; 2] = [Tier::Development, Tier::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Development => "development",
            Tier::Production => "production",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown tier name.
#[derive(Debug, Error)]
#[error("unknown tier '{0}' (expected 'development' or 'production')")]
pub struct TierParseError(String);

impl FromStr for Tier {
    type Err = TierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(Tier::Development),
            "production" | "prod" => Ok(Tier::Production),
            other => Err(TierParseError(other.to_string())),
        }
    }
}
