//! Run reporting
//!
//! Per-pair outcomes and the aggregated run summary. Every artifact
//! actually written is listed with its size; skipped and failed pairs are
//! called out explicitly, never silently omitted.

use chrono::{DateTime, Utc};
use envdist_engine::Tier;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::artifact::ArtifactReport;

/// Schema version for the JSON run summary.
pub const RUN_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for the JSON run summary.
pub const RUN_SUMMARY_SCHEMA_ID: &str = "envdist/run_summary@1";

/// Outcome class for one (service, tier) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Artifacts written to every output root.
    Success,
    /// No usable source; nothing written, warning emitted.
    Skipped,
    /// Processing or writing failed; error recorded.
    Failed,
}

/// Result of processing one (service, tier) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOutcome {
    pub service: String,
    pub tier: Tier,
    pub status: Status,

    /// Artifacts written, one per output root. May be partial on failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<ArtifactReport>,

    /// Recoverable findings: skip reasons, unresolved references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceOutcome {
    pub fn success(
        service: &str,
        tier: Tier,
        artifacts: Vec<ArtifactReport>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            service: service.to_string(),
            tier,
            status: Status::Success,
            artifacts,
            warnings,
            error: None,
        }
    }

    pub fn skipped(service: &str, tier: Tier, reason: String) -> Self {
        Self {
            service: service.to_string(),
            tier,
            status: Status::Skipped,
            artifacts: Vec::new(),
            warnings: vec![reason],
            error: None,
        }
    }

    pub fn failed(
        service: &str,
        tier: Tier,
        error: String,
        artifacts: Vec<ArtifactReport>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            service: service.to_string(),
            tier,
            status: Status::Failed,
            artifacts,
            warnings,
            error: Some(error),
        }
    }
}

/// Aggregated summary of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub schema_id: String,
    pub created_at: DateTime<Utc>,

    /// Aggregate status: `Failed` if any pair failed, else `Success`.
    pub status: Status,

    pub pair_count: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,

    pub duration_ms: u64,
    pub outcomes: Vec<ServiceOutcome>,
    pub human_summary: String,
}

impl RunSummary {
    /// Aggregate per-pair outcomes into a run summary.
    pub fn from_outcomes(outcomes: Vec<ServiceOutcome>, duration_ms: u64) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.status == Status::Success).count();
        let skipped = outcomes.iter().filter(|o| o.status == Status::Skipped).count();
        let failed = outcomes.iter().filter(|o| o.status == Status::Failed).count();

        let status = if failed > 0 {
            Status::Failed
        } else {
            Status::Success
        };

        let human_summary = format!(
            "{} pair(s): {} succeeded, {} skipped, {} failed",
            outcomes.len(),
            succeeded,
            skipped,
            failed
        );

        Self {
            schema_version: RUN_SUMMARY_SCHEMA_VERSION,
            schema_id: RUN_SUMMARY_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            status,
            pair_count: outcomes.len(),
            succeeded,
            skipped,
            failed,
            duration_ms,
            outcomes,
            human_summary,
        }
    }

    /// Process exit code for this run: 0 unless a pair failed.
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            50
        } else {
            0
        }
    }

    /// Human-readable report listing every artifact, skip, and failure.
    pub fn render_human(&self) -> String {
        let mut out = String::new();
        for outcome in &self.outcomes {
            match outcome.status {
                Status::Success => {
                    let _ = writeln!(out, "{} [{}]: ok", outcome.service, outcome.tier);
                }
                Status::Skipped => {
                    let _ = writeln!(out, "{} [{}]: skipped", outcome.service, outcome.tier);
                }
                Status::Failed => {
                    let _ = writeln!(
                        out,
                        "{} [{}]: FAILED: {}",
                        outcome.service,
                        outcome.tier,
                        outcome.error.as_deref().unwrap_or("unknown error")
                    );
                }
            }
            for report in &outcome.artifacts {
                let _ = writeln!(
                    out,
                    "  wrote {} ({} bytes, {} lines)",
                    report.path.display(),
                    report.bytes,
                    report.lines
                );
            }
            for warning in &outcome.warnings {
                let _ = writeln!(out, "  warning: {warning}");
            }
        }
        let _ = writeln!(out, "{}", self.human_summary);
        out
    }
}
