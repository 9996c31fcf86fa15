//! Batch driver
//!
//! Processes each (service, tier) pair fully before the next: locate,
//! merge, sanitize, resolve, write. Failures are contained to the current
//! pair; the batch records an outcome and proceeds, and the run summary
//! aggregates everything at the end. Pairs share no mutable state, so the
//! loop is trivially parallelizable, but processing is sequential.

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use envdist_engine::{merge, resolve, sanitize, SourceError, SourceSet, Tier};

use crate::artifact::{self, ArtifactReport};
use crate::config::RunConfig;
use crate::staging::{pull_service, PullReport, StagingError};
use crate::summary::{RunSummary, ServiceOutcome};

/// Pipeline errors. Everything here aborts the invocation; per-pair
/// problems are recorded as outcomes instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown service: '{0}'")]
    UnknownService(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::UnknownService(_) => 1,
            PipelineError::Io(_) => 1,
        }
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Source location read-out for one (service, tier) pair, produced by
/// `explain` without writing anything.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub service: String,
    pub sources: SourceSet,
    pub usable: bool,
    pub artifact_paths: Vec<PathBuf>,
}

impl Explanation {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_human(&self) -> String {
        let mut out = format!("{} [{}]\n", self.service, self.sources.tier);
        for file in &self.sources.files {
            let state = if file.template {
                "template (excluded)"
            } else if file.present {
                "present"
            } else {
                "absent"
            };
            out.push_str(&format!("  {}: {}\n", file.path.display(), state));
        }
        out.push_str(&format!(
            "  usable: {}\n",
            if self.usable { "yes" } else { "no" }
        ));
        for path in &self.artifact_paths {
            out.push_str(&format!("  would write: {}\n", path.display()));
        }
        out
    }
}

/// Batch driver over the configured services and tiers.
pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Services selected for this invocation: the whole configured set, or
    /// a single named one.
    fn select_services(&self, filter: Option<&str>) -> PipelineResult<Vec<String>> {
        match filter {
            Some(service) => {
                if !self.config.has_service(service) {
                    return Err(PipelineError::UnknownService(service.to_string()));
                }
                Ok(vec![service.to_string()])
            }
            None => Ok(self.config.services.clone()),
        }
    }

    /// Run the merge/resolve engine for the selected services and tiers.
    ///
    /// One pass per (service, tier) pair; a failing pair is recorded and
    /// the batch continues.
    pub fn run_build(
        &self,
        service: Option<&str>,
        tier: Option<Tier>,
    ) -> PipelineResult<RunSummary> {
        let services = self.select_services(service)?;
        let tiers: Vec<Tier> = match tier {
            Some(t) => vec![t],
            None => Tier::ALL.to_vec(),
        };

        let started = Instant::now();
        let mut outcomes = Vec::with_capacity(services.len() * tiers.len());
        for service in &services {
            for &tier in &tiers {
                outcomes.push(self.process_pair(service, tier));
            }
        }

        Ok(RunSummary::from_outcomes(
            outcomes,
            started.elapsed().as_millis() as u64,
        ))
    }

    /// Locate, merge, sanitize, resolve, and write one (service, tier)
    /// pair. Never fails the batch: every problem becomes an outcome.
    fn process_pair(&self, service: &str, tier: Tier) -> ServiceOutcome {
        info!(service, %tier, "processing");

        let service_dir = self.config.service_dir(service);
        let sources = match SourceSet::locate(&service_dir, tier) {
            Ok(sources) => sources,
            Err(err @ SourceError::MissingServiceDir(_)) => {
                warn!(service, %tier, "skipping: {err}");
                return ServiceOutcome::skipped(service, tier, err.to_string());
            }
            Err(err) => {
                return ServiceOutcome::failed(service, tier, err.to_string(), vec![], vec![]);
            }
        };

        if !sources.usable() {
            let reason = format!(
                "no usable source: neither .env nor .env.{tier} exists in {}",
                service_dir.display()
            );
            warn!(service, %tier, "skipping: {reason}");
            return ServiceOutcome::skipped(service, tier, reason);
        }

        let merged = match merge(&sources) {
            Ok(doc) => doc,
            Err(err) => {
                return ServiceOutcome::failed(service, tier, err.to_string(), vec![], vec![]);
            }
        };

        let cleaned = sanitize(&merged.lines);
        let resolved = resolve(&cleaned, self.config.resolver.strategy());

        let mut warnings: Vec<String> = resolved
            .unresolved
            .iter()
            .map(|name| format!("unresolved reference: ${{{name}}}"))
            .collect();

        let content = resolved.content();
        let dests = self.config.artifact_paths(service, tier);

        let mut reports: Vec<ArtifactReport> = Vec::with_capacity(dests.len());
        for dest in &dests {
            match artifact::write_artifact(&content, dest) {
                Ok(report) => {
                    info!(service, %tier, path = %report.path.display(), bytes = report.bytes, "wrote artifact");
                    reports.push(report);
                }
                Err(err) => {
                    // Destinations already written stay in place; the pair
                    // is reported failed, the batch continues.
                    return ServiceOutcome::failed(
                        service,
                        tier,
                        err.to_string(),
                        reports,
                        warnings,
                    );
                }
            }
        }

        if !artifact::destinations_identical(&reports) {
            warnings.push("destination copies diverge".to_string());
        }

        ServiceOutcome::success(service, tier, reports, warnings)
    }

    /// Stage raw `.env*` sources from the per-service repositories.
    ///
    /// Missing repositories are per-service warnings, not batch failures.
    pub fn run_pull(&self, service: Option<&str>) -> PipelineResult<Vec<PullReport>> {
        let services = self.select_services(service)?;

        let mut reports = Vec::with_capacity(services.len());
        for service in &services {
            let repo_dir = self.config.repo_dir(service);
            let staging_dir = self.config.service_dir(service);
            match pull_service(&repo_dir, &staging_dir) {
                Ok(staged) => {
                    info!(service, count = staged.len(), "staged sources");
                    reports.push(PullReport {
                        service: service.clone(),
                        staged,
                        warning: None,
                    });
                }
                Err(err @ StagingError::MissingRepoDir(_)) => {
                    warn!(service, "skipping: {err}");
                    reports.push(PullReport {
                        service: service.clone(),
                        staged: Vec::new(),
                        warning: Some(err.to_string()),
                    });
                }
                Err(StagingError::Io { path, source }) => {
                    return Err(PipelineError::Io(io::Error::new(
                        source.kind(),
                        format!("staging {}: {source}", path.display()),
                    )));
                }
            }
        }
        Ok(reports)
    }

    /// Show the located override files and the would-be artifact paths for
    /// one pair, without writing.
    pub fn explain(&self, service: &str, tier: Tier) -> PipelineResult<Explanation> {
        if !self.config.has_service(service) {
            return Err(PipelineError::UnknownService(service.to_string()));
        }

        let service_dir = self.config.service_dir(service);
        let sources = match SourceSet::locate(&service_dir, tier) {
            Ok(sources) => sources,
            Err(SourceError::MissingServiceDir(path)) => {
                return Err(PipelineError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("service directory not found: {}", path.display()),
                )));
            }
            Err(SourceError::Read { path, source }) => {
                return Err(PipelineError::Io(io::Error::new(
                    source.kind(),
                    format!("reading {}: {source}", path.display()),
                )));
            }
        };

        let usable = sources.usable();
        Ok(Explanation {
            service: service.to_string(),
            sources,
            usable,
            artifact_paths: self.config.artifact_paths(service, tier),
        })
    }
}
