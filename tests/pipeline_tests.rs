//! Batch pipeline tests
//!
//! End-to-end build runs over synthetic temporary roots: precedence,
//! template exclusion, resolution, permissions, multi-destination
//! equality, and partial-failure semantics.

use std::fs;
use std::path::Path;

use envdist::config::{PathsConfig, ResolverConfig, RunConfig, StrategyKind};
use envdist::summary::Status;
use envdist::{Pipeline, Tier};
use tempfile::TempDir;

/// Build a run config over temporary roots for the given services.
fn test_config(root: &Path, services: &[&str], output_roots: &[&str]) -> RunConfig {
    RunConfig {
        schema_version: 1,
        services: services.iter().map(|s| s.to_string()).collect(),
        paths: PathsConfig {
            repos_root: root.join("repos"),
            staging_root: root.join("staging"),
            output_roots: output_roots.iter().map(|r| root.join(r)).collect(),
        },
        resolver: ResolverConfig::default(),
    }
}

fn stage(root: &Path, service: &str, file: &str, content: &str) {
    let dir = root.join("staging").join(service);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), content).unwrap();
}

fn artifact(root: &Path, out: &str, service: &str, tier: Tier) -> String {
    let path = root
        .join(out)
        .join(service)
        .join(tier.as_str())
        .join(format!("{service}.{tier}.env"));
    fs::read_to_string(path).unwrap()
}

#[test]
fn tier_file_overrides_base() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "PORT=1000\n");
    stage(dir.path(), "db", ".env.production", "PORT=2000\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist"]));
    let summary = pipeline.run_build(None, Some(Tier::Production)).unwrap();
    assert_eq!(summary.succeeded, 1);

    let content = artifact(dir.path(), "dist", "db", Tier::Production);
    // Both assignments survive the merge; the later one wins wherever the
    // key is referenced.
    assert!(content.ends_with("PORT=2000\n"));
}

#[test]
fn local_file_overrides_tier_at_resolution() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "PORT=1000\nADDR=host:${PORT}\n");
    stage(dir.path(), "db", ".env.production", "PORT=2000\n");
    stage(dir.path(), "db", ".env.production.local", "PORT=3000\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist"]));
    pipeline.run_build(None, Some(Tier::Production)).unwrap();

    let content = artifact(dir.path(), "dist", "db", Tier::Production);
    assert!(content.contains("ADDR=host:3000"));
}

#[test]
fn template_paths_contribute_nothing() {
    let dir = TempDir::new().unwrap();
    // The service directory itself marks everything under it as a
    // template.
    stage(dir.path(), "example-db", ".env", "SECRET=s3cret\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["example-db"], &["dist"]));
    let summary = pipeline.run_build(None, Some(Tier::Development)).unwrap();

    assert_eq!(summary.skipped, 1);
    assert!(!dir.path().join("dist").join("example-db").exists());
}

#[test]
fn nested_references_resolve_in_artifact() {
    let dir = TempDir::new().unwrap();
    stage(
        dir.path(),
        "api",
        ".env",
        "HOST=db\nPORT=5432\nURL=${HOST}:${PORT}/app\n",
    );

    let pipeline = Pipeline::new(test_config(dir.path(), &["api"], &["dist"]));
    pipeline.run_build(None, Some(Tier::Development)).unwrap();

    let content = artifact(dir.path(), "dist", "api", Tier::Development);
    assert!(content.contains("URL=db:5432/app"));
}

#[test]
fn unresolved_reference_passes_through_with_warning() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "api", ".env", "URL=${MISSING}/x\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["api"], &["dist"]));
    let summary = pipeline.run_build(None, Some(Tier::Development)).unwrap();

    let content = artifact(dir.path(), "dist", "api", Tier::Development);
    assert!(content.contains("URL=${MISSING}/x"));

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.status, Status::Success);
    assert!(outcome
        .warnings
        .iter()
        .any(|w| w.contains("${MISSING}")));
}

#[test]
fn missing_local_file_is_tolerated() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "A=1\n");
    stage(dir.path(), "db", ".env.production", "B=2\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist"]));
    let summary = pipeline.run_build(None, Some(Tier::Production)).unwrap();
    assert_eq!(summary.succeeded, 1);

    let content = artifact(dir.path(), "dist", "db", Tier::Production);
    assert_eq!(content, "A=1\nB=2\n");
}

#[test]
fn no_usable_source_skips_service_and_batch_continues() {
    let dir = TempDir::new().unwrap();
    // "empty" has only a .local file, which is never sufficient.
    stage(dir.path(), "empty", ".env.production.local", "A=1\n");
    stage(dir.path(), "db", ".env", "A=1\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["empty", "db"], &["dist"]));
    let summary = pipeline.run_build(None, Some(Tier::Production)).unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.status, Status::Success);
    assert_eq!(summary.exit_code(), 0);
}

#[test]
fn missing_service_directory_skips_with_warning() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "A=1\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["ghost", "db"], &["dist"]));
    let summary = pipeline.run_build(None, Some(Tier::Development)).unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.exit_code(), 0);

    let ghost = summary
        .outcomes
        .iter()
        .find(|o| o.service == "ghost")
        .unwrap();
    assert!(ghost.warnings[0].contains("not found"));
}

#[cfg(unix)]
#[test]
fn artifacts_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "A=1\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist"]));
    let summary = pipeline.run_build(None, Some(Tier::Development)).unwrap();

    let report = &summary.outcomes[0].artifacts[0];
    let mode = fs::metadata(&report.path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn both_output_roots_receive_identical_bytes() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "A=1\nB=${A}\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist", "dist-mirror"]));
    let summary = pipeline.run_build(None, Some(Tier::Development)).unwrap();

    let outcome = &summary.outcomes[0];
    assert_eq!(outcome.artifacts.len(), 2);
    assert_eq!(outcome.artifacts[0].sha256, outcome.artifacts[1].sha256);

    let a = artifact(dir.path(), "dist", "db", Tier::Development);
    let b = artifact(dir.path(), "dist-mirror", "db", Tier::Development);
    assert_eq!(a, b);
}

#[test]
fn build_is_deterministic() {
    let dir = TempDir::new().unwrap();
    stage(
        dir.path(),
        "db",
        ".env",
        "A=1\nB=${A}\nC=${B}${MISSING}\n# note\n",
    );

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist"]));
    pipeline.run_build(None, Some(Tier::Development)).unwrap();
    let first = artifact(dir.path(), "dist", "db", Tier::Development);

    pipeline.run_build(None, Some(Tier::Development)).unwrap();
    let second = artifact(dir.path(), "dist", "db", Tier::Development);
    assert_eq!(first, second);
}

#[test]
fn artifact_is_fully_overwritten_not_appended() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "A=1\nB=2\nC=3\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist"]));
    pipeline.run_build(None, Some(Tier::Development)).unwrap();

    stage(dir.path(), "db", ".env", "A=1\n");
    pipeline.run_build(None, Some(Tier::Development)).unwrap();

    let content = artifact(dir.path(), "dist", "db", Tier::Development);
    assert_eq!(content, "A=1\n");
}

#[test]
fn comments_and_whitespace_are_stripped_from_artifacts() {
    let dir = TempDir::new().unwrap();
    stage(
        dir.path(),
        "db",
        ".env",
        "PORT=1000  # legacy\n\n# PORT=999\nHOST=db   \n",
    );

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist"]));
    pipeline.run_build(None, Some(Tier::Development)).unwrap();

    let content = artifact(dir.path(), "dist", "db", Tier::Development);
    assert_eq!(content, "PORT=1000\nHOST=db\n");
}

#[test]
fn write_failure_is_contained_to_the_pair() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "bad", ".env", "A=1\n");
    stage(dir.path(), "good", ".env", "A=1\n");

    // Block "bad"'s destination with a plain file where a directory is
    // needed.
    fs::create_dir_all(dir.path().join("dist")).unwrap();
    fs::write(dir.path().join("dist").join("bad"), "blocker").unwrap();

    let pipeline = Pipeline::new(test_config(dir.path(), &["bad", "good"], &["dist"]));
    let summary = pipeline.run_build(None, Some(Tier::Development)).unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.status, Status::Failed);
    assert_eq!(summary.exit_code(), 50);

    // The healthy service still produced its artifact.
    let content = artifact(dir.path(), "dist", "good", Tier::Development);
    assert_eq!(content, "A=1\n");
}

#[test]
fn unknown_service_filter_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "A=1\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist"]));
    let result = pipeline.run_build(Some("nope"), None);
    assert!(result.is_err());
    assert_eq!(result.unwrap_err().exit_code(), 1);
}

#[test]
fn default_build_covers_both_tiers() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "A=1\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist"]));
    let summary = pipeline.run_build(None, None).unwrap();

    assert_eq!(summary.pair_count, 2);
    assert!(dir
        .path()
        .join("dist/db/development/db.development.env")
        .is_file());
    assert!(dir
        .path()
        .join("dist/db/production/db.production.env")
        .is_file());
}

#[test]
fn fixed_point_strategy_resolves_chains_single_pass_leaves() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "A=x\nB=${A}/y\nC=${B}/z\n");

    let mut config = test_config(dir.path(), &["db"], &["dist"]);
    config.resolver = ResolverConfig {
        strategy: StrategyKind::FixedPoint,
        max_depth: 8,
    };

    let pipeline = Pipeline::new(config);
    pipeline.run_build(None, Some(Tier::Development)).unwrap();

    let content = artifact(dir.path(), "dist", "db", Tier::Development);
    assert!(content.contains("C=x/y/z"));
}

#[test]
fn explain_reports_sources_without_writing() {
    let dir = TempDir::new().unwrap();
    stage(dir.path(), "db", ".env", "A=1\n");

    let pipeline = Pipeline::new(test_config(dir.path(), &["db"], &["dist"]));
    let explanation = pipeline.explain("db", Tier::Production).unwrap();

    assert!(explanation.usable);
    assert_eq!(explanation.artifact_paths.len(), 1);
    assert!(!dir.path().join("dist").exists(), "explain must not write");

    let human = explanation.to_human();
    assert!(human.contains("present"));
    assert!(human.contains("absent"));
}
