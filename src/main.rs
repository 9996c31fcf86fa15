//! envdist CLI
//!
//! Entry point for the `envdist` command-line tool.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use envdist::pipeline::Explanation;
use envdist::sync::{build_rsync_args, push, render_command, SyncRequest};
use envdist::{Pipeline, RunConfig, TargetInventory, Tier};

#[derive(Parser)]
#[command(name = "envdist")]
#[command(about = "Per-service env config merge, resolve, and distribution", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage raw .env* sources from the per-service repositories
    Pull {
        /// Path to run config file (default: envdist.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Only stage this service
        #[arg(long)]
        service: Option<String>,
    },

    /// Merge, resolve, and write artifacts for the configured services
    Build {
        /// Path to run config file (default: envdist.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Only build this service
        #[arg(long)]
        service: Option<String>,

        /// Only build this tier (development or production; default: both)
        #[arg(long)]
        tier: Option<String>,

        /// Output the run summary in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the located override files for one pair without writing
    Explain {
        /// Service name
        service: String,

        /// Tier (development or production)
        tier: String,

        /// Path to run config file (default: envdist.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Push resolved artifacts to a named remote target
    Push {
        /// Target name from the inventory
        target: String,

        /// Path to run config file (default: envdist.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Path to target inventory file (default: targets.toml)
        #[arg(long, short = 'i')]
        inventory: Option<PathBuf>,

        /// Only push this service's subtree
        #[arg(long)]
        service: Option<String>,

        /// Print the rsync invocation without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Target inventory commands
    Targets {
        #[command(subcommand)]
        action: TargetsCommands,
    },

    /// Verify the run configuration
    Verify {
        /// Path to run config file (default: envdist.toml)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TargetsCommands {
    /// List configured targets
    List {
        /// Path to target inventory file (default: targets.toml)
        #[arg(long, short = 'i')]
        inventory: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pull { config, service } => {
            run_pull(config, service.as_deref());
        }
        Commands::Build {
            config,
            service,
            tier,
            json,
        } => {
            run_build(config, service.as_deref(), tier.as_deref(), json);
        }
        Commands::Explain {
            service,
            tier,
            config,
            json,
        } => {
            run_explain(config, &service, &tier, json);
        }
        Commands::Push {
            target,
            config,
            inventory,
            service,
            dry_run,
        } => {
            run_push(config, inventory, &target, service.as_deref(), dry_run);
        }
        Commands::Targets { action } => match action {
            TargetsCommands::List { inventory, json } => {
                run_targets_list(inventory, json);
            }
        },
        Commands::Verify { config } => {
            run_verify(config);
        }
    }
}

fn load_config(path: Option<PathBuf>) -> RunConfig {
    let path = path.unwrap_or_else(|| PathBuf::from("envdist.toml"));
    match RunConfig::from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    }
}

fn load_inventory(path: Option<PathBuf>) -> TargetInventory {
    let path = path.unwrap_or_else(|| PathBuf::from("targets.toml"));
    match TargetInventory::load(&path) {
        Ok(inventory) => inventory,
        Err(e) => {
            eprintln!("Error loading target inventory: {}", e);
            process::exit(1);
        }
    }
}

fn parse_tier(s: &str) -> Tier {
    match s.parse::<Tier>() {
        Ok(tier) => tier,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_pull(config_path: Option<PathBuf>, service: Option<&str>) {
    let pipeline = Pipeline::new(load_config(config_path));

    let reports = match pipeline.run_pull(service) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    };

    for report in &reports {
        match &report.warning {
            Some(warning) => println!("{}: skipped ({})", report.service, warning),
            None => println!("{}: staged {} file(s)", report.service, report.staged.len()),
        }
    }
}

fn run_build(
    config_path: Option<PathBuf>,
    service: Option<&str>,
    tier: Option<&str>,
    json: bool,
) {
    let tier = tier.map(parse_tier);
    let pipeline = Pipeline::new(load_config(config_path));

    let summary = match pipeline.run_build(service, tier) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    };

    if json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        print!("{}", summary.render_human());
    }

    process::exit(summary.exit_code());
}

fn run_explain(config_path: Option<PathBuf>, service: &str, tier: &str, json: bool) {
    let tier = parse_tier(tier);
    let pipeline = Pipeline::new(load_config(config_path));

    let explanation: Explanation = match pipeline.explain(service, tier) {
        Ok(explanation) => explanation,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    };

    if json {
        match explanation.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        print!("{}", explanation.to_human());
    }
}

fn run_push(
    config_path: Option<PathBuf>,
    inventory_path: Option<PathBuf>,
    target_name: &str,
    service: Option<&str>,
    dry_run: bool,
) {
    let config = load_config(config_path);
    let inventory = load_inventory(inventory_path);

    let target = match inventory.get(target_name) {
        Some(target) => target,
        None => {
            eprintln!("Target '{}' not found in inventory.", target_name);
            eprintln!("Available targets: {}", inventory.names().join(", "));
            process::exit(1);
        }
    };

    if let Some(service) = service {
        if !config.has_service(service) {
            eprintln!("Unknown service: '{}'", service);
            process::exit(1);
        }
    }

    // Artifacts travel from the primary output root; mirror roots are
    // local copies only.
    let local_root = &config.paths.output_roots[0];
    let request = SyncRequest {
        target,
        local_root,
        service,
    };

    if dry_run {
        println!("{}", render_command(&build_rsync_args(&request)));
        return;
    }

    match push(&request) {
        Ok(()) => {
            println!(
                "Pushed {} to {} ({})",
                local_root.display(),
                target.name,
                target.ssh_destination()
            );
        }
        Err(e) => {
            eprintln!("Push failed: {}", e);
            process::exit(20);
        }
    }
}

fn run_targets_list(inventory_path: Option<PathBuf>, json_output: bool) {
    let inventory = load_inventory(inventory_path);

    if json_output {
        match serde_json::to_string_pretty(&inventory.targets) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    if inventory.targets.is_empty() {
        println!("No targets configured.");
        return;
    }

    println!("Configured targets ({} total):\n", inventory.targets.len());
    for target in &inventory.targets {
        println!("  {} ({})", target.name, target.host);
        println!(
            "    Remote: {}:{}",
            target.ssh_destination(),
            target.path
        );
        if target.port != 22 {
            println!("    Port: {}", target.port);
        }
        if let Some(ref key) = target.ssh_key_path {
            println!("    SSH Key: {}", key);
        }
        println!();
    }
}

fn run_verify(config_path: Option<PathBuf>) {
    let path = config_path.unwrap_or_else(|| PathBuf::from("envdist.toml"));

    match RunConfig::from_file(&path) {
        Ok(config) => {
            println!("Configuration valid: {}", path.display());
            println!();
            println!("  Services: {}", config.services.join(", "));
            println!("  Repos root: {}", config.paths.repos_root.display());
            println!("  Staging root: {}", config.paths.staging_root.display());
            println!(
                "  Output roots: {}",
                config
                    .paths
                    .output_roots
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!("  Resolver: {:?}", config.resolver.strategy());
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    }
}
