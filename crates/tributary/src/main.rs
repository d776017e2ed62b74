//! Tributary CLI - inspect and maintain an entity dependency graph.
//!
//! Entities are applied from YAML/JSON manifests; the graph can then be
//! queried for dependencies, dependants and a deployment order.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{DeletePolicyArg, DependencyTypeArg, KindArg};

/// Tributary: dependency graph engine for infrastructure entities.
#[derive(Parser)]
#[command(name = "tributary")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Database path (overrides the config file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file
    #[arg(long, global = true, default_value = tributary::config::CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Project the entities belong to
    #[arg(long, global = true, default_value = "default")]
    project: String,

    /// Environment the entities belong to
    #[arg(long = "env", global = true, default_value = "default")]
    environment: String,

    /// Entity kind
    #[arg(long, global = true, value_enum, default_value_t = KindArg::Resource)]
    kind: KindArg,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update entities from a YAML or JSON manifest
    Apply {
        /// Manifest file
        manifest: PathBuf,
    },

    /// Delete an entity
    Delete {
        /// Entity name
        name: String,

        /// What happens to entities that depend on it (defaults to the config file)
        #[arg(long, value_enum)]
        policy: Option<DeletePolicyArg>,
    },

    /// Show everything an entity depends on
    Deps {
        /// Entity name
        name: String,

        /// Only routes whose last hop was declared this way
        #[arg(long = "type", value_enum)]
        dep_type: Option<DependencyTypeArg>,

        /// Show every route instead of one line per dependency
        #[arg(long)]
        paths: bool,
    },

    /// Show everything that depends on an entity
    Dependants {
        /// Entity name
        name: String,
    },

    /// Print the entities in deployment order (dependencies first)
    Order,

    /// Audit the stored graph for invariant violations
    Check,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let target = cli::Target {
        kind: cli.kind.into(),
        scope: tributary::Scope::new(cli.project, cli.environment),
    };

    let result = cli::open(cli.db, &cli.config).and_then(|graph| match cli.command {
        Commands::Apply { manifest } => cli::apply::run(&graph, &target, &manifest),
        Commands::Delete { name, policy } => {
            cli::delete::run(&graph, &target, &name, policy.map(Into::into))
        }
        Commands::Deps {
            name,
            dep_type,
            paths,
        } => cli::deps::run(&graph, &target, &name, dep_type.map(Into::into), paths),
        Commands::Dependants { name } => cli::deps::run_dependants(&graph, &target, &name),
        Commands::Order => cli::order::run(&graph, &target),
        Commands::Check => cli::check::run(&graph),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", "error".red().bold());
            // Show cause chain for nested errors
            for cause in e.chain().skip(1) {
                eprintln!("  {}: {cause}", "caused by".dimmed());
            }
            ExitCode::FAILURE
        }
    }
}
