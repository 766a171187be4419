//! svcschema command-line tool
//!
//! Lints schemas and runs property sets through the engine against a local
//! SQLite store:
//!
//!   svcschema check-schema vm.schema.json
//!   svcschema validate --schema vm.schema.json --properties req.json
//!   svcschema pool allocate --service <uuid> --schema vm.schema.json
//!
//! Results are printed to stdout as JSON. The exit code is 1 when the
//! request was rejected.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use svcschema_cli::commands::{self, Outcome, ValidateRequest};
use svcschema_cli::CliConfig;
use svcschema_store::SqliteStore;
use svcschema_types::{ActorKind, Operation, ServiceId};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "svcschema")]
#[command(about = "Validate service properties against a property schema")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "svcschema.toml")]
    config: PathBuf,

    /// SQLite database, overriding the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a schema file for structural and configuration errors
    CheckSchema {
        /// Schema JSON file
        schema: PathBuf,
    },

    /// Validate, authorize and generate a property set
    Validate {
        #[arg(long)]
        schema: PathBuf,

        /// JSON object of raw property values
        #[arg(long)]
        properties: PathBuf,

        #[arg(long, default_value = "create")]
        operation: Operation,

        /// Acting actor kind (admin, participant or agent)
        #[arg(long)]
        actor: Option<ActorKind>,

        /// Stored service the properties belong to
        #[arg(long)]
        service: Option<ServiceId>,
    },

    /// Allocate or release a service's pool values
    Pool {
        #[command(subcommand)]
        action: PoolAction,
    },
}

#[derive(Subcommand, Debug)]
enum PoolAction {
    /// Generate every pool-backed property the service lacks
    Allocate {
        #[arg(long)]
        service: ServiceId,
        #[arg(long)]
        schema: PathBuf,
    },
    /// Return everything the service holds to its pools
    Release {
        #[arg(long)]
        service: ServiceId,
        #[arg(long)]
        schema: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let builder = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    match EnvFilter::try_from_default_env() {
        Ok(filter) if !verbose => builder.with_env_filter(filter).init(),
        _ => {
            let level = if verbose { Level::DEBUG } else { Level::INFO };
            builder.with_max_level(level).init();
        }
    }
}

fn open_store(args: &Args, config: &CliConfig) -> Result<SqliteStore> {
    let path = args.db.clone().unwrap_or_else(|| config.store.path.clone());
    info!("Using store at {:?}", path);
    SqliteStore::open(&path).with_context(|| format!("Failed to open store {}", path.display()))
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = CliConfig::load_from(&args.config);
    let engine = config.engine();

    let outcome = match &args.command {
        Command::CheckSchema { schema } => {
            let schema = commands::load_schema(schema)?;
            commands::check_schema(&engine, &schema)?
        }
        Command::Validate {
            schema,
            properties,
            operation,
            actor,
            service,
        } => {
            let request = ValidateRequest {
                schema: commands::load_schema(schema)?,
                properties: commands::load_properties(properties)?,
                operation: *operation,
                actor: actor.unwrap_or(config.engine.actor),
                service: *service,
            };
            let store = open_store(&args, &config)?;
            commands::validate(&engine, &store, &request)?
        }
        Command::Pool { action } => {
            let store = open_store(&args, &config)?;
            let actor = config.engine.actor;
            match action {
                PoolAction::Allocate { service, schema } => {
                    let schema = commands::load_schema(schema)?;
                    commands::allocate(&engine, &store, &schema, *service, actor)?
                }
                PoolAction::Release { service, schema } => {
                    let schema = commands::load_schema(schema)?;
                    commands::release(&engine, &store, &schema, *service, actor)?
                }
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(outcome.document())?);
    Ok(match outcome {
        Outcome::Accepted(_) => ExitCode::SUCCESS,
        Outcome::Rejected(_) => ExitCode::from(1),
    })
}
