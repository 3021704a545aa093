//! IPAM allocation CLI (ipamctl)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ipam_alloc_core::AllocatorConfig;
use ipam_shared_types::ObjectId;
use ipamctl::commands::{
    AllocateArgs, AllocateCommand, AvailableCommand, ConfigCommand, NewParent, OutputFormat,
    ParentCommand, RecordKind, ReleaseCommand, Resource,
};
use ipamctl::Session;

#[derive(Parser)]
#[command(name = "ipamctl")]
#[command(about = "IPAM available-resource allocation CLI")]
#[command(version)]
#[command(long_about = "
IPAM available-resource allocation CLI

Lists and allocates free child prefixes, IP addresses, ASNs and VLAN IDs
from the parents stored in a JSON inventory.

Examples:
  ipamctl parent add prefix 192.0.2.0/24 --vrf 1      # Seed a prefix
  ipamctl parent add vlan-group core --vids 100-199   # Seed a VLAN group
  ipamctl parent list                                 # Show all parents
  ipamctl available prefixes 1 --limit 0              # Every free block
  ipamctl allocate prefixes 1 -p 26 -c 2              # Two /26 children
  ipamctl allocate vlans 2 --name uplink --vid 120    # Pinned VLAN
  ipamctl release prefix 7                            # Free a child again
  ipamctl generate-config -o allocator.toml           # Default config
")]
struct Cli {
    /// JSON inventory file
    #[arg(long, global = true, default_value = "/var/lib/ipam/inventory.json")]
    store: PathBuf,

    /// Allocator configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List free units of a parent
    Available {
        #[arg(value_enum)]
        resource: Resource,

        /// Parent id
        id: ObjectId,

        /// Maximum number of units, 0 for all
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Allocate units from a parent in one batch
    Allocate {
        #[arg(value_enum)]
        resource: Resource,

        /// Parent id
        id: ObjectId,

        #[command(flatten)]
        args: AllocateArgs,
    },

    /// Manage parent spaces
    Parent {
        #[command(subcommand)]
        action: ParentAction,
    },

    /// Delete an allocated record
    Release {
        #[arg(value_enum)]
        kind: RecordKind,

        id: ObjectId,
    },

    /// Show the effective configuration
    Config,

    /// Generate example configuration
    GenerateConfig {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ParentAction {
    /// Add a parent space
    Add {
        #[command(subcommand)]
        parent: NewParent,
    },

    /// List parent spaces
    List,
}

fn load_config(path: Option<&PathBuf>) -> Result<AllocatorConfig> {
    let config = match path {
        Some(path) => AllocatorConfig::load_from_file(path)?,
        None => AllocatorConfig::load_with_defaults()?,
    };
    Ok(config)
}

async fn open_session(store: &Path, config: Option<&PathBuf>) -> Result<Arc<Session>> {
    Session::open(store, load_config(config)?).await
}

async fn run(cli: Cli) -> Result<String> {
    let config = cli.config.as_ref();

    match cli.command {
        Commands::Available {
            resource,
            id,
            limit,
        } => {
            let session = open_session(&cli.store, config).await?;
            AvailableCommand::new(session)
                .execute(resource, id, limit, cli.format)
                .await
        }

        Commands::Allocate { resource, id, args } => {
            let session = open_session(&cli.store, config).await?;
            AllocateCommand::new(session)
                .execute(resource, id, &args, cli.format)
                .await
        }

        Commands::Parent { action } => {
            let cmd = ParentCommand::new(open_session(&cli.store, config).await?);
            match action {
                ParentAction::Add { parent } => cmd.add(parent).await,
                ParentAction::List => cmd.list(cli.format).await,
            }
        }

        Commands::Release { kind, id } => {
            let session = open_session(&cli.store, config).await?;
            ReleaseCommand::new(session).execute(kind, id).await
        }

        Commands::Config => ConfigCommand::show(&load_config(config)?),

        Commands::GenerateConfig { output } => ConfigCommand::generate(output.as_deref()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let log_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {}", e);

            // Print error chain if in verbose mode
            if verbose {
                for cause in e.chain().skip(1) {
                    eprintln!("  Caused by: {}", cause);
                }
            }
            std::process::exit(1);
        }
    }
}
