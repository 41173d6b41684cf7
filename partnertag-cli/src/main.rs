use anyhow::{Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use partnertag_backend::MappingStore;
use partnertag_core::{CategorySource, StatementService, StatementSummary};
use std::path::PathBuf;
use tracing::info;

mod backend;
mod categorize;
mod config;
mod logging;
mod state;

use backend::Backend;
use config::{BackendKind, Config};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PARTNERTAG_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "partnertag", version = VERSION, about = "Sort statement partners into budget categories")]
struct Cli {
    /// -v info, -vv debug, -vvv trace. RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Backend to talk to (overrides backend.kind)
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendKind>,

    /// Statement service URL (overrides backend.base_url)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Partner file for the local backend (overrides backend.partners_file)
    #[arg(long, global = true)]
    partners: Option<PathBuf>,

    /// Mapping directory for the local backend (overrides backend.data_dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Walk uncategorized partners and assign categories interactively
    Categorize {
        /// Partners fetched per request; 1 asks the backend after every commit
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Print the category catalog
    Catalog,

    /// Print statement insights from the statement service
    Insights,

    /// Upload a bank statement CSV to the statement service
    Upload {
        /// Path to the statement file
        file: PathBuf,
    },

    /// Print the local expense and income mapping tables
    Mapping,

    /// Manage ~/.partnertag/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,
    /// Print the effective config
    Show,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let mut cfg = config::load_config()?;
    apply_overrides(&mut cfg, &cli);

    match cli.command {
        Command::Categorize { batch_size } => {
            let batch_size = batch_size.unwrap_or(cfg.flow.batch_size);
            let backend = Backend::from_config(&cfg.backend)?;
            info!(backend = %backend.describe(), batch_size, "starting categorization");
            categorize::run_interactive(&backend, categorize::mode_for(batch_size)).await?;
        }

        Command::Catalog => {
            let backend = Backend::from_config(&cfg.backend)?;
            let catalog = backend.categories().list().await?;
            for c in catalog.iter() {
                println!("{} {}", c.glyph, c.name);
                for sub in &c.subcategories {
                    println!("    {sub}");
                }
            }
        }

        Command::Insights => {
            let backend = Backend::from_config(&cfg.backend)?;
            let summary = backend.statements()?.insights().await?;
            print_summary(&summary);
        }

        Command::Upload { file } => {
            if !file.exists() {
                bail!("statement not found: {}", file.display());
            }
            let backend = Backend::from_config(&cfg.backend)?;
            let summary = backend.statements()?.upload(&file).await?;
            println!("Uploaded {}\n", file.display());
            print_summary(&summary);
        }

        Command::Mapping => {
            if cfg.backend.kind != BackendKind::Local {
                bail!("mapping tables live with the statement service; use --backend local to read local ones");
            }
            let store = MappingStore::load(cfg.backend.data_dir()?)?;
            let tables = store.tables();
            println!("# Expense ({})", tables.expense.len());
            for (partner, label) in &tables.expense {
                println!("{partner}: {label}");
            }
            println!("\n# Income ({})", tables.income.len());
            for (partner, label) in &tables.income {
                println!("{partner}: {label}");
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => print!("{}", toml::to_string_pretty(&cfg)?),
            ConfigCommand::Path => println!("{}", config::config_path()?.display()),
        },
    }

    Ok(())
}

fn apply_overrides(cfg: &mut Config, cli: &Cli) {
    if let Some(kind) = cli.backend {
        cfg.backend.kind = kind;
    }
    if let Some(url) = &cli.base_url {
        cfg.backend.base_url = url.clone();
    }
    if let Some(p) = &cli.partners {
        cfg.backend.partners_file = Some(p.clone());
        // A partner file only makes sense locally.
        if cli.backend.is_none() {
            cfg.backend.kind = BackendKind::Local;
        }
    }
    if let Some(d) = &cli.data_dir {
        cfg.backend.data_dir = Some(d.clone());
    }
}

fn print_summary(summary: &StatementSummary) {
    let rows = summary.headline();
    if rows.is_empty() {
        println!("(no headline figures in the response)");
    }
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        println!("{label:<width$}  {value}");
    }
}
