use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use equivreg::cli::scan::ScanOptions;
use equivreg::models::EquivregConfig;
use equivreg::Result;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "equivreg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Registry of certified-equivalent software versions", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (defaults to ./equivreg.toml; built-in defaults if absent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan recently closed change requests for new equivalence names
    Scan {
        /// Trailing window in days (overrides the config)
        #[arg(short, long)]
        days: Option<i64>,

        /// Report new entries without writing the name registry
        #[arg(long)]
        dry_run: bool,

        /// Keep a copy of every fetched manifest under this directory
        #[arg(long, value_name = "DIR")]
        save_manifests: Option<PathBuf>,

        /// Write a spreadsheet summary of the scanned manifests
        #[arg(long, value_name = "PATH")]
        summary: Option<PathBuf>,
    },

    /// Validate the results document
    Check,

    /// Validate the results document and regenerate README, CSV and XLSX
    Report,

    /// Record the equiv_names declared in the results document
    #[command(name = "sync-names")]
    SyncNames,

    /// Print the JSON Schema of the results document
    Schema,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    // Network calls are awaited one at a time; a single thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    if let Err(e) = runtime.block_on(run_async(cli)) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

async fn run_async(cli: Cli) -> Result<()> {
    let project_root = std::env::current_dir()?;
    let config = EquivregConfig::locate(cli.config.as_deref(), &project_root)?;

    match cli.command {
        Commands::Scan {
            days,
            dry_run,
            save_manifests,
            summary,
        } => {
            let options = ScanOptions {
                days,
                dry_run,
                save_manifests,
                summary,
            };
            equivreg::cli::scan::run(&config, &project_root, options).await?;
        }

        Commands::Check => {
            equivreg::cli::check::run(&config, &project_root)?;
        }

        Commands::Report => {
            equivreg::cli::report::run(&config, &project_root)?;
        }

        Commands::SyncNames => {
            equivreg::cli::sync_names::run(&config, &project_root)?;
        }

        Commands::Schema => {
            equivreg::cli::schema::run(&config)?;
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "equivreg", &mut io::stdout());
        }
    }

    Ok(())
}
