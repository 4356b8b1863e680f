// pdfshelf CLI - add, search, list, cover, title, remove
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pdfshelf::commands::{self, SearchStyle};
use pdfshelf::config::{self, ShelfConfig, APP_NAME};
use pdfshelf::storage::Library;

#[derive(Parser, Debug)]
#[command(name = "pdfshelf", author, version)]
#[command(about = "Index PDF files for full-text search, keep their covers and guess their titles")]
struct Cli {
    /// Database name. Created in the config directory unless it contains a path separator
    #[arg(short = 'n', long = "db")]
    db: Option<String>,

    /// Ghostscript executable, looked up on PATH
    #[arg(short = 'e', long = "gs")]
    gs: Option<String>,

    /// Config file (default: <config dir>/pdfshelf/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add the pdfs at paths to the index, walking directories
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Search pdfs for terms (SQLite FTS5 query syntax)
    Search {
        /// Fetch at most n documents
        #[arg(short = 'n', long = "limit", default_value_t = 10)]
        limit: usize,
        /// Show pdf names only
        #[arg(short = 't', long = "names-only")]
        names_only: bool,
        /// Don't highlight matches with ANSI bold
        #[arg(long)]
        no_bold: bool,
        query: String,
    },
    /// List pdfs whose paths match SQL LIKE expressions
    List {
        #[arg(required = true)]
        exprs: Vec<String>,
    },
    /// Show the cover of a pdf by id
    Cover {
        /// The pdf viewer to use, looked up on PATH
        #[arg(short = 'V', long, default_value = "evince")]
        viewer: String,
        id: i64,
    },
    /// Guess the title of a pdf file without indexing it
    Title { file: PathBuf },
    /// Remove a pdf from the index by id
    Remove { id: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{APP_NAME}: {err:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "pdfshelf=debug" } else { "pdfshelf=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ShelfConfig::load(cli.config.as_deref())?;
    if let Some(gs) = cli.gs {
        config.index.ghostscript = gs;
    }
    if let Some(db) = cli.db {
        config.index.database = db;
    }

    let mut out = io::stdout();
    match cli.command {
        Commands::Add { paths } => {
            let library = open_library(&config)?;
            let report = commands::add(&library, &config, &paths).await?;
            commands::write_add_summary(&mut out, &report, &library.stats()?)?;
        }
        Commands::Search { limit, names_only, no_bold, query } => {
            let library = open_library(&config)?;
            let style = SearchStyle { names_only, bold: !no_bold };
            commands::search(&library, &mut out, &query, limit, style)?;
        }
        Commands::List { exprs } => {
            let library = open_library(&config)?;
            commands::list(&library, &mut out, &exprs)?;
        }
        Commands::Cover { viewer, id } => {
            let library = open_library(&config)?;
            commands::show_cover(&library, id, &viewer)?;
        }
        Commands::Title { file } => commands::title(&config, &mut out, &file).await?,
        Commands::Remove { id } => {
            let library = open_library(&config)?;
            commands::remove(&library, id)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn open_library(config: &ShelfConfig) -> Result<Library> {
    let path = config::database_path(&config.index.database)?;
    Library::open(&path)
}
