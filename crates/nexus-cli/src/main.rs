//! Nexus CLI
//!
//! Command-line entry point for:
//! - Creating and seeding the demo database (`init`)
//! - Inspecting the live schema profile (`schema`)
//! - Asking natural-language questions (`query`)
//! - Running sentinel scans and browsing their history (`scan`, `history`)

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use nexus_nl2sql::llm::format_schema;
use nexus_nl2sql::{run_query_pipeline, Settings};
use nexus_sentinel::{get_history, list_history, run_scan, run_scan_stream};
use nexus_store::{demo::seed_demo_data, Store};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser)]
#[command(name = "nexus")]
#[command(author, version, about = "Nexus: natural-language analytics over a relational store")]
struct Cli {
    /// JSON settings file (overridden by environment, then by flags)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// SQL generation mode: rules | llm
    #[arg(long, global = true)]
    mode: Option<String>,

    /// LLM provider: openai | gemini | anthropic | ollama | stub
    #[arg(long, global = true)]
    provider: Option<String>,

    /// LLM model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and seed demo data
    Init,

    /// Print every table with its columns
    Schema,

    /// Answer a natural-language question
    Query {
        question: String,

        /// Analysis domain (security, compliance, risk, operations, general)
        #[arg(long)]
        domain: Option<String>,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a sentinel scan
    Scan {
        #[arg(long, default_value = "general")]
        domain: String,

        /// Print progress events as they happen
        #[arg(long)]
        stream: bool,

        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List past scans, or show one
    History { scan_id: Option<String> },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_settings(&cli)?;
    tracing::debug!(?settings, "settings loaded");

    let store = Store::open(&settings.database_path)
        .with_context(|| format!("failed to open {}", settings.database_path.display()))?;

    match cli.command {
        Commands::Init => {
            let seeded = seed_demo_data(&store).context("failed to seed demo data")?;
            let what = if seeded {
                "seeded demo data into"
            } else {
                "demo data already present in"
            };
            eprintln!(
                "{} {what} {}",
                "ok".green().bold(),
                settings.database_path.display().to_string().bold()
            );
        }
        Commands::Schema => {
            let schema = store.schema_profile().context("schema introspection failed")?;
            if schema.is_empty() {
                eprintln!("{} no tables (run `nexus init`)", "info:".yellow().bold());
            } else {
                println!("{}", format_schema(&schema));
            }
        }
        Commands::Query {
            question,
            domain,
            json,
        } => {
            let result = run_query_pipeline(&store, &settings, &question, domain.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                render::print_pipeline_result(&result);
            }
            if result.error.is_some() {
                return Ok(ExitCode::from(2));
            }
        }
        Commands::Scan {
            domain,
            stream,
            json,
        } => {
            let result = if stream {
                run_scan_stream(&store, &settings, &domain, |event| {
                    println!("event: {}\ndata: {}\n", event.name(), event.payload());
                })?
            } else {
                run_scan(&store, &settings, &domain)?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else if !stream {
                render::print_scan(&result);
            }
        }
        Commands::History { scan_id: None } => {
            render::print_history(&list_history(&store)?);
        }
        Commands::History {
            scan_id: Some(scan_id),
        } => match get_history(&store, &scan_id)? {
            Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
            None => {
                eprintln!("{} Scan not found", "error:".red().bold());
                return Ok(ExitCode::FAILURE);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(db) = &cli.db {
        settings.database_path = db.clone();
    }
    if let Some(mode) = &cli.mode {
        settings.nl2sql_mode = mode.parse()?;
    }
    if let Some(provider) = &cli.provider {
        settings.llm_provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        settings.llm_model = model.clone();
    }
    Ok(settings)
}
