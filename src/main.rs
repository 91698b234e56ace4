//! CLI entry point for siteops

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "siteops")]
#[command(version)]
#[command(about = "Content loading and deploy monitoring for the website", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a local content file and print its front-matter and body
    Parse {
        /// File to parse
        file: PathBuf,

        /// Render the body to HTML
        #[arg(long)]
        html: bool,
    },

    /// Fetch a content fragment through the configured source
    Fetch {
        /// Content path, relative to the content base
        path: String,

        /// Decode the fragment as JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },

    /// List content documents
    #[command(alias = "ls")]
    List,

    /// Wait for the deploy triggered by a content save
    Monitor {
        /// Start time of the triggering action (RFC 3339, defaults to now)
        #[arg(long)]
        since: Option<String>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "siteops=debug,info"
    } else {
        "siteops=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    match cli.command {
        Commands::Parse { file, html } => {
            let file = if file.is_absolute() {
                file
            } else {
                base_dir.join(file)
            };
            siteops::commands::parse::run(&file, html)?;
        }

        Commands::Fetch { path, json } => {
            let site = siteops::Site::new(&base_dir)?;
            siteops::commands::fetch::run(&site, &path, json).await?;
        }

        Commands::List => {
            let site = siteops::Site::new(&base_dir)?;
            siteops::commands::list::run(&site).await?;
        }

        Commands::Monitor { since } => {
            let site = siteops::Site::new(&base_dir)?;
            let since = since
                .map(|s| {
                    DateTime::parse_from_rfc3339(&s)
                        .map(|t| t.with_timezone(&Utc))
                        .with_context(|| format!("Invalid --since time: {}", s))
                })
                .transpose()?;

            let outcome = siteops::commands::monitor::run(&site, since).await?;
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Version => {
            println!("siteops version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
