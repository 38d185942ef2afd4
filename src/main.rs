mod db;
mod fetch;
mod filter;
mod jooble;
mod logger;
mod models;
mod parse;
mod search;
mod widen;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use db::Database;
use fetch::FetchClient;
use search::{SearchConfig, SearchEngine};
use widen::SynonymTable;

#[derive(Parser)]
#[command(name = "trawl")]
#[command(about = "Job listing trawler - widen a search, scrape the results, keep what matches")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the listing store
    Init {
        /// Path to the SQLite store (platform data dir when omitted)
        store_path: Option<PathBuf>,
    },

    /// Run one search: widen the keywords, scrape every variant, store results
    Run {
        /// Path to the SQLite store
        store_path: PathBuf,

        /// Search phrase, e.g. "software engineer"
        keywords: String,

        /// Region filter, e.g. "Milano" (empty string for anywhere)
        location: String,

        /// Result pages fetched per phrase variant at most
        #[arg(long, default_value = "10")]
        max_pages: usize,

        /// JSON file replacing the built-in synonym table
        #[arg(long)]
        synonyms: Option<PathBuf>,
    },

    /// List stored jobs
    List {
        /// Path to the SQLite store
        store_path: PathBuf,

        /// Only jobs not yet marked read
        #[arg(short, long)]
        unread: bool,
    },

    /// Mark a stored job as read
    Read {
        /// Path to the SQLite store
        store_path: PathBuf,

        /// Job ID
        id: i64,
    },

    /// Mark a stored job as applied to
    Applied {
        /// Path to the SQLite store
        store_path: PathBuf,

        /// Job ID
        id: i64,
    },
}

fn main() -> Result<()> {
    logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { store_path } => {
            let db = match store_path {
                Some(path) => Database::open(&path)?,
                None => Database::open_default()?,
            };
            db.init()?;
            println!("Store initialized at {}", db.path().display());
        }

        Commands::Run {
            store_path,
            keywords,
            location,
            max_pages,
            synonyms,
        } => {
            let mut db = Database::open(&store_path)?;
            db.init()?;

            let synonyms = match synonyms {
                Some(path) => SynonymTable::from_json_file(&path)?,
                None => SynonymTable::default(),
            };

            let config = SearchConfig {
                synonyms,
                max_pages,
                ..SearchConfig::default()
            };
            let fetcher = FetchClient::new(config.fetch.clone())?;
            let engine = SearchEngine::new(fetcher, config);

            let summary = engine.run(&mut db, &keywords, &location)?;
            info!("Added {} new Jooble jobs to the database.", summary.new_jobs);
            info!("Total filtered jobs: {}", summary.total_filtered);
            info!("Store now holds {} job(s).", db.count_jobs()?);
        }

        Commands::List { store_path, unread } => {
            let db = Database::open(&store_path)?;
            db.ensure_initialized()?;
            let jobs = db.list_jobs(unread)?;
            if jobs.is_empty() {
                println!("No jobs found.");
            } else {
                println!(
                    "{:<6} {:<5} {:<30} {:<22} {:<16} {:<10}",
                    "ID", "FLAGS", "TITLE", "COMPANY", "LOCATION", "FETCHED"
                );
                println!("{}", "-".repeat(93));
                for job in jobs {
                    let flags = format!(
                        "{}{}",
                        if job.read { 'r' } else { '-' },
                        if job.applied { 'a' } else { '-' }
                    );
                    println!(
                        "{:<6} {:<5} {:<30} {:<22} {:<16} {:<10}",
                        job.id,
                        flags,
                        truncate(&job.title, 28),
                        truncate(&job.company, 20),
                        truncate(&job.location, 14),
                        truncate(&job.fetched_date, 10)
                    );
                }
            }
        }

        Commands::Read { store_path, id } => {
            let db = Database::open(&store_path)?;
            db.ensure_initialized()?;
            if db.mark_read(id)? {
                println!("Marked job #{} as read.", id);
            } else {
                println!("Job #{} not found.", id);
            }
        }

        Commands::Applied { store_path, id } => {
            let db = Database::open(&store_path)?;
            db.ensure_initialized()?;
            if db.mark_applied(id)? {
                println!("Marked job #{} as applied.", id);
            } else {
                println!("Job #{} not found.", id);
            }
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
