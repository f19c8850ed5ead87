//! Mailroom CLI
//!
//! Operations tooling for the newsletter platform:
//! - Summarise function bandwidth from NDJSON logs
//! - Backfill onboarding completion timestamps
//! - Inspect and seed the users table
//! - Generate a default config file

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use mailroom::backfill::{
    backfill_onboarding, BackfillOptions, NewUser, SqliteUserStore, UserStore,
};
use mailroom::cli::{exit_if_interrupted, run_logs, LogsArgs};
use mailroom::config::{generate_default_config, Config};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mailroom")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operations tooling for the newsletter platform")]
#[command(long_about = "Mailroom bundles the one-off jobs that sit next to the newsletter app.\nRead function logs, patch user records, and keep a config around for both.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Per-hour function bandwidth from NDJSON logs
    Logs(LogsArgs),

    /// Set onboarding completion on users that lack it
    BackfillOnboarding {
        /// SQLite users database (default: from config)
        #[arg(long)]
        database: Option<PathBuf>,
        /// Count affected users without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect or seed the users table
    Users {
        /// SQLite users database (default: from config)
        #[arg(long, global = true)]
        database: Option<PathBuf>,
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a user
    Add {
        /// Email address
        email: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Mark onboarding as already completed
        #[arg(long)]
        onboarded: bool,
    },

    /// List users
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;
    mailroom::logging::init(&config.logging);
    tracing::debug!(source = ?config.source, "Configuration loaded");

    match cli.command {
        Commands::Logs(args) => {
            let options = args.resolve(&config.logs)?;
            let outcome = run_logs(&options).await?;
            exit_if_interrupted(&outcome);
        }

        Commands::BackfillOnboarding { database, dry_run } => {
            let path = database.unwrap_or_else(|| config.backfill.database_path());
            let store = open_store(&path)?;

            let report = backfill_onboarding(&store, Utc::now(), BackfillOptions { dry_run })
                .await
                .context("Onboarding backfill failed")?;

            println!("{}", report);
        }

        Commands::Users { database, action } => {
            let path = database.unwrap_or_else(|| config.backfill.database_path());
            let store = open_store(&path)?;

            match action {
                UserCommands::Add {
                    email,
                    name,
                    onboarded,
                } => {
                    let mut user = NewUser::new(email);
                    if let Some(name) = name {
                        user = user.name(name);
                    }
                    if onboarded {
                        user = user.onboarded_at(Utc::now());
                    }

                    let record = store.insert_user(user).await?;
                    println!("Added {} ({})", record.email, record.id);
                }

                UserCommands::List => {
                    let users = store.list_users().await?;

                    if users.is_empty() {
                        println!("No users yet.");
                    } else {
                        println!(
                            "{:<34} {:<30} {:<20} {}",
                            "ID", "Email", "Created", "Onboarded"
                        );
                        println!("{}", "-".repeat(106));

                        for user in users {
                            println!(
                                "{:<34} {:<30} {:<20} {}",
                                user.id,
                                user.email,
                                user.created_at.format("%Y-%m-%d %H:%M"),
                                user.onboarding_completed_at
                                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                                    .unwrap_or_else(|| "-".to_string())
                            );
                        }
                    }
                }
            }
        }

        Commands::Config { output } => {
            let config = generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn open_store(path: &Path) -> anyhow::Result<SqliteUserStore> {
    let store = SqliteUserStore::open(path)
        .with_context(|| format!("Failed to open users database {}", path.display()))?;
    tracing::debug!(path = ?store.path(), "Opened users database");
    Ok(store)
}
