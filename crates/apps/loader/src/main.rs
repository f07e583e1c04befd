//! Loader - command line entry point for mailsync
//!
//! Each subcommand prints its result as JSON on stdout.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde_json::json;

use mailsync::storage::SqliteEmailStore;
use mailsync::{
    Category, CategorizeRequest, GmailClient, Settings, SyncOptions, bulk_archive,
    categorize_sender, load_emails,
};

#[derive(Parser)]
#[command(name = "loader", about = "Mirror and maintain a Gmail mailbox")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load new mail into the analytics sink and the local database
    Load {
        /// Mailbox owner, used to scope stored records
        #[arg(long)]
        owner: String,
        #[arg(long, env = "GMAIL_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
        /// Also backfill mail older than the oldest stored record
        #[arg(long)]
        load_before: bool,
    },
    /// Archive inbox threads older than a number of days
    Archive {
        #[arg(long, env = "GMAIL_ACCESS_TOKEN", hide_env_values = true)]
        access_token: String,
        #[arg(long)]
        days_ago: u32,
    },
    /// Categorize a sender with the configured language model
    Categorize {
        #[arg(long)]
        sender: String,
        /// Subject or snippet of a previous email from the sender
        #[arg(long = "previous")]
        previous: Vec<String>,
        /// Category as `name` or `name=description`
        #[arg(long = "category", required = true, value_parser = parse_category)]
        categories: Vec<Category>,
    },
}

fn parse_category(value: &str) -> Result<Category, String> {
    let (name, description) = match value.split_once('=') {
        Some((name, description)) => (name.trim(), Some(description.trim().to_string())),
        None => (value.trim(), None),
    };
    if name.is_empty() {
        return Err("category name must not be empty".to_string());
    }
    Ok(Category::new(name, description))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = config::ensure_config_dir() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    let settings = Settings::load()?;

    let output = match command {
        Command::Load {
            owner,
            access_token,
            load_before,
        } => {
            let Some(sink) = settings.analytics_sink() else {
                warn!("No Tinybird token configured, skipping load");
                println!("{}", json!({ "pages": 0 }));
                return Ok(());
            };
            let db_path = settings.database_path()?;
            info!("Using database at {}", db_path.display());
            let store = SqliteEmailStore::new(&db_path)?;
            let client = GmailClient::new(access_token);

            let result = load_emails(
                &owner,
                &client,
                &sink,
                &store,
                &SyncOptions::default().load_before(load_before),
            )?;
            serde_json::to_value(result)?
        }
        Command::Archive {
            access_token,
            days_ago,
        } => {
            let client = GmailClient::new(access_token);
            serde_json::to_value(bulk_archive(&client, days_ago)?)?
        }
        Command::Categorize {
            sender,
            previous,
            categories,
        } => {
            let Some(model) = settings.language_model() else {
                bail!("No OpenAI API key configured");
            };
            let verdict = categorize_sender(
                &model,
                &CategorizeRequest {
                    sender: &sender,
                    previous_emails: &previous,
                    categories: &categories,
                },
            )
            .with_context(|| format!("Failed to categorize {}", sender))?;
            serde_json::to_value(verdict)?
        }
    };

    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category_with_description() {
        let category = parse_category("Newsletter = Weekly digests").unwrap();
        assert_eq!(category.name, "Newsletter");
        assert_eq!(category.description.as_deref(), Some("Weekly digests"));
    }

    #[test]
    fn test_parse_category_name_only() {
        let category = parse_category("Receipts").unwrap();
        assert_eq!(category.description, None);
        assert!(parse_category("=desc").is_err());
    }

    #[test]
    fn test_cli_parses_load() {
        let cli = Cli::try_parse_from([
            "loader",
            "load",
            "--owner",
            "me@example.com",
            "--access-token",
            "tok",
            "--load-before",
        ])
        .unwrap();
        match cli.command {
            Command::Load {
                owner, load_before, ..
            } => {
                assert_eq!(owner, "me@example.com");
                assert!(load_before);
            }
            _ => panic!("expected load"),
        }
    }
}
