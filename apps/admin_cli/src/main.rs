use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::domain::BookId;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod console;
mod routes;

use commands::FieldOverrides;
use routes::Role;

#[derive(Parser, Debug)]
#[command(name = "bookcart-admin", about = "Book store admin client")]
struct Args {
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Overrides `api_base_url` from the config file and environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a storefront path and print the route it activates.
    Navigate {
        path: String,
        #[arg(long, value_enum, default_value_t = Role::Guest)]
        role: Role,
    },
    /// Add a new book.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        price: f64,
        #[arg(long = "cover")]
        covers: Vec<PathBuf>,
    },
    /// Load a stored book, change the given fields and save it.
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long = "cover")]
        covers: Vec<PathBuf>,
    },
    /// Print the category list.
    Categories,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings(&args.config)?;
    if let Some(api_url) = args.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.request_timeout_secs = timeout_secs;
    }

    match args.command {
        Command::Navigate { path, role } => commands::navigate(&path, role).await,
        Command::Categories => commands::list_categories(&settings).await,
        Command::Add {
            title,
            author,
            category,
            price,
            covers,
        } => {
            let overrides = FieldOverrides {
                title: Some(title),
                author: Some(author),
                category: Some(category),
                price: Some(price),
            };
            commands::save_book(&settings, None, overrides, covers).await
        }
        Command::Edit {
            id,
            title,
            author,
            category,
            price,
            covers,
        } => {
            let overrides = FieldOverrides {
                title,
                author,
                category,
                price,
            };
            commands::save_book(&settings, Some(BookId(id)), overrides, covers).await
        }
    }
}
