//! Mirabel CLI - catalog seeding tools.
//!
//! # Usage
//!
//! ```bash
//! # Seed events from a JSON file
//! mirabel-cli seed events --file data/events.json
//!
//! # Seed products from a JSON file
//! mirabel-cli seed products --file data/products.json
//! ```
//!
//! # Commands
//!
//! - `seed events` - Upsert events into the `events` table
//! - `seed products` - Insert products into the `products` table
//!
//! Both read `SUPABASE_URL` and `SUPABASE_SERVICE_ROLE_KEY` from the
//! environment (or a `.env` file).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mirabel-cli")]
#[command(author, version, about = "Mirabel Wine CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed catalog data into Supabase
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert events from a JSON file
    Events {
        /// Path to the JSON file (array of event records)
        #[arg(short, long)]
        file: String,
    },
    /// Insert products from a JSON file
    Products {
        /// Path to the JSON file (array of product objects)
        #[arg(short, long)]
        file: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mirabel_cli=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Seed { target } => match target {
            SeedTarget::Events { file } => commands::seed::events(&file).await,
            SeedTarget::Products { file } => commands::seed::products(&file).await,
        },
    };

    if let Err(error) = result {
        tracing::error!(%error, "command failed");
        std::process::exit(1);
    }
}
