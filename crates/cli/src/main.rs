//! PG Delivery CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run all database migrations
//! pgd-cli migrate all
//!
//! # Hash the operator password for ADMIN_PASSWORD_HASH
//! pgd-cli operator hash-password
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `operator hash-password` - Hash the operator password

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pgd-cli")]
#[command(author, version, about = "PG Delivery CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage the operator login
    Operator {
        #[command(subcommand)]
        action: OperatorAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Create the document tables and change-notification trigger
    Documents,
    /// Create the storefront and admin session tables
    Sessions,
    /// Run all migrations
    All,
}

#[derive(Subcommand)]
enum OperatorAction {
    /// Read a password and print its Argon2id hash
    HashPassword,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays clean for printed hashes
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Documents => commands::migrate::documents().await?,
            MigrateTarget::Sessions => commands::migrate::sessions().await?,
            MigrateTarget::All => {
                commands::migrate::documents().await?;
                commands::migrate::sessions().await?;
            }
        },
        Commands::Operator { action } => match action {
            OperatorAction::HashPassword => commands::operator::hash()?,
        },
    }
    Ok(())
}
