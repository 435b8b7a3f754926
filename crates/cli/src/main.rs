//! Tuntas Kilat CLI - Database migrations, seeding and admin accounts.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! tk-cli migrate
//!
//! # Load the service catalogue and promotion codes
//! tk-cli seed -f crates/cli/catalogue.example.yaml
//!
//! # Create an admin account
//! tk-cli admin create -n "Dewi Admin" -p 081234567890
//!
//! # Promote an existing user to worker
//! tk-cli admin promote-worker -p 081298765432
//! ```
//!
//! All commands read `TUNTAS_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tk-cli")]
#[command(author, version, about = "Tuntas Kilat CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Upsert services and promotion codes from a YAML catalogue
    Seed {
        /// Path to the catalogue file
        #[arg(short, long, default_value = "crates/cli/catalogue.example.yaml")]
        file: String,
    },
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Mobile number (08..., 628... or +628...)
        #[arg(short, long)]
        phone: String,

        /// Optional email address
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Give an existing user the worker role
    PromoteWorker {
        /// The user's mobile number
        #[arg(short, long)]
        phone: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => {
            commands::seed::catalogue(&file).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Create { name, phone, email } => {
                commands::admin::create_user(&name, &phone, email.as_deref()).await?;
            }
            AdminAction::PromoteWorker { phone } => {
                commands::admin::promote_worker(&phone).await?;
            }
        },
    }
    Ok(())
}
