//! EasyHome CLI - console session tools.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password from --password or EASYHOME_PASSWORD)
//! eh-cli session login -u operator
//!
//! # Show the logged-in account
//! eh-cli session whoami
//!
//! # Would the console let this session open a page?
//! eh-cli session check /admin-manage
//!
//! # Log out
//! eh-cli session logout
//! ```
//!
//! # Commands
//!
//! - `session login` - Log in and persist the session record
//! - `session logout` - Clear the session record
//! - `session whoami` - Show the persisted session
//! - `session check` - Run the navigation guard for a path

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::session::SessionContext;

#[derive(Parser)]
#[command(name = "eh-cli")]
#[command(author, version, about = "EasyHome console CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the console session
    Session {
        /// Session record file
        #[arg(long, default_value = ".easyhome-session.json")]
        store: PathBuf,

        /// Authenticate against the built-in fixture accounts
        #[arg(long)]
        fixture: bool,

        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Log in and persist the session
    Login {
        /// Account username
        #[arg(short, long)]
        username: String,

        /// Account password (falls back to EASYHOME_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Log out and clear the session record
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Check whether the session may open a console path
    Check {
        /// Path with optional query, e.g. /house-manage?page=2
        path: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eh_cli=info,easyhome_admin=warn".into()),
        )
        .with_target(false)
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
        Commands::Session {
            store,
            fixture,
            action,
        } => {
            let ctx = SessionContext::open(store, fixture)?;
            match action {
                SessionAction::Login { username, password } => {
                    commands::session::login(&ctx, &username, password).await?;
                }
                SessionAction::Logout => commands::session::logout(&ctx).await,
                SessionAction::Whoami => commands::session::whoami(&ctx).await,
                SessionAction::Check { path } => {
                    commands::session::check(&ctx, &path).await;
                }
            }
        }
    }
    Ok(())
}
