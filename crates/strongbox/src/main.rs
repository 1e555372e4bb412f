// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strongbox - a local credential store.
//!
//! This is the binary entry point. Every command loads configuration, then
//! drives a [`strongbox_service::Strongbox`] for the duration of one call.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod auth;
mod records;
mod status;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use strongbox_config::StrongboxConfig;
use strongbox_core::StrongboxError;

/// Strongbox - a local credential store.
#[derive(Parser, Debug)]
#[command(name = "strongbox", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show whether the store exists, is encrypted, and needs setup.
    Status,
    /// Set up, convert, or unlock the store with the master password.
    Login,
    /// Change the master password and rekey the store.
    ChangePassword,
    /// Add a credential. The password is read from a prompt.
    Add(CredentialArgs),
    /// Show one credential.
    Get {
        id: i64,
        /// Show the password instead of a masked preview.
        #[arg(long)]
        reveal: bool,
    },
    /// List all credentials.
    List {
        #[arg(long)]
        reveal: bool,
    },
    /// Find credentials whose name contains QUERY.
    Search {
        query: String,
        #[arg(long)]
        reveal: bool,
    },
    /// Replace a credential's contents. The password is read from a prompt.
    Update {
        id: i64,
        #[command(flatten)]
        fields: CredentialArgs,
    },
    /// Delete a credential.
    Delete { id: i64 },
}

/// Credential fields accepted by `add` and `update`.
#[derive(Args, Debug, Clone)]
struct CredentialArgs {
    /// Display name, e.g. the service.
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    username: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    website: String,
    #[arg(long, default_value = "")]
    notes: String,
    /// Third-party login this account also accepts (repeatable), e.g. `github`.
    #[arg(long = "auth-login", value_name = "PROVIDER")]
    auth_logins: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => strongbox_config::load_and_validate_path(path),
        None => strongbox_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            strongbox_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    if let Err(e) = run(cli.command, config, cli.json).await {
        eprintln!("strongbox: {e}");
        std::process::exit(exit_code(&e));
    }
}

async fn run(command: Commands, config: StrongboxConfig, json: bool) -> Result<(), StrongboxError> {
    match command {
        Commands::Status => status::run_status(config, json).await,
        Commands::Login => auth::run_login(config, json).await,
        Commands::ChangePassword => auth::run_change_password(config, json).await,
        Commands::Add(fields) => records::run_add(config, fields, json).await,
        Commands::Get { id, reveal } => records::run_get(config, id, reveal, json).await,
        Commands::List { reveal } => records::run_list(config, reveal, json).await,
        Commands::Search { query, reveal } => {
            records::run_search(config, &query, reveal, json).await
        }
        Commands::Update { id, fields } => records::run_update(config, id, fields, json).await,
        Commands::Delete { id } => records::run_delete(config, id).await,
    }
}

/// Non-zero exit status for an error: 2 for bad input or a wrong password,
/// 1 otherwise.
fn exit_code(err: &StrongboxError) -> i32 {
    use strongbox_core::ErrorKind;
    match err.kind() {
        ErrorKind::InputInvalid | ErrorKind::KeyMismatch => 2,
        _ => 1,
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr; stdout carries command output.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "strongbox={log_level},strongbox_service={log_level},strongbox_storage={log_level},strongbox_vault={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
