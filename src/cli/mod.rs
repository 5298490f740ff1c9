//! # Command Line Interface
//!
//! `secretary get`, `dict`, `store` and `run` on top of [`SecretResolver`].
//! Configuration comes from `SECRETARY_*` variables (and `.env`); global flags
//! override it.

pub mod output;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::{ObservabilityConfig, SecretsConfig};
use crate::observability::init_logging;
use crate::secrets::{secret_map, SecretBackendType, SecretResolver, SecretString, VaultEngine};
use output::{print_secrets, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "secretary")]
#[command(about = "Resolve secrets from files, environment variables and Vault")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend mode, repeatable (file, env, vault). Overrides SECRETARY_MODE
    #[arg(long = "mode", global = true, value_parser = parse_mode)]
    pub modes: Vec<SecretBackendType>,

    /// Secrets file for the file backend. Overrides SECRETARY_FILE
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// KV engine version for the Vault backend (kv1, kv2)
    #[arg(long, global = true, value_parser = parse_vault_engine)]
    pub vault_engine: Option<VaultEngine>,

    /// Log level or filter directive [default: SECRETARY_LOG_LEVEL or error]
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Print the full error chain on failure
    #[arg(long, global = true)]
    pub verbose_errors: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print one secret
    Get {
        /// Secret name
        name: String,

        /// Category (defaults to the root category)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Print every secret in a category
    Dict {
        /// Category (defaults to the root category)
        #[arg(short, long)]
        category: Option<String>,

        /// Output format (table, json, yaml)
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
    },

    /// Store secrets given as NAME=VALUE pairs
    Store {
        /// Category (defaults to the root category)
        #[arg(short, long)]
        category: Option<String>,

        #[arg(required = true, value_parser = parse_assignment)]
        secrets: Vec<(String, String)>,
    },

    /// Run a command with a category exported as environment variables
    Run {
        /// Category (defaults to the root category)
        #[arg(short, long)]
        category: Option<String>,

        /// Overwrite variables already set in the environment
        #[arg(long)]
        force: bool,

        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    load_dotenv();

    let cli = Cli::parse();
    let verbose_errors = cli.verbose_errors;

    match execute(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("{}", render_error(&e, verbose_errors));
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let mut observability = ObservabilityConfig::from_env();
    if let Some(level) = &cli.log_level {
        observability.log_level = level.clone();
    }
    observability.json_logging |= cli.json_logs;
    init_logging(&observability)?;

    let config = resolve_config(&cli)?;
    let resolver = SecretResolver::from_config(&config)?;

    handle_command(cli.command, &resolver).await
}

/// Environment configuration with command line overrides applied.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<SecretsConfig> {
    let mut config = SecretsConfig::from_env().context("Failed to load configuration")?;

    if !cli.modes.is_empty() {
        config.modes = cli.modes.clone();
    }
    if let Some(file) = &cli.file {
        config.file.path = file.clone();
    }
    if let Some(engine) = cli.vault_engine {
        let Some(vault) = config.vault.as_mut() else {
            bail!("--vault-engine requires a Vault address (SECRETARY_VAULT_ADDR or VAULT_ADDR)");
        };
        vault.engine = engine;
    }

    config.validate()?;
    debug!(modes = ?config.modes, file = %config.file.path.display(), "Resolved configuration");
    Ok(config)
}

async fn handle_command(command: Commands, resolver: &SecretResolver) -> anyhow::Result<()> {
    match command {
        Commands::Get { name, category } => {
            let value = resolver.get_secret(&name, category.as_deref()).await?;
            println!("{}", value.expose_secret());
        }

        Commands::Dict { category, output } => {
            let secrets = resolver.get_secret_dict(category.as_deref()).await?;
            print_secrets(&secrets, output)?;
        }

        Commands::Store { category, secrets } => {
            let count = secrets.len();
            let secrets = secret_map(secrets.into_iter().map(|(k, v)| (k, SecretString::new(v))));
            resolver.store_secrets(&secrets, category.as_deref()).await?;
            println!(
                "Stored {} secret(s) in category '{}'",
                count,
                resolver.effective_category(category.as_deref())
            );
        }

        Commands::Run { category, force, command } => {
            let exported = resolver.setup_env_from_secrets(category.as_deref(), force).await?;
            debug!(count = exported.len(), program = %command[0], "Launching command");

            let status = tokio::process::Command::new(&command[0])
                .args(&command[1..])
                .status()
                .await
                .with_context(|| format!("Failed to run '{}'", command[0]))?;

            if !status.success() {
                std::process::exit(status.code().unwrap_or(1));
            }
        }
    }

    Ok(())
}

/// Top-level message, or the whole `anyhow` chain when `verbose` is set.
fn render_error(error: &anyhow::Error, verbose: bool) -> String {
    if verbose {
        format!("Error: {:?}", error)
    } else {
        format!("Error: {}", error)
    }
}

fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }
}

fn parse_mode(raw: &str) -> Result<SecretBackendType, String> {
    raw.parse().map_err(|e: crate::secrets::SecretsError| e.to_string())
}

fn parse_vault_engine(raw: &str) -> Result<VaultEngine, String> {
    raw.parse().map_err(|e: crate::secrets::SecretsError| e.to_string())
}

/// Split `NAME=VALUE`. The value may itself contain `=`.
fn parse_assignment(raw: &str) -> anyhow::Result<(String, String)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("Expected NAME=VALUE, got '{}'", raw);
    };
    if name.trim().is_empty() {
        bail!("Secret name cannot be empty in '{}'", raw);
    }
    Ok((name.trim().to_string(), value.to_string()))
}
