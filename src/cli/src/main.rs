//! Keyward Authorization CLI
//!
//! Loads policy and group manifests and answers authorization questions
//! against them, without running the full service:
//!
//! - `check` - evaluate operations for a set of groups
//! - `list` - print loaded policies and groups
//!
//! Environment variables:
//! - `KEYWARD_CONFIG` - Path to the TOML configuration file
//! - `RUST_LOG` - Log filter (overrides the configured level)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keyward_authz::{FileManifestSource, Operation, PolicyStore, UserInfo};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};

mod config;

use config::CliConfig;

/// Keyward authorization CLI
#[derive(Parser)]
#[command(name = "keyward-authz")]
#[command(about = "Evaluate Keyward access policies from manifest files")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "KEYWARD_CONFIG")]
    config: Option<PathBuf>,

    /// Additional manifest files, loaded after the configured ones
    #[arg(short, long = "manifest")]
    manifests: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a caller in the given groups may perform the operations
    Check {
        /// Caller name, used in logs only
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Group membership, in order
        #[arg(short, long = "group", required = true)]
        groups: Vec<String>,

        /// Operation as ACTION:RESOURCE, all must be allowed
        #[arg(required = true, value_parser = parse_operation)]
        operations: Vec<Operation>,
    },

    /// List loaded policies and groups
    List,
}

fn parse_operation(raw: &str) -> std::result::Result<Operation, String> {
    let (action, resource) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected ACTION:RESOURCE, got '{}'", raw))?;

    if action.is_empty() {
        return Err(format!("missing action in '{}'", raw));
    }

    Ok(Operation::new(action, resource))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    config.manifest.paths.extend(cli.manifests.iter().cloned());
    if cli.verbose {
        config.log.level = "debug".to_string();
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.level.clone().into()),
        )
        .with_target(config.log.with_target)
        .with_writer(std::io::stderr)
        .init();

    config.validate()?;

    let store = load_store(&config).await?;

    match cli.command {
        Command::Check {
            user,
            groups,
            operations,
        } => {
            let user = UserInfo { name: user, groups };
            let resolver = store.resolver_for(Some(&user)).await;
            debug!(user = %user.name, statements = resolver.len(), "resolver built");

            let decision = resolver.is_authorized(&operations);
            match decision.error() {
                None => {
                    println!("ALLOW");
                    Ok(ExitCode::SUCCESS)
                }
                Some(err) => {
                    println!("DENY: {}", err);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::List => {
            let mut policies = store.policies().await;
            policies.sort();
            for name in policies {
                let policy = store.policy(&name).await?;
                println!("policy {} ({} statements)", name, policy.statements.len());
            }

            let mut groups = store.groups().await;
            groups.sort();
            for name in groups {
                let group = store.group(&name).await?;
                println!("group {} -> [{}]", name, group.policies.join(", "));
            }

            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load every configured manifest into a fresh store.
///
/// Stopping the store drains batches already delivered by the file source,
/// so the catalog is complete once this returns.
async fn load_store(config: &CliConfig) -> Result<PolicyStore> {
    let source = Arc::new(FileManifestSource::new(config.manifest.paths.iter().cloned()));
    let store = PolicyStore::with_config(source, config.store.clone());

    store
        .start()
        .await
        .context("Failed to load manifest files")?;
    store.stop().await.context("Failed to stop policy store")?;

    info!(
        policies = store.policies().await.len(),
        groups = store.groups().await.len(),
        "manifests loaded"
    );

    Ok(store)
}
