use std::{env, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};

use command::{catalog, CommandDescriptor};
use registry::HttpRegistry;
use sync::{pacing::FixedInterval, SyncReport, Synchronizer};

mod cfg;
mod command;
mod error;
mod registry;
mod sync;

#[derive(Parser)]
#[command(name = "slashsync", version)]
/// Registers, replaces or deletes the slash commands of a discord application.
struct Cli {
    /// Path to the configuration file (toml or json)
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Command table to use instead of the configured or built-in one
    #[arg(long)]
    commands: Option<String>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Replace every registered command with the command table, in one call
    Overwrite,
    /// Create or update the commands one by one
    Upsert {
        /// Only upsert the commands with these names
        names: Vec<String>,
    },
    /// Delete commands by their identifier
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Remove every registered command
    Clear,
    /// Print the commands currently registered
    List,
    /// Print the local command table as sent to the registry
    Show,
}

fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();

    match env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(LevelFilter::Info),
    };

    builder.init();
}

/// Loads the command table from `path`, or returns the built-in catalog.
fn command_table(path: Option<&String>) -> Result<Vec<CommandDescriptor>, anyhow::Error> {
    match path {
        Some(path) => {
            let path = PathBuf::from(cfg::expand_path(path));
            catalog::load_table(&path)
                .with_context(|| format!("failed to load the command table {}", path.display()))
        }
        None => Ok(catalog::builtin()),
    }
}

fn select(
    commands: Vec<CommandDescriptor>,
    names: &[String],
) -> Result<Vec<CommandDescriptor>, anyhow::Error> {
    if names.is_empty() {
        return Ok(commands);
    }

    if let Some(unknown) = names.iter().find(|n| !commands.iter().any(|c| &c.name == *n)) {
        anyhow::bail!("no command named `{}` in the command table", unknown);
    }

    Ok(commands
        .into_iter()
        .filter(|c| names.contains(&c.name))
        .collect())
}

fn finish<T>(report: SyncReport<T>, operation: &str) -> ExitCode {
    report.log_summary(operation);
    ExitCode::from(report.exit_code())
}

#[tokio::main]
/// Entrypoint of slashsync.
/// Every remote call is made in sequence, paced, and reported; the exit code
/// is non-zero as soon as one of them failed.
async fn main() -> Result<ExitCode, anyhow::Error> {
    init_logger();
    let cli = Cli::parse();

    // load the config
    let config_path = PathBuf::from(cfg::expand_path(&cli.config));
    let config = cfg::load_config(&config_path).context("failed to load the configuration")?;

    // the command line wins over the configuration
    let commands = command_table(cli.commands.as_ref().or(config.registry.commands.as_ref()))?;

    let credentials = Arc::new(config.discord.clone());
    info!("managing commands of application {}", credentials.application_id);

    let registry = HttpRegistry::new(
        credentials,
        &config.registry.api_base,
        config.registry.timeout()?,
    )
    .context("failed to create the http client")?;
    let pacer = FixedInterval::new(config.registry.pacing()?);
    let sync = Synchronizer::new(registry, pacer, config.registry.on_transport_failure);

    let code = match cli.action {
        Action::Overwrite => finish(sync.bulk_replace(&commands).await?, "overwrite"),
        Action::Clear => finish(sync.bulk_replace(&[]).await?, "clear"),
        Action::Upsert { ref names } => {
            let commands = select(commands, names)?;
            finish(sync.upsert_all(&commands).await?, "upsert")
        }
        Action::Delete { ref ids } => finish(sync.delete_all(ids).await, "delete"),
        Action::List => {
            let registered = sync.list().await.context("failed to list the commands")?;
            for command in &registered {
                println!(
                    "{}\t{}\t{}",
                    command.id, command.descriptor.name, command.descriptor.description
                );
            }
            ExitCode::SUCCESS
        }
        Action::Show => {
            println!("{}", serde_json::to_string_pretty(&commands)?);
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}
