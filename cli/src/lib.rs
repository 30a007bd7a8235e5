//! `taiga-stats` command line.
//!
//! Parses arguments, assembles the run configuration once, connects to the
//! tracker when a command needs it, and hands plain values to
//! `taiga-stats-core`. Only this crate prints.

pub mod config;

mod cfd_cmd;
mod config_cmd;
mod deps_cmd;
mod list_cmd;
mod store_cmd;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use taiga_stats_tracker::TaigaClient;

pub use cfd_cmd::CfdArgs;
pub use deps_cmd::DepsArgs;
pub use list_cmd::TagArgs;
pub use store_cmd::StoreArgs;

use crate::config::RunConfig;

/// Cumulative flow snapshots, charts and dependency graphs for a Taiga project
#[derive(Debug, Parser)]
#[command(name = "taiga-stats", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command; they override the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Config file (default: $TAIGA_STATS_CONFIG or ~/.config/taiga-stats/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Tracker base URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    #[arg(long, global = true, value_name = "TOKEN")]
    pub auth_token: Option<String>,

    /// Login name, used when no token is configured
    #[arg(long, global = true)]
    pub username: Option<String>,

    #[arg(long, global = true)]
    pub password: Option<String>,

    #[arg(long, global = true, value_name = "ID")]
    pub project_id: Option<i64>,

    /// Directory holding snapshot files and charts
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Custom attribute that lists a story's dependencies
    #[arg(long, global = true, value_name = "NAME")]
    pub dependency_attribute: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Save the merged settings to the config file
    Config,

    /// List projects visible to the current credentials
    ListProjects,

    /// List the project's story statuses in ascending order
    ListStatuses,

    /// Story count and points per status
    Points(TagArgs),

    /// Story count per tag
    Tags,

    /// Append today's status counts to the snapshot file of each tag
    StoreDaily(StoreArgs),

    /// Render the cumulative flow chart of a snapshot file
    Cfd(CfdArgs),

    /// Emit the story dependency graph as Graphviz DOT
    Deps(DepsArgs),
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = RunConfig::assemble(&cli.global).context("loading configuration")?;
    tracing::debug!(path = %config.config_path.display(), "configuration assembled");

    match cli.command {
        Command::Config => config_cmd::run(&config),
        Command::ListProjects => list_cmd::run_projects(&config).await,
        Command::ListStatuses => list_cmd::run_statuses(&config).await,
        Command::Points(args) => list_cmd::run_points(&config, &args).await,
        Command::Tags => list_cmd::run_tags(&config).await,
        Command::StoreDaily(args) => store_cmd::run(&config, &args).await,
        Command::Cfd(args) => cfd_cmd::run(&config, &args).await,
        Command::Deps(args) => deps_cmd::run(&config, &args).await,
    }
}

/// Open a tracker session, logging in when only credentials are configured.
pub(crate) async fn connect(config: &RunConfig) -> anyhow::Result<TaigaClient> {
    let settings = &config.settings;
    let client = TaigaClient::new(&settings.url, settings.auth_token.clone())
        .context("creating tracker client")?;
    if settings.auth_token.is_some() {
        return Ok(client);
    }
    match (&settings.username, &settings.password) {
        (Some(username), Some(password)) => {
            let token = client
                .login(username, password)
                .await
                .context("logging in to the tracker")?;
            Ok(client.with_token(token))
        }
        _ => {
            tracing::info!("no credentials configured, continuing anonymously");
            Ok(client)
        }
    }
}
