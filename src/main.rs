use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "repolens")]
#[command(version, about = "Chat with your repositories and map their structure")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Backend base URL. Overrides REPOLENS_API_URL and repolens.toml.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Access token. Overrides REPOLENS_ACCESS_TOKEN and repolens.toml.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Also write JSON logs under .repolens/logs
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List connected repositories
    Projects,
    /// Connect a repository by URL
    Add {
        /// Repository URL, e.g. https://github.com/owner/repo
        repo_url: String,
    },
    /// Ask questions about a repository
    Chat {
        /// Project to ask about (defaults to [chat] default_project)
        #[arg(short, long)]
        project: Option<String>,

        /// Send a single message and exit; without it an interactive prompt starts
        message: Option<String>,
    },
    /// Render a repository's structure as an SVG map
    Map {
        /// Project whose structure to fetch
        #[arg(required_unless_present = "input", conflicts_with = "input")]
        project_id: Option<String>,

        /// Read a saved structure response instead of fetching one
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Render as if this node were hovered
        #[arg(long)]
        hover: Option<String>,

        /// Zoom level
        #[arg(long)]
        zoom: Option<f64>,

        /// Place nodes exactly on the grid
        #[arg(long)]
        no_jitter: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default repolens.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    if let Commands::Config { command } = &cli.command {
        let _guard = repolens::logging::init(cli.verbose, None);
        return cmd::cmd_config(&project_dir, command.clone());
    }

    let config = repolens::config::RepolensConfig::with_cli_args(
        project_dir,
        cli.api_url.clone(),
        cli.token.clone(),
        cli.verbose,
    )
    .context("Failed to load configuration")?;

    let log_dir = cli.log_file.then(|| config.log_dir());
    let _guard = repolens::logging::init(cli.verbose, log_dir.as_deref());

    match &cli.command {
        Commands::Projects => cmd::cmd_projects(&config).await?,
        Commands::Add { repo_url } => cmd::cmd_add(&config, repo_url).await?,
        Commands::Chat { project, message } => {
            let project_id = project
                .clone()
                .unwrap_or_else(|| config.toml.chat.default_project.clone());
            cmd::cmd_chat(&config, &project_id, message.as_deref()).await?
        }
        Commands::Map {
            project_id,
            input,
            out,
            hover,
            zoom,
            no_jitter,
        } => {
            let source = match (project_id, input) {
                (_, Some(path)) => cmd::MapSource::File(path.clone()),
                (Some(id), None) => cmd::MapSource::Project(id.clone()),
                (None, None) => anyhow::bail!("Either a project id or --input is required"),
            };
            let options = cmd::MapOptions {
                out: out.clone(),
                hover: hover.clone(),
                zoom: *zoom,
                jitter: !*no_jitter,
            };
            cmd::cmd_map(&config, source, options).await?
        }
        Commands::Config { command } => cmd::cmd_config(&config.project_dir, command.clone())?,
    }

    Ok(())
}
