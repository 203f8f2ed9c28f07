use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::Workspace;

#[derive(Parser)]
#[command(name = "liaison")]
#[command(about = "Liaison CLI - interaction, relationship and coin ledger coordination", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory holding the journal and ledger snapshot
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add coins to a user's balance
    Credit {
        user: String,
        amount: u64,
    },
    /// Execute an action from one user towards another
    Execute(ExecuteArgs),
    /// Show how one user stands towards another
    Relationship {
        viewer: String,
        other: String,
    },
    /// Show a user's coin account
    Balance {
        user: String,
    },
    /// List a user's activity, newest first
    Activity(ActivityArgs),
    /// Open live sessions and execute actions read from stdin
    Watch {
        /// Users whose notifications are printed
        #[arg(required = true)]
        users: Vec<String>,
    },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
pub struct ExecuteArgs {
    pub actor: String,
    pub target: String,
    /// visit, interest, super_interest, meet_request, shortlist, chat,
    /// view_contact, block, report, accept, decline, ignore, withdraw
    pub action: String,
    /// Proposal to respond to or withdraw (defaults to the open one)
    #[arg(long)]
    pub proposal: Option<String>,
    /// Metadata entry as key=value (value parsed as JSON when possible)
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,
}

#[derive(Args)]
pub struct ActivityArgs {
    pub user: String,
    /// Only events the user initiated
    #[arg(long, conflicts_with = "received")]
    pub sent: bool,
    /// Only events targeting the user
    #[arg(long)]
    pub received: bool,
    #[arg(long = "kind")]
    pub kinds: Vec<String>,
    #[arg(long = "status")]
    pub statuses: Vec<String>,
    /// Only events with this counterpart
    #[arg(long = "with")]
    pub counterpart: Option<String>,
    #[arg(long)]
    pub limit: Option<usize>,
    /// Print JSON lines instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("liaison=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(cli.config),
            ConfigAction::Init { force } => commands::config::init(cli.config, force),
            ConfigAction::Path => commands::config::path(cli.config),
        },
        command => {
            let workspace = Workspace::open(cli.config, cli.data_dir).await?;
            run(&workspace, command).await
        }
    }
}

async fn run(workspace: &Workspace, command: Commands) -> Result<()> {
    match command {
        Commands::Credit { user, amount } => commands::ledger::credit(workspace, &user, amount),
        Commands::Execute(args) => commands::interact::execute(workspace, args).await,
        Commands::Relationship { viewer, other } => {
            commands::query::relationship(workspace, &viewer, &other).await
        }
        Commands::Balance { user } => commands::ledger::balance(workspace, &user),
        Commands::Activity(args) => commands::query::activity(workspace, args).await,
        Commands::Watch { users } => commands::watch::run(workspace, users).await,
        Commands::Config { .. } => Ok(()),
    }
}
