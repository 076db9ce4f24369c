use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use snapit::App;
use snapit::Config;
use snapit::clients::git::GitClient;
use snapit::clients::github::GithubClient;
use snapit::outputs::StepOutputs;
use snapit::logging::setup_logging;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "snapit")]
#[command(about = "Publish snapshot and release commits for changesets-managed repos", long_about = None)]
pub struct Cli {
    /// Repository working tree
    #[arg(long, global = true, default_value = ".")]
    pub path: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Commit the version files on top of a PR and push a snapshot branch
    Snapshot {
        /// Pull request number
        #[arg(long)]
        pr: u64,
    },
    /// Open or update the "Version Packages" pull request
    ReleasePr {
        /// Base branch (defaults to snapit.baseBranch, then main)
        #[arg(long)]
        base: Option<String>,
    },
    /// Comment on a pull request
    Comment {
        /// Pull request number
        #[arg(long)]
        pr: u64,
        #[arg(short, long)]
        message: String,
    },
    /// List snapshot versions in the workspace, failing if there are none
    CheckSnapshots,
    /// Show the changes a snapshot would carry
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(FmtSpan::NONE)?;

    let git = GitClient::open(&cli.path).await?;
    let root = git.root().to_path_buf();
    let config = Config::load(&root)?;
    let github = GithubClient::new(
        config.github_token.clone(),
        config.api_url.clone(),
        config.owner.clone(),
        config.repo.clone(),
    );
    let app = App::new(config, git, github.clone(), github)
        .with_outputs(StepOutputs::from_env());

    let stdout = &mut std::io::stdout();
    match cli.command {
        Some(Commands::Snapshot { pr }) => app.cmd_snapshot(pr, stdout).await?,
        Some(Commands::ReleasePr { base }) => app.cmd_release_pr(base.as_deref(), stdout).await?,
        Some(Commands::Comment { pr, message }) => app.cmd_comment(pr, &message, stdout).await?,
        Some(Commands::CheckSnapshots) => app.cmd_check_snapshots(&root, stdout)?,
        Some(Commands::Status) | None => app.cmd_status(stdout).await?,
    }

    Ok(())
}
