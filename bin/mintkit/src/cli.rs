use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "mintkit")]
#[command(
    author,
    version,
    about = "Deploy the NFT marketplace: blockchain node, contract, API and UI config"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "MINTKIT_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// The project root containing the contract, provision and marketplace directories.
    ///
    /// Defaults to the current directory.
    #[arg(long, global = true, env = "MINTKIT_ROOT")]
    pub root: Option<PathBuf>,

    /// Path to a Mintkit.toml configuration file to load.
    ///
    /// If not provided, `<root>/Mintkit.toml` is used when it exists.
    #[arg(long, alias = "conf", global = true, env = "MINTKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// The AWS shared-credentials profile used by steps that talk to the node.
    #[arg(long, global = true)]
    pub aws_profile: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The subcommand to run; a bare `mintkit` deploys.
    pub fn subcommand(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Deploy { yes: false })
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the deployment pipeline, resuming after the last completed step.
    Deploy {
        /// Acknowledge every operator prompt automatically.
        #[arg(short, long, env = "MINTKIT_YES")]
        yes: bool,
    },
    /// Show which steps have completed and the values gathered so far.
    Status,
    /// Forget deployment progress.
    ///
    /// Without `--step`, the whole settings document is deleted.
    Reset {
        /// Only clear the completion marker of this step.
        #[arg(long)]
        step: Option<String>,
    },
    /// Rewrite the front-end configuration from the current settings.
    RenderConfig,
    /// Write the resolved configuration to `<root>/Mintkit.toml`.
    Init {
        /// Replace an existing configuration file.
        #[arg(long)]
        force: bool,
    },
    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}
