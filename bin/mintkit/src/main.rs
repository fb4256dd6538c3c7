//! mintkit is a CLI tool to deploy the NFT marketplace and resume where a failed run stopped.

mod cli;
mod config;
mod lock;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use comfy_table::{Table, presets::UTF8_FULL};

use cli::{Cli, Command};
use lock::DeployLock;
use mintkit_deploy::{
    AutoApprove, CredentialSource, DeployConfig, Idempotency, KeypressGate, OperatorGate,
    SettingsStore, StepOutcome, SystemRunner, marketplace_pipeline, steps,
};

const SUCCESS_MESSAGE: &str = "
Success!

Your Simple NFT Marketplace has now been deployed and the UI can be launched
by running the following command:

npm run serve --prefix marketplace

To mint and send your first NFT, you can start by creating an account on the UI
as listed in the docs starting from here:

https://github.com/aws-samples/simple-nft-marketplace/blob/main/docs/en/DOCS_04_FRONTEND.md#create-an-account
";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let command = cli.subcommand();
    if let Command::Completions { shell } = command {
        clap_complete::generate(shell, &mut Cli::command(), "mintkit", &mut std::io::stdout());
        return Ok(());
    }

    let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config = config::load(&root, cli.config.as_deref())?;
    if let Some(profile) = cli.aws_profile {
        config.aws_profile = Some(profile);
    }
    let settings = SettingsStore::new(config.settings_path());

    match command {
        Command::Deploy { yes } => deploy(&config, &settings, yes).await,
        Command::Status => status(&config, &settings),
        Command::Reset { step } => reset(&config, &settings, step.as_deref()),
        Command::RenderConfig => {
            let _lock = DeployLock::acquire(&config.lock_path())?;
            steps::render_frontend_config(&settings, &config.marketplace_env_path())
        }
        Command::Init { force } => {
            let path = config::init(&config, force)?;
            println!("Configuration written to {}", path.display());
            Ok(())
        }
        Command::Completions { .. } => Ok(()),
    }
}

async fn deploy(config: &DeployConfig, settings: &SettingsStore, yes: bool) -> Result<()> {
    let _lock = DeployLock::acquire(&config.lock_path())?;

    let pipeline = marketplace_pipeline(
        config,
        CredentialSource::Profile(config.resolved_aws_profile()),
    )?;

    tracing::info!(
        root = %config.root.display(),
        settings = %settings.path().display(),
        steps = pipeline.steps().len(),
        "Starting deployment..."
    );

    let gate: Box<dyn OperatorGate> = if yes {
        Box::new(AutoApprove::new())
    } else {
        Box::new(KeypressGate)
    };

    let report = pipeline
        .run(settings, &SystemRunner::default(), gate.as_ref())
        .await?;

    tracing::info!(
        completed = report.with_outcome(StepOutcome::Completed).len(),
        skipped = report.with_outcome(StepOutcome::Skipped).len(),
        "Deployment finished"
    );
    println!("{SUCCESS_MESSAGE}");
    Ok(())
}

fn status(config: &DeployConfig, settings: &SettingsStore) -> Result<()> {
    let pipeline = marketplace_pipeline(
        config,
        CredentialSource::Profile(config.resolved_aws_profile()),
    )?;

    let mut step_table = Table::new();
    step_table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Step", "Description", "Kind", "Status"]);
    for step in pipeline.status(settings) {
        let state = match step.completed {
            Some(true) => "completed",
            Some(false) => "pending",
            None => "runs every time",
        };
        step_table.add_row(vec![
            step.name,
            step.title,
            step.idempotency.to_string(),
            state.to_string(),
        ]);
    }
    println!("{step_table}");

    let values = settings.marketplace();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Setting", "Value"]);
    let rows = [
        ("address", values.address),
        ("privateKey", values.private_key.as_deref().map(mask)),
        ("ambEndpoint", values.amb_endpoint),
        ("region", values.region),
        ("contractAddress", values.contract_address),
        ("userPoolId", values.user_pool_id),
        ("userPoolClientId", values.user_pool_client_id),
        ("nftApiEndpoint", values.nft_api_endpoint),
    ];
    for (key, value) in rows {
        table.add_row(vec![key.to_string(), value.unwrap_or_else(|| "-".to_string())]);
    }
    println!("{table}");

    println!("Settings: {}", settings.path().display());
    Ok(())
}

fn reset(config: &DeployConfig, settings: &SettingsStore, step: Option<&str>) -> Result<()> {
    let _lock = DeployLock::acquire(&config.lock_path())?;

    let Some(step) = step else {
        if settings.path().exists() {
            std::fs::remove_file(settings.path())?;
        }
        tracing::info!(path = %settings.path().display(), "Deployment progress cleared");
        return Ok(());
    };

    let pipeline = marketplace_pipeline(
        config,
        CredentialSource::Profile(config.resolved_aws_profile()),
    )?;
    match pipeline.step(step).map(|s| s.idempotency()) {
        Some(Idempotency::RunOnce) => {}
        Some(Idempotency::AlwaysRun) => {
            anyhow::bail!("Step `{step}` runs on every deploy and has no completion marker");
        }
        None => {
            let known: Vec<_> = pipeline.steps().iter().map(|s| s.name()).collect();
            anyhow::bail!("Unknown step `{step}` (known steps: {})", known.join(", "));
        }
    }

    if settings.remove(step)? {
        tracing::info!(step, "Completion marker cleared");
    } else {
        tracing::info!(step, "Step was not marked as completed");
    }
    Ok(())
}

/// Keep only the first characters of a secret.
fn mask(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    format!("{prefix}… (hidden)")
}
