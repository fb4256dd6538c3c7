//! Integration tests for the resumable pipeline.
//!
//! External tools are replaced by a scripted runner, so these run anywhere.
//! Run with: cargo test --test pipeline_test

use std::path::{Path, PathBuf};

use anyhow::Result;
use futures::future::BoxFuture;
use mintkit_deploy::{
    AutoApprove, AwsCredentials, CommandSpec, CredentialSource, DeployConfig, DeployError,
    Pipeline, SettingsStore, Step, StepBody, StepContext, StepOutcome, keys, marketplace_pipeline,
    steps::names, test_utils::RecordingRunner,
};
use serde_json::{Value, json};
use tempdir::TempDir;

const ACCOUNT_OUTPUT: &str = "Address: 0xABCDEF0123456789ABCDEF0123456789ABCDEF01\n\
     Private key: 0x1111111111111111111111111111111111111111111111111111111111111111\n";
const CONTRACT_OUTPUT: &str = "Contract deployed to 0x2222222222222222222222222222222222222222\n";

/// Runs one command and optionally stores its trimmed stdout.
struct RunAndStore {
    command: &'static str,
    key: Option<&'static str>,
}

impl RunAndStore {
    fn run(command: &'static str) -> Self {
        Self { command, key: None }
    }

    fn store(command: &'static str, key: &'static str) -> Self {
        Self {
            command,
            key: Some(key),
        }
    }
}

impl StepBody for RunAndStore {
    fn execute<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let output = ctx.run(&CommandSpec::parse(self.command)).await?;
            if let Some(key) = self.key {
                ctx.set(key, output.stdout.trim())?;
            }
            Ok(())
        })
    }
}

/// Test setup: a temp project directory with its settings document.
struct TestContext {
    _dir: TempDir,
    root: PathBuf,
    settings: SettingsStore,
}

impl TestContext {
    fn new() -> Self {
        let dir = TempDir::new("mintkit-test").expect("Failed to create temp dir");
        let root = dir.path().to_path_buf();
        let settings = SettingsStore::new(root.join("deploy-settings.json"));
        Self {
            _dir: dir,
            root,
            settings,
        }
    }
}

fn three_step_pipeline() -> Pipeline {
    Pipeline::builder()
        .step(Step::run_once("first", RunAndStore::run("tool first")))
        .step(Step::always_run("refresh", RunAndStore::run("tool refresh")))
        .step(Step::run_once("second", RunAndStore::run("tool second")))
        .build()
        .expect("valid pipeline")
}

#[tokio::test]
async fn test_completed_run_once_step_is_skipped() -> Result<()> {
    let ctx = TestContext::new();
    let runner = RecordingRunner::new();
    runner.respond("echo", "1\n");
    let pipeline = Pipeline::builder()
        .step(Step::run_once("A", RunAndStore::store("echo 1", "x")).produces(["x"]))
        .build()?;

    let first = pipeline.run(&ctx.settings, &runner, &AutoApprove::new()).await?;
    assert_eq!(first.with_outcome(StepOutcome::Completed), ["A"]);
    assert_eq!(
        ctx.settings.load(),
        *json!({"x": "1", "A": true}).as_object().unwrap()
    );

    let second = pipeline.run(&ctx.settings, &runner, &AutoApprove::new()).await?;

    assert_eq!(second.with_outcome(StepOutcome::Skipped), ["A"]);
    assert_eq!(runner.count("echo"), 1);
    assert_eq!(ctx.settings.get_str("x").as_deref(), Some("1"));
    Ok(())
}

#[tokio::test]
async fn test_rerun_resumes_at_failed_step() -> Result<()> {
    let ctx = TestContext::new();
    let runner = RecordingRunner::new();
    runner.fail("tool second", 1, "network unreachable");
    let pipeline = three_step_pipeline();

    let err = pipeline
        .run(&ctx.settings, &runner, &AutoApprove::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("second"));
    let failure = err.downcast_ref::<DeployError>().expect("typed error");
    assert_eq!(failure.stderr(), Some("network unreachable"));
    assert!(ctx.settings.is_complete("first"));
    assert!(!ctx.settings.is_complete("second"));

    runner.respond("tool second", "");
    pipeline.run(&ctx.settings, &runner, &AutoApprove::new()).await?;

    assert_eq!(
        runner.command_lines(),
        [
            "tool first",
            "tool refresh",
            "tool second",
            "tool refresh",
            "tool second"
        ]
    );
    assert!(ctx.settings.is_complete("second"));
    Ok(())
}

#[tokio::test]
async fn test_always_run_steps_never_write_markers() -> Result<()> {
    let ctx = TestContext::new();
    let runner = RecordingRunner::new();

    three_step_pipeline()
        .run(&ctx.settings, &runner, &AutoApprove::new())
        .await?;

    assert_eq!(ctx.settings.get("refresh"), None);
    Ok(())
}

#[tokio::test]
async fn test_non_boolean_marker_does_not_skip() -> Result<()> {
    let ctx = TestContext::new();
    ctx.settings.set("first", "true")?;
    let runner = RecordingRunner::new();

    three_step_pipeline()
        .run(&ctx.settings, &runner, &AutoApprove::new())
        .await?;

    assert_eq!(runner.count("tool first"), 1);
    assert_eq!(ctx.settings.get("first"), Some(Value::Bool(true)));
    Ok(())
}

#[tokio::test]
async fn test_corrupt_settings_start_from_scratch() -> Result<()> {
    let ctx = TestContext::new();
    std::fs::write(ctx.settings.path(), "{ not json")?;
    let runner = RecordingRunner::new();

    three_step_pipeline()
        .run(&ctx.settings, &runner, &AutoApprove::new())
        .await?;

    assert_eq!(runner.count("tool"), 3);
    assert!(ctx.settings.is_complete("second"));
    Ok(())
}

#[tokio::test]
async fn test_partial_outputs_are_cleared_before_retry() -> Result<()> {
    let ctx = TestContext::new();
    ctx.settings.set("token", "stale")?;
    let runner = RecordingRunner::new();
    runner.fail("mint", 1, "");
    let pipeline = Pipeline::builder()
        .step(Step::run_once("mint", RunAndStore::store("mint", "token")).produces(["token"]))
        .build()?;

    assert!(
        pipeline
            .run(&ctx.settings, &runner, &AutoApprove::new())
            .await
            .is_err()
    );

    assert_eq!(ctx.settings.get("token"), None);
    Ok(())
}

#[tokio::test]
async fn test_missing_declared_output_fails_step() -> Result<()> {
    let ctx = TestContext::new();
    let runner = RecordingRunner::new();
    let pipeline = Pipeline::builder()
        .step(Step::run_once("silent", RunAndStore::run("true")).produces(["value"]))
        .build()?;

    let err = pipeline
        .run(&ctx.settings, &runner, &AutoApprove::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::MissingOutput { key, .. }) if key == "value"
    ));
    assert!(!ctx.settings.is_complete("silent"));
    Ok(())
}

#[tokio::test]
async fn test_undeclared_output_is_rejected() -> Result<()> {
    let ctx = TestContext::new();
    let runner = RecordingRunner::new();
    let pipeline = Pipeline::builder()
        .step(Step::run_once("sneaky", RunAndStore::store("echo", "hidden")))
        .build()?;

    let err = pipeline
        .run(&ctx.settings, &runner, &AutoApprove::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::UndeclaredOutput { key, .. }) if key == "hidden"
    ));
    assert_eq!(ctx.settings.get("hidden"), None);
    Ok(())
}

fn marketplace_config(root: &Path) -> DeployConfig {
    DeployConfig::with_root(root)
}

fn static_credentials() -> CredentialSource {
    CredentialSource::Static(AwsCredentials {
        access_key_id: "AKIATEST".to_string(),
        secret_access_key: "secret".to_string(),
        session_token: None,
    })
}

/// Script every external tool the marketplace pipeline calls.
fn scripted_marketplace_runner(config: &DeployConfig) -> RecordingRunner {
    let runner = RecordingRunner::new();
    runner.respond("npx hardhat account", ACCOUNT_OUTPUT);
    runner.respond("npx hardhat run", CONTRACT_OUTPUT);

    let outputs = config.stack_outputs_path();
    let node_stack = config.node_stack.clone();
    runner.on_run("npx cdk deploy SimpleNftMarketplaceBlockchainNode", "", {
        let outputs = outputs.clone();
        move |_| {
            let mut doc = serde_json::Map::new();
            doc.insert(
                node_stack.clone(),
                json!({
                    "AmbHttpEndpoint": "nd-abc.ethereum.managedblockchain.us-east-1.amazonaws.com",
                    "DeployRegion": "us-east-1",
                }),
            );
            std::fs::create_dir_all(outputs.parent().unwrap()).unwrap();
            std::fs::write(&outputs, Value::Object(doc).to_string()).unwrap();
        }
    });

    let api_stack = config.api_stack.clone();
    runner.on_run("npx cdk deploy SimpleNftMarketplaceStack", "", move |_| {
        let mut doc = serde_json::Map::new();
        doc.insert(
            api_stack.clone(),
            json!({
                "UserPoolId": "us-east-1_Pool",
                "UserPoolClientId": "client-id",
                "NftApiEndpoint": "https://api.example.com/prod/",
            }),
        );
        std::fs::write(&outputs, Value::Object(doc).to_string()).unwrap();
    });

    runner
}

#[tokio::test]
async fn test_marketplace_deployment_end_to_end() -> Result<()> {
    let ctx = TestContext::new();
    let config = marketplace_config(&ctx.root);
    let runner = scripted_marketplace_runner(&config);
    let gate = AutoApprove::new();
    let pipeline = marketplace_pipeline(&config, static_credentials())?;

    let report = pipeline.run(&ctx.settings, &runner, &gate).await?;

    assert!(report.with_outcome(StepOutcome::Skipped).is_empty());
    let values = ctx.settings.marketplace();
    assert_eq!(
        values.address.as_deref(),
        Some("0xABCDEF0123456789ABCDEF0123456789ABCDEF01")
    );
    assert_eq!(
        values.contract_address.as_deref(),
        Some("0x2222222222222222222222222222222222222222")
    );
    assert_eq!(values.user_pool_id.as_deref(), Some("us-east-1_Pool"));

    let env_file = std::fs::read_to_string(config.marketplace_env_path())?;
    assert_eq!(
        env_file,
        "VUE_APP_AWS_REGION=us-east-1\n\
         VUE_APP_API_ENDPOINT=https://api.example.com/prod/\n\
         VUE_APP_USER_POOL_ID=us-east-1_Pool\n\
         VUE_APP_USER_POOL_WEB_CLIENT_ID=client-id\n"
    );

    let prompts = gate.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("0xABCDEF0123456789ABCDEF0123456789ABCDEF01"));

    let deploy = runner
        .calls()
        .into_iter()
        .find(|c| c.to_string().starts_with("npx hardhat run"))
        .expect("contract deploy ran");
    assert_eq!(
        deploy.env_overlay().get("AMB_HTTP_ENDPOINT").map(String::as_str),
        Some("https://nd-abc.ethereum.managedblockchain.us-east-1.amazonaws.com")
    );
    assert_eq!(
        deploy.env_overlay().get("AWS_ACCESS_KEY_ID").map(String::as_str),
        Some("AKIATEST")
    );
    Ok(())
}

#[tokio::test]
async fn test_marketplace_rerun_skips_run_once_steps() -> Result<()> {
    let ctx = TestContext::new();
    let config = marketplace_config(&ctx.root);
    let runner = scripted_marketplace_runner(&config);
    let pipeline = marketplace_pipeline(&config, static_credentials())?;

    pipeline.run(&ctx.settings, &runner, &AutoApprove::new()).await?;
    let first_env = std::fs::read_to_string(config.marketplace_env_path())?;
    let first_calls = runner.calls().len();

    let report = pipeline.run(&ctx.settings, &runner, &AutoApprove::new()).await?;

    assert_eq!(
        report.with_outcome(StepOutcome::Skipped),
        [
            names::CHECK_DEPENDENCIES,
            names::CREATE_ACCOUNT,
            names::COMPILE_CONTRACT,
            names::DEPLOY_CONTRACT
        ]
    );
    let rerun: Vec<String> = runner.command_lines()[first_calls..].to_vec();
    assert!(rerun.iter().all(|line| !line.starts_with("npx hardhat")));
    assert!(rerun.iter().all(|line| !line.starts_with("cdk --version")));
    assert_eq!(std::fs::read_to_string(config.marketplace_env_path())?, first_env);
    Ok(())
}

#[tokio::test]
async fn test_unparseable_account_output_aborts() -> Result<()> {
    let ctx = TestContext::new();
    let config = marketplace_config(&ctx.root);
    let runner = RecordingRunner::new();
    runner.respond("npx hardhat account", "no keys here");
    let pipeline = marketplace_pipeline(&config, static_credentials())?;

    let err = pipeline
        .run(&ctx.settings, &runner, &AutoApprove::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DeployError>(),
        Some(DeployError::ExtractionFailed { .. })
    ));
    assert!(ctx.settings.is_complete(names::CHECK_DEPENDENCIES));
    assert!(!ctx.settings.is_complete(names::CREATE_ACCOUNT));
    assert_eq!(ctx.settings.get(keys::ADDRESS), None);
    assert_eq!(runner.count("npx cdk"), 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_cdk_is_installed() -> Result<()> {
    let ctx = TestContext::new();
    let runner = RecordingRunner::new();
    runner.fail("cdk --version", 127, "cdk: command not found");
    let pipeline = Pipeline::builder()
        .step(Step::run_once(
            names::CHECK_DEPENDENCIES,
            mintkit_deploy::steps::CheckBinary::new("cdk", "npm install -g aws-cdk"),
        ))
        .build()?;

    pipeline.run(&ctx.settings, &runner, &AutoApprove::new()).await?;

    assert_eq!(
        runner.command_lines(),
        ["cdk --version", "npm install -g aws-cdk"]
    );
    let calls = runner.calls();
    assert!(calls[0].is_silent(), "version check output is not echoed");
    assert!(!calls[1].is_silent(), "install output is shown to the operator");
    Ok(())
}
