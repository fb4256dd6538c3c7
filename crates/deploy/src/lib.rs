//! mintkit-deploy - Resumable deployment pipeline for the NFT marketplace.
//!
//! This crate provides the engine (settings store, process runner, output
//! extraction, operator gates and the step pipeline) together with the
//! marketplace steps that provision the blockchain node, deploy the contract
//! and API, and write the front-end configuration.

mod config;
pub use config::{CONFIG_FILENAME, DeployConfig};

mod credentials;
pub use credentials::{AwsCredentials, CredentialSource, DEFAULT_PROFILE};

mod error;
pub use error::DeployError;

mod extract;
pub use extract::{TokenKind, extract};

mod gate;
pub use gate::{AutoApprove, KeypressGate, OperatorGate};

mod materialize;
pub use materialize::{EnvTemplate, FRONTEND_ENV};

mod pipeline;
pub use pipeline::{
    Idempotency, Pipeline, PipelineBuilder, PipelineReport, Step, StepBody, StepContext,
    StepOutcome, StepReport, StepStatus,
};

mod process;
pub use process::{CommandSpec, ProcessOutput, ProcessRunner, SystemRunner};

pub mod progress;

mod settings;
pub use settings::{MarketplaceSettings, SETTINGS_FILENAME, SettingsDocument, SettingsStore, keys};

mod stack_outputs;
pub use stack_outputs::StackOutputs;

pub mod steps;
pub use steps::marketplace_pipeline;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
