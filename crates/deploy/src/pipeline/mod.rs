//! Resumable step pipeline.
//!
//! Steps run strictly in registration order, one at a time:
//!
//! ```text
//! Pending -> (skip if RunOnce and marker present) -> Running -> Completed | Failed
//! ```
//!
//! A completed [`Idempotency::RunOnce`] step writes a `true` marker under its name;
//! [`Idempotency::AlwaysRun`] steps never touch markers. The first failure aborts
//! the run. Invoking the pipeline again skips every completed run-once step and
//! resumes at the step that failed.
//!
//! # Example
//!
//! ```no_run
//! use mintkit_deploy::{AutoApprove, Pipeline, SettingsStore, Step, SystemRunner};
//! # use mintkit_deploy::{StepBody, StepContext};
//! # use futures::future::BoxFuture;
//! # struct Compile;
//! # impl StepBody for Compile {
//! #     fn execute<'a>(&'a self, _ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
//! #         Box::pin(async { Ok(()) })
//! #     }
//! # }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pipeline = Pipeline::builder()
//!     .step(Step::run_once("compileContract", Compile).title("Compile Contract"))
//!     .build()?;
//!
//! let settings = SettingsStore::new("deploy-settings.json");
//! pipeline.run(&settings, &SystemRunner::default(), &AutoApprove::new()).await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod step;

use std::collections::HashSet;

use anyhow::Context;
use derive_more::Deref;

pub use context::StepContext;
pub use step::{Idempotency, Step, StepBody};

use crate::{DeployError, OperatorGate, ProcessRunner, SettingsStore, progress};

/// Collects steps and checks their declared data flow.
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    steps: Vec<Step>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step. Order of registration is order of execution.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Validate and freeze the step sequence.
    ///
    /// Every key a step requires must be produced by a step registered before it,
    /// step names must be unique, and no step may be named after a setting any
    /// step produces (its completion marker would overwrite that value).
    pub fn build(self) -> Result<Pipeline, DeployError> {
        validate(&self.steps)?;
        Ok(Pipeline { steps: self.steps })
    }
}

fn validate(steps: &[Step]) -> Result<(), DeployError> {
    for step in steps {
        if let Some(producer) = steps
            .iter()
            .find(|other| other.outputs().iter().any(|key| key == step.name()))
        {
            return Err(DeployError::StepNameCollision {
                name: step.name().to_string(),
                producer: producer.name().to_string(),
            });
        }
    }

    let mut names = HashSet::new();
    let mut available: HashSet<&str> = HashSet::new();

    for step in steps {
        if !names.insert(step.name()) {
            return Err(DeployError::DuplicateStep {
                name: step.name().to_string(),
            });
        }

        if let Some(key) = step
            .inputs()
            .iter()
            .find(|key| !available.contains(key.as_str()))
        {
            return Err(DeployError::UnsatisfiedInput {
                step: step.name().to_string(),
                key: key.clone(),
            });
        }

        available.extend(step.outputs().iter().map(String::as_str));
    }

    Ok(())
}

/// What happened to a step during one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum StepOutcome {
    Skipped,
    Completed,
}

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    pub outcome: StepOutcome,
}

/// Outcomes of every step of a successful invocation, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct PipelineReport(Vec<StepReport>);

impl PipelineReport {
    fn push(&mut self, name: &str, outcome: StepOutcome) {
        self.0.push(StepReport {
            name: name.to_string(),
            outcome,
        });
    }

    /// Names of the steps with the given outcome.
    pub fn with_outcome(&self, outcome: StepOutcome) -> Vec<&str> {
        self.0
            .iter()
            .filter(|r| r.outcome == outcome)
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Persisted state of one step, as seen before a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepStatus {
    pub name: String,
    pub title: String,
    pub idempotency: Idempotency,
    /// `None` for always-run steps, which keep no marker.
    pub completed: Option<bool>,
}

/// An ordered, validated sequence of steps.
#[derive(Debug)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Look up a step by name.
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name() == name)
    }

    /// Marker state of every step.
    pub fn status(&self, settings: &SettingsStore) -> Vec<StepStatus> {
        let markers = settings.load();
        self.steps
            .iter()
            .map(|step| StepStatus {
                name: step.name().to_string(),
                title: step.get_title().to_string(),
                idempotency: step.idempotency(),
                completed: match step.idempotency() {
                    Idempotency::RunOnce => {
                        Some(markers.get(step.name()) == Some(&serde_json::Value::Bool(true)))
                    }
                    Idempotency::AlwaysRun => None,
                },
            })
            .collect()
    }

    /// Run every step in order, skipping completed run-once steps.
    ///
    /// The first failing step aborts the run; its error is returned with the step
    /// name attached as context and can still be downcast to [`DeployError`].
    pub async fn run(
        &self,
        settings: &SettingsStore,
        runner: &dyn ProcessRunner,
        gate: &dyn OperatorGate,
    ) -> anyhow::Result<PipelineReport> {
        settings.ensure_exists()?;
        let mut report = PipelineReport::default();

        for step in &self.steps {
            let run_once = step.idempotency() == Idempotency::RunOnce;

            if run_once && settings.is_complete(step.name()) {
                println!("{}", progress::skipped(step.name()));
                tracing::info!(step = %step.name(), "Skipping completed step");
                report.push(step.name(), StepOutcome::Skipped);
                continue;
            }

            if run_once {
                Self::clear_partial_outputs(step, settings)?;
            }

            progress::print_banner(&progress::started(step.get_title()));
            tracing::info!(step = %step.name(), idempotency = %step.idempotency(), "Running step");

            let ctx = StepContext::new(step, settings, runner, gate);
            step.body()
                .execute(&ctx)
                .await
                .with_context(|| format!("Step `{}` failed", step.name()))?;

            if let Some(key) = step.outputs().iter().find(|key| settings.get(key).is_none()) {
                return Err(DeployError::MissingOutput {
                    step: step.name().to_string(),
                    key: key.clone(),
                })
                .with_context(|| format!("Step `{}` failed", step.name()));
            }

            if run_once {
                settings.mark_complete(step.name())?;
            }

            progress::print_banner(&progress::completed(step.get_title()));
            tracing::info!(step = %step.name(), "Step completed");
            report.push(step.name(), StepOutcome::Completed);
        }

        Ok(report)
    }

    /// Remove outputs left behind by an interrupted attempt of `step`.
    fn clear_partial_outputs(step: &Step, settings: &SettingsStore) -> anyhow::Result<()> {
        for key in step.outputs() {
            if settings.remove(key)? {
                tracing::warn!(step = %step.name(), key = %key, "Cleared partial output from a previous attempt");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;

    use super::*;

    struct Noop;

    impl StepBody for Noop {
        fn execute<'a>(&'a self, _ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[test]
    fn test_build_accepts_inputs_produced_earlier() {
        let pipeline = Pipeline::builder()
            .step(Step::run_once("createAccount", Noop).produces(["address"]))
            .step(Step::always_run("promptForEther", Noop).requires(["address"]))
            .build()
            .unwrap();

        assert_eq!(pipeline.steps().len(), 2);
        assert!(pipeline.step("promptForEther").is_some());
    }

    #[test]
    fn test_build_rejects_input_without_earlier_producer() {
        let err = Pipeline::builder()
            .step(Step::always_run("promptForEther", Noop).requires(["address"]))
            .step(Step::run_once("createAccount", Noop).produces(["address"]))
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::UnsatisfiedInput { ref step, ref key } if step == "promptForEther" && key == "address"
        ));
    }

    #[test]
    fn test_build_rejects_duplicate_names() {
        let err = Pipeline::builder()
            .step(Step::run_once("compileContract", Noop))
            .step(Step::always_run("compileContract", Noop))
            .build()
            .unwrap_err();

        assert!(matches!(err, DeployError::DuplicateStep { ref name } if name == "compileContract"));
    }

    #[test]
    fn test_build_rejects_step_named_after_a_produced_setting() {
        let err = Pipeline::builder()
            .step(Step::run_once("createAccount", Noop).produces(["address"]))
            .step(Step::run_once("address", Noop).requires(["address"]))
            .build()
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::StepNameCollision { ref name, ref producer }
                if name == "address" && producer == "createAccount"
        ));
    }

    #[test]
    fn test_build_rejects_step_producing_its_own_name() {
        let err = Pipeline::builder()
            .step(Step::always_run("region", Noop).produces(["region"]))
            .build()
            .unwrap_err();

        assert!(matches!(err, DeployError::StepNameCollision { ref name, .. } if name == "region"));
    }

    #[test]
    fn test_status_reads_without_creating_settings() {
        let dir = tempdir::TempDir::new("mintkit-test").expect("Failed to create temp dir");
        let settings = SettingsStore::new(dir.path().join("state").join("deploy-settings.json"));
        let pipeline = Pipeline::builder()
            .step(Step::run_once("compileContract", Noop))
            .step(Step::always_run("writeFrontEndVars", Noop))
            .build()
            .unwrap();

        let status = pipeline.status(&settings);

        assert_eq!(status[0].completed, Some(false));
        assert_eq!(status[1].completed, None);
        assert!(!dir.path().join("state").exists());
    }

    #[test]
    fn test_report_filters_by_outcome() {
        let mut report = PipelineReport::default();
        report.push("a", StepOutcome::Skipped);
        report.push("b", StepOutcome::Completed);
        report.push("c", StepOutcome::Skipped);

        assert_eq!(report.with_outcome(StepOutcome::Skipped), ["a", "c"]);
        assert_eq!(report.with_outcome(StepOutcome::Completed), ["b"]);
        assert_eq!(report.len(), 3);
    }
}
