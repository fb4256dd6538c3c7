//! Step descriptors.

use std::fmt;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::context::StepContext;

/// How a step behaves when the pipeline is invoked again.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Idempotency {
    /// Runs until it completes once, then is skipped on every later invocation.
    RunOnce,
    /// Runs on every invocation; never writes or reads a completion marker.
    AlwaysRun,
}

/// The effectful part of a step.
///
/// Bodies read and write settings only through the [`StepContext`], and reach
/// external tools and the operator through it as well.
pub trait StepBody: Send + Sync {
    fn execute<'a>(&'a self, ctx: &'a StepContext<'a>) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// A named unit of pipeline work.
///
/// The name is both the log label and, for [`Idempotency::RunOnce`] steps, the key
/// of the completion marker.
pub struct Step {
    name: String,
    title: String,
    idempotency: Idempotency,
    requires: Vec<String>,
    produces: Vec<String>,
    body: Box<dyn StepBody>,
}

impl Step {
    pub fn new(name: impl Into<String>, idempotency: Idempotency, body: impl StepBody + 'static) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            idempotency,
            requires: Vec::new(),
            produces: Vec::new(),
            body: Box::new(body),
        }
    }

    /// A step that is skipped once it has completed.
    pub fn run_once(name: impl Into<String>, body: impl StepBody + 'static) -> Self {
        Self::new(name, Idempotency::RunOnce, body)
    }

    /// A step that runs on every invocation.
    pub fn always_run(name: impl Into<String>, body: impl StepBody + 'static) -> Self {
        Self::new(name, Idempotency::AlwaysRun, body)
    }

    /// Human-readable description used in progress banners.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Declare settings keys this step reads.
    pub fn requires(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.requires.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Declare settings keys this step writes.
    pub fn produces(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.produces.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get_title(&self) -> &str {
        &self.title
    }

    pub fn idempotency(&self) -> Idempotency {
        self.idempotency
    }

    pub fn inputs(&self) -> &[String] {
        &self.requires
    }

    pub fn outputs(&self) -> &[String] {
        &self.produces
    }

    pub(crate) fn body(&self) -> &dyn StepBody {
        self.body.as_ref()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("idempotency", &self.idempotency)
            .field("requires", &self.requires)
            .field("produces", &self.produces)
            .finish_non_exhaustive()
    }
}
