//! Command builders for the CDK and Hardhat CLIs.

use std::path::{Path, PathBuf};

use crate::CommandSpec;

/// Builder for `npx cdk` commands.
#[derive(Debug, Clone)]
pub struct CdkCmdBuilder {
    action: CdkAction,
    outputs_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
enum CdkAction {
    Bootstrap,
    Deploy { stack: String },
}

impl CdkCmdBuilder {
    /// `cdk bootstrap`.
    pub fn bootstrap() -> Self {
        Self::with_action(CdkAction::Bootstrap)
    }

    /// `cdk deploy <stack>`.
    pub fn deploy(stack: impl Into<String>) -> Self {
        Self::with_action(CdkAction::Deploy {
            stack: stack.into(),
        })
    }

    fn with_action(action: CdkAction) -> Self {
        Self {
            action,
            outputs_file: None,
        }
    }

    /// Write stack outputs to this file.
    pub fn outputs_file(mut self, path: impl AsRef<Path>) -> Self {
        self.outputs_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Build the command, run from `dir`.
    ///
    /// Deploys never wait for approval of security-sensitive changes.
    pub fn build(self, dir: impl AsRef<Path>) -> CommandSpec {
        let mut args = vec!["cdk".to_string()];

        match self.action {
            CdkAction::Bootstrap => args.push("bootstrap".to_string()),
            CdkAction::Deploy { stack } => {
                args.push("deploy".to_string());
                args.push(stack);
                args.push("--require-approval".to_string());
                args.push("never".to_string());

                if let Some(outputs_file) = self.outputs_file {
                    args.push("--outputs-file".to_string());
                    args.push(outputs_file.display().to_string());
                }
            }
        }

        CommandSpec::new("npx").args(args).current_dir(dir)
    }
}

/// Builder for `npx hardhat` commands.
#[derive(Debug, Clone)]
pub struct HardhatCmdBuilder {
    task: String,
    network: Option<String>,
    script: Option<String>,
}

impl HardhatCmdBuilder {
    /// Any hardhat task, e.g. `compile` or `account`.
    pub fn task(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            network: None,
            script: None,
        }
    }

    /// `hardhat run <script>`.
    pub fn run(script: impl Into<String>) -> Self {
        Self {
            script: Some(script.into()),
            ..Self::task("run")
        }
    }

    /// Set the target network.
    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Build the command, run from `dir`.
    pub fn build(self, dir: impl AsRef<Path>) -> CommandSpec {
        let mut args = vec!["hardhat".to_string(), self.task];

        if let Some(network) = self.network {
            args.push("--network".to_string());
            args.push(network);
        }

        if let Some(script) = self.script {
            args.push(script);
        }

        CommandSpec::new("npx").args(args).current_dir(dir)
    }
}
