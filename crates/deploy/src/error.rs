//! Error taxonomy for the deployment engine.

use crate::extract::TokenKind;

/// Fatal errors raised by the pipeline engine and its collaborators.
///
/// I/O and serialization failures are reported through [`anyhow`] with context;
/// this enum covers the failures the pipeline itself knows how to name.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command `{command}` exited with {}", describe_exit(.exit_code))]
    ProcessFailed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("failed to spawn `{command}`")]
    ProcessSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O failure while running `{command}`")]
    ProcessIo {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse {kind}")]
    ExtractionFailed { kind: TokenKind },
    #[error("step `{step}` requires setting `{key}` but no value is stored")]
    MissingRequiredSetting { step: String, key: String },
    #[error("stack output `{stack}.{key}` not found")]
    MissingStackOutput { stack: String, key: String },
    #[error("step `{step}` read setting `{key}` without declaring it as an input")]
    UndeclaredInput { step: String, key: String },
    #[error("step `{step}` wrote setting `{key}` without declaring it as an output")]
    UndeclaredOutput { step: String, key: String },
    #[error("step `{step}` finished without writing declared output `{key}`")]
    MissingOutput { step: String, key: String },
    #[error("step `{step}` requires `{key}` but no earlier step produces it")]
    UnsatisfiedInput { step: String, key: String },
    #[error("step `{name}` is registered more than once")]
    DuplicateStep { name: String },
    #[error("step `{name}` shares its name with setting `{name}` produced by `{producer}`")]
    StepNameCollision { name: String, producer: String },
    #[error("no AWS credentials found for profile `{profile}`")]
    MissingCredentials { profile: String },
    #[error("interrupted by operator")]
    Interrupted,
}

impl DeployError {
    /// Captured stderr of a failed process, if this error carries one.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            DeployError::ProcessFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

fn describe_exit(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}
