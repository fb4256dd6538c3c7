//! Running external tools.
//!
//! Commands run to completion with no timeout: provisioning can legitimately take
//! half an hour, and cancellation is left to the operator. Both output streams are
//! mirrored to the terminal while they are buffered for extraction.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
};

use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::DeployError;

/// A command line plus the directory and environment it runs with.
///
/// The environment is an overlay: listed variables override, everything else is
/// inherited from the current process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    silent: bool,
}

impl CommandSpec {
    /// Create a command for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: BTreeMap::new(),
            silent: false,
        }
    }

    /// Build a command from a whitespace-separated command line.
    ///
    /// No shell quoting is interpreted.
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let program = parts.next().unwrap_or_default();
        Self::new(program).args(parts)
    }

    /// Add one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Override one environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Override several environment variables.
    pub fn envs(
        mut self,
        vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Capture output without mirroring it, whatever the runner's setting.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    pub fn env_overlay(&self) -> &BTreeMap<String, String> {
        &self.env
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Output of a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Something that can run a [`CommandSpec`].
///
/// A non-zero exit is reported as [`DeployError::ProcessFailed`] with the captured
/// streams attached.
pub trait ProcessRunner: Send + Sync {
    fn run<'a>(&'a self, cmd: &'a CommandSpec) -> BoxFuture<'a, Result<ProcessOutput, DeployError>>;
}

/// Runs commands as child processes of this one.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    /// Mirror child output to the terminal while capturing it.
    pub mirror: bool,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self { mirror: true }
    }
}

impl SystemRunner {
    /// A runner that captures output without echoing it.
    pub fn quiet() -> Self {
        Self { mirror: false }
    }

    async fn run_inner(&self, cmd: &CommandSpec) -> Result<ProcessOutput, DeployError> {
        let command_line = cmd.to_string();
        let io_error = |source| DeployError::ProcessIo {
            command: command_line.clone(),
            source,
        };

        let mut command = tokio::process::Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .envs(&cmd.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cmd.current_dir {
            command.current_dir(dir);
        }

        tracing::info!(
            command = %command_line,
            cwd = ?cmd.current_dir,
            env = ?cmd.env.keys().collect::<Vec<_>>(),
            "Running command"
        );

        let mut child = command.spawn().map_err(|source| DeployError::ProcessSpawn {
            command: command_line.clone(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io_error(std::io::Error::other("stdout was not piped")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io_error(std::io::Error::other("stderr was not piped")))?;

        let mirror = self.mirror && !cmd.silent;
        let (stdout, stderr, status) = tokio::join!(
            tee(stdout, mirror.then(tokio::io::stdout)),
            tee(stderr, mirror.then(tokio::io::stderr)),
            child.wait(),
        );

        let stdout = String::from_utf8_lossy(&stdout.map_err(io_error)?).into_owned();
        let stderr = String::from_utf8_lossy(&stderr.map_err(io_error)?).into_owned();
        let status = status.map_err(io_error)?;

        tracing::debug!(command = %command_line, exit_code = ?status.code(), "Command finished");

        if !status.success() {
            return Err(DeployError::ProcessFailed {
                command: command_line,
                exit_code: status.code(),
                stdout,
                stderr,
            });
        }

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

impl ProcessRunner for SystemRunner {
    fn run<'a>(&'a self, cmd: &'a CommandSpec) -> BoxFuture<'a, Result<ProcessOutput, DeployError>> {
        Box::pin(self.run_inner(cmd))
    }
}

/// Drain `reader` to the end, copying each chunk to `mirror` as it arrives.
///
/// A failing mirror stops mirroring but never stops the capture.
async fn tee<R, W>(mut reader: R, mut mirror: Option<W>) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut captured = Vec::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        captured.extend_from_slice(&buf[..n]);

        if let Some(out) = mirror.as_mut() {
            let written = async {
                out.write_all(&buf[..n]).await?;
                out.flush().await
            };
            if let Err(e) = written.await {
                tracing::warn!(error = %e, "Failed to mirror command output, continuing without it");
                mirror = None;
            }
        }
    }

    Ok(captured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let cmd = CommandSpec::parse("npx  cdk deploy Stack --require-approval never");

        assert_eq!(cmd.program(), "npx");
        assert_eq!(
            cmd.get_args(),
            ["cdk", "deploy", "Stack", "--require-approval", "never"]
        );
        assert_eq!(cmd.to_string(), "npx cdk deploy Stack --require-approval never");
    }

    #[test]
    fn test_env_overlay_overrides_by_key() {
        let cmd = CommandSpec::new("node")
            .env("A", "1")
            .envs([("B", "2"), ("A", "3")]);

        assert_eq!(cmd.env_overlay().get("A").map(String::as_str), Some("3"));
        assert_eq!(cmd.env_overlay().len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_silent_command_is_still_captured() {
        let cmd = CommandSpec::new("sh").args(["-c", "echo 1.2.3"]).silent();

        let output = SystemRunner::default().run(&cmd).await.unwrap();

        assert!(cmd.is_silent());
        assert_eq!(output.stdout, "1.2.3\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_and_extracts_address() {
        let cmd = CommandSpec::new("sh").args([
            "-c",
            "echo 'Address: 0xABCDEF0123456789ABCDEF0123456789ABCDEF01 done'",
        ]);

        let output = SystemRunner::quiet().run(&cmd).await.unwrap();
        let address = crate::TokenKind::Address.extract(&output.stdout).unwrap();

        assert_eq!(output.exit_code, Some(0));
        assert_eq!(address, "0xABCDEF0123456789ABCDEF0123456789ABCDEF01");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_process_failed_with_streams() {
        let cmd = CommandSpec::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]);

        let err = SystemRunner::quiet().run(&cmd).await.unwrap_err();

        match err {
            DeployError::ProcessFailed {
                exit_code,
                stdout,
                stderr,
                ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stdout, "out\n");
                assert_eq!(stderr, "err\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_env_overlay_keeps_ambient_environment() {
        let cmd = CommandSpec::new("sh")
            .args(["-c", "printf '%s|%s' \"$MINTKIT_OVERLAY\" \"$PATH\""])
            .env("MINTKIT_OVERLAY", "injected");

        let output = SystemRunner::quiet().run(&cmd).await.unwrap();
        let (overlay, path) = output.stdout.split_once('|').unwrap();

        assert_eq!(overlay, "injected");
        assert!(!path.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempdir::TempDir::new("mintkit-test").expect("Failed to create temp dir");
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();

        let cmd = CommandSpec::new("cat").arg("marker.txt").current_dir(dir.path());
        let output = SystemRunner::quiet().run(&cmd).await.unwrap();

        assert_eq!(output.stdout, "here");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let cmd = CommandSpec::new("mintkit-definitely-not-installed").arg("--version");

        let err = SystemRunner::quiet().run(&cmd).await.unwrap_err();

        assert!(matches!(err, DeployError::ProcessSpawn { .. }));
    }
}
