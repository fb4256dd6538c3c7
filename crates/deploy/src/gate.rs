//! Operator checkpoints.
//!
//! A gate blocks the pipeline until the operator acknowledges a prompt. There is
//! no timeout: an unattended gate stalls the deployment indefinitely.

use std::{
    io::{BufRead, IsTerminal, Write},
    sync::{Mutex, PoisonError},
};

use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    style::Stylize,
    terminal,
};
use futures::future::BoxFuture;

use crate::DeployError;

/// Blocks progress until the operator acknowledges `prompt`.
pub trait OperatorGate: Send + Sync {
    fn wait<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Waits for a single keypress on the controlling terminal.
///
/// Ctrl+C at the prompt aborts with [`DeployError::Interrupted`]. When stdin is
/// not a terminal a full line is read instead, and end of input aborts.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeypressGate;

impl OperatorGate for KeypressGate {
    fn wait<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let mut stdout = std::io::stdout();
            if stdout.is_terminal() {
                writeln!(stdout, "{}", prompt.green().bold())?;
            } else {
                writeln!(stdout, "{prompt}")?;
            }
            stdout.flush()?;

            tracing::debug!("Waiting for operator acknowledgement");
            tokio::task::spawn_blocking(wait_for_key)
                .await
                .context("Keypress task panicked")??;
            tracing::debug!("Operator acknowledged");
            Ok(())
        })
    }
}

fn wait_for_key() -> anyhow::Result<()> {
    if !std::io::stdin().is_terminal() {
        return wait_for_line(std::io::stdin().lock());
    }

    terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    let key = loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(key),
            Ok(_) => continue,
            Err(e) => break Err(e),
        }
    };
    terminal::disable_raw_mode().context("Failed to disable raw mode")?;

    let key = key.context("Failed to read key event")?;
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Err(DeployError::Interrupted.into());
    }
    Ok(())
}

/// Wait for one line from `reader`; end of input means the operator went away.
fn wait_for_line(mut reader: impl BufRead) -> anyhow::Result<()> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    if read == 0 {
        return Err(DeployError::Interrupted.into());
    }
    Ok(())
}

/// Acknowledges every prompt immediately, recording what was asked.
#[derive(Debug, Default)]
pub struct AutoApprove {
    prompts: Mutex<Vec<String>>,
}

impl AutoApprove {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompts seen so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OperatorGate for AutoApprove {
    fn wait<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, anyhow::Result<()>> {
        tracing::info!(prompt, "Auto-approving operator checkpoint");
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());
        Box::pin(async { Ok(()) })
    }
}
