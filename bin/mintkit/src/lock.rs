//! Exclusive advisory lock held while a command mutates deployment state.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs2::FileExt;

/// Released when dropped.
#[derive(Debug)]
pub struct DeployLock {
    file: File,
    path: PathBuf,
}

impl DeployLock {
    /// Take the lock at `path`, failing immediately if another run holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        if file.try_lock_exclusive().is_err() {
            let holder = std::fs::read_to_string(path).unwrap_or_default();
            anyhow::bail!(
                "Another mintkit run is in progress ({}): {}",
                path.display(),
                holder.trim()
            );
        }

        file.set_len(0)
            .with_context(|| format!("Failed to truncate lock file {}", path.display()))?;
        writeln!(
            file,
            "pid={} started={}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        )
        .with_context(|| format!("Failed to write lock file {}", path.display()))?;

        tracing::debug!(path = %path.display(), "Lock acquired");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(error = %e, path = %self.path.display(), "Failed to release lock");
        }
    }
}
