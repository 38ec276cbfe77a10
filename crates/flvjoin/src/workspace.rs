use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tempfile::TempDir;
use tokio::task::JoinHandle;

use crate::error::JoinResult;

/// Exit status used when the process is stopped by Ctrl-C or SIGTERM.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Private scratch directory of one run.
///
/// Holds the repaired fragments, the concat manifest and the joined output
/// until it is published. The directory is removed by [Workspace::cleanup],
/// which runs at most once no matter how many exit paths race for it.
pub struct Workspace {
    path: PathBuf,
    dir: Mutex<Option<TempDir>>,
}

impl Workspace {
    /// Create a uniquely named workspace under `root`, together with an empty
    /// manifest inside it.
    pub fn create_in<P>(root: P) -> JoinResult<(Self, Manifest)>
    where
        P: AsRef<Path>,
    {
        let dir = tempfile::Builder::new()
            .prefix(".twitch-join")
            .tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        tracing::info!("Created workspace {}", path.display());

        let workspace = Self {
            path,
            dir: Mutex::new(Some(dir)),
        };
        let manifest = Manifest::create_in(&workspace.path)?;
        Ok((workspace, manifest))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace directory recursively.
    ///
    /// The first caller performs the removal while holding the lock, so a
    /// concurrent caller returns only after the directory is gone. Failures
    /// are logged and otherwise ignored.
    pub fn cleanup(&self) {
        let mut dir = self.dir.lock().unwrap_or_else(|e| e.into_inner());
        let Some(dir) = dir.take() else {
            return;
        };

        tracing::debug!("Removing workspace {}", self.path.display());
        if let Err(e) = dir.close() {
            tracing::warn!("Couldn't remove workspace {}: {e}", self.path.display());
        }
    }

    pub fn is_removed(&self) -> bool {
        self.dir.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }

    /// Remove the workspace and exit when the user interrupts the process.
    ///
    /// The returned task is abandoned once the run is over; aborting it is
    /// enough, it holds no state besides the workspace handle.
    pub fn guard_interrupts(self: &Arc<Self>) -> JoinHandle<()> {
        let workspace = Arc::clone(self);
        tokio::spawn(async move {
            wait_for_interrupt().await;
            tracing::warn!("Interrupted, cleaning up...");

            let cleaner = Arc::clone(&workspace);
            if let Err(e) = tokio::task::spawn_blocking(move || cleaner.cleanup()).await {
                tracing::error!("Cleanup task failed: {e}");
                workspace.cleanup();
            }
            std::process::exit(INTERRUPTED_EXIT_CODE);
        })
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(unix)]
async fn wait_for_interrupt() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            tracing::warn!("Failed to listen for SIGTERM: {e}");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Concat demuxer input: one `file '<path>'` line per fragment, in the order
/// the fragments were added.
pub struct Manifest {
    path: PathBuf,
    writer: BufWriter<File>,
    entries: usize,
}

impl Manifest {
    fn create_in(dir: &Path) -> JoinResult<Self> {
        let (file, path) = tempfile::Builder::new()
            .prefix("list")
            .suffix(".txt")
            .tempfile_in(dir)?
            .keep()
            .map_err(|e| e.error)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            entries: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn push<P>(&mut self, fragment: P) -> JoinResult<()>
    where
        P: AsRef<Path>,
    {
        writeln!(self.writer, "file '{}'", quote_path(fragment.as_ref()))?;
        self.entries += 1;
        Ok(())
    }

    /// Flush and close the manifest, returning its path.
    pub fn finish(self) -> JoinResult<PathBuf> {
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(self.path)
    }
}

/// Escape `path` for use inside a single-quoted concat manifest entry,
/// where a quote is written as `'\''`.
fn quote_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', r"'\''")
}
