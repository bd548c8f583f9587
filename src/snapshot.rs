use std::path::{Path, PathBuf};

use stacked_errors::{Result, StackableErr};
use tokio::fs;
use tracing::debug;

/// File name used for the default snapshot location
pub const SNAPSHOT_FILE_NAME: &str = ".dockpick_snapshot";

const NOT_CAPTURED: &str = "no container listing captured yet, run `dockpick ps` first";

/// Persists the last captured container listing. There is only ever one
/// snapshot, every save fully replaces the previous one.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }

    /// `$HOME/.dockpick_snapshot`, or just the file name relative to the
    /// working directory when `HOME` is unset
    pub fn default_path() -> PathBuf {
        match std::env::var_os("HOME") {
            Some(home) => Path::new(&home).join(SNAPSHOT_FILE_NAME),
            None => PathBuf::from(SNAPSHOT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrites the snapshot with `names`. An empty listing removes the
    /// snapshot file instead.
    pub async fn save(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return self.clear().await
        }
        let bytes = postcard::to_stdvec(names)
            .stack_err("SnapshotStore::save -> failed to serialize the listing")?;
        fs::write(&self.path, &bytes)
            .await
            .stack_err_with(|| format!("SnapshotStore::save -> failed to write {:?}", self.path))?;
        debug!("saved {} container names to {:?}", names.len(), self.path);
        Ok(())
    }

    /// Returns the last saved listing. A missing file and a decode failure
    /// both mean there is no usable capture.
    pub async fn load(&self) -> Result<Vec<String>> {
        let bytes = fs::read(&self.path).await.stack_err(NOT_CAPTURED)?;
        postcard::from_bytes(&bytes).stack_err(NOT_CAPTURED)
    }

    /// Removes the snapshot file, tolerating it already being gone
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).stack_err_with(|| {
                format!("SnapshotStore::clear -> failed to remove {:?}", self.path)
            }),
        }
    }
}
