use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pbs_inventory::{StatusCommandError, StatusSource};

/// Replays captured `pbsnodes <host>` output stored as `<dir>/<host>.txt`
#[derive(Debug, Clone)]
pub struct SnapshotDirSource {
    dir: PathBuf,
}

impl SnapshotDirSource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_of(&self, hostname: &str) -> PathBuf {
        self.dir.join(format!("{hostname}.txt"))
    }
}

#[async_trait]
impl StatusSource for SnapshotDirSource {
    async fn query(&self, hostname: &str) -> Result<String, StatusCommandError> {
        let path = self.path_of(hostname);
        tracing::debug!(path = %path.display(), hostname, "Reading status snapshot");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| snapshot_error(&path, source))
    }
}

fn snapshot_error(path: &Path, source: io::Error) -> StatusCommandError {
    let program = path.display().to_string();
    if source.kind() == io::ErrorKind::InvalidData {
        StatusCommandError::InvalidOutput { program }
    } else {
        StatusCommandError::Launch { program, source }
    }
}
