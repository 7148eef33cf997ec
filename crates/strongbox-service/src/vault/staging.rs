use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};

/// File name prefix of in-flight uploads. Entries with this prefix are hidden
/// from directory listings.
pub const STAGING_PREFIX: &str = ".strongbox-upload-";

#[must_use]
pub fn is_staging_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX)
}

/// ## Summary
/// A hidden upload file that is removed on drop unless committed.
///
/// Lives in the destination directory so the final rename never crosses a
/// filesystem boundary.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// ## Summary
    /// Creates a new, uniquely named staging file in `dir`.
    ///
    /// ## Errors
    /// Returns an error if the file cannot be created.
    pub async fn create(dir: &Path) -> std::io::Result<(Self, File)> {
        let path = dir.join(format!("{STAGING_PREFIX}{}", uuid::Uuid::new_v4()));
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        tracing::trace!(path = %path.display(), "Staging file created");
        Ok((
            Self {
                path,
                committed: false,
            },
            file,
        ))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// ## Summary
    /// Atomically renames the staging file over `destination`.
    ///
    /// ## Errors
    /// Returns an error if the rename fails, in which case the staging file is
    /// removed when `self` drops.
    pub async fn commit(mut self, destination: &Path) -> std::io::Result<()> {
        tokio::fs::rename(&self.path, destination).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Staging file discarded"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staging file");
            }
        }
    }
}
