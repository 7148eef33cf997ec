use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWriteExt};

use super::{
    path::{ResolvedPath, VaultRoot},
    staging::{self, StagedFile},
};
use crate::error::{PathError, UploadError};

/// What a crawl found at a vault path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VaultView {
    Directory(DirectoryListing),
    File(FileContent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryListing {
    pub path: String,
    /// Child names sorted by name; directories carry a trailing `/`.
    pub entries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub path: String,
    pub filename: String,
    pub extension: Option<String>,
    pub size: u64,
    /// File body decoded as UTF-8, invalid sequences replaced.
    pub content: String,
}

/// An upload that reached its final name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub path: String,
    pub size: u64,
}

/// ## Summary
/// Path-confined file operations over the vault root.
///
/// Every operation resolves its input through [`VaultRoot`] before any other
/// I/O. Uploads are written to a staging file and renamed into place; when two
/// uploads target the same name the last rename wins.
#[derive(Debug, Clone)]
pub struct FileVault {
    root: VaultRoot,
}

impl FileVault {
    #[must_use]
    pub fn new(root: VaultRoot) -> Self {
        Self { root }
    }

    /// ## Errors
    /// Returns an error if the root cannot be created or canonicalized.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, PathError> {
        Ok(Self::new(VaultRoot::open(root).await?))
    }

    #[must_use]
    pub fn root(&self) -> &VaultRoot {
        &self.root
    }

    /// ## Summary
    /// Resolves an existing entry under the root.
    ///
    /// ## Errors
    /// Returns `NotFound` or `Forbidden`.
    pub async fn locate(&self, relative: &str) -> Result<ResolvedPath, PathError> {
        self.root.resolve(relative).await
    }

    /// ## Summary
    /// Lists a directory or reads a file as text.
    ///
    /// ## Errors
    /// Returns `NotFound` or `Forbidden` from resolution, `Forbidden` for an
    /// entry that is neither a directory nor a regular file, or an I/O error.
    #[tracing::instrument(skip(self))]
    pub async fn crawl(&self, relative: &str) -> Result<VaultView, PathError> {
        let resolved = self.root.resolve(relative).await?;
        let metadata = tokio::fs::metadata(&resolved.absolute).await?;

        if metadata.is_dir() {
            return Ok(VaultView::Directory(list_directory(resolved).await?));
        }
        // FIFOs, sockets and devices would block or never end.
        if !metadata.is_file() {
            return Err(PathError::Forbidden);
        }

        let bytes = tokio::fs::read(&resolved.absolute).await?;
        let filename = resolved
            .absolute
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = resolved
            .absolute
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned());

        Ok(VaultView::File(FileContent {
            path: resolved.relative,
            filename,
            extension,
            size: metadata.len(),
            content: String::from_utf8_lossy(&bytes).into_owned(),
        }))
    }

    /// ## Summary
    /// Streams `content` into `relative_dir/filename`.
    ///
    /// ## Side Effects
    /// Replaces an existing file of the same name. A failed or cancelled upload
    /// leaves no file behind.
    ///
    /// ## Errors
    /// Returns `MissingFilename` for an absent or blank name, `Path(Forbidden)`
    /// for a name that is not a single plain segment, and `WriteFailed` if the
    /// bytes cannot be stored.
    #[tracing::instrument(skip(self, content))]
    pub async fn upload<R>(
        &self,
        relative_dir: &str,
        filename: Option<&str>,
        content: R,
    ) -> Result<StoredFile, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut stored = self
            .upload_batch(relative_dir, vec![(filename.map(str::to_string), content)])
            .await?;
        stored.pop().ok_or(UploadError::MissingFilename)
    }

    /// ## Summary
    /// Stores several parts in `relative_dir` as one batch.
    ///
    /// Every name and destination is checked before any bytes are written, and
    /// every part is fully staged before the first rename. A rejected part
    /// leaves none of the batch behind.
    ///
    /// ## Errors
    /// As [`Self::upload`] for the first offending part; `MissingFilename` for
    /// an empty batch.
    #[tracing::instrument(skip(self, parts), fields(parts = parts.len()))]
    pub async fn upload_batch<R>(
        &self,
        relative_dir: &str,
        parts: Vec<(Option<String>, R)>,
    ) -> Result<Vec<StoredFile>, UploadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        if parts.is_empty() {
            return Err(UploadError::MissingFilename);
        }

        let dir = self.root.resolve_dir(relative_dir).await?;
        let mut planned = Vec::with_capacity(parts.len());
        for (filename, content) in parts {
            let (name, destination) = plan_destination(&dir, filename.as_deref()).await?;
            planned.push((name, destination, content));
        }

        let mut staged = Vec::with_capacity(planned.len());
        for (name, destination, content) in planned {
            let (file, size) = stage(&dir, content).await?;
            staged.push((file, destination, StoredFile {
                path: dir.child_relative(&name),
                size,
            }));
        }

        let mut stored = Vec::with_capacity(staged.len());
        for (file, destination, record) in staged {
            file.commit(&destination)
                .await
                .map_err(UploadError::WriteFailed)?;
            tracing::info!(path = %record.path, size = record.size, "File stored");
            stored.push(record);
        }
        Ok(stored)
    }

    /// ## Summary
    /// Removes a file, a symlink or an empty directory.
    ///
    /// A symlink is removed itself, never its target.
    ///
    /// ## Errors
    /// Returns `Forbidden` for the root, `NotFound` for a missing entry and
    /// `DirectoryNotEmpty` for a directory with children.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, relative: &str) -> Result<(), PathError> {
        let (lexical, metadata) = self.root.resolve_entry(relative).await?;

        let removal = if metadata.is_dir() {
            tokio::fs::remove_dir(&lexical).await
        } else {
            tokio::fs::remove_file(&lexical).await
        };

        removal.map_err(|e| match e.kind() {
            std::io::ErrorKind::DirectoryNotEmpty => PathError::DirectoryNotEmpty,
            std::io::ErrorKind::NotFound => PathError::NotFound,
            _ => PathError::Io(e),
        })?;

        tracing::info!(path = relative, "Vault entry deleted");
        Ok(())
    }

    /// ## Summary
    /// Creates a directory and any missing parents.
    ///
    /// ## Errors
    /// Returns `Forbidden` for the root or an escaping path and `NotADirectory`
    /// if a component is a file.
    #[tracing::instrument(skip(self))]
    pub async fn mkdir(&self, relative: &str) -> Result<ResolvedPath, PathError> {
        let created = self.root.create_dir_all(relative).await?;
        if created.is_root() {
            return Err(PathError::Forbidden);
        }
        tracing::info!(path = %created.relative, "Directory created");
        Ok(created)
    }
}

/// Checks `filename` and its destination inside `dir` without writing anything.
async fn plan_destination(
    dir: &ResolvedPath,
    filename: Option<&str>,
) -> Result<(String, PathBuf), UploadError> {
    let filename = filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(UploadError::MissingFilename)?;
    if staging::is_staging_name(filename) {
        return Err(PathError::Forbidden.into());
    }

    let destination = VaultRoot::child_for_creation(dir, filename)?;
    if let Ok(existing) = tokio::fs::symlink_metadata(&destination).await
        && existing.is_dir()
    {
        return Err(PathError::IsADirectory.into());
    }
    Ok((filename.to_string(), destination))
}

/// Copies `content` into a new staging file in `dir`.
async fn stage<R>(dir: &ResolvedPath, mut content: R) -> Result<(StagedFile, u64), UploadError>
where
    R: AsyncRead + Unpin + Send,
{
    let (staged, mut file) = StagedFile::create(&dir.absolute)
        .await
        .map_err(UploadError::WriteFailed)?;
    let size = tokio::io::copy(&mut content, &mut file)
        .await
        .map_err(UploadError::WriteFailed)?;
    file.flush().await.map_err(UploadError::WriteFailed)?;
    file.sync_all().await.map_err(UploadError::WriteFailed)?;
    Ok((staged, size))
}

async fn list_directory(resolved: ResolvedPath) -> Result<DirectoryListing, PathError> {
    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(&resolved.absolute).await?;

    while let Some(entry) = reader.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if staging::is_staging_name(&name) {
            continue;
        }

        // Follows symlinks; a dangling link lists as a plain entry.
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .is_ok_and(|metadata| metadata.is_dir());
        entries.push(if is_dir { format!("{name}/") } else { name });
    }

    entries.sort();
    Ok(DirectoryListing {
        path: resolved.relative,
        entries,
    })
}
