use std::{
    io,
    path::{Path, PathBuf},
};

use crate::error::PathError;

/// A vault entry resolved to its canonical location under the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Normalized vault-relative form, `""` for the root itself.
    pub relative: String,
    /// Canonical absolute path on disk.
    pub absolute: PathBuf,
}

impl ResolvedPath {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// Vault-relative path of a direct child.
    #[must_use]
    pub fn child_relative(&self, name: &str) -> String {
        if self.relative.is_empty() {
            name.to_string()
        } else {
            format!("{}/{name}", self.relative)
        }
    }
}

/// ## Summary
/// The confinement boundary of the vault.
///
/// Holds the canonical root. Every resolved path is canonicalized and checked
/// to be the root or one of its descendants before any I/O happens on it.
#[derive(Debug, Clone)]
pub struct VaultRoot {
    root: PathBuf,
}

impl VaultRoot {
    /// ## Summary
    /// Opens the vault at `root`, creating the directory if it does not exist.
    ///
    /// ## Errors
    /// Returns an error if the directory cannot be created or canonicalized.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, PathError> {
        let root = root.as_ref();
        tokio::fs::create_dir_all(root).await?;
        let root = tokio::fs::canonicalize(root).await?;
        tracing::debug!(root = %root.display(), "Vault root opened");
        Ok(Self { root })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// ## Summary
    /// Normalizes a vault-relative path without touching the filesystem.
    ///
    /// Empty and `.` segments are dropped. A `..` segment, a leading `/`, a
    /// backslash or a NUL byte is rejected, as is a drive prefix on Windows.
    ///
    /// ## Errors
    /// Returns `PathError::Forbidden` for any rejected input.
    pub fn normalize(relative: &str) -> Result<String, PathError> {
        Ok(segments(relative)?.join("/"))
    }

    /// ## Summary
    /// Resolves an existing entry and checks it is confined to the root.
    ///
    /// Symlinks are followed; one that leads outside the root is `Forbidden`.
    ///
    /// ## Errors
    /// Returns `NotFound` if the entry does not exist and `Forbidden` if the
    /// input is rejected or the entry lies outside the root.
    pub async fn resolve(&self, relative: &str) -> Result<ResolvedPath, PathError> {
        let relative = Self::normalize(relative)?;
        let absolute = tokio::fs::canonicalize(self.root.join(&relative))
            .await
            .map_err(classify)?;
        self.confine(&absolute)?;

        Ok(ResolvedPath { relative, absolute })
    }

    /// ## Summary
    /// Resolves an existing directory.
    ///
    /// ## Errors
    /// As [`Self::resolve`], plus `NotADirectory` if the entry is a file.
    pub async fn resolve_dir(&self, relative: &str) -> Result<ResolvedPath, PathError> {
        let resolved = self.resolve(relative).await?;
        if !tokio::fs::metadata(&resolved.absolute).await?.is_dir() {
            return Err(PathError::NotADirectory);
        }
        Ok(resolved)
    }

    /// ## Summary
    /// Resolves the lexical location of an entry without following a symlink
    /// in its last segment. The parent directory is resolved and confined.
    ///
    /// ## Errors
    /// Returns `Forbidden` for the root itself or a rejected input and
    /// `NotFound` if the entry does not exist.
    pub async fn resolve_entry(
        &self,
        relative: &str,
    ) -> Result<(PathBuf, std::fs::Metadata), PathError> {
        let mut parts = segments(relative)?;
        let Some(name) = parts.pop() else {
            return Err(PathError::Forbidden);
        };

        let parent = self.resolve_dir(&parts.join("/")).await?;
        let lexical = parent.absolute.join(name);
        let metadata = tokio::fs::symlink_metadata(&lexical)
            .await
            .map_err(classify)?;

        Ok((lexical, metadata))
    }

    /// ## Summary
    /// Location for a new child named `name` inside an already resolved directory.
    ///
    /// ## Errors
    /// Returns `Forbidden` unless `name` is a single plain path segment.
    pub fn child_for_creation(parent: &ResolvedPath, name: &str) -> Result<PathBuf, PathError> {
        match segments(name)?.as_slice() {
            [single] if *single == name => Ok(parent.absolute.join(single)),
            _ => Err(PathError::Forbidden),
        }
    }

    /// ## Summary
    /// Creates a directory and any missing parents below the root.
    ///
    /// The deepest existing ancestor is canonicalized and confined before
    /// anything is created, and the result is confined again afterwards.
    ///
    /// ## Errors
    /// Returns `Forbidden` on rejected input or escape and `NotADirectory` if an
    /// existing component is a file.
    pub async fn create_dir_all(&self, relative: &str) -> Result<ResolvedPath, PathError> {
        let parts = segments(relative)?;

        let mut existing = parts.len();
        let ancestor = loop {
            let candidate = self.root.join(parts[..existing].join("/"));
            match tokio::fs::canonicalize(&candidate).await {
                Ok(canonical) => break canonical,
                Err(e) if e.kind() == io::ErrorKind::NotFound && existing > 0 => existing -= 1,
                Err(e) => return Err(classify(e)),
            }
        };
        self.confine(&ancestor)?;
        if !tokio::fs::metadata(&ancestor).await?.is_dir() {
            return Err(PathError::NotADirectory);
        }

        let target = parts[existing..]
            .iter()
            .fold(ancestor, |path, part| path.join(part));
        tokio::fs::create_dir_all(&target).await.map_err(classify)?;

        let absolute = tokio::fs::canonicalize(&target).await.map_err(classify)?;
        self.confine(&absolute)?;

        Ok(ResolvedPath {
            relative: parts.join("/"),
            absolute,
        })
    }

    fn confine(&self, canonical: &Path) -> Result<(), PathError> {
        if canonical.starts_with(&self.root) {
            Ok(())
        } else {
            tracing::warn!(path = %canonical.display(), "Path escapes the vault root");
            Err(PathError::Forbidden)
        }
    }
}

fn segments(relative: &str) -> Result<Vec<&str>, PathError> {
    if relative.starts_with('/') || relative.contains(['\\', '\0']) {
        return Err(PathError::Forbidden);
    }

    let mut parts = Vec::new();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(PathError::Forbidden),
            s if cfg!(windows) && has_drive_prefix(s) => return Err(PathError::Forbidden),
            s => parts.push(s),
        }
    }
    Ok(parts)
}

fn has_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn classify(err: io::Error) -> PathError {
    match err.kind() {
        io::ErrorKind::NotFound => PathError::NotFound,
        io::ErrorKind::NotADirectory => PathError::NotADirectory,
        io::ErrorKind::PermissionDenied => PathError::Forbidden,
        _ => PathError::Io(err),
    }
}
