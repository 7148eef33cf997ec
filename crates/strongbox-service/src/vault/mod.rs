//! File Vault Manager.
//!
//! ## Module Organization
//!
//! - `path`: `VaultRoot`, the confinement boundary every operation resolves through
//! - `staging`: hidden staging files for atomic uploads
//! - `manager`: `FileVault` (crawl, upload, delete, mkdir)

pub mod manager;
pub mod path;
pub mod staging;

pub use manager::{DirectoryListing, FileContent, FileVault, StoredFile, VaultView};
pub use path::{ResolvedPath, VaultRoot};
