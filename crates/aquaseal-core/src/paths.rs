//! Output directory resolution.
//!
//! Downloads and thumbnails are written to the first viable directory in a
//! fixed order of preference:
//!
//! 1. the public directory for the purpose (e.g. the user's Downloads folder),
//! 2. an application-scoped external directory for the same purpose,
//! 3. the application-private base directory.
//!
//! Only the last step can fail the caller: if no private directory can be
//! supplied, resolution reports [`Error::StorageUnavailable`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// What a resolved directory will hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoragePurpose {
    /// Downloaded videos.
    Downloads,
    /// Downloaded thumbnails.
    Pictures,
}

impl StoragePurpose {
    /// Sub-directory name used under the application-scoped external root.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Downloads => "Download",
            Self::Pictures => "Pictures",
        }
    }
}

impl std::fmt::Display for StoragePurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Downloads => write!(f, "downloads"),
            Self::Pictures => write!(f, "pictures"),
        }
    }
}

/// How strictly the public directory is checked before it is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Accept the public directory if it exists.
    ExistenceOnly,
    /// Accept the public directory only if a file can be created in it.
    #[default]
    Writable,
}

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// The standard public directory for the purpose.
    Public,
    /// Application-scoped external directory for the purpose.
    AppExternal,
    /// Application-private base directory.
    AppPrivate,
}

/// Resolution order, most preferred first.
pub const RESOLUTION_ORDER: [CandidateKind; 3] = [
    CandidateKind::Public,
    CandidateKind::AppExternal,
    CandidateKind::AppPrivate,
];

/// Root directories the resolver chooses from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageRoots {
    /// Public Downloads directory.
    pub public_downloads: Option<PathBuf>,
    /// Public Pictures directory.
    pub public_pictures: Option<PathBuf>,
    /// Root of the application-scoped external directories.
    pub app_external: Option<PathBuf>,
    /// Application-private base directory.
    pub app_private: Option<PathBuf>,
}

impl StorageRoots {
    /// Roots reported by the platform.
    pub fn from_platform() -> Self {
        Self {
            public_downloads: dirs::download_dir(),
            public_pictures: dirs::picture_dir(),
            app_external: default_app_external_directory(),
            app_private: default_app_private_directory(),
        }
    }

    fn public_dir(&self, purpose: StoragePurpose) -> Option<&Path> {
        match purpose {
            StoragePurpose::Downloads => self.public_downloads.as_deref(),
            StoragePurpose::Pictures => self.public_pictures.as_deref(),
        }
    }
}

/// Default root for application-scoped external directories.
pub fn default_app_external_directory() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("aquaseal").join("external"))
}

/// Default application-private base directory.
pub fn default_app_private_directory() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("aquaseal").join("files"))
}

/// Resolves writable output directories.
#[derive(Debug, Clone)]
pub struct PathResolver {
    roots: StorageRoots,
    write_policy: WritePolicy,
}

impl PathResolver {
    /// Create a resolver over the given roots.
    pub const fn new(roots: StorageRoots, write_policy: WritePolicy) -> Self {
        Self {
            roots,
            write_policy,
        }
    }

    /// Create a resolver over the platform's directories.
    pub fn from_platform() -> Self {
        Self::new(StorageRoots::from_platform(), WritePolicy::default())
    }

    /// The roots this resolver chooses from.
    pub const fn roots(&self) -> &StorageRoots {
        &self.roots
    }

    /// Resolve a directory for `purpose`.
    ///
    /// The returned path is absolute and existed when it was checked; it is
    /// not re-verified afterwards.
    pub fn resolve(&self, purpose: StoragePurpose) -> Result<PathBuf> {
        for kind in RESOLUTION_ORDER {
            if let Some(dir) = self.candidate(kind, purpose) {
                debug!("Resolved {} directory via {:?}: {}", purpose, kind, dir.display());
                return Ok(absolute(dir));
            }
            debug!("{:?} {} directory not viable", kind, purpose);
        }
        Err(Error::StorageUnavailable(format!(
            "no private directory available for {purpose}"
        )))
    }

    fn candidate(&self, kind: CandidateKind, purpose: StoragePurpose) -> Option<PathBuf> {
        match kind {
            CandidateKind::Public => {
                let dir = self.roots.public_dir(purpose)?;
                if !dir.is_dir() {
                    return None;
                }
                if self.write_policy == WritePolicy::Writable && !is_writable(dir) {
                    warn!("Public directory {} exists but is not writable", dir.display());
                    return None;
                }
                Some(dir.to_path_buf())
            }
            CandidateKind::AppExternal => {
                let dir = self.roots.app_external.as_ref()?.join(purpose.dir_name());
                ensure_dir(&dir)
            }
            CandidateKind::AppPrivate => ensure_dir(self.roots.app_private.as_ref()?),
        }
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::from_platform()
    }
}

fn ensure_dir(dir: &Path) -> Option<PathBuf> {
    match std::fs::create_dir_all(dir) {
        Ok(()) => Some(dir.to_path_buf()),
        Err(e) => {
            warn!("Failed to create directory {}: {}", dir.display(), e);
            None
        }
    }
}

fn is_writable(dir: &Path) -> bool {
    tempfile::tempfile_in(dir).is_ok()
}

fn absolute(dir: PathBuf) -> PathBuf {
    if dir.is_absolute() {
        dir
    } else {
        std::path::absolute(&dir).unwrap_or(dir)
    }
}
