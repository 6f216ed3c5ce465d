//! Directory listing for the picker UI.
//!
//! Walks a root directory for JPEG files and describes each one: relative
//! name, size, modification time and pixel dimensions.
//!
//! ```text
//! photos/                      Directory { name: "photos", files: [...] }
//! ├── 001.jpg                  ImageEntry { name: "001.jpg", image: Some(1200×800) }
//! ├── broken.JPG               ImageEntry { name: "broken.JPG", image: None }
//! ├── notes.txt                (ignored)
//! └── trips/
//!     └── beach.jpeg           ImageEntry { name: "trips/beach.jpeg", ... }
//! ```
//!
//! Dimensions come from [`crate::jpeg`], which reads only the frame header.
//! A file whose dimensions cannot be read is still listed, with
//! `image: None`; the failure is logged and never fails the listing.
//!
//! Header reads run on a dedicated rayon pool of `jobs` threads, the same worker
//! budget the batch executor uses.

use crate::jpeg::{self, Dimensions};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

/// Extensions listed, compared case-insensitively.
const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

#[derive(Error, Debug)]
pub enum ListError {
    #[error("failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
    #[error("path {0} is outside the listing root")]
    OutsideRoot(PathBuf),
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// A JPEG found under the listing root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageEntry {
    /// Path relative to the root, `/`-separated.
    pub name: String,
    pub size_bytes: u64,
    /// Modification time in seconds since the Unix epoch, when the platform reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<u64>,
    /// Pixel dimensions, `None` when the frame header could not be read.
    pub image: Option<Dimensions>,
}

/// Listing of one root directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    /// Base name of the root.
    pub name: String,
    /// Files sorted by name.
    pub files: Vec<ImageEntry>,
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| JPEG_EXTENSIONS.iter().any(|j| e.eq_ignore_ascii_case(j)))
}

/// Relative `/`-separated name of `path` under `root`.
fn relative_name(root: &Path, path: &Path) -> Result<String, ListError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| ListError::OutsideRoot(path.to_path_buf()))?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Read dimensions for display. Failures are logged, not returned.
pub fn display_dimensions(path: &Path, name: &str) -> Option<Dimensions> {
    match jpeg::dimensions_of(path) {
        Ok(dims) => Some(dims),
        Err(e) => {
            warn!(filename = name, error = %e, "cannot read image dimensions");
            None
        }
    }
}

/// List every JPEG under `root`, recursively, probing dimensions with at most
/// `jobs` threads.
pub fn list_images(root: &Path, jobs: usize) -> Result<Directory, ListError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|source| ListError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() || !is_jpeg(entry.path()) {
            continue;
        }
        let metadata = entry.metadata().map_err(|source| ListError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        let modified_at = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs());
        found.push((
            entry.path().to_path_buf(),
            ImageEntry {
                name: relative_name(root, entry.path())?,
                size_bytes: metadata.len(),
                modified_at,
                image: None,
            },
        ));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(|i| format!("pickemall-list-{i}"))
        .build()?;
    pool.install(|| {
        found
            .par_iter_mut()
            .for_each(|(path, entry)| entry.image = display_dimensions(path, &entry.name));
    });

    let mut files: Vec<ImageEntry> = found.into_iter().map(|(_, entry)| entry).collect();
    files.sort_by(|a, b| a.name.cmp(&b.name));

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    Ok(Directory { name, files })
}
