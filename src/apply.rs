//! Batch application of crop and pick operations.
//!
//! Given a source directory, an output directory and a list of
//! [`Operation`]s, the [`Executor`] applies every operation and reports what
//! happened to each one.
//!
//! ## Output Naming
//!
//! ```text
//! output/
//! ├── photo.jpg                        # pick: byte-for-byte copy, same name
//! ├── photo.jpg-3f2a9c0d1e4b5a69.jpg   # crop: <name>-<crop id>.jpg
//! └── trips/beach.jpg                  # pick keeps the relative path
//! ```
//!
//! Crop outputs are named after the rectangle (see [`crate::crop`]), so two
//! operations only ever target the same path when they describe the same crop
//! or the same pick. Every output is written to a hidden temporary file in its
//! target directory and renamed into place, so when two writers race the last
//! rename wins and the file is always one complete image.
//!
//! ## Parallelism
//!
//! Operations run on a dedicated [rayon](https://docs.rs/rayon) pool with
//! [`Executor::jobs`] threads, capping open files and in-flight image buffers
//! on large batches. Each operation runs to completion on its worker.
//!
//! ## Failure Isolation
//!
//! One failing operation never stops its siblings. Every operation gets an
//! [`OperationOutcome`] in input order; if any failed or was cancelled the
//! batch returns [`BatchError::Incomplete`] carrying the full report. Only a
//! failure to prepare the output directory aborts before any work starts.
//!
//! ## Cancellation
//!
//! Setting the [`CancelToken`] stops new operations from starting; they are
//! reported as [`OperationStatus::Cancelled`]. Operations already running,
//! including codec calls, are left to finish.

use crate::codec::{CodecError, Cropper};
use crate::crop::{InvalidCrop, crop_output_name};
use crate::operation::{CropOperation, Operation, OperationKind, PickOperation};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum OperationError {
    #[error("unsafe filename {0:?}: must be a relative path inside the source directory")]
    UnsafePath(String),
    #[error(transparent)]
    InvalidCropDimensions(#[from] InvalidCrop),
    #[error("source file not found: {0}")]
    SourceMissing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to copy {from} to {to}: {source}")]
    CopyFailure {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("failed to create output directory {path}: {source}")]
    OutputDirectory { path: PathBuf, source: io::Error },
    #[error("output directory {0} is the source directory")]
    OutputIsSource(PathBuf),
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("{failed} of {total} operations failed, {cancelled} cancelled")]
    Incomplete {
        failed: usize,
        cancelled: usize,
        total: usize,
        report: BatchReport,
    },
}

/// Shared flag that stops a running batch from starting new operations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final state of one operation.
#[derive(Debug)]
pub enum OperationStatus {
    /// Written to `output`.
    Succeeded { output: PathBuf },
    Failed { error: OperationError },
    /// Never started because the batch was cancelled.
    Cancelled,
}

/// What happened to the operation at `index` in the batch.
#[derive(Debug)]
pub struct OperationOutcome {
    pub index: usize,
    pub kind: OperationKind,
    pub filename: String,
    pub status: OperationStatus,
}

/// Per-operation results of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<OperationOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, OperationStatus::Succeeded { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OperationStatus::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|s| matches!(s, OperationStatus::Cancelled))
    }

    pub fn is_success(&self) -> bool {
        self.succeeded() == self.outcomes.len()
    }

    /// Output paths of successful operations.
    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            OperationStatus::Succeeded { output } => Some(output.as_path()),
            _ => None,
        })
    }

    fn count(&self, pred: impl Fn(&OperationStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Applies batches of operations from `source_dir` into `output_dir`.
#[derive(Debug, Clone)]
pub struct Executor {
    source_dir: PathBuf,
    output_dir: PathBuf,
    jobs: usize,
    cancel: CancelToken,
}

impl Executor {
    /// Create an executor running at most `jobs` operations at once.
    ///
    /// Callers normally pass [`crate::config::effective_threads`]; tests pass
    /// `1` for deterministic ordering.
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, jobs: usize) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            jobs: jobs.max(1),
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Apply every operation in `ops`.
    ///
    /// An empty batch is a no-op and does not create the output directory.
    pub fn apply(
        &self,
        cropper: &impl Cropper,
        ops: &[Operation],
    ) -> Result<BatchReport, BatchError> {
        if ops.is_empty() {
            warn!("no operations to execute");
            return Ok(BatchReport::default());
        }

        self.prepare_output_dir()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("pickemall-worker-{i}"))
            .build()?;

        info!(
            operations = ops.len(),
            jobs = self.jobs,
            output = %self.output_dir.display(),
            "applying operations"
        );

        let outcomes: Vec<OperationOutcome> = pool.install(|| {
            ops.par_iter()
                .enumerate()
                .map(|(index, op)| self.run_tracked(cropper, index, op))
                .collect()
        });
        let report = BatchReport { outcomes };

        let (failed, cancelled) = (report.failed(), report.cancelled());
        if failed > 0 || cancelled > 0 {
            error!(failed, cancelled, total = ops.len(), "finished with errors");
            return Err(BatchError::Incomplete {
                failed,
                cancelled,
                total: ops.len(),
                report,
            });
        }

        info!(succeeded = report.succeeded(), "all operations applied");
        Ok(report)
    }

    fn prepare_output_dir(&self) -> Result<(), BatchError> {
        fs::create_dir_all(&self.output_dir).map_err(|source| BatchError::OutputDirectory {
            path: self.output_dir.clone(),
            source,
        })?;

        // Picks would truncate their own source if both roots were the same
        let same_dir = match (
            self.output_dir.canonicalize(),
            self.source_dir.canonicalize(),
        ) {
            (Ok(out), Ok(src)) => out == src,
            _ => false,
        };
        if same_dir {
            return Err(BatchError::OutputIsSource(self.output_dir.clone()));
        }
        Ok(())
    }

    fn run_tracked(&self, cropper: &impl Cropper, index: usize, op: &Operation) -> OperationOutcome {
        let status = if self.cancel.is_cancelled() {
            debug!(filename = op.filename(), kind = %op.kind(), "cancelled before start");
            OperationStatus::Cancelled
        } else {
            match self.run(cropper, op) {
                Ok(output) => OperationStatus::Succeeded { output },
                Err(e) => {
                    error!(
                        filename = op.filename(),
                        kind = %op.kind(),
                        error = %e,
                        "failed to execute operation"
                    );
                    OperationStatus::Failed { error: e }
                }
            }
        };

        OperationOutcome {
            index,
            kind: op.kind(),
            filename: op.filename().to_string(),
            status,
        }
    }

    fn run(&self, cropper: &impl Cropper, op: &Operation) -> Result<PathBuf, OperationError> {
        match op {
            Operation::Crop(crop) => self.apply_crop(cropper, crop),
            Operation::Pick(pick) => self.apply_pick(pick),
        }
    }

    fn apply_crop(
        &self,
        cropper: &impl Cropper,
        op: &CropOperation,
    ) -> Result<PathBuf, OperationError> {
        info!(filename = %op.filename, crop = %op.crop, "cropping");
        op.crop.validate()?;

        let relative = safe_relative(&op.filename)?;
        let source_path = self.source_dir.join(relative);
        let bytes = fs::read(&source_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => OperationError::SourceMissing(source_path.clone()),
            _ => OperationError::Read {
                path: source_path.clone(),
                source: e,
            },
        })?;

        let cropped = cropper.crop(&bytes, &op.crop)?;

        let base = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .ok_or_else(|| OperationError::UnsafePath(op.filename.clone()))?;
        let output = self.output_dir.join(crop_output_name(&base, &op.crop));
        write_replacing(&self.output_dir, &output, &cropped).map_err(|source| {
            OperationError::Write {
                path: output.clone(),
                source,
            }
        })?;
        Ok(output)
    }

    fn apply_pick(&self, op: &PickOperation) -> Result<PathBuf, OperationError> {
        info!(filename = %op.filename, "picking");
        let relative = safe_relative(&op.filename)?;
        let source_path = self.source_dir.join(relative);
        let output = self.output_dir.join(relative);
        copy_contents(&source_path, &output)?;
        Ok(output)
    }
}

/// Validate that `filename` is a plain relative path with no `..`, root or
/// prefix components.
fn safe_relative(filename: &str) -> Result<&Path, OperationError> {
    let path = Path::new(filename);
    let mut normal = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => normal += 1,
            Component::CurDir => {}
            _ => return Err(OperationError::UnsafePath(filename.to_string())),
        }
    }
    if normal == 0 {
        return Err(OperationError::UnsafePath(filename.to_string()));
    }
    Ok(path)
}

/// Copy file contents only. Permissions and timestamps are not carried over,
/// unlike `fs::copy`. The copy is staged next to `to` and renamed into place.
fn copy_contents(from: &Path, to: &Path) -> Result<(), OperationError> {
    let copy_failure = |source: io::Error| OperationError::CopyFailure {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let mut reader = File::open(from).map_err(|e| match e.kind() {
        ErrorKind::NotFound => OperationError::SourceMissing(from.to_path_buf()),
        _ => copy_failure(e),
    })?;
    let parent = to.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(copy_failure)?;
    let mut staged = staging_file(parent).map_err(copy_failure)?;
    io::copy(&mut reader, &mut staged).map_err(copy_failure)?;
    staged.persist(to).map_err(|e| copy_failure(e.error))?;
    Ok(())
}

/// Write `bytes` to a temporary file in `dir` and rename it over `target`.
///
/// Two operations may target the same path; the rename keeps the result a
/// complete copy of one writer's bytes.
fn write_replacing(dir: &Path, target: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut staged = staging_file(dir)?;
    staged.write_all(bytes)?;
    staged.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Hidden temporary file in `dir`, removed on drop unless persisted.
fn staging_file(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".pickemall-");
    // Outputs are regular files, not owner-only temporaries
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o644));
    }
    builder.tempfile_in(dir)
}
