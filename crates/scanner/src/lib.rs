mod mutate;
mod sample;
#[cfg(test)]
mod test_support;
mod walk;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use common::{DirectoryRecord, RecordStatus, RunMode};
use metadata::{LoftyStore, TagStore};
use tracing::info;

pub use mutate::{mutate_directory, DirectoryOutcome, FileFailure};
pub use sample::{classify_status, sample_directory, SampleOutcome};
pub use walk::{collect_directories, AudioDirectory};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub directories: usize,
    pub files: usize,
    pub records: usize,
    pub files_written: usize,
    pub write_failures: usize,
    pub read_failures: usize,
}

pub struct Scanner<S> {
    store: S,
    follow_links: bool,
}

impl Default for Scanner<LoftyStore> {
    fn default() -> Self {
        Self::new(LoftyStore)
    }
}

impl<S: TagStore> Scanner<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            follow_links: false,
        }
    }

    pub fn follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Visits every audio directory under `root` and hands each finished
    /// record to `emit`. Only a bad root aborts; per-file problems end up in
    /// the returned summary.
    pub fn run<F>(&self, root: &Path, mode: &RunMode, mut emit: F) -> Result<RunSummary, ScanError>
    where
        F: FnMut(DirectoryRecord),
    {
        check_root(root)?;
        info!("Scanning {} ({})", root.display(), mode_label(mode));

        let dirs = collect_directories(root, self.follow_links);
        info!("Found {} folders with audio", dirs.len());

        let mut summary = RunSummary::default();
        for dir in &dirs {
            summary.directories += 1;
            summary.files += dir.files.len();

            let status = match mode {
                RunMode::Scan { target } => {
                    let sample = sample_directory(&self.store, &dir.files);
                    summary.read_failures += sample.read_failures;
                    classify_status(&sample.status, target)
                }
                RunMode::Mutate(policy) => {
                    let outcome = mutate_directory(&self.store, &dir.files, policy);
                    summary.files_written += outcome.files_written;
                    summary.write_failures += outcome.failures.len();
                    Some(outcome.status).filter(RecordStatus::is_touched)
                }
            };

            if let Some(status) = status {
                summary.records += 1;
                emit(DirectoryRecord::new(root, &dir.path, status));
            }
        }

        info!(
            "Done: {} folders, {} files, {} reported, {} written, {} write failures, {} read failures",
            summary.directories,
            summary.files,
            summary.records,
            summary.files_written,
            summary.write_failures,
            summary.read_failures
        );
        Ok(summary)
    }

    pub fn collect(&self, root: &Path, mode: &RunMode) -> Result<Vec<DirectoryRecord>, ScanError> {
        let mut records = Vec::new();
        self.run(root, mode, |record| records.push(record))?;
        Ok(records)
    }
}

fn check_root(root: &Path) -> Result<(), ScanError> {
    let meta = match fs::metadata(root) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ScanError::RootMissing(root.to_path_buf()))
        }
        Err(err) => return Err(ScanError::Io(err)),
    };
    if !meta.is_dir() {
        return Err(ScanError::RootNotDirectory(root.to_path_buf()));
    }
    fs::read_dir(root)?;
    Ok(())
}

fn mode_label(mode: &RunMode) -> &'static str {
    match mode {
        RunMode::Scan { .. } => "scan",
        RunMode::Mutate(policy) => policy.mode().as_str(),
    }
}

#[derive(Debug)]
pub enum ScanError {
    RootMissing(PathBuf),
    RootNotDirectory(PathBuf),
    Io(io::Error),
}

impl std::fmt::Display for ScanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanError::RootMissing(path) => {
                write!(f, "Directory '{}' does not exist.", path.display())
            }
            ScanError::RootNotDirectory(path) => {
                write!(f, "'{}' is not a directory.", path.display())
            }
            ScanError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<io::Error> for ScanError {
    fn from(err: io::Error) -> Self {
        ScanError::Io(err)
    }
}
