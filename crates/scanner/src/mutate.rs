use std::path::PathBuf;

use common::{AudioFile, MutationMode, MutationPolicy, RecordStatus};
use metadata::{MetadataError, TagRead, TagStore, TagUpdate};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: MetadataError,
}

#[derive(Debug)]
pub struct DirectoryOutcome {
    pub status: RecordStatus,
    pub files_written: usize,
    pub failures: Vec<FileFailure>,
}

/// Applies `policy` to every file of one directory. Failed writes are kept in
/// the outcome and do not stop the remaining files.
pub fn mutate_directory<S: TagStore + ?Sized>(
    store: &S,
    files: &[AudioFile],
    policy: &MutationPolicy,
) -> DirectoryOutcome {
    let mut files_written = 0;
    let mut failures = Vec::new();

    for file in files {
        let update = match plan_update(store, file, policy) {
            Some(update) => update,
            None => continue,
        };
        match store.write(file, &update) {
            Ok(report) => {
                if report.release_type_skipped {
                    debug!(
                        "{} container has no release type field: {}",
                        file.kind(),
                        file.path().display()
                    );
                }
                if report.wrote_any() {
                    files_written += 1;
                }
            }
            Err(err) => {
                warn!("Failed to write {}: {}", file.path().display(), err);
                failures.push(FileFailure {
                    path: file.path().to_path_buf(),
                    error: err,
                });
            }
        }
    }

    let status = if files_written > 0 {
        policy.mode().touched_status()
    } else {
        RecordStatus::Unchanged
    };
    DirectoryOutcome {
        status,
        files_written,
        failures,
    }
}

fn plan_update<'p, S: TagStore + ?Sized>(
    store: &S,
    file: &AudioFile,
    policy: &'p MutationPolicy,
) -> Option<TagUpdate<'p>> {
    match policy.mode() {
        MutationMode::Update => {
            let current = store.read_album_artist(file);
            if let TagRead::Failed(err) = &current {
                debug!("Treating unreadable {} as unset: {}", file.path().display(), err);
            }
            match current.value().map(str::trim) {
                Some(value) if !value.is_empty() => None,
                _ => Some(TagUpdate::album_artist(policy.album_artist_value())),
            }
        }
        MutationMode::Force => Some(TagUpdate::album_artist(policy.album_artist_value())),
        MutationMode::ReleaseTypeOnly => policy.release_type_value().map(TagUpdate::release_type),
        MutationMode::ForceWithReleaseType => Some(TagUpdate {
            album_artist: Some(policy.album_artist_value()),
            release_type: policy.release_type_value(),
        }),
    }
}
