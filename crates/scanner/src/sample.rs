use common::{AudioFile, DirectoryStatus, RecordStatus};
use metadata::{TagRead, TagStore};
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleOutcome {
    pub status: DirectoryStatus,
    pub read_failures: usize,
}

/// Decides a directory's Album Artist from the first file that can be read.
/// A file without the tag still counts as read; only failures move on to the
/// next file. If nothing is readable the directory is reported as not set
/// and a warning names the directory.
pub fn sample_directory<S: TagStore + ?Sized>(store: &S, files: &[AudioFile]) -> SampleOutcome {
    let mut read_failures = 0;
    for file in files {
        match store.read_album_artist(file) {
            TagRead::Value(value) => {
                return SampleOutcome {
                    status: DirectoryStatus::SetTo(value),
                    read_failures,
                }
            }
            TagRead::Missing => {
                return SampleOutcome {
                    status: DirectoryStatus::NotSet,
                    read_failures,
                }
            }
            TagRead::Failed(err) => {
                debug!("Error reading {}: {}", file.path().display(), err);
                read_failures += 1;
            }
        }
    }

    if let Some(dir) = files.first().and_then(|file| file.path().parent()) {
        warn!(
            "No readable file in {} ({} failed)",
            dir.display(),
            read_failures
        );
    }

    SampleOutcome {
        status: DirectoryStatus::NotSet,
        read_failures,
    }
}

/// `None` when the directory already carries the target value exactly.
pub fn classify_status(status: &DirectoryStatus, target: &str) -> Option<RecordStatus> {
    match status {
        DirectoryStatus::SetTo(value) if value == target => None,
        DirectoryStatus::SetTo(value) => Some(RecordStatus::SetTo(value.clone())),
        DirectoryStatus::NotSet => Some(RecordStatus::NotSet),
    }
}
