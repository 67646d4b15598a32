use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use common::AudioFile;
use metadata::is_temp_artifact;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Clone, Debug)]
pub struct AudioDirectory {
    pub path: PathBuf,
    pub files: Vec<AudioFile>,
}

/// Every directory under `root` (root included) that directly contains at
/// least one classifiable audio file. Subdirectories stay separate entries.
pub fn collect_directories(root: &Path, follow_links: bool) -> Vec<AudioDirectory> {
    let mut dirs: BTreeMap<PathBuf, Vec<AudioFile>> = BTreeMap::new();

    for entry in WalkDir::new(root)
        .follow_links(follow_links)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_file() || is_temp_artifact(entry.path()) {
            continue;
        }
        let file = match AudioFile::from_path(entry.path()) {
            Some(file) => file,
            None => continue,
        };
        if let Some(parent) = entry.path().parent() {
            dirs.entry(parent.to_path_buf()).or_default().push(file);
        }
    }

    dirs.into_iter()
        .map(|(path, mut files)| {
            files.sort_by(|a, b| a.path().cmp(b.path()));
            AudioDirectory { path, files }
        })
        .collect()
}
