use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use common::{AudioFile, ContainerKind};
use metadata::{MetadataError, TagField, TagRead, TagStore, TagUpdate, WriteReport};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fields {
    pub album_artist: Option<String>,
    pub release_type: Option<String>,
}

/// In-memory tag store with injectable read and write failures.
#[derive(Default)]
pub struct MemoryStore {
    fields: RefCell<HashMap<PathBuf, Fields>>,
    broken_reads: HashSet<PathBuf>,
    broken_writes: HashSet<PathBuf>,
    no_free_text: HashSet<PathBuf>,
    reads: RefCell<usize>,
    writes: RefCell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_album_artist(self, path: &Path, value: &str) -> Self {
        self.fields
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_default()
            .album_artist = Some(value.to_string());
        self
    }

    pub fn with_release_type(self, path: &Path, value: &str) -> Self {
        self.fields
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_default()
            .release_type = Some(value.to_string());
        self
    }

    pub fn with_broken_read(mut self, path: &Path) -> Self {
        self.broken_reads.insert(path.to_path_buf());
        self
    }

    pub fn with_broken_write(mut self, path: &Path) -> Self {
        self.broken_writes.insert(path.to_path_buf());
        self
    }

    /// The file's tag type has no free-text key, so release types are skipped.
    pub fn without_free_text(mut self, path: &Path) -> Self {
        self.no_free_text.insert(path.to_path_buf());
        self
    }

    pub fn fields(&self, path: &Path) -> Fields {
        self.fields.borrow().get(path).cloned().unwrap_or_default()
    }

    pub fn reads(&self) -> usize {
        *self.reads.borrow()
    }

    pub fn writes(&self) -> usize {
        *self.writes.borrow()
    }
}

impl TagStore for MemoryStore {
    fn read(&self, file: &AudioFile, field: TagField) -> TagRead {
        *self.reads.borrow_mut() += 1;
        if file.kind() == ContainerKind::Wma {
            return TagRead::Failed(MetadataError::Unsupported(ContainerKind::Wma));
        }
        if self.broken_reads.contains(file.path()) {
            return TagRead::Failed(MetadataError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "corrupt tag",
            )));
        }
        let fields = self.fields(file.path());
        let raw = match field {
            TagField::AlbumArtist => fields.album_artist,
            TagField::ReleaseType => fields.release_type,
        };
        match raw {
            Some(value) if !value.trim().is_empty() => TagRead::Value(value.trim().to_string()),
            _ => TagRead::Missing,
        }
    }

    fn write(&self, file: &AudioFile, update: &TagUpdate<'_>) -> Result<WriteReport, MetadataError> {
        if file.kind() == ContainerKind::Wma {
            return Err(MetadataError::Unsupported(ContainerKind::Wma));
        }
        if self.broken_writes.contains(file.path()) {
            return Err(MetadataError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only",
            )));
        }
        let mut report = WriteReport::default();
        let mut fields = self.fields.borrow_mut();
        let entry = fields.entry(file.path().to_path_buf()).or_default();
        if let Some(value) = update.album_artist {
            entry.album_artist = Some(value.to_string());
            report.album_artist = true;
        }
        if let Some(value) = update.release_type {
            if self.no_free_text.contains(file.path()) {
                report.release_type_skipped = true;
            } else {
                entry.release_type = Some(value.to_string());
                report.release_type = true;
            }
        }
        if report.wrote_any() {
            *self.writes.borrow_mut() += 1;
        }
        Ok(report)
    }
}

pub fn audio(path: &str) -> AudioFile {
    AudioFile::from_path(Path::new(path)).unwrap()
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` with a debug-level subscriber and returns its result together
/// with everything that was logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_writer(buffer.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).to_string();
    (out, logs)
}
