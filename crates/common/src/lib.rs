use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_ALBUM_ARTIST: &str = "Various Artists";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Id3Mp3,
    VorbisFlac,
    VorbisOgg,
    Mp4,
    Wma,
    /// AAC and WAV: whatever primary tag the codec picks for the file.
    Generic,
}

impl ContainerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerKind::Id3Mp3 => "id3/mp3",
            ContainerKind::VorbisFlac => "vorbis/flac",
            ContainerKind::VorbisOgg => "vorbis/ogg",
            ContainerKind::Mp4 => "mp4",
            ContainerKind::Wma => "wma",
            ContainerKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a path to its tag container kind by extension. `None` means the file
/// is not an audio file as far as scanning is concerned.
pub fn classify(path: &Path) -> Option<ContainerKind> {
    let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
    match ext.as_str() {
        "mp3" => Some(ContainerKind::Id3Mp3),
        "flac" => Some(ContainerKind::VorbisFlac),
        "ogg" => Some(ContainerKind::VorbisOgg),
        "m4a" | "mp4" => Some(ContainerKind::Mp4),
        "wma" => Some(ContainerKind::Wma),
        "wav" | "aac" => Some(ContainerKind::Generic),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFile {
    path: PathBuf,
    kind: ContainerKind,
}

impl AudioFile {
    pub fn new(path: PathBuf, kind: ContainerKind) -> Self {
        Self { path, kind }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let kind = classify(path)?;
        Some(Self {
            path: path.to_path_buf(),
            kind,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationMode {
    Update,
    Force,
    ReleaseTypeOnly,
    ForceWithReleaseType,
}

impl MutationMode {
    pub fn writes_album_artist(self) -> bool {
        !matches!(self, MutationMode::ReleaseTypeOnly)
    }

    pub fn writes_release_type(self) -> bool {
        matches!(
            self,
            MutationMode::ReleaseTypeOnly | MutationMode::ForceWithReleaseType
        )
    }

    pub fn touched_status(self) -> RecordStatus {
        match self {
            MutationMode::Update => RecordStatus::Updated,
            MutationMode::Force | MutationMode::ForceWithReleaseType => RecordStatus::ForceUpdated,
            MutationMode::ReleaseTypeOnly => RecordStatus::ReleaseTypeUpdated,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MutationMode::Update => "update",
            MutationMode::Force => "force",
            MutationMode::ReleaseTypeOnly => "release_type_only",
            MutationMode::ForceWithReleaseType => "force_with_release_type",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationPolicy {
    mode: MutationMode,
    album_artist_value: String,
    release_type_value: Option<String>,
}

impl MutationPolicy {
    pub fn new(
        mode: MutationMode,
        album_artist_value: String,
        release_type_value: Option<String>,
    ) -> Result<Self, PolicyError> {
        if mode.writes_album_artist() && album_artist_value.trim().is_empty() {
            return Err(PolicyError::EmptyAlbumArtist(mode));
        }
        if mode.writes_release_type() && release_type_value.is_none() {
            return Err(PolicyError::MissingReleaseType(mode));
        }
        Ok(Self {
            mode,
            album_artist_value,
            release_type_value,
        })
    }

    pub fn mode(&self) -> MutationMode {
        self.mode
    }

    pub fn album_artist_value(&self) -> &str {
        &self.album_artist_value
    }

    pub fn release_type_value(&self) -> Option<&str> {
        self.release_type_value.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    MissingReleaseType(MutationMode),
    EmptyAlbumArtist(MutationMode),
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyError::MissingReleaseType(mode) => {
                write!(f, "mode {} needs a release type value", mode.as_str())
            }
            PolicyError::EmptyAlbumArtist(mode) => {
                write!(f, "mode {} needs a non-empty album artist value", mode.as_str())
            }
        }
    }
}

impl std::error::Error for PolicyError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunMode {
    Scan { target: String },
    Mutate(MutationPolicy),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectoryStatus {
    SetTo(String),
    NotSet,
}

impl DirectoryStatus {
    pub fn value(&self) -> Option<&str> {
        match self {
            DirectoryStatus::SetTo(value) => Some(value),
            DirectoryStatus::NotSet => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "value")]
pub enum RecordStatus {
    SetTo(String),
    NotSet,
    Updated,
    ForceUpdated,
    ReleaseTypeUpdated,
    Unchanged,
}

impl RecordStatus {
    pub fn is_touched(&self) -> bool {
        matches!(
            self,
            RecordStatus::Updated | RecordStatus::ForceUpdated | RecordStatus::ReleaseTypeUpdated
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectoryRecord {
    pub name: String,
    pub relpath: String,
    #[serde(flatten)]
    pub status: RecordStatus,
}

impl DirectoryRecord {
    pub fn new(root: &Path, dir: &Path, status: RecordStatus) -> Self {
        Self {
            name: dir_name(dir),
            relpath: relpath_from(root, dir).unwrap_or_default(),
            status,
        }
    }
}

impl fmt::Display for DirectoryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            RecordStatus::SetTo(value) => write!(f, "{} - {}", self.name, value),
            RecordStatus::NotSet => write!(f, "{} - (not set)", self.name),
            RecordStatus::Updated => write!(f, "Updated: {}", self.name),
            RecordStatus::ForceUpdated => write!(f, "Force Updated: {}", self.name),
            RecordStatus::ReleaseTypeUpdated => write!(f, "Release Type Updated: {}", self.name),
            RecordStatus::Unchanged => write!(f, "Unchanged: {}", self.name),
        }
    }
}

/// Last path component of a directory. Paths like `.` have none, so the
/// canonical form is tried before falling back to the path as given.
pub fn dir_name(dir: &Path) -> String {
    if let Some(name) = dir.file_name() {
        return name.to_string_lossy().to_string();
    }
    dir.canonicalize()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().to_string()))
        .unwrap_or_else(|| dir.display().to_string())
}

pub fn relpath_from(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(path_to_slash_string(rel))
}

fn path_to_slash_string(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    parts.join("/")
}
