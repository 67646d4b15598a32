use std::borrow::Cow;
use std::fs::{self, File};
use std::io::BufReader;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use common::{AudioFile, ContainerKind};
use lofty::aac::AacFile;
use lofty::config::{ParseOptions, ParsingMode, WriteOptions};
use lofty::error::LoftyError;
use lofty::file::{AudioFile as _, FileType, TaggedFile};
use lofty::id3::v2::{Frame, FrameId, Id3v2Tag, TextInformationFrame};
use lofty::iff::wav::WavFile;
use lofty::mpeg::MpegFile;
use lofty::prelude::{ItemKey, TagExt, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{ItemValue, Tag, TagItem, TagType};
use lofty::TextEncoding;
use tempfile::NamedTempFile;

const RELEASE_TYPE: &str = "RELEASETYPE";
const TEMP_PREFIX: &str = ".albumartist-";
const ALBUM_ARTIST_FRAME: FrameId<'static> = FrameId::Valid(Cow::Borrowed("TPE2"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagField {
    AlbumArtist,
    ReleaseType,
}

impl TagField {
    pub fn as_str(self) -> &'static str {
        match self {
            TagField::AlbumArtist => "album artist",
            TagField::ReleaseType => "release type",
        }
    }
}

/// Outcome of reading one field. `Missing` and `Failed` look the same to
/// callers that only want the value, but `Failed` keeps the cause around.
#[derive(Debug)]
pub enum TagRead {
    Value(String),
    Missing,
    Failed(MetadataError),
}

impl TagRead {
    fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if !value.is_empty() => TagRead::Value(value.to_string()),
            _ => TagRead::Missing,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            TagRead::Value(value) => Some(value),
            TagRead::Missing | TagRead::Failed(_) => None,
        }
    }

    pub fn into_value(self) -> Option<String> {
        match self {
            TagRead::Value(value) => Some(value),
            TagRead::Missing | TagRead::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TagRead::Failed(_))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TagUpdate<'a> {
    pub album_artist: Option<&'a str>,
    pub release_type: Option<&'a str>,
}

impl<'a> TagUpdate<'a> {
    pub fn album_artist(value: &'a str) -> Self {
        Self {
            album_artist: Some(value),
            release_type: None,
        }
    }

    pub fn release_type(value: &'a str) -> Self {
        Self {
            album_artist: None,
            release_type: Some(value),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.album_artist.is_none() && self.release_type.is_none()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub album_artist: bool,
    pub release_type: bool,
    /// The container has no free-text key to carry a release type.
    pub release_type_skipped: bool,
}

impl WriteReport {
    pub fn wrote_any(&self) -> bool {
        self.album_artist || self.release_type
    }
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
    Unsupported(ContainerKind),
    UnsupportedField(ContainerKind, TagField),
    NoTag(ContainerKind),
    ReadOnly(PathBuf),
    /// The codec panicked while saving; the original file was not replaced.
    SaveAborted(PathBuf),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
            MetadataError::Unsupported(kind) => write!(f, "unsupported container: {}", kind),
            MetadataError::UnsupportedField(kind, field) => {
                write!(f, "{} container cannot hold {}", kind, field.as_str())
            }
            MetadataError::NoTag(kind) => write!(f, "no writable tag for {} container", kind),
            MetadataError::ReadOnly(path) => write!(f, "file is read-only: {}", path.display()),
            MetadataError::SaveAborted(path) => {
                write!(f, "tag codec aborted while saving {}", path.display())
            }
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

/// The read/write surface the scanner needs from a tag codec.
pub trait TagStore {
    fn read(&self, file: &AudioFile, field: TagField) -> TagRead;

    fn write(&self, file: &AudioFile, update: &TagUpdate<'_>) -> Result<WriteReport, MetadataError>;

    fn read_album_artist(&self, file: &AudioFile) -> TagRead {
        self.read(file, TagField::AlbumArtist)
    }

    fn read_release_type(&self, file: &AudioFile) -> TagRead {
        self.read(file, TagField::ReleaseType)
    }

    fn write_album_artist(&self, file: &AudioFile, value: &str) -> Result<WriteReport, MetadataError> {
        self.write(file, &TagUpdate::album_artist(value))
    }

    fn write_release_type(&self, file: &AudioFile, value: &str) -> Result<WriteReport, MetadataError> {
        self.write(file, &TagUpdate::release_type(value))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LoftyStore;

impl TagStore for LoftyStore {
    fn read(&self, file: &AudioFile, field: TagField) -> TagRead {
        read_field(file, field)
    }

    fn write(&self, file: &AudioFile, update: &TagUpdate<'_>) -> Result<WriteReport, MetadataError> {
        write_tags(file, update)
    }
}

pub fn read_album_artist(file: &AudioFile) -> TagRead {
    read_field(file, TagField::AlbumArtist)
}

pub fn read_release_type(file: &AudioFile) -> TagRead {
    read_field(file, TagField::ReleaseType)
}

pub fn write_album_artist(file: &AudioFile, value: &str) -> Result<WriteReport, MetadataError> {
    write_tags(file, &TagUpdate::album_artist(value))
}

pub fn write_release_type(file: &AudioFile, value: &str) -> Result<WriteReport, MetadataError> {
    write_tags(file, &TagUpdate::release_type(value))
}

/// Temporary copies left behind by an interrupted write.
pub fn is_temp_artifact(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with(TEMP_PREFIX))
        .unwrap_or(false)
}

fn read_field(file: &AudioFile, field: TagField) -> TagRead {
    if !codec_supported(file.kind()) {
        return TagRead::Failed(MetadataError::Unsupported(file.kind()));
    }
    let raw = match id3v2_host(file.path()) {
        Some(file_type) => read_id3v2_field(file.path(), file_type, field),
        None => read_generic_field(file, field),
    };
    match raw {
        Ok(raw) => TagRead::from_raw(raw.as_deref()),
        Err(err) => TagRead::Failed(err),
    }
}

fn read_id3v2_field(
    path: &Path,
    file_type: FileType,
    field: TagField,
) -> Result<Option<String>, MetadataError> {
    let tag = match read_id3v2(path, file_type)? {
        Some(tag) => tag,
        None => return Ok(None),
    };
    let value = match field {
        TagField::AlbumArtist => tag.get_text(&ALBUM_ARTIST_FRAME),
        TagField::ReleaseType => tag.get_user_text(RELEASE_TYPE),
    };
    Ok(value.map(str::to_string))
}

fn read_generic_field(file: &AudioFile, field: TagField) -> Result<Option<String>, MetadataError> {
    let tagged_file = open_tagged(file.path())?;
    let tag_type = native_tag_type(file.kind(), &tagged_file);
    let tag = match tagged_file
        .tag(tag_type)
        .or_else(|| tagged_file.primary_tag())
        .or_else(|| tagged_file.first_tag())
    {
        Some(tag) => tag,
        None => return Ok(None),
    };

    let value = match field {
        TagField::AlbumArtist => tag.get_string(&ItemKey::AlbumArtist),
        TagField::ReleaseType => get_release_type(tag),
    };
    Ok(value.map(str::to_string))
}

pub fn write_tags(file: &AudioFile, update: &TagUpdate<'_>) -> Result<WriteReport, MetadataError> {
    let kind = file.kind();
    if !codec_supported(kind) {
        return Err(MetadataError::Unsupported(kind));
    }
    if update.is_empty() {
        return Ok(WriteReport::default());
    }
    if fs::metadata(file.path())?.permissions().readonly() {
        return Err(MetadataError::ReadOnly(file.path().to_path_buf()));
    }

    match id3v2_host(file.path()) {
        Some(file_type) => write_id3v2(file.path(), file_type, update),
        None => write_generic(file, update),
    }
}

/// Edits the file's own ID3v2 tag frame by frame, so frames the generic
/// `Tag` view cannot represent are saved back unchanged.
fn write_id3v2(
    path: &Path,
    file_type: FileType,
    update: &TagUpdate<'_>,
) -> Result<WriteReport, MetadataError> {
    let mut tag = read_id3v2(path, file_type)?.unwrap_or_default();

    let mut report = WriteReport::default();
    if let Some(value) = update.album_artist {
        tag.insert(Frame::Text(TextInformationFrame::new(
            ALBUM_ARTIST_FRAME,
            TextEncoding::UTF8,
            value.to_string(),
        )));
        report.album_artist = true;
    }
    if let Some(value) = update.release_type {
        tag.insert_user_text(RELEASE_TYPE.to_string(), value.to_string());
        report.release_type = true;
    }

    save_atomically(path, &tag)?;
    Ok(report)
}

fn write_generic(file: &AudioFile, update: &TagUpdate<'_>) -> Result<WriteReport, MetadataError> {
    let kind = file.kind();
    let mut tagged_file = open_tagged(file.path())?;
    let tag_type = native_tag_type(kind, &tagged_file);
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or(MetadataError::NoTag(kind))?;

    let mut report = WriteReport::default();
    if let Some(value) = update.album_artist {
        if !tag.insert_text(ItemKey::AlbumArtist, value.to_string()) {
            return Err(MetadataError::UnsupportedField(kind, TagField::AlbumArtist));
        }
        report.album_artist = true;
    }
    if let Some(value) = update.release_type {
        // Free-text keys have no ItemKey mapping, so `insert` would reject them.
        match release_type_key(tag_type) {
            Some(key) => {
                tag.insert_unchecked(TagItem::new(key, ItemValue::Text(value.to_string())));
                report.release_type = true;
            }
            None => report.release_type_skipped = true,
        }
    }

    if report.wrote_any() {
        save_atomically(file.path(), &*tag)?;
    }
    Ok(report)
}

fn codec_supported(kind: ContainerKind) -> bool {
    !matches!(kind, ContainerKind::Wma)
}

fn parse_options() -> ParseOptions {
    ParseOptions::new()
        .read_properties(false)
        .parsing_mode(ParsingMode::BestAttempt)
}

fn open_tagged(path: &Path) -> Result<TaggedFile, MetadataError> {
    let tagged_file = Probe::open(path)?.options(parse_options()).read()?;
    Ok(tagged_file)
}

/// File types whose native tag is ID3v2.
fn id3v2_host(path: &Path) -> Option<FileType> {
    match FileType::from_path(path)? {
        file_type @ (FileType::Mpeg | FileType::Wav | FileType::Aac) => Some(file_type),
        _ => None,
    }
}

fn read_id3v2(path: &Path, file_type: FileType) -> Result<Option<Id3v2Tag>, MetadataError> {
    let mut reader = BufReader::new(File::open(path)?);
    let tag = match file_type {
        FileType::Mpeg => MpegFile::read_from(&mut reader, parse_options())?.remove_id3v2(),
        FileType::Wav => WavFile::read_from(&mut reader, parse_options())?.remove_id3v2(),
        FileType::Aac => AacFile::read_from(&mut reader, parse_options())?.remove_id3v2(),
        _ => None,
    };
    Ok(tag)
}

fn native_tag_type(kind: ContainerKind, tagged_file: &TaggedFile) -> TagType {
    match kind {
        ContainerKind::Id3Mp3 => TagType::Id3v2,
        ContainerKind::VorbisFlac | ContainerKind::VorbisOgg => TagType::VorbisComments,
        ContainerKind::Mp4 => TagType::Mp4Ilst,
        ContainerKind::Wma | ContainerKind::Generic => tagged_file.primary_tag_type(),
    }
}

fn release_type_key(tag_type: TagType) -> Option<ItemKey> {
    match tag_type {
        TagType::Mp4Ilst => Some(ItemKey::Unknown(format!(
            "----:com.apple.iTunes:{}",
            RELEASE_TYPE
        ))),
        TagType::VorbisComments | TagType::Ape => Some(ItemKey::Unknown(RELEASE_TYPE.to_string())),
        _ => None,
    }
}

fn get_release_type(tag: &Tag) -> Option<&str> {
    let key = release_type_key(tag.tag_type())?;
    if let Some(value) = tag.get_string(&key) {
        return Some(value);
    }
    // Vorbis comment keys are case-insensitive; other taggers write them lowercase.
    match tag.tag_type() {
        TagType::VorbisComments | TagType::Ape => {
            tag.get_string(&ItemKey::Unknown(RELEASE_TYPE.to_ascii_lowercase()))
        }
        _ => None,
    }
}

/// Saves `tag` into a sibling copy of `path`, then renames the copy over the
/// original. A failure at any step leaves the original untouched.
fn save_atomically<T>(path: &Path, tag: &T) -> Result<(), MetadataError>
where
    T: TagExt<Err = LoftyError>,
{
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let suffix = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let temp: NamedTempFile = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(&suffix)
        .tempfile_in(dir)?;
    fs::copy(path, temp.path())?;

    // Some malformed but playable files make the codec panic; the temp copy
    // is dropped and the original stays as it was.
    let saved = panic::catch_unwind(AssertUnwindSafe(|| {
        tag.save_to_path(temp.path(), WriteOptions::default())
    }));
    match saved {
        Ok(result) => result?,
        Err(_) => return Err(MetadataError::SaveAborted(path.to_path_buf())),
    }

    temp.persist(path).map_err(|err| MetadataError::Io(err.error))?;
    Ok(())
}
