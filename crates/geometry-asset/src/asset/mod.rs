//! Asset files: a header shared by every asset type, followed by a payload
//! owned by the type.

use std::{
    fmt::{self, Display, Formatter},
    fs::File,
    io::{BufReader, Cursor, Read, Seek, Write},
    path::Path,
    time::Duration,
};

use binrw::{BinRead, BinWriterExt};
use uuid::Uuid;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::{
    error::{AssetError, FormatError},
    format::{write_blob, Blob},
    hash::{ContentHash, CONTENT_HASH_LENGTH},
};

pub mod geometry;

/// Extension of every asset file, without the dot.
pub const ASSET_FILE_EXTENSION: &str = "rasset";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BinRead)]
#[br(repr = i32)]
pub enum AssetType {
    Unknown = 0,
    Animation = 1,
    Audio = 2,
    Material = 3,
    Mesh = 4,
    Skeleton = 5,
    Texture = 6,
}

impl Display for AssetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetType::Unknown => "Unknown",
            AssetType::Animation => "Animation",
            AssetType::Audio => "Audio",
            AssetType::Material => "Material",
            AssetType::Mesh => "Mesh",
            AssetType::Skeleton => "Skeleton",
            AssetType::Texture => "Texture",
        };
        f.write_str(name)
    }
}

#[derive(Debug, BinRead)]
#[br(little)]
struct HeaderRecord {
    asset_type: AssetType,
    id: Blob,
    import_date: i64,
    hash: Blob,
    thumbnail: Blob,
}

/// Asset file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub asset_type: AssetType,
    /// Stable across re-imports to the same path.
    pub id: Uuid,
    pub import_date: SystemTime,
    pub hash: Option<ContentHash>,
    /// Encoded image shown by asset browsers, never empty.
    pub thumbnail: Vec<u8>,
}

fn time_from_micros(micros: i64) -> Option<SystemTime> {
    let offset = Duration::from_micros(micros.unsigned_abs());
    if micros >= 0 {
        UNIX_EPOCH.checked_add(offset)
    } else {
        UNIX_EPOCH.checked_sub(offset)
    }
}

fn micros_from_time(time: SystemTime) -> Result<i64, FormatError> {
    let too_large = |micros: u128| FormatError::TooLarge {
        field: "import date",
        value: usize::try_from(micros).unwrap_or(usize::MAX),
    };
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => {
            let micros = after.as_micros();
            i64::try_from(micros).map_err(|_| too_large(micros))
        }
        Err(before) => {
            let micros = before.duration().as_micros();
            i64::try_from(micros)
                .map(|micros| -micros)
                .map_err(|_| too_large(micros))
        }
    }
}

impl TryFrom<HeaderRecord> for AssetInfo {
    type Error = FormatError;

    fn try_from(record: HeaderRecord) -> Result<Self, Self::Error> {
        let id = Uuid::from_slice(&record.id.bytes)
            .map_err(|_| FormatError::BadIdentifier(record.id.bytes.len()))?;
        let import_date = time_from_micros(record.import_date)
            .ok_or(FormatError::BadTimestamp(record.import_date))?;
        let hash = match record.hash.bytes.len() {
            0 => None,
            CONTENT_HASH_LENGTH => ContentHash::try_from(record.hash.bytes.as_slice()).ok(),
            actual => {
                return Err(FormatError::BufferLength {
                    field: "hash",
                    expected: CONTENT_HASH_LENGTH,
                    actual,
                })
            }
        };

        Ok(Self {
            asset_type: record.asset_type,
            id,
            import_date,
            hash,
            thumbnail: record.thumbnail.bytes,
        })
    }
}

impl AssetInfo {
    /// Read the header and leave `reader` at the start of the payload.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, AssetError> {
        let record = HeaderRecord::read(reader)?;
        Ok(Self::try_from(record)?)
    }

    /// Read only the header of the asset file at `path`.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read(&mut reader)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FormatError> {
        let record = HeaderRecord::read(&mut Cursor::new(bytes))?;
        Self::try_from(record)
    }

    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<(), FormatError> {
        if self.thumbnail.is_empty() {
            return Err(FormatError::MissingThumbnail);
        }

        writer.write_le(&(self.asset_type as i32))?;
        write_blob(writer, "identifier", self.id.as_bytes())?;
        writer.write_le(&micros_from_time(self.import_date)?)?;
        match &self.hash {
            Some(hash) => write_blob(writer, "hash", &hash.0)?,
            None => writer.write_le(&0i32)?,
        }
        write_blob(writer, "thumbnail", &self.thumbnail)
    }
}
