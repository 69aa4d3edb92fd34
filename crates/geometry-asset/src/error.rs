use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
};

use crate::asset::AssetType;

/// A buffer that does not follow one of the geometry layouts.
#[derive(Debug)]
pub enum FormatError {
    Binary(binrw::Error),
    NoLodGroups,
    EmptyLodGroup { group: String },
    EmptyLod { lod: String },
    BufferLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    BadIndexSize(i32),
    UnexpectedAssetType(AssetType),
    BadIdentifier(usize),
    BadTimestamp(i64),
    PayloadLength { declared: usize, actual: usize },
    MissingThumbnail,
    TooLarge { field: &'static str, value: usize },
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::Binary(err) => Display::fmt(err, f),
            FormatError::NoLodGroups => write!(f, "Geometry has no LOD group"),
            FormatError::EmptyLodGroup { group } => {
                write!(f, "LOD group {:?} has no LOD level", group)
            }
            FormatError::EmptyLod { lod } => write!(f, "LOD level {:?} has no submesh", lod),
            FormatError::BufferLength {
                field,
                expected,
                actual,
            } => write!(
                f,
                "Buffer {} should be {} bytes long, but it is {} bytes",
                field, expected, actual
            ),
            FormatError::BadIndexSize(size) => write!(f, "Bad index size: {}", size),
            FormatError::UnexpectedAssetType(asset_type) => {
                write!(f, "Expected a Mesh asset, found {}", asset_type)
            }
            FormatError::BadIdentifier(length) => {
                write!(f, "Asset identifier must be 16 bytes, found {}", length)
            }
            FormatError::BadTimestamp(timestamp) => {
                write!(f, "Import timestamp {} is out of range", timestamp)
            }
            FormatError::PayloadLength { declared, actual } => write!(
                f,
                "Payload declares {} bytes, but its content takes {} bytes",
                declared, actual
            ),
            FormatError::MissingThumbnail => write!(f, "Asset header requires a thumbnail"),
            FormatError::TooLarge { field, value } => {
                write!(f, "Value {} of {} does not fit the format", value, field)
            }
        }
    }
}

impl Error for FormatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FormatError::Binary(err) => Some(err),
            _ => None,
        }
    }
}

impl From<binrw::Error> for FormatError {
    fn from(value: binrw::Error) -> Self {
        FormatError::Binary(value)
    }
}

#[derive(Debug)]
pub enum AssetError {
    Format(FormatError),
    Io(io::Error),
}

impl Display for AssetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Format(err) => Display::fmt(err, f),
            AssetError::Io(err) => Display::fmt(err, f),
        }
    }
}

impl Error for AssetError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AssetError::Format(err) => Some(err),
            AssetError::Io(err) => Some(err),
        }
    }
}

impl From<FormatError> for AssetError {
    fn from(value: FormatError) -> Self {
        AssetError::Format(value)
    }
}

impl From<io::Error> for AssetError {
    fn from(value: io::Error) -> Self {
        AssetError::Io(value)
    }
}

impl From<binrw::Error> for AssetError {
    /// A stream that ends early is a truncated asset, anything else the
    /// stream reports is a filesystem failure.
    fn from(value: binrw::Error) -> Self {
        let io_failure = matches!(
            value.root_cause(),
            binrw::Error::Io(err) if err.kind() != io::ErrorKind::UnexpectedEof
        );
        match value {
            binrw::Error::Io(err) if io_failure => AssetError::Io(err),
            binrw::Error::Backtrace(backtrace) if io_failure => AssetError::from(*backtrace.error),
            other => AssetError::Format(FormatError::Binary(other)),
        }
    }
}
