//! Binary building blocks shared by the raw import layout and the asset file
//! layout: `i32` length-prefixed byte strings, stride-checked buffers and
//! counted record lists. All of them are little-endian.

use std::{
    fmt::{self, Display, Formatter},
    io::{Read, Seek, Write},
    string::FromUtf8Error,
};

use binrw::{BinRead, BinResult, BinWriterExt, Endian};

use crate::error::FormatError;

/// `i32` byte length followed by that many bytes.
#[binrw::binread]
#[derive(Debug, Clone)]
#[br(little)]
pub(crate) struct Blob {
    #[br(temp)]
    length: i32,
    #[br(parse_with = read_buffer, args("blob", 1, length))]
    pub bytes: Vec<u8>,
}

impl Blob {
    pub(crate) fn into_string(self) -> Result<String, FromUtf8Error> {
        String::from_utf8(self.bytes)
    }

    /// Zero-length names are absent, the caller decides what to call them.
    pub(crate) fn into_name(self) -> Result<Option<String>, FromUtf8Error> {
        if self.bytes.is_empty() {
            Ok(None)
        } else {
            self.into_string().map(Some)
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BadBoolean(pub u8);

impl Display for BadBoolean {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Bad boolean value: {}", self.0)
    }
}

pub(crate) fn decode_bool(value: u8) -> Result<bool, BadBoolean> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(BadBoolean(other)),
    }
}

/// Byte length of `count` items of `stride` bytes, `None` if either is
/// negative or the product overflows.
pub(crate) fn buffer_length(stride: i32, count: i32) -> Option<usize> {
    let stride = usize::try_from(stride).ok()?;
    let count = usize::try_from(count).ok()?;
    stride.checked_mul(count)
}

/// Read exactly `stride * count` bytes.
///
/// The buffer grows with what the stream actually holds, so a corrupt count
/// fails on the short read instead of reserving memory up front.
pub(crate) fn read_buffer<R: Read + Seek>(
    reader: &mut R,
    _endian: Endian,
    (field, stride, count): (&'static str, i32, i32),
) -> BinResult<Vec<u8>> {
    let pos = reader.stream_position()?;
    let Some(length) = buffer_length(stride, count) else {
        return Err(binrw::Error::AssertFail {
            pos,
            message: format!("Bad {} size: {} x {}", field, stride, count),
        });
    };

    let mut buffer = Vec::new();
    reader.by_ref().take(length as u64).read_to_end(&mut buffer)?;
    if buffer.len() != length {
        return Err(binrw::Error::AssertFail {
            pos,
            message: format!(
                "Want to read {} bytes of {}, but only {} left",
                length,
                field,
                buffer.len()
            ),
        });
    }
    Ok(buffer)
}

/// Read `count` records one by one.
pub(crate) fn read_list<R, T>(reader: &mut R, endian: Endian, (count,): (i32,)) -> BinResult<Vec<T>>
where
    R: Read + Seek,
    T: for<'a> BinRead<Args<'a> = ()>,
{
    if count < 0 {
        let pos = reader.stream_position()?;
        return Err(binrw::Error::AssertFail {
            pos,
            message: format!("Bad record count: {}", count),
        });
    }

    let mut list = Vec::new();
    for _ in 0..count {
        list.push(T::read_options(reader, endian, ())?);
    }
    Ok(list)
}

pub(crate) fn checked_i32(field: &'static str, value: usize) -> Result<i32, FormatError> {
    i32::try_from(value).map_err(|_| FormatError::TooLarge { field, value })
}

pub(crate) fn checked_u32(field: &'static str, value: usize) -> Result<u32, FormatError> {
    u32::try_from(value).map_err(|_| FormatError::TooLarge { field, value })
}

pub(crate) fn write_bytes<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<(), FormatError> {
    writer.write_all(bytes).map_err(binrw::Error::Io)?;
    Ok(())
}

pub(crate) fn write_blob<W: Write + Seek>(
    writer: &mut W,
    field: &'static str,
    bytes: &[u8],
) -> Result<(), FormatError> {
    writer.write_le(&checked_i32(field, bytes.len())?)?;
    write_bytes(writer, bytes)
}

pub(crate) fn write_text<W: Write + Seek>(writer: &mut W, text: &str) -> Result<(), FormatError> {
    write_blob(writer, "text", text.as_bytes())
}
