//! The flat blob the engine runtime uploads from.
//!
//! ```text
//! u32 LODCount
//! per LOD:
//!     f32 Threshold, u32 SubmeshCount, u32 SizeOfSubmeshes
//!     per submesh:
//!         u32 ElementSize, u32 VertexCount, u32 IndexCount,
//!         u32 ElementsType, u32 PrimitiveTopology,
//!         u8 Positions[align_up(12 * VertexCount, 4)]
//!         u8 Elements[align_up(ElementSize * VertexCount, 4)]
//!         u8 Indices[IndexSize * IndexCount]
//! ```
//!
//! The runtime derives `IndexSize` from `VertexCount` instead of reading it,
//! see [`runtime_index_size`]. Stored indices of another width are rewritten
//! while packing.

use std::{
    borrow::Cow,
    error::Error,
    fmt::{self, Display, Formatter},
    io::{Cursor, Seek, Write},
};

use binrw::{BinRead, BinWriterExt};
use log::debug;

use crate::{
    asset::geometry::GeometryAsset,
    error::FormatError,
    format::{checked_u32, write_bytes},
    geometry::Geometry,
    lod::LodGroup,
    submesh::{ElementsType, PrimitiveTopology, Submesh, POSITION_STRIDE},
};

pub const PACK_ALIGNMENT: usize = 4;

/// Round `size` up to a multiple of `alignment`, a power of two.
pub const fn align_up(size: usize, alignment: usize) -> usize {
    let mask = alignment - 1;
    (size + mask) & !mask
}

/// Index width the runtime assumes for a submesh of `vertex_count` vertices.
pub const fn runtime_index_size(vertex_count: u32) -> u32 {
    if vertex_count < (1 << 16) {
        2
    } else {
        4
    }
}

#[derive(Debug)]
pub enum PackError {
    EmptyGeometry,
    /// An index too large for the 16-bit indices the runtime expects.
    IndexOutOfRange { submesh: String, index: u32 },
    Format(FormatError),
}

impl Display for PackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PackError::EmptyGeometry => write!(f, "Geometry has nothing to pack"),
            PackError::IndexOutOfRange { submesh, index } => write!(
                f,
                "Submesh {:?} index {} does not fit in 16 bits",
                submesh, index
            ),
            PackError::Format(err) => Display::fmt(err, f),
        }
    }
}

impl Error for PackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PackError::EmptyGeometry | PackError::IndexOutOfRange { .. } => None,
            PackError::Format(err) => Some(err),
        }
    }
}

impl From<FormatError> for PackError {
    fn from(value: FormatError) -> Self {
        PackError::Format(value)
    }
}

impl From<binrw::Error> for PackError {
    fn from(value: binrw::Error) -> Self {
        PackError::Format(FormatError::Binary(value))
    }
}

fn write_padded<W: Write + Seek>(writer: &mut W, bytes: &[u8]) -> Result<(), FormatError> {
    write_bytes(writer, bytes)?;
    let padding = align_up(bytes.len(), PACK_ALIGNMENT) - bytes.len();
    write_bytes(writer, &[0; PACK_ALIGNMENT][..padding])
}

/// Indices of `submesh` at the width the runtime reads them with.
fn runtime_indices(submesh: &Submesh) -> Result<Cow<'_, [u8]>, PackError> {
    let index_size = runtime_index_size(submesh.vertex_count());
    if submesh.index_size() == index_size {
        return Ok(Cow::Borrowed(submesh.indices()));
    }
    debug!(
        "Rewriting {}-byte indices of submesh {:?} as {}-byte",
        submesh.index_size(),
        submesh.name(),
        index_size
    );

    let mut indices = Vec::with_capacity(index_size as usize * submesh.index_count() as usize);
    for index in submesh.index_values() {
        if index_size == 2 {
            let narrow = u16::try_from(index).map_err(|_| PackError::IndexOutOfRange {
                submesh: submesh.name().to_owned(),
                index,
            })?;
            indices.extend_from_slice(&narrow.to_le_bytes());
        } else {
            indices.extend_from_slice(&index.to_le_bytes());
        }
    }
    Ok(Cow::Owned(indices))
}

fn pack_submesh<W: Write + Seek>(writer: &mut W, submesh: &Submesh) -> Result<(), PackError> {
    let indices = runtime_indices(submesh)?;

    writer.write_le(&submesh.element_size())?;
    writer.write_le(&submesh.vertex_count())?;
    writer.write_le(&submesh.index_count())?;
    writer.write_le(&submesh.elements_type().bits())?;
    writer.write_le(&(submesh.primitive_topology() as u32))?;
    write_padded(writer, submesh.positions())?;
    write_padded(writer, submesh.elements())?;
    write_bytes(writer, &indices)?;
    Ok(())
}

fn pack_lod_group(group: &LodGroup) -> Result<Vec<u8>, PackError> {
    let mut writer = Cursor::new(Vec::new());
    writer.write_le(&checked_u32("LOD count", group.lods().len())?)?;

    for lod in group.lods() {
        writer.write_le(&lod.threshold())?;
        writer.write_le(&checked_u32("submesh count", lod.submeshes().len())?)?;

        // SizeOfSubmeshes is known once the submeshes are written.
        let size_position = writer.position();
        writer.write_le(&0u32)?;
        let start = writer.position();
        for submesh in lod.submeshes() {
            pack_submesh(&mut writer, submesh)?;
        }
        let end = writer.position();

        writer.set_position(size_position);
        writer.write_le(&checked_u32("size of submeshes", (end - start) as usize)?)?;
        writer.set_position(end);
    }

    Ok(writer.into_inner())
}

/// Pack the first LOD group of `geometry`.
pub fn pack_geometry(geometry: &Geometry) -> Result<Vec<u8>, PackError> {
    let group = geometry
        .lod_groups()
        .first()
        .ok_or(PackError::EmptyGeometry)?;
    pack_lod_group(group)
}

pub fn pack_asset(asset: &GeometryAsset) -> Result<Vec<u8>, PackError> {
    pack_geometry(&asset.geometry)
}

#[derive(Debug, BinRead)]
#[br(little)]
struct PackedLodHeader {
    threshold: f32,
    submesh_count: u32,
    size_of_submeshes: u32,
}

#[derive(Debug, BinRead)]
#[br(little)]
struct PackedSubmeshHeader {
    element_size: u32,
    vertex_count: u32,
    index_count: u32,
    elements_type: ElementsType,
    primitive_topology: PrimitiveTopology,
}

/// One submesh of a packed blob, fields borrowed with their padding.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedSubmesh<'a> {
    pub element_size: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    pub elements_type: ElementsType,
    pub primitive_topology: PrimitiveTopology,
    pub index_size: u32,
    pub positions: &'a [u8],
    pub elements: &'a [u8],
    pub indices: &'a [u8],
}

impl<'a> PackedSubmesh<'a> {
    pub fn unpadded_positions(&self) -> &'a [u8] {
        &self.positions[..self.vertex_count as usize * POSITION_STRIDE]
    }

    pub fn unpadded_elements(&self) -> &'a [u8] {
        &self.elements[..self.vertex_count as usize * self.element_size as usize]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackedLod<'a> {
    pub threshold: f32,
    pub size_of_submeshes: u32,
    pub submeshes: Vec<PackedSubmesh<'a>>,
}

/// Read-only view of a packed blob, as the runtime loader walks it.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedGeometry<'a> {
    pub lods: Vec<PackedLod<'a>>,
}

fn field_length(stride: u32, count: u32) -> Option<usize> {
    (stride as usize).checked_mul(count as usize)
}

fn take<'a>(
    reader: &mut Cursor<&'a [u8]>,
    field: &'static str,
    length: Option<usize>,
) -> Result<&'a [u8], FormatError> {
    let blob: &'a [u8] = *reader.get_ref();
    let start = reader.position() as usize;
    let remaining = blob.len().saturating_sub(start);
    let end = length
        .and_then(|length| start.checked_add(length))
        .filter(|end| *end <= blob.len())
        .ok_or(FormatError::BufferLength {
            field,
            expected: length.unwrap_or(usize::MAX),
            actual: remaining,
        })?;
    reader.set_position(end as u64);
    Ok(&blob[start..end])
}

fn read_packed_submesh<'a>(
    reader: &mut Cursor<&'a [u8]>,
) -> Result<PackedSubmesh<'a>, FormatError> {
    let header = PackedSubmeshHeader::read(reader)?;
    let index_size = runtime_index_size(header.vertex_count);
    let padded = |length: Option<usize>| length.map(|length| align_up(length, PACK_ALIGNMENT));

    let positions = take(
        reader,
        "positions",
        padded(field_length(POSITION_STRIDE as u32, header.vertex_count)),
    )?;
    let elements = take(
        reader,
        "elements",
        padded(field_length(header.element_size, header.vertex_count)),
    )?;
    let indices = take(
        reader,
        "indices",
        field_length(index_size, header.index_count),
    )?;

    Ok(PackedSubmesh {
        element_size: header.element_size,
        vertex_count: header.vertex_count,
        index_count: header.index_count,
        elements_type: header.elements_type,
        primitive_topology: header.primitive_topology,
        index_size,
        positions,
        elements,
        indices,
    })
}

impl<'a> PackedGeometry<'a> {
    pub fn parse(blob: &'a [u8]) -> Result<Self, FormatError> {
        let mut reader = Cursor::new(blob);
        let lod_count = u32::read_le(&mut reader)?;
        if lod_count == 0 {
            return Err(FormatError::EmptyLodGroup {
                group: "packed geometry".to_owned(),
            });
        }

        let mut lods = Vec::new();
        for lod_index in 0..lod_count {
            let header = PackedLodHeader::read(&mut reader)?;
            if header.submesh_count == 0 {
                return Err(FormatError::EmptyLod {
                    lod: format!("#{}", lod_index),
                });
            }

            let start = reader.position() as usize;
            let mut submeshes = Vec::new();
            for _ in 0..header.submesh_count {
                submeshes.push(read_packed_submesh(&mut reader)?);
            }
            let span = reader.position() as usize - start;
            if span != header.size_of_submeshes as usize {
                return Err(FormatError::BufferLength {
                    field: "submeshes",
                    expected: header.size_of_submeshes as usize,
                    actual: span,
                });
            }

            lods.push(PackedLod {
                threshold: header.threshold,
                size_of_submeshes: header.size_of_submeshes,
                submeshes,
            });
        }

        Ok(Self { lods })
    }

    pub fn lod_count(&self) -> usize {
        self.lods.len()
    }

    pub fn submesh_count(&self) -> usize {
        self.lods.iter().map(|lod| lod.submeshes.len()).sum()
    }

    /// One level with one submesh, which the runtime keeps without a LOD
    /// hierarchy.
    pub fn is_single_mesh(&self) -> bool {
        self.lods.len() == 1 && self.lods[0].submeshes.len() == 1
    }

    /// Highest level whose threshold does not exceed `threshold`, or level 0.
    pub fn lod_from_threshold(&self, threshold: f32) -> usize {
        (1..self.lods.len())
            .rev()
            .find(|index| self.lods[*index].threshold <= threshold)
            .unwrap_or(0)
    }

    /// The runtime expects strictly increasing thresholds.
    pub fn has_ascending_thresholds(&self) -> bool {
        self.lods
            .windows(2)
            .all(|pair| pair[0].threshold < pair[1].threshold)
    }

    /// Bytes of the runtime LOD hierarchy: the level count, a threshold and a
    /// `u16` offset/count pair per level, and a 32-bit GPU id per submesh.
    pub fn hierarchy_size(&self) -> usize {
        4 + (4 + 4) * self.lod_count() + 4 * self.submesh_count()
    }
}
