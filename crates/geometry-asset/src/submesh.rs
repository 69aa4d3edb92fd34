use binrw::BinRead;
use modular_bitfield::prelude::*;

use crate::error::FormatError;

/// Positions are always three `f32` per vertex.
pub const POSITION_STRIDE: usize = 12;

/// Per-vertex attributes present in the element buffer.
#[bitfield(bits = 32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(map = Self::from_bytes)]
pub struct ElementsType {
    pub static_normal: bool,
    pub texture_coordinates: bool,
    pub color: bool,
    pub skeletal: bool,
    /// Bits this pipeline does not interpret, carried verbatim.
    pub reserved: B28,
}

impl ElementsType {
    pub const POSITION_ONLY: u32 = 0x00;
    pub const STATIC_NORMAL: u32 = 0x01;
    pub const STATIC_NORMAL_TEXTURE: u32 = 0x03;
    pub const STATIC_COLOR: u32 = 0x04;
    pub const SKELETAL: u32 = 0x08;

    pub fn bits(self) -> u32 {
        u32::from_le_bytes(self.into_bytes())
    }
}

impl From<u32> for ElementsType {
    fn from(bits: u32) -> Self {
        Self::from_bytes(bits.to_le_bytes())
    }
}

impl From<ElementsType> for u32 {
    fn from(value: ElementsType) -> Self {
        value.bits()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(repr = u32)]
pub enum PrimitiveTopology {
    PointList = 1,
    LineList = 2,
    LineStrip = 3,
    TriangleList = 4,
    TriangleStrip = 5,
}

/// Counts and strides describing the three buffers of a [`Submesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmeshLayout {
    pub element_size: u32,
    pub elements_type: ElementsType,
    pub primitive_topology: PrimitiveTopology,
    pub vertex_count: u32,
    pub index_size: u32,
    pub index_count: u32,
}

impl SubmeshLayout {
    pub fn position_buffer_size(&self) -> Option<usize> {
        (self.vertex_count as usize).checked_mul(POSITION_STRIDE)
    }

    pub fn element_buffer_size(&self) -> Option<usize> {
        (self.vertex_count as usize).checked_mul(self.element_size as usize)
    }

    pub fn index_buffer_size(&self) -> Option<usize> {
        (self.index_count as usize).checked_mul(self.index_size as usize)
    }
}

/// One drawable batch: a vertex range and the indices drawing it with one
/// topology. Buffer lengths always agree with the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Submesh {
    name: String,
    layout: SubmeshLayout,
    positions: Vec<u8>,
    elements: Vec<u8>,
    indices: Vec<u8>,
}

fn check_length(
    field: &'static str,
    expected: Option<usize>,
    buffer: &[u8],
) -> Result<(), FormatError> {
    match expected {
        Some(expected) if expected == buffer.len() => Ok(()),
        expected => Err(FormatError::BufferLength {
            field,
            expected: expected.unwrap_or(usize::MAX),
            actual: buffer.len(),
        }),
    }
}

impl Submesh {
    pub fn new(
        name: impl Into<String>,
        layout: SubmeshLayout,
        positions: Vec<u8>,
        elements: Vec<u8>,
        indices: Vec<u8>,
    ) -> Result<Self, FormatError> {
        if layout.index_size != 2 && layout.index_size != 4 {
            return Err(FormatError::BadIndexSize(layout.index_size as i32));
        }
        check_length("positions", layout.position_buffer_size(), &positions)?;
        check_length("elements", layout.element_buffer_size(), &elements)?;
        check_length("indices", layout.index_buffer_size(), &indices)?;

        Ok(Self {
            name: name.into(),
            layout,
            positions,
            elements,
            indices,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &SubmeshLayout {
        &self.layout
    }

    pub fn element_size(&self) -> u32 {
        self.layout.element_size
    }

    pub fn elements_type(&self) -> ElementsType {
        self.layout.elements_type
    }

    pub fn primitive_topology(&self) -> PrimitiveTopology {
        self.layout.primitive_topology
    }

    pub fn vertex_count(&self) -> u32 {
        self.layout.vertex_count
    }

    pub fn index_size(&self) -> u32 {
        self.layout.index_size
    }

    pub fn index_count(&self) -> u32 {
        self.layout.index_count
    }

    pub fn positions(&self) -> &[u8] {
        &self.positions
    }

    pub fn elements(&self) -> &[u8] {
        &self.elements
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Decoded vertex positions.
    pub fn position_values(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.positions.chunks_exact(POSITION_STRIDE).map(|chunk| {
            let component = |offset: usize| {
                f32::from_le_bytes([
                    chunk[offset],
                    chunk[offset + 1],
                    chunk[offset + 2],
                    chunk[offset + 3],
                ])
            };
            [component(0), component(4), component(8)]
        })
    }

    /// Decoded indices, widened to `u32`.
    pub fn index_values(&self) -> impl Iterator<Item = u32> + '_ {
        self.indices
            .chunks_exact(self.layout.index_size as usize)
            .map(|chunk| match chunk {
                [a, b] => u16::from_le_bytes([*a, *b]) as u32,
                [a, b, c, d] => u32::from_le_bytes([*a, *b, *c, *d]),
                _ => 0,
            })
    }
}
