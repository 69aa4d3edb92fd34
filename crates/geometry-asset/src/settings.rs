use std::io::{Seek, Write};

use binrw::{BinRead, BinWriterExt};

use crate::{error::FormatError, format::decode_bool};

/// Options the model importer ran with, persisted ahead of the payload so a
/// later reimport can reuse them.
#[derive(Debug, Clone, PartialEq, BinRead)]
#[br(little)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GeometryImportSettings {
    /// Degrees.
    pub smoothing_angle: f32,
    #[br(try_map = decode_bool)]
    pub calculate_normals: bool,
    #[br(try_map = decode_bool)]
    pub calculate_tangents: bool,
    #[br(try_map = decode_bool)]
    pub reverse_handedness: bool,
    #[br(try_map = decode_bool)]
    pub import_embedded_textures: bool,
    #[br(try_map = decode_bool)]
    pub import_animations: bool,
}

impl Default for GeometryImportSettings {
    fn default() -> Self {
        Self {
            smoothing_angle: 178.0,
            calculate_normals: false,
            calculate_tangents: false,
            reverse_handedness: false,
            import_embedded_textures: true,
            import_animations: true,
        }
    }
}

impl GeometryImportSettings {
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> Result<(), FormatError> {
        writer.write_le(&self.smoothing_angle)?;
        for flag in [
            self.calculate_normals,
            self.calculate_tangents,
            self.reverse_handedness,
            self.import_embedded_textures,
            self.import_animations,
        ] {
            writer.write_le(&u8::from(flag))?;
        }
        Ok(())
    }
}
