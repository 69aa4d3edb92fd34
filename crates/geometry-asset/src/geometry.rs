use log::debug;

use crate::{
    error::FormatError,
    lod::{group_lods, LodGroup},
    raw,
    settings::GeometryImportSettings,
};

/// An imported model: one or more LOD groups plus the settings they were
/// imported with.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    settings: GeometryImportSettings,
    lod_groups: Vec<LodGroup>,
}

impl Geometry {
    pub fn new(
        settings: GeometryImportSettings,
        lod_groups: Vec<LodGroup>,
    ) -> Result<Self, FormatError> {
        if lod_groups.is_empty() {
            return Err(FormatError::NoLodGroups);
        }
        Ok(Self {
            settings,
            lod_groups,
        })
    }

    /// Build the model from an importer buffer.
    pub fn from_raw(buffer: &[u8], settings: GeometryImportSettings) -> Result<Self, FormatError> {
        let lod_groups = raw::parse(buffer)?
            .into_iter()
            .map(|group| {
                let lods = group_lods(group.submeshes);
                debug!("LOD group {:?} has {} levels", group.name, lods.len());
                LodGroup::new(group.name, lods)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(settings, lod_groups)
    }

    pub fn settings(&self) -> &GeometryImportSettings {
        &self.settings
    }

    pub fn lod_groups(&self) -> &[LodGroup] {
        &self.lod_groups
    }

    pub fn first_lod_group(&self) -> &LodGroup {
        &self.lod_groups[0]
    }
}
