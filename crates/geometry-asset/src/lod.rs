//! Grouping of submeshes into levels of detail.

use crate::{error::FormatError, raw::RawSubmesh, submesh::Submesh};

/// Raw LOD id meaning "no LOD", never merged with another submesh.
pub const INVALID_LOD_ID: i32 = -1;

/// One level of detail: the submeshes drawn together below a distance
/// threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshLod {
    name: String,
    threshold: f32,
    submeshes: Vec<Submesh>,
}

impl MeshLod {
    pub fn new(
        name: impl Into<String>,
        threshold: f32,
        submeshes: Vec<Submesh>,
    ) -> Result<Self, FormatError> {
        let name = name.into();
        if submeshes.is_empty() {
            return Err(FormatError::EmptyLod { lod: name });
        }
        Ok(Self {
            name,
            threshold,
            submeshes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn submeshes(&self) -> &[Submesh] {
        &self.submeshes
    }

    pub fn first_submesh(&self) -> &Submesh {
        &self.submeshes[0]
    }
}

/// Every level of one model, finest first.
#[derive(Debug, Clone, PartialEq)]
pub struct LodGroup {
    name: String,
    lods: Vec<MeshLod>,
}

impl LodGroup {
    pub fn new(name: impl Into<String>, lods: Vec<MeshLod>) -> Result<Self, FormatError> {
        let name = name.into();
        if lods.is_empty() {
            return Err(FormatError::EmptyLodGroup { group: name });
        }
        Ok(Self { name, lods })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lods(&self) -> &[MeshLod] {
        &self.lods
    }

    pub fn first_lod(&self) -> &MeshLod {
        &self.lods[0]
    }
}

/// Partition submeshes into levels by LOD id.
///
/// Levels appear in the order their id is first seen. A new level takes the
/// name and threshold of the submesh that opened it.
pub fn group_lods(records: impl IntoIterator<Item = RawSubmesh>) -> Vec<MeshLod> {
    let mut lod_ids: Vec<i32> = Vec::new();
    let mut lods: Vec<MeshLod> = Vec::new();

    for record in records {
        let seen = if record.lod_id == INVALID_LOD_ID {
            None
        } else {
            lod_ids.iter().position(|id| *id == record.lod_id)
        };

        match seen {
            Some(index) => lods[index].submeshes.push(record.submesh),
            None => {
                lod_ids.push(record.lod_id);
                lods.push(MeshLod {
                    name: record.submesh.name().to_owned(),
                    threshold: record.threshold,
                    submeshes: vec![record.submesh],
                });
            }
        }
    }

    lods
}
