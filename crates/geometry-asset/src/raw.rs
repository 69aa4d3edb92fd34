//! The buffer the model importer hands over after converting a source file.
//!
//! It is a transient wire format: only the parsed model is ever persisted.

use std::io::Cursor;

use binrw::{BinRead, BinWriterExt};

use crate::{
    error::FormatError,
    format::{checked_i32, read_buffer, read_list, write_bytes, write_text, Blob},
    naming,
    submesh::{ElementsType, PrimitiveTopology, Submesh, SubmeshLayout, POSITION_STRIDE},
};

#[binrw::binread]
#[derive(Debug)]
#[br(little)]
struct RawScene {
    #[br(temp)]
    _scene_name: Blob,
    #[br(temp)]
    lod_group_count: i32,
    #[br(parse_with = read_list, args(lod_group_count))]
    lod_groups: Vec<RawLodGroupRecord>,
}

#[binrw::binread]
#[derive(Debug)]
#[br(little)]
struct RawLodGroupRecord {
    #[br(try_map = |blob: Blob| blob.into_name())]
    name: Option<String>,
    #[br(temp)]
    mesh_count: i32,
    #[br(parse_with = read_list, args(mesh_count))]
    meshes: Vec<RawMeshRecord>,
}

#[derive(Debug, BinRead)]
#[br(little)]
struct RawMeshRecord {
    #[br(try_map = |blob: Blob| blob.into_name())]
    name: Option<String>,
    lod_id: i32,
    element_size: i32,
    elements_type: ElementsType,
    vertex_count: i32,
    index_size: i32,
    index_count: i32,
    threshold: f32,
    #[br(parse_with = read_buffer, args("positions", POSITION_STRIDE as i32, vertex_count))]
    positions: Vec<u8>,
    #[br(parse_with = read_buffer, args("elements", element_size, vertex_count))]
    elements: Vec<u8>,
    #[br(parse_with = read_buffer, args("indices", index_size, index_count))]
    indices: Vec<u8>,
}

/// A submesh tagged with the LOD it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSubmesh {
    pub lod_id: i32,
    pub threshold: f32,
    pub submesh: Submesh,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawLodGroup {
    pub name: String,
    pub submeshes: Vec<RawSubmesh>,
}

impl RawMeshRecord {
    fn into_raw_submesh(self) -> Result<RawSubmesh, FormatError> {
        // Lengths were checked against these counts while reading, so none of
        // them is negative here.
        let layout = SubmeshLayout {
            element_size: self.element_size as u32,
            elements_type: self.elements_type,
            primitive_topology: PrimitiveTopology::TriangleList,
            vertex_count: self.vertex_count as u32,
            index_size: self.index_size as u32,
            index_count: self.index_count as u32,
        };
        let name = self.name.unwrap_or_else(naming::mesh_name);
        let submesh = Submesh::new(name, layout, self.positions, self.elements, self.indices)?;
        Ok(RawSubmesh {
            lod_id: self.lod_id,
            threshold: self.threshold,
            submesh,
        })
    }
}

impl RawLodGroupRecord {
    fn into_raw_group(self) -> Result<RawLodGroup, FormatError> {
        let name = self.name.unwrap_or_else(naming::lod_group_name);
        if self.meshes.is_empty() {
            return Err(FormatError::EmptyLodGroup { group: name });
        }

        let submeshes = self
            .meshes
            .into_iter()
            .map(RawMeshRecord::into_raw_submesh)
            .collect::<Result<_, _>>()?;
        Ok(RawLodGroup { name, submeshes })
    }
}

/// Parse a whole import buffer. Bytes after the last group are ignored.
pub fn parse(buffer: &[u8]) -> Result<Vec<RawLodGroup>, FormatError> {
    let scene = RawScene::read(&mut Cursor::new(buffer))?;
    if scene.lod_groups.is_empty() {
        return Err(FormatError::NoLodGroups);
    }

    scene
        .lod_groups
        .into_iter()
        .map(RawLodGroupRecord::into_raw_group)
        .collect()
}

/// Lay out `groups` the way the importer does.
///
/// The layout has no topology field, every submesh reads back as a triangle
/// list.
pub fn encode(scene_name: &str, groups: &[RawLodGroup]) -> Result<Vec<u8>, FormatError> {
    let mut writer = Cursor::new(Vec::new());
    write_text(&mut writer, scene_name)?;
    writer.write_le(&checked_i32("LOD group count", groups.len())?)?;

    for group in groups {
        write_text(&mut writer, &group.name)?;
        writer.write_le(&checked_i32("mesh count", group.submeshes.len())?)?;

        for record in &group.submeshes {
            let submesh = &record.submesh;
            write_text(&mut writer, submesh.name())?;
            writer.write_le(&record.lod_id)?;
            writer.write_le(&checked_i32("element size", submesh.element_size() as usize)?)?;
            writer.write_le(&submesh.elements_type().bits())?;
            writer.write_le(&checked_i32("vertex count", submesh.vertex_count() as usize)?)?;
            writer.write_le(&checked_i32("index size", submesh.index_size() as usize)?)?;
            writer.write_le(&checked_i32("index count", submesh.index_count() as usize)?)?;
            writer.write_le(&record.threshold)?;
            write_bytes(&mut writer, submesh.positions())?;
            write_bytes(&mut writer, submesh.elements())?;
            write_bytes(&mut writer, submesh.indices())?;
        }
    }

    Ok(writer.into_inner())
}

#[cfg(test)]
mod test {
    use super::{encode, parse, RawLodGroup, RawSubmesh};
    use crate::{error::FormatError, submesh::test::triangle_submesh};

    fn triangle(name: &str, lod_id: i32, fill: u8) -> RawSubmesh {
        RawSubmesh {
            lod_id,
            threshold: 0.5,
            submesh: triangle_submesh(
                name,
                &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                &[0, 1, 2],
                8,
                fill,
            ),
        }
    }

    fn scene(submeshes: Vec<RawSubmesh>) -> Vec<RawLodGroup> {
        vec![RawLodGroup {
            name: "tree".to_owned(),
            submeshes,
        }]
    }

    #[test]
    fn test_parse_encoded_scene() {
        let groups = scene(vec![triangle("a", 0, 1), triangle("b", 0, 2)]);
        let buffer = encode("scene", &groups).unwrap();
        assert_eq!(parse(&buffer).unwrap(), groups);
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let groups = scene(vec![triangle("a", 0, 1)]);
        let mut buffer = encode("scene", &groups).unwrap();
        buffer.extend_from_slice(&[0xff; 7]);
        assert_eq!(parse(&buffer).unwrap(), groups);
    }

    #[test]
    fn test_unnamed_items_get_names() {
        let groups = vec![RawLodGroup {
            name: String::new(),
            submeshes: vec![triangle("", 0, 1)],
        }];
        let buffer = encode("", &groups).unwrap();
        let parsed = parse(&buffer).unwrap();
        assert!(parsed[0].name.starts_with("lod_"));
        assert!(parsed[0].submeshes[0].submesh.name().starts_with("mesh_"));
    }

    #[test]
    fn test_truncated_indices_fail() {
        let buffer = encode("scene", &scene(vec![triangle("a", 0, 1)])).unwrap();
        // Drop the last index byte.
        let result = parse(&buffer[..buffer.len() - 1]);
        assert!(matches!(result, Err(FormatError::Binary(_))));
    }

    #[test]
    fn test_empty_scene_rejected() {
        let buffer = encode("scene", &[]).unwrap();
        assert!(matches!(parse(&buffer), Err(FormatError::NoLodGroups)));

        let buffer = encode("scene", &scene(Vec::new())).unwrap();
        assert!(matches!(
            parse(&buffer),
            Err(FormatError::EmptyLodGroup { .. })
        ));
    }

    #[test]
    fn test_bad_index_size_rejected() {
        let mut buffer = encode("scene", &scene(vec![triangle("a", 0, 1)])).unwrap();
        // scene name, group count, group name, mesh count, mesh name, lod id,
        // element size, elements type, vertex count, then index size.
        let offset = (4 + 5) + 4 + (4 + 4) + 4 + (4 + 1) + 4 + 4 + 4 + 4;
        buffer[offset..offset + 4].copy_from_slice(&3i32.to_le_bytes());
        // Three-byte indices need one more byte.
        buffer.extend_from_slice(&[0; 3]);
        assert!(matches!(parse(&buffer), Err(FormatError::BadIndexSize(3))));
    }
}
