//! Mesh assets: import settings and one LOD group after the header.

use std::{
    fmt::{self, Display, Formatter},
    fs::{self, File},
    io::{self, BufReader, Cursor, Read, Seek, Write},
    path::{Path, PathBuf},
};

use binrw::{BinRead, BinReaderExt, BinWriterExt, Endian};
use log::{debug, error, info, warn};
use uuid::Uuid;
use web_time::SystemTime;

use super::{AssetInfo, AssetType};
use crate::{
    error::{AssetError, FormatError},
    format::{checked_i32, read_buffer, read_list, write_blob, write_bytes, write_text, Blob},
    geometry::Geometry,
    hash::ContentHash,
    lod::{LodGroup, MeshLod},
    naming,
    settings::GeometryImportSettings,
    submesh::{ElementsType, PrimitiveTopology, Submesh, SubmeshLayout, POSITION_STRIDE},
    thumbnail::ThumbnailRenderer,
};

#[binrw::binread]
#[derive(Debug)]
#[br(little)]
struct PayloadRecord {
    #[br(try_map = |blob: Blob| blob.into_string())]
    name: String,
    #[br(temp)]
    lod_count: i32,
    #[br(parse_with = read_list, args(lod_count))]
    lods: Vec<LodRecord>,
}

#[binrw::binread]
#[derive(Debug)]
#[br(little)]
struct LodRecord {
    #[br(try_map = |blob: Blob| blob.into_string())]
    name: String,
    threshold: f32,
    #[br(temp)]
    submesh_count: i32,
    #[br(parse_with = read_list, args(submesh_count))]
    submeshes: Vec<SubmeshRecord>,
}

#[derive(Debug, BinRead)]
#[br(little)]
struct SubmeshRecord {
    #[br(try_map = |blob: Blob| blob.into_string())]
    name: String,
    element_size: i32,
    elements_type: ElementsType,
    primitive_topology: PrimitiveTopology,
    vertex_count: i32,
    index_size: i32,
    index_count: i32,
    #[br(parse_with = read_buffer, args("positions", POSITION_STRIDE as i32, vertex_count))]
    positions: Vec<u8>,
    #[br(parse_with = read_buffer, args("elements", element_size, vertex_count))]
    elements: Vec<u8>,
    #[br(parse_with = read_buffer, args("indices", index_size, index_count))]
    indices: Vec<u8>,
}

impl TryFrom<SubmeshRecord> for Submesh {
    type Error = FormatError;

    fn try_from(record: SubmeshRecord) -> Result<Self, Self::Error> {
        // Every count was used to read a buffer, none of them is negative.
        let layout = SubmeshLayout {
            element_size: record.element_size as u32,
            elements_type: record.elements_type,
            primitive_topology: record.primitive_topology,
            vertex_count: record.vertex_count as u32,
            index_size: record.index_size as u32,
            index_count: record.index_count as u32,
        };
        Submesh::new(
            record.name,
            layout,
            record.positions,
            record.elements,
            record.indices,
        )
    }
}

impl TryFrom<LodRecord> for MeshLod {
    type Error = FormatError;

    fn try_from(record: LodRecord) -> Result<Self, Self::Error> {
        let submeshes = record
            .submeshes
            .into_iter()
            .map(Submesh::try_from)
            .collect::<Result<_, _>>()?;
        MeshLod::new(record.name, record.threshold, submeshes)
    }
}

impl TryFrom<PayloadRecord> for LodGroup {
    type Error = FormatError;

    fn try_from(record: PayloadRecord) -> Result<Self, Self::Error> {
        let lods = record
            .lods
            .into_iter()
            .map(MeshLod::try_from)
            .collect::<Result<_, _>>()?;
        LodGroup::new(record.name, lods)
    }
}

/// A mesh asset file as loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryAsset {
    pub info: AssetInfo,
    /// Holds exactly one LOD group.
    pub geometry: Geometry,
}

impl GeometryAsset {
    pub fn lod_group(&self) -> &LodGroup {
        self.geometry.first_lod_group()
    }
}

fn write_submesh<W: Write + Seek>(writer: &mut W, submesh: &Submesh) -> Result<(), FormatError> {
    write_text(writer, submesh.name())?;
    writer.write_le(&checked_i32("element size", submesh.element_size() as usize)?)?;
    writer.write_le(&submesh.elements_type().bits())?;
    writer.write_le(&(submesh.primitive_topology() as u32))?;
    writer.write_le(&checked_i32("vertex count", submesh.vertex_count() as usize)?)?;
    writer.write_le(&checked_i32("index size", submesh.index_size() as usize)?)?;
    writer.write_le(&checked_i32("index count", submesh.index_count() as usize)?)?;
    write_bytes(writer, submesh.positions())?;
    write_bytes(writer, submesh.elements())?;
    write_bytes(writer, submesh.indices())
}

/// Serialize `group` and hash it.
///
/// Each level's submesh bytes are hashed on their own, and the asset hash
/// is the combination of the level hashes. Names and thresholds of levels
/// do not take part.
fn write_payload(group: &LodGroup) -> Result<(Vec<u8>, Option<ContentHash>), FormatError> {
    let mut writer = Cursor::new(Vec::new());
    write_text(&mut writer, group.name())?;
    writer.write_le(&checked_i32("LOD count", group.lods().len())?)?;

    let mut lod_hashes = Vec::with_capacity(group.lods().len());
    for lod in group.lods() {
        write_text(&mut writer, lod.name())?;
        writer.write_le(&lod.threshold())?;
        writer.write_le(&checked_i32("submesh count", lod.submeshes().len())?)?;

        let start = writer.position() as usize;
        for submesh in lod.submeshes() {
            write_submesh(&mut writer, submesh)?;
        }
        let end = writer.position() as usize;
        lod_hashes.extend(ContentHash::digest_range(
            writer.get_ref(),
            start,
            end - start,
        ));
    }

    Ok((writer.into_inner(), ContentHash::combine(&lod_hashes)))
}

fn read_payload(payload: &[u8]) -> Result<LodGroup, FormatError> {
    let mut reader = Cursor::new(payload);
    let record = PayloadRecord::read(&mut reader)?;
    let consumed = reader.position() as usize;
    if consumed != payload.len() {
        return Err(FormatError::PayloadLength {
            declared: payload.len(),
            actual: consumed,
        });
    }
    LodGroup::try_from(record)
}

fn read_asset<R: Read + Seek>(reader: &mut R) -> Result<GeometryAsset, AssetError> {
    let info = AssetInfo::read(reader)?;
    if info.asset_type != AssetType::Mesh {
        return Err(FormatError::UnexpectedAssetType(info.asset_type).into());
    }

    let settings = GeometryImportSettings::read(reader)?;
    let payload_length: i32 = reader.read_le()?;
    let payload = read_buffer(reader, Endian::Little, ("payload", 1, payload_length))?;
    let group = read_payload(&payload)?;

    Ok(GeometryAsset {
        info,
        geometry: Geometry::new(settings, vec![group])?,
    })
}

pub fn load(path: impl AsRef<Path>) -> Result<GeometryAsset, AssetError> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let asset = read_asset(&mut reader)?;
    debug!("Loaded geometry asset {} from {}", asset.info.id, path.display());
    Ok(asset)
}

pub fn load_from_bytes(bytes: &[u8]) -> Result<GeometryAsset, AssetError> {
    read_asset(&mut Cursor::new(bytes))
}

#[derive(Debug)]
enum SaveError<E> {
    Format(FormatError),
    Io(io::Error),
    Thumbnail(E),
}

impl<E: Display> Display for SaveError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Format(err) => Display::fmt(err, f),
            SaveError::Io(err) => Display::fmt(err, f),
            SaveError::Thumbnail(err) => write!(f, "Failed to render thumbnail: {}", err),
        }
    }
}

impl<E> From<FormatError> for SaveError<E> {
    fn from(value: FormatError) -> Self {
        SaveError::Format(value)
    }
}

impl<E> From<io::Error> for SaveError<E> {
    fn from(value: io::Error) -> Self {
        SaveError::Io(value)
    }
}

/// Identifier of the mesh asset already at `path`, if any.
///
/// The file is read without any lock, a concurrent save to the same path
/// may still mint a second identifier.
fn existing_id(path: &Path) -> Option<Uuid> {
    if !path.is_file() {
        return None;
    }

    match AssetInfo::read_from_file(path) {
        Ok(info) if info.asset_type == AssetType::Mesh => Some(info.id),
        Ok(info) => {
            debug!(
                "{} holds a {} asset, not reusing its identifier",
                path.display(),
                info.asset_type
            );
            None
        }
        Err(err) => {
            warn!("Failed to read asset header of {}: {}", path.display(), err);
            None
        }
    }
}

fn save_group<T: ThumbnailRenderer>(
    settings: &GeometryImportSettings,
    group: &LodGroup,
    destination: &Path,
    renderer: &T,
) -> Result<(), SaveError<T::Error>> {
    let id = existing_id(destination).unwrap_or_else(Uuid::new_v4);
    let (payload, hash) = write_payload(group)?;
    let thumbnail = renderer
        .render(group.first_lod().first_submesh())
        .map_err(SaveError::Thumbnail)?;

    let info = AssetInfo {
        asset_type: AssetType::Mesh,
        id,
        import_date: SystemTime::now(),
        hash,
        thumbnail,
    };
    let mut writer = Cursor::new(Vec::new());
    info.write(&mut writer)?;
    settings.write(&mut writer)?;
    write_blob(&mut writer, "payload", &payload)?;

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(destination, writer.into_inner())?;
    Ok(())
}

/// Write one asset file per LOD group of `geometry` and return the paths
/// written.
///
/// With several groups each file is named after its group, see
/// [`naming::group_asset_path`]. A group that fails is logged and skipped.
pub fn save<T: ThumbnailRenderer>(
    geometry: &Geometry,
    path: impl AsRef<Path>,
    renderer: &T,
) -> Vec<PathBuf> {
    let path = path.as_ref();
    let group_count = geometry.lod_groups().len();
    let mut saved = Vec::with_capacity(group_count);

    for group in geometry.lod_groups() {
        let destination = naming::group_asset_path(path, group, group_count);
        match save_group(geometry.settings(), group, &destination, renderer) {
            Ok(()) => {
                info!("Saved geometry to {}", destination.display());
                saved.push(destination);
            }
            Err(err) => error!(
                "Failed to save LOD group {:?} to {}: {}",
                group.name(),
                destination.display(),
                err
            ),
        }
    }

    saved
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::BinWriterExt;

    use super::{load_from_bytes, read_payload, write_payload};
    use crate::{
        error::{AssetError, FormatError},
        lod::{LodGroup, MeshLod},
        submesh::{test::triangle_submesh, Submesh},
    };

    #[derive(Clone, Copy)]
    enum Buffer {
        Positions,
        Elements,
        Indices,
    }

    /// `group()` with one byte of the last submesh flipped.
    fn group_with_flipped_byte(buffer: Buffer, offset: usize) -> LodGroup {
        let group = group();
        let mut lods = group.lods().to_vec();
        let lod = lods.pop().unwrap();
        let mut submeshes = lod.submeshes().to_vec();
        let submesh = submeshes.pop().unwrap();

        let mut positions = submesh.positions().to_vec();
        let mut elements = submesh.elements().to_vec();
        let mut indices = submesh.indices().to_vec();
        let target = match buffer {
            Buffer::Positions => &mut positions,
            Buffer::Elements => &mut elements,
            Buffer::Indices => &mut indices,
        };
        target[offset] ^= 0x01;

        submeshes.push(
            Submesh::new(
                submesh.name(),
                *submesh.layout(),
                positions,
                elements,
                indices,
            )
            .unwrap(),
        );
        lods.push(MeshLod::new(lod.name(), lod.threshold(), submeshes).unwrap());
        LodGroup::new(group.name(), lods).unwrap()
    }

    fn group() -> LodGroup {
        let high = MeshLod::new(
            "high",
            0.0,
            vec![
                triangle_submesh("a", &[[0.0; 3]; 3], &[0, 1, 2], 4, 1),
                triangle_submesh("b", &[[1.0; 3]; 3], &[2, 1, 0], 4, 2),
            ],
        )
        .unwrap();
        let low = MeshLod::new(
            "low",
            50.0,
            vec![triangle_submesh("c", &[[2.0; 3]; 3], &[0, 1, 2], 4, 3)],
        )
        .unwrap();
        LodGroup::new("rock", vec![high, low]).unwrap()
    }

    #[test]
    fn test_payload_round_trip() {
        let group = group();
        let (payload, hash) = write_payload(&group).unwrap();
        assert!(hash.is_some());
        assert_eq!(read_payload(&payload).unwrap(), group);
    }

    #[test]
    fn test_rename_keeps_hash() {
        let group = group();
        let renamed = LodGroup::new("boulder", group.lods().to_vec()).unwrap();
        assert_eq!(write_payload(&group).unwrap().1, write_payload(&renamed).unwrap().1);
    }

    #[test]
    fn test_payload_trailing_bytes_rejected() {
        let (mut payload, _) = write_payload(&group()).unwrap();
        payload.push(0);
        assert!(matches!(
            read_payload(&payload),
            Err(FormatError::PayloadLength { .. })
        ));
    }

    #[test]
    fn test_other_asset_type_rejected() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_le(&6i32).unwrap();
        cursor.write_le(&16i32).unwrap();
        cursor.write_le(&[0u8; 16]).unwrap();
        cursor.write_le(&0i64).unwrap();
        cursor.write_le(&0i32).unwrap();
        cursor.write_le(&1i32).unwrap();
        cursor.write_le(&0u8).unwrap();

        let result = load_from_bytes(&cursor.into_inner());
        assert!(matches!(
            result,
            Err(AssetError::Format(FormatError::UnexpectedAssetType(_)))
        ));
    }

    #[test]
    fn test_single_byte_changes_hash() {
        let (_, original) = write_payload(&group()).unwrap();
        for (buffer, offset) in [
            (Buffer::Positions, 0),
            (Buffer::Positions, 35),
            (Buffer::Elements, 5),
            (Buffer::Indices, 0),
            (Buffer::Indices, 5),
        ] {
            let (_, changed) = write_payload(&group_with_flipped_byte(buffer, offset)).unwrap();
            assert!(changed.is_some());
            assert_ne!(changed, original);
        }
    }
}
