//! Names for things the importer left unnamed, and file names for saved
//! assets.

use std::path::{is_separator, Path, PathBuf};

use rand::Rng;

use crate::{asset::ASSET_FILE_EXTENSION, lod::LodGroup};

const TOKEN_LENGTH: usize = 10;
const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random lowercase alphanumeric token, safe in any file name.
pub fn random_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

pub fn mesh_name() -> String {
    format!("mesh_{}", random_token())
}

pub fn lod_group_name() -> String {
    format!("lod_{}", random_token())
}

fn is_invalid_path_char(c: char) -> bool {
    c.is_control() || matches!(c, '"' | '<' | '>' | '|')
}

fn is_invalid_file_name_char(c: char) -> bool {
    is_invalid_path_char(c) || matches!(c, ':' | '*' | '?' | '\\' | '/')
}

/// Replace every character that may not appear in a file name with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if is_invalid_file_name_char(c) { '_' } else { c })
        .collect()
}

/// Replace invalid characters with `_`, checking the directory part and the
/// file name part against their own rules.
pub fn sanitize_path(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    let split = text.rfind(is_separator).map_or(0, |index| index + 1);
    let (directory, leaf) = text.split_at(split);

    let mut sanitized: String = directory
        .chars()
        .map(|c| if is_invalid_path_char(c) { '_' } else { c })
        .collect();
    sanitized.push_str(&sanitize_file_name(leaf));
    PathBuf::from(sanitized)
}

/// Destination of one LOD group when saving `group_count` groups to
/// `requested`.
///
/// A single group goes to `requested` itself. Otherwise every group gets
/// `<stem>_<suffix>`, the suffix being the group name when the group has
/// several levels and its first level's name otherwise.
pub fn group_asset_path(requested: &Path, group: &LodGroup, group_count: usize) -> PathBuf {
    let mut name = requested.with_extension("").into_os_string();
    if group_count > 1 {
        let suffix = if group.lods().len() > 1 {
            group.name()
        } else {
            group.first_lod().name()
        };
        name.push("_");
        name.push(sanitize_file_name(suffix));
    }
    name.push(".");
    name.push(ASSET_FILE_EXTENSION);
    sanitize_path(Path::new(&name))
}

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};

    use super::{group_asset_path, random_token, sanitize_file_name, sanitize_path};
    use crate::{
        lod::{LodGroup, MeshLod},
        submesh::test::triangle_submesh,
    };

    fn group(name: &str, lod_names: &[&str]) -> LodGroup {
        let lods = lod_names
            .iter()
            .map(|lod| {
                let submesh = triangle_submesh("mesh", &[[0.0; 3]; 3], &[0, 1, 2], 0, 0);
                MeshLod::new(*lod, 0.0, vec![submesh]).unwrap()
            })
            .collect();
        LodGroup::new(name, lods).unwrap()
    }

    #[test]
    fn test_random_token() {
        let token = random_token();
        assert_eq!(token.len(), 10);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(random_token(), random_token());
    }

    #[test]
    fn test_sanitize_leaf() {
        assert_eq!(sanitize_file_name("a:b*c?d"), "a_b_c_d");
        assert_eq!(sanitize_file_name("tree\u{7}"), "tree_");
    }

    #[test]
    fn test_sanitize_directory_and_leaf() {
        let sanitized = sanitize_path(Path::new("assets/a<b/mesh?.rasset"));
        assert_eq!(sanitized, PathBuf::from("assets/a_b/mesh_.rasset"));

        // Colons are only invalid in the file name.
        let sanitized = sanitize_path(Path::new("assets/c:d/e:f.rasset"));
        assert_eq!(sanitized, PathBuf::from("assets/c:d/e_f.rasset"));
    }

    #[test]
    fn test_single_group_path() {
        let group = group("tree", &["lod_0", "lod_1"]);
        let path = group_asset_path(Path::new("out/tree.rasset"), &group, 1);
        assert_eq!(path, PathBuf::from("out/tree.rasset"));
        let path = group_asset_path(Path::new("out/tree"), &group, 1);
        assert_eq!(path, PathBuf::from("out/tree.rasset"));
        let path = group_asset_path(Path::new("out/tree.asset"), &group, 1);
        assert_eq!(path, PathBuf::from("out/tree.rasset"));
    }

    #[test]
    fn test_multi_group_paths() {
        let leaves = group("leaves", &["leaves_high", "leaves_low"]);
        let trunk = group("trunk", &["trunk_only"]);
        let requested = Path::new("out/tree.rasset");
        assert_eq!(
            group_asset_path(requested, &leaves, 2),
            PathBuf::from("out/tree_leaves.rasset")
        );
        assert_eq!(
            group_asset_path(requested, &trunk, 2),
            PathBuf::from("out/tree_trunk_only.rasset")
        );
    }
}
