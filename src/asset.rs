//! Asset loading: image decoding and Wavefront OBJ import.
//!
//! The importer flattens a model file into one merged vertex/index pair
//! consumable by [`Mesh3D::new`]; it does not model multi-mesh hierarchies.

use std::{fs, path::Path, sync::Arc};

use fxhash::FxHashMap;
use image::DynamicImage;

use crate::abs::{Mesh3D, Vertex3D};
use crate::error::{Error, Result};

/// Decodes the image file at `path` into pixel memory.
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    image::open(path).map_err(|source| Error::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}

/// CPU-side geometry produced by the importer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
}

/// Parses the OBJ file at `path` into a single merged vertex/index buffer.
///
/// `flip_uvs` mirrors texture coordinates vertically, for models authored
/// with the origin at the top-left instead of the bottom-left.
pub fn load_obj(path: impl AsRef<Path>, flip_uvs: bool) -> Result<MeshData> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| Error::Import {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_obj(&contents, flip_uvs).map_err(|reason| Error::Import {
        path: path.to_path_buf(),
        reason,
    })
}

/// Imports the model at `path` and uploads it as a [`Mesh3D`] with `texture`
/// as its initial texture.
pub fn import_mesh(
    gl: &Arc<glow::Context>,
    path: impl AsRef<Path>,
    flip_uvs: bool,
    texture: &DynamicImage,
) -> Result<Mesh3D> {
    let data = load_obj(path, flip_uvs)?;
    Mesh3D::new(gl, &data.vertices, &data.indices, texture)
}

fn parse_obj(source: &str, flip_uvs: bool) -> std::result::Result<MeshData, String> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut texcoords: Vec<[f32; 2]> = Vec::new();

    // Each distinct position/uv reference becomes one output vertex.
    let mut unique: FxHashMap<(usize, Option<usize>), u32> = FxHashMap::default();
    let mut vertices: Vec<Vertex3D> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for (line_no, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                texcoords.push([u, v]);
            }
            "f" => {
                let mut face_indices: Vec<u32> = Vec::new();
                for token in parts {
                    let (pos_idx, uv_idx) =
                        parse_face_vertex(token, positions.len(), texcoords.len(), line_no)?;
                    let index = match unique.get(&(pos_idx, uv_idx)) {
                        Some(&idx) => idx,
                        None => {
                            let [x, y, z] = positions[pos_idx];
                            let [u, v] = uv_idx.map(|i| texcoords[i]).unwrap_or([0.0, 0.0]);
                            let v = if flip_uvs { 1.0 - v } else { v };

                            let idx = u32::try_from(vertices.len())
                                .map_err(|_| format!("too many vertices (>{})", u32::MAX))?;
                            vertices.push(Vertex3D::new(x, y, z, u, v));
                            unique.insert((pos_idx, uv_idx), idx);
                            idx
                        }
                    };
                    face_indices.push(index);
                }

                if face_indices.len() < 3 {
                    return Err(format!(
                        "face on line {} has fewer than 3 vertices",
                        line_no + 1
                    ));
                }
                // Triangulate polygons as a fan.
                for tri in 1..(face_indices.len() - 1) {
                    indices.push(face_indices[0]);
                    indices.push(face_indices[tri]);
                    indices.push(face_indices[tri + 1]);
                }
            }
            // Normals, groups, materials and the rest are ignored.
            _ => {}
        }
    }

    if vertices.is_empty() || indices.is_empty() {
        return Err("model contains no triangles".to_string());
    }

    Ok(MeshData { vertices, indices })
}

fn parse_f32(
    value: Option<&str>,
    line_no: usize,
    what: &str,
) -> std::result::Result<f32, String> {
    let token = value.ok_or_else(|| format!("missing {} on line {}", what, line_no + 1))?;
    token
        .parse::<f32>()
        .map_err(|_| format!("malformed {} '{}' on line {}", what, token, line_no + 1))
}

/// Splits a `pos[/uv[/normal]]` face token into resolved position and uv
/// indices. The normal reference is tolerated but discarded.
fn parse_face_vertex(
    token: &str,
    pos_count: usize,
    uv_count: usize,
    line_no: usize,
) -> std::result::Result<(usize, Option<usize>), String> {
    let mut split = token.split('/');
    let pos = split
        .next()
        .ok_or_else(|| format!("malformed face element '{}' on line {}", token, line_no + 1))?;
    let pos_idx = resolve_index(pos, pos_count, line_no)?;

    let uv_idx = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, uv_count, line_no)?),
        _ => None,
    };

    Ok((pos_idx, uv_idx))
}

/// OBJ indices are 1-based; negative values count back from the end of the
/// list parsed so far.
fn resolve_index(
    token: &str,
    len: usize,
    line_no: usize,
) -> std::result::Result<usize, String> {
    let raw = token
        .parse::<i64>()
        .map_err(|_| format!("invalid index '{}' on line {}", token, line_no + 1))?;
    if raw == 0 {
        return Err(format!("index 0 on line {} (indices are 1-based)", line_no + 1));
    }

    let idx = if raw > 0 {
        raw - 1
    } else {
        len as i64 + raw
    };

    if idx < 0 || idx as usize >= len {
        return Err(format!(
            "index {} out of bounds (have {}) on line {}",
            raw,
            len,
            line_no + 1
        ));
    }

    Ok(idx as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_OBJ: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
f 1/1 2/2 3/3
";

    #[test]
    fn test_parse_simple_triangle() {
        let mesh = parse_obj(TRIANGLE_OBJ, false).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices.len(), 3);
        assert_eq!(mesh.vertices[1].position.x, 1.0);
        assert_eq!(mesh.vertices[2].uv.y, 1.0);
    }

    #[test]
    fn test_shared_references_are_deduplicated() {
        let src = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3
f 1 3 4
";
        let mesh = parse_obj(src, false).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_quads_are_fan_triangulated() {
        let src = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 1.0 1.0 0.0
v 0.0 1.0 0.0
f 1 2 3 4
";
        let mesh = parse_obj(src, false).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn test_negative_indices_count_from_the_end() {
        let src = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f -3 -2 -1
";
        let mesh = parse_obj(src, false).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_flip_uvs_mirrors_v() {
        let flipped = parse_obj(TRIANGLE_OBJ, true).unwrap();
        let straight = parse_obj(TRIANGLE_OBJ, false).unwrap();
        for (a, b) in flipped.vertices.iter().zip(straight.vertices.iter()) {
            assert_eq!(a.uv.x, b.uv.x);
            assert_eq!(a.uv.y, 1.0 - b.uv.y);
            assert_eq!(a.position, b.position);
        }
    }

    #[test]
    fn test_missing_uv_defaults_to_origin() {
        let src = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
f 1 2 3
";
        let mesh = parse_obj(src, false).unwrap();
        assert!(mesh.vertices.iter().all(|v| v.uv.x == 0.0 && v.uv.y == 0.0));
    }

    #[test]
    fn test_normal_references_are_tolerated() {
        let src = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vn 0.0 0.0 1.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
f 1/1/1 2/2/1 3/3/1
";
        let mesh = parse_obj(src, false).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
    }

    #[test]
    fn test_out_of_range_face_index_is_an_error() {
        let src = "\
v 0.0 0.0 0.0
f 1 2 3
";
        assert!(parse_obj(src, false).is_err());
    }

    #[test]
    fn test_empty_model_is_an_error() {
        assert!(parse_obj("# nothing here\n", false).is_err());
        assert!(parse_obj("v 0 0 0\n", false).is_err());
    }

    #[test]
    fn test_malformed_coordinate_is_an_error() {
        let err = parse_obj("v 0.0 oops 0.0\n", false).unwrap_err();
        assert!(err.contains("line 1"));
    }

    #[test]
    fn test_missing_file_reports_import_error() {
        let result = load_obj("definitely/not/here.obj", false);
        assert!(matches!(result, Err(Error::Import { .. })));
    }
}
