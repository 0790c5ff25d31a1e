/// Mesh loading - glTF file to a flat vertex list
///
/// Indices are unrolled into a plain triangle list (the pipeline draws
/// without an index buffer), normals pass through, and every vertex gets
/// the same red color the way the original scene shades its players.

use std::path::Path;

use prism_3d_engine::prism3d::{Result, Error};
use prism_3d_engine::prism3d::render::BasicVertex;
use prism_3d_engine::{engine_error, engine_info};

const VERTEX_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

/// Load every mesh primitive of a glTF file into one vertex list
pub fn load_model(path: &Path) -> Result<Vec<BasicVertex>> {
    let (document, buffers, _images) = gltf::import(path).map_err(|e| {
        engine_error!("prism3d::demo", "Failed to load glTF '{}': {}", path.display(), e);
        Error::InvalidResource(format!("Failed to load glTF '{}': {}", path.display(), e))
    })?;

    let mut vertices = Vec::new();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or_else(|| {
                    engine_error!(
                        "prism3d::demo",
                        "glTF '{}' has a primitive without POSITION data",
                        path.display()
                    );
                    Error::InvalidResource(format!(
                        "glTF '{}' has a primitive without POSITION data",
                        path.display()
                    ))
                })?
                .collect();
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .ok_or_else(|| {
                    engine_error!(
                        "prism3d::demo",
                        "glTF '{}' has a primitive without NORMAL data",
                        path.display()
                    );
                    Error::InvalidResource(format!(
                        "glTF '{}' has a primitive without NORMAL data",
                        path.display()
                    ))
                })?
                .collect();

            // Unroll indices; an unindexed primitive is taken in order
            let indices: Vec<u32> = match reader.read_indices() {
                Some(read_indices) => read_indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            for index in indices {
                let index = index as usize;
                if index >= positions.len() || index >= normals.len() {
                    engine_error!(
                        "prism3d::demo",
                        "glTF '{}' has an index out of range ({})",
                        path.display(),
                        index
                    );
                    return Err(Error::InvalidResource(format!(
                        "glTF '{}' has an index out of range",
                        path.display()
                    )));
                }
                vertices.push(BasicVertex {
                    pos: positions[index],
                    color: VERTEX_COLOR,
                    normal: normals[index],
                });
            }
        }
    }

    if vertices.is_empty() {
        engine_error!("prism3d::demo", "glTF '{}' contains no triangles", path.display());
        return Err(Error::InvalidResource(format!(
            "glTF '{}' contains no triangles",
            path.display()
        )));
    }

    engine_info!(
        "prism3d::demo",
        "Loaded glTF '{}': {} vertices",
        path.display(),
        vertices.len()
    );
    Ok(vertices)
}
