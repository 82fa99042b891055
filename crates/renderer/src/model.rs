//! glTF scene import into CPU-side mesh data.

use crate::error::AssetError;
use crate::mesh::MeshData;
use crate::texture::ImageData;
use crate::vertex::Vertex;
use glam::{Mat4, Vec3};
use std::collections::HashMap;
use std::path::Path;

/// One drawable piece of an imported model, already in model root space.
#[derive(Debug, Clone)]
pub struct PrimitiveData {
    pub mesh: MeshData,
    pub base_color: [f32; 4],
    /// Index into `ModelData::images`.
    pub texture: Option<usize>,
    pub translucent: bool,
}

/// An imported glTF scene flattened into primitives.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub name: String,
    pub primitives: Vec<PrimitiveData>,
    pub images: Vec<ImageData>,
}

impl ModelData {
    /// Import a `.gltf` or `.glb` file.
    ///
    /// Node transforms are baked into the vertices so the result is expressed
    /// relative to the scene root. Only triangle-list primitives are kept.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let (document, buffers, images) = gltf::import(path).map_err(|source| AssetError::Gltf {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut model = ModelData {
            name,
            ..Default::default()
        };
        let mut image_slots: HashMap<usize, Option<usize>> = HashMap::new();

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next());
        let Some(scene) = scene else {
            return Err(AssetError::NoGeometry(path.to_path_buf()));
        };

        let mut stack: Vec<(gltf::Node, Mat4)> =
            scene.nodes().map(|n| (n, Mat4::IDENTITY)).collect();
        while let Some((node, parent)) = stack.pop() {
            let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
            if let Some(mesh) = node.mesh() {
                for primitive in mesh.primitives() {
                    if primitive.mode() != gltf::mesh::Mode::Triangles {
                        log::debug!("{}: skipping {:?} primitive", model.name, primitive.mode());
                        continue;
                    }
                    let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| d.0.as_slice()));
                    let Some(positions) = reader.read_positions() else {
                        continue;
                    };
                    let positions: Vec<[f32; 3]> = positions.collect();
                    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
                    let uvs: Option<Vec<[f32; 2]>> =
                        reader.read_tex_coords(0).map(|t| t.into_f32().collect());
                    let indices: Vec<u32> = match reader.read_indices() {
                        Some(i) => i.into_u32().collect(),
                        None => (0..positions.len() as u32).collect(),
                    };
                    if indices.len() < 3 {
                        continue;
                    }

                    let vertices = positions
                        .iter()
                        .enumerate()
                        .map(|(i, p)| {
                            let normal = normals.as_ref().and_then(|n| n.get(i)).copied();
                            let uv = uvs.as_ref().and_then(|t| t.get(i)).copied();
                            Vertex::new(*p, normal.unwrap_or([0.0; 3]), uv.unwrap_or([0.0; 2]))
                        })
                        .collect();
                    let mut data = MeshData { vertices, indices };
                    if normals.is_none() {
                        compute_normals(&mut data);
                    }

                    let material = primitive.material();
                    let pbr = material.pbr_metallic_roughness();
                    let texture = pbr.base_color_texture().and_then(|info| {
                        let source = info.texture().source().index();
                        *image_slots.entry(source).or_insert_with(|| {
                            let image = images.get(source)?;
                            match convert_image(image) {
                                Ok(img) => {
                                    model.images.push(img);
                                    Some(model.images.len() - 1)
                                }
                                Err(format) => {
                                    log::warn!(
                                        "{}: {}",
                                        path.display(),
                                        AssetError::UnsupportedPixels {
                                            path: path.to_path_buf(),
                                            format,
                                        }
                                    );
                                    None
                                }
                            }
                        })
                    });

                    model.primitives.push(PrimitiveData {
                        mesh: data.transformed(world),
                        base_color: pbr.base_color_factor(),
                        texture,
                        translucent: material.alpha_mode() == gltf::material::AlphaMode::Blend,
                    });
                }
            }
            stack.extend(node.children().map(|c| (c, world)));
        }

        if model.primitives.is_empty() {
            return Err(AssetError::NoGeometry(path.to_path_buf()));
        }
        log::debug!(
            "Imported {} ({} primitives, {} triangles)",
            model.name,
            model.primitives.len(),
            model.triangle_count()
        );
        Ok(model)
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(|p| p.mesh.triangle_count()).sum()
    }

    /// One pick mesh per primitive.
    pub fn pick_meshes(&self) -> Vec<(Vec<Vec3>, Vec<[u32; 3]>)> {
        self.primitives.iter().map(|p| p.mesh.pick_geometry()).collect()
    }
}

fn convert_image(image: &gltf::image::Data) -> Result<ImageData, gltf::image::Format> {
    use gltf::image::Format;
    let rgba = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        Format::R8G8 => image
            .pixels
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
        other => return Err(other),
    };
    Ok(ImageData {
        width: image.width,
        height: image.height,
        rgba,
    })
}

/// Smooth normals from face normals, for primitives that ship without them.
fn compute_normals(data: &mut MeshData) {
    let mut acc = vec![Vec3::ZERO; data.vertices.len()];
    for tri in data.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (Some(pa), Some(pb), Some(pc)) =
            (data.vertices.get(a), data.vertices.get(b), data.vertices.get(c))
        else {
            continue;
        };
        let n = (Vec3::from(pb.position) - Vec3::from(pa.position))
            .cross(Vec3::from(pc.position) - Vec3::from(pa.position));
        acc[a] += n;
        acc[b] += n;
        acc[c] += n;
    }
    for (v, n) in data.vertices.iter_mut().zip(acc) {
        v.normal = n.normalize_or(Vec3::Y).into();
    }
}
