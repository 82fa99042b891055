//! Mesh data structures and primitive generation.

use crate::vertex::Vertex;
use glam::{Mat3, Mat4, Vec3};
use wgpu::util::DeviceExt;

/// A GPU mesh with vertex and index buffers.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl Mesh {
    /// Create a mesh from vertex and index data.
    pub fn new(device: &wgpu::Device, vertices: &[Vertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }
}

/// Mesh data before GPU upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Square in the XY plane facing +Z, `width` by `height`, UVs 0..1.
    ///
    /// Rotate by -90 degrees about X to lay it on the ground.
    pub fn plane(width: f32, height: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        let n = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([-hw, -hh, 0.0], n, [0.0, 1.0]),
            Vertex::new([hw, -hh, 0.0], n, [1.0, 1.0]),
            Vertex::new([hw, hh, 0.0], n, [1.0, 0.0]),
            Vertex::new([-hw, hh, 0.0], n, [0.0, 0.0]),
        ];
        let indices = vec![0, 1, 2, 2, 3, 0];
        Self { vertices, indices }
    }

    /// Bake a transform into the vertices. Normals use the inverse transpose.
    pub fn transformed(mut self, matrix: Mat4) -> Self {
        let normal_matrix = Mat3::from_mat4(matrix).inverse().transpose();
        for v in &mut self.vertices {
            v.position = matrix.transform_point3(Vec3::from(v.position)).into();
            v.normal = (normal_matrix * Vec3::from(v.normal))
                .normalize_or_zero()
                .into();
        }
        self
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Positions and triangle list, the shape picking wants.
    pub fn pick_geometry(&self) -> (Vec<Vec3>, Vec<[u32; 3]>) {
        let positions = self.vertices.iter().map(|v| Vec3::from(v.position)).collect();
        let triangles = self
            .indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        (positions, triangles)
    }

    pub fn upload(&self, device: &wgpu::Device) -> Mesh {
        Mesh::new(device, &self.vertices, &self.indices)
    }
}
