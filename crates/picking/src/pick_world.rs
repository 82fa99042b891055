//! Collider storage for pickable geometry.

use glam::Vec3;
use rapier3d::prelude::*;
use thiserror::Error;

/// Reasons a mesh cannot become a pick collider.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PickError {
    #[error("mesh has no triangles")]
    EmptyMesh,
    #[error("triangle index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Set of static triangle-mesh colliders that rays can be cast against.
///
/// There is no simulation here: the rigid-body set stays empty and exists
/// only because Rapier's query pipeline takes one.
pub struct PickWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub query_pipeline: QueryPipeline,
}

impl Default for PickWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PickWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickWorld")
            .field("colliders", &self.collider_set.len())
            .finish()
    }
}

impl PickWorld {
    /// Create an empty pick world.
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Build a world from several meshes, refreshing the query pipeline once.
    /// Meshes that fail validation are skipped with a warning.
    pub fn from_meshes<'a, I>(meshes: I) -> Self
    where
        I: IntoIterator<Item = (&'a [Vec3], &'a [[u32; 3]])>,
    {
        let mut world = Self::new();
        for (vertices, triangles) in meshes {
            match build_trimesh(vertices, triangles) {
                Ok(collider) => {
                    world.collider_set.insert(collider);
                }
                Err(e) => log::warn!("Skipping pick mesh: {}", e),
            }
        }
        world.update_query_pipeline();
        world
    }

    /// Add a triangle-mesh collider and make it immediately queryable.
    pub fn add_trimesh(
        &mut self,
        vertices: &[Vec3],
        triangles: &[[u32; 3]],
    ) -> Result<ColliderHandle, PickError> {
        let collider = build_trimesh(vertices, triangles)?;
        let handle = self.collider_set.insert(collider);
        self.update_query_pipeline();
        Ok(handle)
    }

    /// Update query pipeline for raycasting.
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Number of colliders.
    pub fn len(&self) -> usize {
        self.collider_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collider_set.is_empty()
    }
}

fn build_trimesh(vertices: &[Vec3], triangles: &[[u32; 3]]) -> Result<Collider, PickError> {
    if vertices.is_empty() || triangles.is_empty() {
        return Err(PickError::EmptyMesh);
    }
    if let Some(&index) = triangles
        .iter()
        .flatten()
        .find(|&&i| i as usize >= vertices.len())
    {
        return Err(PickError::IndexOutOfRange {
            index,
            vertex_count: vertices.len(),
        });
    }

    let points: Vec<Point<Real>> = vertices.iter().map(|v| point![v.x, v.y, v.z]).collect();
    Ok(ColliderBuilder::trimesh(points, triangles.to_vec()).build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mesh_is_rejected() {
        let mut world = PickWorld::new();
        assert_eq!(world.add_trimesh(&[], &[]), Err(PickError::EmptyMesh));
        assert_eq!(
            world.add_trimesh(&[Vec3::ZERO, Vec3::X, Vec3::Y], &[]),
            Err(PickError::EmptyMesh)
        );
        assert!(world.is_empty());
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut world = PickWorld::new();
        let err = world
            .add_trimesh(&[Vec3::ZERO, Vec3::X, Vec3::Y], &[[0, 1, 3]])
            .unwrap_err();
        assert_eq!(err, PickError::IndexOutOfRange { index: 3, vertex_count: 3 });
    }

    #[test]
    fn from_meshes_skips_bad_entries() {
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let good: &[[u32; 3]] = &[[0, 1, 2]];
        let bad: &[[u32; 3]] = &[];
        let world = PickWorld::from_meshes([(&tri[..], good), (&tri[..], bad)]);
        assert_eq!(world.len(), 1);
    }
}
