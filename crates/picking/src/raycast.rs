//! Ray queries against the pick world.

use crate::PickWorld;
use glam::Vec3;
use rapier3d::prelude::*;

impl PickWorld {
    /// Whether the ray hits any collider at all.
    pub fn intersects(&self, origin: Vec3, direction: Vec3) -> bool {
        if direction.length_squared() <= f32::EPSILON {
            return false;
        }
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );
        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                Real::MAX,
                true,
                QueryFilter::default(),
            )
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit cube centred at the origin.
    fn cube() -> (Vec<Vec3>, Vec<[u32; 3]>) {
        let v = vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        #[rustfmt::skip]
        let t = vec![
            [0, 2, 1], [0, 3, 2], // back
            [4, 5, 6], [4, 6, 7], // front
            [0, 1, 5], [0, 5, 4], // bottom
            [3, 7, 6], [3, 6, 2], // top
            [0, 4, 7], [0, 7, 3], // left
            [1, 2, 6], [1, 6, 5], // right
        ];
        (v, t)
    }

    fn cube_world() -> PickWorld {
        let (v, t) = cube();
        let mut world = PickWorld::new();
        world.add_trimesh(&v, &t).unwrap();
        world
    }

    #[test]
    fn ray_towards_cube_hits() {
        let world = cube_world();
        assert!(world.intersects(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0)));
        assert!(world.intersects(Vec3::new(0.4, 0.4, 5.0), Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn ray_away_from_cube_misses() {
        let world = cube_world();
        assert!(!world.intersects(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0)));
        assert!(!world.intersects(Vec3::new(0.0, 3.0, 5.0), Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn unnormalized_direction_still_hits() {
        let world = cube_world();
        assert!(world.intersects(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -0.001)));
    }

    #[test]
    fn zero_direction_never_hits() {
        let world = cube_world();
        assert!(!world.intersects(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO));
    }

    #[test]
    fn empty_world_never_hits() {
        let world = PickWorld::new();
        assert!(!world.intersects(Vec3::ZERO, Vec3::Z));
    }
}
