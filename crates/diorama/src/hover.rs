//! Pointer hover detection on the interactive model.

use engine_core::Transform;
use glam::Vec3;
use input::PointerState;
use picking::PickWorld;
use renderer::{ModelPart, OrbitCamera};

/// The one scene object that reacts to the pointer.
///
/// Its pick geometry is stored in model root space, so the root transform
/// (including the tiny import scale) never has to be baked into colliders.
#[derive(Debug)]
pub struct InteractiveModel {
    pub name: String,
    transform: Transform,
    rest_scale: f32,
    hover_scale: f32,
    pub parts: Vec<ModelPart>,
    pick: PickWorld,
    hovered: bool,
}

impl InteractiveModel {
    /// Place the model at `position`, unrotated, at rest scale.
    pub fn new(
        name: impl Into<String>,
        position: Vec3,
        rest_scale: f32,
        hover_scale: f32,
        parts: Vec<ModelPart>,
        pick: PickWorld,
    ) -> Self {
        Self {
            name: name.into(),
            transform: Transform::from_position_scale(position, rest_scale),
            rest_scale,
            hover_scale,
            parts,
            pick,
            hovered: false,
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Current uniform scale (rest or hover).
    pub fn scale(&self) -> f32 {
        self.transform.uniform_scale().unwrap_or(self.rest_scale)
    }

    /// Whether a world-space ray touches any part of the model.
    pub fn hit_by(&self, origin: Vec3, direction: Vec3) -> bool {
        let to_local = self.transform.to_matrix().inverse();
        self.pick.intersects(
            to_local.transform_point3(origin),
            to_local.transform_vector3(direction),
        )
    }

    fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
        self.transform.set_uniform_scale(if hovered {
            self.hover_scale
        } else {
            self.rest_scale
        });
    }
}

/// Turns the latest pointer sample into the model's hover state.
#[derive(Debug, Default)]
pub struct HoverProbe;

impl HoverProbe {
    pub fn new() -> Self {
        Self
    }

    /// Cast the pointer ray and set the model's scale to match.
    ///
    /// Returns `None` (and touches nothing) while the model has not loaded.
    pub fn evaluate(
        &mut self,
        pointer: &PointerState,
        camera: &OrbitCamera,
        model: Option<&mut InteractiveModel>,
    ) -> Option<bool> {
        let model = model?;
        let (origin, direction) = camera.screen_ray(pointer.ndc);
        let hovered = model.hit_by(origin, direction);
        let was_hovered = model.is_hovered();
        model.set_hovered(hovered);

        if hovered != was_hovered {
            log::debug!(
                "{} {} (scale {})",
                model.name,
                if hovered { "hovered" } else { "released" },
                model.scale()
            );
        }
        Some(hovered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Box of half-size `h` around the model origin, in model space.
    fn box_pick(h: f32) -> PickWorld {
        let v: Vec<Vec3> = [
            (-1.0, -1.0, -1.0),
            (1.0, -1.0, -1.0),
            (1.0, 1.0, -1.0),
            (-1.0, 1.0, -1.0),
            (-1.0, -1.0, 1.0),
            (1.0, -1.0, 1.0),
            (1.0, 1.0, 1.0),
            (-1.0, 1.0, 1.0),
        ]
        .iter()
        .map(|&(x, y, z)| Vec3::new(x, y, z) * h)
        .collect();
        #[rustfmt::skip]
        let t = [
            [0, 2, 1], [0, 3, 2], [4, 5, 6], [4, 6, 7],
            [0, 1, 5], [0, 5, 4], [3, 7, 6], [3, 6, 2],
            [0, 4, 7], [0, 7, 3], [1, 2, 6], [1, 6, 5],
        ];
        let mut world = PickWorld::new();
        world.add_trimesh(&v, &t).unwrap();
        world
    }

    /// A half-metre box (500 model units at rest scale 0.001), watched from
    /// ten metres down +Z.
    fn scene() -> (OrbitCamera, InteractiveModel) {
        let position = Vec3::new(5.4, -0.1, 1.7);
        let camera = OrbitCamera::looking_at(position + Vec3::new(0.0, 0.0, 10.0), position);
        let model = InteractiveModel::new("suit", position, 0.001, 0.0012, Vec::new(), box_pick(500.0));
        (camera, model)
    }

    #[test]
    fn pointer_on_model_sets_hover_scale() {
        let (camera, mut model) = scene();
        let mut probe = HoverProbe::new();
        let hit = probe.evaluate(&PointerState::new(0.0, 0.0), &camera, Some(&mut model));
        assert_eq!(hit, Some(true));
        assert!(model.is_hovered());
        assert_eq!(model.scale(), 0.0012);
    }

    #[test]
    fn pointer_off_model_restores_rest_scale() {
        let (camera, mut model) = scene();
        let mut probe = HoverProbe::new();
        probe.evaluate(&PointerState::new(0.0, 0.0), &camera, Some(&mut model));
        let hit = probe.evaluate(&PointerState::new(0.9, 0.9), &camera, Some(&mut model));
        assert_eq!(hit, Some(false));
        assert_eq!(model.scale(), 0.001);
        assert_eq!(model.transform().position, Vec3::new(5.4, -0.1, 1.7));
    }

    #[test]
    fn hover_scale_is_not_sticky() {
        let (camera, mut model) = scene();
        let mut probe = HoverProbe::new();
        for _ in 0..3 {
            probe.evaluate(&PointerState::new(0.0, 0.0), &camera, Some(&mut model));
            probe.evaluate(&PointerState::new(-0.95, 0.95), &camera, Some(&mut model));
            assert_eq!(model.scale(), 0.001);
        }
    }

    #[test]
    fn absent_model_is_a_no_op() {
        let (camera, _) = scene();
        let mut probe = HoverProbe::new();
        assert_eq!(probe.evaluate(&PointerState::new(0.0, 0.0), &camera, None), None);
    }

    #[test]
    fn any_part_under_the_pointer_counts() {
        // Part one sits 2-3 m to the side; part two covers the model origin.
        let side: Vec<Vec3> = vec![
            Vec3::new(2000.0, -100.0, 0.0),
            Vec3::new(3000.0, -100.0, 0.0),
            Vec3::new(2500.0, 100.0, 0.0),
        ];
        let centre: Vec<Vec3> = vec![
            Vec3::new(-500.0, -500.0, 0.0),
            Vec3::new(500.0, -500.0, 0.0),
            Vec3::new(0.0, 500.0, 0.0),
        ];
        let tri = [[0u32, 1, 2]];
        let position = Vec3::new(5.4, -0.1, 1.7);
        let camera = OrbitCamera::looking_at(position + Vec3::new(0.0, 0.0, 10.0), position);

        let side_only = PickWorld::from_meshes([(&side[..], &tri[..])]);
        let side_only = InteractiveModel::new("suit", position, 0.001, 0.0012, Vec::new(), side_only);
        let (origin, direction) = camera.screen_ray(PointerState::new(0.0, 0.0).ndc);
        assert!(!side_only.hit_by(origin, direction));

        let both = PickWorld::from_meshes([(&side[..], &tri[..]), (&centre[..], &tri[..])]);
        assert_eq!(both.len(), 2);
        let mut model = InteractiveModel::new("suit", position, 0.001, 0.0012, Vec::new(), both);
        let mut probe = HoverProbe::new();
        let hit = probe.evaluate(&PointerState::new(0.0, 0.0), &camera, Some(&mut model));
        assert_eq!(hit, Some(true));
        assert_eq!(model.scale(), 0.0012);

        probe.evaluate(&PointerState::new(0.9, 0.9), &camera, Some(&mut model));
        assert_eq!(model.scale(), 0.001);
    }

    #[test]
    fn ray_is_tested_in_model_space() {
        let (_, model) = scene();
        // Box spans 0.5 m each way at rest scale.
        let origin = model.transform().position + Vec3::new(0.4, 0.0, 5.0);
        assert!(model.hit_by(origin, Vec3::NEG_Z));
        let origin = model.transform().position + Vec3::new(0.6, 0.0, 5.0);
        assert!(!model.hit_by(origin, Vec3::NEG_Z));
    }
}
