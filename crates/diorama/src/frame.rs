//! The per-frame driver.

use crate::assets::AssetLoader;
use crate::hover::HoverProbe;
use crate::scene::{SceneComposer, SceneContext};
use anyhow::Result;
use engine_core::{Material, TextureDrift, Time};
use renderer::{ImageData, MeshData, ModelData, ModelPart};
use std::time::Duration;

/// Where a frame's output goes. The GPU implementation lives in `render`.
pub trait FrameSink {
    fn upload_mesh(&mut self, mesh: &MeshData) -> u32;
    fn upload_model(&mut self, model: &ModelData) -> Vec<ModelPart>;
    fn upload_texture(&mut self, image: &ImageData) -> u32;
    fn upload_particles(&mut self, positions: &[f32]);
    /// Render the scene. An error here is fatal for the loop.
    fn draw_frame(&mut self, ctx: &SceneContext) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Running,
    Stopped,
}

/// What the host should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Request the next redraw.
    Continue,
    Stopped,
}

/// Drives one frame at a time: assets, snow, hover, decor animation, draw.
pub struct FrameLoop {
    state: FrameState,
    time: Time,
    hover: HoverProbe,
    loader: AssetLoader,
}

impl FrameLoop {
    pub fn new(loader: AssetLoader) -> Self {
        Self {
            state: FrameState::Running,
            time: Time::new(),
            hover: HoverProbe::new(),
            loader,
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Leave the loop for good. There is no way back to `Running`.
    pub fn stop(&mut self) {
        if self.state == FrameState::Running {
            log::info!("Frame loop stopped after {} frames", self.time.frame_count());
        }
        self.state = FrameState::Stopped;
    }

    /// Run one frame against the wall clock.
    pub fn tick(&mut self, ctx: &mut SceneContext, sink: &mut dyn FrameSink) -> Result<TickOutcome> {
        if self.state == FrameState::Stopped {
            return Ok(TickOutcome::Stopped);
        }
        self.time.update();
        self.step(ctx, sink)
    }

    /// Run one frame with an explicit time step.
    pub fn tick_by(
        &mut self,
        delta: Duration,
        ctx: &mut SceneContext,
        sink: &mut dyn FrameSink,
    ) -> Result<TickOutcome> {
        if self.state == FrameState::Stopped {
            return Ok(TickOutcome::Stopped);
        }
        self.time.advance(delta);
        self.step(ctx, sink)
    }

    fn step(&mut self, ctx: &mut SceneContext, sink: &mut dyn FrameSink) -> Result<TickOutcome> {
        let t = self.time.elapsed_seconds();

        for event in self.loader.drain() {
            SceneComposer::install(event, ctx, sink);
        }

        ctx.particles.update(t);

        // Hover must see the pose that is about to be drawn.
        ctx.camera.update();
        self.hover
            .evaluate(&ctx.pointer, &ctx.camera, ctx.interactive.as_mut());

        for (_, (material, drift)) in ctx.world.query_mut::<(&mut Material, &TextureDrift)>() {
            material.uv_offset = drift.offset_at(t);
        }

        if ctx.particles.take_dirty() {
            sink.upload_particles(ctx.particles.positions());
        }
        sink.draw_frame(ctx)?;
        Ok(TickOutcome::Continue)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::DioramaConfig;
    use crate::hover::InteractiveModel;
    use crate::scene::SceneComposer;
    use glam::Vec3;
    use input::PointerState;
    use picking::PickWorld;

    /// Counts uploads and records the order of frame calls.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub meshes: u32,
        pub textures: u32,
        pub particle_uploads: Vec<Vec<f32>>,
        pub calls: Vec<&'static str>,
        /// Interactive scale seen by each draw.
        pub drawn_scales: Vec<Option<f32>>,
        pub fail_draw: bool,
    }

    impl FrameSink for RecordingSink {
        fn upload_mesh(&mut self, _mesh: &MeshData) -> u32 {
            self.meshes += 1;
            self.meshes - 1
        }

        fn upload_model(&mut self, model: &ModelData) -> Vec<ModelPart> {
            model
                .primitives
                .iter()
                .map(|p| ModelPart {
                    mesh_id: self.upload_mesh(&p.mesh),
                    texture_id: None,
                    base_color: p.base_color,
                    translucent: p.translucent,
                })
                .collect()
        }

        fn upload_texture(&mut self, _image: &ImageData) -> u32 {
            self.textures += 1;
            self.textures
        }

        fn upload_particles(&mut self, positions: &[f32]) {
            self.calls.push("particles");
            self.particle_uploads.push(positions.to_vec());
        }

        fn draw_frame(&mut self, ctx: &SceneContext) -> Result<()> {
            self.calls.push("draw");
            self.drawn_scales
                .push(ctx.interactive.as_ref().map(|m| m.scale()));
            if self.fail_draw {
                anyhow::bail!("device lost");
            }
            Ok(())
        }
    }

    fn setup() -> (FrameLoop, SceneContext, RecordingSink) {
        let mut config = DioramaConfig::default();
        config.particles.particle_count = 8;
        config.particles.seed = Some(1);
        let mut sink = RecordingSink::default();
        let ctx = SceneComposer::compose(&config, &mut sink);
        (FrameLoop::new(AssetLoader::new()), ctx, sink)
    }

    fn cube_pick() -> PickWorld {
        let h = 500.0;
        let v: Vec<Vec3> = (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { -h } else { h },
                    if i & 2 == 0 { -h } else { h },
                    if i & 4 == 0 { -h } else { h },
                )
            })
            .collect();
        #[rustfmt::skip]
        let t = [
            [0, 1, 3], [0, 3, 2], [4, 6, 7], [4, 7, 5],
            [0, 4, 5], [0, 5, 1], [2, 3, 7], [2, 7, 6],
            [0, 2, 6], [0, 6, 4], [1, 5, 7], [1, 7, 3],
        ];
        let mut pick = PickWorld::new();
        pick.add_trimesh(&v, &t).unwrap();
        pick
    }

    #[test]
    fn tick_uploads_particles_then_draws() {
        let (mut frame, mut ctx, mut sink) = setup();
        let outcome = frame
            .tick_by(Duration::from_millis(16), &mut ctx, &mut sink)
            .unwrap();
        assert_eq!(outcome, TickOutcome::Continue);
        assert_eq!(sink.calls, vec!["particles", "draw"]);
        assert_eq!(sink.particle_uploads[0], ctx.particles.positions());
    }

    #[test]
    fn each_tick_advances_the_snow() {
        let (mut frame, mut ctx, mut sink) = setup();
        frame.tick_by(Duration::from_millis(16), &mut ctx, &mut sink).unwrap();
        frame.tick_by(Duration::from_millis(16), &mut ctx, &mut sink).unwrap();
        assert_eq!(sink.particle_uploads.len(), 2);
        assert_ne!(sink.particle_uploads[0], sink.particle_uploads[1]);
    }

    #[test]
    fn stopped_loop_does_nothing() {
        let (mut frame, mut ctx, mut sink) = setup();
        frame.stop();
        let before = ctx.particles.positions().to_vec();
        let outcome = frame
            .tick_by(Duration::from_millis(16), &mut ctx, &mut sink)
            .unwrap();
        assert_eq!(outcome, TickOutcome::Stopped);
        assert_eq!(frame.state(), FrameState::Stopped);
        assert!(sink.calls.is_empty());
        assert_eq!(ctx.particles.positions(), &before[..]);
    }

    #[test]
    fn hover_is_applied_before_the_draw() {
        let (mut frame, mut ctx, mut sink) = setup();
        let position = Vec3::new(5.4, -0.1, 1.7);
        ctx.camera = renderer::OrbitCamera::looking_at(position + Vec3::new(0.0, 0.0, 10.0), position);
        ctx.camera.damping = 0.0;
        ctx.interactive = Some(InteractiveModel::new(
            "suit",
            position,
            0.0014,
            0.0017,
            Vec::new(),
            cube_pick(),
        ));

        ctx.pointer = PointerState::new(0.0, 0.0);
        frame.tick_by(Duration::from_millis(16), &mut ctx, &mut sink).unwrap();
        ctx.pointer = PointerState::new(0.9, -0.9);
        frame.tick_by(Duration::from_millis(16), &mut ctx, &mut sink).unwrap();

        assert_eq!(sink.drawn_scales, vec![Some(0.0017), Some(0.0014)]);
    }

    #[test]
    fn hover_uses_this_frames_camera_pose() {
        let (mut frame, mut ctx, mut sink) = setup();
        let position = Vec3::new(5.4, -0.1, 1.7);
        let aside = position + Vec3::new(3.0, 0.0, 0.0);
        ctx.camera = renderer::OrbitCamera::looking_at(aside + Vec3::new(0.0, 0.0, 10.0), aside);
        ctx.camera.damping = 0.0;
        ctx.interactive = Some(InteractiveModel::new(
            "suit",
            position,
            0.0014,
            0.0017,
            Vec::new(),
            cube_pick(),
        ));
        let mut missed = HoverProbe::new();
        assert_eq!(
            missed.evaluate(&PointerState::new(0.0, 0.0), &ctx.camera, ctx.interactive.as_mut()),
            Some(false)
        );

        // A pan queued this frame brings the model under the screen centre.
        ctx.camera.pan(glam::Vec2::new(290.0, 0.0), 800.0);
        ctx.pointer = PointerState::new(0.0, 0.0);
        frame.tick_by(Duration::from_millis(16), &mut ctx, &mut sink).unwrap();
        assert_eq!(sink.drawn_scales, vec![Some(0.0017)]);
    }

    #[test]
    fn ticks_before_model_loads_draw_without_it() {
        let (mut frame, mut ctx, mut sink) = setup();
        ctx.pointer = PointerState::new(0.0, 0.0);
        frame.tick_by(Duration::from_millis(16), &mut ctx, &mut sink).unwrap();
        assert_eq!(sink.drawn_scales, vec![None]);
    }

    #[test]
    fn smoke_texture_offset_drifts() {
        let (mut frame, mut ctx, mut sink) = setup();
        ctx.world.spawn((Material::default(), TextureDrift::new(0.1, 0.05)));
        frame.tick_by(Duration::from_secs(10), &mut ctx, &mut sink).unwrap();
        let (_, material) = ctx
            .world
            .query_mut::<&Material>()
            .with::<&TextureDrift>()
            .into_iter()
            .next()
            .unwrap();
        let expected = TextureDrift::new(0.1, 0.05).offset_at(10.0);
        assert!((material.uv_offset - expected).length() < 1e-6);
    }

    #[test]
    fn draw_failure_reaches_the_host() {
        let (mut frame, mut ctx, mut sink) = setup();
        sink.fail_draw = true;
        assert!(frame
            .tick_by(Duration::from_millis(16), &mut ctx, &mut sink)
            .is_err());
    }
}
