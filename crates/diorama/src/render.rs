//! GPU frame sink backed by the wgpu renderer.

use crate::frame::FrameSink;
use crate::scene::{part_material, SceneContext};
use anyhow::Result;
use engine_core::{Material, MeshInstance, Transform};
use glam::Mat4;
use renderer::{DrawItem, ImageData, InstanceData, MeshData, ModelData, ModelPart, Renderer};

pub struct SceneGpu {
    pub renderer: Renderer,
}

impl SceneGpu {
    pub fn new(renderer: Renderer) -> Self {
        Self { renderer }
    }
}

fn draw_item(matrix: Mat4, mesh: &MeshInstance, material: &Material) -> DrawItem {
    DrawItem {
        mesh_id: mesh.mesh_id,
        texture_id: material.texture_id,
        surface: material.surface,
        instance: InstanceData::new(matrix.to_cols_array_2d(), material.base_color)
            .with_uv_offset(material.uv_offset.to_array())
            .unlit(material.unlit),
    }
}

/// Draw list for the decor world plus the interactive model.
pub fn collect_draws(ctx: &SceneContext) -> Vec<DrawItem> {
    let mut items: Vec<DrawItem> = ctx
        .world
        .query::<(&Transform, &MeshInstance, &Material)>()
        .iter()
        .map(|(_, (transform, mesh, material))| draw_item(transform.to_matrix(), mesh, material))
        .collect();

    if let Some(model) = &ctx.interactive {
        let matrix = model.transform().to_matrix();
        items.extend(
            model
                .parts
                .iter()
                .map(|part| draw_item(matrix, &MeshInstance::new(part.mesh_id), &part_material(part))),
        );
    }
    items
}

impl FrameSink for SceneGpu {
    fn upload_mesh(&mut self, mesh: &MeshData) -> u32 {
        self.renderer.upload_mesh(mesh)
    }

    fn upload_model(&mut self, model: &ModelData) -> Vec<ModelPart> {
        self.renderer.upload_model(model)
    }

    fn upload_texture(&mut self, image: &ImageData) -> u32 {
        self.renderer.upload_texture(image)
    }

    fn upload_particles(&mut self, positions: &[f32]) {
        self.renderer.upload_particles(positions);
    }

    fn draw_frame(&mut self, ctx: &SceneContext) -> Result<()> {
        self.renderer.update_camera(&ctx.camera, &ctx.atmosphere);
        let items = collect_draws(ctx);

        let mut frame = match self.renderer.begin_frame() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.renderer.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                anyhow::bail!("GPU out of memory");
            }
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                return Ok(());
            }
        };
        self.renderer.render_scene(&mut frame, &items);
        self.renderer.end_frame(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DioramaConfig;
    use crate::frame::tests::RecordingSink;
    use crate::hover::InteractiveModel;
    use crate::scene::SceneComposer;
    use engine_core::Surface;
    use glam::Vec3;
    use picking::PickWorld;

    #[test]
    fn draws_cover_decor_and_interactive_parts() {
        let mut config = DioramaConfig::default();
        config.particles.particle_count = 1;
        let mut sink = RecordingSink::default();
        let mut ctx = SceneComposer::compose(&config, &mut sink);
        assert_eq!(collect_draws(&ctx).len(), 2);

        let part = ModelPart {
            mesh_id: 7,
            texture_id: Some(3),
            base_color: [0.5, 0.5, 0.5, 1.0],
            translucent: true,
        };
        ctx.interactive = Some(InteractiveModel::new(
            "suit",
            Vec3::new(1.0, 2.0, 3.0),
            0.5,
            0.6,
            vec![part],
            PickWorld::new(),
        ));

        let items = collect_draws(&ctx);
        assert_eq!(items.len(), 3);
        let suit = items.iter().find(|d| d.mesh_id == 7).unwrap();
        assert_eq!(suit.texture_id, Some(3));
        assert_eq!(suit.surface, Surface::Translucent { depth_write: true });
        assert_eq!(suit.instance.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(suit.instance.model[0][0], 0.5);
        assert_eq!(suit.instance.params[2], 0.0);
    }

    #[test]
    fn fog_sheet_draws_unlit() {
        let mut config = DioramaConfig::default();
        config.particles.particle_count = 1;
        let mut sink = RecordingSink::default();
        let ctx = SceneComposer::compose(&config, &mut sink);
        let fog = ctx.find("ground_fog").unwrap();
        let items = collect_draws(&ctx);
        let fog_y = ctx.world.get::<&Transform>(fog).unwrap().position.y;
        let item = items.iter().find(|d| d.instance.model[3][1] == fog_y).unwrap();
        assert_eq!(item.instance.params[2], 1.0);
        assert!((item.instance.color[3] - 0.6).abs() < 1e-6);
    }
}
