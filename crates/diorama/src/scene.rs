//! Scene composition: decor, camera, lights and asset installation.

use crate::assets::{AssetEvent, AssetKey, AssetLoader, AssetPayload};
use crate::config::{DioramaConfig, HoverConfig};
use crate::frame::FrameSink;
use crate::hover::InteractiveModel;
use crate::particles::ParticleField;
use engine_core::{Material, MeshInstance, Name, Surface, TextureDrift, Transform};
use glam::Vec3;
use input::PointerState;
use picking::PickWorld;
use renderer::{srgb_hex, Atmosphere, MeshData, ModelPart, OrbitCamera};

/// Side length of the ground and fog sheets.
pub const GROUND_SIZE: f32 = 100.0;
pub const GROUND_Y: f32 = -0.1;
pub const GROUND_FOG_Y: f32 = 0.2;
pub const SMOKE_Y: f32 = -0.05;
pub const FOG_OPACITY: f32 = 0.6;
const FOG_HEX: u32 = 0xcccccc;

/// Marks a decor entity whose material waits for a texture load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTexture(pub AssetKey);

/// Everything a frame reads or writes.
pub struct SceneContext {
    /// Static decor: (Name, Transform, MeshInstance, Material) plus extras.
    pub world: hecs::World,
    pub camera: OrbitCamera,
    pub atmosphere: Atmosphere,
    pub particles: ParticleField,
    /// Unset until the interactive model finishes loading.
    pub interactive: Option<InteractiveModel>,
    pub pointer: PointerState,
    hover: HoverConfig,
    /// Shared ground-sized sheet mesh.
    sheet_mesh: u32,
}

impl SceneContext {
    /// Entities carrying a `Name`, looked up by it.
    pub fn find(&self, name: &str) -> Option<hecs::Entity> {
        self.world
            .query::<&Name>()
            .iter()
            .find(|(_, n)| n.0 == name)
            .map(|(e, _)| e)
    }
}

/// Builds the static scene and wires finished assets into it.
pub struct SceneComposer;

impl SceneComposer {
    /// Build the scene that exists before any asset has loaded.
    pub fn compose(config: &DioramaConfig, sink: &mut dyn FrameSink) -> SceneContext {
        let fog = srgb_hex(FOG_HEX);
        let atmosphere = Atmosphere {
            background: fog,
            fog_color: fog,
            fog_density: 0.05,
            ambient_color: [1.0, 1.0, 1.0],
            ambient_intensity: 0.5,
        };

        let cam = &config.camera;
        let mut camera = OrbitCamera::looking_at(Vec3::from(cam.position), Vec3::from(cam.target));
        camera.fov_degrees = cam.fov_degrees;
        camera.near = cam.near;
        camera.far = cam.far;
        camera.damping = cam.damping;
        camera.max_distance = cam.far * 0.9;

        let sheet_mesh = sink.upload_mesh(&MeshData::plane(GROUND_SIZE, GROUND_SIZE));

        let mut world = hecs::World::new();
        world.spawn((
            Name::new("ground"),
            sheet_transform(GROUND_Y),
            MeshInstance::new(sheet_mesh),
            Material::lit([1.0, 1.0, 1.0, 1.0]),
            PendingTexture(AssetKey::GroundTexture),
        ));
        world.spawn((
            Name::new("ground_fog"),
            sheet_transform(GROUND_FOG_Y),
            MeshInstance::new(sheet_mesh),
            Material::translucent(fog, FOG_OPACITY, true),
        ));

        let particles = ParticleField::from_config(&config.particles);
        log::info!(
            "Scene composed: {} snow flakes, {} decor entities",
            particles.len(),
            world.len()
        );

        SceneContext {
            world,
            camera,
            atmosphere,
            particles,
            interactive: None,
            pointer: PointerState::default(),
            hover: config.hover.clone(),
            sheet_mesh,
        }
    }

    /// Kick off every asset load the scene wants.
    pub fn request_assets(config: &DioramaConfig, loader: &AssetLoader) {
        let paths = &config.assets;
        loader.request_model(AssetKey::HouseModel, &paths.house_model, false);
        loader.request_model(AssetKey::InteractiveModel, &paths.interactive_model, true);
        loader.request_texture(AssetKey::GroundTexture, &paths.ground_texture);
        loader.request_texture(AssetKey::SmokeTexture, &paths.smoke_texture);
    }

    /// Upload a finished asset and attach it to the scene.
    pub fn install(event: AssetEvent, ctx: &mut SceneContext, sink: &mut dyn FrameSink) {
        match (event.key, event.payload) {
            (AssetKey::InteractiveModel, AssetPayload::Model { data, pick }) => {
                if ctx.interactive.is_some() {
                    log::warn!("Interactive model already installed, ignoring {}", event.path.display());
                    return;
                }
                let pick = pick.unwrap_or_else(|| {
                    let meshes = data.pick_meshes();
                    PickWorld::from_meshes(meshes.iter().map(|(v, t)| (v.as_slice(), t.as_slice())))
                });
                let parts = sink.upload_model(&data);
                ctx.interactive = Some(InteractiveModel::new(
                    data.name,
                    Vec3::from(ctx.hover.position),
                    ctx.hover.rest_scale,
                    ctx.hover.hover_scale,
                    parts,
                    pick,
                ));
            }
            (AssetKey::HouseModel, AssetPayload::Model { data, .. }) => {
                let parts = sink.upload_model(&data);
                for part in parts {
                    ctx.world.spawn((
                        Name::new(data.name.clone()),
                        Transform::default(),
                        MeshInstance::new(part.mesh_id),
                        part_material(&part),
                    ));
                }
            }
            (AssetKey::GroundTexture, AssetPayload::Texture(image)) => {
                let id = sink.upload_texture(&image);
                resolve_pending(&mut ctx.world, AssetKey::GroundTexture, id);
            }
            (AssetKey::SmokeTexture, AssetPayload::Texture(image)) => {
                let id = sink.upload_texture(&image);
                ctx.world.spawn((
                    Name::new("smoke_fog"),
                    sheet_transform(SMOKE_Y),
                    MeshInstance::new(ctx.sheet_mesh),
                    Material::translucent([1.0, 1.0, 1.0], FOG_OPACITY, false).with_texture(Some(id)),
                    TextureDrift::new(0.1, 0.05),
                ));
            }
            (key, _) => log::warn!("Asset {:?} arrived with the wrong payload kind", key),
        }
    }
}

/// Ground-sized sheet laid flat at height `y`.
fn sheet_transform(y: f32) -> Transform {
    Transform::from_position(Vec3::new(0.0, y, 0.0)).with_euler(-std::f32::consts::FRAC_PI_2, 0.0, 0.0)
}

/// Decor material for an imported model part.
pub fn part_material(part: &ModelPart) -> Material {
    Material {
        surface: if part.translucent {
            Surface::Translucent { depth_write: true }
        } else {
            Surface::Opaque
        },
        ..Material::lit(part.base_color)
    }
    .with_texture(part.texture_id)
}

fn resolve_pending(world: &mut hecs::World, key: AssetKey, texture_id: u32) {
    let waiting: Vec<hecs::Entity> = world
        .query_mut::<(&mut Material, &PendingTexture)>()
        .into_iter()
        .filter(|(_, (_, pending))| pending.0 == key)
        .map(|(e, (material, _))| {
            material.texture_id = Some(texture_id);
            e
        })
        .collect();
    for e in waiting {
        let _ = world.remove_one::<PendingTexture>(e);
    }
}
