//! Main renderer managing wgpu state and rendering.

use crate::{
    camera::{Atmosphere, CameraUniform, OrbitCamera},
    mesh::{Mesh, MeshData},
    model::ModelData,
    pipeline::{
        create_camera_bind_group_layout, create_mesh_pipeline, create_snow_pipeline,
        create_texture_bind_group, create_texture_bind_group_layout,
    },
    texture::{ImageData, Texture},
    vertex::InstanceData,
};
use anyhow::Result;
use engine_core::Surface;
use glam::Vec3;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Texture id that always refers to the 1x1 white texture.
pub const WHITE_TEXTURE: u32 = 0;

const INITIAL_INSTANCES: u32 = 256;

/// One mesh draw for `render_scene`.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub mesh_id: u32,
    pub texture_id: Option<u32>,
    pub surface: Surface,
    pub instance: InstanceData,
}

/// A model primitive after upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPart {
    pub mesh_id: u32,
    pub texture_id: Option<u32>,
    pub base_color: [f32; 4],
    pub translucent: bool,
}

/// An acquired swap chain image and the encoder recording into it.
pub struct Frame {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

struct GpuTexture {
    _texture: Texture,
    bind_group: wgpu::BindGroup,
}

/// Main renderer state.
pub struct Renderer {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    pub window: Arc<Window>,

    // Pipelines
    opaque_pipeline: wgpu::RenderPipeline,
    translucent_pipeline: wgpu::RenderPipeline,
    /// Translucent without depth write (layers that must not hide each other).
    overlay_pipeline: wgpu::RenderPipeline,
    snow_pipeline: wgpu::RenderPipeline,

    // Bind groups and layouts
    camera_bind_group: wgpu::BindGroup,
    camera_buffer: wgpu::Buffer,
    camera_uniform: CameraUniform,
    camera_position: Vec3,
    clear_color: wgpu::Color,
    texture_bind_group_layout: wgpu::BindGroupLayout,

    /// Index 0 is the white fallback.
    textures: Vec<GpuTexture>,
    meshes: Vec<Mesh>,

    // Depth buffer
    depth_texture: Texture,

    // Per-draw instance data, rewritten every frame
    instance_buffer: wgpu::Buffer,
    max_instances: u32,

    // Snow positions, xyz per flake
    particle_buffer: wgpu::Buffer,
    particle_capacity: u64,
    particle_count: u32,
}

impl Renderer {
    /// Create a new renderer for the given window.
    pub async fn new(window: Arc<Window>, vsync: bool) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface
        let surface = instance.create_surface(window.clone())?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find suitable GPU adapter"))?;

        log::info!("Using GPU: {:?}", adapter.get_info().name);

        // Request device
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface reports no texture formats"))?;

        // Mailbox when available for low latency, otherwise plain vsync.
        let present_mode = if vsync {
            surface_caps
                .present_modes
                .iter()
                .find(|m| matches!(m, wgpu::PresentMode::Mailbox))
                .copied()
                .unwrap_or(wgpu::PresentMode::AutoVsync)
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Create camera uniform buffer
        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // Create bind group layouts
        let camera_bind_group_layout = create_camera_bind_group_layout(&device);
        let texture_bind_group_layout = create_texture_bind_group_layout(&device);

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // Default white texture occupies id 0
        let white = Texture::white_pixel(&device, &queue);
        let white_bind_group = create_texture_bind_group(&device, &texture_bind_group_layout, &white);

        let opaque_pipeline = create_mesh_pipeline(
            &device,
            config.format,
            &camera_bind_group_layout,
            &texture_bind_group_layout,
            Surface::Opaque,
        );
        let translucent_pipeline = create_mesh_pipeline(
            &device,
            config.format,
            &camera_bind_group_layout,
            &texture_bind_group_layout,
            Surface::Translucent { depth_write: true },
        );
        let overlay_pipeline = create_mesh_pipeline(
            &device,
            config.format,
            &camera_bind_group_layout,
            &texture_bind_group_layout,
            Surface::Translucent { depth_write: false },
        );
        let snow_pipeline = create_snow_pipeline(&device, config.format, &camera_bind_group_layout);

        let depth_texture =
            Texture::create_depth_texture(&device, config.width, config.height, "Depth Texture");

        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: INITIAL_INSTANCES as u64 * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let particle_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Snow Buffer"),
            size: 12,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            opaque_pipeline,
            translucent_pipeline,
            overlay_pipeline,
            snow_pipeline,
            camera_bind_group,
            camera_buffer,
            camera_uniform,
            camera_position: Vec3::ZERO,
            clear_color: wgpu::Color::BLACK,
            texture_bind_group_layout,
            textures: vec![GpuTexture {
                _texture: white,
                bind_group: white_bind_group,
            }],
            meshes: Vec::new(),
            depth_texture,
            instance_buffer,
            max_instances: INITIAL_INSTANCES,
            particle_buffer,
            particle_capacity: 12,
            particle_count: 0,
        })
    }

    /// Handle window resize.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Texture::create_depth_texture(
                &self.device,
                self.config.width,
                self.config.height,
                "Depth Texture",
            );
        }
    }

    /// Reconfigure the surface at its current size (after `Lost`/`Outdated`).
    pub fn reconfigure(&mut self) {
        self.resize(self.size);
    }

    /// Update camera uniform, fog, lights and the clear colour.
    pub fn update_camera(&mut self, camera: &OrbitCamera, atmosphere: &Atmosphere) {
        self.camera_uniform.update(camera, atmosphere);
        self.camera_position = camera.position();
        let [r, g, b] = atmosphere.background;
        self.clear_color = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        };
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
    }

    /// Upload a mesh and return its id.
    pub fn upload_mesh(&mut self, data: &MeshData) -> u32 {
        self.meshes.push(data.upload(&self.device));
        (self.meshes.len() - 1) as u32
    }

    /// Upload decoded pixels and return a texture id (never `WHITE_TEXTURE`).
    pub fn upload_texture(&mut self, image: &ImageData) -> u32 {
        let texture = Texture::from_image(&self.device, &self.queue, image, "Scene Texture");
        let bind_group =
            create_texture_bind_group(&self.device, &self.texture_bind_group_layout, &texture);
        self.textures.push(GpuTexture {
            _texture: texture,
            bind_group,
        });
        (self.textures.len() - 1) as u32
    }

    /// Upload every primitive of an imported model along with its images.
    pub fn upload_model(&mut self, model: &ModelData) -> Vec<ModelPart> {
        let image_ids: Vec<u32> = model.images.iter().map(|img| self.upload_texture(img)).collect();
        model
            .primitives
            .iter()
            .map(|prim| ModelPart {
                mesh_id: self.upload_mesh(&prim.mesh),
                texture_id: prim.texture.and_then(|i| image_ids.get(i).copied()),
                base_color: prim.base_color,
                translucent: prim.translucent,
            })
            .collect()
    }

    /// Replace the snow positions (xyz triples).
    pub fn upload_particles(&mut self, positions: &[f32]) {
        self.particle_count = (positions.len() / 3) as u32;
        if self.particle_count == 0 {
            return;
        }
        let used = &positions[..self.particle_count as usize * 3];
        let bytes = std::mem::size_of_val(used) as u64;
        if bytes > self.particle_capacity {
            self.particle_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Snow Buffer"),
                size: bytes,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.particle_capacity = bytes;
            log::debug!("Snow buffer grown to {} flakes", self.particle_count);
        }
        self.queue
            .write_buffer(&self.particle_buffer, 0, bytemuck::cast_slice(used));
    }

    /// Begin a new frame, returns the acquired image and encoder.
    pub fn begin_frame(&mut self) -> Result<Frame, wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        Ok(Frame {
            output,
            view,
            encoder,
        })
    }

    /// Record the whole scene: opaque meshes, translucent meshes back to
    /// front, then the snow field.
    pub fn render_scene(&mut self, frame: &mut Frame, items: &[DrawItem]) {
        let mut order: Vec<&DrawItem> = items
            .iter()
            .filter(|item| (item.mesh_id as usize) < self.meshes.len())
            .collect();
        let eye = self.camera_position;
        let depth = |item: &DrawItem| {
            let t = item.instance.model[3];
            Vec3::new(t[0], t[1], t[2]).distance_squared(eye)
        };
        order.sort_by(|a, b| match (a.surface, b.surface) {
            (Surface::Opaque, Surface::Opaque) => std::cmp::Ordering::Equal,
            (Surface::Opaque, _) => std::cmp::Ordering::Less,
            (_, Surface::Opaque) => std::cmp::Ordering::Greater,
            _ => depth(b).total_cmp(&depth(a)),
        });

        let instances: Vec<InstanceData> = order.iter().map(|item| item.instance).collect();
        self.ensure_instance_capacity(instances.len() as u32);
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        for (i, item) in order.iter().enumerate() {
            let pipeline = match item.surface {
                Surface::Opaque => &self.opaque_pipeline,
                Surface::Translucent { depth_write: true } => &self.translucent_pipeline,
                Surface::Translucent { depth_write: false } => &self.overlay_pipeline,
            };
            let texture = item
                .texture_id
                .and_then(|id| self.textures.get(id as usize))
                .unwrap_or(&self.textures[WHITE_TEXTURE as usize]);
            let mesh = &self.meshes[item.mesh_id as usize];
            let i = i as u32;

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(1, &texture.bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.num_indices, 0, i..i + 1);
        }

        if self.particle_count > 0 {
            render_pass.set_pipeline(&self.snow_pipeline);
            render_pass.set_vertex_buffer(0, self.particle_buffer.slice(..));
            render_pass.draw(0..6, 0..self.particle_count);
        }
    }

    /// End frame and present.
    pub fn end_frame(&self, frame: Frame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.output.present();
    }

    fn ensure_instance_capacity(&mut self, needed: u32) {
        if needed <= self.max_instances {
            return;
        }
        let capacity = needed.next_power_of_two();
        self.instance_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: capacity as u64 * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.max_instances = capacity;
    }
}
