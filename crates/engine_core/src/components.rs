//! ECS components for static scene decor.

use glam::Vec2;

/// Mesh reference component - links an entity to an uploaded GPU mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshInstance {
    pub mesh_id: u32,
}

impl MeshInstance {
    pub fn new(mesh_id: u32) -> Self {
        Self { mesh_id }
    }
}

/// How a material's fragments combine with what is already on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Surface {
    /// Depth-tested, depth-writing, back faces culled.
    #[default]
    Opaque,
    /// Alpha blended and double sided.
    Translucent { depth_write: bool },
}

/// Surface appearance of a decor mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Linear RGB colour, alpha is the material opacity.
    pub base_color: [f32; 4],
    /// Uploaded texture, or `None` for plain colour.
    pub texture_id: Option<u32>,
    pub surface: Surface,
    /// Skip lighting (flat colour), like a basic material.
    pub unlit: bool,
    /// Texture coordinate offset, animated for drifting fog.
    pub uv_offset: Vec2,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            texture_id: None,
            surface: Surface::Opaque,
            unlit: false,
            uv_offset: Vec2::ZERO,
        }
    }
}

impl Material {
    /// Lit opaque material with the given colour.
    pub fn lit(base_color: [f32; 4]) -> Self {
        Self {
            base_color,
            ..Default::default()
        }
    }

    /// Unlit translucent material (fog sheets).
    pub fn translucent(rgb: [f32; 3], opacity: f32, depth_write: bool) -> Self {
        Self {
            base_color: [rgb[0], rgb[1], rgb[2], opacity],
            surface: Surface::Translucent { depth_write },
            unlit: true,
            ..Default::default()
        }
    }

    pub fn with_texture(mut self, texture_id: Option<u32>) -> Self {
        self.texture_id = texture_id;
        self
    }

    pub fn opacity(&self) -> f32 {
        self.base_color[3]
    }
}

/// Human-readable name for a decor entity (logging and lookups).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Animates a material's texture offset along a slow Lissajous path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDrift {
    /// Offset amplitude in UV units.
    pub amplitude: f32,
    /// Angular rate in radians per second.
    pub rate: f32,
}

impl TextureDrift {
    pub fn new(amplitude: f32, rate: f32) -> Self {
        Self { amplitude, rate }
    }

    /// UV offset at `elapsed` seconds: `(sin(t*rate), cos(t*rate)) * amplitude`.
    pub fn offset_at(&self, elapsed: f32) -> Vec2 {
        let phase = elapsed * self.rate;
        Vec2::new(phase.sin(), phase.cos()) * self.amplitude
    }
}
