//! Rendering system using wgpu for the snowfall diorama.

pub mod camera;
pub mod error;
pub mod mesh;
pub mod model;
pub mod pipeline;
pub mod renderer;
pub mod texture;
pub mod vertex;

pub use camera::*;
pub use error::*;
pub use mesh::*;
pub use model::*;
pub use pipeline::*;
pub use renderer::*;
pub use texture::*;
pub use vertex::*;
