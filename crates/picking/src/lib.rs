//! Ray picking against triangle meshes, backed by Rapier3D's query pipeline.

pub mod pick_world;
pub mod raycast;

pub use pick_world::*;
pub use raycast::*;

pub use rapier3d::prelude::ColliderHandle;
