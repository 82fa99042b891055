//! Core engine types and utilities for the snowfall diorama.
//!
//! This crate provides the foundational types used across all systems:
//! - Transform and spatial components
//! - Frame clock
//! - Decor components stored in the ECS world

pub mod components;
pub mod time;
pub mod transform;

pub use components::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use hecs::{Entity, World};
