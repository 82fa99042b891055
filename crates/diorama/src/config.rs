//! Viewer configuration. Loaded from diorama.ron at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistent viewer settings. Every field falls back to its default when
/// missing from `diorama.ron`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DioramaConfig {
    /// Window width in logical pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in logical pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_true")]
    pub vsync: bool,
    #[serde(default)]
    pub particles: ParticleConfig,
    #[serde(default)]
    pub hover: HoverConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub assets: AssetPaths,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub particle_count: usize,
    /// Initial positions are sampled from `[-half_extent, half_extent)` per axis.
    pub half_extent: f32,
    pub drift_rate: f32,
    /// Particles closer than this to the Z axis get parked.
    pub recycle_radius: f32,
    /// X/Y sentinel for parked particles.
    pub park_value: f32,
    /// Fixed seed for a reproducible field; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            particle_count: 200_000,
            half_extent: 50.0,
            drift_rate: 0.005,
            recycle_radius: 5.0,
            park_value: 1000.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverConfig {
    pub rest_scale: f32,
    pub hover_scale: f32,
    /// Where the interactive model stands.
    pub position: [f32; 3],
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            rest_scale: 0.0014,
            hover_scale: 0.0017,
            position: [5.4, -0.1, 1.7],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// 0 disables orbit damping.
    pub damping: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [10.0, 10.0, -10.0],
            target: [0.0, 0.0, 0.0],
            fov_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            damping: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub house_model: PathBuf,
    pub interactive_model: PathBuf,
    pub ground_texture: PathBuf,
    pub smoke_texture: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            house_model: PathBuf::from("asset/abandoned_house_gltf/scene.gltf"),
            interactive_model: PathBuf::from("asset/spacesuit/scene.gltf"),
            ground_texture: PathBuf::from("asset/snowfloor.jpg"),
            smoke_texture: PathBuf::from("asset/smoke.png"),
        }
    }
}

fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_true() -> bool {
    true
}

impl Default for DioramaConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            vsync: default_true(),
            particles: ParticleConfig::default(),
            hover: HoverConfig::default(),
            camera: CameraConfig::default(),
            assets: AssetPaths::default(),
        }
    }
}

impl DioramaConfig {
    /// Load config from `diorama.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("diorama.ron")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: DioramaConfig =
            ron::from_str("(vsync: false, particles: (particle_count: 10, seed: Some(7)))").unwrap();
        assert!(!cfg.vsync);
        assert_eq!(cfg.particles.particle_count, 10);
        assert_eq!(cfg.particles.seed, Some(7));
        assert_eq!(cfg.particles.recycle_radius, 5.0);
        assert_eq!(cfg.hover, HoverConfig::default());
        assert_eq!(cfg.window_width, 1280);
    }

    #[test]
    fn round_trips_through_ron() {
        let mut cfg = DioramaConfig::default();
        cfg.hover.hover_scale = 0.002;
        cfg.camera.damping = 0.0;
        let text = ron::ser::to_string_pretty(&cfg, ron::ser::PrettyConfig::default()).unwrap();
        let back: DioramaConfig = ron::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn garbage_or_missing_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("diorama-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("diorama.ron");
        std::fs::write(&path, "this is not ron (").unwrap();
        assert_eq!(DioramaConfig::load_from(&path), DioramaConfig::default());
        assert_eq!(
            DioramaConfig::load_from(&dir.join("missing.ron")),
            DioramaConfig::default()
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
