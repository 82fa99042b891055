//! The drifting snow field.

use crate::config::ParticleConfig;
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed-size set of flakes stored as packed xyz floats.
///
/// Flakes are never added or removed. A flake that drifts within
/// `recycle_radius` of the Z axis is parked: its x and y are overwritten with
/// `park_value`, which puts it far outside the view.
#[derive(Debug, Clone)]
pub struct ParticleField {
    positions: Vec<f32>,
    drift_rate: f32,
    recycle_radius: f32,
    park_value: f32,
    dirty: bool,
}

impl ParticleField {
    /// Sample `particle_count` flakes uniformly in the cube of `half_extent`.
    ///
    /// Samples with y <= 0 are dropped and the slot stays at the origin.
    /// An extent that is not a positive finite number yields an all-origin field.
    pub fn new<R: Rng + ?Sized>(config: &ParticleConfig, rng: &mut R) -> Self {
        let h = config.half_extent;
        let samples = (0..config.particle_count).map(|_| {
            if h.is_finite() && h > 0.0 {
                Vec3::new(rng.gen_range(-h..h), rng.gen_range(-h..h), rng.gen_range(-h..h))
            } else {
                Vec3::ZERO
            }
        });
        Self::from_samples(config, samples)
    }

    /// Reproducible field from a fixed seed.
    pub fn from_seed(config: &ParticleConfig, seed: u64) -> Self {
        Self::new(config, &mut StdRng::seed_from_u64(seed))
    }

    /// Seeded when the config names a seed, otherwise from OS entropy.
    pub fn from_config(config: &ParticleConfig) -> Self {
        match config.seed {
            Some(seed) => Self::from_seed(config, seed),
            None => Self::new(config, &mut StdRng::from_entropy()),
        }
    }

    /// Build from explicit samples, applying the same y > 0 filter.
    /// The field has one flake per sample; `particle_count` is ignored.
    pub fn from_samples(config: &ParticleConfig, samples: impl IntoIterator<Item = Vec3>) -> Self {
        let samples = samples.into_iter();
        let mut positions = Vec::with_capacity(samples.size_hint().0 * 3);
        for s in samples {
            if s.y > 0.0 {
                positions.extend_from_slice(&[s.x, s.y, s.z]);
            } else {
                positions.extend_from_slice(&[0.0; 3]);
            }
        }
        Self {
            positions,
            drift_rate: config.drift_rate,
            recycle_radius: config.recycle_radius,
            park_value: config.park_value,
            dirty: true,
        }
    }

    /// Advance every flake to elapsed time `t` (seconds).
    pub fn update(&mut self, t: f32) {
        let t = t as f64;
        let rate = self.drift_rate;
        let r2 = self.recycle_radius * self.recycle_radius;
        for (i, p) in self.positions.chunks_exact_mut(3).enumerate() {
            let phase = t + i as f64;
            p[1] += rate * phase.sin() as f32;
            p[0] += rate * phase.cos() as f32;
            if p[0] * p[0] + p[1] * p[1] < r2 {
                p[0] = self.park_value;
                p[1] = self.park_value;
            }
        }
        self.dirty = true;
    }

    /// Whether positions changed since the last call. Clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    /// Packed xyz floats, ready for upload.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn position(&self, i: usize) -> Option<Vec3> {
        self.positions
            .get(i * 3..i * 3 + 3)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
    }

    /// Parked flakes keep drifting, so this accepts anything within
    /// `recycle_radius` of the parking spot.
    pub fn is_parked(&self, i: usize) -> bool {
        self.position(i).is_some_and(|p| {
            Vec2::new(p.x - self.park_value, p.y - self.park_value).length() < self.recycle_radius
        })
    }

    pub fn parked_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_parked(i)).count()
    }
}
