//! Code related to the playback of computed snapshots.

use std::{io, path::Path};

use bincode::{Decode, Encode};
use lin_alg::{f32::Vec3 as Vec3f32, f64::Vec3};

use crate::{particle::Particle, util};

/// What a renderer needs from one particle slot.
#[derive(Clone, Debug, Encode, Decode)]
pub struct ParticleSnapshot {
    pub posit: Vec3f32,
    pub temp: f32,
    pub active: bool,
}

impl ParticleSnapshot {
    pub fn new(p: &Particle) -> Self {
        Self {
            posit: vec_to_f32(p.posit),
            temp: p.temp as f32,
            active: p.active,
        }
    }
}

#[derive(Clone, Debug, Encode, Decode)]
pub struct SnapShot {
    pub time: f32,
    /// Ticks completed when this was taken.
    pub tick: usize,
    // To save memory, we store the snapshots as f32; we only need f64 precision
    // during the integration.
    pub particles: Vec<ParticleSnapshot>,
}

impl SnapShot {
    /// Mean and max temperature of the active particles. `None` if there are none.
    pub fn temp_stats(&self) -> Option<(f32, f32)> {
        let mut sum = 0.;
        let mut max = f32::NEG_INFINITY;
        let mut count = 0;

        for p in self.particles.iter().filter(|p| p.active) {
            sum += p.temp;
            max = max.max(p.temp);
            count += 1;
        }

        if count == 0 {
            return None;
        }
        Some((sum / count as f32, max))
    }
}

pub fn vec_to_f32(v: Vec3) -> Vec3f32 {
    Vec3f32::new(v.x as f32, v.y as f32, v.z as f32)
}

pub fn save_snapshots(path: &Path, snapshots: &Vec<SnapShot>) -> io::Result<()> {
    util::save(path, snapshots)
}

pub fn load_snapshots(path: &Path) -> io::Result<Vec<SnapShot>> {
    util::load(path)
}
