use std::{
    fs,
    io::{self, ErrorKind},
    path::Path,
};

use bincode::{config, Decode, Encode};
use crate::particle::Particle;

/// Save to file, using Bincode.
pub fn save<T: Encode>(path: &Path, data: &T) -> io::Result<()> {
    let encoded = bincode::encode_to_vec(data, config::standard())
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;

    fs::write(path, encoded)
}

/// Load from file, using Bincode.
pub fn load<T: Decode<()>>(path: &Path) -> io::Result<T> {
    let bytes = fs::read(path)?;

    let (decoded, _len) = bincode::decode_from_slice(&bytes, config::standard())
        .map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;

    Ok(decoded)
}

/// A time step no larger than `dt_max` that keeps the fastest active particle from crossing more
/// than `scaler` kernel radii per tick. Displacement beyond a bin per tick is what breaks
/// neighbor search, so this also bounds how stale a throttled bin table can get.
pub fn calc_dt_dynamic(particles: &[Particle], h: f64, scaler: f64, dt_max: f64) -> f64 {
    let mut speed_max: f64 = 0.;
    for p in particles.iter().filter(|p| p.active) {
        let speed = p.vel.magnitude();
        if speed > speed_max {
            speed_max = speed;
        }
    }

    if speed_max == 0. || !speed_max.is_finite() {
        return dt_max;
    }

    (scaler * h / speed_max).min(dt_max)
}
