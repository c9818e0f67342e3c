//! Simulation parameters, presets, and validation.

use std::{io, path::Path};

use bincode::{Decode, Encode};

use crate::{error::SimError, util};

#[derive(Clone, Copy, Debug, PartialEq, Default, Encode, Decode)]
pub enum Integrator {
    /// `v += dt * a`, then `x += dt * v`.
    #[default]
    SemiImplicitEuler,
    /// Velocities on half steps; positions on whole steps.
    Leapfrog,
}

/// The axis-aligned simulation domain, `[0, width] x [0, height]`.
#[derive(Clone, Copy, Debug, PartialEq, Encode, Decode)]
pub struct Domain {
    pub width: f64,
    pub height: f64,
}

impl Default for Domain {
    fn default() -> Self {
        Self {
            width: 1.,
            height: 1.,
        }
    }
}

impl Domain {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0. && x <= self.width && y >= 0. && y <= self.height
    }
}

#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct Config {
    /// Kernel support radius (h). Cost grows quadratically with this, via neighbor count.
    pub interaction_radius: f64,
    /// Heat is exchanged between particles closer than this. May exceed `interaction_radius`.
    pub heat_radius: f64,
    pub rest_density: f64,
    /// Bulk modulus in the equation of state.
    pub gas_constant: f64,
    /// Default viscosity coefficient assigned to particles by the layout builders.
    pub viscosity: f64,
    pub thermal_diffusivity: f64,
    /// Signed vertical acceleration scale; negative is down.
    pub gravity: f64,
    /// Cohesion strength. 0 disables the term.
    pub surface_tension: f64,
    /// Should be about `interaction_radius`; the 3x3 neighbor cluster depends on it.
    pub bin_width: f64,
    /// Max particle indices per bin. Entries past this are dropped for the rebuild.
    pub bin_capacity: usize,
    /// Bins searched on each side of a particle's own bin. 1 is a 3x3 cluster.
    pub cluster_reach: usize,
    /// Neighbor lists go stale by up to this many ticks.
    pub bin_rebuild_interval: usize,
    pub heat_interval: usize,
    pub max_temp: f64,
    /// Restitution on wall contact. In [-1, 0).
    pub bound_damping: f64,
    /// Walls are inset by this distance.
    pub bound_epsilon: f64,
    pub integrator: Integrator,
    /// Unit: s. Used by the driver; `tick` takes its own dt.
    pub dt: f64,
    pub num_frames: usize,
    pub ticks_per_frame: usize,
    /// Capture a playback snapshot every this many ticks.
    pub snapshot_ratio: usize,
}

impl Default for Config {
    fn default() -> Self {
        let h = 5.0e-2;

        Self {
            interaction_radius: h,
            heat_radius: h,
            rest_density: 1_000.,
            gas_constant: 1_000.,
            viscosity: 0.1,
            thermal_diffusivity: 5.,
            gravity: -9.8,
            surface_tension: 0.,
            bin_width: h,
            bin_capacity: 32,
            cluster_reach: 1,
            bin_rebuild_interval: 1,
            heat_interval: 1,
            max_temp: 10_000.,
            bound_damping: -0.5,
            bound_epsilon: 1.0e-4,
            integrator: Integrator::SemiImplicitEuler,
            dt: 1.0e-4,
            num_frames: 100,
            ticks_per_frame: 10,
            snapshot_ratio: 10,
        }
    }
}

impl Config {
    pub fn water() -> Self {
        Self::default()
    }

    /// Lighter, less viscous, faster-diffusing medium.
    pub fn gas() -> Self {
        Self {
            rest_density: 1.2,
            gas_constant: 50.,
            viscosity: 0.01,
            thermal_diffusivity: 20.,
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        util::load(path)
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        util::save(path, self)
    }

    /// The largest distance, before repel-factor scaling, that any stage needs neighbors for.
    pub fn max_reach(&self) -> f64 {
        self.interaction_radius.max(self.heat_radius)
    }

    /// How far out from a particle the bin cluster is guaranteed to see.
    pub fn cluster_coverage(&self) -> f64 {
        self.bin_width * self.cluster_reach as f64
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let finite = [
            ("interaction_radius", self.interaction_radius),
            ("heat_radius", self.heat_radius),
            ("rest_density", self.rest_density),
            ("gas_constant", self.gas_constant),
            ("viscosity", self.viscosity),
            ("thermal_diffusivity", self.thermal_diffusivity),
            ("gravity", self.gravity),
            ("surface_tension", self.surface_tension),
            ("bin_width", self.bin_width),
            ("max_temp", self.max_temp),
            ("bound_damping", self.bound_damping),
            ("bound_epsilon", self.bound_epsilon),
            ("dt", self.dt),
        ];
        for (param, val) in finite {
            if !val.is_finite() {
                return Err(SimError::NotFinite { param });
            }
        }

        let positive = [
            ("interaction_radius", self.interaction_radius),
            ("heat_radius", self.heat_radius),
            ("rest_density", self.rest_density),
            ("bin_width", self.bin_width),
            ("max_temp", self.max_temp),
            ("bound_epsilon", self.bound_epsilon),
            ("dt", self.dt),
        ];
        for (param, val) in positive {
            if val <= 0. {
                return Err(SimError::NonPositive { param });
            }
        }

        let non_negative = [
            ("gas_constant", self.gas_constant),
            ("viscosity", self.viscosity),
            ("thermal_diffusivity", self.thermal_diffusivity),
            ("surface_tension", self.surface_tension),
        ];
        for (param, val) in non_negative {
            if val < 0. {
                return Err(SimError::Negative { param });
            }
        }

        if !(-1.0..0.0).contains(&self.bound_damping) {
            return Err(SimError::BoundDamping(self.bound_damping));
        }

        if self.bin_capacity == 0 {
            return Err(SimError::ZeroBinCapacity);
        }
        if self.cluster_reach == 0 {
            return Err(SimError::NonPositive {
                param: "cluster_reach",
            });
        }

        let intervals = [
            ("bin_rebuild_interval", self.bin_rebuild_interval),
            ("heat_interval", self.heat_interval),
            ("ticks_per_frame", self.ticks_per_frame),
            ("snapshot_ratio", self.snapshot_ratio),
        ];
        for (param, val) in intervals {
            if val == 0 {
                return Err(SimError::Interval { param });
            }
        }

        if self.cluster_coverage() < self.max_reach() {
            return Err(SimError::BinTooSmall {
                bin_width: self.bin_width,
                cluster_reach: self.cluster_reach,
                required: self.max_reach(),
            });
        }

        Ok(())
    }
}
