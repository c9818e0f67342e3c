//! Smoothed-particle hydrodynamics particle records, and the store that owns them.

use lin_alg::f64::Vec3;

/// Densities at or below this are treated as empty space: no dynamic force is integrated, and
/// the particle contributes nothing to its neighbors' forces.
pub const DENSITY_EPS: f64 = 1.0e-9;

/// One simulated fluid element. The domain is 2D; vector `z` components stay 0.
#[derive(Clone, Debug)]
pub struct Particle {
    pub posit: Vec3,
    pub vel: Vec3,
    /// Half-step velocity. Only the leapfrog integrator reads this.
    pub vel_half: Vec3,
    pub force: Vec3,
    /// Local density. Never negative.
    pub density: f64,
    /// `gas_constant * (density - rest_density)`. May be negative.
    pub pressure: f64,
    pub temp: f64,
    /// Read-only copy of `temp` for the heat pass of the current tick.
    pub temp_step_start: f64,
    pub mass: f64,
    pub viscosity: f64,
    /// Scales effective neighbor distance. Above 1 repels less tightly, e.g. gases.
    pub repel_factor: f64,
    /// Opaque substance id, preserved for callers.
    pub element: u32,
    pub active: bool,
    /// Last computed bin. Diagnostics only.
    pub bin_id: Option<usize>,
}

impl Particle {
    pub fn new(posit: Vec3, mass: f64) -> Self {
        Self {
            posit,
            vel: Vec3::new_zero(),
            vel_half: Vec3::new_zero(),
            force: Vec3::new_zero(),
            density: 0.,
            pressure: 0.,
            temp: 0.,
            temp_step_start: 0.,
            mass,
            viscosity: 0.,
            repel_factor: 1.,
            element: 0,
            active: true,
            bin_id: None,
        }
    }

    pub fn with_temp(mut self, temp: f64) -> Self {
        self.temp = temp;
        self.temp_step_start = temp;
        self
    }

    pub fn with_vel(mut self, vel: Vec3) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_viscosity(mut self, viscosity: f64) -> Self {
        self.viscosity = viscosity;
        self
    }

    pub fn momentum(&self) -> Vec3 {
        self.vel * self.mass
    }
}

/// Fixed-capacity particle storage. Slots are never removed, so indices stay valid for bin
/// contents; retiring a particle just clears its `active` flag.
#[derive(Clone, Debug)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    capacity: usize,
}

impl ParticleStore {
    /// `capacity` is raised to the initial particle count if it's lower.
    pub fn new(particles: Vec<Particle>, capacity: usize) -> Self {
        let capacity = capacity.max(particles.len());
        let mut particles = particles;
        particles.reserve_exact(capacity - particles.len());

        Self {
            particles,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_active(&self) -> usize {
        self.particles.iter().filter(|p| p.active).count()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// The slot `spawn` would fill next: the first inactive one, or a new one past the end if
    /// there's room.
    pub fn next_slot(&self) -> Option<usize> {
        if let Some(i) = self.particles.iter().position(|p| !p.active) {
            return Some(i);
        }
        if self.particles.len() < self.capacity {
            return Some(self.particles.len());
        }
        None
    }

    /// Place a particle in the first inactive slot, or append if there's room. Returns its
    /// index, or `None` if the store is full of live particles.
    pub fn spawn(&mut self, mut particle: Particle) -> Option<usize> {
        particle.active = true;

        let i = self.next_slot()?;
        if i == self.particles.len() {
            self.particles.push(particle);
        } else {
            self.particles[i] = particle;
        }
        Some(i)
    }

    pub fn get(&self, i: usize) -> Option<&Particle> {
        self.particles.get(i)
    }

    pub fn deactivate(&mut self, i: usize) {
        if let Some(p) = self.particles.get_mut(i) {
            p.active = false;
            p.bin_id = None;
        }
    }

    pub fn activate(&mut self, i: usize) {
        if let Some(p) = self.particles.get_mut(i) {
            p.active = true;
        }
    }
}
