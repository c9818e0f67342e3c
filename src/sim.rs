//! The tick loop. Owns the particles, the bin table, and precomputed kernels, and runs the
//! stages in order: bin rebuild, density and pressure, heat, forces, integration.

use std::time::Instant;

use log::{debug, info, warn};

use crate::{
    bins::{BinGrid, BinTable, RebuildReport},
    config::{Config, Domain},
    density,
    error::SimError,
    forces::{self, ForceReport},
    heat::{self, HeatReport},
    integrate::{self, IntegrateReport},
    kernels::Kernels,
    particle::{Particle, ParticleStore},
    playback::{ParticleSnapshot, SnapShot},
};

/// Log stage timings every this many ticks of `run`.
const BENCH_RATIO: usize = 1_000;

/// What happened during one tick. Ticks don't fail; anything degraded shows up here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub tick: usize,
    /// The tick was refused for an unusable `dt`; nothing advanced.
    pub skipped: bool,
    /// Particles edited into an invalid state since the last tick, and deactivated for it.
    pub rejected: usize,
    /// `None` if bins were reused from an earlier tick.
    pub rebuild: Option<RebuildReport>,
    /// `None` on ticks between heat updates.
    pub heat: Option<HeatReport>,
    pub forces: ForceReport,
    pub integrate: IntegrateReport,
}

impl TickReport {
    /// True if anything was dropped, skipped, or reverted.
    pub fn degraded(&self) -> bool {
        self.skipped
            || self.rejected > 0
            || self.rebuild.map(|r| r.dropped > 0).unwrap_or(false)
            || self.forces.degenerate_pairs > 0
            || self.integrate.zero_density > 0
            || self.integrate.nonfinite_resets > 0
    }
}

pub struct Simulation {
    cfg: Config,
    domain: Domain,
    grid: BinGrid,
    bins: BinTable,
    kernels: Kernels,
    particles: ParticleStore,
    tick_count: usize,
    time_elapsed: f64,
    /// Time since the last heat update.
    heat_dt_accum: f64,
    /// Set when particles are edited between ticks; forces a rebuild on the next tick.
    bins_dirty: bool,
}

fn validate_domain(domain: &Domain, cfg: &Config) -> Result<(), SimError> {
    let min = 2. * cfg.bound_epsilon;
    if !domain.width.is_finite()
        || !domain.height.is_finite()
        || domain.width <= min
        || domain.height <= min
    {
        return Err(SimError::EmptyDomain);
    }
    Ok(())
}

fn validate_particle(
    index: usize,
    p: &Particle,
    domain: &Domain,
    cfg: &Config,
) -> Result<(), SimError> {
    let invalid = |reason| Err(SimError::InvalidParticle { index, reason });

    if !(p.posit.x.is_finite() && p.posit.y.is_finite()) {
        return invalid("position is not finite");
    }
    if !(p.vel.x.is_finite() && p.vel.y.is_finite()) {
        return invalid("velocity is not finite");
    }
    if !p.mass.is_finite() || p.mass <= 0. {
        return invalid("mass must be positive");
    }
    if !p.viscosity.is_finite() || p.viscosity < 0. {
        return invalid("viscosity can't be negative");
    }
    if !p.repel_factor.is_finite() || p.repel_factor <= 0. {
        return invalid("repel factor must be positive");
    }
    // Effective distance is raw distance times the repel factor, so a factor below 1 lets a
    // pair interact from farther than the bin cluster reaches.
    if cfg.max_reach() / p.repel_factor > cfg.cluster_coverage() {
        return invalid("repel factor reaches past the bin cluster");
    }
    if !p.temp.is_finite() || p.temp < 0. || p.temp > cfg.max_temp {
        return invalid("temperature outside [0, max_temp]");
    }
    if !domain.contains(p.posit.x, p.posit.y) {
        return Err(SimError::ParticleOutOfDomain { index });
    }

    Ok(())
}

impl Simulation {
    /// Validate everything, then bin the initial layout. Refuses to start on any bad input.
    pub fn new(layout: Vec<Particle>, bounds: Domain, cfg: Config) -> Result<Self, SimError> {
        let capacity = layout.len();
        Self::with_capacity(layout, bounds, cfg, capacity)
    }

    /// As `new`, but with room to spawn up to `capacity` particles in total.
    pub fn with_capacity(
        layout: Vec<Particle>,
        bounds: Domain,
        cfg: Config,
        capacity: usize,
    ) -> Result<Self, SimError> {
        cfg.validate()?;
        validate_domain(&bounds, &cfg)?;

        for (i, p) in layout.iter().enumerate() {
            validate_particle(i, p, &bounds, &cfg)?;
        }

        let grid = BinGrid::new(&bounds, cfg.bin_width, cfg.cluster_reach);
        let mut bins = BinTable::new(grid.num_bins(), cfg.bin_capacity);
        let kernels = Kernels::new(cfg.interaction_radius);

        let mut particles = ParticleStore::new(layout, capacity);
        for p in particles.as_mut_slice() {
            p.temp_step_start = p.temp;
            p.vel_half = p.vel;
        }

        let report = bins.rebuild(&grid, particles.as_mut_slice());

        info!(
            "Simulation ready: {} particles, {}x{} bins of width {}, capacity {} ({} dropped)",
            particles.len(),
            grid.width_bins,
            grid.height_bins,
            grid.bin_width,
            bins.capacity(),
            report.dropped,
        );

        Ok(Self {
            cfg,
            domain: bounds,
            grid,
            bins,
            kernels,
            particles,
            tick_count: 0,
            time_elapsed: 0.,
            heat_dt_accum: 0.,
            bins_dirty: false,
        })
    }

    /// Deactivate any active particle that no longer passes validation. Only needed after
    /// direct edits through `particles_mut`.
    fn reject_invalid(&mut self) -> usize {
        let mut result = 0;

        for (i, p) in self.particles.as_mut_slice().iter_mut().enumerate() {
            if !p.active {
                continue;
            }
            if let Err(e) = validate_particle(i, p, &self.domain, &self.cfg) {
                warn!("Deactivating edited particle: {e}");
                p.active = false;
                p.bin_id = None;
                result += 1;
            }
        }

        result
    }

    /// Advance by `dt`. A negative or non-finite `dt` is refused: the tick is reported as
    /// skipped and no state changes.
    pub fn tick(&mut self, dt: f64) -> TickReport {
        let mut report = TickReport {
            tick: self.tick_count,
            ..Default::default()
        };

        if !dt.is_finite() || dt < 0. {
            warn!("Tick {}: skipping, unusable dt {dt}", self.tick_count);
            report.skipped = true;
            return report;
        }

        if self.bins_dirty {
            report.rejected = self.reject_invalid();
        }

        let cfg = &self.cfg;
        let particles = self.particles.as_mut_slice();

        if self.bins_dirty || self.tick_count % cfg.bin_rebuild_interval == 0 {
            report.rebuild = Some(self.bins.rebuild(&self.grid, particles));
            self.bins_dirty = false;
        }

        density::compute(particles, &self.bins, &self.grid, cfg, &self.kernels);

        self.heat_dt_accum += dt;
        if (self.tick_count + 1) % cfg.heat_interval == 0 {
            report.heat = Some(heat::compute(
                particles,
                &self.bins,
                &self.grid,
                cfg,
                self.heat_dt_accum,
            ));
            self.heat_dt_accum = 0.;
        }

        report.forces = forces::compute(particles, &self.bins, &self.grid, cfg, &self.kernels);

        let first_step = self.tick_count == 0;
        report.integrate = integrate::integrate(particles, &self.domain, cfg, dt, first_step);

        if report.forces.degenerate_pairs > 0 {
            warn!(
                "Tick {}: {} particle pairs at zero separation",
                self.tick_count, report.forces.degenerate_pairs
            );
        }
        if report.integrate.nonfinite_resets > 0 {
            warn!(
                "Tick {}: {} particles reverted after a non-finite update",
                self.tick_count, report.integrate.nonfinite_resets
            );
        }

        self.tick_count += 1;
        self.time_elapsed += dt;

        report
    }

    /// Position, temperature, and liveness of every slot, for rendering.
    pub fn snapshot(&self) -> Vec<ParticleSnapshot> {
        self.particles
            .as_slice()
            .iter()
            .map(ParticleSnapshot::new)
            .collect()
    }

    /// Run `num_ticks` ticks, capturing a playback snapshot every `snapshot_ratio` of them.
    pub fn run(&mut self, num_ticks: usize, dt: f64, snapshot_ratio: usize) -> Vec<SnapShot> {
        let snapshot_ratio = snapshot_ratio.max(1);
        let mut result = Vec::with_capacity(num_ticks / snapshot_ratio + 1);

        let mut start_time = Instant::now();

        for t in 0..num_ticks {
            if t % BENCH_RATIO == 0 {
                start_time = Instant::now();
            }

            let report = self.tick(dt);

            if t % BENCH_RATIO == 0 {
                debug!(
                    "t: {}k, Tick time: {}μs Pairs: {} Wall hits: {}",
                    t / 1_000,
                    start_time.elapsed().as_micros(),
                    report.forces.pairs,
                    report.integrate.wall_hits,
                );
            }

            if t % snapshot_ratio == 0 {
                result.push(SnapShot {
                    time: self.time_elapsed as f32,
                    tick: self.tick_count,
                    particles: self.snapshot(),
                });
            }
        }

        result
    }

    /// Add a particle between ticks, subject to the same checks as the initial layout. Returns
    /// its slot.
    pub fn spawn(&mut self, mut particle: Particle) -> Result<usize, SimError> {
        let index = self.particles.next_slot().ok_or(SimError::StoreFull {
            capacity: self.particles.capacity(),
        })?;
        validate_particle(index, &particle, &self.domain, &self.cfg)?;

        particle.temp_step_start = particle.temp;
        particle.vel_half = particle.vel;

        let result = self
            .particles
            .spawn(particle)
            .ok_or(SimError::StoreFull {
                capacity: self.particles.capacity(),
            })?;
        self.bins_dirty = true;
        Ok(result)
    }

    /// Bring a retired particle back, as it was when retired. Refused if it's no longer valid,
    /// e.g. after edits while inactive.
    pub fn activate(&mut self, i: usize) -> Result<(), SimError> {
        let p = self
            .particles
            .get(i)
            .ok_or(SimError::NoSuchParticle { index: i })?;
        validate_particle(i, p, &self.domain, &self.cfg)?;

        self.particles.activate(i);
        self.bins_dirty = true;
        Ok(())
    }

    /// Retire a particle. Its slot is skipped by every stage until reused.
    pub fn deactivate(&mut self, i: usize) {
        self.particles.deactivate(i);
        self.bins_dirty = true;
    }

    pub fn particles(&self) -> &[Particle] {
        self.particles.as_slice()
    }

    /// Direct access between ticks. Bins are rebuilt on the next tick, and any active particle
    /// left invalid is deactivated then.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        self.bins_dirty = true;
        self.particles.as_mut_slice()
    }

    pub fn num_active(&self) -> usize {
        self.particles.num_active()
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn bins(&self) -> &BinTable {
        &self.bins
    }

    pub fn grid(&self) -> &BinGrid {
        &self.grid
    }

    pub fn time_elapsed(&self) -> f64 {
        self.time_elapsed
    }

    pub fn tick_count(&self) -> usize {
        self.tick_count
    }
}
