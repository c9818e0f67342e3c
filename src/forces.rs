//! Per-particle force: pressure gradient, viscosity, optional surface tension, and gravity.

use std::f64::consts::TAU;

use lin_alg::f64::Vec3;
use rand::Rng;
use rayon::prelude::*;

use crate::{
    bins::{BinGrid, BinTable},
    config::Config,
    density::effective_dist_sq,
    kernels::Kernels,
    particle::{Particle, DENSITY_EPS},
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ForceReport {
    /// Neighbor pairs inside the kernel radius.
    pub pairs: usize,
    /// Pairs at zero separation, which got a random direction.
    pub degenerate_pairs: usize,
}

/// A uniformly-distributed unit vector. Breaks the tie when two particles share a position.
pub fn random_unit_vec() -> Vec3 {
    let θ = rand::rng().random_range(0.0..TAU);
    Vec3::new(θ.cos(), θ.sin(), 0.)
}

/// Net force on particle `i`. Returns the force, the pair count, and the count of
/// zero-separation pairs.
pub fn force_on(
    i: usize,
    particles: &[Particle],
    bins: &BinTable,
    grid: &BinGrid,
    cfg: &Config,
    kernels: &Kernels,
) -> (Vec3, usize, usize) {
    let p_i = &particles[i];
    let h = kernels.h;

    let mut result = Vec3::new_zero();
    let mut pairs = 0;
    let mut degenerate = 0;

    for j in bins.neighbors(grid, p_i.posit) {
        if j == i {
            continue; // self-interaction.
        }
        let p_j = &particles[j];
        if !p_j.active || p_j.density <= DENSITY_EPS {
            continue;
        }

        let r_sq = effective_dist_sq(p_i, p_j);
        if r_sq >= kernels.h_sq {
            continue;
        }
        pairs += 1;

        let r = r_sq.sqrt();
        let diff = p_j.posit - p_i.posit;
        let dist = diff.magnitude();

        // Unit vec, from i towards j.
        let dir = if dist > 0. {
            diff / dist
        } else {
            degenerate += 1;
            random_unit_vec()
        };

        let h_r = h - r;

        let f_pressure = dir
            * (-p_j.mass * (p_i.pressure + p_j.pressure) / (2. * p_j.density)
                * kernels.spiky_grad
                * h_r
                * h_r);

        let f_visc = (p_j.vel - p_i.vel)
            * (p_j.viscosity * p_j.mass / p_j.density * kernels.visc_lap * h_r);

        result = result + f_pressure + f_visc;

        if cfg.surface_tension > 0. {
            result = result
                + dir * (cfg.surface_tension * p_j.mass * kernels.poly6_weight(r_sq));
        }
    }

    // Scaled by density; integration divides it back out.
    result = result + Vec3::new(0., cfg.gravity * p_i.density, 0.);

    (result, pairs, degenerate)
}

/// Write the net force of every active particle. Reads density and pressure, so the density
/// stage must have finished for all particles first.
pub fn compute(
    particles: &mut [Particle],
    bins: &BinTable,
    grid: &BinGrid,
    cfg: &Config,
    kernels: &Kernels,
) -> ForceReport {
    let forces: Vec<Option<(Vec3, usize, usize)>> = {
        let particles = &*particles;
        particles
            .par_iter()
            .enumerate()
            .map(|(i, p)| {
                if p.active {
                    Some(force_on(i, particles, bins, grid, cfg, kernels))
                } else {
                    None
                }
            })
            .collect()
    };

    let mut report = ForceReport::default();

    for (p, f) in particles.iter_mut().zip(forces) {
        if let Some((force, pairs, degenerate)) = f {
            p.force = force;
            report.pairs += pairs;
            report.degenerate_pairs += degenerate;
        }
    }

    report
}
