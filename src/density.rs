//! Density and pressure. Density is a poly6-weighted mass sum over the bin cluster; pressure
//! follows from a linear equation of state.

use rayon::prelude::*;

use crate::{
    bins::{BinGrid, BinTable},
    config::Config,
    kernels::Kernels,
    particle::Particle,
};

/// Squared pair distance, stretched by the larger of the two repel factors.
pub(crate) fn effective_dist_sq(p_i: &Particle, p_j: &Particle) -> f64 {
    let repel = p_i.repel_factor.max(p_j.repel_factor);
    (p_j.posit - p_i.posit).magnitude_squared() * repel * repel
}

/// Density at particle `i`, from its own neighbor query. Includes the self term, so this is
/// positive for any particle with positive mass, even with no neighbors.
pub fn density_at(
    i: usize,
    particles: &[Particle],
    bins: &BinTable,
    grid: &BinGrid,
    kernels: &Kernels,
) -> f64 {
    let p_i = &particles[i];
    let mut result = p_i.mass * kernels.self_weight();

    for j in bins.neighbors(grid, p_i.posit) {
        if j == i {
            continue;
        }
        let p_j = &particles[j];
        if !p_j.active {
            continue;
        }

        let r_sq = effective_dist_sq(p_i, p_j);
        if r_sq < kernels.h_sq {
            result += p_j.mass * kernels.poly6_weight(r_sq);
        }
    }

    result
}

/// Update density and pressure for every active particle. All densities are computed against
/// the same particle state before any are written back.
pub fn compute(
    particles: &mut [Particle],
    bins: &BinTable,
    grid: &BinGrid,
    cfg: &Config,
    kernels: &Kernels,
) {
    let densities: Vec<f64> = {
        let particles = &*particles;
        particles
            .par_iter()
            .enumerate()
            .map(|(i, p)| {
                if p.active {
                    density_at(i, particles, bins, grid, kernels)
                } else {
                    p.density
                }
            })
            .collect()
    };

    for (p, density) in particles.iter_mut().zip(densities) {
        if !p.active {
            continue;
        }
        p.density = density;
        p.pressure = cfg.gas_constant * (density - cfg.rest_density);
    }
}
