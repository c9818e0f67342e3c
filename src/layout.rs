//! Initial particle placement. Fluid regions are described by indicator shapes, filled on a
//! regular lattice slightly tighter than the kernel radius so neighbors overlap, then particle
//! mass is scaled so the initial configuration sits near the rest density.

use lin_alg::f64::Vec3;
use rand::Rng;

use crate::{
    bins::{BinGrid, BinTable},
    config::{Config, Domain},
    density,
    kernels::Kernels,
    particle::Particle,
};

/// Lattice spacing is `h / SPACING_DIVISOR`. Close enough to overlap, but not too much.
pub const SPACING_DIVISOR: f64 = 1.3;

/// Substances. The id is stored on each particle as opaque data; the core solver only sees the
/// per-particle coefficients these produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Element {
    Liquid,
    Gas,
}

impl Element {
    pub fn id(&self) -> u32 {
        match self {
            Self::Liquid => 0,
            Self::Gas => 1,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::Liquid),
            1 => Some(Self::Gas),
            _ => None,
        }
    }

    /// Viscosity relative to `Config::viscosity`.
    pub fn viscosity_scaler(&self) -> f64 {
        match self {
            Self::Liquid => 1.,
            Self::Gas => 0.1,
        }
    }

    /// Gases repel less tightly: their effective neighbor distance is stretched.
    pub fn repel_factor(&self) -> f64 {
        match self {
            Self::Liquid => 1.,
            Self::Gas => 1.5,
        }
    }
}

/// An indicator shape; particles are placed at lattice points inside it.
#[derive(Clone, Copy, Debug)]
pub enum Region {
    Whole,
    Rect { min: (f64, f64), max: (f64, f64) },
    Drop { center: (f64, f64), radius: f64 },
}

impl Region {
    /// A block in the lower-left corner, as in a dam break.
    pub fn corner_block(domain: &Domain) -> Self {
        Self::Rect {
            min: (0., 0.),
            max: (domain.width * 0.5, domain.height * 0.75),
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            Self::Whole => true,
            Self::Rect { min, max } => x >= min.0 && x < max.0 && y >= min.1 && y < max.1,
            Self::Drop { center, radius } => {
                let (dx, dy) = (x - center.0, y - center.1);
                dx * dx + dy * dy < radius * radius
            }
        }
    }
}

/// What to fill a region with.
#[derive(Clone, Copy, Debug)]
pub struct Fill {
    pub element: Element,
    pub temp: f64,
    /// Random x offset per particle, as a fraction of the lattice spacing. Breaks up the
    /// perfectly symmetric lattice, which otherwise settles into unphysical columns.
    pub jitter: f64,
}

impl Default for Fill {
    fn default() -> Self {
        Self {
            element: Element::Liquid,
            temp: 0.,
            jitter: 0.,
        }
    }
}

pub fn spacing(cfg: &Config) -> f64 {
    cfg.interaction_radius / SPACING_DIVISOR
}

/// Fill `region` with unit-mass particles on a lattice. Lattice points start half a spacing in
/// from the walls, so nothing starts on a boundary.
pub fn place_particles(domain: &Domain, cfg: &Config, region: Region, fill: Fill) -> Vec<Particle> {
    let hh = spacing(cfg);
    let nx = (domain.width / hh).floor() as usize;
    let ny = (domain.height / hh).floor() as usize;

    let mut rng = rand::rng();
    let mut result = Vec::new();

    for ix in 0..nx {
        for iy in 0..ny {
            let x = (ix as f64 + 0.5) * hh;
            let y = (iy as f64 + 0.5) * hh;
            if !region.contains(x, y) {
                continue;
            }

            let x = if fill.jitter > 0. {
                let offset = rng.random_range(-0.5..0.5) * fill.jitter * hh;
                (x + offset).clamp(cfg.bound_epsilon, domain.width - cfg.bound_epsilon)
            } else {
                x
            };

            let mut p = Particle::new(Vec3::new(x, y, 0.), 1.)
                .with_temp(fill.temp)
                .with_viscosity(cfg.viscosity * fill.element.viscosity_scaler());
            p.repel_factor = fill.element.repel_factor();
            p.element = fill.element.id();

            result.push(p);
        }
    }

    result
}

/// The whole domain filled, the left half hot and the right half cold. A simple
/// conduction test bed.
pub fn hot_cold_split(domain: &Domain, cfg: &Config, hot: f64, cold: f64) -> Vec<Particle> {
    let mut result = place_particles(
        domain,
        cfg,
        Region::Whole,
        Fill {
            temp: cold,
            ..Default::default()
        },
    );

    for p in &mut result {
        if p.posit.x < domain.width * 0.5 {
            p.temp = hot;
            p.temp_step_start = hot;
        }
    }

    result
}

/// Scale every particle's mass so the layout's density sits near `rest_density`: compute
/// densities at unit mass, then pick the mass minimizing the squared error against the rest
/// density. Returns the mass applied.
pub fn normalize_mass(particles: &mut [Particle], domain: &Domain, cfg: &Config) -> f64 {
    if particles.is_empty() {
        return 1.;
    }

    for p in particles.iter_mut() {
        p.mass = 1.;
    }

    let grid = BinGrid::new(domain, cfg.bin_width, cfg.cluster_reach);
    let mut bins = BinTable::sized_for(&grid, particles);
    bins.rebuild(&grid, particles);

    let kernels = Kernels::new(cfg.interaction_radius);
    density::compute(particles, &bins, &grid, cfg, &kernels);

    let mut rho_sum = 0.;
    let mut rho_sq_sum = 0.;
    for p in particles.iter().filter(|p| p.active) {
        rho_sum += p.density;
        rho_sq_sum += p.density * p.density;
    }

    let mass = if rho_sq_sum > 0. {
        cfg.rest_density * rho_sum / rho_sq_sum
    } else {
        1.
    };

    for p in particles.iter_mut() {
        p.mass = mass;
        p.density = 0.;
        p.pressure = 0.;
    }

    mass
}
