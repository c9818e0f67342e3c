use lin_alg::f64::Vec3;
use rayon::prelude::*;

use crate::{
    config::{Config, Domain, Integrator},
    particle::{Particle, DENSITY_EPS},
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IntegrateReport {
    /// Particles whose density was too low to divide by; their force was skipped.
    pub zero_density: usize,
    /// Wall contacts. A particle in a corner counts twice.
    pub wall_hits: usize,
    /// Particles reverted to their previous position after a non-finite update.
    pub nonfinite_resets: usize,
}

impl IntegrateReport {
    fn merge(self, other: Self) -> Self {
        Self {
            zero_density: self.zero_density + other.zero_density,
            wall_hits: self.wall_hits + other.wall_hits,
            nonfinite_resets: self.nonfinite_resets + other.nonfinite_resets,
        }
    }
}

fn is_finite(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite()
}

/// Reflect off any of the four walls the particle has crossed. Walls are inset by
/// `bound_epsilon`, and checked independently, so a corner hit reflects both components.
pub fn reflect_walls(p: &mut Particle, domain: &Domain, cfg: &Config) -> usize {
    let eps = cfg.bound_epsilon;
    let damp = cfg.bound_damping;
    let mut hits = 0;

    if p.posit.x < eps {
        p.vel.x *= damp;
        p.vel_half.x *= damp;
        p.posit.x = eps;
        hits += 1;
    }
    if p.posit.x > domain.width - eps {
        p.vel.x *= damp;
        p.vel_half.x *= damp;
        p.posit.x = domain.width - eps;
        hits += 1;
    }
    if p.posit.y < eps {
        p.vel.y *= damp;
        p.vel_half.y *= damp;
        p.posit.y = eps;
        hits += 1;
    }
    if p.posit.y > domain.height - eps {
        p.vel.y *= damp;
        p.vel_half.y *= damp;
        p.posit.y = domain.height - eps;
        hits += 1;
    }

    hits
}

/// Advance one particle's velocity and position. `first_step` starts the leapfrog
/// half-step velocity; the Euler integrator ignores it.
pub fn step_particle(
    p: &mut Particle,
    domain: &Domain,
    cfg: &Config,
    dt: f64,
    first_step: bool,
) -> IntegrateReport {
    let mut report = IntegrateReport::default();
    if !p.active {
        return report;
    }

    let posit_prev = p.posit;

    let accel = if p.density > DENSITY_EPS {
        p.force / p.density
    } else {
        report.zero_density = 1;
        Vec3::new_zero()
    };

    match cfg.integrator {
        Integrator::SemiImplicitEuler => {
            p.vel = p.vel + accel * dt;
            p.posit = p.posit + p.vel * dt;
        }
        Integrator::Leapfrog => {
            if first_step {
                p.vel_half = p.vel + accel * (dt / 2.);
            } else {
                p.vel_half = p.vel_half + accel * dt;
            }
            // Approximate whole-step velocity, for the next force evaluation.
            p.vel = p.vel_half + accel * (dt / 2.);
            p.posit = p.posit + p.vel_half * dt;
        }
    }

    if !is_finite(p.posit) || !is_finite(p.vel) || !is_finite(p.vel_half) {
        p.posit = posit_prev;
        p.vel = Vec3::new_zero();
        p.vel_half = Vec3::new_zero();
        report.nonfinite_resets = 1;
    }

    report.wall_hits = reflect_walls(p, domain, cfg);
    report
}

/// Integrate every active particle. Each particle only reads and writes its own fields.
pub fn integrate(
    particles: &mut [Particle],
    domain: &Domain,
    cfg: &Config,
    dt: f64,
    first_step: bool,
) -> IntegrateReport {
    particles
        .par_iter_mut()
        .map(|p| step_particle(p, domain, cfg, dt, first_step))
        .reduce(IntegrateReport::default, IntegrateReport::merge)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(x: f64, y: f64, density: f64) -> Particle {
        let mut p = Particle::new(Vec3::new(x, y, 0.), 1.);
        p.density = density;
        p
    }

    #[test]
    fn euler_updates_velocity_then_position() {
        let cfg = Config::default();
        let mut p = particle(0.5, 0.5, 2.);
        p.force = Vec3::new(4., -2., 0.);

        step_particle(&mut p, &Domain::default(), &cfg, 0.1, false);

        assert!((p.vel.x - 0.2).abs() < 1e-12);
        assert!((p.vel.y + 0.1).abs() < 1e-12);
        assert!((p.posit.x - 0.52).abs() < 1e-12);
        assert!((p.posit.y - 0.49).abs() < 1e-12);
    }

    #[test]
    fn leapfrog_start_and_step() {
        let cfg = Config {
            integrator: Integrator::Leapfrog,
            ..Default::default()
        };
        let mut p = particle(0.5, 0.5, 1.);
        p.force = Vec3::new(1., 0., 0.);

        step_particle(&mut p, &Domain::default(), &cfg, 0.1, true);
        assert!((p.vel_half.x - 0.05).abs() < 1e-12);
        assert!((p.vel.x - 0.1).abs() < 1e-12);
        assert!((p.posit.x - 0.505).abs() < 1e-12);

        step_particle(&mut p, &Domain::default(), &cfg, 0.1, false);
        assert!((p.vel_half.x - 0.15).abs() < 1e-12);
        assert!((p.vel.x - 0.2).abs() < 1e-12);
        assert!((p.posit.x - 0.52).abs() < 1e-12);
    }

    #[test]
    fn wall_bounce() {
        let cfg = Config::default();
        let domain = Domain::default();
        let eps = cfg.bound_epsilon;

        let mut p = particle(domain.width - eps, 0.5, 1.).with_vel(Vec3::new(5., 0., 0.));
        let report = step_particle(&mut p, &domain, &cfg, 0.01, false);

        assert_eq!(report.wall_hits, 1);
        assert!(p.vel.x < 0.);
        assert!((p.vel.x - 5. * cfg.bound_damping).abs() < 1e-12);
        assert_eq!(p.posit.x, domain.width - eps);
    }

    #[test]
    fn corner_reflects_both_components() {
        let cfg = Config::default();
        let mut p = particle(0.001, 0.001, 1.).with_vel(Vec3::new(-1., -1., 0.));

        let report = step_particle(&mut p, &Domain::default(), &cfg, 0.01, false);

        assert_eq!(report.wall_hits, 2);
        assert!(p.vel.x > 0. && p.vel.y > 0.);
        assert_eq!(p.posit.x, cfg.bound_epsilon);
        assert_eq!(p.posit.y, cfg.bound_epsilon);
    }

    #[test]
    fn zero_density_skips_force() {
        let cfg = Config::default();
        let mut p = particle(0.5, 0.5, 0.).with_vel(Vec3::new(1., 0., 0.));
        p.force = Vec3::new(100., 100., 0.);

        let report = step_particle(&mut p, &Domain::default(), &cfg, 0.01, false);

        assert_eq!(report.zero_density, 1);
        assert_eq!(p.vel.x, 1.);
        assert_eq!(p.vel.y, 0.);
        assert!((p.posit.x - 0.51).abs() < 1e-12);
    }

    #[test]
    fn non_finite_reverts() {
        let cfg = Config::default();
        let mut p = particle(0.5, 0.5, 1.);
        p.force = Vec3::new(f64::INFINITY, 0., 0.);

        let report = step_particle(&mut p, &Domain::default(), &cfg, 0.01, false);

        assert_eq!(report.nonfinite_resets, 1);
        assert_eq!(p.posit.x, 0.5);
        assert_eq!(p.vel.x, 0.);
    }

    #[test]
    fn inactive_untouched() {
        let cfg = Config::default();
        let mut ps = vec![particle(0.5, 0.5, 1.), particle(0.2, 0.2, 1.)];
        ps[1].active = false;
        ps[1].force = Vec3::new(10., 10., 0.);
        ps[0].force = Vec3::new(10., 10., 0.);

        integrate(&mut ps, &Domain::default(), &cfg, 0.01, false);

        assert!(ps[0].posit.x > 0.5);
        assert_eq!(ps[1].posit.x, 0.2);
        assert_eq!(ps[1].vel.x, 0.);
    }
}
