//! Conductive heat exchange between neighboring particles.
//!
//! Exchange amounts are computed from temperatures captured before any particle is touched
//! this tick, so the result doesn't depend on pair order. Each pair is visited once, and the
//! same amount leaves one particle and enters the other; total heat is conserved.

use crate::{
    bins::{BinGrid, BinTable},
    config::Config,
    density::effective_dist_sq,
    particle::Particle,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HeatReport {
    /// Pairs within the heat radius.
    pub pairs: usize,
    /// Pairs whose exchange was cut back by a temperature bound.
    pub clamped: usize,
    /// Sum of |exchange| over all pairs.
    pub total_exchanged: f64,
}

/// Copy `temp` into `temp_step_start` for every active particle. Must run before any
/// temperature changes in the tick.
pub fn snapshot_temps(particles: &mut [Particle]) {
    for p in particles.iter_mut().filter(|p| p.active) {
        p.temp_step_start = p.temp;
    }
}

/// The signed amount of heat moving from `i` to `j`, given their start-of-step and current
/// temperatures. Returns the amount, and whether a bound limited it.
pub fn pair_exchange(
    t_i_start: f64,
    t_j_start: f64,
    t_i: f64,
    t_j: f64,
    diffusivity: f64,
    dt: f64,
    max_temp: f64,
) -> (f64, bool) {
    let diff = t_i_start - t_j_start;
    let raw = diffusivity * dt * diff;
    if !raw.is_finite() {
        return (0., true);
    }

    // Never past equilibrium; large steps would otherwise oscillate.
    let half = diff.abs() / 2.;
    let mut result = raw.clamp(-half, half);

    if result > 0. {
        result = result.min(t_i).min(max_temp - t_j).max(0.);
    } else {
        result = result.max(-t_j).max(t_i - max_temp).min(0.);
    }

    (result, result != raw)
}

pub fn compute(
    particles: &mut [Particle],
    bins: &BinTable,
    grid: &BinGrid,
    cfg: &Config,
    dt: f64,
) -> HeatReport {
    snapshot_temps(particles);

    let mut report = HeatReport::default();
    let radius_sq = cfg.heat_radius * cfg.heat_radius;

    let mut partners = Vec::new();

    for i in 0..particles.len() {
        if !particles[i].active {
            continue;
        }

        partners.clear();
        {
            let p_i = &particles[i];
            for j in bins.neighbors(grid, p_i.posit) {
                // Lower index handles the pair.
                if j <= i || !particles[j].active {
                    continue;
                }
                if effective_dist_sq(p_i, &particles[j]) < radius_sq {
                    partners.push(j);
                }
            }
        }

        for &j in &partners {
            let (lo, hi) = particles.split_at_mut(j);
            let p_i = &mut lo[i];
            let p_j = &mut hi[0];

            let (exchange, clamped) = pair_exchange(
                p_i.temp_step_start,
                p_j.temp_step_start,
                p_i.temp,
                p_j.temp,
                cfg.thermal_diffusivity,
                dt,
                cfg.max_temp,
            );

            p_i.temp -= exchange;
            p_j.temp += exchange;

            report.pairs += 1;
            report.total_exchanged += exchange.abs();
            if clamped {
                report.clamped += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use lin_alg::f64::Vec3;

    use super::*;
    use crate::config::Domain;

    fn run(ps: &mut [Particle], cfg: &Config, dt: f64) -> HeatReport {
        let grid = BinGrid::new(&Domain::default(), cfg.bin_width, cfg.cluster_reach);
        let mut bins = BinTable::new(grid.num_bins(), cfg.bin_capacity);
        bins.rebuild(&grid, ps);
        compute(ps, &bins, &grid, cfg, dt)
    }

    #[test]
    fn exchange_flows_hot_to_cold() {
        let (ex, clamped) = pair_exchange(300., 100., 300., 100., 1., 0.01, 1_000.);
        assert!((ex - 2.).abs() < 1e-12);
        assert!(!clamped);
    }

    #[test]
    fn exchange_never_crosses_over() {
        let (ex, clamped) = pair_exchange(300., 100., 300., 100., 10., 1., 1_000.);
        assert_eq!(ex, 100.);
        assert!(clamped);
    }

    #[test]
    fn exchange_respects_bounds() {
        // Current temps already pushed near the limits by other pairs.
        let (ex, _) = pair_exchange(300., 100., 5., 100., 1., 0.1, 1_000.);
        assert_eq!(ex, 5.);

        let (ex, _) = pair_exchange(300., 100., 300., 995., 1., 0.1, 1_000.);
        assert_eq!(ex, 5.);

        let (ex, _) = pair_exchange(100., 300., 998., 300., 1., 0.1, 1_000.);
        assert_eq!(ex, -2.);
    }

    #[test]
    fn heat_conserved() {
        let cfg = Config::default();
        let mut ps = Vec::new();
        for ix in 0..6 {
            for iy in 0..6 {
                let temp = if ix < 3 { 600. } else { 20. + iy as f64 };
                ps.push(
                    Particle::new(Vec3::new(0.4 + ix as f64 * 0.02, 0.4 + iy as f64 * 0.02, 0.), 1.)
                        .with_temp(temp),
                );
            }
        }

        let before: f64 = ps.iter().map(|p| p.temp).sum();
        let report = run(&mut ps, &cfg, 0.01);
        let after: f64 = ps.iter().map(|p| p.temp).sum();

        assert!(report.pairs > 0);
        assert!(report.total_exchanged > 0.);
        assert!((before - after).abs() < 1e-9 * before);
        assert!(ps.iter().all(|p| p.temp >= 0. && p.temp <= cfg.max_temp));
    }

    #[test]
    fn order_independent() {
        let cfg = Config::default();
        let a = Particle::new(Vec3::new(0.50, 0.5, 0.), 1.).with_temp(500.);
        let b = Particle::new(Vec3::new(0.52, 0.5, 0.), 1.).with_temp(100.);
        let c = Particle::new(Vec3::new(0.54, 0.5, 0.), 1.).with_temp(300.);

        let mut fwd = vec![a.clone(), b.clone(), c.clone()];
        let mut rev = vec![c, b, a];
        run(&mut fwd, &cfg, 0.01);
        run(&mut rev, &cfg, 0.01);

        for (f, r) in fwd.iter().zip(rev.iter().rev()) {
            assert!((f.temp - r.temp).abs() < 1e-9);
        }
    }

    #[test]
    fn out_of_range_pairs_untouched() {
        let cfg = Config::default();
        let mut ps = vec![
            Particle::new(Vec3::new(0.2, 0.2, 0.), 1.).with_temp(500.),
            Particle::new(Vec3::new(0.8, 0.8, 0.), 1.).with_temp(0.),
        ];
        let report = run(&mut ps, &cfg, 0.01);
        assert_eq!(report.pairs, 0);
        assert_eq!(ps[0].temp, 500.);
    }
}
