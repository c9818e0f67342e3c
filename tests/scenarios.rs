//! Whole-simulation behavior: conservation, containment, and the closed-form cases.

use element_sim::{
    kernels::Kernels,
    layout::{self, Fill, Region},
    properties,
    Config, Domain, Integrator, Particle, SimError, Simulation,
};
use lin_alg::f64::Vec3;

const DT: f64 = 1.0e-4;

fn no_gravity() -> Config {
    Config {
        gravity: 0.,
        ..Default::default()
    }
}

fn dam_break(cfg: &Config) -> Simulation {
    let domain = Domain::default();
    let mut ps = layout::place_particles(
        &domain,
        cfg,
        Region::corner_block(&domain),
        Fill {
            temp: 300.,
            jitter: 0.2,
            ..Default::default()
        },
    );
    layout::normalize_mass(&mut ps, &domain, cfg);
    Simulation::new(ps, domain, cfg.clone()).unwrap()
}

fn assert_contained(sim: &Simulation) {
    let domain = sim.domain();
    for p in sim.particles().iter().filter(|p| p.active) {
        assert!(p.posit.x >= 0. && p.posit.x <= domain.width, "{:?}", p.posit);
        assert!(p.posit.y >= 0. && p.posit.y <= domain.height, "{:?}", p.posit);
    }
}

#[test]
fn head_on_pair_conserves_momentum() {
    let ps = vec![
        Particle::new(Vec3::new(0.48, 0.5, 0.), 1.).with_vel(Vec3::new(0.5, 0., 0.)),
        Particle::new(Vec3::new(0.52, 0.5, 0.), 1.).with_vel(Vec3::new(-0.5, 0., 0.)),
    ];
    let mut sim = Simulation::new(ps, Domain::default(), no_gravity()).unwrap();

    for _ in 0..50 {
        let report = sim.tick(DT);
        assert_eq!(report.integrate.wall_hits, 0);
    }

    let momentum = properties::total_momentum(sim.particles());
    assert!(momentum.x.abs() < 1e-9);
    assert!(momentum.y.abs() < 1e-9);
    assert!(sim.particles().iter().all(|p| p.vel.x.is_finite()));
}

#[test]
fn heat_conserved_every_tick() {
    let cfg = Config::default();
    let domain = Domain::default();
    let mut ps = layout::hot_cold_split(&domain, &cfg, 300., 0.);
    layout::normalize_mass(&mut ps, &domain, &cfg);
    let mut sim = Simulation::new(ps, domain, cfg).unwrap();

    let mut heat = properties::total_heat(sim.particles());
    let mut exchanged = 0.;

    for _ in 0..20 {
        let report = sim.tick(DT);
        exchanged += report.heat.map(|h| h.total_exchanged).unwrap_or(0.);

        let after = properties::total_heat(sim.particles());
        assert!((after - heat).abs() < 1e-9 * heat);
        heat = after;
    }

    assert!(exchanged > 0.);
    assert!(sim
        .particles()
        .iter()
        .all(|p| p.temp >= 0. && p.temp <= sim.config().max_temp));
}

#[test]
fn dam_break_stays_sane() {
    let mut sim = dam_break(&Config::default());

    for _ in 0..300 {
        sim.tick(DT);

        for p in sim.particles() {
            assert!(p.density >= 0.);
            assert!(p.density.is_finite());
        }
        assert_contained(&sim);
    }
}

#[test]
fn leapfrog_dam_break_stays_contained() {
    let cfg = Config {
        integrator: Integrator::Leapfrog,
        ..Default::default()
    };
    let mut sim = dam_break(&cfg);

    for _ in 0..200 {
        sim.tick(DT);
    }

    assert_contained(&sim);
    assert!(sim
        .particles()
        .iter()
        .all(|p| p.vel.x.is_finite() && p.vel.y.is_finite()));
}

#[test]
fn free_fall() {
    let cfg = Config::default();
    let ps = vec![Particle::new(Vec3::new(0.5, 0.5, 0.), 1.)];
    let mut sim = Simulation::new(ps, Domain::default(), cfg.clone()).unwrap();

    let dt = 0.01;
    sim.tick(dt);
    let p = &sim.particles()[0];
    assert!((p.vel.y - cfg.gravity * dt).abs() < 1e-12);
    assert_eq!(p.vel.x, 0.);

    sim.tick(dt);
    let p = &sim.particles()[0];
    assert!((p.vel.y - 2. * cfg.gravity * dt).abs() < 1e-12);
    // Semi-implicit: position uses the updated velocity each tick.
    assert!((p.posit.y - (0.5 + 3. * cfg.gravity * dt * dt)).abs() < 1e-12);
}

#[test]
fn overlapping_pair_separates() {
    let cfg = no_gravity();
    let h = cfg.interaction_radius;
    let ps = vec![
        Particle::new(Vec3::new(0.5, 0.5, 0.), 1.),
        Particle::new(Vec3::new(0.5 + 0.1 * h, 0.5, 0.), 1.),
    ];
    let mut sim = Simulation::new(ps, Domain::default(), cfg.clone()).unwrap();

    sim.tick(DT);

    let ps = sim.particles();
    assert!(ps[0].density > cfg.rest_density);
    assert!(ps[0].pressure > 0.);
    assert!(ps[0].vel.x < 0.);
    assert!(ps[1].vel.x > 0.);
    assert!(ps[1].posit.x - ps[0].posit.x > 0.1 * h);
}

#[test]
fn coincident_pair_gets_pushed_apart() {
    let ps = vec![
        Particle::new(Vec3::new(0.5, 0.5, 0.), 1.),
        Particle::new(Vec3::new(0.5, 0.5, 0.), 1.),
    ];
    let mut sim = Simulation::new(ps, Domain::default(), no_gravity()).unwrap();

    let report = sim.tick(DT);

    assert_eq!(report.forces.degenerate_pairs, 2);
    assert!(report.degraded());
    assert!(sim
        .particles()
        .iter()
        .all(|p| p.posit.x.is_finite() && p.posit.y.is_finite()));
    assert!(sim.particles()[0].vel.magnitude_squared() > 0.);
}

#[test]
fn wall_bounce() {
    let cfg = no_gravity();
    let domain = Domain::default();
    let eps = cfg.bound_epsilon;
    let ps = vec![Particle::new(Vec3::new(domain.width - eps, 0.5, 0.), 1.).with_vel(Vec3::new(5., 0., 0.))];
    let mut sim = Simulation::new(ps, domain, cfg.clone()).unwrap();

    let report = sim.tick(0.01);

    assert_eq!(report.integrate.wall_hits, 1);
    let p = &sim.particles()[0];
    assert!((p.vel.x - 5. * cfg.bound_damping).abs() < 1e-12);
    assert_eq!(p.posit.x, domain.width - eps);
}

#[test]
fn invalid_setups_refuse_to_start() {
    let ps = || vec![Particle::new(Vec3::new(0.5, 0.5, 0.), 1.)];

    let cfg = Config {
        bin_width: 0.02,
        ..Default::default()
    };
    assert!(matches!(
        Simulation::new(ps(), Domain::default(), cfg),
        Err(SimError::BinTooSmall { .. })
    ));

    let cfg = Config {
        rest_density: -1.,
        ..Default::default()
    };
    assert!(matches!(
        Simulation::new(ps(), Domain::default(), cfg),
        Err(SimError::NonPositive {
            param: "rest_density"
        })
    ));

    let mut bad = ps();
    bad[0].posit = Vec3::new(f64::NAN, 0.5, 0.);
    assert!(matches!(
        Simulation::new(bad, Domain::default(), Config::default()),
        Err(SimError::InvalidParticle { index: 0, .. })
    ));
}

#[test]
fn bin_overflow_is_reported_and_survived() {
    let cfg = Config {
        bin_capacity: 2,
        gravity: 0.,
        ..Default::default()
    };
    // Five particles in one bin.
    let ps = (0..5)
        .map(|i| Particle::new(Vec3::new(0.51 + 0.005 * i as f64, 0.52, 0.), 1.))
        .collect();
    let mut sim = Simulation::new(ps, Domain::default(), cfg).unwrap();

    let report = sim.tick(DT);

    let rebuild = report.rebuild.unwrap();
    assert_eq!(rebuild.binned, 2);
    assert_eq!(rebuild.dropped, 3);
    assert_eq!(rebuild.worst_bin.map(|(_, load)| load), Some(5));
    assert!(report.degraded());

    for _ in 0..10 {
        sim.tick(DT);
    }
    assert!(sim
        .particles()
        .iter()
        .all(|p| p.posit.x.is_finite() && p.density.is_finite()));
    assert_contained(&sim);
}

#[test]
fn neighbor_query_matches_brute_force() {
    let cfg = Config::default();
    let sim = dam_break(&cfg);
    let ps = sim.particles();
    let h_sq = cfg.interaction_radius * cfg.interaction_radius;

    for (i, p) in ps.iter().enumerate() {
        let mut found: Vec<usize> = sim
            .bins()
            .neighbors(sim.grid(), p.posit)
            .filter(|&j| j != i && (ps[j].posit - p.posit).magnitude_squared() < h_sq)
            .collect();
        found.sort_unstable();

        let expected: Vec<usize> = (0..ps.len())
            .filter(|&j| j != i && (ps[j].posit - p.posit).magnitude_squared() < h_sq)
            .collect();

        assert_eq!(found, expected);
    }
}

#[test]
fn heat_reaches_past_interaction_radius() {
    let h = Config::default().interaction_radius;
    let cfg = Config {
        heat_radius: 2. * h,
        bin_width: 2. * h,
        gravity: 0.,
        ..Default::default()
    };
    // 1.5 h apart, across a bin boundary.
    let ps = vec![
        Particle::new(Vec3::new(0.47, 0.5, 0.), 1.).with_temp(200.),
        Particle::new(Vec3::new(0.47 + 1.5 * h, 0.5, 0.), 1.).with_temp(100.),
    ];
    let mut sim = Simulation::new(ps, Domain::default(), cfg.clone()).unwrap();

    let report = sim.tick(DT);

    assert_eq!(report.forces.pairs, 0);
    assert_eq!(report.heat.map(|h| h.pairs), Some(1));

    let expected = cfg.thermal_diffusivity * DT * 100.;
    let ps = sim.particles();
    assert!((ps[0].temp - (200. - expected)).abs() < 1e-9);
    assert!((ps[1].temp - (100. + expected)).abs() < 1e-9);
}

#[test]
fn tight_repel_factor_still_finds_neighbors() {
    let cfg = Config {
        bin_width: 0.07,
        gravity: 0.,
        ..Default::default()
    };
    let h = cfg.interaction_radius;
    let repel = 0.8;

    // Raw distance past h, effective distance inside it, in adjacent bins.
    let mut pair = vec![
        Particle::new(Vec3::new(0.55, 0.5, 0.), 1.),
        Particle::new(Vec3::new(0.608, 0.5, 0.), 1.),
    ];
    for p in &mut pair {
        p.repel_factor = repel;
    }
    let mut sim = Simulation::new(pair, Domain::default(), cfg.clone()).unwrap();
    sim.tick(DT);
    let self_density = Kernels::new(h).self_weight();
    assert!(sim.particles().iter().all(|p| p.density > self_density));

    // Whole layout: the bin query sees every pair inside h by effective distance.
    let domain = Domain::default();
    let mut ps = layout::place_particles(&domain, &cfg, Region::corner_block(&domain), Fill::default());
    for p in &mut ps {
        p.repel_factor = repel;
    }
    let sim = Simulation::new(ps, domain, cfg.clone()).unwrap();
    let ps = sim.particles();
    let h_sq = h * h;
    let close = |a: &Particle, b: &Particle| {
        (b.posit - a.posit).magnitude_squared() * repel * repel < h_sq
    };

    for (i, p) in ps.iter().enumerate() {
        let mut found: Vec<usize> = sim
            .bins()
            .neighbors(sim.grid(), p.posit)
            .filter(|&j| j != i && close(p, &ps[j]))
            .collect();
        found.sort_unstable();

        let expected: Vec<usize> = (0..ps.len()).filter(|&j| j != i && close(p, &ps[j])).collect();

        assert!(!expected.is_empty());
        assert_eq!(found, expected);
    }
}
