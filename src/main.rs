//! Headless driver: build a layout, run it, and write plots and playback snapshots.

use std::{path::PathBuf, process, time::Instant};

use element_sim::{
    layout::{self, Element, Fill, Region},
    playback, properties, util, Config, Domain, Simulation,
};

const SAVE_FILE: &str = "config.sim";
const DEFAULT_SNAPSHOT_FILE: &str = "snapshot.sim";

/// Fraction of a kernel radius the fastest particle may cross per tick before we warn.
const DT_SCALER: f64 = 0.4;

fn main() {
    let cfg = match Config::load(&PathBuf::from(SAVE_FILE)) {
        Ok(cfg) => {
            println!("Config loaded from {SAVE_FILE}");
            cfg
        }
        Err(_) => Config::default(),
    };

    let domain = Domain::default();

    // A warm block of liquid in one corner, with a cold drop above it.
    let mut particles = layout::place_particles(
        &domain,
        &cfg,
        Region::corner_block(&domain),
        Fill {
            element: Element::Liquid,
            temp: 300.,
            jitter: 0.2,
        },
    );
    particles.extend(layout::place_particles(
        &domain,
        &cfg,
        Region::Drop {
            center: (0.75, 0.8),
            radius: 0.1,
        },
        Fill {
            element: Element::Liquid,
            temp: 20.,
            jitter: 0.,
        },
    ));

    let mass = layout::normalize_mass(&mut particles, &domain, &cfg);
    println!("{} particles, mass {mass:.5}", particles.len());

    let mut sim = match Simulation::new(particles, domain, cfg.clone()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    println!("Building...");
    let start = Instant::now();

    let heat_start = properties::total_heat(sim.particles());
    let mut snapshots = Vec::new();

    for frame in 0..cfg.num_frames {
        snapshots.extend(sim.run(cfg.ticks_per_frame, cfg.dt, cfg.snapshot_ratio));

        let dt_max = util::calc_dt_dynamic(sim.particles(), cfg.interaction_radius, DT_SCALER, 1.);
        if cfg.dt > dt_max {
            println!("Frame {frame}: dt {} exceeds the stable limit {dt_max:.2e}", cfg.dt);
        }

        if frame % 10 == 0 {
            let (rho_min, rho_max) = properties::density_bounds(sim.particles()).unwrap_or((0., 0.));
            println!(
                "Frame {frame}, t: {:.4}. ρ: {rho_min:.1} - {rho_max:.1}. KE: {:.3e}",
                sim.time_elapsed(),
                properties::kinetic_energy(sim.particles()),
            );
        }
    }

    println!(
        "Build complete in {}ms. Heat drift: {:.3e}",
        start.elapsed().as_millis(),
        properties::total_heat(sim.particles()) - heat_start
    );

    let temp_profile = properties::temp_profile(sim.particles(), sim.domain());
    if let Err(e) = properties::plot_temp_profile(&temp_profile, "liquid") {
        eprintln!("Error plotting temperature: {e}");
    }
    let density_profile = properties::density_profile(sim.particles(), sim.domain());
    if let Err(e) = properties::plot_density_profile(&density_profile, "liquid") {
        eprintln!("Error plotting density: {e}");
    }

    if let Err(e) = playback::save_snapshots(&PathBuf::from(DEFAULT_SNAPSHOT_FILE), &snapshots) {
        eprintln!("Error saving snapshots: {e}");
    }
}
