//! Aggregate properties of a particle collection, e.g. conserved quantities and profiles, and
//! plotting them.

use std::error::Error;

use lin_alg::f64::Vec3;
use plotters::{
    element::PathElement,
    prelude::{BitMapBackend, ChartBuilder, Color, IntoDrawingArea, BLACK, BLUE, WHITE},
    series::LineSeries,
};

use crate::{config::Domain, particle::Particle};

pub const N_SAMPLE_PTS: usize = 40;

fn active(particles: &[Particle]) -> impl Iterator<Item = &Particle> {
    particles.iter().filter(|p| p.active)
}

/// Σ m v over active particles.
pub fn total_momentum(particles: &[Particle]) -> Vec3 {
    active(particles).fold(Vec3::new_zero(), |acc, p| acc + p.momentum())
}

/// Σ T over active particles. Heat exchange conserves this.
pub fn total_heat(particles: &[Particle]) -> f64 {
    active(particles).map(|p| p.temp).sum()
}

pub fn kinetic_energy(particles: &[Particle]) -> f64 {
    active(particles).map(|p| 0.5 * p.mass * p.vel.magnitude_squared()).sum()
}

/// (min, max) density of active particles.
pub fn density_bounds(particles: &[Particle]) -> Option<(f64, f64)> {
    active(particles).fold(None, |acc, p| match acc {
        None => Some((p.density, p.density)),
        Some((lo, hi)) => Some((p.density.min(lo), p.density.max(hi))),
    })
}

/// Mean of `val` over particles in each of `N_SAMPLE_PTS` slices along one axis. Empty slices
/// are 0.
fn profile(
    particles: &[Particle],
    extent: f64,
    coord: impl Fn(&Particle) -> f64,
    val: impl Fn(&Particle) -> f64,
) -> Vec<(f64, f64)> {
    let d = extent / N_SAMPLE_PTS as f64;

    let mut sums = vec![0.; N_SAMPLE_PTS];
    let mut counts = vec![0_usize; N_SAMPLE_PTS];

    for p in active(particles) {
        let i = ((coord(p) / d).floor().max(0.) as usize).min(N_SAMPLE_PTS - 1);
        sums[i] += val(p);
        counts[i] += 1;
    }

    (0..N_SAMPLE_PTS)
        .map(|i| {
            let x = (i as f64 + 0.5) * d;
            if counts[i] == 0 {
                (x, 0.)
            } else {
                (x, sums[i] / counts[i] as f64)
            }
        })
        .collect()
}

/// Mean temperature across the domain. X: x. Y: T.
pub fn temp_profile(particles: &[Particle], domain: &Domain) -> Vec<(f64, f64)> {
    profile(particles, domain.width, |p| p.posit.x, |p| p.temp)
}

/// Mean density by height. X: y. Y: ρ.
pub fn density_profile(particles: &[Particle], domain: &Domain) -> Vec<(f64, f64)> {
    profile(particles, domain.height, |p| p.posit.y, |p| p.density)
}

/// Write a 2d line plot of `data` to `{filename}.png`.
pub fn plot(
    data: &[(f64, f64)],
    x_label: &str,
    y_label: &str,
    plot_title: &str,
    filename: &str,
) -> Result<(), Box<dyn Error>> {
    let x_range = data
        .iter()
        .map(|(x, _)| *x)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), x| {
            (min.min(x), max.max(x))
        });

    let mut y_range = data
        .iter()
        .map(|(_, y)| *y)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), y| {
            (min.min(y), max.max(y))
        });
    // A flat line still needs some height.
    if y_range.1 <= y_range.0 {
        y_range = (y_range.0 - 1., y_range.0 + 1.);
    }

    let fname = format!("{filename}.png");
    let root = BitMapBackend::new(&fname, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(plot_title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(30)
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()?;

    chart
        .draw_series(LineSeries::new(data.iter().cloned(), BLUE))?
        .label("Data")
        .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], BLUE));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

pub fn plot_temp_profile(data: &[(f64, f64)], desc: &str) -> Result<(), Box<dyn Error>> {
    plot(
        data,
        "x",
        "T",
        &format!("Temperature profile of {desc}"),
        &format!("temp_plot_{desc}"),
    )
}

pub fn plot_density_profile(data: &[(f64, f64)], desc: &str) -> Result<(), Box<dyn Error>> {
    plot(
        data,
        "y",
        "ρ",
        &format!("Density profile of {desc}"),
        &format!("density_plot_{desc}"),
    )
}
