//! Müller-style SPH smoothing kernels. Coefficients depend only on the interaction radius,
//! so we compute them once per simulation instead of per pair.

use std::f64::consts::PI;

/// Precomputed normalization constants for a given support radius `h`.
#[derive(Clone, Copy, Debug)]
pub struct Kernels {
    pub h: f64,
    pub h_sq: f64,
    /// 315 / (64π h⁹). Density weighting.
    pub poly6: f64,
    /// 45 / (π h⁶). Magnitude of the spiky gradient; the sign is applied by the caller.
    pub spiky_grad: f64,
    /// 45 / (π h⁶). Viscosity Laplacian.
    pub visc_lap: f64,
}

impl Kernels {
    pub fn new(h: f64) -> Self {
        let h_sq = h * h;
        let h6 = h_sq * h_sq * h_sq;
        let h9 = h6 * h_sq * h;

        Self {
            h,
            h_sq,
            poly6: 315. / (64. * PI * h9),
            spiky_grad: 45. / (PI * h6),
            visc_lap: 45. / (PI * h6),
        }
    }

    /// Poly6 weight at squared distance `r_sq`. Zero outside the support.
    pub fn poly6_weight(&self, r_sq: f64) -> f64 {
        if r_sq >= self.h_sq {
            return 0.;
        }
        let z = self.h_sq - r_sq;
        self.poly6 * z * z * z
    }

    /// The kernel at zero separation: each particle's own density contribution per unit mass.
    pub fn self_weight(&self) -> f64 {
        self.poly6_weight(0.)
    }
}
