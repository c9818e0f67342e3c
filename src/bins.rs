//! Uniform-grid spatial binning, used to keep neighbor search to a small cluster of bins
//! around each particle instead of the whole population.
//!
//! Bin ids are row-major: `id = by * width_bins + bx`. Each bin holds at most `capacity`
//! particle indices, stored in one flat buffer; there's no allocation per rebuild.

use std::ops::RangeInclusive;

use lin_alg::f64::Vec3;
use log::warn;

use crate::{config::Domain, particle::Particle};

/// Grid geometry. Pure functions of position; no particle state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinGrid {
    pub bin_width: f64,
    pub width_bins: usize,
    pub height_bins: usize,
    /// Bins searched on each side of the center bin.
    pub cluster_reach: usize,
}

impl BinGrid {
    pub fn new(domain: &Domain, bin_width: f64, cluster_reach: usize) -> Self {
        let width_bins = ((domain.width / bin_width).ceil() as usize).max(1);
        let height_bins = ((domain.height / bin_width).ceil() as usize).max(1);

        Self {
            bin_width,
            width_bins,
            height_bins,
            cluster_reach,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.width_bins * self.height_bins
    }

    /// Grid coordinates of the bin containing `posit`, or `None` if it's off the grid.
    pub fn bin_coords(&self, posit: Vec3) -> Option<(usize, usize)> {
        let bx = (posit.x / self.bin_width).floor();
        let by = (posit.y / self.bin_width).floor();

        if bx < 0. || by < 0. || !bx.is_finite() || !by.is_finite() {
            return None;
        }

        let (bx, by) = (bx as usize, by as usize);
        if bx >= self.width_bins || by >= self.height_bins {
            return None;
        }

        Some((bx, by))
    }

    /// As `bin_coords`, but off-grid positions map to the nearest edge bin. A particle sitting
    /// exactly on the far wall lands here when the domain is a whole number of bins wide.
    pub fn bin_coords_clamped(&self, posit: Vec3) -> (usize, usize) {
        let clamp = |v: f64, n: usize| {
            let b = (v / self.bin_width).floor();
            if b.is_nan() || b < 0. {
                0
            } else {
                (b as usize).min(n - 1)
            }
        };

        (
            clamp(posit.x, self.width_bins),
            clamp(posit.y, self.height_bins),
        )
    }

    pub fn bin_id(&self, bx: usize, by: usize) -> usize {
        by * self.width_bins + bx
    }

    /// Bin coordinate ranges of the cluster around `posit`. Bins past the grid edges are
    /// excluded rather than clamped, so edge particles get a smaller cluster.
    pub fn cluster_ranges(&self, posit: Vec3) -> (RangeInclusive<usize>, RangeInclusive<usize>) {
        let (bx, by) = self.bin_coords_clamped(posit);
        let r = self.cluster_reach;

        (
            bx.saturating_sub(r)..=(bx + r).min(self.width_bins - 1),
            by.saturating_sub(r)..=(by + r).min(self.height_bins - 1),
        )
    }

    /// Ids of the cluster centered on `posit`'s bin. 9 for an interior particle with reach 1.
    pub fn neighbor_bin_ids(&self, posit: Vec3) -> Vec<usize> {
        let (xs, ys) = self.cluster_ranges(posit);

        let mut result = Vec::with_capacity(xs.clone().count() * ys.clone().count());
        for by in ys {
            for bx in xs.clone() {
                result.push(self.bin_id(bx, by));
            }
        }
        result
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RebuildReport {
    /// Active particles placed in a bin.
    pub binned: usize,
    /// Entries dropped because their bin was full.
    pub dropped: usize,
    /// `(bin id, load it would have had)` for the most overfull bin.
    pub worst_bin: Option<(usize, usize)>,
}

/// Bin id -> bounded list of particle indices. Rebuilt wholesale; bins are never edited
/// individually.
#[derive(Clone, Debug)]
pub struct BinTable {
    capacity: usize,
    contents: Vec<usize>,
    loads: Vec<usize>,
    /// Per-bin count of entries that didn't fit. Cleared each rebuild.
    overflow: Vec<usize>,
}

impl BinTable {
    pub fn new(num_bins: usize, capacity: usize) -> Self {
        Self {
            capacity,
            contents: vec![0; num_bins * capacity],
            loads: vec![0; num_bins],
            overflow: vec![0; num_bins],
        }
    }

    /// A table just large enough that `particles` rebuild without dropping anything. Memory is
    /// `num_bins * max load`, so one dense bin sets the size for all of them.
    pub fn sized_for(grid: &BinGrid, particles: &[Particle]) -> Self {
        let mut loads = vec![0_usize; grid.num_bins()];
        for p in particles.iter().filter(|p| p.active) {
            let (bx, by) = grid.bin_coords_clamped(p.posit);
            loads[grid.bin_id(bx, by)] += 1;
        }

        let capacity = loads.iter().copied().max().unwrap_or(0).max(1);
        Self::new(grid.num_bins(), capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_bins(&self) -> usize {
        self.loads.len()
    }

    pub fn clear(&mut self) {
        self.loads.iter_mut().for_each(|l| *l = 0);
        self.overflow.iter_mut().for_each(|o| *o = 0);
    }

    /// Re-bin every active particle. Inactive particles are left out entirely, so they're
    /// invisible to every neighbor query.
    pub fn rebuild(&mut self, grid: &BinGrid, particles: &mut [Particle]) -> RebuildReport {
        self.clear();

        let mut report = RebuildReport::default();

        for (i, particle) in particles.iter_mut().enumerate() {
            if !particle.active {
                particle.bin_id = None;
                continue;
            }

            let (bx, by) = grid.bin_coords_clamped(particle.posit);
            let id = grid.bin_id(bx, by);
            particle.bin_id = Some(id);

            let load = self.loads[id];
            if load >= self.capacity {
                self.overflow[id] += 1;
                report.dropped += 1;
                continue;
            }

            self.contents[id * self.capacity + load] = i;
            self.loads[id] += 1;
            report.binned += 1;
        }

        if report.dropped > 0 {
            let mut worst = (0, 0);
            for (id, &over) in self.overflow.iter().enumerate() {
                if over > worst.1 {
                    worst = (id, over);
                }
            }
            report.worst_bin = Some((worst.0, self.capacity + worst.1));

            warn!(
                "Bin overflow: {} particles dropped from neighbor search. Fullest bin: {} with {} \
                 (capacity {}). Raise bin capacity or lower particle density.",
                report.dropped,
                worst.0,
                self.capacity + worst.1,
                self.capacity
            );
        }

        report
    }

    /// Particle indices in a bin. Unordered; don't rely on insertion order.
    pub fn contents(&self, id: usize) -> &[usize] {
        let start = id * self.capacity;
        &self.contents[start..start + self.loads[id]]
    }

    pub fn load(&self, id: usize) -> usize {
        self.loads[id]
    }

    /// Every particle index in the cluster around `posit`, including the querying particle
    /// itself if it's binned. Callers filter by distance.
    pub fn neighbors<'a>(
        &'a self,
        grid: &'a BinGrid,
        posit: Vec3,
    ) -> impl Iterator<Item = usize> + 'a {
        let (xs, ys) = grid.cluster_ranges(posit);

        ys.flat_map(move |by| xs.clone().map(move |bx| grid.bin_id(bx, by)))
            .flat_map(move |id| self.contents(id).iter().copied())
    }
}
