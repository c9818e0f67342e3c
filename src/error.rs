//! Errors raised when a simulation can't be started, or a particle edit is refused. Nothing in
//! here is returned from a tick; degraded ticks are reported through `TickReport` instead.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("parameter `{param}` must be positive")]
    NonPositive { param: &'static str },

    #[error("parameter `{param}` can't be negative")]
    Negative { param: &'static str },

    #[error("parameter `{param}` is not finite")]
    NotFinite { param: &'static str },

    #[error(
        "bin width {bin_width} with a cluster reach of {cluster_reach} can't cover an \
         interaction distance of {required}; widen the bins or increase the reach"
    )]
    BinTooSmall {
        bin_width: f64,
        cluster_reach: usize,
        required: f64,
    },

    #[error("bound damping must be in [-1, 0); got {0}")]
    BoundDamping(f64),

    #[error("interval `{param}` must be at least 1 tick")]
    Interval { param: &'static str },

    #[error("bin capacity must be at least 1")]
    ZeroBinCapacity,

    #[error("particle {index} is invalid: {reason}")]
    InvalidParticle { index: usize, reason: &'static str },

    #[error("particle {index} starts outside the domain")]
    ParticleOutOfDomain { index: usize },

    #[error("domain must have a positive width and height")]
    EmptyDomain,

    #[error("no free particle slot; capacity is {capacity}")]
    StoreFull { capacity: usize },

    #[error("no particle slot {index}")]
    NoSuchParticle { index: usize },
}
