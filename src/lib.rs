//! A 2D smoothed-particle hydrodynamics simulator for fluid elements, with conductive heat
//! exchange between neighbors. Neighbor search uses a uniform grid of bounded bins.

#![allow(non_snake_case)]
#![allow(non_ascii_idents)]
#![allow(mixed_script_confusables)]

pub mod bins;
pub mod config;
pub mod density;
pub mod error;
pub mod forces;
pub mod heat;
pub mod integrate;
pub mod kernels;
pub mod layout;
pub mod particle;
pub mod playback;
pub mod properties;
pub mod sim;
pub mod util;

pub use config::{Config, Domain, Integrator};
pub use error::SimError;
pub use particle::{Particle, ParticleStore};
pub use sim::{Simulation, TickReport};
