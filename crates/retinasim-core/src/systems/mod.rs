//! Systems - per-step processes that advance the simulation

mod damage;
mod pressure;

pub use damage::*;
pub use pressure::*;
