//! Plain data records for the simulation.
//!
//! Components carry no behavior beyond simple accessors - mutation
//! lives in `Population` and the systems.

mod cell;
mod common;

pub use cell::*;
pub use common::*;
