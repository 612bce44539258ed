//! Generation - procedural creation of the retinal cell layer.

mod cells;

pub use cells::*;
