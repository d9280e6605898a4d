//! Input model consumed by the grid builder and the banded emitter.

mod attributes;
mod band;
mod control;
mod report;

pub use attributes::*;
pub use band::*;
pub use control::*;
pub use report::*;
