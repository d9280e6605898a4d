//! bandgrid - virtual grids for banded report layouts
//!
//! Reconciles absolutely positioned, band-grouped report controls into a
//! gap-free grid of rows and columns that spreadsheet and document writers
//! can consume directly:
//! - Threshold-based snapping of nearly aligned controls
//! - Band-tagged rows, filler rows for empty bands
//! - Columns derived from control edges, narrow columns dissolved
//! - Floating controls anchored over row/column spans
//! - A banded emitter that fires group trailers on group breaks
//!
//! # Usage
//!
//! ```no_run
//! use bandgrid::{ControlMatrix, GridBuilder};
//!
//! # fn main() -> bandgrid::error::Result<()> {
//! let json = std::fs::read_to_string("report.json")?;
//! let matrix = ControlMatrix::from_json_str(&json)?;
//! let grid = GridBuilder::new().with_thresholds(3, 3).build(&matrix)?;
//! println!("{}", grid.snapshot().to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod error;
pub mod grid;
pub mod types;
pub mod writer;

pub use builder::{BuilderOptions, GridBuilder};
pub use error::{GridError, Result};
pub use grid::VirtualGrid;
pub use types::*;
pub use writer::{BandedEmitter, CellCollector, ExportedCell, RowConsumer};
