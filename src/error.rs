//! Structured error types for bandgrid.
//!
//! Every failure of the grid builder, the entity chains and the banded
//! emitter is reported through [`GridError`]. Builder errors are fatal: the
//! first one aborts the build and no partial grid is returned.

use std::fmt;

/// Axis a lookup was performed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Columns (X positions).
    Horizontal,
    /// Rows (Y positions).
    Vertical,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Horizontal => f.write_str("column"),
            Self::Vertical => f.write_str("row"),
        }
    }
}

/// Which edge of a control failed to map onto a column boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Left,
    Right,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// All errors that can occur while building or emitting a virtual grid.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// A solid control is not registered in exactly one row and one column.
    #[error("Inconsistent control: {name}")]
    InconsistentControl { name: String },

    /// A materialized row could not be assigned to any band.
    #[error("Row at offset {offset} doesn't belong to any band")]
    BandlessRow { offset: i32 },

    /// A control edge does not coincide with any column boundary.
    #[error("Could not find a column {edge} boundary at {position} for control {name}")]
    UnmappedBoundary {
        name: String,
        edge: Edge,
        position: i32,
    },

    /// A non-empty column was dissolved without a right-side replacement.
    #[error("Attempting to dissolve non-empty column at offset {offset} without right-side replacement")]
    DissolutionTarget { offset: i32 },

    /// A control owned by a dissolved column already spans a single column.
    #[error("Attempting to dissolve column with unmovable control {name}")]
    UnmovableControl { name: String },

    /// No anchoring column or row could be found for a floating control.
    #[error("Could not find an anchoring {axis} for floating control {name}")]
    NoAnchor { name: String, axis: Axis },

    /// A filler row scheduled for dissolution owns content.
    #[error("Filler row at offset {offset} has content")]
    FillerHasContent { offset: i32 },

    /// An entity id does not belong to the chain it was used with.
    #[error("Unknown chain entity #{index}")]
    UnknownEntity { index: usize },

    /// A cell id does not belong to the repository.
    #[error("Unknown cell #{index}")]
    UnknownCell { index: usize },

    /// Removing a chain entity that still owns cells.
    #[error("Cannot remove chain entity #{index} with controls in it")]
    EntityOccupied { index: usize },

    /// Splitting a column outside its extent.
    #[error("Split point {at} is outside the column (size {size})")]
    SplitOutOfRange { at: i32, size: i32 },

    /// Rejected input or configuration, before any mutation happened.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Two controls share the same name.
    #[error("Duplicate control name: {name}")]
    DuplicateControl { name: String },

    /// A control references a band missing from the band list.
    #[error("Control {control} references unknown band {band}")]
    UnknownBand { control: String, band: String },

    /// A control carries geometry the builder cannot place.
    #[error("Invalid control {name}: {reason}")]
    InvalidControl { name: String, reason: String },

    /// The emitter was disposed and cannot be driven anymore.
    #[error("Writer is already closed")]
    WriterClosed,

    /// The row consumer failed while writing rows.
    #[error("Writer error: {0}")]
    Writer(String),

    /// JSON (de)serialization error from serde_json.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridError {
    /// Name of the control implicated in the error, when there is one.
    pub fn control_name(&self) -> Option<&str> {
        match self {
            Self::InconsistentControl { name }
            | Self::UnmappedBoundary { name, .. }
            | Self::UnmovableControl { name }
            | Self::NoAnchor { name, .. }
            | Self::DuplicateControl { name }
            | Self::InvalidControl { name, .. } => Some(name),
            Self::UnknownBand { control, .. } => Some(control),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GridError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_inconsistent_control_message() {
        let err = GridError::InconsistentControl {
            name: "t_total".into(),
        };
        assert_eq!(err.to_string(), "Inconsistent control: t_total");
        assert_eq!(err.control_name(), Some("t_total"));
    }

    #[test]
    fn test_no_anchor_names_axis() {
        let err = GridError::NoAnchor {
            name: "line_1".into(),
            axis: Axis::Vertical,
        };
        assert_eq!(
            err.to_string(),
            "Could not find an anchoring row for floating control line_1"
        );
    }

    #[test]
    fn test_control_name_absent_for_structural_errors() {
        assert_eq!(GridError::BandlessRow { offset: 4 }.control_name(), None);
        assert_eq!(GridError::WriterClosed.control_name(), None);
    }
}
