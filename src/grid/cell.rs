//! Controls placed in the virtual grid.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::Serialize;

use super::{ColumnId, RowId};
use crate::types::Control;

/// Stable handle of a cell inside the cell repository.
///
/// Cells are identified by handle, never by value: two cells with identical
/// geometry are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub(crate) usize);

impl CellId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle of a floating cell inside a built grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FloatingCellId(pub(crate) usize);

impl FloatingCellId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A pixel offset pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A control placed in the grid.
///
/// Geometry starts as a copy of the control's and is adjusted while the grid
/// is reconciled (threshold merges, absorbed gaps, dissolved columns).
#[derive(Debug, Clone)]
pub struct VirtualCell {
    control: Control,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Number of consecutive columns covered, starting at the owning column
    pub column_span: u32,
    pub(crate) owning_row: Option<RowId>,
    pub(crate) owning_column: Option<ColumnId>,
}

impl VirtualCell {
    pub fn new(control: Control) -> Self {
        Self {
            x: control.x,
            y: control.y,
            width: control.width,
            height: control.height,
            column_span: 1,
            owning_row: None,
            owning_column: None,
            control,
        }
    }

    /// The positioned control this cell wraps.
    pub fn control(&self) -> &Control {
        &self.control
    }

    pub fn name(&self) -> &str {
        &self.control.name
    }

    pub fn band(&self) -> &str {
        &self.control.band
    }

    pub fn right_bound(&self) -> i32 {
        self.x + self.width
    }

    pub fn lower_bound(&self) -> i32 {
        self.y + self.height
    }

    pub fn owning_row(&self) -> Option<RowId> {
        self.owning_row
    }

    pub fn owning_column(&self) -> Option<ColumnId> {
        self.owning_column
    }

    pub(crate) fn detach(&mut self) {
        self.owning_row = None;
        self.owning_column = None;
    }

    /// Whether the horizontal extents of two cells intersect.
    pub(crate) fn overlaps_horizontally(&self, other: &VirtualCell) -> bool {
        (other.x >= self.x && other.x < self.right_bound())
            || (other.right_bound() > self.x && other.right_bound() <= self.right_bound())
    }
}

impl fmt::Display for VirtualCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@({},{} {}x{} span={})",
            self.control.name, self.x, self.y, self.width, self.height, self.column_span
        )
    }
}

/// Anchor of a floating cell: the column/row span it is drawn over and the
/// pixel distances from the span's edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatingCellOffset {
    pub start_column: ColumnId,
    pub start_row: RowId,
    /// Distance from the start column/row offsets to the cell's left/top edge
    pub start_offset: Point,
    /// Distance from the cell's right/bottom edge to the end column/row bound
    pub end_offset: Point,
    pub row_span: u32,
    pub column_span: u32,
}

/// A cell excluded from the solid grid, drawn independently over its anchor.
#[derive(Debug, Clone)]
pub struct FloatingVirtualCell {
    cell: VirtualCell,
    offset: FloatingCellOffset,
}

impl FloatingVirtualCell {
    /// Decorate a cell with its computed anchor.
    pub fn from_virtual_cell(cell: &VirtualCell, offset: FloatingCellOffset) -> Self {
        let mut cell = cell.clone();
        cell.owning_column = Some(offset.start_column);
        cell.owning_row = Some(offset.start_row);
        Self { cell, offset }
    }

    pub fn offset(&self) -> &FloatingCellOffset {
        &self.offset
    }
}

impl Deref for FloatingVirtualCell {
    type Target = VirtualCell;

    fn deref(&self) -> &VirtualCell {
        &self.cell
    }
}

impl DerefMut for FloatingVirtualCell {
    fn deref_mut(&mut self) -> &mut VirtualCell {
        &mut self.cell
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::grid::entity::EntityId;

    #[test]
    fn test_cell_copies_control_geometry() {
        let cell = VirtualCell::new(Control::new("t1", "detail", 10, 20, 80, 15));
        assert_eq!(cell.name(), "t1");
        assert_eq!(cell.band(), "detail");
        assert_eq!(cell.right_bound(), 90);
        assert_eq!(cell.lower_bound(), 35);
        assert_eq!(cell.column_span, 1);
        assert!(cell.owning_row().is_none());
    }

    #[test]
    fn test_horizontal_overlap() {
        let a = VirtualCell::new(Control::new("a", "detail", 10, 0, 50, 10));
        let b = VirtualCell::new(Control::new("b", "detail", 40, 0, 50, 10));
        let c = VirtualCell::new(Control::new("c", "detail", 60, 0, 50, 10));
        assert!(a.overlaps_horizontally(&b));
        assert!(!a.overlaps_horizontally(&c));
        assert!(b.overlaps_horizontally(&c));
    }

    #[test]
    fn test_floating_cell_takes_anchor_ownership() {
        let cell = VirtualCell::new(Control::new("logo", "header", 5, 5, 20, 20));
        let offset = FloatingCellOffset {
            start_column: EntityId::new(2),
            start_row: EntityId::new(1),
            start_offset: Point::new(5, 5),
            end_offset: Point::new(0, 3),
            row_span: 1,
            column_span: 2,
        };
        let floating = FloatingVirtualCell::from_virtual_cell(&cell, offset);
        assert_eq!(floating.owning_column(), Some(EntityId::new(2)));
        assert_eq!(floating.owning_row(), Some(EntityId::new(1)));
        assert_eq!(floating.offset().column_span, 2);
        assert_eq!(floating.name(), "logo");
    }
}
