//! The virtual grid: rows, columns, bands and the cells placed on them.

mod band_rows;
pub(crate) mod cell;
mod column;
pub(crate) mod entity;
mod repository;
mod row;
mod snapshot;

use std::fmt;

pub use band_rows::BandRows;
pub use cell::{CellId, FloatingCellId, FloatingCellOffset, FloatingVirtualCell, Point, VirtualCell};
pub use column::ColumnDefinition;
pub use entity::{Chain, EntityDefinition, EntityId};
pub use repository::VirtualCellRepository;
pub use row::RowDefinition;
pub use snapshot::{BandSnapshot, CellSnapshot, EntitySnapshot, FloatingSnapshot, GridSnapshot, RowSnapshot};

use crate::error::Result;
use crate::types::{AttributeMap, ControlAttributes, ReportType};

pub type ColumnId = EntityId<ColumnDefinition>;
pub type RowId = EntityId<RowDefinition>;

/// A built grid, ready to be handed to a row consumer.
///
/// Structure is fixed once the builder returns it. The attribute map is
/// bound separately, once per data row, through [`VirtualGrid::bind_attributes`].
#[derive(Debug, Clone)]
pub struct VirtualGrid {
    rows: Chain<RowDefinition>,
    columns: Chain<ColumnDefinition>,
    row_order: Vec<RowId>,
    column_order: Vec<ColumnId>,
    bands: Vec<BandRows>,
    cells: VirtualCellRepository,
    floating: Vec<FloatingVirtualCell>,
    report_type: ReportType,
    attributes: AttributeMap,
    attributes_version: u64,
}

impl VirtualGrid {
    pub(crate) fn new(
        rows: Chain<RowDefinition>,
        columns: Chain<ColumnDefinition>,
        bands: Vec<BandRows>,
        cells: VirtualCellRepository,
        floating: Vec<FloatingVirtualCell>,
        report_type: ReportType,
    ) -> Self {
        Self {
            row_order: rows.ids(),
            column_order: columns.ids(),
            rows,
            columns,
            bands,
            cells,
            floating,
            report_type,
            attributes: AttributeMap::new(),
            attributes_version: 0,
        }
    }

    /// Rows in top to bottom order.
    pub fn rows(&self) -> &[RowId] {
        &self.row_order
    }

    /// Columns in left to right order.
    pub fn columns(&self) -> &[ColumnId] {
        &self.column_order
    }

    pub fn row(&self, id: RowId) -> Option<&RowDefinition> {
        self.rows.get(id)
    }

    pub fn column(&self, id: ColumnId) -> Option<&ColumnDefinition> {
        self.columns.get(id)
    }

    pub fn row_chain(&self) -> &Chain<RowDefinition> {
        &self.rows
    }

    pub fn column_chain(&self) -> &Chain<ColumnDefinition> {
        &self.columns
    }

    pub fn bands(&self) -> &[BandRows] {
        &self.bands
    }

    pub fn band(&self, name: &str) -> Option<&BandRows> {
        self.bands.iter().find(|band| band.name == name)
    }

    pub fn cells(&self) -> &VirtualCellRepository {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> Option<&VirtualCell> {
        self.cells.get(id)
    }

    pub fn floating_cells(&self) -> &[FloatingVirtualCell] {
        &self.floating
    }

    pub fn floating_cell(&self, id: FloatingCellId) -> Option<&FloatingVirtualCell> {
        self.floating.get(id.0)
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type
    }

    /// Total width covered by the columns.
    pub fn width(&self) -> i32 {
        self.columns
            .last()
            .and_then(|id| self.columns.get(id))
            .map_or(0, |column| column.bound())
    }

    /// Total height covered by the rows.
    pub fn height(&self) -> i32 {
        self.rows
            .last()
            .and_then(|id| self.rows.get(id))
            .map_or(0, |row| row.bound())
    }

    /// Solid cells of a row, left to right.
    pub fn row_cells(&self, id: RowId) -> impl Iterator<Item = &VirtualCell> + '_ {
        self.rows
            .get(id)
            .into_iter()
            .flat_map(|row| row.objects.iter())
            .filter_map(|&cell| self.cells.get(cell))
    }

    /// Floating cells anchored on a row.
    pub fn row_floating_cells(&self, id: RowId) -> impl Iterator<Item = &FloatingVirtualCell> + '_ {
        self.rows
            .get(id)
            .into_iter()
            .flat_map(|row| row.floating_objects.iter())
            .filter_map(|&cell| self.floating_cell(cell))
    }

    /// Merge per-control attributes for the next data row.
    ///
    /// Returns the new attribute version; every call bumps it, even when the
    /// values did not change.
    pub fn bind_attributes(&mut self, attributes: AttributeMap) -> u64 {
        self.attributes.extend(attributes);
        self.attributes_version += 1;
        self.attributes_version
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&ControlAttributes> {
        self.attributes.get(name)
    }

    pub fn attributes_version(&self) -> u64 {
        self.attributes_version
    }

    /// Split a column at `at` pixels from its left edge.
    ///
    /// Floating anchors are left untouched; they still reference the left part.
    pub fn split_column(&mut self, id: ColumnId, at: i32) -> Result<ColumnId> {
        let right = self.columns.split(id, at, &mut self.cells)?;
        self.column_order = self.columns.ids();
        Ok(right)
    }

    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot::capture(self)
    }
}

impl fmt::Display for VirtualGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows:")?;
        for (_, row) in self.rows.iter() {
            write!(f, "  {row}")?;
            for cell in row.objects.iter().filter_map(|&id| self.cells.get(id)) {
                write!(f, " {cell}")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Columns:")?;
        for (_, column) in self.columns.iter() {
            writeln!(f, "  {column}")?;
        }

        writeln!(f, "Bands:")?;
        for band in &self.bands {
            let rows: Vec<String> = band
                .rows
                .iter()
                .filter_map(|&id| self.rows.get(id))
                .map(|row| row.index_offset().to_string())
                .collect();
            writeln!(f, "  {} [{}]", band.name, rows.join(", "))?;
        }

        if !self.floating.is_empty() {
            writeln!(f, "Floating:")?;
            for cell in &self.floating {
                let offset = cell.offset();
                writeln!(
                    f,
                    "  {} rows={} columns={}",
                    **cell, offset.row_span, offset.column_span
                )?;
            }
        }
        Ok(())
    }
}
