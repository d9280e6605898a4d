//! Output side of the grid: the row consumer hook and the banded emitter
//! that drives it once per data row.

mod emitter;

use serde::Serialize;

use crate::error::Result;
use crate::grid::{RowId, VirtualGrid};
use crate::types::AttributeMap;

pub use emitter::BandedEmitter;

/// A cell placed by a row consumer, reported back for diagnostics.
///
/// Row and column are 1-based index offsets into the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedCell {
    pub control_name: String,
    pub row: u32,
    pub column: u32,
    pub row_span: u32,
    pub column_span: u32,
    pub floating: bool,
}

impl ExportedCell {
    /// Cells of `rows` that a writer would place for `attributes`.
    ///
    /// A cell is placed when it has attributes and they are visible. Solid
    /// cells come first in row order, then the floating cells anchored on
    /// those rows.
    pub fn collect(grid: &VirtualGrid, rows: &[RowId], attributes: &AttributeMap) -> Vec<Self> {
        let visible = |name: &str| attributes.get(name).is_some_and(|attrs| attrs.visible);
        let column_index = |id| grid.column(id).map_or(0, |column| column.index_offset());

        let mut exported = Vec::new();
        for &row_id in rows {
            let Some(row) = grid.row(row_id) else {
                continue;
            };
            for cell in grid.row_cells(row_id).filter(|cell| visible(cell.name())) {
                exported.push(Self {
                    control_name: cell.name().to_owned(),
                    row: row.index_offset(),
                    column: cell.owning_column().map_or(0, column_index),
                    row_span: 1,
                    column_span: cell.column_span,
                    floating: false,
                });
            }
        }
        for &row_id in rows {
            let Some(row) = grid.row(row_id) else {
                continue;
            };
            for cell in grid
                .row_floating_cells(row_id)
                .filter(|cell| visible(cell.name()))
            {
                let offset = cell.offset();
                exported.push(Self {
                    control_name: cell.name().to_owned(),
                    row: row.index_offset(),
                    column: column_index(offset.start_column),
                    row_span: offset.row_span,
                    column_span: offset.column_span,
                    floating: true,
                });
            }
        }
        exported
    }
}

/// Format-specific output hook driven by [`BandedEmitter`].
///
/// Implementations render or record the rows they are handed. Failures are
/// reported as [`GridError::Writer`](crate::error::GridError::Writer).
pub trait RowConsumer {
    /// Write `rows` (top to bottom) with the attributes of one data row.
    ///
    /// The returned cells are only counted and logged by the emitter.
    fn write_rows(
        &mut self,
        grid: &VirtualGrid,
        rows: &[RowId],
        attributes: &AttributeMap,
    ) -> Result<Option<Vec<ExportedCell>>>;

    /// Finalise the output, optionally under a sheet name.
    fn write(&mut self, _sheet_name: Option<&str>) -> Result<()> {
        Ok(())
    }
}

/// Row consumer that keeps every placed cell in memory.
#[derive(Debug, Clone, Default)]
pub struct CellCollector {
    pub cells: Vec<ExportedCell>,
    /// Sheet names passed to `write`, one entry per finalisation
    pub sheets: Vec<Option<String>>,
}

impl CellCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowConsumer for CellCollector {
    fn write_rows(
        &mut self,
        grid: &VirtualGrid,
        rows: &[RowId],
        attributes: &AttributeMap,
    ) -> Result<Option<Vec<ExportedCell>>> {
        let exported = ExportedCell::collect(grid, rows, attributes);
        self.cells.extend(exported.iter().cloned());
        Ok(Some(exported))
    }

    fn write(&mut self, sheet_name: Option<&str>) -> Result<()> {
        self.sheets.push(sheet_name.map(str::to_owned));
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::builder::GridBuilder;
    use crate::types::{Band, Control, ControlAttributes, ControlMatrix};

    fn grid() -> VirtualGrid {
        let matrix = ControlMatrix::new(
            vec![
                Control::new("title", "header", 0, 0, 60, 20),
                Control::new("logo", "header", 70, 0, 30, 20),
                Control::new("line", "header", 0, 5, 100, 2).floating(),
            ],
            Band::stacked([("header", 20)]),
        );
        GridBuilder::new().build(&matrix).unwrap()
    }

    #[test]
    fn test_collect_skips_unbound_and_hidden_cells() {
        let grid = grid();
        let mut attributes = AttributeMap::new();
        attributes.insert("title".into(), ControlAttributes::text("Invoices"));
        attributes.insert("logo".into(), ControlAttributes::default().hidden());

        let exported = ExportedCell::collect(&grid, grid.rows(), &attributes);
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].control_name, "title");
        assert_eq!(exported[0].row, 1);
        assert_eq!(exported[0].column, 1);
        assert!(!exported[0].floating);
    }

    #[test]
    fn test_collect_reports_floating_spans() {
        let grid = grid();
        let mut attributes = AttributeMap::new();
        attributes.insert("line".into(), ControlAttributes::default());

        let exported = ExportedCell::collect(&grid, grid.rows(), &attributes);
        assert_eq!(exported.len(), 1);
        assert!(exported[0].floating);
        assert_eq!(exported[0].column, 1);
        assert_eq!(
            exported[0].column_span,
            u32::try_from(grid.columns().len()).unwrap()
        );
    }

    #[test]
    fn test_collector_records_sheets() {
        let mut collector = CellCollector::new();
        collector.write(Some("Sheet1")).unwrap();
        collector.write(None).unwrap();
        assert_eq!(collector.sheets, vec![Some("Sheet1".to_owned()), None]);
    }
}
