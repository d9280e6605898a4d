//! Serializable description of a built grid.
//!
//! Rows and columns are referenced by their 1-based index offsets, bands by
//! name, so a snapshot can be diffed and inspected without the arenas.

use serde::Serialize;

use super::cell::Point;
use super::VirtualGrid;
use crate::types::{BandType, ReportType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSnapshot {
    pub report_type: ReportType,
    pub width: i32,
    pub height: i32,
    pub columns: Vec<EntitySnapshot>,
    pub rows: Vec<RowSnapshot>,
    pub bands: Vec<BandSnapshot>,
    pub cells: Vec<CellSnapshot>,
    pub floating: Vec<FloatingSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnapshot {
    pub index: u32,
    pub offset: i32,
    pub size: i32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub filler: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub padding: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSnapshot {
    #[serde(flatten)]
    pub entity: EntitySnapshot,
    pub band: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandSnapshot {
    pub name: String,
    pub band_type: BandType,
    pub repeatable: bool,
    pub rows: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_header: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_trailers: Vec<String>,
}

/// Placement of a solid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSnapshot {
    pub name: String,
    pub band: String,
    pub row: u32,
    pub column: u32,
    pub column_span: u32,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Anchor of a floating cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatingSnapshot {
    pub name: String,
    pub band: String,
    pub start_row: u32,
    pub start_column: u32,
    pub row_span: u32,
    pub column_span: u32,
    pub start_offset: Point,
    pub end_offset: Point,
}

impl GridSnapshot {
    pub(super) fn capture(grid: &VirtualGrid) -> Self {
        let columns = grid
            .column_chain()
            .iter()
            .map(|(_, column)| EntitySnapshot {
                index: column.index_offset(),
                offset: column.offset(),
                size: column.size,
                filler: column.is_filler,
                padding: column.is_padding,
            })
            .collect();

        let rows = grid
            .row_chain()
            .iter()
            .map(|(_, row)| RowSnapshot {
                entity: EntitySnapshot {
                    index: row.index_offset(),
                    offset: row.offset(),
                    size: row.size,
                    filler: row.is_filler,
                    padding: row.is_padding,
                },
                band: row.band_name.clone(),
            })
            .collect();

        let band_name = |index: usize| grid.bands().get(index).map(|band| band.name.clone());
        let bands = grid
            .bands()
            .iter()
            .map(|band| BandSnapshot {
                name: band.name.clone(),
                band_type: band.band_type,
                repeatable: band.repeatable,
                rows: band
                    .rows
                    .iter()
                    .filter_map(|&id| grid.row(id).map(|row| row.index_offset()))
                    .collect(),
                related_header: band.related_header.and_then(band_name),
                related_trailers: band
                    .related_trailers
                    .iter()
                    .filter_map(|&index| band_name(index))
                    .collect(),
            })
            .collect();

        let mut cells: Vec<CellSnapshot> = grid
            .row_chain()
            .iter()
            .flat_map(|(_, row)| row.objects.iter())
            .filter_map(|&id| {
                let cell = grid.cells().get(id)?;
                let row = grid.row(cell.owning_row()?)?;
                let column = grid.column(cell.owning_column()?)?;
                Some(CellSnapshot {
                    name: cell.name().to_owned(),
                    band: cell.band().to_owned(),
                    row: row.index_offset(),
                    column: column.index_offset(),
                    column_span: cell.column_span,
                    x: cell.x,
                    y: cell.y,
                    width: cell.width,
                    height: cell.height,
                })
            })
            .collect();
        cells.sort_by_key(|cell| (cell.row, cell.column));

        let floating = grid
            .floating_cells()
            .iter()
            .filter_map(|cell| {
                let offset = cell.offset();
                Some(FloatingSnapshot {
                    name: cell.name().to_owned(),
                    band: cell.band().to_owned(),
                    start_row: grid.row(offset.start_row)?.index_offset(),
                    start_column: grid.column(offset.start_column)?.index_offset(),
                    row_span: offset.row_span,
                    column_span: offset.column_span,
                    start_offset: offset.start_offset,
                    end_offset: offset.end_offset,
                })
            })
            .collect();

        Self {
            report_type: grid.report_type(),
            width: grid.width(),
            height: grid.height(),
            columns,
            rows,
            bands,
            cells,
            floating,
        }
    }

    /// Pretty printed JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
