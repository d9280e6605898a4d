//! Common test utilities and assertion helpers.
//!
//! Grid-wide invariant checks shared by the integration tests.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::collections::HashMap;
use std::ops::DerefMut;

use bandgrid::grid::{CellId, Chain, EntityDefinition, EntityId, VirtualGrid};

// Re-export fixtures for convenience
pub use super::fixtures::*;

// ============================================================================
// Chain Invariants
// ============================================================================

/// Offsets and index offsets of a chain follow from the sizes.
pub fn assert_chain_consistent<T>(chain: &Chain<T>, what: &str)
where
    T: DerefMut<Target = EntityDefinition>,
{
    let mut offset = 0;
    let mut index = 1;
    for (id, entity) in chain.iter() {
        assert_eq!(entity.offset(), offset, "{what} {id:?} offset");
        assert_eq!(entity.index_offset(), index, "{what} {id:?} index offset");
        assert_eq!(entity.bound(), entity.offset() + entity.size);
        offset = entity.bound();
        index += 1;
    }
    assert_eq!(chain.iter().count(), chain.len(), "{what} length");
}

/// The entity `steps` positions after `start`.
pub fn walk<T>(chain: &Chain<T>, start: EntityId<T>, steps: u32) -> EntityId<T>
where
    T: DerefMut<Target = EntityDefinition>,
{
    let mut current = start;
    for _ in 0..steps {
        current = chain.next(current).expect("walked past the end of the chain");
    }
    current
}

// ============================================================================
// Grid Invariants
// ============================================================================

/// Every solid cell sits in exactly one row and one column; floating cells
/// in neither.
pub fn assert_coverage(grid: &VirtualGrid) {
    let mut rows: HashMap<CellId, usize> = HashMap::new();
    for (_, row) in grid.row_chain().iter() {
        for &id in &row.objects {
            *rows.entry(id).or_default() += 1;
        }
    }
    let mut columns: HashMap<CellId, usize> = HashMap::new();
    for (_, column) in grid.column_chain().iter() {
        for &id in &column.objects {
            *columns.entry(id).or_default() += 1;
        }
    }

    let floating: Vec<&str> = grid.floating_cells().iter().map(|cell| cell.name()).collect();
    for (id, cell) in grid.cells().iter() {
        if floating.contains(&cell.name()) {
            assert!(!rows.contains_key(&id), "floating {} in a row", cell.name());
            assert!(!columns.contains_key(&id), "floating {} in a column", cell.name());
            continue;
        }
        if rows.get(&id).is_none() && columns.get(&id).is_none() {
            // Dropped by discard_floating.
            continue;
        }
        assert_eq!(rows.get(&id), Some(&1), "{} row occurrences", cell.name());
        assert_eq!(columns.get(&id), Some(&1), "{} column occurrences", cell.name());
    }
}

/// Solid cells start on their owning column and end inside the last column
/// they span.
pub fn assert_solid_geometry(grid: &VirtualGrid) {
    let columns = grid.column_chain();
    for (_, column) in columns.iter() {
        for &id in &column.objects {
            let cell = grid.cell(id).unwrap();
            let start = cell.owning_column().unwrap();
            assert_eq!(cell.x, columns.get(start).unwrap().offset(), "{} x", cell.name());
            let end = columns.get(walk(columns, start, cell.column_span - 1)).unwrap();
            assert!(
                end.offset() < cell.right_bound() && cell.right_bound() <= end.bound(),
                "{} right bound {} outside {}..{}",
                cell.name(),
                cell.right_bound(),
                end.offset(),
                end.bound()
            );
        }
    }
    let rows = grid.row_chain();
    for (row_id, row) in rows.iter() {
        for &id in &row.objects {
            let cell = grid.cell(id).unwrap();
            assert_eq!(cell.owning_row(), Some(row_id));
            assert_eq!(cell.y, row.offset(), "{} y", cell.name());
        }
    }
}

/// Every band's rows add up to its configured height.
pub fn assert_band_coverage(grid: &VirtualGrid, bands: &[bandgrid::Band], tolerance: i32) {
    for band in bands {
        let rows = grid.band(&band.name).unwrap();
        let total: i32 = rows
            .rows
            .iter()
            .map(|&id| grid.row(id).unwrap().size)
            .sum();
        assert!(
            (total - band.height).abs() <= tolerance,
            "band {} covers {total}px, configured {}",
            band.name,
            band.height
        );
    }
}

/// Floating cells lie inside the rows and columns they are anchored over.
pub fn assert_floating_contained(grid: &VirtualGrid) {
    let columns = grid.column_chain();
    let rows = grid.row_chain();
    for cell in grid.floating_cells() {
        let offset = cell.offset();
        let start = columns.get(offset.start_column).unwrap();
        let end = columns
            .get(walk(columns, offset.start_column, offset.column_span - 1))
            .unwrap();
        assert!(start.offset() <= cell.x, "{} starts left of its column", cell.name());
        assert!(end.bound() >= cell.right_bound(), "{} ends right of its span", cell.name());
        assert_eq!(start.offset() + offset.start_offset.x, cell.x);
        assert_eq!(end.bound() - offset.end_offset.x, cell.right_bound());

        let start = rows.get(offset.start_row).unwrap();
        let end = rows
            .get(walk(rows, offset.start_row, offset.row_span - 1))
            .unwrap();
        assert!(start.offset() <= cell.y, "{} starts above its row", cell.name());
        assert!(end.bound() >= cell.lower_bound(), "{} ends below its span", cell.name());
        assert_eq!(start.offset() + offset.start_offset.y, cell.y);
    }
}

/// All structural invariants of a built grid.
pub fn assert_grid_invariants(grid: &VirtualGrid, bands: &[bandgrid::Band], tolerance: i32) {
    assert_chain_consistent(grid.row_chain(), "row");
    assert_chain_consistent(grid.column_chain(), "column");
    assert_coverage(grid);
    assert_solid_geometry(grid);
    assert_band_coverage(grid, bands, tolerance);
    assert_floating_contained(grid);
}
