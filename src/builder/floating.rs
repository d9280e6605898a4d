//! Anchoring of floating cells onto the finished row and column chains.

use std::collections::BTreeSet;
use std::ops::DerefMut;

use log::trace;

use crate::error::{Axis, GridError, Result};
use crate::grid::{
    CellId, Chain, ColumnDefinition, EntityDefinition, EntityId, FloatingCellId,
    FloatingCellOffset, FloatingVirtualCell, Point, RowDefinition, VirtualCell,
    VirtualCellRepository,
};

/// Where an extent lands on one axis.
struct Anchor<T> {
    start: EntityId<T>,
    span: u32,
    /// Distance from the start entity's offset to the extent's start
    lead: i32,
    /// Distance from the extent's end to the end entity's bound
    trail: i32,
}

/// Find the entity closest to the left of (or at) `from`, then walk forward
/// until an entity's bound covers `to`.
fn anchor<T>(chain: &Chain<T>, from: i32, to: i32) -> Option<Anchor<T>>
where
    T: DerefMut<Target = EntityDefinition>,
{
    let (start, lead) = chain
        .iter()
        .filter_map(|(id, entity)| {
            let distance = from - entity.offset();
            (distance >= 0).then_some((id, distance))
        })
        .min_by_key(|&(_, distance)| distance)?;

    let mut span = 1;
    let mut current = Some(start);
    while let Some(id) = current {
        let bound = chain.get(id)?.bound();
        if bound >= to {
            return Some(Anchor {
                start,
                span,
                lead,
                trail: bound - to,
            });
        }
        span += 1;
        current = chain.next(id);
    }
    None
}

/// Compute the column/row span a floating cell is drawn over.
pub fn map_floating_control(
    columns: &Chain<ColumnDefinition>,
    rows: &Chain<RowDefinition>,
    cell: &VirtualCell,
) -> Result<FloatingCellOffset> {
    let no_anchor = |axis: Axis| GridError::NoAnchor {
        name: cell.name().to_owned(),
        axis,
    };
    let horizontal = anchor(columns, cell.x, cell.right_bound())
        .ok_or_else(|| no_anchor(Axis::Horizontal))?;
    let vertical =
        anchor(rows, cell.y, cell.lower_bound()).ok_or_else(|| no_anchor(Axis::Vertical))?;

    Ok(FloatingCellOffset {
        start_column: horizontal.start,
        start_row: vertical.start,
        start_offset: Point::new(horizontal.lead, vertical.lead),
        end_offset: Point::new(horizontal.trail, vertical.trail),
        row_span: vertical.span,
        column_span: horizontal.span,
    })
}

/// Anchor every floating cell and register it on its start row and column.
pub(crate) fn anchor_floating_cells(
    rows: &mut Chain<RowDefinition>,
    columns: &mut Chain<ColumnDefinition>,
    cells: &VirtualCellRepository,
    floating: &BTreeSet<CellId>,
) -> Result<Vec<FloatingVirtualCell>> {
    let mut anchored = Vec::with_capacity(floating.len());
    for &id in floating {
        let cell = cells.cell(id)?;
        let offset = map_floating_control(columns, rows, cell)?;
        trace!(
            "{} anchored at {:?}/{:?} spanning {}x{}",
            cell.name(),
            offset.start_row,
            offset.start_column,
            offset.row_span,
            offset.column_span
        );

        let floating_id = FloatingCellId(anchored.len());
        rows.node_mut(offset.start_row)?
            .floating_objects
            .push(floating_id);
        columns
            .node_mut(offset.start_column)?
            .floating_objects
            .push(floating_id);
        anchored.push(FloatingVirtualCell::from_virtual_cell(cell, offset));
    }
    Ok(anchored)
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
    use crate::types::Control;

    fn chains() -> (Chain<ColumnDefinition>, Chain<RowDefinition>) {
        let mut columns = Chain::new();
        for size in [20, 30, 50] {
            columns.append(ColumnDefinition::with_size(size));
        }
        let mut rows = Chain::new();
        for size in [10, 10, 20] {
            rows.append(RowDefinition::with_size(size).in_band("detail"));
        }
        (columns, rows)
    }

    #[test]
    fn test_anchor_spans_and_offsets() {
        let (columns, rows) = chains();
        let cell = VirtualCell::new(Control::new("line", "detail", 25, 5, 40, 20));
        let offset = map_floating_control(&columns, &rows, &cell).unwrap();

        let ids = columns.ids();
        assert_eq!(offset.start_column, ids[1]);
        assert_eq!(offset.column_span, 2);
        assert_eq!(offset.start_offset, Point::new(5, 5));
        // Column 3 ends at 100, the cell at 65; row 3 ends at 40, the cell at 25.
        assert_eq!(offset.end_offset, Point::new(35, 15));
        assert_eq!(offset.start_row, rows.first().unwrap());
        assert_eq!(offset.row_span, 3);
    }

    #[test]
    fn test_anchor_on_exact_boundaries() {
        let (columns, rows) = chains();
        let cell = VirtualCell::new(Control::new("box", "detail", 20, 10, 30, 10));
        let offset = map_floating_control(&columns, &rows, &cell).unwrap();
        assert_eq!(offset.column_span, 1);
        assert_eq!(offset.row_span, 1);
        assert_eq!(offset.start_offset, Point::new(0, 0));
        assert_eq!(offset.end_offset, Point::new(0, 0));
    }

    #[test]
    fn test_missing_anchor_names_axis() {
        let (columns, rows) = chains();
        let cell = VirtualCell::new(Control::new("wide", "detail", 0, 0, 150, 10));
        match map_floating_control(&columns, &rows, &cell) {
            Err(GridError::NoAnchor { name, axis }) => {
                assert_eq!(name, "wide");
                assert_eq!(axis, Axis::Horizontal);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let tall = VirtualCell::new(Control::new("tall", "detail", 0, 0, 10, 90));
        assert!(matches!(
            map_floating_control(&columns, &rows, &tall),
            Err(GridError::NoAnchor {
                axis: Axis::Vertical,
                ..
            })
        ));
    }

    #[test]
    fn test_floating_cells_are_registered_on_start_entities() {
        let (mut columns, mut rows) = chains();
        let cells = VirtualCellRepository::new(vec![
            Control::new("a", "detail", 25, 12, 10, 5).floating(),
            Control::new("b", "detail", 0, 0, 10, 5).floating(),
        ])
        .unwrap();
        let floating: BTreeSet<CellId> = cells.ids().collect();
        let anchored = anchor_floating_cells(&mut rows, &mut columns, &cells, &floating).unwrap();

        assert_eq!(anchored.len(), 2);
        assert_eq!(anchored[0].name(), "a");
        let second_row = rows.ids()[1];
        assert_eq!(rows.get(second_row).unwrap().floating_objects, vec![FloatingCellId(0)]);
        let first_column = columns.first().unwrap();
        assert_eq!(
            columns.get(first_column).unwrap().floating_objects,
            vec![FloatingCellId(1)]
        );
        assert_eq!(anchored[1].owning_row(), rows.first());
    }
}
