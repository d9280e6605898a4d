//! Column derivation: boundaries, cell mapping, dissolution, padding.

use std::collections::{BTreeSet, HashMap};

use log::{debug, trace};

use super::normalize::normalize_axis;
use crate::error::{Axis, Edge, GridError, Result};
use crate::grid::{CellId, Chain, ColumnDefinition, ColumnId, VirtualCell, VirtualCellRepository};

pub(crate) fn define_columns(
    cells: &mut VirtualCellRepository,
    floating: &BTreeSet<CellId>,
    threshold: i32,
) -> Result<Chain<ColumnDefinition>> {
    // Taken before normalization moves anything left.
    let rightmost = cells
        .iter()
        .map(|(_, cell)| cell.right_bound())
        .max()
        .unwrap_or(0);

    let by_x = cells.by_x().clone();
    let normalized = normalize_axis(&by_x, threshold, Axis::Horizontal, cells)?;

    let mut solid: Vec<CellId> = Vec::new();
    for ids in normalized.values() {
        let mut bucket: Vec<CellId> = ids
            .iter()
            .copied()
            .filter(|id| !floating.contains(id))
            .collect();
        bucket.sort_by_key(|&id| cells.get(id).map(|cell| cell.width));
        solid.extend(bucket);
    }

    let mut boundaries = vec![0];
    for &id in &solid {
        let cell = cells.cell(id)?;
        boundaries.push(cell.x);
        boundaries.push(cell.right_bound());
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut columns = Chain::new();
    let mut by_offset: HashMap<i32, ColumnId> = HashMap::new();
    let mut by_bound: HashMap<i32, ColumnId> = HashMap::new();
    for pair in boundaries.windows(2) {
        if let [from, to] = pair {
            let id = columns.append(ColumnDefinition::filler(to - from));
            by_offset.insert(*from, id);
            by_bound.insert(*to, id);
        }
    }

    for &id in &solid {
        map_cell(&mut columns, cells, id, &by_offset, &by_bound)?;
    }

    let mut dissolved = 0;
    for id in columns.ids() {
        if columns.node(id)?.size >= threshold {
            continue;
        }
        if !is_dissolvable(&columns, cells, id)? {
            trace!(
                "keeping narrow column at {}: it holds a single-span cell",
                columns.node(id)?.offset()
            );
            continue;
        }
        dissolve_column(&mut columns, cells, id)?;
        dissolved += 1;
    }
    columns.recalculate_offsets()?;

    let padded = pad_last_column(&mut columns, cells, rightmost, threshold)?;

    debug!(
        "defined {} columns ({} dissolved, padding {})",
        columns.len(),
        dissolved,
        padded
    );
    Ok(columns)
}

/// Register a cell on the column starting at its left edge and derive its
/// span from the column ending at its right edge.
fn map_cell(
    columns: &mut Chain<ColumnDefinition>,
    cells: &mut VirtualCellRepository,
    id: CellId,
    by_offset: &HashMap<i32, ColumnId>,
    by_bound: &HashMap<i32, ColumnId>,
) -> Result<()> {
    let cell = cells.cell(id)?;
    let (left, right) = (cell.x, cell.right_bound());
    let unmapped = |edge: Edge, position: i32| GridError::UnmappedBoundary {
        name: cell.name().to_owned(),
        edge,
        position,
    };

    let start = by_offset
        .get(&left)
        .copied()
        .ok_or_else(|| unmapped(Edge::Left, left))?;
    let end = by_bound
        .get(&right)
        .copied()
        .ok_or_else(|| unmapped(Edge::Right, right))?;
    let span = columns
        .node(end)?
        .index_offset()
        .checked_sub(columns.node(start)?.index_offset())
        .and_then(|steps| steps.checked_add(1))
        .ok_or_else(|| unmapped(Edge::Right, right))?;

    let cell = cells.cell_mut(id)?;
    cell.column_span = span;
    cell.owning_column = Some(start);

    let column = columns.node_mut(start)?;
    column.objects.push(id);
    column.is_filler = false;
    Ok(())
}

/// Apply `adjust` to every cell, in `from` or a column to its left, whose
/// span reaches `reach` columns past `from` (`reach` counted 1-based at `from`).
fn for_cells_reaching(
    columns: &Chain<ColumnDefinition>,
    cells: &mut VirtualCellRepository,
    from: ColumnId,
    reach: u32,
    mut adjust: impl FnMut(&mut VirtualCell),
) -> Result<()> {
    let mut reach = reach;
    let mut current = Some(from);
    while let Some(id) = current {
        for &cell_id in &columns.node(id)?.objects {
            let cell = cells.cell_mut(cell_id)?;
            if cell.column_span >= reach {
                adjust(cell);
            }
        }
        reach += 1;
        current = columns.previous(id);
    }
    Ok(())
}

/// A column can be dissolved when it is empty, or when it has a right
/// neighbour and every cell it owns spans at least two columns.
///
/// Earlier dissolutions can leave a cell covering nothing but a narrow
/// column; such a column stays.
fn is_dissolvable(
    columns: &Chain<ColumnDefinition>,
    cells: &VirtualCellRepository,
    id: ColumnId,
) -> Result<bool> {
    let column = columns.node(id)?;
    if column.objects.is_empty() {
        return Ok(true);
    }
    if columns.next(id).is_none() {
        return Ok(false);
    }
    for &cell_id in &column.objects {
        if cells.cell(cell_id)?.column_span <= 1 {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Merge a too-narrow column into its left neighbour (or, for the first
/// column, into its right neighbour).
fn dissolve_column(
    columns: &mut Chain<ColumnDefinition>,
    cells: &mut VirtualCellRepository,
    id: ColumnId,
) -> Result<()> {
    let (size, offset, occupied) = {
        let column = columns.node(id)?;
        (column.size, column.offset(), !column.objects.is_empty())
    };
    let previous = columns.previous(id);
    let next = columns.next(id);
    if occupied && next.is_none() {
        return Err(GridError::DissolutionTarget { offset });
    }
    trace!("dissolving column at {offset} (width {size})");

    match (previous, next) {
        (Some(previous), _) => {
            columns.node_mut(previous)?.size += size;
            for_cells_reaching(columns, cells, previous, 2, |cell| cell.column_span -= 1)?;
        }
        (None, Some(next)) => columns.node_mut(next)?.size += size,
        (None, None) => {}
    }

    let objects = std::mem::take(&mut columns.node_mut(id)?.objects);
    if let Some(next) = next {
        for &cell_id in &objects {
            let cell = cells.cell_mut(cell_id)?;
            if cell.column_span <= 1 {
                return Err(GridError::UnmovableControl {
                    name: cell.name().to_owned(),
                });
            }
            cell.column_span -= 1;
            cell.owning_column = Some(next);
            // The dissolved slice now belongs to the left neighbour.
            if previous.is_some() {
                cell.x += size;
                cell.width -= size;
            }
        }
        let next = columns.node_mut(next)?;
        if !objects.is_empty() {
            next.is_filler = false;
        }
        next.objects.extend(objects);
    }

    columns.unlink(id)
}

/// Stretch the last column, or append a padding column, so the columns
/// reach `rightmost`. Returns the added width.
fn pad_last_column(
    columns: &mut Chain<ColumnDefinition>,
    cells: &mut VirtualCellRepository,
    rightmost: i32,
    threshold: i32,
) -> Result<i32> {
    let Some(last) = columns.last() else {
        if rightmost > 0 {
            columns.append(ColumnDefinition::padding(rightmost));
        }
        return Ok(rightmost.max(0));
    };

    let padding = rightmost - columns.node(last)?.bound();
    if padding <= 0 {
        return Ok(0);
    }
    if padding <= threshold {
        columns.node_mut(last)?.size += padding;
        for_cells_reaching(columns, cells, last, 1, |cell| cell.width += padding)?;
    } else {
        columns.append(ColumnDefinition::padding(padding));
    }
    Ok(padding)
}

/// Splice empty filler columns out of the chain. Everything right of a
/// removed column moves left by its width; cells spanning across it lose it
/// from their span and width.
pub(crate) fn strip_filler_columns(
    columns: &mut Chain<ColumnDefinition>,
    cells: &mut VirtualCellRepository,
) -> Result<usize> {
    let mut removed = 0;
    for id in columns.ids() {
        let (offset, bound, empty_filler) = {
            let column = columns.node(id)?;
            (column.offset(), column.bound(), column.is_filler && column.is_empty())
        };
        if !empty_filler {
            continue;
        }
        if let Some(previous) = columns.previous(id) {
            for_cells_reaching(columns, cells, previous, 2, |cell| cell.column_span -= 1)?;
        }
        let ids: Vec<CellId> = cells.ids().collect();
        for cell_id in ids {
            let cell = cells.cell_mut(cell_id)?;
            let left = collapse(cell.x, offset, bound);
            let right = collapse(cell.right_bound(), offset, bound);
            cell.x = left;
            cell.width = right - left;
        }
        columns.remove_from_chain(id)?;
        removed += 1;
    }
    debug!("removed {removed} empty filler columns");
    Ok(removed)
}

/// Map a position onto the axis with `[offset, bound)` cut out.
fn collapse(position: i32, offset: i32, bound: i32) -> i32 {
    if position >= bound {
        position - (bound - offset)
    } else {
        position.min(offset)
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
    use crate::types::Control;

    fn build(controls: Vec<Control>, threshold: i32) -> (Chain<ColumnDefinition>, VirtualCellRepository) {
        let mut cells = VirtualCellRepository::new(controls).unwrap();
        let columns = define_columns(&mut cells, &BTreeSet::new(), threshold).unwrap();
        (columns, cells)
    }

    fn layout(columns: &Chain<ColumnDefinition>) -> Vec<(i32, i32, bool, bool)> {
        columns
            .iter()
            .map(|(_, c)| (c.offset(), c.size, c.is_filler, c.is_padding))
            .collect()
    }

    #[test]
    fn test_disjoint_cells_get_their_own_columns() {
        let (columns, cells) = build(
            vec![
                Control::new("a", "detail", 10, 10, 80, 20),
                Control::new("b", "detail", 100, 10, 80, 20),
            ],
            3,
        );
        assert_eq!(
            layout(&columns),
            vec![
                (0, 10, true, false),
                (10, 80, false, false),
                (90, 10, true, false),
                (100, 80, false, false),
            ]
        );
        for (_, cell) in cells.iter() {
            assert_eq!(cell.column_span, 1);
            let column = columns.get(cell.owning_column().unwrap()).unwrap();
            assert_eq!(column.offset(), cell.x);
        }
    }

    #[test]
    fn test_spans_cover_inner_boundaries() {
        let (columns, cells) = build(
            vec![
                Control::new("wide", "detail", 0, 0, 100, 10),
                Control::new("left", "header", 0, 20, 40, 10),
                Control::new("right", "header", 60, 20, 40, 10),
            ],
            3,
        );
        assert_eq!(columns.len(), 3);
        assert_eq!(cells.by_name("wide").unwrap().column_span, 3);
        assert_eq!(cells.by_name("left").unwrap().column_span, 1);
        assert_eq!(cells.by_name("right").unwrap().column_span, 1);
        let first = columns.get(columns.first().unwrap()).unwrap();
        assert_eq!(first.objects.len(), 2);
    }

    #[test]
    fn test_narrow_column_is_dissolved() {
        // "x" ends 2px past "a", leaving a 40..42 sliver where "b" starts.
        let (columns, cells) = build(
            vec![
                Control::new("a", "detail", 0, 0, 40, 10),
                Control::new("x", "detail", 0, 20, 42, 10),
                Control::new("b", "detail", 40, 40, 50, 10),
            ],
            3,
        );
        assert_eq!(layout(&columns), vec![(0, 42, false, false), (42, 48, false, false)]);
        let b = cells.by_name("b").unwrap();
        assert_eq!(b.column_span, 1);
        assert_eq!(b.x, 42);
        assert_eq!(b.width, 48);
        assert_eq!(b.owning_column(), columns.last());
        assert_eq!(cells.by_name("x").unwrap().column_span, 1);
        assert_eq!(cells.by_name("a").unwrap().column_span, 1);
    }

    #[test]
    fn test_narrow_column_holding_a_single_span_cell_is_kept() {
        // Normalization pulls "c" back to 55; dissolving 55..57 leaves "b"
        // covering only the 57..58 sliver.
        let (columns, cells) = build(
            vec![
                Control::new("a", "detail", 49, 0, 8, 10),
                Control::new("b", "detail", 55, 10, 3, 10),
                Control::new("c", "detail", 56, 20, 59, 10),
            ],
            3,
        );
        assert_eq!(
            layout(&columns),
            vec![
                (0, 49, true, false),
                (49, 8, false, false),
                (57, 1, false, false),
                (58, 57, true, false),
            ]
        );
        let b = cells.by_name("b").unwrap();
        assert_eq!((b.x, b.width, b.column_span), (57, 1, 1));
        let c = cells.by_name("c").unwrap();
        assert_eq!((c.x, c.width, c.column_span), (57, 58, 2));
        assert_eq!(b.owning_column(), c.owning_column());
        assert_eq!(cells.by_name("a").unwrap().column_span, 1);
    }

    #[test]
    fn test_dissolvable_columns() {
        let mut cells = VirtualCellRepository::new(vec![
            Control::new("single", "detail", 10, 0, 2, 10),
            Control::new("spanning", "detail", 10, 20, 12, 10),
        ])
        .unwrap();
        let mut columns = Chain::new();
        columns.append(ColumnDefinition::with_size(10));
        let narrow = columns.append(ColumnDefinition::with_size(2));
        let last = columns.append(ColumnDefinition::with_size(10));
        let spanning = cells.id_by_name("spanning").unwrap();
        cells.cell_mut(spanning).unwrap().column_span = 2;

        assert!(is_dissolvable(&columns, &cells, narrow).unwrap());
        columns.get_mut(narrow).unwrap().objects.push(spanning);
        assert!(is_dissolvable(&columns, &cells, narrow).unwrap());
        columns.get_mut(last).unwrap().objects.push(spanning);
        assert!(!is_dissolvable(&columns, &cells, last).unwrap());

        let single = cells.id_by_name("single").unwrap();
        columns.get_mut(narrow).unwrap().objects.push(single);
        assert!(!is_dissolvable(&columns, &cells, narrow).unwrap());
    }

    #[test]
    fn test_dissolution_shrinks_spans_reaching_in_from_the_left() {
        let mut cells = VirtualCellRepository::new(vec![
            Control::new("wide", "detail", 0, 0, 100, 10),
            Control::new("short", "detail", 0, 20, 10, 10),
        ])
        .unwrap();
        let mut columns = Chain::new();
        let first = columns.append(ColumnDefinition::with_size(10));
        let narrow = columns.append(ColumnDefinition::with_size(2));
        columns.append(ColumnDefinition::with_size(88));
        let wide = cells.id_by_name("wide").unwrap();
        let short = cells.id_by_name("short").unwrap();
        cells.cell_mut(wide).unwrap().column_span = 3;
        columns.get_mut(first).unwrap().objects = vec![wide, short];

        dissolve_column(&mut columns, &mut cells, narrow).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns.get(first).unwrap().size, 12);
        assert_eq!(cells.get(wide).unwrap().column_span, 2);
        assert_eq!(cells.get(short).unwrap().column_span, 1);
    }

    #[test]
    fn test_dissolving_occupied_last_column_fails() {
        let mut cells =
            VirtualCellRepository::new(vec![Control::new("a", "detail", 10, 0, 2, 10)]).unwrap();
        let mut columns = Chain::new();
        columns.append(ColumnDefinition::with_size(10));
        let last = columns.append(ColumnDefinition::with_size(2));
        columns.get_mut(last).unwrap().objects.push(CellId(0));
        assert!(matches!(
            dissolve_column(&mut columns, &mut cells, last),
            Err(GridError::DissolutionTarget { offset: 10 })
        ));
    }

    #[test]
    fn test_dissolving_single_span_cell_fails() {
        let mut cells =
            VirtualCellRepository::new(vec![Control::new("tiny", "detail", 10, 0, 2, 10)]).unwrap();
        let mut columns = Chain::new();
        columns.append(ColumnDefinition::with_size(10));
        let narrow = columns.append(ColumnDefinition::with_size(2));
        columns.append(ColumnDefinition::with_size(10));
        columns.get_mut(narrow).unwrap().objects.push(CellId(0));
        match dissolve_column(&mut columns, &mut cells, narrow) {
            Err(GridError::UnmovableControl { name }) => assert_eq!(name, "tiny"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_small_right_shortfall_grows_last_column() {
        let mut cells = VirtualCellRepository::new(vec![
            Control::new("a", "detail", 0, 0, 50, 10),
            Control::new("float", "detail", 0, 20, 52, 10).floating(),
        ])
        .unwrap();
        let floating: BTreeSet<CellId> = [cells.id_by_name("float").unwrap()].into();
        let columns = define_columns(&mut cells, &floating, 3).unwrap();
        assert_eq!(layout(&columns), vec![(0, 52, false, false)]);
        assert_eq!(cells.by_name("a").unwrap().width, 52);
    }

    #[test]
    fn test_large_right_shortfall_appends_padding() {
        let mut cells = VirtualCellRepository::new(vec![
            Control::new("a", "detail", 0, 0, 50, 10),
            Control::new("float", "detail", 0, 20, 80, 10).floating(),
        ])
        .unwrap();
        let floating: BTreeSet<CellId> = [cells.id_by_name("float").unwrap()].into();
        let columns = define_columns(&mut cells, &floating, 3).unwrap();
        assert_eq!(
            layout(&columns),
            vec![(0, 50, false, false), (50, 30, false, true)]
        );
        assert_eq!(cells.by_name("a").unwrap().width, 50);
    }

    #[test]
    fn test_strip_filler_columns() {
        let (mut columns, mut cells) = build(
            vec![
                Control::new("a", "detail", 10, 0, 40, 10),
                Control::new("b", "detail", 60, 0, 40, 10),
                Control::new("wide", "header", 10, 20, 90, 10),
            ],
            3,
        );
        assert_eq!(columns.len(), 4);
        let removed = strip_filler_columns(&mut columns, &mut cells).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(layout(&columns), vec![(0, 40, false, false), (40, 40, false, false)]);
        let wide = cells.by_name("wide").unwrap();
        assert_eq!(wide.column_span, 2);
        assert_eq!((wide.x, wide.width), (0, 80));
        assert_eq!(cells.by_name("a").unwrap().x, 0);
        assert_eq!(cells.by_name("b").unwrap().x, 40);
    }
}
