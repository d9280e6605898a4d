//! Passes run once rows and columns exist: integrity, padding, band
//! heights and filler dissolution.

use std::collections::{BTreeSet, HashMap};

use log::{debug, trace};

use crate::error::{GridError, Result};
use crate::grid::{
    CellId, Chain, ColumnDefinition, ColumnId, RowDefinition, RowId, VirtualCell,
    VirtualCellRepository,
};
use crate::types::Band;

/// Every solid cell must sit in exactly one row and one column; every
/// diverted cell in none.
pub(crate) fn check_integrity(
    rows: &Chain<RowDefinition>,
    columns: &Chain<ColumnDefinition>,
    cells: &VirtualCellRepository,
    diverted: &BTreeSet<CellId>,
) -> Result<()> {
    let mut occurrences: HashMap<CellId, (u32, u32)> = HashMap::new();
    for (_, row) in rows.iter() {
        for &id in &row.objects {
            occurrences.entry(id).or_default().0 += 1;
        }
    }
    for (_, column) in columns.iter() {
        for &id in &column.objects {
            occurrences.entry(id).or_default().1 += 1;
        }
    }

    for (id, cell) in cells.iter() {
        let found = occurrences.get(&id).copied().unwrap_or_default();
        let expected = if diverted.contains(&id) { (0, 0) } else { (1, 1) };
        if found != expected {
            return Err(GridError::InconsistentControl {
                name: cell.name().to_owned(),
            });
        }
    }
    Ok(())
}

fn furthest(
    cells: &VirtualCellRepository,
    floating: &BTreeSet<CellId>,
    bound: fn(&VirtualCell) -> i32,
) -> Result<Option<i32>> {
    let mut furthest = None;
    for &id in floating {
        let reach = bound(cells.cell(id)?);
        furthest = Some(furthest.map_or(reach, |current: i32| current.max(reach)));
    }
    Ok(furthest)
}

/// Append a padding column when a floating cell reaches past the last column.
pub(crate) fn add_padding_column(
    columns: &mut Chain<ColumnDefinition>,
    cells: &VirtualCellRepository,
    floating: &BTreeSet<CellId>,
) -> Result<Option<ColumnId>> {
    let Some(reach) = furthest(cells, floating, |cell| cell.right_bound())? else {
        return Ok(None);
    };
    let bound = match columns.last() {
        Some(last) => columns.node(last)?.bound(),
        None => 0,
    };
    if reach <= bound {
        return Ok(None);
    }
    debug!("padding column of {} for floating cells", reach - bound);
    Ok(Some(columns.append(ColumnDefinition::padding(reach - bound))))
}

/// Append a padding row, in the last row's band, when a floating cell reaches
/// below the last row.
pub(crate) fn add_padding_row(
    rows: &mut Chain<RowDefinition>,
    cells: &VirtualCellRepository,
    floating: &BTreeSet<CellId>,
) -> Result<Option<RowId>> {
    let Some(reach) = furthest(cells, floating, |cell| cell.lower_bound())? else {
        return Ok(None);
    };
    let (bound, band) = match rows.last() {
        Some(last) => {
            let row = rows.node(last)?;
            (row.bound(), row.band_name.clone())
        }
        None => (0, None),
    };
    if reach <= bound {
        return Ok(None);
    }

    debug!("padding row of {} for floating cells", reach - bound);
    let mut row = RowDefinition::with_size(reach - bound);
    row.band_name = band;
    row.is_padding = true;
    Ok(Some(rows.append(row)))
}

/// Insert a filler row after each band's bottom row when the band falls
/// short of its configured bound. Cells at or below the insertion point move
/// down with the rows.
pub(crate) fn reconcile_band_heights(
    rows: &mut Chain<RowDefinition>,
    cells: &mut VirtualCellRepository,
    bands: &[Band],
) -> Result<usize> {
    let mut inserted = 0;
    for band in bands {
        let bottom = rows
            .iter()
            .filter(|(_, row)| row.belongs_to(&band.name))
            .map(|(id, row)| (id, row.bound()))
            .max_by_key(|&(_, bound)| bound);
        let Some((bottom, bound)) = bottom else {
            continue;
        };

        let missing = band.bound - bound;
        if missing <= 0 {
            continue;
        }
        trace!("band {} is {missing}px short, inserting a filler row", band.name);
        let mut row = RowDefinition::with_size(missing).in_band(band.name.as_str());
        row.is_filler = true;
        row.is_padding = true;
        rows.insert_after(bottom, row)?;

        let shifted: Vec<CellId> = cells
            .iter()
            .filter(|(_, cell)| cell.y >= bound)
            .map(|(id, _)| id)
            .collect();
        for id in shifted {
            cells.cell_mut(id)?.y += missing;
        }
        inserted += 1;
    }
    rows.recalculate_offsets()?;
    Ok(inserted)
}

enum Fold {
    IntoPrevious(RowId),
    IntoNext(RowId),
}

/// Fold empty filler rows into a neighbour of the same band, preferring the
/// previous one. The last row of the chain is never folded.
///
/// Floating cells are stretched so they keep covering the rows they covered:
/// when folding backwards, cells ending in the previous row grow; when
/// folding forwards, cells starting in the next row move up and grow, and so
/// do the solid cells of that row.
pub(crate) fn dissolve_filler_rows(
    rows: &mut Chain<RowDefinition>,
    cells: &mut VirtualCellRepository,
    floating: &BTreeSet<CellId>,
) -> Result<usize> {
    let mut dissolved = 0;
    for id in rows.ids() {
        let (size, band) = {
            let row = rows.node(id)?;
            if !row.is_filler || !row.has_next() {
                continue;
            }
            if !row.is_empty() {
                return Err(GridError::FillerHasContent {
                    offset: row.offset(),
                });
            }
            (row.size, row.band_name.clone())
        };

        let same_band = |neighbour: Option<RowId>| {
            neighbour.filter(|&other| {
                band.is_some() && rows.get(other).is_some_and(|row| row.band_name == band)
            })
        };
        let fold = match (same_band(rows.previous(id)), same_band(rows.next(id))) {
            (Some(previous), _) => Fold::IntoPrevious(previous),
            (None, Some(next)) => Fold::IntoNext(next),
            (None, None) => continue,
        };

        match fold {
            Fold::IntoPrevious(previous) => {
                let range = {
                    let row = rows.node(previous)?;
                    row.offset()..=row.bound()
                };
                for &cell in floating {
                    let cell = cells.cell_mut(cell)?;
                    if range.contains(&cell.lower_bound()) {
                        cell.height += size;
                    }
                }
                rows.node_mut(previous)?.size += size;
            }
            Fold::IntoNext(next) => {
                let range = {
                    let row = rows.node(next)?;
                    row.offset()..=row.bound()
                };
                let solid = rows.node(next)?.objects.clone();
                for cell in solid {
                    let cell = cells.cell_mut(cell)?;
                    cell.y -= size;
                    cell.height += size;
                }
                for &cell in floating {
                    let cell = cells.cell_mut(cell)?;
                    if range.contains(&cell.y) {
                        cell.y -= size;
                        cell.height += size;
                    }
                }
                rows.node_mut(next)?.size += size;
            }
        }
        rows.unlink(id)?;
        dissolved += 1;
    }
    rows.recalculate_offsets()?;
    debug!("dissolved {dissolved} filler rows");
    Ok(dissolved)
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

    fn filler(size: i32, band: &str) -> RowDefinition {
        let mut row = RowDefinition::with_size(size).in_band(band);
        row.is_filler = true;
        row
    }

    fn rows_of(rows: &Chain<RowDefinition>) -> Vec<(i32, i32, bool)> {
        rows.iter()
            .map(|(_, row)| (row.offset(), row.size, row.is_filler))
            .collect()
    }

    #[test]
    fn test_integrity_accepts_consistent_placement() {
        let cells = VirtualCellRepository::new(vec![
            Control::new("a", "detail", 0, 0, 10, 10),
            Control::new("f", "detail", 0, 0, 10, 10).floating(),
        ])
        .unwrap();
        let mut rows = Chain::new();
        let row = rows.append(RowDefinition::with_size(10).in_band("detail"));
        rows.get_mut(row).unwrap().objects.push(CellId(0));
        let mut columns = Chain::new();
        let column = columns.append(ColumnDefinition::with_size(10));
        columns.get_mut(column).unwrap().objects.push(CellId(0));

        let diverted: BTreeSet<CellId> = [CellId(1)].into();
        check_integrity(&rows, &columns, &cells, &diverted).unwrap();

        // Missing from the columns.
        columns.get_mut(column).unwrap().objects.clear();
        match check_integrity(&rows, &columns, &cells, &diverted) {
            Err(GridError::InconsistentControl { name }) => assert_eq!(name, "a"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_integrity_rejects_double_registration() {
        let cells =
            VirtualCellRepository::new(vec![Control::new("a", "detail", 0, 0, 10, 10)]).unwrap();
        let mut rows = Chain::new();
        let row = rows.append(RowDefinition::with_size(10).in_band("detail"));
        rows.get_mut(row).unwrap().objects = vec![CellId(0), CellId(0)];
        let columns = Chain::new();
        assert!(matches!(
            check_integrity(&rows, &columns, &cells, &BTreeSet::new()),
            Err(GridError::InconsistentControl { .. })
        ));
    }

    #[test]
    fn test_padding_entities_for_floating_cells() {
        let cells = VirtualCellRepository::new(vec![
            Control::new("f", "detail", 30, 5, 40, 30).floating(),
        ])
        .unwrap();
        let floating: BTreeSet<CellId> = [CellId(0)].into();

        let mut columns = Chain::new();
        columns.append(ColumnDefinition::with_size(50));
        let padding = add_padding_column(&mut columns, &cells, &floating).unwrap().unwrap();
        assert_eq!(columns.get(padding).unwrap().size, 20);
        assert!(columns.get(padding).unwrap().is_padding);
        assert!(add_padding_column(&mut columns, &cells, &floating).unwrap().is_none());

        let mut rows = Chain::new();
        rows.append(RowDefinition::with_size(20).in_band("detail"));
        let padding = add_padding_row(&mut rows, &cells, &floating).unwrap().unwrap();
        let row = rows.get(padding).unwrap();
        assert_eq!((row.offset(), row.size), (20, 15));
        assert_eq!(row.band(), Some("detail"));
    }

    #[test]
    fn test_band_shortfall_inserts_row_and_shifts_cells() {
        let bands = Band::stacked([("header", 30), ("detail", 20)]);
        let mut cells = VirtualCellRepository::new(vec![
            Control::new("h", "header", 0, 0, 10, 25),
            Control::new("d", "detail", 0, 25, 10, 20),
        ])
        .unwrap();
        let mut rows = Chain::new();
        rows.append(RowDefinition::with_size(25).in_band("header"));
        rows.append(RowDefinition::with_size(20).in_band("detail"));

        let inserted = reconcile_band_heights(&mut rows, &mut cells, &bands).unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(
            rows_of(&rows),
            vec![(0, 25, false), (25, 5, true), (30, 20, false)]
        );
        assert_eq!(cells.by_name("h").unwrap().y, 0);
        assert_eq!(cells.by_name("d").unwrap().y, 30);
    }

    #[test]
    fn test_filler_folds_into_previous_row_of_same_band() {
        let mut cells = VirtualCellRepository::new(vec![
            Control::new("f", "detail", 0, 5, 10, 15).floating(),
        ])
        .unwrap();
        let floating: BTreeSet<CellId> = [CellId(0)].into();
        let mut rows = Chain::new();
        rows.append(RowDefinition::with_size(20).in_band("detail"));
        rows.append(filler(10, "detail"));
        rows.append(RowDefinition::with_size(20).in_band("summary"));

        assert_eq!(dissolve_filler_rows(&mut rows, &mut cells, &floating).unwrap(), 1);
        assert_eq!(rows_of(&rows), vec![(0, 30, false), (30, 20, false)]);
        assert_eq!(cells.by_name("f").unwrap().height, 25);
    }

    #[test]
    fn test_filler_folds_into_next_row_of_same_band() {
        let mut cells = VirtualCellRepository::new(vec![
            Control::new("f", "detail", 0, 12, 10, 5).floating(),
        ])
        .unwrap();
        let floating: BTreeSet<CellId> = [CellId(0)].into();
        let mut rows = Chain::new();
        rows.append(filler(10, "detail"));
        rows.append(RowDefinition::with_size(20).in_band("detail"));

        assert_eq!(dissolve_filler_rows(&mut rows, &mut cells, &floating).unwrap(), 1);
        assert_eq!(rows_of(&rows), vec![(0, 30, false)]);
        let f = cells.by_name("f").unwrap();
        assert_eq!((f.y, f.height), (2, 15));
    }

    #[test]
    fn test_trailing_and_cross_band_fillers_are_kept() {
        let mut cells = VirtualCellRepository::new(Vec::new()).unwrap();
        let mut rows = Chain::new();
        rows.append(RowDefinition::with_size(20).in_band("header"));
        rows.append(filler(10, "group"));
        rows.append(RowDefinition::with_size(20).in_band("detail"));
        rows.append(filler(10, "detail"));

        assert_eq!(dissolve_filler_rows(&mut rows, &mut cells, &BTreeSet::new()).unwrap(), 0);
        assert_eq!(rows.len(), 4);
    }
}
