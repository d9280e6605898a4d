//! Threshold merging of cell positions along one axis.

use std::collections::BTreeMap;

use crate::error::{Axis, Result};
use crate::grid::{CellId, VirtualCellRepository};

/// Merge position buckets that lie within `threshold` of the previous
/// normalized position.
///
/// Merged cells are shifted back by the gap so they line up with the
/// earlier bucket. The first bucket is compared against position 0.
/// Comparison is always against the last normalized key, never against the
/// raw key of the bucket just merged, so merges do not chain.
pub(crate) fn normalize_axis(
    buckets: &BTreeMap<i32, Vec<CellId>>,
    threshold: i32,
    axis: Axis,
    cells: &mut VirtualCellRepository,
) -> Result<BTreeMap<i32, Vec<CellId>>> {
    let mut normalized: BTreeMap<i32, Vec<CellId>> = BTreeMap::new();
    let mut last_key = 0;

    for (&position, ids) in buckets {
        let delta = position - last_key;
        if delta <= threshold {
            for &id in ids {
                let cell = cells.cell_mut(id)?;
                match axis {
                    Axis::Horizontal => cell.x -= delta,
                    Axis::Vertical => cell.y -= delta,
                }
            }
            normalized.entry(last_key).or_default().extend(ids.iter().copied());
        } else {
            normalized.entry(position).or_default().extend(ids.iter().copied());
            last_key = position;
        }
    }

    Ok(normalized)
}
