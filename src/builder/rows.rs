//! Row derivation: clustering, overlap resolution, gap filling.

use std::collections::BTreeSet;

use log::{debug, trace};

use super::normalize::normalize_axis;
use crate::error::{Axis, GridError, Result};
use crate::grid::{CellId, Chain, RowDefinition, VirtualCellRepository};
use crate::types::Band;

/// A prospective row: cells sharing a top edge and a similar height.
///
/// Moving or resizing a candidate moves and resizes its member cells.
#[derive(Debug, Clone)]
pub(crate) struct RowCandidate {
    offset: i32,
    height: i32,
    pub band: Option<String>,
    pub objects: Vec<CellId>,
    pub is_filler: bool,
}

impl RowCandidate {
    fn with_cell(offset: i32, height: i32, band: &str, cell: CellId) -> Self {
        Self {
            offset,
            height,
            band: Some(band.to_owned()),
            objects: vec![cell],
            is_filler: false,
        }
    }

    fn filler(offset: i32, height: i32, band: Option<String>) -> Self {
        Self {
            offset,
            height,
            band,
            objects: Vec::new(),
            is_filler: true,
        }
    }

    pub fn bound(&self) -> i32 {
        self.offset + self.height
    }

    pub fn set_offset(&mut self, offset: i32, cells: &mut VirtualCellRepository) -> Result<()> {
        self.offset = offset;
        self.update_children(cells)
    }

    pub fn set_height(&mut self, height: i32, cells: &mut VirtualCellRepository) -> Result<()> {
        self.height = height;
        self.update_children(cells)
    }

    fn update_children(&self, cells: &mut VirtualCellRepository) -> Result<()> {
        for &id in &self.objects {
            let cell = cells.cell_mut(id)?;
            cell.y = self.offset;
            cell.height = self.height;
        }
        Ok(())
    }

    fn overlaps(&self, other: &RowCandidate) -> bool {
        self.offset < other.bound() && other.offset < self.bound()
    }

    fn in_band(&self, band: Option<&str>) -> bool {
        band.is_some() && self.band.as_deref() == band
    }
}

/// Rows derived from the cell set, plus the cells diverted to floating.
#[derive(Debug)]
pub(crate) struct RowLayout {
    pub rows: Chain<RowDefinition>,
    pub floating: BTreeSet<CellId>,
}

pub(crate) fn define_rows(
    cells: &mut VirtualCellRepository,
    bands: &[Band],
    threshold: i32,
) -> Result<RowLayout> {
    let by_y = cells.by_y().clone();
    let normalized = normalize_axis(&by_y, threshold, Axis::Vertical, cells)?;

    let mut floating = BTreeSet::new();
    let mut candidates: Vec<RowCandidate> = Vec::new();

    for (&y, ids) in &normalized {
        let bucket_start = candidates.len();
        for &id in ids {
            let cell = cells.cell(id)?;
            if cell.control().floating || cell.control().is_layered() {
                trace!("{} is floating by definition", cell.name());
                floating.insert(id);
                continue;
            }
            let height = cell.height;

            let closest = candidates
                .iter()
                .enumerate()
                .skip(bucket_start)
                .filter(|(_, candidate)| candidate.offset == y && candidate.in_band(Some(cell.band())))
                .min_by_key(|(_, candidate)| (candidate.height - height).abs())
                .map(|(index, candidate)| (index, candidate.height));

            match closest {
                Some((index, candidate_height)) if (candidate_height - height).abs() <= threshold => {
                    if let Some(candidate) = candidates.get_mut(index) {
                        candidate.objects.push(id);
                    }
                    cells.cell_mut(id)?.height = candidate_height;
                }
                _ => {
                    let band = cell.band().to_owned();
                    candidates.push(RowCandidate::with_cell(y, height, &band, id));
                }
            }
        }
    }

    let accepted = resolve_overlaps(candidates, &mut floating);
    let filled = fill_gaps(accepted, bands, threshold, cells)?;
    let rows = materialize(filled, cells)?;

    debug!(
        "defined {} rows, {} cells diverted to floating",
        rows.len(),
        floating.len()
    );
    Ok(RowLayout { rows, floating })
}

/// Greedily accept candidates, most populated and then flattest first.
/// Candidates overlapping an accepted one are diverted to floating.
fn resolve_overlaps(
    mut candidates: Vec<RowCandidate>,
    floating: &mut BTreeSet<CellId>,
) -> Vec<RowCandidate> {
    candidates.sort_by(|a, b| {
        b.objects
            .len()
            .cmp(&a.objects.len())
            .then(a.height.cmp(&b.height))
    });

    let mut accepted: Vec<RowCandidate> = Vec::new();
    for candidate in candidates {
        if accepted.iter().any(|row| row.overlaps(&candidate)) {
            trace!(
                "row candidate at {}+{} overlaps, {} cells diverted to floating",
                candidate.offset,
                candidate.height,
                candidate.objects.len()
            );
            floating.extend(candidate.objects.iter().copied());
        } else {
            accepted.push(candidate);
        }
    }

    accepted.sort_by_key(|candidate| candidate.offset);
    accepted
}

/// Close the vertical gaps between accepted candidates, and between the last
/// candidate and the bottom of the last band.
fn fill_gaps(
    accepted: Vec<RowCandidate>,
    bands: &[Band],
    threshold: i32,
    cells: &mut VirtualCellRepository,
) -> Result<Vec<RowCandidate>> {
    let mut filled: Vec<RowCandidate> = Vec::new();

    for mut candidate in accepted {
        let start = filled.last().map_or(0, RowCandidate::bound);
        let gap = candidate.offset - start;
        if gap > 0 {
            let absorb = if gap <= threshold {
                gap
            } else {
                let band = candidate.band.clone();
                fill_gap(&mut filled, start, candidate.offset, band.as_deref(), bands, threshold, cells)?
            };
            if absorb > 0 {
                let offset = candidate.offset - absorb;
                let height = candidate.height + absorb;
                candidate.set_offset(offset, cells)?;
                candidate.set_height(height, cells)?;
            }
        }
        filled.push(candidate);
    }

    let start = filled.last().map_or(0, RowCandidate::bound);
    let end = bands.iter().map(|band| band.bound).max().unwrap_or(start);
    if end > start {
        let fallback = filled
            .last()
            .and_then(|row| row.band.clone())
            .or_else(|| bands.first().map(|band| band.name.clone()));
        // Nothing follows the trailing gap, so there is no leftover to absorb.
        fill_gap(&mut filled, start, end, None, bands, threshold, cells)?;
        // Segments outside every band inherit the last row's band.
        for row in filled.iter_mut().filter(|row| row.band.is_none()) {
            row.band.clone_from(&fallback);
        }
    }

    Ok(filled)
}

/// Fill `[start, end)` with band-tagged filler candidates split at band
/// boundaries.
///
/// A first segment in the previous row's band no taller than the threshold
/// is absorbed into that row. Returns the size of a last segment, in the
/// band of the candidate that follows, small enough to be absorbed into it.
fn fill_gap(
    filled: &mut Vec<RowCandidate>,
    start: i32,
    end: i32,
    next_band: Option<&str>,
    bands: &[Band],
    threshold: i32,
    cells: &mut VirtualCellRepository,
) -> Result<i32> {
    let mut points = vec![start, end];
    for band in bands {
        for edge in [band.top(), band.bound] {
            if edge > start && edge < end {
                points.push(edge);
            }
        }
    }
    points.sort_unstable();
    points.dedup();

    let segments: Vec<(i32, i32)> = points
        .windows(2)
        .filter_map(|pair| match pair {
            [from, to] if to > from => Some((*from, *to)),
            _ => None,
        })
        .collect();
    let count = segments.len();

    for (position, (from, to)) in segments.into_iter().enumerate() {
        let size = to - from;
        let band = bands
            .iter()
            .find(|band| band.top() <= from && from < band.bound)
            .map(|band| band.name.clone())
            .or_else(|| next_band.map(str::to_owned));

        if position == 0 && size <= threshold {
            if let Some(previous) = filled.last_mut() {
                if previous.in_band(band.as_deref()) {
                    let height = previous.height + size;
                    previous.set_height(height, cells)?;
                    continue;
                }
            }
        }
        if position + 1 == count && size <= threshold && next_band.is_some() && band.as_deref() == next_band {
            return Ok(size);
        }

        trace!("filler row at {from}+{size} in band {band:?}");
        filled.push(RowCandidate::filler(from, size, band));
    }
    Ok(0)
}

/// Turn candidates into linked rows, registering each cell on its row.
fn materialize(
    filled: Vec<RowCandidate>,
    cells: &mut VirtualCellRepository,
) -> Result<Chain<RowDefinition>> {
    let mut rows = Chain::new();
    for candidate in filled {
        let band = candidate.band.ok_or(GridError::BandlessRow {
            offset: candidate.offset,
        })?;
        let mut objects = candidate.objects;
        objects.sort_by_key(|&id| cells.get(id).map(|cell| cell.x));

        let mut row = RowDefinition::with_size(candidate.height).in_band(band);
        row.is_filler = candidate.is_filler;
        row.objects = objects;
        let id = rows.append(row);

        for &cell in &rows.node(id)?.objects {
            cells.cell_mut(cell)?.owning_row = Some(id);
        }
    }
    Ok(rows)
}

/// Demote cells of one row whose horizontal extent overlaps an earlier,
/// still solid, cell of the same row.
pub(crate) fn demote_row_overlaps(
    rows: &mut Chain<RowDefinition>,
    cells: &mut VirtualCellRepository,
    floating: &mut BTreeSet<CellId>,
) -> Result<()> {
    for row_id in rows.ids() {
        let objects = rows.node(row_id)?.objects.clone();
        let mut demoted: BTreeSet<CellId> = BTreeSet::new();

        for (position, &id) in objects.iter().enumerate() {
            if demoted.contains(&id) {
                continue;
            }
            let cell = cells.cell(id)?;
            for &other in objects.iter().skip(position + 1) {
                if demoted.contains(&other) {
                    continue;
                }
                let candidate = cells.cell(other)?;
                if cell.overlaps_horizontally(candidate) {
                    trace!("{} overlaps {} in the same row", candidate.name(), cell.name());
                    demoted.insert(other);
                }
            }
        }

        if demoted.is_empty() {
            continue;
        }
        rows.node_mut(row_id)?
            .objects
            .retain(|id| !demoted.contains(id));
        for id in demoted {
            cells.cell_mut(id)?.detach();
            floating.insert(id);
        }
    }
    Ok(())
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

    fn layout(controls: Vec<Control>, bands: &[Band]) -> (RowLayout, VirtualCellRepository) {
        let mut cells = VirtualCellRepository::new(controls).unwrap();
        let layout = define_rows(&mut cells, bands, 3).unwrap();
        (layout, cells)
    }

    fn sizes(rows: &Chain<RowDefinition>) -> Vec<(i32, i32, bool)> {
        rows.iter()
            .map(|(_, row)| (row.offset(), row.size, row.is_filler))
            .collect()
    }

    #[test]
    fn test_cells_with_similar_height_share_a_row() {
        let bands = Band::stacked([("detail", 20)]);
        let (layout, cells) = layout(
            vec![
                Control::new("a", "detail", 0, 0, 10, 20),
                Control::new("b", "detail", 20, 1, 10, 18),
            ],
            &bands,
        );
        assert_eq!(sizes(&layout.rows), vec![(0, 20, false)]);
        let row = layout.rows.first().unwrap();
        assert_eq!(layout.rows.get(row).unwrap().objects.len(), 2);
        assert_eq!(cells.by_name("b").unwrap().height, 20);
        assert_eq!(cells.by_name("b").unwrap().y, 0);
        assert_eq!(cells.by_name("b").unwrap().owning_row(), Some(row));
    }

    #[test]
    fn test_different_bands_never_share_a_candidate() {
        let bands = Band::stacked([("header", 20), ("detail", 20)]);
        let mut cells = VirtualCellRepository::new(vec![
            Control::new("a", "header", 0, 0, 10, 20),
            Control::new("b", "detail", 20, 0, 10, 20),
        ])
        .unwrap();
        let layout = define_rows(&mut cells, &bands, 3).unwrap();
        // Same offset, same height, different bands: two candidates that
        // overlap, so the less preferred one floats.
        assert_eq!(layout.floating.len(), 1);
    }

    #[test]
    fn test_floating_and_layered_cells_skip_clustering() {
        let bands = Band::stacked([("detail", 30)]);
        let (layout, _) = layout(
            vec![
                Control::new("a", "detail", 0, 0, 10, 30),
                Control::new("logo", "detail", 20, 0, 10, 30).floating(),
                Control::new("bg", "background", 0, 0, 50, 30),
            ],
            &bands,
        );
        assert_eq!(layout.floating.len(), 2);
        assert_eq!(layout.rows.len(), 1);
    }

    #[test]
    fn test_overlapping_candidates_keep_the_most_populated() {
        let bands = Band::stacked([("detail", 40)]);
        let (layout, cells) = layout(
            vec![
                Control::new("a", "detail", 0, 0, 10, 20),
                Control::new("b", "detail", 20, 0, 10, 20),
                Control::new("tall", "detail", 40, 10, 10, 30),
            ],
            &bands,
        );
        let tall = cells.id_by_name("tall").unwrap();
        assert_eq!(layout.floating.iter().copied().collect::<Vec<_>>(), vec![tall]);
        assert_eq!(sizes(&layout.rows), vec![(0, 20, false), (20, 20, true)]);
    }

    #[test]
    fn test_small_gap_is_absorbed() {
        let bands = Band::stacked([("detail", 42)]);
        let (layout, cells) = layout(
            vec![
                Control::new("a", "detail", 0, 0, 10, 20),
                Control::new("b", "detail", 0, 22, 10, 20),
            ],
            &bands,
        );
        assert_eq!(sizes(&layout.rows), vec![(0, 20, false), (20, 22, false)]);
        assert_eq!(cells.by_name("b").unwrap().y, 20);
        assert_eq!(cells.by_name("b").unwrap().height, 22);
    }

    #[test]
    fn test_large_gap_splits_at_band_boundaries() {
        let bands = Band::stacked([("header", 30), ("group", 20), ("detail", 30)]);
        let (layout, _) = layout(
            vec![
                Control::new("h", "header", 0, 0, 10, 20),
                Control::new("d", "detail", 0, 60, 10, 20),
            ],
            &bands,
        );
        let rows: Vec<(i32, i32, Option<&str>)> = layout
            .rows
            .iter()
            .map(|(_, row)| (row.offset(), row.size, row.band()))
            .collect();
        assert_eq!(
            rows,
            vec![
                (0, 20, Some("header")),
                (20, 10, Some("header")),
                (30, 20, Some("group")),
                (50, 10, Some("detail")),
                (60, 20, Some("detail")),
            ]
        );
    }

    #[test]
    fn test_band_tail_within_threshold_joins_previous_row() {
        let bands = Band::stacked([("header", 22), ("detail", 30)]);
        let (layout, _) = layout(
            vec![
                Control::new("h", "header", 0, 0, 10, 20),
                Control::new("d", "detail", 0, 30, 10, 22),
            ],
            &bands,
        );
        assert_eq!(
            sizes(&layout.rows),
            vec![(0, 22, false), (22, 8, true), (30, 22, false)]
        );
    }

    #[test]
    fn test_trailing_band_shortfall_becomes_filler() {
        let bands = Band::stacked([("detail", 50)]);
        let (layout, _) = layout(vec![Control::new("a", "detail", 0, 0, 10, 30)], &bands);
        assert_eq!(sizes(&layout.rows), vec![(0, 30, false), (30, 20, true)]);
    }

    #[test]
    fn test_row_objects_sorted_by_x() {
        let bands = Band::stacked([("detail", 10)]);
        let (layout, cells) = layout(
            vec![
                Control::new("right", "detail", 50, 0, 10, 10),
                Control::new("left", "detail", 0, 0, 10, 10),
            ],
            &bands,
        );
        let row = layout.rows.get(layout.rows.first().unwrap()).unwrap();
        let names: Vec<&str> = row
            .objects
            .iter()
            .map(|&id| cells.get(id).unwrap().name())
            .collect();
        assert_eq!(names, vec!["left", "right"]);
    }

    #[test]
    fn test_demote_same_row_overlaps() {
        let bands = Band::stacked([("detail", 10)]);
        let (mut layout, mut cells) = layout(
            vec![
                Control::new("a", "detail", 0, 0, 50, 10),
                Control::new("b", "detail", 40, 0, 50, 10),
                Control::new("c", "detail", 80, 0, 20, 10),
            ],
            &bands,
        );
        demote_row_overlaps(&mut layout.rows, &mut cells, &mut layout.floating).unwrap();

        // b overlaps a and is demoted; c only overlapped b, so it stays.
        let b = cells.id_by_name("b").unwrap();
        assert_eq!(layout.floating.iter().copied().collect::<Vec<_>>(), vec![b]);
        assert!(cells.get(b).unwrap().owning_row().is_none());
        let row = layout.rows.get(layout.rows.first().unwrap()).unwrap();
        assert_eq!(row.objects.len(), 2);
    }
}
