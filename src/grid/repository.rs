//! Indexed working set of all cells of a report.

use std::collections::{BTreeMap, HashMap};

use super::cell::{CellId, VirtualCell};
use crate::error::{GridError, Result};
use crate::types::Control;

/// All cells of one build, plus lookup indices by name, band, X and Y.
///
/// The indices are built from the unmodified control geometry and are never
/// touched afterwards; only the cells' own geometry is adjusted while the
/// grid is reconciled.
#[derive(Debug, Clone, Default)]
pub struct VirtualCellRepository {
    cells: Vec<VirtualCell>,
    by_name: HashMap<String, CellId>,
    by_band: HashMap<String, BTreeMap<String, CellId>>,
    by_x: BTreeMap<i32, Vec<CellId>>,
    by_y: BTreeMap<i32, Vec<CellId>>,
}

impl VirtualCellRepository {
    /// Wrap every control in a cell and index it.
    pub fn new(controls: impl IntoIterator<Item = Control>) -> Result<Self> {
        let mut repository = Self::default();
        for control in controls {
            let id = CellId(repository.cells.len());
            if repository.by_name.contains_key(&control.name) {
                return Err(GridError::DuplicateControl { name: control.name });
            }
            repository.by_name.insert(control.name.clone(), id);
            repository
                .by_band
                .entry(control.band.clone())
                .or_default()
                .insert(control.name.clone(), id);
            repository.by_x.entry(control.x).or_default().push(id);
            repository.by_y.entry(control.y).or_default().push(id);
            repository.cells.push(VirtualCell::new(control));
        }
        Ok(repository)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, id: CellId) -> Option<&VirtualCell> {
        self.cells.get(id.0)
    }

    pub(crate) fn cell(&self, id: CellId) -> Result<&VirtualCell> {
        self.get(id).ok_or(GridError::UnknownCell { index: id.0 })
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> Result<&mut VirtualCell> {
        self.cells
            .get_mut(id.0)
            .ok_or(GridError::UnknownCell { index: id.0 })
    }

    pub fn ids(&self) -> impl Iterator<Item = CellId> {
        (0..self.cells.len()).map(CellId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellId, &VirtualCell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(index, cell)| (CellId(index), cell))
    }

    pub fn id_by_name(&self, name: &str) -> Option<CellId> {
        self.by_name.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&VirtualCell> {
        self.id_by_name(name).and_then(|id| self.get(id))
    }

    /// Cells of one band, keyed by control name.
    pub fn by_band(&self, band: &str) -> Option<&BTreeMap<String, CellId>> {
        self.by_band.get(band)
    }

    /// Cells keyed by their control X, ascending.
    pub fn by_x(&self) -> &BTreeMap<i32, Vec<CellId>> {
        &self.by_x
    }

    /// Cells keyed by their control Y, ascending.
    pub fn by_y(&self) -> &BTreeMap<i32, Vec<CellId>> {
        &self.by_y
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

    fn controls() -> Vec<Control> {
        vec![
            Control::new("b", "detail", 40, 10, 20, 10),
            Control::new("a", "detail", 10, 10, 20, 10),
            Control::new("h", "header", 10, 0, 50, 10),
        ]
    }

    #[test]
    fn test_indices() {
        let repository = VirtualCellRepository::new(controls()).unwrap();
        assert_eq!(repository.len(), 3);
        assert_eq!(repository.by_name("a").unwrap().x, 10);

        let detail: Vec<&str> = repository
            .by_band("detail")
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(detail, vec!["a", "b"]);

        let xs: Vec<i32> = repository.by_x().keys().copied().collect();
        assert_eq!(xs, vec![10, 40]);
        assert_eq!(repository.by_x()[&10].len(), 2);
        let ys: Vec<i32> = repository.by_y().keys().copied().collect();
        assert_eq!(ys, vec![0, 10]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut input = controls();
        input.push(Control::new("a", "header", 0, 0, 5, 5));
        match VirtualCellRepository::new(input) {
            Err(GridError::DuplicateControl { name }) => assert_eq!(name, "a"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_cell() {
        let repository = VirtualCellRepository::new(controls()).unwrap();
        assert!(repository.get(CellId(9)).is_none());
        assert!(matches!(
            repository.cell(CellId(9)),
            Err(GridError::UnknownCell { index: 9 })
        ));
    }
}
