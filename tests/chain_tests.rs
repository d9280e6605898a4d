//! Entity chain tests through the public API.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

mod common;
mod fixtures;

use bandgrid::error::GridError;
use bandgrid::grid::{Chain, ColumnDefinition, RowDefinition, VirtualCellRepository};
use bandgrid::Control;
use common::assert_chain_consistent;
use test_case::test_case;

fn sizes<T>(chain: &Chain<T>) -> Vec<(i32, i32, u32)>
where
    T: std::ops::DerefMut<Target = bandgrid::grid::EntityDefinition>,
{
    chain
        .iter()
        .map(|(_, entity)| (entity.offset(), entity.size, entity.index_offset()))
        .collect()
}

fn columns(sizes: &[i32]) -> Chain<ColumnDefinition> {
    let mut chain = Chain::new();
    for &size in sizes {
        chain.append(ColumnDefinition::with_size(size));
    }
    chain
}

#[test]
fn test_append_derives_offsets() {
    let chain = columns(&[10, 20, 30]);
    assert_eq!(sizes(&chain), vec![(0, 10, 1), (10, 20, 2), (30, 30, 3)]);
    let head = chain.get(chain.first().unwrap()).unwrap();
    assert!(!head.has_previous());
    assert!(head.has_next());
    assert_chain_consistent(&chain, "column");
}

#[test_case(0, &[(0, 10, 1), (10, 5, 2), (15, 20, 3), (35, 30, 4)]; "after head")]
#[test_case(1, &[(0, 10, 1), (10, 20, 2), (30, 5, 3), (35, 30, 4)]; "in the middle")]
#[test_case(2, &[(0, 10, 1), (10, 20, 2), (30, 30, 3), (60, 5, 4)]; "after tail")]
fn test_insert_after_shifts_successors(anchor: usize, expected: &[(i32, i32, u32)]) {
    let mut chain = columns(&[10, 20, 30]);
    let anchor = chain.ids()[anchor];
    let inserted = chain
        .insert_after(anchor, ColumnDefinition::with_size(5))
        .unwrap();
    assert_eq!(chain.next(anchor), Some(inserted));
    assert_eq!(chain.previous(inserted), Some(anchor));
    assert_eq!(sizes(&chain), expected);
    assert_chain_consistent(&chain, "column");
}

#[test]
fn test_insert_after_tail_moves_tail() {
    let mut chain = columns(&[10]);
    let head = chain.first().unwrap();
    let tail = chain.insert_after(head, ColumnDefinition::with_size(5)).unwrap();
    assert_eq!(chain.last(), Some(tail));
    assert_eq!(chain.len(), 2);
}

#[test]
fn test_remove_recalculates_downstream() {
    let mut chain = columns(&[10, 20, 30]);
    let middle = chain.ids()[1];
    chain.remove_from_chain(middle).unwrap();
    assert!(!chain.is_linked(middle));
    assert_eq!(sizes(&chain), vec![(0, 10, 1), (10, 30, 2)]);

    let head = chain.first().unwrap();
    chain.remove_from_chain(head).unwrap();
    assert_eq!(sizes(&chain), vec![(0, 30, 1)]);
}

#[test]
fn test_remove_occupied_entity_fails() {
    let cells = VirtualCellRepository::new(vec![Control::new("a", "detail", 0, 0, 10, 10)]).unwrap();
    let mut rows = Chain::new();
    let row = rows.append(RowDefinition::with_size(10).in_band("detail"));
    rows.get_mut(row).unwrap().objects.extend(cells.ids());

    assert!(matches!(
        rows.remove_from_chain(row),
        Err(GridError::EntityOccupied { .. })
    ));
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_foreign_ids_are_rejected() {
    let long = columns(&[1, 2, 3, 4]);
    let mut short = columns(&[1]);
    let foreign = long.last().unwrap();
    assert!(short.get(foreign).is_none());
    assert!(matches!(
        short.insert_after(foreign, ColumnDefinition::with_size(3)),
        Err(GridError::UnknownEntity { .. })
    ));
}

#[test]
fn test_recalculate_after_resizing() {
    let mut chain = columns(&[10, 20, 30]);
    let head = chain.first().unwrap();
    chain.get_mut(head).unwrap().size = 15;
    chain.recalculate_chain_offsets(head).unwrap();
    assert_eq!(sizes(&chain), vec![(0, 15, 1), (15, 20, 2), (35, 30, 3)]);
}

#[test]
fn test_row_band_tags() {
    let row = RowDefinition::with_size(12).in_band("detail");
    assert_eq!(row.band(), Some("detail"));
    assert!(row.belongs_to("detail"));
    assert!(!row.belongs_to("header"));
    assert!(RowDefinition::with_size(3).band().is_none());
}
