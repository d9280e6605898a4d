//! Banded emission over a grouped invoice.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

mod fixtures;

use bandgrid::error::GridError;
use bandgrid::{BandedEmitter, CellCollector, GridBuilder, VirtualGrid};
use fixtures::{invoice_report, invoice_row};

fn grid() -> VirtualGrid {
    GridBuilder::new().build(&invoice_report()).unwrap()
}

fn names(cells: &[bandgrid::ExportedCell]) -> Vec<&str> {
    cells.iter().map(|cell| cell.control_name.as_str()).collect()
}

#[test]
fn test_invoice_stream() {
    let grid = grid();
    let mut emitter = BandedEmitter::new(&grid, CellCollector::new());

    let first = emitter
        .enter_data(Some(invoice_row("ACME", "Anvil", "10")))
        .unwrap();
    assert_eq!(names(&first), vec!["title", "customer", "product", "amount"]);

    let second = emitter
        .enter_data(Some(invoice_row("ACME", "Rocket", "20")))
        .unwrap();
    assert_eq!(names(&second), vec!["product", "amount"]);

    let third = emitter
        .enter_data(Some(invoice_row("Globex", "Magnet", "5")))
        .unwrap();
    assert_eq!(
        names(&third),
        vec!["subtotal", "rule", "customer", "product", "amount"]
    );

    let last = emitter.enter_data(None).unwrap();
    assert_eq!(names(&last), vec!["subtotal", "rule", "total"]);
    assert!(emitter.is_finished());

    emitter.write(Some("Invoices")).unwrap();
    let collector = emitter.into_writer();
    assert_eq!(collector.cells.len(), 14);
    assert_eq!(collector.sheets, vec![Some("Invoices".to_owned())]);
}

#[test]
fn test_outer_group_break_closes_inner_groups_first() {
    let grid = grid();
    let mut emitter = BandedEmitter::new(&grid, CellCollector::new());
    emitter
        .enter_data(Some(invoice_row("ACME", "Anvil", "10")))
        .unwrap();

    let mut next_page = invoice_row("ACME", "Rocket", "20");
    next_page.insert(
        "title".to_owned(),
        bandgrid::ControlAttributes::text("Invoices (cont.)"),
    );
    let exported = emitter.enter_data(Some(next_page)).unwrap();
    assert_eq!(
        names(&exported),
        vec!["subtotal", "rule", "total", "title", "customer", "product", "amount"]
    );
    let title = exported.iter().find(|cell| cell.control_name == "title").unwrap();
    assert_eq!(title.row, 1);
    assert!(!emitter.is_finished());

    let last = emitter.enter_data(None).unwrap();
    assert_eq!(names(&last), vec!["subtotal", "rule", "total"]);
}

#[test]
fn test_trailers_are_written_with_the_closed_group_data() {
    let grid = grid();
    let mut emitter = BandedEmitter::new(&grid, CellCollector::new());
    let mut closing = invoice_row("ACME", "Anvil", "10");
    closing.insert(
        "subtotal".to_owned(),
        bandgrid::ControlAttributes::text("10"),
    );
    emitter.enter_data(Some(closing)).unwrap();

    let mut next = invoice_row("Globex", "Magnet", "5");
    next.insert("subtotal".to_owned(), bandgrid::ControlAttributes::text("5"));
    emitter.enter_data(Some(next)).unwrap();

    let previous = emitter.previous_data().unwrap();
    assert_eq!(previous["customer"].text.as_deref(), Some("Globex"));
    let subtotal = emitter
        .writer()
        .cells
        .iter()
        .find(|cell| cell.control_name == "subtotal")
        .unwrap();
    assert!(!subtotal.floating);
    assert_eq!(subtotal.row, 4);
}

#[test]
fn test_hidden_controls_are_not_placed() {
    let grid = grid();
    let mut emitter = BandedEmitter::new(&grid, CellCollector::new());
    let mut row = invoice_row("ACME", "Anvil", "10");
    row.insert(
        "amount".to_owned(),
        bandgrid::ControlAttributes::text("10").hidden(),
    );
    let exported = emitter.enter_data(Some(row)).unwrap();
    assert!(!names(&exported).contains(&"amount"));
}

#[test]
fn test_closed_emitter_rejects_everything() {
    let grid = grid();
    let mut emitter = BandedEmitter::new(&grid, CellCollector::new());
    emitter
        .enter_data(Some(invoice_row("ACME", "Anvil", "10")))
        .unwrap();
    emitter.dispose();

    assert!(emitter.previous_data().is_none());
    assert!(matches!(emitter.enter_data(None), Err(GridError::WriterClosed)));
    assert!(matches!(
        emitter.write_entire_grid(None),
        Err(GridError::WriterClosed)
    ));
    assert_eq!(GridError::WriterClosed.to_string(), "Writer is already closed");
}

#[test]
fn test_write_entire_grid_uses_bound_attributes() {
    let mut grid = grid();
    assert_eq!(grid.bind_attributes(invoice_row("ACME", "Anvil", "10")), 1);
    assert_eq!(grid.attributes_version(), 1);
    assert_eq!(
        grid.attribute("customer").and_then(|attrs| attrs.text.as_deref()),
        Some("ACME")
    );

    let mut emitter = BandedEmitter::new(&grid, CellCollector::new());
    emitter.write_entire_grid(Some("All")).unwrap();
    let collector = emitter.into_writer();
    assert_eq!(
        names(&collector.cells),
        vec!["title", "customer", "product", "amount", "subtotal", "rule", "total"]
    );
    assert_eq!(collector.sheets, vec![Some("All".to_owned())]);
}

#[test]
fn test_process_bands_replays_last_row() {
    let grid = grid();
    let mut emitter = BandedEmitter::new(&grid, CellCollector::new());
    emitter
        .enter_data(Some(invoice_row("ACME", "Anvil", "10")))
        .unwrap();
    let replay = emitter.process_bands().unwrap();
    assert_eq!(
        names(&replay),
        vec!["title", "total", "customer", "subtotal", "rule", "product", "amount"]
    );
}
