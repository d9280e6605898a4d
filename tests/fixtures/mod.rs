//! Test fixtures for building control matrices in memory.
//!
//! # Example
//!
//! ```rust
//! use fixtures::MatrixBuilder;
//!
//! let matrix = MatrixBuilder::new()
//!     .band("header", 40)
//!     .band("detail", 20)
//!     .control("title", "header", 10, 10, 200, 20)
//!     .control("amount", "detail", 10, 42, 80, 16)
//!     .build();
//!
//! let grid = bandgrid::GridBuilder::new().build(&matrix).unwrap();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

use bandgrid::{AttributeMap, Band, BandType, Control, ControlAttributes, ControlMatrix};

// ============================================================================
// Matrix Builder
// ============================================================================

/// Builder for control matrices. Bands are stacked top to bottom in the
/// order they are added.
#[derive(Debug, Clone, Default)]
pub struct MatrixBuilder {
    controls: Vec<Control>,
    bands: Vec<Band>,
}

impl MatrixBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn bottom(&self) -> i32 {
        self.bands.last().map_or(0, |band| band.bound)
    }

    /// Stack a plain band below the previous one.
    pub fn band(self, name: &str, height: i32) -> Self {
        let bound = self.bottom() + height;
        self.with_band(Band::new(name, height, bound))
    }

    /// Stack a group header band.
    pub fn header(self, name: &str, height: i32) -> Self {
        let bound = self.bottom() + height;
        self.with_band(Band::new(name, height, bound).with_type(BandType::Header))
    }

    /// Stack a trailer band closing `header`'s group.
    pub fn trailer(self, name: &str, height: i32, header: &str) -> Self {
        let bound = self.bottom() + height;
        self.with_band(Band::new(name, height, bound).trailing(header))
    }

    /// Add a fully configured band as is.
    pub fn with_band(mut self, band: Band) -> Self {
        self.bands.push(band);
        self
    }

    pub fn control(mut self, name: &str, band: &str, x: i32, y: i32, width: i32, height: i32) -> Self {
        self.controls.push(Control::new(name, band, x, y, width, height));
        self
    }

    pub fn floating(mut self, name: &str, band: &str, x: i32, y: i32, width: i32, height: i32) -> Self {
        self.controls
            .push(Control::new(name, band, x, y, width, height).floating());
        self
    }

    /// Top edge of a band already added.
    pub fn top_of(&self, band: &str) -> i32 {
        self.bands
            .iter()
            .find(|b| b.name == band)
            .map(Band::top)
            .unwrap_or_else(|| panic!("no band {band}"))
    }

    pub fn build(self) -> ControlMatrix {
        ControlMatrix::new(self.controls, self.bands)
    }
}

// ============================================================================
// Generated Reports
// ============================================================================

/// A tabular report: one row of `columns` controls per band, each control
/// 50px wide on a 60px pitch, inset 2px from its band's top and 4px from its
/// bottom. `jitter` (at most 2) nudges controls right so the builder has to
/// snap them back together.
pub fn tabular_report(bands: &[(&str, i32)], columns: usize, jitter: i32) -> ControlMatrix {
    let mut builder = MatrixBuilder::new();
    for &(name, height) in bands {
        builder = builder.band(name, height);
    }
    for (band_index, &(name, height)) in bands.iter().enumerate() {
        let top = builder.top_of(name);
        for column in 0..columns {
            let nudge = if jitter > 0 {
                ((band_index + column) as i32) % (jitter + 1)
            } else {
                0
            };
            builder = builder.control(
                &format!("{name}_{column}"),
                name,
                10 + column as i32 * 60 + nudge,
                top + 2,
                50,
                height - 6,
            );
        }
    }
    builder.build()
}

/// The generated family the invariant tests run over.
pub fn report_family() -> Vec<ControlMatrix> {
    vec![
        tabular_report(&[("detail", 30)], 1, 0),
        tabular_report(&[("header", 30), ("detail", 24), ("summary", 40)], 3, 0),
        tabular_report(&[("header", 40), ("detail", 20)], 6, 2),
        tabular_report(
            &[("title", 60), ("header", 24), ("detail", 20), ("footer", 30)],
            10,
            1,
        ),
        invoice_report(),
        MatrixBuilder::new()
            .band("header", 40)
            .band("detail", 30)
            .control("title", "header", 10, 5, 300, 25)
            .control("name", "detail", 10, 45, 120, 20)
            .control("note", "detail", 60, 45, 120, 20)
            .floating("logo", "header", 320, 0, 60, 40)
            .floating("line", "detail", 0, 68, 400, 1)
            .build(),
    ]
}

/// A grouped invoice: page header closed by a summary, group header closed
/// by a subtotal trailer, detail rows.
pub fn invoice_report() -> ControlMatrix {
    MatrixBuilder::new()
        .band("header", 40)
        .header("header.1", 30)
        .band("detail", 20)
        .trailer("trailer.1", 30, "header.1")
        .trailer("summary", 30, "header")
        .control("title", "header", 10, 8, 300, 24)
        .control("customer", "header.1", 10, 45, 200, 20)
        .control("product", "detail", 10, 72, 140, 16)
        .control("amount", "detail", 160, 72, 60, 16)
        .control("subtotal", "trailer.1", 160, 95, 60, 20)
        .control("total", "summary", 160, 125, 60, 20)
        .floating("rule", "trailer.1", 10, 92, 210, 1)
        .build()
}

/// Attributes for one invoice data row.
pub fn invoice_row(customer: &str, product: &str, amount: &str) -> AttributeMap {
    [
        ("title", "Invoices"),
        ("customer", customer),
        ("product", product),
        ("amount", amount),
        ("subtotal", "-"),
        ("total", "-"),
        ("rule", ""),
    ]
    .into_iter()
    .map(|(name, text)| (name.to_owned(), ControlAttributes::text(text)))
    .collect()
}
