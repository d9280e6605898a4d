//! Grid builder: turns a control matrix into a [`VirtualGrid`].
//!
//! The build runs as a fixed sequence of passes over one working set of
//! cells:
//!
//! 1. validation and minimum-width widening
//! 2. row derivation (Y normalization, clustering, overlap resolution, gap filling)
//! 3. same-row overlap demotion
//! 4. column derivation (X normalization, boundaries, dissolution, padding)
//! 5. report-type post-processing and optional floating discard
//! 6. integrity check, padding entities, band heights, filler dissolution
//! 7. floating anchoring
//!
//! The first error aborts the build; no partial grid is returned.

mod columns;
mod floating;
mod normalize;
mod reconcile;
mod rows;

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::grid::{BandRows, VirtualCellRepository, VirtualGrid};
use crate::types::{Band, Control, ControlSource, ReportType};

pub use floating::map_floating_control;

use columns::{define_columns, strip_filler_columns};
use floating::anchor_floating_cells;
use reconcile::{
    add_padding_column, add_padding_row, check_integrity, dissolve_filler_rows,
    reconcile_band_heights,
};
use rows::{define_rows, demote_row_overlaps, RowLayout};

/// Default merge threshold on both axes, in pixels.
pub const DEFAULT_THRESHOLD: i32 = 3;

/// Tunables of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuilderOptions {
    /// Maximum horizontal gap merged into one position; also the minimum column width
    pub x_threshold: i32,
    /// Maximum vertical gap (or height difference) merged into one row
    pub y_threshold: i32,
    pub report_type: ReportType,
    /// Drop cells demoted to floating by overlap resolution; only controls
    /// marked floating in the input and layer controls stay floating
    pub discard_floating: bool,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self {
            x_threshold: DEFAULT_THRESHOLD,
            y_threshold: DEFAULT_THRESHOLD,
            report_type: ReportType::Freeform,
            discard_floating: false,
        }
    }
}

impl BuilderOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.x_threshold < 1 {
            return Err(GridError::InvalidArgument(format!(
                "x threshold must be at least 1, got {}",
                self.x_threshold
            )));
        }
        if self.y_threshold < 0 {
            return Err(GridError::InvalidArgument(format!(
                "y threshold must not be negative, got {}",
                self.y_threshold
            )));
        }
        Ok(())
    }
}

/// Builds virtual grids from control sources.
#[derive(Debug, Clone, Default)]
pub struct GridBuilder {
    options: BuilderOptions,
}

impl GridBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: BuilderOptions) -> Self {
        Self { options }
    }

    pub fn with_thresholds(mut self, x_threshold: i32, y_threshold: i32) -> Self {
        self.options.x_threshold = x_threshold;
        self.options.y_threshold = y_threshold;
        self
    }

    pub fn with_report_type(mut self, report_type: ReportType) -> Self {
        self.options.report_type = report_type;
        self
    }

    pub fn discard_floating(mut self, discard: bool) -> Self {
        self.options.discard_floating = discard;
        self
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Build a grid from the controls and bands of `source`.
    pub fn build<S: ControlSource + ?Sized>(&self, source: &S) -> Result<VirtualGrid> {
        let options = self.options;
        options.validate()?;
        let bands = source.bands();
        validate_input(source.controls(), bands, options.x_threshold)?;

        let mut cells = VirtualCellRepository::new(source.controls().iter().cloned())?;
        let ids: Vec<_> = cells.ids().collect();
        for id in ids {
            let cell = cells.cell_mut(id)?;
            if !cell.control().floating && cell.width < options.x_threshold {
                cell.width = options.x_threshold;
            }
        }

        let RowLayout {
            rows: mut row_chain,
            floating: mut floating_set,
        } = define_rows(&mut cells, bands, options.y_threshold)?;
        demote_row_overlaps(&mut row_chain, &mut cells, &mut floating_set)?;

        let mut column_chain = define_columns(&mut cells, &floating_set, options.x_threshold)?;
        if options.report_type.strips_filler_columns() {
            strip_filler_columns(&mut column_chain, &mut cells)?;
        }

        let diverted = floating_set.clone();
        if options.discard_floating {
            floating_set.retain(|&id| {
                cells
                    .get(id)
                    .is_some_and(|cell| cell.control().floating || cell.control().is_layered())
            });
            debug!(
                "discarded {} demoted cells",
                diverted.len() - floating_set.len()
            );
        }

        check_integrity(&row_chain, &column_chain, &cells, &diverted)?;
        add_padding_column(&mut column_chain, &cells, &floating_set)?;
        reconcile_band_heights(&mut row_chain, &mut cells, bands)?;
        add_padding_row(&mut row_chain, &cells, &floating_set)?;
        dissolve_filler_rows(&mut row_chain, &mut cells, &floating_set)?;

        let floating_cells =
            anchor_floating_cells(&mut row_chain, &mut column_chain, &cells, &floating_set)?;
        let band_rows = BandRows::collect(bands, &row_chain);

        debug!(
            "built grid: {} rows, {} columns, {} floating cells",
            row_chain.len(),
            column_chain.len(),
            floating_cells.len()
        );
        Ok(VirtualGrid::new(
            row_chain,
            column_chain,
            band_rows,
            cells,
            floating_cells,
            options.report_type,
        ))
    }
}

/// Reject malformed input before anything is mutated.
///
/// Right and lower bounds must fit in `i32` after narrow controls are
/// widened to `x_threshold`.
fn validate_input(controls: &[Control], bands: &[Band], x_threshold: i32) -> Result<()> {
    if bands.is_empty() {
        return Err(GridError::InvalidArgument(
            "control matrix has no bands".to_owned(),
        ));
    }
    if controls.is_empty() {
        return Err(GridError::InvalidArgument(
            "control matrix has no controls".to_owned(),
        ));
    }

    let mut band_names = HashSet::new();
    for band in bands {
        if !band_names.insert(band.name.as_str()) {
            return Err(GridError::InvalidArgument(format!(
                "duplicate band {}",
                band.name
            )));
        }
        if band.height < 0 {
            return Err(GridError::InvalidArgument(format!(
                "band {} has a negative height",
                band.name
            )));
        }
    }
    for band in bands {
        for related in [&band.parent, &band.related_header].into_iter().flatten() {
            if !band_names.contains(related.as_str()) {
                return Err(GridError::InvalidArgument(format!(
                    "band {} refers to unknown band {related}",
                    band.name
                )));
            }
        }
    }

    let mut names = HashSet::new();
    for control in controls {
        if !names.insert(control.name.as_str()) {
            return Err(GridError::DuplicateControl {
                name: control.name.clone(),
            });
        }
        if control.x < 0 || control.y < 0 || control.width < 0 || control.height < 0 {
            return Err(GridError::InvalidControl {
                name: control.name.clone(),
                reason: "negative position or size".to_owned(),
            });
        }
        let width = if control.floating {
            control.width
        } else {
            control.width.max(x_threshold)
        };
        if control.x.checked_add(width).is_none()
            || control.y.checked_add(control.height).is_none()
        {
            return Err(GridError::InvalidControl {
                name: control.name.clone(),
                reason: "bounds exceed the coordinate range".to_owned(),
            });
        }
        if !control.is_layered() && !band_names.contains(control.band.as_str()) {
            return Err(GridError::UnknownBand {
                control: control.name.clone(),
                band: control.band.clone(),
            });
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
    use crate::types::ControlMatrix;

    fn detail() -> Vec<Band> {
        Band::stacked([("detail", 30)])
    }

    #[test]
    fn test_options_defaults_and_json() {
        let options = BuilderOptions::default();
        assert_eq!(options.x_threshold, 3);
        assert_eq!(options.y_threshold, 3);
        assert_eq!(options.report_type, ReportType::Freeform);

        let options =
            BuilderOptions::from_json_str(r#"{"xThreshold": 5, "reportType": "grid"}"#).unwrap();
        assert_eq!(options.x_threshold, 5);
        assert_eq!(options.y_threshold, 3);
        assert_eq!(options.report_type, ReportType::Grid);
        assert!(!options.discard_floating);
    }

    #[test]
    fn test_options_reject_bad_thresholds() {
        assert!(matches!(
            BuilderOptions::from_json_str(r#"{"xThreshold": 0}"#),
            Err(GridError::InvalidArgument(_))
        ));
        let matrix = ControlMatrix::new(vec![Control::new("a", "detail", 0, 0, 10, 10)], detail());
        assert!(matches!(
            GridBuilder::new().with_thresholds(3, -1).build(&matrix),
            Err(GridError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rejects_empty_matrix() {
        let no_controls = ControlMatrix::new(Vec::new(), detail());
        assert!(matches!(
            GridBuilder::new().build(&no_controls),
            Err(GridError::InvalidArgument(_))
        ));
        let no_bands = ControlMatrix::new(vec![Control::new("a", "detail", 0, 0, 10, 10)], Vec::new());
        assert!(matches!(
            GridBuilder::new().build(&no_bands),
            Err(GridError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_band_but_accepts_layers() {
        let matrix = ControlMatrix::new(
            vec![
                Control::new("a", "detail", 0, 0, 10, 10),
                Control::new("b", "summary", 0, 10, 10, 10),
            ],
            detail(),
        );
        match GridBuilder::new().build(&matrix) {
            Err(GridError::UnknownBand { control, band }) => {
                assert_eq!(control, "b");
                assert_eq!(band, "summary");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let layered = ControlMatrix::new(
            vec![
                Control::new("a", "detail", 0, 0, 10, 10),
                Control::new("watermark", "background", 0, 0, 40, 30),
            ],
            detail(),
        );
        let grid = GridBuilder::new().build(&layered).unwrap();
        assert_eq!(grid.floating_cells().len(), 1);
    }

    #[test]
    fn test_rejects_duplicate_and_negative_controls() {
        let duplicate = ControlMatrix::new(
            vec![
                Control::new("a", "detail", 0, 0, 10, 10),
                Control::new("a", "detail", 20, 0, 10, 10),
            ],
            detail(),
        );
        assert!(matches!(
            GridBuilder::new().build(&duplicate),
            Err(GridError::DuplicateControl { .. })
        ));

        let negative = ControlMatrix::new(vec![Control::new("a", "detail", -5, 0, 10, 10)], detail());
        let err = GridBuilder::new().build(&negative).unwrap_err();
        assert_eq!(err.control_name(), Some("a"));
    }

    #[test]
    fn test_rejects_controls_with_overflowing_bounds() {
        let wide = ControlMatrix::new(
            vec![Control::new("a", "detail", i32::MAX - 5, 0, 10, 10)],
            detail(),
        );
        match GridBuilder::new().build(&wide) {
            Err(GridError::InvalidControl { name, .. }) => assert_eq!(name, "a"),
            other => panic!("unexpected result: {other:?}"),
        }

        let tall = ControlMatrix::new(
            vec![Control::new("b", "detail", 0, i32::MAX - 5, 10, 10)],
            detail(),
        );
        assert_eq!(
            GridBuilder::new().build(&tall).unwrap_err().control_name(),
            Some("b")
        );

        // Only overflows once widened to the threshold.
        let sliver = ControlMatrix::new(
            vec![Control::new("c", "detail", i32::MAX - 1, 0, 1, 10)],
            detail(),
        );
        assert!(matches!(
            GridBuilder::new().build(&sliver),
            Err(GridError::InvalidControl { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_band_relation() {
        let bands = vec![Band::new("detail", 30, 30), Band::new("trailer", 10, 40).trailing("nope")];
        let matrix = ControlMatrix::new(vec![Control::new("a", "detail", 0, 0, 10, 10)], bands);
        assert!(matches!(
            GridBuilder::new().build(&matrix),
            Err(GridError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_narrow_controls_are_widened() {
        let matrix = ControlMatrix::new(
            vec![
                Control::new("a", "detail", 0, 0, 10, 30),
                Control::new("sliver", "detail", 20, 0, 1, 30),
            ],
            detail(),
        );
        let grid = GridBuilder::new().with_thresholds(4, 3).build(&matrix).unwrap();
        assert_eq!(grid.cells().by_name("sliver").unwrap().width, 4);
    }
}
