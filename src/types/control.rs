use serde::{Deserialize, Serialize};

use super::Band;
use crate::error::Result;

/// Band name of the synthetic layer drawn above every band.
pub const FOREGROUND_BAND: &str = "foreground";
/// Band name of the synthetic layer drawn below every band.
pub const BACKGROUND_BAND: &str = "background";

/// A positioned report control, as supplied by the control source.
///
/// Coordinates are absolute report pixels: `y` is measured from the top of
/// the first band, not from the top of the owning band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    /// Unique control name
    pub name: String,
    /// Name of the band the control belongs to
    pub band: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Whether the control is drawn independently of the grid
    #[serde(default)]
    pub floating: bool,
}

impl Control {
    pub fn new(name: impl Into<String>, band: impl Into<String>, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            name: name.into(),
            band: band.into(),
            x,
            y,
            width,
            height,
            floating: false,
        }
    }

    /// Mark the control as floating.
    pub fn floating(mut self) -> Self {
        self.floating = true;
        self
    }

    pub fn right_bound(&self) -> i32 {
        self.x + self.width
    }

    pub fn lower_bound(&self) -> i32 {
        self.y + self.height
    }

    /// Whether the control lives on the foreground/background layer.
    pub fn is_layered(&self) -> bool {
        self.band == FOREGROUND_BAND || self.band == BACKGROUND_BAND
    }
}

/// Supplies positioned controls and the ordered band list to the builder.
///
/// Consumed once per build.
pub trait ControlSource {
    fn controls(&self) -> &[Control];
    fn bands(&self) -> &[Band];
}

/// Builder input: an unordered set of controls plus the ordered band list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMatrix {
    #[serde(default)]
    pub controls: Vec<Control>,
    #[serde(default)]
    pub bands: Vec<Band>,
}

impl ControlMatrix {
    pub fn new(controls: Vec<Control>, bands: Vec<Band>) -> Self {
        Self { controls, bands }
    }

    /// Parse a control matrix from its JSON description.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ControlSource for ControlMatrix {
    fn controls(&self) -> &[Control] {
        &self.controls
    }

    fn bands(&self) -> &[Band] {
        &self.bands
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::BandType;

    #[test]
    fn test_bounds() {
        let control = Control::new("t1", "detail", 10, 20, 80, 15);
        assert_eq!(control.right_bound(), 90);
        assert_eq!(control.lower_bound(), 35);
        assert!(!control.floating);
        assert!(control.floating().floating);
    }

    #[test]
    fn test_layered_bands() {
        assert!(Control::new("bg", "background", 0, 0, 5, 5).is_layered());
        assert!(Control::new("fg", "foreground", 0, 0, 5, 5).is_layered());
        assert!(!Control::new("d", "detail", 0, 0, 5, 5).is_layered());
    }

    #[test]
    fn test_matrix_from_json() {
        let json = r#"{
            "controls": [
                {"name": "id_t", "band": "header", "x": 10, "y": 4, "width": 60, "height": 16},
                {"name": "logo", "band": "header", "x": 200, "y": 0, "width": 40, "height": 40, "floating": true}
            ],
            "bands": [
                {"name": "header", "height": 40, "bound": 40, "bandType": "header", "repeatable": false},
                {"name": "detail", "height": 20, "bound": 60}
            ]
        }"#;

        let matrix = ControlMatrix::from_json_str(json).unwrap();
        assert_eq!(matrix.controls().len(), 2);
        assert!(matrix.controls()[1].floating);
        assert_eq!(matrix.bands()[0].band_type, BandType::Header);
        assert!(!matrix.bands()[0].repeatable);
        assert!(matrix.bands()[1].repeatable);
        assert_eq!(matrix.bands()[1].top(), 40);
    }

    #[test]
    fn test_matrix_from_invalid_json() {
        assert!(ControlMatrix::from_json_str("{\"controls\": 3}").is_err());
    }
}
