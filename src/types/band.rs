use serde::{Deserialize, Serialize};

/// Role of a band in the report structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BandType {
    Header,
    Trailer,
    #[default]
    Other,
}

/// A horizontal report section as laid out in the report designer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Band {
    pub name: String,
    /// Configured band height in pixels
    pub height: i32,
    /// Absolute Y of the bottom edge of the band
    pub bound: i32,
    #[serde(default)]
    pub band_type: BandType,
    /// Enclosing band, for nested groups
    #[serde(default)]
    pub parent: Option<String>,
    /// Header band whose group this band closes (trailers only)
    #[serde(default)]
    pub related_header: Option<String>,
    /// Whether data changes in this band trigger group breaks
    #[serde(default = "default_repeatable")]
    pub repeatable: bool,
}

fn default_repeatable() -> bool {
    true
}

impl Band {
    pub fn new(name: impl Into<String>, height: i32, bound: i32) -> Self {
        Self {
            name: name.into(),
            height,
            bound,
            band_type: BandType::Other,
            parent: None,
            related_header: None,
            repeatable: true,
        }
    }

    pub fn with_type(mut self, band_type: BandType) -> Self {
        self.band_type = band_type;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declare this band as the trailer closing `header`'s group.
    pub fn trailing(mut self, header: impl Into<String>) -> Self {
        self.related_header = Some(header.into());
        self.band_type = BandType::Trailer;
        self
    }

    pub fn unrepeatable(mut self) -> Self {
        self.repeatable = false;
        self
    }

    /// Absolute Y of the top edge of the band.
    pub fn top(&self) -> i32 {
        self.bound - self.height
    }

    /// Build a band list by stacking `(name, height)` pairs top to bottom.
    pub fn stacked<'a>(bands: impl IntoIterator<Item = (&'a str, i32)>) -> Vec<Band> {
        let mut bound = 0;
        bands
            .into_iter()
            .map(|(name, height)| {
                bound += height;
                Band::new(name, height, bound)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_stacked_bounds() {
        let bands = Band::stacked([("header", 40), ("detail", 20), ("summary", 30)]);
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].bound, 40);
        assert_eq!(bands[1].top(), 40);
        assert_eq!(bands[1].bound, 60);
        assert_eq!(bands[2].top(), 60);
        assert_eq!(bands[2].bound, 90);
    }

    #[test]
    fn test_trailing_sets_type() {
        let band = Band::new("trailer.1", 20, 100).trailing("header.1");
        assert_eq!(band.band_type, BandType::Trailer);
        assert_eq!(band.related_header.as_deref(), Some("header.1"));
        assert!(band.repeatable);
        assert!(!band.unrepeatable().repeatable);
    }
}
