use serde::{Deserialize, Serialize};

/// Presentation style of the source report; drives grid post-processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportType {
    /// Controls placed freely inside bands
    #[default]
    Freeform,
    /// Column headers over detail columns
    Tabular,
    /// Plain tabular grid; empty filler columns are removed after building
    Grid,
}

impl ReportType {
    /// Whether empty filler columns are spliced out of the column chain.
    pub fn strips_filler_columns(self) -> bool {
        matches!(self, Self::Grid)
    }
}
