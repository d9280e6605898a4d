use super::entity::Chain;
use super::row::RowDefinition;
use super::RowId;
use crate::types::{Band, BandType};

/// The ordered row run of one report band.
///
/// Relations to other bands are positions in the grid's band list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandRows {
    pub name: String,
    pub band_type: BandType,
    /// Whether data changes in this band trigger group breaks
    pub repeatable: bool,
    pub rows: Vec<RowId>,
    pub parent: Option<usize>,
    /// Header band whose group this band closes
    pub related_header: Option<usize>,
    /// Trailer bands closing this band's group, in band order
    pub related_trailers: Vec<usize>,
}

impl BandRows {
    fn new(band: &Band) -> Self {
        Self {
            name: band.name.clone(),
            band_type: band.band_type,
            repeatable: band.repeatable,
            rows: Vec::new(),
            parent: None,
            related_header: None,
            related_trailers: Vec::new(),
        }
    }

    /// Group the linked rows of `rows` by band, keeping the band order of
    /// `bands` and resolving the band relations by name.
    pub fn collect(bands: &[Band], rows: &Chain<RowDefinition>) -> Vec<BandRows> {
        let position = |name: &str| bands.iter().position(|band| band.name == name);

        let mut grouped: Vec<BandRows> = bands.iter().map(BandRows::new).collect();
        for (band, rows_of_band) in bands.iter().zip(grouped.iter_mut()) {
            rows_of_band.rows = rows
                .iter()
                .filter(|(_, row)| row.belongs_to(&band.name))
                .map(|(id, _)| id)
                .collect();
            rows_of_band.parent = band.parent.as_deref().and_then(position);
            rows_of_band.related_header = band.related_header.as_deref().and_then(position);
        }

        let links: Vec<(usize, usize)> = grouped
            .iter()
            .enumerate()
            .filter_map(|(trailer, band)| band.related_header.map(|header| (header, trailer)))
            .collect();
        for (header, trailer) in links {
            if let Some(header) = grouped.get_mut(header) {
                header.related_trailers.push(trailer);
            }
        }
        grouped
    }

    pub fn is_trailer(&self) -> bool {
        self.related_header.is_some()
    }

    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }
}
