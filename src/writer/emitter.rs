//! Banded emission: drives a [`RowConsumer`] once per data row and fires
//! group trailers when a group breaks.

use std::collections::HashSet;

use log::{debug, trace, warn};

use super::{ExportedCell, RowConsumer};
use crate::error::{GridError, Result};
use crate::grid::VirtualGrid;
use crate::types::AttributeMap;

/// Position of the emitter in the visited band list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// No data entered yet
    Idle,
    /// Index into the visited band list of the last band emitted
    At(usize),
    /// The stream was flushed
    Finished,
}

/// Stateful emitter walking the bands of a grid as data rows arrive.
///
/// Bands that close another band's group (trailers) are never visited
/// directly; they are written when the group they close breaks. The emitter
/// must be driven sequentially by a single caller.
#[derive(Debug)]
pub struct BandedEmitter<'g, W> {
    grid: &'g VirtualGrid,
    writer: W,
    /// Positions in the grid's band list of bands without a related header
    visited: Vec<usize>,
    unrepeatable: HashSet<&'g str>,
    previous: Option<AttributeMap>,
    cursor: Cursor,
    closed: bool,
}

impl<'g, W: RowConsumer> BandedEmitter<'g, W> {
    pub fn new(grid: &'g VirtualGrid, writer: W) -> Self {
        let bands = grid.bands();
        let visited = bands
            .iter()
            .enumerate()
            .filter(|(_, band)| !band.is_trailer())
            .map(|(position, _)| position)
            .collect();
        let unrepeatable = bands
            .iter()
            .filter(|band| !band.repeatable)
            .map(|band| band.name.as_str())
            .collect();
        Self {
            grid,
            writer,
            visited,
            unrepeatable,
            previous: None,
            cursor: Cursor::Idle,
            closed: false,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the end of the data stream has been entered.
    pub fn is_finished(&self) -> bool {
        self.cursor == Cursor::Finished
    }

    /// Attributes of the last data row entered.
    pub fn previous_data(&self) -> Option<&AttributeMap> {
        self.previous.as_ref()
    }

    /// Feed the next data row, or `None` at the end of the stream.
    ///
    /// Returns the cells placed by the writer for this call, trailers of
    /// closed groups first.
    pub fn enter_data(&mut self, data: Option<AttributeMap>) -> Result<Vec<ExportedCell>> {
        if self.closed {
            return Err(GridError::WriterClosed);
        }
        if self.cursor == Cursor::Finished {
            warn!("data entered after the end of the stream; ignored");
            return Ok(Vec::new());
        }

        let Some(data) = data else {
            return self.flush();
        };

        let changed = self.changed_bands(&data);
        let restart = self
            .visited
            .iter()
            .position(|&band| {
                self.grid
                    .bands()
                    .get(band)
                    .is_some_and(|band| changed.contains(band.name.as_str()))
            })
            .unwrap_or_else(|| self.visited.len().saturating_sub(1));

        let mut exported = Vec::new();
        if let Cursor::At(current) = self.cursor {
            if restart < current {
                debug!(
                    "group break at band {}",
                    self.visited_name(restart).unwrap_or_default()
                );
                let previous = self.previous.take().unwrap_or_default();
                let trailers = self.emit_trailers((restart..=current).rev(), &previous);
                self.previous = Some(previous);
                exported.extend(trailers?);
            }
        }

        for position in restart..self.visited.len() {
            if let Some(&band) = self.visited.get(position) {
                exported.extend(self.emit_band(band, &data)?);
            }
        }
        self.cursor = Cursor::At(self.visited.len().saturating_sub(1));
        self.previous = Some(data);
        Ok(exported)
    }

    /// Emit every visited band followed by its trailers once, with the last
    /// data row entered. The cursor does not move.
    pub fn process_bands(&mut self) -> Result<Vec<ExportedCell>> {
        if self.closed {
            return Err(GridError::WriterClosed);
        }
        let data = self.previous.take().unwrap_or_default();
        let result = self.emit_all(&data);
        self.previous = Some(data);
        result
    }

    /// Write every band's rows once with the attributes bound to the grid,
    /// then finalise the writer.
    pub fn write_entire_grid(&mut self, sheet_name: Option<&str>) -> Result<()> {
        if self.closed {
            return Err(GridError::WriterClosed);
        }
        let grid = self.grid;
        let attributes = grid.attributes();
        if attributes.is_empty() {
            return Err(GridError::InvalidArgument(
                "no control attributes bound to the grid".to_owned(),
            ));
        }
        for band in grid.bands().iter().filter(|band| band.has_rows()) {
            self.writer.write_rows(grid, &band.rows, attributes)?;
        }
        self.write(sheet_name)
    }

    /// Finalise the writer.
    pub fn write(&mut self, sheet_name: Option<&str>) -> Result<()> {
        if self.closed {
            return Err(GridError::WriterClosed);
        }
        self.writer.write(sheet_name)
    }

    /// Release everything the emitter holds. Every later call fails.
    pub fn dispose(&mut self) {
        self.visited.clear();
        self.unrepeatable.clear();
        self.previous = None;
        self.cursor = Cursor::Idle;
        self.closed = true;
    }

    /// Close every open group, innermost first, and finish the stream.
    fn flush(&mut self) -> Result<Vec<ExportedCell>> {
        let mut exported = Vec::new();
        if let Cursor::At(current) = self.cursor {
            let previous = self.previous.take().unwrap_or_default();
            let trailers = self.emit_trailers((0..=current).rev(), &previous);
            self.previous = Some(previous);
            exported = trailers?;
        }
        debug!("stream flushed, {} cells in closing trailers", exported.len());
        self.cursor = Cursor::Finished;
        Ok(exported)
    }

    /// Names of the bands whose controls changed against the previous row.
    fn changed_bands(&self, data: &AttributeMap) -> HashSet<&'g str> {
        let grid = self.grid;
        let Some(previous) = &self.previous else {
            return grid
                .bands()
                .iter()
                .filter(|band| band.has_rows())
                .map(|band| band.name.as_str())
                .collect();
        };

        let mut changed = HashSet::new();
        for (_, cell) in grid.cells().iter() {
            let band = cell.band();
            if self.unrepeatable.contains(band) || changed.contains(band) {
                continue;
            }
            if previous.get(cell.name()) != data.get(cell.name()) {
                trace!("{} changed, band {band} breaks", cell.name());
                changed.insert(band);
            }
        }
        changed
    }

    fn emit_all(&mut self, data: &AttributeMap) -> Result<Vec<ExportedCell>> {
        let mut exported = Vec::new();
        for position in 0..self.visited.len() {
            let Some(&band) = self.visited.get(position) else {
                continue;
            };
            exported.extend(self.emit_band(band, data)?);
            exported.extend(self.emit_trailers(position..=position, data)?);
        }
        Ok(exported)
    }

    /// Emit the trailers of the visited bands at `positions`, in that order.
    fn emit_trailers(
        &mut self,
        positions: impl Iterator<Item = usize>,
        data: &AttributeMap,
    ) -> Result<Vec<ExportedCell>> {
        let grid = self.grid;
        let mut exported = Vec::new();
        for position in positions {
            let Some(band) = self.visited.get(position).and_then(|&b| grid.bands().get(b)) else {
                continue;
            };
            for &trailer in &band.related_trailers {
                exported.extend(self.emit_band(trailer, data)?);
            }
        }
        Ok(exported)
    }

    fn emit_band(&mut self, band: usize, data: &AttributeMap) -> Result<Vec<ExportedCell>> {
        let grid = self.grid;
        let Some(band) = grid.bands().get(band).filter(|band| band.has_rows()) else {
            return Ok(Vec::new());
        };
        let exported = self
            .writer
            .write_rows(grid, &band.rows, data)?
            .unwrap_or_default();
        trace!("band {} written, {} cells", band.name, exported.len());
        Ok(exported)
    }

    fn visited_name(&self, position: usize) -> Option<&'g str> {
        let grid = self.grid;
        self.visited
            .get(position)
            .and_then(|&band| grid.bands().get(band))
            .map(|band| band.name.as_str())
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
    use crate::builder::GridBuilder;
    use crate::grid::RowId;
    use crate::types::{Band, BandType, Control, ControlAttributes, ControlMatrix};

    /// Records the band of every row slice it is handed.
    #[derive(Default)]
    struct BandRecorder {
        bands: Vec<String>,
        fail: bool,
    }

    impl RowConsumer for BandRecorder {
        fn write_rows(
            &mut self,
            grid: &VirtualGrid,
            rows: &[RowId],
            attributes: &AttributeMap,
        ) -> Result<Option<Vec<ExportedCell>>> {
            if self.fail {
                return Err(GridError::Writer("disk full".into()));
            }
            let band = rows
                .first()
                .and_then(|&id| grid.row(id))
                .and_then(|row| row.band())
                .unwrap_or_default();
            self.bands.push(band.to_owned());
            Ok(Some(ExportedCell::collect(grid, rows, attributes)))
        }
    }

    fn grouped_grid() -> VirtualGrid {
        let bands = vec![
            Band::new("header", 20, 20).with_type(BandType::Header).unrepeatable(),
            Band::new("header.1", 20, 40).with_type(BandType::Header),
            Band::new("detail", 20, 60),
            Band::new("trailer.1", 20, 80).trailing("header.1"),
        ];
        let matrix = ControlMatrix::new(
            vec![
                Control::new("title", "header", 0, 0, 100, 20),
                Control::new("customer", "header.1", 0, 20, 100, 20),
                Control::new("amount", "detail", 0, 40, 100, 20),
                Control::new("total", "trailer.1", 0, 60, 100, 20),
            ],
            bands,
        );
        GridBuilder::new().build(&matrix).unwrap()
    }

    fn row(customer: &str, amount: &str) -> AttributeMap {
        [
            ("title", "Sales"),
            ("customer", customer),
            ("amount", amount),
            ("total", "-"),
        ]
        .into_iter()
        .map(|(name, text)| (name.to_owned(), ControlAttributes::text(text)))
        .collect()
    }

    #[test]
    fn test_first_row_emits_every_visited_band() {
        let grid = grouped_grid();
        let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
        let exported = emitter.enter_data(Some(row("ACME", "10"))).unwrap();
        assert_eq!(emitter.writer().bands, vec!["header", "header.1", "detail"]);
        assert_eq!(exported.len(), 3);
    }

    #[test]
    fn test_same_group_reemits_detail_only() {
        let grid = grouped_grid();
        let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
        emitter.enter_data(Some(row("ACME", "10"))).unwrap();
        emitter.enter_data(Some(row("ACME", "20"))).unwrap();
        assert_eq!(
            emitter.writer().bands,
            vec!["header", "header.1", "detail", "detail"]
        );
    }

    #[test]
    fn test_group_break_fires_trailer_with_previous_data() {
        let grid = grouped_grid();
        let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
        emitter.enter_data(Some(row("ACME", "10"))).unwrap();
        let exported = emitter.enter_data(Some(row("Globex", "5"))).unwrap();
        assert_eq!(
            emitter.writer().bands,
            vec!["header", "header.1", "detail", "trailer.1", "header.1", "detail"]
        );
        assert_eq!(exported[0].control_name, "total");
        assert_eq!(emitter.previous_data().unwrap()["customer"], ControlAttributes::text("Globex"));
    }

    #[test]
    fn test_unchanged_row_reemits_last_band() {
        let grid = grouped_grid();
        let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
        emitter.enter_data(Some(row("ACME", "10"))).unwrap();
        emitter.enter_data(Some(row("ACME", "10"))).unwrap();
        assert_eq!(emitter.writer().bands.last().map(String::as_str), Some("detail"));
        assert_eq!(emitter.writer().bands.len(), 4);
    }

    #[test]
    fn test_unrepeatable_band_never_breaks() {
        let grid = grouped_grid();
        let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
        emitter.enter_data(Some(row("ACME", "10"))).unwrap();
        let mut next = row("ACME", "10");
        next.insert("title".into(), ControlAttributes::text("Other"));
        emitter.enter_data(Some(next)).unwrap();
        assert_eq!(emitter.writer().bands.len(), 4);
        assert!(!emitter.writer().bands.iter().skip(3).any(|band| band == "header"));
    }

    #[test]
    fn test_end_of_stream_flushes_trailers_once() {
        let grid = grouped_grid();
        let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
        emitter.enter_data(Some(row("ACME", "10"))).unwrap();
        emitter.enter_data(None).unwrap();
        assert!(emitter.is_finished());
        assert_eq!(emitter.writer().bands.last().map(String::as_str), Some("trailer.1"));

        let after = emitter.enter_data(Some(row("ACME", "10"))).unwrap();
        assert!(after.is_empty());
        assert_eq!(emitter.writer().bands.len(), 4);
    }

    #[test]
    fn test_end_of_empty_stream_writes_nothing() {
        let grid = grouped_grid();
        let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
        assert!(emitter.enter_data(None).unwrap().is_empty());
        assert!(emitter.writer().bands.is_empty());
    }

    #[test]
    fn test_dispose_closes_emitter() {
        let grid = grouped_grid();
        let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
        emitter.dispose();
        assert!(emitter.is_closed());
        assert!(matches!(
            emitter.enter_data(Some(row("ACME", "10"))),
            Err(GridError::WriterClosed)
        ));
        assert!(matches!(emitter.process_bands(), Err(GridError::WriterClosed)));
        assert!(matches!(emitter.write(None), Err(GridError::WriterClosed)));
    }

    #[test]
    fn test_writer_failure_is_returned() {
        let grid = grouped_grid();
        let recorder = BandRecorder {
            fail: true,
            ..BandRecorder::default()
        };
        let mut emitter = BandedEmitter::new(&grid, recorder);
        match emitter.enter_data(Some(row("ACME", "10"))) {
            Err(GridError::Writer(message)) => assert_eq!(message, "disk full"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_process_bands_emits_trailers_after_their_band() {
        let grid = grouped_grid();
        let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
        emitter.process_bands().unwrap();
        assert_eq!(
            emitter.writer().bands,
            vec!["header", "header.1", "trailer.1", "detail"]
        );
    }

    #[test]
    fn test_write_entire_grid_requires_bound_attributes() {
        let mut grid = grouped_grid();
        {
            let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
            assert!(matches!(
                emitter.write_entire_grid(Some("Sheet1")),
                Err(GridError::InvalidArgument(_))
            ));
        }

        grid.bind_attributes(row("ACME", "10"));
        let mut emitter = BandedEmitter::new(&grid, BandRecorder::default());
        emitter.write_entire_grid(Some("Sheet1")).unwrap();
        assert_eq!(
            emitter.into_writer().bands,
            vec!["header", "header.1", "detail", "trailer.1"]
        );
    }
}
