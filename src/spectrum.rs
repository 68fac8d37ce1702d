//! Spectrum history buffer and the tab-separated spectrum log reader.

use std::io::BufRead;

use log::info;

use crate::error::{Result, SculptError};

/// Time-ordered rows of per-frequency intensities in [0, 1].
///
/// All rows share the same length. Live input writes through a cursor that
/// wraps around, overwriting the oldest row.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumHistory {
    rows: Vec<Vec<f32>>,
    freq_count: usize,
    cursor: usize,
}

impl SpectrumHistory {
    /// Wrap existing rows; fails with `MalformedInput` if row lengths differ
    pub fn new(rows: Vec<Vec<f32>>) -> Result<Self> {
        let freq_count = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != freq_count) {
            return Err(SculptError::malformed(
                bad + 1,
                format!(
                    "row has {} frequencies, expected {}",
                    rows[bad].len(),
                    freq_count
                ),
            ));
        }
        Ok(Self {
            rows,
            freq_count,
            cursor: 0,
        })
    }

    /// `slices` silent rows of `freq_count` bins
    pub fn zeroed(slices: usize, freq_count: usize) -> Self {
        Self {
            rows: vec![vec![0.0; freq_count]; slices],
            freq_count,
            cursor: 0,
        }
    }

    /// Number of time-slices (T)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of frequency bins per slice (F)
    pub fn freq_count(&self) -> usize {
        self.freq_count
    }

    pub fn row(&self, idx: usize) -> Option<&[f32]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Slice that the next live frame will overwrite
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Animation angle in whole degrees derived from the write cursor
    pub fn cursor_angle(&self) -> f32 {
        if self.rows.is_empty() {
            return 0.0;
        }
        (self.cursor * 360 / self.rows.len()) as f32
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    /// Copy `frame` into the slice at the cursor, advance the cursor and
    /// return the index that was written
    pub fn push_frame(&mut self, frame: &[f32]) -> Result<usize> {
        if self.rows.is_empty() {
            return Err(SculptError::invalid("cannot push into an empty history"));
        }
        if frame.len() != self.freq_count {
            return Err(SculptError::invalid(format!(
                "frame has {} frequencies, history expects {}",
                frame.len(),
                self.freq_count
            )));
        }
        let idx = self.cursor;
        self.rows[idx].copy_from_slice(frame);
        self.cursor = (self.cursor + 1) % self.rows.len();
        Ok(idx)
    }

    /// Integer compression factor needed to fit `rows` into `max_rows`
    pub fn compression_step(rows: usize, max_rows: usize) -> usize {
        if rows == 0 || max_rows == 0 {
            return 1;
        }
        ((rows - 1) / max_rows) + 1
    }

    /// Average consecutive rows down so that at most `max_rows` remain.
    ///
    /// Trailing rows that do not fill a whole group are dropped.
    pub fn compress(rows: Vec<Vec<f32>>, max_rows: usize) -> Result<Self> {
        let step = Self::compression_step(rows.len(), max_rows);
        if step == 1 {
            return Self::new(rows);
        }

        let out_len = rows.len() / step;
        let freq_count = rows.first().map_or(0, Vec::len);
        let mut out = vec![vec![0.0f32; freq_count]; out_len];
        for (i, row) in rows.iter().enumerate().take(out_len * step) {
            if row.len() != freq_count {
                return Err(SculptError::malformed(
                    i + 1,
                    format!("row has {} frequencies, expected {}", row.len(), freq_count),
                ));
            }
            for (acc, value) in out[i / step].iter_mut().zip(row) {
                *acc += value / step as f32;
            }
        }
        Self::new(out)
    }

    /// Parse a spectrum log.
    ///
    /// The first line is a header. Every following non-empty line holds a
    /// label column followed by tab-separated intensities.
    pub fn from_log<R: BufRead>(reader: R, max_rows: usize) -> Result<Self> {
        let mut rows: Vec<Vec<f32>> = Vec::new();
        let mut freq_count = None;

        for (line_no, line) in reader.lines().enumerate().skip(1) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let row = line
                .split('\t')
                .skip(1)
                .map(|field| {
                    field.trim().parse::<f32>().map_err(|_| {
                        SculptError::malformed(
                            line_no + 1,
                            format!("'{}' is not a number", field.trim()),
                        )
                    })
                })
                .collect::<Result<Vec<f32>>>()?;

            match freq_count {
                None => freq_count = Some(row.len()),
                Some(n) if n != row.len() => {
                    return Err(SculptError::malformed(
                        line_no + 1,
                        format!("expected {} frequencies, found {}", n, row.len()),
                    ));
                }
                Some(_) => {}
            }
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(SculptError::malformed(1, "spectrum log has no data rows"));
        }

        let read = rows.len();
        let step = Self::compression_step(read, max_rows);
        let history = Self::compress(rows, max_rows)?;
        info!(
            "Read {} lines with {} frequencies each",
            read,
            history.freq_count()
        );
        info!(
            "Stored as {} lines of spectrum data (compression={})",
            history.len(),
            step
        );
        Ok(history)
    }
}
