//! Live time-domain preview fed while recording.
//!
//! The preview is a display artifact only: the recording itself always keeps
//! every sample.  By default only strictly-positive samples are plotted
//! ([`filter_positive`]); [`PreviewFilter::All`] disables that.

use serde::Serialize;

/// One `(x, y)` point of the time-domain series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreviewPoint {
    /// Absolute sample index within the recording.
    pub x: f64,
    /// Sample value.
    pub y: f64,
}

/// Which samples reach the preview series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewFilter {
    /// Only samples `> 0`.
    #[default]
    PositiveOnly,
    /// Every sample.
    All,
}

/// Keep the strictly-positive samples of `samples`, paired with their index.
pub fn filter_positive(samples: &[i16]) -> impl Iterator<Item = (usize, i16)> + '_ {
    samples.iter().copied().enumerate().filter(|&(_, s)| s > 0)
}

/// Growing time-domain series for the visualization collaborator.
///
/// Holds at most `max_points` points; once full, further points are counted
/// but dropped.
#[derive(Debug, Clone)]
pub struct PreviewSeries {
    points: Vec<PreviewPoint>,
    filter: PreviewFilter,
    max_points: usize,
    /// Number of samples seen so far; the x offset of the next chunk.
    offset: usize,
    dropped: usize,
}

impl PreviewSeries {
    pub fn new(filter: PreviewFilter, max_points: usize) -> Self {
        Self {
            points: Vec::new(),
            filter,
            max_points,
            offset: 0,
            dropped: 0,
        }
    }

    /// Add one decoded chunk.
    pub fn push_chunk(&mut self, samples: &[i16]) {
        let offset = self.offset;
        let selected: Box<dyn Iterator<Item = (usize, i16)> + '_> = match self.filter {
            PreviewFilter::PositiveOnly => Box::new(filter_positive(samples)),
            PreviewFilter::All => Box::new(samples.iter().copied().enumerate()),
        };

        for (i, s) in selected {
            if self.points.len() >= self.max_points {
                self.dropped += 1;
                continue;
            }
            self.points.push(PreviewPoint {
                x: (offset + i) as f64,
                y: f64::from(s),
            });
        }

        self.offset += samples.len();
    }

    /// Forget every point; keeps filter and capacity.
    pub fn clear(&mut self) {
        self.points.clear();
        self.offset = 0;
        self.dropped = 0;
    }

    pub fn points(&self) -> &[PreviewPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points that did not fit under `max_points`.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}
