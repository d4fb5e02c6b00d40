//! Per-identity coverage timelines and track classification.

use serde::{Deserialize, Serialize};

use super::EvaluationConfig;
use crate::{Error, Result};

/// Slot value for a frame where the identity is absent (or not yet evaluated).
pub const ABSENT: f64 = -1.0;

/// Classification of a ground-truth identity by its matched fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackClass {
    MostlyTracked,
    PartiallyTracked,
    MostlyLost,
}

impl TrackClass {
    /// Classify a matched fraction. Both bounds are strict.
    pub fn from_ratio(ratio: f64, config: &EvaluationConfig) -> Self {
        if ratio > config.mostly_tracked_ratio {
            TrackClass::MostlyTracked
        } else if ratio < config.mostly_lost_ratio {
            TrackClass::MostlyLost
        } else {
            TrackClass::PartiallyTracked
        }
    }

    /// Short name used in reports (`MT`, `PT`, `ML`).
    pub fn abbreviation(&self) -> &'static str {
        match self {
            TrackClass::MostlyTracked => "MT",
            TrackClass::PartiallyTracked => "PT",
            TrackClass::MostlyLost => "ML",
        }
    }
}

/// Match status of one ground-truth identity over every frame of a sequence.
///
/// Each slot is [`ABSENT`] (-1), `0.0` (present but unmatched), or the
/// matched IoU in `(0, 1]`. Slots are written at most once, in increasing
/// frame order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    identity: i32,
    slots: Vec<f64>,
    #[serde(skip)]
    last_written: Option<usize>,
}

impl CoverageRecord {
    /// A record of `num_frames` absent slots.
    pub fn new(identity: i32, num_frames: usize) -> Self {
        Self {
            identity,
            slots: vec![ABSENT; num_frames],
            last_written: None,
        }
    }

    pub fn identity(&self) -> i32 {
        self.identity
    }

    /// Raw timeline, one slot per frame.
    pub fn slots(&self) -> &[f64] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Write the slot for `frame`: the matched IoU, or 0 for a miss.
    pub(crate) fn record(&mut self, frame: usize, value: f64) -> Result<()> {
        if frame >= self.slots.len() {
            return Err(Error::FrameOutOfRange {
                frame,
                num_frames: self.slots.len(),
            });
        }
        if matches!(self.last_written, Some(last) if frame <= last) {
            return Err(Error::CoverageOverwrite {
                identity: self.identity,
                frame,
            });
        }

        self.slots[frame] = value.clamp(0.0, 1.0);
        self.last_written = Some(frame);
        Ok(())
    }

    /// Frames where the identity was present and matched.
    pub fn matched_frames(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0.0)
            .map(|(i, _)| i)
    }

    /// Frames where the identity was present but unmatched.
    pub fn missed_frames(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 0.0)
            .map(|(i, _)| i)
    }

    pub fn true_positives(&self) -> usize {
        self.matched_frames().count()
    }

    pub fn false_negatives(&self) -> usize {
        self.missed_frames().count()
    }

    /// Frames where the identity was present at all.
    pub fn present_frames(&self) -> usize {
        self.true_positives() + self.false_negatives()
    }

    /// Matched fraction of present frames, `None` if never present.
    pub fn ratio(&self) -> Option<f64> {
        let present = self.present_frames();
        if present == 0 {
            None
        } else {
            Some(self.true_positives() as f64 / present as f64)
        }
    }

    /// Mean IoU over matched frames, `None` if never matched.
    pub fn mean_overlap(&self) -> Option<f64> {
        let matched: Vec<f64> = self.slots.iter().copied().filter(|&v| v > 0.0).collect();
        if matched.is_empty() {
            None
        } else {
            Some(matched.iter().sum::<f64>() / matched.len() as f64)
        }
    }

    /// `None` if the identity was never present.
    pub fn classify(&self, config: &EvaluationConfig) -> Option<TrackClass> {
        self.ratio().map(|r| TrackClass::from_ratio(r, config))
    }
}
