//! Ground-truth to detection association.
//!
//! Both association modes reduce to [`mutual_best_match`]: a cell survives
//! only if it is the best candidate in its row and in its column. This is a
//! deterministic greedy approximation of bipartite matching, not a globally
//! optimal assignment.

use std::ops::Range;

use log::debug;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::geometry::{euclidean_distance_matrix, overlap_matrix, BoundingBox, Rect};
use crate::sequence::{Frame, Sequence};
use crate::{Error, Result};

/// Default IoU threshold for a valid match.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.5;

/// Which end of the scale counts as "best".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDirection {
    /// Higher is better (overlap). A cell is a candidate iff `0 < value` and `value >= threshold`.
    Maximize,
    /// Lower is better (distance). A cell is a candidate iff `value < threshold`.
    Minimize,
}

impl MatchDirection {
    #[inline]
    fn is_candidate(self, value: f64, threshold: f64) -> bool {
        match self {
            MatchDirection::Maximize => value > 0.0 && value >= threshold,
            MatchDirection::Minimize => value < threshold,
        }
    }

    #[inline]
    fn is_better(self, value: f64, incumbent: f64) -> bool {
        match self {
            MatchDirection::Maximize => value > incumbent,
            MatchDirection::Minimize => value < incumbent,
        }
    }
}

/// Mutual best-match suppression over a score matrix.
///
/// Returns `(row, col)` pairs, ascending by row. Ties go to the lowest
/// column within a row and the lowest row within a column, so no row or
/// column appears twice.
pub fn mutual_best_match(
    matrix: &DMatrix<f64>,
    direction: MatchDirection,
    threshold: f64,
) -> Vec<(usize, usize)> {
    let (n_rows, n_cols) = matrix.shape();
    let mut row_best: Vec<Option<usize>> = vec![None; n_rows];
    let mut col_best: Vec<Option<usize>> = vec![None; n_cols];

    for i in 0..n_rows {
        for j in 0..n_cols {
            let value = matrix[(i, j)];
            if !direction.is_candidate(value, threshold) {
                continue;
            }

            // Strict comparison keeps the earliest index on ties
            match row_best[i] {
                Some(best) if !direction.is_better(value, matrix[(i, best)]) => {}
                _ => row_best[i] = Some(j),
            }
            match col_best[j] {
                Some(best) if !direction.is_better(value, matrix[(best, j)]) => {}
                _ => col_best[j] = Some(i),
            }
        }
    }

    row_best
        .iter()
        .enumerate()
        .filter_map(|(i, best)| match *best {
            Some(j) if col_best[j] == Some(i) => Some((i, j)),
            _ => None,
        })
        .collect()
}

/// Indices in `0..total` that are not in `matched`. Out-of-range entries are ignored.
pub fn unmatched_indices(total: usize, matched: &[usize]) -> Vec<usize> {
    let mut is_matched = vec![false; total];
    for &idx in matched {
        if let Some(slot) = is_matched.get_mut(idx) {
            *slot = true;
        }
    }
    (0..total).filter(|&i| !is_matched[i]).collect()
}

/// A ground-truth row's matched detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub detection: usize,
    pub overlap: f64,
}

/// Partial one-to-one mapping from ground-truth rows to detection columns for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Association {
    rows: Vec<Option<Match>>,
    num_detections: usize,
}

impl Association {
    /// All rows unmatched.
    pub fn unmatched(num_ground_truth: usize, num_detections: usize) -> Self {
        Self {
            rows: vec![None; num_ground_truth],
            num_detections,
        }
    }

    /// Number of ground-truth rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_detections(&self) -> usize {
        self.num_detections
    }

    pub fn get(&self, ground_truth: usize) -> Option<Match> {
        self.rows.get(ground_truth).copied().flatten()
    }

    pub fn detection_for(&self, ground_truth: usize) -> Option<usize> {
        self.get(ground_truth).map(|m| m.detection)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<Match>)> + '_ {
        self.rows.iter().copied().enumerate()
    }

    pub fn num_matched(&self) -> usize {
        self.rows.iter().flatten().count()
    }

    /// Matched detection indices in ground-truth row order.
    pub fn matched_detections(&self) -> Vec<usize> {
        self.rows.iter().flatten().map(|m| m.detection).collect()
    }

    pub fn unmatched_ground_truth(&self) -> Vec<usize> {
        self.iter()
            .filter(|(_, m)| m.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn unmatched_detections(&self) -> Vec<usize> {
        unmatched_indices(self.num_detections, &self.matched_detections())
    }

    /// Detection index per ground-truth row, `-1` for unmatched rows.
    pub fn to_index_vector(&self) -> Vec<i64> {
        self.rows
            .iter()
            .map(|m| m.map_or(-1, |m| m.detection as i64))
            .collect()
    }
}

/// Associate ground-truth rects to detection rects by IoU.
///
/// Entries below `iou_threshold` are discarded, then mutual non-maximum
/// suppression keeps at most one detection per ground truth and vice versa.
pub fn associate(ground_truth: &[Rect], detections: &[Rect], iou_threshold: f64) -> Association {
    let mut association = Association::unmatched(ground_truth.len(), detections.len());
    if ground_truth.is_empty() || detections.is_empty() {
        return association;
    }

    let overlaps = overlap_matrix(ground_truth, detections);
    for (i, j) in mutual_best_match(&overlaps, MatchDirection::Maximize, iou_threshold) {
        association.rows[i] = Some(Match {
            detection: j,
            overlap: overlaps[(i, j)],
        });
    }

    association
}

/// [`associate`] over the instances of two aligned frames.
pub fn associate_frame(ground_truth: &Frame, detections: &Frame, iou_threshold: f64) -> Association {
    associate(&ground_truth.rects(), &detections.rects(), iou_threshold)
}

pub(crate) fn associate_range(
    ground_truth: &Sequence,
    detections: &Sequence,
    frames: Range<usize>,
    iou_threshold: f64,
) -> Vec<Association> {
    let gt_frames = &ground_truth.frames()[frames.clone()];
    let det_frames = &detections.frames()[frames];

    #[cfg(feature = "parallel")]
    let associations: Vec<Association> = {
        use rayon::prelude::*;
        gt_frames
            .par_iter()
            .zip(det_frames.par_iter())
            .map(|(gt, det)| associate_frame(gt, det, iou_threshold))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let associations: Vec<Association> = gt_frames
        .iter()
        .zip(det_frames.iter())
        .map(|(gt, det)| associate_frame(gt, det, iou_threshold))
        .collect();

    associations
}

pub(crate) fn check_frame_counts(ground_truth: &Sequence, detections: &Sequence) -> Result<()> {
    if ground_truth.num_frames() != detections.num_frames() {
        return Err(Error::FrameCountMismatch {
            ground_truth: ground_truth.num_frames(),
            detections: detections.num_frames(),
        });
    }
    Ok(())
}

/// One [`Association`] per frame of two aligned sequences.
///
/// Frames are independent, so with the `parallel` feature they are
/// associated on the rayon pool; the result is the same either way.
pub fn associate_frames(
    ground_truth: &Sequence,
    detections: &Sequence,
    iou_threshold: f64,
) -> Result<Vec<Association>> {
    check_frame_counts(ground_truth, detections)?;
    Ok(associate_range(
        ground_truth,
        detections,
        0..ground_truth.num_frames(),
        iou_threshold,
    ))
}

/// A copy of `detections` keeping only the detections matched to some ground truth.
///
/// Within a frame, kept detections follow ground-truth row order.
pub fn matched_detections(
    ground_truth: &Sequence,
    detections: &Sequence,
    iou_threshold: f64,
) -> Result<Sequence> {
    let associations = associate_frames(ground_truth, detections, iou_threshold)?;
    let mut matched = Sequence::new(detections.info().clone());

    for (frame, association) in detections.frames().iter().zip(&associations) {
        for det_idx in association.matched_detections() {
            matched.add_instance(frame.index(), frame.instances()[det_idx].clone())?;
        }
    }

    debug!(
        "kept {} of {} detections as matched",
        matched.num_instances(),
        detections.num_instances()
    );
    Ok(matched)
}

/// Result of centroid-distance association.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CentroidMatches {
    /// `(observed, predicted)` index pairs, ascending by observed.
    pub matches: Vec<(usize, usize)>,
    pub unmatched_observed: Vec<usize>,
    pub unmatched_predicted: Vec<usize>,
}

/// Mutual nearest-neighbour association of point rows by Euclidean distance.
///
/// Pairs at or beyond `threshold` are never matched; pass `f64::INFINITY`
/// for no limit.
pub fn centroid_association(
    observed: &DMatrix<f64>,
    predicted: &DMatrix<f64>,
    threshold: f64,
) -> CentroidMatches {
    let distances = euclidean_distance_matrix(observed, predicted);
    let matches = mutual_best_match(&distances, MatchDirection::Minimize, threshold);

    let matched_observed: Vec<usize> = matches.iter().map(|&(i, _)| i).collect();
    let matched_predicted: Vec<usize> = matches.iter().map(|&(_, j)| j).collect();

    CentroidMatches {
        unmatched_observed: unmatched_indices(observed.nrows(), &matched_observed),
        unmatched_predicted: unmatched_indices(predicted.nrows(), &matched_predicted),
        matches,
    }
}

/// [`centroid_association`] on box centers.
pub fn box_centroid_association(
    observed: &[BoundingBox],
    predicted: &[BoundingBox],
    threshold: f64,
) -> CentroidMatches {
    let to_points = |boxes: &[BoundingBox]| {
        DMatrix::from_fn(boxes.len(), 2, |i, k| {
            let (cx, cy) = boxes[i].center();
            if k == 0 {
                cx
            } else {
                cy
            }
        })
    };
    centroid_association(&to_points(observed), &to_points(predicted), threshold)
}
