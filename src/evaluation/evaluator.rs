//! Frame-ordered accumulation of coverage timelines.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info};
use serde::Serialize;

use super::report::{rate, MetricsReport};
use super::{CoverageRecord, EvaluationConfig, TrackClass};
use crate::association::{associate_frame, associate_range, check_frame_counts, Association};
use crate::sequence::{Sequence, NO_IDENTITY};
use crate::{Error, Result};

/// Accumulates per-identity coverage over two aligned sequences.
///
/// Frames are consumed strictly in increasing order, either one at a time
/// with [`Evaluator::step`] / [`Evaluator::ingest`] or all at once with
/// [`Evaluator::run`]. [`Evaluator::finalize`] consumes the evaluator, so no
/// update can follow classification.
#[derive(Debug)]
pub struct Evaluator<'a> {
    ground_truth: &'a Sequence,
    detections: &'a Sequence,
    config: EvaluationConfig,
    coverage: BTreeMap<i32, CoverageRecord>,
    next_frame: usize,
}

impl<'a> Evaluator<'a> {
    /// Validate the inputs and allocate one absent-filled record per ground-truth identity.
    ///
    /// # Errors
    /// - [`Error::InvalidConfig`] for out-of-range thresholds
    /// - [`Error::FrameCountMismatch`] if the sequences differ in length
    /// - [`Error::MissingIdentity`] for a ground-truth instance with identity -1
    /// - [`Error::DuplicateIdentity`] if an identity occurs twice in one ground-truth frame
    pub fn new(
        ground_truth: &'a Sequence,
        detections: &'a Sequence,
        config: EvaluationConfig,
    ) -> Result<Self> {
        config.validate()?;
        check_frame_counts(ground_truth, detections)?;

        for frame in ground_truth.frames() {
            let mut seen = HashSet::new();
            for identity in frame.ids() {
                if identity == NO_IDENTITY {
                    return Err(Error::MissingIdentity {
                        frame: frame.index(),
                    });
                }
                if !seen.insert(identity) {
                    return Err(Error::DuplicateIdentity {
                        identity,
                        frame: frame.index(),
                    });
                }
            }
        }

        let num_frames = ground_truth.num_frames();
        let coverage: BTreeMap<i32, CoverageRecord> = ground_truth
            .unique_ids()
            .into_iter()
            .map(|id| (id, CoverageRecord::new(id, num_frames)))
            .collect();

        debug!(
            "evaluator ready: {} frames, {} identities, iou_threshold={}",
            num_frames,
            coverage.len(),
            config.iou_threshold
        );

        Ok(Self {
            ground_truth,
            detections,
            config,
            coverage,
            next_frame: 0,
        })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn num_frames(&self) -> usize {
        self.ground_truth.num_frames()
    }

    /// Number of frames consumed so far; also the index of the next frame.
    pub fn frames_processed(&self) -> usize {
        self.next_frame
    }

    pub fn is_complete(&self) -> bool {
        self.next_frame >= self.num_frames()
    }

    /// Current record for `identity`.
    pub fn coverage_of(&self, identity: i32) -> Option<&CoverageRecord> {
        self.coverage.get(&identity)
    }

    /// Associate and ingest the next frame. Returns its index, or `None` when done.
    pub fn step(&mut self) -> Result<Option<usize>> {
        if self.is_complete() {
            return Ok(None);
        }

        let frame = self.next_frame;
        let association = associate_frame(
            &self.ground_truth.frames()[frame],
            &self.detections.frames()[frame],
            self.config.iou_threshold,
        );
        self.ingest(frame, &association)?;
        Ok(Some(frame))
    }

    /// Record a precomputed association for `frame`.
    ///
    /// `frame` must be the next unprocessed frame and the association must
    /// have one row per ground-truth instance and one column per detection.
    /// Matched detections must be distinct and in range, with overlap in `(0, 1]`.
    pub fn ingest(&mut self, frame: usize, association: &Association) -> Result<()> {
        let ground_truth: &'a Sequence = self.ground_truth;
        let detections: &'a Sequence = self.detections;

        if frame >= ground_truth.num_frames() {
            return Err(Error::FrameOutOfRange {
                frame,
                num_frames: ground_truth.num_frames(),
            });
        }
        if frame != self.next_frame {
            return Err(Error::FrameOutOfOrder {
                expected: self.next_frame,
                got: frame,
            });
        }

        let gt_frame = &ground_truth.frames()[frame];
        let det_frame = &detections.frames()[frame];
        if association.len() != gt_frame.len() || association.num_detections() != det_frame.len() {
            return Err(Error::AssociationShape {
                frame,
                expected_rows: gt_frame.len(),
                expected_cols: det_frame.len(),
                got_rows: association.len(),
                got_cols: association.num_detections(),
            });
        }

        let mut claimed = vec![false; det_frame.len()];
        for (row, m) in association.iter() {
            let Some(m) = m else { continue };
            let reason = if m.detection >= det_frame.len() {
                format!(
                    "detection {} out of range for {} detections",
                    m.detection,
                    det_frame.len()
                )
            } else if claimed[m.detection] {
                format!("detection {} matched to more than one row", m.detection)
            } else if !(m.overlap > 0.0 && m.overlap <= 1.0) {
                format!("overlap {} outside (0, 1]", m.overlap)
            } else {
                claimed[m.detection] = true;
                continue;
            };
            return Err(Error::InvalidAssociation { frame, row, reason });
        }

        for (row, instance) in gt_frame.instances().iter().enumerate() {
            let value = association.get(row).map_or(0.0, |m| m.overlap);
            let record = self
                .coverage
                .get_mut(&instance.identity())
                .ok_or(Error::MissingIdentity { frame })?;
            record.record(frame, value)?;
        }

        self.next_frame += 1;
        Ok(())
    }

    /// Process every remaining frame.
    ///
    /// Associations are computed first (in parallel with the `parallel`
    /// feature), then folded into the timelines in frame order.
    pub fn run(&mut self) -> Result<()> {
        let start = self.next_frame;
        let associations = associate_range(
            self.ground_truth,
            self.detections,
            start..self.num_frames(),
            self.config.iou_threshold,
        );

        for (offset, association) in associations.iter().enumerate() {
            self.ingest(start + offset, association)?;
        }
        Ok(())
    }

    /// Classify every identity and compute the summary over the processed frames.
    ///
    /// Finalizing before the last frame is allowed; counts and
    /// classifications then cover frames `0..frames_processed()` only.
    pub fn finalize(self) -> Evaluation {
        let window = self.next_frame;
        let mut report = MetricsReport::default();
        let mut classes = BTreeMap::new();

        for (&identity, record) in &self.coverage {
            let Some(class) = record.classify(&self.config) else {
                debug!("identity {} never present in processed frames, excluded", identity);
                continue;
            };

            report.true_positives += record.true_positives();
            report.false_negatives += record.false_negatives();
            match class {
                TrackClass::MostlyTracked => report.mostly_tracked += 1,
                TrackClass::PartiallyTracked => report.partially_tracked += 1,
                TrackClass::MostlyLost => report.mostly_lost += 1,
            }
            classes.insert(identity, class);
        }

        report.detections = self.detections.frames()[..window].iter().map(|f| f.len()).sum();
        report.instances = self.ground_truth.frames()[..window].iter().map(|f| f.len()).sum();
        report.false_positives = report.detections.saturating_sub(report.true_positives);
        report.true_positive_rate = rate(report.true_positives, report.instances);
        report.false_negative_rate = rate(report.false_negatives, report.instances);

        if window < self.num_frames() {
            info!(
                "finalized after {} of {} frames; metrics cover that window only",
                window,
                self.num_frames()
            );
        }
        debug!(
            "MT={} PT={} ML={} TP={} FN={} FP={}",
            report.mostly_tracked,
            report.partially_tracked,
            report.mostly_lost,
            report.true_positives,
            report.false_negatives,
            report.false_positives
        );

        Evaluation {
            report,
            classes,
            coverage: self.coverage.into_values().collect(),
            frames_processed: window,
            num_frames: self.ground_truth.num_frames(),
        }
    }
}

/// Finalized result of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    report: MetricsReport,
    classes: BTreeMap<i32, TrackClass>,
    coverage: Vec<CoverageRecord>,
    frames_processed: usize,
    num_frames: usize,
}

impl Evaluation {
    pub fn report(&self) -> &MetricsReport {
        &self.report
    }

    /// Every ground-truth identity's timeline, ascending by identity.
    pub fn coverage(&self) -> &[CoverageRecord] {
        &self.coverage
    }

    pub fn coverage_of(&self, identity: i32) -> Option<&CoverageRecord> {
        self.coverage
            .binary_search_by_key(&identity, CoverageRecord::identity)
            .ok()
            .map(|idx| &self.coverage[idx])
    }

    /// `None` for unknown identities and for identities excluded as never present.
    pub fn classification_of(&self, identity: i32) -> Option<TrackClass> {
        self.classes.get(&identity).copied()
    }

    pub fn classifications(&self) -> &BTreeMap<i32, TrackClass> {
        &self.classes
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    /// Whether the evaluation stopped before the last frame.
    pub fn is_partial(&self) -> bool {
        self.frames_processed < self.num_frames
    }

    /// Coverage timelines and report as pretty JSON, for external renderers.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Evaluate `detections` against `ground_truth` over every frame.
pub fn evaluate(
    ground_truth: &Sequence,
    detections: &Sequence,
    config: EvaluationConfig,
) -> Result<Evaluation> {
    let mut evaluator = Evaluator::new(ground_truth, detections, config)?;
    evaluator.run()?;
    Ok(evaluator.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::Match;
    use crate::evaluation::ABSENT;
    use crate::geometry::BoundingBox;
    use approx::assert_relative_eq;

    fn square(left: f64) -> BoundingBox {
        BoundingBox::new(left, 0.0, 10.0, 10.0)
    }

    /// Identity 1 present in all 4 frames, matched in frames 0..3.
    /// Identity 2 present in frames 2..4, never matched.
    fn sample_sequences() -> (Sequence, Sequence) {
        let mut gt = Sequence::with_frames(4);
        let mut det = Sequence::with_frames(4);
        for frame in 0..4 {
            gt.create_instance(frame, 1, square(0.0), None).unwrap();
            if frame < 3 {
                det.create_instance(frame, -1, square(0.0), Some(0.9)).unwrap();
            }
            if frame >= 2 {
                gt.create_instance(frame, 2, square(100.0), None).unwrap();
            }
        }
        // A detection far from any ground truth
        det.create_instance(1, -1, square(300.0), Some(0.2)).unwrap();
        (gt, det)
    }

    #[test]
    fn test_new_rejects_frame_count_mismatch() {
        let gt = Sequence::with_frames(3);
        let det = Sequence::with_frames(2);
        assert!(matches!(
            Evaluator::new(&gt, &det, EvaluationConfig::default()),
            Err(Error::FrameCountMismatch { ground_truth: 3, detections: 2 })
        ));
    }

    #[test]
    fn test_new_rejects_missing_identity() {
        let mut gt = Sequence::with_frames(2);
        gt.create_instance(1, NO_IDENTITY, square(0.0), None).unwrap();
        let det = Sequence::with_frames(2);
        assert!(matches!(
            Evaluator::new(&gt, &det, EvaluationConfig::default()),
            Err(Error::MissingIdentity { frame: 1 })
        ));
    }

    #[test]
    fn test_new_rejects_duplicate_identity() {
        let mut gt = Sequence::with_frames(1);
        gt.create_instance(0, 5, square(0.0), None).unwrap();
        gt.create_instance(0, 5, square(50.0), None).unwrap();
        let det = Sequence::with_frames(1);
        assert!(matches!(
            Evaluator::new(&gt, &det, EvaluationConfig::default()),
            Err(Error::DuplicateIdentity { identity: 5, frame: 0 })
        ));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let gt = Sequence::with_frames(1);
        let det = Sequence::with_frames(1);
        assert!(matches!(
            Evaluator::new(&gt, &det, EvaluationConfig::new(2.0)),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_step_fills_coverage_in_order() {
        let (gt, det) = sample_sequences();
        let mut evaluator = Evaluator::new(&gt, &det, EvaluationConfig::default()).unwrap();

        assert_eq!(evaluator.step().unwrap(), Some(0));
        assert_eq!(evaluator.coverage_of(1).unwrap().slots(), &[1.0, -1.0, -1.0, -1.0]);
        assert_eq!(evaluator.coverage_of(2).unwrap().slots(), &[-1.0; 4]);

        while evaluator.step().unwrap().is_some() {}
        assert!(evaluator.is_complete());
        assert_eq!(evaluator.step().unwrap(), None);
        assert_eq!(evaluator.coverage_of(1).unwrap().slots(), &[1.0, 1.0, 1.0, 0.0]);
        assert_eq!(evaluator.coverage_of(2).unwrap().slots(), &[-1.0, -1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_finalize_report() {
        let (gt, det) = sample_sequences();
        let evaluation = evaluate(&gt, &det, EvaluationConfig::default()).unwrap();
        let report = evaluation.report();

        // Identity 1: 3/4 matched -> PT; identity 2: 0/2 -> ML
        assert_eq!(report.mostly_tracked, 0);
        assert_eq!(report.partially_tracked, 1);
        assert_eq!(report.mostly_lost, 1);
        assert_eq!(report.true_positives, 3);
        assert_eq!(report.false_negatives, 3);
        assert_eq!(report.detections, 4);
        assert_eq!(report.instances, 6);
        assert_eq!(report.false_positives, 1);
        assert_relative_eq!(report.true_positive_rate.unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(report.false_negative_rate.unwrap(), 0.5, epsilon = 1e-12);

        assert_eq!(evaluation.classification_of(1), Some(TrackClass::PartiallyTracked));
        assert_eq!(evaluation.classification_of(2), Some(TrackClass::MostlyLost));
        assert_eq!(evaluation.classification_of(3), None);
        assert!(!evaluation.is_partial());
    }

    #[test]
    fn test_ingest_rejects_out_of_order() {
        let (gt, det) = sample_sequences();
        let mut evaluator = Evaluator::new(&gt, &det, EvaluationConfig::default()).unwrap();
        let association = Association::unmatched(1, 1);

        assert!(matches!(
            evaluator.ingest(1, &association),
            Err(Error::FrameOutOfOrder { expected: 0, got: 1 })
        ));
        assert!(matches!(
            evaluator.ingest(9, &association),
            Err(Error::FrameOutOfRange { frame: 9, num_frames: 4 })
        ));

        evaluator.ingest(0, &association).unwrap();
        assert!(matches!(
            evaluator.ingest(0, &association),
            Err(Error::FrameOutOfOrder { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn test_ingest_rejects_wrong_shape() {
        let (gt, det) = sample_sequences();
        let mut evaluator = Evaluator::new(&gt, &det, EvaluationConfig::default()).unwrap();

        let result = evaluator.ingest(0, &Association::unmatched(2, 1));
        assert!(matches!(
            result,
            Err(Error::AssociationShape { frame: 0, expected_rows: 1, got_rows: 2, .. })
        ));
        assert_eq!(evaluator.frames_processed(), 0);
    }

    #[test]
    fn test_ingest_rejects_inconsistent_matches() {
        let (gt, det) = sample_sequences();
        let mut evaluator = Evaluator::new(&gt, &det, EvaluationConfig::default()).unwrap();
        evaluator.step().unwrap();
        evaluator.step().unwrap();

        // Frame 2 has two ground-truth rows and one detection
        let cases = [
            r#"{"rows":[{"detection":0,"overlap":0.9},{"detection":0,"overlap":0.5}],"num_detections":1}"#,
            r#"{"rows":[{"detection":7,"overlap":0.9},null],"num_detections":1}"#,
            r#"{"rows":[null,{"detection":0,"overlap":0.0}],"num_detections":1}"#,
            r#"{"rows":[{"detection":0,"overlap":1.5},null],"num_detections":1}"#,
        ];
        let expected_rows = [1, 0, 1, 0];

        for (json, expected_row) in cases.iter().zip(expected_rows) {
            let association: Association = serde_json::from_str(json).unwrap();
            let result = evaluator.ingest(2, &association);
            assert!(
                matches!(result, Err(Error::InvalidAssociation { frame: 2, row, .. }) if row == expected_row),
                "accepted {}",
                json
            );
        }

        assert_eq!(evaluator.frames_processed(), 2);
        assert_eq!(evaluator.coverage_of(1).unwrap().slots()[2], ABSENT);

        let valid: Association =
            serde_json::from_str(r#"{"rows":[{"detection":0,"overlap":1.0},null],"num_detections":1}"#)
                .unwrap();
        evaluator.ingest(2, &valid).unwrap();
        assert_eq!(evaluator.coverage_of(2).unwrap().slots()[2], 0.0);
    }

    #[test]
    fn test_ingest_precomputed_association() {
        let (gt, det) = sample_sequences();
        let mut evaluator = Evaluator::new(&gt, &det, EvaluationConfig::default()).unwrap();

        let association = crate::association::associate(
            &gt.frame(0).unwrap().rects(),
            &det.frame(0).unwrap().rects(),
            0.5,
        );
        assert_eq!(association.get(0), Some(Match { detection: 0, overlap: 1.0 }));
        evaluator.ingest(0, &association).unwrap();
        assert_eq!(evaluator.frames_processed(), 1);
    }

    #[test]
    fn test_partial_window() {
        let (gt, det) = sample_sequences();
        let mut evaluator = Evaluator::new(&gt, &det, EvaluationConfig::default()).unwrap();
        evaluator.step().unwrap();
        evaluator.step().unwrap();

        let evaluation = evaluator.finalize();
        let report = evaluation.report();

        assert!(evaluation.is_partial());
        assert_eq!(evaluation.frames_processed(), 2);
        // Identity 2 has not appeared yet and is excluded
        assert_eq!(evaluation.classification_of(2), None);
        assert_eq!(evaluation.classification_of(1), Some(TrackClass::MostlyTracked));
        assert_eq!(report.num_identities(), 1);
        assert_eq!(report.instances, 2);
        assert_eq!(report.detections, 3);
        assert_eq!(report.true_positives + report.false_negatives, report.instances);
        assert_eq!(report.false_positives, 1);
    }

    #[test]
    fn test_run_after_steps() {
        let (gt, det) = sample_sequences();
        let mut evaluator = Evaluator::new(&gt, &det, EvaluationConfig::default()).unwrap();
        evaluator.step().unwrap();
        evaluator.run().unwrap();
        let stepped = evaluator.finalize();

        let direct = evaluate(&gt, &det, EvaluationConfig::default()).unwrap();
        assert_eq!(stepped, direct);
    }

    #[test]
    fn test_empty_sequences() {
        let gt = Sequence::with_frames(3);
        let det = Sequence::with_frames(3);
        let evaluation = evaluate(&gt, &det, EvaluationConfig::default()).unwrap();
        let report = evaluation.report();

        assert_eq!(report.instances, 0);
        assert_eq!(report.true_positive_rate, None);
        assert_eq!(report.false_negative_rate, None);
        assert!(evaluation.coverage().is_empty());
    }

    #[test]
    fn test_detections_only() {
        let gt = Sequence::with_frames(2);
        let mut det = Sequence::with_frames(2);
        det.create_instance(0, -1, square(0.0), Some(0.5)).unwrap();
        det.create_instance(1, -1, square(0.0), Some(0.5)).unwrap();

        let report = evaluate(&gt, &det, EvaluationConfig::default())
            .unwrap()
            .report()
            .clone();
        assert_eq!(report.false_positives, 2);
        assert_eq!(report.true_positives, 0);
        assert_eq!(report.true_positive_rate, None);
    }

    #[test]
    fn test_coverage_of_lookup() {
        let (gt, det) = sample_sequences();
        let evaluation = evaluate(&gt, &det, EvaluationConfig::default()).unwrap();

        assert_eq!(evaluation.coverage().len(), 2);
        assert_eq!(evaluation.coverage_of(2).unwrap().identity(), 2);
        assert!(evaluation.coverage_of(7).is_none());
        assert!(evaluation.to_json().unwrap().contains("\"slots\""));
    }
}
