//! # trackeval-rs - Detection and Tracking Evaluation
//!
//! Evaluates multi-object detection/tracking output against ground-truth
//! annotations. Both sides are sequences of frames holding identity-tagged
//! bounding boxes.
//!
//! ## Features
//!
//! - Box geometry: left/top/width/height <-> corner conversions, IoU matrices
//! - Per-frame association by thresholded IoU and mutual non-maximum suppression
//! - Centroid-distance association for point-like data
//! - Per-identity coverage timelines and MT/PT/ML classification
//! - MOTChallenge `seqinfo.ini` and annotation file loading
//!
//! ## Example
//!
//! ```rust,ignore
//! use trackeval_rs::{evaluate, BoundingBox, EvaluationConfig, Sequence};
//!
//! let mut ground_truth = Sequence::with_frames(1);
//! ground_truth.create_instance(0, 1, BoundingBox::new(0.0, 0.0, 10.0, 10.0), None)?;
//!
//! let mut detections = Sequence::with_frames(1);
//! detections.create_instance(0, -1, BoundingBox::new(0.0, 0.0, 10.0, 10.0), Some(0.9))?;
//!
//! let evaluation = evaluate(&ground_truth, &detections, EvaluationConfig::default())?;
//! println!("{}", evaluation.report());
//! ```
//!
//! Association is a deterministic greedy approximation of bipartite
//! matching, not a globally optimal assignment.

// Public modules
pub mod geometry;
pub mod sequence;
pub mod association;
pub mod evaluation;
pub mod io;

// Re-exports for convenience
pub use geometry::{BoundingBox, Rect};
pub use sequence::{identity_color, Color, Frame, Instance, Sequence, SequenceInfo, NO_IDENTITY};
pub use association::{
    associate, associate_frame, associate_frames, matched_detections, Association,
    CentroidMatches, MatchDirection,
};
pub use evaluation::{
    evaluate, CoverageRecord, Evaluation, EvaluationConfig, Evaluator, MetricsReport, TrackClass,
};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur while loading or evaluating sequences
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Frame count mismatch: ground truth has {ground_truth} frames, detections have {detections}")]
        FrameCountMismatch { ground_truth: usize, detections: usize },

        #[error("Ground truth instance without identity in frame {frame}")]
        MissingIdentity { frame: usize },

        #[error("Identity {identity} appears more than once in ground truth frame {frame}")]
        DuplicateIdentity { identity: i32, frame: usize },

        #[error("Frame {frame} is out of range for a sequence of {num_frames} frames")]
        FrameOutOfRange { frame: usize, num_frames: usize },

        #[error("Frames must be processed in order: expected frame {expected}, got {got}")]
        FrameOutOfOrder { expected: usize, got: usize },

        #[error("Association for frame {frame} is {got_rows}x{got_cols}, expected {expected_rows}x{expected_cols}")]
        AssociationShape {
            frame: usize,
            expected_rows: usize,
            expected_cols: usize,
            got_rows: usize,
            got_cols: usize,
        },

        #[error("Association for frame {frame} is invalid at ground truth row {row}: {reason}")]
        InvalidAssociation {
            frame: usize,
            row: usize,
            reason: String,
        },

        #[error("Coverage slot for identity {identity} at frame {frame} already written")]
        CoverageOverwrite { identity: i32, frame: usize },

        #[error("Parse error: {0}")]
        Parse(String),

        #[error("Serialization error: {0}")]
        Serialization(#[from] serde_json::Error),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),
    }

    /// Result type for trackeval operations
    pub type Result<T> = std::result::Result<T, Error>;
}
