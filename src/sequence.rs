//! Sequence, frame and instance containers.
//!
//! A [`Sequence`] owns its frames in order; each [`Frame`] owns its
//! instances in insertion order. Instances are immutable once created.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::geometry::{box_to_rect, BoundingBox, Rect};
use crate::{Error, Result};

/// Identity value meaning "no identity assigned".
pub const NO_IDENTITY: i32 = -1;

/// RGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };
}

/// Deterministic display color for an identity.
///
/// Unassigned identities are white; every other identity seeds a generator
/// so the same identity always renders in the same color.
pub fn identity_color(identity: i32) -> Color {
    if identity == NO_IDENTITY {
        return Color::WHITE;
    }

    let mut rng = StdRng::seed_from_u64(identity as u64);
    Color {
        r: rng.gen_range(0..255),
        g: rng.gen_range(0..255),
        b: rng.gen_range(0..255),
    }
}

/// Sequence metadata, as found in a MOTChallenge `seqinfo.ini`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SequenceInfo {
    pub name: String,
    pub frame_rate: Option<f64>,
    pub frame_count: usize,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub image_dir: Option<String>,
    pub image_ext: Option<String>,
}

impl SequenceInfo {
    /// Info with only a frame count set.
    pub fn with_frame_count(frame_count: usize) -> Self {
        Self {
            frame_count,
            ..Self::default()
        }
    }
}

/// A single object observation in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub(crate) identity: i32,
    pub(crate) frame: usize,
    pub(crate) bbox: BoundingBox,
    pub(crate) confidence: Option<f64>,
}

impl Instance {
    pub fn new(identity: i32, frame: usize, bbox: BoundingBox, confidence: Option<f64>) -> Self {
        Self {
            identity,
            frame,
            bbox,
            confidence,
        }
    }

    /// Identity, or [`NO_IDENTITY`].
    pub fn identity(&self) -> i32 {
        self.identity
    }

    pub fn has_identity(&self) -> bool {
        self.identity != NO_IDENTITY
    }

    /// Index of the owning frame.
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn rect(&self) -> Rect {
        box_to_rect(&self.bbox)
    }

    pub fn centroid(&self) -> (f64, f64) {
        self.bbox.center()
    }

    /// Detection confidence, `None` when unknown.
    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn color(&self) -> Color {
        identity_color(self.identity)
    }
}

/// One time step of a sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    index: usize,
    instances: Vec<Instance>,
}

impl Frame {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            instances: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Append an instance. Its frame index is rewritten to this frame's.
    pub fn add_instance(&mut self, mut instance: Instance) {
        instance.frame = self.index;
        self.instances.push(instance);
    }

    pub fn create_instance(&mut self, identity: i32, bbox: BoundingBox, confidence: Option<f64>) {
        self.instances
            .push(Instance::new(identity, self.index, bbox, confidence));
    }

    pub fn ids(&self) -> Vec<i32> {
        self.instances.iter().map(|i| i.identity).collect()
    }

    pub fn boxes(&self) -> Vec<BoundingBox> {
        self.instances.iter().map(|i| i.bbox).collect()
    }

    pub fn rects(&self) -> Vec<Rect> {
        self.instances.iter().map(Instance::rect).collect()
    }

    pub fn confidences(&self) -> Vec<Option<f64>> {
        self.instances.iter().map(|i| i.confidence).collect()
    }
}

/// An ordered list of frames plus metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    info: SequenceInfo,
    frames: Vec<Frame>,
}

impl Sequence {
    /// Allocate `info.frame_count` empty frames.
    pub fn new(info: SequenceInfo) -> Self {
        let frames = (0..info.frame_count).map(Frame::new).collect();
        Self { info, frames }
    }

    /// Allocate `n` empty frames with otherwise default metadata.
    pub fn with_frames(n: usize) -> Self {
        Self::new(SequenceInfo::with_frame_count(n))
    }

    pub fn info(&self) -> &SequenceInfo {
        &self.info
    }

    /// Append an empty frame and return its index.
    pub fn push_frame(&mut self) -> usize {
        let index = self.frames.len();
        self.frames.push(Frame::new(index));
        self.info.frame_count = self.frames.len();
        index
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    fn checked_frame_mut(&mut self, index: usize) -> Result<&mut Frame> {
        let num_frames = self.frames.len();
        self.frames.get_mut(index).ok_or(Error::FrameOutOfRange {
            frame: index,
            num_frames,
        })
    }

    /// Append an existing instance to frame `index`.
    pub fn add_instance(&mut self, index: usize, instance: Instance) -> Result<()> {
        self.checked_frame_mut(index)?.add_instance(instance);
        Ok(())
    }

    pub fn create_instance(
        &mut self,
        index: usize,
        identity: i32,
        bbox: BoundingBox,
        confidence: Option<f64>,
    ) -> Result<()> {
        self.checked_frame_mut(index)?
            .create_instance(identity, bbox, confidence);
        Ok(())
    }

    /// All instances, frame by frame.
    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.frames.iter().flat_map(|f| f.instances.iter())
    }

    /// All instances carrying `identity`, in frame order.
    pub fn instances_of(&self, identity: i32) -> impl Iterator<Item = &Instance> {
        self.instances().filter(move |i| i.identity == identity)
    }

    pub fn num_instances(&self) -> usize {
        self.frames.iter().map(Frame::len).sum()
    }

    pub fn num_instances_of(&self, identity: i32) -> usize {
        self.instances_of(identity).count()
    }

    /// Identity of every instance, in frame order (with repeats).
    pub fn ids(&self) -> Vec<i32> {
        self.instances().map(|i| i.identity).collect()
    }

    /// Distinct identities, ascending.
    pub fn unique_ids(&self) -> Vec<i32> {
        self.instances()
            .map(|i| i.identity)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn num_ids(&self) -> usize {
        self.unique_ids().len()
    }
}
