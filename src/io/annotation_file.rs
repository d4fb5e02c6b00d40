//! MOTChallenge annotation file reader and writer.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, warn};

use crate::geometry::BoundingBox;
use crate::sequence::{Sequence, SequenceInfo};
use crate::{Error, Result};

/// One parsed annotation line.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    /// Frame number, 1-based as in the file.
    pub frame: usize,
    pub identity: i32,
    pub bbox: BoundingBox,
    pub confidence: Option<f64>,
}

/// Parse an integer column, accepting integral floats such as `3.0`.
fn parse_integer(field: &str) -> Option<i64> {
    let field = field.trim();
    if let Ok(value) = field.parse::<i64>() {
        return Some(value);
    }
    let value: f64 = field.parse().ok()?;
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

impl AnnotationRecord {
    /// Parse `frame,id,bb_left,bb_top,bb_width,bb_height[,conf,...]`.
    ///
    /// Returns `None` for lines that don't describe a box. A confidence
    /// column that doesn't parse is kept as unknown.
    pub fn parse_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < 6 {
            return None;
        }

        let frame = usize::try_from(parse_integer(parts[0])?).ok()?;
        let identity = i32::try_from(parse_integer(parts[1])?).ok()?;

        let mut coords = [0.0; 4];
        for (coord, part) in coords.iter_mut().zip(&parts[2..6]) {
            *coord = part.trim().parse().ok()?;
        }

        let confidence = parts.get(6).and_then(|s| s.trim().parse().ok());

        Some(Self {
            frame,
            identity,
            bbox: BoundingBox::from_array(coords),
            confidence,
        })
    }
}

/// Parsed contents of a MOTChallenge annotation file.
///
/// Reads files in CSV format:
/// `frame,id,bb_left,bb_top,bb_width,bb_height,conf,x,y,z`
#[derive(Debug, Clone, Default)]
pub struct AnnotationFile {
    records: Vec<AnnotationRecord>,
}

impl AnnotationFile {
    /// Read and parse the given file path.
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let file = File::open(&file_path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to open annotation file '{}': {}",
                    file_path.as_ref().display(),
                    e
                ),
            ))
        })?;

        Self::from_reader(BufReader::new(file))
    }

    /// Parse from any buffered reader. Blank lines, `#` comments and
    /// malformed lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut records = Vec::new();

        for (number, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match AnnotationRecord::parse_line(trimmed) {
                Some(record) => records.push(record),
                None => warn!("skipping malformed annotation line {}: {:?}", number + 1, trimmed),
            }
        }

        debug!("parsed {} annotation records", records.len());
        Ok(Self { records })
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Highest frame number mentioned, 0 when empty.
    pub fn max_frame(&self) -> usize {
        self.records.iter().map(|r| r.frame).max().unwrap_or(0)
    }

    /// Build a sequence of `info.frame_count` frames.
    ///
    /// Records whose frame falls outside `[1, frame_count]` are skipped.
    pub fn to_sequence(&self, info: SequenceInfo) -> Sequence {
        let mut sequence = Sequence::new(info);
        let num_frames = sequence.num_frames();

        for record in &self.records {
            let frame = match record.frame.checked_sub(1) {
                Some(index) => sequence.frame_mut(index),
                None => None,
            };
            let Some(frame) = frame else {
                warn!(
                    "skipping annotation for frame {} outside 1..={}",
                    record.frame, num_frames
                );
                continue;
            };
            frame.create_instance(record.identity, record.bbox, record.confidence);
        }

        sequence
    }

    /// Build a sequence sized by the highest frame number in the file.
    pub fn to_sequence_inferred(&self) -> Sequence {
        self.to_sequence(SequenceInfo::with_frame_count(self.max_frame()))
    }
}

impl Sequence {
    /// Load an annotation file.
    ///
    /// With `info`, the sequence has `info.frame_count` frames; without it,
    /// the frame count is inferred from the file.
    pub fn from_file<P: AsRef<Path>>(path: P, info: Option<SequenceInfo>) -> Result<Self> {
        let file = AnnotationFile::new(path)?;
        Ok(match info {
            Some(info) => file.to_sequence(info),
            None => file.to_sequence_inferred(),
        })
    }
}

/// Write a sequence in MOTChallenge annotation format.
///
/// Frames are written 1-based; unknown confidence is written as `-1`.
pub fn write_sequence<W: Write>(sequence: &Sequence, writer: W) -> Result<()> {
    let mut writer = BufWriter::new(writer);

    for frame in sequence.frames() {
        for instance in frame.instances() {
            let bbox = instance.bounding_box();
            writeln!(
                writer,
                "{},{},{:.2},{:.2},{:.2},{:.2},{},-1,-1,-1",
                frame.index() + 1,
                instance.identity(),
                bbox.left,
                bbox.top,
                bbox.width,
                bbox.height,
                instance.confidence().unwrap_or(-1.0),
            )?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Write a sequence to `path`, creating parent directories as needed.
pub fn save_sequence<P: AsRef<Path>>(sequence: &Sequence, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    write_sequence(sequence, file)
}
