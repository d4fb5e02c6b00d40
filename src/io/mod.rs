//! MOTChallenge file loading.
//!
//! Reads sequence metadata and annotation files into [`Sequence`](crate::Sequence)
//! values, and writes sequences back out:
//!
//! - `InformationFile` - Parse seqinfo.ini metadata files
//! - `AnnotationFile` - Parse `frame,id,left,top,w,h,conf` annotation files
//! - `write_sequence` / `save_sequence` - Write a sequence in the same format

mod annotation_file;
mod information_file;

pub use annotation_file::{save_sequence, write_sequence, AnnotationFile, AnnotationRecord};
pub use information_file::InformationFile;
