//! MOTChallenge seqinfo.ini parser.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::sequence::SequenceInfo;
use crate::{Error, Result};

/// Parser for MOTChallenge seqinfo.ini files.
///
/// These files contain metadata about video sequences in the format:
/// ```ini
/// [Sequence]
/// name=MOT17-02-FRCNN
/// imDir=img1
/// frameRate=30
/// seqLength=600
/// imWidth=1920
/// imHeight=1080
/// imExt=.jpg
/// ```
#[derive(Debug)]
pub struct InformationFile {
    path: String,
    entries: Vec<(String, String)>,
}

impl InformationFile {
    /// Read and parse the given file path.
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref().to_string_lossy().to_string();
        let file = File::open(&file_path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to open information file '{}': {}", path, e),
            ))
        })?;

        Self::from_reader(BufReader::new(file), path)
    }

    /// Parse from any buffered reader; `source` names it in error messages.
    pub fn from_reader<R: BufRead>(reader: R, source: impl Into<String>) -> Result<Self> {
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            // Section headers and lines without '=' carry no values
            if let Some((key, value)) = line.split_once('=') {
                entries.push((key.trim().to_string(), value.trim().to_string()));
            }
        }

        Ok(Self {
            path: source.into(),
            entries,
        })
    }

    /// Look up a key; the first occurrence wins.
    pub fn get(&self, variable_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == variable_name)
            .map(|(_, value)| value.as_str())
    }

    /// Look up a key that must be present.
    pub fn search(&self, variable_name: &str) -> Result<&str> {
        self.get(variable_name).ok_or_else(|| {
            Error::Parse(format!("couldn't find '{}' in {}", variable_name, self.path))
        })
    }

    /// Look up and parse a key that must be present.
    pub fn search_parsed<T: FromStr>(&self, variable_name: &str) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        let value = self.search(variable_name)?;
        value.parse().map_err(|e| {
            Error::Parse(format!(
                "value '{}' for '{}' in {} is invalid: {}",
                value, variable_name, self.path, e
            ))
        })
    }

    /// Look up and parse an optional key. Present but unparsable values are errors.
    pub fn get_parsed<T: FromStr>(&self, variable_name: &str) -> Result<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match self.get(variable_name) {
            Some(_) => self.search_parsed(variable_name).map(Some),
            None => Ok(None),
        }
    }

    /// Build a [`SequenceInfo`]. Only `seqLength` is required.
    pub fn sequence_info(&self) -> Result<SequenceInfo> {
        Ok(SequenceInfo {
            name: self.get("name").unwrap_or_default().to_string(),
            frame_rate: self.get_parsed("frameRate")?,
            frame_count: self.search_parsed("seqLength")?,
            image_width: self.get_parsed("imWidth")?,
            image_height: self.get_parsed("imHeight")?,
            image_dir: self.get("imDir").map(str::to_string),
            image_ext: self.get("imExt").map(str::to_string),
        })
    }
}

impl SequenceInfo {
    /// Load from a MOTChallenge seqinfo.ini file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        InformationFile::new(path)?.sequence_info()
    }
}
