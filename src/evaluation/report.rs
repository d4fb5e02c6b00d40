//! Summary metrics report.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Summary metrics for one evaluated sequence (or window of frames).
///
/// Serializes with the conventional short keys (`MT`, `TPR`, ...). Rates
/// whose denominator is zero are `None` and serialize as `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Mostly tracked identities.
    #[serde(rename = "MT")]
    pub mostly_tracked: usize,
    /// Mostly lost identities.
    #[serde(rename = "ML")]
    pub mostly_lost: usize,
    /// Partially tracked identities.
    #[serde(rename = "PT")]
    pub partially_tracked: usize,
    #[serde(rename = "TP")]
    pub true_positives: usize,
    #[serde(rename = "FN")]
    pub false_negatives: usize,
    #[serde(rename = "FP")]
    pub false_positives: usize,
    /// Total detection instances.
    #[serde(rename = "Detections")]
    pub detections: usize,
    /// Total ground-truth instances.
    #[serde(rename = "Instances")]
    pub instances: usize,
    #[serde(rename = "TPR")]
    pub true_positive_rate: Option<f64>,
    #[serde(rename = "FNR")]
    pub false_negative_rate: Option<f64>,
}

/// `numerator / denominator`, or `None` for a zero denominator.
pub(crate) fn rate(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

impl MetricsReport {
    /// Named fields in report order. Undefined rates map to NaN.
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("MT", self.mostly_tracked as f64),
            ("ML", self.mostly_lost as f64),
            ("PT", self.partially_tracked as f64),
            ("TP", self.true_positives as f64),
            ("FN", self.false_negatives as f64),
            ("FP", self.false_positives as f64),
            ("Detections", self.detections as f64),
            ("Instances", self.instances as f64),
            ("TPR", self.true_positive_rate.unwrap_or(f64::NAN)),
            ("FNR", self.false_negative_rate.unwrap_or(f64::NAN)),
        ]
    }

    /// Number of identities that were classified.
    pub fn num_identities(&self) -> usize {
        self.mostly_tracked + self.partially_tracked + self.mostly_lost
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = [
            ("MT", self.mostly_tracked),
            ("ML", self.mostly_lost),
            ("PT", self.partially_tracked),
            ("TP", self.true_positives),
            ("FN", self.false_negatives),
            ("FP", self.false_positives),
            ("Detections", self.detections),
            ("Instances", self.instances),
        ];
        for (name, value) in counts {
            writeln!(f, "{}: {}", name, value)?;
        }

        for (name, value) in [
            ("TPR", self.true_positive_rate),
            ("FNR", self.false_negative_rate),
        ] {
            match value {
                Some(v) => writeln!(f, "{}: {:.4}", name, v)?,
                None => writeln!(f, "{}: undefined", name)?,
            }
        }
        Ok(())
    }
}
