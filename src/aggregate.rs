//! Derived statistics over the per-slab `age` values.
//!
//! memcached reports the age of the oldest item for every slab class in the
//! `stats items` output. These helpers summarise them into min, max, mean and
//! median so a single graph can show how long items survive across slabs.

use crate::value::StatValue;
use std::cmp::Ordering;

pub const AGE_MIN: &str = "age_min";
pub const AGE_MAX: &str = "age_max";
pub const AGE_MEAN: &str = "age_mean";
pub const AGE_MEDIAN: &str = "age_median";

/// Arithmetic mean of a series, `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of a series, `None` when empty.
///
/// Odd-length series yield the middle element; even-length series yield the
/// average of the two central elements.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Summary of slab ages for one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeSummary {
    pub min: StatValue,
    pub max: StatValue,
    pub mean: StatValue,
    pub median: StatValue,
    pub samples: usize,
}

impl Default for AgeSummary {
    fn default() -> Self {
        Self {
            min: StatValue::Int(0),
            max: StatValue::Int(0),
            mean: StatValue::Int(0),
            median: StatValue::Int(0),
            samples: 0,
        }
    }
}

impl AgeSummary {
    /// Summarises the numeric values in `ages`; text values are skipped.
    /// Returns the all-zero summary when no numeric age is present.
    pub fn from_values<'a, I>(ages: I) -> Self
    where
        I: IntoIterator<Item = &'a StatValue>,
    {
        let mut numeric: Vec<&StatValue> = ages.into_iter().filter(|v| v.is_numeric()).collect();
        if numeric.is_empty() {
            return Self::default();
        }

        numeric.sort_by(|a, b| a.cmp_numeric(b).unwrap_or(Ordering::Equal));
        let floats: Vec<f64> = numeric.iter().filter_map(|v| v.as_f64()).collect();

        let mid = numeric.len() / 2;
        let median = if numeric.len() % 2 == 1 {
            numeric[mid].clone()
        } else {
            StatValue::Float(median(&floats).unwrap_or(0.0))
        };

        Self {
            min: numeric[0].clone(),
            max: numeric[numeric.len() - 1].clone(),
            mean: StatValue::Float(mean(&floats).unwrap_or(0.0)),
            median,
            samples: numeric.len(),
        }
    }

    /// The four `age_*` cache entries.
    pub fn into_stats(self) -> [(String, StatValue); 4] {
        [
            (AGE_MIN.to_string(), self.min),
            (AGE_MAX.to_string(), self.max),
            (AGE_MEAN.to_string(), self.mean),
            (AGE_MEDIAN.to_string(), self.median),
        ]
    }
}
