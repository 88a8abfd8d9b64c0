//! In-memory tabular dataset and train/test partitioning.
//!
//! `Dataset` keeps the loaded table exactly as read (header order, row order)
//! and is never mutated after load. `train_test_split` produces disjoint row
//! index sets that callers apply to the feature matrix and the label vector
//! alike, which keeps X and y aligned.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use statrs::statistics::{Data, OrderStatistics, Statistics};

use crate::error::{PipelineError, Result};

/// One scalar cell of the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Parse a raw delimited field. Empty fields and the usual NA spellings
    /// become `Missing`; anything that parses as a float becomes `Number`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed {
            "NA" | "NaN" | "nan" | "null" | "NULL" => return Cell::Missing,
            _ => {}
        }
        match trimmed.parse::<f64>() {
            Ok(v) => Cell::Number(v),
            Err(_) => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Missing => write!(f, "NA"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(PipelineError::SourceUnavailable(format!(
                    "Row {} has {} fields, header has {}",
                    idx + 1,
                    row.len(),
                    headers.len()
                )));
            }
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Consume the dataset, handing out its header and rows.
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.headers, self.rows)
    }

    /// Summary statistics for every column whose cells are all numbers.
    pub fn describe(&self) -> Vec<ColumnSummary> {
        let mut summaries = Vec::new();
        for (col, name) in self.headers.iter().enumerate() {
            let values: Option<Vec<f64>> = self.rows.iter().map(|row| row[col].as_f64()).collect();
            if let Some(values) = values {
                if let Some(summary) = ColumnSummary::from_values(name, values) {
                    summaries.push(summary);
                }
            }
        }
        summaries
    }

    pub fn log_input_data_summary(&self) {
        log::info!(
            "Loaded dataset with {} rows and {} columns",
            self.nrows(),
            self.ncols()
        );
        for summary in self.describe() {
            log::debug!("{}", summary);
        }
        for row in self.rows.iter().take(5) {
            let rendered: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            log::trace!("head: {}", rendered.join(", "));
        }
    }
}

/// Per-column descriptive statistics, the `describe()` view of a column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl ColumnSummary {
    fn from_values(name: &str, values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let mean = <_ as Statistics<f64>>::mean(values.iter());
        let std = if count > 1 {
            <_ as Statistics<f64>>::std_dev(values.iter())
        } else {
            0.0
        };
        let min = <_ as Statistics<f64>>::min(values.iter());
        let max = <_ as Statistics<f64>>::max(values.iter());

        let mut data = Data::new(values);
        Some(Self {
            name: name.to_string(),
            count,
            mean,
            std,
            min,
            q1: data.lower_quartile(),
            median: data.median(),
            q3: data.upper_quartile(),
            max,
        })
    }
}

impl std::fmt::Display for ColumnSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<26} count={} mean={:.3} std={:.3} min={:.3} 25%={:.3} 50%={:.3} 75%={:.3} max={:.3}",
            self.name,
            self.count,
            self.mean,
            self.std,
            self.min,
            self.q1,
            self.median,
            self.q3,
            self.max
        )
    }
}

/// Row indices of a train/test partition. Indices refer to the table the
/// split was computed for; train and test are disjoint and together cover
/// every row.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    pub fn len(&self) -> usize {
        self.train.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// RNG for the shuffle. A fixed seed makes the split reproducible; without
/// one the generator is seeded from OS entropy.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Shuffle `0..n_rows` and cut off `ceil(n_rows * test_fraction)` rows for
/// the test set.
pub fn train_test_split<R: Rng + ?Sized>(
    n_rows: usize,
    test_fraction: f64,
    rng: &mut R,
) -> Result<TrainTestSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::Config(format!(
            "test_fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n_test = (n_rows as f64 * test_fraction).ceil() as usize;
    let n_train = n_rows.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(PipelineError::Training(format!(
            "Cannot split {} rows with test fraction {}: both subsets must be non-empty",
            n_rows, test_fraction
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(rng);

    let train = indices.split_off(n_test);
    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn cell_parsing() {
        assert_eq!(Cell::parse("1.5"), Cell::Number(1.5));
        assert_eq!(Cell::parse(" 7 "), Cell::Number(7.0));
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("NA"), Cell::Missing);
        assert_eq!(Cell::parse("male"), Cell::Text("male".to_string()));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec![Cell::Number(1.0)]];
        assert!(Dataset::new(headers, rows).is_err());
    }

    #[test]
    fn split_sizes_follow_ceil_rule() {
        let mut rng = make_rng(Some(42));
        let split = train_test_split(299, 0.2, &mut rng).unwrap();
        assert_eq!(split.test.len(), 60);
        assert_eq!(split.train.len(), 239);
    }

    #[test]
    fn split_is_a_partition() {
        let mut rng = make_rng(Some(3));
        let split = train_test_split(50, 0.2, &mut rng).unwrap();
        let train: HashSet<usize> = split.train.iter().copied().collect();
        let test: HashSet<usize> = split.test.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        let all: HashSet<usize> = train.union(&test).copied().collect();
        assert_eq!(all, (0..50).collect::<HashSet<usize>>());
    }

    #[test]
    fn same_seed_same_split() {
        let a = train_test_split(40, 0.2, &mut make_rng(Some(11))).unwrap();
        let b = train_test_split(40, 0.2, &mut make_rng(Some(11))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn too_few_rows_is_a_training_error() {
        let err = train_test_split(1, 0.2, &mut make_rng(Some(1))).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn describe_skips_text_columns() {
        let headers = vec!["x".to_string(), "s".to_string()];
        let rows = vec![
            vec![Cell::Number(1.0), Cell::Text("a".to_string())],
            vec![Cell::Number(3.0), Cell::Text("b".to_string())],
        ];
        let ds = Dataset::new(headers, rows).unwrap();
        let summary = ds.describe();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].name, "x");
        assert!((summary[0].mean - 2.0).abs() < 1e-12);
        assert_eq!(summary[0].min, 1.0);
        assert_eq!(summary[0].max, 3.0);
    }
}
