//! Label extraction and feature encoding.
//!
//! `split_label` separates the target column from the table without touching
//! row order or count. `FeatureEncoder` turns the remaining cells into a dense
//! `f64` matrix: numeric columns are copied, categorical columns are one-hot
//! encoded. Malformed cells surface here as `TrainingError`s so that nothing
//! non-numeric ever reaches the optimizer.
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::data_handling::{Cell, Dataset};
use crate::error::{PipelineError, Result};
use crate::schema::{FeatureKind, FeatureSpec};

/// The dataset with its label column removed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl FeatureTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Binary labels (0/1), row-aligned with the `FeatureTable`.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVector {
    pub name: String,
    pub values: Vec<u8>,
}

impl LabelVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn select(&self, indices: &[usize]) -> Vec<u8> {
        indices.iter().map(|&i| self.values[i]).collect()
    }

    pub fn count_positive(&self) -> usize {
        self.values.iter().filter(|&&v| v == 1).count()
    }
}

/// Remove `target` from the dataset and return the remaining table plus the
/// label vector.
pub fn split_label(dataset: Dataset, target: &str) -> Result<(FeatureTable, LabelVector)> {
    let label_idx = dataset.column_index(target).ok_or_else(|| {
        PipelineError::Schema(format!("Missing target column '{}'", target))
    })?;

    let (mut columns, rows) = dataset.into_parts();
    columns.remove(label_idx);

    let mut labels = Vec::with_capacity(rows.len());
    let mut features = Vec::with_capacity(rows.len());
    for (row_idx, mut row) in rows.into_iter().enumerate() {
        let cell = row.remove(label_idx);
        let label = match cell {
            Cell::Number(v) if v == 0.0 => 0u8,
            Cell::Number(v) if v == 1.0 => 1u8,
            other => {
                return Err(PipelineError::Training(format!(
                    "Label '{}' at row {} must be 0 or 1, got '{}'",
                    target,
                    row_idx + 1,
                    other
                )))
            }
        };
        labels.push(label);
        features.push(row);
    }

    log::debug!(
        "Separated label '{}' from {} feature columns over {} rows",
        target,
        columns.len(),
        features.len()
    );

    Ok((
        FeatureTable {
            columns,
            rows: features,
        },
        LabelVector {
            name: target.to_string(),
            values: labels,
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EncodedColumn {
    name: String,
    kind: FeatureKind,
    /// Observed categories in first-seen order; empty for numeric columns.
    categories: Vec<String>,
}

impl EncodedColumn {
    fn width(&self) -> usize {
        match self.kind {
            FeatureKind::Numeric => 1,
            FeatureKind::Categorical => self.categories.len(),
        }
    }
}

/// Column-wise encoder from table cells to the model's numeric input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    columns: Vec<EncodedColumn>,
}

impl FeatureEncoder {
    /// Learn the encoding for `specs` from `table`. Categorical columns record
    /// every distinct value they contain.
    pub fn fit(table: &FeatureTable, specs: &[FeatureSpec]) -> Result<Self> {
        let mut columns = Vec::with_capacity(specs.len());
        for spec in specs {
            let col = table.column_index(&spec.name).ok_or_else(|| {
                PipelineError::Schema(format!("Missing feature column '{}'", spec.name))
            })?;

            let mut categories: Vec<String> = Vec::new();
            if spec.kind == FeatureKind::Categorical {
                for (row_idx, row) in table.rows().iter().enumerate() {
                    let key = category_key(&row[col], &spec.name, row_idx)?;
                    if !categories.contains(&key) {
                        categories.push(key);
                    }
                }
                log::debug!(
                    "Categorical feature '{}' has {} categories",
                    spec.name,
                    categories.len()
                );
            }

            columns.push(EncodedColumn {
                name: spec.name.clone(),
                kind: spec.kind,
                categories,
            });
        }

        if columns.iter().map(|c| c.width()).sum::<usize>() == 0 {
            return Err(PipelineError::Training(
                "No feature columns left after encoding".to_string(),
            ));
        }
        Ok(Self { columns })
    }

    /// Number of matrix columns produced.
    pub fn width(&self) -> usize {
        self.columns.iter().map(|c| c.width()).sum()
    }

    /// Matrix column names; one-hot columns are named `<column>=<category>`.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        for column in &self.columns {
            match column.kind {
                FeatureKind::Numeric => names.push(column.name.clone()),
                FeatureKind::Categorical => {
                    for category in &column.categories {
                        names.push(format!("{}={}", column.name, category));
                    }
                }
            }
        }
        names
    }

    /// Encode every row of `table`. Categories not seen during `fit` encode as
    /// all-zero indicators.
    pub fn transform(&self, table: &FeatureTable) -> Result<Array2<f64>> {
        let mut indices = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let idx = table.column_index(&column.name).ok_or_else(|| {
                PipelineError::Schema(format!("Missing feature column '{}'", column.name))
            })?;
            indices.push(idx);
        }

        let width = self.width();
        let mut data = Vec::with_capacity(table.nrows() * width);
        for (row_idx, row) in table.rows().iter().enumerate() {
            for (column, &idx) in self.columns.iter().zip(indices.iter()) {
                let cell = &row[idx];
                match column.kind {
                    FeatureKind::Numeric => data.push(numeric_value(cell, &column.name, row_idx)?),
                    FeatureKind::Categorical => {
                        let key = category_key(cell, &column.name, row_idx)?;
                        for category in &column.categories {
                            data.push(if *category == key { 1.0 } else { 0.0 });
                        }
                    }
                }
            }
        }

        Array2::from_shape_vec((table.nrows(), width), data)
            .map_err(|e| PipelineError::Training(format!("Failed to build feature matrix: {}", e)))
    }

    pub fn fit_transform(table: &FeatureTable, specs: &[FeatureSpec]) -> Result<(Self, Array2<f64>)> {
        let encoder = Self::fit(table, specs)?;
        let x = encoder.transform(table)?;
        Ok((encoder, x))
    }
}

fn numeric_value(cell: &Cell, column: &str, row_idx: usize) -> Result<f64> {
    match cell {
        Cell::Number(v) if v.is_finite() => Ok(*v),
        Cell::Number(v) => Err(PipelineError::Training(format!(
            "Non-finite value {} in feature '{}' at row {}",
            v,
            column,
            row_idx + 1
        ))),
        Cell::Text(s) => Err(PipelineError::Training(format!(
            "Non-numeric value '{}' in numeric feature '{}' at row {}",
            s,
            column,
            row_idx + 1
        ))),
        Cell::Missing => Err(PipelineError::Training(format!(
            "Missing value in feature '{}' at row {}",
            column,
            row_idx + 1
        ))),
    }
}

fn category_key(cell: &Cell, column: &str, row_idx: usize) -> Result<String> {
    match cell {
        Cell::Text(s) => Ok(s.clone()),
        Cell::Number(v) if v.is_finite() => Ok(v.to_string()),
        _ => Err(PipelineError::Training(format!(
            "Missing value in categorical feature '{}' at row {}",
            column,
            row_idx + 1
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_delimited;

    fn table(text: &str) -> Dataset {
        read_delimited(text.as_bytes(), b',').unwrap()
    }

    #[test]
    fn split_label_keeps_rows_and_order() {
        let ds = table("a,DEATH_EVENT,b\n1,0,2\n3,1,4\n5,0,6\n");
        let (x, y) = split_label(ds, "DEATH_EVENT").unwrap();
        assert_eq!(x.nrows(), 3);
        assert_eq!(x.columns(), &["a", "b"]);
        assert_eq!(x.rows()[1], vec![Cell::Number(3.0), Cell::Number(4.0)]);
        assert_eq!(y.values, vec![0, 1, 0]);
    }

    #[test]
    fn missing_target_is_schema_error() {
        let ds = table("a,b\n1,2\n");
        let err = split_label(ds, "DEATH_EVENT").unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn non_binary_label_is_training_error() {
        let ds = table("a,DEATH_EVENT\n1,2\n");
        let err = split_label(ds, "DEATH_EVENT").unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn one_hot_encodes_categorical_columns() {
        let ds = table("age,smoker,y\n50,yes,0\n60,no,1\n70,yes,1\n");
        let (x, _) = split_label(ds, "y").unwrap();
        let specs = vec![FeatureSpec::numeric("age"), FeatureSpec::categorical("smoker")];
        let (encoder, m) = FeatureEncoder::fit_transform(&x, &specs).unwrap();
        assert_eq!(encoder.feature_names(), vec!["age", "smoker=yes", "smoker=no"]);
        assert_eq!(m.shape(), &[3, 3]);
        assert_eq!(m.row(1).to_vec(), vec![60.0, 0.0, 1.0]);
    }

    #[test]
    fn text_in_numeric_column_is_training_error() {
        let ds = table("age,y\nold,0\n");
        let (x, _) = split_label(ds, "y").unwrap();
        let err = FeatureEncoder::fit_transform(&x, &[FeatureSpec::numeric("age")]).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn missing_numeric_value_is_training_error() {
        let ds = table("age,y\n,0\n");
        let (x, _) = split_label(ds, "y").unwrap();
        let err = FeatureEncoder::fit_transform(&x, &[FeatureSpec::numeric("age")]).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn unseen_category_encodes_as_zeros() {
        let train = table("c,y\na,0\nb,1\n");
        let (train_x, _) = split_label(train, "y").unwrap();
        let encoder = FeatureEncoder::fit(&train_x, &[FeatureSpec::categorical("c")]).unwrap();

        let other = table("c,y\nz,0\n");
        let (other_x, _) = split_label(other, "y").unwrap();
        let m = encoder.transform(&other_x).unwrap();
        assert_eq!(m.row(0).to_vec(), vec![0.0, 0.0]);
    }
}
