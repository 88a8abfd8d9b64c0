//! Explicit column roles for the training table.
//!
//! A `Schema` names the label column and, optionally, every feature column
//! with its kind. Numeric features are used as-is; categorical features are
//! one-hot encoded by `preprocessing::FeatureEncoder` before fitting. An empty
//! feature list means "every non-label column is a numeric feature".
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const DEATH_EVENT: &str = "DEATH_EVENT";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Numeric,
    Categorical,
}

impl FromStr for FeatureKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "numeric" | "number" => Ok(FeatureKind::Numeric),
            "categorical" | "category" => Ok(FeatureKind::Categorical),
            _ => Err(format!(
                "Unknown feature kind: {}. Valid options are: numeric, categorical",
                s
            )),
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Numeric => write!(f, "numeric"),
            FeatureKind::Categorical => write!(f, "categorical"),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureSpec {
    pub fn numeric(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Numeric,
        }
    }

    pub fn categorical(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FeatureKind::Categorical,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Schema {
    /// Binary 0/1 label column.
    pub label: String,
    /// Declared feature columns, in matrix order.
    pub features: Vec<FeatureSpec>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            label: DEATH_EVENT.to_string(),
            features: Vec::new(),
        }
    }
}

impl Schema {
    /// Label-only schema: every other column becomes a numeric feature.
    pub fn inferred(label: &str) -> Self {
        Self {
            label: label.to_string(),
            features: Vec::new(),
        }
    }

    /// The UCI heart failure clinical records layout. The binary clinical
    /// flags are already 0/1 so every feature is numeric.
    pub fn heart_failure() -> Self {
        let features = [
            "age",
            "anaemia",
            "creatinine_phosphokinase",
            "diabetes",
            "ejection_fraction",
            "high_blood_pressure",
            "platelets",
            "serum_creatinine",
            "serum_sodium",
            "sex",
            "smoking",
            "time",
        ]
        .iter()
        .map(|name| FeatureSpec::numeric(name))
        .collect();

        Self {
            label: DEATH_EVENT.to_string(),
            features,
        }
    }

    /// Check the declaration itself: non-empty label, no duplicate feature,
    /// label not declared as a feature.
    pub fn validate_declaration(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(PipelineError::Config("schema label column is empty".to_string()));
        }
        let mut seen = HashSet::new();
        for spec in &self.features {
            if spec.name == self.label {
                return Err(PipelineError::Config(format!(
                    "label column '{}' is also declared as a feature",
                    spec.name
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(PipelineError::Config(format!(
                    "feature '{}' is declared more than once",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Check that every declared column exists in the loaded header.
    pub fn validate_header(&self, headers: &[String]) -> Result<()> {
        let present: HashSet<&str> = headers.iter().map(|h| h.as_str()).collect();
        if !present.contains(self.label.as_str()) {
            return Err(PipelineError::Schema(format!(
                "Missing label column '{}'",
                self.label
            )));
        }
        let missing: Vec<&str> = self
            .features
            .iter()
            .map(|spec| spec.name.as_str())
            .filter(|name| !present.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Schema(format!(
                "Missing feature column(s): {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Feature columns for a table with the given header, in matrix order.
    /// Undeclared columns are dropped when features are declared explicitly.
    pub fn resolve_features(&self, headers: &[String]) -> Vec<FeatureSpec> {
        if self.features.is_empty() {
            return headers
                .iter()
                .filter(|h| **h != self.label)
                .map(|h| FeatureSpec::numeric(h))
                .collect();
        }

        let dropped: Vec<&str> = headers
            .iter()
            .map(|h| h.as_str())
            .filter(|h| *h != self.label && !self.features.iter().any(|f| f.name == *h))
            .collect();
        if !dropped.is_empty() {
            log::debug!("Ignoring undeclared column(s): {}", dropped.join(", "));
        }
        self.features.clone()
    }
}
