//! heartcheck-classifiers: training pipeline for the heart failure
//! `DEATH_EVENT` classifier.
//!
//! The crate loads a delimited clinical-records table, validates it against a
//! column schema, encodes features, fits an L2-regularized logistic
//! regression on a random train split and scores it on the held-out rows. The
//! run's hyper-parameters and accuracy go to a `tracking::RunContext`, the
//! fitted model to `outputs/model.json`.
//!
//! `pipeline::Pipeline` ties the modules together; the other modules are
//! usable on their own.
pub mod artifact;
pub mod config;
pub mod data_handling;
pub mod error;
pub mod io;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod schema;
pub mod tracking;
pub mod trainer;

pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineOutcome, Stage};
