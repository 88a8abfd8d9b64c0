//! IO utilities for fetching the training table.

pub mod loader;

pub use loader::{load_dataset, read_delimited, DataSource};
