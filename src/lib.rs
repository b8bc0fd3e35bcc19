//! Equipment dataset ingestion with a rolling history and derived analytics.
//!
//! Uploads (delimited text with `Flowrate`, `Pressure`, `Temperature` and an
//! optional `Type` column) are parsed, reduced to a [`DatasetSummary`], and
//! retained in a bounded history. Health index, parameter similarity and a
//! synthetic trend are derived on demand from any retained summary.

pub mod analytics;
pub mod config;
pub mod data;
pub mod error;
pub mod history;
pub mod report;
pub mod rng;
pub mod state;

pub use data::model::{Cell, DatasetSummary, Parameter, RawTable, SummaryId, TypeDistribution};
pub use error::{IngestError, StoreError};
pub use state::{AppState, IngestOutcome};
