//! The gold-layer batch job for SEC financial statement data.
//!
//! Reads the Silver extracts, maintains the dimension tables incrementally
//! (with SCD2 history for companies), and rebuilds the fact table in
//! committed chunks through any [`filings_core::store::Warehouse`].

pub mod error;
pub mod pipeline;
pub mod settings;

pub use error::{Error, Result, Stage};
pub use pipeline::{DimensionSummary, FactSummary, RunSummary, run, run_dimensions};
pub use settings::EtlConfig;
