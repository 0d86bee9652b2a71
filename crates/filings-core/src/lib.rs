//! Core types and the gold-layer transformation logic for the filings
//! warehouse.
//!
//! This crate is deliberately free of file and database dependencies. It
//! turns cleaned Silver-layer rows into dimension write plans and fact
//! records; reading the sources and persisting the results belong to
//! `filings-silver` and the [`store::Warehouse`] implementations.

pub mod dimension;
pub mod error;
pub mod fact;
pub mod keys;
pub mod resolve;
pub mod scd;
pub mod snapshot;
pub mod source;
pub mod store;

pub use error::{Error, Result};
