//! Reader for the Silver layer's cleaned tabular extracts.
//!
//! The three small tables (submissions, tags, presentation links) are loaded
//! whole; the numeric-facts table is only ever streamed in bounded chunks.
//! The extracts are assumed clean and delimited with a known delimiter; no
//! sniffing or repair happens here.

mod reader;

pub mod error;

pub use error::{Error, Result};
pub use reader::{Dataset, NumChunks, SilverLayout};

#[cfg(test)]
mod tests;
