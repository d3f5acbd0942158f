//! Extraction of raw user, post, and comment records from the upstream REST
//! API.
//!
//! [`Extractor`] is the seam the pipeline depends on; [`PlaceholderClient`]
//! is the HTTP implementation, retrying transient failures with
//! exponential back-off.

pub mod client;
pub mod error;
pub mod extractor;
pub(crate) mod retry;
pub mod types;

pub use client::{ExtractConfig, PlaceholderClient};
pub use error::ExtractError;
pub use extractor::Extractor;
pub use types::{RawRecord, RawSnapshot, Resource};
