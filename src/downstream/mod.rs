// src/downstream/mod.rs
mod address;
mod fetcher;

pub use address::DownstreamAddress;
pub use fetcher::{FetchOutcome, Fetcher, FALLBACK_TEXT};
