//! # tm-cache
//!
//! Persistent per-publication text cache.
//!
//! Each publication is one JSON file under the cache root holding the
//! fetched sections, a completeness tier, and the fetch time. Writes go to
//! a temporary file in the same directory and are renamed into place, so a
//! crash mid-write never leaves a half-written entry. Upgrades merge: a
//! `full` write after `minimal` adds sections, and a `minimal` write after
//! `full` drops nothing.

mod entry;
mod error;
mod store;

pub use entry::CacheEntry;
pub use error::CacheError;
pub use store::{CacheStats, TextCacheStore, sanitize_key};
