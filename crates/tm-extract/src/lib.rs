//! # tm-extract
//!
//! Turns publication text into tool candidates.
//!
//! - [`PatternSet`]: the versioned pattern artifact (known names, synonyms,
//!   alias rules, regex templates, established lists, provenance)
//! - [`Extractor`]: literal, fuzzy, alias, and template matching with
//!   canonicalization and deduplication
//! - [`ContextClassifier`]: development-versus-usage and established flags

pub mod classifier;
pub mod context;
mod error;
pub mod extractor;
pub mod fuzzy;
pub mod patterns;

pub use classifier::{Classification, ClassifierRule, ContextClassifier};
pub use error::ExtractError;
pub use extractor::{ExtractionReport, Extractor, dedup};
pub use patterns::{AliasRule, MergeOutcome, PatternProvenance, PatternSet, RegexTemplate, TypePatterns};
