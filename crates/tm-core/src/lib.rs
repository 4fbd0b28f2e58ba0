//! # tm-core
//!
//! Core types shared across all toolmine crates:
//! - Publication, cache, candidate, verdict, and observation records
//! - Fixed enumerations (tool types, sections, cache tiers, verdicts,
//!   observation categories) with stable string forms
//! - Reviewer request/response documents exchanged with the AI service
//! - Run bookkeeping (counts, deferred work)
//! - Cross-cutting error types

pub mod documents;
pub mod enums;
pub mod errors;
pub mod observation;
pub mod publication;
pub mod run;
pub mod tools;

pub use enums::{CacheTier, MatchKind, ObservationCategory, QueryOrigin, Section, ToolType, Verdict};
pub use errors::CoreError;
