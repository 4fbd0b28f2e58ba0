//! # tm-schema
//!
//! JSON Schema registry and defensive parsing for reviewer documents.
//!
//! Document types are defined in `tm-core` with `#[derive(JsonSchema)]`.
//! This crate builds their schemas, embeds them in reviewer requests,
//! validates responses, and degrades malformed responses into typed
//! partial or unparseable outcomes instead of errors.

mod error;
pub mod parse;
pub mod registry;

pub use error::SchemaError;
pub use parse::{ParsedList, ParsedVerdicts, extract_json, parse_list_response, parse_verdict_response};
pub use registry::SchemaRegistry;
