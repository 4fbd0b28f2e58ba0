//! # tm-clients
//!
//! External collaborators of the pipeline, each behind a small interface:
//!
//! - [`ReviewService`]: the AI classification/validation service, with an
//!   Anthropic-style Messages client and a retrying wrapper
//! - [`FullTextSource`]: per-publication section text from a directory of
//!   JSON files or an HTTP endpoint
//! - [`read_index`]: the JSON Lines publication index
//!
//! Every call returns `Result<_, ClientError>`; [`with_retry`] is the one
//! place transient failures are retried.

mod error;
pub mod fulltext;
mod http;
pub mod index;
pub mod retry;
pub mod review;

pub use error::ClientError;
pub use fulltext::{DirectorySource, FullTextSource, HttpSource, NoFullText, SectionMap, fulltext_source_from_config};
pub use index::{IndexSummary, read_index, write_index};
pub use retry::{RetryPolicy, with_retry};
pub use review::{
    AnthropicClient, RetryingReviewService, ReviewRequest, ReviewService, ReviewTask, review_service_from_config,
};
