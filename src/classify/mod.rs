//! Classification module for fetched pages
//!
//! This module turns page text into titled, described and tagged pages:
//! - The closed tag vocabulary and its bucket order
//! - The structured-output schema descriptor
//! - The generation service abstraction and its HTTP client
//! - The per-page classifier

mod classifier;
mod generation;
mod schema;
mod tags;

pub use classifier::{
    build_prompt, page_schema, truncate_chars, ClassifiedPage, Classifier, ClassifyOutcome,
};
pub use generation::{GenerationError, GenerationRequest, GenerationService, OpenAiClient};
pub use schema::{FieldKind, FieldSpec, OutputSchema, SchemaError};
pub use tags::{Tag, UnknownTag, BUCKET_ORDER};
