//! Output module for assembling and exporting site documents
//!
//! This module handles:
//! - Grouping classified pages into the summary index and full document
//! - The editorial rewrite of the summary with URL preservation checks
//! - Exporting the documents as markdown files
//! - Recording job statistics

mod assembler;
mod markdown;
pub mod stats;

pub use assembler::{
    assemble, extract_urls, item_tags, verify_urls_preserved, AssemblyError, OutputDocument,
    SummaryRewriter,
};
pub use markdown::{export_documents, format_full_file, format_summary_file};
pub use stats::{print_statistics, JobStats};
