//! Document assembly
//!
//! This module builds the two output documents from classified pages:
//! - `full`: page blocks grouped into tag buckets in a fixed order
//! - `summary`: one index line per titled page, in discovery order
//!
//! It also runs the optional editorial rewrite of the summary and checks
//! that the rewrite left every URL untouched.

use crate::classify::{
    ClassifiedPage, GenerationError, GenerationRequest, GenerationService, Tag, BUCKET_ORDER,
};
use crate::crawler::RetryPolicy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Matches absolute http(s) URLs in markdown text
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s()<>\[\]"'`]+"#).expect("URL regex")
});

const REWRITE_SYSTEM_PROMPT: &str = "You are an editor improving a markdown index of a website. \
You may reorder entries, group them under headings and add a short introduction. \
You must not add, remove or alter any URL: every URL in the input must appear \
character for character in your output, and no other URL may appear. \
Respond with the markdown only.";

/// Errors that make assembly unusable
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Summary rewrite altered URLs (missing: {missing:?}, added: {added:?})")]
    UrlsChanged {
        missing: Vec<String>,
        added: Vec<String>,
    },

    #[error("Failed to export document: {0}")]
    Export(#[from] std::io::Error),
}

/// The two documents produced for a site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputDocument {
    /// Condensed index, one line per page
    pub summary: String,

    /// Full concatenation of page markdown grouped by tag
    pub full: String,
}

/// Assembles the output documents from classified pages in discovery order
///
/// Pages appear in the full document once per tag they carry, so a page
/// tagged both `services` and `blog` is written twice. Pages without a
/// title get no summary line.
pub fn assemble(pages: &[ClassifiedPage]) -> OutputDocument {
    let mut blocks = Vec::new();
    for bucket in BUCKET_ORDER {
        for page in pages.iter().filter(|page| page.tags.contains(&bucket)) {
            blocks.push(page_block(page));
        }
    }

    let repeated = pages.iter().filter(|page| page.tags.len() > 1).count();
    if repeated > 0 {
        tracing::debug!(
            "{} multi-tag pages appear in more than one bucket of the full document",
            repeated
        );
    }

    let summary = pages
        .iter()
        .filter(|page| !page.title.is_empty())
        .map(summary_line)
        .collect::<Vec<_>>()
        .join("\n");

    OutputDocument {
        summary,
        full: blocks.join("\n\n"),
    }
}

/// Distinct tags present across pages, in bucket order
pub fn item_tags(pages: &[ClassifiedPage]) -> Vec<Tag> {
    BUCKET_ORDER
        .into_iter()
        .filter(|tag| pages.iter().any(|page| page.tags.contains(tag)))
        .collect()
}

fn page_block(page: &ClassifiedPage) -> String {
    format!(
        "<!-- source: {} -->\n# {}\n\n{}",
        page.url, page.title, page.markdown
    )
}

fn summary_line(page: &ClassifiedPage) -> String {
    format!("- [{}]({}): {}", page.title, page.url, page.description)
}

/// Every distinct URL in `text`
pub fn extract_urls(text: &str) -> BTreeSet<String> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':']).to_string())
        .collect()
}

/// Checks that `rewritten` mentions exactly the URLs of `original`
pub fn verify_urls_preserved(original: &str, rewritten: &str) -> Result<(), AssemblyError> {
    let before = extract_urls(original);
    let after = extract_urls(rewritten);
    if before == after {
        return Ok(());
    }

    Err(AssemblyError::UrlsChanged {
        missing: before.difference(&after).cloned().collect(),
        added: after.difference(&before).cloned().collect(),
    })
}

/// Runs the editorial rewrite over a summary index
pub struct SummaryRewriter {
    service: Arc<dyn GenerationService>,
    retry: RetryPolicy,
}

impl SummaryRewriter {
    /// Creates a new rewriter
    pub fn new(service: Arc<dyn GenerationService>, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    /// Rewrites `summary` for the site at `site_url`
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The rewritten summary, or the original one if the
    ///   generation call failed or was cancelled
    /// * `Err(AssemblyError::UrlsChanged)` - The rewrite altered a URL
    pub async fn rewrite(
        &self,
        summary: &str,
        site_url: &str,
        instructions: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AssemblyError> {
        if summary.trim().is_empty() {
            return Ok(summary.to_string());
        }

        let request = GenerationRequest::text(
            REWRITE_SYSTEM_PROMPT.to_string(),
            rewrite_prompt(summary, site_url, instructions),
        );
        let request = &request;
        let service = &self.service;

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            result = self.retry.run("summary rewrite", move |_| async move {
                service.generate(request).await
            }) => result,
        };

        let rewritten = match outcome {
            Ok(value) => match value.as_str() {
                Some(text) if !text.trim().is_empty() => text.trim().to_string(),
                _ => {
                    tracing::warn!("Summary rewrite returned no text, keeping the original");
                    return Ok(summary.to_string());
                }
            },
            Err(e) => {
                tracing::warn!("Summary rewrite failed, keeping the original: {}", e);
                return Ok(summary.to_string());
            }
        };

        verify_urls_preserved(summary, &rewritten)?;
        tracing::info!(
            "Summary rewritten ({} -> {} chars)",
            summary.len(),
            rewritten.len()
        );
        Ok(rewritten)
    }
}

fn rewrite_prompt(summary: &str, site_url: &str, instructions: &str) -> String {
    let mut prompt = format!("Website: {}\n\n", site_url);
    if !instructions.trim().is_empty() {
        prompt.push_str("Instructions from the site owner:\n");
        prompt.push_str(instructions.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str(
        "Improve the following index. Do not change, add or remove any URL.\n\n",
    );
    prompt.push_str(summary);
    prompt
}
