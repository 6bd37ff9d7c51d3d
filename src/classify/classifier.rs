//! Per-page classification through the generation service
//!
//! This module handles:
//! - Deciding which fetched pages are worth classifying
//! - Building the prompt and the structured-output schema
//! - Retrying failed calls and degrading to an empty page afterwards
//! - Mapping the response onto a [`ClassifiedPage`]

use crate::classify::generation::{GenerationError, GenerationRequest, GenerationService};
use crate::classify::schema::{FieldSpec, OutputSchema, SchemaError};
use crate::classify::tags::Tag;
use crate::crawler::{PageResult, RetryPolicy};
use crate::url::ScopeFilter;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const SYSTEM_PROMPT: &str = "You document websites for language models. \
You read the visible text of one web page and describe it precisely. \
Respond only with the requested JSON object.";

/// A page after classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedPage {
    pub url: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<Tag>,
    pub markdown: String,
}

impl ClassifiedPage {
    /// A page that keeps only its URL
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Returns true if nothing but the URL is set
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.tags.is_empty()
            && self.markdown.is_empty()
    }
}

/// How a page left the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyOutcome {
    /// The service returned a usable classification
    Classified,

    /// The page was out of scope or its fetch produced nothing
    Skipped,

    /// Every attempt failed; the page was degraded to empty
    Failed,
}

/// Classifies fetched pages
pub struct Classifier {
    service: Arc<dyn GenerationService>,
    scope: ScopeFilter,
    instructions: String,
    max_input_chars: usize,
    retry: RetryPolicy,
    schema: OutputSchema,
}

impl Classifier {
    /// Creates a new classifier
    ///
    /// # Arguments
    ///
    /// * `service` - The generation service to call
    /// * `scope` - Pages outside this filter are never submitted
    /// * `instructions` - Caller guidance included in every prompt
    /// * `max_input_chars` - Page text is truncated to this many characters
    /// * `retry` - Retry policy for each call
    pub fn new(
        service: Arc<dyn GenerationService>,
        scope: ScopeFilter,
        instructions: String,
        max_input_chars: usize,
        retry: RetryPolicy,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            service,
            scope,
            instructions,
            max_input_chars,
            retry,
            schema: page_schema()?,
        })
    }

    /// Returns the output schema sent with every request
    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    /// Classifies a page; never fails outward
    pub async fn classify(&self, page: &PageResult, cancel: &CancellationToken) -> ClassifiedPage {
        self.classify_with_outcome(page, cancel).await.0
    }

    /// Classifies a page and reports how it went
    pub async fn classify_with_outcome(
        &self,
        page: &PageResult,
        cancel: &CancellationToken,
    ) -> (ClassifiedPage, ClassifyOutcome) {
        if !self.scope.includes(&page.url) {
            tracing::debug!("Skipping out-of-scope page {}", page.url);
            return (ClassifiedPage::empty(&page.url), ClassifyOutcome::Skipped);
        }
        if page.text.is_empty() {
            tracing::debug!("Skipping {}: nothing was fetched", page.url);
            return (ClassifiedPage::empty(&page.url), ClassifyOutcome::Skipped);
        }

        let text = truncate_chars(&page.text, self.max_input_chars);
        let request = GenerationRequest::structured(
            SYSTEM_PROMPT.to_string(),
            build_prompt(&self.instructions, &page.url, text),
            self.schema.clone(),
        );

        let request = &request;
        let service = &self.service;
        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            result = self.retry.run(&page.url, move |_| async move {
                if cancel.is_cancelled() {
                    return Err(GenerationError::Cancelled);
                }
                service.generate(request).await
            }) => result,
        };

        match outcome {
            Ok(value) => {
                let classified = from_response(&page.url, &value);
                tracing::debug!(
                    "Classified {} as {:?} ({})",
                    page.url,
                    classified.tags,
                    classified.title
                );
                (classified, ClassifyOutcome::Classified)
            }
            Err(GenerationError::Cancelled) => {
                (ClassifiedPage::empty(&page.url), ClassifyOutcome::Skipped)
            }
            Err(e) => {
                tracing::warn!("Classification of {} failed, keeping it empty: {}", page.url, e);
                (ClassifiedPage::empty(&page.url), ClassifyOutcome::Failed)
            }
        }
    }
}

/// The schema every classification response must match
pub fn page_schema() -> Result<OutputSchema, SchemaError> {
    OutputSchema::from_fields(
        "classified_page",
        vec![
            FieldSpec::text("title", "A 3 to 4 word title for the page"),
            FieldSpec::text(
                "description",
                "A 9 to 10 word description of what the page offers",
            ),
            FieldSpec::choices(
                "tags",
                "Every category the page belongs to",
                Tag::all().iter().map(Tag::as_str),
            ),
            FieldSpec::text(
                "markdown",
                "The page content rendered as markdown, at most about 3000 words",
            ),
        ],
    )
}

/// Builds the user prompt for one page
pub fn build_prompt(instructions: &str, url: &str, text: &str) -> String {
    let vocabulary = Tag::all()
        .iter()
        .map(Tag::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    if !instructions.trim().is_empty() {
        prompt.push_str("Instructions from the site owner:\n");
        prompt.push_str(instructions.trim());
        prompt.push_str("\n\n");
    }
    prompt.push_str(&format!("Page URL: {}\n\n", url));
    prompt.push_str("Return a JSON object with:\n");
    prompt.push_str("- title: a 3 to 4 word title\n");
    prompt.push_str("- description: a 9 to 10 word description\n");
    prompt.push_str(&format!(
        "- tags: every applicable category from [{}]\n",
        vocabulary
    ));
    prompt.push_str(
        "- markdown: the page content as markdown, at most about 3000 words, \
         leaving out navigation menus, footers, cookie banners and calls to action\n\n",
    );
    prompt.push_str("Page text:\n");
    prompt.push_str(text);
    prompt
}

/// Returns at most `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Maps a schema-checked response onto a page, dropping unknown tags
fn from_response(url: &str, value: &Value) -> ClassifiedPage {
    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let mut tags = Vec::new();
    for raw in value
        .get("tags")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
    {
        match raw.parse::<Tag>() {
            Ok(tag) if !tags.contains(&tag) => tags.push(tag),
            Ok(_) => {}
            Err(e) => tracing::debug!("Dropping tag for {}: {}", url, e),
        }
    }

    ClassifiedPage {
        url: url.to_string(),
        title: field("title"),
        description: field("description"),
        tags,
        markdown: field("markdown"),
    }
}
