//! Pipeline coordinator - job orchestration logic
//!
//! This module runs one job from mapping to persistence:
//! - Seeding the primary frontier and fetching it
//! - Expanding to the secondary frontier and fetching it
//! - Classifying every fetched page
//! - Assembling, rewriting, exporting and persisting the documents
//!
//! Stages run strictly one after another. Cancellation is checked before
//! every stage and inside every batch.

use crate::classify::{ClassifiedPage, ClassifyOutcome};
use crate::crawler::{expand, Frontier, PageResult};
use crate::output::{assemble, export_documents, item_tags, JobStats, OutputDocument};
use crate::pipeline::context::AppContext;
use crate::state::{JobState, JobTracker};
use crate::storage::{ItemHandle, ItemStore, NewItem};
use crate::url::canonicalize;
use crate::ScrollError;
use std::path::Path;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A fatal job failure, naming the stage it happened in
#[derive(Debug, Error)]
#[error("Job failed during {stage}: {source}")]
pub struct JobError {
    pub stage: JobState,
    #[source]
    pub source: ScrollError,
}

impl JobError {
    /// Returns true if the job stopped because it was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, ScrollError::Cancelled)
    }
}

/// Everything a finished job produced
#[derive(Debug, Clone)]
pub struct JobReport {
    /// Handle of the persisted item
    pub item: ItemHandle,

    /// The assembled documents, as persisted
    pub document: OutputDocument,

    /// Diagnostics collected along the way
    pub stats: JobStats,
}

/// Walks the state machine and mirrors every move into the store
struct JobRun<'s, 'c> {
    tracker: JobTracker,
    store: &'s mut dyn ItemStore,
    job_id: i64,
    cancel: &'c CancellationToken,
}

impl JobRun<'_, '_> {
    fn stage(&self) -> JobState {
        self.tracker.state()
    }

    /// Moves to the next stage, unless the job was cancelled
    fn enter(&mut self, state: JobState) -> Result<(), JobError> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled());
        }
        self.move_to(state)?;
        tracing::info!("Stage: {}", state);
        Ok(())
    }

    fn move_to(&mut self, state: JobState) -> Result<(), JobError> {
        let stage = self.stage();
        self.tracker
            .transition(state)
            .map_err(|source| JobError { stage, source })?;

        if let Err(e) = self.store.update_job_state(self.job_id, state) {
            tracing::warn!("Failed to record job state {}: {}", state, e);
        }
        Ok(())
    }

    /// Fails the job at the current stage
    fn fail(&mut self, source: ScrollError) -> JobError {
        let stage = self.stage();
        tracing::error!("Job failed during {}: {}", stage, source);
        if let Err(e) = self.move_to(JobState::Failed) {
            return e;
        }
        JobError { stage, source }
    }

    /// Marks the job cancelled at the current stage
    fn cancelled(&mut self) -> JobError {
        let stage = self.stage();
        tracing::warn!("Job cancelled during {}", stage);
        if let Err(e) = self.move_to(JobState::Cancelled) {
            return e;
        }
        JobError {
            stage,
            source: ScrollError::Cancelled,
        }
    }
}

/// Runs one complete job
///
/// # Arguments
///
/// * `ctx` - The application context
/// * `store` - Persistence collaborator receiving the finished item
/// * `cancel` - Cancels the job at the next check point
///
/// # Returns
///
/// * `Ok(JobReport)` - The job persisted its item
/// * `Err(JobError)` - The job failed or was cancelled; `stage` names where
pub async fn run_job(
    ctx: &AppContext,
    store: &mut dyn ItemStore,
    cancel: &CancellationToken,
) -> Result<JobReport, JobError> {
    let started = Instant::now();
    let root = ctx.root().clone();
    let mut stats = JobStats::default();

    let job_id = store
        .start_job(root.as_str(), ctx.config_hash())
        .map_err(|e| JobError {
            stage: JobState::Pending,
            source: e.into(),
        })?;
    tracing::info!("Starting job {} for {}", job_id, root);

    let mut run = JobRun {
        tracker: JobTracker::new(),
        store,
        job_id,
        cancel,
    };

    // ===== Mapping =====
    run.enter(JobState::Mapping)?;
    let mapper = ctx.site_mapper();
    let primary = tokio::select! {
        _ = cancel.cancelled() => return Err(run.cancelled()),
        mapped = mapper.map(&root) => match mapped {
            Ok(frontier) => frontier,
            Err(e) => return Err(run.fail(e.into())),
        },
    };
    stats.primary_pages = primary.len();

    // ===== Primary pass =====
    run.enter(JobState::FetchPrimary)?;
    let primary_results = match fetch_frontier(ctx, &primary, cancel).await {
        Some(results) => results,
        None => return Err(run.cancelled()),
    };

    // ===== Expansion =====
    run.enter(JobState::Expand)?;
    let expansion = expand(
        &primary,
        &primary_results,
        &root,
        ctx.config().crawler.max_secondary_pages,
    );
    stats.secondary_pages = expansion.frontier.len();
    stats.links_seen = expansion.seen_links;

    // ===== Secondary pass =====
    run.enter(JobState::FetchSecondary)?;
    let secondary_results = match fetch_frontier(ctx, &expansion.frontier, cancel).await {
        Some(results) => results,
        None => return Err(run.cancelled()),
    };
    for link in secondary_results.iter().flat_map(|r| r.pages.iter()) {
        if let Ok(canonical) = canonicalize(link) {
            stats.links_seen.insert(canonical);
        }
    }

    let results: Vec<PageResult> = primary_results.into_iter().chain(secondary_results).collect();
    stats.empty_fetches = results.iter().filter(|r| r.is_empty()).count();
    tracing::info!(
        "Fetched {} pages ({} empty), {} distinct page links seen",
        results.len(),
        stats.empty_fetches,
        stats.links_seen.len()
    );

    // ===== Classification =====
    run.enter(JobState::Classify)?;
    let classifier = ctx.classifier();
    let classified = ctx
        .classify_scheduler()
        .run(results, cancel, move |page: PageResult| async move {
            classifier.classify_with_outcome(&page, cancel).await
        })
        .await;
    let classified = match classified {
        Ok(classified) => classified,
        Err(_) => return Err(run.cancelled()),
    };

    let mut pages: Vec<ClassifiedPage> = Vec::with_capacity(classified.len());
    for (page, outcome) in classified {
        match outcome {
            ClassifyOutcome::Classified => stats.pages_classified += 1,
            ClassifyOutcome::Skipped => stats.pages_skipped += 1,
            ClassifyOutcome::Failed => stats.pages_failed += 1,
        }
        pages.push(page);
    }
    tracing::info!(
        "Classified {} pages ({} skipped, {} failed)",
        stats.pages_classified,
        stats.pages_skipped,
        stats.pages_failed
    );

    // ===== Assembly =====
    run.enter(JobState::Assemble)?;
    let mut document = assemble(&pages);

    if let Some(rewriter) = ctx.summary_rewriter() {
        let rewritten = rewriter
            .rewrite(
                &document.summary,
                root.as_str(),
                &ctx.config().job.instructions,
                cancel,
            )
            .await;
        match rewritten {
            Ok(summary) => {
                stats.summary_rewritten = summary != document.summary;
                document.summary = summary;
            }
            Err(e) => return Err(run.fail(e.into())),
        }
    }

    if cancel.is_cancelled() {
        return Err(run.cancelled());
    }

    // A failed export leaves no item behind
    let item_name = ctx.item_name();
    let output = &ctx.config().output;
    if let Err(e) = export_documents(
        &document,
        &item_name,
        output.summary_path.as_deref().map(Path::new),
        output.full_path.as_deref().map(Path::new),
    ) {
        return Err(run.fail(e.into()));
    }

    let new_item = NewItem {
        name: item_name,
        summary: document.summary.clone(),
        full: document.full.clone(),
        tags: item_tags(&pages),
        config_hash: ctx.config_hash().to_string(),
        job_id: Some(job_id),
    };
    let item = match run.store.create_item(&new_item) {
        Ok(item) => item,
        Err(e) => return Err(run.fail(e.into())),
    };
    tracing::info!("Persisted item {} ({})", item.id, item.name);

    run.move_to(JobState::Done)?;
    stats.elapsed = started.elapsed();
    tracing::info!(
        "Job {} done in {:.1}s",
        job_id,
        stats.elapsed.as_secs_f64()
    );

    Ok(JobReport {
        item,
        document,
        stats,
    })
}

/// Fetches every member of a frontier; None if the job was cancelled
async fn fetch_frontier(
    ctx: &AppContext,
    frontier: &Frontier,
    cancel: &CancellationToken,
) -> Option<Vec<PageResult>> {
    let fetcher = ctx.page_fetcher();
    let fetcher = &fetcher;

    ctx.fetch_scheduler()
        .run(frontier.to_strings(), cancel, move |url: String| async move {
            fetcher.fetch(&url, cancel).await
        })
        .await
        .ok()
}
