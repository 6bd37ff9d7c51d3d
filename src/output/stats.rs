//! Per-job statistics
//!
//! Diagnostics collected while a job runs. Nothing here feeds back into the
//! pipeline; it is reported at the end of the run.

use std::collections::HashSet;
use std::time::Duration;

/// Job statistics summary
#[derive(Debug, Clone, Default)]
pub struct JobStats {
    /// Size of the primary frontier
    pub primary_pages: usize,

    /// Size of the secondary frontier
    pub secondary_pages: usize,

    /// Fetches that ended in the empty sentinel
    pub empty_fetches: usize,

    /// Pages the generation service classified
    pub pages_classified: usize,

    /// Pages out of scope or without fetched text
    pub pages_skipped: usize,

    /// Pages whose classification failed after retries
    pub pages_failed: usize,

    /// Distinct page links seen across both passes (canonical form)
    pub links_seen: HashSet<String>,

    /// Whether the summary went through the rewrite pass
    pub summary_rewritten: bool,

    /// Wall-clock duration of the job
    pub elapsed: Duration,
}

impl JobStats {
    /// Total pages fetched across both passes
    pub fn pages_fetched(&self) -> usize {
        self.primary_pages + self.secondary_pages
    }

    /// Percentage of fetched pages that produced content
    pub fn fetch_success_rate(&self) -> f64 {
        let fetched = self.pages_fetched();
        if fetched == 0 {
            return 0.0;
        }
        (fetched.saturating_sub(self.empty_fetches) as f64 / fetched as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &JobStats) {
    println!("=== Job Statistics ===\n");

    println!("Crawl:");
    println!("  Primary pages: {}", stats.primary_pages);
    println!("  Secondary pages: {}", stats.secondary_pages);
    println!("  Empty fetches: {}", stats.empty_fetches);
    println!("  Distinct page links seen: {}", stats.links_seen.len());
    println!();

    println!("Classification:");
    println!("  Classified: {}", stats.pages_classified);
    println!("  Skipped: {}", stats.pages_skipped);
    println!("  Failed: {}", stats.pages_failed);
    println!();

    println!(
        "Summary rewritten: {}",
        if stats.summary_rewritten { "yes" } else { "no" }
    );
    println!(
        "Fetch success rate: {:.1}% ({} / {} pages)",
        stats.fetch_success_rate(),
        stats.pages_fetched().saturating_sub(stats.empty_fetches),
        stats.pages_fetched()
    );
    println!("Elapsed: {:.1}s", stats.elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_success_rate() {
        let stats = JobStats {
            primary_pages: 6,
            secondary_pages: 4,
            empty_fetches: 1,
            ..Default::default()
        };

        assert_eq!(stats.pages_fetched(), 10);
        assert!((stats.fetch_success_rate() - 90.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_job_has_zero_rate() {
        assert_eq!(JobStats::default().fetch_success_rate(), 0.0);
    }
}
