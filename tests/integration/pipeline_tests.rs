//! Integration tests for the pipeline
//!
//! These tests drive complete jobs through in-test mapping, browser and
//! generation services and a SQLite item store on disk.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use sumi_scroll::classify::{GenerationError, GenerationRequest, GenerationService};
use sumi_scroll::config::{parse_config, Config};
use sumi_scroll::crawler::{
    BrowserService, BrowserSession, FetchError, MapOptions, MappingError, MappingService,
};
use sumi_scroll::pipeline::Services;
use sumi_scroll::storage::{ItemStore, SqliteItemStore};
use sumi_scroll::{run_job, AppContext, JobState, ScrollError, Tag};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// ===== Fakes =====

struct FakeMapping {
    links: Option<Vec<String>>,
}

#[async_trait]
impl MappingService for FakeMapping {
    async fn map(&self, url: &str, options: MapOptions) -> Result<Vec<String>, MappingError> {
        assert_eq!(options.limit, 1000);
        match &self.links {
            Some(links) => Ok(links.clone()),
            None => Err(MappingError::Rejected {
                url: url.to_string(),
                message: "quota exceeded".to_string(),
            }),
        }
    }
}

struct FakeBrowser {
    pages: Arc<HashMap<String, String>>,
    sessions_closed: Arc<AtomicUsize>,
}

struct FakeSession {
    pages: Arc<HashMap<String, String>>,
    current: Option<String>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl BrowserService for FakeBrowser {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        Ok(Box::new(FakeSession {
            pages: Arc::clone(&self.pages),
            current: None,
            closed: Arc::clone(&self.sessions_closed),
        }))
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), FetchError> {
        if !self.pages.contains_key(url) {
            return Err(FetchError::Navigation {
                url: url.to_string(),
                message: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            });
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn evaluate(&mut self, _script: &str) -> Result<Value, FetchError> {
        let url = self.current.clone().unwrap_or_default();
        Ok(Value::String(self.pages.get(&url).cloned().unwrap_or_default()))
    }

    async fn close(self: Box<Self>) -> Result<(), FetchError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// How the fake generation service answers the summary rewrite
#[derive(Clone, Copy)]
enum Rewrite {
    /// Adds a heading and reverses the entries
    Faithful,
    /// Drops the last entry
    DropsUrl,
}

struct FakeGeneration {
    rewrite: Rewrite,
    classified_urls: Mutex<Vec<String>>,
}

impl FakeGeneration {
    fn classification(url: &str) -> Value {
        match url {
            "https://example.com/" => json!({
                "title": "Example Home",
                "description": "Landing page introducing Example and its hosted products",
                "tags": ["homepage"],
                "markdown": "Welcome to Example."
            }),
            "https://example.com/services" => json!({
                "title": "Cloud Services",
                "description": "Managed hosting, storage and support plans for teams",
                "tags": ["services", "announcements"],
                "markdown": "We host things."
            }),
            "https://example.com/blog/launch" => json!({
                "title": "Launch Post",
                "description": "Announcement of the public launch of Example Cloud",
                "tags": ["blog"],
                "markdown": "We launched."
            }),
            _ => json!({
                "title": "About Example",
                "description": "The team, history and values behind the company",
                "tags": ["misc", "careers"],
                "markdown": "We are a small team."
            }),
        }
    }
}

#[async_trait]
impl GenerationService for FakeGeneration {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        if request.schema.is_some() {
            let url = request
                .prompt
                .lines()
                .find_map(|line| line.strip_prefix("Page URL: "))
                .unwrap_or_default()
                .to_string();
            self.classified_urls.lock().unwrap().push(url.clone());
            return Ok(Self::classification(&url));
        }

        let mut entries: Vec<&str> = request
            .prompt
            .lines()
            .filter(|line| line.starts_with("- ["))
            .collect();
        let text = match self.rewrite {
            Rewrite::Faithful => {
                entries.reverse();
                format!("# Example\n\nA tour of the site.\n\n{}", entries.join("\n"))
            }
            Rewrite::DropsUrl => {
                entries.pop();
                entries.join("\n")
            }
        };
        Ok(Value::String(text))
    }
}

// ===== Setup =====

fn site() -> HashMap<String, String> {
    let mut pages = HashMap::new();
    pages.insert(
        "https://example.com/".to_string(),
        r#"<html><body>
            <h1>Welcome</h1>
            <a href="/services">Services</a>
            <a href="/about">About</a>
            <a href="/legal/terms">Terms</a>
            <a href="https://other.com/">Partner</a>
            <a href="/files/deck.pdf">Deck</a>
        </body></html>"#
            .to_string(),
    );
    pages.insert(
        "https://example.com/services".to_string(),
        r#"<html><body>
            <h2>Hosting</h2>
            <p>Plans for every team.</p>
            <a href="/about/">About us</a>
            <a href="/contact">Contact</a>
        </body></html>"#
            .to_string(),
    );
    pages.insert(
        "https://example.com/blog/launch".to_string(),
        r#"<html><body><h1>We launched</h1><a href="/services">Services</a></body></html>"#
            .to_string(),
    );
    pages.insert(
        "https://example.com/legal/terms".to_string(),
        r#"<html><body><p>Terms of service</p></body></html>"#.to_string(),
    );
    pages.insert(
        "https://example.com/about".to_string(),
        r#"<html><body><p>Our story</p></body></html>"#.to_string(),
    );
    pages
}

fn mapped_links() -> Vec<String> {
    [
        "https://example.com/",
        "https://example.com/services",
        "https://example.com/blog/launch",
        "https://example.com/legal/terms",
        "https://other.com/x",
        "https://example.com/brochure.pdf",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn create_test_config(dir: &TempDir, rewrite: bool, summary_path: &Path) -> Config {
    let toml = format!(
        r#"
[job]
root-url = "https://example.com"
instructions = "Write for prospective customers."
exclude-paths = ["/legal"]

[crawler]
max-concurrent-pages-open = 2
batch-interval = 0
retry-attempts = 2
retry-delays = [10]

[mapping]
api-key = "fc-key"

[browser]
api-key = "bb-key"
project-id = "proj-1"

[generation]
api-key = "sk-key"
rewrite-summary = {rewrite}

[output]
database-path = "{db}"
summary-path = "{summary}"
full-path = "{full}"
"#,
        rewrite = rewrite,
        db = dir.path().join("items.db").display(),
        summary = summary_path.display(),
        full = dir.path().join("llms-full.txt").display(),
    );
    parse_config(&toml).unwrap()
}

struct Harness {
    ctx: AppContext,
    store: SqliteItemStore,
    generation: Arc<FakeGeneration>,
    sessions_closed: Arc<AtomicUsize>,
    dir: TempDir,
}

fn harness(links: Option<Vec<String>>, rewrite: Option<Rewrite>) -> Harness {
    let dir = TempDir::new().unwrap();
    let summary_path = dir.path().join("llms.txt");
    harness_in(dir, &summary_path, links, rewrite)
}

fn harness_in(
    dir: TempDir,
    summary_path: &Path,
    links: Option<Vec<String>>,
    rewrite: Option<Rewrite>,
) -> Harness {
    let config = create_test_config(&dir, rewrite.is_some(), summary_path);
    let generation = Arc::new(FakeGeneration {
        rewrite: rewrite.unwrap_or(Rewrite::Faithful),
        classified_urls: Mutex::new(Vec::new()),
    });
    let sessions_closed = Arc::new(AtomicUsize::new(0));
    let services = Services {
        mapping: Arc::new(FakeMapping { links }),
        browser: Arc::new(FakeBrowser {
            pages: Arc::new(site()),
            sessions_closed: Arc::clone(&sessions_closed),
        }),
        generation: generation.clone(),
    };
    let store = SqliteItemStore::new(&dir.path().join("items.db")).unwrap();
    let ctx = AppContext::new(config, "cfg-hash".to_string(), services).unwrap();

    Harness {
        ctx,
        store,
        generation,
        sessions_closed,
        dir,
    }
}

// ===== Tests =====

#[tokio::test]
async fn test_full_job_without_rewrite() {
    let mut h = harness(Some(mapped_links()), None);

    let report = run_job(&h.ctx, &mut h.store, &CancellationToken::new())
        .await
        .unwrap();

    // Primary: /, /services, /blog/launch, /legal/terms. Secondary: /about, /contact
    assert_eq!(report.stats.primary_pages, 4);
    assert_eq!(report.stats.secondary_pages, 2);
    assert_eq!(report.stats.empty_fetches, 1);
    assert_eq!(report.stats.pages_classified, 4);
    assert_eq!(report.stats.pages_skipped, 2);
    assert_eq!(report.stats.pages_failed, 0);
    assert_eq!(report.stats.links_seen.len(), 5);
    assert!(!report.stats.summary_rewritten);

    // Excluded and empty pages never reach the generation service
    let mut classified = h.generation.classified_urls.lock().unwrap().clone();
    classified.sort();
    assert_eq!(
        classified,
        vec![
            "https://example.com/",
            "https://example.com/about",
            "https://example.com/blog/launch",
            "https://example.com/services",
        ]
    );

    // Summary in discovery order
    assert_eq!(
        report.document.summary.lines().collect::<Vec<_>>(),
        vec![
            "- [Example Home](https://example.com/): Landing page introducing Example and its hosted products",
            "- [Cloud Services](https://example.com/services): Managed hosting, storage and support plans for teams",
            "- [Launch Post](https://example.com/blog/launch): Announcement of the public launch of Example Cloud",
            "- [About Example](https://example.com/about): The team, history and values behind the company",
        ]
    );

    // Full document in bucket order, multi-tag page once per bucket
    let full = &report.document.full;
    let position = |title: &str| full.find(&format!("# {}\n", title)).unwrap();
    assert!(position("Example Home") < position("Cloud Services"));
    assert!(position("Cloud Services") < position("Launch Post"));
    assert!(position("Launch Post") < position("About Example"));
    assert_eq!(full.matches("<!-- source: https://example.com/services -->").count(), 2);
    assert!(!full.contains("https://example.com/legal/terms"));
    assert!(!full.contains("https://example.com/contact"));

    // Persisted item and job
    let item = h.store.get_item(report.item.id).unwrap();
    assert_eq!(item.name, "example.com");
    assert_eq!(item.summary, report.document.summary);
    assert_eq!(item.config_hash, "cfg-hash");
    assert_eq!(
        item.tags,
        vec![Tag::Homepage, Tag::Services, Tag::Blog, Tag::Misc, Tag::Announcements]
    );
    let job = h.store.get_job(item.job_id.unwrap()).unwrap();
    assert_eq!(job.state, JobState::Done);
    assert!(job.finished_at.is_some());

    // Exported files
    let summary_file = std::fs::read_to_string(h.dir.path().join("llms.txt")).unwrap();
    assert!(summary_file.starts_with("# example.com\n\n- [Example Home]"));
    let full_file = std::fs::read_to_string(h.dir.path().join("llms-full.txt")).unwrap();
    assert!(full_file.contains("We host things."));

    // One session per attempt, all closed: 5 served pages + 2 attempts on /contact
    assert_eq!(h.sessions_closed.load(Ordering::SeqCst), 7);
}

#[tokio::test]
async fn test_rewrite_pass_keeps_urls() {
    let mut h = harness(Some(mapped_links()), Some(Rewrite::Faithful));

    let report = run_job(&h.ctx, &mut h.store, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.stats.summary_rewritten);
    let summary = &report.document.summary;
    assert!(summary.starts_with("# Example\n\nA tour of the site."));
    assert!(summary.find("https://example.com/about").unwrap() < summary.find("https://example.com/)").unwrap());

    let summary_file = std::fs::read_to_string(h.dir.path().join("llms.txt")).unwrap();
    assert!(summary_file.starts_with("# Example\n"));
}

#[tokio::test]
async fn test_rewrite_dropping_a_url_fails_assembly() {
    let mut h = harness(Some(mapped_links()), Some(Rewrite::DropsUrl));

    let err = run_job(&h.ctx, &mut h.store, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage, JobState::Assemble);
    assert!(matches!(err.source, ScrollError::Assembly(_)));
    assert!(h.store.list_items().unwrap().is_empty());
    assert_eq!(h.store.get_job(1).unwrap().state, JobState::Failed);
}

#[tokio::test]
async fn test_mapping_failure_is_fatal() {
    let mut h = harness(None, None);

    let err = run_job(&h.ctx, &mut h.store, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage, JobState::Mapping);
    assert!(matches!(err.source, ScrollError::Mapping(MappingError::Rejected { .. })));
    assert_eq!(h.store.get_job(1).unwrap().state, JobState::Failed);
    assert_eq!(h.sessions_closed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_only_off_site_links_is_nothing_to_crawl() {
    let mut h = harness(Some(vec!["https://other.com/".to_string()]), None);

    let err = run_job(&h.ctx, &mut h.store, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage, JobState::Mapping);
    assert!(matches!(
        err.source,
        ScrollError::Mapping(MappingError::NothingToCrawl(_))
    ));
}

#[tokio::test]
async fn test_cancelled_job_stops_before_mapping() {
    let mut h = harness(Some(mapped_links()), None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = run_job(&h.ctx, &mut h.store, &cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(err.stage, JobState::Pending);
    assert_eq!(h.store.get_job(1).unwrap().state, JobState::Cancelled);
    assert!(h.generation.classified_urls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_export_persists_no_item() {
    let dir = TempDir::new().unwrap();
    // A directory where the summary file should go
    let summary_path = dir.path().join("llms.txt");
    std::fs::create_dir(&summary_path).unwrap();
    let mut h = harness_in(dir, &summary_path, Some(mapped_links()), None);

    let err = run_job(&h.ctx, &mut h.store, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage, JobState::Assemble);
    assert!(matches!(err.source, ScrollError::Assembly(_)));
    assert!(h.store.list_items().unwrap().is_empty());
    assert_eq!(h.store.get_job(1).unwrap().state, JobState::Failed);
}
