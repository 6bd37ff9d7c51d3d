//! HTML extraction for rendered pages
//!
//! This module turns the rendered document of a page into:
//! - Outbound links, split into pages and files
//! - Image sources
//! - The visible text of text-bearing elements

use crate::url::partition_links;
use scraper::{Html, Selector};
use url::Url;

/// Elements whose text is collected as the page's visible content
const TEXT_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, span, li, td, th, label, button, a";

/// Schemes whose links are never followed
const EXCLUDED_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:", "data:"];

/// Content extracted from a rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Visible text, trimmed fragments joined with single spaces
    pub text: String,

    /// Absolute links to pages
    pub pages: Vec<String>,

    /// Absolute links to files (see [`crate::url::FILE_EXTENSIONS`])
    pub files: Vec<String>,

    /// Absolute image source URLs
    pub images: Vec<String>,
}

/// Extracts links, images and visible text from rendered HTML
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags, with relative hrefs resolved against `base_url`
///
/// **Exclude:**
/// - `mailto:`, `tel:`, `javascript:` and `data:` links
/// - Fragment-only links (same page anchors)
/// - Anything that is not http(s) after resolution
///
/// # Example
///
/// ```
/// use sumi_scroll::crawler::extract_page;
/// use url::Url;
///
/// let html = r#"<html><body><h1>Hi</h1><a href="/about">About</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let page = extract_page(html, &base_url);
/// assert_eq!(page.pages, vec!["https://example.com/about".to_string()]);
/// assert_eq!(page.text, "Hi About");
/// ```
pub fn extract_page(html: &str, base_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);

    let links = extract_links(&document, base_url);
    let (pages, files) = partition_links(links);

    ExtractedPage {
        text: extract_text(&document),
        pages,
        files,
        images: extract_images(&document, base_url),
    }
}

/// Extracts all followable links from anchors, in document order
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Extracts all image sources, in document order
fn extract_images(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .filter_map(|src| resolve_link(src, base_url))
        .collect()
}

/// Collects the trimmed text of every text-bearing element
fn extract_text(document: &Html) -> String {
    let Ok(selector) = Selector::parse(TEXT_SELECTOR) else {
        return String::new();
    };

    document
        .select(&selector)
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trims and collapses internal whitespace runs to single spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves an href or src to an absolute URL
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if EXCLUDED_SCHEMES
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/docs/page").unwrap()
    }

    #[test]
    fn test_root_relative_link_resolved_against_origin() {
        let html = r#"<html><body><a href="/other">Link</a></body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(page.pages, vec!["https://example.com/other"]);
    }

    #[test]
    fn test_path_relative_link() {
        let html = r#"<html><body><a href="sibling">Link</a></body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(page.pages, vec!["https://example.com/docs/sibling"]);
    }

    #[test]
    fn test_absolute_link_kept() {
        let html = r#"<html><body><a href="https://other.com/x">Link</a></body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(page.pages, vec!["https://other.com/x"]);
    }

    #[test]
    fn test_excluded_schemes_dropped() {
        let html = r#"<html><body>
            <a href="mailto:hi@example.com">Mail</a>
            <a href="tel:+1234567890">Call</a>
            <a href="javascript:void(0)">JS</a>
            <a href="MAILTO:HI@EXAMPLE.COM">Mail</a>
            <a href="/kept">Kept</a>
        </body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(page.pages, vec!["https://example.com/kept"]);
        assert!(page.files.is_empty());
    }

    #[test]
    fn test_fragment_only_dropped() {
        let html = r##"<html><body><a href="#section">Jump</a></body></html>"##;
        let page = extract_page(html, &base_url());
        assert!(page.pages.is_empty());
    }

    #[test]
    fn test_links_partitioned_into_pages_and_files() {
        let html = r#"<html><body>
            <a href="/about">About</a>
            <a href="/files/report.pdf">Report</a>
            <a href="/pricing">Pricing</a>
            <a href="/downloads/app.zip">App</a>
        </body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(
            page.pages,
            vec!["https://example.com/about", "https://example.com/pricing"]
        );
        assert_eq!(
            page.files,
            vec![
                "https://example.com/files/report.pdf",
                "https://example.com/downloads/app.zip"
            ]
        );
    }

    #[test]
    fn test_images_extracted() {
        let html = r#"<html><body>
            <img src="/logo.png">
            <img src="https://cdn.example.com/hero.webp">
            <img alt="no source">
        </body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(
            page.images,
            vec![
                "https://example.com/logo.png",
                "https://cdn.example.com/hero.webp"
            ]
        );
    }

    #[test]
    fn test_text_from_text_bearing_elements() {
        let html = r#"<html><head><title>Ignored</title><script>var x = 1;</script></head>
            <body>
                <h1>  Welcome  </h1>
                <div>bare div text is ignored</div>
                <p>We build
                   things.</p>
                <ul><li>Fast</li><li>   </li><li>Reliable</li></ul>
                <button>Sign up</button>
            </body></html>"#;
        let page = extract_page(html, &base_url());
        assert_eq!(page.text, "Welcome We build things. Fast Reliable Sign up");
    }

    #[test]
    fn test_empty_document() {
        let page = extract_page("", &base_url());
        assert_eq!(page, ExtractedPage::default());
    }
}
