//! File-extension denylist used to split outbound links into pages and files

/// Extensions that mark a link as a downloadable file rather than a page
pub const FILE_EXTENSIONS: &[&str] = &[
    // Documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "rtf", "csv",
    // Images
    "jpg", "jpeg", "png", "gif", "svg", "webp", "bmp", "ico", "tif", "tiff", "avif",
    // Archives
    "zip", "rar", "7z", "tar", "gz", "tgz", "bz2",
    // Audio / video
    "mp3", "wav", "ogg", "m4a", "mp4", "avi", "mov", "wmv", "webm", "mkv",
    // Executables and disk images
    "exe", "dmg", "msi", "iso", "apk",
];

/// Returns true if the link points at a file from the extension denylist
///
/// Works on absolute URLs and bare paths alike; query strings and
/// fragments are ignored and the comparison is case-insensitive.
///
/// # Examples
///
/// ```
/// use sumi_scroll::url::is_file_link;
///
/// assert!(is_file_link("report.pdf"));
/// assert!(is_file_link("https://example.com/media/Logo.PNG?v=2"));
/// assert!(!is_file_link("/about"));
/// ```
pub fn is_file_link(link: &str) -> bool {
    let path = match url::Url::parse(link) {
        Ok(url) => url.path().to_lowercase(),
        Err(_) => link
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_lowercase(),
    };

    let last_segment = path.rsplit('/').next().unwrap_or_default();

    last_segment
        .rsplit_once('.')
        .is_some_and(|(_, ext)| FILE_EXTENSIONS.contains(&ext))
}

/// Splits links into `(pages, files)` by the extension denylist
///
/// Order within each partition follows the input order.
pub fn partition_links<I>(links: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    links.into_iter().partition(|link| !is_file_link(link))
}
