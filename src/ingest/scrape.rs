//! Company website scraping into chunked knowledge entries

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::json;
use url::Url;

use super::{CHUNK_WORDS, chunk_words, clean_text};
use crate::db::KnowledgeRepo;
use crate::knowledge::KnowledgeSource;
use crate::{Error, Result};

/// Pages fetched in addition to the site root
pub const KEY_PAGES: &[&str] = &["/about-us", "/services", "/contact-us", "/hosting", "/development"];

/// Per-page timeout for key pages
const PAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for the site root
const ROOT_TIMEOUT: Duration = Duration::from_secs(15);

const USER_AGENT: &str = "Mozilla/5.0 (compatible; HelpdeskBot/1.0)";

/// Title used when the root page has none
const DEFAULT_SITE_TITLE: &str = "Kenmark ITan Solutions";

/// Selectors tried for the main content, in one pass
const CONTENT_SELECTOR: &str = "main, article, .content, #content";

/// Text extracted from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPage {
    pub title: String,
    pub content: String,
    pub url: String,
    pub category: String,
}

/// Map a key page path to its knowledge category
#[must_use]
pub fn category_for_path(path: &str) -> &'static str {
    if path.contains("services") || path.contains("hosting") || path.contains("development") {
        "Services"
    } else if path.contains("contact") {
        "Contact"
    } else {
        "About"
    }
}

/// Pull the title and main text out of an HTML document
///
/// Content comes from `main`, `article`, `.content` or `#content`, falling
/// back to the whole `body` when none of those carry text.
#[must_use]
pub fn extract_page(html: &str) -> (Option<String>, String) {
    let document = Html::parse_document(html);

    let text_of = |selector: &str| -> String {
        Selector::parse(selector)
            .map(|s| {
                document
                    .select(&s)
                    .map(|el| el.text().collect::<Vec<_>>().join(" "))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    };

    let title = Some(clean_text(&text_of("title"))).filter(|t| !t.is_empty());

    let mut content = clean_text(&text_of(CONTENT_SELECTOR));
    if content.is_empty() {
        content = clean_text(&text_of("body"));
    }

    (title, content)
}

/// Fetches the company website
pub struct SiteScraper {
    client: Client,
}

impl SiteScraper {
    /// Create a new scraper
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(ROOT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Scrape the root page and the key pages of a site
    ///
    /// Key page failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the root page cannot be fetched
    pub async fn scrape_site(&self, base: &str) -> Result<Vec<ScrapedPage>> {
        let parsed = Url::parse(base).map_err(|e| Error::Ingest(format!("invalid url {base}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Ingest(format!("unsupported url scheme: {}", parsed.scheme())));
        }
        let base = base.trim_end_matches('/');

        let html = self.fetch(base, ROOT_TIMEOUT).await?;
        let (title, content) = extract_page(&html);
        let mut pages = vec![ScrapedPage {
            title: title.unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string()),
            content,
            url: base.to_string(),
            category: "About".to_string(),
        }];

        for path in KEY_PAGES {
            let url = format!("{base}{path}");
            match self.fetch(&url, PAGE_TIMEOUT).await {
                Ok(html) => {
                    let (title, content) = extract_page(&html);
                    pages.push(ScrapedPage {
                        title: title.unwrap_or_else(|| (*path).to_string()),
                        content,
                        url,
                        category: category_for_path(path).to_string(),
                    });
                }
                Err(e) => tracing::warn!(url, error = %e, "failed to scrape page"),
            }
        }

        tracing::info!(base, pages = pages.len(), "website scraped");
        Ok(pages)
    }

    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::Ingest(format!("failed to fetch {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Ingest(format!("{url} returned {}", response.status())));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Ingest(format!("failed to read {url}: {e}")))
    }
}

/// Chunk scraped pages and store them, returning the number of chunks
///
/// Re-scraping a page updates its existing chunks and drops any parts past
/// the new last one.
///
/// # Errors
///
/// Returns error if a database write fails
pub fn save_pages(repo: &KnowledgeRepo, pages: &[ScrapedPage]) -> Result<usize> {
    let mut stored = 0;

    for page in pages {
        let chunks = chunk_words(&page.content, CHUNK_WORDS);
        for (index, chunk) in chunks.iter().enumerate() {
            let question = format!("{} - Part {}", page.title, index + 1);
            let metadata = json!({
                "title": page.title,
                "url": page.url,
                "chunkIndex": index,
            });
            repo.upsert(
                &page.category,
                Some(&question),
                chunk,
                KnowledgeSource::Website,
                &metadata,
            )?;
            stored += 1;
        }
        repo.delete_page_chunks_from(&page.url, chunks.len())?;
    }

    tracing::info!(pages = pages.len(), chunks = stored, "scraped content saved");
    Ok(stored)
}
