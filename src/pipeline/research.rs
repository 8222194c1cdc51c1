//! Research stage.
//!
//! Builds a short search query from the highest-confidence claim
//! entities, fetches candidate URLs from a SerpAPI-style search endpoint,
//! scrapes up to `max_sources` pages, and condenses each into a short
//! extractive summary. Individual tool failures move on to the next
//! candidate; only a total failure (or an unusable claim) downgrades the
//! stage status. The stage itself never aborts the pipeline.

use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::verdict::{ClaimAnalysis, Entity, EvidenceSource, ResearchFindings, ResearchStatus};
use crate::pipeline::claim::MIN_ENTITY_QUALITY;
use crate::pipeline::STAGE_RESEARCH;
use crate::services::telemetry::Telemetry;

const SEARCH_ENDPOINT: &str = "https://serpapi.com/search.json";
const HTTP_TIMEOUT_SECS: u64 = 20;
const SUMMARY_WORD_LIMIT: usize = 120;
const MAX_QUERY_TERMS: usize = 3;
const MAX_PAGE_CHARS: usize = 20_000;

/// Outlets weighted toward the front of the scrape order.
const CREDIBLE_DOMAINS: &[&str] = &[
    "reuters.com",
    "apnews.com",
    "bbc.com",
    "bbc.co.uk",
    "npr.org",
    "factcheck.org",
    "politifact.com",
    "snopes.com",
];

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

pub struct ResearchTools {
    http: reqwest::Client,
    serpapi_key: Option<String>,
    max_sources: usize,
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    link: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search API key not configured")]
    MissingApiKey,

    #[error("HTTP request to search API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search API unavailable: HTTP {0}")]
    Unavailable(reqwest::StatusCode),
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("page returned HTTP {0}")]
    Unavailable(reqwest::StatusCode),

    #[error("failed to parse page HTML: {0}")]
    Parse(String),

    #[error("page contained no readable text")]
    Empty,
}

impl ResearchTools {
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            serpapi_key: config.serpapi_api_key.clone(),
            max_sources: config.max_sources,
        })
    }

    /// Run the research stage for one job.
    pub async fn run(
        &self,
        telemetry: &Telemetry,
        job_id: Uuid,
        analysis: &ClaimAnalysis,
    ) -> ResearchFindings {
        // Gate on entity quality before spending network calls.
        if analysis.entities.is_empty() || analysis.entity_quality_score < MIN_ENTITY_QUALITY {
            return ResearchFindings {
                status: ResearchStatus::InsufficientEntities,
                entities_searched: Vec::new(),
                search_query: None,
                sources: Vec::new(),
                total_sources_found: 0,
                total_sources_scraped: 0,
            };
        }

        let entities_searched: Vec<String> = analysis
            .entities
            .iter()
            .filter(|e| e.confidence > 0.5)
            .take(MAX_QUERY_TERMS)
            .map(|e| e.text.clone())
            .collect();
        let query = build_query(&analysis.entities);

        telemetry
            .tool_call(job_id, STAGE_RESEARCH, "search", json!({ "query": query }))
            .await;

        let hits = match self.search(&query).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "search tool failed");
                telemetry
                    .tool_error(job_id, STAGE_RESEARCH, "search", &e.to_string())
                    .await;
                return ResearchFindings {
                    status: ResearchStatus::ResearchFailed,
                    entities_searched,
                    search_query: Some(query),
                    sources: Vec::new(),
                    total_sources_found: 0,
                    total_sources_scraped: 0,
                };
            }
        };

        let mut sources: Vec<EvidenceSource> = Vec::new();
        let mut scraped = 0usize;

        for hit in &hits {
            if scraped >= self.max_sources {
                break;
            }

            telemetry
                .tool_call(job_id, STAGE_RESEARCH, "scraper", json!({ "url": hit.url }))
                .await;

            match self.scrape(&hit.url).await {
                Ok(text) => {
                    let summary = summarize(&text, SUMMARY_WORD_LIMIT);
                    sources.push(EvidenceSource {
                        url: hit.url.clone(),
                        source_name: hit.source_name.clone(),
                        summary,
                        scraped_successfully: true,
                    });
                    scraped += 1;
                    telemetry.increment_urls_scraped(1).await;
                }
                Err(e) => {
                    tracing::debug!(job_id = %job_id, url = %hit.url, error = %e, "scrape failed, trying next source");
                    telemetry
                        .tool_error(job_id, STAGE_RESEARCH, "scraper", &e.to_string())
                        .await;
                    sources.push(EvidenceSource {
                        url: hit.url.clone(),
                        source_name: hit.source_name.clone(),
                        summary: String::new(),
                        scraped_successfully: false,
                    });
                }
            }
        }

        let status = if scraped > 0 {
            ResearchStatus::ResearchComplete
        } else {
            ResearchStatus::ResearchFailed
        };

        ResearchFindings {
            status,
            entities_searched,
            search_query: Some(query),
            total_sources_found: hits.len(),
            total_sources_scraped: scraped,
            sources,
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let api_key = self
            .serpapi_key
            .as_deref()
            .ok_or(SearchError::MissingApiKey)?;

        let response = self
            .http
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("num", "10"),
                ("api_key", api_key),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Unavailable(response.status()));
        }

        let body: SerpResponse = response.json().await?;

        let mut hits: Vec<SearchHit> = body
            .organic_results
            .into_iter()
            .filter(|r| r.link.starts_with("http"))
            .map(|r| {
                let domain = domain_of(&r.link);
                SearchHit {
                    source_name: r.source.unwrap_or_else(|| domain.clone()),
                    credible: is_credible(&domain),
                    url: r.link,
                }
            })
            .collect();

        // Credible outlets first; order within each group is preserved.
        hits.sort_by_key(|h| !h.credible);
        Ok(hits)
    }

    async fn scrape(&self, url: &str) -> Result<String, ScrapeError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ScrapeError::Unavailable(response.status()));
        }
        let html = response.text().await?;
        extract_text(&html)
    }
}

struct SearchHit {
    url: String,
    source_name: String,
    credible: bool,
}

/// Build a short search query from the top entities (3-5 terms).
fn build_query(entities: &[Entity]) -> String {
    let mut terms: Vec<&str> = entities
        .iter()
        .filter(|e| e.confidence > 0.5)
        .take(MAX_QUERY_TERMS)
        .map(|e| e.text.as_str())
        .collect();

    // Fall back to the best entities regardless of confidence rather than
    // issuing an empty query.
    if terms.is_empty() {
        terms = entities
            .iter()
            .take(MAX_QUERY_TERMS)
            .map(|e| e.text.as_str())
            .collect();
    }

    terms.join(" ")
}

/// Pull readable text out of an HTML page (paragraph content only).
fn extract_text(html: &str) -> Result<String, ScrapeError> {
    let document = Html::parse_document(html);
    let paragraphs =
        Selector::parse("p").map_err(|e| ScrapeError::Parse(e.to_string()))?;

    let mut text = String::new();
    for element in document.select(&paragraphs) {
        let raw: String = element.text().collect();
        // Inline markup splits text nodes; renormalize the whitespace.
        let fragment = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if fragment.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&fragment);
        if text.len() >= MAX_PAGE_CHARS {
            break;
        }
    }

    if text.is_empty() {
        return Err(ScrapeError::Empty);
    }
    Ok(text)
}

/// Extractive summary: whole sentences up to the word budget.
fn summarize(text: &str, word_limit: usize) -> String {
    let mut summary = String::new();
    let mut words = 0usize;

    for sentence in split_sentences(text) {
        let sentence_words = sentence.split_whitespace().count();
        if words + sentence_words > word_limit && words > 0 {
            break;
        }
        if !summary.is_empty() {
            summary.push(' ');
        }
        summary.push_str(sentence.trim());
        words += sentence_words;
        if words >= word_limit {
            break;
        }
    }

    // A single run-on sentence longer than the budget gets cut mid-way.
    if words > word_limit {
        let truncated: Vec<&str> = summary.split_whitespace().take(word_limit).collect();
        summary = truncated.join(" ");
    }

    summary
}

fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Host portion of a URL, without scheme or leading "www.".
fn domain_of(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    host.strip_prefix("www.").unwrap_or(host).to_lowercase()
}

fn is_credible(domain: &str) -> bool {
    CREDIBLE_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{}", d)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(text: &str, confidence: f64) -> Entity {
        Entity {
            text: text.to_string(),
            label: "proper_noun".to_string(),
            confidence,
        }
    }

    #[test]
    fn test_build_query_uses_top_entities() {
        let entities = vec![
            entity("Angela Merkel", 0.7),
            entity("Paris", 0.55),
            entity("2015", 0.4),
        ];
        assert_eq!(build_query(&entities), "Angela Merkel Paris");
    }

    #[test]
    fn test_build_query_falls_back_to_low_confidence() {
        let entities = vec![entity("Paris", 0.4)];
        assert_eq!(build_query(&entities), "Paris");
    }

    #[test]
    fn test_domain_extraction() {
        assert_eq!(
            domain_of("https://www.reuters.com/world/article-1?utm=x"),
            "reuters.com"
        );
        assert_eq!(domain_of("http://apnews.com/story"), "apnews.com");
        assert_eq!(domain_of("bbc.co.uk/news"), "bbc.co.uk");
    }

    #[test]
    fn test_credible_domain_match() {
        assert!(is_credible("reuters.com"));
        assert!(is_credible("uk.reuters.com"));
        assert!(!is_credible("notreuters.com"));
        assert!(!is_credible("example.com"));
    }

    #[test]
    fn test_extract_text_paragraphs_only() {
        let html = r#"
            <html><body>
            <script>var x = 1;</script>
            <p>First paragraph.</p>
            <div>ignored div text</div>
            <p>Second <b>bold</b> paragraph.</p>
            </body></html>
        "#;
        let text = extract_text(html).unwrap();
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second bold paragraph."));
        assert!(!text.contains("var x"));
        assert!(!text.contains("ignored div"));
    }

    #[test]
    fn test_extract_text_empty_page() {
        assert!(matches!(
            extract_text("<html><body></body></html>"),
            Err(ScrapeError::Empty)
        ));
    }

    #[test]
    fn test_summarize_respects_word_limit() {
        let text = "One two three. Four five six seven. Eight nine ten eleven twelve.";
        let summary = summarize(text, 7);
        assert_eq!(summary, "One two three. Four five six seven.");
    }

    #[test]
    fn test_summarize_runon_sentence_truncated() {
        let text = "a b c d e f g h i j";
        let summary = summarize(text, 4);
        assert_eq!(summary, "a b c d");
    }
}
