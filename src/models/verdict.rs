use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Final ruling on a claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictLabel {
    Real,
    Fake,
    Unverified,
}

/// A named entity extracted from the claim text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    /// Coarse entity category: "proper_noun", "year", or "quantity".
    pub label: String,
    pub confidence: f64,
}

/// Output of the claim analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimAnalysis {
    pub entities: Vec<Entity>,
    pub entity_count: usize,
    /// 0-100 score combining entity type diversity, proper-noun ratio
    /// and mean confidence.
    pub entity_quality_score: u8,
    /// 0-100 score for sensationalist language in the claim.
    pub sensationalism_score: u8,
    pub analysis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Outcome classification for the research stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResearchStatus {
    ResearchComplete,
    InsufficientEntities,
    ResearchFailed,
}

/// A single evidence source gathered during research.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSource {
    pub url: String,
    pub source_name: String,
    pub summary: String,
    pub scraped_successfully: bool,
}

/// Output of the research stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchFindings {
    pub status: ResearchStatus,
    pub entities_searched: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    pub sources: Vec<EvidenceSource>,
    pub total_sources_found: usize,
    pub total_sources_scraped: usize,
}

/// Evidence sources grouped by their relationship to the claim.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesAnalyzed {
    pub supporting: Vec<String>,
    pub contradicting: Vec<String>,
}

/// Final structured verdict returned to polling clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub verdict: VerdictLabel,
    /// 0-100 confidence in the ruling.
    pub confidence: u8,
    pub reasoning: String,
    pub sources_analyzed: SourcesAnalyzed,
    pub entity_quality_score: u8,
    pub sensationalism_score: u8,
}
