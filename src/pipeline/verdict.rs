//! Verdict stage.
//!
//! Weighs the claim analysis against the gathered evidence and produces
//! the final ruling. Decision order matters: contradicting evidence and
//! research degradation are considered before any support-based ruling.

use strsim::jaro_winkler;

use crate::models::verdict::{
    ClaimAnalysis, EvidenceSource, ResearchFindings, ResearchStatus, SourcesAnalyzed, Verdict,
    VerdictLabel,
};

/// Minimum fraction of claim entities a summary must mention to count as
/// aligned with the claim.
const ALIGNMENT_THRESHOLD: f64 = 0.5;

/// Fuzzy-match threshold for an entity mention inside a summary.
const MENTION_THRESHOLD: f64 = 0.88;

const FAKE_SENSATIONALISM_MIN: u8 = 70;
const FAKE_ENTITY_QUALITY_MAX: u8 = 50;
const REAL_ENTITY_QUALITY_MIN: u8 = 60;

/// Phrases in evidence that indicate the claim is being debunked rather
/// than reported.
const CONTRADICTION_CUES: &[&str] = &[
    "false",
    "debunked",
    "hoax",
    "no evidence",
    "misleading",
    "fact check",
    "denies",
    "denied",
    "refuted",
    "baseless",
    "not true",
];

/// Decide the final verdict for a claim.
pub fn decide(analysis: &ClaimAnalysis, findings: &ResearchFindings) -> Verdict {
    match findings.status {
        ResearchStatus::InsufficientEntities => unverified(
            analysis,
            "The claim did not contain enough identifiable entities to research. \
             Without searchable evidence the claim cannot be confirmed or denied.",
        ),
        ResearchStatus::ResearchFailed => unverified(
            analysis,
            "No web evidence could be gathered for this claim. \
             Without sources the claim cannot be confirmed or denied.",
        ),
        ResearchStatus::ResearchComplete => decide_from_evidence(analysis, findings),
    }
}

fn decide_from_evidence(analysis: &ClaimAnalysis, findings: &ResearchFindings) -> Verdict {
    let mut supporting: Vec<String> = Vec::new();
    let mut contradicting: Vec<String> = Vec::new();

    for source in &findings.sources {
        if !source.scraped_successfully || source.summary.is_empty() {
            continue;
        }
        match classify_source(analysis, source) {
            SourceStance::Supports => supporting.push(source.url.clone()),
            SourceStance::Contradicts => contradicting.push(source.url.clone()),
            SourceStance::Neutral => {}
        }
    }

    let quality = analysis.entity_quality_score;
    let sensationalism = analysis.sensationalism_score;

    // Contradicting evidence wins over everything else.
    if !contradicting.is_empty() && contradicting.len() >= supporting.len() {
        let confidence = (60 + 10 * contradicting.len().min(3) as u8).min(90);
        return Verdict {
            verdict: VerdictLabel::Fake,
            confidence,
            reasoning: format!(
                "{} of {} scraped sources contradict or debunk the claim. \
                 Entity quality was {}/100 and sensationalism {}/100.",
                contradicting.len(),
                findings.total_sources_scraped,
                quality,
                sensationalism
            ),
            sources_analyzed: SourcesAnalyzed {
                supporting,
                contradicting,
            },
            entity_quality_score: quality,
            sensationalism_score: sensationalism,
        };
    }

    // Highly sensational language over weak entities reads as fabricated.
    if sensationalism > FAKE_SENSATIONALISM_MIN && quality < FAKE_ENTITY_QUALITY_MAX {
        return Verdict {
            verdict: VerdictLabel::Fake,
            confidence: 65,
            reasoning: format!(
                "The claim combines highly sensational language ({}/100) with \
                 low-quality entities ({}/100), a pattern typical of fabricated claims, \
                 and no source contradicted that reading.",
                sensationalism, quality
            ),
            sources_analyzed: SourcesAnalyzed {
                supporting,
                contradicting,
            },
            entity_quality_score: quality,
            sensationalism_score: sensationalism,
        };
    }

    if supporting.len() >= 2 && quality > REAL_ENTITY_QUALITY_MIN {
        let confidence = (70 + 5 * supporting.len().min(4) as u8).min(90);
        return Verdict {
            verdict: VerdictLabel::Real,
            confidence,
            reasoning: format!(
                "{} independent sources align with the claim and entity quality \
                 is strong ({}/100).",
                supporting.len(),
                quality
            ),
            sources_analyzed: SourcesAnalyzed {
                supporting,
                contradicting,
            },
            entity_quality_score: quality,
            sensationalism_score: sensationalism,
        };
    }

    if supporting.len() == 1 && quality > REAL_ENTITY_QUALITY_MIN {
        return Verdict {
            verdict: VerdictLabel::Real,
            confidence: 60,
            reasoning: format!(
                "A single source aligns with the claim and entity quality is \
                 strong ({}/100); confidence is limited by the evidence volume.",
                quality
            ),
            sources_analyzed: SourcesAnalyzed {
                supporting,
                contradicting,
            },
            entity_quality_score: quality,
            sensationalism_score: sensationalism,
        };
    }

    let reasoning = format!(
        "Evidence was inconclusive: {} supporting and {} contradicting sources \
         out of {} scraped, with entity quality {}/100.",
        supporting.len(),
        contradicting.len(),
        findings.total_sources_scraped,
        quality
    );
    Verdict {
        verdict: VerdictLabel::Unverified,
        confidence: 40,
        reasoning,
        sources_analyzed: SourcesAnalyzed {
            supporting,
            contradicting,
        },
        entity_quality_score: quality,
        sensationalism_score: sensationalism,
    }
}

fn unverified(analysis: &ClaimAnalysis, reasoning: &str) -> Verdict {
    Verdict {
        verdict: VerdictLabel::Unverified,
        confidence: 30,
        reasoning: reasoning.to_string(),
        sources_analyzed: SourcesAnalyzed::default(),
        entity_quality_score: analysis.entity_quality_score,
        sensationalism_score: analysis.sensationalism_score,
    }
}

enum SourceStance {
    Supports,
    Contradicts,
    Neutral,
}

/// Classify one source by how well its summary aligns with the claim's
/// entities and whether it carries debunking language.
fn classify_source(analysis: &ClaimAnalysis, source: &EvidenceSource) -> SourceStance {
    let alignment = entity_alignment(analysis, &source.summary);
    if alignment < ALIGNMENT_THRESHOLD {
        return SourceStance::Neutral;
    }

    let lower = source.summary.to_lowercase();
    let negated = CONTRADICTION_CUES.iter().any(|cue| lower.contains(cue));
    if negated {
        SourceStance::Contradicts
    } else {
        SourceStance::Supports
    }
}

/// Confidence-weighted fraction of claim entities mentioned in the text.
fn entity_alignment(analysis: &ClaimAnalysis, text: &str) -> f64 {
    if analysis.entities.is_empty() {
        return 0.0;
    }

    let total_weight: f64 = analysis.entities.iter().map(|e| e.confidence).sum();
    if total_weight == 0.0 {
        return 0.0;
    }

    let mentioned_weight: f64 = analysis
        .entities
        .iter()
        .filter(|e| mentions(text, &e.text))
        .map(|e| e.confidence)
        .sum();

    mentioned_weight / total_weight
}

/// Fuzzy containment: does `text` mention `phrase`?
///
/// Compares the phrase against every window of the same word count,
/// tolerating inflection and punctuation differences that exact substring
/// matching would miss.
fn mentions(text: &str, phrase: &str) -> bool {
    let phrase_lower = phrase.to_lowercase();
    let text_lower = text.to_lowercase();

    if text_lower.contains(&phrase_lower) {
        return true;
    }

    let words: Vec<&str> = text_lower.split_whitespace().collect();
    let width = phrase_lower.split_whitespace().count().max(1);
    if words.len() < width {
        return false;
    }

    words.windows(width).any(|window| {
        let candidate = window.join(" ");
        let candidate = candidate.trim_matches(|c: char| !c.is_alphanumeric());
        jaro_winkler(candidate, &phrase_lower) >= MENTION_THRESHOLD
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::verdict::Entity;

    fn analysis(quality: u8, sensationalism: u8, entities: &[(&str, f64)]) -> ClaimAnalysis {
        ClaimAnalysis {
            entities: entities
                .iter()
                .map(|(text, confidence)| Entity {
                    text: text.to_string(),
                    label: "proper_noun".to_string(),
                    confidence: *confidence,
                })
                .collect(),
            entity_count: entities.len(),
            entity_quality_score: quality,
            sensationalism_score: sensationalism,
            analysis: String::new(),
            warning: None,
        }
    }

    fn source(url: &str, summary: &str) -> EvidenceSource {
        EvidenceSource {
            url: url.to_string(),
            source_name: "test".to_string(),
            summary: summary.to_string(),
            scraped_successfully: true,
        }
    }

    fn findings(status: ResearchStatus, sources: Vec<EvidenceSource>) -> ResearchFindings {
        let scraped = sources.iter().filter(|s| s.scraped_successfully).count();
        ResearchFindings {
            status,
            entities_searched: Vec::new(),
            search_query: None,
            total_sources_found: sources.len(),
            total_sources_scraped: scraped,
            sources,
        }
    }

    #[test]
    fn test_insufficient_entities_is_unverified() {
        let a = analysis(10, 20, &[]);
        let f = findings(ResearchStatus::InsufficientEntities, vec![]);
        let verdict = decide(&a, &f);
        assert_eq!(verdict.verdict, VerdictLabel::Unverified);
        assert!(!verdict.reasoning.is_empty());
    }

    #[test]
    fn test_research_failure_is_unverified() {
        let a = analysis(70, 20, &[("Angela Merkel", 0.7)]);
        let f = findings(ResearchStatus::ResearchFailed, vec![]);
        assert_eq!(decide(&a, &f).verdict, VerdictLabel::Unverified);
    }

    #[test]
    fn test_two_supporting_sources_is_real() {
        let a = analysis(70, 10, &[("Angela Merkel", 0.7), ("Paris", 0.5)]);
        let f = findings(
            ResearchStatus::ResearchComplete,
            vec![
                source(
                    "https://reuters.com/1",
                    "Angela Merkel arrived in Paris for the summit.",
                ),
                source(
                    "https://apnews.com/2",
                    "During her Paris visit, Angela Merkel met officials.",
                ),
            ],
        );
        let verdict = decide(&a, &f);
        assert_eq!(verdict.verdict, VerdictLabel::Real);
        assert_eq!(verdict.sources_analyzed.supporting.len(), 2);
        assert!(verdict.confidence >= 70);
    }

    #[test]
    fn test_contradicting_sources_win() {
        let a = analysis(70, 10, &[("Angela Merkel", 0.7), ("Paris", 0.5)]);
        let f = findings(
            ResearchStatus::ResearchComplete,
            vec![
                source(
                    "https://factcheck.org/1",
                    "Fact check: the Angela Merkel Paris story is false and has been debunked.",
                ),
                source(
                    "https://example.com/2",
                    "Angela Merkel spoke in Paris yesterday.",
                ),
            ],
        );
        let verdict = decide(&a, &f);
        assert_eq!(verdict.verdict, VerdictLabel::Fake);
        assert_eq!(verdict.sources_analyzed.contradicting.len(), 1);
    }

    #[test]
    fn test_sensational_low_quality_is_fake() {
        let a = analysis(20, 85, &[("Dragon", 0.4)]);
        let f = findings(
            ResearchStatus::ResearchComplete,
            vec![source("https://example.com/1", "Something unrelated entirely.")],
        );
        assert_eq!(decide(&a, &f).verdict, VerdictLabel::Fake);
    }

    #[test]
    fn test_neutral_evidence_is_unverified() {
        let a = analysis(70, 10, &[("Angela Merkel", 0.7)]);
        let f = findings(
            ResearchStatus::ResearchComplete,
            vec![source(
                "https://example.com/1",
                "An article about unrelated gardening topics.",
            )],
        );
        assert_eq!(decide(&a, &f).verdict, VerdictLabel::Unverified);
    }

    #[test]
    fn test_failed_scrapes_not_counted_as_evidence() {
        let a = analysis(70, 10, &[("Angela Merkel", 0.7)]);
        let mut bad = source("https://example.com/1", "");
        bad.scraped_successfully = false;
        let f = findings(ResearchStatus::ResearchComplete, vec![bad]);
        let verdict = decide(&a, &f);
        assert_eq!(verdict.verdict, VerdictLabel::Unverified);
        assert!(verdict.sources_analyzed.supporting.is_empty());
    }

    #[test]
    fn test_mentions_exact_and_fuzzy() {
        assert!(mentions("Angela Merkel arrived today", "Angela Merkel"));
        assert!(mentions("angela merkel arrived today", "Angela Merkel"));
        // Inflected / possessive form.
        assert!(mentions("Merkels speech drew applause", "Merkel"));
        assert!(!mentions("The weather was pleasant", "Angela Merkel"));
    }

    #[test]
    fn test_verdict_label_serialization() {
        assert_eq!(VerdictLabel::Real.to_string(), "REAL");
        assert_eq!(
            serde_json::to_value(VerdictLabel::Unverified).unwrap(),
            serde_json::json!("UNVERIFIED")
        );
    }
}
