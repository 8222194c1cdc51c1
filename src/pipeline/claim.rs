//! Claim analysis stage.
//!
//! Extracts named entities from the claim text and scores the language
//! for sensationalism. Entity quality gates the research stage: a claim
//! with no usable entities is not worth spending network calls on.

use crate::models::verdict::{ClaimAnalysis, Entity};

pub const WARNING_NO_ENTITIES: &str = "NO_ENTITIES";
pub const WARNING_LOW_QUALITY: &str = "LOW_QUALITY_ENTITIES";

/// Entity quality below this is considered unusable for research.
pub const MIN_ENTITY_QUALITY: u8 = 30;

const INTENSIFIERS: &[&str] = &[
    "very",
    "extremely",
    "highly",
    "incredibly",
    "absolutely",
    "totally",
    "completely",
    "utterly",
    "unbelievably",
    "insanely",
    "literally",
    "massive",
    "huge",
    "enormous",
    "unprecedented",
];

const SENSATIONAL_VERBS: &[&str] = &[
    "slam",
    "slams",
    "slammed",
    "blast",
    "blasts",
    "blasted",
    "destroy",
    "destroys",
    "destroyed",
    "demolish",
    "demolished",
    "crush",
    "crushed",
    "annihilate",
    "annihilated",
    "shock",
    "shocks",
    "shocked",
    "stun",
    "stuns",
    "stunned",
    "expose",
    "exposes",
    "exposed",
    "reveal",
    "reveals",
    "revealed",
];

const EMOTIONAL_ADJECTIVES: &[&str] = &[
    "shocking",
    "devastating",
    "horrifying",
    "terrifying",
    "amazing",
    "incredible",
    "unbelievable",
    "outrageous",
    "scandalous",
    "explosive",
    "bombshell",
    "historic",
    "catastrophic",
    "tragic",
    "miraculous",
];

const HEDGING_WORDS: &[&str] = &[
    "allegedly",
    "reportedly",
    "supposedly",
    "apparently",
    "seemingly",
    "rumored",
    "unconfirmed",
    "unverified",
];

/// Common words that start sentences without naming anything.
const COMMON_SENTENCE_STARTERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "it", "he", "she", "they", "we", "you",
    "i", "in", "on", "at", "there", "here", "now", "today", "yesterday", "breaking", "new",
    "after", "before", "when", "while", "if", "but", "and", "or", "so",
];

/// Analyze a claim: extract entities and score the language.
pub fn analyze(claim: &str) -> ClaimAnalysis {
    let entities = extract_entities(claim);
    let entity_quality_score = entity_quality(&entities);
    let sensationalism_score = sensationalism(claim);

    let warning = if entities.is_empty() {
        Some(WARNING_NO_ENTITIES.to_string())
    } else if entity_quality_score < MIN_ENTITY_QUALITY {
        Some(WARNING_LOW_QUALITY.to_string())
    } else {
        None
    };

    let analysis = match entities.first() {
        Some(top) => format!(
            "Extracted {} entities (top: \"{}\") with quality {}/100. Sensationalism score {}/100.",
            entities.len(),
            top.text,
            entity_quality_score,
            sensationalism_score
        ),
        None => format!(
            "No usable entities found in claim. Sensationalism score {}/100.",
            sensationalism_score
        ),
    };

    ClaimAnalysis {
        entity_count: entities.len(),
        entities,
        entity_quality_score,
        sensationalism_score,
        analysis,
        warning,
    }
}

struct Token<'a> {
    text: &'a str,
    sentence_initial: bool,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut sentence_initial = true;
    for raw in text.split_whitespace() {
        let trimmed = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '%' && c != '.');
        let trimmed = trimmed.trim_end_matches('.');
        if !trimmed.is_empty() {
            tokens.push(Token {
                text: trimmed,
                sentence_initial,
            });
        }
        sentence_initial = raw.ends_with('.') || raw.ends_with('!') || raw.ends_with('?');
    }
    tokens
}

fn is_capitalized(word: &str) -> bool {
    word.chars()
        .next()
        .map(|c| c.is_uppercase())
        .unwrap_or(false)
}

fn is_acronym(word: &str) -> bool {
    word.len() >= 2
        && word.len() <= 6
        && word.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        && word.chars().any(|c| c.is_ascii_uppercase())
}

/// Extract entities: proper-noun runs, years, and quantities.
///
/// Confidence scoring mirrors the factors that matter for verification:
/// multi-word names are more specific, acronyms usually name
/// organizations, and a lone capitalized sentence starter is often just
/// grammar.
fn extract_entities(text: &str) -> Vec<Entity> {
    let tokens = tokenize(text);
    let mut entities: Vec<Entity> = Vec::new();

    // Proper-noun runs
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let starts_run = is_capitalized(token.text) || is_acronym(token.text);
        if !starts_run {
            i += 1;
            continue;
        }

        let mut j = i;
        while j < tokens.len() && (is_capitalized(tokens[j].text) || is_acronym(tokens[j].text)) {
            j += 1;
        }
        let words: Vec<&str> = tokens[i..j].iter().map(|t| t.text).collect();
        let run_len = words.len();
        let phrase = words.join(" ");

        // A lone capitalized common word at a sentence start is grammar,
        // not a name.
        let lone_starter = run_len == 1
            && token.sentence_initial
            && COMMON_SENTENCE_STARTERS.contains(&token.text.to_lowercase().as_str());

        if !lone_starter {
            let mut confidence: f64 = 0.5;
            if run_len >= 2 {
                confidence += 0.2;
            }
            if run_len >= 3 {
                confidence += 0.1;
            }
            if words.iter().any(|w| is_acronym(w)) {
                confidence += 0.1;
            }
            if run_len == 1 && token.sentence_initial {
                confidence -= 0.1;
            }
            entities.push(Entity {
                text: phrase,
                label: "proper_noun".to_string(),
                confidence: confidence.clamp(0.0, 1.0),
            });
        }
        i = j;
    }

    // Years and quantities
    for token in &tokens {
        if let Ok(value) = token.text.parse::<i64>() {
            if (1500..=2100).contains(&value) {
                entities.push(Entity {
                    text: token.text.to_string(),
                    label: "year".to_string(),
                    confidence: 0.4,
                });
                continue;
            }
        }
        let numeric = token.text.ends_with('%')
            || token
                .text
                .replace(',', "")
                .parse::<f64>()
                .map(|_| true)
                .unwrap_or(false);
        if numeric && token.text.chars().any(|c| c.is_ascii_digit()) {
            entities.push(Entity {
                text: token.text.to_string(),
                label: "quantity".to_string(),
                confidence: 0.3,
            });
        }
    }

    // Deduplicate case-insensitively, keeping the highest confidence.
    let mut deduped: Vec<Entity> = Vec::new();
    for entity in entities {
        let key = entity.text.to_lowercase();
        match deduped.iter_mut().find(|e| e.text.to_lowercase() == key) {
            Some(existing) => {
                if entity.confidence > existing.confidence {
                    *existing = entity;
                }
            }
            None => deduped.push(entity),
        }
    }

    deduped.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    deduped
}

/// Combined entity quality score (0-100): type diversity, proper-noun
/// ratio, and mean confidence.
fn entity_quality(entities: &[Entity]) -> u8 {
    if entities.is_empty() {
        return 0;
    }

    let mut labels: Vec<&str> = entities.iter().map(|e| e.label.as_str()).collect();
    labels.sort_unstable();
    labels.dedup();
    let diversity = labels.len() as f64 / 3.0;

    let proper_count = entities.iter().filter(|e| e.label == "proper_noun").count();
    let proper_ratio = proper_count as f64 / entities.len() as f64;

    let avg_confidence =
        entities.iter().map(|e| e.confidence).sum::<f64>() / entities.len() as f64;

    let score = diversity * 30.0 + proper_ratio * 40.0 + avg_confidence * 30.0;
    score.round().clamp(0.0, 100.0) as u8
}

/// Sensationalism score (0-100) from lexical and punctuation markers.
fn sensationalism(text: &str) -> u8 {
    let tokens = tokenize(text);
    let token_count = tokens.len().max(1) as f64;

    let lower: Vec<String> = tokens.iter().map(|t| t.text.to_lowercase()).collect();

    let count_in = |list: &[&str]| lower.iter().filter(|w| list.contains(&w.as_str())).count();

    let intensifiers = count_in(INTENSIFIERS);
    let emotional = count_in(EMOTIONAL_ADJECTIVES);
    let sensational_verbs = count_in(SENSATIONAL_VERBS);
    let hedging = count_in(HEDGING_WORDS);

    let exclamations = text.matches('!').count();
    let questions = text.matches('?').count();
    let caps_words = tokens
        .iter()
        .filter(|t| t.text.len() > 1 && t.text.chars().all(|c| c.is_ascii_uppercase()))
        .count();

    // Density-scaled subscores, each capped.
    let emotional_score = (((intensifiers + emotional) as f64 / token_count) * 150.0).min(25.0);
    let verb_score = ((sensational_verbs as f64 / token_count) * 200.0).min(20.0);
    let exclamation_score = (exclamations as f64 * 5.0).min(15.0);
    let hedging_score = (hedging as f64 * 4.0).min(15.0);
    let caps_score = (caps_words as f64 * 3.0).min(15.0);
    let question_score = (questions as f64 * 2.0).min(10.0);

    let total = emotional_score
        + verb_score
        + exclamation_score
        + hedging_score
        + caps_score
        + question_score;
    total.round().clamp(0.0, 100.0) as u8
}
