//! Query intent classification
//!
//! Derives independent boolean signals from the query and its retrieval
//! results. The flags are deliberately non-exclusive; the prompt composer
//! applies each section on its own.

use crate::articles::RetrievedArticle;
use lazy_static::lazy_static;
use regex::Regex;

/// Scores within this many points of the top result count as comparable
const AMBIGUITY_WINDOW: f64 = 10.0;

/// Minimum relevance for a result to anchor the query in scope
const MIN_RELEVANCE: f64 = 30.0;

/// Terms that tie a query to the campus domain even with weak retrieval
const DOMAIN_ANCHORS: &[&str] = &[
    "course", "courses", "class", "classes", "exam", "exams", "lecture", "semester", "campus",
    "library", "dorm", "dormitory", "housing", "professor", "faculty", "student", "students",
    "tuition", "scholarship", "registration", "enroll", "enrollment", "club", "society",
    "university", "degree", "thesis", "credits", "cafeteria", "wiki",
];

lazy_static! {
    static ref RECOMMENDATION_RE: Regex = Regex::new(
        r"(?i)\b(recommend|suggest|suggestions?|what should i (read|take|study|check)|which .{0,40}(should|would you)|best (articles?|pages?|resources?)|reading list|where (can|do) i start)\b"
    )
    .unwrap();
}

/// Classification signals for one query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationFlags {
    /// The user is asking for a list or suggestions
    pub is_recommendation: bool,
    /// Retrieval spread over multiple categories with no dominant result
    pub is_ambiguous: bool,
    /// Nothing relevant retrieved and no domain vocabulary in the query
    pub is_out_of_scope: bool,
}

/// Classify a query against its retrieval results
pub fn classify(query: &str, retrieved: &[RetrievedArticle]) -> ClassificationFlags {
    let flags = ClassificationFlags {
        is_recommendation: is_recommendation(query),
        is_ambiguous: is_ambiguous(retrieved),
        is_out_of_scope: is_out_of_scope(query, retrieved),
    };
    tracing::debug!(
        "classified query: recommendation={} ambiguous={} out_of_scope={}",
        flags.is_recommendation,
        flags.is_ambiguous,
        flags.is_out_of_scope
    );
    flags
}

fn is_recommendation(query: &str) -> bool {
    RECOMMENDATION_RE.is_match(query)
}

/// True when at least two categories sit within the ambiguity window of the
/// top score, i.e. the best result does not clearly dominate.
fn is_ambiguous(retrieved: &[RetrievedArticle]) -> bool {
    let Some(top) = retrieved.first() else {
        return false;
    };
    let threshold = top.relevance_score - AMBIGUITY_WINDOW;

    let mut contenders: Vec<&str> = retrieved
        .iter()
        .filter(|r| r.relevance_score >= threshold)
        .map(|r| r.article.category.as_str())
        .collect();
    contenders.sort_unstable();
    contenders.dedup();
    contenders.len() >= 2
}

fn is_out_of_scope(query: &str, retrieved: &[RetrievedArticle]) -> bool {
    let relevant_hit = retrieved.iter().any(|r| r.relevance_score >= MIN_RELEVANCE);
    if relevant_hit {
        return false;
    }

    let query_lower = query.to_lowercase();
    let anchored = query_lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|term| DOMAIN_ANCHORS.contains(&term));
    !anchored
}
