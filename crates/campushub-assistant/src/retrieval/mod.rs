//! Knowledge retrieval
//!
//! The retriever is the only consumer of the knowledge base. It maps a query
//! string to a ranked list of articles with extracted excerpts and relevance
//! scores in [0, 100]. Zero matches is an empty list, never an error.

mod snippet;

pub use snippet::extract_excerpt;

use crate::articles::{Article, RetrievalSource, RetrievedArticle};
use crate::error::Result;
use async_trait::async_trait;

/// Maximum excerpt length passed to the prompt composer
const EXCERPT_MAX_LEN: usize = 1200;

/// Minimum score for an article to be reported at all
const SCORE_FLOOR: f64 = 5.0;

/// Retrieval seam for the pipeline.
///
/// Implementations must be deterministic for identical content and query so
/// the downstream classifier and composer are testable.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedArticle>>;
}

/// Keyword-overlap retriever over an in-memory article set.
///
/// Scores combine term hits in the title (weighted heavily), the slug, and
/// the body, normalized into [0, 100]. Ties break on slug so the ordering is
/// stable across runs.
pub struct KeywordRetriever {
    articles: Vec<Article>,
    limit: usize,
}

impl KeywordRetriever {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles, limit: 8 }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// All categories present in the article set, deduplicated, sorted
    pub fn categories(&self) -> Vec<String> {
        let mut cats: Vec<String> = self
            .articles
            .iter()
            .map(|a| a.category.clone())
            .collect();
        cats.sort();
        cats.dedup();
        cats
    }

    fn score(article: &Article, terms: &[String]) -> (f64, RetrievalSource) {
        if terms.is_empty() {
            return (0.0, RetrievalSource::Keyword);
        }

        let title = article.title.to_lowercase();
        let slug = article.slug.to_lowercase();
        let body = article.content.to_lowercase();

        let mut title_hits = 0usize;
        let mut slug_hits = 0usize;
        let mut body_hits = 0usize;

        for term in terms {
            if title.contains(term.as_str()) {
                title_hits += 1;
            }
            if slug.contains(term.as_str()) {
                slug_hits += 1;
            }
            if body.contains(term.as_str()) {
                body_hits += 1;
            }
        }

        let total = terms.len() as f64;
        let raw = (title_hits as f64 * 3.0 + slug_hits as f64 * 2.0 + body_hits as f64)
            / (total * 6.0);
        let score = (raw * 100.0).min(100.0);

        let source = if title_hits > 0 {
            RetrievalSource::TitleMatch
        } else {
            RetrievalSource::Keyword
        };
        (score, source)
    }
}

#[async_trait]
impl KnowledgeRetriever for KeywordRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedArticle>> {
        let terms = tokenize(query);

        let mut hits: Vec<RetrievedArticle> = self
            .articles
            .iter()
            .filter_map(|article| {
                let (score, source) = Self::score(article, &terms);
                if score < SCORE_FLOOR {
                    return None;
                }
                Some(RetrievedArticle {
                    relevant_content: extract_excerpt(&article.content, query, EXCERPT_MAX_LEN),
                    article: article.clone(),
                    relevance_score: score,
                    source,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.article.slug.cmp(&b.article.slug))
        });
        hits.truncate(self.limit);

        tracing::debug!(
            "Retrieved {} articles for query ({} terms)",
            hits.len(),
            terms.len()
        );
        Ok(hits)
    }
}

/// Lowercased query terms, stopwords and short tokens dropped
fn tokenize(query: &str) -> Vec<String> {
    const STOPWORDS: &[&str] = &[
        "the", "and", "for", "with", "what", "how", "can", "about", "where", "when", "who",
        "are", "does", "should",
    ];

    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3 && !STOPWORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}
