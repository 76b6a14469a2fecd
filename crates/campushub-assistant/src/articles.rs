//! Knowledge-base article types shared across the pipeline

use serde::{Deserialize, Serialize};

/// A wiki article as exposed by the knowledge base.
///
/// The knowledge base is read-only from the assistant's point of view;
/// articles are loaded by the surrounding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Citation pointer persisted alongside assistant messages.
///
/// Denormalized at persistence time so historical messages stay valid even
/// if the source article is later renamed or recategorized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSource {
    pub title: String,
    pub slug: String,
    pub category: String,
}

impl From<&Article> for ArticleSource {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            slug: article.slug.clone(),
            category: article.category.clone(),
        }
    }
}

/// Where a retrieval hit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalSource {
    Keyword,
    Category,
    TitleMatch,
}

/// Transient retrieval result, produced fresh per query and never persisted
#[derive(Debug, Clone)]
pub struct RetrievedArticle {
    pub article: Article,
    /// Excerpt of the article judged relevant to the query, verbatim
    pub relevant_content: String,
    /// Relevance score in [0, 100], higher is better
    pub relevance_score: f64,
    pub source: RetrievalSource,
}

impl RetrievedArticle {
    pub fn citation(&self) -> ArticleSource {
        ArticleSource::from(&self.article)
    }
}

/// Distinct categories among retrieved articles, in first-seen order
pub fn distinct_categories(retrieved: &[RetrievedArticle]) -> Vec<&str> {
    let mut seen = Vec::new();
    for r in retrieved {
        let cat = r.article.category.as_str();
        if !seen.contains(&cat) {
            seen.push(cat);
        }
    }
    seen
}
