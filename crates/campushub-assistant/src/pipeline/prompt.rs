//! Grounded prompt composition
//!
//! Deterministic string building with named sections in a fixed order. The
//! classifier flags are applied independently; none of the sections assume
//! another one is absent. Article content is embedded verbatim so the model
//! can only cite what it was actually given.

use super::classifier::ClassificationFlags;
use crate::articles::{distinct_categories, RetrievedArticle};

/// Most categories ever listed in guidance sections
const MAX_SUGGESTED_CATEGORIES: usize = 5;

const ROLE_STATEMENT: &str = "You are the wiki assistant for a university community platform. \
Answer questions using only the wiki articles provided below. \
Be concise, factual, and friendly.";

const CITATION_MANDATE: &str = "When you use information from an article, cite it inline as \
[title](wiki:slug). Only cite articles that appear in the ARTICLES section. \
Never invent a citation.";

const RECOMMENDATION_RULES: &str = "The user is asking for recommendations. Present them as a \
short bulleted list, one article per bullet, each with its citation and a \
one-sentence reason. Do not exceed five bullets.";

const CLARIFICATION_RULES: &str = "The retrieved articles span several topics and none clearly \
dominates. Before answering in depth, ask one short clarifying question that \
names the candidate topics. Example: \"Are you asking about housing rules or \
academic regulations?\" Then give a brief provisional answer for the most \
likely reading.";

const SYNTHESIS_NOTE: &str = "The articles below come from more than one category. Synthesize \
across them rather than answering from a single article, and make clear which \
article supports which part of the answer.";

/// Compose the full instruction text for one turn
pub fn compose(
    retrieved: &[RetrievedArticle],
    flags: ClassificationFlags,
    available_categories: &[String],
) -> String {
    let mut prompt = String::new();

    prompt.push_str(ROLE_STATEMENT);
    prompt.push_str("\n\n");
    prompt.push_str(CITATION_MANDATE);

    if retrieved.is_empty() {
        prompt.push_str("\n\nNO RESULTS: No wiki article matched this question. Say so \
plainly, do not guess, and invite the user to browse these categories instead: ");
        prompt.push_str(&category_list(available_categories));
        prompt.push('.');
    }

    if flags.is_recommendation {
        prompt.push_str("\n\n");
        prompt.push_str(RECOMMENDATION_RULES);
    }

    if flags.is_ambiguous {
        prompt.push_str("\n\n");
        prompt.push_str(CLARIFICATION_RULES);
    }

    if flags.is_out_of_scope {
        prompt.push_str("\n\nOUT OF SCOPE: This question does not appear to be about the \
university wiki. Politely say the assistant only covers the campus wiki and \
point the user at these categories: ");
        prompt.push_str(&category_list(available_categories));
        prompt.push('.');
    }

    if distinct_categories(retrieved).len() >= 2 {
        prompt.push_str("\n\n");
        prompt.push_str(SYNTHESIS_NOTE);
    }

    if !retrieved.is_empty() {
        prompt.push_str("\n\nARTICLES:");
        for r in retrieved {
            // Verbatim, never summarized: citation linking depends on the
            // model seeing the exact excerpt text.
            prompt.push_str(&format!(
                "\n\n---\ntitle: {}\ncategory: {}\nslug: {}\n\n{}",
                r.article.title, r.article.category, r.article.slug, r.relevant_content
            ));
        }
    }

    prompt
}

fn category_list(categories: &[String]) -> String {
    if categories.is_empty() {
        return "the wiki home page".to_string();
    }
    categories
        .iter()
        .take(MAX_SUGGESTED_CATEGORIES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
