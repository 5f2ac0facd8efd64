//! Keyword-driven repository filtering and categorization.
//!
//! A repository passes the filter when it matches at least one include
//! keyword and no exclude keyword. Passing repositories are tagged with
//! every category whose keyword list matches, a primary category chosen by
//! match frequency, and a match score counting hits across the include list
//! and every category list. Keywords shared between lists count once per
//! list; the score is deliberately not deduplicated.

use crate::config::KeywordConfig;
use crate::models::{ClassifiedRepo, RepoMetadata};

/// Filters and categorizes repositories based on keyword rules.
pub struct Classifier {
    keywords: KeywordConfig,
}

impl Classifier {
    pub fn new(keywords: KeywordConfig) -> Self {
        Self { keywords }
    }

    /// Filter and categorize repositories.
    ///
    /// Returns only repositories that pass the filter; non-passing repos
    /// are dropped silently.
    pub fn classify(&self, repos: &[RepoMetadata]) -> Vec<ClassifiedRepo> {
        repos
            .iter()
            .filter(|repo| self.matches_include(repo) && !self.matches_exclude(repo))
            .map(|repo| {
                let search_text = build_search_text(repo);
                let categories = self.assign_categories(&search_text);
                let primary_category = self.select_primary_category(&search_text, &categories);
                let match_score = self.calculate_match_score(&search_text);

                ClassifiedRepo {
                    metadata: repo.clone(),
                    categories,
                    primary_category,
                    match_score,
                }
            })
            .collect()
    }

    fn matches_include(&self, repo: &RepoMetadata) -> bool {
        let search_text = build_search_text(repo);
        self.keywords
            .include
            .iter()
            .any(|keyword| matches_keyword(&search_text, keyword))
    }

    fn matches_exclude(&self, repo: &RepoMetadata) -> bool {
        let search_text = build_search_text(repo);
        self.keywords
            .exclude
            .iter()
            .any(|keyword| matches_keyword(&search_text, keyword))
    }

    /// Assign every category with at least one keyword hit, in declaration
    /// order. Each category is added at most once.
    fn assign_categories(&self, search_text: &str) -> Vec<String> {
        self.keywords
            .categories
            .iter()
            .filter(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|keyword| matches_keyword(search_text, keyword))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Pick the assigned category with the most keyword hits. Ties keep the
    /// earliest assigned category, which is the first-declared one.
    fn select_primary_category(&self, search_text: &str, categories: &[String]) -> String {
        let Some(first) = categories.first() else {
            return String::new();
        };

        let mut max_matches = 0;
        let mut primary = first.clone();

        for name in categories {
            let matches = self
                .keywords
                .categories
                .get(name)
                .map(|keywords| {
                    keywords
                        .iter()
                        .filter(|keyword| matches_keyword(search_text, keyword))
                        .count()
                })
                .unwrap_or(0);

            if matches > max_matches {
                max_matches = matches;
                primary = name.clone();
            }
        }

        primary
    }

    /// Total keyword hits across the include list and all category lists.
    fn calculate_match_score(&self, search_text: &str) -> u32 {
        let include_hits = self
            .keywords
            .include
            .iter()
            .filter(|keyword| matches_keyword(search_text, keyword))
            .count();

        let category_hits: usize = self
            .keywords
            .categories
            .values()
            .map(|keywords| {
                keywords
                    .iter()
                    .filter(|keyword| matches_keyword(search_text, keyword))
                    .count()
            })
            .sum();

        (include_hits + category_hits) as u32
    }
}

// Pure function: lowercase concatenation of name, description, and topics
fn build_search_text(repo: &RepoMetadata) -> String {
    let mut parts = vec![repo.name.as_str(), repo.description.as_str()];
    parts.extend(repo.topics.iter().map(String::as_str));
    parts.join(" ").to_lowercase()
}

/// Keyword matching with word boundaries.
///
/// Hyphenated keywords like "machine-learning" match by substring
/// containment. Single words match whole tokens after punctuation trimming,
/// accepting the naive plural and, for keywords of four or more bytes, any
/// token the keyword is a prefix of ("agent" matches "agentic").
fn matches_keyword(text: &str, keyword: &str) -> bool {
    let keyword = keyword.to_lowercase();
    let text = text.to_lowercase();

    if keyword.contains('-') {
        return text.contains(&keyword);
    }

    let plural = format!("{}s", keyword);
    text.split_whitespace().any(|word| {
        let word = word.trim_matches(|c: char| ".,;:!?()[]{}\"'".contains(c));

        word == keyword
            || word == plural
            || (keyword.len() >= 4 && word.starts_with(keyword.as_str()))
    })
}
