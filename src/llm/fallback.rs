//! Deterministic commentary used when no LLM is reachable.
//!
//! Produces the same sections the API client would, filled from the summary
//! numbers alone, so a missing API key or an exhausted retry budget still
//! yields a complete report.

use crate::llm::{Commentary, Highlight};
use crate::summary::Summary;
use indexmap::IndexMap;

const FALLBACK_TONE: &str = "neutral-analytical";
const FALLBACK_HIGHLIGHT_COUNT: usize = 3;

pub fn template_fallback(summary: &Summary) -> Commentary {
    Commentary {
        intro: intro_text(summary),
        category_notes: category_notes(summary),
        dark_horse_notes: dark_horse_text(summary),
        repeaters_notes: repeaters_text(summary),
        highlights: highlight_comments(summary),
    }
}

fn intro_text(summary: &Summary) -> String {
    format!(
        "This report analyzes the top {} {} repositories based on {}-day star growth metrics. \
         The analysis covers {} categories across multiple programming languages.",
        summary.meta.top_n,
        summary.meta.filter_domain,
        summary.meta.window_days,
        summary.categories.len()
    )
}

fn category_notes(summary: &Summary) -> IndexMap<String, String> {
    summary
        .categories
        .iter()
        .map(|cat| {
            let note = format!(
                "This category contains {} repositories with an average Heat_7 of {:.0} stars \
                 and average score of {:.0}.",
                cat.count, cat.avg_heat_7, cat.avg_score
            );
            (cat.name.clone(), note)
        })
        .collect()
}

fn dark_horse_text(summary: &Summary) -> String {
    if summary.dark_horses.is_empty() {
        return "No dark horse projects identified in this period.".to_string();
    }

    format!(
        "Identified {} dark horse projects showing exceptional scores in star growth, \
         indicating rapidly emerging interest from the developer community.",
        summary.dark_horses.len()
    )
}

fn repeaters_text(summary: &Summary) -> String {
    if summary.repeaters.is_empty() {
        return "No repeater projects identified in this period.".to_string();
    }

    format!(
        "Found {} projects with consecutive appearances in top rankings, \
         demonstrating sustained community interest and development momentum.",
        summary.repeaters.len()
    )
}

fn highlight_comments(summary: &Summary) -> Vec<Highlight> {
    summary
        .top_repos
        .iter()
        .take(FALLBACK_HIGHLIGHT_COUNT)
        .map(|repo| Highlight {
            repo: repo.repo_key.clone(),
            comment: format!(
                "Ranked #{} with {} stars gained in the last {} days. Category: {}. \
                 Language: {}. Score: {}.",
                repo.rank,
                repo.heat_7,
                summary.meta.short_window_days,
                repo.category,
                repo.language,
                repo.score
            ),
            tone: FALLBACK_TONE.to_string(),
        })
        .collect()
}
