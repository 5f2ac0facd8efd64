//! Scoring and ranking pipeline for classified repositories.
//!
//! Transforms classified repos through pure stages: score → rank → limit.
//! Heat values pass through from the upstream snapshot counters; the
//! composite score weights intraday stars most heavily and converts the
//! weekly/monthly totals to daily-equivalent rates so the three terms are
//! comparable in magnitude.

use crate::models::{ClassifiedRepo, ScoredRepo};

/// Derive heat and composite score for every repository (pure).
///
/// `heat_7` and `heat_30` are taken directly from the weekly and monthly
/// star counters; they are trusted, not recomputed.
pub fn calculate_scores(repos: Vec<ClassifiedRepo>) -> Vec<ScoredRepo> {
    repos
        .into_iter()
        .map(|repo| {
            let heat_7 = repo.metadata.stars_this_week;
            let heat_30 = repo.metadata.stars_this_month;
            let total_stars = repo.metadata.stars;
            let score = composite_score(
                repo.metadata.stars_today,
                repo.metadata.stars_this_week,
                repo.metadata.stars_this_month,
            );

            ScoredRepo {
                repo,
                total_stars,
                heat_7,
                heat_30,
                score,
            }
        })
        .collect()
}

// Pure function: weighted composite, truncated to an integer.
// 0.6 × today + 0.3 × (week / 7) + 0.1 × (month / 30)
fn composite_score(stars_today: i64, stars_this_week: i64, stars_this_month: i64) -> i64 {
    let daily_rate = stars_today as f64;
    let weekly_avg_rate = stars_this_week as f64 / 7.0;
    let monthly_avg_rate = stars_this_month as f64 / 30.0;

    (daily_rate * 0.6 + weekly_avg_rate * 0.3 + monthly_avg_rate * 0.1) as i64
}

/// Sort repositories by (heat_30 desc, score desc) with a stable sort (pure).
///
/// Stability is load-bearing: repos with identical sort keys keep their
/// relative input order, so identical inputs rank identically across runs.
pub fn rank_repositories(mut repos: Vec<ScoredRepo>) -> Vec<ScoredRepo> {
    repos.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
    repos
}

/// Rank and truncate to the top N entries (pure).
///
/// Returns fewer than `top_n` entries when the input is shorter; short
/// input is not an error.
pub fn rank_and_select_top(repos: Vec<ScoredRepo>, top_n: usize) -> Vec<ScoredRepo> {
    rank_repositories(repos).into_iter().take(top_n).collect()
}
