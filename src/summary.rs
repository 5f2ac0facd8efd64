//! Aggregation of a ranked run into the compact summary document.
//!
//! The summary is the single source for both the LLM prompt and the
//! Markdown report, so every derived view of the run (category stats,
//! language mix, new repos, dark horses, repeaters, the ranked list) is
//! computed here once. Aggregation order is first-encounter order over the
//! ranked input, which keeps the document deterministic for a given run.

use crate::config::Settings;
use crate::history::History;
use crate::models::ScoredRepo;
use chrono::{Duration, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub run_date: String,
    pub window_days: i64,
    pub short_window_days: i64,
    pub top_n: usize,
    pub filter_domain: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub name: String,
    pub count: usize,
    pub avg_heat_7: f64,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageStats {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReposInfo {
    pub count: usize,
    pub threshold_days: i64,
    pub repos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DarkHorseInfo {
    pub repo_key: String,
    pub repo_name: String,
    pub url: String,
    pub score: i64,
    pub heat_30: i64,
    pub heat_7: i64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepeaterInfo {
    pub repo_key: String,
    pub repo_name: String,
    pub url: String,
    pub weeks_in_top: u32,
    pub current_heat_7: i64,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRepoInfo {
    pub rank: usize,
    pub repo_key: String,
    pub repo_name: String,
    pub url: String,
    pub category: String,
    pub language: String,
    pub heat_7: i64,
    pub heat_30: i64,
    pub score: i64,
    pub description: String,
}

/// Complete aggregated view of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub meta: MetaInfo,
    pub categories: Vec<CategoryStats>,
    pub languages: Vec<LanguageStats>,
    pub new_repos: NewReposInfo,
    pub dark_horses: Vec<DarkHorseInfo>,
    pub repeaters: Vec<RepeaterInfo>,
    pub top_repos: Vec<TopRepoInfo>,
}

/// Builds summaries from ranked repositories plus streak history.
pub struct SummaryBuilder {
    settings: Settings,
}

impl SummaryBuilder {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Aggregate one run. `top_repos` must already be ranked and truncated;
    /// ranks are assigned from its order.
    pub fn build(&self, top_repos: &[ScoredRepo], history: &History, run_date: &str) -> Summary {
        Summary {
            meta: self.build_meta(run_date),
            categories: self.aggregate_categories(top_repos),
            languages: self.aggregate_languages(top_repos),
            new_repos: self.identify_new_repos(top_repos),
            dark_horses: self.identify_dark_horses(top_repos),
            repeaters: self.identify_repeaters(top_repos, history),
            top_repos: self.build_top_repos(top_repos),
        }
    }

    fn build_meta(&self, run_date: &str) -> MetaInfo {
        MetaInfo {
            run_date: run_date.to_string(),
            window_days: self.settings.window_days,
            short_window_days: self.settings.short_window_days,
            top_n: self.settings.top_n,
            filter_domain: self.settings.filter_domain.clone(),
        }
    }

    fn aggregate_categories(&self, repos: &[ScoredRepo]) -> Vec<CategoryStats> {
        let mut sums: IndexMap<String, (usize, i64, i64)> = IndexMap::new();

        for repo in repos {
            let entry = sums
                .entry(repo.repo.primary_category.clone())
                .or_insert((0, 0, 0));
            entry.0 += 1;
            entry.1 += repo.heat_7;
            entry.2 += repo.score;
        }

        sums.into_iter()
            .map(|(name, (count, heat_7_sum, score_sum))| CategoryStats {
                name,
                count,
                avg_heat_7: heat_7_sum as f64 / count as f64,
                avg_score: score_sum as f64 / count as f64,
            })
            .collect()
    }

    fn aggregate_languages(&self, repos: &[ScoredRepo]) -> Vec<LanguageStats> {
        let mut counts: IndexMap<String, usize> = IndexMap::new();

        for repo in repos {
            *counts
                .entry(repo.repo.metadata.language.clone())
                .or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(name, count)| LanguageStats { name, count })
            .collect()
    }

    /// Repositories created within the threshold window. A repo whose
    /// creation date is unknown is never counted as new.
    fn identify_new_repos(&self, repos: &[ScoredRepo]) -> NewReposInfo {
        let threshold_date = Utc::now() - Duration::days(self.settings.new_repo_threshold_days);

        let new_repos: Vec<String> = repos
            .iter()
            .filter(|repo| {
                repo.repo
                    .metadata
                    .created_at
                    .is_some_and(|created| created > threshold_date)
            })
            .map(|repo| repo.key())
            .collect();

        NewReposInfo {
            count: new_repos.len(),
            threshold_days: self.settings.new_repo_threshold_days,
            repos: new_repos,
        }
    }

    fn identify_dark_horses(&self, repos: &[ScoredRepo]) -> Vec<DarkHorseInfo> {
        repos
            .iter()
            .filter(|repo| repo.score >= self.settings.dark_horse_accel_threshold)
            .map(|repo| DarkHorseInfo {
                repo_key: repo.key(),
                repo_name: repo.repo.metadata.name.clone(),
                url: repo.repo.metadata.url.clone(),
                score: repo.score,
                heat_30: repo.heat_30,
                heat_7: repo.heat_7,
                category: repo.repo.primary_category.clone(),
            })
            .collect()
    }

    /// Repos from the current top list with a streak of at least two runs.
    fn identify_repeaters(&self, repos: &[ScoredRepo], history: &History) -> Vec<RepeaterInfo> {
        repos
            .iter()
            .filter_map(|repo| {
                let key = repo.key();
                let entry = history.history.get(&key)?;
                if entry.weeks_in_top < 2 {
                    return None;
                }
                Some(RepeaterInfo {
                    repo_key: key,
                    repo_name: repo.repo.metadata.name.clone(),
                    url: repo.repo.metadata.url.clone(),
                    weeks_in_top: entry.weeks_in_top,
                    current_heat_7: repo.heat_7,
                    category: repo.repo.primary_category.clone(),
                })
            })
            .collect()
    }

    fn build_top_repos(&self, repos: &[ScoredRepo]) -> Vec<TopRepoInfo> {
        repos
            .iter()
            .enumerate()
            .map(|(i, repo)| TopRepoInfo {
                rank: i + 1,
                repo_key: repo.key(),
                repo_name: repo.repo.metadata.name.clone(),
                url: repo.repo.metadata.url.clone(),
                category: repo.repo.primary_category.clone(),
                language: repo.repo.metadata.language.clone(),
                heat_7: repo.heat_7,
                heat_30: repo.heat_30,
                score: repo.score,
                description: repo.repo.metadata.description.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::RepoHistory;
    use crate::models::{ClassifiedRepo, RepoMetadata};
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    fn settings() -> Settings {
        Settings {
            window_days: 30,
            short_window_days: 7,
            top_n: 10,
            new_repo_threshold_days: 90,
            dark_horse_accel_threshold: 100,
            cache_ttl_hours: 24,
            report_language: "en".to_string(),
            report_id_format: "YYYY-MM-weekN".to_string(),
            filter_domain: "AI".to_string(),
        }
    }

    fn repo(
        owner: &str,
        name: &str,
        language: &str,
        category: &str,
        heat_7: i64,
        heat_30: i64,
        score: i64,
    ) -> ScoredRepo {
        ScoredRepo {
            repo: ClassifiedRepo {
                metadata: RepoMetadata {
                    owner: owner.to_string(),
                    name: name.to_string(),
                    url: format!("https://github.com/{}/{}", owner, name),
                    description: format!("{} description", name),
                    language: language.to_string(),
                    topics: vec![],
                    stars: 0,
                    forks: 0,
                    stars_today: 0,
                    stars_this_week: heat_7,
                    stars_this_month: heat_30,
                    created_at: None,
                },
                categories: vec![category.to_string()],
                primary_category: category.to_string(),
                match_score: 1,
            },
            total_stars: 0,
            heat_7,
            heat_30,
            score,
        }
    }

    fn created(repo: ScoredRepo, at: DateTime<Utc>) -> ScoredRepo {
        let mut repo = repo;
        repo.repo.metadata.created_at = Some(at);
        repo
    }

    #[test]
    fn build_covers_every_section() {
        let now = Utc::now();
        let top = vec![
            created(
                repo("owner1", "repo1", "Python", "llm", 500, 2000, 150),
                now - Duration::days(200),
            ),
            created(
                repo("owner2", "repo2", "Go", "agent", 300, 1500, 80),
                now - Duration::days(30),
            ),
        ];

        let mut history = History::default();
        history.history.insert(
            "owner1/repo1".to_string(),
            RepoHistory {
                weeks_in_top: 3,
                last_seen_report: "2024-01-week2".to_string(),
                last_seen_date: "2024-01-14".to_string(),
                first_seen_report: "2023-12-week4".to_string(),
                first_seen_date: "2023-12-31".to_string(),
            },
        );

        let summary = SummaryBuilder::new(settings()).build(&top, &history, "2024-01-15");

        assert_eq!(summary.meta.run_date, "2024-01-15");
        assert_eq!(summary.meta.window_days, 30);
        assert_eq!(summary.meta.short_window_days, 7);
        assert_eq!(summary.meta.top_n, 10);
        assert_eq!(summary.meta.filter_domain, "AI");

        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.languages.len(), 2);
        assert_eq!(summary.new_repos.count, 1);
        assert_eq!(summary.new_repos.repos, vec!["owner2/repo2"]);
        assert_eq!(summary.dark_horses.len(), 1);
        assert_eq!(summary.dark_horses[0].repo_key, "owner1/repo1");
        assert_eq!(summary.repeaters.len(), 1);
        assert_eq!(summary.repeaters[0].weeks_in_top, 3);
        assert_eq!(summary.top_repos.len(), 2);
        assert_eq!(summary.top_repos[0].rank, 1);
    }

    #[test]
    fn categories_average_heat_and_score() {
        let top = vec![
            repo("a", "r1", "Python", "llm", 500, 0, 50),
            repo("b", "r2", "Python", "llm", 300, 0, 30),
            repo("c", "r3", "Go", "agent", 200, 0, 20),
        ];

        let summary = SummaryBuilder::new(settings()).build(&top, &History::default(), "2024-01-15");

        assert_eq!(summary.categories.len(), 2);
        let llm = &summary.categories[0];
        assert_eq!(llm.name, "llm");
        assert_eq!(llm.count, 2);
        assert_eq!(llm.avg_heat_7, 400.0);
        assert_eq!(llm.avg_score, 40.0);
    }

    #[test]
    fn categories_keep_first_encounter_order() {
        let top = vec![
            repo("a", "r1", "Python", "rag", 1, 0, 1),
            repo("b", "r2", "Python", "agent", 1, 0, 1),
            repo("c", "r3", "Python", "rag", 1, 0, 1),
            repo("d", "r4", "Python", "llm", 1, 0, 1),
        ];

        let summary = SummaryBuilder::new(settings()).build(&top, &History::default(), "2024-01-15");

        let names: Vec<&str> = summary.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["rag", "agent", "llm"]);
    }

    #[test]
    fn uncategorized_repos_share_one_empty_named_group() {
        let top = vec![
            repo("a", "r1", "Python", "", 400, 0, 40),
            repo("b", "r2", "Python", "llm", 100, 0, 10),
            repo("c", "r3", "Go", "", 200, 0, 20),
        ];

        let summary = SummaryBuilder::new(settings()).build(&top, &History::default(), "2024-01-15");

        assert_eq!(summary.categories.len(), 2);
        let uncategorized = &summary.categories[0];
        assert_eq!(uncategorized.name, "");
        assert_eq!(uncategorized.count, 2);
        assert_eq!(uncategorized.avg_heat_7, 300.0);
        assert_eq!(uncategorized.avg_score, 30.0);
    }

    #[test]
    fn languages_count_in_first_encounter_order() {
        let top = vec![
            repo("a", "r1", "Python", "llm", 1, 0, 1),
            repo("b", "r2", "Rust", "llm", 1, 0, 1),
            repo("c", "r3", "Python", "llm", 1, 0, 1),
        ];

        let summary = SummaryBuilder::new(settings()).build(&top, &History::default(), "2024-01-15");

        assert_eq!(
            summary.languages,
            vec![
                LanguageStats {
                    name: "Python".to_string(),
                    count: 2
                },
                LanguageStats {
                    name: "Rust".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn unknown_creation_date_is_never_new() {
        let now = Utc::now();
        let top = vec![
            repo("a", "undated", "Python", "llm", 1, 0, 1),
            created(
                repo("b", "old-repo", "Python", "llm", 1, 0, 1),
                now - Duration::days(200),
            ),
            created(
                repo("c", "new-repo", "Python", "llm", 1, 0, 1),
                now - Duration::days(30),
            ),
        ];

        let info = SummaryBuilder::new(settings())
            .build(&top, &History::default(), "2024-01-15")
            .new_repos;

        assert_eq!(info.count, 1);
        assert_eq!(info.threshold_days, 90);
        assert_eq!(info.repos, vec!["c/new-repo"]);
    }

    #[test]
    fn dark_horse_threshold_is_inclusive() {
        let top = vec![
            repo("a", "slow", "Python", "llm", 1, 0, 99),
            repo("b", "exact", "Python", "llm", 1, 0, 100),
            repo("c", "fast", "Python", "agent", 1, 0, 120),
        ];

        let dark_horses = SummaryBuilder::new(settings())
            .build(&top, &History::default(), "2024-01-15")
            .dark_horses;

        let keys: Vec<&str> = dark_horses.iter().map(|d| d.repo_key.as_str()).collect();
        assert_eq!(keys, vec!["b/exact", "c/fast"]);
        assert_eq!(dark_horses[1].score, 120);
        assert_eq!(dark_horses[1].category, "agent");
    }

    #[test]
    fn repeaters_require_at_least_two_weeks() {
        let top = vec![
            repo("owner1", "repeater", "Python", "llm", 500, 0, 1),
            repo("owner2", "fresh", "Go", "agent", 300, 0, 1),
            repo("owner3", "untracked", "Go", "agent", 200, 0, 1),
        ];

        let mut history = History::default();
        let entry = |weeks| RepoHistory {
            weeks_in_top: weeks,
            last_seen_report: "r".to_string(),
            last_seen_date: "d".to_string(),
            first_seen_report: "r".to_string(),
            first_seen_date: "d".to_string(),
        };
        history
            .history
            .insert("owner1/repeater".to_string(), entry(3));
        history.history.insert("owner2/fresh".to_string(), entry(1));

        let repeaters = SummaryBuilder::new(settings())
            .build(&top, &history, "2024-01-15")
            .repeaters;

        assert_eq!(repeaters.len(), 1);
        assert_eq!(repeaters[0].repo_key, "owner1/repeater");
        assert_eq!(repeaters[0].weeks_in_top, 3);
        assert_eq!(repeaters[0].current_heat_7, 500);
    }

    #[test]
    fn top_repos_are_ranked_sequentially() {
        let top = vec![
            repo("owner1", "repo1", "Python", "llm", 500, 2000, 50),
            repo("owner2", "repo2", "Go", "agent", 300, 1500, 30),
        ];

        let top_repos = SummaryBuilder::new(settings())
            .build(&top, &History::default(), "2024-01-15")
            .top_repos;

        assert_eq!(top_repos[0].rank, 1);
        assert_eq!(top_repos[0].repo_key, "owner1/repo1");
        assert_eq!(top_repos[0].heat_7, 500);
        assert_eq!(top_repos[0].heat_30, 2000);
        assert_eq!(top_repos[1].rank, 2);
        assert_eq!(top_repos[1].repo_key, "owner2/repo2");
        assert_eq!(top_repos[1].description, "repo2 description");
    }

    #[test]
    fn summary_wire_format_uses_snake_case_sections() {
        let top = vec![repo("owner1", "repo1", "Python", "llm", 500, 2000, 150)];
        let summary = SummaryBuilder::new(settings()).build(&top, &History::default(), "2024-01-15");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["meta"]["run_date"], "2024-01-15");
        assert_eq!(json["meta"]["filter_domain"], "AI");
        assert_eq!(json["categories"][0]["avg_heat_7"], 500.0);
        assert_eq!(json["new_repos"]["threshold_days"], 90);
        assert_eq!(json["dark_horses"][0]["repo_key"], "owner1/repo1");
        assert_eq!(json["top_repos"][0]["rank"], 1);
    }
}
