use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw repository facts captured from a trending page scrape.
///
/// Identity is `(owner, name)`, rendered as `"owner/name"` by [`RepoMetadata::key`]
/// and used as the join key across every downstream stage. Created once per
/// scrape and never mutated afterward.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoMetadata {
    pub owner: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub language: String,
    pub topics: Vec<String>,
    pub stars: i64,
    pub forks: i64,
    pub stars_today: i64,
    pub stars_this_week: i64,
    pub stars_this_month: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RepoMetadata {
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A repository that passed the keyword filter, with its category assignments.
///
/// `primary_category` is empty when no category matched. `match_score` counts
/// keyword hits across the include list and every category list combined;
/// a keyword appearing in both lists contributes once per list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRepo {
    pub metadata: RepoMetadata,
    pub categories: Vec<String>,
    pub primary_category: String,
    pub match_score: u32,
}

impl ClassifiedRepo {
    pub fn key(&self) -> String {
        self.metadata.key()
    }
}

/// The ranking unit: a classified repository with its derived heat and score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredRepo {
    pub repo: ClassifiedRepo,
    pub total_stars: i64,
    pub heat_7: i64,
    pub heat_30: i64,
    pub score: i64,
}

impl ScoredRepo {
    pub fn key(&self) -> String {
        self.repo.key()
    }

    /// Sort key for ranking: heat_30 first, score as the tie-break.
    pub fn sort_key(&self) -> (i64, i64) {
        (self.heat_30, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> RepoMetadata {
        RepoMetadata {
            owner: "octo".to_string(),
            name: "radar".to_string(),
            url: "https://github.com/octo/radar".to_string(),
            description: "Trend tracking".to_string(),
            language: "Rust".to_string(),
            topics: vec!["cli".to_string()],
            stars: 1200,
            forks: 40,
            stars_today: 100,
            stars_this_week: 350,
            stars_this_month: 900,
            created_at: None,
        }
    }

    #[test]
    fn key_joins_owner_and_name() {
        assert_eq!(sample_metadata().key(), "octo/radar");
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let meta = sample_metadata();
        let json = serde_json::to_string(&meta).unwrap();
        let back: RepoMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn missing_created_at_deserializes_as_none() {
        let json = r#"{
            "owner": "octo",
            "name": "radar",
            "url": "https://github.com/octo/radar",
            "description": "",
            "language": "Rust",
            "topics": [],
            "stars": 1,
            "forks": 0,
            "stars_today": 0,
            "stars_this_week": 0,
            "stars_this_month": 0
        }"#;
        let meta: RepoMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.created_at, None);
    }
}
