//! Scraping of GitHub trending pages into repository metadata.
//!
//! For each configured language the fetcher pulls the daily, weekly, and
//! monthly trending pages as one unit, retrying the whole trio together so a
//! merged record never mixes data from different attempts. Languages are
//! fetched in parallel but results keep configuration order, which makes the
//! cross-language dedupe deterministic.

use crate::errors::{Error, Result};
use crate::models::RepoMetadata;
use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const BASE_URL: &str = "https://github.com/trending";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

static ARTICLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<article class="Box-row".*?</article>"#).unwrap());
static REPO_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<h2[^>]*>.*?href="/([^/"]+)/([^/"]+)""#).unwrap());
static DESCRIPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<p class="col-9[^"]*">(.*?)</p>"#).unwrap());
static STARS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<span class="d-inline-block float-sm-right">(.*?)</span>"#).unwrap()
});
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d,]+").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// The three trending windows GitHub exposes per language page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    fn query_value(self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
        }
    }

    fn apply_stars(self, repo: &mut RepoMetadata, stars: i64) {
        match self {
            Timeframe::Daily => repo.stars_today = stars,
            Timeframe::Weekly => repo.stars_this_week = stars,
            Timeframe::Monthly => repo.stars_this_month = stars,
        }
    }
}

/// Scrapes GitHub trending pages for the configured languages.
pub struct TrendingFetcher {
    languages: Vec<String>,
    client: reqwest::blocking::Client,
}

impl TrendingFetcher {
    pub fn new(languages: Vec<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Fetch(format!("failed to build http client: {}", e)))?;

        Ok(Self { languages, client })
    }

    // I/O operations

    /// Fetch trending repositories for every configured language.
    ///
    /// A language that fails all attempts is skipped with an error log; the
    /// fetch as a whole fails only when no language produced any data.
    pub fn fetch_trending(&self) -> Result<Vec<RepoMetadata>> {
        log::info!(
            "Starting trending fetch for languages: {}",
            self.languages.join(", ")
        );

        let results: Vec<Result<Vec<RepoMetadata>>> = self
            .languages
            .par_iter()
            .map(|language| self.fetch_for_language(language))
            .collect();

        let mut all_repos = Vec::new();
        let mut last_err = None;
        for (language, result) in self.languages.iter().zip(results) {
            match result {
                Ok(repos) => all_repos.extend(repos),
                Err(e) => {
                    log::error!("Failed to fetch trending for {}: {}", language, e);
                    last_err = Some(e);
                }
            }
        }

        if all_repos.is_empty() {
            return Err(match last_err {
                Some(e) => {
                    Error::Fetch(format!("failed to fetch trending data for any language: {}", e))
                }
                None => Error::Fetch("no trending data retrieved".to_string()),
            });
        }

        let unique = deduplicate(all_repos);
        log::info!("Trending fetch completed with {} repos", unique.len());
        Ok(unique)
    }

    /// Fetch and merge all three timeframes for one language, retrying the
    /// trio as a unit with a linearly growing delay between attempts.
    fn fetch_for_language(&self, language: &str) -> Result<Vec<RepoMetadata>> {
        log::debug!("Fetching trending for {}", language);

        let mut last_err = None;
        for attempt in 1..=MAX_RETRIES {
            match self.scrape_all_timeframes(language) {
                Ok((today, week, month)) => {
                    let repos = merge_timeframes(today, week, month, language);
                    log::debug!("Fetched {} trending repos for {}", repos.len(), language);
                    return Ok(repos);
                }
                Err(e) => {
                    log::warn!(
                        "Fetch attempt {} failed for {}: {}",
                        attempt,
                        language,
                        e
                    );
                    last_err = Some(e);
                    if attempt < MAX_RETRIES {
                        thread::sleep(RETRY_DELAY * attempt);
                    }
                }
            }
        }

        let detail = last_err.map(|e| e.to_string()).unwrap_or_default();
        Err(Error::Fetch(format!(
            "failed to fetch trending for {} after {} attempts: {}",
            language, MAX_RETRIES, detail
        )))
    }

    #[allow(clippy::type_complexity)]
    fn scrape_all_timeframes(
        &self,
        language: &str,
    ) -> Result<(
        IndexMap<String, RepoMetadata>,
        IndexMap<String, RepoMetadata>,
        IndexMap<String, RepoMetadata>,
    )> {
        let today = self.scrape_page(language, Timeframe::Daily)?;
        let week = self.scrape_page(language, Timeframe::Weekly)?;
        let month = self.scrape_page(language, Timeframe::Monthly)?;
        Ok((today, week, month))
    }

    fn scrape_page(
        &self,
        language: &str,
        timeframe: Timeframe,
    ) -> Result<IndexMap<String, RepoMetadata>> {
        let url = format!("{}/{}?since={}", BASE_URL, language, timeframe.query_value());

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| Error::Fetch(format!("failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::Fetch(format!(
                "unexpected status code {} for {}",
                status.as_u16(),
                url
            )));
        }

        let body = response
            .text()
            .map_err(|e| Error::Fetch(format!("failed to read body of {}: {}", url, e)))?;

        Ok(parse_trending_page(&body, language, timeframe))
    }

    /// Persist the merged scrape as a date-stamped JSON snapshot.
    pub fn save_raw(
        &self,
        repos: &[RepoMetadata],
        output_dir: &Path,
        date: NaiveDate,
    ) -> Result<PathBuf> {
        if repos.is_empty() {
            return Err(Error::Fetch("cannot save empty repository list".to_string()));
        }

        let path = output_dir.join(format!("{}.json", date.format("%Y-%m-%d")));
        log::info!("Saving {} trending repos to {}", repos.len(), path.display());

        fs::create_dir_all(output_dir).map_err(|e| {
            Error::file_system_io("failed to create trending data directory", output_dir, e)
        })?;

        let data = serde_json::to_string_pretty(repos)?;
        fs::write(&path, data)
            .map_err(|e| Error::file_system_io("failed to write trending data", &path, e))?;

        Ok(path)
    }
}

// Pure functions

/// Extract repositories from one trending page, keyed by `owner/name` in
/// page order. Articles without a parsable repo link are skipped; missing
/// descriptions and star counts degrade to empty and zero.
fn parse_trending_page(
    html: &str,
    language: &str,
    timeframe: Timeframe,
) -> IndexMap<String, RepoMetadata> {
    let mut repos = IndexMap::new();

    for article in ARTICLE_RE.find_iter(html) {
        let block = article.as_str();

        let Some(link) = REPO_LINK_RE.captures(block) else {
            continue;
        };
        let owner = link[1].to_string();
        let name = link[2].to_string();

        let description = DESCRIPTION_RE
            .captures(block)
            .map(|c| clean_fragment(&c[1]))
            .unwrap_or_default();

        let stars = STARS_RE
            .captures(block)
            .map(|c| parse_star_count(&c[1]))
            .unwrap_or(0);

        let mut repo = RepoMetadata {
            url: format!("https://github.com/{}/{}", owner, name),
            owner,
            name,
            description,
            language: language.to_string(),
            ..Default::default()
        };
        timeframe.apply_stars(&mut repo, stars);

        repos.insert(repo.key(), repo);
    }

    repos
}

/// Parse a count out of text like `"1,234 stars today"`. Anything without a
/// number yields zero.
fn parse_star_count(text: &str) -> i64 {
    NUMBER_RE
        .find(text)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0)
}

/// Strip markup from a scraped HTML fragment and collapse its whitespace.
fn clean_fragment(fragment: &str) -> String {
    let without_tags = TAG_RE.replace_all(fragment, "");
    let decoded = without_tags
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Merge the three per-timeframe maps into one record per repository.
///
/// Identity fields come from the daily page when present, falling back to
/// weekly then monthly; each star counter comes from its own timeframe.
/// Output order is daily page order, then weekly-only keys, then
/// monthly-only keys.
fn merge_timeframes(
    today: IndexMap<String, RepoMetadata>,
    week: IndexMap<String, RepoMetadata>,
    month: IndexMap<String, RepoMetadata>,
    language: &str,
) -> Vec<RepoMetadata> {
    let mut all_keys: IndexSet<&String> = IndexSet::new();
    all_keys.extend(today.keys());
    all_keys.extend(week.keys());
    all_keys.extend(month.keys());

    let mut repos = Vec::with_capacity(all_keys.len());
    for key in all_keys {
        let mut repo = RepoMetadata {
            language: language.to_string(),
            ..Default::default()
        };

        if let Some(daily) = today.get(key) {
            repo.owner = daily.owner.clone();
            repo.name = daily.name.clone();
            repo.url = daily.url.clone();
            repo.description = daily.description.clone();
            repo.stars_today = daily.stars_today;
        }

        if let Some(weekly) = week.get(key) {
            if repo.owner.is_empty() {
                repo.owner = weekly.owner.clone();
                repo.name = weekly.name.clone();
                repo.url = weekly.url.clone();
                repo.description = weekly.description.clone();
            }
            repo.stars_this_week = weekly.stars_this_week;
        }

        if let Some(monthly) = month.get(key) {
            if repo.owner.is_empty() {
                repo.owner = monthly.owner.clone();
                repo.name = monthly.name.clone();
                repo.url = monthly.url.clone();
                repo.description = monthly.description.clone();
            }
            repo.stars_this_month = monthly.stars_this_month;
        }

        if !repo.owner.is_empty() && !repo.name.is_empty() {
            repos.push(repo);
        }
    }

    repos
}

/// Drop repeated keys across languages, keeping the first occurrence.
fn deduplicate(repos: Vec<RepoMetadata>) -> Vec<RepoMetadata> {
    let mut seen = HashSet::new();
    let unique: Vec<RepoMetadata> = repos
        .into_iter()
        .filter(|repo| seen.insert(repo.key()))
        .collect();
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SAMPLE_PAGE: &str = indoc! {r#"
        <html><body>
        <article class="Box-row">
          <h2 class="h3 lh-condensed">
            <a href="/langchain-ai/langchain" data-view-component="true">
              langchain-ai / langchain
            </a>
          </h2>
          <p class="col-9 color-fg-muted my-1 pr-4">
            Build context-aware reasoning applications with &lt;LLMs&gt; &amp; agents
          </p>
          <span class="d-inline-block float-sm-right">
            <svg aria-hidden="true"></svg>
            1,234 stars today
          </span>
        </article>
        <article class="Box-row">
          <h2 class="h3 lh-condensed">
            <a href="/owner2/bare-repo">owner2 / bare-repo</a>
          </h2>
        </article>
        <article class="Box-row">
          <div>no link here</div>
        </article>
        </body></html>
    "#};

    fn named(owner: &str, name: &str, language: &str) -> RepoMetadata {
        RepoMetadata {
            owner: owner.to_string(),
            name: name.to_string(),
            url: format!("https://github.com/{}/{}", owner, name),
            description: format!("{} repo", name),
            language: language.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn parse_extracts_repos_in_page_order() {
        let repos = parse_trending_page(SAMPLE_PAGE, "python", Timeframe::Daily);

        assert_eq!(repos.len(), 2);
        let keys: Vec<&String> = repos.keys().collect();
        assert_eq!(keys, vec!["langchain-ai/langchain", "owner2/bare-repo"]);

        let first = &repos["langchain-ai/langchain"];
        assert_eq!(first.owner, "langchain-ai");
        assert_eq!(first.name, "langchain");
        assert_eq!(first.url, "https://github.com/langchain-ai/langchain");
        assert_eq!(
            first.description,
            "Build context-aware reasoning applications with <LLMs> & agents"
        );
        assert_eq!(first.language, "python");
        assert_eq!(first.stars_today, 1234);
        assert_eq!(first.created_at, None);
    }

    #[test]
    fn parse_fills_the_timeframe_counter_only() {
        let weekly = parse_trending_page(SAMPLE_PAGE, "python", Timeframe::Weekly);
        let repo = &weekly["langchain-ai/langchain"];
        assert_eq!(repo.stars_this_week, 1234);
        assert_eq!(repo.stars_today, 0);
        assert_eq!(repo.stars_this_month, 0);
    }

    #[test]
    fn parse_degrades_missing_fields_gracefully() {
        let repos = parse_trending_page(SAMPLE_PAGE, "python", Timeframe::Daily);
        let bare = &repos["owner2/bare-repo"];
        assert_eq!(bare.description, "");
        assert_eq!(bare.stars_today, 0);
    }

    #[test]
    fn parse_star_count_handles_commas_and_garbage() {
        assert_eq!(parse_star_count("1,234 stars today"), 1234);
        assert_eq!(parse_star_count("  567 stars this week"), 567);
        assert_eq!(parse_star_count("no numbers at all"), 0);
        assert_eq!(parse_star_count(""), 0);
    }

    #[test]
    fn merge_prefers_daily_metadata_and_keeps_all_counters() {
        let mut today = IndexMap::new();
        let mut daily_repo = named("a", "r1", "python");
        daily_repo.description = "daily description".to_string();
        daily_repo.stars_today = 10;
        today.insert("a/r1".to_string(), daily_repo);

        let mut week = IndexMap::new();
        let mut weekly_repo = named("a", "r1", "python");
        weekly_repo.description = "weekly description".to_string();
        weekly_repo.stars_this_week = 70;
        week.insert("a/r1".to_string(), weekly_repo);

        let mut month = IndexMap::new();
        let mut monthly_repo = named("a", "r1", "python");
        monthly_repo.stars_this_month = 300;
        month.insert("a/r1".to_string(), monthly_repo);

        let merged = merge_timeframes(today, week, month, "python");

        assert_eq!(merged.len(), 1);
        let repo = &merged[0];
        assert_eq!(repo.description, "daily description");
        assert_eq!(repo.stars_today, 10);
        assert_eq!(repo.stars_this_week, 70);
        assert_eq!(repo.stars_this_month, 300);
    }

    #[test]
    fn merge_keeps_repos_missing_from_the_daily_page() {
        let today = IndexMap::new();
        let mut week = IndexMap::new();
        let mut weekly_only = named("b", "weekly-only", "rust");
        weekly_only.stars_this_week = 40;
        week.insert("b/weekly-only".to_string(), weekly_only);
        let mut month = IndexMap::new();
        let mut monthly_only = named("c", "monthly-only", "rust");
        monthly_only.stars_this_month = 90;
        month.insert("c/monthly-only".to_string(), monthly_only);

        let merged = merge_timeframes(today, week, month, "rust");

        let keys: Vec<String> = merged.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["b/weekly-only", "c/monthly-only"]);
        assert_eq!(merged[0].stars_this_week, 40);
        assert_eq!(merged[1].stars_this_month, 90);
    }

    #[test]
    fn merge_orders_daily_keys_before_timeframe_only_keys() {
        let mut today = IndexMap::new();
        today.insert("a/first".to_string(), named("a", "first", "go"));
        today.insert("b/second".to_string(), named("b", "second", "go"));
        let mut month = IndexMap::new();
        month.insert("c/third".to_string(), named("c", "third", "go"));
        month.insert("a/first".to_string(), named("a", "first", "go"));

        let merged = merge_timeframes(today, IndexMap::new(), month, "go");

        let keys: Vec<String> = merged.iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["a/first", "b/second", "c/third"]);
    }

    #[test]
    fn deduplicate_keeps_first_occurrence() {
        let repos = vec![
            named("a", "repo", "python"),
            named("b", "other", "rust"),
            named("a", "repo", "rust"),
        ];

        let unique = deduplicate(repos);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].language, "python");
        assert_eq!(unique[1].key(), "b/other");
    }

    #[test]
    fn save_raw_writes_date_stamped_snapshot() {
        let dir = TempDir::new().unwrap();
        let fetcher = TrendingFetcher::new(vec!["python".to_string()]).unwrap();
        let repos = vec![named("a", "repo", "python")];
        let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();

        let path = fetcher
            .save_raw(&repos, &dir.path().join("trending_raw"), date)
            .unwrap();

        assert!(path.ends_with("trending_raw/2024-01-07.json"));
        let loaded: Vec<RepoMetadata> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, repos);
    }

    #[test]
    fn save_raw_rejects_an_empty_list() {
        let dir = TempDir::new().unwrap();
        let fetcher = TrendingFetcher::new(vec![]).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();

        assert!(fetcher.save_raw(&[], dir.path(), date).is_err());
    }
}
