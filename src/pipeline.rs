//! End-to-end pipeline orchestration.
//!
//! Runs the eight stages in order: fetch, raw snapshot save, classify,
//! score and rank, history update, summary build with audit backup, LLM
//! commentary, report render and save. Failure handling is graded per
//! stage: fetch, an empty classification result, and the final report save
//! abort the run; snapshot, history, and summary-backup persistence
//! degrade to warnings so a transient disk problem cannot cost a report;
//! LLM failure falls back to template commentary.

use crate::classifier::Classifier;
use crate::config::Config;
use crate::errors::{Error, Result};
use crate::fetcher::TrendingFetcher;
use crate::history::{History, HistoryStore};
use crate::llm::{template_fallback, LlmClient};
use crate::report::ReportRenderer;
use crate::score::{calculate_scores, rank_and_select_top};
use crate::summary::{Summary, SummaryBuilder};
use chrono::{Datelike, Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

const WEEKLY_REPORT_ID_FORMAT: &str = "YYYY-MM-weekN";

/// What a successful run produced, for CLI display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub report_id: String,
    pub report_path: PathBuf,
    /// Absent when the summary backup failed (the run still succeeds).
    pub summary_path: Option<PathBuf>,
}

/// Executes the complete workflow against one output root.
pub struct Pipeline {
    config: Config,
    data_dir: PathBuf,
    reports_dir: PathBuf,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self::with_output_root(config, Path::new("."))
    }

    /// Root all output paths under `root` instead of the working directory.
    pub fn with_output_root(config: Config, root: &Path) -> Self {
        Self {
            config,
            data_dir: root.join("data"),
            reports_dir: root.join("reports"),
        }
    }

    pub fn run(&self, report_id: Option<&str>, force_weekly: bool) -> Result<PipelineOutcome> {
        let pipeline_start = Instant::now();
        let today = Local::now().date_naive();
        let run_date = today.format("%Y-%m-%d").to_string();

        let report_id = match report_id {
            Some(id) => id.to_string(),
            None => resolve_report_id(&self.config.settings.report_id_format, force_weekly, today),
        };
        log::info!("Starting pipeline execution for report {}", report_id);

        // 1. Fetch trending data.
        let step_start = Instant::now();
        log::info!("Step 1: fetching trending repositories");
        let fetcher = TrendingFetcher::new(self.config.languages.clone())?;
        let trending = fetcher.fetch_trending()?;
        log::info!(
            "Step 1 completed with {} repos in {:?}",
            trending.len(),
            step_start.elapsed()
        );

        // 2. Snapshot the raw scrape.
        log::info!("Step 2: saving raw trending snapshot");
        if let Err(e) = fetcher.save_raw(&trending, &self.trending_raw_dir(), today) {
            log::warn!("Failed to save raw trending data: {}", e);
        }

        // 3. Classify.
        let step_start = Instant::now();
        log::info!("Step 3: classifying repositories");
        let classifier = Classifier::new(self.config.keywords.clone());
        let classified = classifier.classify(&trending);
        log::info!(
            "Step 3 completed with {} classified repos in {:?}",
            classified.len(),
            step_start.elapsed()
        );

        if classified.is_empty() {
            return Err(Error::Pipeline(
                "no repositories matched filter criteria".to_string(),
            ));
        }

        // 4. Score and rank.
        let step_start = Instant::now();
        log::info!("Step 4: calculating scores");
        let scored = calculate_scores(classified);
        let top_repos = rank_and_select_top(scored, self.config.settings.top_n);
        log::info!(
            "Step 4 completed with top {} repos in {:?}",
            top_repos.len(),
            step_start.elapsed()
        );

        // 5. Update streak history.
        let step_start = Instant::now();
        log::info!("Step 5: updating history");
        let store = HistoryStore::new(self.history_path());
        let history = match store.update(&top_repos, &report_id, &run_date) {
            Ok(updated) => {
                if let Err(e) = store.save(&updated) {
                    log::warn!("Failed to save history: {}", e);
                }
                updated
            }
            Err(e) => {
                log::warn!("Failed to update history, continuing without streaks: {}", e);
                History::default()
            }
        };
        log::info!("Step 5 completed in {:?}", step_start.elapsed());

        // 6. Build the summary and back it up for audits.
        let step_start = Instant::now();
        log::info!("Step 6: building summary");
        let builder = SummaryBuilder::new(self.config.settings.clone());
        let summary = builder.build(&top_repos, &history, &run_date);
        let summary_path = match self.save_summary_backup(&summary, &report_id) {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Failed to save summary backup: {}", e);
                None
            }
        };
        log::info!("Step 6 completed in {:?}", step_start.elapsed());

        // 7. LLM commentary, falling back to templates.
        let step_start = Instant::now();
        log::info!("Step 7: generating commentary");
        let commentary = self.generate_commentary(&summary);
        log::info!("Step 7 completed in {:?}", step_start.elapsed());

        // 8. Render and save the report.
        let step_start = Instant::now();
        log::info!("Step 8: generating report");
        let renderer = ReportRenderer::new(self.config.keywords.clone());
        let content = renderer.render(&summary, &commentary, &report_id, &self.config.languages)?;
        let report_path = renderer.save_report(&content, &self.reports_dir, &report_id)?;
        log::info!("Step 8 completed in {:?}", step_start.elapsed());

        log::info!(
            "Pipeline execution completed for report {} in {:?}",
            report_id,
            pipeline_start.elapsed()
        );

        Ok(PipelineOutcome {
            report_id,
            report_path,
            summary_path,
        })
    }

    fn generate_commentary(&self, summary: &Summary) -> crate::llm::Commentary {
        let api_key = std::env::var("LLM_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            log::warn!("LLM_API_KEY not set, using template fallback");
            return template_fallback(summary);
        }

        let result = LlmClient::new(self.config.llm.clone(), api_key).and_then(|client| {
            client.generate_analysis(summary, &self.config.settings.report_language)
        });

        match result {
            Ok(commentary) => commentary,
            Err(e) => {
                log::warn!("LLM call failed, using template fallback: {}", e);
                template_fallback(summary)
            }
        }
    }

    fn save_summary_backup(&self, summary: &Summary, report_id: &str) -> Result<PathBuf> {
        let dir = self.summaries_dir();
        fs::create_dir_all(&dir).map_err(|e| {
            Error::file_system_io("failed to create summaries directory", &dir, e)
        })?;

        let path = dir.join(format!("{}.json", report_id));
        let data = serde_json::to_string_pretty(summary)?;
        fs::write(&path, data)
            .map_err(|e| Error::file_system_io("failed to write summary backup", &path, e))?;

        Ok(path)
    }

    fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }

    fn trending_raw_dir(&self) -> PathBuf {
        self.data_dir.join("trending_raw")
    }

    fn summaries_dir(&self) -> PathBuf {
        self.data_dir.join("summaries")
    }
}

// Pure functions

/// Choose a report id for `date`: the weekly form when forced or configured,
/// the plain ISO date otherwise.
fn resolve_report_id(format: &str, force_weekly: bool, date: NaiveDate) -> String {
    if force_weekly || format == WEEKLY_REPORT_ID_FORMAT {
        weekly_report_id(date)
    } else {
        daily_report_id(date)
    }
}

fn daily_report_id(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Weekly ids combine the ISO week-numbering year, the calendar month, and
/// the ISO week number, e.g. `2024-01-week1` for 2024-01-07.
fn weekly_report_id(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-{:02}-week{}", iso.year(), date.month(), iso.week())
}
