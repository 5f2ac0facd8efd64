//! Markdown report assembly.
//!
//! The writer renders section by section over any `io::Write` sink, so
//! tests can render into a buffer while the pipeline renders to a string
//! destined for `reports/{report_id}.md`. Optional sections (dark horses,
//! repeaters, highlights) are omitted entirely when empty rather than
//! rendered as empty tables.

mod sanitize;

pub use sanitize::{sanitize_description, sanitize_markdown, sanitize_repo_name, sanitize_url};

use crate::config::KeywordConfig;
use crate::errors::{Error, Result};
use crate::llm::{Commentary, Highlight};
use crate::summary::{CategoryStats, DarkHorseInfo, MetaInfo, RepeaterInfo, Summary, TopRepoInfo};
use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Renders summaries and commentary into the published Markdown report.
pub struct ReportRenderer {
    keywords: KeywordConfig,
}

impl ReportRenderer {
    pub fn new(keywords: KeywordConfig) -> Self {
        Self { keywords }
    }

    /// Render the complete report to a string.
    pub fn render(
        &self,
        summary: &Summary,
        commentary: &Commentary,
        report_id: &str,
        languages: &[String],
    ) -> Result<String> {
        let mut buffer = Vec::new();
        ReportWriter::new(&mut buffer, &self.keywords)
            .write_report(summary, commentary, report_id, languages)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write the rendered report to `{output_dir}/{report_id}.md` with a
    /// generation timestamp footer.
    pub fn save_report(&self, content: &str, output_dir: &Path, report_id: &str) -> Result<PathBuf> {
        fs::create_dir_all(output_dir).map_err(|e| {
            Error::file_system_io("failed to create reports directory", output_dir, e)
        })?;

        let path = output_dir.join(format!("{}.md", report_id));
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let stamped = format!("{}\n\n---\n*Generated at: {}*\n", content.trim_end(), timestamp);

        fs::write(&path, stamped)
            .map_err(|e| Error::file_system_io("failed to write report file", &path, e))?;

        log::info!("Saved report to {}", path.display());
        Ok(path)
    }
}

struct ReportWriter<'a, W: Write> {
    writer: W,
    keywords: &'a KeywordConfig,
}

impl<'a, W: Write> ReportWriter<'a, W> {
    fn new(writer: W, keywords: &'a KeywordConfig) -> Self {
        Self { writer, keywords }
    }

    fn write_report(
        &mut self,
        summary: &Summary,
        commentary: &Commentary,
        report_id: &str,
        languages: &[String],
    ) -> Result<()> {
        self.write_header(&summary.meta, report_id, languages)?;
        self.write_overview(&commentary.intro)?;
        self.write_top_table(&summary.top_repos, summary.meta.top_n)?;
        self.write_category_breakdown(summary, commentary)?;
        self.write_dark_horses(&summary.dark_horses, &commentary.dark_horse_notes)?;
        self.write_repeaters(&summary.repeaters, &commentary.repeaters_notes)?;
        self.write_highlights(&commentary.highlights)?;
        self.write_methodology(&summary.meta)?;
        Ok(())
    }

    fn write_header(
        &mut self,
        meta: &MetaInfo,
        report_id: &str,
        languages: &[String],
    ) -> Result<()> {
        writeln!(
            self.writer,
            "# {} GitHub Trending Report - {}",
            meta.filter_domain, report_id
        )?;
        writeln!(self.writer)?;
        writeln!(self.writer, "**Report Date**: {}  ", meta.run_date)?;
        writeln!(self.writer, "**Analysis Window**: {} days  ", meta.window_days)?;
        writeln!(
            self.writer,
            "**Languages Tracked**: {}  ",
            languages.join(", ")
        )?;
        writeln!(self.writer, "**Top N**: {}", meta.top_n)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_overview(&mut self, intro: &str) -> Result<()> {
        writeln!(self.writer, "## Overview")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", sanitize_markdown(intro))?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn write_top_table(&mut self, repos: &[TopRepoInfo], top_n: usize) -> Result<()> {
        writeln!(self.writer, "## Top {} Repositories", top_n)?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "| Rank | Repository | Category | Language | Heat_7 | Heat_30 | Score |"
        )?;
        writeln!(
            self.writer,
            "|------|-----------|----------|----------|---------|---------|-------|"
        )?;

        for repo in repos {
            writeln!(
                self.writer,
                "| {} | [{}]({}) | {} | {} | {} | {} | {} |",
                repo.rank,
                sanitize_repo_name(&repo.repo_name),
                sanitize_url(&repo.url),
                repo.category,
                repo.language,
                format_number(repo.heat_7),
                format_number(repo.heat_30),
                format_number(repo.score)
            )?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn write_category_breakdown(
        &mut self,
        summary: &Summary,
        commentary: &Commentary,
    ) -> Result<()> {
        writeln!(self.writer, "## Category Breakdown")?;
        writeln!(self.writer)?;

        let mut by_category: HashMap<&str, Vec<&TopRepoInfo>> = HashMap::new();
        for repo in &summary.top_repos {
            by_category
                .entry(repo.category.as_str())
                .or_default()
                .push(repo);
        }

        for stats in &summary.categories {
            self.write_category_section(stats, commentary, &by_category)?;
        }

        Ok(())
    }

    fn write_category_section(
        &mut self,
        stats: &CategoryStats,
        commentary: &Commentary,
        by_category: &HashMap<&str, Vec<&TopRepoInfo>>,
    ) -> Result<()> {
        writeln!(self.writer, "### {} ({} projects)", stats.name, stats.count)?;
        writeln!(self.writer)?;

        if let Some(note) = commentary.category_notes.get(&stats.name) {
            if !note.is_empty() {
                writeln!(self.writer, "{}", sanitize_markdown(note))?;
                writeln!(self.writer)?;
            }
        }

        writeln!(
            self.writer,
            "**Average Heat_7**: {}  ",
            format_number(stats.avg_heat_7 as i64)
        )?;
        writeln!(
            self.writer,
            "**Average Score**: {}  ",
            format_number(stats.avg_score as i64)
        )?;
        writeln!(self.writer)?;

        if let Some(repos) = by_category.get(stats.name.as_str()) {
            for repo in repos {
                writeln!(
                    self.writer,
                    "- [{}]({}) - {}",
                    sanitize_repo_name(&repo.repo_name),
                    sanitize_url(&repo.url),
                    sanitize_description(&repo.description)
                )?;
            }
            writeln!(self.writer)?;
        }

        Ok(())
    }

    fn write_dark_horses(&mut self, dark_horses: &[DarkHorseInfo], notes: &str) -> Result<()> {
        if dark_horses.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "## Dark Horse Projects")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", sanitize_markdown(notes))?;
        writeln!(self.writer)?;
        writeln!(self.writer, "| Repository | Score | Heat_30 | Heat_7 | Category |")?;
        writeln!(self.writer, "|-----------|-------|---------|---------|----------|")?;

        for dh in dark_horses {
            writeln!(
                self.writer,
                "| [{}]({}) | {} | {} | {} | {} |",
                sanitize_repo_name(&dh.repo_name),
                sanitize_url(&dh.url),
                format_number(dh.score),
                format_number(dh.heat_30),
                format_number(dh.heat_7),
                dh.category
            )?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn write_repeaters(&mut self, repeaters: &[RepeaterInfo], notes: &str) -> Result<()> {
        if repeaters.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "## Consecutive Appearances")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", sanitize_markdown(notes))?;
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "| Repository | Weeks in Top | Category | Current Heat_7 |"
        )?;
        writeln!(
            self.writer,
            "|-----------|--------------|----------|----------------|"
        )?;

        for rep in repeaters {
            writeln!(
                self.writer,
                "| [{}]({}) | {} | {} | {} |",
                sanitize_repo_name(&rep.repo_name),
                sanitize_url(&rep.url),
                rep.weeks_in_top,
                rep.category,
                format_number(rep.current_heat_7)
            )?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn write_highlights(&mut self, highlights: &[Highlight]) -> Result<()> {
        if highlights.is_empty() {
            return Ok(());
        }

        writeln!(self.writer, "## Highlighted Repositories")?;
        writeln!(self.writer)?;

        for highlight in highlights {
            writeln!(self.writer, "### {}", highlight.repo)?;
            writeln!(self.writer)?;
            writeln!(self.writer, "{}", sanitize_markdown(&highlight.comment))?;
            writeln!(self.writer)?;
        }

        Ok(())
    }

    fn write_methodology(&mut self, meta: &MetaInfo) -> Result<()> {
        writeln!(self.writer, "## Methodology")?;
        writeln!(self.writer)?;
        writeln!(self.writer, "**Data Sources**:")?;
        writeln!(
            self.writer,
            "- GitHub Trending pages (daily, weekly, and monthly windows)"
        )?;
        writeln!(self.writer)?;
        writeln!(self.writer, "**Metrics**:")?;
        writeln!(
            self.writer,
            "- Heat_7: Stars gained in last {} days",
            meta.short_window_days
        )?;
        writeln!(
            self.writer,
            "- Heat_30: Stars gained in last {} days",
            meta.window_days
        )?;
        writeln!(
            self.writer,
            "- Score: Weighted scoring combining short-term heat and sustained growth"
        )?;
        writeln!(
            self.writer,
            "  - Formula: 0.6 × stars_1d + 0.3 × (stars_7d / 7) + 0.1 × (stars_30d / 30)"
        )?;
        writeln!(
            self.writer,
            "  - Emphasizes recent activity (60%) while considering sustained trends (40%)"
        )?;
        writeln!(self.writer)?;
        writeln!(self.writer, "**Filtering**:")?;
        writeln!(
            self.writer,
            "- Include keywords: {}",
            self.keywords.include.join(", ")
        )?;
        writeln!(
            self.writer,
            "- Exclude keywords: {}",
            self.keywords.exclude.join(", ")
        )?;
        writeln!(
            self.writer,
            "- Categories: {}",
            self.keywords
                .categories
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )?;
        writeln!(self.writer)?;
        writeln!(self.writer, "**Ranking**:")?;
        writeln!(self.writer, "1. Sort by Heat_30 (descending)")?;
        writeln!(self.writer, "2. Tie-break by Score (descending)")?;
        writeln!(self.writer, "3. Select top {}", meta.top_n)?;
        writeln!(self.writer)?;
        writeln!(self.writer, "**Limitations**:")?;
        writeln!(
            self.writer,
            "- Trending data limited to GitHub's trending algorithm"
        )?;
        writeln!(
            self.writer,
            "- LLM-generated commentary is interpretive, not prescriptive"
        )?;
        writeln!(
            self.writer,
            "- Weekly snapshots may miss short-lived trends"
        )?;
        Ok(())
    }
}

/// Render an integer with comma thousands separators.
fn format_number(n: i64) -> String {
    if n < 0 {
        return format!("-{}", format_number(-n));
    }
    if n < 1000 {
        return n.to_string();
    }
    format!("{},{:03}", format_number(n / 1000), n % 1000)
}
