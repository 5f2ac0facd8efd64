//! Cleanup of free text before it is embedded in Markdown.
//!
//! LLM output and scraped descriptions are untrusted with respect to
//! Markdown structure: pipes break table rows, brackets break links, and
//! stray newlines break list items. Each helper targets one embedding
//! context.

use once_cell::sync::Lazy;
use regex::Regex;

static EXCESS_NEWLINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const MAX_DESCRIPTION_LEN: usize = 200;
const TRUNCATED_DESCRIPTION_LEN: usize = 197;

/// Sanitize prose for block-level embedding: escape table pipes, normalize
/// line endings, collapse runs of blank lines, and trim.
pub fn sanitize_markdown(content: &str) -> String {
    let content = content.replace('|', "\\|").replace("\r\n", "\n");
    let content = EXCESS_NEWLINES_RE.replace_all(&content, "\n\n");
    content.trim().to_string()
}

/// Ensure a URL carries an http(s) scheme.
pub fn sanitize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Strip characters that would terminate a Markdown link label early.
pub fn sanitize_repo_name(name: &str) -> String {
    name.replace(['[', ']', '(', ')'], "").trim().to_string()
}

/// Flatten a description to a single line and cap its length.
pub fn sanitize_description(desc: &str) -> String {
    let flattened = desc.replace(['\n', '\r'], " ");
    let collapsed = WHITESPACE_RE.replace_all(&flattened, " ");
    let mut desc = collapsed.trim().to_string();

    if desc.len() > MAX_DESCRIPTION_LEN {
        let mut cut = TRUNCATED_DESCRIPTION_LEN;
        while !desc.is_char_boundary(cut) {
            cut -= 1;
        }
        desc.truncate(cut);
        desc.push_str("...");
    }

    desc
}
