//! Natural-language commentary over a run summary.
//!
//! The commentary shape is shared by the API client and the deterministic
//! fallback, so the report renderer never cares which one produced it.

mod client;
mod fallback;

pub use client::LlmClient;
pub use fallback::template_fallback;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Commentary sections keyed to the summary they were generated from.
///
/// Every field is optional on the wire; responses are validated separately
/// (an empty `intro` is rejected by the client).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Commentary {
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub category_notes: IndexMap<String, String>,
    #[serde(default)]
    pub dark_horse_notes: String,
    #[serde(default)]
    pub repeaters_notes: String,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
}

/// Commentary on a single highlighted repository.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Highlight {
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub tone: String,
}
