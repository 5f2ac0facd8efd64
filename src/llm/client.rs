//! HTTP client for chat-completion style LLM APIs.
//!
//! Supports the OpenAI request shape and the Gemini request shape, selected
//! by the configured or URL-detected provider. Calls are retried with
//! exponential backoff; the response body is cleaned of Markdown fences
//! before it is parsed as commentary JSON.

use crate::config::{LlmConfig, Provider};
use crate::errors::{Error, Result};
use crate::llm::Commentary;
use crate::summary::Summary;
use serde::Deserialize;
use serde_json::json;
use std::thread;
use std::time::Duration;

pub struct LlmClient {
    config: LlmConfig,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Llm(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Generate commentary for the summary, written in `report_language`.
    pub fn generate_analysis(&self, summary: &Summary, report_language: &str) -> Result<Commentary> {
        let prompt = build_prompt(
            &self.config.role_description,
            &self.config.output_tone,
            summary,
            report_language,
        )?;

        log::info!("Calling LLM API for analysis");
        let response_text = self.call_api_with_retry(&prompt)?;
        let output = parse_response(&response_text)?;
        log::info!("LLM analysis completed");

        Ok(output)
    }

    fn call_api_with_retry(&self, prompt: &str) -> Result<String> {
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff = Duration::from_secs(1u64 << attempt);
                log::warn!(
                    "Retrying LLM API call (attempt {}, backing off {}s)",
                    attempt,
                    backoff.as_secs()
                );
                thread::sleep(backoff);
            }

            match self.call_api(prompt) {
                Ok(response) => return Ok(response),
                Err(e) => {
                    log::warn!("LLM API call failed on attempt {}: {}", attempt, e);
                    last_err = Some(e);
                }
            }
        }

        let detail = last_err.map(|e| e.to_string()).unwrap_or_default();
        Err(Error::Llm(format!(
            "all retry attempts exhausted: {}",
            detail
        )))
    }

    fn call_api(&self, prompt: &str) -> Result<String> {
        match self.config.resolved_provider() {
            Provider::Gemini => self.call_gemini(prompt),
            Provider::OpenAi => self.call_openai(prompt),
        }
    }

    fn call_openai(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.config.temperature,
        });

        let url = format!("{}/chat/completions", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| Error::Llm(format!("failed to execute request: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| Error::Llm(format!("failed to read response body: {}", e)))?;

        if status != reqwest::StatusCode::OK {
            return Err(Error::Llm(format!(
                "API returned non-200 status {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Llm(format!("failed to parse API response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Llm("API response contains no choices".to_string()))
    }

    fn call_gemini(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.config.temperature },
        });

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.api_key
        );
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| Error::Llm(format!("failed to execute request: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| Error::Llm(format!("failed to read response body: {}", e)))?;

        if status != reqwest::StatusCode::OK {
            return Err(Error::Llm(format!(
                "API returned non-200 status {}: {}",
                status.as_u16(),
                text
            )));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| Error::Llm(format!("failed to parse API response: {}", e)))?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| Error::Llm("API response contains no candidates".to_string()))?;

        candidate
            .content
            .parts
            .into_iter()
            .next()
            .map(|part| part.text)
            .ok_or_else(|| Error::Llm("API response candidate contains no parts".to_string()))
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: String,
}

// Pure functions

fn build_prompt(
    role: &str,
    tone: &str,
    summary: &Summary,
    report_language: &str,
) -> Result<String> {
    let summary_json = serde_json::to_string_pretty(summary)?;

    Ok(format!(
        r#"Role: {role}

Task: Analyze the following GitHub repository trending data and provide insights in {language}.

Data:
{data}

Instructions:
1. Write a brief introduction (2-3 sentences) summarizing the overall trends
2. For each category, provide 1-2 sentences of analytical commentary
3. Comment on dark horse projects (high score)
4. Comment on repeater projects (consecutive appearances)
5. Select 3-5 highlight repositories and provide specific insights for each
6. Maintain a {tone} tone
7. Do NOT fabricate numbers - only interpret the provided data
8. Output valid JSON in this structure:
{{
  "intro": "...",
  "category_notes": {{"category_name": "..."}},
  "dark_horse_notes": "...",
  "repeaters_notes": "...",
  "highlights": [
    {{"repo": "owner/repo", "comment": "...", "tone": "neutral-analytical"}}
  ]
}}"#,
        role = role,
        language = report_language,
        data = summary_json,
        tone = tone,
    ))
}

/// Parse cleaned response text into commentary. Missing sections default to
/// empty, but an empty `intro` means the response is unusable.
fn parse_response(response_text: &str) -> Result<Commentary> {
    let cleaned = clean_json_response(response_text);

    let output: Commentary = serde_json::from_str(cleaned)
        .map_err(|e| Error::Llm(format!("failed to parse LLM response: {}", e)))?;

    if output.intro.is_empty() {
        return Err(Error::Llm(
            "LLM response missing required field: intro".to_string(),
        ));
    }

    Ok(output)
}

/// Strip a surrounding Markdown code fence (with optional language tag) and
/// outer whitespace.
fn clean_json_response(text: &str) -> &str {
    let mut text = text.trim();

    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest,
        };
        text = text.strip_suffix("```").unwrap_or(text);
        text = text.trim();
    }

    text
}
