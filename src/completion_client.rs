use crate::circuit_breaker::{
    breaker_state, completion_breaker, BreakerSettings, BreakerState, CompletionCircuitBreaker,
};
use crate::errors::AppError;
use failsafe::futures::CircuitBreaker;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// Settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub breaker: BreakerSettings,
}

/// Reported under `/status` when a completion API is configured.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStatus {
    pub model: String,
    pub breaker: BreakerState,
}

/// Client for a chat completions API.
///
/// The reply is free text that is expected to contain a JSON object; nothing
/// beyond best-effort parsing is assumed about it. Calls go through a circuit
/// breaker so a failing endpoint is skipped instead of retried every tick.
pub struct CompletionClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    breaker: CompletionCircuitBreaker,
}

impl CompletionClient {
    /// Creates a new `CompletionClient` with a 30 second request timeout.
    pub fn new(config: CompletionConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create completion client: {}", e))
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            model: config.model,
            breaker: completion_breaker(&config.breaker),
        })
    }

    pub fn status(&self) -> CompletionStatus {
        CompletionStatus {
            model: self.model.clone(),
            breaker: breaker_state(&self.breaker),
        }
    }

    /// Sends a system/user prompt pair and returns the reply text.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ExternalApiError` on transport failure, a non-2xx
    /// status, a reply without `choices[0].message.content`, or when the
    /// circuit breaker is open.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, AppError> {
        match self.breaker.call(self.send(system, user)).await {
            Ok(content) => Ok(content),
            Err(failsafe::Error::Inner(e)) => Err(e),
            Err(failsafe::Error::Rejected) => Err(AppError::ExternalApiError(
                "Completion circuit open, call rejected".to_string(),
            )),
        }
    }

    async fn send(&self, system: &str, user: &str) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.api_url);
        tracing::debug!("Requesting completion from {} ({})", url, self.model);

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": 0.3,
            "max_tokens": 400,
            "response_format": {"type": "json_object"}
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApiError(format!(
                "Completion API returned {}: {}",
                status, error_text
            )));
        }

        let data: serde_json::Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse completion response: {}", e))
        })?;

        extract_completion_content(&data)
    }

    /// Requests a JSON reply and deserializes it, substituting `fallback` on
    /// any failure.
    ///
    /// Returns the value and whether it came from the API.
    pub async fn complete_json_or<T: DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
        fallback: T,
    ) -> (T, bool) {
        let raw = match self.complete(system, user).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(model = %self.model, "Completion call failed, using fallback: {}", e);
                return (fallback, false);
            }
        };

        match parse_json_reply::<T>(&raw) {
            Some(value) => (value, true),
            None => {
                tracing::warn!(
                    model = %self.model,
                    reply_len = raw.len(),
                    "Completion reply was not valid JSON, using fallback"
                );
                (fallback, false)
            }
        }
    }
}

/// Pulls `choices[0].message.content` out of a chat completions response.
pub fn extract_completion_content(data: &serde_json::Value) -> Result<String, AppError> {
    data.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(String::from)
        .ok_or_else(|| {
            AppError::ExternalApiError(
                "Completion response missing choices[0].message.content".to_string(),
            )
        })
}

/// Best-effort parse of a model reply into `T`.
///
/// Tries, in order: the whole reply, a fenced code block, the outermost
/// `{...}` span, and each of those with trailing commas removed.
pub fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let trimmed = raw.trim();

    let candidates = [
        Some(trimmed),
        extract_json_from_codeblock(trimmed),
        extract_braced(trimmed),
    ];

    for candidate in candidates.into_iter().flatten() {
        if let Ok(value) = serde_json::from_str::<T>(candidate) {
            return Some(value);
        }
        if let Ok(value) = serde_json::from_str::<T>(&strip_trailing_commas(candidate)) {
            return Some(value);
        }
    }

    None
}

fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let fence = text.find("```")?;
    let after_fence = text.get(fence + 3..)?;
    // Skip an optional language tag up to the end of the line
    let body_start = after_fence.find('\n').map(|nl| nl + 1).unwrap_or(0);
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

fn extract_braced(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    text.get(start..=end)
}

/// Strip trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        result.push(c);
    }

    result
}
