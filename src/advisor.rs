use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/generate";
const DEFAULT_MODEL: &str = "llama3";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Seam to the AI collaborator. The engine treats whatever comes back as
/// untrusted text; parsing and validation happen on the caller's side.
pub trait Advisor {
    fn complete(&self, prompt: &str) -> Result<String, ScheduleError>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Blocking HTTP advisor against an Ollama-style generate endpoint.
///
/// Endpoint and model come from `LEITNER_AI_URL` / `LEITNER_AI_MODEL`;
/// the request timeout is the advisor's failure boundary, so a hung
/// collaborator surfaces as `AdvisorUnavailable` rather than blocking
/// the CLI forever.
pub struct HttpAdvisor {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

impl HttpAdvisor {
    pub fn from_env() -> Result<Self, ScheduleError> {
        let endpoint = std::env::var("LEITNER_AI_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.into());
        let model = std::env::var("LEITNER_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Self::new(endpoint, model)
    }

    pub fn new(endpoint: String, model: String) -> Result<Self, ScheduleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ScheduleError::AdvisorUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            model,
        })
    }
}

impl Advisor for HttpAdvisor {
    fn complete(&self, prompt: &str) -> Result<String, ScheduleError> {
        debug!("advisor call: model={} endpoint={}", self.model, self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .map_err(|e| ScheduleError::AdvisorUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScheduleError::AdvisorUnavailable(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .map_err(|e| ScheduleError::AdvisorUnavailable(e.to_string()))?;

        if body.response.trim().is_empty() {
            return Err(ScheduleError::AdvisorUnavailable(
                "model returned an empty response".into(),
            ));
        }
        Ok(body.response)
    }
}

/// Pulls the first bracket-delimited JSON array out of free-form model
/// output, repairing a single trailing comma before the closing bracket.
/// Returns `None` when no array is present at all.
pub fn extract_json_array(raw: &str) -> Option<String> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }
    let snippet = &raw[start..=end];

    // Models occasionally emit `..., ]`; strip that one defect.
    let inner = snippet[..snippet.len() - 1].trim_end();
    if let Some(stripped) = inner.strip_suffix(',') {
        let mut repaired = String::with_capacity(snippet.len());
        repaired.push_str(stripped);
        repaired.push(']');
        return Some(repaired);
    }
    Some(snippet.to_string())
}
