//! Provider client: one of Anthropic (primary), OpenAI (secondary) or the
//! deterministic mock, chosen once from `ProviderConfig`.
//!
//! `complete` makes a single live attempt and returns an explicit `Result`.
//! `fallback_to_mock` is the substitution policy: any live failure is logged
//! and replaced by the mock reply. `call` composes the two and never fails.
//!
//! NOTE: We never log API keys or prompt contents, only sizes, models and latencies.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::mock::mock_response;
use crate::util::trunc_for_log;

pub const TEMPERATURE: f32 = 0.7;
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const CLIENT_UA: &str = "studykit-backend/0.1";

/// Which backend the client talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
  Anthropic,
  #[serde(rename = "openai")]
  OpenAI,
  Mock,
}

impl ProviderKind {
  /// Selection policy: primary credential, else secondary, else mock.
  pub fn select(cfg: &ProviderConfig) -> Self {
    if cfg.anthropic_api_key.is_some() {
      ProviderKind::Anthropic
    } else if cfg.openai_api_key.is_some() {
      ProviderKind::OpenAI
    } else {
      ProviderKind::Mock
    }
  }

  pub fn is_live(&self) -> bool {
    !matches!(self, ProviderKind::Mock)
  }
}

/// One completion request: system prompt, user prompt and token budget.
#[derive(Clone, Copy, Debug)]
pub struct ProviderRequest<'a> {
  pub system: &'a str,
  pub prompt: &'a str,
  pub max_tokens: u32,
}

/// Where a completion's text came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
  Live,
  Mock,
  /// A live call failed and the mock reply was substituted.
  MockFallback,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
  pub text: String,
  pub origin: Origin,
}

#[derive(Clone)]
pub struct ProviderClient {
  kind: ProviderKind,
  http: reqwest::Client,
  api_key: String,
  base_url: String,
  model: String,
}

impl ProviderClient {
  /// Build the client for whichever backend `cfg` selects.
  pub fn new(cfg: &ProviderConfig) -> Result<Self, ProviderError> {
    let kind = ProviderKind::select(cfg);
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = cfg.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let http = builder.build()?;

    let (api_key, base_url, model) = match kind {
      ProviderKind::Anthropic => (
        cfg.anthropic_api_key.clone().unwrap_or_default(),
        cfg.anthropic_base_url.trim_end_matches('/').to_string(),
        cfg.anthropic_model.clone(),
      ),
      ProviderKind::OpenAI => (
        cfg.openai_api_key.clone().unwrap_or_default(),
        cfg.openai_base_url.trim_end_matches('/').to_string(),
        cfg.openai_model.clone(),
      ),
      ProviderKind::Mock => (String::new(), String::new(), "mock".to_string()),
    };

    Ok(Self { kind, http, api_key, base_url, model })
  }

  /// Client that always answers from the mock.
  pub fn mock() -> Self {
    Self {
      kind: ProviderKind::Mock,
      http: reqwest::Client::new(),
      api_key: String::new(),
      base_url: String::new(),
      model: "mock".into(),
    }
  }

  pub fn kind(&self) -> ProviderKind { self.kind }
  pub fn model(&self) -> &str { &self.model }
  pub fn base_url(&self) -> &str { &self.base_url }

  /// Single attempt against the selected backend.
  #[instrument(level = "info", skip(self, req), fields(provider = ?self.kind, model = %self.model, max_tokens = req.max_tokens, prompt_len = req.prompt.len()))]
  pub async fn complete(&self, req: ProviderRequest<'_>) -> Result<String, ProviderError> {
    let start = Instant::now();
    let result = match self.kind {
      ProviderKind::Anthropic => self.anthropic_messages(req).await,
      ProviderKind::OpenAI => self.openai_chat(req).await,
      ProviderKind::Mock => Ok(mock_response(req.prompt)),
    };
    let elapsed = start.elapsed();
    match &result {
      Ok(text) => info!(?elapsed, response_len = text.len(), "Provider response received"),
      Err(e) => warn!(?elapsed, error = %e, "Provider call failed"),
    }
    result
  }

  /// Live attempt with mock substitution on failure.
  pub async fn call(&self, req: ProviderRequest<'_>) -> Completion {
    let result = self.complete(req).await;
    fallback_to_mock(self.kind, req, result)
  }

  async fn anthropic_messages(&self, req: ProviderRequest<'_>) -> Result<String, ProviderError> {
    let url = format!("{}/v1/messages", self.base_url);
    let body = MessagesRequest {
      model: &self.model,
      max_tokens: req.max_tokens,
      temperature: TEMPERATURE,
      system: req.system,
      messages: vec![ChatMessageReq { role: "user", content: req.prompt }],
    };

    let res = self.http.post(&url)
      .header(USER_AGENT, CLIENT_UA)
      .header(CONTENT_TYPE, "application/json")
      .header("x-api-key", &self.api_key)
      .header("anthropic-version", ANTHROPIC_VERSION)
      .json(&body).send().await?;

    let text = read_success_body(res).await?;
    let parsed: MessagesResponse =
      serde_json::from_str(&text).map_err(|e| ProviderError::MalformedBody(e.to_string()))?;
    if let Some(usage) = &parsed.usage {
      info!(input_tokens = ?usage.input_tokens, output_tokens = ?usage.output_tokens, "Anthropic usage");
    }
    parsed.content.into_iter()
      .find_map(|block| block.text)
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
      .ok_or(ProviderError::EmptyCompletion)
  }

  async fn openai_chat(&self, req: ProviderRequest<'_>) -> Result<String, ProviderError> {
    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatCompletionRequest {
      model: &self.model,
      messages: vec![
        ChatMessageReq { role: "system", content: req.system },
        ChatMessageReq { role: "user", content: req.prompt },
      ],
      temperature: TEMPERATURE,
      max_tokens: req.max_tokens,
    };

    let res = self.http.post(&url)
      .header(USER_AGENT, CLIENT_UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&body).send().await?;

    let text = read_success_body(res).await?;
    let parsed: ChatCompletionResponse =
      serde_json::from_str(&text).map_err(|e| ProviderError::MalformedBody(e.to_string()))?;
    if let Some(usage) = &parsed.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    parsed.choices.into_iter()
      .next()
      .and_then(|c| c.message.content)
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
      .ok_or(ProviderError::EmptyCompletion)
  }
}

/// Substitution policy at the provider boundary.
pub fn fallback_to_mock(
  kind: ProviderKind,
  req: ProviderRequest<'_>,
  result: Result<String, ProviderError>,
) -> Completion {
  match result {
    Ok(text) => Completion {
      text,
      origin: if kind.is_live() { Origin::Live } else { Origin::Mock },
    },
    Err(e) => {
      warn!(provider = ?kind, error = %e, "Live provider failed; substituting mock response");
      Completion { text: mock_response(req.prompt), origin: Origin::MockFallback }
    }
  }
}

async fn read_success_body(res: reqwest::Response) -> Result<String, ProviderError> {
  let status = res.status();
  let body = res.text().await?;
  if !status.is_success() {
    let message = extract_provider_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
    return Err(ProviderError::Status { status: status.as_u16(), message });
  }
  Ok(body)
}

// --- Wire DTOs ---

#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'a str, content: &'a str }

#[derive(Serialize)]
struct MessagesRequest<'a> {
  model: &'a str,
  max_tokens: u32,
  temperature: f32,
  system: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
}

#[derive(Deserialize)]
struct MessagesResponse {
  content: Vec<ContentBlock>,
  #[serde(default)] usage: Option<AnthropicUsage>,
}
#[derive(Deserialize)]
struct ContentBlock { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
struct AnthropicUsage {
  #[serde(default)] input_tokens: Option<u32>,
  #[serde(default)] output_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  temperature: f32,
  max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Both providers wrap errors as `{"error": {"message": ...}}`.
fn extract_provider_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
