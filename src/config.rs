//! Startup configuration: provider credentials from the environment, plus agent
//! personas, exam thresholds and the material catalog from an optional TOML file.
//!
//! Everything here is read once in `main` and passed down explicitly.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{Language, MAX_ITEMS_PER_REQUEST};

pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const CONFIG_PATH_VAR: &str = "STUDYKIT_CONFIG_PATH";

/// Credentials and endpoints for the live providers.
/// Primary = Anthropic Messages API, secondary = OpenAI chat completions.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
  pub anthropic_api_key: Option<String>,
  pub anthropic_base_url: String,
  pub anthropic_model: String,
  pub openai_api_key: Option<String>,
  pub openai_base_url: String,
  pub openai_model: String,
  /// No timeout unless set; the transport default applies.
  pub timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
  fn default() -> Self {
    Self {
      anthropic_api_key: None,
      anthropic_base_url: "https://api.anthropic.com".into(),
      anthropic_model: "claude-3-5-sonnet-20241022".into(),
      openai_api_key: None,
      openai_base_url: "https://api.openai.com/v1".into(),
      openai_model: "gpt-4o".into(),
      timeout_secs: None,
    }
  }
}

impl ProviderConfig {
  /// Read provider settings from the process environment. Blank keys count as absent.
  pub fn from_env() -> Self {
    let d = Self::default();
    let key = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
    Self {
      anthropic_api_key: key(ANTHROPIC_API_KEY),
      anthropic_base_url: std::env::var("ANTHROPIC_BASE_URL").unwrap_or(d.anthropic_base_url),
      anthropic_model: std::env::var("ANTHROPIC_MODEL").unwrap_or(d.anthropic_model),
      openai_api_key: key(OPENAI_API_KEY),
      openai_base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(d.openai_base_url),
      openai_model: std::env::var("OPENAI_MODEL").unwrap_or(d.openai_model),
      timeout_secs: std::env::var("PROVIDER_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()),
    }
  }

  pub fn has_credentials(&self) -> bool {
    self.anthropic_api_key.is_some() || self.openai_api_key.is_some()
  }
}

/// Agent personas. Each becomes the system prompt of its agent, followed by
/// `json_only_suffix`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz_master: String,
  pub vocab_sensei: String,
  pub exam_proctor: String,
  pub json_only_suffix: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_master: "You are an expert educational quiz creator specializing in Material Science. You focus on creating thought-provoking multiple-choice questions that test deep understanding, not just memorization. You craft excellent distractors and provide clear explanations.".into(),
      vocab_sensei: "You are a German language expert specializing in technical Material Science vocabulary. You create memorable flashcards that help students master German technical terms with clear explanations, pronunciation hints, and memory techniques.".into(),
      exam_proctor: "You are a rigorous but fair exam creator specializing in comprehensive Material Science assessments. You design realistic exam conditions with varied question types, appropriate point distributions, and balanced difficulty progression.".into(),
      json_only_suffix: "IMPORTANT: When asked for JSON, respond with valid JSON only. No explanations, no markdown, just pure JSON.".into(),
    }
  }
}

/// Thresholds used by the exam agent. Empirical values; override in TOML.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExamPolicy {
  /// Baseline points per question; target total = count * this.
  pub points_per_question: u32,
  /// Allowed relative deviation of the summed points from the target.
  pub rebalance_tolerance: f64,
  /// Questions worth more than this count as hard.
  pub hard_points_above: u32,
  /// Questions worth less than this count as easy.
  pub easy_points_below: u32,
  pub max_hard_fraction: f64,
  pub min_easy_fraction: f64,
  /// Replies with a question worth more than this are rejected.
  pub max_points_per_question: u32,
}

impl Default for ExamPolicy {
  fn default() -> Self {
    Self {
      points_per_question: 10,
      rebalance_tolerance: 0.2,
      hard_points_above: 12,
      easy_points_below: 8,
      max_hard_fraction: 0.4,
      min_easy_fraction: 0.2,
      max_points_per_question: 100,
    }
  }
}

/// Request and catalog bounds.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Limits {
  /// Questions or cards per request. Values above `MAX_ITEMS_PER_REQUEST` are clamped.
  pub max_items_per_request: usize,
  /// Uploaded materials kept in memory; the oldest is evicted beyond this.
  pub max_uploads: usize,
}

impl Default for Limits {
  fn default() -> Self {
    Self { max_items_per_request: MAX_ITEMS_PER_REQUEST, max_uploads: 64 }
  }
}

impl Limits {
  pub fn max_items(&self) -> usize {
    self.max_items_per_request.clamp(1, MAX_ITEMS_PER_REQUEST)
  }
}

/// Material entry accepted in TOML. Provide either inline `text` or a `path`
/// to a UTF-8 text file holding the extracted content.
#[derive(Clone, Debug, Deserialize)]
pub struct MaterialCfg {
  pub id: String,
  pub title: String,
  #[serde(default)] pub kind: Option<String>,
  #[serde(default)] pub week: Option<String>,
  #[serde(default)] pub language: Language,
  #[serde(default)] pub text: Option<String>,
  #[serde(default)] pub path: Option<PathBuf>,
}

/// Schema of the optional TOML file.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct FileConfig {
  #[serde(default)] pub prompts: Prompts,
  #[serde(default)] pub exam_policy: ExamPolicy,
  #[serde(default)] pub limits: Limits,
  #[serde(default)] pub materials: Vec<MaterialCfg>,
}

/// Everything the application needs at startup.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
  pub provider: ProviderConfig,
  pub prompts: Prompts,
  pub exam_policy: ExamPolicy,
  pub limits: Limits,
  pub materials: Vec<MaterialCfg>,
}

impl AppConfig {
  /// Build from env vars plus the TOML file named by STUDYKIT_CONFIG_PATH (if any).
  pub fn from_env() -> Self {
    let file = std::env::var(CONFIG_PATH_VAR)
      .ok()
      .and_then(|p| load_file_config(Path::new(&p)))
      .unwrap_or_default();
    Self {
      provider: ProviderConfig::from_env(),
      prompts: file.prompts,
      exam_policy: file.exam_policy,
      limits: file.limits,
      materials: file.materials,
    }
  }
}

/// Attempt to load `FileConfig` from `path`. On any parsing/IO error, returns None.
pub fn load_file_config(path: &Path) -> Option<FileConfig> {
  match std::fs::read_to_string(path) {
    Ok(s) => match toml::from_str::<FileConfig>(&s) {
      Ok(cfg) => {
        info!(target: "studykit_backend", path = %path.display(), materials = cfg.materials.len(), "Loaded config (TOML)");
        if cfg.exam_policy != ExamPolicy::default() {
          warn!(target: "studykit_backend", policy = ?cfg.exam_policy, "Exam policy overridden from config");
        }
        if cfg.limits.max_items_per_request > MAX_ITEMS_PER_REQUEST {
          warn!(target: "studykit_backend", requested = cfg.limits.max_items_per_request, max = MAX_ITEMS_PER_REQUEST, "max_items_per_request clamped");
        }
        Some(cfg)
      }
      Err(e) => {
        error!(target: "studykit_backend", path = %path.display(), error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "studykit_backend", path = %path.display(), error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn partial_toml_keeps_defaults() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(
      f,
      r#"
[prompts]
quiz_master = "You write short quizzes."

[exam_policy]
rebalance_tolerance = 0.3

[limits]
max_items_per_request = 20

[[materials]]
id = "w1-ch1"
title = "Kapitel 1 - Materialklassen"
language = "de"
text = "Metalle, Keramiken, Polymere."
"#
    )
    .unwrap();

    let cfg = load_file_config(f.path()).expect("config should parse");
    assert_eq!(cfg.prompts.quiz_master, "You write short quizzes.");
    assert_eq!(cfg.prompts.exam_proctor, Prompts::default().exam_proctor);
    assert_eq!(cfg.exam_policy.rebalance_tolerance, 0.3);
    assert_eq!(cfg.exam_policy.points_per_question, 10);
    assert_eq!(cfg.limits.max_items(), 20);
    assert_eq!(cfg.limits.max_uploads, 64);
    assert_eq!(cfg.materials.len(), 1);
    assert_eq!(cfg.materials[0].language, Language::De);
  }

  #[test]
  fn broken_toml_yields_none() {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    write!(f, "[[materials]]\nid = ").unwrap();
    assert!(load_file_config(f.path()).is_none());
    assert!(load_file_config(Path::new("/definitely/not/here.toml")).is_none());
  }

  #[test]
  fn item_limit_cannot_exceed_the_hard_ceiling() {
    let raised = Limits { max_items_per_request: 10_000, ..Limits::default() };
    assert_eq!(raised.max_items(), MAX_ITEMS_PER_REQUEST);
    let zero = Limits { max_items_per_request: 0, ..Limits::default() };
    assert_eq!(zero.max_items(), 1);
  }

  #[test]
  fn credentials_detection() {
    let mut p = ProviderConfig::default();
    assert!(!p.has_credentials());
    p.openai_api_key = Some("sk-test".into());
    assert!(p.has_credentials());
  }
}
