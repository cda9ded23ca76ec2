//! Generation pipeline shared by HTTP and WebSocket handlers.
//!
//! Each artifact request walks a small state machine (extracting, validating,
//! generating, done or failed) and reports every transition to a
//! `ProgressSink`. While the mock provider is active, seeded materials are
//! served from their own offline pools, and orchestrator failures fall back
//! to the deterministic pool content.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
  ArtifactKind, DifficultyReport, ExamOptions, FlashcardOptions, GeneratedExam, GeneratedFlashcards,
  GeneratedQuiz, Language, QuizOptions,
};
use crate::error::GenerationError;
use crate::fallback::{
  content_pool, fallback_exam, fallback_flashcards, fallback_quiz, pool_for_material, ContentPool,
};
use crate::materials::Material;
use crate::provider::ProviderKind;
use crate::state::AppState;
use crate::validator::validate_content;

pub const FAILED_STAGE: &str = "Generation failed";

/// UI-facing progress of one artifact request.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
  pub is_loading: bool,
  pub error: Option<String>,
  pub progress: u8,
  pub stage: String,
}

impl GenerationState {
  pub fn begin(&mut self, stage: &str) {
    self.is_loading = true;
    self.error = None;
    self.progress = 0;
    self.stage = stage.to_string();
  }

  pub fn advance(&mut self, progress: u8, stage: &str) {
    self.progress = progress.min(100);
    self.stage = stage.to_string();
  }

  pub fn succeed(&mut self, stage: &str) {
    self.is_loading = false;
    self.progress = 100;
    self.stage = stage.to_string();
  }

  /// Progress stays where the failure happened.
  pub fn fail(&mut self, message: &str) {
    self.is_loading = false;
    self.error = Some(message.to_string());
    self.stage = FAILED_STAGE.to_string();
  }
}

/// Receives every state transition of a pipeline run.
pub trait ProgressSink: Send + Sync {
  fn report(&self, artifact: ArtifactKind, state: &GenerationState);
}

impl ProgressSink for () {
  fn report(&self, _artifact: ArtifactKind, _state: &GenerationState) {}
}

impl ProgressSink for UnboundedSender<(ArtifactKind, GenerationState)> {
  fn report(&self, artifact: ArtifactKind, state: &GenerationState) {
    // Receiver gone means the socket closed; nothing left to notify.
    let _ = self.send((artifact, state.clone()));
  }
}

struct Tracker<'a> {
  artifact: ArtifactKind,
  state: GenerationState,
  sink: &'a dyn ProgressSink,
}

impl<'a> Tracker<'a> {
  fn start(artifact: ArtifactKind, sink: &'a dyn ProgressSink) -> Self {
    let mut state = GenerationState::default();
    state.begin("Extracting content");
    let tracker = Self { artifact, state, sink };
    tracker.emit();
    tracker
  }

  fn emit(&self) {
    debug!(target: "generation", artifact = self.artifact.as_str(), progress = self.state.progress, stage = %self.state.stage, "Progress");
    self.sink.report(self.artifact, &self.state);
  }

  fn advance(&mut self, progress: u8, stage: &str) {
    self.state.advance(progress, stage);
    self.emit();
  }

  fn succeed(&mut self, stage: &str) -> GenerationState {
    self.state.succeed(stage);
    self.emit();
    self.state.clone()
  }

  fn fail(&mut self, error: GenerationError) -> PipelineFailure {
    self.state.fail(&error.to_string());
    self.emit();
    warn!(target: "generation", artifact = self.artifact.as_str(), error = %error, "Generation failed");
    PipelineFailure { error, state: self.state.clone() }
  }
}

/// Where the text to generate from comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceRef {
  Material(String),
  Text(String),
}

impl SourceRef {
  /// Material id wins when both are given.
  pub fn from_parts(material_id: Option<String>, text: Option<String>) -> Result<Self, GenerationError> {
    match (material_id, text) {
      (Some(id), _) if !id.trim().is_empty() => Ok(SourceRef::Material(id)),
      (_, Some(text)) => Ok(SourceRef::Text(text)),
      _ => Err(GenerationError::InvalidOptions("either materialId or text is required".into())),
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentOrigin {
  Provider,
  Fallback,
}

#[derive(Clone, Debug)]
pub struct Generated<T> {
  pub artifact: T,
  pub origin: ContentOrigin,
  pub state: GenerationState,
}

#[derive(Clone, Debug)]
pub struct ExamOutcome {
  pub generated: Generated<GeneratedExam>,
  pub analysis: DifficultyReport,
  pub topics: Vec<String>,
}

/// A failed run: the error plus the final state the UI saw.
#[derive(Debug)]
pub struct PipelineFailure {
  pub error: GenerationError,
  pub state: GenerationState,
}

/// Source text plus the catalog entry it came from, if any.
struct Resolved {
  text: String,
  material: Option<Material>,
}

impl Resolved {
  fn material_id(&self) -> Option<&str> {
    self.material.as_ref().map(|m| m.id.as_str())
  }

  /// The request's language, else the material's.
  fn language(&self, requested: Option<Language>) -> Option<Language> {
    requested.or(self.material.as_ref().map(|m| m.language))
  }
}

async fn resolve_source(state: &AppState, source: &SourceRef) -> Result<Resolved, GenerationError> {
  match source {
    SourceRef::Material(id) => {
      let material = state.materials.get_material(id).await?;
      let text = state.materials.get_source_text(id).await?;
      Ok(Resolved { text, material: Some(material) })
    }
    SourceRef::Text(text) => Ok(Resolved { text: text.clone(), material: None }),
  }
}

/// Fallback applies only to generation failures while the mock is active.
fn use_fallback(state: &AppState, error: &GenerationError) -> bool {
  state.agents.provider_kind() == ProviderKind::Mock && !error.is_client_error()
}

/// A seeded material's own pool, served instead of the generic mock reply.
fn curated_pool(state: &AppState, resolved: &Resolved) -> Option<&'static ContentPool> {
  if state.agents.provider_kind() != ProviderKind::Mock {
    return None;
  }
  resolved.material_id().and_then(pool_for_material)
}

#[instrument(level = "info", skip(state, source, options, sink), fields(count = options.question_count))]
pub async fn generate_quiz_for(
  state: &AppState,
  source: &SourceRef,
  options: &QuizOptions,
  enhance: bool,
  sink: &dyn ProgressSink,
) -> Result<Generated<GeneratedQuiz>, PipelineFailure> {
  let mut t = Tracker::start(ArtifactKind::Quiz, sink);
  if let Err(e) = options.check_within(state.limits.max_items()) {
    return Err(t.fail(e));
  }
  let resolved = match resolve_source(state, source).await {
    Ok(resolved) => resolved,
    Err(e) => return Err(t.fail(e)),
  };
  let mut options = options.clone();
  options.language = resolved.language(options.language);
  let text = &resolved.text;
  t.advance(20, "Content located");
  if let Err(e) = validate_content(text) {
    return Err(t.fail(e.into()));
  }
  t.advance(50, "Content validated");
  t.advance(70, "Quiz Master is writing questions");

  let (mut quiz, origin) = match curated_pool(state, &resolved) {
    Some(pool) => {
      debug!(target: "generation", material = ?resolved.material_id(), "Serving curated offline quiz");
      (fallback_quiz(text, &options, pool), ContentOrigin::Fallback)
    }
    None => match state.agents.generate_quiz(text, &options).await {
      Ok(quiz) => (quiz, ContentOrigin::Provider),
      Err(e) if use_fallback(state, &e) => {
        warn!(target: "generation", error = %e, "Serving fallback quiz");
        (fallback_quiz(text, &options, content_pool(resolved.material_id())), ContentOrigin::Fallback)
      }
      Err(e) => return Err(t.fail(e)),
    },
  };
  if enhance {
    quiz = state.agents.enhance_quiz_with_vocab_hints(&quiz).await;
  }

  info!(target: "generation", questions = quiz.questions.len(), ?origin, language = options.language().as_str(), "Quiz ready");
  Ok(Generated { artifact: quiz, origin, state: t.succeed("Quiz ready") })
}

#[instrument(level = "info", skip(state, source, options, sink), fields(count = options.card_count))]
pub async fn generate_flashcards_for(
  state: &AppState,
  source: &SourceRef,
  options: &FlashcardOptions,
  sink: &dyn ProgressSink,
) -> Result<Generated<GeneratedFlashcards>, PipelineFailure> {
  let mut t = Tracker::start(ArtifactKind::Flashcards, sink);
  if let Err(e) = options.check_within(state.limits.max_items()) {
    return Err(t.fail(e));
  }
  let resolved = match resolve_source(state, source).await {
    Ok(resolved) => resolved,
    Err(e) => return Err(t.fail(e)),
  };
  let mut options = options.clone();
  options.language = resolved.language(options.language);
  let text = &resolved.text;
  t.advance(20, "Content located");
  if let Err(e) = validate_content(text) {
    return Err(t.fail(e.into()));
  }
  t.advance(50, "Content validated");
  t.advance(70, "Vocab Sensei is writing flashcards");

  let (cards, origin) = match curated_pool(state, &resolved) {
    Some(pool) => {
      debug!(target: "generation", material = ?resolved.material_id(), "Serving curated offline flashcards");
      (fallback_flashcards(text, &options, pool), ContentOrigin::Fallback)
    }
    None => match state.agents.generate_flashcards(text, &options).await {
      Ok(cards) => (cards, ContentOrigin::Provider),
      Err(e) if use_fallback(state, &e) => {
        warn!(target: "generation", error = %e, "Serving fallback flashcards");
        (fallback_flashcards(text, &options, content_pool(resolved.material_id())), ContentOrigin::Fallback)
      }
      Err(e) => return Err(t.fail(e)),
    },
  };

  info!(target: "generation", cards = cards.cards.len(), ?origin, language = options.language().as_str(), "Flashcards ready");
  Ok(Generated { artifact: cards, origin, state: t.succeed("Flashcards ready") })
}

#[instrument(level = "info", skip(state, source, options, sink), fields(count = options.question_count, duration = options.duration_minutes))]
pub async fn generate_exam_for(
  state: &AppState,
  source: &SourceRef,
  options: &ExamOptions,
  sink: &dyn ProgressSink,
) -> Result<ExamOutcome, PipelineFailure> {
  let mut t = Tracker::start(ArtifactKind::Exam, sink);
  if let Err(e) = options.check_within(state.limits.max_items()) {
    return Err(t.fail(e));
  }
  let resolved = match resolve_source(state, source).await {
    Ok(resolved) => resolved,
    Err(e) => return Err(t.fail(e)),
  };
  let text = &resolved.text;
  t.advance(15, "Content located");
  if let Err(e) = validate_content(text) {
    return Err(t.fail(e.into()));
  }
  t.advance(35, "Content validated");

  let mut options = options.clone();
  options.language = resolved.language(options.language);
  if options.focus_topics.is_empty() {
    options.focus_topics = state.agents.extract_topics(text).await;
  }
  t.advance(55, "Topics identified");
  t.advance(75, "Exam Proctor is writing the exam");

  let policy = state.agents.exam_agent().policy();
  let (exam, origin) = match curated_pool(state, &resolved) {
    Some(pool) => {
      debug!(target: "generation", material = ?resolved.material_id(), "Serving curated offline exam");
      (fallback_exam(text, &options, policy, pool), ContentOrigin::Fallback)
    }
    None => match state.agents.generate_exam(text, &options).await {
      Ok(exam) => (exam, ContentOrigin::Provider),
      Err(e) if use_fallback(state, &e) => {
        warn!(target: "generation", error = %e, "Serving fallback exam");
        (fallback_exam(text, &options, policy, content_pool(resolved.material_id())), ContentOrigin::Fallback)
      }
      Err(e) => return Err(t.fail(e)),
    },
  };
  let analysis = state.agents.validate_exam_difficulty(&exam);

  info!(target: "generation", questions = exam.questions.len(), points = exam.metadata.total_points, ?origin, "Exam ready");
  Ok(ExamOutcome {
    generated: Generated { artifact: exam, origin, state: t.succeed("Exam ready") },
    analysis,
    topics: options.focus_topics,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;

  use serde_json::json;
  use wiremock::matchers::{body_string_contains, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use crate::config::{AppConfig, Limits, ProviderConfig};
  use crate::error::ValidationError;

  #[derive(Default)]
  struct Recorder(Mutex<Vec<(ArtifactKind, GenerationState)>>);

  impl ProgressSink for Recorder {
    fn report(&self, artifact: ArtifactKind, state: &GenerationState) {
      self.0.lock().unwrap().push((artifact, state.clone()));
    }
  }

  impl Recorder {
    fn progress(&self) -> Vec<u8> {
      self.0.lock().unwrap().iter().map(|(_, s)| s.progress).collect()
    }
  }

  fn app() -> AppState {
    AppState::new(AppConfig::default()).unwrap()
  }

  fn lecture() -> String {
    "Grain boundaries hinder dislocation motion, so fine-grained metals are stronger. ".repeat(3)
  }

  #[test]
  fn fail_keeps_progress() {
    let mut s = GenerationState::default();
    s.begin("Extracting content");
    s.advance(50, "Content validated");
    s.fail("boom");
    assert_eq!(s.progress, 50);
    assert!(!s.is_loading);
    assert_eq!(s.error.as_deref(), Some("boom"));
    assert_eq!(s.stage, FAILED_STAGE);
  }

  #[test]
  fn state_serializes_camel_case() {
    let mut s = GenerationState::default();
    s.begin("Extracting content");
    let v = serde_json::to_value(&s).unwrap();
    assert_eq!(v["isLoading"], true);
    assert!(v["error"].is_null());
  }

  #[test]
  fn source_ref_needs_one_part() {
    assert_eq!(SourceRef::from_parts(Some("wk-01".into()), Some("x".into())).unwrap(), SourceRef::Material("wk-01".into()));
    assert_eq!(SourceRef::from_parts(None, Some("x".into())).unwrap(), SourceRef::Text("x".into()));
    assert!(SourceRef::from_parts(None, None).is_err());
  }

  #[tokio::test]
  async fn quiz_of_five_without_provider() {
    let state = app();
    let rec = Recorder::default();
    let opts = QuizOptions { question_count: 5, ..QuizOptions::default() };
    let out = generate_quiz_for(&state, &SourceRef::Text(lecture()), &opts, false, &rec).await.unwrap();

    assert_eq!(out.artifact.questions.len(), 5);
    assert!(out.artifact.questions.iter().all(|q| q.correct_answer < q.options.len()));
    assert_eq!(rec.progress(), vec![0, 20, 50, 70, 100]);
    assert!(!out.state.is_loading);
  }

  #[tokio::test]
  async fn empty_text_fails_validation_and_reports() {
    let state = app();
    let rec = Recorder::default();
    let err = generate_quiz_for(&state, &SourceRef::Text(String::new()), &QuizOptions::default(), false, &rec)
      .await
      .unwrap_err();
    assert!(matches!(err.error, GenerationError::Validation(ValidationError::TooShort)));
    assert_eq!(err.state.error.as_deref(), Some("Content too short for meaningful generation"));
    assert_eq!(err.state.progress, 20);
  }

  #[tokio::test]
  async fn exam_from_seed_material_carries_requested_metadata() {
    let state = app();
    let rec = Recorder::default();
    let id = state.materials.list().await[0].id.clone();
    let opts = ExamOptions { question_count: 8, duration_minutes: 90, ..ExamOptions::default() };
    let out = generate_exam_for(&state, &SourceRef::Material(id), &opts, &rec).await.unwrap();

    let exam = &out.generated.artifact;
    assert_eq!(exam.questions.len(), 8);
    assert_eq!(exam.metadata.total_questions, 8);
    assert_eq!(exam.metadata.estimated_duration, 90);
    assert_eq!(exam.metadata.total_points, exam.points_sum());
    assert!(!out.topics.is_empty());
    assert_eq!(rec.progress(), vec![0, 15, 35, 55, 75, 100]);
  }

  #[tokio::test]
  async fn flashcards_stream_over_a_channel() {
    let state = app();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let opts = FlashcardOptions { card_count: 3, ..FlashcardOptions::default() };
    let out = generate_flashcards_for(&state, &SourceRef::Text(lecture()), &opts, &tx).await.unwrap();
    drop(tx);

    assert_eq!(out.artifact.cards.len(), 3);
    let mut seen = Vec::new();
    while let Some((kind, s)) = rx.recv().await {
      assert_eq!(kind, ArtifactKind::Flashcards);
      seen.push(s.progress);
    }
    assert_eq!(seen, vec![0, 20, 50, 70, 100]);
  }

  #[tokio::test]
  async fn unknown_material_is_a_failure_at_zero() {
    let state = app();
    let err = generate_flashcards_for(&state, &SourceRef::Material("missing".into()), &FlashcardOptions::default(), &())
      .await
      .unwrap_err();
    assert!(matches!(err.error, GenerationError::MaterialNotFound(_)));
    assert_eq!(err.state.progress, 0);
  }

  #[tokio::test]
  async fn oversized_counts_fail_fast_instead_of_panicking() {
    let state = app();
    let opts = QuizOptions { question_count: usize::MAX, ..QuizOptions::default() };
    let err = generate_quiz_for(&state, &SourceRef::Text(lecture()), &opts, false, &()).await.unwrap_err();
    assert!(matches!(err.error, GenerationError::InvalidOptions(_)));
    assert_eq!(err.state.progress, 0);

    let opts = ExamOptions { question_count: 500_000_000, ..ExamOptions::default() };
    let err = generate_exam_for(&state, &SourceRef::Text(lecture()), &opts, &()).await.unwrap_err();
    assert!(matches!(err.error, GenerationError::InvalidOptions(_)));
  }

  #[tokio::test]
  async fn configured_item_limit_is_enforced() {
    let cfg = AppConfig { limits: Limits { max_items_per_request: 3, ..Limits::default() }, ..AppConfig::default() };
    let state = AppState::new(cfg).unwrap();
    let text = SourceRef::Text(lecture());

    let ok = FlashcardOptions { card_count: 3, ..FlashcardOptions::default() };
    assert_eq!(generate_flashcards_for(&state, &text, &ok, &()).await.unwrap().artifact.cards.len(), 3);
    let over = FlashcardOptions { card_count: 4, ..FlashcardOptions::default() };
    let err = generate_flashcards_for(&state, &text, &over, &()).await.unwrap_err();
    assert_eq!(err.error.to_string(), GenerationError::InvalidOptions("cardCount must be at most 3".into()).to_string());
  }

  #[tokio::test]
  async fn seeded_materials_get_their_own_offline_content() {
    let state = app();
    let opts = QuizOptions { question_count: 2, ..QuizOptions::default() };
    let defects = generate_quiz_for(&state, &SourceRef::Material("w2-ch3".into()), &opts, false, &()).await.unwrap();
    let elastic = generate_quiz_for(&state, &SourceRef::Material("w3-ch5".into()), &opts, false, &()).await.unwrap();
    assert_eq!(defects.origin, ContentOrigin::Fallback);
    assert_ne!(defects.artifact.questions, elastic.artifact.questions);

    let upload = state.materials.add_uploaded("Notes", Language::En, lecture()).await;
    let generic = generate_quiz_for(&state, &SourceRef::Material(upload.id), &opts, false, &()).await.unwrap();
    assert_eq!(generic.origin, ContentOrigin::Provider);
    assert_ne!(generic.artifact.questions, defects.artifact.questions);
  }

  fn live_state(server: &MockServer) -> AppState {
    let provider = ProviderConfig {
      openai_api_key: Some("sk-test".into()),
      openai_base_url: server.uri(),
      ..ProviderConfig::default()
    };
    AppState::new(AppConfig { provider, ..AppConfig::default() }).unwrap()
  }

  fn one_question_reply() -> serde_json::Value {
    let quiz = json!({
      "questions": [{
        "question": "Welcher Defekt ist eindimensional?",
        "options": ["Leerstelle", "Versetzung", "Korngrenze", "Pore"],
        "correctAnswer": 1,
        "explanation": "Versetzungen sind Liniendefekte.",
        "difficulty": "easy"
      }]
    });
    json!({ "choices": [{ "message": { "role": "assistant", "content": quiz.to_string() } }] })
  }

  #[tokio::test]
  async fn quiz_language_follows_the_material_unless_requested() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(body_string_contains("Language: de"))
      .respond_with(ResponseTemplate::new(200).set_body_json(one_question_reply()))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(body_string_contains("Language: en"))
      .respond_with(ResponseTemplate::new(200).set_body_json(one_question_reply()))
      .expect(1)
      .mount(&server)
      .await;

    let state = live_state(&server);
    let german = SourceRef::Material("w2-ch3".into());
    let implicit = QuizOptions { question_count: 1, ..QuizOptions::default() };
    let out = generate_quiz_for(&state, &german, &implicit, false, &()).await.unwrap();
    assert_eq!(out.origin, ContentOrigin::Provider);
    assert_eq!(out.artifact.questions.len(), 1);

    let explicit = QuizOptions { question_count: 1, language: Some(Language::En), ..QuizOptions::default() };
    generate_quiz_for(&state, &german, &explicit, false, &()).await.unwrap();
  }
}
