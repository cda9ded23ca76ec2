//! HTTP endpoint handlers. These are thin wrappers that forward to the
//! generation pipeline or directly to the agent manager.

use std::sync::Arc;
use axum::{
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::error::GenerationError;
use crate::generation::{generate_exam_for, generate_flashcards_for, generate_quiz_for, PipelineFailure};
use crate::protocol::*;
use crate::state::AppState;
use crate::validator::{validate_content, ValidationOutcome};

pub(crate) fn status_for(e: &GenerationError) -> StatusCode {
  match e {
    GenerationError::MaterialNotFound(_) => StatusCode::NOT_FOUND,
    GenerationError::MaterialUnreadable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    _ => StatusCode::UNPROCESSABLE_ENTITY,
  }
}

impl IntoResponse for PipelineFailure {
  fn into_response(self) -> Response {
    let status = status_for(&self.error);
    (status, Json(ErrorOut { error: self.error.to_string(), state: Some(self.state) })).into_response()
  }
}

impl IntoResponse for GenerationError {
  fn into_response(self) -> Response {
    (status_for(&self), Json(ErrorOut { error: self.to_string(), state: None })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, provider: state.agents.provider_kind(), agents: state.agents.health_check() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_agents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(state.agents.agent_info())
}

#[instrument(level = "info", skip(body), fields(text_len = body.text.len()))]
pub async fn http_post_validate(Json(body): Json<ValidateIn>) -> impl IntoResponse {
  Json(ValidationOutcome::from(validate_content(&body.text)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_materials(
  State(state): State<Arc<AppState>>,
  Query(query): Query<MaterialsQuery>,
) -> impl IntoResponse {
  match query.week {
    Some(week) => Json(state.materials.list_by_week(&week).await),
    None => Json(state.materials.list().await),
  }
}

#[instrument(level = "info", skip(state, body), fields(title = %body.title, text_len = body.text.len()))]
pub async fn http_post_material(
  State(state): State<Arc<AppState>>,
  Json(body): Json<UploadIn>,
) -> Result<impl IntoResponse, GenerationError> {
  validate_content(&body.text)?;
  let material = state.materials.add_uploaded(&body.title, body.language, body.text).await;
  Ok((StatusCode::CREATED, Json(material)))
}

#[instrument(level = "info", skip(state, body), fields(material = ?body.material_id, count = body.options.question_count))]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuizIn>,
) -> Result<Response, Response> {
  let source = source_of(&body.material_id, &body.text).map_err(IntoResponse::into_response)?;
  let out = generate_quiz_for(&state, &source, &body.options, body.enhance, &())
    .await
    .map_err(IntoResponse::into_response)?;
  info!(target: "generation", questions = out.artifact.questions.len(), origin = ?out.origin, "HTTP quiz served");
  Ok(Json(ArtifactOut { artifact: out.artifact, origin: out.origin, state: out.state }).into_response())
}

#[instrument(level = "info", skip(state, body), fields(material = ?body.material_id, count = body.options.card_count))]
pub async fn http_post_flashcards(
  State(state): State<Arc<AppState>>,
  Json(body): Json<FlashcardsIn>,
) -> Result<Response, Response> {
  let source = source_of(&body.material_id, &body.text).map_err(IntoResponse::into_response)?;
  let out = generate_flashcards_for(&state, &source, &body.options, &())
    .await
    .map_err(IntoResponse::into_response)?;
  info!(target: "generation", cards = out.artifact.cards.len(), origin = ?out.origin, "HTTP flashcards served");
  Ok(Json(ArtifactOut { artifact: out.artifact, origin: out.origin, state: out.state }).into_response())
}

#[instrument(level = "info", skip(state, body), fields(material = ?body.material_id, count = body.options.question_count))]
pub async fn http_post_exam(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ExamIn>,
) -> Result<Response, Response> {
  let source = source_of(&body.material_id, &body.text).map_err(IntoResponse::into_response)?;
  let out = generate_exam_for(&state, &source, &body.options, &())
    .await
    .map_err(IntoResponse::into_response)?;
  info!(target: "generation", questions = out.generated.artifact.questions.len(), balanced = out.analysis.is_balanced, "HTTP exam served");
  Ok(Json(ExamOut {
    artifact: out.generated.artifact,
    analysis: out.analysis,
    topics: out.topics,
    origin: out.generated.origin,
    state: out.generated.state,
  })
  .into_response())
}

#[instrument(level = "info", skip(state, body), fields(questions = body.quiz.questions.len()))]
pub async fn http_post_enhance(
  State(state): State<Arc<AppState>>,
  Json(body): Json<EnhanceIn>,
) -> impl IntoResponse {
  Json(state.agents.enhance_quiz_with_vocab_hints(&body.quiz).await)
}

#[instrument(level = "info", skip(state, body), fields(current = body.current.as_str(), target = body.target.as_str()))]
pub async fn http_post_adapt(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AdaptIn>,
) -> impl IntoResponse {
  let question = state
    .agents
    .quiz_agent()
    .adapt_question_difficulty(&body.question, body.current, body.target, &body.context)
    .await;
  Json(AdaptOut { question })
}

#[instrument(level = "info", skip(state, body), fields(term = %body.term))]
pub async fn http_post_pronunciation(
  State(state): State<Arc<AppState>>,
  Json(body): Json<PronunciationIn>,
) -> impl IntoResponse {
  let hint = state.agents.flashcard_agent().add_pronunciation_hint(&body.term).await;
  Json(PronunciationOut { term: body.term, hint })
}

#[instrument(level = "info", skip(state, body), fields(term = %body.term))]
pub async fn http_post_mnemonic(
  State(state): State<Arc<AppState>>,
  Json(body): Json<MnemonicIn>,
) -> impl IntoResponse {
  let technique = state.agents.flashcard_agent().suggest_memory_technique(&body.term, &body.meaning).await;
  Json(MnemonicOut { technique })
}

#[instrument(level = "info", skip(state, body), fields(questions = body.exam.questions.len()))]
pub async fn http_post_analyze(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnalyzeIn>,
) -> impl IntoResponse {
  Json(state.agents.validate_exam_difficulty(&body.exam))
}
