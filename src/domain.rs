//! Domain models: generation options, generated artifacts and their metadata.
//!
//! Field names follow the JSON the agents ask the model for (camelCase), so the
//! same structs decode model output and serialize responses to the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Output language requested from the model.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  En,
  De,
}
impl Default for Language {
  fn default() -> Self { Language::En }
}
impl Language {
  pub fn as_str(&self) -> &'static str {
    match self {
      Language::En => "en",
      Language::De => "de",
    }
  }
}

/// Difficulty of a single generated question or card.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}
impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }
}

/// Difficulty requested for a whole quiz.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuizDifficulty {
  Easy,
  Medium,
  Hard,
  Mixed,
}
impl Default for QuizDifficulty {
  fn default() -> Self { QuizDifficulty::Mixed }
}
impl QuizDifficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      QuizDifficulty::Easy => "easy",
      QuizDifficulty::Medium => "medium",
      QuizDifficulty::Hard => "hard",
      QuizDifficulty::Mixed => "mixed",
    }
  }
}

/// What the flashcards should concentrate on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FocusLevel {
  Vocabulary,
  Concepts,
  Mixed,
}
impl Default for FocusLevel {
  fn default() -> Self { FocusLevel::Mixed }
}
impl FocusLevel {
  pub fn as_str(&self) -> &'static str {
    match self {
      FocusLevel::Vocabulary => "vocabulary",
      FocusLevel::Concepts => "concepts",
      FocusLevel::Mixed => "mixed",
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
  Midterm,
  Final,
  Practice,
}
impl Default for ExamType {
  fn default() -> Self { ExamType::Practice }
}
impl ExamType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ExamType::Midterm => "midterm",
      ExamType::Final => "final",
      ExamType::Practice => "practice",
    }
  }
}

/// Kind of exam question.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  MultipleChoice,
  Essay,
  Calculation,
}

/// Which artifact a request or progress report concerns.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
  Quiz,
  Flashcards,
  Exam,
}
impl ArtifactKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ArtifactKind::Quiz => "quiz",
      ArtifactKind::Flashcards => "flashcards",
      ArtifactKind::Exam => "exam",
    }
  }
}

// --- Options ---

fn default_quiz_count() -> usize { 5 }
fn default_card_count() -> usize { 10 }
fn default_exam_count() -> usize { 8 }
fn default_duration() -> u32 { 90 }
fn default_true() -> bool { true }

/// Hard ceiling on questions or cards per request. Config may lower it.
pub const MAX_ITEMS_PER_REQUEST: usize = 50;

// `language` stays `None` unless the request names one, so the pipeline can
// substitute the language of the source material.

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizOptions {
  #[serde(default = "default_quiz_count")] pub question_count: usize,
  #[serde(default)] pub difficulty: QuizDifficulty,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub language: Option<Language>,
}
impl Default for QuizOptions {
  fn default() -> Self {
    Self { question_count: default_quiz_count(), difficulty: QuizDifficulty::Mixed, language: None }
  }
}
impl QuizOptions {
  pub fn check(&self) -> Result<(), GenerationError> {
    self.check_within(MAX_ITEMS_PER_REQUEST)
  }

  pub fn check_within(&self, max_items: usize) -> Result<(), GenerationError> {
    bounded("questionCount", self.question_count, max_items)
  }

  pub fn language(&self) -> Language {
    self.language.unwrap_or(Language::En)
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardOptions {
  #[serde(default = "default_card_count")] pub card_count: usize,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub language: Option<Language>,
  #[serde(default = "default_true")] pub include_formulas: bool,
  #[serde(default)] pub focus_level: FocusLevel,
}
impl Default for FlashcardOptions {
  fn default() -> Self {
    Self {
      card_count: default_card_count(),
      language: None,
      include_formulas: true,
      focus_level: FocusLevel::Mixed,
    }
  }
}
impl FlashcardOptions {
  pub fn check(&self) -> Result<(), GenerationError> {
    self.check_within(MAX_ITEMS_PER_REQUEST)
  }

  pub fn check_within(&self, max_items: usize) -> Result<(), GenerationError> {
    bounded("cardCount", self.card_count, max_items)
  }

  /// German unless the request or the material says otherwise.
  pub fn language(&self) -> Language {
    self.language.unwrap_or(Language::De)
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamOptions {
  #[serde(default = "default_exam_count")] pub question_count: usize,
  #[serde(default = "default_duration", alias = "duration")] pub duration_minutes: u32,
  #[serde(default = "default_true")] pub include_essay: bool,
  #[serde(default = "default_true")] pub include_calculations: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub language: Option<Language>,
  #[serde(default)] pub exam_type: ExamType,
  /// Topics the exam should cover; filled from topic extraction when empty.
  #[serde(default)] pub focus_topics: Vec<String>,
}
impl Default for ExamOptions {
  fn default() -> Self {
    Self {
      question_count: default_exam_count(),
      duration_minutes: default_duration(),
      include_essay: true,
      include_calculations: true,
      language: None,
      exam_type: ExamType::Practice,
      focus_topics: Vec::new(),
    }
  }
}
impl ExamOptions {
  pub fn check(&self) -> Result<(), GenerationError> {
    self.check_within(MAX_ITEMS_PER_REQUEST)
  }

  pub fn check_within(&self, max_items: usize) -> Result<(), GenerationError> {
    bounded("questionCount", self.question_count, max_items)?;
    bounded("durationMinutes", self.duration_minutes as usize, MAX_DURATION_MINUTES)
  }

  pub fn language(&self) -> Language {
    self.language.unwrap_or(Language::En)
  }
}

/// One working day.
pub const MAX_DURATION_MINUTES: usize = 600;

fn bounded(field: &str, value: usize, max: usize) -> Result<(), GenerationError> {
  if value == 0 {
    return Err(GenerationError::InvalidOptions(format!("{field} must be a positive integer")));
  }
  if value > max {
    return Err(GenerationError::InvalidOptions(format!("{field} must be at most {max}")));
  }
  Ok(())
}

// --- Artifacts ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: usize,
  pub explanation: String,
  pub difficulty: Difficulty,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizMetadata {
  /// First ~200 chars of the source text.
  #[serde(rename = "sourceText")] pub source_excerpt: String,
  pub generated_at: DateTime<Utc>,
  pub total_questions: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratedQuiz {
  pub questions: Vec<QuizQuestion>,
  pub metadata: QuizMetadata,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Flashcard {
  pub front: String,
  pub back: String,
  pub category: String,
  pub difficulty: Difficulty,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardMetadata {
  #[serde(rename = "sourceText")] pub source_excerpt: String,
  pub generated_at: DateTime<Utc>,
  pub total_cards: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratedFlashcards {
  pub cards: Vec<Flashcard>,
  pub metadata: FlashcardMetadata,
}

fn default_points() -> u32 { 10 }

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamQuestion {
  pub question: String,
  /// Empty or a single placeholder for essay questions.
  #[serde(default)] pub options: Vec<String>,
  #[serde(default)] pub correct_answer: usize,
  #[serde(default = "default_points")] pub points: u32,
  #[serde(rename = "type")] pub kind: QuestionKind,
  pub explanation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExamMetadata {
  #[serde(rename = "sourceText")] pub source_excerpt: String,
  pub generated_at: DateTime<Utc>,
  pub total_questions: usize,
  pub total_points: u64,
  /// Minutes.
  pub estimated_duration: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratedExam {
  pub questions: Vec<ExamQuestion>,
  pub metadata: ExamMetadata,
}

impl GeneratedExam {
  /// Summed in u64.
  pub fn points_sum(&self) -> u64 {
    self.questions.iter().map(|q| u64::from(q.points)).sum()
  }
}

/// Advisory output of the exam difficulty check.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyReport {
  pub is_balanced: bool,
  pub recommendations: Vec<String>,
  pub suggested_duration_minutes: u32,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn options_fill_defaults_from_partial_json() {
    let q: QuizOptions = serde_json::from_str(r#"{"questionCount": 3}"#).unwrap();
    assert_eq!(q.question_count, 3);
    assert_eq!(q.difficulty, QuizDifficulty::Mixed);
    assert_eq!(q.language, None);
    assert_eq!(q.language(), Language::En);

    let f: FlashcardOptions = serde_json::from_str("{}").unwrap();
    assert_eq!(f, FlashcardOptions::default());

    let e: ExamOptions = serde_json::from_str(r#"{"questionCount": 8, "duration": 90}"#).unwrap();
    assert_eq!(e.duration_minutes, 90);
    assert_eq!(e.exam_type, ExamType::Practice);
  }

  #[test]
  fn zero_counts_are_rejected() {
    let q = QuizOptions { question_count: 0, ..QuizOptions::default() };
    assert!(matches!(q.check(), Err(GenerationError::InvalidOptions(_))));

    let e = ExamOptions { duration_minutes: 0, ..ExamOptions::default() };
    assert!(e.check().is_err());
  }

  #[test]
  fn counts_are_capped() {
    let at = QuizOptions { question_count: MAX_ITEMS_PER_REQUEST, ..QuizOptions::default() };
    assert!(at.check().is_ok());
    let above = QuizOptions { question_count: MAX_ITEMS_PER_REQUEST + 1, ..QuizOptions::default() };
    assert!(matches!(above.check(), Err(GenerationError::InvalidOptions(ref m)) if m == "questionCount must be at most 50"));

    let cards = FlashcardOptions { card_count: usize::MAX, ..FlashcardOptions::default() };
    assert!(cards.check().is_err());
    let cards = FlashcardOptions { card_count: 10, ..FlashcardOptions::default() };
    assert!(cards.check_within(10).is_ok());
    assert!(cards.check_within(9).is_err());

    let exam = ExamOptions { question_count: 500_000_000, ..ExamOptions::default() };
    assert!(exam.check().is_err());
    let exam = ExamOptions { duration_minutes: u32::MAX, ..ExamOptions::default() };
    assert!(exam.check().is_err());
  }

  #[test]
  fn language_defaults_differ_per_artifact() {
    assert_eq!(FlashcardOptions::default().language(), Language::De);
    assert_eq!(ExamOptions::default().language(), Language::En);
    let q: QuizOptions = serde_json::from_str(r#"{"language": "de"}"#).unwrap();
    assert_eq!(q.language, Some(Language::De));
  }

  #[test]
  fn points_sum_does_not_overflow() {
    let q: ExamQuestion = serde_json::from_str(
      r#"{"question": "q", "points": 4294967295, "type": "essay", "explanation": ""}"#,
    )
    .unwrap();
    let exam = GeneratedExam {
      questions: vec![q.clone(), q],
      metadata: ExamMetadata {
        source_excerpt: String::new(),
        generated_at: Utc::now(),
        total_questions: 2,
        total_points: 0,
        estimated_duration: 60,
      },
    };
    assert_eq!(exam.points_sum(), 2 * u64::from(u32::MAX));
  }

  #[test]
  fn exam_question_defaults_points_and_uses_type_key() {
    let q: ExamQuestion = serde_json::from_str(
      r#"{"question": "Explain creep.", "type": "essay", "explanation": "Time-dependent strain."}"#,
    )
    .unwrap();
    assert_eq!(q.points, 10);
    assert_eq!(q.kind, QuestionKind::Essay);
    assert!(q.options.is_empty());

    let json = serde_json::to_value(&q).unwrap();
    assert_eq!(json["type"], "essay");
    assert_eq!(json["correctAnswer"], 0);
  }
}
