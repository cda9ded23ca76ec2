//! Agent manager: owns one agent per artifact type, delegates generation,
//! runs the quiz vocabulary enhancement and answers status queries.
//!
//! Constructed once at startup and shared through `AppState`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use futures::future::try_join_all;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::agents::{Agent, AgentInfo, ExamAgent, FlashcardAgent, QuizAgent, VocabHints};
use crate::config::{ExamPolicy, Prompts};
use crate::domain::{
    DifficultyReport, ExamOptions, FlashcardOptions, GeneratedExam, GeneratedFlashcards, GeneratedQuiz,
    QuizOptions, QuizQuestion,
};
use crate::error::GenerationError;
use crate::provider::{ProviderClient, ProviderKind};
use crate::validator::validate_content;

pub const QUIZ_MASTER: &str = "quizMaster";
pub const VOCAB_SENSEI: &str = "vocabSensei";
pub const EXAM_PROCTOR: &str = "examProctor";

/// Finds terms worth a pronunciation hint in a piece of question text.
pub type TermDetector = fn(&str) -> Vec<String>;

static COMPOUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-ZÄÖÜ][a-zäöüß]*[A-ZÄÖÜ][a-zäöüß]*").unwrap());

/// Default detector: capitalized compound patterns, distinct, in order of appearance.
/// Cosmetic heuristic for technical German terms.
pub fn capitalized_compounds(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in COMPOUND_RE.find_iter(text) {
        if !out.iter().any(|t| t == m.as_str()) {
            out.push(m.as_str().to_string());
        }
    }
    out
}

pub struct AgentManager {
    provider_kind: ProviderKind,
    quiz: QuizAgent,
    flashcards: FlashcardAgent,
    exam: ExamAgent,
    term_detector: TermDetector,
}

impl AgentManager {
    pub fn new(provider: ProviderClient, prompts: &Prompts, policy: ExamPolicy) -> Self {
        info!(target: "studykit_backend", provider = ?provider.kind(), model = %provider.model(), "Agent manager ready");
        Self {
            provider_kind: provider.kind(),
            quiz: QuizAgent::new(provider.clone(), prompts),
            flashcards: FlashcardAgent::new(provider.clone(), prompts),
            exam: ExamAgent::new(provider, prompts, policy),
            term_detector: capitalized_compounds,
        }
    }

    pub fn with_term_detector(mut self, detector: TermDetector) -> Self {
        self.term_detector = detector;
        self
    }

    pub fn provider_kind(&self) -> ProviderKind { self.provider_kind }
    pub fn quiz_agent(&self) -> &QuizAgent { &self.quiz }
    pub fn flashcard_agent(&self) -> &FlashcardAgent { &self.flashcards }
    pub fn exam_agent(&self) -> &ExamAgent { &self.exam }

    #[instrument(level = "info", skip(self, source, options), fields(count = options.question_count, difficulty = options.difficulty.as_str()))]
    pub async fn generate_quiz(&self, source: &str, options: &QuizOptions) -> Result<GeneratedQuiz, GenerationError> {
        validate_content(source)?;
        match self.quiz.generate(source, options).await {
            Ok(quiz) => {
                info!(target: "generation", questions = quiz.questions.len(), "Quiz Master delivered quiz");
                Ok(quiz)
            }
            Err(e) => {
                error!(target: "generation", error = %e, "Quiz Master failed");
                Err(e)
            }
        }
    }

    #[instrument(level = "info", skip(self, source, options), fields(count = options.card_count, focus = options.focus_level.as_str()))]
    pub async fn generate_flashcards(
        &self,
        source: &str,
        options: &FlashcardOptions,
    ) -> Result<GeneratedFlashcards, GenerationError> {
        validate_content(source)?;
        match self.flashcards.generate(source, options).await {
            Ok(cards) => {
                info!(target: "generation", cards = cards.cards.len(), "Vocab Sensei delivered flashcards");
                Ok(cards)
            }
            Err(e) => {
                error!(target: "generation", error = %e, "Vocab Sensei failed");
                Err(e)
            }
        }
    }

    #[instrument(level = "info", skip(self, source, options), fields(count = options.question_count, duration = options.duration_minutes, exam_type = options.exam_type.as_str()))]
    pub async fn generate_exam(&self, source: &str, options: &ExamOptions) -> Result<GeneratedExam, GenerationError> {
        validate_content(source)?;
        match self.exam.generate(source, options).await {
            Ok(exam) => {
                let analysis = self.exam.validate_exam_difficulty(&exam);
                info!(
                    target: "generation",
                    questions = exam.questions.len(),
                    balanced = analysis.is_balanced,
                    recommendations = %analysis.recommendations.join("; "),
                    "Exam Proctor delivered exam"
                );
                Ok(exam)
            }
            Err(e) => {
                error!(target: "generation", error = %e, "Exam Proctor failed");
                Err(e)
            }
        }
    }

    pub fn validate_exam_difficulty(&self, exam: &GeneratedExam) -> DifficultyReport {
        self.exam.validate_exam_difficulty(exam)
    }

    pub async fn extract_topics(&self, source: &str) -> Vec<String> {
        self.exam.extract_topics(source).await
    }

    /// Annotate technical terms in quiz questions with pronunciation hints.
    /// Returns the original quiz if anything goes wrong.
    pub async fn enhance_quiz_with_vocab_hints(&self, quiz: &GeneratedQuiz) -> GeneratedQuiz {
        enhance_quiz_with(&self.flashcards, self.term_detector, quiz).await
    }

    pub fn agent_info(&self) -> BTreeMap<&'static str, AgentInfo> {
        BTreeMap::from([
            (QUIZ_MASTER, AgentInfo::of(&self.quiz as &dyn Agent)),
            (VOCAB_SENSEI, AgentInfo::of(&self.flashcards as &dyn Agent)),
            (EXAM_PROCTOR, AgentInfo::of(&self.exam as &dyn Agent)),
        ])
    }

    /// All agents healthy iff a live provider credential is configured. No network call.
    pub fn health_check(&self) -> BTreeMap<String, bool> {
        let live = self.provider_kind.is_live();
        if !live {
            warn!(target: "studykit_backend", "No provider credential configured; agents report offline");
        }
        [QUIZ_MASTER, VOCAB_SENSEI, EXAM_PROCTOR]
            .into_iter()
            .map(|name| (name.to_string(), live))
            .collect()
    }
}

/// Enhancement with an explicit hint source and detector.
pub async fn enhance_quiz_with(hints: &dyn VocabHints, detect: TermDetector, quiz: &GeneratedQuiz) -> GeneratedQuiz {
    let enhanced = try_join_all(quiz.questions.iter().map(|q| enhance_question(hints, detect, q))).await;
    match enhanced {
        Ok(questions) => {
            info!(target: "generation", "Enhanced quiz with vocabulary hints");
            GeneratedQuiz { questions, metadata: quiz.metadata.clone() }
        }
        Err(e) => {
            warn!(target: "generation", error = %e, "Vocabulary enhancement failed; returning original quiz");
            quiz.clone()
        }
    }
}

async fn enhance_question(
    hints: &dyn VocabHints,
    detect: TermDetector,
    q: &QuizQuestion,
) -> Result<QuizQuestion, GenerationError> {
    let terms = detect(&q.question);
    if terms.is_empty() {
        return Ok(q.clone());
    }

    // First occurrence of each term in the original text, left to right.
    let mut spans: Vec<(usize, usize, String)> = Vec::new();
    for term in terms {
        if let Some(start) = q.question.find(&term) {
            let hint = hints.pronunciation_hint(&term).await?;
            spans.push((start, start + term.len(), hint));
        }
    }
    spans.sort_by_key(|s| s.0);

    let mut text = String::with_capacity(q.question.len() + spans.len() * 24);
    let mut cursor = 0;
    for (start, end, hint) in spans {
        if start < cursor {
            continue;
        }
        text.push_str(&q.question[cursor..start]);
        text.push_str(&hint);
        cursor = end;
    }
    text.push_str(&q.question[cursor..]);

    Ok(QuizQuestion { question: text, ..q.clone() })
}
