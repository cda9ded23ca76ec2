//! Quiz Master: multiple-choice quizzes and single-question difficulty rewrites.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{parse_json_response, Agent, AgentCore};
use crate::config::Prompts;
use crate::domain::{Difficulty, GeneratedQuiz, QuizMetadata, QuizOptions, QuizQuestion};
use crate::error::GenerationError;
use crate::fallback::EXCERPT_CHARS;
use crate::mock::UNSUPPORTED_REPLY;
use crate::provider::ProviderClient;
use crate::util::{excerpt, fill_template, trim_quotes};

pub const QUIZ_MAX_TOKENS: u32 = 3000;
pub const ADAPT_MAX_TOKENS: u32 = 500;
pub const OPTIONS_PER_QUESTION: usize = 4;

const PERSONA: &str = "Quiz Master";

const QUIZ_TEMPLATE: &str = r#"As Quiz Master, create {count} multiple-choice quiz questions from the course content below.

CONTENT:
{content}

REQUIREMENTS:
- Difficulty level: {difficulty}
- Language: {language}
- Exactly 4 options per question; "correctAnswer" is the 0-based index of the right option
- Focus on conceptual understanding over memorization
- Create plausible distractors that reveal common misconceptions
- Provide clear, educational explanations

Return exactly this JSON structure and nothing else:
{
  "questions": [
    {
      "question": "Clear, specific question text",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": 0,
      "explanation": "Why this answer is correct and the others are wrong",
      "difficulty": "easy|medium|hard"
    }
  ]
}"#;

const ADAPT_TEMPLATE: &str = r#"As Quiz Master, adapt this question from {current} to {target} difficulty:

QUESTION: {question}
CONTEXT: {context}

Make the question {direction}.

Return only the adapted question text."#;

#[derive(Deserialize)]
struct QuizPayload {
    questions: Vec<QuizQuestion>,
}

#[derive(Clone)]
pub struct QuizAgent {
    core: AgentCore,
}

impl Agent for QuizAgent {
    fn persona(&self) -> &'static str { PERSONA }
    fn name(&self) -> &'static str { "Quiz Master Agent" }
    fn description(&self) -> &'static str {
        "Specialized in creating educational quizzes with pedagogically sound questions and explanations"
    }
}

impl QuizAgent {
    pub fn new(provider: ProviderClient, prompts: &Prompts) -> Self {
        Self { core: AgentCore::new(provider, PERSONA, &prompts.quiz_master, &prompts.json_only_suffix) }
    }

    pub fn build_prompt(source: &str, options: &QuizOptions) -> String {
        fill_template(
            QUIZ_TEMPLATE,
            &[
                ("count", &options.question_count.to_string()),
                ("difficulty", options.difficulty.as_str()),
                ("language", options.language().as_str()),
                ("content", source),
            ],
        )
    }

    #[instrument(level = "info", skip(self, source, options), fields(source_len = source.len(), count = options.question_count, difficulty = options.difficulty.as_str()))]
    pub async fn generate(&self, source: &str, options: &QuizOptions) -> Result<GeneratedQuiz, GenerationError> {
        options.check()?;
        let prompt = Self::build_prompt(source, options);
        let completion = self.core.ask(&prompt, QUIZ_MAX_TOKENS).await;
        let payload: QuizPayload = parse_json_response(PERSONA, "quiz", &completion.text)?;
        check_quiz_questions(&payload.questions, options.question_count)?;

        info!(questions = payload.questions.len(), origin = ?completion.origin, "Quiz generated");
        Ok(GeneratedQuiz {
            metadata: QuizMetadata {
                source_excerpt: excerpt(source, EXCERPT_CHARS),
                generated_at: Utc::now(),
                total_questions: payload.questions.len(),
            },
            questions: payload.questions,
        })
    }

    /// Rewrite one question for a different difficulty. Returns the original
    /// question when the reply is unusable.
    #[instrument(level = "info", skip(self, question, context), fields(question_len = question.len(), current = current.as_str(), target = target.as_str()))]
    pub async fn adapt_question_difficulty(
        &self,
        question: &str,
        current: Difficulty,
        target: Difficulty,
        context: &str,
    ) -> String {
        let direction = match target {
            Difficulty::Hard => "more challenging by requiring deeper analysis",
            Difficulty::Easy => "more accessible with clearer language",
            Difficulty::Medium => "moderately challenging with balanced complexity",
        };
        let prompt = fill_template(
            ADAPT_TEMPLATE,
            &[
                ("current", current.as_str()),
                ("target", target.as_str()),
                ("question", question),
                ("context", context),
                ("direction", direction),
            ],
        );
        let completion = self.core.ask(&prompt, ADAPT_MAX_TOKENS).await;
        let adapted = trim_quotes(&completion.text);
        if adapted.is_empty() || adapted == UNSUPPORTED_REPLY {
            warn!("Adaptation reply unusable; keeping original question");
            return question.to_string();
        }
        adapted.to_string()
    }
}

/// Count, option arity and answer-index checks for a quiz.
pub fn check_quiz_questions(questions: &[QuizQuestion], expected: usize) -> Result<(), GenerationError> {
    if questions.len() != expected {
        return Err(GenerationError::CountMismatch {
            agent: PERSONA,
            unit: "question",
            artifact: "quiz",
            expected,
            actual: questions.len(),
        });
    }
    for (i, q) in questions.iter().enumerate() {
        if q.options.len() != OPTIONS_PER_QUESTION {
            return Err(GenerationError::Schema {
                agent: PERSONA,
                artifact: "quiz",
                detail: format!("question {}: expected {} options, got {}", i + 1, OPTIONS_PER_QUESTION, q.options.len()),
            });
        }
        if q.correct_answer >= q.options.len() {
            return Err(GenerationError::Schema {
                agent: PERSONA,
                artifact: "quiz",
                detail: format!("question {}: correctAnswer {} out of range", i + 1, q.correct_answer),
            });
        }
    }
    Ok(())
}
