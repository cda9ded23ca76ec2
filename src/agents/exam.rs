//! Exam Proctor: mock exams with point balancing, difficulty analysis,
//! time estimates and topic extraction.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{parse_json_response, Agent, AgentCore};
use crate::config::{ExamPolicy, Prompts};
use crate::domain::{
    Difficulty, DifficultyReport, ExamMetadata, ExamOptions, ExamQuestion, GeneratedExam, QuestionKind,
};
use crate::error::GenerationError;
use crate::fallback::{DEFAULT_TOPICS, EXCERPT_CHARS};
use crate::provider::ProviderClient;
use crate::util::{excerpt, fill_template};

pub const EXAM_MAX_TOKENS: u32 = 4000;
pub const TOPICS_MAX_TOKENS: u32 = 500;
pub const MAX_TOPICS: usize = 8;
/// Extra time added on top of the per-question estimate.
pub const TIME_BUFFER: f64 = 1.2;

const PERSONA: &str = "Exam Proctor";

const EXAM_TEMPLATE: &str = r#"As Exam Proctor, create a comprehensive {exam_type} exam with {count} questions from the course content below.

CONTENT:
{content}

EXAM SPECIFICATIONS:
- Duration: {duration} minutes (about {minutes_per_question} min per question)
- Total points: {total_points}
- Question types: {types}
- Language: {language}
- Topics to cover: {topics}

REQUIREMENTS:
- Start with easier questions, progress to harder ones
- Point values should reflect question difficulty and length
- Include detailed explanations for learning
- Cover breadth and depth of the material

Return exactly this JSON structure and nothing else:
{
  "questions": [
    {
      "question": "Complete question text",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correctAnswer": 0,
      "points": 10,
      "type": "multiple_choice|essay|calculation",
      "explanation": "Detailed explanation for learning purposes"
    }
  ]
}"#;

const TOPICS_TEMPLATE: &str = r#"Extract the 5-8 main topics covered by the course content below.

CONTENT:
{content}

Return a JSON array of strings and nothing else: ["topic1", "topic2", ...]"#;

#[derive(Deserialize)]
struct ExamPayload {
    questions: Vec<ExamQuestion>,
}

#[derive(Clone)]
pub struct ExamAgent {
    core: AgentCore,
    policy: ExamPolicy,
}

impl Agent for ExamAgent {
    fn persona(&self) -> &'static str { PERSONA }
    fn name(&self) -> &'static str { "Exam Proctor Agent" }
    fn description(&self) -> &'static str {
        "Creates comprehensive exams with realistic conditions and balanced assessment"
    }
}

impl ExamAgent {
    pub fn new(provider: ProviderClient, prompts: &Prompts, policy: ExamPolicy) -> Self {
        Self {
            core: AgentCore::new(provider, PERSONA, &prompts.exam_proctor, &prompts.json_only_suffix),
            policy,
        }
    }

    pub fn policy(&self) -> &ExamPolicy { &self.policy }

    pub fn build_prompt(&self, source: &str, options: &ExamOptions) -> String {
        let mut types = vec!["multiple choice"];
        if options.include_essay {
            types.push("essay");
        }
        if options.include_calculations {
            types.push("calculation");
        }
        let topics = if options.focus_topics.is_empty() {
            "all major topics".to_string()
        } else {
            options.focus_topics.join(", ")
        };
        let count = options.question_count.max(1);
        let total_points = target_points(count, &self.policy);
        let minutes_per_question = (options.duration_minutes as f64 / count as f64).round();
        fill_template(
            EXAM_TEMPLATE,
            &[
                ("exam_type", options.exam_type.as_str()),
                ("count", &options.question_count.to_string()),
                ("duration", &options.duration_minutes.to_string()),
                ("minutes_per_question", &minutes_per_question.to_string()),
                ("total_points", &total_points.to_string()),
                ("types", &types.join(", ")),
                ("language", options.language().as_str()),
                ("topics", &topics),
                ("content", source),
            ],
        )
    }

    #[instrument(level = "info", skip(self, source, options), fields(source_len = source.len(), count = options.question_count, duration = options.duration_minutes))]
    pub async fn generate(&self, source: &str, options: &ExamOptions) -> Result<GeneratedExam, GenerationError> {
        options.check()?;
        let prompt = self.build_prompt(source, options);
        let completion = self.core.ask(&prompt, EXAM_MAX_TOKENS).await;
        let payload: ExamPayload = parse_json_response(PERSONA, "exam", &completion.text)?;
        let mut questions = payload.questions;
        check_exam_questions(&mut questions, options.question_count, &self.policy)?;

        let mut exam = GeneratedExam {
            metadata: ExamMetadata {
                source_excerpt: excerpt(source, EXCERPT_CHARS),
                generated_at: Utc::now(),
                total_questions: questions.len(),
                total_points: 0,
                estimated_duration: options.duration_minutes,
            },
            questions,
        };
        exam.metadata.total_points = exam.points_sum();
        if rebalance_points(&mut exam, options.question_count, &self.policy) {
            warn!(total_points = exam.metadata.total_points, "Exam points redistributed evenly");
        }

        info!(questions = exam.questions.len(), total_points = exam.metadata.total_points, origin = ?completion.origin, "Exam generated");
        Ok(exam)
    }

    /// Advisory balance check based on point bands. Never gates generation.
    pub fn validate_exam_difficulty(&self, exam: &GeneratedExam) -> DifficultyReport {
        let p = &self.policy;
        let total = exam.questions.len();
        let hard = exam.questions.iter().filter(|q| q.points > p.hard_points_above).count();
        let easy = exam.questions.iter().filter(|q| q.points < p.easy_points_below).count();

        let mut recommendations = Vec::new();
        let mut is_balanced = true;
        if hard as f64 > total as f64 * p.max_hard_fraction {
            recommendations.push("Consider reducing the number of high-difficulty questions".to_string());
            is_balanced = false;
        }
        if (easy as f64) < total as f64 * p.min_easy_fraction {
            recommendations.push("Add more foundational questions to help students build confidence".to_string());
            is_balanced = false;
        }
        if recommendations.is_empty() {
            recommendations.push("Exam difficulty distribution looks well-balanced".to_string());
        }

        let average = if total == 0 { 0.0 } else { exam.points_sum() as f64 / total as f64 };
        let level = if average > p.hard_points_above as f64 {
            Difficulty::Hard
        } else if average < p.easy_points_below as f64 {
            Difficulty::Easy
        } else {
            Difficulty::Medium
        };

        DifficultyReport {
            is_balanced,
            recommendations,
            suggested_duration_minutes: calculate_time_estimate(total, level),
        }
    }

    /// Main topics of `source`; a fixed list when the reply is unusable.
    #[instrument(level = "info", skip(self, source), fields(source_len = source.len()))]
    pub async fn extract_topics(&self, source: &str) -> Vec<String> {
        let prompt = fill_template(TOPICS_TEMPLATE, &[("content", source)]);
        let completion = self.core.ask(&prompt, TOPICS_MAX_TOKENS).await;
        match parse_json_response::<Vec<String>>(PERSONA, "topic list", &completion.text) {
            Ok(topics) => {
                let topics: Vec<String> = topics
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .take(MAX_TOPICS)
                    .collect();
                if topics.is_empty() {
                    default_topics()
                } else {
                    topics
                }
            }
            Err(e) => {
                warn!(error = %e, "Topic extraction failed; using defaults");
                default_topics()
            }
        }
    }
}

fn default_topics() -> Vec<String> {
    DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
}

/// Minutes for `question_count` questions of the given average difficulty,
/// including a 20% buffer.
pub fn calculate_time_estimate(question_count: usize, average: Difficulty) -> u32 {
    let per_question = match average {
        Difficulty::Easy => 2.0,
        Difficulty::Medium => 3.0,
        Difficulty::Hard => 5.0,
    };
    (question_count as f64 * per_question * TIME_BUFFER).round() as u32
}

/// `question_count * points_per_question`, saturating.
pub fn target_points(question_count: usize, policy: &ExamPolicy) -> u64 {
    let count = u64::try_from(question_count).unwrap_or(u64::MAX);
    count.saturating_mul(u64::from(policy.points_per_question))
}

/// If the summed points deviate from `question_count * points_per_question`
/// by more than the tolerance, give every question an equal share of the
/// target. Returns whether points were rewritten.
pub fn rebalance_points(exam: &mut GeneratedExam, question_count: usize, policy: &ExamPolicy) -> bool {
    if question_count == 0 {
        return false;
    }
    let target = target_points(question_count, policy);
    let total = exam.points_sum();
    let deviation = total.abs_diff(target) as f64;
    if deviation <= target as f64 * policy.rebalance_tolerance {
        return false;
    }
    for q in &mut exam.questions {
        q.points = policy.points_per_question;
    }
    exam.metadata.total_points = exam.points_sum();
    true
}

/// Count and per-question checks. Zero points are normalized to the baseline.
fn check_exam_questions(
    questions: &mut [ExamQuestion],
    expected: usize,
    policy: &ExamPolicy,
) -> Result<(), GenerationError> {
    if questions.len() != expected {
        return Err(GenerationError::CountMismatch {
            agent: PERSONA,
            unit: "question",
            artifact: "exam",
            expected,
            actual: questions.len(),
        });
    }
    for (i, q) in questions.iter_mut().enumerate() {
        if q.points == 0 {
            q.points = policy.points_per_question;
        }
        let schema = |detail: String| GenerationError::Schema { agent: PERSONA, artifact: "exam", detail };
        if q.points > policy.max_points_per_question {
            return Err(schema(format!(
                "question {}: {} points exceeds the maximum of {}",
                i + 1,
                q.points,
                policy.max_points_per_question
            )));
        }
        if q.kind == QuestionKind::MultipleChoice && q.options.len() < 2 {
            return Err(schema(format!("question {}: multiple choice needs at least 2 options", i + 1)));
        }
        if !q.options.is_empty() && q.correct_answer >= q.options.len() {
            return Err(schema(format!("question {}: correctAnswer {} out of range", i + 1, q.correct_answer)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::pool_exam_question;

    fn agent() -> ExamAgent {
        ExamAgent::new(ProviderClient::mock(), &Prompts::default(), ExamPolicy::default())
    }

    fn exam_with_points(points: &[u32]) -> GeneratedExam {
        let questions: Vec<ExamQuestion> = points
            .iter()
            .enumerate()
            .map(|(i, p)| ExamQuestion { points: *p, ..pool_exam_question(i) })
            .collect();
        GeneratedExam {
            metadata: ExamMetadata {
                source_excerpt: String::new(),
                generated_at: Utc::now(),
                total_questions: questions.len(),
                total_points: points.iter().map(|p| u64::from(*p)).sum(),
                estimated_duration: 60,
            },
            questions,
        }
    }

    #[test]
    fn rebalance_only_outside_tolerance_and_is_idempotent() {
        let policy = ExamPolicy::default();
        let mut within = exam_with_points(&[10, 12, 8, 11]);
        assert!(!rebalance_points(&mut within, 4, &policy));
        assert_eq!(within.metadata.total_points, 41);

        let mut off = exam_with_points(&[30, 30, 5, 5]);
        assert!(rebalance_points(&mut off, 4, &policy));
        assert!(off.questions.iter().all(|q| q.points == 10));
        assert_eq!(off.points_sum(), 40);
        assert_eq!(off.metadata.total_points, 40);

        let snapshot = off.clone();
        assert!(!rebalance_points(&mut off, 4, &policy));
        assert_eq!(off, snapshot);
    }

    #[test]
    fn huge_points_are_summed_and_rebalanced_without_overflow() {
        let policy = ExamPolicy::default();
        let mut exam = exam_with_points(&[u32::MAX, u32::MAX]);
        assert_eq!(exam.points_sum(), 2 * u64::from(u32::MAX));
        assert!(rebalance_points(&mut exam, 2, &policy));
        assert_eq!(exam.metadata.total_points, 20);
        assert_eq!(target_points(usize::MAX, &policy), u64::MAX);
    }

    #[test]
    fn points_above_ceiling_are_a_schema_error() {
        let policy = ExamPolicy::default();
        let mut qs = vec![pool_exam_question(0), ExamQuestion { points: u32::MAX, ..pool_exam_question(1) }];
        let err = check_exam_questions(&mut qs, 2, &policy).unwrap_err();
        assert!(matches!(err, GenerationError::Schema { ref detail, .. } if detail.starts_with("question 2:")));

        let mut qs = vec![ExamQuestion { points: policy.max_points_per_question, ..pool_exam_question(1) }];
        assert!(check_exam_questions(&mut qs, 1, &policy).is_ok());
    }

    #[tokio::test]
    async fn oversized_exam_request_is_rejected_before_prompting() {
        let opts = ExamOptions { question_count: 500_000_000, ..ExamOptions::default() };
        let err = agent().generate(&"Diffusion in Festkörpern. ".repeat(8), &opts).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidOptions(_)));
        assert!(agent().build_prompt("x", &opts).contains("Total points: 5000000000"));
    }

    #[test]
    fn difficulty_report_flags_imbalance() {
        let a = agent();
        let report = a.validate_exam_difficulty(&exam_with_points(&[15, 15, 15, 10, 10]));
        assert!(!report.is_balanced);
        assert_eq!(report.recommendations.len(), 2);

        let report = a.validate_exam_difficulty(&exam_with_points(&[5, 10, 10, 15, 10]));
        assert!(report.is_balanced);
        assert_eq!(report.recommendations, vec!["Exam difficulty distribution looks well-balanced".to_string()]);
        assert_eq!(report.suggested_duration_minutes, 18);
    }

    #[test]
    fn time_estimate_adds_buffer() {
        assert_eq!(calculate_time_estimate(10, Difficulty::Easy), 24);
        assert_eq!(calculate_time_estimate(8, Difficulty::Hard), 48);
        assert_eq!(calculate_time_estimate(0, Difficulty::Medium), 0);
    }

    #[tokio::test]
    async fn mock_exam_carries_requested_metadata() {
        let opts = ExamOptions { question_count: 8, duration_minutes: 90, ..ExamOptions::default() };
        let exam = agent().generate(&"Diffusion in Festkörpern. ".repeat(8), &opts).await.unwrap();
        assert_eq!(exam.metadata.total_questions, 8);
        assert_eq!(exam.metadata.estimated_duration, 90);
        assert_eq!(exam.metadata.total_points, exam.points_sum());
    }

    #[tokio::test]
    async fn topics_come_from_the_mock() {
        let topics = agent().extract_topics("Kristallstrukturen und Defekte").await;
        assert!(!topics.is_empty() && topics.len() <= MAX_TOPICS);
    }

    #[test]
    fn essay_without_options_is_accepted() {
        let mut qs = vec![ExamQuestion { options: vec![], points: 0, ..pool_exam_question(3) }];
        check_exam_questions(&mut qs, 1, &ExamPolicy::default()).unwrap();
        assert_eq!(qs[0].points, 10);
    }
}
