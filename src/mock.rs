//! Deterministic mock provider.
//!
//! Replies are chosen by keyword triggers in the prompt's leading instruction
//! line only; the embedded source text never influences the choice. Artifact
//! replies are valid JSON cycled from the shared pools to the count named in
//! that line.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::agents::flashcards::MEMORY_TECHNIQUE_FALLBACK;
use crate::domain::MAX_ITEMS_PER_REQUEST;
use crate::fallback::{pool_card, pool_exam_question, pool_quiz_question, CARD_POOL, EXAM_POOL, QUIZ_POOL};

pub const UNSUPPORTED_REPLY: &str = "Unable to generate content for this prompt.";

static MOCK_TOPICS: &[&str] = &[
  "Material Classes",
  "Crystal Structure",
  "Crystal Defects",
  "Diffusion",
  "Mechanical Behavior",
];

static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\b").unwrap());
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static EXAM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bexams?\b").unwrap());

/// What the mock decided the prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockTrigger {
  Pronunciation,
  MemoryTechnique,
  Adapt,
  Topics,
  Flashcards,
  Exam,
  Quiz,
  Unsupported,
}

/// First non-empty line of the prompt.
pub fn instruction_line(prompt: &str) -> &str {
  prompt.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

pub fn classify(prompt: &str) -> MockTrigger {
  let header = instruction_line(prompt).to_lowercase();
  if header.contains("pronunciation") {
    MockTrigger::Pronunciation
  } else if header.contains("memory technique") {
    MockTrigger::MemoryTechnique
  } else if header.contains("adapt") {
    MockTrigger::Adapt
  } else if header.contains("topics") {
    MockTrigger::Topics
  } else if header.contains("flashcard") || header.contains("anki") {
    MockTrigger::Flashcards
  } else if EXAM_RE.is_match(&header) {
    MockTrigger::Exam
  } else if header.contains("quiz") || header.contains("questions") {
    MockTrigger::Quiz
  } else {
    MockTrigger::Unsupported
  }
}

/// First integer of the instruction line, at most `MAX_ITEMS_PER_REQUEST`.
fn requested_count(prompt: &str, default: usize) -> usize {
  COUNT_RE
    .captures(instruction_line(prompt))
    .map(|c| c[1].parse::<usize>().unwrap_or(usize::MAX))
    .filter(|n| *n > 0)
    .unwrap_or(default)
    .min(MAX_ITEMS_PER_REQUEST)
}

/// Reply the mock provider gives for `prompt`. Never fails.
pub fn mock_response(prompt: &str) -> String {
  match classify(prompt) {
    MockTrigger::Pronunciation => {
      let header = instruction_line(prompt);
      match QUOTED_RE.captures(header) {
        Some(c) => format!("{} [pronunciation guide unavailable]", &c[1]),
        None => UNSUPPORTED_REPLY.to_string(),
      }
    }
    MockTrigger::MemoryTechnique => MEMORY_TECHNIQUE_FALLBACK.to_string(),
    // The mock cannot rewrite; it echoes the question back unchanged.
    MockTrigger::Adapt => prompt
      .lines()
      .find_map(|l| l.trim().strip_prefix("QUESTION:"))
      .map(|q| q.trim().to_string())
      .unwrap_or_else(|| UNSUPPORTED_REPLY.to_string()),
    MockTrigger::Topics => json!(MOCK_TOPICS).to_string(),
    MockTrigger::Flashcards => {
      let n = requested_count(prompt, CARD_POOL.len());
      let cards: Vec<_> = (0..n).map(pool_card).collect();
      json!({ "cards": cards }).to_string()
    }
    MockTrigger::Exam => {
      let n = requested_count(prompt, EXAM_POOL.len());
      let questions: Vec<_> = (0..n).map(pool_exam_question).collect();
      json!({ "questions": questions }).to_string()
    }
    MockTrigger::Quiz => {
      let n = requested_count(prompt, QUIZ_POOL.len());
      let questions: Vec<_> = (0..n).map(pool_quiz_question).collect();
      json!({ "questions": questions }).to_string()
    }
    MockTrigger::Unsupported => UNSUPPORTED_REPLY.to_string(),
  }
}
