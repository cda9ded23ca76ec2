//! Vocab Sensei: flashcards for technical (German) vocabulary, pronunciation
//! hints and memory techniques.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{parse_json_response, Agent, AgentCore};
use crate::config::Prompts;
use crate::domain::{Flashcard, FlashcardMetadata, FlashcardOptions, GeneratedFlashcards};
use crate::error::GenerationError;
use crate::fallback::EXCERPT_CHARS;
use crate::mock::UNSUPPORTED_REPLY;
use crate::provider::ProviderClient;
use crate::util::{excerpt, fill_template, trim_quotes};

pub const FLASHCARD_MAX_TOKENS: u32 = 3500;
pub const HINT_MAX_TOKENS: u32 = 200;
pub const MEMORY_MAX_TOKENS: u32 = 300;
pub const MEMORY_TECHNIQUE_FALLBACK: &str = "Try to connect this term with similar words you already know.";

const PERSONA: &str = "Vocab Sensei";

const FLASHCARD_TEMPLATE: &str = r#"As Vocab Sensei, create {count} flashcards from the course content below.

CONTENT:
{content}

FOCUS: {focus}

REQUIREMENTS:
- Language: {language} (German terms preferred for technical vocabulary)
- Include key terms, definitions and concepts; {formulas}
- Front: term or concept
- Back: clear, concise definition or explanation with context
- Categorize by topic area
- Vary difficulty levels

Return exactly this JSON structure and nothing else:
{
  "cards": [
    {
      "front": "Term",
      "back": "Explanation with context",
      "category": "Topic area (e.g. 'Crystal Structures')",
      "difficulty": "easy|medium|hard"
    }
  ]
}"#;

const HINT_TEMPLATE: &str = r#"As Vocab Sensei, provide a simple pronunciation guide for the German technical term "{term}".

Return format: Term [pronunciation-guide]
Example: Kristallstruktur [KRIS-tall-shtrook-toor]

Return only the term with its pronunciation guide."#;

const MEMORY_TEMPLATE: &str = r#"As Vocab Sensei, suggest a memory technique to help remember this term:
German: {term}
English: {meaning}

Create a short, memorable association or mnemonic. Return only the memory technique."#;

/// Source of pronunciation hints for quiz enhancement.
#[async_trait]
pub trait VocabHints: Send + Sync {
    /// "Term [pronunciation]" for `term`.
    async fn pronunciation_hint(&self, term: &str) -> Result<String, GenerationError>;
}

#[derive(Deserialize)]
struct FlashcardPayload {
    cards: Vec<Flashcard>,
}

#[derive(Clone)]
pub struct FlashcardAgent {
    core: AgentCore,
}

impl Agent for FlashcardAgent {
    fn persona(&self) -> &'static str { PERSONA }
    fn name(&self) -> &'static str { "Vocab Sensei Agent" }
    fn description(&self) -> &'static str { "Expert in German technical vocabulary and spaced repetition learning" }
}

impl FlashcardAgent {
    pub fn new(provider: ProviderClient, prompts: &Prompts) -> Self {
        Self { core: AgentCore::new(provider, PERSONA, &prompts.vocab_sensei, &prompts.json_only_suffix) }
    }

    pub fn build_prompt(source: &str, options: &FlashcardOptions) -> String {
        let formulas = if options.include_formulas { "include formulas" } else { "no formulas" };
        fill_template(
            FLASHCARD_TEMPLATE,
            &[
                ("count", &options.card_count.to_string()),
                ("focus", options.focus_level.as_str()),
                ("language", options.language().as_str()),
                ("formulas", formulas),
                ("content", source),
            ],
        )
    }

    #[instrument(level = "info", skip(self, source, options), fields(source_len = source.len(), count = options.card_count))]
    pub async fn generate(&self, source: &str, options: &FlashcardOptions) -> Result<GeneratedFlashcards, GenerationError> {
        options.check()?;
        let prompt = Self::build_prompt(source, options);
        let completion = self.core.ask(&prompt, FLASHCARD_MAX_TOKENS).await;
        let payload: FlashcardPayload = parse_json_response(PERSONA, "flashcards", &completion.text)?;
        if payload.cards.len() != options.card_count {
            return Err(GenerationError::CountMismatch {
                agent: PERSONA,
                unit: "card",
                artifact: "flashcards",
                expected: options.card_count,
                actual: payload.cards.len(),
            });
        }
        if let Some(i) = payload.cards.iter().position(|c| c.front.trim().is_empty() || c.back.trim().is_empty()) {
            return Err(GenerationError::Schema {
                agent: PERSONA,
                artifact: "flashcards",
                detail: format!("card {} has an empty side", i + 1),
            });
        }

        info!(cards = payload.cards.len(), origin = ?completion.origin, "Flashcards generated");
        Ok(GeneratedFlashcards {
            metadata: FlashcardMetadata {
                source_excerpt: excerpt(source, EXCERPT_CHARS),
                generated_at: Utc::now(),
                total_cards: payload.cards.len(),
            },
            cards: payload.cards,
        })
    }

    /// Raw hint request; errors when the reply does not look like "Term [guide]".
    pub async fn try_pronunciation_hint(&self, term: &str) -> Result<String, GenerationError> {
        let prompt = fill_template(HINT_TEMPLATE, &[("term", term)]);
        let completion = self.core.ask(&prompt, HINT_MAX_TOKENS).await;
        let hint = trim_quotes(&completion.text);
        if hint.is_empty() || hint == UNSUPPORTED_REPLY || !hint.contains('[') || hint.lines().count() > 1 {
            return Err(GenerationError::UnusableReply {
                agent: PERSONA,
                detail: format!("no pronunciation guide for {term}"),
            });
        }
        Ok(hint.to_string())
    }

    /// "Term [pronunciation]"; never fails.
    #[instrument(level = "debug", skip(self), fields(%term))]
    pub async fn add_pronunciation_hint(&self, term: &str) -> String {
        match self.try_pronunciation_hint(term).await {
            Ok(hint) => hint,
            Err(e) => {
                warn!(error = %e, "Pronunciation hint unavailable");
                format!("{term} [pronunciation guide unavailable]")
            }
        }
    }

    #[instrument(level = "debug", skip(self, meaning), fields(%term))]
    pub async fn suggest_memory_technique(&self, term: &str, meaning: &str) -> String {
        let prompt = fill_template(MEMORY_TEMPLATE, &[("term", term), ("meaning", meaning)]);
        let completion = self.core.ask(&prompt, MEMORY_MAX_TOKENS).await;
        let tip = trim_quotes(&completion.text);
        if tip.is_empty() || tip == UNSUPPORTED_REPLY {
            return MEMORY_TECHNIQUE_FALLBACK.to_string();
        }
        tip.to_string()
    }
}

#[async_trait]
impl VocabHints for FlashcardAgent {
    async fn pronunciation_hint(&self, term: &str) -> Result<String, GenerationError> {
        Ok(self.add_pronunciation_hint(term).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> FlashcardAgent {
        FlashcardAgent::new(ProviderClient::mock(), &Prompts::default())
    }

    #[test]
    fn prompt_reflects_formula_choice() {
        let opts = FlashcardOptions { card_count: 4, include_formulas: false, ..FlashcardOptions::default() };
        let prompt = FlashcardAgent::build_prompt("Korngrenzen behindern Versetzungen.", &opts);
        assert!(prompt.starts_with("As Vocab Sensei, create 4 flashcards"));
        assert!(prompt.contains("no formulas"));
        assert!(prompt.contains("Language: de"));
    }

    #[tokio::test]
    async fn mock_flashcards_are_deterministic() {
        let a = agent();
        let opts = FlashcardOptions { card_count: 8, ..FlashcardOptions::default() };
        let text = "Die Versetzung ist ein Liniendefekt. ".repeat(5);
        let first = a.generate(&text, &opts).await.unwrap();
        let second = a.generate(&text, &opts).await.unwrap();
        assert_eq!(first.cards.len(), 8);
        assert_eq!(first.cards, second.cards);
        assert_eq!(first.metadata.total_cards, 8);
    }

    #[tokio::test]
    async fn hint_and_memory_technique_never_fail() {
        let a = agent();
        assert_eq!(a.add_pronunciation_hint("Korngrenze").await, "Korngrenze [pronunciation guide unavailable]");
        assert_eq!(a.suggest_memory_technique("Versetzung", "dislocation").await, MEMORY_TECHNIQUE_FALLBACK);
    }
}
