//! Specialized agents. Each wraps the provider client with a persona, a prompt
//! template, an output schema and a validation step.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::provider::{Completion, ProviderClient, ProviderRequest};
use crate::util::{strip_code_fences, trunc_for_log};

pub mod exam;
pub mod flashcards;
pub mod quiz;

pub use exam::ExamAgent;
pub use flashcards::{FlashcardAgent, VocabHints};
pub use quiz::QuizAgent;

/// Static identity of an agent.
pub trait Agent {
    /// Persona name used inside prompts ("Quiz Master").
    fn persona(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
}

/// Serializable agent description for status endpoints.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AgentInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub status: &'static str,
}

impl AgentInfo {
    pub fn of(agent: &dyn Agent) -> Self {
        Self { name: agent.name(), description: agent.description(), status: "active" }
    }
}

/// Shared plumbing: provider handle plus the persona's system prompt.
#[derive(Clone)]
pub(crate) struct AgentCore {
    provider: ProviderClient,
    persona: &'static str,
    system_prompt: String,
}

impl AgentCore {
    pub(crate) fn new(provider: ProviderClient, persona: &'static str, personality: &str, json_suffix: &str) -> Self {
        let system_prompt = format!("You are {persona}, a specialized AI agent. {personality}\n\n{json_suffix}");
        Self { provider, persona, system_prompt }
    }

    pub(crate) async fn ask(&self, prompt: &str, max_tokens: u32) -> Completion {
        let completion = self
            .provider
            .call(ProviderRequest { system: &self.system_prompt, prompt, max_tokens })
            .await;
        debug!(agent = self.persona, origin = ?completion.origin, reply_len = completion.text.len(), "Agent reply");
        completion
    }
}

/// Strip code fences, parse JSON, then decode into `T`.
/// Syntax errors are `InvalidJson`; shape errors are `Schema`.
pub fn parse_json_response<T: DeserializeOwned>(
    agent: &'static str,
    artifact: &'static str,
    raw: &str,
) -> Result<T, GenerationError> {
    let cleaned = strip_code_fences(raw);
    let value: serde_json::Value = serde_json::from_str(cleaned).map_err(|e| {
        warn!(agent, error = %e, preview = %trunc_for_log(cleaned, 120), "Failed to parse JSON response");
        GenerationError::InvalidJson(e.to_string())
    })?;
    serde_json::from_value(value).map_err(|e| GenerationError::Schema { agent, artifact, detail: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Payload {
        items: Vec<u32>,
    }

    #[test]
    fn fenced_json_is_accepted() {
        let p: Payload = parse_json_response("Tester", "thing", "```json\n{\"items\": [1, 2]}\n```").unwrap();
        assert_eq!(p.items, vec![1, 2]);
    }

    #[test]
    fn syntax_and_shape_errors_are_distinguished() {
        let e = parse_json_response::<Payload>("Tester", "thing", "Sure! Here is your quiz:").unwrap_err();
        assert!(matches!(e, GenerationError::InvalidJson(_)));
        assert!(e.to_string().starts_with("invalid JSON response from AI"));

        let e = parse_json_response::<Payload>("Tester", "thing", "{\"other\": 1}").unwrap_err();
        match e {
            GenerationError::Schema { detail, .. } => assert!(detail.contains("items")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
