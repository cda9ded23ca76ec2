//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Field names are camelCase on the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{
    ArtifactKind, Difficulty, DifficultyReport, ExamOptions, FlashcardOptions, GeneratedExam, GeneratedFlashcards,
    GeneratedQuiz, Language, QuizOptions,
};
use crate::error::GenerationError;
use crate::generation::{ContentOrigin, GenerationState, SourceRef};
use crate::provider::ProviderKind;

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    GenerateQuiz {
        #[serde(rename = "materialId", default)]
        material_id: Option<String>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        options: QuizOptions,
        #[serde(default)]
        enhance: bool,
    },
    GenerateFlashcards {
        #[serde(rename = "materialId", default)]
        material_id: Option<String>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        options: FlashcardOptions,
    },
    GenerateExam {
        #[serde(rename = "materialId", default)]
        material_id: Option<String>,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        options: ExamOptions,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Progress {
        artifact: ArtifactKind,
        state: GenerationState,
    },
    Quiz {
        quiz: GeneratedQuiz,
        origin: ContentOrigin,
        state: GenerationState,
    },
    Flashcards {
        flashcards: GeneratedFlashcards,
        origin: ContentOrigin,
        state: GenerationState,
    },
    Exam {
        exam: GeneratedExam,
        analysis: DifficultyReport,
        topics: Vec<String>,
        origin: ContentOrigin,
        state: GenerationState,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        artifact: Option<ArtifactKind>,
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub provider: ProviderKind,
    pub agents: BTreeMap<String, bool>,
}

#[derive(Deserialize)]
pub struct ValidateIn {
    pub text: String,
}

/// `GET /materials?week=week2` narrows the listing to one course week.
#[derive(Debug, Default, Deserialize)]
pub struct MaterialsQuery {
    #[serde(default)]
    pub week: Option<String>,
}

#[derive(Deserialize)]
pub struct UploadIn {
    pub title: String,
    #[serde(default)]
    pub language: Language,
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizIn {
    #[serde(default)]
    pub material_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub options: QuizOptions,
    #[serde(default)]
    pub enhance: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardsIn {
    #[serde(default)]
    pub material_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub options: FlashcardOptions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamIn {
    #[serde(default)]
    pub material_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub options: ExamOptions,
}

/// Shared by all three request bodies.
pub fn source_of(material_id: &Option<String>, text: &Option<String>) -> Result<SourceRef, GenerationError> {
    SourceRef::from_parts(material_id.clone(), text.clone())
}

#[derive(Serialize)]
pub struct ArtifactOut<T: Serialize> {
    pub artifact: T,
    pub origin: ContentOrigin,
    pub state: GenerationState,
}

#[derive(Serialize)]
pub struct ExamOut {
    pub artifact: GeneratedExam,
    pub analysis: DifficultyReport,
    pub topics: Vec<String>,
    pub origin: ContentOrigin,
    pub state: GenerationState,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOut {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<GenerationState>,
}

#[derive(Deserialize)]
pub struct EnhanceIn {
    pub quiz: GeneratedQuiz,
}

#[derive(Deserialize)]
pub struct AdaptIn {
    pub question: String,
    pub current: Difficulty,
    pub target: Difficulty,
    #[serde(default)]
    pub context: String,
}
#[derive(Serialize)]
pub struct AdaptOut {
    pub question: String,
}

#[derive(Deserialize)]
pub struct PronunciationIn {
    pub term: String,
}
#[derive(Serialize)]
pub struct PronunciationOut {
    pub term: String,
    pub hint: String,
}

#[derive(Deserialize)]
pub struct MnemonicIn {
    pub term: String,
    #[serde(default)]
    pub meaning: String,
}
#[derive(Serialize)]
pub struct MnemonicOut {
    pub technique: String,
}

#[derive(Deserialize)]
pub struct AnalyzeIn {
    pub exam: GeneratedExam,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_generate_quiz_uses_defaults() {
        let msg: ClientWsMessage =
            serde_json::from_str(r#"{"type":"generate_quiz","materialId":"w1-ch1"}"#).unwrap();
        match msg {
            ClientWsMessage::GenerateQuiz { material_id, text, options, enhance } => {
                assert_eq!(material_id.as_deref(), Some("w1-ch1"));
                assert!(text.is_none());
                assert_eq!(options.question_count, 5);
                assert!(!enhance);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn progress_is_tagged() {
        let v = serde_json::to_value(ServerWsMessage::Progress {
            artifact: ArtifactKind::Exam,
            state: GenerationState::default(),
        })
        .unwrap();
        assert_eq!(v["type"], "progress");
        assert_eq!(v["artifact"], "exam");
        assert_eq!(v["state"]["progress"], 0);
    }

    #[test]
    fn exam_request_accepts_duration_alias() {
        let body: ExamIn =
            serde_json::from_str(r#"{"text":"x","options":{"questionCount":8,"duration":90}}"#).unwrap();
        assert_eq!(body.options.question_count, 8);
        assert_eq!(body.options.duration_minutes, 90);
    }
}
