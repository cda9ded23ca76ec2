use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use studykit_backend::agents::QuizAgent;
use studykit_backend::config::{ExamPolicy, Prompts};
use studykit_backend::domain::QuizOptions;
use studykit_backend::error::{GenerationError, ProviderError};
use studykit_backend::mock::mock_response;
use studykit_backend::provider::{Origin, ProviderRequest};
use studykit_backend::{AgentManager, ProviderClient, ProviderConfig, ProviderKind};

const QUIZ_PROMPT: &str = "As Quiz Master, create 2 multiple-choice quiz questions from the course content below.";

fn anthropic(server: &MockServer) -> ProviderClient {
    let cfg = ProviderConfig {
        anthropic_api_key: Some("ak-test".into()),
        anthropic_base_url: server.uri(),
        ..ProviderConfig::default()
    };
    ProviderClient::new(&cfg).unwrap()
}

fn openai(server: &MockServer) -> ProviderClient {
    let cfg = ProviderConfig {
        openai_api_key: Some("sk-test".into()),
        openai_base_url: server.uri(),
        ..ProviderConfig::default()
    };
    ProviderClient::new(&cfg).unwrap()
}

fn req(prompt: &str) -> ProviderRequest<'_> {
    ProviderRequest { system: "You are a test persona.", prompt, max_tokens: 100 }
}

fn chat_reply(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 34, "total_tokens": 46 }
    })
}

fn lecture() -> String {
    "Vacancies and interstitials are point defects; dislocations are line defects in crystals. ".repeat(3)
}

#[tokio::test]
async fn anthropic_messages_wire_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ak-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-sonnet-20241022",
            "max_tokens": 100,
            "system": "You are a test persona."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "  Hello from the primary  " }],
            "usage": { "input_tokens": 10, "output_tokens": 5 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = anthropic(&server);
    assert_eq!(client.kind(), ProviderKind::Anthropic);
    let completion = client.call(req("Say hello")).await;
    assert_eq!(completion.origin, Origin::Live);
    assert_eq!(completion.text, "Hello from the primary");
}

#[tokio::test]
async fn openai_chat_wire_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o", "max_tokens": 100 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Hello from the secondary")))
        .expect(1)
        .mount(&server)
        .await;

    let client = openai(&server);
    assert_eq!(client.kind(), ProviderKind::OpenAI);
    assert_eq!(client.complete(req("Say hello")).await.unwrap(), "Hello from the secondary");
}

#[tokio::test]
async fn http_errors_surface_provider_message_then_fall_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "type": "error",
            "error": { "type": "api_error", "message": "upstream exploded" }
        })))
        .mount(&server)
        .await;

    let client = anthropic(&server);
    match client.complete(req(QUIZ_PROMPT)).await {
        Err(ProviderError::Status { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let completion = client.call(req(QUIZ_PROMPT)).await;
    assert_eq!(completion.origin, Origin::MockFallback);
    assert_eq!(completion.text, mock_response(QUIZ_PROMPT));
}

#[tokio::test]
async fn non_json_success_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let client = openai(&server);
    assert!(matches!(client.complete(req("x")).await, Err(ProviderError::MalformedBody(_))));
    assert_eq!(client.call(req("x")).await.origin, Origin::MockFallback);
}

#[tokio::test]
async fn empty_choices_are_an_empty_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = openai(&server);
    assert!(matches!(client.complete(req("x")).await, Err(ProviderError::EmptyCompletion)));
}

#[tokio::test]
async fn live_quiz_with_fenced_json_is_accepted() {
    let server = MockServer::start().await;
    let quiz = json!({
        "questions": [
            {
                "question": "Which defect is one-dimensional?",
                "options": ["Vacancy", "Dislocation", "Grain boundary", "Pore"],
                "correctAnswer": 1,
                "explanation": "Dislocations are line defects.",
                "difficulty": "easy"
            },
            {
                "question": "Which defect is zero-dimensional?",
                "options": ["Vacancy", "Dislocation", "Grain boundary", "Twin"],
                "correctAnswer": 0,
                "explanation": "Vacancies are point defects.",
                "difficulty": "medium"
            }
        ]
    });
    let fenced = format!("```json\n{}\n```", quiz);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(&fenced)))
        .mount(&server)
        .await;

    let manager = AgentManager::new(openai(&server), &Prompts::default(), ExamPolicy::default());
    let opts = QuizOptions { question_count: 2, ..QuizOptions::default() };
    let out = manager.generate_quiz(&lecture(), &opts).await.unwrap();
    assert_eq!(out.questions.len(), 2);
    assert_eq!(out.questions[0].correct_answer, 1);
    assert_eq!(out.metadata.total_questions, 2);

    let err = manager
        .generate_quiz(&lecture(), &QuizOptions { question_count: 3, ..QuizOptions::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::CountMismatch { expected: 3, actual: 2, .. }));
}

#[tokio::test]
async fn live_prose_reply_is_invalid_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "Sure! Here are some questions about defects." }]
        })))
        .mount(&server)
        .await;

    let agent = QuizAgent::new(anthropic(&server), &Prompts::default());
    let err = agent.generate(&lecture(), &QuizOptions::default()).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidJson(_)));
}
