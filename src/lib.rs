//! Study companion backend: AI-generated quizzes, flashcards and exams from
//! course material, served over HTTP and WebSocket.

pub mod agents;
pub mod config;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod generation;
pub mod materials;
pub mod mock;
pub mod orchestrator;
pub mod protocol;
pub mod provider;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod util;
pub mod validator;

pub use config::{AppConfig, ExamPolicy, Limits, ProviderConfig};
pub use error::{GenerationError, ProviderError, ValidationError};
pub use orchestrator::AgentManager;
pub use provider::{ProviderClient, ProviderKind};
pub use routes::build_router;
pub use state::AppState;
pub use validator::validate_content;
