//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! dispatched. Generation requests stream `progress` messages while they run
//! and finish with a single artifact or error message.

use std::future::Future;
use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, error, info, instrument};

use crate::domain::ArtifactKind;
use crate::generation::{generate_exam_for, generate_flashcards_for, generate_quiz_for, GenerationState, SourceRef};
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

type ProgressTx = UnboundedSender<(ArtifactKind, GenerationState)>;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "studykit_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "studykit_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "studykit_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, &mut socket).await
          }
          Err(e) => Ok(ServerWsMessage::Error { artifact: None, message: format!("Invalid JSON: {}", e) }),
        };

        let sent = match reply {
          Ok(reply) => send_json(&mut socket, &reply).await,
          Err(e) => Err(e),
        };
        if let Err(e) = sent {
          error!(target: "studykit_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "studykit_backend", "WebSocket disconnected");
}

async fn send_json(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await
}

/// Run `work` while forwarding its progress reports to the socket.
async fn with_progress<F, Fut>(socket: &mut WebSocket, work: F) -> Result<Fut::Output, axum::Error>
where
  F: FnOnce(ProgressTx) -> Fut,
  Fut: Future,
{
  let (tx, mut rx) = unbounded_channel();
  let work = work(tx);
  let forward = async {
    while let Some((artifact, state)) = rx.recv().await {
      send_json(socket, &ServerWsMessage::Progress { artifact, state }).await?;
    }
    Ok::<(), axum::Error>(())
  };
  let (out, forwarded) = tokio::join!(work, forward);
  forwarded?;
  Ok(out)
}

fn failure(artifact: ArtifactKind, message: String) -> ServerWsMessage {
  ServerWsMessage::Error { artifact: Some(artifact), message }
}

#[instrument(level = "info", skip_all)]
async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &AppState,
  socket: &mut WebSocket,
) -> Result<ServerWsMessage, axum::Error> {
  let reply = match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::GenerateQuiz { material_id, text, options, enhance } => {
      let source = match SourceRef::from_parts(material_id, text) {
        Ok(s) => s,
        Err(e) => return Ok(failure(ArtifactKind::Quiz, e.to_string())),
      };
      let result = with_progress(socket, |tx| async move {
        generate_quiz_for(state, &source, &options, enhance, &tx).await
      })
      .await?;
      match result {
        Ok(out) => {
          info!(target: "generation", questions = out.artifact.questions.len(), origin = ?out.origin, "WS quiz served");
          ServerWsMessage::Quiz { quiz: out.artifact, origin: out.origin, state: out.state }
        }
        Err(f) => failure(ArtifactKind::Quiz, f.error.to_string()),
      }
    }

    ClientWsMessage::GenerateFlashcards { material_id, text, options } => {
      let source = match SourceRef::from_parts(material_id, text) {
        Ok(s) => s,
        Err(e) => return Ok(failure(ArtifactKind::Flashcards, e.to_string())),
      };
      let result = with_progress(socket, |tx| async move {
        generate_flashcards_for(state, &source, &options, &tx).await
      })
      .await?;
      match result {
        Ok(out) => {
          info!(target: "generation", cards = out.artifact.cards.len(), origin = ?out.origin, "WS flashcards served");
          ServerWsMessage::Flashcards { flashcards: out.artifact, origin: out.origin, state: out.state }
        }
        Err(f) => failure(ArtifactKind::Flashcards, f.error.to_string()),
      }
    }

    ClientWsMessage::GenerateExam { material_id, text, options } => {
      let source = match SourceRef::from_parts(material_id, text) {
        Ok(s) => s,
        Err(e) => return Ok(failure(ArtifactKind::Exam, e.to_string())),
      };
      let result = with_progress(socket, |tx| async move {
        generate_exam_for(state, &source, &options, &tx).await
      })
      .await?;
      match result {
        Ok(out) => {
          info!(target: "generation", questions = out.generated.artifact.questions.len(), "WS exam served");
          ServerWsMessage::Exam {
            exam: out.generated.artifact,
            analysis: out.analysis,
            topics: out.topics,
            origin: out.generated.origin,
            state: out.generated.state,
          }
        }
        Err(f) => failure(ArtifactKind::Exam, f.error.to_string()),
      }
    }
  };
  Ok(reply)
}
