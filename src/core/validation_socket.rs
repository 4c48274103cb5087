// Live validation channel - WebSocket and single-shot HTTP transports over
// the batch validation session
//
// Every connection owns exactly one oracle. Inference is blocking, so each
// batch runs on the blocking pool with the oracle moved in and handed back.

use crate::core::config::Config;
use crate::core::error::AppError;
use crate::core::validation_session::validate_batch;
use crate::models::validation::{ClientMessage, FramesPayload, ProtocolError, ServerMessage};
use crate::platform::pose::{OracleFactory, OracleHandle};
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    Json,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Load the models for one connection; model loading blocks too
pub async fn open_oracle(factory: Arc<dyn OracleFactory>) -> Result<OracleHandle, AppError> {
    tokio::task::spawn_blocking(move || factory.open())
        .await
        .map_err(|e| AppError::Internal(format!("Oracle setup task failed: {}", e)))?
        .map_err(|e| {
            error!("Failed to initialize landmark oracle: {}", e);
            AppError::OracleUnavailable(e)
        })
}

/// Run one batch off the async runtime and return the oracle with the reply
async fn run_batch_blocking(
    mut oracle: OracleHandle,
    payload: FramesPayload,
    config: Arc<Config>,
) -> Result<(OracleHandle, ServerMessage), tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || {
        let report = validate_batch(&payload, &config.validation, &mut *oracle);
        (oracle, report.to_message())
    })
    .await
}

/// Close the models on the blocking pool; closing can block like inference
async fn release_oracle(oracle: OracleHandle) {
    if let Err(e) = tokio::task::spawn_blocking(move || drop(oracle)).await {
        error!("Oracle release task failed: {}", e);
    }
}

// ==============================================================================
// Connection
// ==============================================================================

pub struct ValidationConnection {
    id: Uuid,
    oracle: Option<OracleHandle>,
    config: Arc<Config>,
    batches: u64,
}

impl ValidationConnection {
    pub fn new(oracle: OracleHandle, config: Arc<Config>) -> Self {
        Self {
            id: Uuid::new_v4(),
            oracle: Some(oracle),
            config,
            batches: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// False once the oracle is gone; the socket should then be closed
    pub fn is_open(&self) -> bool {
        self.oracle.is_some()
    }

    /// Handle one text message; `None` means nothing is sent back
    pub async fn handle_text(&mut self, text: &str) -> Option<ServerMessage> {
        let payload = match ClientMessage::parse(text) {
            Ok(ClientMessage::Frames(payload)) => payload,
            Ok(ClientMessage::Unknown(kind)) => {
                warn!("[{}] Ignoring message of unknown type '{}'", self.id, kind);
                return None;
            }
            Err(ProtocolError::InvalidJson) => {
                warn!("[{}] Received invalid JSON", self.id);
                return Some(ServerMessage::error(ProtocolError::InvalidJson.to_string()));
            }
            Err(e) => {
                warn!("[{}] Rejected message: {}", self.id, e);
                return Some(ServerMessage::error(e.to_string()));
            }
        };

        if let Err(e) = self.config.validation.check_batch_size(&payload) {
            warn!("[{}] Rejected batch {}: {}", self.id, payload.batch_number, e);
            return Some(ServerMessage::error(e.to_string()));
        }

        Some(self.process_batch(payload).await)
    }

    async fn process_batch(&mut self, payload: FramesPayload) -> ServerMessage {
        let Some(oracle) = self.oracle.take() else {
            return ServerMessage::error("Landmark oracle is no longer available");
        };

        self.batches += 1;
        debug!("[{}] Batch {} received", self.id, payload.batch_number);

        match run_batch_blocking(oracle, payload, self.config.clone()).await {
            Ok((oracle, reply)) => {
                self.oracle = Some(oracle);
                reply
            }
            Err(e) => {
                // The oracle went down with the task
                error!("[{}] Batch task failed: {}", self.id, e);
                ServerMessage::error("Internal error while processing frames")
            }
        }
    }

    /// Release the oracle now instead of at drop
    pub async fn close(&mut self) {
        if let Some(oracle) = self.oracle.take() {
            release_oracle(oracle).await;
            debug!("[{}] Landmark oracle released", self.id);
        }
    }
}

// ==============================================================================
// Handlers
// ==============================================================================

/// `GET /ws/video` - the models are loaded before the upgrade is accepted
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let oracle = open_oracle(state.oracles.clone()).await?;
    let connection = ValidationConnection::new(oracle, state.config.clone());

    Ok(ws.on_upgrade(move |socket| serve_socket(socket, connection)))
}

async fn serve_socket(mut socket: WebSocket, mut connection: ValidationConnection) {
    let id = connection.id();
    info!("[{}] Validation socket connected", id);

    while let Some(message) = socket.recv().await {
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!("[{}] Socket error: {}", id, e);
                break;
            }
        };

        match message {
            Message::Text(text) => {
                let Some(reply) = connection.handle_text(&text).await else {
                    continue;
                };
                if let Err(e) = socket.send(Message::Text(reply.to_json())).await {
                    warn!("[{}] Client went away before reply: {}", id, e);
                    break;
                }
                if !connection.is_open() {
                    warn!("[{}] Landmark oracle lost, closing socket", id);
                    if let Err(e) = socket.send(Message::Close(None)).await {
                        debug!("[{}] Close frame not delivered: {}", id, e);
                    }
                    break;
                }
            }
            Message::Close(_) => break,
            // Binary, ping and pong frames carry nothing for us
            _ => {}
        }
    }

    connection.close().await;
    info!(
        "[{}] Validation socket closed after {} batch(es)",
        id,
        connection.batches()
    );
}

/// `POST /api/validation/frames` - one batch, one oracle, one reply
pub async fn frames_handler(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<ServerMessage>, AppError> {
    let payload: FramesPayload =
        serde_json::from_str(&body).map_err(|e| AppError::MalformedPayload(e.to_string()))?;
    state.config.validation.check_batch_size(&payload)?;

    let oracle = open_oracle(state.oracles.clone()).await?;
    let (oracle, reply) = run_batch_blocking(oracle, payload, state.config.clone())
        .await
        .map_err(|e| AppError::Internal(format!("Batch task failed: {}", e)))?;
    release_oracle(oracle).await;

    Ok(Json(reply))
}
