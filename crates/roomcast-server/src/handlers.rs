//! Connection handlers for the Roomcast server.
//!
//! This module owns the transport boundary: the WebSocket upgrade, the
//! per-connection outbound queue, and the loop that feeds the session
//! state machine.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use roomcast_core::{JoinRequest, RelayLimits, RoomRegistry, Session, SessionEvent};
use roomcast_protocol::{codec, ServerFrame};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, trace, warn};

/// State shared by every handler.
pub struct AppState {
    /// The room registry.
    pub registry: Arc<RoomRegistry>,
    /// Loaded configuration.
    pub config: Config,
}

impl AppState {
    /// Build state with a registry sized from the configured limits.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let limits = RelayLimits {
            capacity: config.limits.room_capacity,
            history_limit: config.limits.history_limit,
            max_name_length: config.limits.max_name_length,
            max_text_length: config.limits.max_text_length,
        };

        Self {
            registry: Arc::new(RoomRegistry::with_limits(limits)),
            config,
        }
    }
}

/// Join parameters carried on the upgrade request's query string.
#[derive(Debug, Deserialize)]
struct JoinParams {
    room: Option<String>,
    name: Option<String>,
}

impl From<JoinParams> for JoinRequest {
    fn from(params: JoinParams) -> Self {
        JoinRequest {
            room: params.room,
            name: params.name,
        }
    }
}

/// Bring up the HTTP listener and serve connections until shutdown.
///
/// # Errors
///
/// Returns an error if the listener cannot bind.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()));

    // Exporter first, if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Metrics exporter failed to start: {}", e);
        }
    }

    // WebSocket upgrade, health check, static assets
    let app = Router::new()
        .route(&config.http.websocket_path, get(ws_handler))
        .route("/health", get(health_handler))
        .fallback_service(ServeDir::new(&config.http.static_dir))
        .with_state(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;

    info!("Roomcast server listening on {}", addr);
    info!(
        "WebSocket endpoint at ws://{}{}",
        addr, config.http.websocket_path
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Upgrade requests land here carrying the join query parameters.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<JoinParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let max_frame = state.config.limits.max_frame_bytes;
    ws.max_message_size(max_frame)
        .on_upgrade(move |socket| handle_websocket(socket, state, params.into()))
}

/// Drive one connection from admission to teardown.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>, request: JoinRequest) {
    // Gauge held for the socket's lifetime
    let _metrics_guard = ConnectionMetricsGuard::new();

    let (mut sender, mut receiver) = socket.split();

    // Everything the room wants this connection to see goes through the
    // outbound queue; this task is the only writer on the socket.
    let (outbound, mut outbox) = mpsc::unbounded_channel();

    // Admission queues either the init frame or the rejection.
    let mut session = match Session::connect(state.registry.clone(), request, outbound) {
        Ok(session) => session,
        Err(err) => {
            metrics::record_error("room_full");
            debug!(error = %err, "Connection rejected");
            // All queue handles are gone by now, so this drains the
            // rejection frame and terminates.
            while let Some(frame) = outbox.recv().await {
                if send_frame(&mut sender, &frame).await.is_err() {
                    break;
                }
            }
            let _ = sender.close().await;
            return;
        }
    };

    debug!(
        connection = %session.id(),
        room = %session.room(),
        name = %session.name(),
        "WebSocket connected"
    );
    metrics::set_active_rooms(state.registry.stats().room_count);

    // Relay loop
    loop {
        tokio::select! {
            biased;

            // Frames queued for this connection by room activity
            Some(frame) = outbox.recv() => {
                if send_frame(&mut sender, &frame).await.is_err() {
                    session.handle_event(SessionEvent::Errored);
                    break;
                }
            }

            // Inbound traffic from the peer
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let start = Instant::now();
                        metrics::record_frame(text.len(), "inbound");
                        session.handle_text(&text);
                        metrics::record_frame_latency(start.elapsed().as_secs_f64());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        // Browser clients speak text; accept binary frames
                        // holding UTF-8 JSON and drop the rest.
                        match std::str::from_utf8(&data) {
                            Ok(text) => {
                                metrics::record_frame(text.len(), "inbound");
                                session.handle_text(text);
                            }
                            Err(_) => {
                                trace!(connection = %session.id(), "Dropping non-UTF-8 binary frame");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            session.handle_event(SessionEvent::Errored);
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Pongs need no reply
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection = %session.id(), "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(connection = %session.id(), error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        session.handle_event(SessionEvent::Errored);
                        break;
                    }
                    None => {
                        debug!(connection = %session.id(), "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    // Cleanup; a no-op when the session already tore down on error.
    session.handle_event(SessionEvent::Closed);
    metrics::set_active_rooms(state.registry.stats().room_count);

    debug!(connection = %session.id(), "WebSocket disconnected");
}

/// Encode and send one frame to the WebSocket.
async fn send_frame(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<()> {
    let text = codec::encode(frame)?;
    metrics::record_frame(text.len(), "outbound");
    if matches!(frame, ServerFrame::Message(_)) {
        metrics::record_message_relayed();
    }
    sender.send(Message::Text(text)).await?;
    Ok(())
}
