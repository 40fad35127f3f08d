//! Live-update WebSocket handler
//!
//! The channel pushes `new_poll` and `vote_update` events to the viewer
//! and accepts `new_vote` messages from it.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::server::AppState;
use crate::error::Result;
use crate::live::{LiveChannel, CHANNEL_BUFFER_SIZE};
use crate::models::{ClientMessage, LiveEvent};

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    token: String,
}

/// WebSocket upgrade for the live-update channel
pub async fn live_ws(
    ws: WebSocketUpgrade,
    Query(query): Query<LiveQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse> {
    // Browsers cannot set headers on the handshake, so the session
    // token arrives as a query parameter.
    let viewer_id = state.session.verify_token(&query.token)?;

    Ok(ws.on_upgrade(move |socket| handle_live_ws(socket, state, viewer_id)))
}

/// Drive one live channel until either side goes away
async fn handle_live_ws(socket: WebSocket, state: AppState, viewer_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let (channel, mut rx) = LiveChannel::new(CHANNEL_BUFFER_SIZE);
    let channel_id = channel.id();

    // Kept for replying to this viewer with rejection frames, and for
    // unregistering on teardown.
    let reply = channel.clone();
    let handle = channel.clone();

    state.registry.register(channel);
    info!(viewer_id = %viewer_id, channel_id = %channel_id, "Live channel connected");

    // Drain the channel queue into the socket, preserving send order
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    // Handle incoming votes and close/error frames
    let recv_state = state.clone();
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_client_message(&recv_state, viewer_id, &reply, &text).await;
                }
                Ok(Message::Close(_)) => {
                    debug!(channel_id = %channel_id, "Live channel received close");
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by axum
                }
                Err(e) => {
                    debug!(channel_id = %channel_id, error = %e, "Live channel error");
                    break;
                }
                _ => {}
            }
        }
    });

    // Either task ending means the connection is done
    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut receive_task => {}
    }

    send_task.abort();
    receive_task.abort();
    let _ = tokio::join!(send_task, receive_task);

    state.registry.unregister(&handle);
    info!(viewer_id = %viewer_id, channel_id = %channel_id, "Live channel disconnected");
}

/// Apply one client message
///
/// A rejected vote is reported back on this viewer's own channel; it
/// never aborts the connection or other in-flight votes.
async fn handle_client_message(
    state: &AppState,
    viewer_id: Uuid,
    reply: &LiveChannel,
    text: &str,
) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(viewer_id = %viewer_id, error = %e, "Unparseable live message");
            reject(reply, "malformed message");
            return;
        }
    };

    match msg {
        ClientMessage::NewVote {
            poll_id,
            selected_option,
        } => {
            match state
                .guard
                .authorize_vote(viewer_id, poll_id, &selected_option)
                .await
            {
                Ok(votes) => {
                    state.dispatcher.broadcast(&LiveEvent::vote_update(
                        poll_id,
                        selected_option,
                        votes,
                    ));
                }
                Err(e) => {
                    warn!(
                        viewer_id = %viewer_id,
                        poll_id = %poll_id,
                        option = %selected_option,
                        error = %e,
                        "Vote rejected"
                    );
                    reject(reply, &e.to_string());
                }
            }
        }
    }
}

/// Send a rejection frame to the viewer's own channel
fn reject(reply: &LiveChannel, reason: &str) {
    let frame = json!({ "type": "error", "error": reason }).to_string();
    if reply.try_send(frame).is_err() {
        debug!(channel_id = %reply.id(), "Could not deliver rejection frame");
    }
}
