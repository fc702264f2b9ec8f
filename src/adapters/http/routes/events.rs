//! Admin notification channel.
//!
//! Browsers cannot set headers on WebSocket requests, so the bearer token
//! travels as a query parameter and is verified before the upgrade. Each
//! connection forwards broadcast events as JSON text frames; a subscriber
//! that falls behind skips the missed events, there is no replay.

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::adapters::http::app_state::AppState;
use crate::app_error::{AppError, AppResult};
use crate::application::policy::{Action, Ownership, require};
use crate::entities::user::User;
use crate::ports::notifier::Notification;

#[derive(Deserialize)]
pub struct EventsQuery {
    token: Option<String>,
}

pub async fn events(
    State(app_state): State<AppState>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let user = authorize_subscriber(&app_state, query.token.as_deref()).await?;
    let rx = app_state.events.subscribe();

    debug!(username = %user.username, "Notification client connected");
    Ok(ws.on_upgrade(move |socket| forward_events(socket, rx)))
}

pub(crate) async fn authorize_subscriber(
    app_state: &AppState,
    token: Option<&str>,
) -> AppResult<User> {
    let token = token.ok_or_else(|| AppError::Unauthorized("Unauthorized.".into()))?;
    let user = app_state.auth_use_cases.authenticate(token).await?;
    require(
        user.role,
        Action::SubscribeNotifications,
        Ownership::NotApplicable,
    )?;
    Ok(user)
}

async fn forward_events(mut socket: WebSocket, mut rx: broadcast::Receiver<Notification>) {
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(notification) => {
                    let Ok(text) = serde_json::to_string(&notification) else {
                        continue;
                    };
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                // Slow subscriber: drop the missed events, keep the stream.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = socket.recv() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Inbound frames are ignored; this channel is one-way.
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("Notification client disconnected");
}
