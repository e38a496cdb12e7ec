use axum::{
    extract::{Extension, ws::{WebSocket, WebSocketUpgrade, Message}},
    response::IntoResponse,
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tracing::{info, error};
use crate::dto::{league_dto::{LeagueRoster, LeagueUpdate}, suggestion_dto::{Suggestion, SuggestionUpdate}};
use crate::services::suggestions::load_ballot;
use futures_util::{StreamExt, SinkExt};

pub fn send_league_update(tx: &broadcast::Sender<String>, roster: &LeagueRoster) {
    let update = LeagueUpdate {
        r#type: "league_update".to_string(),
        league: roster.clone()
    };

    match serde_json::to_string(&update) {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => {
            error!("Failed to serialize league update: {}", e);
        }
    }
}

pub async fn send_suggestion_update(pool: &SqlitePool, tx: &broadcast::Sender<String>, suggestion: &Suggestion) {
    let tally = match load_ballot(pool, suggestion.id).await {
        Ok(ballot) => ballot.tally(),
        Err(e) => {
            error!("Failed to load ballot for suggestion {}: {}", suggestion.id, e);
            return;
        }
    };

    let update = SuggestionUpdate {
        r#type: "suggestion_update".to_string(),
        suggestion: suggestion.clone(),
        tally
    };

    match serde_json::to_string(&update) {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(e) => {
            error!("Failed to serialize suggestion update: {}", e);
        }
    }
}

/* Web Socket stuff */
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Extension(tx): Extension<broadcast::Sender<String>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, tx))
}

/* Clients only listen; anything they send is ignored. */
async fn handle_socket(socket: WebSocket, tx: broadcast::Sender<String>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = tx.subscribe();
    info!("Websocket client connected.");

    let send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Close(_) = msg {
            break;
        }
    }

    send_task.abort();
    info!("Websocket client disconnected.");
}
