use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::{
    auth::Identity,
    server::{gateway, Context, Router},
    sessions::ConnectionId,
    EncoreContext,
};

/// Tracks the outgoing half of every live gateway connection so the event
/// loop can push to any connection by id.
#[derive(Debug, Default)]
pub struct WebSocketManager {
    connections: DashMap<ConnectionId, UnboundedSender<String>>,
}

impl WebSocketManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn register(&self, connection: ConnectionId, sender: UnboundedSender<String>) {
        self.connections.insert(connection, sender);
    }

    fn unregister(&self, connection: ConnectionId) {
        self.connections.remove(&connection);
    }

    /// Best-effort: targets that are gone are skipped.
    pub fn send_many(&self, targets: &[ConnectionId], message: String) {
        for target in targets {
            if let Some(sender) = self.connections.get(target) {
                sender.send(message.clone()).ok();
            }
        }
    }
}

pub fn router() -> Router {
    Router::new().route("/", get(upgrade_gateway))
}

async fn upgrade_gateway(
    identity: Identity,
    State(context): Context,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_gateway(context, identity, socket))
}

async fn handle_gateway(context: EncoreContext, identity: Identity, socket: WebSocket) {
    let connection = context.sessions.attach(identity.clone());
    let (mut sink, mut stream) = socket.split();

    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();
    context.websockets.register(connection, sender);

    info!("{} connected as connection {}", identity.username, connection);

    let outgoing = tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            if sink.send(Message::Text(message)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str(&text) {
                Ok(command) => gateway::handle_command(&context, connection, command),
                Err(err) => debug!("Ignoring malformed command from {}: {}", connection, err),
            },
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    info!("Connection {} disconnected", connection);

    context.websockets.unregister(connection);
    context.rooms.handle_disconnect(connection);
    outgoing.abort();
}
