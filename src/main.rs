use std::sync::Arc;

use colored::Colorize;
use log::{error, info};
use thiserror::Error;
use tokio::runtime::{self, Runtime};

use crate::{
    events::Events,
    logging::LogColor,
    rooms::RoomManager,
    server::ws::WebSocketManager,
    sessions::SessionRegistry,
    signaling::SignalingRelay,
};

mod auth;
mod errors;
mod events;
mod logging;
mod queue;
mod rooms;
mod server;
mod sessions;
mod signaling;
mod util;

pub struct Encore {
    sessions: Arc<SessionRegistry>,
    rooms: Arc<RoomManager>,
    signaling: Arc<SignalingRelay>,
    websockets: Arc<WebSocketManager>,
    events: Events,
    runtime: Runtime,
}

/// A handle bundle passed to the server layer and the event loop.
#[derive(Clone)]
pub struct EncoreContext {
    pub events: Events,
    pub sessions: Arc<SessionRegistry>,
    pub rooms: Arc<RoomManager>,
    pub signaling: Arc<SignalingRelay>,
    pub websockets: Arc<WebSocketManager>,
}

#[derive(Debug, Error)]
enum EncoreError {
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Encore {
    fn new() -> Result<Self, EncoreError> {
        info!("Building async runtime...");
        let main_runtime = runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("encore-async")
            .build()
            .map_err(|e| EncoreError::Fatal(e.to_string()))?;

        let events = Events::default();
        let sessions = Arc::new(SessionRegistry::default());
        let rooms = RoomManager::new(events.clone(), sessions.clone());
        let signaling = SignalingRelay::new(events.clone(), sessions.clone());

        Ok(Self {
            sessions,
            rooms,
            signaling,
            events,
            websockets: WebSocketManager::new(),
            runtime: main_runtime,
        })
    }

    fn run(&self) {
        let context = self.context();

        self.runtime.block_on(async move {
            tokio::spawn(events::check_events(context.clone()));
            server::run_server(context).await
        });
    }

    fn context(&self) -> EncoreContext {
        EncoreContext {
            events: self.events.clone(),
            sessions: self.sessions.clone(),
            rooms: self.rooms.clone(),
            signaling: self.signaling.clone(),
            websockets: self.websockets.clone(),
        }
    }
}

impl EncoreError {
    fn hint(&self) -> String {
        match self {
            EncoreError::Fatal(_) => "This error is fatal, and should not happen.".to_string(),
        }
    }
}

fn main() {
    logging::init_logger();

    match Encore::new() {
        Ok(encore) => {
            info!("Initialized successfully.");
            encore.run();
        }
        Err(error) => {
            error!(
                "{} Read the error below to troubleshoot the issue. If you think this might be a bug, please report it by making a GitHub issue.",
                "Encore failed to start!".bold().color(LogColor::Red)
            );
            error!("{}", error);
            error!(
                "{}",
                format!("Hint: {}", error.hint())
                    .color(LogColor::Dimmed)
                    .italic()
            );
        }
    }
}
