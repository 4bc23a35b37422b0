use std::{env, net::SocketAddr};

use axum::extract::State;
use log::info;
use tower_http::cors::{Any, CorsLayer};

use crate::{rooms, EncoreContext};

pub mod gateway;
pub mod ws;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 3001;

pub type Router = axum::Router<EncoreContext>;
pub type Context = State<EncoreContext>;

/// Starts the lobby routes and the WebSocket gateway.
pub async fn run_server(context: EncoreContext) {
    let port = env::var("ENCORE_PORT")
        .map(|x| x.parse::<u16>().expect("Port must be a number"))
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one = Router::new()
        .nest("/rooms", rooms::router())
        .nest("/gateway", ws::router());

    let app = Router::new()
        .nest("/v1", version_one)
        .layer(cors)
        .with_state(context);

    info!("Listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .expect("server runs")
}
