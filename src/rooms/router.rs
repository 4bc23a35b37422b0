use axum::{
    extract::State,
    routing::{get, post},
    Json,
};
use hyper::StatusCode;
use serde::Deserialize;

use crate::{
    auth::Identity,
    errors::GatewayError,
    server::{Context, Router},
};

use super::{RoomData, RoomKind, RoomListing};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_room))
        .route("/", get(get_rooms))
}

#[derive(Deserialize)]
struct CreateRoomBody {
    id: String,
    kind: RoomKind,
}

async fn create_room(
    identity: Identity,
    State(context): Context,
    Json(body): Json<CreateRoomBody>,
) -> Result<(StatusCode, Json<RoomData>), GatewayError> {
    let room = context.rooms.create_room(body.id, body.kind, identity)?;

    Ok((StatusCode::CREATED, Json(room)))
}

async fn get_rooms(_: Identity, State(context): Context) -> Json<Vec<RoomListing>> {
    Json(context.rooms.list())
}
