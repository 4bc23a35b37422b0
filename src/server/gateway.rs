use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::{
    events::{Event, Recipients},
    rooms::{Room, RoomKind},
    sessions::ConnectionId,
    util, EncoreContext,
};

/// Every command a client can issue over the gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "kebab-case")]
pub enum ClientCommand {
    RoomCreate { id: String, kind: RoomKind },
    RoomList,
    RoomMeta { id: String },
    RoomJoin { id: String },
    SeatJoin { index: usize },
    SeatLeave { index: usize },
    SeatLockToggle { index: usize },
    SeatAssign { index: usize, target: ConnectionId },
    SeatKick { index: usize },
    SeatsGet,
    QueueAdd { title: String, artist: String },
    QueueNext,
    QueueRemove { index: usize },
    QueueMove { from: usize, to: usize },
    QueueGet,
    SignalOffer { target: ConnectionId, payload: Value },
    SignalAnswer { caller: ConnectionId, payload: Value },
    ChatSend { text: String },
    MuteStatus { is_muted: bool },
}

/// Applies a command to the component it addresses. Commands touching the
/// current room are silent no-ops when the connection is not in one.
pub fn handle_command(context: &EncoreContext, connection: ConnectionId, command: ClientCommand) {
    let identity = match context.sessions.identity(connection) {
        Some(identity) => identity,
        None => return,
    };

    let reply = |event: Event| {
        context.events.emit(event, Recipients::Only(connection));
    };

    match command {
        ClientCommand::RoomCreate { id, kind } => {
            match context.rooms.create_room(id, kind, identity) {
                Ok(room) => reply(Event::RoomCreated { room }),
                Err(err) => reply(Event::Error {
                    message: err.to_string(),
                }),
            }
        }
        ClientCommand::RoomList => reply(Event::RoomList {
            rooms: context.rooms.list(),
        }),
        ClientCommand::RoomMeta { id } => match context.rooms.get_meta(&id) {
            Ok(room) => reply(Event::RoomMeta { room }),
            Err(err) => reply(Event::Error {
                message: err.to_string(),
            }),
        },
        ClientCommand::RoomJoin { id } => {
            match context.rooms.join_room(&id, connection, identity) {
                Ok(members) => reply(Event::RoomMembers { members }),
                Err(err) => reply(Event::Error {
                    message: err.to_string(),
                }),
            }
        }
        ClientCommand::SeatJoin { index } => {
            if let Some(room) = current_room(context, connection) {
                room.join_seat(index, connection, identity);
            }
        }
        ClientCommand::SeatLeave { index } => {
            if let Some(room) = current_room(context, connection) {
                room.leave_seat(index, connection);
            }
        }
        ClientCommand::SeatLockToggle { index } => {
            if let Some(room) = current_room(context, connection) {
                room.toggle_seat_lock(index, &identity);
            }
        }
        ClientCommand::SeatAssign { index, target } => {
            if let Some(room) = current_room(context, connection) {
                // The target must still be connected to be seated
                if let Some(target_identity) = context.sessions.identity(target) {
                    room.assign_seat(index, target, target_identity, &identity);
                }
            }
        }
        ClientCommand::SeatKick { index } => {
            if let Some(room) = current_room(context, connection) {
                room.kick_seat(index, &identity);
            }
        }
        ClientCommand::SeatsGet => {
            if let Some(seats) = current_room(context, connection).and_then(|r| r.seat_snapshot())
            {
                reply(Event::SeatsUpdate { seats });
            }
        }
        ClientCommand::QueueAdd { title, artist } => {
            if let Some(room) = current_room(context, connection) {
                room.add_song(title, artist, identity);
            }
        }
        ClientCommand::QueueNext => {
            if let Some(room) = current_room(context, connection) {
                room.advance_queue(&identity);
            }
        }
        ClientCommand::QueueRemove { index } => {
            if let Some(room) = current_room(context, connection) {
                room.remove_song(index, &identity);
            }
        }
        ClientCommand::QueueMove { from, to } => {
            if let Some(room) = current_room(context, connection) {
                room.move_song(from, to, &identity);
            }
        }
        ClientCommand::QueueGet => {
            if let Some(state) = current_room(context, connection).and_then(|r| r.queue_state()) {
                reply(Event::QueueUpdate { items: state.items });
                reply(Event::CurrentSongUpdate {
                    current: state.current,
                });
            }
        }
        ClientCommand::SignalOffer { target, payload } => {
            context.signaling.offer(connection, target, payload);
        }
        ClientCommand::SignalAnswer { caller, payload } => {
            context.signaling.answer(connection, caller, payload);
        }
        ClientCommand::ChatSend { text } => {
            if let Some(room) = context.sessions.room(connection) {
                context.events.emit(
                    Event::ChatMessage {
                        identity,
                        text,
                        timestamp: util::unix_millis(),
                    },
                    Recipients::Room(room),
                );
            }
        }
        ClientCommand::MuteStatus { is_muted } => {
            if let Some(room) = context.sessions.room(connection) {
                context.events.emit(
                    Event::MuteChanged {
                        connection,
                        is_muted,
                    },
                    Recipients::Room(room),
                );
            }
        }
    }
}

fn current_room(context: &EncoreContext, connection: ConnectionId) -> Option<Arc<Room>> {
    context
        .sessions
        .room(connection)
        .and_then(|id| context.rooms.room(&id))
}
