use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use serde_json::Value;
use tokio::task::spawn_blocking;

use crate::{
    auth::Identity,
    queue::SongEntry,
    rooms::{Member, RoomData, RoomId, RoomListing, SeatSnapshot},
    sessions::ConnectionId,
    EncoreContext,
};

/// Everything the server sends to clients, whether a room broadcast or a
/// direct reply to a command.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "kebab-case")]
pub enum Event {
    /// A new connection joined the room
    MemberJoined {
        connection: ConnectionId,
        identity: Identity,
    },
    /// A connection left the room or disconnected
    MemberLeft { connection: ConnectionId },
    /// Full state of all 16 seats, sent after every seat mutation
    SeatsUpdate { seats: Vec<SeatSnapshot> },
    QueueUpdate { items: Vec<SongEntry> },
    CurrentSongUpdate { current: Option<SongEntry> },
    ChatMessage {
        identity: Identity,
        text: String,
        timestamp: i64,
    },
    MuteChanged {
        connection: ConnectionId,
        is_muted: bool,
    },
    /// Call-setup payload relayed from an offering peer
    IncomingOffer {
        connection: ConnectionId,
        identity: Identity,
        payload: Value,
    },
    /// Call-setup payload relayed back from the answering peer
    IncomingAnswer {
        connection: ConnectionId,
        identity: Identity,
        payload: Value,
    },
    RoomCreated { room: RoomData },
    RoomList { rooms: Vec<RoomListing> },
    RoomMeta { room: RoomData },
    /// Reply to a join: the members that were already in the room
    RoomMembers { members: Vec<Member> },
    Error { message: String },
}

/// Selects which connections receive an event. Room recipients are resolved
/// when the event is delivered, not when it is emitted, so a connection that
/// left moments earlier never receives stale fan-out.
#[derive(Debug, Clone)]
pub enum Recipients {
    Room(RoomId),
    RoomExcept(RoomId, ConnectionId),
    Only(ConnectionId),
}

type Message = (Event, Recipients);

#[derive(Debug, Clone)]
pub struct Events {
    sender: Sender<Message>,
    receiver: Receiver<Message>,
}

impl Events {
    pub fn emit(&self, event: Event, recipients: Recipients) {
        self.sender.send((event, recipients)).unwrap();
    }

    #[cfg(test)]
    pub fn drain(&self) -> Vec<Message> {
        self.receiver.try_iter().collect()
    }
}

impl Default for Events {
    fn default() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }
}

pub async fn check_events(context: EncoreContext) {
    while let Ok((event, recipients)) = {
        let receiver = context.events.receiver.clone();
        spawn_blocking(move || receiver.recv()).await.unwrap()
    } {
        let targets = match recipients {
            Recipients::Room(room) => context.rooms.member_connections(&room),
            Recipients::RoomExcept(room, skipped) => context
                .rooms
                .member_connections(&room)
                .into_iter()
                .filter(|c| *c != skipped)
                .collect(),
            Recipients::Only(connection) => vec![connection],
        };

        if targets.is_empty() {
            continue;
        }

        let message = serde_json::to_string(&event).expect("serialize event");
        context.websockets.send_many(&targets, message);
    }
}
