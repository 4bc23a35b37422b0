use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use log::{info, warn};

mod room;
mod router;
mod seats;

pub use room::*;
pub use router::router;
pub use seats::*;

use crate::{
    auth::Identity,
    errors::GatewayError,
    events::{Event, Events, Recipients},
    sessions::{ConnectionId, SessionRegistry},
};

/// The room directory. Rooms are created explicitly, never implicitly by a
/// join, and are retained for the lifetime of the process.
#[derive(Debug)]
pub struct RoomManager {
    events: Events,
    sessions: Arc<SessionRegistry>,
    rooms: DashMap<RoomId, Arc<Room>>,
}

impl RoomManager {
    pub fn new(events: Events, sessions: Arc<SessionRegistry>) -> Arc<Self> {
        Arc::new(Self {
            events,
            sessions,
            rooms: Default::default(),
        })
    }

    pub fn create_room(
        &self,
        id: RoomId,
        kind: RoomKind,
        owner: Identity,
    ) -> Result<RoomData, GatewayError> {
        // The existence check and the insert are one operation
        match self.rooms.entry(id.clone()) {
            Entry::Occupied(_) => Err(GatewayError::AlreadyExists(id)),
            Entry::Vacant(entry) => {
                let room = Arc::new(Room::new(self.events.clone(), id, kind, owner));
                let data = room.data();

                info!("Room {} created by {}", data.id, data.owner.username);
                entry.insert(room);

                Ok(data)
            }
        }
    }

    pub fn room(&self, id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(id).map(|r| r.clone())
    }

    pub fn get_meta(&self, id: &RoomId) -> Result<RoomData, GatewayError> {
        self.room(id)
            .map(|r| r.data())
            .ok_or(GatewayError::NotFound("room"))
    }

    /// Lobby listing with live member counts.
    pub fn list(&self) -> Vec<RoomListing> {
        self.rooms.iter().map(|r| r.value().listing()).collect()
    }

    /// Moves the connection into the room, leaving any room it was in first.
    /// Returns the members that were already present so the caller can build
    /// its initial peer mesh; the join itself is announced to the others.
    pub fn join_room(
        &self,
        id: &RoomId,
        connection: ConnectionId,
        identity: Identity,
    ) -> Result<Vec<Member>, GatewayError> {
        let room = self.room(id).ok_or(GatewayError::NotFound("room"))?;

        if let Some(previous) = self.sessions.room(connection) {
            if previous != *id {
                self.leave_room(&previous, connection);
            }
        }

        let existing = room.add_member(connection, identity.clone());
        self.sessions.set_room(connection, Some(id.clone()));

        info!("{} joined room {}", identity.username, id);

        self.events.emit(
            Event::MemberJoined {
                connection,
                identity,
            },
            Recipients::RoomExcept(id.clone(), connection),
        );

        Ok(existing)
    }

    /// Removes the connection from the room and frees any seats it held.
    /// Idempotent.
    pub fn leave_room(&self, id: &RoomId, connection: ConnectionId) {
        match self.room(id) {
            Some(room) => {
                if room.remove_member(connection) {
                    self.events
                        .emit(Event::MemberLeft { connection }, Recipients::Room(id.clone()));
                }

                room.release_seats_for(connection);
            }
            None => {
                warn!("Connection {} left room {} which no longer exists", connection, id);
            }
        }
    }

    /// Disconnect cascade: tears down the session and everything the
    /// connection held. Safe to call for connections that never joined.
    pub fn handle_disconnect(&self, connection: ConnectionId) {
        if let Some(room) = self.sessions.detach(connection) {
            self.leave_room(&room, connection);
        }
    }

    /// Resolved at event delivery time so fan-out never uses a stale list.
    pub fn member_connections(&self, id: &RoomId) -> Vec<ConnectionId> {
        self.room(id)
            .map(|r| r.member_connections())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{RoomKind, RoomManager};
    use crate::{
        auth::Identity,
        errors::GatewayError,
        events::{Event, Events},
        sessions::SessionRegistry,
    };

    fn manager() -> (Arc<RoomManager>, Events, Arc<SessionRegistry>) {
        let events = Events::default();
        let sessions = Arc::new(SessionRegistry::default());
        let rooms = RoomManager::new(events.clone(), sessions.clone());

        (rooms, events, sessions)
    }

    #[test]
    fn creating_the_same_room_twice_fails() {
        let (rooms, _events, _sessions) = manager();

        let first = rooms
            .create_room("lounge".to_string(), RoomKind::Karaoke, Identity::mock("john"))
            .unwrap();

        let second = rooms.create_room(
            "lounge".to_string(),
            RoomKind::Voice,
            Identity::mock("mary"),
        );

        assert!(matches!(second, Err(GatewayError::AlreadyExists(_))));

        // Metadata is unchanged from the first call
        let meta = rooms.get_meta(&"lounge".to_string()).unwrap();
        assert_eq!(meta.kind, first.kind);
        assert_eq!(meta.owner, Identity::mock("john"));
    }

    #[test]
    fn join_returns_existing_members_excluding_the_joiner() {
        let (rooms, _events, sessions) = manager();

        rooms
            .create_room("lounge".to_string(), RoomKind::Voice, Identity::mock("john"))
            .unwrap();

        let john = sessions.attach(Identity::mock("john"));
        let mary = sessions.attach(Identity::mock("mary"));

        let seen_by_john = rooms
            .join_room(&"lounge".to_string(), john, Identity::mock("john"))
            .unwrap();
        assert!(seen_by_john.is_empty());

        let seen_by_mary = rooms
            .join_room(&"lounge".to_string(), mary, Identity::mock("mary"))
            .unwrap();
        assert_eq!(seen_by_mary.len(), 1);
        assert_eq!(seen_by_mary[0].connection, john);
    }

    #[test]
    fn joining_an_unknown_room_fails() {
        let (rooms, _events, sessions) = manager();
        let john = sessions.attach(Identity::mock("john"));

        let result = rooms.join_room(&"nowhere".to_string(), john, Identity::mock("john"));
        assert!(matches!(result, Err(GatewayError::NotFound(_))));
    }

    #[test]
    fn disconnect_cascade_frees_the_seat_and_announces_once() {
        let (rooms, events, sessions) = manager();

        rooms
            .create_room("stage".to_string(), RoomKind::Karaoke, Identity::mock("john"))
            .unwrap();

        let john = sessions.attach(Identity::mock("john"));
        let room_id = "stage".to_string();

        rooms.join_room(&room_id, john, Identity::mock("john")).unwrap();

        let room = rooms.room(&room_id).unwrap();
        room.join_seat(5, john, Identity::mock("john"));
        events.drain();

        rooms.handle_disconnect(john);

        let snapshot = room.seat_snapshot().unwrap();
        assert_eq!(snapshot[5].occupant, None);
        assert!(!sessions.contains(john));

        let left_announcements = events
            .drain()
            .into_iter()
            .filter(|(event, _)| matches!(event, Event::MemberLeft { .. }))
            .count();
        assert_eq!(left_announcements, 1);

        // A second disconnect for the same connection is a no-op
        rooms.handle_disconnect(john);
        assert!(events.drain().is_empty());
    }

    #[test]
    fn joining_a_second_room_leaves_the_first() {
        let (rooms, _events, sessions) = manager();

        rooms
            .create_room("one".to_string(), RoomKind::Voice, Identity::mock("john"))
            .unwrap();
        rooms
            .create_room("two".to_string(), RoomKind::Voice, Identity::mock("john"))
            .unwrap();

        let john = sessions.attach(Identity::mock("john"));

        rooms.join_room(&"one".to_string(), john, Identity::mock("john")).unwrap();
        rooms.join_room(&"two".to_string(), john, Identity::mock("john")).unwrap();

        assert!(rooms.member_connections(&"one".to_string()).is_empty());
        assert_eq!(rooms.member_connections(&"two".to_string()), vec![john]);
        assert_eq!(sessions.room(john), Some("two".to_string()));
    }

    #[test]
    fn owner_gating_for_seat_and_queue_administration() {
        let (rooms, events, _sessions) = manager();

        rooms
            .create_room("stage".to_string(), RoomKind::Karaoke, Identity::mock("john"))
            .unwrap();

        let room = rooms.room(&"stage".to_string()).unwrap();
        let mary = Identity::mock("mary");

        room.toggle_seat_lock(0, &mary);
        room.kick_seat(0, &mary);
        room.advance_queue(&mary);
        room.remove_song(0, &mary);
        room.move_song(0, 1, &mary);

        assert!(room.seat_snapshot().unwrap().iter().all(|s| !s.locked));
        assert!(events.drain().is_empty());
    }
}
