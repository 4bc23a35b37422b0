use dashmap::DashMap;

use crate::{
    auth::Identity,
    rooms::RoomId,
    util::{IdType, ID_COUNTER},
};

pub type ConnectionId = IdType;

/// An authenticated connection and the room it currently occupies.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: Identity,
    pub room: Option<RoomId>,
}

/// Source of truth for which connections exist, who they are, and where they
/// are. Disconnect cleanup derives everything from this registry.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<ConnectionId, Session>,
}

impl SessionRegistry {
    /// Records a new session under a fresh connection id.
    pub fn attach(&self, identity: Identity) -> ConnectionId {
        let connection = ID_COUNTER.fetch_add(1);

        self.sessions.insert(
            connection,
            Session {
                identity,
                room: None,
            },
        );

        connection
    }

    pub fn identity(&self, connection: ConnectionId) -> Option<Identity> {
        self.sessions.get(&connection).map(|s| s.identity.clone())
    }

    pub fn room(&self, connection: ConnectionId) -> Option<RoomId> {
        self.sessions.get(&connection).and_then(|s| s.room.clone())
    }

    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.sessions.contains_key(&connection)
    }

    /// Updates the connection's current room pointer. A connection occupies
    /// at most one room at a time.
    pub fn set_room(&self, connection: ConnectionId, room: Option<RoomId>) {
        if let Some(mut session) = self.sessions.get_mut(&connection) {
            session.room = room;
        }
    }

    /// Removes the session, returning its last known room so the caller can
    /// cascade cleanup. Safe to call more than once.
    pub fn detach(&self, connection: ConnectionId) -> Option<RoomId> {
        self.sessions.remove(&connection).and_then(|(_, s)| s.room)
    }
}

#[cfg(test)]
mod test {
    use super::SessionRegistry;
    use crate::auth::Identity;

    #[test]
    fn attach_and_detach() {
        let registry = SessionRegistry::default();

        let connection = registry.attach(Identity::mock("john"));
        assert_eq!(registry.identity(connection), Some(Identity::mock("john")));
        assert_eq!(registry.room(connection), None);

        registry.set_room(connection, Some("lounge".to_string()));
        assert_eq!(registry.room(connection), Some("lounge".to_string()));

        assert_eq!(registry.detach(connection), Some("lounge".to_string()));
        assert!(!registry.contains(connection));

        // A second detach is a no-op
        assert_eq!(registry.detach(connection), None);
    }

    #[test]
    fn set_room_on_unknown_connection_is_ignored() {
        let registry = SessionRegistry::default();

        registry.set_room(42, Some("lounge".to_string()));
        assert!(!registry.contains(42));
    }
}
