use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{
    auth::Identity,
    events::{Event, Events, Recipients},
    queue::{QueueState, SongQueue},
    sessions::ConnectionId,
    util,
};

use super::{SeatBoard, SeatSnapshot};

pub type RoomId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Voice,
    Karaoke,
}

impl RoomKind {
    /// Only karaoke rooms carry seats and a song queue.
    pub fn has_seats(&self) -> bool {
        matches!(self, Self::Karaoke)
    }
}

/// A member as seen by other clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Member {
    pub connection: ConnectionId,
    pub identity: Identity,
}

/// Room metadata, the part that outlives membership.
#[derive(Debug, Clone, Serialize)]
pub struct RoomData {
    pub id: RoomId,
    pub kind: RoomKind,
    pub owner: Identity,
    pub created_at: i64,
}

/// A lobby listing entry. The member count is computed live.
#[derive(Debug, Clone, Serialize)]
pub struct RoomListing {
    pub id: RoomId,
    pub kind: RoomKind,
    pub owner: Identity,
    pub member_count: usize,
}

/// A named, independently synchronized session: metadata plus membership,
/// and for karaoke rooms the seat board and song queue. Each unit of mutable
/// state sits behind its own lock, and every operation performs its whole
/// read-modify-write inside one acquisition.
#[derive(Debug)]
pub struct Room {
    events: Events,

    pub id: RoomId,
    pub kind: RoomKind,
    pub owner: Identity,
    pub created_at: i64,

    members: Mutex<Vec<Member>>,
    seats: Mutex<SeatBoard>,
    queue: Mutex<SongQueue>,
}

impl Room {
    pub fn new(events: Events, id: RoomId, kind: RoomKind, owner: Identity) -> Self {
        Self {
            events,
            id,
            kind,
            owner,
            created_at: util::unix_millis(),
            members: Default::default(),
            seats: Default::default(),
            queue: Default::default(),
        }
    }

    pub fn data(&self) -> RoomData {
        RoomData {
            id: self.id.clone(),
            kind: self.kind,
            owner: self.owner.clone(),
            created_at: self.created_at,
        }
    }

    pub fn listing(&self) -> RoomListing {
        RoomListing {
            id: self.id.clone(),
            kind: self.kind,
            owner: self.owner.clone(),
            member_count: self.members.lock().len(),
        }
    }

    fn is_owner(&self, identity: &Identity) -> bool {
        self.owner.id == identity.id
    }

    /// Adds the connection to membership, returning the members that were
    /// already present in insertion order. The caller announces the join.
    pub fn add_member(&self, connection: ConnectionId, identity: Identity) -> Vec<Member> {
        let mut members = self.members.lock();

        members.retain(|m| m.connection != connection);
        let existing = members.clone();

        members.push(Member {
            connection,
            identity,
        });

        existing
    }

    /// Removes the connection from membership. Idempotent; reports whether
    /// anything was removed so the caller announces the leave exactly once.
    pub fn remove_member(&self, connection: ConnectionId) -> bool {
        let mut members = self.members.lock();
        let count = members.len();

        members.retain(|m| m.connection != connection);
        members.len() != count
    }

    /// Read at event delivery time by the fan-out.
    pub fn member_connections(&self) -> Vec<ConnectionId> {
        self.members.lock().iter().map(|m| m.connection).collect()
    }

    /// Self-service seat join. Silent no-op when out of range, locked, or
    /// taken.
    pub fn join_seat(&self, index: usize, connection: ConnectionId, identity: Identity) {
        if !self.kind.has_seats() {
            return;
        }

        let snapshot = {
            let mut seats = self.seats.lock();
            seats.join(index, connection, identity).then(|| seats.snapshot())
        };

        if let Some(seats) = snapshot {
            self.broadcast_seats(seats);
        }
    }

    /// Vacates the seat, but only for its current occupant.
    pub fn leave_seat(&self, index: usize, connection: ConnectionId) {
        if !self.kind.has_seats() {
            return;
        }

        let snapshot = {
            let mut seats = self.seats.lock();
            seats.leave(index, connection).then(|| seats.snapshot())
        };

        if let Some(seats) = snapshot {
            self.broadcast_seats(seats);
        }
    }

    /// Owner action: flips the seat's lock flag regardless of occupancy.
    pub fn toggle_seat_lock(&self, index: usize, requester: &Identity) {
        if !self.kind.has_seats() || !self.is_owner(requester) {
            return;
        }

        let snapshot = {
            let mut seats = self.seats.lock();
            seats.toggle_lock(index).then(|| seats.snapshot())
        };

        if let Some(seats) = snapshot {
            self.broadcast_seats(seats);
        }
    }

    /// Owner action: forcibly seats the target, displacing whoever held the
    /// seat and vacating the target's other seat if it had one.
    pub fn assign_seat(
        &self,
        index: usize,
        target: ConnectionId,
        target_identity: Identity,
        requester: &Identity,
    ) {
        if !self.kind.has_seats() || !self.is_owner(requester) {
            return;
        }

        let snapshot = {
            let mut seats = self.seats.lock();
            seats.assign(index, target, target_identity).then(|| seats.snapshot())
        };

        if let Some(seats) = snapshot {
            self.broadcast_seats(seats);
        }
    }

    /// Owner action: empties the seat regardless of who holds it.
    pub fn kick_seat(&self, index: usize, requester: &Identity) {
        if !self.kind.has_seats() || !self.is_owner(requester) {
            return;
        }

        let snapshot = {
            let mut seats = self.seats.lock();
            seats.kick(index).then(|| seats.snapshot())
        };

        if let Some(seats) = snapshot {
            self.broadcast_seats(seats);
        }
    }

    /// Disconnect cascade: vacates every seat the connection held.
    pub fn release_seats_for(&self, connection: ConnectionId) {
        if !self.kind.has_seats() {
            return;
        }

        let snapshot = {
            let mut seats = self.seats.lock();
            seats.vacate(connection).then(|| seats.snapshot())
        };

        if let Some(seats) = snapshot {
            self.broadcast_seats(seats);
        }
    }

    pub fn seat_snapshot(&self) -> Option<Vec<SeatSnapshot>> {
        self.kind.has_seats().then(|| self.seats.lock().snapshot())
    }

    /// Open to every member. Rejects empty titles; when nothing is playing
    /// the new request starts immediately.
    pub fn add_song(&self, title: String, artist: String, requester: Identity) {
        if !self.kind.has_seats() {
            return;
        }

        let update = {
            let mut queue = self.queue.lock();
            queue
                .push(title, artist, requester)
                .map(|change| (change, queue.items(), queue.current()))
        };

        if let Some((change, items, current)) = update {
            if change.items {
                self.events
                    .emit(Event::QueueUpdate { items }, Recipients::Room(self.id.clone()));
            }

            if change.current {
                self.events.emit(
                    Event::CurrentSongUpdate { current },
                    Recipients::Room(self.id.clone()),
                );
            }
        }
    }

    /// Owner action: skips to the next song.
    pub fn advance_queue(&self, requester: &Identity) {
        if !self.kind.has_seats() || !self.is_owner(requester) {
            return;
        }

        let (items, current) = {
            let mut queue = self.queue.lock();
            queue.advance();
            (queue.items(), queue.current())
        };

        self.events
            .emit(Event::QueueUpdate { items }, Recipients::Room(self.id.clone()));
        self.events.emit(
            Event::CurrentSongUpdate { current },
            Recipients::Room(self.id.clone()),
        );
    }

    /// Owner action: removes the entry at the given position.
    pub fn remove_song(&self, index: usize, requester: &Identity) {
        if !self.kind.has_seats() || !self.is_owner(requester) {
            return;
        }

        let items = {
            let mut queue = self.queue.lock();
            queue.remove(index).then(|| queue.items())
        };

        if let Some(items) = items {
            self.events
                .emit(Event::QueueUpdate { items }, Recipients::Room(self.id.clone()));
        }
    }

    /// Owner action: relocates an entry, preserving the order of the rest.
    pub fn move_song(&self, from: usize, to: usize, requester: &Identity) {
        if !self.kind.has_seats() || !self.is_owner(requester) {
            return;
        }

        let items = {
            let mut queue = self.queue.lock();
            queue.relocate(from, to).then(|| queue.items())
        };

        if let Some(items) = items {
            self.events
                .emit(Event::QueueUpdate { items }, Recipients::Room(self.id.clone()));
        }
    }

    pub fn queue_state(&self) -> Option<QueueState> {
        self.kind.has_seats().then(|| self.queue.lock().state())
    }

    fn broadcast_seats(&self, seats: Vec<SeatSnapshot>) {
        self.events
            .emit(Event::SeatsUpdate { seats }, Recipients::Room(self.id.clone()));
    }
}
