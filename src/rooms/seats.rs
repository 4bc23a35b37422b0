use serde::Serialize;

use crate::{auth::Identity, sessions::ConnectionId};

pub const SEAT_COUNT: usize = 16;

/// One microphone seat. Occupancy and the lock flag are independent: locking
/// an occupied seat keeps its occupant and only blocks future joins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Seat {
    occupant: Option<Occupant>,
    locked: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Occupant {
    pub connection: ConnectionId,
    pub identity: Identity,
}

/// The 16 microphone seats of a karaoke room. Mutation happens under the
/// owning room's lock; methods return whether state changed so the caller
/// knows to broadcast a fresh snapshot.
#[derive(Debug, Default)]
pub struct SeatBoard {
    seats: [Seat; SEAT_COUNT],
}

/// One seat as seen by clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeatSnapshot {
    pub index: usize,
    pub occupant: Option<Occupant>,
    pub locked: bool,
}

impl SeatBoard {
    /// Self-service join. Refused when the index is out of range, the seat is
    /// locked, or the seat is taken. On success any other seat held by the
    /// connection is vacated first.
    pub fn join(&mut self, index: usize, connection: ConnectionId, identity: Identity) -> bool {
        match self.seats.get(index) {
            Some(seat) if !seat.locked && seat.occupant.is_none() => {}
            _ => return false,
        }

        self.vacate(connection);
        self.seats[index].occupant = Some(Occupant {
            connection,
            identity,
        });

        true
    }

    /// Vacates the seat, but only for its current occupant.
    pub fn leave(&mut self, index: usize, connection: ConnectionId) -> bool {
        match self.seats.get_mut(index) {
            Some(seat) if seat.occupied_by(connection) => {
                seat.occupant = None;
                true
            }
            _ => false,
        }
    }

    /// Flips the lock flag regardless of occupancy.
    pub fn toggle_lock(&mut self, index: usize) -> bool {
        match self.seats.get_mut(index) {
            Some(seat) => {
                seat.locked = !seat.locked;
                true
            }
            None => false,
        }
    }

    /// Forcibly seats the target, displacing the previous occupant and
    /// vacating any other seat the target already holds. Bypasses the lock.
    pub fn assign(&mut self, index: usize, connection: ConnectionId, identity: Identity) -> bool {
        if index >= SEAT_COUNT {
            return false;
        }

        self.vacate(connection);
        self.seats[index].occupant = Some(Occupant {
            connection,
            identity,
        });

        true
    }

    /// Empties the seat regardless of who holds it.
    pub fn kick(&mut self, index: usize) -> bool {
        match self.seats.get_mut(index) {
            Some(seat) if seat.occupant.is_some() => {
                seat.occupant = None;
                true
            }
            _ => false,
        }
    }

    /// Vacates every seat held by the connection. Used on disconnect and
    /// when a connection moves between seats.
    pub fn vacate(&mut self, connection: ConnectionId) -> bool {
        let mut changed = false;

        for seat in self.seats.iter_mut() {
            if seat.occupied_by(connection) {
                seat.occupant = None;
                changed = true;
            }
        }

        changed
    }

    pub fn snapshot(&self) -> Vec<SeatSnapshot> {
        self.seats
            .iter()
            .enumerate()
            .map(|(index, seat)| SeatSnapshot {
                index,
                occupant: seat.occupant.clone(),
                locked: seat.locked,
            })
            .collect()
    }
}

impl Seat {
    fn occupied_by(&self, connection: ConnectionId) -> bool {
        self.occupant
            .as_ref()
            .map(|o| o.connection == connection)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::{SeatBoard, SEAT_COUNT};
    use crate::auth::Identity;

    #[test]
    fn only_one_occupant_per_seat() {
        let mut board = SeatBoard::default();

        assert!(board.join(3, 1, Identity::mock("john")));
        assert!(!board.join(3, 2, Identity::mock("mary")));

        let snapshot = board.snapshot();
        let occupant = snapshot[3].occupant.as_ref().unwrap();

        assert_eq!(occupant.connection, 1);
    }

    #[test]
    fn joining_another_seat_vacates_the_previous_one() {
        let mut board = SeatBoard::default();

        board.join(0, 1, Identity::mock("john"));
        assert!(board.join(5, 1, Identity::mock("john")));

        let snapshot = board.snapshot();
        assert_eq!(snapshot[0].occupant, None);
        assert_eq!(snapshot[5].occupant.as_ref().unwrap().connection, 1);
    }

    #[test]
    fn locked_seat_refuses_joins() {
        let mut board = SeatBoard::default();
        board.toggle_lock(7);

        let before = board.snapshot();
        assert!(!board.join(7, 1, Identity::mock("john")));
        assert_eq!(board.snapshot(), before);
    }

    #[test]
    fn lock_keeps_the_current_occupant() {
        let mut board = SeatBoard::default();

        board.join(2, 1, Identity::mock("john"));
        board.toggle_lock(2);

        let snapshot = board.snapshot();
        assert!(snapshot[2].locked);
        assert_eq!(snapshot[2].occupant.as_ref().unwrap().connection, 1);

        // The occupant can still leave on their own
        assert!(board.leave(2, 1));
    }

    #[test]
    fn leave_is_restricted_to_the_occupant() {
        let mut board = SeatBoard::default();

        board.join(4, 1, Identity::mock("john"));
        assert!(!board.leave(4, 2));
        assert!(board.snapshot()[4].occupant.is_some());
    }

    #[test]
    fn assign_displaces_and_bypasses_the_lock() {
        let mut board = SeatBoard::default();

        board.join(1, 1, Identity::mock("john"));
        board.join(6, 2, Identity::mock("mary"));
        board.toggle_lock(1);

        // Mary is forced into seat 1: John is displaced, her old seat empties
        assert!(board.assign(1, 2, Identity::mock("mary")));

        let snapshot = board.snapshot();
        assert_eq!(snapshot[1].occupant.as_ref().unwrap().connection, 2);
        assert_eq!(snapshot[6].occupant, None);
    }

    #[test]
    fn kick_only_changes_occupied_seats() {
        let mut board = SeatBoard::default();

        assert!(!board.kick(9));

        board.join(9, 1, Identity::mock("john"));
        assert!(board.kick(9));
        assert_eq!(board.snapshot()[9].occupant, None);
    }

    #[test]
    fn out_of_range_indices_are_ignored() {
        let mut board = SeatBoard::default();

        assert!(!board.join(SEAT_COUNT, 1, Identity::mock("john")));
        assert!(!board.toggle_lock(SEAT_COUNT));
        assert!(!board.kick(SEAT_COUNT));
        assert!(!board.leave(SEAT_COUNT, 1));
    }

    #[test]
    fn vacate_clears_every_held_seat() {
        let mut board = SeatBoard::default();

        board.join(0, 1, Identity::mock("john"));
        assert!(board.vacate(1));
        assert!(!board.vacate(1));
        assert!(board.snapshot().iter().all(|s| s.occupant.is_none()));
    }
}
