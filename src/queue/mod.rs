use std::collections::VecDeque;

use serde::Serialize;

use crate::{auth::Identity, util};

/// A requested song waiting in a room's queue.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SongEntry {
    pub title: String,
    pub artist: String,
    pub requested_by: Identity,
    pub requested_at: i64,
}

/// The queue and the currently playing song of a room, for late joiners.
#[derive(Debug, Clone, Serialize)]
pub struct QueueState {
    pub items: Vec<SongEntry>,
    pub current: Option<SongEntry>,
}

/// What changed as a result of a queue mutation, so the caller knows which
/// snapshots to broadcast.
#[derive(Debug, Clone, Copy)]
pub struct QueueChange {
    pub items: bool,
    pub current: bool,
}

/// Per-room song queue plus the "now playing" singleton. Insertion is FIFO
/// and open to every member; removal, reordering, and advancing are gated to
/// the room owner by the caller. Mutated only under the owning room's lock.
#[derive(Debug, Default)]
pub struct SongQueue {
    items: VecDeque<SongEntry>,
    current: Option<SongEntry>,
}

impl SongQueue {
    /// Appends a new request. Returns `None` for empty titles. When nothing
    /// is playing the request is promoted to current immediately.
    pub fn push(&mut self, title: String, artist: String, requested_by: Identity) -> Option<QueueChange> {
        if title.trim().is_empty() {
            return None;
        }

        self.items.push_back(SongEntry {
            title,
            artist,
            requested_by,
            requested_at: util::unix_millis(),
        });

        let promoted = self.current.is_none();

        if promoted {
            self.current = self.items.pop_front();
        }

        Some(QueueChange {
            items: true,
            current: promoted,
        })
    }

    /// Pops the head into current, or clears current when the queue is empty.
    pub fn advance(&mut self) {
        self.current = self.items.pop_front();
    }

    pub fn remove(&mut self, index: usize) -> bool {
        self.items.remove(index).is_some()
    }

    /// Relocates an entry, preserving the relative order of the rest.
    pub fn relocate(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }

        if let Some(entry) = self.items.remove(from) {
            self.items.insert(to, entry);
        }

        true
    }

    pub fn items(&self) -> Vec<SongEntry> {
        self.items.iter().cloned().collect()
    }

    pub fn current(&self) -> Option<SongEntry> {
        self.current.clone()
    }

    pub fn state(&self) -> QueueState {
        QueueState {
            items: self.items(),
            current: self.current(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::SongQueue;
    use crate::auth::Identity;

    fn titles(queue: &SongQueue) -> Vec<String> {
        queue.items().into_iter().map(|e| e.title).collect()
    }

    fn push(queue: &mut SongQueue, title: &str) {
        queue
            .push(title.to_string(), "unknown".to_string(), Identity::mock("john"))
            .expect("title is not empty");
    }

    #[test]
    fn first_request_starts_playing_immediately() {
        let mut queue = SongQueue::default();

        let change = queue
            .push("strawberries".to_string(), "fruits".to_string(), Identity::mock("john"))
            .unwrap();

        assert!(change.current);
        assert_eq!(queue.current().unwrap().title, "strawberries");
        assert!(queue.items().is_empty());
    }

    #[test]
    fn advance_round_trip() {
        let mut queue = SongQueue::default();

        push(&mut queue, "one");
        push(&mut queue, "two");
        push(&mut queue, "three");

        // "one" was auto-promoted, "two" and "three" wait in order
        assert_eq!(titles(&queue), vec!["two", "three"]);

        queue.advance();
        assert_eq!(queue.current().unwrap().title, "two");
        assert_eq!(titles(&queue), vec!["three"]);

        queue.advance();
        assert_eq!(queue.current().unwrap().title, "three");
        assert!(queue.items().is_empty());

        queue.advance();
        assert_eq!(queue.current(), None);
    }

    #[test]
    fn empty_titles_are_rejected() {
        let mut queue = SongQueue::default();

        assert!(queue
            .push("   ".to_string(), "fruits".to_string(), Identity::mock("john"))
            .is_none());

        assert!(queue.items().is_empty());
        assert_eq!(queue.current(), None);
    }

    #[test]
    fn relocate_preserves_relative_order() {
        let mut queue = SongQueue::default();

        push(&mut queue, "playing");
        push(&mut queue, "a");
        push(&mut queue, "b");
        push(&mut queue, "c");

        assert!(queue.relocate(0, 2));
        assert_eq!(titles(&queue), vec!["b", "c", "a"]);

        assert!(queue.remove(1));
        assert_eq!(titles(&queue), vec!["b", "a"]);
    }

    #[test]
    fn out_of_bounds_moves_are_ignored() {
        let mut queue = SongQueue::default();

        push(&mut queue, "playing");
        push(&mut queue, "a");

        assert!(!queue.relocate(0, 1_000));
        assert!(!queue.remove(5));
        assert_eq!(titles(&queue), vec!["a"]);
    }
}
