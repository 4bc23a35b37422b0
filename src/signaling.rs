use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::{
    auth::Identity,
    events::{Event, Events, Recipients},
    sessions::{ConnectionId, SessionRegistry},
};

/// Forwards WebRTC call-setup payloads between two connections. Carries no
/// state of its own: the session registry is consulted only to tag messages
/// with the sender's identity and to drop messages to dead targets. Payloads
/// are opaque and forwarded verbatim.
#[derive(Debug)]
pub struct SignalingRelay {
    events: Events,
    sessions: Arc<SessionRegistry>,
}

impl SignalingRelay {
    pub fn new(events: Events, sessions: Arc<SessionRegistry>) -> Arc<Self> {
        Arc::new(Self { events, sessions })
    }

    /// Relays an offer to the target connection, enabling it to construct a
    /// responder peer.
    pub fn offer(&self, from: ConnectionId, target: ConnectionId, payload: Value) {
        self.relay(from, target, |connection, identity| Event::IncomingOffer {
            connection,
            identity,
            payload,
        })
    }

    /// Relays an answer back to the connection that sent the offer.
    pub fn answer(&self, from: ConnectionId, caller: ConnectionId, payload: Value) {
        self.relay(from, caller, |connection, identity| Event::IncomingAnswer {
            connection,
            identity,
            payload,
        })
    }

    /// Delivery is best-effort: when the target no longer exists the message
    /// is dropped without surfacing an error to the sender.
    fn relay<F>(&self, from: ConnectionId, target: ConnectionId, make: F)
    where
        F: FnOnce(ConnectionId, Identity) -> Event,
    {
        let identity = match self.sessions.identity(from) {
            Some(identity) => identity,
            None => return,
        };

        if !self.sessions.contains(target) {
            debug!("Dropped signal from {} to unknown connection {}", from, target);
            return;
        }

        self.events.emit(make(from, identity), Recipients::Only(target));
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::SignalingRelay;
    use crate::{auth::Identity, events::Events, sessions::SessionRegistry};

    #[test]
    fn signals_to_disconnected_targets_are_dropped() {
        let events = Events::default();
        let sessions = Arc::new(SessionRegistry::default());
        let relay = SignalingRelay::new(events.clone(), sessions.clone());

        let john = sessions.attach(Identity::mock("john"));
        let mary = sessions.attach(Identity::mock("mary"));
        sessions.detach(mary);

        relay.offer(john, mary, serde_json::json!({ "sdp": "v=0" }));
        assert!(events.drain().is_empty());

        // And nothing is relayed for senders that are already gone
        sessions.detach(john);
        relay.answer(john, mary, serde_json::json!({ "sdp": "v=0" }));
        assert!(events.drain().is_empty());
    }

    #[test]
    fn offers_are_tagged_with_the_caller() {
        let events = Events::default();
        let sessions = Arc::new(SessionRegistry::default());
        let relay = SignalingRelay::new(events.clone(), sessions.clone());

        let john = sessions.attach(Identity::mock("john"));
        let mary = sessions.attach(Identity::mock("mary"));

        relay.offer(john, mary, serde_json::json!({ "sdp": "v=0" }));

        let pending = events.drain();
        assert_eq!(pending.len(), 1);

        match &pending[0].0 {
            crate::events::Event::IncomingOffer {
                connection,
                identity,
                ..
            } => {
                assert_eq!(*connection, john);
                assert_eq!(*identity, Identity::mock("john"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
