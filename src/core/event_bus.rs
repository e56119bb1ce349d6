//! Pub/Sub event bus for host/extension communication.
//!
//! Topics are string names ("stream-announce", "frame-data", ...); handlers
//! subscribe per topic and are invoked synchronously in subscription order.
//! A handler may claim an emission ([`Handled::Claim`]) to consume it
//! exclusively: later subscribers for that emission are skipped and the
//! emitter learns the event was taken. Returning [`Handled::Pass`] leaves the
//! event visible to the remaining subscribers.
//!
//! Subscribing hands back a [`Subscription`] token; `unsubscribe` with it to
//! stop delivery.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use log::warn;

use crate::events::BusEvent;

/// Handler verdict for one emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Leave the event for the remaining subscribers.
    Pass,
    /// Consume the event exclusively; later subscribers are skipped.
    Claim,
}

type Callback = Arc<dyn Fn(&BusEvent) -> Handled + Send + Sync>;

/// Token identifying one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    topic: String,
    id: u64,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Topic-keyed pub/sub bus. Clones share the subscriber table.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<RwLock<HashMap<String, Vec<(u64, Callback)>>>>,
    next_id: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe `handler` to `topic`. Handlers run in subscription order,
    /// FIFO within the topic.
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: Fn(&BusEvent) -> Handled + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(topic.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription {
            topic: topic.to_string(),
            id,
        }
    }

    /// Remove one subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, sub: &Subscription) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        let Some(handlers) = subscribers.get_mut(&sub.topic) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != sub.id);
        let removed = handlers.len() != before;
        if !removed {
            warn!("Unsubscribe for '{}' found no handler", sub.topic);
        }
        removed
    }

    /// Emit an event to a topic's subscribers, stopping at the first claim.
    /// Returns the overall verdict so the emitter can run its own default
    /// handling when nobody claimed.
    pub fn emit(&self, topic: &str, event: &BusEvent) -> Handled {
        // Snapshot handlers so a handler may unsubscribe re-entrantly.
        let handlers: Vec<Callback> = {
            let subscribers = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            subscribers
                .get(topic)
                .map(|hs| hs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };

        for handler in handlers {
            if handler(event) == Handled::Claim {
                return Handled::Claim;
            }
        }
        Handled::Pass
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StreamAnnounce;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicI32;

    fn announce(id: &str) -> BusEvent {
        BusEvent::Announce(StreamAnnounce {
            id: id.to_string(),
            length: 1,
            rate: 0.0,
        })
    }

    #[test]
    fn emit_reaches_subscribers_in_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            bus.subscribe("t", move |_| {
                seen.lock().unwrap().push(tag);
                Handled::Pass
            });
        }

        assert_eq!(bus.emit("t", &announce("x")), Handled::Pass);
        assert_eq!(seen.lock().unwrap().as_slice(), &["first", "second"]);
    }

    #[test]
    fn claim_suppresses_later_subscribers() {
        let bus = EventBus::new();
        let later = Arc::new(AtomicI32::new(0));

        bus.subscribe("t", |_| Handled::Claim);
        {
            let later = Arc::clone(&later);
            bus.subscribe("t", move |_| {
                later.fetch_add(1, Ordering::SeqCst);
                Handled::Pass
            });
        }

        assert_eq!(bus.emit("t", &announce("x")), Handled::Claim);
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pass_does_not_suppress() {
        let bus = EventBus::new();
        let later = Arc::new(AtomicI32::new(0));

        bus.subscribe("t", |_| Handled::Pass);
        {
            let later = Arc::clone(&later);
            bus.subscribe("t", move |_| {
                later.fetch_add(1, Ordering::SeqCst);
                Handled::Pass
            });
        }

        bus.emit("t", &announce("x"));
        assert_eq!(later.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicI32::new(0));

        let sub = {
            let count = Arc::clone(&count);
            bus.subscribe("t", move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                Handled::Pass
            })
        };

        bus.emit("t", &announce("x"));
        assert!(bus.unsubscribe(&sub));
        bus.emit("t", &announce("x"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!bus.unsubscribe(&sub));
    }

    #[test]
    fn topics_are_isolated() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicI32::new(0));
        {
            let count = Arc::clone(&count);
            bus.subscribe("a", move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                Handled::Pass
            });
        }
        bus.emit("b", &announce("x"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscriber_count("a"), 1);
        assert_eq!(bus.subscriber_count("b"), 0);
    }
}
