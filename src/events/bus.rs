//! The publish/subscribe bus itself.
//!
//! Generalizes this codebase's existing `EventHandler` async-trait idiom
//! (two fixed listener methods) into open dotted-namespace event types with
//! exact-string or `prefix.*`-wildcard subscriptions.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::domain::Event;

use super::Recorder;

enum Filter {
    Exact(String),
    Prefix(String),
}

impl Filter {
    fn matches(&self, event_type: &str) -> bool {
        match self {
            Filter::Exact(expected) => expected == event_type,
            Filter::Prefix(prefix) => event_type.starts_with(prefix.as_str()),
        }
    }

    fn parse(filter: &str) -> Self {
        match filter.strip_suffix(".*") {
            Some(prefix) => Filter::Prefix(format!("{prefix}.")),
            None => Filter::Exact(filter.to_string()),
        }
    }
}

/// A bounded, drop-oldest, notify-driven queue shared between the bus
/// (producer) and one subscriber (consumer).
struct BoundedQueue {
    capacity: usize,
    items: Mutex<VecDeque<Event>>,
    notify: tokio::sync::Notify,
    dropped: AtomicU64,
}

impl BoundedQueue {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            notify: tokio::sync::Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    fn push(&self, event: Event) {
        let mut items = self.items.lock().unwrap();
        if items.len() >= self.capacity {
            items.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        items.push_back(event);
        drop(items);
        self.notify.notify_one();
    }

    async fn recv(&self) -> Event {
        loop {
            if let Some(event) = self.items.lock().unwrap().pop_front() {
                return event;
            }
            self.notify.notified().await;
        }
    }
}

/// A live handle to one subscription's event feed.
pub struct Subscription {
    pub id: Uuid,
    queue: Arc<BoundedQueue>,
}

impl Subscription {
    /// Wait for the next event matching this subscription's filter.
    /// Never returns `None` — the bus outlives every subscription it hands
    /// out; callers drop the `Subscription` itself to stop listening.
    pub async fn recv(&self) -> Event {
        self.queue.recv().await
    }

    /// How many events this subscription's queue has dropped under
    /// backpressure. Surfaced for diagnostics, not acted on internally.
    pub fn dropped_count(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }
}

struct Entry {
    filter: Filter,
    queue: Arc<BoundedQueue>,
}

struct Inner {
    subscriptions: Mutex<Vec<Entry>>,
    recorder: Recorder,
    subscriber_queue_capacity: usize,
}

/// Cheaply-cloneable handle to the event bus. Every component holds a
/// clone; publishing from any of them fans out to the same subscriber set.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    pub fn new(ring_capacity: usize, subscriber_queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                subscriptions: Mutex::new(Vec::new()),
                recorder: Recorder::new(ring_capacity),
                subscriber_queue_capacity,
            }),
        }
    }

    /// Subscribe to an exact event type (`"channel.created"`) or a
    /// `prefix.*` wildcard (`"negotiation.*"`).
    pub fn subscribe(&self, filter: &str) -> Subscription {
        let queue = Arc::new(BoundedQueue::new(self.inner.subscriber_queue_capacity));
        let entry = Entry {
            filter: Filter::parse(filter),
            queue: queue.clone(),
        };
        self.inner.subscriptions.lock().unwrap().push(entry);
        Subscription {
            id: Uuid::new_v4(),
            queue,
        }
    }

    /// Publish an event to the recorder and every matching subscriber.
    /// A slow or dead subscriber never blocks the publisher or other
    /// subscribers — queues are bounded and drop oldest on overflow.
    pub fn publish(&self, event: Event) {
        self.inner.recorder.record(event.clone());
        let subscriptions = self.inner.subscriptions.lock().unwrap();
        for entry in subscriptions.iter() {
            if entry.filter.matches(&event.event_type) {
                entry.queue.push(event.clone());
            }
        }
    }

    /// Fire-and-forget publish for synchronous call sites, mirroring this
    /// codebase's `emit`/`emit_sync` split: spawns a detached task rather
    /// than requiring the caller to `.await`.
    pub fn publish_sync(&self, event: Event) {
        let bus = self.clone();
        tokio::spawn(async move {
            bus.publish(event);
        });
    }

    pub fn recorder(&self) -> &Recorder {
        &self.inner.recorder
    }
}
