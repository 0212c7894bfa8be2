//! Bounded ring buffer of recent events, kept for late subscribers and
//! diagnostics. The event itself is never dropped from the ring on
//! publisher backpressure — only per-subscriber queues drop oldest.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::domain::Event;

pub struct Recorder {
    capacity: usize,
    ring: Mutex<VecDeque<Event>>,
}

impl Recorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ring: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
        }
    }

    pub fn record(&self, event: Event) {
        let mut ring = self.ring.lock().unwrap();
        if ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(event);
    }

    /// A point-in-time clone of the ring's current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        self.ring.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
