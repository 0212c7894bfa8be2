//! In-process publish/subscribe event fabric. Every state change in the
//! engine is emitted here; the [`Recorder`] is a built-in subscriber that
//! keeps a bounded ring of recent events for late joiners and diagnostics.

mod bus;
mod recorder;

pub use bus::{EventBus, Subscription};
pub use recorder::Recorder;
