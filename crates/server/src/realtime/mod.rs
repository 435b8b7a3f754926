//! Real-time notification fan-out.
//!
//! Services publish [`Envelope`]s to the [`EventBroadcaster`]; every open
//! WebSocket holds a [`Subscription`] that filters the shared stream down to
//! what its user may see. Delivery is best-effort: a subscriber that falls
//! behind skips the events it missed.

mod broadcaster;
mod events;

pub use broadcaster::{EventBroadcaster, Subscription};
pub use events::{Audience, ClientMessage, Envelope, Notification, PONG};
