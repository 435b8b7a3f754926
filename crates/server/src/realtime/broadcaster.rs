//! In-process broadcast channel for notifications.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use tuntas_kilat_core::{TrackingId, UserId, UserRole};

use super::events::Envelope;

/// Fans envelopes out to every open subscription.
///
/// Cloning shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<Arc<Envelope>>,
}

impl EventBroadcaster {
    /// Create a broadcaster buffering up to `capacity` envelopes per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or above `usize::MAX / 2`; configuration
    /// only accepts 1 to 65 536.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an envelope. Returns how many subscriptions received it.
    pub fn publish(&self, envelope: Envelope) -> usize {
        let kind = envelope.notification.kind();
        match self.tx.send(Arc::new(envelope)) {
            Ok(receivers) => {
                tracing::debug!(kind, receivers, "Notification published");
                receivers
            }
            Err(_) => {
                tracing::trace!(kind, "Notification dropped, no subscribers");
                0
            }
        }
    }

    /// Open a filtered subscription for one connected user.
    #[must_use]
    pub fn subscribe(
        &self,
        user: UserId,
        role: UserRole,
        tracking_filter: Option<TrackingId>,
    ) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            user,
            role,
            tracking_filter,
        }
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One user's view of the notification stream.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<Arc<Envelope>>,
    user: UserId,
    role: UserRole,
    tracking_filter: Option<TrackingId>,
}

impl Subscription {
    /// Wait for the next envelope this user may see.
    ///
    /// Returns `None` once the broadcaster is gone.
    pub async fn next(&mut self) -> Option<Arc<Envelope>> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => {
                    if envelope.is_visible_to(self.user, self.role, self.tracking_filter.as_ref())
                    {
                        return Some(envelope);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %self.user, skipped, "Subscriber lagged, events skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::order::fixtures::pending_order;
    use crate::realtime::{Audience, Notification};

    fn created_for(customer: UserId) -> Envelope {
        let mut order = pending_order();
        order.customer_id = customer;
        Envelope::new(
            Audience::users_and_admins([customer]),
            Notification::order_created(&order),
        )
        .for_order(&order.tracking_id)
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broadcaster = EventBroadcaster::new(8);
        assert_eq!(broadcaster.publish(created_for(UserId::new(1))), 0);
    }

    #[tokio::test]
    async fn test_subscription_filters_by_audience() {
        let broadcaster = EventBroadcaster::new(8);
        let mut customer = broadcaster.subscribe(UserId::new(1), UserRole::Customer, None);
        let mut admin = broadcaster.subscribe(UserId::new(50), UserRole::Admin, None);

        broadcaster.publish(created_for(UserId::new(2)));
        broadcaster.publish(created_for(UserId::new(1)));

        let first = admin.next().await.unwrap();
        assert!(matches!(
            first.notification,
            Notification::OrderCreated { customer_id, .. } if customer_id == UserId::new(2)
        ));
        let second = admin.next().await.unwrap();
        assert!(second.audience.users.contains(&UserId::new(1)));

        let mine = customer.next().await.unwrap();
        assert_eq!(mine.audience.users, vec![UserId::new(1)]);
    }

    #[tokio::test]
    async fn test_subscription_survives_lag() {
        let broadcaster = EventBroadcaster::new(2);
        let mut sub = broadcaster.subscribe(UserId::new(1), UserRole::Customer, None);

        for _ in 0..5 {
            broadcaster.publish(created_for(UserId::new(1)));
        }

        let got = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap();
        assert!(got.is_some());
    }

    #[tokio::test]
    async fn test_subscription_ends_when_broadcaster_dropped() {
        let broadcaster = EventBroadcaster::new(4);
        let mut sub = broadcaster.subscribe(UserId::new(1), UserRole::Customer, None);
        assert_eq!(broadcaster.subscriber_count(), 1);
        drop(broadcaster);
        assert!(sub.next().await.is_none());
    }
}
