//! Notification WebSocket.
//!
//! Clients connect to `/ws` (optionally `?tracking_id=TK-...` to follow one
//! order) and receive [`Notification`](crate::realtime::Notification)s as
//! JSON text frames. Sending `{"type":"ping"}` gets `{"type":"pong"}` back.

use std::pin::pin;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;

use tuntas_kilat_core::TrackingId;

use crate::error::Result;
use crate::extract::Query;
use crate::middleware::Actor;
use crate::models::User;
use crate::realtime::{ClientMessage, PONG, Subscription};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub tracking_id: Option<String>,
}

/// Upgrade to a notification stream for the caller.
///
/// GET /ws
///
/// # Errors
///
/// Returns 401 without a caller identity and 400 for a malformed
/// `tracking_id`.
pub async fn connect(
    Actor(actor): Actor,
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
    upgrade: WebSocketUpgrade,
) -> Result<Response> {
    let filter = query
        .tracking_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(TrackingId::parse)
        .transpose()?;

    let subscription = state.events().subscribe(actor.id, actor.role, filter);
    Ok(upgrade.on_upgrade(move |socket| serve(socket, actor, subscription)))
}

#[tracing::instrument(skip_all, fields(user_id = %actor.id, role = %actor.role))]
async fn serve(socket: WebSocket, actor: User, subscription: Subscription) {
    tracing::debug!("WebSocket connected");
    let (write, read) = socket.split();
    pump(write, read, subscription).await;
    tracing::debug!("WebSocket disconnected");
}

/// Shuttle frames between one client and its subscription until either side
/// goes away.
async fn pump<W, R, E>(write: W, read: R, mut subscription: Subscription)
where
    W: Sink<Message>,
    R: Stream<Item = std::result::Result<Message, E>>,
    E: std::fmt::Display,
{
    let mut write = pin!(write);
    let mut read = pin!(read);

    loop {
        tokio::select! {
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if matches!(
                            serde_json::from_str::<ClientMessage>(text.as_str()),
                            Ok(ClientMessage::Ping)
                        ) && write.send(Message::Text(PONG.into())).await.is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if write.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "WebSocket read failed");
                        break;
                    }
                }
            }
            envelope = subscription.next() => {
                let Some(envelope) = envelope else {
                    break;
                };
                let payload = match serde_json::to_string(&envelope.notification) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize notification");
                        continue;
                    }
                };
                if write.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = write.close().await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::convert::Infallible;
    use std::time::Duration;

    use axum::body::Bytes;
    use futures_util::{sink, stream};
    use serde_json::Value;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    use tuntas_kilat_core::{UserId, UserRole};

    use super::*;
    use crate::models::order::fixtures::pending_order;
    use crate::realtime::{Audience, Envelope, EventBroadcaster, Notification};

    /// In-memory stand-in for one connected socket.
    struct Client {
        outbound: mpsc::UnboundedSender<Message>,
        inbound: mpsc::UnboundedReceiver<Message>,
        task: JoinHandle<()>,
    }

    impl Client {
        fn connect(events: &EventBroadcaster, user: UserId, role: UserRole) -> Self {
            let (outbound, from_client) = mpsc::unbounded_channel::<Message>();
            let (to_client, inbound) = mpsc::unbounded_channel::<Message>();

            let read = stream::unfold(from_client, |mut rx| async move {
                rx.recv().await.map(|m| (Ok::<_, Infallible>(m), rx))
            });
            let write = sink::unfold(to_client, |tx, message: Message| async move {
                tx.send(message).map(|()| tx)
            });

            let subscription = events.subscribe(user, role, None);
            let task = tokio::spawn(pump(write, read, subscription));
            Self {
                outbound,
                inbound,
                task,
            }
        }

        async fn receive(&mut self) -> Message {
            tokio::time::timeout(Duration::from_secs(1), self.inbound.recv())
                .await
                .unwrap()
                .unwrap()
        }
    }

    fn created_for(customer: UserId) -> Envelope {
        let mut order = pending_order();
        order.customer_id = customer;
        Envelope::new(
            Audience::users_and_admins([customer]),
            Notification::order_created(&order),
        )
    }

    #[tokio::test]
    async fn test_text_ping_gets_pong() {
        let events = EventBroadcaster::new(8);
        let mut client = Client::connect(&events, UserId::new(1), UserRole::Customer);

        client
            .outbound
            .send(Message::Text(r#"{"type":"ping"}"#.into()))
            .unwrap();
        assert_eq!(client.receive().await, Message::Text(PONG.into()));
    }

    #[tokio::test]
    async fn test_ping_frame_gets_pong_frame() {
        let events = EventBroadcaster::new(8);
        let mut client = Client::connect(&events, UserId::new(1), UserRole::Customer);

        client
            .outbound
            .send(Message::Ping(Bytes::from_static(b"hi")))
            .unwrap();
        assert_eq!(
            client.receive().await,
            Message::Pong(Bytes::from_static(b"hi"))
        );
    }

    #[tokio::test]
    async fn test_forwards_only_visible_notifications() {
        let events = EventBroadcaster::new(8);
        let mut client = Client::connect(&events, UserId::new(1), UserRole::Customer);

        events.publish(created_for(UserId::new(2)));
        events.publish(created_for(UserId::new(1)));

        let Message::Text(text) = client.receive().await else {
            panic!("expected a text frame");
        };
        let json: Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(json["type"], "order_created");
        assert_eq!(json["customer_id"], 1);
    }

    #[tokio::test]
    async fn test_close_frame_ends_the_loop() {
        let events = EventBroadcaster::new(8);
        let client = Client::connect(&events, UserId::new(1), UserRole::Customer);
        assert_eq!(events.subscriber_count(), 1);

        client.outbound.send(Message::Close(None)).unwrap();
        tokio::time::timeout(Duration::from_secs(1), client.task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(events.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_client_hangup_ends_the_loop() {
        let events = EventBroadcaster::new(8);
        let Client { outbound, task, .. } =
            Client::connect(&events, UserId::new(1), UserRole::Admin);

        drop(outbound);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
