//! Notification payloads and their audiences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tuntas_kilat_core::{
    ConversationId, EtaEstimate, OrderId, OrderStatus, Price, TrackingId, UserId, UserRole,
    WorkerId,
};

use crate::models::{ConversationMessage, Order};

/// Reply to a client `ping`.
pub const PONG: &str = r#"{"type":"pong"}"#;

/// Messages a WebSocket client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}

/// Event pushed to WebSocket clients, tagged by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    OrderCreated {
        order_id: OrderId,
        tracking_id: TrackingId,
        customer_id: UserId,
        total: Price,
        scheduled_at: DateTime<Utc>,
    },
    OrderStatusChanged {
        order_id: OrderId,
        tracking_id: TrackingId,
        from: OrderStatus,
        to: OrderStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        at: DateTime<Utc>,
    },
    OrderAssigned {
        order_id: OrderId,
        tracking_id: TrackingId,
        worker_id: WorkerId,
        worker_name: String,
    },
    WorkerLocation {
        order_id: OrderId,
        tracking_id: TrackingId,
        worker_id: WorkerId,
        lat: f64,
        lng: f64,
        distance_km: f64,
        eta_minutes: u32,
    },
    WorkerNearby {
        order_id: OrderId,
        tracking_id: TrackingId,
        worker_id: WorkerId,
        distance_km: f64,
    },
    ChatMessage {
        conversation_id: ConversationId,
        message: ConversationMessage,
    },
}

impl Notification {
    /// Wire name of the `type` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OrderCreated { .. } => "order_created",
            Self::OrderStatusChanged { .. } => "order_status_changed",
            Self::OrderAssigned { .. } => "order_assigned",
            Self::WorkerLocation { .. } => "worker_location",
            Self::WorkerNearby { .. } => "worker_nearby",
            Self::ChatMessage { .. } => "chat_message",
        }
    }

    #[must_use]
    pub fn order_created(order: &Order) -> Self {
        Self::OrderCreated {
            order_id: order.id,
            tracking_id: order.tracking_id.clone(),
            customer_id: order.customer_id,
            total: order.total,
            scheduled_at: order.scheduled_at,
        }
    }

    #[must_use]
    pub fn worker_location(
        order: &Order,
        worker_id: WorkerId,
        lat: f64,
        lng: f64,
        estimate: &EtaEstimate,
    ) -> Self {
        Self::WorkerLocation {
            order_id: order.id,
            tracking_id: order.tracking_id.clone(),
            worker_id,
            lat,
            lng,
            distance_km: estimate.distance_km,
            eta_minutes: estimate.whole_minutes(),
        }
    }
}

/// Who receives an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audience {
    pub users: Vec<UserId>,
    pub admins: bool,
}

impl Audience {
    /// Admins only.
    #[must_use]
    pub const fn admins() -> Self {
        Self {
            users: Vec::new(),
            admins: true,
        }
    }

    /// The given users plus admins.
    #[must_use]
    pub fn users_and_admins(users: impl IntoIterator<Item = UserId>) -> Self {
        let mut users: Vec<UserId> = users.into_iter().collect();
        users.sort_unstable();
        users.dedup();
        Self {
            users,
            admins: true,
        }
    }

    #[must_use]
    pub fn includes(&self, user: UserId, role: UserRole) -> bool {
        (self.admins && role == UserRole::Admin) || self.users.contains(&user)
    }
}

/// A notification with its routing metadata.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub audience: Audience,
    /// Order the event concerns, used by `?tracking_id=` subscriptions.
    pub tracking_id: Option<TrackingId>,
    pub notification: Notification,
}

impl Envelope {
    #[must_use]
    pub const fn new(audience: Audience, notification: Notification) -> Self {
        Self {
            audience,
            tracking_id: None,
            notification,
        }
    }

    /// Tag the envelope with the order it concerns.
    #[must_use]
    pub fn for_order(mut self, tracking_id: &TrackingId) -> Self {
        self.tracking_id = Some(tracking_id.clone());
        self
    }

    /// Whether a subscriber should receive this envelope.
    #[must_use]
    pub fn is_visible_to(
        &self,
        user: UserId,
        role: UserRole,
        tracking_filter: Option<&TrackingId>,
    ) -> bool {
        if !self.audience.includes(user, role) {
            return false;
        }
        match tracking_filter {
            Some(wanted) => self.tracking_id.as_ref() == Some(wanted),
            None => true,
        }
    }
}
