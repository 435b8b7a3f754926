//! Customer support conversations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tuntas_kilat_core::{ConversationId, MessageId, OrderId, UserId, UserRole};

/// A support thread opened by a customer, optionally about one order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: ConversationId,
    pub customer_id: UserId,
    pub order_id: Option<OrderId>,
    pub subject: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One message in a [`Conversation`].
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConversationMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub sender_role: UserRole,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let message = ConversationMessage {
            id: MessageId::new(1),
            conversation_id: ConversationId::new(3),
            sender_id: UserId::new(9),
            sender_role: UserRole::Admin,
            body: "Pesanan Anda sedang kami proses".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&message).expect("serialize");
        assert!(json.contains("\"sender_role\":\"admin\""));
        assert!(json.contains("\"conversation_id\":3"));
    }
}
