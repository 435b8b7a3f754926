//! Customer support conversation routes.

use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use tuntas_kilat_core::{ConversationId, OrderId, UserRole};

use crate::db::{ConversationRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::Actor;
use crate::models::{Conversation, ConversationMessage, User};
use crate::realtime::{Audience, Envelope, Notification};
use crate::state::AppState;

/// Longest accepted message body, in characters.
const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct OpenConversationRequest {
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub subject: String,
    /// Optional first message.
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct OpenedConversation {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<ConversationMessage>,
}

/// Open a conversation with support.
///
/// POST /api/conversations
///
/// # Errors
///
/// Returns 403 for non-customers, 404 if `order_id` is not the caller's
/// order and 400 for an oversized first message.
pub async fn open(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<OpenConversationRequest>,
) -> Result<(StatusCode, Json<OpenedConversation>)> {
    if actor.role != UserRole::Customer {
        return Err(AppError::Forbidden(
            "only customers open conversations".to_string(),
        ));
    }
    if let Some(order_id) = body.order_id {
        let owned = OrderRepository::new(state.pool())
            .get_by_id(order_id)
            .await?
            .is_some_and(|o| o.is_owned_by(actor.id));
        if !owned {
            return Err(AppError::NotFound(format!("order {order_id}")));
        }
    }
    let first = body
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(validate_body)
        .transpose()?;

    let repo = ConversationRepository::new(state.pool());
    let conversation = repo
        .create(actor.id, body.order_id, body.subject.trim())
        .await?;

    let mut messages = Vec::new();
    if let Some(text) = first {
        let message = repo
            .add_message(conversation.id, actor.id, actor.role, text)
            .await?;
        publish_message(&state, &conversation, &message);
        messages.push(message);
    }

    tracing::info!(conversation_id = %conversation.id, "Conversation opened");
    Ok((
        StatusCode::CREATED,
        Json(OpenedConversation {
            conversation,
            messages,
        }),
    ))
}

/// Conversations the caller can see: their own, or all for admins.
///
/// GET /api/conversations
///
/// # Errors
///
/// Returns 403 for workers.
pub async fn index(
    State(state): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<Vec<Conversation>>> {
    let scope = match actor.role {
        UserRole::Admin => None,
        UserRole::Customer => Some(actor.id),
        UserRole::Worker => {
            return Err(AppError::Forbidden(
                "workers have no support conversations".to_string(),
            ));
        }
    };
    let conversations = ConversationRepository::new(state.pool()).list(scope).await?;
    Ok(Json(conversations))
}

/// Message history, oldest first.
///
/// GET /api/conversations/{id}/messages
///
/// # Errors
///
/// Returns 404 if the conversation is unknown or not the caller's.
pub async fn messages(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ConversationId>,
) -> Result<Json<Vec<ConversationMessage>>> {
    let repo = ConversationRepository::new(state.pool());
    load_visible(&repo, &actor, id).await?;
    Ok(Json(repo.messages(id).await?))
}

/// Post a message to a conversation.
///
/// POST /api/conversations/{id}/messages
///
/// # Errors
///
/// Returns 400 for an empty or oversized body and 404 if the conversation
/// is unknown or not the caller's.
pub async fn post_message(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ConversationId>,
    Json(body): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<ConversationMessage>)> {
    let text = validate_body(body.body.trim())?;
    let repo = ConversationRepository::new(state.pool());
    let conversation = load_visible(&repo, &actor, id).await?;

    let message = repo.add_message(id, actor.id, actor.role, text).await?;
    publish_message(&state, &conversation, &message);
    Ok((StatusCode::CREATED, Json(message)))
}

async fn load_visible(
    repo: &ConversationRepository<'_>,
    actor: &User,
    id: ConversationId,
) -> Result<Conversation> {
    repo.get_by_id(id)
        .await?
        .filter(|c| can_access(actor, c))
        .ok_or_else(|| AppError::NotFound(format!("conversation {id}")))
}

fn can_access(actor: &User, conversation: &Conversation) -> bool {
    match actor.role {
        UserRole::Admin => true,
        UserRole::Customer => conversation.customer_id == actor.id,
        UserRole::Worker => false,
    }
}

fn validate_body(body: &str) -> Result<&str> {
    if body.is_empty() {
        return Err(AppError::BadRequest("message body is required".to_string()));
    }
    if body.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "message body is limited to {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(body)
}

fn publish_message(state: &AppState, conversation: &Conversation, message: &ConversationMessage) {
    state.events().publish(Envelope::new(
        Audience::users_and_admins([conversation.customer_id]),
        Notification::ChatMessage {
            conversation_id: conversation.id,
            message: message.clone(),
        },
    ));
}
