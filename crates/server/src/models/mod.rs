//! Domain models.
//!
//! Rows map straight onto these structs via `sqlx::FromRow`; the same structs
//! serialize as the JSON bodies returned by the API.

pub mod conversation;
pub mod dashboard;
pub mod order;
pub mod promotion;
pub mod service;
pub mod user;
pub mod worker;

pub use conversation::{Conversation, ConversationMessage};
pub use dashboard::{AvailabilityCount, DashboardStats, StatusCount};
pub use order::Order;
pub use promotion::Promotion;
pub use service::Service;
pub use user::User;
pub use worker::{Worker, WorkerProfile};
