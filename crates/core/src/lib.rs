//! Tuntas Kilat Core - Shared domain types.
//!
//! This crate provides the types shared by every Tuntas Kilat component:
//! - `server` - REST + WebSocket booking backend
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. The order state machine, distance/ETA math, tracking IDs
//! and promotion rules all live here so they can be tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, status enums, order timeline, geo math, prices,
//!   promotions, tracking IDs, and phone numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
