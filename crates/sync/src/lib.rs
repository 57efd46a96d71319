//! Popera sync runtime.
//!
//! This crate wires the consistency layer together:
//! - Configuration and telemetry bootstrap
//! - Read-only consumption of the auth identity stream
//! - The real-time subscription manager
//! - The local reactive event cache
//! - The [`SyncEngine`] context object with its `init()`/`dispose()` contract

pub mod auth;
pub mod cache;
pub mod config;
pub mod engine;
pub mod subscriptions;
pub mod telemetry;

pub use auth::{auth_channel, AuthController, AuthState, CurrentUser};
pub use cache::EventCache;
pub use config::Config;
pub use engine::SyncEngine;
pub use subscriptions::{SubscriptionKey, SubscriptionManager, Unsubscribe};
