//! Domain layer for the Popera consistency core.
//!
//! This crate contains:
//! - Entity models and the document mapper
//! - Pure aggregation services (attendance, rating, feed derivation)
//! - Ports for external collaborators (notifications, image storage)

pub mod document;
pub mod models;
pub mod services;
