//! Shared utilities for the Popera consistency layer.
//!
//! This crate provides common functionality used across all other crates:
//! - Field-level validation helpers
//! - The write-payload sanitizer and document size ceiling

pub mod sanitize;
pub mod validation;
