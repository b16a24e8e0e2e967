//! Shared domain types for the coursehub real-time platform.
//!
//! This crate holds the building blocks every other workspace member
//! depends on: id and timestamp aliases, the domain error type, and the
//! well-known wire channel names.

pub mod channels;
pub mod error;
pub mod types;
