//! Coursehub event system.
//!
//! This crate provides the building blocks for the platform's real-time
//! event flow:
//!
//! - [`DomainEvent`] — the canonical envelope for enrollment, progress,
//!   module-completion, and typing events.
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`wire`] — the JSON frame types exchanged between server and client.

pub mod bus;
pub mod event;
pub mod wire;

pub use bus::EventBus;
pub use event::{DomainEvent, EventKind};
pub use wire::{ClientFrame, ServerFrame};
