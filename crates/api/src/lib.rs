//! Coursehub real-time API server library.
//!
//! Exposes the core building blocks (config, state, error handling, routes,
//! WebSocket infrastructure, event routing) so integration tests and the
//! binary entrypoint can both access them.

pub mod auth;
pub mod config;
pub mod error;
pub mod realtime;
pub mod routes;
pub mod state;
pub mod ws;
