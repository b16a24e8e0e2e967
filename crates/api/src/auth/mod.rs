//! Authentication primitives for the WebSocket handshake.
//!
//! The CRUD/auth service issues the tokens; this module only validates
//! them when a browser connects.

pub mod jwt;
