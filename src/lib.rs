//! relayhub: relays every message a WebSocket client sends to all connected
//! clients. The binary wires these modules into an axum server; the hub and
//! connection layers are usable on their own with any transport.

pub mod api;
pub mod config;
pub mod connection;
pub mod hub;
pub mod message;
pub mod server;
pub mod state;
pub mod transport;
pub mod types;
pub mod ws;
