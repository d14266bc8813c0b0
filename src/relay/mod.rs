//! Real-time message relay module.
//!
//! Accepts WebSocket connections, keeps a bounded shared history of recent
//! messages, and pushes the full updated history to every open connection
//! whenever a new message is appended. Disconnects and malformed payloads
//! only ever affect the connection they happened on.

pub mod protocol;
pub mod server;
pub mod state;
pub mod websocket;

pub use server::{start, RelayHandle};
pub use state::RelayState;
