//! Multi-room TCP line chat.
//!
//! A server that relays newline-delimited text messages among clients joined
//! to the same named room, and a terminal client to talk to it.

pub mod client;
pub mod conn;
pub mod logger;
pub mod protocol;
pub mod registry;
pub mod rooms;
pub mod server;
