// Server module - TCP listener and per-connection handling

pub mod client_info;
pub mod connection;
pub mod listener;

pub use client_info::{ClientInfo, ClientRegistry};
pub use connection::Connection;
pub use listener::RedisServer;
