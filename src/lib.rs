//! ledis-engine: a Redis-protocol-compatible, disk-backed key-value engine.
//!
//! The module layout mirrors spec.md's component table: `persistence::aof`
//! (C1), `persistence::dump` (C2), `db` (C3), `transaction` (C4),
//! `expiration` (C5), `dispatch` (C6), `server::connection` (C7), and
//! `keyspace` (C8), layered on the pluggable `store` trait and the minimal
//! `codec`/`commands`/`protocol` collaborators described in SPEC_FULL.md §C.

pub mod codec;
pub mod commands;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod expiration;
pub mod keyspace;
pub mod persistence;
pub mod protocol;
pub mod server;
pub mod store;
pub mod transaction;

pub use config::{Config, DynamicConfig, StaticConfig};
pub use db::{DbBank, LogicalDb};
pub use dispatch::{CommandTable, Router};
pub use persistence::{Aof, AofConfig};
pub use protocol::{RespParser, RespSerializer, RespValue};
pub use server::RedisServer;
pub use store::mem::MemStore;
pub use store::ByteStore;
pub use transaction::TransactionContext;
