//! Append-only log (C1) and dump/snapshot codec (C2).

pub mod aof;
pub mod dump;

pub use aof::{Aof, AofConfig, Anchor, Frame, ReadOutcome, Record};
