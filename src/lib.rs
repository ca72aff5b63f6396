//! A single-node, append-only commit log storage engine.
//!
//! Records are appended in strict sequence and assigned monotonically
//! increasing 64-bit offsets; readers address records by offset. The
//! engine is layered bottom-up:
//!
//! - [`log::store`] — a length-prefixed record heap on one file.
//! - [`log::index`] — a memory-mapped, fixed-width offset-to-position
//!   table.
//! - [`log::segment`] — one store paired with one index under a shared
//!   base offset.
//! - [`log::Log`] — an ordered, size-rolled collection of segments with
//!   append/read/truncate/reset semantics.
//!
//! This crate is the storage core only. An RPC facade, authorization,
//! cluster membership, and replication are the concerns of whatever
//! process embeds it.

pub mod config;
pub mod error;
pub mod log;
pub mod record;

pub use config::{Config, ConfigBuilder};
pub use error::{IndexError, LogError, SegmentError, StoreError};
pub use log::{Log, LogReader};
pub use record::Record;
