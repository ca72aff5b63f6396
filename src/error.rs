use std::path::PathBuf;

use crate::record::{Record, RecordCodecError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store cannot hold another record of {0} bytes")]
    StoreFull(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index is full")]
    IndexFull,
    #[error("index entry {0} not found")]
    EntryNotFound(u32),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("segment path {0} is not a directory")]
    NotADirectory(PathBuf),

    /// The record doesn't fit in the segment's remaining store budget.
    /// Carries the record back so the log can roll to a new segment and
    /// retry the append without re-encoding.
    #[error("store full, record must be retried on a new segment")]
    StoreFull(Box<Record>),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Codec(#[from] RecordCodecError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("segment file {0} has an invalid base-offset name")]
    InvalidSegmentFile(PathBuf),

    #[error("requested offset {0} is out of range")]
    OffsetOutOfRange(u64),

    #[error(transparent)]
    ParseBaseOffset(#[from] std::num::ParseIntError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lets `LogReader` (a `std::io::Read` impl) propagate `Store::read_at`
/// failures without inventing a second error type for the replication
/// byte stream.
impl From<StoreError> for std::io::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(err) => err,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
