use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{LogError, SegmentError};
use crate::record::Record;

use super::segment::Segment;
use super::store::Store;

struct State {
    segments: Vec<Segment>,
    active: usize,
}

/// An ordered collection of segments rooted at `dir`. Exactly one
/// segment — the last in `segments` — is active and receives appends;
/// the rest are retired and only readable. All mutable state sits
/// behind a single reader-writer lock: append/truncate/reset/close/
/// reader take the write side, read/lowest_offset/highest_offset take
/// the read side, matching the single-lock model described in the
/// module overview (no sub-component has a lock of its own).
pub struct Log {
    dir: PathBuf,
    config: Config,
    state: RwLock<State>,
}

impl Log {
    /// Opens (or creates) a log rooted at `dir`. An existing directory's
    /// `<base>.store`/`<base>.index` pairs are reopened as segments in
    /// ascending base-offset order; an empty or fresh directory gets a
    /// single segment seeded at `config.initial_offset()`.
    pub fn open(dir: impl Into<PathBuf>, config: Config) -> Result<Log, LogError> {
        let log = Log {
            dir: dir.into(),
            config,
            state: RwLock::new(State {
                segments: Vec::new(),
                active: 0,
            }),
        };
        log.setup()?;
        Ok(log)
    }

    fn setup(&self) -> Result<(), LogError> {
        fs::create_dir_all(&self.dir)?;

        let mut base_offsets = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| LogError::InvalidSegmentFile(path.clone()))?;
            let base_offset: u64 = stem
                .parse()
                .map_err(|_| LogError::InvalidSegmentFile(path.clone()))?;
            base_offsets.push(base_offset);
        }
        base_offsets.sort_unstable();
        base_offsets.dedup();

        let mut segments = Vec::with_capacity(base_offsets.len().max(1));
        for base_offset in base_offsets {
            tracing::debug!(base_offset, dir = %self.dir.display(), "reopening segment");
            segments.push(Segment::open(&self.dir, base_offset, self.config)?);
        }
        if segments.is_empty() {
            let base_offset = self.config.initial_offset();
            tracing::debug!(base_offset, dir = %self.dir.display(), "creating initial segment");
            segments.push(Segment::open(&self.dir, base_offset, self.config)?);
        }

        let active = segments.len() - 1;
        let mut state = self.state.write();
        state.segments = segments;
        state.active = active;
        Ok(())
    }

    /// Appends `record`, assigning it the log's next offset. Rolls to a
    /// fresh segment either proactively (the active segment is maxed
    /// right after a successful append) or reactively (the active
    /// segment rejected this append because it no longer fits under
    /// `max_store_bytes`, in which case the same record is retried once
    /// against the new segment).
    pub fn append(&self, record: Record) -> Result<u64, LogError> {
        let mut state = self.state.write();
        let active = state.active;

        match state.segments[active].append(record) {
            Ok(offset) => {
                if state.segments[active].is_maxed() {
                    let next_base = state.segments[active].next_offset();
                    self.roll(&mut state, next_base)?;
                }
                Ok(offset)
            }
            Err(SegmentError::StoreFull(record)) => {
                let next_base = state.segments[active].next_offset();
                self.roll(&mut state, next_base)?;
                let active = state.active;
                Ok(state.segments[active].append(*record)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn roll(&self, state: &mut State, base_offset: u64) -> Result<(), LogError> {
        tracing::debug!(base_offset, dir = %self.dir.display(), "rolling to new segment");
        let segment = Segment::open(&self.dir, base_offset, self.config)?;
        state.segments.push(segment);
        state.active = state.segments.len() - 1;
        Ok(())
    }

    /// Reads the record at `offset`. Fails with
    /// [`LogError::OffsetOutOfRange`] if no live segment covers it.
    pub fn read(&self, offset: u64) -> Result<Record, LogError> {
        let state = self.state.read();
        let segment = state
            .segments
            .iter()
            .find(|s| s.base_offset() <= offset && offset < s.next_offset())
            .ok_or(LogError::OffsetOutOfRange(offset))?;
        Ok(segment.read(offset)?)
    }

    /// The base offset of the oldest live segment.
    pub fn lowest_offset(&self) -> u64 {
        self.state.read().segments[0].base_offset()
    }

    /// One past the highest assigned offset, or 0 if nothing has ever
    /// been appended. This is indistinguishable from "a
    /// single record at offset 0" — callers needing to tell the two
    /// apart must also consult `lowest_offset`.
    pub fn highest_offset(&self) -> u64 {
        let state = self.state.read();
        let next = state.segments[state.active].next_offset();
        if next == 0 {
            0
        } else {
            next - 1
        }
    }

    /// Removes every segment whose last assigned offset is at or below
    /// `lowest_retained`, except the active segment, which is always
    /// kept even if it qualifies: a log must always have exactly one
    /// segment to receive the next append. Attempts to remove every
    /// other eligible segment even if an earlier one fails, surfacing
    /// the first error encountered.
    pub fn truncate(&self, lowest_retained: u64) -> Result<(), LogError> {
        tracing::debug!(lowest_retained, dir = %self.dir.display(), "truncating log");
        let mut state = self.state.write();
        let active_index = state.active;
        let segments = std::mem::take(&mut state.segments);

        let mut kept = Vec::with_capacity(segments.len());
        let mut first_err = None;
        for (i, segment) in segments.into_iter().enumerate() {
            let last_offset = segment.next_offset().saturating_sub(1);
            if last_offset <= lowest_retained && i != active_index {
                if let Err(err) = segment.remove() {
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            } else {
                kept.push(segment);
            }
        }

        // The active segment was never removed, so `kept` is never
        // empty and this index always lands on it.
        state.active = kept.len() - 1;
        state.segments = kept;

        match first_err {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Returns a reader over all current segments' stores concatenated
    /// in base-offset order, starting each at position 0. Snapshots the
    /// segment list's store handles under the write lock so a later
    /// truncate doesn't invalidate an in-flight reader.
    pub fn reader(&self) -> LogReader {
        let state = self.state.write();
        let stores = state.segments.iter().map(Segment::store_handle).collect();
        LogReader {
            stores,
            current: 0,
            position: 0,
        }
    }

    /// Closes every segment, in order. Best-effort: every segment is
    /// closed even if an earlier one errors, and the first error is
    /// returned.
    pub fn close(&self) -> Result<(), LogError> {
        let mut state = self.state.write();
        let mut first_err = None;
        for segment in state.segments.iter_mut() {
            if let Err(err) = segment.close() {
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Closes the log, then deletes its directory and every file in it.
    /// The log must not be used after this returns successfully.
    pub fn remove(&self) -> Result<(), LogError> {
        self.close()?;
        tracing::debug!(dir = %self.dir.display(), "removing log directory");
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    /// Removes the log, then reopens an empty one at the same directory
    /// and configuration.
    pub fn reset(&self) -> Result<(), LogError> {
        tracing::debug!(dir = %self.dir.display(), "resetting log");
        self.remove()?;
        self.setup()
    }
}

impl Drop for Log {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::warn!(error = %err, dir = %self.dir.display(), "error closing log on drop");
        }
    }
}

/// A concatenated, undecoded byte stream over every store file a log
/// held at the moment [`Log::reader`] was called, in base-offset order.
/// Used for bulk replication; it has no framing awareness of its own.
pub struct LogReader {
    stores: Vec<Arc<Store>>,
    current: usize,
    position: u64,
}

impl Read for LogReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let Some(store) = self.stores.get(self.current) else {
                return Ok(0);
            };
            let n = store.read_at(buf, self.position)?;
            if n == 0 {
                self.current += 1;
                self.position = 0;
                continue;
            }
            self.position += n as u64;
            return Ok(n);
        }
    }
}
