use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::SegmentError;
use crate::record::Record;

use super::index::Index;
use super::store::Store;

/// Pairs one store with one index under a shared base offset. The unit
/// of rollover: a segment is retired once it can't take another record
/// or another index entry, and a fresh one takes over as active.
///
/// The store is held behind an `Arc` so `Log::reader()` can hand out
/// clones that keep reading after the segment itself has been truncated
/// away — the file descriptor stays valid for as long as some `Arc`
/// keeps it alive, even after its path is unlinked.
pub struct Segment {
    store: Arc<Store>,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: Config,
}

impl Segment {
    pub fn open(dir: &Path, base_offset: u64, config: Config) -> Result<Segment, SegmentError> {
        if !dir.is_dir() {
            return Err(SegmentError::NotADirectory(dir.to_path_buf()));
        }

        let store = Arc::new(Store::open(dir.join(format!("{base_offset}.store")))?);
        let mut index = Index::open(
            dir.join(format!("{base_offset}.index")),
            config.max_index_bytes(),
        )?;

        let next_offset = match index.read(-1) {
            Ok((relative_offset, _)) => base_offset + relative_offset as u64 + 1,
            Err(_) => base_offset,
        };

        Ok(Segment {
            store,
            index,
            base_offset,
            next_offset,
            config,
        })
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// A clone of the segment's store handle, kept alive independently
    /// of the segment itself. Used by `Log::reader()` to snapshot a
    /// concatenated byte stream that survives later truncation.
    pub fn store_handle(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    /// Assigns `record.offset = next_offset`, appends it, and returns the
    /// assigned offset. Any offset already on `record` is overwritten:
    /// the engine, not the caller, owns offset assignment.
    pub fn append(&mut self, mut record: Record) -> Result<u64, SegmentError> {
        let assigned_offset = self.next_offset;
        record.offset = assigned_offset;

        let encoded = record.encode_to_vec()?;
        if !self
            .store
            .can_hold(encoded.len(), self.config.max_store_bytes())
        {
            return Err(SegmentError::StoreFull(Box::new(record)));
        }

        let (_, position) = self.store.append(&encoded)?;
        let relative_offset = (assigned_offset - self.base_offset) as u32;
        self.index.write(relative_offset, position)?;
        self.next_offset += 1;

        Ok(assigned_offset)
    }

    pub fn read(&self, offset: u64) -> Result<Record, SegmentError> {
        let relative_offset = (offset - self.base_offset) as i64;
        let (_, position) = self.index.read(relative_offset)?;
        let bytes = self.store.read(position)?;
        Ok(Record::decode_from_slice(&bytes)?)
    }

    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.max_store_bytes() || self.index.is_full()
    }

    pub fn close(&mut self) -> Result<(), SegmentError> {
        self.index.close()?;
        self.store.close()?;
        Ok(())
    }

    pub fn remove(mut self) -> Result<(), SegmentError> {
        self.close()?;
        std::fs::remove_file(self.store.path())?;
        std::fs::remove_file(self.index.path())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::ConfigBuilder;

    fn record(value: &str) -> Record {
        Record {
            value: value.as_bytes().to_vec(),
            offset: 0,
        }
    }

    #[test]
    fn append_assigns_offsets_and_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new(1024, (12 * 3) as u64, 0).build();
        let mut segment = Segment::open(dir.path(), 16, config).unwrap();

        assert_eq!(segment.next_offset(), 16);
        assert!(!segment.is_maxed());

        for i in 0..3 {
            let offset = segment.append(record("hello world")).unwrap();
            assert_eq!(16 + i, offset);
            let got = segment.read(offset).unwrap();
            assert_eq!(got.value, b"hello world");
            assert_eq!(got.offset, offset);
        }

        let err = segment.append(record("hello world")).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::Index(crate::error::IndexError::IndexFull)
        ));
        assert!(segment.is_maxed());
    }

    #[test]
    fn is_maxed_detects_store_exhaustion_and_remove_clears_state() {
        let dir = tempfile::tempdir().unwrap();
        let value = "hello world";
        let config = ConfigBuilder::new(1024, (12 * 3) as u64, 0).build();
        let mut segment = Segment::open(dir.path(), 16, config).unwrap();
        for _ in 0..3 {
            segment.append(record(value)).unwrap();
        }
        segment.close().unwrap();

        let small_store_config = ConfigBuilder::new((value.len() * 3) as u64, 1024, 0).build();
        let segment = Segment::open(dir.path(), 16, small_store_config).unwrap();
        assert!(segment.is_maxed());
        segment.remove().unwrap();

        let segment = Segment::open(dir.path(), 16, small_store_config).unwrap();
        assert!(!segment.is_maxed());
        segment.remove().unwrap();
    }

    #[test]
    fn append_overwrites_any_caller_supplied_offset() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new(1024, 1024, 100).build();
        let mut segment = Segment::open(dir.path(), 100, config).unwrap();

        let mut r = record("value");
        r.offset = 9999;
        let assigned = segment.append(r).unwrap();
        assert_eq!(assigned, 100);
        assert_eq!(segment.read(100).unwrap().offset, 100);
    }
}
