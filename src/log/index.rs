use byteorder::{BigEndian, ByteOrder};
use memmap2::MmapMut;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::IndexError;

/// Width in bytes of the `relative_offset` field of an index entry.
pub const OFFSET_WIDTH: u64 = 4;
/// Width in bytes of the `position` field of an index entry.
pub const POSITION_WIDTH: u64 = 8;
/// Width in bytes of one index entry.
pub const ENTRY_WIDTH: u64 = OFFSET_WIDTH + POSITION_WIDTH;

/// A memory-mapped, fixed-width `(relative_offset: u32 BE, position: u64
/// BE)` table. The backing file is pre-truncated to `max_index_bytes` at
/// open to give the mapping room to grow without remapping, and
/// truncated back down to `size` at close so a reopen doesn't pick up
/// the unwritten tail as fabricated entries.
pub struct Index {
    file: File,
    mmap: MmapMut,
    size: u64,
    path: PathBuf,
}

impl Index {
    pub fn open(path: PathBuf, max_index_bytes: u64) -> Result<Index, IndexError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let size = file.metadata()?.len();
        file.set_len(max_index_bytes)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Index {
            file,
            mmap,
            size,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_full(&self) -> bool {
        (self.mmap.len() as u64) < self.size + ENTRY_WIDTH
    }

    pub fn write(&mut self, relative_offset: u32, position: u64) -> Result<(), IndexError> {
        if self.is_full() {
            return Err(IndexError::IndexFull);
        }
        let start = self.size as usize;
        BigEndian::write_u32(
            &mut self.mmap[start..start + OFFSET_WIDTH as usize],
            relative_offset,
        );
        let pos_start = start + OFFSET_WIDTH as usize;
        BigEndian::write_u64(
            &mut self.mmap[pos_start..pos_start + POSITION_WIDTH as usize],
            position,
        );
        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Reads the entry at dense index `entry` (0-based); `-1` reads the
    /// last entry. Entries are packed densely in append order, so the
    /// entry index doubles as `relative_offset` and lookup is O(1).
    pub fn read(&self, entry: i64) -> Result<(u32, u64), IndexError> {
        if self.size == 0 {
            return Err(IndexError::EntryNotFound(0));
        }
        let entry = if entry == -1 {
            (self.size / ENTRY_WIDTH) - 1
        } else if entry < 0 {
            return Err(IndexError::EntryNotFound(0));
        } else {
            entry as u64
        };
        let start = entry * ENTRY_WIDTH;
        if start + ENTRY_WIDTH > self.size {
            return Err(IndexError::EntryNotFound(entry as u32));
        }
        let start = start as usize;
        let relative_offset =
            BigEndian::read_u32(&self.mmap[start..start + OFFSET_WIDTH as usize]);
        let pos_start = start + OFFSET_WIDTH as usize;
        let position =
            BigEndian::read_u64(&self.mmap[pos_start..pos_start + POSITION_WIDTH as usize]);
        Ok((relative_offset, position))
    }

    pub fn close(&mut self) -> Result<(), IndexError> {
        self.mmap.flush()?;
        self.file.sync_all()?;
        self.file.set_len(self.size)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn write_then_read_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = Index::open(dir.path().join("0.index"), 1024).unwrap();

        index.write(0, 10).unwrap();
        index.write(1, 20).unwrap();
        index.write(2, 30).unwrap();
        index.write(3, 40).unwrap();

        assert_eq!(index.read(1).unwrap(), (1, 20));
        assert_eq!(index.read(-1).unwrap(), (3, 40));
    }

    #[test]
    fn reopen_resumes_at_true_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.index");

        let mut index = Index::open(path.clone(), 1024).unwrap();
        index.write(0, 10).unwrap();
        index.write(1, 20).unwrap();
        let size_before_close = index.size();
        index.close().unwrap();
        drop(index);

        let file_len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(file_len, size_before_close);
        assert!(file_len < 1024);

        let mut index = Index::open(path, 1024).unwrap();
        assert_eq!(index.read(-1).unwrap(), (1, 20));
        index.write(2, 30).unwrap();
        assert_eq!(index.read(2).unwrap(), (2, 30));
    }

    #[test]
    fn out_of_range_reads_fail() {
        let dir = tempfile::tempdir().unwrap();
        let index = Index::open(dir.path().join("0.index"), 1024).unwrap();
        assert!(matches!(index.read(0), Err(IndexError::EntryNotFound(0))));
    }

    #[test]
    fn write_past_capacity_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = Index::open(dir.path().join("0.index"), ENTRY_WIDTH).unwrap();

        index.write(0, 10).unwrap();
        assert!(index.is_full());
        assert!(matches!(index.write(1, 20), Err(IndexError::IndexFull)));
    }
}
