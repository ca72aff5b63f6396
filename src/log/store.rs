use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Number of bytes used to encode the length prefix of each frame.
pub const LEN_WIDTH: u64 = 8;

struct StoreInner {
    writer: BufWriter<File>,
    size: u64,
}

/// A growing flat file of `(len:u64 BE)(payload:len bytes)` frames.
///
/// Appends go through a buffered writer; any read (`read`/`read_at`)
/// flushes that writer first so buffered-but-unflushed bytes are always
/// visible. Writer state lives behind a mutex so every operation can
/// take `&self` — `Log::append` serializes appends under its own write
/// lock, but `Log::reader()` hands out `Arc<Store>` clones that must
/// keep working (via `read_at`) from readers holding only a shared lock.
pub struct Store {
    inner: Mutex<StoreInner>,
    reader: File,
    path: PathBuf,
}

impl Store {
    pub fn open(path: PathBuf) -> Result<Store, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .append(true)
            .open(&path)?;
        let size = file.metadata()?.len();
        let reader = file.try_clone()?;
        Ok(Store {
            inner: Mutex::new(StoreInner {
                writer: BufWriter::new(file),
                size,
            }),
            reader,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Whether a record encoded to `record_len` bytes still fits under
    /// `max_store_bytes`, accounting for its length prefix.
    pub fn can_hold(&self, record_len: usize, max_store_bytes: u64) -> bool {
        self.inner.lock().size + LEN_WIDTH + record_len as u64 < max_store_bytes
    }

    pub fn append(&self, value: &[u8]) -> Result<(u64, u64), StoreError> {
        let mut inner = self.inner.lock();
        let position = inner.size;
        inner.writer.write_u64::<BigEndian>(value.len() as u64)?;
        inner.writer.write_all(value)?;
        let written = LEN_WIDTH + value.len() as u64;
        inner.size += written;
        Ok((written, position))
    }

    pub fn read(&self, position: u64) -> Result<Vec<u8>, StoreError> {
        self.inner.lock().writer.flush()?;
        let mut len_buf = [0u8; LEN_WIDTH as usize];
        self.reader.read_exact_at(&mut len_buf, position)?;
        let len = BigEndian::read_u64(&len_buf);
        let mut buf = vec![0u8; len as usize];
        self.reader
            .read_exact_at(&mut buf, position + LEN_WIDTH)?;
        Ok(buf)
    }

    /// Raw positional read with no framing awareness, used for bulk
    /// replication streaming via `Log::reader`.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, StoreError> {
        self.inner.lock().writer.flush()?;
        Ok(self.reader.read_at(buf, offset)?)
    }

    pub fn close(&self) -> Result<(), StoreError> {
        self.inner.lock().writer.flush()?;
        Ok(())
    }
}
