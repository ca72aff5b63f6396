const DEFAULT_MAX_BYTES: u64 = 1024;

/// Tunables shared by every segment in a log.
///
/// A zero value for `max_store_bytes`/`max_index_bytes` defaults to
/// 1024. `initial_offset` only matters the first time a log is opened
/// against an empty directory: it seeds the base offset of the first
/// segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    max_store_bytes: u64,
    max_index_bytes: u64,
    initial_offset: u64,
}

impl Config {
    pub fn max_store_bytes(&self) -> u64 {
        self.max_store_bytes
    }

    pub fn max_index_bytes(&self) -> u64 {
        self.max_index_bytes
    }

    pub fn initial_offset(&self) -> u64 {
        self.initial_offset
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_store_bytes: DEFAULT_MAX_BYTES,
            max_index_bytes: DEFAULT_MAX_BYTES,
            initial_offset: 0,
        }
    }
}

pub struct ConfigBuilder {
    max_store_bytes: u64,
    max_index_bytes: u64,
    initial_offset: u64,
}

impl ConfigBuilder {
    pub fn new(max_store_bytes: u64, max_index_bytes: u64, initial_offset: u64) -> Self {
        Self {
            max_store_bytes,
            max_index_bytes,
            initial_offset,
        }
    }

    pub fn build(self) -> Config {
        Config {
            max_store_bytes: if self.max_store_bytes == 0 {
                DEFAULT_MAX_BYTES
            } else {
                self.max_store_bytes
            },
            max_index_bytes: if self.max_index_bytes == 0 {
                DEFAULT_MAX_BYTES
            } else {
                self.max_index_bytes
            },
            initial_offset: self.initial_offset,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_sizes_default_to_1024() {
        let config = ConfigBuilder::new(0, 0, 5).build();
        assert_eq!(config.max_store_bytes(), DEFAULT_MAX_BYTES);
        assert_eq!(config.max_index_bytes(), DEFAULT_MAX_BYTES);
        assert_eq!(config.initial_offset(), 5);
    }

    #[test]
    fn default_is_1024_1024_0() {
        let config = Config::default();
        assert_eq!(config.max_store_bytes(), 1024);
        assert_eq!(config.max_index_bytes(), 1024);
        assert_eq!(config.initial_offset(), 0);
    }
}
