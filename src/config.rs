use crate::error::{Error, Result};
use crate::hash_table::HashTable;

/// Construction parameters of a [`HashTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConfig {
    /// Maximum number of keys per bucket.
    pub bucket_capacity: usize,
    /// Largest global depth the directory may grow to. Inserts that would
    /// need more address bits fail with [`Error::DepthExhaustion`].
    pub max_global_depth: u32,
}

impl TableConfig {
    pub const DEFAULT_CAPACITY: usize = 2;
    pub const DEFAULT_MAX_GLOBAL_DEPTH: u32 = 20;

    pub fn with_capacity(bucket_capacity: usize) -> Self {
        Self {
            bucket_capacity,
            ..Self::default()
        }
    }

    pub fn max_global_depth(self, max_global_depth: u32) -> Self {
        Self {
            max_global_depth,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket_capacity < HashTable::MIN_CAPACITY {
            return Err(Error::InvalidCapacity {
                capacity: self.bucket_capacity,
            });
        }
        if self.max_global_depth > HashTable::MAX_DEPTH_LIMIT {
            return Err(Error::InvalidDepthLimit {
                max_global_depth: self.max_global_depth,
                limit: HashTable::MAX_DEPTH_LIMIT,
            });
        }
        Ok(())
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: Self::DEFAULT_CAPACITY,
            max_global_depth: Self::DEFAULT_MAX_GLOBAL_DEPTH,
        }
    }
}
