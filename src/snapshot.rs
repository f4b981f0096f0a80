use std::fmt;

use crate::bucket::{Bucket, BucketId};

/// Owned copy of one bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSnapshot {
    pub id: BucketId,
    pub local_depth: u32,
    /// Keys in ascending order.
    pub elements: Vec<i64>,
    pub capacity: usize,
}

impl From<&Bucket> for BucketSnapshot {
    fn from(bucket: &Bucket) -> Self {
        Self {
            id: bucket.id(),
            local_depth: bucket.local_depth(),
            elements: bucket.elements().collect(),
            capacity: bucket.capacity(),
        }
    }
}

/// Owned copy of the directory and all buckets, for rendering and for
/// comparing table states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    pub global_depth: u32,
    pub pointers: Vec<BucketId>,
    /// Buckets in creation order.
    pub buckets: Vec<BucketSnapshot>,
}

impl fmt::Display for TableSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "global depth {}", self.global_depth)?;
        let width: usize = self.global_depth.max(1) as usize;
        for (index, bucket) in self.pointers.iter().enumerate() {
            writeln!(f, "  {index:0width$b} -> bucket {bucket}")?;
        }
        for bucket in &self.buckets {
            let elements: Vec<String> = bucket.elements.iter().map(i64::to_string).collect();
            write!(
                f,
                "bucket {} (local depth {}): [{}] ({}/{})",
                bucket.id,
                bucket.local_depth,
                elements.join(", "),
                bucket.elements.len(),
                bucket.capacity
            )?;
            if bucket.elements.len() >= bucket.capacity {
                write!(f, " full")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
