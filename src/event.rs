//! Change notifications for presentation layers.
//!
//! A [`HashTable`](crate::HashTable) buffers the events of an operation and
//! hands them to every subscribed [`Observer`] once the operation has
//! finished, so observers only ever see consistent state.

use crate::bucket::BucketId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableEvent {
    /// The table was reset to a single empty bucket.
    Initialized { capacity: usize },
    /// The directory doubled and now has depth `global_depth`.
    DirectoryDoubled { global_depth: u32 },
    BucketCreated { bucket: BucketId, local_depth: u32 },
    /// `bucket` gave up half of its slots to `sibling`; both now have
    /// `local_depth`.
    BucketSplit {
        bucket: BucketId,
        sibling: BucketId,
        local_depth: u32,
    },
    ElementAdded { bucket: BucketId, key: i64 },
    ElementRemoved { bucket: BucketId, key: i64 },
}

/// Receives [`TableEvent`]s.
///
/// Implemented for every `FnMut(&TableEvent) + Send` closure.
pub trait Observer: Send {
    fn notify(&mut self, event: &TableEvent);
}

impl<F> Observer for F
where
    F: FnMut(&TableEvent) + Send,
{
    fn notify(&mut self, event: &TableEvent) {
        self(event)
    }
}
