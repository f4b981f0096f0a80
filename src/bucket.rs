use std::collections::BTreeSet;
use std::fmt;

/// Opaque handle of a bucket.
///
/// Handles are assigned in creation order starting at zero and are never
/// recycled while the table lives, so they double as indices into the
/// [`BucketStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketId(pub(crate) usize);

impl BucketId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Fixed capacity container of keys, the unit of storage and splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    id: BucketId,
    local_depth: u32,
    elements: BTreeSet<i64>,
    capacity: usize,
}

impl Bucket {
    fn new(id: BucketId, local_depth: u32, capacity: usize) -> Self {
        Self {
            id,
            local_depth,
            elements: BTreeSet::new(),
            capacity,
        }
    }

    pub fn id(&self) -> BucketId {
        self.id
    }

    /// Number of low-order address bits shared by every key in this bucket.
    pub fn local_depth(&self) -> u32 {
        self.local_depth
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.elements.len() >= self.capacity
    }

    /// Only true in the middle of a split.
    pub(crate) fn is_overflowing(&self) -> bool {
        self.elements.len() > self.capacity
    }

    pub fn contains(&self, key: i64) -> bool {
        self.elements.contains(&key)
    }

    /// Keys in ascending order.
    pub fn elements(&self) -> impl Iterator<Item = i64> + '_ {
        self.elements.iter().copied()
    }

    /// Adds `key` without looking at the capacity; callers split afterwards
    /// if the bucket overflowed.
    pub(crate) fn insert(&mut self, key: i64) -> bool {
        self.elements.insert(key)
    }

    pub(crate) fn remove(&mut self, key: i64) -> bool {
        self.elements.remove(&key)
    }

    pub(crate) fn take_elements(&mut self) -> BTreeSet<i64> {
        std::mem::take(&mut self.elements)
    }

    pub(crate) fn set_local_depth(&mut self, local_depth: u32) {
        self.local_depth = local_depth;
    }
}

/// Arena of buckets indexed directly by [`BucketId`].
///
/// Buckets are only ever appended; there is no merge step that could free
/// one.
#[derive(Debug, Clone, Default)]
pub struct BucketStore {
    buckets: Vec<Bucket>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an empty bucket and returns its fresh handle.
    pub fn create(&mut self, local_depth: u32, capacity: usize) -> BucketId {
        let id: BucketId = BucketId(self.buckets.len());
        self.buckets.push(Bucket::new(id, local_depth, capacity));
        id
    }

    #[inline]
    pub fn get(&self, id: BucketId) -> Option<&Bucket> {
        self.buckets.get(id.0)
    }

    #[inline]
    pub fn get_mut(&mut self, id: BucketId) -> Option<&mut Bucket> {
        self.buckets.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Bucket> + '_ {
        self.buckets.iter()
    }
}
