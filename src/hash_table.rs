use std::fmt;

use crate::address::{self, address_bits};
use crate::bucket::{Bucket, BucketId, BucketStore};
use crate::config::TableConfig;
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::event::{Observer, TableEvent};
use crate::snapshot::{BucketSnapshot, TableSnapshot};

/// Directory slot and bucket a key resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub index: usize,
    pub bucket: BucketId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was stored in the given bucket, possibly after splits.
    Inserted(BucketId),
    /// The key was already stored in the given bucket; nothing changed.
    AlreadyPresent(BucketId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(BucketId),
    /// The bucket the key would live in.
    NotFound(BucketId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(BucketId),
    /// The bucket the key would live in; nothing changed.
    NotFound(BucketId),
}

/// Extendible hash table of `i64` keys.
///
/// A directory of `2^global_depth` pointers maps the low-order bits of
/// `|key|` to fixed capacity buckets. A full bucket is split in two, and the
/// directory doubles only when that bucket already uses every directory bit,
/// so no insert ever rehashes more than one bucket's worth of keys.
///
/// Buckets are never merged: deleting keys leaves the directory and the
/// bucket count as they are.
pub struct HashTable {
    config: TableConfig,
    directory: Directory,
    buckets: BucketStore,
    count: usize,
    events: Vec<TableEvent>,
    observers: Vec<Box<dyn Observer>>,
}

impl HashTable {
    pub const MIN_CAPACITY: usize = 1;
    /// Largest supported depth limit; a directory of this depth has 2^24
    /// slots.
    pub const MAX_DEPTH_LIMIT: u32 = 24;

    /// A table with [`TableConfig::default`].
    pub fn new() -> Self {
        Self::build(TableConfig::default())
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(TableConfig::with_capacity(capacity))
    }

    pub fn with_config(config: TableConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: TableConfig) -> Self {
        let (directory, buckets) = Self::fresh(&config);
        Self {
            config,
            directory,
            buckets,
            count: 0,
            events: Vec::new(),
            observers: Vec::new(),
        }
    }

    fn fresh(config: &TableConfig) -> (Directory, BucketStore) {
        let mut buckets: BucketStore = BucketStore::new();
        let root: BucketId = buckets.create(0, config.bucket_capacity);
        (Directory::new(root), buckets)
    }

    /// Registers an observer that is notified after every mutation.
    pub fn subscribe<O>(&mut self, observer: O)
    where
        O: Observer + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Discards every bucket and the directory and starts over with a single
    /// empty bucket of local depth 0. The depth limit is kept.
    pub fn initialize(&mut self, capacity: usize) -> Result<()> {
        let config: TableConfig = TableConfig {
            bucket_capacity: capacity,
            ..self.config
        };
        config.validate()?;
        let (directory, buckets) = Self::fresh(&config);
        self.config = config;
        self.directory = directory;
        self.buckets = buckets;
        self.count = 0;
        self.events.clear();
        log::debug!("initialized with bucket capacity {capacity}");
        self.events.push(TableEvent::Initialized { capacity });
        self.publish();
        Ok(())
    }

    pub fn insert(&mut self, key: i64) -> Result<InsertOutcome> {
        let result: Result<InsertOutcome> = self.insert_inner(key);
        self.publish();
        result
    }

    /// Looks `key` up without touching the table.
    pub fn search(&self, key: i64) -> Result<SearchOutcome> {
        let Location { bucket, .. } = self.locate(key)?;
        if self.bucket_ref(bucket)?.contains(key) {
            Ok(SearchOutcome::Found(bucket))
        } else {
            Ok(SearchOutcome::NotFound(bucket))
        }
    }

    pub fn delete(&mut self, key: i64) -> Result<DeleteOutcome> {
        let Location { bucket, .. } = self.locate(key)?;
        if !self.bucket_mut(bucket)?.remove(key) {
            return Ok(DeleteOutcome::NotFound(bucket));
        }
        self.count -= 1;
        self.events.push(TableEvent::ElementRemoved { bucket, key });
        self.publish();
        Ok(DeleteOutcome::Deleted(bucket))
    }

    /// Resolves `key` to its directory slot and bucket.
    pub fn locate(&self, key: i64) -> Result<Location> {
        let index: usize = self.directory.index_of(key);
        let bucket: BucketId = self.directory.get(index).ok_or_else(|| {
            Error::InternalInconsistency(format!(
                "slot {index} is outside a directory of {} slots",
                self.directory.len()
            ))
        })?;
        if self.buckets.get(bucket).is_none() {
            return Err(Error::InternalInconsistency(format!(
                "slot {index} points to missing bucket {bucket}"
            )));
        }
        Ok(Location { index, bucket })
    }

    fn insert_inner(&mut self, key: i64) -> Result<InsertOutcome> {
        let Location { index, bucket: id } = self.locate(key)?;
        let bucket: &Bucket = self.bucket_ref(id)?;
        if bucket.contains(key) {
            return Ok(InsertOutcome::AlreadyPresent(id));
        }
        if !bucket.is_full() {
            self.bucket_mut(id)?.insert(key);
            self.count += 1;
            self.events.push(TableEvent::ElementAdded { bucket: id, key });
            return Ok(InsertOutcome::Inserted(id));
        }

        // Find out up front whether splitting can separate the key from its
        // neighbours, so a rejected insert leaves the table untouched.
        let max_global_depth: u32 = self.config.max_global_depth;
        let target_depth: u32 = address::required_depth(
            bucket.elements().chain(std::iter::once(key)),
            key,
            bucket.local_depth(),
            bucket.capacity(),
            max_global_depth,
        )
        .ok_or_else(|| {
            log::warn!("key {key} collides with bucket {id} beyond depth {max_global_depth}");
            Error::DepthExhaustion {
                key,
                max_global_depth,
            }
        })?;
        log::debug!(
            "slot {index} -> bucket {id} is full, splitting for key {key} (target local depth {target_depth})"
        );
        // Doubling must not allocate once the splits have started.
        self.directory.reserve_depth(target_depth)?;

        self.bucket_mut(id)?.insert(key);
        self.count += 1;
        let mut overflowing: Option<BucketId> = Some(id);
        while let Some(id) = overflowing {
            overflowing = self.split(id, key)?;
        }

        let home: BucketId = self.locate(key)?.bucket;
        self.events.push(TableEvent::ElementAdded { bucket: home, key });
        Ok(InsertOutcome::Inserted(home))
    }

    /// Splits bucket `id`, doubling the directory first when the bucket
    /// already uses every directory bit, and redistributes its keys between
    /// the two halves. Returns the half that is still over capacity, if any.
    fn split(&mut self, id: BucketId, key: i64) -> Result<Option<BucketId>> {
        let bucket: &Bucket = self.bucket_ref(id)?;
        let old_depth: u32 = bucket.local_depth();
        // Any key of the bucket shares its low `old_depth` bits with all of
        // the bucket's slots.
        let member: i64 = bucket.elements().next().unwrap_or(key);
        if old_depth == self.directory.global_depth() {
            if old_depth >= self.config.max_global_depth {
                return Err(Error::DepthExhaustion {
                    key,
                    max_global_depth: self.config.max_global_depth,
                });
            }
            self.directory.double();
            let global_depth: u32 = self.directory.global_depth();
            log::debug!(
                "directory doubled to depth {global_depth} ({} slots)",
                self.directory.len()
            );
            self.events.push(TableEvent::DirectoryDoubled { global_depth });
        }

        let local_depth: u32 = old_depth + 1;
        self.bucket_mut(id)?.set_local_depth(local_depth);
        let sibling: BucketId = self.buckets.create(local_depth, self.config.bucket_capacity);
        self.events.push(TableEvent::BucketCreated {
            bucket: sibling,
            local_depth,
        });

        let slot: usize = self.directory.index_of(member);
        let moved: usize = self.directory.repoint(id, sibling, local_depth, slot);
        log::debug!("bucket {id} split into {id} and {sibling} at local depth {local_depth}, {moved} slots moved");
        self.events.push(TableEvent::BucketSplit {
            bucket: id,
            sibling,
            local_depth,
        });

        let elements = self.bucket_mut(id)?.take_elements();
        for element in elements {
            let home: BucketId = self.locate(element)?.bucket;
            if home != id && home != sibling {
                return Err(Error::InternalInconsistency(format!(
                    "key {element} of bucket {id} resolved to unrelated bucket {home}"
                )));
            }
            log::trace!("key {element} -> bucket {home}");
            self.bucket_mut(home)?.insert(element);
        }

        for half in [id, sibling] {
            if self.bucket_ref(half)?.is_overflowing() {
                return Ok(Some(half));
            }
        }
        Ok(None)
    }

    fn publish(&mut self) {
        if self.observers.is_empty() {
            self.events.clear();
            return;
        }
        for event in self.events.drain(..) {
            for observer in self.observers.iter_mut() {
                observer.notify(&event);
            }
        }
    }

    fn bucket_ref(&self, id: BucketId) -> Result<&Bucket> {
        self.buckets
            .get(id)
            .ok_or_else(|| Error::InternalInconsistency(format!("bucket {id} does not exist")))
    }

    fn bucket_mut(&mut self, id: BucketId) -> Result<&mut Bucket> {
        self.buckets
            .get_mut(id)
            .ok_or_else(|| Error::InternalInconsistency(format!("bucket {id} does not exist")))
    }

    pub fn config(&self) -> TableConfig {
        self.config
    }

    /// Maximum number of keys per bucket.
    pub fn capacity(&self) -> usize {
        self.config.bucket_capacity
    }

    pub fn global_depth(&self) -> u32 {
        self.directory.global_depth()
    }

    /// Directory pointers, indexed by the low `global_depth` bits of `|key|`.
    pub fn pointers(&self) -> &[BucketId] {
        self.directory.pointers()
    }

    pub fn bucket(&self, id: BucketId) -> Option<&Bucket> {
        self.buckets.get(id)
    }

    /// Buckets in creation order.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> + '_ {
        self.buckets.iter()
    }

    /// Number of stored keys.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }

    /// Stored keys over total bucket capacity.
    pub fn load_factor(&self) -> f64 {
        let slots: usize = self.buckets.len() * self.config.bucket_capacity;
        if slots == 0 {
            0.0
        } else {
            self.count as f64 / slots as f64
        }
    }

    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            global_depth: self.directory.global_depth(),
            pointers: self.directory.pointers().to_vec(),
            buckets: self.buckets.iter().map(BucketSnapshot::from).collect(),
        }
    }

    /// Verifies the structural invariants of the directory and the buckets.
    ///
    /// Every slot points to an existing bucket; a bucket with local depth
    /// `d` is pointed to by exactly the `2^(global_depth - d)` slots that
    /// agree with it on their low `d` bits, holds at most `capacity` keys,
    /// and only holds keys that resolve to it.
    pub fn check_invariants(&self) -> Result<()> {
        let global_depth: u32 = self.directory.global_depth();
        if self.directory.len() != 1usize << global_depth {
            return Err(Error::InternalInconsistency(format!(
                "directory of depth {global_depth} has {} slots",
                self.directory.len()
            )));
        }
        // First slot and slot count per bucket, in one pass over the
        // directory.
        let mut first_slot: Vec<Option<usize>> = vec![None; self.buckets.len()];
        let mut slot_count: Vec<usize> = vec![0; self.buckets.len()];
        for (index, &pointer) in self.directory.pointers().iter().enumerate() {
            let bucket: &Bucket = self.buckets.get(pointer).ok_or_else(|| {
                Error::InternalInconsistency(format!(
                    "slot {index} points to missing bucket {pointer}"
                ))
            })?;
            let local_depth: u32 = bucket.local_depth();
            match first_slot[pointer.index()] {
                None => first_slot[pointer.index()] = Some(index),
                Some(first)
                    if address_bits(first as i64, local_depth)
                        != address_bits(index as i64, local_depth) =>
                {
                    return Err(Error::InternalInconsistency(format!(
                        "slot {index} of bucket {pointer} does not share its low {local_depth} bits with slot {first}"
                    )));
                }
                Some(_) => {}
            }
            slot_count[pointer.index()] += 1;
        }

        let mut stored: usize = 0;
        for bucket in self.buckets.iter() {
            let id: BucketId = bucket.id();
            let local_depth: u32 = bucket.local_depth();
            if local_depth > global_depth {
                return Err(Error::InternalInconsistency(format!(
                    "bucket {id} has local depth {local_depth} above global depth {global_depth}"
                )));
            }
            if bucket.len() > bucket.capacity() {
                return Err(Error::InternalInconsistency(format!(
                    "bucket {id} holds {} keys, capacity is {}",
                    bucket.len(),
                    bucket.capacity()
                )));
            }

            let expected: usize = 1 << (global_depth - local_depth);
            let first: usize = match first_slot[id.index()] {
                Some(first) if slot_count[id.index()] == expected => first,
                _ => {
                    return Err(Error::InternalInconsistency(format!(
                        "bucket {id} at local depth {local_depth} has {} slots, expected {expected}",
                        slot_count[id.index()]
                    )));
                }
            };
            let pattern: usize = address_bits(first as i64, local_depth);
            if let Some(key) = bucket
                .elements()
                .find(|&key| address_bits(key, local_depth) != pattern)
            {
                return Err(Error::InternalInconsistency(format!(
                    "key {key} does not belong in bucket {id}"
                )));
            }
            stored += bucket.len();
        }

        if stored != self.count {
            return Err(Error::InternalInconsistency(format!(
                "buckets hold {stored} keys, count is {}",
                self.count
            )));
        }
        Ok(())
    }
}

impl Default for HashTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("config", &self.config)
            .field("directory", &self.directory)
            .field("buckets", &self.buckets)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}
