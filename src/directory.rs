use crate::address::{address_bits, split_bit};
use crate::bucket::BucketId;
use crate::error::{Error, Result};

/// Maps the low `global_depth` address bits of a key to a bucket.
///
/// The pointer array always holds exactly `2^global_depth` entries; several
/// entries may share a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    global_depth: u32,
    pointers: Vec<BucketId>,
}

impl Directory {
    /// A directory of depth zero whose single slot points at `root`.
    pub fn new(root: BucketId) -> Self {
        Self {
            global_depth: 0,
            pointers: vec![root],
        }
    }

    pub fn global_depth(&self) -> u32 {
        self.global_depth
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    pub fn pointers(&self) -> &[BucketId] {
        &self.pointers
    }

    #[inline]
    pub fn index_of(&self, key: i64) -> usize {
        address_bits(key, self.global_depth)
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<BucketId> {
        self.pointers.get(index).copied()
    }

    /// Makes room for a directory of depth `depth` up front, so the
    /// doublings that follow cannot fail halfway. Nothing changes if the
    /// allocation is refused.
    pub fn reserve_depth(&mut self, depth: u32) -> Result<()> {
        if depth <= self.global_depth {
            return Ok(());
        }
        let slots: usize = 1usize
            .checked_shl(depth)
            .filter(|&slots| slots <= isize::MAX as usize / std::mem::size_of::<BucketId>())
            .ok_or(Error::DirectoryAllocation { global_depth: depth })?;
        self.pointers
            .try_reserve_exact(slots - self.pointers.len())
            .map_err(|_| Error::DirectoryAllocation { global_depth: depth })
    }

    /// Doubles the pointer array. The upper half starts as a mirror of the
    /// lower half, so every bucket keeps its slots and gains their twins.
    pub fn double(&mut self) {
        self.pointers.extend_from_within(..);
        self.global_depth += 1;
    }

    /// Hands the slots of `from` whose bit `local_depth - 1` is set over to
    /// `to`. Returns the number of slots that moved.
    ///
    /// `slot` is any slot of `from`. Only slots agreeing with it on the low
    /// `local_depth - 1` bits can belong to `from`, so the scan strides over
    /// the others.
    pub fn repoint(&mut self, from: BucketId, to: BucketId, local_depth: u32, slot: usize) -> usize {
        let stride: usize = 1 << (local_depth - 1);
        let mut moved: usize = 0;
        for index in ((slot & (stride - 1))..self.pointers.len()).step_by(stride) {
            if self.pointers[index] == from && split_bit(index, local_depth) {
                self.pointers[index] = to;
                moved += 1;
            }
        }
        moved
    }
}
