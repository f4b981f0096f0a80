//! Extendible hashing over `i64` keys.
//!
//! A [`HashTable`] keeps a directory of `2^global_depth` bucket pointers
//! indexed by the low-order bits of `|key|`. Buckets hold a bounded number
//! of keys and split one at a time as they fill up; the directory only
//! doubles when a splitting bucket already uses all of its bits.
//!
//! ```
//! use extendible_buckets::{HashTable, InsertOutcome, SearchOutcome};
//!
//! let mut table = HashTable::with_capacity(2).unwrap();
//! for key in [1, 2, 3] {
//!     assert!(matches!(table.insert(key), Ok(InsertOutcome::Inserted(_))));
//! }
//! assert_eq!(table.global_depth(), 1);
//! assert!(matches!(table.search(3), Ok(SearchOutcome::Found(_))));
//! ```

pub mod address;
pub mod bucket;
pub mod config;
pub mod directory;
pub mod error;
pub mod event;
pub mod hash_table;
pub mod logging;
pub mod parse;
pub mod snapshot;

pub use address::address_bits;
pub use bucket::{Bucket, BucketId};
pub use config::TableConfig;
pub use error::{Error, Result};
pub use event::{Observer, TableEvent};
pub use hash_table::{DeleteOutcome, HashTable, InsertOutcome, Location, SearchOutcome};
pub use parse::{parse_capacity, parse_key};
pub use snapshot::{BucketSnapshot, TableSnapshot};
