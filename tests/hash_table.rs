use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use extendible_buckets::{
    address_bits, BucketId, DeleteOutcome, Error, HashTable, InsertOutcome, SearchOutcome,
    TableConfig, TableEvent,
};
use rand::prelude::*;
use rand_pcg::Pcg64;

fn table(capacity: usize) -> HashTable {
    HashTable::with_capacity(capacity).unwrap()
}

fn elements(table: &HashTable, key: i64) -> Vec<i64> {
    let bucket = table.locate(key).unwrap().bucket;
    table.bucket(bucket).unwrap().elements().collect()
}

fn recorder(table: &mut HashTable) -> Arc<Mutex<Vec<TableEvent>>> {
    let events: Arc<Mutex<Vec<TableEvent>>> = Arc::default();
    let sink = events.clone();
    table.subscribe(move |event: &TableEvent| sink.lock().unwrap().push(*event));
    events
}

/// Checks the invariants, then recounts the slots of every bucket without
/// going through `check_invariants`.
fn assert_consistent(table: &HashTable) {
    table.check_invariants().unwrap();
    let global = table.global_depth();
    assert_eq!(table.pointers().len(), 1 << global);
    let mut slots: BTreeMap<BucketId, usize> = BTreeMap::new();
    for &pointer in table.pointers() {
        *slots.entry(pointer).or_default() += 1;
    }
    for bucket in table.buckets() {
        assert!(bucket.local_depth() <= global);
        assert!(bucket.len() <= table.capacity());
        assert_eq!(slots[&bucket.id()], 1 << (global - bucket.local_depth()));
    }
}

#[test]
fn first_overflow_splits_by_parity() {
    let mut t = table(2);
    t.insert(1).unwrap();
    t.insert(2).unwrap();
    assert_eq!(t.bucket_count(), 1);
    assert_eq!(t.global_depth(), 0);

    t.insert(3).unwrap();
    assert_eq!(t.global_depth(), 1);
    assert_eq!(t.bucket_count(), 2);
    assert!(t.buckets().all(|bucket| bucket.local_depth() == 1));
    assert_eq!(elements(&t, 2), vec![2]);
    assert_eq!(elements(&t, 1), vec![1, 3]);
    for bucket in t.buckets() {
        let parity: Vec<usize> = bucket.elements().map(|key| address_bits(key, 1)).collect();
        assert!(parity.windows(2).all(|pair| pair[0] == pair[1]));
    }
    assert_consistent(&t);
}

#[test]
fn shared_low_bits_split_more_than_once() {
    let mut t = table(2);
    t.insert(4).unwrap();
    t.insert(8).unwrap();
    assert_eq!(t.global_depth(), 0);

    t.insert(12).unwrap();
    // 4, 8 and 12 agree on their two low bits, only bit 2 tells 8 apart.
    assert_eq!(t.global_depth(), 3);
    assert_eq!(elements(&t, 4), vec![4, 12]);
    assert_eq!(elements(&t, 8), vec![8]);
    assert_consistent(&t);

    t.insert(6).unwrap();
    t.insert(1).unwrap();
    assert_eq!(t.global_depth(), 3);
    assert_consistent(&t);
}

#[test]
fn even_keys_double_the_directory_twice() {
    let mut t = table(2);
    for key in [2, 4, 6] {
        t.insert(key).unwrap();
    }
    assert_eq!(t.global_depth(), 2);
    assert_eq!(elements(&t, 2), vec![2, 6]);
    assert_eq!(elements(&t, 4), vec![4]);
    // The odd half never split.
    let odd = t.locate(1).unwrap().bucket;
    assert_eq!(t.bucket(odd).unwrap().local_depth(), 1);
    assert_consistent(&t);
}

#[test]
fn deleting_a_missing_key_changes_nothing() {
    let mut t = table(2);
    for key in [1, 2, 3, 10] {
        t.insert(key).unwrap();
    }
    let before = t.snapshot();
    let events = recorder(&mut t);

    assert!(matches!(t.delete(7), Ok(DeleteOutcome::NotFound(_))));
    assert!(matches!(t.search(7), Ok(SearchOutcome::NotFound(_))));
    assert_eq!(t.snapshot(), before);
    assert_eq!(t.count(), 4);
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn reinitializing_starts_over() {
    let mut t = table(2);
    for key in 0..20 {
        t.insert(key).unwrap();
    }
    assert!(t.global_depth() > 0);

    t.initialize(3).unwrap();
    assert_eq!(t.global_depth(), 0);
    assert_eq!(t.bucket_count(), 1);
    assert_eq!(t.count(), 0);
    assert_eq!(t.capacity(), 3);
    assert_eq!(t.pointers(), &[t.buckets().next().unwrap().id()]);
    assert!(matches!(t.search(5), Ok(SearchOutcome::NotFound(_))));

    for key in [1, 2, 3] {
        t.insert(key).unwrap();
    }
    assert_eq!(t.global_depth(), 0);
    t.insert(4).unwrap();
    assert_eq!(t.global_depth(), 1);
    assert_consistent(&t);
}

#[test]
fn insert_search_delete_round_trip() {
    let mut t = table(3);
    for key in [-5, 0, 17, 1 << 40, i64::MIN, i64::MAX] {
        let InsertOutcome::Inserted(bucket) = t.insert(key).unwrap() else {
            panic!("{key} was reported as present");
        };
        assert_eq!(t.search(key), Ok(SearchOutcome::Found(bucket)));
        assert_eq!(t.delete(key), Ok(DeleteOutcome::Deleted(bucket)));
        assert_eq!(t.search(key), Ok(SearchOutcome::NotFound(bucket)));
    }
    assert!(t.is_empty());
    assert_consistent(&t);
}

#[test]
fn duplicate_insert_is_reported_not_stored() {
    let mut t = table(2);
    let first = t.insert(42).unwrap();
    let count = t.count();
    let second = t.insert(42).unwrap();
    let InsertOutcome::Inserted(bucket) = first else {
        panic!("first insert must store the key");
    };
    assert_eq!(second, InsertOutcome::AlreadyPresent(bucket));
    assert_eq!(t.count(), count);
    assert_eq!(t.count(), 1);
}

#[test]
fn duplicate_of_a_key_in_a_full_bucket_does_not_split() {
    let mut t = table(2);
    t.insert(1).unwrap();
    t.insert(2).unwrap();
    assert!(matches!(t.insert(2), Ok(InsertOutcome::AlreadyPresent(_))));
    assert_eq!(t.bucket_count(), 1);
}

#[test]
fn colliding_magnitudes_exhaust_the_depth() {
    let mut t = HashTable::with_config(TableConfig::with_capacity(1).max_global_depth(8)).unwrap();
    t.insert(7).unwrap();
    let before = t.snapshot();
    let events = recorder(&mut t);
    assert_eq!(
        t.insert(-7),
        Err(Error::DepthExhaustion {
            key: -7,
            max_global_depth: 8
        })
    );
    assert_eq!(
        t.insert(7 + (1 << 8)),
        Err(Error::DepthExhaustion {
            key: 263,
            max_global_depth: 8
        })
    );
    assert_eq!(t.snapshot(), before);
    assert!(events.lock().unwrap().is_empty());

    // A key that differs within the limit still fits.
    t.insert(7 + (1 << 7)).unwrap();
    assert_eq!(t.global_depth(), 8);
    assert_consistent(&t);
}

#[test]
fn widely_separated_pair_at_the_depth_ceiling_is_rejected() {
    let limit: u32 = HashTable::MAX_DEPTH_LIMIT;
    let config = TableConfig::with_capacity(1).max_global_depth(limit);
    let mut t = HashTable::with_config(config).unwrap();
    t.insert(0).unwrap();
    let before = t.snapshot();
    let events = recorder(&mut t);

    // Separating these needs `limit + 1` address bits.
    assert_eq!(
        t.insert(1 << limit),
        Err(Error::DepthExhaustion {
            key: 1 << limit,
            max_global_depth: limit
        })
    );
    assert_eq!(
        t.insert(1 << 31),
        Err(Error::DepthExhaustion {
            key: 1 << 31,
            max_global_depth: limit
        })
    );
    assert_eq!(t.snapshot(), before);
    assert_eq!(t.directory_len(), 1);
    assert!(events.lock().unwrap().is_empty());

    // Deeper limits are refused outright.
    assert_eq!(
        HashTable::with_config(TableConfig::with_capacity(1).max_global_depth(limit + 1))
            .unwrap_err(),
        Error::InvalidDepthLimit {
            max_global_depth: limit + 1,
            limit
        }
    );
}

#[test]
fn deletes_never_shrink_the_table() {
    let mut t = table(2);
    for key in 0..32 {
        t.insert(key).unwrap();
    }
    let depth = t.global_depth();
    let buckets = t.bucket_count();
    for key in 0..32 {
        assert!(matches!(t.delete(key), Ok(DeleteOutcome::Deleted(_))));
    }
    assert_eq!(t.global_depth(), depth);
    assert_eq!(t.bucket_count(), buckets);
    assert_eq!(t.load_factor(), 0.0);
    assert_consistent(&t);
}

#[test]
fn observers_see_splits_in_order() {
    let mut t = table(2);
    let events = recorder(&mut t);
    t.insert(1).unwrap();
    t.insert(2).unwrap();
    t.insert(3).unwrap();
    t.delete(2).unwrap();

    let root = t.pointers()[0];
    let sibling = t.pointers()[1];
    assert_eq!(
        *events.lock().unwrap(),
        vec![
            TableEvent::ElementAdded { bucket: root, key: 1 },
            TableEvent::ElementAdded { bucket: root, key: 2 },
            TableEvent::DirectoryDoubled { global_depth: 1 },
            TableEvent::BucketCreated {
                bucket: sibling,
                local_depth: 1
            },
            TableEvent::BucketSplit {
                bucket: root,
                sibling,
                local_depth: 1
            },
            TableEvent::ElementAdded {
                bucket: sibling,
                key: 3
            },
            TableEvent::ElementRemoved { bucket: root, key: 2 },
        ]
    );

    events.lock().unwrap().clear();
    t.initialize(4).unwrap();
    assert_eq!(
        *events.lock().unwrap(),
        vec![TableEvent::Initialized { capacity: 4 }]
    );
}

#[test]
fn snapshot_renders_directory_and_buckets() {
    let mut t = table(2);
    for key in [1, 2, 3] {
        t.insert(key).unwrap();
    }
    assert_eq!(
        t.snapshot().to_string(),
        "global depth 1\n\
         \x20 0 -> bucket 0\n\
         \x20 1 -> bucket 1\n\
         bucket 0 (local depth 1): [2] (1/2)\n\
         bucket 1 (local depth 1): [1, 3] (2/2) full\n"
    );
}

#[test]
fn random_workload_keeps_invariants() {
    const MAX_DEPTH: u32 = 12;
    let mut rng = Pcg64::seed_from_u64(0x5eed);
    for capacity in [1, 2, 3, 8] {
        let config = TableConfig::with_capacity(capacity).max_global_depth(MAX_DEPTH);
        let mut t = HashTable::with_config(config).unwrap();
        let mut reference: BTreeSet<i64> = BTreeSet::new();
        for _ in 0..1500 {
            // Small keys force collisions on the low bits, large ones spread.
            let key: i64 = if rng.gen_bool(0.5) {
                rng.gen_range(-300..300)
            } else {
                rng.gen()
            };
            match rng.gen_range(0..4) {
                0 => {
                    let present = reference.remove(&key);
                    match t.delete(key).unwrap() {
                        DeleteOutcome::Deleted(_) => assert!(present),
                        DeleteOutcome::NotFound(_) => assert!(!present),
                    }
                }
                1 => {
                    let present = reference.contains(&key);
                    match t.search(key).unwrap() {
                        SearchOutcome::Found(_) => assert!(present),
                        SearchOutcome::NotFound(_) => assert!(!present),
                    }
                }
                _ => match t.insert(key) {
                    Ok(InsertOutcome::Inserted(_)) => assert!(reference.insert(key)),
                    Ok(InsertOutcome::AlreadyPresent(_)) => assert!(reference.contains(&key)),
                    Err(Error::DepthExhaustion { .. }) => {
                        // Only rejected when `capacity` stored keys agree
                        // with it on every addressable bit.
                        let target = address_bits(key, MAX_DEPTH);
                        let colliding = reference
                            .iter()
                            .filter(|&&other| address_bits(other, MAX_DEPTH) == target)
                            .count();
                        assert!(!reference.contains(&key));
                        assert!(colliding >= capacity);
                    }
                    Err(err) => panic!("unexpected error {err}"),
                },
            }
            assert_eq!(t.count(), reference.len());
            t.check_invariants().unwrap();
        }
        assert_consistent(&t);
        let stored: BTreeSet<i64> = t.buckets().flat_map(|bucket| bucket.elements()).collect();
        assert_eq!(stored, reference);
    }
}
