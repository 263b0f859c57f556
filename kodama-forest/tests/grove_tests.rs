//! # Grove Write-Path Tests
//!
//! Covers the cross-tree write discipline of one grove:
//! - insert/lookup and index projection
//! - update diffing, including derived-index presence changes
//! - remove with the byte-equality assertion
//! - object/index consistency under randomized operation sequences

use std::collections::HashMap;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kodama_forest::testing::{TestFamily, TestGrid};
use kodama_forest::{
    derived_index, direct_index, grove, CompositeKey, Grid, GroveOptions, NodePool, Phase, Record,
    Timestamp, Tree, TIMESTAMP_TOMBSTONE_BIT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Account {
    timestamp: u64,
    id: u128,
    ledger: u32,
    // Never indexed: flag churn must not touch the index trees.
    flags: u16,
}

impl Record for Account {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    fn tombstone_from_timestamp(timestamp: Timestamp) -> Self {
        Self {
            timestamp: timestamp | TIMESTAMP_TOMBSTONE_BIT,
            ..Self::default()
        }
    }
}

direct_index! {
    struct AccountIdIndex for Account {
        field: id,
        value: u128,
        payload: u128,
    }
}

direct_index! {
    struct AccountLedgerIndex for Account {
        field: ledger,
        value: u32,
        payload: u64,
    }
}

/// Present only for flagged accounts; the value is packed in the remaining
/// flag bits. Absence must stay distinct from a zero category.
fn account_category(account: &Account) -> Option<u32> {
    if account.flags & 1 == 0 {
        None
    } else {
        Some(u32::from(account.flags >> 1))
    }
}

derived_index! {
    struct AccountCategoryIndex for Account {
        name: "category",
        value: u32,
        payload: u64,
        derive: account_category,
    }
}

grove! {
    /// Accounts plus their secondary indexes.
    struct AccountGrove {
        record: Account,
        name: "accounts",
        indexes: {
            id: AccountIdIndex,
            ledger: AccountLedgerIndex,
            category: AccountCategoryIndex,
        },
    }
}

fn test_grove() -> (Rc<TestGrid>, Rc<NodePool>, AccountGrove<TestFamily>) {
    let grid = TestGrid::new();
    let pool = Rc::new(NodePool::new(8).unwrap());
    let grove = AccountGrove::<TestFamily>::init(
        &grid,
        &pool,
        GroveOptions {
            cache_size: 16,
            commit_count_max: 4,
        },
    )
    .unwrap();
    (grid, pool, grove)
}

fn account(timestamp: u64, id: u128, ledger: u32, flags: u16) -> Account {
    Account {
        timestamp,
        id,
        ledger,
        flags,
    }
}

/// Every index tree must hold exactly the projections of the live objects.
fn check_consistency(grove: &AccountGrove<TestFamily>) {
    let live = grove.objects().tree().live_values();

    let mut expected_id: Vec<CompositeKey<u128>> = live
        .iter()
        .map(|account| CompositeKey::new(account.id, account.timestamp))
        .collect();
    expected_id.sort();
    assert_eq!(grove.id().tree().live_keys(), expected_id);

    let mut expected_ledger: Vec<CompositeKey<u64>> = live
        .iter()
        .map(|account| CompositeKey::new(u64::from(account.ledger), account.timestamp))
        .collect();
    expected_ledger.sort();
    assert_eq!(grove.ledger().tree().live_keys(), expected_ledger);

    let mut expected_category: Vec<CompositeKey<u64>> = live
        .iter()
        .filter_map(|account| {
            account_category(account)
                .map(|category| CompositeKey::new(u64::from(category), account.timestamp))
        })
        .collect();
    expected_category.sort();
    assert_eq!(grove.category().tree().live_keys(), expected_category);
}

#[test]
fn insert_then_lookup() {
    let (_grid, _pool, mut grove) = test_grove();

    let first = account(1, 0xAA, 7, 0);
    grove.put(&first);

    assert_eq!(grove.get(1), Some(&first));
    assert_eq!(grove.get(2), None);

    assert!(grove.id().tree().contains_live(&CompositeKey::new(0xAAu128, 1)));
    assert!(grove
        .ledger()
        .tree()
        .contains_live(&CompositeKey::new(7u64, 1)));
    assert!(grove.category().tree().is_empty());

    // A fresh insert leaves no tombstones anywhere.
    assert_eq!(grove.objects().tree().remove_count(), 0);
    assert_eq!(grove.id().tree().remove_count(), 0);
    assert_eq!(grove.ledger().tree().remove_count(), 0);

    check_consistency(&grove);
}

#[test]
fn update_changes_one_index() {
    let (_grid, _pool, mut grove) = test_grove();

    grove.put(&account(1, 0xAA, 7, 0));
    grove.put(&account(1, 0xAA, 9, 0));

    assert_eq!(grove.get(1), Some(&account(1, 0xAA, 9, 0)));

    // The stale ledger entry is retracted before the fresh one lands.
    assert!(grove
        .ledger()
        .tree()
        .contains_tombstone(&CompositeKey::new(7u64, 1)));
    assert!(grove
        .ledger()
        .tree()
        .contains_live(&CompositeKey::new(9u64, 1)));

    // The id projection did not change, so that tree saw one put total.
    assert_eq!(grove.id().tree().put_count(), 1);
    assert_eq!(grove.id().tree().remove_count(), 0);

    check_consistency(&grove);
}

#[test]
fn update_of_ignored_field_rewrites_object_only() {
    let (_grid, _pool, mut grove) = test_grove();

    grove.put(&account(1, 0xAA, 7, 0));
    grove.put(&account(1, 0xAA, 7, 2));

    // Bit 0 clear both times: the category projection stays absent, and the
    // direct projections are unchanged, but the object tree is rewritten so
    // it stays canonical for non-indexed fields too.
    assert_eq!(grove.get(1), Some(&account(1, 0xAA, 7, 2)));
    assert_eq!(grove.objects().tree().put_count(), 2);
    assert_eq!(grove.objects().tree().remove_count(), 1);
    assert_eq!(grove.id().tree().put_count(), 1);
    assert_eq!(grove.ledger().tree().put_count(), 1);
    assert!(grove.category().tree().is_empty());

    check_consistency(&grove);
}

#[test]
fn identical_put_issues_no_tree_operations() {
    let (_grid, _pool, mut grove) = test_grove();

    let record = account(1, 0xAA, 7, 0);
    grove.put(&record);
    grove.put(&record);

    assert_eq!(grove.objects().tree().put_count(), 1);
    assert_eq!(grove.objects().tree().remove_count(), 0);
    assert_eq!(grove.id().tree().put_count(), 1);
    assert_eq!(grove.ledger().tree().put_count(), 1);

    check_consistency(&grove);
}

#[test]
fn remove_round_trip() {
    let (_grid, _pool, mut grove) = test_grove();

    grove.put(&account(1, 0xAA, 7, 0));
    grove.put(&account(1, 0xAA, 9, 0));
    grove.remove(&account(1, 0xAA, 9, 0));

    assert_eq!(grove.get(1), None);
    assert!(grove.objects().tree().contains_tombstone(&1));
    assert!(grove
        .id()
        .tree()
        .contains_tombstone(&CompositeKey::new(0xAAu128, 1)));
    assert!(grove
        .ledger()
        .tree()
        .contains_tombstone(&CompositeKey::new(9u64, 1)));

    check_consistency(&grove);
}

#[test]
fn derived_index_tracks_presence() {
    let (_grid, _pool, mut grove) = test_grove();

    // Bit 0 clear: no category projection.
    grove.put(&account(1, 0xAA, 7, 0));
    assert!(grove.category().tree().is_empty());

    // Bit 0 set, category value 5.
    grove.put(&account(1, 0xAA, 7, 0b1011));
    assert!(grove
        .category()
        .tree()
        .contains_live(&CompositeKey::new(5u64, 1)));

    // Back to absent: the entry is retracted, not zeroed.
    grove.put(&account(1, 0xAA, 7, 0));
    assert!(grove
        .category()
        .tree()
        .contains_tombstone(&CompositeKey::new(5u64, 1)));
    assert!(!grove
        .category()
        .tree()
        .contains_live(&CompositeKey::new(5u64, 1)));

    check_consistency(&grove);
}

#[test]
#[should_panic(expected = "not stored")]
fn remove_of_unknown_record_panics() {
    let (_grid, _pool, mut grove) = test_grove();
    grove.remove(&account(1, 0xAA, 7, 0));
}

#[test]
#[should_panic(expected = "not stored")]
fn stale_remove_panics() {
    let (_grid, _pool, mut grove) = test_grove();
    grove.put(&account(1, 0xAA, 7, 0));
    grove.put(&account(1, 0xAA, 9, 0));
    // The caller's copy is out of date.
    grove.remove(&account(1, 0xAA, 7, 0));
}

#[test]
fn lookup_falls_back_to_tree_after_cache_eviction() {
    let grid = TestGrid::new();
    let pool = Rc::new(NodePool::new(8).unwrap());
    let mut grove = AccountGrove::<TestFamily>::init(
        &grid,
        &pool,
        GroveOptions {
            cache_size: 2,
            commit_count_max: 4,
        },
    )
    .unwrap();

    for timestamp in 1..=4 {
        grove.put(&account(timestamp, u128::from(timestamp), 7, 0));
    }

    // Timestamp 1 was evicted from the two-entry cache but is still live in
    // the object tree.
    assert_eq!(grove.objects().cached(), 2);
    assert_eq!(grove.get(1), Some(&account(1, 1, 7, 0)));

    let snapshot = grove.metrics().snapshot();
    assert!(snapshot.cache_misses > 0);
}

#[test]
fn grove_phases_complete_on_tick() {
    let (grid, _pool, mut grove) = test_grove();

    let opened = Rc::new(std::cell::Cell::new(0u32));
    let observed = Rc::clone(&opened);
    grove.open(move || observed.set(observed.get() + 1));

    assert_eq!(grove.phase_in_flight(), Some(Phase::Open));
    assert_eq!(grid.pending(), 4);
    assert_eq!(opened.get(), 0);

    grid.tick();
    assert_eq!(opened.get(), 1);
    assert_eq!(grove.phase_in_flight(), None);
    assert!(grove.objects().tree().opened());
    assert!(grove.id().tree().opened());
}

#[test]
#[should_panic(expected = "still in flight")]
fn overlapping_grove_phases_panic() {
    let (_grid, _pool, mut grove) = test_grove();
    grove.compact_io(1, || {});
    grove.compact_io(2, || {});
}

#[test]
fn randomized_operations_keep_indexes_consistent() {
    let (_grid, _pool, mut grove) = test_grove();
    let mut rng = StdRng::seed_from_u64(0x6F7265);
    let mut model: HashMap<u64, Account> = HashMap::new();

    for _ in 0..500 {
        let timestamp = rng.gen_range(1..=8u64);
        if rng.gen_bool(0.25) {
            if let Some(stored) = model.remove(&timestamp) {
                grove.remove(&stored);
            }
        } else {
            let record = account(
                timestamp,
                u128::from(rng.gen_range(0..4u32)),
                rng.gen_range(0..3u32),
                rng.gen_range(0..8u16),
            );
            grove.put(&record);
            model.insert(timestamp, record);
        }
        check_consistency(&grove);
    }

    // The model and the object tree agree on the live set.
    let mut expected: Vec<Account> = model.values().copied().collect();
    expected.sort_by_key(|record| record.timestamp);
    assert_eq!(grove.objects().tree().live_values(), expected);
}

#[test]
fn tree_budgets_follow_grove_options() {
    let (_grid, _pool, grove) = test_grove();

    let objects = grove.objects().tree().config();
    assert_eq!(objects.commit_count_max, 4);
    assert_eq!(objects.prefetch_count_max, 8);

    let ledger = grove.ledger().tree().config();
    assert_eq!(ledger.commit_count_max, 4);
    assert_eq!(ledger.prefetch_count_max, 0);
}

#[test]
fn tree_ids_are_distinct_and_stable() {
    let (_grid, _pool, grove) = test_grove();
    let (_grid2, _pool2, grove2) = test_grove();

    let ids = grove.tree_ids();
    assert_eq!(ids.len(), 4);
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert_eq!(ids, grove2.tree_ids());
}
