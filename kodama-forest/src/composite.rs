//! # Composite Keys
//!
//! An index tree entry packs the indexed field value together with the
//! owning record's timestamp into one fixed-width key that is also the
//! stored value (index trees are membership-only). Ordering is
//! lexicographic: payload first, then timestamp, so all timestamps for one
//! field value are adjacent and range scans by value come out in commit
//! order.
//!
//! Payloads come in exactly two widths, 64 and 128 bits, so the whole tree
//! machinery monomorphizes twice rather than once per application field
//! type. Field values narrower than 64 bits widen into the 64-bit payload.

use std::fmt;
use std::hash::Hash;

use kodama_core::{Table, TIMESTAMP_TOMBSTONE_BIT};

mod private {
    pub trait Sealed {}
    impl Sealed for u64 {}
    impl Sealed for u128 {}
}

/// Payload width of a composite key. Implemented for `u64` and `u128` only.
pub trait Payload: Copy + Ord + Eq + Hash + fmt::Debug + private::Sealed + 'static {
    const ZERO: Self;
    const MAX: Self;
}

impl Payload for u64 {
    const ZERO: Self = 0;
    const MAX: Self = u64::MAX;
}

impl Payload for u128 {
    const ZERO: Self = 0;
    const MAX: Self = u128::MAX;
}

/// A packed `(payload, timestamp)` pair; key and value of an index tree.
///
/// The derived ordering is field order, which is exactly the lexicographic
/// order the trees require. The high bit of `timestamp` is the index-tree
/// tombstone bit, independent of the tombstone bit inside the record's own
/// timestamp.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CompositeKey<P: Payload> {
    pub payload: P,
    pub timestamp: u64,
}

impl<P: Payload> CompositeKey<P> {
    /// The key strictly greater than every live key.
    pub const SENTINEL: Self = Self {
        payload: P::MAX,
        timestamp: u64::MAX,
    };

    /// Pack a live entry. The timestamp must not carry the tombstone bit.
    pub fn new(payload: P, timestamp: u64) -> Self {
        debug_assert_eq!(
            timestamp & TIMESTAMP_TOMBSTONE_BIT,
            0,
            "live composite key built from a tombstone timestamp"
        );
        Self { payload, timestamp }
    }

    /// Whether this entry encodes a retraction.
    pub fn tombstone(&self) -> bool {
        self.timestamp & TIMESTAMP_TOMBSTONE_BIT != 0
    }
}

/// The [`Table`] implementation handed to index trees.
pub struct CompositeTable<P> {
    _payload: std::marker::PhantomData<P>,
}

impl<P: Payload> Table for CompositeTable<P> {
    type Key = CompositeKey<P>;
    type Value = CompositeKey<P>;

    fn key_from_value(value: &Self::Value) -> Self::Key {
        CompositeKey {
            payload: value.payload,
            timestamp: value.timestamp & !TIMESTAMP_TOMBSTONE_BIT,
        }
    }

    fn sentinel_key() -> Self::Key {
        CompositeKey::SENTINEL
    }

    fn tombstone(value: &Self::Value) -> bool {
        value.tombstone()
    }

    fn tombstone_from_key(key: Self::Key) -> Self::Value {
        CompositeKey {
            payload: key.payload,
            timestamp: key.timestamp | TIMESTAMP_TOMBSTONE_BIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn ordering_is_payload_then_timestamp() {
        let a = CompositeKey::new(1u64, 9);
        let b = CompositeKey::new(2u64, 1);
        let c = CompositeKey::new(2u64, 2);

        assert!(a < b);
        assert!(b < c);
        assert_eq!(
            <CompositeTable<u64> as Table>::compare_keys(&b, &c),
            Ordering::Less
        );
    }

    #[test]
    fn tombstone_round_trip_preserves_key() {
        let key = CompositeKey::new(7u128, 12);
        let dead = <CompositeTable<u128> as Table>::tombstone_from_key(key);

        assert!(dead.tombstone());
        assert_eq!(<CompositeTable<u128> as Table>::key_from_value(&dead), key);
    }

    #[test]
    fn sentinel_dominates_live_keys() {
        let near_max = CompositeKey::new(u64::MAX, u64::MAX & !TIMESTAMP_TOMBSTONE_BIT);
        assert!(CompositeKey::<u64>::SENTINEL > near_max);
    }
}
