//! Arena-backed holder store.
//!
//! Holder records live in a contiguous `Vec` and are never removed, so a
//! record's position is a stable [`HolderId`]. The hash map only resolves
//! an address to its id. This keeps the eager distribution loop a linear
//! walk over one slice.
//!
//! The store counts record touches (reads of an existing record, writes,
//! and visits during iteration) so callers can observe how much per-holder
//! work an operation performed.

use std::cell::Cell;
use std::collections::HashMap;

/// Stable position of a holder inside the store.
pub type HolderId = usize;

/// Mapping from address to a per-holder record, without deletion.
#[derive(Debug, Clone)]
pub struct HolderStore<R> {
    addresses: Vec<String>,
    records: Vec<R>,
    ids: HashMap<String, HolderId>,
    touches: Cell<u64>,
}

impl<R> Default for HolderStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> HolderStore<R> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            addresses: Vec::new(),
            records: Vec::new(),
            ids: HashMap::new(),
            touches: Cell::new(0),
        }
    }

    /// Create an empty store with room for `capacity` holders.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            addresses: Vec::with_capacity(capacity),
            records: Vec::with_capacity(capacity),
            ids: HashMap::with_capacity(capacity),
            touches: Cell::new(0),
        }
    }

    /// Resolve an address to its id, if the holder exists.
    pub fn id_of(&self, address: &str) -> Option<HolderId> {
        self.ids.get(address).copied()
    }

    /// Borrow a holder's record without counting a touch.
    ///
    /// Used by read-only queries.
    pub fn get(&self, address: &str) -> Option<&R> {
        self.id_of(address).map(|id| &self.records[id])
    }

    /// Return whether a record exists for `address`.
    pub fn contains(&self, address: &str) -> bool {
        self.ids.contains_key(address)
    }

    /// Return a copy of the stored record, or `default()` if the address is
    /// unknown. Never inserts.
    pub fn get_or(&self, address: &str, default: impl FnOnce() -> R) -> R
    where
        R: Clone,
    {
        match self.id_of(address) {
            Some(id) => {
                self.touch(1);
                self.records[id].clone()
            }
            None => default(),
        }
    }

    /// Return a copy of the stored record, or a zero-initialized one.
    pub fn get_or_default(&self, address: &str) -> R
    where
        R: Clone + Default,
    {
        self.get_or(address, R::default)
    }

    /// Insert a record for `address`, or overwrite the existing one.
    ///
    /// Returns the holder's id.
    pub fn upsert(&mut self, address: &str, record: R) -> HolderId {
        self.touch(1);
        match self.id_of(address) {
            Some(id) => {
                self.records[id] = record;
                id
            }
            None => {
                let id = self.records.len();
                self.addresses.push(address.to_string());
                self.records.push(record);
                self.ids.insert(address.to_string(), id);
                id
            }
        }
    }

    /// Visit every record exactly once, in insertion order.
    pub fn for_each_mut(&mut self, mut visitor: impl FnMut(&str, &mut R)) {
        self.touch(self.records.len() as u64);
        for (address, record) in self.addresses.iter().zip(self.records.iter_mut()) {
            visitor(address, record);
        }
    }

    /// Iterate over `(address, record)` pairs without counting touches.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.addresses
            .iter()
            .map(String::as_str)
            .zip(self.records.iter())
    }

    /// Number of holders ever created.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Return whether no holder has been created yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total record touches since creation.
    pub fn touches(&self) -> u64 {
        self.touches.get()
    }

    fn touch(&self, count: u64) {
        self.touches.set(self.touches.get().saturating_add(count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Rec {
        value: u32,
    }

    #[test]
    fn test_get_or_default_does_not_insert() {
        let store: HolderStore<Rec> = HolderStore::new();
        assert_eq!(store.get_or_default("alice"), Rec::default());
        assert!(store.is_empty());
        assert!(!store.contains("alice"));
    }

    #[test]
    fn test_upsert_inserts_then_overwrites() {
        let mut store = HolderStore::new();
        let first = store.upsert("alice", Rec { value: 1 });
        let second = store.upsert("alice", Rec { value: 7 });
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("alice"), Some(&Rec { value: 7 }));
    }

    #[test]
    fn test_ids_are_stable_and_dense() {
        let mut store = HolderStore::new();
        assert_eq!(store.upsert("a", Rec { value: 1 }), 0);
        assert_eq!(store.upsert("b", Rec { value: 2 }), 1);
        assert_eq!(store.upsert("a", Rec { value: 3 }), 0);
        assert_eq!(store.id_of("b"), Some(1));
        assert_eq!(store.id_of("c"), None);
    }

    #[test]
    fn test_for_each_mut_visits_every_record_once() {
        let mut store = HolderStore::new();
        for (i, addr) in ["a", "b", "c"].iter().enumerate() {
            store.upsert(addr, Rec { value: i as u32 });
        }
        let mut seen = Vec::new();
        store.for_each_mut(|addr, rec| {
            seen.push(addr.to_string());
            rec.value += 10;
        });
        assert_eq!(seen, vec!["a", "b", "c"]);
        let values: Vec<u32> = store.iter().map(|(_, r)| r.value).collect();
        assert_eq!(values, vec![10, 11, 12]);
    }

    #[test]
    fn test_touch_counting() {
        let mut store = HolderStore::new();
        store.upsert("a", Rec { value: 1 });
        store.upsert("b", Rec { value: 2 });
        assert_eq!(store.touches(), 2);

        let _ = store.get_or_default("a");
        assert_eq!(store.touches(), 3);

        // Misses, plain gets, and iteration are free.
        let _ = store.get_or_default("zzz");
        let _ = store.get("a");
        let _ = store.iter().count();
        assert_eq!(store.touches(), 3);

        store.for_each_mut(|_, _| {});
        assert_eq!(store.touches(), 5);
    }

    #[test]
    fn test_many_keys() {
        let mut store = HolderStore::with_capacity(10_000);
        for i in 0..10_000u32 {
            store.upsert(&i.to_string(), Rec { value: i });
        }
        assert_eq!(store.len(), 10_000);
        assert_eq!(store.get("9999"), Some(&Rec { value: 9999 }));
    }
}
