//! Window store: shared per-identifier rate limit state.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::record::CounterRecord;

/// Mapping from caller identifier to its current counting record.
///
/// Backed by a sharded concurrent map. Every state transition for a given
/// identifier happens under that identifier's entry lock, so two in-flight
/// checks for the same caller (or a check racing the sweeper) cannot
/// interleave on the same record.
#[derive(Debug, Default)]
pub struct WindowStore {
    records: DashMap<String, CounterRecord>,
}

impl WindowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Snapshot of the record for `identifier`, if one exists.
    pub fn get(&self, identifier: &str) -> Option<CounterRecord> {
        self.records.get(identifier).map(|record| *record)
    }

    /// Unconditionally insert or replace the record for `identifier`.
    pub fn put(&self, identifier: impl Into<String>, record: CounterRecord) {
        self.records.insert(identifier.into(), record);
    }

    /// Record one attempt for `identifier` and return the resulting state.
    ///
    /// This is the atomic create-or-increment transition behind `check`:
    /// an absent or expired record is replaced by a fresh one-hit record
    /// whose window ends at `now + window`, while a live record has its
    /// count incremented in place. The whole decision runs under the
    /// entry lock.
    pub fn record_hit(&self, identifier: &str, now: Instant, window: Duration) -> CounterRecord {
        use dashmap::mapref::entry::Entry;

        match self.records.entry(identifier.to_owned()) {
            Entry::Occupied(mut occupied) => {
                let record = occupied.get_mut();
                if record.is_expired(now) {
                    *record = CounterRecord::new(now, window);
                } else {
                    record.register_hit();
                }
                *record
            }
            Entry::Vacant(vacant) => *vacant.insert(CounterRecord::new(now, window)),
        }
    }

    /// Delete the record for `identifier` iff its window has passed.
    ///
    /// Returns whether a record was removed.
    pub fn remove_if_expired(&self, identifier: &str, now: Instant) -> bool {
        self.records
            .remove_if(identifier, |_, record| record.is_expired(now))
            .is_some()
    }

    /// All identifiers currently tracked.
    pub fn identifiers(&self) -> Vec<String> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of identifiers currently tracked.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(1);

    #[test]
    fn record_hit_creates_then_increments() {
        let store = WindowStore::new();
        let now = Instant::now();

        let first = store.record_hit("ip:1.2.3.4", now, WINDOW);
        assert_eq!(first.count(), 1);
        assert_eq!(first.window_expires_at(), now + WINDOW);

        let second = store.record_hit("ip:1.2.3.4", now, WINDOW);
        assert_eq!(second.count(), 2);
        assert_eq!(second.window_expires_at(), now + WINDOW);

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn record_hit_replaces_expired_record() {
        let store = WindowStore::new();
        let now = Instant::now();

        store.record_hit("ip:1.2.3.4", now, WINDOW);
        store.record_hit("ip:1.2.3.4", now, WINDOW);

        // First attempt after the window passes opens a fresh window
        let later = now + WINDOW;
        let fresh = store.record_hit("ip:1.2.3.4", later, WINDOW);
        assert_eq!(fresh.count(), 1);
        assert_eq!(fresh.window_expires_at(), later + WINDOW);
    }

    #[test]
    fn remove_if_expired_only_deletes_stale_records() {
        let store = WindowStore::new();
        let now = Instant::now();

        store.record_hit("ip:1.2.3.4", now, WINDOW);

        assert!(!store.remove_if_expired("ip:1.2.3.4", now));
        assert_eq!(store.len(), 1);

        assert!(store.remove_if_expired("ip:1.2.3.4", now + WINDOW));
        assert!(store.is_empty());

        // Removing an absent identifier is a no-op
        assert!(!store.remove_if_expired("ip:1.2.3.4", now + WINDOW));
    }

    #[test]
    fn put_replaces_unconditionally() {
        let store = WindowStore::new();
        let now = Instant::now();

        store.record_hit("ip:1.2.3.4", now, WINDOW);
        store.put("ip:1.2.3.4", CounterRecord::new(now, Duration::from_secs(5)));

        let record = store.get("ip:1.2.3.4").unwrap();
        assert_eq!(record.count(), 1);
        assert_eq!(record.window_expires_at(), now + Duration::from_secs(5));
    }

    #[test]
    fn identifiers_lists_all_tracked_callers() {
        let store = WindowStore::new();
        let now = Instant::now();

        store.record_hit("ip:a", now, WINDOW);
        store.record_hit("ip:b", now, WINDOW);

        let mut identifiers = store.identifiers();
        identifiers.sort();
        assert_eq!(identifiers, vec!["ip:a", "ip:b"]);
    }
}
