use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Entry<T> {
    value: T,
    last_seen: Instant,
}

/// Per-session state that expires after `idle_ttl` without use. At most
/// `capacity` sessions are kept; the least recently used one makes room.
pub struct SessionStore<T> {
    entries: Arc<Mutex<HashMap<String, Entry<T>>>>,
    idle_ttl: Duration,
    capacity: usize,
}

impl<T> Clone for SessionStore<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            idle_ttl: self.idle_ttl,
            capacity: self.capacity,
        }
    }
}

impl<T> SessionStore<T> {
    pub fn new(idle_ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            idle_ttl,
            capacity: capacity.max(1),
        }
    }

    /// Runs `apply` on the session, creating it with `init` when it is absent
    /// or expired.
    pub fn upsert<R>(
        &self,
        key: &str,
        init: impl FnOnce() -> T,
        apply: impl FnOnce(&mut T) -> R,
    ) -> R {
        self.upsert_at(key, Instant::now(), init, apply)
    }

    fn upsert_at<R>(
        &self,
        key: &str,
        now: Instant,
        init: impl FnOnce() -> T,
        apply: impl FnOnce(&mut T) -> R,
    ) -> R {
        let mut entries = self.entries.lock();
        let live = entries
            .get(key)
            .is_some_and(|entry| !self.is_expired(entry, now));
        if !live {
            entries.remove(key);
            self.make_room(&mut entries, now);
        }

        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: init(),
            last_seen: now,
        });
        entry.last_seen = now;
        apply(&mut entry.value)
    }

    /// Runs `apply` on a live session. Expired sessions are dropped and
    /// reported as missing.
    pub fn with_existing<R>(&self, key: &str, apply: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.with_existing_at(key, Instant::now(), apply)
    }

    fn with_existing_at<R>(
        &self,
        key: &str,
        now: Instant,
        apply: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let mut entries = self.entries.lock();
        if entries
            .get(key)
            .is_some_and(|entry| self.is_expired(entry, now))
        {
            entries.remove(key);
            return None;
        }

        let entry = entries.get_mut(key)?;
        entry.last_seen = now;
        Some(apply(&mut entry.value))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn is_expired(&self, entry: &Entry<T>, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_seen) > self.idle_ttl
    }

    fn make_room(&self, entries: &mut HashMap<String, Entry<T>>, now: Instant) {
        entries.retain(|_, entry| !self.is_expired(entry, now));
        while entries.len() >= self.capacity {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            entries.remove(&oldest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(store: &SessionStore<u32>, key: &str, now: Instant) -> u32 {
        store.upsert_at(key, now, || 0, |count| {
            *count += 1;
            *count
        })
    }

    #[test]
    fn sessions_keep_state_between_calls() {
        let store = SessionStore::new(Duration::from_secs(60), 10);
        let start = Instant::now();
        assert_eq!(touch(&store, "a", start), 1);
        assert_eq!(touch(&store, "a", start + Duration::from_secs(5)), 2);
        assert_eq!(
            store.with_existing_at("a", start + Duration::from_secs(6), |count| *count),
            Some(2)
        );
        assert_eq!(store.with_existing_at("b", start, |count| *count), None);
    }

    #[test]
    fn idle_sessions_expire() {
        let store = SessionStore::new(Duration::from_secs(30), 10);
        let start = Instant::now();
        touch(&store, "a", start);
        touch(&store, "b", start + Duration::from_secs(20));

        let later = start + Duration::from_secs(45);
        assert_eq!(store.with_existing_at("a", later, |count| *count), None);
        assert_eq!(store.with_existing_at("b", later, |count| *count), Some(1));
        assert_eq!(touch(&store, "a", later), 1);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let store = SessionStore::new(Duration::from_secs(600), 2);
        let start = Instant::now();
        touch(&store, "a", start);
        touch(&store, "b", start + Duration::from_secs(1));
        touch(&store, "a", start + Duration::from_secs(2));
        touch(&store, "c", start + Duration::from_secs(3));

        assert_eq!(store.len(), 2);
        let now = start + Duration::from_secs(4);
        assert!(store.with_existing_at("b", now, |_| ()).is_none());
        assert!(store.with_existing_at("a", now, |_| ()).is_some());
        assert!(store.with_existing_at("c", now, |_| ()).is_some());
    }
}
