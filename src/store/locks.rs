use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// In-process advisory locks keyed by record identifier.
///
/// Renames and deletes of the same run serialize on its lock; listings never
/// take one and may observe a slightly stale snapshot.
#[derive(Debug, Default)]
pub struct IdLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` while holding the lock for `id`.
    pub fn with_lock<T>(&self, id: &str, action: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());
            Arc::clone(slots.entry(id.to_string()).or_default())
        };
        let result = {
            let _held = slot.lock().unwrap_or_else(|err| err.into_inner());
            action()
        };
        let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());
        // Two references left means only the map and this call know the slot.
        if Arc::strong_count(&slot) == 2 {
            slots.remove(id);
        }
        result
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_id_serializes_and_slots_are_released() {
        let locks = Arc::new(IdLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));
        let handles = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let active = Arc::clone(&active);
                let overlap = Arc::clone(&overlap);
                thread::spawn(move || {
                    locks.with_lock("1700000000", || {
                        if active.fetch_add(1, Ordering::SeqCst) > 0 {
                            overlap.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::sleep(Duration::from_millis(5));
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
        assert_eq!(locks.tracked(), 0);
    }
}
