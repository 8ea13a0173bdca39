//! Generational handle registry.
//!
//! Every host reference the guest holds (a variant, a string, an array, an
//! object pointer, ...) lives in one slot of this table. A [`Handle`] is a
//! flat index plus the slot's generation at insertion time; ending a handle
//! bumps the generation, so any copy of the old handle is detected as cycled
//! instead of reading whatever reuses the slot.
//!
//! The registry never calls the host. Releasing the host reference that an
//! ended entry carried is the caller's job, after the lock is gone, so a host
//! destructor that re-enters the registry cannot deadlock.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tether_sys::{RawWire, WireForm, WireKind};

/// Registry-issued reference to a host value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Slot index
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation the handle was issued at
    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// Whether ending a handle obliges the guest to release the host reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Ownership {
    /// We hold a host reference and must release or transfer it.
    Owned,
    /// The host lent us the reference for the duration of a call.
    Borrowed,
}

/// What an ended handle was holding.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Released {
    pub kind: WireKind,
    pub wire: RawWire,
    pub ownership: Ownership,
}

/// Counters used to check handle balance.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct RegistryStats {
    /// Owned handles currently live
    pub live_owned: usize,
    /// Borrowed handles currently live
    pub live_borrowed: usize,
    /// Borrowed handles ever inserted
    pub acquired_borrowed: u64,
    /// Borrowed handles ever ended
    pub released_borrowed: u64,
    /// Reads or ends through a cycled handle
    pub cycled_uses: u64,
}

#[derive(Clone, Copy)]
struct Live {
    kind: WireKind,
    wire: RawWire,
    ownership: Ownership,
}

struct Entry {
    generation: u32,
    live: Option<Live>,
}

struct Table {
    entries: Vec<Entry>,
    free: Vec<u32>,
    stats: RegistryStats,
}

impl Table {
    fn lookup(&self, handle: Handle) -> Option<&Live> {
        self.entries
            .get(handle.index as usize)
            .filter(|e| e.generation == handle.generation)
            .and_then(|e| e.live.as_ref())
    }

    fn remove(&mut self, handle: Handle) -> Option<Released> {
        let entry = self.entries.get_mut(handle.index as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        let live = entry.live.take()?;

        // A slot whose generation would wrap is retired rather than reused.
        if let Some(next) = entry.generation.checked_add(1) {
            entry.generation = next;
            self.free.push(handle.index);
        }

        match live.ownership {
            Ownership::Owned => self.stats.live_owned -= 1,
            Ownership::Borrowed => {
                self.stats.live_borrowed -= 1;
                self.stats.released_borrowed += 1;
            }
        }

        Some(Released {
            kind: live.kind,
            wire: live.wire,
            ownership: live.ownership,
        })
    }
}

/// Process-wide (or runtime-wide) table of live handles.
pub struct HandleRegistry {
    table: Mutex<Table>,
    report_leaks: bool,
}

impl HandleRegistry {
    /// Create a registry with room for `capacity` slots before growing.
    pub fn new(capacity: usize, report_leaks: bool) -> Self {
        Self {
            table: Mutex::new(Table {
                entries: Vec::with_capacity(capacity),
                free: Vec::new(),
                stats: RegistryStats::default(),
            }),
            report_leaks,
        }
    }

    /// Store `wire` under a fresh slot.
    pub fn insert(&self, kind: WireKind, wire: RawWire, ownership: Ownership) -> Handle {
        let mut table = self.table.lock();
        match ownership {
            Ownership::Owned => table.stats.live_owned += 1,
            Ownership::Borrowed => {
                table.stats.live_borrowed += 1;
                table.stats.acquired_borrowed += 1;
            }
        }

        let live = Some(Live {
            kind,
            wire,
            ownership,
        });

        if let Some(index) = table.free.pop() {
            let entry = &mut table.entries[index as usize];
            entry.live = live;
            Handle {
                index,
                generation: entry.generation,
            }
        } else {
            let index = table.entries.len() as u32;
            table.entries.push(Entry {
                generation: 0,
                live,
            });
            Handle {
                index,
                generation: 0,
            }
        }
    }

    /// Wire form behind a live handle. A cycled handle logs and misses.
    pub fn get(&self, handle: Handle) -> Option<RawWire> {
        let mut table = self.table.lock();
        match table.lookup(handle) {
            Some(live) => Some(live.wire),
            None => {
                table.stats.cycled_uses += 1;
                drop(table);
                log::warn!("use of cycled handle {:?}", handle);
                None
            }
        }
    }

    /// Typed read-only projection for passing to the host without
    /// transferring ownership. A cycled handle projects to the zero wire.
    pub fn pack<W: WireForm>(&self, handle: Handle) -> W {
        W::from_raw(self.get(handle).unwrap_or_default())
    }

    /// Kind of the value behind a live handle.
    pub fn kind(&self, handle: Handle) -> Option<WireKind> {
        self.table.lock().lookup(handle).map(|live| live.kind)
    }

    /// End a handle and hand back what it held. A second `end` of the same
    /// handle logs and returns `None`.
    pub fn end(&self, handle: Handle) -> Option<Released> {
        let mut table = self.table.lock();
        let released = table.remove(handle);
        if released.is_none() {
            table.stats.cycled_uses += 1;
            drop(table);
            log::warn!("end of cycled handle {:?}", handle);
        }
        released
    }

    /// End a handle if it is still live, without complaint if it is not.
    ///
    /// Used by drop glue and scope cleanup, where an earlier explicit end is
    /// legitimate.
    pub fn take(&self, handle: Handle) -> Option<Released> {
        self.table.lock().remove(handle)
    }

    /// Whether the handle still names a live slot.
    pub fn is_live(&self, handle: Handle) -> bool {
        self.table.lock().lookup(handle).is_some()
    }

    /// Snapshot of the balance counters.
    pub fn stats(&self) -> RegistryStats {
        self.table.lock().stats
    }
}

impl Drop for HandleRegistry {
    fn drop(&mut self) {
        if !self.report_leaks {
            return;
        }
        let table = self.table.get_mut();
        let mut leaked: FxHashMap<WireKind, usize> = FxHashMap::default();
        for live in table.entries.iter().filter_map(|e| e.live.as_ref()) {
            if live.ownership == Ownership::Owned {
                *leaked.entry(live.kind).or_default() += 1;
            }
        }
        for (kind, count) in leaked {
            log::warn!("{} owned {:?} handle(s) leaked", count, kind);
        }
    }
}

impl std::fmt::Debug for HandleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(word: u64) -> RawWire {
        RawWire([word, 0, 0])
    }

    #[test]
    fn test_insert_get_end() {
        let reg = HandleRegistry::new(4, false);
        let h = reg.insert(WireKind::String, raw(7), Ownership::Owned);
        assert_eq!(reg.get(h), Some(raw(7)));
        assert_eq!(reg.kind(h), Some(WireKind::String));

        let released = reg.end(h).unwrap();
        assert_eq!(released.wire, raw(7));
        assert_eq!(released.ownership, Ownership::Owned);

        assert!(!reg.is_live(h));
        assert_eq!(reg.get(h), None);
        assert_eq!(reg.stats().cycled_uses, 1);
    }

    #[test]
    fn test_end_is_idempotent() {
        let reg = HandleRegistry::new(4, false);
        let h = reg.insert(WireKind::Array, raw(1), Ownership::Owned);
        assert!(reg.end(h).is_some());
        assert!(reg.end(h).is_none());
        assert!(reg.take(h).is_none());
        assert_eq!(reg.stats().live_owned, 0);
    }

    #[test]
    fn test_reused_slot_rejects_stale_handle() {
        let reg = HandleRegistry::new(4, false);
        let old = reg.insert(WireKind::Array, raw(1), Ownership::Owned);
        reg.end(old);
        let new = reg.insert(WireKind::Array, raw(2), Ownership::Owned);

        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert_eq!(reg.get(old), None);
        assert_eq!(reg.get(new), Some(raw(2)));
    }

    #[test]
    fn test_pack_cycled_is_zero() {
        let reg = HandleRegistry::new(4, false);
        let h = reg.insert(WireKind::Variant, RawWire([1, 2, 3]), Ownership::Owned);
        let packed: tether_sys::VariantWire = reg.pack(h);
        assert_eq!(packed.0, [1, 2, 3]);
        reg.end(h);
        let packed: tether_sys::VariantWire = reg.pack(h);
        assert!(packed.is_null());
    }

    #[test]
    fn test_borrow_balance_counters() {
        let reg = HandleRegistry::new(4, false);
        let a = reg.insert(WireKind::Variant, raw(1), Ownership::Borrowed);
        let b = reg.insert(WireKind::String, raw(2), Ownership::Borrowed);
        assert_eq!(reg.stats().live_borrowed, 2);

        reg.take(b);
        reg.take(a);
        let stats = reg.stats();
        assert_eq!(stats.acquired_borrowed, 2);
        assert_eq!(stats.released_borrowed, 2);
        assert_eq!(stats.live_borrowed, 0);
    }
}
