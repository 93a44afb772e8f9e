use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::command::Slot;
use crate::entry::Entry;

/// The replicated log: a dense, mostly-append map from slot to [`Entry`].
///
/// The original source backs this with a `sync.Map` mutated from multiple
/// goroutines; this implementation keeps the log owned by the single
/// dispatcher-held `Paxos` instance (§5, §9 Design Notes) as a plain
/// `BTreeMap`, which additionally gives the phase-1 "uncommitted entries in
/// `[execute, slot]`" scan and the commutativity window scan ordered
/// iteration for free.
#[derive(Debug, Default)]
pub struct Log {
    entries: BTreeMap<Slot, Entry>,
}

impl Log {
    pub fn new() -> Self {
        Log { entries: BTreeMap::new() }
    }

    pub fn get(&self, slot: Slot) -> Option<&Entry> {
        self.entries.get(&slot)
    }

    pub fn get_mut(&mut self, slot: Slot) -> Option<&mut Entry> {
        self.entries.get_mut(&slot)
    }

    pub fn contains(&self, slot: Slot) -> bool {
        self.entries.contains_key(&slot)
    }

    pub fn insert(&mut self, slot: Slot, entry: Entry) {
        self.entries.insert(slot, entry);
    }

    pub fn entry_or_insert_with(&mut self, slot: Slot, default: impl FnOnce() -> Entry) -> &mut Entry {
        self.entries.entry(slot).or_insert_with(default)
    }

    /// Entries whose slot falls in `range`, in ascending slot order.
    pub fn range(&self, range: RangeInclusive<Slot>) -> impl Iterator<Item = (Slot, &Entry)> {
        self.entries.range(range).map(|(s, e)| (*s, e))
    }

    /// Scans slots from `high` down to `low` (inclusive) and returns the
    /// first entry whose command targets `key`, used by the read server's
    /// `serve_read` snapshot (spec §4.4).
    pub fn most_recent_touching<'a>(
        &'a self,
        high: Slot,
        low: Slot,
        key: &[u8],
    ) -> Option<(Slot, &'a Entry)> {
        let mut slot = high;
        while slot >= low {
            if let Some(entry) = self.entries.get(&slot) {
                if entry.command.key.as_ref() == key {
                    return Some((slot, entry));
                }
            }
            slot -= 1;
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The `slot -> {0,1,2}` hole/accept/committed map for the `Hole` reply
    /// header (spec §6): `0` for a slot this replica has no entry for at all,
    /// `1` for `Accept`, `2` for `Commit`/`Execute`.
    pub fn hole_map(&self, low: Slot, high: Slot) -> BTreeMap<Slot, u8> {
        let mut map = BTreeMap::new();
        let mut slot = low;
        while slot <= high {
            let code = match self.entries.get(&slot) {
                None => 0,
                Some(entry) if entry.is_committed() => 2,
                Some(_) => 1,
            };
            map.insert(slot, code);
            slot += 1;
        }
        map
    }
}
