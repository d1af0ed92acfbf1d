//! Sharded string interner.
//!
//! One interner serves the whole process so that names survive crossing
//! worker threads and can be rendered without carrying an interner around.
//! Strings are leaked on first insertion and never freed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::Name;

/// Per-shard storage for interned strings.
struct InternShard {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

impl InternShard {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        }
    }

    fn with_empty() -> Self {
        let mut shard = Self::new();
        let empty: &'static str = "";
        shard.map.insert(empty, 0);
        shard.strings.push(empty);
        shard
    }
}

/// Sharded string interner for concurrent access.
pub struct StringInterner {
    shards: [RwLock<InternShard>; Name::NUM_SHARDS],
    total_count: AtomicUsize,
}

static GLOBAL: OnceLock<StringInterner> = OnceLock::new();

/// The process-wide interner.
pub fn interner() -> &'static StringInterner {
    GLOBAL.get_or_init(StringInterner::new)
}

impl StringInterner {
    fn new() -> Self {
        let shards = std::array::from_fn(|i| {
            if i == 0 {
                RwLock::new(InternShard::with_empty())
            } else {
                RwLock::new(InternShard::new())
            }
        });
        Self {
            shards,
            total_count: AtomicUsize::new(1),
        }
    }

    #[inline]
    fn shard_for(s: &str) -> usize {
        let mut hash = 0u32;
        for byte in s.bytes().take(8) {
            hash = hash.wrapping_mul(31).wrapping_add(u32::from(byte));
        }
        (hash as usize) % Name::NUM_SHARDS
    }

    /// Intern a string, returning its `Name`.
    pub fn intern(&self, s: &str) -> Name {
        if let Some(name) = self.find(s) {
            return name;
        }
        self.insert(s.to_owned())
    }

    /// Intern an owned string without re-allocating it.
    pub fn intern_owned(&self, s: String) -> Name {
        if let Some(name) = self.find(&s) {
            return name;
        }
        self.insert(s)
    }

    fn find(&self, s: &str) -> Option<Name> {
        let shard_idx = Self::shard_for(s);
        let guard = self.shards[shard_idx].read();
        guard
            .map
            .get(s)
            .map(|&local| Name::from_parts(shard_idx as u32, local))
    }

    fn insert(&self, s: String) -> Name {
        let shard_idx = Self::shard_for(&s);
        let mut guard = self.shards[shard_idx].write();

        // Another thread may have won the race between `find` and here.
        if let Some(&local) = guard.map.get(s.as_str()) {
            return Name::from_parts(shard_idx as u32, local);
        }

        let leaked: &'static str = Box::leak(s.into_boxed_str());
        let local = u32::try_from(guard.strings.len())
            .ok()
            .filter(|local| *local <= Name::MAX_LOCAL)
            .unwrap_or_else(|| panic!("interner shard {shard_idx} exceeded capacity"));
        guard.strings.push(leaked);
        guard.map.insert(leaked, local);
        self.total_count.fetch_add(1, Ordering::Relaxed);

        Name::from_parts(shard_idx as u32, local)
    }

    /// Look up the text for a `Name`.
    pub fn lookup(&self, name: Name) -> &'static str {
        let guard = self.shards[name.shard()].read();
        guard.strings.get(name.local()).copied().unwrap_or("")
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.total_count.load(Ordering::Relaxed)
    }

    /// Always false: the empty string is pre-interned.
    pub fn is_empty(&self) -> bool {
        false
    }
}
