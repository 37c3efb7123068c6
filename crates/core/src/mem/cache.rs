//! Set-associative cache primitive.
//!
//! Generic tag-to-value store with N sets x W ways, LRU replacement by
//! monotone stamp, dirty tracking, and write-back eviction. Every cache in
//! the simulator (TLBs, page-walk caches, data caches) is an instance of
//! this structure with its own tag derivation on top.
//!
//! Dirty evictions are surfaced as a return value from [`insert`] instead of
//! a callback: the owner of the hierarchy forwards the victim to the next
//! level. Clean victims are dropped silently.
//!
//! [`insert`]: SetAssociativeCache::insert

/// Tag types usable with [`SetAssociativeCache`].
///
/// `set_index` maps a tag to its set. The set count is validated as a power
/// of two at construction, so the mask form below is exact.
pub trait Tag: Copy + Eq + Default {
    /// Index of the set this tag lives in. `num_sets` is a power of two.
    fn set_index(self, num_sets: usize) -> usize;
}

impl Tag for u64 {
    #[inline(always)]
    fn set_index(self, num_sets: usize) -> usize {
        (self & (num_sets as u64 - 1)) as usize
    }
}

/// One way of one set.
#[derive(Clone, Default)]
pub(crate) struct CacheEntry<T, V> {
    pub(crate) tag: T,
    pub(crate) value: V,
    pub(crate) valid: bool,
    pub(crate) dirty: bool,
    /// Stamp from the per-cache monotone counter; only meaningful when valid.
    pub(crate) lru_stamp: u64,
}

/// A dirty victim displaced by an insert, to be written back one level down.
pub struct EvictedEntry<T, V> {
    /// Tag of the displaced block, in the evicting cache's tag space.
    pub tag: T,
    /// The displaced value.
    pub value: V,
}

/// Set-associative cache with LRU replacement and write-back dirty tracking.
pub struct SetAssociativeCache<T, V> {
    name: String,
    num_sets: usize,
    num_ways: usize,
    entries: Vec<CacheEntry<T, V>>,
    lru_counter: u64,
    accesses: u64,
    hits: u64,
}

impl<T: Tag, V: Default> SetAssociativeCache<T, V> {
    /// Creates a cache of `num_sets` x `num_ways` invalid entries.
    ///
    /// # Arguments
    ///
    /// * `name` - Cache name used in reports.
    /// * `num_sets` - Number of sets; must be a power of two.
    /// * `num_ways` - Associativity; must be nonzero.
    ///
    /// # Panics
    ///
    /// Debug builds assert the geometry constraints above. Release builds
    /// will not panic: every constructor call site passes geometry already
    /// checked by `Config::validate`.
    pub fn new(name: &str, num_sets: u64, num_ways: u64) -> Self {
        debug_assert!(num_sets.is_power_of_two());
        debug_assert!(num_ways > 0);
        let total = (num_sets * num_ways) as usize;
        let mut entries = Vec::with_capacity(total);
        entries.resize_with(total, CacheEntry::default);
        Self {
            name: name.to_string(),
            num_sets: num_sets as usize,
            num_ways: num_ways as usize,
            entries,
            lru_counter: 0,
            accesses: 0,
            hits: 0,
        }
    }

    /// Looks up `tag`, refreshing its LRU stamp on a hit.
    ///
    /// Counts one access, and one hit when found. Does not modify the
    /// stored mapping.
    ///
    /// # Returns
    ///
    /// A reference to the stored value when a valid way holds the tag,
    /// `None` otherwise.
    pub fn lookup(&mut self, tag: T) -> Option<&V> {
        self.accesses += 1;
        let set = tag.set_index(self.num_sets);
        if let Some(way) = self.find_way(set, tag) {
            self.hits += 1;
            self.touch(set, way);
            return Some(&self.entries[set * self.num_ways + way].value);
        }
        None
    }

    /// Inserts or updates the mapping for `tag`.
    ///
    /// If a valid way already holds the tag, its value is overwritten and
    /// the dirty bit is set when `is_write`. Otherwise the victim is the
    /// first invalid way, else the way with the minimum LRU stamp (lowest
    /// index wins ties).
    ///
    /// # Arguments
    ///
    /// * `tag` - Tag to install or refresh.
    /// * `value` - Value stored under the tag.
    /// * `is_write` - Marks the entry dirty (write-allocate).
    ///
    /// # Returns
    ///
    /// The displaced entry when it was valid and dirty, for write-back one
    /// level down. Clean victims are dropped silently and yield `None`.
    pub fn insert(&mut self, tag: T, value: V, is_write: bool) -> Option<EvictedEntry<T, V>> {
        let set = tag.set_index(self.num_sets);

        if let Some(way) = self.find_way(set, tag) {
            let entry = &mut self.entries[set * self.num_ways + way];
            entry.value = value;
            if is_write {
                entry.dirty = true;
            }
            self.touch(set, way);
            return None;
        }

        let way = self.victim_way(set);
        let idx = set * self.num_ways + way;
        let fresh = CacheEntry {
            tag,
            value,
            valid: true,
            dirty: is_write,
            lru_stamp: 0,
        };
        let old = std::mem::replace(&mut self.entries[idx], fresh);
        self.touch(set, way);

        if old.valid && old.dirty {
            return Some(EvictedEntry {
                tag: old.tag,
                value: old.value,
            });
        }
        None
    }

    /// Finds the way holding a valid entry for `tag` in `set`.
    pub(crate) fn find_way(&self, set: usize, tag: T) -> Option<usize> {
        let base = set * self.num_ways;
        (0..self.num_ways)
            .find(|&way| self.entries[base + way].valid && self.entries[base + way].tag == tag)
    }

    /// Victim selection: first invalid way, else minimum LRU stamp.
    pub(crate) fn victim_way(&self, set: usize) -> usize {
        let base = set * self.num_ways;
        let mut victim = 0;
        let mut min_stamp = self.entries[base].lru_stamp;
        for way in 0..self.num_ways {
            let entry = &self.entries[base + way];
            if !entry.valid {
                return way;
            }
            if entry.lru_stamp < min_stamp {
                min_stamp = entry.lru_stamp;
                victim = way;
            }
        }
        victim
    }

    /// Assigns a fresh LRU stamp to `(set, way)`.
    pub(crate) fn touch(&mut self, set: usize, way: usize) {
        self.lru_counter += 1;
        self.entries[set * self.num_ways + way].lru_stamp = self.lru_counter;
    }

    pub(crate) fn entry(&self, set: usize, way: usize) -> &CacheEntry<T, V> {
        &self.entries[set * self.num_ways + way]
    }

    pub(crate) fn entry_mut(&mut self, set: usize, way: usize) -> &mut CacheEntry<T, V> {
        &mut self.entries[set * self.num_ways + way]
    }

    /// Counts an access performed outside [`lookup`](Self::lookup) (TOC-mode
    /// sub-slot lookups manage their own counters).
    pub(crate) fn record_access(&mut self) {
        self.accesses += 1;
    }

    /// Counts a hit performed outside [`lookup`](Self::lookup).
    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Total LRU stamps handed out; doubles as a warm-up measure.
    pub(crate) fn stamp_count(&self) -> u64 {
        self.lru_counter
    }

    /// Cache name for reporting.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of sets.
    pub fn num_sets(&self) -> u64 {
        self.num_sets as u64
    }

    /// Associativity.
    pub fn num_ways(&self) -> u64 {
        self.num_ways as u64
    }

    /// Total entry capacity.
    pub fn capacity(&self) -> u64 {
        (self.num_sets * self.num_ways) as u64
    }

    /// Lookups performed.
    pub fn accesses(&self) -> u64 {
        self.accesses
    }

    /// Lookups that hit.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Hit rate in [0, 1]; zero when never accessed.
    pub fn hit_rate(&self) -> f64 {
        if self.accesses > 0 {
            self.hits as f64 / self.accesses as f64
        } else {
            0.0
        }
    }
}
