//! Transposition table: a lock-free, always-replace-with-aging hashed store
//! of search results.
//!
//! Each slot packs a position hash (as an XOR verification tag) and a 16-byte
//! payload into two `AtomicU64`s: a slot decodes as valid only if
//! `hash_xor XOR payload == hash`. A torn concurrent write changes one half of
//! the pair without the other, so it simply fails verification instead of
//! returning garbage — no per-bucket locking is needed.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::SyncSender;

use crate::board::Move;

/// Bound recorded for a stored score. `NOTVALID` is represented by the
/// absence of a matching slot rather than as a variant here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

impl Bound {
    const fn to_bits(self) -> u64 {
        match self {
            Bound::Exact => 1,
            Bound::Lower => 2,
            Bound::Upper => 3,
        }
    }

    const fn from_bits(bits: u64) -> Option<Bound> {
        match bits {
            1 => Some(Bound::Exact),
            2 => Some(Bound::Lower),
            3 => Some(Bound::Upper),
            _ => None,
        }
    }
}

/// One decoded transposition entry.
#[derive(Clone, Copy, Debug)]
pub struct TTEntry {
    pub bound: Bound,
    pub depth: u32,
    pub score: i32,
    pub mv: Move,
    pub age: u8,
    pub is_remote: bool,
}

impl TTEntry {
    #[must_use]
    pub fn best_move(&self) -> Option<Move> {
        if self.mv == Move::null() {
            None
        } else {
            Some(self.mv)
        }
    }
}

// Payload bit layout (64 bits, 48 used):
//   [0..16)   move, packed u16
//   [16..32)  score, as the u16 bit pattern of an i16
//   [32..34)  flags (bound), 2 bits
//   [34..40)  age, 6 bits
//   [40..47)  depth, 7 bits (0..=127)
//   [47]      is_remote
const MOVE_SHIFT: u32 = 0;
const SCORE_SHIFT: u32 = 16;
const FLAGS_SHIFT: u32 = 32;
const AGE_SHIFT: u32 = 34;
const DEPTH_SHIFT: u32 = 40;
const REMOTE_SHIFT: u32 = 47;

const AGE_MASK: u64 = 0x3F;
const DEPTH_MASK: u64 = 0x7F;

fn pack(bound: Bound, depth: u32, score: i32, mv: Move, age: u8, is_remote: bool) -> u64 {
    let mv_bits = u64::from(mv.as_u16());
    let score_bits = u64::from((score.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16) as u16);
    let flags_bits = bound.to_bits();
    let age_bits = u64::from(age) & AGE_MASK;
    let depth_bits = u64::from(depth.min(127)) & DEPTH_MASK;
    let remote_bit = u64::from(is_remote);
    (mv_bits << MOVE_SHIFT)
        | (score_bits << SCORE_SHIFT)
        | (flags_bits << FLAGS_SHIFT)
        | (age_bits << AGE_SHIFT)
        | (depth_bits << DEPTH_SHIFT)
        | (remote_bit << REMOTE_SHIFT)
}

fn unpack(payload: u64) -> Option<TTEntry> {
    let flags_bits = (payload >> FLAGS_SHIFT) & 0x3;
    let bound = Bound::from_bits(flags_bits)?;
    let mv = Move::from_u16(((payload >> MOVE_SHIFT) & 0xFFFF) as u16);
    let score = (((payload >> SCORE_SHIFT) & 0xFFFF) as u16) as i16;
    let age = ((payload >> AGE_SHIFT) & AGE_MASK) as u8;
    let depth = ((payload >> DEPTH_SHIFT) & DEPTH_MASK) as u32;
    let is_remote = (payload >> REMOTE_SHIFT) & 1 != 0;
    Some(TTEntry {
        bound,
        depth,
        score: i32::from(score),
        mv,
        age,
        is_remote,
    })
}

fn payload_age(payload: u64) -> u8 {
    if payload == 0 {
        0
    } else {
        ((payload >> AGE_SHIFT) & AGE_MASK) as u8
    }
}

fn payload_depth(payload: u64) -> u32 {
    if payload == 0 {
        0
    } else {
        ((payload >> DEPTH_SHIFT) & DEPTH_MASK) as u32
    }
}

fn with_age(payload: u64, age: u8) -> u64 {
    (payload & !(AGE_MASK << AGE_SHIFT)) | (u64::from(age) & AGE_MASK) << AGE_SHIFT
}

struct Slot {
    hash_xor: AtomicU64,
    payload: AtomicU64,
}

impl Slot {
    fn new() -> Self {
        Slot {
            hash_xor: AtomicU64::new(0),
            payload: AtomicU64::new(0),
        }
    }
}

/// Raw 16-byte wire representation of one slot, used by the replicator.
#[derive(Clone, Copy, Debug)]
pub struct RawEntry {
    pub hash_xor: u64,
    pub payload: u64,
}

impl RawEntry {
    #[must_use]
    pub fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..8].copy_from_slice(&self.hash_xor.to_le_bytes());
        out[8..16].copy_from_slice(&self.payload.to_le_bytes());
        out
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 16 {
            return None;
        }
        let hash_xor = u64::from_le_bytes(bytes[0..8].try_into().ok()?);
        let payload = u64::from_le_bytes(bytes[8..16].try_into().ok()?);
        Some(RawEntry { hash_xor, payload })
    }
}

const BUCKET_SIZE: usize = 8;

struct Bucket {
    slots: [Slot; BUCKET_SIZE],
}

impl Bucket {
    fn new() -> Self {
        Bucket {
            slots: std::array::from_fn(|_| Slot::new()),
        }
    }
}

/// Snapshot of lookup/store counters, partitioned by flag and provenance.
#[derive(Clone, Copy, Debug, Default)]
pub struct TTStats {
    pub lookups_hit: u64,
    pub lookups_miss: u64,
    pub stores_exact: u64,
    pub stores_lower: u64,
    pub stores_upper: u64,
    pub stores_remote: u64,
    pub replication_drops: u64,
}

struct Counters {
    lookups_hit: AtomicU64,
    lookups_miss: AtomicU64,
    stores_exact: AtomicU64,
    stores_lower: AtomicU64,
    stores_upper: AtomicU64,
    stores_remote: AtomicU64,
    replication_drops: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Counters {
            lookups_hit: AtomicU64::new(0),
            lookups_miss: AtomicU64::new(0),
            stores_exact: AtomicU64::new(0),
            stores_lower: AtomicU64::new(0),
            stores_upper: AtomicU64::new(0),
            stores_remote: AtomicU64::new(0),
            replication_drops: AtomicU64::new(0),
        }
    }
}

/// Lock-free, always-replace-with-aging transposition table.
///
/// Shared across Lazy-SMP worker threads via plain reference (all mutation
/// goes through atomics); see §5 of the design — no per-bucket locks.
pub struct TranspositionTable {
    buckets: Vec<Bucket>,
    mask: usize,
    current_age: AtomicU8,
    counters: Counters,
    replicate_tx: Option<SyncSender<RawEntry>>,
}

fn bucket_count_for(size_mb: usize) -> usize {
    let bucket_bytes = std::mem::size_of::<Bucket>();
    let requested = (size_mb.max(1) * 1024 * 1024) / bucket_bytes.max(1);
    requested.next_power_of_two().max(1)
}

impl TranspositionTable {
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        Self::with_replication(size_mb, None)
    }

    #[must_use]
    pub fn with_replication(size_mb: usize, replicate_tx: Option<SyncSender<RawEntry>>) -> Self {
        let num_buckets = bucket_count_for(size_mb);
        let mut buckets = Vec::with_capacity(num_buckets);
        for _ in 0..num_buckets {
            buckets.push(Bucket::new());
        }
        TranspositionTable {
            buckets,
            mask: num_buckets - 1,
            current_age: AtomicU8::new(0),
            counters: Counters::new(),
            replicate_tx,
        }
    }

    fn index(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }

    /// Look up a position. Refreshes the matching slot's age to current as a
    /// side effect, and is transparent to torn concurrent writes: either the
    /// XOR tag verifies against a complete prior write, or nothing is found.
    #[must_use]
    pub fn probe(&self, hash: u64) -> Option<TTEntry> {
        let bucket = &self.buckets[self.index(hash)];
        for slot in &bucket.slots {
            let hash_xor = slot.hash_xor.load(Ordering::Relaxed);
            let payload = slot.payload.load(Ordering::Relaxed);
            if payload == 0 {
                continue;
            }
            if hash_xor ^ payload != hash {
                continue;
            }
            let Some(entry) = unpack(payload) else { continue };
            let cur_age = self.current_age.load(Ordering::Relaxed);
            if entry.age != cur_age {
                let refreshed = with_age(payload, cur_age);
                slot.payload.store(refreshed, Ordering::Relaxed);
                slot.hash_xor.store(hash ^ refreshed, Ordering::Relaxed);
            }
            self.counters.lookups_hit.fetch_add(1, Ordering::Relaxed);
            return Some(entry);
        }
        self.counters.lookups_miss.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Prefetch hook, matching the call sites in the search kernel. There is
    /// no portable prefetch intrinsic in stable Rust; this is a no-op.
    pub fn prefetch(&self, _hash: u64) {}

    /// Store a result. Replacement follows the five-step policy: refresh a
    /// deeper or equal-quality same-hash slot in place, otherwise overwrite a
    /// stale-age slot, otherwise overwrite the minimum-depth same-age slot.
    ///
    /// `emit` requests replication: an `EXACT` store with `emit=true` and a
    /// configured replicator is enqueued onto the bounded replication queue.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        hash: u64,
        bound: Bound,
        depth: u32,
        score: i32,
        mv: Move,
        emit: bool,
        is_remote: bool,
    ) {
        let cur_age = self.current_age.load(Ordering::Relaxed);
        let new_payload = pack(bound, depth, score, mv, cur_age, is_remote);
        let bucket = &self.buckets[self.index(hash)];

        for slot in &bucket.slots {
            let hash_xor = slot.hash_xor.load(Ordering::Relaxed);
            let payload = slot.payload.load(Ordering::Relaxed);
            if payload == 0 || hash_xor ^ payload != hash {
                continue;
            }
            let Some(existing) = unpack(payload) else { continue };
            if existing.depth > depth || (existing.depth == depth && bound != Bound::Exact) {
                let refreshed = with_age(payload, cur_age);
                slot.payload.store(refreshed, Ordering::Relaxed);
                slot.hash_xor.store(hash ^ refreshed, Ordering::Relaxed);
            } else {
                slot.payload.store(new_payload, Ordering::Relaxed);
                slot.hash_xor.store(hash ^ new_payload, Ordering::Relaxed);
            }
            self.record_store(bound, is_remote);
            self.maybe_emit(hash, new_payload, bound, emit);
            return;
        }

        for slot in &bucket.slots {
            let payload = slot.payload.load(Ordering::Relaxed);
            if payload_age(payload) != cur_age {
                slot.payload.store(new_payload, Ordering::Relaxed);
                slot.hash_xor.store(hash ^ new_payload, Ordering::Relaxed);
                self.record_store(bound, is_remote);
                self.maybe_emit(hash, new_payload, bound, emit);
                return;
            }
        }

        let mut min_idx = 0;
        let mut min_depth = u32::MAX;
        for (i, slot) in bucket.slots.iter().enumerate() {
            let payload = slot.payload.load(Ordering::Relaxed);
            let depth_here = payload_depth(payload);
            if depth_here < min_depth {
                min_depth = depth_here;
                min_idx = i;
            }
        }
        bucket.slots[min_idx]
            .payload
            .store(new_payload, Ordering::Relaxed);
        bucket.slots[min_idx]
            .hash_xor
            .store(hash ^ new_payload, Ordering::Relaxed);
        self.record_store(bound, is_remote);
        self.maybe_emit(hash, new_payload, bound, emit);
    }

    fn record_store(&self, bound: Bound, is_remote: bool) {
        if is_remote {
            self.counters.stores_remote.fetch_add(1, Ordering::Relaxed);
            return;
        }
        match bound {
            Bound::Exact => self.counters.stores_exact.fetch_add(1, Ordering::Relaxed),
            Bound::Lower => self.counters.stores_lower.fetch_add(1, Ordering::Relaxed),
            Bound::Upper => self.counters.stores_upper.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn maybe_emit(&self, hash: u64, payload: u64, bound: Bound, emit: bool) {
        if !emit || bound != Bound::Exact {
            return;
        }
        let Some(tx) = &self.replicate_tx else { return };
        let entry = RawEntry {
            hash_xor: hash ^ payload,
            payload,
        };
        if tx.try_send(entry).is_err() {
            self.counters
                .replication_drops
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Ingest a raw entry received from a peer over the replication channel.
    /// Decoded through the normal `store` path, tagged `is_remote=true` and
    /// never re-emitted (peers don't rebroadcast what they receive).
    pub fn receive_remote(&self, raw: RawEntry) {
        let hash = raw.hash_xor ^ raw.payload;
        let Some(entry) = unpack(raw.payload) else { return };
        self.store(hash, entry.bound, entry.depth, entry.score, entry.mv, false, true);
    }

    /// Bump the global age counter once, e.g. on `ucinewgame`. Monotone
    /// (mod 64); never cleared.
    pub fn bump_age(&self) {
        self.current_age.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn stats(&self) -> TTStats {
        TTStats {
            lookups_hit: self.counters.lookups_hit.load(Ordering::Relaxed),
            lookups_miss: self.counters.lookups_miss.load(Ordering::Relaxed),
            stores_exact: self.counters.stores_exact.load(Ordering::Relaxed),
            stores_lower: self.counters.stores_lower.load(Ordering::Relaxed),
            stores_upper: self.counters.stores_upper.load(Ordering::Relaxed),
            stores_remote: self.counters.stores_remote.load(Ordering::Relaxed),
            replication_drops: self.counters.replication_drops.load(Ordering::Relaxed),
        }
    }

    /// Sampled occupancy estimate for UCI `info ... hashfull`. Walks at most
    /// the first 1000 buckets so this stays cheap on large tables.
    #[must_use]
    pub fn hashfull_per_mille(&self) -> u32 {
        let cur_age = self.current_age.load(Ordering::Relaxed);
        let sample = self.buckets.len().min(1000);
        if sample == 0 {
            return 0;
        }
        let mut occupied = 0usize;
        for bucket in &self.buckets[..sample] {
            for slot in &bucket.slots {
                let payload = slot.payload.load(Ordering::Relaxed);
                if payload != 0 && payload_age(payload) == cur_age {
                    occupied += 1;
                }
            }
        }
        let sampled_total = sample * BUCKET_SIZE;
        ((occupied as u64 * 1000) / sampled_total as u64) as u32
    }
}

// All mutation goes through atomics, so sharing `&TranspositionTable` across
// threads (Lazy-SMP workers, the replicator) is sound.
unsafe impl Sync for TranspositionTable {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Square;

    fn mv() -> Move {
        Move::quiet(Square::from_index(12), Square::from_index(28))
    }

    #[test]
    fn store_then_lookup_round_trips() {
        let tt = TranspositionTable::new(1);
        tt.store(0xdead_beef, Bound::Exact, 7, 123, mv(), false, false);
        let entry = tt.probe(0xdead_beef).expect("entry present");
        assert_eq!(entry.depth, 7);
        assert_eq!(entry.score, 123);
        assert_eq!(entry.bound, Bound::Exact);
        assert_eq!(entry.mv, mv());
    }

    #[test]
    fn mismatched_hash_never_matches() {
        let tt = TranspositionTable::new(1);
        tt.store(0x1111_1111, Bound::Exact, 4, 10, mv(), false, false);
        assert!(tt.probe(0x2222_2222).is_none());
    }

    #[test]
    fn deeper_same_hash_store_is_kept_and_shallow_store_is_ignored() {
        let tt = TranspositionTable::new(1);
        tt.store(42, Bound::Exact, 10, 500, mv(), false, false);
        tt.store(42, Bound::Upper, 3, -50, mv(), false, false);
        let entry = tt.probe(42).unwrap();
        assert_eq!(entry.depth, 10);
        assert_eq!(entry.score, 500);
    }

    #[test]
    fn age_bump_then_lookup_refreshes_age() {
        let tt = TranspositionTable::new(1);
        tt.store(7, Bound::Exact, 5, 1, mv(), false, false);
        tt.bump_age();
        let entry = tt.probe(7).unwrap();
        assert_eq!(entry.age, 1);
    }

    #[test]
    fn resize_drops_all_entries() {
        let tt = TranspositionTable::new(1);
        tt.store(7, Bound::Exact, 5, 1, mv(), false, false);
        let tt = TranspositionTable::new(1);
        assert!(tt.probe(7).is_none());
        assert_eq!(tt.stats().stores_exact, 0);
    }

    #[test]
    fn exact_store_with_emit_enqueues_replication_entry() {
        let (tx, rx) = std::sync::mpsc::sync_channel(4);
        let tt = TranspositionTable::with_replication(1, Some(tx));
        tt.store(99, Bound::Exact, 6, 10, mv(), true, false);
        let raw = rx.try_recv().expect("entry enqueued");
        assert_eq!(raw.hash_xor ^ raw.payload, 99);
    }

    #[test]
    fn lowerbound_store_with_emit_is_not_replicated() {
        let (tx, rx) = std::sync::mpsc::sync_channel(4);
        let tt = TranspositionTable::with_replication(1, Some(tx));
        tt.store(99, Bound::Lower, 6, 10, mv(), true, false);
        assert!(rx.try_recv().is_err());
    }
}
