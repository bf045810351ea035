//! In-order release of concurrently retrieved chunks
//!
//! Retrieval may finish out of order. A buffer holds finished ids until
//! every smaller id of the same kind has been released, so the output
//! never shows an id before its predecessors.

use std::collections::BTreeMap;

use bytes::Bytes;
use spectate_client::{Chunk, ChunkKind};

/// An item released by a [`ReorderBuffer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Chunk(Chunk),
    /// The id was given up on; later ids continue
    Gap { kind: ChunkKind, id: i64 },
}

#[derive(Debug)]
enum Slot {
    Ready(Bytes),
    Missing,
}

#[derive(Debug)]
pub struct ReorderBuffer {
    kind: ChunkKind,
    next: i64,
    slots: BTreeMap<i64, Slot>,
}

impl ReorderBuffer {
    #[must_use]
    pub fn new(kind: ChunkKind, first_id: i64) -> Self {
        Self {
            kind,
            next: first_id,
            slots: BTreeMap::new(),
        }
    }

    /// The smallest id not yet released
    #[must_use]
    pub const fn next_id(&self) -> i64 {
        self.next
    }

    /// Ids finished but held back behind a smaller unfinished id
    #[must_use]
    pub fn held(&self) -> usize {
        self.slots.len()
    }

    /// Store a retrieved payload. Returns `false` for an id that was
    /// already released or already stored.
    pub fn insert(&mut self, id: i64, bytes: Bytes) -> bool {
        self.put(id, Slot::Ready(bytes))
    }

    /// Record that `id` will never arrive
    pub fn mark_missing(&mut self, id: i64) -> bool {
        self.put(id, Slot::Missing)
    }

    fn put(&mut self, id: i64, slot: Slot) -> bool {
        if id < self.next || self.slots.contains_key(&id) {
            return false;
        }
        self.slots.insert(id, slot);
        true
    }

    /// Release the contiguous run starting at `next_id`
    pub fn drain(&mut self) -> Vec<Delivery> {
        let mut out = Vec::new();
        while let Some(slot) = self.slots.remove(&self.next) {
            let id = self.next;
            out.push(match slot {
                Slot::Ready(bytes) => Delivery::Chunk(Chunk {
                    id,
                    kind: self.kind,
                    bytes,
                }),
                Slot::Missing => Delivery::Gap { kind: self.kind, id },
            });
            self.next += 1;
        }
        out
    }
}
