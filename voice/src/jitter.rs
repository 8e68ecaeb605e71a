//! Small reordering buffer that sits between the UDP receive loop and
//! playback. Absorbs out-of-order arrival and bounded loss; never blocks.

use std::collections::BTreeMap;

use bytes::Bytes;

/// Ordered, bounded buffer of `(seq, payload)` pairs.
///
/// `expected_seq` tracks the next sequence number playback wants. It starts
/// unset and re-anchors to whatever arrives first, so a receiver that joins
/// mid-stream doesn't wait for sequence zero.
pub struct JitterBuffer {
    max_size: usize,
    expected_seq: Option<u32>,
    buf: BTreeMap<u32, Bytes>,
}

impl JitterBuffer {
    pub fn new(max_size: usize) -> Self {
        Self { max_size, expected_seq: None, buf: BTreeMap::new() }
    }

    /// Insert an arriving packet. Stale (too far behind `expected_seq`) and
    /// duplicate sequences are silently dropped, matching the relay's
    /// best-effort forwarding semantics.
    pub fn insert(&mut self, seq: u32, payload: Bytes) {
        if let Some(expected) = self.expected_seq {
            if seq < expected.saturating_sub(self.max_size as u32) {
                return; // stale
            }
        }
        if self.buf.contains_key(&seq) {
            return; // duplicate
        }

        let was_empty = self.buf.is_empty();
        self.buf.insert(seq, payload);

        if self.buf.len() > self.max_size {
            if let Some((&lowest, _)) = self.buf.iter().next() {
                self.buf.remove(&lowest);
            }
        }

        if was_empty {
            self.expected_seq = Some(seq);
        }
    }

    /// Pull the next packet ready for playback, if any.
    ///
    /// Returns the lowest-sequence entry as long as it is at or behind
    /// `expected_seq`; if the lowest entry is still ahead of what's
    /// expected, holds it for a later tick so a late-arriving gap filler
    /// has a chance to show up first.
    pub fn pop_ready(&mut self) -> Option<(u32, Bytes)> {
        let &lowest = self.buf.keys().next()?;
        let ready = match self.expected_seq {
            None => true,
            Some(expected) => lowest <= expected,
        };
        if !ready {
            return None;
        }
        let payload = self.buf.remove(&lowest).expect("key just observed");
        self.expected_seq = Some(lowest.wrapping_add(1));
        Some((lowest, payload))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
