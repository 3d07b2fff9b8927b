//! Per-Connection Outbound Buffer
//!
//! Byte queue between the registries and a non-blocking socket. Partial
//! writes advance an offset instead of shifting bytes; the sent prefix is
//! only dropped once it passes a threshold, so repeated short writes stay
//! cheap.

/// Sent-prefix size above which [`SendBuffer::maybe_compact`] reclaims
/// memory.
pub const COMPACT_THRESHOLD: usize = 4096;

/// Outbound byte queue with partial-write tracking.
///
/// `append` enqueues at the tail, successful socket writes `advance` the
/// offset, and the already-sent prefix is reclaimed lazily by
/// `maybe_compact`. The buffer never blocks and never touches the socket
/// itself.
#[derive(Debug, Default)]
pub struct SendBuffer {
    data: Vec<u8>,
    offset: usize,
}

impl SendBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue bytes at the tail.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// The not-yet-sent region.
    #[inline]
    pub fn unsent(&self) -> &[u8] {
        &self.data[self.offset..]
    }

    /// Record that `n` more bytes were written to the socket.
    pub fn advance(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.data.len());
    }

    /// Bytes still waiting to be sent.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Current send offset (bytes of the storage already written out).
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True when everything appended has been sent.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Drop the sent prefix and reset the offset to zero.
    pub fn compact(&mut self) {
        self.data.drain(..self.offset);
        self.offset = 0;
    }

    /// Compact only once the sent prefix exceeds [`COMPACT_THRESHOLD`],
    /// amortizing the copy over many sends.
    pub fn maybe_compact(&mut self) {
        if self.offset > COMPACT_THRESHOLD {
            self.compact();
        }
    }

    /// Release all storage and reset the offset.
    pub fn clear(&mut self) {
        self.data.clear();
        self.offset = 0;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let buf = SendBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.remaining(), 0);
        assert_eq!(buf.offset(), 0);
        assert_eq!(buf.unsent(), &[] as &[u8]);
    }

    #[test]
    fn test_partial_send_then_compact() {
        // 5000 queued bytes, 3000 written out, compaction keeps the rest
        let mut buf = SendBuffer::new();
        let payload: Vec<u8> = (0..5000).map(|i| (i % 251) as u8).collect();
        buf.append(&payload);
        assert_eq!(buf.remaining(), 5000);

        buf.advance(3000);
        assert_eq!(buf.remaining(), 2000);
        assert_eq!(buf.offset(), 3000);
        assert_eq!(buf.unsent(), &payload[3000..]);

        buf.compact();
        assert_eq!(buf.offset(), 0);
        assert_eq!(buf.remaining(), 2000);
        assert_eq!(buf.unsent(), &payload[3000..]);
    }

    #[test]
    fn test_appends_accumulate_in_order() {
        let mut buf = SendBuffer::new();
        buf.append(b"hello ");
        buf.append(b"world");
        assert_eq!(buf.unsent(), b"hello world");

        buf.advance(6);
        buf.append(b"!");
        assert_eq!(buf.unsent(), b"world!");
    }

    #[test]
    fn test_empty_once_fully_advanced() {
        let mut buf = SendBuffer::new();
        buf.append(b"abc");
        assert!(!buf.is_empty());
        buf.advance(3);
        assert!(buf.is_empty());
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_advance_clamps_to_length() {
        let mut buf = SendBuffer::new();
        buf.append(b"xy");
        buf.advance(10);
        assert!(buf.is_empty());
        assert_eq!(buf.offset(), 2);
    }

    #[test]
    fn test_maybe_compact_respects_threshold() {
        let mut buf = SendBuffer::new();
        buf.append(&vec![7u8; COMPACT_THRESHOLD + 100]);

        // at the threshold exactly: no compaction yet
        buf.advance(COMPACT_THRESHOLD);
        buf.maybe_compact();
        assert_eq!(buf.offset(), COMPACT_THRESHOLD);

        // one past: compaction fires
        buf.advance(1);
        buf.maybe_compact();
        assert_eq!(buf.offset(), 0);
        assert_eq!(buf.remaining(), 99);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut buf = SendBuffer::new();
        buf.append(b"pending");
        buf.advance(2);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.offset(), 0);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_append_after_compact_behaves_like_fresh_queue() {
        let mut buf = SendBuffer::new();
        buf.append(b"first");
        buf.advance(5);
        buf.compact();
        buf.append(b"second");
        assert_eq!(buf.unsent(), b"second");
    }

    // Property: the unsent region always matches a naive model of the same
    // append/advance sequence, and the offset never passes the length.
    #[test]
    fn prop_matches_naive_queue_model() {
        proptest!(|(ops in prop::collection::vec(
            prop_oneof![
                prop::collection::vec(any::<u8>(), 0..64).prop_map(Op::Append),
                (0usize..128).prop_map(Op::Advance),
                Just(Op::MaybeCompact),
            ],
            0..100,
        ))| {
            let mut buf = SendBuffer::new();
            let mut model: Vec<u8> = Vec::new();

            for op in &ops {
                match op {
                    Op::Append(bytes) => {
                        buf.append(bytes);
                        model.extend_from_slice(bytes);
                    }
                    Op::Advance(n) => {
                        let n = (*n).min(model.len());
                        buf.advance(n);
                        model.drain(..n);
                    }
                    Op::MaybeCompact => buf.maybe_compact(),
                }
                prop_assert_eq!(buf.unsent(), model.as_slice());
                prop_assert_eq!(buf.remaining(), model.len());
                prop_assert_eq!(buf.is_empty(), model.is_empty());
            }
        });
    }

    #[derive(Clone, Debug)]
    enum Op {
        Append(Vec<u8>),
        Advance(usize),
        MaybeCompact,
    }
}
