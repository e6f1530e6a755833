//! Out-of-order fragment reassembly keyed by message id.
//!
//! Fragments are stored at their declared index. A message completes once the
//! fragment marked `last` has been seen and every index below it is present;
//! the buffer is then concatenated in index order and dropped.
//!
//! Buffers whose final fragment never arrives stay pending until the owner
//! calls [`ChunkReassembler::discard`] or drops the reassembler (e.g. when the
//! peer they came from goes away).

use std::collections::{BTreeMap, HashMap};

use bytes::{Bytes, BytesMut};
use rendezvous_net_types::MessageId;
use tracing::trace;

use crate::fragment::Fragment;

#[derive(Debug, Default)]
struct ChunkBuffer {
    fragments: BTreeMap<u32, Bytes>,
    last_index: Option<u32>,
}

impl ChunkBuffer {
    fn is_complete(&self) -> bool {
        // BTreeMap keys are unique and sorted, so 0..=last is fully present
        // exactly when the map holds last + 1 entries ending at last.
        match self.last_index {
            Some(last) => {
                self.fragments.len() as u64 == u64::from(last) + 1
                    && self.fragments.last_key_value().map(|(k, _)| *k) == Some(last)
            }
            None => false,
        }
    }

    fn concat(self) -> Bytes {
        let len = self.fragments.values().map(Bytes::len).sum();
        let mut out = BytesMut::with_capacity(len);
        for payload in self.fragments.into_values() {
            out.extend_from_slice(&payload);
        }
        out.freeze()
    }
}

/// Pending fragment buffers for one stream of messages.
#[derive(Debug, Default)]
pub struct ChunkReassembler {
    buffers: HashMap<MessageId, ChunkBuffer>,
}

impl ChunkReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one fragment. Returns the full message once it is complete.
    ///
    /// A fragment repeating an already stored index replaces the earlier payload.
    pub fn ingest(
        &mut self,
        message_id: MessageId,
        fragment_index: u32,
        payload: Bytes,
        is_last: bool,
    ) -> Option<Bytes> {
        let buffer = self.buffers.entry(message_id.clone()).or_default();
        buffer.fragments.insert(fragment_index, payload);
        if is_last {
            buffer.last_index = Some(fragment_index);
        }

        if !buffer.is_complete() {
            trace!(%message_id, fragment_index, is_last, "fragment buffered");
            return None;
        }

        let buffer = self.buffers.remove(&message_id)?;
        let message = buffer.concat();
        trace!(%message_id, len = message.len(), "message reassembled");
        Some(message)
    }

    /// Convenience for decoded envelopes.
    pub fn ingest_fragment(&mut self, fragment: Fragment) -> Option<(MessageId, Bytes)> {
        let id = fragment.id.clone();
        self.ingest(
            fragment.id,
            fragment.index,
            Bytes::from(fragment.payload),
            fragment.last,
        )
        .map(|message| (id, message))
    }

    /// Drop a pending buffer. Returns whether one existed.
    pub fn discard(&mut self, message_id: &MessageId) -> bool {
        self.buffers.remove(message_id).is_some()
    }

    pub fn is_pending(&self, message_id: &MessageId) -> bool {
        self.buffers.contains_key(message_id)
    }

    /// Number of messages still waiting for fragments.
    pub fn pending(&self) -> usize {
        self.buffers.len()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn id(s: &str) -> MessageId {
        MessageId::from(s)
    }

    #[test]
    fn test_single_fragment_message() {
        let mut reassembler = ChunkReassembler::new();
        let out = reassembler.ingest(id("m"), 0, Bytes::from_static(b"hi"), true);
        assert_eq!(out.as_deref(), Some(&b"hi"[..]));
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn test_in_order_fragments() {
        let mut reassembler = ChunkReassembler::new();
        assert!(
            reassembler
                .ingest(id("m"), 0, Bytes::from_static(b"hello "), false)
                .is_none()
        );
        assert!(reassembler.is_pending(&id("m")));

        let out = reassembler.ingest(id("m"), 1, Bytes::from_static(b"world"), true);
        assert_eq!(out.as_deref(), Some(&b"hello world"[..]));
        assert!(!reassembler.is_pending(&id("m")));
    }

    #[test]
    fn test_out_of_order_fragments_use_declared_index() {
        let mut reassembler = ChunkReassembler::new();
        assert!(
            reassembler
                .ingest(id("m"), 2, Bytes::from_static(b"c"), false)
                .is_none()
        );
        assert!(
            reassembler
                .ingest(id("m"), 0, Bytes::from_static(b"a"), false)
                .is_none()
        );
        let out = reassembler.ingest(id("m"), 1, Bytes::from_static(b"b"), false);
        assert!(out.is_none(), "no fragment marked last yet");

        let out = reassembler.ingest(id("m"), 3, Bytes::from_static(b"d"), true);
        assert_eq!(out.as_deref(), Some(&b"abcd"[..]));
    }

    #[test]
    fn test_last_before_predecessor_stays_pending() {
        let mut reassembler = ChunkReassembler::new();

        let out = reassembler.ingest(id("m1"), 1, Bytes::from_static(b"world"), true);
        assert!(out.is_none());
        assert!(reassembler.is_pending(&id("m1")));

        assert!(reassembler.discard(&id("m1")));
        assert!(!reassembler.is_pending(&id("m1")));
        assert_eq!(reassembler.pending(), 0);
        assert!(!reassembler.discard(&id("m1")));
    }

    #[test]
    fn test_last_arriving_first_completes_when_gap_fills() {
        let mut reassembler = ChunkReassembler::new();
        assert!(
            reassembler
                .ingest(id("m1"), 1, Bytes::from_static(b"world"), true)
                .is_none()
        );
        let out = reassembler.ingest(id("m1"), 0, Bytes::from_static(b"hello "), false);
        assert_eq!(out.as_deref(), Some(&b"hello world"[..]));
    }

    #[test]
    fn test_interleaved_messages_are_independent() {
        let mut reassembler = ChunkReassembler::new();
        reassembler.ingest(id("a"), 0, Bytes::from_static(b"a0"), false);
        reassembler.ingest(id("b"), 0, Bytes::from_static(b"b0"), false);
        assert_eq!(reassembler.pending(), 2);

        let out = reassembler.ingest(id("b"), 1, Bytes::from_static(b"b1"), true);
        assert_eq!(out.as_deref(), Some(&b"b0b1"[..]));
        assert!(reassembler.is_pending(&id("a")));

        reassembler.clear();
        assert_eq!(reassembler.pending(), 0);
    }

    #[test]
    fn test_ingest_fragment_envelope() {
        let mut reassembler = ChunkReassembler::new();
        let fragment = Fragment {
            id: id("env"),
            index: 0,
            payload: b"payload".to_vec(),
            last: true,
        };
        let (message_id, message) = reassembler.ingest_fragment(fragment).unwrap();
        assert_eq!(message_id, id("env"));
        assert_eq!(&message[..], b"payload");
    }

    proptest! {
        #[test]
        fn prop_any_arrival_order_reassembles(
            payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 1..12),
            order_seed in prop::collection::vec(any::<u32>(), 12),
        ) {
            let n = payloads.len();
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by_key(|i| order_seed[*i]);

            let mut reassembler = ChunkReassembler::new();
            let mut result = None;
            for (step, &i) in order.iter().enumerate() {
                let out = reassembler.ingest(
                    id("p"),
                    i as u32,
                    Bytes::from(payloads[i].clone()),
                    i == n - 1,
                );
                if step + 1 < n {
                    prop_assert!(out.is_none());
                } else {
                    result = out;
                }
            }

            let expected: Vec<u8> = payloads.concat();
            prop_assert_eq!(result.as_deref(), Some(&expected[..]));
            prop_assert_eq!(reassembler.pending(), 0);
        }
    }
}
