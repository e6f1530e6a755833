//! Outbound fragmentation.

use bytes::Bytes;
use rendezvous_net_types::MessageId;

use crate::fragment::Fragment;

/// Default upper bound on one fragment's payload, sized to stay under common
/// data-channel message limits once wrapped in the envelope.
pub const DEFAULT_MAX_FRAGMENT_LEN: usize = 16_000;

#[derive(Debug, Clone, Copy)]
pub struct ChunkSplitter {
    max_fragment_len: usize,
}

impl Default for ChunkSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAGMENT_LEN)
    }
}

impl ChunkSplitter {
    /// A zero length is clamped to one byte per fragment.
    pub fn new(max_fragment_len: usize) -> Self {
        Self {
            max_fragment_len: max_fragment_len.max(1),
        }
    }

    pub fn max_fragment_len(&self) -> usize {
        self.max_fragment_len
    }

    /// Split `payload` into indexed fragments. Always yields at least one
    /// fragment; the final one is marked `last`.
    pub fn split(&self, id: &MessageId, payload: &Bytes) -> Vec<Fragment> {
        if payload.is_empty() {
            return vec![Fragment {
                id: id.clone(),
                index: 0,
                payload: Vec::new(),
                last: true,
            }];
        }

        let count = payload.len().div_ceil(self.max_fragment_len);
        payload
            .chunks(self.max_fragment_len)
            .enumerate()
            .map(|(index, chunk)| Fragment {
                id: id.clone(),
                index: index as u32,
                payload: chunk.to_vec(),
                last: index + 1 == count,
            })
            .collect()
    }
}
