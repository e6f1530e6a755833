//! Fragment envelope carried over peer channels.

use bytes::{BufMut, Bytes, BytesMut};
use rendezvous_net_types::MessageId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Leading byte that marks channel data as a fragment envelope.
pub const FRAGMENT_MARKER: u8 = b'^';

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("data does not start with the fragment marker")]
    MissingMarker,
    #[error("malformed fragment: {0}")]
    Json(#[from] serde_json::Error),
}

/// One piece of a split message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: MessageId,
    #[serde(rename = "c")]
    pub index: u32,
    #[serde(rename = "msg", with = "hex::serde")]
    pub payload: Vec<u8>,
    #[serde(default)]
    pub last: bool,
}

impl Fragment {
    pub fn encode(&self) -> Result<Bytes, FragmentError> {
        let json = serde_json::to_vec(self)?;
        let mut buf = BytesMut::with_capacity(json.len() + 1);
        buf.put_u8(FRAGMENT_MARKER);
        buf.put_slice(&json);
        Ok(buf.freeze())
    }

    pub fn decode(data: &[u8]) -> Result<Self, FragmentError> {
        match data.split_first() {
            Some((&FRAGMENT_MARKER, json)) => Ok(serde_json::from_slice(json)?),
            _ => Err(FragmentError::MissingMarker),
        }
    }

    pub fn is_fragment(data: &[u8]) -> bool {
        data.first() == Some(&FRAGMENT_MARKER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_envelope() {
        let fragment = Fragment {
            id: MessageId::from("m1"),
            index: 3,
            payload: b"hello".to_vec(),
            last: true,
        };

        let encoded = fragment.encode().unwrap();
        assert!(Fragment::is_fragment(&encoded));
        assert_eq!(
            &encoded[1..],
            br#"{"id":"m1","c":3,"msg":"68656c6c6f","last":true}"#
        );
        assert_eq!(Fragment::decode(&encoded).unwrap(), fragment);
    }

    #[test]
    fn test_last_defaults_to_false() {
        let fragment = Fragment::decode(br#"^{"id":"m1","c":0,"msg":""}"#).unwrap();
        assert!(!fragment.last);
        assert!(fragment.payload.is_empty());
    }

    #[test]
    fn test_decode_rejects_foreign_data() {
        assert!(matches!(
            Fragment::decode(b"plain text"),
            Err(FragmentError::MissingMarker)
        ));
        assert!(matches!(
            Fragment::decode(b""),
            Err(FragmentError::MissingMarker)
        ));
        assert!(matches!(
            Fragment::decode(b"^not json"),
            Err(FragmentError::Json(_))
        ));
    }
}
