//! Wire encoding for records stored in the log.
//!
//! The on-disk payload inside each store frame is the protobuf encoding of
//! [`Record`], generated at build time from `proto/record.proto`. This is
//! the same encoding an external produce/consume RPC layer would use, so
//! the two sides never have to agree on anything beyond this module.

include!(concat!(env!("OUT_DIR"), "/log.v1.rs"));

use prost::Message;

#[derive(thiserror::Error, Debug)]
pub enum RecordCodecError {
    #[error(transparent)]
    Encode(#[from] prost::EncodeError),
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
}

impl Record {
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, RecordCodecError> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        Message::encode(self, &mut buf)?;
        Ok(buf)
    }

    pub fn decode_from_slice(buf: &[u8]) -> Result<Record, RecordCodecError> {
        Ok(Message::decode(buf)?)
    }
}
