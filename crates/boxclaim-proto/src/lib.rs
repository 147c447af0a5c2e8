//! Wire definitions shared by the boxclaim client and its test servers.
//! Kept free of any I/O so the framing can be checked byte-for-byte in
//! isolation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod socket_io;

pub use socket_io::{toggle_bits_frame, Packet};

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("invalid snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid snapshot base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Full-state snapshot served by the HTTP endpoint.
///
/// `full_state` is the standard (padded) base64 encoding of the bit vector,
/// most-significant bit first within each byte. `count` is the number of
/// logical elements it encodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialState {
    pub full_state: String,
    pub count: usize,
}

impl InitialState {
    pub fn from_bytes(bytes: &[u8], count: usize) -> Self {
        Self {
            full_state: STANDARD.encode(bytes),
            count,
        }
    }

    pub fn from_json(body: &[u8]) -> Result<Self, ProtoError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn decode_bits(&self) -> Result<Vec<u8>, ProtoError> {
        Ok(STANDARD.decode(self.full_state.as_bytes())?)
    }
}
