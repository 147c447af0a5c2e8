use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("snapshot request failed: {0}")]
    Network(String),
    #[error("snapshot decode failed: {0}")]
    Decode(String),
    #[error("stream connect failed: {0}")]
    Connect(String),
    #[error("stream send failed: {0}")]
    Send(String),
    #[error("index {index} out of range for bitset of {len} elements")]
    IndexOutOfRange { index: usize, len: usize },
}

impl From<reqwest::Error> for ClaimError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClaimError::Decode(err.to_string())
        } else {
            ClaimError::Network(err.to_string())
        }
    }
}

impl From<boxclaim_proto::ProtoError> for ClaimError {
    fn from(err: boxclaim_proto::ProtoError) -> Self {
        ClaimError::Decode(err.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("invalid {field} '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },
}

pub type ClaimResult<T> = Result<T, ClaimError>;
