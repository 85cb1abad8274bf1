//! Frame codec shared by server and client.
//!
//! Browsers speak JSON over text frames; native clients may use bincode over
//! binary frames. Both encodings carry the same message enums, so the frame
//! kind alone decides how a payload is decoded.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Json,
    Binary,
}

/// Transport-agnostic frame payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn encoding(&self) -> Encoding {
        match self {
            Frame::Text(_) => Encoding::Json,
            Frame::Binary(_) => Encoding::Binary,
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("json codec: {0}")]
    Json(#[from] serde_json::Error),
    #[error("binary codec: {0}")]
    Binary(#[from] bincode::Error),
}

pub fn encode<T: Serialize>(message: &T, encoding: Encoding) -> Result<Frame, CodecError> {
    match encoding {
        Encoding::Json => Ok(Frame::Text(serde_json::to_string(message)?)),
        Encoding::Binary => Ok(Frame::Binary(bincode::serialize(message)?)),
    }
}

pub fn decode<T: DeserializeOwned>(frame: &Frame) -> Result<T, CodecError> {
    match frame {
        Frame::Text(text) => Ok(serde_json::from_str(text)?),
        Frame::Binary(bytes) => Ok(bincode::deserialize(bytes)?),
    }
}
