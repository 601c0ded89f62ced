//! Msgpack encoding for typed admin payloads.
//!
//! Long-running operations carry their metadata and response bodies as
//! msgpack blobs tagged with a type id. Maps are encoded with field names so
//! payloads stay readable across releases that add fields.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    rmp_serde::to_vec_named(value)
        .map_err(|err| Error::ContractViolation(format!("payload encode error: {err}")))
}

pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    rmp_serde::from_slice(bytes)
        .map_err(|err| Error::ContractViolation(format!("payload decode error: {err}")))
}
