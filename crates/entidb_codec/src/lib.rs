//! # EntiDB Codec
//!
//! Canonical CBOR encoding/decoding for EntiDB.
//!
//! This crate provides deterministic CBOR encoding that ensures:
//! - Identical inputs produce identical bytes
//! - Cross-platform consistency
//! - Stable hashing
//!
//! ## Canonical CBOR Rules
//!
//! - Maps are sorted by key (bytewise comparison of encoded keys)
//! - Integers use shortest encoding
//! - No floats unless explicitly allowed
//! - Strings must be UTF-8
//! - No indefinite-length items
//! - No NaN values
//!
//! ## Usage
//!
//! ```
//! use entidb_codec::{to_canonical_cbor, from_cbor, Value};
//!
//! // Encode a value
//! let value = Value::Integer(42);
//! let bytes = to_canonical_cbor(&value).unwrap();
//!
//! // Decode back
//! let decoded: Value = from_cbor(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::{from_cbor, CanonicalDecoder};
pub use encoder::{to_canonical_cbor, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;

/// Trait for types that can be encoded to canonical CBOR.
pub trait Encode {
    /// Encode this value to canonical CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from CBOR.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

// Implement Encode for Value
impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_canonical_cbor(self)
    }
}

// Implement Decode for Value
impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}
