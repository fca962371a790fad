//! # amf-rs
//!
//! An AMF0/AMF3 serialization library with Remoting packet support.
//!
//! AMF (Action Message Format) is the binary format Flash clients and
//! Remoting gateways exchange. AMF3 is the interesting half: every length
//! and header is a 29-bit variable integer, and strings, objects, and
//! class traits are deduplicated through per-message reference tables, so
//! shared subgraphs and even cycles serialize finitely.
//!
//! ```
//! use amf_rs::{AmfValue, DecodeOptions, EncodeOptions, ObjectEncoding};
//!
//! let value = AmfValue::object(vec![("foo".to_string(), "bar".into())]);
//! let options = EncodeOptions::new().object_encoding(ObjectEncoding::Amf3);
//! let bytes = amf_rs::encode(&value, &options).unwrap();
//!
//! let options = DecodeOptions::new().object_encoding(ObjectEncoding::Amf3);
//! let decoded = amf_rs::decode(&bytes, &options).unwrap();
//! assert_eq!(decoded, value);
//! ```
//!
//! The [`remoting`] module handles the outer packet envelope
//! (version, headers, messages) used on the wire by gateways.

pub mod amf;
pub mod error;
pub mod remoting;

pub use amf::{
    decode, encode, Amf0Decoder, Amf0Encoder, Amf3Decoder, Amf3Encoder, AmfArray, AmfDictionary,
    AmfObject, AmfValue, DecodeOptions, EncodeOptions, ExternalizableReader,
    ExternalizableRegistry, ExternalizableWriter, ObjectEncoding,
};
pub use error::{AmfError, RefKind, Result};
