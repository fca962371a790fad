//! AMF value codecs
//!
//! Two wire formats share one value model ([`AmfValue`]):
//!
//! - AMF0, the legacy tag-length-value format ([`amf0`])
//! - AMF3, the Flash Player 9+ format with reference tables ([`amf3`])
//!
//! The formats interoperate through the avmplus marker: an AMF0 stream
//! hands a single value to the AMF3 codec and resumes afterwards. The
//! [`decode`]/[`encode`] entry points here pick the starting codec from
//! [`ObjectEncoding`] and let the bridge do the rest.

pub mod amf0;
pub mod amf3;
pub mod externalizable;
pub mod u29;
pub mod value;

pub use amf0::{Amf0Decoder, Amf0Encoder};
pub use amf3::{Amf3Decoder, Amf3Encoder};
pub use externalizable::{ExternalizableReader, ExternalizableRegistry, ExternalizableWriter};
pub use value::{
    AmfArray, AmfDictionary, AmfObject, AmfValue, DoubleVector, IntVector, ObjectVector,
    UintVector,
};

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;

/// Which codec a top-level operation starts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectEncoding {
    /// AMF0 throughout; AMF3-only values go through the avmplus bridge
    Amf0,
    /// AMF3 throughout
    Amf3,
    /// Start in AMF0 and rely on the avmplus marker to switch
    ///
    /// On encode this is equivalent to [`ObjectEncoding::Amf0`].
    #[default]
    Auto,
}

/// Options for [`decode`]
#[derive(Debug, Default)]
pub struct DecodeOptions {
    pub object_encoding: ObjectEncoding,
    pub registry: Option<Arc<ExternalizableRegistry>>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the starting codec
    pub fn object_encoding(mut self, object_encoding: ObjectEncoding) -> Self {
        self.object_encoding = object_encoding;
        self
    }

    /// Set the externalizable class handlers
    pub fn registry(mut self, registry: Arc<ExternalizableRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

/// Options for [`encode`]
#[derive(Debug)]
pub struct EncodeOptions {
    pub object_encoding: ObjectEncoding,
    /// Initial output buffer capacity
    pub size_hint: usize,
    /// Output size ceiling; exceeding it fails with `BufferTooSmall`
    pub max_size: usize,
    pub registry: Option<Arc<ExternalizableRegistry>>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            object_encoding: ObjectEncoding::default(),
            size_hint: 256,
            max_size: amf3::DEFAULT_MAX_SIZE,
            registry: None,
        }
    }
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output codec
    pub fn object_encoding(mut self, object_encoding: ObjectEncoding) -> Self {
        self.object_encoding = object_encoding;
        self
    }

    /// Set the initial output buffer capacity
    pub fn size_hint(mut self, size_hint: usize) -> Self {
        self.size_hint = size_hint;
        self
    }

    /// Set the output size ceiling
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the externalizable class handlers
    pub fn registry(mut self, registry: Arc<ExternalizableRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

/// Decode a single AMF value
pub fn decode(data: &[u8], options: &DecodeOptions) -> Result<AmfValue> {
    let mut buf = Bytes::copy_from_slice(data);
    match options.object_encoding {
        ObjectEncoding::Amf3 => {
            let mut decoder = match &options.registry {
                Some(registry) => Amf3Decoder::with_registry(registry.clone()),
                None => Amf3Decoder::new(),
            };
            decoder.decode(&mut buf)
        }
        ObjectEncoding::Amf0 | ObjectEncoding::Auto => {
            let mut decoder = match &options.registry {
                Some(registry) => Amf0Decoder::with_registry(registry.clone()),
                None => Amf0Decoder::new(),
            };
            decoder.decode(&mut buf)
        }
    }
}

/// Encode a single AMF value
pub fn encode(value: &AmfValue, options: &EncodeOptions) -> Result<Bytes> {
    match options.object_encoding {
        ObjectEncoding::Amf3 => {
            let mut encoder =
                Amf3Encoder::with_capacity(options.size_hint).max_size(options.max_size);
            if let Some(registry) = &options.registry {
                encoder = encoder.registry(registry.clone());
            }
            encoder.encode(value)?;
            Ok(encoder.finish())
        }
        ObjectEncoding::Amf0 | ObjectEncoding::Auto => {
            let mut encoder =
                Amf0Encoder::with_capacity(options.size_hint).max_size(options.max_size);
            if let Some(registry) = &options.registry {
                encoder = encoder.registry(registry.clone());
            }
            encoder.encode(value)?;
            Ok(encoder.finish())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AmfError;

    #[test]
    fn test_roundtrip_amf3() {
        let options_enc = EncodeOptions::new().object_encoding(ObjectEncoding::Amf3);
        let options_dec = DecodeOptions::new().object_encoding(ObjectEncoding::Amf3);

        let value = AmfValue::object(vec![("answer".to_string(), AmfValue::Integer(42))]);
        let encoded = encode(&value, &options_enc).unwrap();
        assert_eq!(decode(&encoded, &options_dec).unwrap(), value);
    }

    #[test]
    fn test_roundtrip_amf0() {
        let options_enc = EncodeOptions::new().object_encoding(ObjectEncoding::Amf0);
        let options_dec = DecodeOptions::new().object_encoding(ObjectEncoding::Amf0);

        let value = AmfValue::object(vec![("name".to_string(), "gateway".into())]);
        let encoded = encode(&value, &options_enc).unwrap();
        assert_eq!(decode(&encoded, &options_dec).unwrap(), value);
    }

    #[test]
    fn test_auto_decode_follows_avmplus() {
        // AMF3-only value encoded from AMF0 context gets the bridge; auto
        // decode follows it back
        let value = AmfValue::byte_array(vec![9, 8, 7]);
        let encoded = encode(&value, &EncodeOptions::new()).unwrap();
        assert_eq!(encoded[0], 0x11);
        assert_eq!(decode(&encoded, &DecodeOptions::new()).unwrap(), value);
    }

    #[test]
    fn test_default_options_roundtrip() {
        let value = AmfValue::array(vec![
            AmfValue::Number(1.5),
            AmfValue::String("two".into()),
            AmfValue::date(0.0),
        ]);
        let encoded = encode(&value, &EncodeOptions::default()).unwrap();
        assert_eq!(decode(&encoded, &DecodeOptions::default()).unwrap(), value);
    }

    #[test]
    fn test_max_size_enforced() {
        let options = EncodeOptions::new()
            .object_encoding(ObjectEncoding::Amf3)
            .max_size(8);
        let value = AmfValue::String("much too long for eight bytes".into());
        assert_eq!(encode(&value, &options), Err(AmfError::BufferTooSmall));
    }
}
