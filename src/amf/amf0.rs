//! AMF0 encoder and decoder
//!
//! AMF0 is the original Action Message Format used by Flash and classic
//! Remoting gateways. It is a plain tag-length-value format; the only
//! subtlety here is the avmplus marker (0x11), which hands a single value
//! off to the AMF3 codec with a fresh set of AMF3 reference tables and
//! then resumes AMF0 with its own reference list untouched.
//!
//! Type Markers:
//! ```text
//! 0x00 - Number (IEEE 754 double)
//! 0x01 - Boolean
//! 0x02 - String (UTF-8, 16-bit length prefix)
//! 0x03 - Object (key-value pairs until 0x000009)
//! 0x04 - MovieClip (reserved, not supported)
//! 0x05 - Null
//! 0x06 - Undefined
//! 0x07 - Reference (16-bit index)
//! 0x08 - ECMA Array (associative array)
//! 0x09 - Object End (0x000009 sequence)
//! 0x0A - Strict Array (dense array)
//! 0x0B - Date (double + reserved timezone)
//! 0x0C - Long String (UTF-8, 32-bit length prefix)
//! 0x0D - Unsupported
//! 0x0E - RecordSet (reserved, not supported)
//! 0x0F - XML Document
//! 0x10 - Typed Object (class name + properties)
//! 0x11 - AVM+ (switch to AMF3 for one value)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::amf3::{Amf3Decoder, Amf3Encoder, DEFAULT_MAX_SIZE};
use super::externalizable::ExternalizableRegistry;
use super::value::{AmfArray, AmfObject, AmfValue};
use crate::error::{AmfError, RefKind, Result};

// AMF0 type markers
const MARKER_NUMBER: u8 = 0x00;
const MARKER_BOOLEAN: u8 = 0x01;
const MARKER_STRING: u8 = 0x02;
const MARKER_OBJECT: u8 = 0x03;
const MARKER_NULL: u8 = 0x05;
const MARKER_UNDEFINED: u8 = 0x06;
const MARKER_REFERENCE: u8 = 0x07;
const MARKER_ECMA_ARRAY: u8 = 0x08;
const MARKER_OBJECT_END: u8 = 0x09;
const MARKER_STRICT_ARRAY: u8 = 0x0A;
const MARKER_DATE: u8 = 0x0B;
const MARKER_LONG_STRING: u8 = 0x0C;
const MARKER_UNSUPPORTED: u8 = 0x0D;
const MARKER_XML_DOCUMENT: u8 = 0x0F;
const MARKER_TYPED_OBJECT: u8 = 0x10;
const MARKER_AVMPLUS: u8 = 0x11;

/// Maximum nesting depth for objects/arrays (prevent stack overflow)
const MAX_NESTING_DEPTH: usize = 64;

/// AMF0 decoder
///
/// Unknown markers and malformed structure are hard errors; the decoder
/// never skips or substitutes values.
pub struct Amf0Decoder {
    /// Reference table for object references (marker 0x07); separate from
    /// any AMF3 table
    references: Vec<AmfValue>,
    /// Externalizable handlers, handed to the AMF3 codec on avmplus
    registry: Option<Arc<ExternalizableRegistry>>,
    /// Current nesting depth
    depth: usize,
}

impl Amf0Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self {
            references: Vec::new(),
            registry: None,
            depth: 0,
        }
    }

    /// Create a decoder that resolves externalizable classes in embedded
    /// AMF3 values
    pub fn with_registry(registry: Arc<ExternalizableRegistry>) -> Self {
        Self {
            registry: Some(registry),
            ..Self::new()
        }
    }

    /// Reset decoder state (call between messages)
    pub fn reset(&mut self) {
        self.references.clear();
        self.depth = 0;
    }

    /// Decode a single AMF0 value from the buffer
    pub fn decode(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        if buf.is_empty() {
            return Err(AmfError::Truncated);
        }

        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(AmfError::NestingTooDeep);
        }

        let marker = buf.get_u8();
        let result = self.decode_value(marker, buf);
        self.depth -= 1;
        result
    }

    fn decode_value(&mut self, marker: u8, buf: &mut Bytes) -> Result<AmfValue> {
        match marker {
            MARKER_NUMBER => self.decode_number(buf),
            MARKER_BOOLEAN => self.decode_boolean(buf),
            MARKER_STRING => self.decode_string(buf),
            MARKER_OBJECT => self.decode_object(buf),
            MARKER_NULL => Ok(AmfValue::Null),
            MARKER_UNDEFINED => Ok(AmfValue::Undefined),
            MARKER_REFERENCE => self.decode_reference(buf),
            MARKER_ECMA_ARRAY => self.decode_ecma_array(buf),
            MARKER_STRICT_ARRAY => self.decode_strict_array(buf),
            MARKER_DATE => self.decode_date(buf),
            MARKER_LONG_STRING => self.decode_long_string(buf),
            MARKER_UNSUPPORTED => Ok(AmfValue::Undefined),
            MARKER_XML_DOCUMENT => self.decode_xml(buf),
            MARKER_TYPED_OBJECT => self.decode_typed_object(buf),
            MARKER_AVMPLUS => self.decode_avmplus(buf),
            _ => Err(AmfError::UnknownMarker { marker, version: 0 }),
        }
    }

    fn decode_number(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        if buf.remaining() < 8 {
            return Err(AmfError::Truncated);
        }
        Ok(AmfValue::Number(buf.get_f64()))
    }

    fn decode_boolean(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        if buf.is_empty() {
            return Err(AmfError::Truncated);
        }
        Ok(AmfValue::Boolean(buf.get_u8() != 0))
    }

    fn decode_string(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let s = self.read_utf8(buf)?;
        Ok(AmfValue::String(s))
    }

    fn decode_long_string(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let s = self.read_utf8_long(buf)?;
        Ok(AmfValue::String(s))
    }

    fn decode_object(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let shell = Rc::new(RefCell::new(AmfObject::new()));
        self.references.push(AmfValue::Object(shell.clone()));

        let members = self.read_members(buf)?;
        shell.borrow_mut().dynamic = members;
        Ok(AmfValue::Object(shell))
    }

    fn decode_typed_object(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let class_name = self.read_utf8(buf)?;

        let shell = Rc::new(RefCell::new(AmfObject::with_class(class_name)));
        self.references.push(AmfValue::Object(shell.clone()));

        let members = self.read_members(buf)?;
        shell.borrow_mut().dynamic = members;
        Ok(AmfValue::Object(shell))
    }

    fn decode_ecma_array(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        if buf.remaining() < 4 {
            return Err(AmfError::Truncated);
        }

        // Count is a hint only; the body is object-shaped
        let _count = buf.get_u32();

        let shell = Rc::new(RefCell::new(AmfArray::default()));
        self.references.push(AmfValue::Array(shell.clone()));

        let members = self.read_members(buf)?;
        shell.borrow_mut().assoc = members;
        Ok(AmfValue::Array(shell))
    }

    fn decode_strict_array(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        if buf.remaining() < 4 {
            return Err(AmfError::Truncated);
        }

        let count = buf.get_u32() as usize;

        let shell = Rc::new(RefCell::new(AmfArray::default()));
        self.references.push(AmfValue::Array(shell.clone()));

        let mut dense = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            dense.push(self.decode(buf)?);
        }

        shell.borrow_mut().dense = dense;
        Ok(AmfValue::Array(shell))
    }

    fn decode_date(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        if buf.remaining() < 10 {
            return Err(AmfError::Truncated);
        }

        let millis = buf.get_f64();
        let _timezone = buf.get_i16(); // Reserved; ignored on read

        Ok(AmfValue::date(millis))
    }

    fn decode_reference(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        if buf.remaining() < 2 {
            return Err(AmfError::Truncated);
        }

        let index = buf.get_u16() as usize;
        self.references
            .get(index)
            .cloned()
            .ok_or(AmfError::BadReference {
                kind: RefKind::Object,
                index,
            })
    }

    fn decode_xml(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let s = self.read_utf8_long(buf)?;
        Ok(AmfValue::XmlDocument(Rc::new(s)))
    }

    /// AMF3 value embedded in an AMF0 stream
    ///
    /// The AMF3 codec gets fresh reference tables for this one value; the
    /// surrounding AMF0 reference list is unaffected.
    fn decode_avmplus(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let mut decoder = match &self.registry {
            Some(registry) => Amf3Decoder::with_registry(registry.clone()),
            None => Amf3Decoder::new(),
        };
        decoder.decode(buf)
    }

    /// Read key/value pairs up to the empty-key object-end marker
    fn read_members(&mut self, buf: &mut Bytes) -> Result<Vec<(String, AmfValue)>> {
        let mut members = Vec::new();

        loop {
            let key = self.read_utf8(buf)?;

            if key.is_empty() {
                if buf.is_empty() {
                    return Err(AmfError::Truncated);
                }
                let end_marker = buf.get_u8();
                if end_marker != MARKER_OBJECT_END {
                    return Err(AmfError::UnknownMarker {
                        marker: end_marker,
                        version: 0,
                    });
                }
                break;
            }

            let value = self.decode(buf)?;
            members.push((key, value));
        }

        Ok(members)
    }

    /// Read UTF-8 string with 16-bit length prefix
    fn read_utf8(&mut self, buf: &mut Bytes) -> Result<String> {
        if buf.remaining() < 2 {
            return Err(AmfError::Truncated);
        }

        let len = buf.get_u16() as usize;
        if buf.remaining() < len {
            return Err(AmfError::Truncated);
        }

        let bytes = buf.copy_to_bytes(len);
        String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)
    }

    /// Read UTF-8 string with 32-bit length prefix
    fn read_utf8_long(&mut self, buf: &mut Bytes) -> Result<String> {
        if buf.remaining() < 4 {
            return Err(AmfError::Truncated);
        }

        let len = buf.get_u32() as usize;
        if buf.remaining() < len {
            return Err(AmfError::Truncated);
        }

        let bytes = buf.copy_to_bytes(len);
        String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)
    }
}

impl Default for Amf0Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// AMF0 encoder
///
/// Values AMF0 has no marker for (byte arrays, E4X XML, vectors,
/// dictionaries, externalizable objects) are emitted through the avmplus
/// bridge: marker 0x11 followed by an AMF3 body with fresh tables.
pub struct Amf0Encoder {
    buf: BytesMut,
    registry: Option<Arc<ExternalizableRegistry>>,
    max_size: usize,
    /// AMF0 output has no reference markers on the write side, so cyclic
    /// graphs cannot terminate; the depth guard surfaces them instead
    depth: usize,
}

impl Amf0Encoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create encoder with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            registry: None,
            max_size: DEFAULT_MAX_SIZE,
            depth: 0,
        }
    }

    /// Set the externalizable class handlers for embedded AMF3 values
    pub fn registry(mut self, registry: Arc<ExternalizableRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the output size ceiling (default 16 MiB)
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Get the encoded bytes and reset encoder
    pub fn finish(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    /// Get current encoded length
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if encoder is empty
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Encode a single AMF0 value
    pub fn encode(&mut self, value: &AmfValue) -> Result<()> {
        self.depth += 1;
        let result = if self.depth > MAX_NESTING_DEPTH {
            Err(AmfError::NestingTooDeep)
        } else {
            self.encode_value(value)
        };
        self.depth -= 1;
        result
    }

    fn encode_value(&mut self, value: &AmfValue) -> Result<()> {
        self.check_capacity(16)?;

        match value {
            AmfValue::Null => {
                self.buf.put_u8(MARKER_NULL);
            }
            AmfValue::Undefined => {
                self.buf.put_u8(MARKER_UNDEFINED);
            }
            AmfValue::Boolean(b) => {
                self.buf.put_u8(MARKER_BOOLEAN);
                self.buf.put_u8(*b as u8);
            }
            AmfValue::Number(n) => {
                self.buf.put_u8(MARKER_NUMBER);
                self.buf.put_f64(*n);
            }
            AmfValue::Integer(i) => {
                // AMF0 has no integer marker
                self.buf.put_u8(MARKER_NUMBER);
                self.buf.put_f64(*i as f64);
            }
            AmfValue::String(s) => {
                self.check_capacity(5 + s.len())?;
                if s.len() > 0xFFFF {
                    self.buf.put_u8(MARKER_LONG_STRING);
                    self.buf.put_u32(s.len() as u32);
                } else {
                    self.buf.put_u8(MARKER_STRING);
                    self.buf.put_u16(s.len() as u16);
                }
                self.buf.put_slice(s.as_bytes());
            }
            AmfValue::Object(handle) => {
                let object = handle.borrow();
                if object.externalizable {
                    drop(object);
                    return self.write_avmplus(value);
                }
                if object.class_name.is_empty() {
                    self.buf.put_u8(MARKER_OBJECT);
                } else {
                    self.buf.put_u8(MARKER_TYPED_OBJECT);
                    self.write_utf8(&object.class_name)?;
                }
                for (key, val) in object.sealed.iter().chain(object.dynamic.iter()) {
                    self.write_utf8(key)?;
                    self.encode(val)?;
                }
                self.write_object_end();
            }
            AmfValue::Array(handle) => {
                let array = handle.borrow();
                if array.assoc.is_empty() {
                    self.buf.put_u8(MARKER_STRICT_ARRAY);
                    self.buf.put_u32(array.dense.len() as u32);
                    for elem in &array.dense {
                        self.encode(elem)?;
                    }
                } else {
                    // Mixed arrays become ECMA arrays; dense entries are
                    // keyed by their decimal index
                    self.buf.put_u8(MARKER_ECMA_ARRAY);
                    self.buf
                        .put_u32((array.dense.len() + array.assoc.len()) as u32);
                    for (i, elem) in array.dense.iter().enumerate() {
                        self.write_utf8(&i.to_string())?;
                        self.encode(elem)?;
                    }
                    for (key, val) in &array.assoc {
                        self.write_utf8(key)?;
                        self.encode(val)?;
                    }
                    self.write_object_end();
                }
            }
            AmfValue::Date(handle) => {
                self.buf.put_u8(MARKER_DATE);
                self.buf.put_f64(**handle);
                self.buf.put_i16(0); // Reserved timezone, zero on write
            }
            AmfValue::XmlDocument(handle) => {
                self.check_capacity(5 + handle.len())?;
                self.buf.put_u8(MARKER_XML_DOCUMENT);
                self.buf.put_u32(handle.len() as u32);
                self.buf.put_slice(handle.as_bytes());
            }
            AmfValue::Xml(_)
            | AmfValue::ByteArray(_)
            | AmfValue::IntVector(_)
            | AmfValue::UintVector(_)
            | AmfValue::DoubleVector(_)
            | AmfValue::ObjectVector(_)
            | AmfValue::Dictionary(_) => {
                // AMF3-only value types
                self.write_avmplus(value)?;
            }
        }

        Ok(())
    }

    /// Encode a value as avmplus: marker 0x11 plus an AMF3 body
    ///
    /// The AMF3 encoder gets fresh reference tables; the surrounding AMF0
    /// context is unaffected. Exposed so callers can force AMF3 encoding
    /// for any single value from an AMF0 context.
    pub fn write_avmplus(&mut self, value: &AmfValue) -> Result<()> {
        let mut encoder = Amf3Encoder::new().max_size(self.max_size);
        if let Some(registry) = &self.registry {
            encoder = encoder.registry(registry.clone());
        }
        encoder.encode(value)?;
        let body = encoder.finish();

        self.check_capacity(1 + body.len())?;
        self.buf.put_u8(MARKER_AVMPLUS);
        self.buf.put_slice(&body);
        Ok(())
    }

    fn write_object_end(&mut self) {
        self.buf.put_u16(0); // Empty key
        self.buf.put_u8(MARKER_OBJECT_END);
    }

    /// Write UTF-8 string with 16-bit length prefix (no type marker)
    fn write_utf8(&mut self, s: &str) -> Result<()> {
        if s.len() > 0xFFFF {
            return Err(AmfError::OutOfRange);
        }
        self.check_capacity(2 + s.len())?;
        self.buf.put_u16(s.len() as u16);
        self.buf.put_slice(s.as_bytes());
        Ok(())
    }

    fn check_capacity(&self, additional: usize) -> Result<()> {
        if self.buf.len() + additional > self.max_size {
            return Err(AmfError::BufferTooSmall);
        }
        Ok(())
    }
}

impl Default for Amf0Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to encode a single value
pub fn encode(value: &AmfValue) -> Result<Bytes> {
    let mut encoder = Amf0Encoder::new();
    encoder.encode(value)?;
    Ok(encoder.finish())
}

/// Convenience function to decode a single value
pub fn decode(data: &[u8]) -> Result<AmfValue> {
    let mut decoder = Amf0Decoder::new();
    let mut buf = Bytes::copy_from_slice(data);
    decoder.decode(&mut buf)
}
