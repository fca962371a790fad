//! AMF3 encoder and decoder
//!
//! AMF3 is the ActionScript 3.0 serialization format. It's more compact
//! than AMF0 thanks to a native integer type and three per-message
//! reference tables (strings, objects, traits): a value already emitted in
//! the same message is written as a table index instead of being inlined.
//!
//! Every complex value starts with a U29 header whose low bit selects
//! reference (0) or inline (1). The decoder appends a container's shell to
//! the object table *before* reading its contents; that ordering is what
//! lets cyclic graphs terminate, and each reader below preserves it.
//!
//! Type Markers:
//! ```text
//! 0x00 - Undefined
//! 0x01 - Null
//! 0x02 - Boolean false
//! 0x03 - Boolean true
//! 0x04 - Integer (29-bit signed)
//! 0x05 - Double
//! 0x06 - String
//! 0x07 - XML Document (legacy)
//! 0x08 - Date
//! 0x09 - Array
//! 0x0A - Object
//! 0x0B - XML
//! 0x0C - ByteArray
//! 0x0D - Vector<int>
//! 0x0E - Vector<uint>
//! 0x0F - Vector<double>
//! 0x10 - Vector<Object>
//! 0x11 - Dictionary
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use super::externalizable::ExternalizableRegistry;
use super::u29;
use super::value::{
    AmfArray, AmfDictionary, AmfObject, AmfValue, DoubleVector, IntVector, ObjectVector,
    UintVector,
};
use crate::error::{AmfError, RefKind, Result};

// AMF3 type markers
const MARKER_UNDEFINED: u8 = 0x00;
const MARKER_NULL: u8 = 0x01;
const MARKER_FALSE: u8 = 0x02;
const MARKER_TRUE: u8 = 0x03;
const MARKER_INTEGER: u8 = 0x04;
const MARKER_DOUBLE: u8 = 0x05;
const MARKER_STRING: u8 = 0x06;
const MARKER_XML_DOC: u8 = 0x07;
const MARKER_DATE: u8 = 0x08;
const MARKER_ARRAY: u8 = 0x09;
const MARKER_OBJECT: u8 = 0x0A;
const MARKER_XML: u8 = 0x0B;
const MARKER_BYTE_ARRAY: u8 = 0x0C;
const MARKER_VECTOR_INT: u8 = 0x0D;
const MARKER_VECTOR_UINT: u8 = 0x0E;
const MARKER_VECTOR_DOUBLE: u8 = 0x0F;
const MARKER_VECTOR_OBJECT: u8 = 0x10;
const MARKER_DICTIONARY: u8 = 0x11;

/// Maximum nesting depth
const MAX_NESTING_DEPTH: usize = 64;

/// Default encode output ceiling (16 MiB)
pub const DEFAULT_MAX_SIZE: usize = 16 * 1024 * 1024;

/// Trait descriptor shared by object instances
///
/// Identity in the trait table is positional (the index at which the trait
/// was first emitted); equality of descriptors is structural over all four
/// fields.
#[derive(Clone, Debug, PartialEq)]
struct TraitDef {
    class_name: String,
    sealed_names: Vec<String>,
    dynamic: bool,
    externalizable: bool,
}

/// AMF3 decoder with reference tables
///
/// Tables are per top-level decode; call [`reset`](Self::reset) between
/// messages (the Remoting layer does this by constructing fresh decoders).
pub struct Amf3Decoder {
    /// String reference table
    string_refs: Vec<String>,
    /// Object reference table (shallow handle clones)
    object_refs: Vec<AmfValue>,
    /// Trait reference table (class definitions)
    trait_refs: Vec<TraitDef>,
    /// Externalizable class handlers
    registry: Option<Arc<ExternalizableRegistry>>,
    /// Current nesting depth
    depth: usize,
}

impl Amf3Decoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self {
            string_refs: Vec::new(),
            object_refs: Vec::new(),
            trait_refs: Vec::new(),
            registry: None,
            depth: 0,
        }
    }

    /// Create a decoder that resolves externalizable classes
    pub fn with_registry(registry: Arc<ExternalizableRegistry>) -> Self {
        Self {
            registry: Some(registry),
            ..Self::new()
        }
    }

    /// Reset decoder state (call between messages)
    pub fn reset(&mut self) {
        self.string_refs.clear();
        self.object_refs.clear();
        self.trait_refs.clear();
        self.depth = 0;
    }

    /// Decode a single AMF3 value
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
            MARKER_UNDEFINED => Ok(AmfValue::Undefined),
            MARKER_NULL => Ok(AmfValue::Null),
            MARKER_FALSE => Ok(AmfValue::Boolean(false)),
            MARKER_TRUE => Ok(AmfValue::Boolean(true)),
            MARKER_INTEGER => self.decode_integer(buf),
            MARKER_DOUBLE => self.decode_double(buf),
            MARKER_STRING => self.decode_string(buf),
            MARKER_XML_DOC | MARKER_XML => self.decode_xml(marker, buf),
            MARKER_DATE => self.decode_date(buf),
            MARKER_ARRAY => self.decode_array(buf),
            MARKER_OBJECT => self.decode_object(buf),
            MARKER_BYTE_ARRAY => self.decode_byte_array(buf),
            MARKER_VECTOR_INT => self.decode_int_vector(buf),
            MARKER_VECTOR_UINT => self.decode_uint_vector(buf),
            MARKER_VECTOR_DOUBLE => self.decode_double_vector(buf),
            MARKER_VECTOR_OBJECT => self.decode_object_vector(buf),
            MARKER_DICTIONARY => self.decode_dictionary(buf),
            _ => Err(AmfError::UnknownMarker { marker, version: 3 }),
        }
    }

    fn decode_integer(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let value = u29::read_u29(buf)?;
        Ok(AmfValue::Integer(u29::sign_extend(value)))
    }

    fn decode_double(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        if buf.remaining() < 8 {
            return Err(AmfError::Truncated);
        }
        Ok(AmfValue::Number(buf.get_f64()))
    }

    fn decode_string(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let s = self.read_string(buf)?;
        Ok(AmfValue::String(s))
    }

    fn decode_xml(&mut self, marker: u8, buf: &mut Bytes) -> Result<AmfValue> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            return self.object_ref((header >> 1) as usize);
        }

        let len = (header >> 1) as usize;
        if buf.remaining() < len {
            return Err(AmfError::Truncated);
        }

        let bytes = buf.copy_to_bytes(len);
        let s = String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)?;
        let value = if marker == MARKER_XML {
            AmfValue::Xml(Rc::new(s))
        } else {
            AmfValue::XmlDocument(Rc::new(s))
        };
        self.object_refs.push(value.clone());
        Ok(value)
    }

    fn decode_date(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            return self.object_ref((header >> 1) as usize);
        }

        // Inline header high bits are canonically zero and carry nothing
        if buf.remaining() < 8 {
            return Err(AmfError::Truncated);
        }

        let millis = buf.get_f64();
        let value = AmfValue::Date(Rc::new(millis));
        self.object_refs.push(value.clone());
        Ok(value)
    }

    fn decode_array(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            return self.object_ref((header >> 1) as usize);
        }

        let dense_count = (header >> 1) as usize;

        // Shell goes into the table before any contents are read, so a
        // nested reference back to this array resolves to the same handle
        let shell = Rc::new(RefCell::new(AmfArray::default()));
        self.object_refs.push(AmfValue::Array(shell.clone()));

        // Associative portion: key/value pairs until the empty key
        let mut assoc = Vec::new();
        loop {
            let key = self.read_string(buf)?;
            if key.is_empty() {
                break;
            }
            if key.parse::<usize>().map_or(false, |i| i < dense_count) {
                // Wire-malformed by convention; attached as a named
                // property all the same
                tracing::trace!(key = %key, "integer key in associative array portion");
            }
            let value = self.decode(buf)?;
            assoc.push((key, value));
        }

        // Dense portion
        let mut dense = Vec::with_capacity(dense_count.min(1024));
        for _ in 0..dense_count {
            dense.push(self.decode(buf)?);
        }

        {
            let mut array = shell.borrow_mut();
            array.dense = dense;
            array.assoc = assoc;
        }
        Ok(AmfValue::Array(shell))
    }

    fn decode_object(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            return self.object_ref((header >> 1) as usize);
        }

        let trait_def = if header & 2 == 0 {
            // Trait reference
            let idx = (header >> 2) as usize;
            self.trait_refs
                .get(idx)
                .cloned()
                .ok_or(AmfError::BadReference {
                    kind: RefKind::Trait,
                    index: idx,
                })?
        } else {
            // Inline trait
            let externalizable = header & 4 != 0;
            let dynamic = header & 8 != 0;
            let sealed_count = (header >> 4) as usize;

            if externalizable && sealed_count > 0 {
                return Err(AmfError::MalformedTrait);
            }

            let class_name = self.read_string(buf)?;

            let mut sealed_names = Vec::with_capacity(sealed_count.min(1024));
            for _ in 0..sealed_count {
                sealed_names.push(self.read_string(buf)?);
            }

            let trait_def = TraitDef {
                class_name,
                sealed_names,
                dynamic,
                externalizable,
            };
            self.trait_refs.push(trait_def.clone());
            trait_def
        };

        if trait_def.externalizable {
            return self.decode_externalizable(&trait_def.class_name, buf);
        }

        let shell = Rc::new(RefCell::new(AmfObject {
            class_name: trait_def.class_name.clone(),
            ..AmfObject::default()
        }));
        self.object_refs.push(AmfValue::Object(shell.clone()));

        // Sealed values follow in trait declaration order
        let mut sealed = Vec::with_capacity(trait_def.sealed_names.len());
        for name in &trait_def.sealed_names {
            let value = self.decode(buf)?;
            sealed.push((name.clone(), value));
        }

        // Dynamic members terminated by the empty-string name (which obeys
        // the usual inline/reference string rules)
        let mut dynamic = Vec::new();
        if trait_def.dynamic {
            loop {
                let key = self.read_string(buf)?;
                if key.is_empty() {
                    break;
                }
                let value = self.decode(buf)?;
                dynamic.push((key, value));
            }
        }

        {
            let mut object = shell.borrow_mut();
            object.sealed = sealed;
            object.dynamic = dynamic;
        }
        Ok(AmfValue::Object(shell))
    }

    fn decode_externalizable(&mut self, class_name: &str, buf: &mut Bytes) -> Result<AmfValue> {
        // The body shape is opaque, so the table slot holds a placeholder
        // until the registered reader returns
        let idx = self.object_refs.len();
        self.object_refs.push(AmfValue::Null);

        let registry = self
            .registry
            .clone()
            .ok_or_else(|| AmfError::ExternalizableNotRegistered(class_name.to_string()))?;
        let reader = registry
            .reader(class_name)
            .ok_or_else(|| AmfError::ExternalizableNotRegistered(class_name.to_string()))?;

        let value = reader(self, buf)?;
        self.object_refs[idx] = value.clone();
        Ok(value)
    }

    fn decode_byte_array(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            return self.object_ref((header >> 1) as usize);
        }

        let len = (header >> 1) as usize;
        if buf.remaining() < len {
            return Err(AmfError::Truncated);
        }

        let data = buf.copy_to_bytes(len).to_vec();
        let value = AmfValue::ByteArray(Rc::new(data));
        self.object_refs.push(value.clone());
        Ok(value)
    }

    fn decode_int_vector(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            return self.object_ref((header >> 1) as usize);
        }

        let len = (header >> 1) as usize;
        let shell = Rc::new(RefCell::new(IntVector::default()));
        self.object_refs.push(AmfValue::IntVector(shell.clone()));

        let fixed = self.read_fixed_flag(buf)?;
        if buf.remaining() < len * 4 {
            return Err(AmfError::Truncated);
        }

        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(buf.get_i32());
        }

        {
            let mut vector = shell.borrow_mut();
            vector.fixed = fixed;
            vector.items = items;
        }
        Ok(AmfValue::IntVector(shell))
    }

    fn decode_uint_vector(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            return self.object_ref((header >> 1) as usize);
        }

        let len = (header >> 1) as usize;
        let shell = Rc::new(RefCell::new(UintVector::default()));
        self.object_refs.push(AmfValue::UintVector(shell.clone()));

        let fixed = self.read_fixed_flag(buf)?;
        if buf.remaining() < len * 4 {
            return Err(AmfError::Truncated);
        }

        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(buf.get_u32());
        }

        {
            let mut vector = shell.borrow_mut();
            vector.fixed = fixed;
            vector.items = items;
        }
        Ok(AmfValue::UintVector(shell))
    }

    fn decode_double_vector(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            return self.object_ref((header >> 1) as usize);
        }

        let len = (header >> 1) as usize;
        let shell = Rc::new(RefCell::new(DoubleVector::default()));
        self.object_refs.push(AmfValue::DoubleVector(shell.clone()));

        let fixed = self.read_fixed_flag(buf)?;
        if buf.remaining() < len * 8 {
            return Err(AmfError::Truncated);
        }

        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(buf.get_f64());
        }

        {
            let mut vector = shell.borrow_mut();
            vector.fixed = fixed;
            vector.items = items;
        }
        Ok(AmfValue::DoubleVector(shell))
    }

    fn decode_object_vector(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            return self.object_ref((header >> 1) as usize);
        }

        let len = (header >> 1) as usize;
        let shell = Rc::new(RefCell::new(ObjectVector::default()));
        self.object_refs.push(AmfValue::ObjectVector(shell.clone()));

        let fixed = self.read_fixed_flag(buf)?;
        let type_name = self.read_string(buf)?;

        let mut items = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            items.push(self.decode(buf)?);
        }

        {
            let mut vector = shell.borrow_mut();
            vector.type_name = type_name;
            vector.fixed = fixed;
            vector.items = items;
        }
        Ok(AmfValue::ObjectVector(shell))
    }

    fn decode_dictionary(&mut self, buf: &mut Bytes) -> Result<AmfValue> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            return self.object_ref((header >> 1) as usize);
        }

        let len = (header >> 1) as usize;
        let shell = Rc::new(RefCell::new(AmfDictionary::default()));
        self.object_refs.push(AmfValue::Dictionary(shell.clone()));

        let weak_keys = self.read_fixed_flag(buf)?;

        let mut entries = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            let key = self.decode(buf)?;
            let value = self.decode(buf)?;
            entries.push((key, value));
        }

        {
            let mut dictionary = shell.borrow_mut();
            dictionary.weak_keys = weak_keys;
            dictionary.entries = entries;
        }
        Ok(AmfValue::Dictionary(shell))
    }

    /// Resolve an object-table reference to a shallow handle clone
    fn object_ref(&self, index: usize) -> Result<AmfValue> {
        self.object_refs
            .get(index)
            .cloned()
            .ok_or(AmfError::BadReference {
                kind: RefKind::Object,
                index,
            })
    }

    fn read_fixed_flag(&mut self, buf: &mut Bytes) -> Result<bool> {
        if buf.is_empty() {
            return Err(AmfError::Truncated);
        }
        Ok(buf.get_u8() != 0)
    }

    /// Read an AMF3 string (no marker byte, reference-aware)
    ///
    /// Used for value strings, class names, trait member names, and
    /// associative keys alike; all share the string reference table.
    pub fn read_string(&mut self, buf: &mut Bytes) -> Result<String> {
        let header = u29::read_u29(buf)?;

        if header & 1 == 0 {
            let idx = (header >> 1) as usize;
            return self
                .string_refs
                .get(idx)
                .cloned()
                .ok_or(AmfError::BadReference {
                    kind: RefKind::String,
                    index: idx,
                });
        }

        let len = (header >> 1) as usize;
        if len == 0 {
            return Ok(String::new());
        }

        if buf.remaining() < len {
            return Err(AmfError::Truncated);
        }

        let bytes = buf.copy_to_bytes(len);
        let s = String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)?;

        // Only non-empty strings go into the reference table
        self.string_refs.push(s.clone());
        Ok(s)
    }
}

impl Default for Amf3Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// AMF3 encoder with reference tables
///
/// String lookup is by value, object lookup is by handle identity, trait
/// lookup is by structural equality of the descriptor. A handle-identical
/// value met a second time is always emitted as a reference; that is what
/// makes shared subgraphs and cycles round-trip.
pub struct Amf3Encoder {
    buf: BytesMut,
    string_refs: HashMap<String, usize>,
    /// Handle address -> object table index
    object_refs: HashMap<usize, usize>,
    object_count: usize,
    trait_refs: Vec<TraitDef>,
    registry: Option<Arc<ExternalizableRegistry>>,
    max_size: usize,
}

impl Amf3Encoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create an encoder with a specific initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            string_refs: HashMap::new(),
            object_refs: HashMap::new(),
            object_count: 0,
            trait_refs: Vec::new(),
            registry: None,
            max_size: DEFAULT_MAX_SIZE,
        }
    }

    /// Set the externalizable class handlers
    pub fn registry(mut self, registry: Arc<ExternalizableRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the output size ceiling (default 16 MiB)
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Get encoded bytes and reset all tables
    pub fn finish(&mut self) -> Bytes {
        self.string_refs.clear();
        self.object_refs.clear();
        self.object_count = 0;
        self.trait_refs.clear();
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

    /// Encode a single AMF3 value
    pub fn encode(&mut self, value: &AmfValue) -> Result<()> {
        // Scalar headroom; payload writes carry their own exact checks
        self.check_capacity(16)?;

        match value {
            AmfValue::Undefined => self.buf.put_u8(MARKER_UNDEFINED),
            AmfValue::Null => self.buf.put_u8(MARKER_NULL),
            AmfValue::Boolean(false) => self.buf.put_u8(MARKER_FALSE),
            AmfValue::Boolean(true) => self.buf.put_u8(MARKER_TRUE),
            AmfValue::Integer(i) if (u29::INT_MIN..=u29::INT_MAX).contains(i) => {
                self.buf.put_u8(MARKER_INTEGER);
                self.write_u29(u29::to_wire(*i))?;
            }
            AmfValue::Integer(i) => {
                // Outside the 29-bit signed domain: promote to Double
                self.buf.put_u8(MARKER_DOUBLE);
                self.buf.put_f64(*i as f64);
            }
            AmfValue::Number(n) => {
                self.buf.put_u8(MARKER_DOUBLE);
                self.buf.put_f64(*n);
            }
            AmfValue::String(s) => {
                self.buf.put_u8(MARKER_STRING);
                self.write_string(s)?;
            }
            AmfValue::Date(handle) => {
                self.buf.put_u8(MARKER_DATE);
                let addr = Rc::as_ptr(handle) as usize;
                if self.write_object_ref(addr)? {
                    return Ok(());
                }
                self.write_u29(1)?;
                self.buf.put_f64(**handle);
            }
            AmfValue::XmlDocument(handle) => {
                self.buf.put_u8(MARKER_XML_DOC);
                let addr = Rc::as_ptr(handle) as usize;
                if self.write_object_ref(addr)? {
                    return Ok(());
                }
                self.write_length_prefixed(handle.as_bytes())?;
            }
            AmfValue::Xml(handle) => {
                self.buf.put_u8(MARKER_XML);
                let addr = Rc::as_ptr(handle) as usize;
                if self.write_object_ref(addr)? {
                    return Ok(());
                }
                self.write_length_prefixed(handle.as_bytes())?;
            }
            AmfValue::ByteArray(handle) => {
                self.buf.put_u8(MARKER_BYTE_ARRAY);
                let addr = Rc::as_ptr(handle) as usize;
                if self.write_object_ref(addr)? {
                    return Ok(());
                }
                self.write_length_prefixed(handle)?;
            }
            AmfValue::Array(handle) => {
                self.buf.put_u8(MARKER_ARRAY);
                let addr = Rc::as_ptr(handle) as usize;
                if self.write_object_ref(addr)? {
                    return Ok(());
                }
                let array = handle.borrow();
                self.write_u29(((array.dense.len() as u32) << 1) | 1)?;
                for (key, value) in &array.assoc {
                    self.write_string(key)?;
                    self.encode(value)?;
                }
                self.write_string("")?;
                for value in &array.dense {
                    self.encode(value)?;
                }
            }
            AmfValue::Object(handle) => {
                self.encode_object(handle)?;
            }
            AmfValue::IntVector(handle) => {
                self.buf.put_u8(MARKER_VECTOR_INT);
                let addr = Rc::as_ptr(handle) as usize;
                if self.write_object_ref(addr)? {
                    return Ok(());
                }
                let vector = handle.borrow();
                self.write_u29(((vector.items.len() as u32) << 1) | 1)?;
                self.check_capacity(1 + vector.items.len() * 4)?;
                self.buf.put_u8(vector.fixed as u8);
                for item in &vector.items {
                    self.buf.put_i32(*item);
                }
            }
            AmfValue::UintVector(handle) => {
                self.buf.put_u8(MARKER_VECTOR_UINT);
                let addr = Rc::as_ptr(handle) as usize;
                if self.write_object_ref(addr)? {
                    return Ok(());
                }
                let vector = handle.borrow();
                self.write_u29(((vector.items.len() as u32) << 1) | 1)?;
                self.check_capacity(1 + vector.items.len() * 4)?;
                self.buf.put_u8(vector.fixed as u8);
                for item in &vector.items {
                    self.buf.put_u32(*item);
                }
            }
            AmfValue::DoubleVector(handle) => {
                self.buf.put_u8(MARKER_VECTOR_DOUBLE);
                let addr = Rc::as_ptr(handle) as usize;
                if self.write_object_ref(addr)? {
                    return Ok(());
                }
                let vector = handle.borrow();
                self.write_u29(((vector.items.len() as u32) << 1) | 1)?;
                self.check_capacity(1 + vector.items.len() * 8)?;
                self.buf.put_u8(vector.fixed as u8);
                for item in &vector.items {
                    self.buf.put_f64(*item);
                }
            }
            AmfValue::ObjectVector(handle) => {
                self.buf.put_u8(MARKER_VECTOR_OBJECT);
                let addr = Rc::as_ptr(handle) as usize;
                if self.write_object_ref(addr)? {
                    return Ok(());
                }
                let vector = handle.borrow();
                self.write_u29(((vector.items.len() as u32) << 1) | 1)?;
                self.buf.put_u8(vector.fixed as u8);
                self.write_string(&vector.type_name)?;
                for item in &vector.items {
                    self.encode(item)?;
                }
            }
            AmfValue::Dictionary(handle) => {
                self.buf.put_u8(MARKER_DICTIONARY);
                let addr = Rc::as_ptr(handle) as usize;
                if self.write_object_ref(addr)? {
                    return Ok(());
                }
                let dictionary = handle.borrow();
                self.write_u29(((dictionary.entries.len() as u32) << 1) | 1)?;
                self.buf.put_u8(dictionary.weak_keys as u8);
                for (key, value) in &dictionary.entries {
                    self.encode(key)?;
                    self.encode(value)?;
                }
            }
        }

        Ok(())
    }

    fn encode_object(&mut self, handle: &Rc<RefCell<AmfObject>>) -> Result<()> {
        self.buf.put_u8(MARKER_OBJECT);
        let addr = Rc::as_ptr(handle) as usize;
        if self.write_object_ref(addr)? {
            return Ok(());
        }

        let trait_def = {
            let object = handle.borrow();
            TraitDef {
                class_name: object.class_name.clone(),
                sealed_names: object.sealed.iter().map(|(k, _)| k.clone()).collect(),
                dynamic: !object.externalizable && !object.dynamic.is_empty(),
                externalizable: object.externalizable,
            }
        };

        // Trait reference by structural equality, else inline
        if let Some(idx) = self.trait_refs.iter().position(|t| *t == trait_def) {
            self.write_u29(((idx as u32) << 2) | 0b01)?;
        } else {
            let header = if trait_def.externalizable {
                0b111
            } else {
                ((trait_def.sealed_names.len() as u32) << 4)
                    | ((trait_def.dynamic as u32) << 3)
                    | 0b011
            };
            self.write_u29(header)?;
            self.write_string(&trait_def.class_name)?;
            for name in &trait_def.sealed_names {
                self.write_string(name)?;
            }
            self.trait_refs.push(trait_def.clone());
        }

        if trait_def.externalizable {
            return self.encode_externalizable(handle);
        }

        let object = handle.borrow();
        for (_, value) in &object.sealed {
            self.encode(value)?;
        }
        if trait_def.dynamic {
            for (key, value) in &object.dynamic {
                self.write_string(key)?;
                self.encode(value)?;
            }
            self.write_string("")?;
        }

        Ok(())
    }

    fn encode_externalizable(&mut self, handle: &Rc<RefCell<AmfObject>>) -> Result<()> {
        let class_name = handle.borrow().class_name.clone();

        if let Some(registry) = self.registry.clone() {
            if let Some(writer) = registry.writer(&class_name) {
                return writer(self, &AmfValue::Object(handle.clone()));
            }
        }

        // No writer: a carried opaque body still round-trips
        let payload = handle.borrow().externalizable_payload.clone();
        match payload {
            Some(bytes) => {
                self.check_capacity(bytes.len())?;
                self.buf.put_slice(&bytes);
                Ok(())
            }
            None => Err(AmfError::ExternalizableNotRegistered(class_name)),
        }
    }

    /// Emit an object-table reference if the handle was already written.
    /// Returns true on a hit; on a miss the handle is assigned the next
    /// table slot (before any contents are encoded).
    fn write_object_ref(&mut self, addr: usize) -> Result<bool> {
        if let Some(&idx) = self.object_refs.get(&addr) {
            self.write_u29((idx as u32) << 1)?;
            return Ok(true);
        }
        self.object_refs.insert(addr, self.object_count);
        self.object_count += 1;
        Ok(false)
    }

    /// Write an AMF3 string (no marker byte, reference-aware)
    ///
    /// This is the single string writer: value strings, class names, trait
    /// member names, and associative keys all come through here. Only the
    /// caller decides whether a 0x06 marker precedes it.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        if s.is_empty() {
            // Distinguished empty-string header; never tabled
            return self.write_u29(1);
        }

        if let Some(&idx) = self.string_refs.get(s) {
            return self.write_u29((idx as u32) << 1);
        }

        let idx = self.string_refs.len();
        self.string_refs.insert(s.to_string(), idx);
        self.write_length_prefixed(s.as_bytes())
    }

    fn write_length_prefixed(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_u29(((bytes.len() as u32) << 1) | 1)?;
        self.check_capacity(bytes.len())?;
        self.buf.put_slice(bytes);
        Ok(())
    }

    fn write_u29(&mut self, value: u32) -> Result<()> {
        u29::write_u29(&mut self.buf, value)
    }

    fn check_capacity(&self, additional: usize) -> Result<()> {
        if self.buf.len() + additional > self.max_size {
            return Err(AmfError::BufferTooSmall);
        }
        Ok(())
    }
}

impl Default for Amf3Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience function to encode a single value
pub fn encode(value: &AmfValue) -> Result<Bytes> {
    let mut encoder = Amf3Encoder::new();
    encoder.encode(value)?;
    Ok(encoder.finish())
}

/// Convenience function to decode a single value
pub fn decode(data: &[u8]) -> Result<AmfValue> {
    let mut decoder = Amf3Decoder::new();
    let mut buf = Bytes::copy_from_slice(data);
    decoder.decode(&mut buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: &AmfValue) -> AmfValue {
        let encoded = encode(value).unwrap();
        decode(&encoded).unwrap()
    }

    #[test]
    fn test_integer_21() {
        assert_eq!(decode(&[0x04, 0x15]).unwrap(), AmfValue::Integer(21));
        assert_eq!(&encode(&AmfValue::Integer(21)).unwrap()[..], &[0x04, 0x15]);
    }

    #[test]
    fn test_integer_16384() {
        assert_eq!(
            decode(&[0x04, 0x81, 0x80, 0x00]).unwrap(),
            AmfValue::Integer(16384)
        );
    }

    #[test]
    fn test_integer_sign_extension() {
        // Bit 28 set on the wire means negative
        assert_eq!(
            decode(&[0x04, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap(),
            AmfValue::Integer(-1)
        );
        assert_eq!(roundtrip(&AmfValue::Integer(-1)), AmfValue::Integer(-1));
        assert_eq!(
            roundtrip(&AmfValue::Integer(u29::INT_MIN)),
            AmfValue::Integer(u29::INT_MIN)
        );
        assert_eq!(
            roundtrip(&AmfValue::Integer(u29::INT_MAX)),
            AmfValue::Integer(u29::INT_MAX)
        );
    }

    #[test]
    fn test_integer_promoted_to_double() {
        // 2^28 does not fit the signed 29-bit domain
        let encoded = encode(&AmfValue::Integer(u29::INT_MAX + 1)).unwrap();
        assert_eq!(encoded[0], MARKER_DOUBLE);
        assert_eq!(
            decode(&encoded).unwrap(),
            AmfValue::Number((u29::INT_MAX + 1) as f64)
        );
    }

    #[test]
    fn test_number_never_sniffed_to_integer() {
        let encoded = encode(&AmfValue::Number(3.0)).unwrap();
        assert_eq!(encoded[0], MARKER_DOUBLE);
        assert_eq!(decode(&encoded).unwrap(), AmfValue::Number(3.0));
    }

    #[test]
    fn test_non_finite_doubles() {
        let encoded = encode(&AmfValue::Number(f64::INFINITY)).unwrap();
        assert_eq!(decode(&encoded).unwrap(), AmfValue::Number(f64::INFINITY));

        let encoded = encode(&AmfValue::Number(f64::NAN)).unwrap();
        match decode(&encoded).unwrap() {
            AmfValue::Number(n) => assert!(n.is_nan()),
            other => panic!("Expected Number, got {:?}", other),
        }
    }

    #[test]
    fn test_string_hello() {
        let wire = [0x06, 0x0B, 0x68, 0x65, 0x6C, 0x6C, 0x6F];
        assert_eq!(decode(&wire).unwrap(), AmfValue::String("hello".into()));
        assert_eq!(&encode(&AmfValue::String("hello".into())).unwrap()[..], &wire);
    }

    #[test]
    fn test_empty_string_roundtrip() {
        let wire = [0x06, 0x01];
        assert_eq!(decode(&wire).unwrap(), AmfValue::String(String::new()));
        assert_eq!(&encode(&AmfValue::String(String::new())).unwrap()[..], &wire);
    }

    #[test]
    fn test_repeated_string_uses_references() {
        // One inline occurrence, then two references
        let value = AmfValue::array(vec![
            AmfValue::String("ns".into()),
            AmfValue::String("ns".into()),
            AmfValue::String("ns".into()),
        ]);
        let encoded = encode(&value).unwrap();
        assert_eq!(
            &encoded[..],
            &[0x09, 0x07, 0x01, 0x06, 0x05, 0x6E, 0x73, 0x06, 0x00, 0x06, 0x00]
        );

        let decoded = decode(&encoded).unwrap();
        if let AmfValue::Array(handle) = decoded {
            let array = handle.borrow();
            assert_eq!(array.dense.len(), 3);
            assert!(array.dense.iter().all(|v| v.as_str() == Some("ns")));
        } else {
            panic!("Expected Array");
        }
    }

    #[test]
    fn test_dense_array() {
        let wire = [0x09, 0x07, 0x01, 0x04, 0x01, 0x04, 0x02, 0x04, 0x03];
        let decoded = decode(&wire).unwrap();
        if let AmfValue::Array(handle) = &decoded {
            let array = handle.borrow();
            assert_eq!(
                array.dense,
                vec![AmfValue::Integer(1), AmfValue::Integer(2), AmfValue::Integer(3)]
            );
            assert!(array.assoc.is_empty());
        } else {
            panic!("Expected Array");
        }
        assert_eq!(&encode(&decoded).unwrap()[..], &wire);
    }

    #[test]
    fn test_mixed_array() {
        let arr = AmfValue::Array(Rc::new(RefCell::new(AmfArray {
            dense: vec![AmfValue::Integer(1)],
            assoc: vec![("name".to_string(), AmfValue::String("mixed".into()))],
        })));
        let decoded = roundtrip(&arr);
        assert_eq!(decoded, arr);
    }

    #[test]
    fn test_dynamic_object() {
        let wire = [
            0x0A, 0x0B, 0x01, 0x07, 0x66, 0x6F, 0x6F, 0x06, 0x07, 0x62, 0x61, 0x72, 0x01,
        ];
        let decoded = decode(&wire).unwrap();
        assert_eq!(decoded.get_string("foo"), Some("bar".to_string()));

        let value = AmfValue::object(vec![("foo".to_string(), "bar".into())]);
        assert_eq!(&encode(&value).unwrap()[..], &wire);
    }

    #[test]
    fn test_empty_anonymous_object() {
        let value = AmfValue::Object(Rc::new(RefCell::new(AmfObject::new())));
        let encoded = encode(&value).unwrap();
        // Inline object, inline trait, no members, empty class name
        assert_eq!(&encoded[..], &[0x0A, 0x03, 0x01]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_sealed_object_roundtrip() {
        let value = AmfValue::Object(Rc::new(RefCell::new(AmfObject {
            class_name: "com.example.Point".into(),
            sealed: vec![
                ("x".to_string(), AmfValue::Integer(3)),
                ("y".to_string(), AmfValue::Integer(4)),
            ],
            ..AmfObject::default()
        })));
        let decoded = roundtrip(&value);
        if let AmfValue::Object(handle) = &decoded {
            let object = handle.borrow();
            assert_eq!(object.class_name, "com.example.Point");
            assert_eq!(object.sealed.len(), 2);
            assert_eq!(object.sealed[0], ("x".to_string(), AmfValue::Integer(3)));
            assert_eq!(object.sealed[1], ("y".to_string(), AmfValue::Integer(4)));
            assert!(object.dynamic.is_empty());
        } else {
            panic!("Expected Object");
        }
    }

    #[test]
    fn test_sibling_objects_share_trait() {
        let a = AmfValue::Object(Rc::new(RefCell::new(AmfObject {
            class_name: "com.example.Pt".into(),
            sealed: vec![("x".to_string(), AmfValue::Integer(1))],
            ..AmfObject::default()
        })));
        let b = AmfValue::Object(Rc::new(RefCell::new(AmfObject {
            class_name: "com.example.Pt".into(),
            sealed: vec![("x".to_string(), AmfValue::Integer(2))],
            ..AmfObject::default()
        })));
        let value = AmfValue::array(vec![a, b]);
        let encoded = encode(&value).unwrap();

        // Class name bytes appear exactly once: the second object reuses
        // the trait by reference
        let needle = b"com.example.Pt";
        let hits = encoded
            .windows(needle.len())
            .filter(|w| w == needle)
            .count();
        assert_eq!(hits, 1);

        let decoded = decode(&encoded).unwrap();
        if let AmfValue::Array(handle) = decoded {
            let array = handle.borrow();
            for item in &array.dense {
                if let AmfValue::Object(o) = item {
                    assert_eq!(o.borrow().class_name, "com.example.Pt");
                } else {
                    panic!("Expected Object");
                }
            }
        } else {
            panic!("Expected Array");
        }
    }

    #[test]
    fn test_shared_object_identity_preserved() {
        let shared = AmfValue::object(vec![("k".to_string(), AmfValue::Integer(9))]);
        let value = AmfValue::array(vec![shared.clone(), shared.clone()]);
        let encoded = encode(&value).unwrap();

        let decoded = decode(&encoded).unwrap();
        if let AmfValue::Array(handle) = decoded {
            let array = handle.borrow();
            assert!(array.dense[0].ptr_eq(&array.dense[1]));
        } else {
            panic!("Expected Array");
        }
    }

    #[test]
    fn test_cyclic_object_roundtrip() {
        let root = Rc::new(RefCell::new(AmfObject::new()));
        root.borrow_mut()
            .dynamic
            .push(("self".to_string(), AmfValue::Object(root.clone())));
        let value = AmfValue::Object(root);

        let encoded = encode(&value).unwrap();
        let decoded = decode(&encoded).unwrap();

        if let AmfValue::Object(handle) = &decoded {
            let object = handle.borrow();
            let inner = object.get("self").unwrap();
            assert!(inner.ptr_eq(&decoded));
        } else {
            panic!("Expected Object");
        }
    }

    #[test]
    fn test_self_referencing_array() {
        let shell = Rc::new(RefCell::new(AmfArray::default()));
        shell
            .borrow_mut()
            .dense
            .push(AmfValue::Array(shell.clone()));
        let value = AmfValue::Array(shell);

        let decoded = decode(&encode(&value).unwrap()).unwrap();
        if let AmfValue::Array(handle) = &decoded {
            let array = handle.borrow();
            assert!(array.dense[0].ptr_eq(&decoded));
        } else {
            panic!("Expected Array");
        }
    }

    #[test]
    fn test_date_roundtrip() {
        let value = AmfValue::date(1700000000000.0);
        assert_eq!(roundtrip(&value), value);

        // Shared dates stay shared
        let shared = AmfValue::date(0.0);
        let pair = AmfValue::array(vec![shared.clone(), shared]);
        let decoded = decode(&encode(&pair).unwrap()).unwrap();
        if let AmfValue::Array(handle) = decoded {
            let array = handle.borrow();
            assert!(array.dense[0].ptr_eq(&array.dense[1]));
        } else {
            panic!("Expected Array");
        }
    }

    #[test]
    fn test_byte_array_roundtrip() {
        let value = AmfValue::byte_array(vec![0x00, 0xFF, 0x7E, 0x81]);
        let encoded = encode(&value).unwrap();
        assert_eq!(encoded[0], MARKER_BYTE_ARRAY);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_xml_markers_distinct() {
        let doc = AmfValue::xml_document("<root/>");
        let e4x = AmfValue::xml("<root/>");
        assert_eq!(encode(&doc).unwrap()[0], MARKER_XML_DOC);
        assert_eq!(encode(&e4x).unwrap()[0], MARKER_XML);
        assert_eq!(roundtrip(&doc), doc);
        assert_eq!(roundtrip(&e4x), e4x);
        assert_ne!(roundtrip(&doc), e4x);
    }

    #[test]
    fn test_int_vector_roundtrip() {
        let value = AmfValue::int_vector(true, vec![-1, 0, i32::MAX, i32::MIN]);
        let encoded = encode(&value).unwrap();
        assert_eq!(encoded[0], MARKER_VECTOR_INT);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_uint_vector_roundtrip() {
        let value = AmfValue::uint_vector(false, vec![0, 1, u32::MAX]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_double_vector_roundtrip() {
        let value = AmfValue::double_vector(false, vec![0.5, -2.25, 1e300]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn test_object_vector_roundtrip() {
        let value = AmfValue::object_vector(
            "com.example.Pt",
            true,
            vec![AmfValue::Integer(1), AmfValue::String("two".into())],
        );
        let decoded = roundtrip(&value);
        if let AmfValue::ObjectVector(handle) = &decoded {
            let vector = handle.borrow();
            assert_eq!(vector.type_name, "com.example.Pt");
            assert!(vector.fixed);
            assert_eq!(vector.items.len(), 2);
        } else {
            panic!("Expected ObjectVector");
        }
    }

    #[test]
    fn test_dictionary_roundtrip() {
        let value = AmfValue::dictionary(
            true,
            vec![
                (AmfValue::String("k".into()), AmfValue::Integer(1)),
                (AmfValue::Integer(2), AmfValue::Boolean(true)),
            ],
        );
        let decoded = roundtrip(&value);
        if let AmfValue::Dictionary(handle) = &decoded {
            let dictionary = handle.borrow();
            assert!(dictionary.weak_keys);
            assert_eq!(dictionary.entries.len(), 2);
        } else {
            panic!("Expected Dictionary");
        }
    }

    #[test]
    fn test_externalizable_roundtrip() {
        let mut registry = ExternalizableRegistry::new();
        registry.register(
            "com.example.Ext",
            Box::new(|decoder, buf| {
                // Body is a single AMF3 value
                let inner = decoder.decode(buf)?;
                let object = AmfObject {
                    class_name: "com.example.Ext".into(),
                    externalizable: true,
                    dynamic: vec![("inner".to_string(), inner)],
                    ..AmfObject::default()
                };
                Ok(AmfValue::Object(Rc::new(RefCell::new(object))))
            }),
            Box::new(|encoder, value| {
                let inner = value.get("inner").unwrap_or(AmfValue::Null);
                encoder.encode(&inner)
            }),
        );
        let registry = Arc::new(registry);

        let value = AmfValue::Object(Rc::new(RefCell::new(AmfObject {
            class_name: "com.example.Ext".into(),
            externalizable: true,
            dynamic: vec![("inner".to_string(), AmfValue::Integer(7))],
            ..AmfObject::default()
        })));

        let mut encoder = Amf3Encoder::new().registry(registry.clone());
        encoder.encode(&value).unwrap();
        let encoded = encoder.finish();

        let mut decoder = Amf3Decoder::with_registry(registry);
        let mut buf = Bytes::copy_from_slice(&encoded);
        let decoded = decoder.decode(&mut buf).unwrap();
        assert_eq!(decoded.get("inner"), Some(AmfValue::Integer(7)));
    }

    #[test]
    fn test_externalizable_unregistered() {
        let value = AmfValue::Object(Rc::new(RefCell::new(AmfObject {
            class_name: "com.example.Missing".into(),
            externalizable: true,
            ..AmfObject::default()
        })));
        assert_eq!(
            encode(&value),
            Err(AmfError::ExternalizableNotRegistered(
                "com.example.Missing".into()
            ))
        );

        // Decode side: externalizable trait for an unregistered class.
        // Header 0x07 = inline object, inline trait, externalizable.
        let wire = [0x0A, 0x07, 0x09, 0x45, 0x78, 0x74, 0x31];
        assert_eq!(
            decode(&wire),
            Err(AmfError::ExternalizableNotRegistered("Ext1".into()))
        );
    }

    #[test]
    fn test_externalizable_payload_fallback() {
        let value = AmfValue::Object(Rc::new(RefCell::new(AmfObject {
            class_name: "com.example.Opaque".into(),
            externalizable: true,
            externalizable_payload: Some(vec![0xDE, 0xAD]),
            ..AmfObject::default()
        })));
        let encoded = encode(&value).unwrap();
        assert_eq!(&encoded[encoded.len() - 2..], &[0xDE, 0xAD]);
    }

    #[test]
    fn test_malformed_trait() {
        // Externalizable with nonzero sealed count
        let header = (1u8 << 4) | 0b0111;
        assert_eq!(
            decode(&[0x0A, header, 0x01]),
            Err(AmfError::MalformedTrait)
        );
    }

    #[test]
    fn test_bad_references() {
        assert_eq!(
            decode(&[0x0A, 0x00]),
            Err(AmfError::BadReference {
                kind: RefKind::Object,
                index: 0
            })
        );
        assert_eq!(
            decode(&[0x06, 0x02]),
            Err(AmfError::BadReference {
                kind: RefKind::String,
                index: 1
            })
        );
        // Trait reference with an empty trait table
        assert_eq!(
            decode(&[0x0A, 0x05]),
            Err(AmfError::BadReference {
                kind: RefKind::Trait,
                index: 1
            })
        );
    }

    #[test]
    fn test_truncated_inputs() {
        assert_eq!(decode(&[]), Err(AmfError::Truncated));
        assert_eq!(decode(&[0x05, 0x40, 0x45]), Err(AmfError::Truncated));
        assert_eq!(decode(&[0x06, 0x0B, 0x68]), Err(AmfError::Truncated));
        assert_eq!(decode(&[0x04, 0x81]), Err(AmfError::Truncated));
        // Vector length larger than the remaining buffer
        assert_eq!(
            decode(&[0x0D, 0x07, 0x00, 0x00, 0x00]),
            Err(AmfError::Truncated)
        );
    }

    #[test]
    fn test_unknown_marker() {
        assert_eq!(
            decode(&[0x12]),
            Err(AmfError::UnknownMarker {
                marker: 0x12,
                version: 3
            })
        );
    }

    #[test]
    fn test_forged_string_length_rejected() {
        // Claims 2^27 bytes, provides 2
        let wire = [0x06, 0x90, 0x80, 0x80, 0x01, 0x41, 0x42];
        assert_eq!(decode(&wire), Err(AmfError::Truncated));
    }

    #[test]
    fn test_nesting_depth_limit() {
        let mut value = AmfValue::array(vec![]);
        for _ in 0..(MAX_NESTING_DEPTH + 4) {
            value = AmfValue::array(vec![value]);
        }
        let encoded = encode(&value).unwrap();
        assert_eq!(decode(&encoded), Err(AmfError::NestingTooDeep));
    }

    #[test]
    fn test_encoder_size_ceiling() {
        let mut encoder = Amf3Encoder::new().max_size(16);
        let value = AmfValue::byte_array(vec![0u8; 64]);
        assert_eq!(encoder.encode(&value), Err(AmfError::BufferTooSmall));
    }

    #[test]
    fn test_booleans_and_nulls() {
        assert_eq!(&encode(&AmfValue::Undefined).unwrap()[..], &[0x00]);
        assert_eq!(&encode(&AmfValue::Null).unwrap()[..], &[0x01]);
        assert_eq!(&encode(&AmfValue::Boolean(false)).unwrap()[..], &[0x02]);
        assert_eq!(&encode(&AmfValue::Boolean(true)).unwrap()[..], &[0x03]);
        for wire in [[0x00], [0x01], [0x02], [0x03]] {
            assert!(decode(&wire).is_ok());
        }
    }

    #[test]
    fn test_class_name_shares_string_table() {
        // Class name then the same string as a value: the value position
        // must be a reference into the shared string table
        let value = AmfValue::typed_object(
            "ns",
            vec![("k".to_string(), AmfValue::String("ns".into()))],
        );
        let encoded = encode(&value).unwrap();
        let needle = b"ns";
        let hits = encoded
            .windows(needle.len())
            .filter(|w| w == needle)
            .count();
        assert_eq!(hits, 1);
        assert_eq!(decode(&encoded).unwrap().get_string("k"), Some("ns".into()));
    }
}
