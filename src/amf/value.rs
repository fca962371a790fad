//! AMF value types
//!
//! Both AMF0 and AMF3 share a common value representation. This enum
//! provides a unified type that can be serialized to either format.
//!
//! Complex values (arrays, objects, vectors, dates, byte arrays, XML) are
//! held behind `Rc` handles. Cloning an [`AmfValue`] is shallow for those
//! variants: the clone shares the same allocation, and that shared identity
//! is what the AMF3 object reference table keys on. A value graph where the
//! same array appears twice therefore encodes the second occurrence as a
//! reference, and decoding gives back a graph with the sharing intact.
//!
//! Structural equality (`PartialEq`) recurses through handles. Do not apply
//! it to cyclic graphs; use [`AmfValue::ptr_eq`] there.

use std::cell::RefCell;
use std::rc::Rc;

/// Unified AMF value representation
///
/// This enum represents all value types supported by AMF0 and AMF3.
/// Some types (ByteArray, vectors, Dictionary) are AMF3-only; encoding
/// them in AMF0 mode goes through the avmplus bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    /// Null value (AMF0: 0x05, AMF3: 0x01)
    Null,

    /// Undefined value (AMF0: 0x06, AMF3: 0x00)
    Undefined,

    /// Boolean value (AMF0: 0x01, AMF3: 0x02/0x03)
    Boolean(bool),

    /// 29-bit signed integer (AMF3 only: 0x04)
    ///
    /// Legal range is `-2^28 ..= 2^28 - 1`; values outside it are promoted
    /// to Number by the encoder.
    Integer(i32),

    /// IEEE 754 double-precision floating point (AMF0: 0x00, AMF3: 0x05)
    Number(f64),

    /// UTF-8 string (AMF0: 0x02/0x0C, AMF3: 0x06)
    String(String),

    /// Date as milliseconds since Unix epoch, UTC (AMF0: 0x0B, AMF3: 0x08)
    Date(Rc<f64>),

    /// Legacy XML document (AMF0: 0x0F, AMF3: 0x07)
    XmlDocument(Rc<String>),

    /// E4X XML (AMF3 only: 0x0B); same payload shape as XmlDocument
    Xml(Rc<String>),

    /// Raw byte array (AMF3 only: 0x0C)
    ByteArray(Rc<Vec<u8>>),

    /// Array with a dense part and an insertion-ordered associative part
    /// (AMF0: 0x0A/0x08, AMF3: 0x09)
    Array(Rc<RefCell<AmfArray>>),

    /// Object with trait-declared sealed members and dynamic members
    /// (AMF0: 0x03/0x10, AMF3: 0x0A)
    Object(Rc<RefCell<AmfObject>>),

    /// Vector of i32 (AMF3 only: 0x0D)
    IntVector(Rc<RefCell<IntVector>>),

    /// Vector of u32 (AMF3 only: 0x0E)
    UintVector(Rc<RefCell<UintVector>>),

    /// Vector of f64 (AMF3 only: 0x0F)
    DoubleVector(Rc<RefCell<DoubleVector>>),

    /// Vector of values with an element type name (AMF3 only: 0x10)
    ObjectVector(Rc<RefCell<ObjectVector>>),

    /// Dictionary with arbitrary keys (AMF3 only: 0x11)
    Dictionary(Rc<RefCell<AmfDictionary>>),
}

/// Array payload: dense elements plus insertion-ordered associative entries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmfArray {
    /// Dense portion, indices `0..dense.len()`
    pub dense: Vec<AmfValue>,
    /// Associative portion, insertion-ordered
    pub assoc: Vec<(String, AmfValue)>,
}

impl AmfArray {
    /// Look up an associative entry by key
    pub fn get_assoc(&self, key: &str) -> Option<&AmfValue> {
        self.assoc.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Object payload: class name, sealed members, dynamic members
///
/// Sealed members are declared by the object's trait and serialized as bare
/// values in declaration order; dynamic members are name/value pairs
/// appended after them. Both keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmfObject {
    /// Trait class name; empty for anonymous objects
    pub class_name: String,
    /// Sealed members in trait declaration order
    pub sealed: Vec<(String, AmfValue)>,
    /// Dynamic members in insertion order
    pub dynamic: Vec<(String, AmfValue)>,
    /// Body is opaque and handled by a registered reader/writer
    pub externalizable: bool,
    /// Raw externalizable body bytes, for values that carry their body
    /// opaquely instead of through a registered writer
    pub externalizable_payload: Option<Vec<u8>>,
}

impl AmfObject {
    /// Create an anonymous object
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an object with a trait class name
    pub fn with_class(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    /// Look up a member by name, sealed members first
    pub fn get(&self, key: &str) -> Option<&AmfValue> {
        self.sealed
            .iter()
            .chain(self.dynamic.iter())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Insert or replace a dynamic member
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AmfValue>) {
        let key = key.into();
        if let Some(slot) = self.dynamic.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value.into();
        } else {
            self.dynamic.push((key, value.into()));
        }
    }
}

/// Vector of i32 (AMF3 0x0D)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntVector {
    /// Fixed-length flag from the wire
    pub fixed: bool,
    pub items: Vec<i32>,
}

/// Vector of u32 (AMF3 0x0E)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UintVector {
    pub fixed: bool,
    pub items: Vec<u32>,
}

/// Vector of f64 (AMF3 0x0F)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoubleVector {
    pub fixed: bool,
    pub items: Vec<f64>,
}

/// Vector of values with a declared element type (AMF3 0x10)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectVector {
    /// Element type name; may be empty
    pub type_name: String,
    pub fixed: bool,
    pub items: Vec<AmfValue>,
}

/// Dictionary with arbitrary value keys (AMF3 0x11)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmfDictionary {
    /// Weak-key flag from the wire; carried, not acted on
    pub weak_keys: bool,
    pub entries: Vec<(AmfValue, AmfValue)>,
}

impl AmfValue {
    /// Create a Date value from epoch milliseconds
    pub fn date(millis: f64) -> Self {
        AmfValue::Date(Rc::new(millis))
    }

    /// Create a ByteArray value
    pub fn byte_array(bytes: impl Into<Vec<u8>>) -> Self {
        AmfValue::ByteArray(Rc::new(bytes.into()))
    }

    /// Create an E4X XML value
    pub fn xml(s: impl Into<String>) -> Self {
        AmfValue::Xml(Rc::new(s.into()))
    }

    /// Create a legacy XML document value
    pub fn xml_document(s: impl Into<String>) -> Self {
        AmfValue::XmlDocument(Rc::new(s.into()))
    }

    /// Create a dense array
    pub fn array(dense: Vec<AmfValue>) -> Self {
        AmfValue::Array(Rc::new(RefCell::new(AmfArray {
            dense,
            assoc: Vec::new(),
        })))
    }

    /// Create an anonymous object with dynamic members
    pub fn object(members: Vec<(String, AmfValue)>) -> Self {
        AmfValue::Object(Rc::new(RefCell::new(AmfObject {
            dynamic: members,
            ..AmfObject::default()
        })))
    }

    /// Create an object with a trait class name and dynamic members
    pub fn typed_object(class_name: impl Into<String>, members: Vec<(String, AmfValue)>) -> Self {
        AmfValue::Object(Rc::new(RefCell::new(AmfObject {
            class_name: class_name.into(),
            dynamic: members,
            ..AmfObject::default()
        })))
    }

    /// Create an int vector
    pub fn int_vector(fixed: bool, items: Vec<i32>) -> Self {
        AmfValue::IntVector(Rc::new(RefCell::new(IntVector { fixed, items })))
    }

    /// Create a uint vector
    pub fn uint_vector(fixed: bool, items: Vec<u32>) -> Self {
        AmfValue::UintVector(Rc::new(RefCell::new(UintVector { fixed, items })))
    }

    /// Create a double vector
    pub fn double_vector(fixed: bool, items: Vec<f64>) -> Self {
        AmfValue::DoubleVector(Rc::new(RefCell::new(DoubleVector { fixed, items })))
    }

    /// Create an object vector
    pub fn object_vector(type_name: impl Into<String>, fixed: bool, items: Vec<AmfValue>) -> Self {
        AmfValue::ObjectVector(Rc::new(RefCell::new(ObjectVector {
            type_name: type_name.into(),
            fixed,
            items,
        })))
    }

    /// Create a dictionary
    pub fn dictionary(weak_keys: bool, entries: Vec<(AmfValue, AmfValue)>) -> Self {
        AmfValue::Dictionary(Rc::new(RefCell::new(AmfDictionary { weak_keys, entries })))
    }

    /// Try to get this value as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AmfValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AmfValue::Number(n) => Some(*n),
            AmfValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AmfValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an object handle
    pub fn as_object(&self) -> Option<&Rc<RefCell<AmfObject>>> {
        match self {
            AmfValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Try to get this value as an array handle
    pub fn as_array(&self) -> Option<&Rc<RefCell<AmfArray>>> {
        match self {
            AmfValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, AmfValue::Null | AmfValue::Undefined)
    }

    /// Get a member from an object value, or an associative entry from an
    /// array value
    ///
    /// Returns a shallow clone; complex results still share their backing
    /// allocation with this value.
    pub fn get(&self, key: &str) -> Option<AmfValue> {
        match self {
            AmfValue::Object(o) => o.borrow().get(key).cloned(),
            AmfValue::Array(a) => a.borrow().get_assoc(key).cloned(),
            _ => None,
        }
    }

    /// Get a string member from an object value
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            AmfValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get a number member from an object value
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_number()
    }

    /// Identity comparison: true when both values are the same allocation
    ///
    /// Scalars are never identity-equal. This is the comparison the AMF3
    /// object reference table performs on encode, and the right one for
    /// cyclic graphs where structural equality does not terminate.
    pub fn ptr_eq(&self, other: &AmfValue) -> bool {
        match (self.handle_addr(), other.handle_addr()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Address of the backing allocation for complex values
    ///
    /// This is the identity key used by the encode-side object reference
    /// table. Scalar variants have no identity and return None.
    pub(crate) fn handle_addr(&self) -> Option<usize> {
        match self {
            AmfValue::Date(h) => Some(Rc::as_ptr(h) as usize),
            AmfValue::XmlDocument(h) | AmfValue::Xml(h) => Some(Rc::as_ptr(h) as usize),
            AmfValue::ByteArray(h) => Some(Rc::as_ptr(h) as usize),
            AmfValue::Array(h) => Some(Rc::as_ptr(h) as usize),
            AmfValue::Object(h) => Some(Rc::as_ptr(h) as usize),
            AmfValue::IntVector(h) => Some(Rc::as_ptr(h) as usize),
            AmfValue::UintVector(h) => Some(Rc::as_ptr(h) as usize),
            AmfValue::DoubleVector(h) => Some(Rc::as_ptr(h) as usize),
            AmfValue::ObjectVector(h) => Some(Rc::as_ptr(h) as usize),
            AmfValue::Dictionary(h) => Some(Rc::as_ptr(h) as usize),
            _ => None,
        }
    }
}

impl Default for AmfValue {
    fn default() -> Self {
        AmfValue::Null
    }
}

impl From<bool> for AmfValue {
    fn from(v: bool) -> Self {
        AmfValue::Boolean(v)
    }
}

impl From<f64> for AmfValue {
    fn from(v: f64) -> Self {
        AmfValue::Number(v)
    }
}

impl From<i32> for AmfValue {
    fn from(v: i32) -> Self {
        AmfValue::Integer(v)
    }
}

impl From<u32> for AmfValue {
    fn from(v: u32) -> Self {
        // u32 can exceed the 29-bit signed domain; Number always fits
        AmfValue::Number(v as f64)
    }
}

impl From<String> for AmfValue {
    fn from(v: String) -> Self {
        AmfValue::String(v)
    }
}

impl From<&str> for AmfValue {
    fn from(v: &str) -> Self {
        AmfValue::String(v.to_string())
    }
}

impl<V: Into<AmfValue>> From<Vec<V>> for AmfValue {
    fn from(v: Vec<V>) -> Self {
        AmfValue::array(v.into_iter().map(|x| x.into()).collect())
    }
}
