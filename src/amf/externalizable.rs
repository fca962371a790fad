//! Externalizable class registry
//!
//! AMF3 objects whose trait carries the externalizable flag have an opaque
//! body: the wire gives no length prefix, so only code that knows the class
//! can read it. Callers register a reader/writer pair per class name before
//! decoding; the decoder delegates to the reader positioned immediately
//! after the trait header, and the encoder delegates to the writer.
//!
//! The registry is read-mostly: build it up front, share it via `Arc`, and
//! do not mutate it while decodes are running.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

use super::amf3::{Amf3Decoder, Amf3Encoder};
use super::value::AmfValue;
use crate::error::Result;

/// Reads one externalizable body and produces its value
///
/// The decoder handle is positioned immediately after the trait header; the
/// reader may call back into it for nested AMF3 values.
pub type ExternalizableReader =
    Box<dyn Fn(&mut Amf3Decoder, &mut Bytes) -> Result<AmfValue> + Send + Sync>;

/// Writes one externalizable body for the given value
pub type ExternalizableWriter = Box<dyn Fn(&mut Amf3Encoder, &AmfValue) -> Result<()> + Send + Sync>;

struct Handler {
    reader: ExternalizableReader,
    writer: ExternalizableWriter,
}

/// Registry mapping externalizable class names to their reader/writer pair
#[derive(Default)]
pub struct ExternalizableRegistry {
    handlers: HashMap<String, Handler>,
}

impl ExternalizableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reader/writer pair for a class name
    ///
    /// A second registration for the same class replaces the first.
    pub fn register(
        &mut self,
        class_name: impl Into<String>,
        reader: ExternalizableReader,
        writer: ExternalizableWriter,
    ) {
        self.handlers
            .insert(class_name.into(), Handler { reader, writer });
    }

    /// True if a handler is registered for the class
    pub fn contains(&self, class_name: &str) -> bool {
        self.handlers.contains_key(class_name)
    }

    pub(crate) fn reader(&self, class_name: &str) -> Option<&ExternalizableReader> {
        self.handlers.get(class_name).map(|h| &h.reader)
    }

    pub(crate) fn writer(&self, class_name: &str) -> Option<&ExternalizableWriter> {
        self.handlers.get(class_name).map(|h| &h.writer)
    }
}

impl fmt::Debug for ExternalizableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalizableRegistry")
            .field("classes", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
