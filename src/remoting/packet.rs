//! Remoting packet types
//!
//! The packet is the outer envelope a gateway exchanges: a version word,
//! a list of headers, and a list of messages, each carrying one AMF value.

use crate::amf::AmfValue;

/// Packet version word for legacy AMF0 gateways
pub const VERSION_AMF0: u16 = 0;

/// Packet version word for AMF3-capable gateways
pub const VERSION_AMF3: u16 = 3;

/// A decoded or to-be-encoded Remoting packet
///
/// `version` is informational and preserved verbatim; the actual encoding
/// of each body is decided per value (AMF0 with the avmplus bridge).
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Wire version word, 0 or 3
    pub version: u16,
    pub headers: Vec<PacketHeader>,
    pub messages: Vec<PacketMessage>,
    /// Number of input bytes the decoder consumed; 0 for hand-built packets
    pub byte_length: usize,
}

impl Packet {
    /// Create an empty packet with the given version word
    pub fn new(version: u16) -> Self {
        Self {
            version,
            headers: Vec::new(),
            messages: Vec::new(),
            byte_length: 0,
        }
    }

    /// Append a header
    pub fn header(mut self, header: PacketHeader) -> Self {
        self.headers.push(header);
        self
    }

    /// Append a message
    pub fn message(mut self, message: PacketMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// One packet header: a named out-of-band value
#[derive(Debug, Clone, PartialEq)]
pub struct PacketHeader {
    pub name: String,
    /// Receiver must reject the packet if it cannot honor this header
    pub must_understand: bool,
    pub value: AmfValue,
}

impl PacketHeader {
    pub fn new(name: impl Into<String>, must_understand: bool, value: AmfValue) -> Self {
        Self {
            name: name.into(),
            must_understand,
            value,
        }
    }
}

/// One packet message: a routed request or response body
#[derive(Debug, Clone, PartialEq)]
pub struct PacketMessage {
    /// Destination, e.g. `PlayerService.login`
    pub target_uri: String,
    /// Correlation URI for the reply, e.g. `/1`
    pub response_uri: String,
    pub value: AmfValue,
}

impl PacketMessage {
    pub fn new(
        target_uri: impl Into<String>,
        response_uri: impl Into<String>,
        value: AmfValue,
    ) -> Self {
        Self {
            target_uri: target_uri.into(),
            response_uri: response_uri.into(),
            value,
        }
    }
}
