//! Remoting packet codec
//!
//! Wire layout, all integers big-endian:
//!
//! ```text
//! u16  version        0 or 3 (informational)
//! u16  headerCount
//!      headers        name (u16 + UTF-8), mustUnderstand (u8),
//!                     contentLength (i32), one AMF0-mode value
//! u16  messageCount
//!      messages       targetUri (u16 + UTF-8), responseUri (u16 + UTF-8),
//!                     bodyLength (i32), one AMF0-mode value
//! ```
//!
//! A negative contentLength/bodyLength (canonically -1) means "unknown";
//! the decoder then advances by actual consumption. A nonnegative length
//! declares a window: trailing bytes inside it are discarded, a value
//! running past it is an error.
//!
//! Every header and message body starts in AMF0 mode with fresh reference
//! tables; embedded AMF3 goes through the avmplus bridge.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::sync::Arc;

use crate::amf::{Amf0Decoder, Amf0Encoder, AmfValue, ExternalizableRegistry, ObjectEncoding};
use crate::error::{AmfError, Result};

use super::packet::{Packet, PacketHeader, PacketMessage};

/// Ceiling for a single encoded header or message body (16 MiB)
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Options for [`decode_packet`]
#[derive(Debug, Default)]
pub struct PacketDecodeOptions {
    pub registry: Option<Arc<ExternalizableRegistry>>,
}

impl PacketDecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the externalizable class handlers
    pub fn registry(mut self, registry: Arc<ExternalizableRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

/// Options for [`encode_packet`]
#[derive(Debug, Default)]
pub struct PacketEncodeOptions {
    /// `Amf3` wraps every message body in the avmplus bridge; headers stay
    /// AMF0 (with automatic bridging for AMF3-only values)
    pub object_encoding: ObjectEncoding,
    /// Write the -1 length sentinel instead of measured body lengths
    pub unknown_lengths: bool,
    pub registry: Option<Arc<ExternalizableRegistry>>,
}

impl PacketEncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the message body encoding
    pub fn object_encoding(mut self, object_encoding: ObjectEncoding) -> Self {
        self.object_encoding = object_encoding;
        self
    }

    /// Write -1 length sentinels instead of measured lengths
    pub fn unknown_lengths(mut self, unknown_lengths: bool) -> Self {
        self.unknown_lengths = unknown_lengths;
        self
    }

    /// Set the externalizable class handlers
    pub fn registry(mut self, registry: Arc<ExternalizableRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

/// Decode a Remoting packet
pub fn decode_packet(data: &[u8], options: &PacketDecodeOptions) -> Result<Packet> {
    let total = data.len();
    let mut buf = Bytes::copy_from_slice(data);

    if buf.remaining() < 4 {
        return Err(AmfError::Truncated);
    }
    let version = buf.get_u16();
    let header_count = buf.get_u16() as usize;

    tracing::trace!(version, headers = header_count, "decoding remoting packet");

    let mut headers = Vec::with_capacity(header_count.min(64));
    for _ in 0..header_count {
        let name = read_utf8(&mut buf)?;
        if buf.remaining() < 5 {
            return Err(AmfError::Truncated);
        }
        let must_understand = buf.get_u8() != 0;
        let content_length = buf.get_i32();
        let value = read_body(&mut buf, content_length, &options.registry)?;
        headers.push(PacketHeader {
            name,
            must_understand,
            value,
        });
    }

    if buf.remaining() < 2 {
        return Err(AmfError::Truncated);
    }
    let message_count = buf.get_u16() as usize;

    let mut messages = Vec::with_capacity(message_count.min(64));
    for _ in 0..message_count {
        let target_uri = read_utf8(&mut buf)?;
        let response_uri = read_utf8(&mut buf)?;
        if buf.remaining() < 4 {
            return Err(AmfError::Truncated);
        }
        let body_length = buf.get_i32();
        let value = read_body(&mut buf, body_length, &options.registry)?;
        messages.push(PacketMessage {
            target_uri,
            response_uri,
            value,
        });
    }

    Ok(Packet {
        version,
        headers,
        messages,
        byte_length: total - buf.remaining(),
    })
}

/// Encode a Remoting packet
pub fn encode_packet(packet: &Packet, options: &PacketEncodeOptions) -> Result<Bytes> {
    if packet.headers.len() > u16::MAX as usize || packet.messages.len() > u16::MAX as usize {
        return Err(AmfError::OutOfRange);
    }

    let mut buf = BytesMut::with_capacity(256);
    buf.put_u16(packet.version);

    buf.put_u16(packet.headers.len() as u16);
    for header in &packet.headers {
        write_utf8(&mut buf, &header.name)?;
        buf.put_u8(header.must_understand as u8);
        // Headers stay AMF0-mode regardless of the body encoding option
        let body = encode_body(&header.value, options, false)?;
        write_body(&mut buf, &body, options.unknown_lengths)?;
    }

    buf.put_u16(packet.messages.len() as u16);
    for message in &packet.messages {
        write_utf8(&mut buf, &message.target_uri)?;
        write_utf8(&mut buf, &message.response_uri)?;
        let body = encode_body(&message.value, options, true)?;
        write_body(&mut buf, &body, options.unknown_lengths)?;
    }

    Ok(buf.freeze())
}

/// Read one body value, honoring the declared length window
fn read_body(
    buf: &mut Bytes,
    declared_length: i32,
    registry: &Option<Arc<ExternalizableRegistry>>,
) -> Result<AmfValue> {
    let start = buf.remaining();

    // Fresh reference tables per body
    let mut decoder = match registry {
        Some(registry) => Amf0Decoder::with_registry(registry.clone()),
        None => Amf0Decoder::new(),
    };
    let value = decoder.decode(buf)?;

    if declared_length >= 0 {
        let declared = declared_length as usize;
        if declared > start {
            return Err(AmfError::Truncated);
        }
        let consumed = start - buf.remaining();
        if consumed > declared {
            // The value ran past its declared window
            return Err(AmfError::OutOfRange);
        }
        let trailing = declared - consumed;
        if trailing > 0 {
            tracing::trace!(trailing, "discarding trailing bytes in declared body window");
            buf.advance(trailing);
        }
    }

    Ok(value)
}

/// Encode one body value into a scratch buffer so its length can be
/// measured before the i32 prefix is written
fn encode_body(
    value: &AmfValue,
    options: &PacketEncodeOptions,
    is_message: bool,
) -> Result<Bytes> {
    let mut encoder = Amf0Encoder::with_capacity(256).max_size(MAX_BODY_SIZE);
    if let Some(registry) = &options.registry {
        encoder = encoder.registry(registry.clone());
    }

    if is_message && options.object_encoding == ObjectEncoding::Amf3 {
        encoder.write_avmplus(value)?;
    } else {
        encoder.encode(value)?;
    }

    Ok(encoder.finish())
}

fn write_body(buf: &mut BytesMut, body: &Bytes, unknown_lengths: bool) -> Result<()> {
    if body.len() > i32::MAX as usize {
        return Err(AmfError::OutOfRange);
    }
    if unknown_lengths {
        buf.put_i32(-1);
    } else {
        buf.put_i32(body.len() as i32);
    }
    buf.put_slice(body);
    Ok(())
}

fn read_utf8(buf: &mut Bytes) -> Result<String> {
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

fn write_utf8(buf: &mut BytesMut, s: &str) -> Result<()> {
    if s.len() > u16::MAX as usize {
        return Err(AmfError::OutOfRange);
    }
    buf.put_u16(s.len() as u16);
    buf.put_slice(s.as_bytes());
    Ok(())
}
