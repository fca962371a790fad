//! Remoting packet envelope
//!
//! Gateways such as Red5 and AMFPHP exchange AMF values inside a small
//! outer packet: a version word, out-of-band headers, and routed messages.
//! This module parses and builds that envelope; the bodies themselves are
//! ordinary AMF values handled by [`crate::amf`].

pub mod codec;
pub mod packet;

pub use codec::{decode_packet, encode_packet, PacketDecodeOptions, PacketEncodeOptions, MAX_BODY_SIZE};
pub use packet::{Packet, PacketHeader, PacketMessage, VERSION_AMF0, VERSION_AMF3};
