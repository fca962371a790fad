//! End-to-end Remoting envelope round trips against a gateway-shaped
//! payload: one out-of-band header plus one AMF3 command message.

use amf_rs::remoting::{
    decode_packet, encode_packet, Packet, PacketDecodeOptions, PacketEncodeOptions, PacketHeader,
    PacketMessage, VERSION_AMF3,
};
use amf_rs::{AmfValue, ObjectEncoding};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn login_packet() -> Packet {
    let login = AmfValue::typed_object(
        "com.ninjasaga.protocol.LoginRequest",
        vec![
            ("username".to_string(), AmfValue::String("kage".into())),
            ("token".to_string(), AmfValue::String("d34db33f".into())),
            ("clientVersion".to_string(), AmfValue::Integer(1107)),
        ],
    );
    let command = AmfValue::typed_object(
        "com.ninjasaga.protocol.CommandEnvelope",
        vec![
            ("command".to_string(), AmfValue::String("login".into())),
            ("args".to_string(), AmfValue::array(vec![login])),
        ],
    );

    Packet::new(VERSION_AMF3)
        .header(PacketHeader::new(
            "DSId",
            false,
            AmfValue::String("nil".into()),
        ))
        .message(PacketMessage::new("PlayerService.login", "/1", command))
}

#[test]
fn login_envelope_roundtrip() {
    init_tracing();

    let packet = login_packet();
    let options = PacketEncodeOptions::new().object_encoding(ObjectEncoding::Amf3);
    let encoded = encode_packet(&packet, &options).unwrap();

    let decoded = decode_packet(&encoded, &PacketDecodeOptions::new()).unwrap();
    assert_eq!(decoded.byte_length, encoded.len());
    assert_eq!(decoded.version, VERSION_AMF3);

    assert_eq!(decoded.headers.len(), 1);
    assert_eq!(decoded.headers[0].name, "DSId");
    assert!(!decoded.headers[0].must_understand);
    assert_eq!(decoded.headers[0].value, AmfValue::String("nil".into()));

    assert_eq!(decoded.messages.len(), 1);
    assert_eq!(decoded.messages[0].target_uri, "PlayerService.login");
    assert_eq!(decoded.messages[0].response_uri, "/1");

    let envelope = &decoded.messages[0].value;
    let envelope_obj = envelope.as_object().expect("message body is an object");
    assert_eq!(
        envelope_obj.borrow().class_name,
        "com.ninjasaga.protocol.CommandEnvelope"
    );
    assert_eq!(envelope.get_string("command"), Some("login".to_string()));

    let args = envelope.get("args").expect("envelope has args");
    let args = args.as_array().expect("args is an array");
    let args = args.borrow();
    assert_eq!(args.dense.len(), 1);
    let login = args.dense[0].as_object().expect("arg is an object");
    assert_eq!(
        login.borrow().class_name,
        "com.ninjasaga.protocol.LoginRequest"
    );
    assert_eq!(args.dense[0].get_string("username"), Some("kage".to_string()));
    assert_eq!(args.dense[0].get_number("clientVersion"), Some(1107.0));
}

#[test]
fn login_envelope_reencodes_byte_identical() {
    init_tracing();

    let options = PacketEncodeOptions::new().object_encoding(ObjectEncoding::Amf3);
    let encoded = encode_packet(&login_packet(), &options).unwrap();
    let decoded = decode_packet(&encoded, &PacketDecodeOptions::new()).unwrap();
    let reencoded = encode_packet(&decoded, &options).unwrap();
    assert_eq!(reencoded, encoded);
}

#[test]
fn message_bodies_get_fresh_reference_tables() {
    init_tracing();

    // The same string in two message bodies must be inlined in both:
    // AMF3 tables do not span messages within a packet
    let packet = Packet::new(VERSION_AMF3)
        .message(PacketMessage::new(
            "Svc.first",
            "/1",
            AmfValue::String("sharedstring".into()),
        ))
        .message(PacketMessage::new(
            "Svc.second",
            "/2",
            AmfValue::String("sharedstring".into()),
        ));

    let options = PacketEncodeOptions::new().object_encoding(ObjectEncoding::Amf3);
    let encoded = encode_packet(&packet, &options).unwrap();

    let needle = b"sharedstring";
    let hits = encoded
        .windows(needle.len())
        .filter(|w| w == needle)
        .count();
    assert_eq!(hits, 2);

    let decoded = decode_packet(&encoded, &PacketDecodeOptions::new()).unwrap();
    assert_eq!(
        decoded.messages[1].value,
        AmfValue::String("sharedstring".into())
    );
}
