use crate::{encode_client_frame, Charset, FrameDecoder, InboundMessage, OutboundMessage};
use bytes::{BufMut, Bytes};

fn reader_for(message: &OutboundMessage) -> InboundMessage {
    InboundMessage::new(message.header(), Bytes::copy_from_slice(message.body()))
}

#[test]
fn mixed_fields_read_back_in_order() {
    let mut out = OutboundMessage::new(392);
    out.write_wired_int32(-70_000)
        .write_fixed_string("Dice Master", Charset::Utf8)
        .write_wired_bool(true)
        .write_fixed_int32(1337)
        .write_wired_uint32(u32::MAX)
        .write_b64_short(21)
        .write_wired_bool(false);

    let mut msg = reader_for(&out);
    assert_eq!(msg.read_wired_int32(), (-70_000, 4));
    assert_eq!(msg.read_fixed_string(Charset::Utf8), "Dice Master");
    assert!(msg.read_wired_bool());
    assert_eq!(msg.read_fixed_int32(), 1337);
    assert_eq!(msg.read_wired_uint32(), (u32::MAX, 6));
    assert_eq!(msg.read_b64_short(), 21);
    assert!(!msg.read_wired_bool());
    assert_eq!(msg.remaining(), 0);
}

#[test]
fn fixed_strings_normalize_control_bytes() {
    let mut out = OutboundMessage::new(52);
    out.write_fixed_string("hi\u{1}there\r\nbye\u{7f}", Charset::Utf8);
    let mut msg = reader_for(&out);
    assert_eq!(msg.read_fixed_string(Charset::Utf8), "hi there  bye ");
}

#[test]
fn latin1_strings_survive_a_round_trip() {
    let mut out = OutboundMessage::new(52);
    out.write_fixed_string("caf\u{e9} \u{263a}", Charset::Latin1);
    let mut msg = reader_for(&out);
    assert_eq!(msg.read_fixed_string(Charset::Latin1), "caf\u{e9} ?");
}

#[test]
fn utf8_strings_are_cut_on_a_char_boundary() {
    let long = "\u{e9}".repeat(3000);
    let mut out = OutboundMessage::new(1);
    out.write_fixed_string(&long, Charset::Utf8);
    let decoded = reader_for(&out).read_fixed_string(Charset::Utf8);
    assert_eq!(decoded.len(), 4094);
    assert!(decoded.chars().all(|c| c == '\u{e9}'));
}

#[test]
fn fixed_int_falls_back_to_zero() {
    let mut out = OutboundMessage::new(1);
    out.write_fixed_string("twelve", Charset::Utf8)
        .write_fixed_string(" 42 ", Charset::Utf8)
        .write_fixed_string("99999999999", Charset::Utf8);
    let mut msg = reader_for(&out);
    assert_eq!(msg.read_fixed_int32(), 0);
    assert_eq!(msg.read_fixed_int32(), 42);
    assert_eq!(msg.read_fixed_int32(), 0);
}

#[test]
fn truncated_reads_yield_zero_and_keep_the_cursor() {
    let mut msg = InboundMessage::new(1, Bytes::from_static(b"@"));
    assert_eq!(msg.read_fixed_string(Charset::Utf8), "");
    assert_eq!(msg.position(), 0);
    assert_eq!(msg.read_b64_short(), 0);
    assert_eq!(msg.position(), 0);
    assert_eq!(msg.read_fixed_int32(), 0);
    assert_eq!(msg.position(), 0);

    // declares five bytes, carries two
    let mut msg = InboundMessage::new(1, Bytes::from_static(b"@Eab"));
    assert_eq!(msg.read_fixed_string(Charset::Utf8), "");
    assert_eq!(msg.position(), 0);

    // two-byte VL64 missing its tail
    let mut msg = InboundMessage::new(1, Bytes::from_static(b"P"));
    assert_eq!(msg.read_wired_int32(), (0, 0));
    assert_eq!(msg.read_wired_uint32(), (0, 0));
    assert_eq!(msg.position(), 0);

    let mut empty = InboundMessage::new(1, Bytes::new());
    assert!(!empty.read_wired_bool());
    assert_eq!(empty.read_wired_int32(), (0, 0));
    assert_eq!(empty.remaining(), 0);
}

#[test]
fn reset_rewinds_to_body_start() {
    let mut out = OutboundMessage::new(75);
    out.write_b64_short(5).write_b64_short(5);
    let mut msg = reader_for(&out);
    assert_eq!(msg.read_b64_short(), 5);
    msg.reset();
    assert_eq!(msg.position(), 0);
    assert_eq!((msg.read_b64_short(), msg.read_b64_short()), (5, 5));
}

#[test]
fn outbound_frame_layout() {
    let mut out = OutboundMessage::new(3);
    out.write_string("ok");
    assert_eq!(&out.encode()[..], b"@Cok\x02\x01");
}

#[test]
fn client_frames_decode_into_messages() {
    let mut body = OutboundMessage::new(0);
    body.write_fixed_string("ticket-123", Charset::Utf8);
    let frame = encode_client_frame(204, body.body());

    let mut decoder = FrameDecoder::new(1024);
    decoder.buffer_mut().put_slice(&frame);
    let mut msg = decoder.decode().unwrap().unwrap();
    assert_eq!(msg.header(), 204);
    assert_eq!(msg.read_fixed_string(Charset::Utf8), "ticket-123");
}
