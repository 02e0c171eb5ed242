//! Integration tests for the OP_MSG stream codec
//!
//! Frames are pushed through in-memory duplex pipes and through hand-fed
//! buffers to check reassembly across arbitrary read boundaries.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use bytes::BytesMut;
use bson_wire::config::{CodecConfig, MAX_FRAME_SIZE};
use bson_wire::{BsonError, Document, OpMsg, OpMsgCodec, Value};
use futures::{SinkExt, StreamExt};
use tokio_util::codec::{Decoder, Encoder, Framed, FramedRead};

fn command(id: u32) -> OpMsg {
    let body = match Value::ordered([
        ("find", Value::from("users")),
        ("filter", Value::from(Document::new().with("age", 30))),
        ("batchSize", Value::from(id as i32)),
        ("$db", Value::from("app")),
    ]) {
        Value::Document(doc) => doc,
        _ => unreachable!(),
    };
    OpMsg::new(id, body)
}

#[tokio::test]
async fn test_framed_request_reply() {
    let (client, server) = tokio::io::duplex(1024);
    let mut client = Framed::new(client, OpMsgCodec::default());
    let mut server = Framed::new(server, OpMsgCodec::default());

    client.send(command(11)).await.unwrap();

    let request = server.next().await.expect("frame").unwrap();
    assert_eq!(request.request_id, 11);
    assert_eq!(request.body.get("find"), Some(&Value::from("users")));

    let mut reply = OpMsg::new(500, Document::new().with("ok", 1.0));
    reply.response_to = request.request_id;
    server.send(reply).await.unwrap();

    let reply = client.next().await.expect("frame").unwrap();
    assert_eq!(reply.session_id(), 11);
    assert_eq!(reply.body.get("ok"), Some(&Value::Double(1.0)));
}

#[tokio::test]
async fn test_many_frames_through_small_pipe() {
    // pipe smaller than one frame forces partial reads
    let (client, server) = tokio::io::duplex(16);
    let mut reader = FramedRead::new(server, OpMsgCodec::default());

    let writer = tokio::spawn(async move {
        let mut framed = Framed::new(client, OpMsgCodec::default());
        for id in 0..50 {
            framed.send(command(id)).await.unwrap();
        }
    });

    for id in 0..50 {
        let msg = reader.next().await.expect("frame").unwrap();
        assert_eq!(msg.request_id, id);
        assert_eq!(msg.body.get("batchSize"), Some(&Value::Int32(id as i32)));
    }
    writer.await.unwrap();
    assert!(reader.next().await.is_none());
}

#[test]
fn test_byte_at_a_time_reassembly() {
    let mut encoder = OpMsgCodec::default();
    let mut wire = BytesMut::new();
    encoder.encode(command(1), &mut wire).unwrap();
    encoder.encode(command(2), &mut wire).unwrap();

    let mut decoder = OpMsgCodec::default();
    let mut buffered = BytesMut::new();
    let mut seen = Vec::new();
    for byte in wire.iter() {
        buffered.extend_from_slice(&[*byte]);
        if let Some(msg) = decoder.decode(&mut buffered).unwrap() {
            seen.push(msg.request_id);
        }
    }
    assert_eq!(seen, [1, 2]);
    assert!(buffered.is_empty());
}

#[test]
fn test_configured_frame_cap() {
    let config = CodecConfig {
        max_frame_size: 64,
        ..CodecConfig::default()
    };
    let mut codec = OpMsgCodec::new(config);

    let mut buf = BytesMut::from(&100u32.to_le_bytes()[..]);
    assert!(matches!(
        codec.decode(&mut buf),
        Err(BsonError::OversizedFrame(100))
    ));

    let mut out = BytesMut::new();
    assert!(matches!(
        codec.encode(command(1), &mut out),
        Err(BsonError::OversizedFrame(_))
    ));
    assert!(out.is_empty());
}

#[test]
fn test_frame_cap_cannot_be_loosened() {
    let config = CodecConfig {
        max_frame_size: usize::MAX,
        ..CodecConfig::default()
    };
    let mut codec = OpMsgCodec::new(config);
    assert_eq!(codec.config().max_frame_size, MAX_FRAME_SIZE);

    let mut buf = BytesMut::from(&[0u8, 0, 0, 1][..]);
    assert!(matches!(
        codec.decode(&mut buf),
        Err(BsonError::OversizedFrame(0x0100_0000))
    ));
    assert!(buf.capacity() < 0x0100_0000);
}

#[test]
fn test_undersized_prefix_rejected() {
    let mut codec = OpMsgCodec::default();
    let mut buf = BytesMut::from(&[4u8, 0, 0, 0][..]);
    assert!(matches!(codec.decode(&mut buf), Err(BsonError::Truncated(_))));
}

#[test]
fn test_bad_frame_is_consumed() {
    let mut codec = OpMsgCodec::default();
    let mut wire = BytesMut::new();
    codec.encode(command(1), &mut wire).unwrap();
    let bad_len = wire.len();
    // corrupt the opcode of the first frame only
    wire[12] = 0;
    codec.encode(command(2), &mut wire).unwrap();

    assert!(matches!(
        codec.decode(&mut wire),
        Err(BsonError::InvalidOpcode(_))
    ));
    assert!(wire.len() < 2 * bad_len);
    let next = codec.decode(&mut wire).unwrap().expect("second frame");
    assert_eq!(next.request_id, 2);
}
