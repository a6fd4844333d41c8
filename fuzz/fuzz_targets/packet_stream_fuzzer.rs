//! Fuzz target for packet framing across arbitrary read boundaries
//!
//! Encodes a sequence of packets, then feeds the stream to the decoder in
//! arbitrary chunk sizes, the way a TCP socket delivers it.
//!
//! # Invariants
//!
//! - Packets with an embedded NUL or over 64 KiB MUST be rejected by encode
//! - Every accepted packet MUST come back out unchanged and in order
//! - Chunk boundaries MUST NOT affect the result

#![no_main]

use arbitrary::Arbitrary;
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use metalobby_proto::{Packet, PacketCodec};
use tokio_util::codec::{Decoder, Encoder};

#[derive(Debug, Arbitrary)]
struct Stream {
    packets: Vec<Vec<String>>,
    chunks: Vec<u8>,
}

fuzz_target!(|stream: Stream| {
    let mut wire = BytesMut::new();
    let mut sent = Vec::new();
    for fields in stream.packets {
        let packet = Packet::from_fields(fields);
        if PacketCodec.encode(packet.clone(), &mut wire).is_ok() {
            sent.push(packet);
        }
    }

    let mut received = Vec::new();
    let mut buf = BytesMut::new();
    let mut chunks = stream.chunks.iter().map(|&c| usize::from(c).max(1)).cycle();
    while !wire.is_empty() {
        let take = chunks.next().unwrap_or(wire.len()).min(wire.len());
        buf.extend_from_slice(&wire.split_to(take));
        while let Some(packet) = PacketCodec.decode(&mut buf).expect("encoded stream must decode") {
            received.push(packet);
        }
    }

    assert!(buf.is_empty());
    assert_eq!(received, sent);
});
