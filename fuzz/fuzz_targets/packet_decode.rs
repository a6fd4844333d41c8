//! Fuzz target for PacketCodec::decode
//!
//! Feeds arbitrary bytes to the decoder and checks that:
//! - it never panics
//! - every decoded packet re-encodes to exactly the bytes it consumed

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use metalobby_proto::PacketCodec;
use tokio_util::codec::{Decoder, Encoder};

fuzz_target!(|data: &[u8]| {
    let mut buf = BytesMut::from(data);

    loop {
        let before = buf.clone();
        let packet = match PacketCodec.decode(&mut buf) {
            Ok(Some(packet)) => packet,
            Ok(None) | Err(_) => break,
        };

        let consumed = before.len() - buf.len();
        let mut encoded = BytesMut::new();
        PacketCodec.encode(packet, &mut encoded).expect("decoded packet must re-encode");
        assert_eq!(&encoded[..], &before[..consumed]);
    }
});
