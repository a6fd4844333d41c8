//! Stream framing for packets.
//!
//! Layout on the wire:
//! `[length: u16 BE, counts itself] + [field NUL]*`
//!
//! The decoder never allocates more than the length prefix allows (64 KiB), so
//! a peer cannot make us buffer unbounded input.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    Packet,
    errors::{CodecError, ProtocolError},
};

/// Size of the length prefix.
pub const HEADER_SIZE: usize = 2;

/// Largest packet the length prefix can describe, prefix included.
pub const MAX_PACKET_SIZE: usize = u16::MAX as usize;

/// Codec framing [`Packet`]s on a byte stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct PacketCodec;

impl PacketCodec {
    /// Split a packet body into fields.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnterminatedField` if the body does not end with NUL
    /// - `ProtocolError::InvalidUtf8` if a field is not UTF-8
    pub fn parse_body(body: &[u8]) -> Result<Packet, ProtocolError> {
        if body.is_empty() {
            return Ok(Packet::default());
        }

        let Some((&0, fields)) = body.split_last() else {
            return Err(ProtocolError::UnterminatedField);
        };

        let fields = fields
            .split(|&b| b == 0)
            .enumerate()
            .map(|(index, raw)| {
                std::str::from_utf8(raw)
                    .map(str::to_owned)
                    .map_err(|_| ProtocolError::InvalidUtf8 { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Packet::from_fields(fields))
    }

    /// Size of `packet` on the wire, prefix included.
    pub fn encoded_len(packet: &Packet) -> usize {
        HEADER_SIZE + packet.fields().iter().map(|f| f.len() + 1).sum::<usize>()
    }

    /// True if `packet` fits the length prefix.
    pub fn fits(packet: &Packet) -> bool {
        Self::encoded_len(packet) <= MAX_PACKET_SIZE
    }
}

impl Decoder for PacketCodec {
    type Item = Packet;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let length = usize::from(u16::from_be_bytes([src[0], src[1]]));
        if length < HEADER_SIZE {
            return Err(ProtocolError::InvalidLength(length).into());
        }

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(length);
        frame.advance(HEADER_SIZE);

        Ok(Some(Self::parse_body(&frame)?))
    }
}

impl Encoder<Packet> for PacketCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let size = Self::encoded_len(&item);
        if size > MAX_PACKET_SIZE {
            return Err(ProtocolError::PacketTooLarge { size, max: MAX_PACKET_SIZE }.into());
        }

        if let Some(index) = item.fields().iter().position(|f| f.as_bytes().contains(&0)) {
            return Err(ProtocolError::EmbeddedNul { index }.into());
        }

        dst.reserve(size);
        dst.put_u16(size as u16);
        for field in item.fields() {
            dst.put_slice(field.as_bytes());
            dst.put_u8(0);
        }

        Ok(())
    }
}
