//! Binary frame codec.
//!
//! Every frame has the same three parts, all integers little-endian with
//! no padding:
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ packet_type: u16 | data_size: u16 |        │  header, 6 bytes
//! │ string_size: u16                           │
//! ├────────────────────────────────────────────┤
//! │ fixed payload (data_size bytes)            │  layout fixed per kind
//! ├────────────────────────────────────────────┤
//! │ (len: u16, bytes) × string_count           │  string table,
//! │                                            │  string_size bytes
//! └────────────────────────────────────────────┘
//! ```
//!
//! [`decode`] only ever reads inside the slice it is given. A short slice
//! yields [`ProtocolError::Incomplete`], which the framing layer treats as
//! "wait for more bytes".

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    Joined, LobbyCreate, LobbyCreated, LobbyDetails, LobbyId, LobbyJoin,
    LobbyJoined, LobbyLeave, LobbyLeft, LobbyListGet, LobbyListGot, Packet,
    PacketKind, ProtocolError, UserId,
};

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 6;

/// Largest frame (header + payload + string table) either side will send
/// or accept.
pub const MAX_FRAME_SIZE: usize = 1024;

/// Protocol version carried in [`Joined`]. Informational only: it is not
/// negotiated per frame.
pub const PROTOCOL_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// FrameHeader
// ---------------------------------------------------------------------------

/// The fixed 6-byte frame header, as read off the wire.
///
/// `packet_type` is kept raw so an unknown tag can still be measured and
/// skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub packet_type: u16,
    pub data_size: u16,
    pub string_size: u16,
}

impl FrameHeader {
    /// Reads a header from the front of `buf`, or `None` if fewer than
    /// [`HEADER_SIZE`] bytes are available.
    pub fn peek(buf: &[u8]) -> Option<Self> {
        let mut buf = buf.get(..HEADER_SIZE)?;
        Some(Self {
            packet_type: buf.get_u16_le(),
            data_size: buf.get_u16_le(),
            string_size: buf.get_u16_le(),
        })
    }

    /// Total length of the frame this header announces.
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.data_size as usize + self.string_size as usize
    }

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.packet_type);
        buf.put_u16_le(self.data_size);
        buf.put_u16_le(self.string_size);
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encodes a packet into a standalone frame.
pub fn encode(packet: &Packet) -> Result<Bytes, ProtocolError> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + 64);
    encode_into(packet, &mut buf)?;
    Ok(buf.freeze())
}

/// Appends one encoded frame to `buf`.
///
/// Nothing is written if the packet can't be encoded.
pub fn encode_into(
    packet: &Packet,
    buf: &mut BytesMut,
) -> Result<(), ProtocolError> {
    let meta = packet.meta();
    let strings = strings_of(packet);
    debug_assert_eq!(strings.len(), meta.string_count as usize);

    let mut table = BytesMut::new();
    for s in strings {
        let len = u16::try_from(s.len()).map_err(|_| {
            ProtocolError::StringTooLong {
                kind: meta.kind,
                len: s.len(),
            }
        })?;
        table.put_u16_le(len);
        table.put_slice(s.as_bytes());
    }

    let size = HEADER_SIZE + meta.data_size as usize + table.len();
    if size > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size,
            max: MAX_FRAME_SIZE,
        });
    }

    buf.reserve(size);
    FrameHeader {
        packet_type: meta.kind.to_wire(),
        data_size: meta.data_size,
        // Bounded by MAX_FRAME_SIZE above.
        string_size: table.len() as u16,
    }
    .put(buf);

    let payload_start = buf.len();
    put_payload(packet, buf);
    debug_assert_eq!(buf.len() - payload_start, meta.data_size as usize);

    buf.put(table);
    Ok(())
}

fn strings_of(packet: &Packet) -> Vec<&str> {
    fn details(d: &LobbyDetails) -> Vec<&str> {
        vec![d.game.as_str(), d.version.as_str(), d.title.as_str()]
    }

    match packet {
        Packet::LobbyCreate(p) => details(&p.details),
        Packet::LobbyCreated(p) => details(&p.details),
        Packet::LobbyListGot(p) => details(&p.details),
        Packet::LobbyListGet(p) => vec![p.game.as_str()],
        Packet::Joined(_)
        | Packet::LobbyJoin(_)
        | Packet::LobbyJoined(_)
        | Packet::LobbyLeave(_)
        | Packet::LobbyLeft(_) => Vec::new(),
    }
}

fn put_payload(packet: &Packet, buf: &mut BytesMut) {
    match packet {
        Packet::Joined(p) => {
            buf.put_u64_le(p.user_id.0);
            buf.put_u32_le(p.version);
        }
        Packet::LobbyCreate(p) => buf.put_u16_le(p.max_connections),
        Packet::LobbyCreated(p) => buf.put_u64_le(p.lobby_id.0),
        Packet::LobbyJoin(p) => buf.put_u64_le(p.lobby_id.0),
        Packet::LobbyJoined(p) => {
            buf.put_u64_le(p.lobby_id.0);
            buf.put_u64_le(p.user_id.0);
        }
        Packet::LobbyLeave(p) => buf.put_u64_le(p.lobby_id.0),
        Packet::LobbyLeft(p) => {
            buf.put_u64_le(p.lobby_id.0);
            buf.put_u64_le(p.user_id.0);
        }
        Packet::LobbyListGet(_) => {}
        Packet::LobbyListGot(p) => {
            buf.put_u64_le(p.lobby_id.0);
            buf.put_u64_le(p.owner_id.0);
            buf.put_u16_le(p.connections);
            buf.put_u16_le(p.max_connections);
        }
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decodes the frame at the front of `bytes`.
///
/// Trailing bytes after the frame are ignored; use
/// [`FrameHeader::frame_len`] to find where the next frame starts.
pub fn decode(bytes: &[u8]) -> Result<Packet, ProtocolError> {
    let header =
        FrameHeader::peek(bytes).ok_or(ProtocolError::Incomplete {
            needed: HEADER_SIZE,
            available: bytes.len(),
        })?;

    let frame_len = header.frame_len();
    if frame_len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: frame_len,
            max: MAX_FRAME_SIZE,
        });
    }

    // A frame is only judged once all of it has arrived.
    if bytes.len() < frame_len {
        return Err(ProtocolError::Incomplete {
            needed: frame_len,
            available: bytes.len(),
        });
    }

    let kind = PacketKind::from_wire(header.packet_type)
        .ok_or(ProtocolError::UnknownPacketType(header.packet_type))?;
    let meta = kind.meta();
    if header.data_size != meta.data_size {
        return Err(malformed(
            kind,
            format!(
                "payload is {} bytes, expected {}",
                header.data_size, meta.data_size
            ),
        ));
    }

    let data_end = HEADER_SIZE + meta.data_size as usize;
    let data = &bytes[HEADER_SIZE..data_end];
    let strings = read_string_table(
        kind,
        &bytes[data_end..frame_len],
        meta.string_count as usize,
    )?;

    Ok(read_payload(kind, data, strings))
}

/// Splits a string table into exactly `count` strings.
fn read_string_table(
    kind: PacketKind,
    mut table: &[u8],
    count: usize,
) -> Result<Vec<String>, ProtocolError> {
    let mut strings = Vec::with_capacity(count);
    while table.has_remaining() {
        if table.remaining() < 2 {
            return Err(malformed(kind, "truncated string length".into()));
        }
        let len = table.get_u16_le() as usize;
        if table.remaining() < len {
            return Err(malformed(
                kind,
                format!(
                    "string of {len} bytes overruns table ({} left)",
                    table.remaining()
                ),
            ));
        }
        let (raw, rest) = table.split_at(len);
        let s = std::str::from_utf8(raw)
            .map_err(|e| malformed(kind, format!("invalid UTF-8: {e}")))?;
        strings.push(s.to_owned());
        table = rest;
    }

    if strings.len() != count {
        return Err(malformed(
            kind,
            format!("expected {count} strings, found {}", strings.len()),
        ));
    }
    Ok(strings)
}

/// Builds the typed packet. `data` is exactly `meta.data_size` bytes and
/// `strings` exactly `meta.string_count` long; both were checked by the
/// caller.
fn read_payload(
    kind: PacketKind,
    mut data: &[u8],
    strings: Vec<String>,
) -> Packet {
    let mut strings = strings.into_iter();
    let mut details = || LobbyDetails {
        game: strings.next().unwrap_or_default(),
        version: strings.next().unwrap_or_default(),
        title: strings.next().unwrap_or_default(),
    };

    match kind {
        PacketKind::Joined => Packet::Joined(Joined {
            user_id: UserId(data.get_u64_le()),
            version: data.get_u32_le(),
        }),
        PacketKind::LobbyCreate => Packet::LobbyCreate(LobbyCreate {
            max_connections: data.get_u16_le(),
            details: details(),
        }),
        PacketKind::LobbyCreated => Packet::LobbyCreated(LobbyCreated {
            lobby_id: LobbyId(data.get_u64_le()),
            details: details(),
        }),
        PacketKind::LobbyJoin => Packet::LobbyJoin(LobbyJoin {
            lobby_id: LobbyId(data.get_u64_le()),
        }),
        PacketKind::LobbyJoined => Packet::LobbyJoined(LobbyJoined {
            lobby_id: LobbyId(data.get_u64_le()),
            user_id: UserId(data.get_u64_le()),
        }),
        PacketKind::LobbyLeave => Packet::LobbyLeave(LobbyLeave {
            lobby_id: LobbyId(data.get_u64_le()),
        }),
        PacketKind::LobbyLeft => Packet::LobbyLeft(LobbyLeft {
            lobby_id: LobbyId(data.get_u64_le()),
            user_id: UserId(data.get_u64_le()),
        }),
        PacketKind::LobbyListGet => Packet::LobbyListGet(LobbyListGet {
            game: details().game,
        }),
        PacketKind::LobbyListGot => Packet::LobbyListGot(LobbyListGot {
            lobby_id: LobbyId(data.get_u64_le()),
            owner_id: UserId(data.get_u64_le()),
            connections: data.get_u16_le(),
            max_connections: data.get_u16_le(),
            details: details(),
        }),
    }
}

fn malformed(kind: PacketKind, reason: String) -> ProtocolError {
    ProtocolError::MalformedPacket { kind, reason }
}

impl Packet {
    /// Encodes this packet into one frame. See [`encode`].
    pub fn encode(&self) -> Result<Bytes, ProtocolError> {
        encode(self)
    }

    /// Decodes one frame. See [`decode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        decode(bytes)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Codec tests: exact byte layout, round trips at the boundaries,
    //! and every way a frame can be rejected.

    use super::*;

    fn details() -> LobbyDetails {
        LobbyDetails::new("game", "1.0", "title")
    }

    /// One packet of every kind, with non-trivial field values.
    fn one_of_each() -> Vec<Packet> {
        vec![
            Joined { user_id: UserId(u64::MAX), version: PROTOCOL_VERSION }
                .into(),
            LobbyCreate { max_connections: 4, details: details() }.into(),
            LobbyCreated { lobby_id: LobbyId(42), details: details() }.into(),
            LobbyJoin { lobby_id: LobbyId(1) }.into(),
            LobbyJoined { lobby_id: LobbyId(2), user_id: UserId(3) }.into(),
            LobbyLeave { lobby_id: LobbyId(4) }.into(),
            LobbyLeft { lobby_id: LobbyId(5), user_id: UserId(6) }.into(),
            LobbyListGet { game: "game".into() }.into(),
            LobbyListGot {
                lobby_id: LobbyId(7),
                owner_id: UserId(8),
                connections: 0,
                max_connections: u16::MAX,
                details: details(),
            }
            .into(),
        ]
    }

    /// Builds a raw frame by hand, bypassing the encoder's checks.
    fn raw_frame(tag: u16, data: &[u8], table: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&tag.to_le_bytes());
        buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
        buf.extend_from_slice(&(table.len() as u16).to_le_bytes());
        buf.extend_from_slice(data);
        buf.extend_from_slice(table);
        buf
    }

    // =====================================================================
    // encode()
    // =====================================================================

    #[test]
    fn test_encode_lobby_join_exact_bytes() {
        let frame = encode(&LobbyJoin { lobby_id: LobbyId(0x0102) }.into())
            .unwrap();
        assert_eq!(
            frame.as_ref(),
            &[
                4, 0, // packet_type
                8, 0, // data_size
                0, 0, // string_size
                0x02, 0x01, 0, 0, 0, 0, 0, 0, // lobby_id
            ]
        );
    }

    #[test]
    fn test_encode_lobby_list_get_string_table_layout() {
        let frame =
            encode(&LobbyListGet { game: "ab".into() }.into()).unwrap();
        assert_eq!(frame.as_ref(), &[8, 0, 0, 0, 4, 0, 2, 0, b'a', b'b']);
    }

    #[test]
    fn test_encode_header_matches_static_metadata() {
        for packet in one_of_each() {
            let frame = encode(&packet).unwrap();
            let header = FrameHeader::peek(&frame).unwrap();
            assert_eq!(header.packet_type, packet.kind().to_wire());
            assert_eq!(header.data_size, packet.meta().data_size);
            assert_eq!(header.frame_len(), frame.len());
        }
    }

    #[test]
    fn test_encode_oversized_frame_returns_too_large() {
        let packet: Packet = LobbyCreate {
            max_connections: 2,
            details: LobbyDetails::new("g", "v", "x".repeat(MAX_FRAME_SIZE)),
        }
        .into();
        assert!(matches!(
            encode(&packet),
            Err(ProtocolError::FrameTooLarge { max: MAX_FRAME_SIZE, .. })
        ));
    }

    #[test]
    fn test_encode_string_over_u16_returns_string_too_long() {
        let packet: Packet =
            LobbyListGet { game: "x".repeat(u16::MAX as usize + 1) }.into();
        assert!(matches!(
            encode(&packet),
            Err(ProtocolError::StringTooLong { kind: PacketKind::LobbyListGet, .. })
        ));
    }

    #[test]
    fn test_encode_into_failure_leaves_buffer_untouched() {
        let mut buf = BytesMut::new();
        let packet: Packet =
            LobbyListGet { game: "x".repeat(MAX_FRAME_SIZE) }.into();
        assert!(encode_into(&packet, &mut buf).is_err());
        assert!(buf.is_empty());
    }

    // =====================================================================
    // decode(): round trips
    // =====================================================================

    #[test]
    fn test_decode_round_trip_every_kind() {
        for packet in one_of_each() {
            let frame = encode(&packet).unwrap();
            assert_eq!(decode(&frame).unwrap(), packet);
        }
    }

    #[test]
    fn test_decode_round_trip_empty_strings() {
        let packet: Packet = LobbyCreated {
            lobby_id: LobbyId(0),
            details: LobbyDetails::default(),
        }
        .into();
        let frame = encode(&packet).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + 8 + 3 * 2);
        assert_eq!(decode(&frame).unwrap(), packet);
    }

    #[test]
    fn test_decode_round_trip_largest_string_that_fits() {
        // Header + u16 length prefix + payload = everything but the string.
        let room = MAX_FRAME_SIZE - HEADER_SIZE - 2;
        let packet: Packet = LobbyListGet { game: "g".repeat(room) }.into();
        let frame = encode(&packet).unwrap();
        assert_eq!(frame.len(), MAX_FRAME_SIZE);
        assert_eq!(decode(&frame).unwrap(), packet);

        let too_big: Packet =
            LobbyListGet { game: "g".repeat(room + 1) }.into();
        assert!(encode(&too_big).is_err());
    }

    #[test]
    fn test_decode_round_trip_multibyte_utf8() {
        let packet: Packet = LobbyCreate {
            max_connections: 1,
            details: LobbyDetails::new("jeu", "ü.0", "🎮 lobby"),
        }
        .into();
        assert_eq!(decode(&encode(&packet).unwrap()).unwrap(), packet);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let packet: Packet = LobbyLeave { lobby_id: LobbyId(9) }.into();
        let mut bytes = encode(&packet).unwrap().to_vec();
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(decode(&bytes).unwrap(), packet);
    }

    // =====================================================================
    // decode(): incomplete input
    // =====================================================================

    #[test]
    fn test_decode_every_prefix_is_incomplete() {
        for packet in one_of_each() {
            let frame = encode(&packet).unwrap();
            for cut in 0..frame.len() {
                let result = decode(&frame[..cut]);
                assert!(
                    matches!(result, Err(ProtocolError::Incomplete { .. })),
                    "{} cut at {cut}: {result:?}",
                    packet.kind()
                );
            }
        }
    }

    #[test]
    fn test_decode_prefix_of_rejectable_frame_is_incomplete() {
        let frames = [
            // Unknown tag 77 with a 3-byte payload.
            raw_frame(77, &[1, 2, 3], &[]),
            // LobbyJoin declaring 4 payload bytes instead of 8.
            raw_frame(4, &[1, 2, 3, 4], &[]),
            // LobbyCreated with a short string table.
            raw_frame(3, &[0; 8], &[1, 0, b'x']),
        ];
        for frame in frames {
            for cut in 0..frame.len() {
                let result = decode(&frame[..cut]);
                assert!(
                    matches!(result, Err(ProtocolError::Incomplete { .. })),
                    "tag {} cut at {cut}: {result:?}",
                    frame[0]
                );
            }
            assert!(decode(&frame).unwrap_err().is_recoverable());
        }
    }

    #[test]
    fn test_decode_header_only_of_short_payload_is_incomplete() {
        // LobbyJoin header announcing 4 payload bytes that have not arrived.
        assert_eq!(
            decode(&[4, 0, 4, 0, 0, 0]),
            Err(ProtocolError::Incomplete { needed: 10, available: 6 })
        );
    }

    // =====================================================================
    // decode(): rejected frames
    // =====================================================================

    #[test]
    fn test_decode_unknown_type_returns_unknown() {
        let frame = raw_frame(0, &[], &[]);
        assert_eq!(decode(&frame), Err(ProtocolError::UnknownPacketType(0)));

        let frame = raw_frame(77, &[1, 2, 3], &[]);
        assert_eq!(decode(&frame), Err(ProtocolError::UnknownPacketType(77)));
    }

    #[test]
    fn test_decode_wrong_data_size_returns_malformed() {
        // LobbyJoin expects 8 payload bytes, give it 4.
        let frame = raw_frame(4, &[1, 2, 3, 4], &[]);
        assert!(matches!(
            decode(&frame),
            Err(ProtocolError::MalformedPacket { kind: PacketKind::LobbyJoin, .. })
        ));
    }

    #[test]
    fn test_decode_too_few_strings_returns_malformed() {
        // LobbyCreated declares 3 strings; table holds 1.
        let frame = raw_frame(3, &[0; 8], &[1, 0, b'x']);
        let err = decode(&frame).unwrap_err();
        assert!(err.to_string().contains("expected 3 strings, found 1"));
    }

    #[test]
    fn test_decode_too_many_strings_returns_malformed() {
        // LobbyListGet declares 1 string; table holds 2 empty ones.
        let frame = raw_frame(8, &[], &[0, 0, 0, 0]);
        assert!(matches!(
            decode(&frame),
            Err(ProtocolError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn test_decode_string_overrunning_table_returns_malformed() {
        let frame = raw_frame(8, &[], &[9, 0, b'a']);
        assert!(matches!(
            decode(&frame),
            Err(ProtocolError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn test_decode_truncated_length_prefix_returns_malformed() {
        let frame = raw_frame(8, &[], &[1, 0, b'a', 0]);
        let err = decode(&frame).unwrap_err();
        assert!(err.to_string().contains("truncated string length"));
    }

    #[test]
    fn test_decode_invalid_utf8_returns_malformed() {
        let frame = raw_frame(8, &[], &[2, 0, 0xFF, 0xFE]);
        assert!(matches!(
            decode(&frame),
            Err(ProtocolError::MalformedPacket { .. })
        ));
    }

    #[test]
    fn test_decode_oversized_header_returns_too_large() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&8u16.to_le_bytes());
        frame.extend_from_slice(&0u16.to_le_bytes());
        frame.extend_from_slice(&2000u16.to_le_bytes());
        let err = decode(&frame).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { size: 2006, .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_rejections_are_recoverable() {
        assert!(ProtocolError::UnknownPacketType(0).is_recoverable());
        assert!(decode(&raw_frame(4, &[0; 2], &[])).unwrap_err().is_recoverable());
    }
}
