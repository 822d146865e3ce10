//! Wire-format definitions for CTP segments.
//!
//! Every datagram exchanged between peers is a segment.  This module is
//! responsible for:
//! - Defining the on-wire binary layout (bit-packed first byte, header
//!   fields, optional payload and payload checksum).
//! - Encoding a segment into a caller-supplied buffer.
//! - Decoding a raw byte slice back into a [`Segment`], returning errors
//!   for malformed, truncated or corrupted input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |Typ|T| Window  |    Seqnum     |            Length             |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Timestamp                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                           Checksum1                           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Payload (Length bytes) ...                 |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                  Checksum2 (only if Length > 0)               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Checksum1 is a CRC-32 over bytes 0–7 with the TR bit cleared.  Checksum2
//! is a CRC-32 over the payload alone.  Both use the CRC-32/ISO-HDLC
//! polynomial (the zlib `crc32`), which the reference receiver expects.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Byte length of the fixed-size header on the wire (including checksum1).
pub const HEADER_LEN: usize = 12;

/// Largest payload a single segment may carry.
pub const MAX_PAYLOAD: usize = 512;

/// Byte length of each CRC-32 field.
pub const CHECKSUM_LEN: usize = 4;

/// Largest possible encoded segment.
pub const MAX_SEGMENT_LEN: usize = HEADER_LEN + MAX_PAYLOAD + CHECKSUM_LEN;

/// Number of leading header bytes covered by checksum1.
const CHECKSUMMED_LEN: usize = 8;

// Byte offsets of each field within the serialised header.
const OFF_FIRST: usize = 0;
const OFF_SEQNUM: usize = 1;
const OFF_LENGTH: usize = 2;
const OFF_TIMESTAMP: usize = 4;
const OFF_CHECKSUM1: usize = 8;

// Bit layout of the first header byte: type(7..6) | tr(5) | window(4..0).
const TYPE_SHIFT: u8 = 6;
const TYPE_MASK: u8 = 0b11;
const TR_SHIFT: u8 = 5;
const TR_BIT: u8 = 1 << TR_SHIFT;
const WINDOW_MASK: u8 = 0b1_1111;

/// Segment type carried in the two high bits of the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SegmentType {
    Data = 1,
    Ack = 2,
    Nack = 3,
}

impl SegmentType {
    /// Two-bit wire value.
    pub fn bits(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for SegmentType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Data),
            2 => Ok(Self::Ack),
            3 => Ok(Self::Nack),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for SegmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Data => write!(f, "DATA"),
            Self::Ack => write!(f, "ACK"),
            Self::Nack => write!(f, "NACK"),
        }
    }
}

/// Advertised window, always in `0..=31`.
///
/// Construction masks the value to five bits, so a window of 33 silently
/// becomes 1.  This mirrors what the wire can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Window(u8);

impl Window {
    /// Largest representable window.
    pub const MAX: u8 = WINDOW_MASK;

    pub fn new(value: u8) -> Self {
        Self(value & WINDOW_MASK)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for Window {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unpacked view of the first header byte.
///
/// `type_bits` is kept raw so a verifier can report the exact value it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstByte {
    pub type_bits: u8,
    pub tr: bool,
    pub window: Window,
}

/// Pack type, TR flag and window into the first header byte.
pub fn pack_first_byte(kind: SegmentType, tr: bool, window: Window) -> u8 {
    ((kind.bits() & TYPE_MASK) << TYPE_SHIFT) | (u8::from(tr) << TR_SHIFT) | window.get()
}

/// Split the first header byte into its three fields.
pub fn unpack_first_byte(byte: u8) -> FirstByte {
    FirstByte {
        type_bits: (byte >> TYPE_SHIFT) & TYPE_MASK,
        tr: byte & TR_BIT != 0,
        window: Window::new(byte),
    }
}

/// CRC-32 over the first eight header bytes with the TR bit cleared.
///
/// Always works on a private copy, so the result never depends on the TR
/// bit or on whatever sits in the checksum field.
pub fn header_checksum(header: &[u8; CHECKSUMMED_LEN]) -> u32 {
    let mut snapshot = *header;
    snapshot[OFF_FIRST] &= !TR_BIT;
    crc32fast::hash(&snapshot)
}

/// CRC-32 over the payload bytes alone.
pub fn payload_checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Total bytes a segment with `payload_len` payload bytes occupies on the wire.
pub fn encoded_len(payload_len: usize) -> usize {
    if payload_len == 0 {
        HEADER_LEN
    } else {
        HEADER_LEN + payload_len + CHECKSUM_LEN
    }
}

/// Current wall-clock time in whole seconds, truncated to 32 bits.
pub fn unix_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

/// Encode a DATA segment into `out`, stamped with the current time.
///
/// Returns the number of bytes written.  Fails without touching `out` if the
/// payload exceeds [`MAX_PAYLOAD`] or `out` cannot hold the whole segment.
pub fn encode_data(
    out: &mut [u8],
    payload: &[u8],
    seqnum: u8,
    window: u8,
) -> Result<usize, SegmentError> {
    encode_data_at(out, payload, seqnum, window, unix_timestamp())
}

/// Like [`encode_data`] but with an explicit timestamp.
pub fn encode_data_at(
    out: &mut [u8],
    payload: &[u8],
    seqnum: u8,
    window: u8,
    timestamp: u32,
) -> Result<usize, SegmentError> {
    write_segment(
        out,
        SegmentType::Data,
        false,
        Window::new(window),
        seqnum,
        timestamp,
        payload,
    )
}

fn write_segment(
    out: &mut [u8],
    kind: SegmentType,
    tr: bool,
    window: Window,
    seqnum: u8,
    timestamp: u32,
    payload: &[u8],
) -> Result<usize, SegmentError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(SegmentError::PayloadTooLarge { len: payload.len() });
    }
    let total = encoded_len(payload.len());
    if out.len() < total {
        return Err(SegmentError::BufferTooSmall {
            needed: total,
            capacity: out.len(),
        });
    }

    let mut header = [0u8; HEADER_LEN];
    header[OFF_FIRST] = pack_first_byte(kind, tr, window);
    header[OFF_SEQNUM] = seqnum;
    header[OFF_LENGTH..OFF_LENGTH + 2].copy_from_slice(&(payload.len() as u16).to_be_bytes());
    header[OFF_TIMESTAMP..OFF_TIMESTAMP + 4].copy_from_slice(&timestamp.to_be_bytes());
    // Checksum field is zero while computing the checksum.
    header[OFF_CHECKSUM1..OFF_CHECKSUM1 + 4].copy_from_slice(&0u32.to_be_bytes());

    let crc1 = header_checksum(&checksummed_bytes(&header));
    header[OFF_CHECKSUM1..OFF_CHECKSUM1 + 4].copy_from_slice(&crc1.to_be_bytes());
    out[..HEADER_LEN].copy_from_slice(&header);

    if !payload.is_empty() {
        let end = HEADER_LEN + payload.len();
        out[HEADER_LEN..end].copy_from_slice(payload);
        out[end..end + CHECKSUM_LEN].copy_from_slice(&payload_checksum(payload).to_be_bytes());
    }

    Ok(total)
}

/// Check the stored checksum1 of `buf` against a fresh recomputation.
///
/// Only the first [`HEADER_LEN`] bytes are inspected.
pub fn verify_header_checksum(buf: &[u8]) -> Result<(), SegmentError> {
    if buf.len() < HEADER_LEN {
        return Err(SegmentError::TooShort { len: buf.len() });
    }
    let found = read_u32(buf, OFF_CHECKSUM1);
    let expected = header_checksum(&checksummed_bytes(buf));
    if found != expected {
        return Err(SegmentError::ChecksumMismatch { expected, found });
    }
    Ok(())
}

/// A decoded (or to-be-encoded) CTP segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentType,
    /// Retransmission flag.  Never set by this sender.
    pub tr: bool,
    pub window: Window,
    pub seqnum: u8,
    /// Seconds since the epoch at encode time.
    pub timestamp: u32,
    pub payload: Vec<u8>,
}

impl Segment {
    /// A header-only ACK segment, the shape the reference receiver sends back.
    pub fn ack(seqnum: u8, window: u8, timestamp: u32) -> Self {
        Self {
            kind: SegmentType::Ack,
            tr: false,
            window: Window::new(window),
            seqnum,
            timestamp,
            payload: Vec::new(),
        }
    }

    /// Total bytes this segment occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        encoded_len(self.payload.len())
    }

    /// Encode into `out`, returning the number of bytes written.
    pub fn encode_into(&self, out: &mut [u8]) -> Result<usize, SegmentError> {
        write_segment(
            out,
            self.kind,
            self.tr,
            self.window,
            self.seqnum,
            self.timestamp,
            &self.payload,
        )
    }

    /// Encode into a newly allocated byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SegmentError> {
        let mut buf = vec![0u8; self.encoded_len()];
        let n = self.encode_into(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Parse a complete segment from a raw datagram.
    ///
    /// Returns [`Err`] if:
    /// - `buf` is shorter than [`HEADER_LEN`],
    /// - the type bits are zero,
    /// - the length field exceeds [`MAX_PAYLOAD`] or disagrees with `buf.len()`,
    /// - either checksum does not verify.
    pub fn decode(buf: &[u8]) -> Result<Self, SegmentError> {
        if buf.len() < HEADER_LEN {
            return Err(SegmentError::TooShort { len: buf.len() });
        }

        let first = unpack_first_byte(buf[OFF_FIRST]);
        let kind = SegmentType::try_from(first.type_bits).map_err(|_| SegmentError::InvalidType)?;

        let length = usize::from(u16::from_be_bytes([buf[OFF_LENGTH], buf[OFF_LENGTH + 1]]));
        if length > MAX_PAYLOAD {
            return Err(SegmentError::PayloadTooLarge { len: length });
        }
        let expected_len = encoded_len(length);
        if buf.len() != expected_len {
            return Err(SegmentError::LengthMismatch {
                expected: expected_len,
                found: buf.len(),
            });
        }

        verify_header_checksum(buf)?;

        let payload = &buf[HEADER_LEN..HEADER_LEN + length];
        if length > 0 {
            let found = read_u32(buf, HEADER_LEN + length);
            let expected = payload_checksum(payload);
            if found != expected {
                return Err(SegmentError::PayloadChecksumMismatch { expected, found });
            }
        }

        Ok(Self {
            kind,
            tr: first.tr,
            window: first.window,
            seqnum: buf[OFF_SEQNUM],
            timestamp: read_u32(buf, OFF_TIMESTAMP),
            payload: payload.to_vec(),
        })
    }
}

/// Errors that can arise when encoding or parsing a segment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("payload of {len} bytes exceeds the {max}-byte limit", max = MAX_PAYLOAD)]
    PayloadTooLarge { len: usize },
    #[error("output buffer holds {capacity} bytes, segment needs {needed}")]
    BufferTooSmall { needed: usize, capacity: usize },
    #[error("buffer of {len} bytes is too short to contain a header")]
    TooShort { len: usize },
    #[error("unexpected segment type {found}")]
    WrongType { found: u8 },
    #[error("segment type bits are not a known type")]
    InvalidType,
    #[error("TR flag is set")]
    InvalidFlag,
    #[error("header checksum mismatch (expected {expected:#010x}, found {found:#010x})")]
    ChecksumMismatch { expected: u32, found: u32 },
    #[error("payload checksum mismatch (expected {expected:#010x}, found {found:#010x})")]
    PayloadChecksumMismatch { expected: u32, found: u32 },
    #[error("length field implies {expected} bytes, datagram has {found}")]
    LengthMismatch { expected: usize, found: usize },
}

fn checksummed_bytes(buf: &[u8]) -> [u8; CHECKSUMMED_LEN] {
    let mut out = [0u8; CHECKSUMMED_LEN];
    out.copy_from_slice(&buf[..CHECKSUMMED_LEN]);
    out
}

fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_be_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}
