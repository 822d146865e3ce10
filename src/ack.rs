//! ACK verification.
//!
//! Only the 12-byte header of an ACK carries meaning in this protocol, so
//! [`verify_ack`] checks type, TR flag and checksum1 and ignores the length,
//! timestamp, payload and checksum2 fields entirely.

use crate::segment::{
    unpack_first_byte, verify_header_checksum, SegmentError, SegmentType, Window, HEADER_LEN,
};

/// Fields extracted from a verified ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub window: Window,
    /// Sequence number acknowledged by the peer.
    pub seqnum: u8,
}

/// Validate a received datagram as an ACK and extract its window and seqnum.
pub fn verify_ack(buf: &[u8]) -> Result<Ack, SegmentError> {
    if buf.len() < HEADER_LEN {
        return Err(SegmentError::TooShort { len: buf.len() });
    }

    let first = unpack_first_byte(buf[0]);
    if first.type_bits != SegmentType::Ack.bits() {
        return Err(SegmentError::WrongType {
            found: first.type_bits,
        });
    }
    if first.tr {
        return Err(SegmentError::InvalidFlag);
    }

    verify_header_checksum(buf)?;

    Ok(Ack {
        window: first.window,
        seqnum: buf[1],
    })
}
