//! Property tests for the segment codec and the ACK verifier.
//!
//! Random payloads, seqnums, windows and timestamps check the length
//! invariant, that decoding recovers every field, and that checksum1 catches
//! every single-bit header flip except the TR bit, which checksum1 excludes.

use ctp_sender::ack::verify_ack;
use ctp_sender::segment::{
    encode_data_at, encoded_len, Segment, SegmentError, HEADER_LEN, MAX_PAYLOAD, MAX_SEGMENT_LEN,
};
use proptest::prelude::*;

const TR_BYTE: usize = 0;
const TR_BIT: u8 = 5;

fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD)
}

fn encode(payload: &[u8], seqnum: u8, window: u8, timestamp: u32) -> Vec<u8> {
    let mut buf = vec![0u8; MAX_SEGMENT_LEN];
    let n = encode_data_at(&mut buf, payload, seqnum, window, timestamp).unwrap();
    buf.truncate(n);
    buf
}

proptest! {
    #[test]
    fn prop_ack_roundtrip(
        payload in payload_strategy(),
        seqnum in any::<u8>(),
        window in 0u8..32,
        timestamp in any::<u32>(),
    ) {
        let mut ack = Segment::ack(seqnum, window, timestamp);
        ack.payload = payload;
        let bytes = ack.to_bytes().unwrap();
        let verified = verify_ack(&bytes).unwrap();
        prop_assert_eq!(verified.seqnum, seqnum);
        prop_assert_eq!(verified.window.get(), window);
    }

    #[test]
    fn prop_encoded_length(payload in payload_strategy(), seqnum in any::<u8>()) {
        let bytes = encode(&payload, seqnum, 1, 0);
        let n = payload.len();
        prop_assert_eq!(bytes.len(), HEADER_LEN + n + if n > 0 { 4 } else { 0 });
        prop_assert_eq!(bytes.len(), encoded_len(n));
    }

    #[test]
    fn prop_data_decodes_to_same_fields(
        payload in payload_strategy(),
        seqnum in any::<u8>(),
        window in any::<u8>(),
        timestamp in any::<u32>(),
    ) {
        let seg = Segment::decode(&encode(&payload, seqnum, window, timestamp)).unwrap();
        prop_assert_eq!(seg.seqnum, seqnum);
        prop_assert_eq!(seg.window.get(), window & 0x1F);
        prop_assert_eq!(seg.timestamp, timestamp);
        prop_assert_eq!(seg.payload, payload);
    }

    #[test]
    fn prop_header_bit_flip_breaks_checksum(
        seqnum in any::<u8>(),
        window in 0u8..32,
        timestamp in any::<u32>(),
        byte in 0usize..8,
        bit in 0u8..8,
    ) {
        prop_assume!(!(byte == TR_BYTE && bit == TR_BIT));
        let mut bytes = Segment::ack(seqnum, window, timestamp).to_bytes().unwrap();
        bytes[byte] ^= 1 << bit;
        let result = verify_ack(&bytes);
        // Flipping a type bit is caught before the checksum; either way it fails.
        prop_assert!(result.is_err());
        if byte != 0 || bit < TR_BIT {
            let is_checksum_mismatch = matches!(result, Err(SegmentError::ChecksumMismatch { .. }));
            prop_assert!(is_checksum_mismatch);
        }
    }

    #[test]
    fn prop_tr_bit_never_affects_checksum1(
        payload in payload_strategy(),
        seqnum in any::<u8>(),
        window in any::<u8>(),
        timestamp in any::<u32>(),
    ) {
        let clear = encode(&payload, seqnum, window, timestamp);
        let mut set = clear.clone();
        set[TR_BYTE] |= 1 << TR_BIT;
        // Same stored checksum still matches the TR-set header.
        let decoded = Segment::decode(&set).unwrap();
        prop_assert!(decoded.tr);
        prop_assert_eq!(&set[8..12], &clear[8..12]);
    }
}

#[test]
fn payload_of_513_is_rejected_without_writing() {
    let mut buf = vec![0x11u8; 1024];
    let payload = vec![0u8; MAX_PAYLOAD + 1];
    assert_eq!(
        encode_data_at(&mut buf, &payload, 0, 1, 0),
        Err(SegmentError::PayloadTooLarge { len: 513 })
    );
    assert!(buf.iter().all(|&b| b == 0x11));
}
