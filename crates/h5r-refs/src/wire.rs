//! Reference wire format.
//!
//! Each reference is framed as `[1-byte kind tag][8-byte LE payload length]
//! [payload]`. The payload of an `Object` reference is its 8-byte address;
//! every other kind stores its serialized buffer verbatim. Decoding only
//! checks the frame; the payload's inner layout is interpreted on access.

use h5r_types::Address;
use tracing::debug;

use crate::codec;
use crate::error::{RefError, RefResult};
use crate::kind::ReferenceKind;
use crate::reference::{Payload, Reference};

/// Size of the `[tag][length]` frame header.
pub const HEADER_LEN: usize = 1 + 8;

/// Default ceiling on a decoded payload length (64 MiB).
pub const DEFAULT_MAX_PAYLOAD: u64 = 64 * 1024 * 1024;

/// Total encoded length of `reference`.
pub fn encoded_len(reference: &Reference) -> usize {
    HEADER_LEN + reference.payload().len()
}

/// Encode into a caller buffer, two-phase.
///
/// Always returns the total encoded length. The frame is written only when
/// `buf` holds at least that many bytes; a short or absent buffer is left
/// untouched so the caller can size one and call again.
pub fn encode_into(reference: &Reference, buf: Option<&mut [u8]>) -> usize {
    let total = encoded_len(reference);
    if let Some(buf) = buf {
        if buf.len() >= total {
            write_frame(reference, &mut buf[..total]);
        }
    }
    total
}

/// Encode into a fresh buffer.
pub fn encode(reference: &Reference) -> RefResult<Vec<u8>> {
    let total = encoded_len(reference);
    let mut out = codec::alloc_buffer(total)?;
    out.resize(total, 0);
    write_frame(reference, &mut out);
    Ok(out)
}

/// Encode a sequence of references back to back.
pub fn encode_all(references: &[Reference]) -> RefResult<Vec<u8>> {
    let total = references.iter().map(encoded_len).sum();
    let mut out = codec::alloc_buffer(total)?;
    for reference in references {
        let start = out.len();
        out.resize(start + encoded_len(reference), 0);
        write_frame(reference, &mut out[start..]);
    }
    Ok(out)
}

fn write_frame(reference: &Reference, out: &mut [u8]) {
    let payload = reference.payload();
    out[0] = reference.kind().tag();
    out[1..HEADER_LEN].copy_from_slice(&(payload.len() as u64).to_le_bytes());
    let body = &mut out[HEADER_LEN..];
    match payload {
        Payload::Object(addr) => body.copy_from_slice(&addr.to_le_bytes()),
        other => body.copy_from_slice(other.serialized().unwrap_or_default()),
    }
}

/// Decode one reference with the default payload ceiling.
///
/// Returns the reference, unbound, and the number of bytes consumed.
pub fn decode(bytes: &[u8]) -> RefResult<(Reference, usize)> {
    decode_with_limit(bytes, DEFAULT_MAX_PAYLOAD)
}

/// Decode one reference, rejecting payload lengths above `max_payload`.
pub fn decode_with_limit(bytes: &[u8], max_payload: u64) -> RefResult<(Reference, usize)> {
    let (&tag, rest) = bytes
        .split_first()
        .ok_or_else(|| RefError::CorruptReference("empty input".into()))?;
    let kind = ReferenceKind::from_tag(tag)
        .ok_or_else(|| RefError::CorruptReference(format!("invalid kind tag {tag}")))?;
    let (len, body) = codec::get_u64(rest)?;

    if len == 0 {
        return Err(RefError::CorruptReference(format!("zero-length {kind} payload")));
    }
    if kind == ReferenceKind::Object && len != Address::SIZE as u64 {
        return Err(RefError::CorruptReference(format!(
            "object payload must be {} bytes, got {len}",
            Address::SIZE
        )));
    }
    if len > max_payload {
        return Err(RefError::CorruptReference(format!(
            "payload length {len} exceeds limit {max_payload}"
        )));
    }
    if len > body.len() as u64 {
        return Err(RefError::CorruptReference(format!(
            "truncated {kind} payload: need {len} bytes, have {}",
            body.len()
        )));
    }

    let len = len as usize;
    let raw = &body[..len];
    let payload = match kind {
        ReferenceKind::Object => Payload::Object(codec::get_address(raw)?.0),
        _ => Payload::from_serialized(kind, codec::copy_bytes(raw)?)
            .ok_or_else(|| RefError::CorruptReference(format!("{kind} has no serialized form")))?,
    };
    let consumed = HEADER_LEN + len;
    debug!(%kind, consumed, "reference decoded");
    Ok((Reference::from_payload(payload), consumed))
}

/// Decode a contiguous sequence of references until `bytes` is exhausted.
pub fn decode_all(bytes: &[u8]) -> RefResult<Vec<Reference>> {
    decode_all_with_limit(bytes, DEFAULT_MAX_PAYLOAD)
}

/// [`decode_all`] with an explicit payload ceiling.
pub fn decode_all_with_limit(mut bytes: &[u8], max_payload: u64) -> RefResult<Vec<Reference>> {
    let mut out = Vec::new();
    while !bytes.is_empty() {
        let (reference, consumed) = decode_with_limit(bytes, max_payload)?;
        out.push(reference);
        bytes = &bytes[consumed..];
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn object(addr: u64) -> Reference {
        Reference::from_payload(Payload::Object(Address::new(addr)))
    }

    fn serialized(kind: ReferenceKind, bytes: &[u8]) -> Reference {
        let payload = Payload::from_serialized(kind, bytes.to_vec().into_boxed_slice()).unwrap();
        Reference::from_payload(payload)
    }

    fn frame(tag: u8, len: u64, body: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn object_layout_is_bit_exact() {
        let bytes = encode(&object(0x2000)).unwrap();
        assert_eq!(
            bytes,
            [1, 8, 0, 0, 0, 0, 0, 0, 0, 0x00, 0x20, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn serialized_payload_copied_verbatim() {
        let r = serialized(ReferenceKind::ExternalObject, &[3, 0, b'a', b'b', b'c', b'/']);
        let bytes = encode(&r).unwrap();
        assert_eq!(bytes[0], 4);
        assert_eq!(&bytes[1..9], &6u64.to_le_bytes());
        assert_eq!(&bytes[9..], &[3, 0, b'a', b'b', b'c', b'/']);
    }

    #[test]
    fn encode_into_two_phase() {
        let r = serialized(ReferenceKind::Region, &[7; 12]);
        let need = encode_into(&r, None);
        assert_eq!(need, 21);

        let mut short = vec![0xEEu8; need - 1];
        assert_eq!(encode_into(&r, Some(&mut short)), need);
        assert!(short.iter().all(|&b| b == 0xEE));

        let mut buf = vec![0u8; need + 4];
        assert_eq!(encode_into(&r, Some(&mut buf)), need);
        assert_eq!(&buf[..need], &encode(&r).unwrap()[..]);
        assert_eq!(&buf[need..], &[0; 4]);
    }

    #[test]
    fn decode_reports_bytes_consumed() {
        let mut bytes = encode(&object(0x2000)).unwrap();
        bytes.extend_from_slice(&[0xAB; 5]);
        let (r, consumed) = decode(&bytes).unwrap();
        assert_eq!(consumed, 17);
        assert_eq!(r, object(0x2000));
        assert_eq!(r.bound_location(), None);
    }

    #[test]
    fn tag_sentinels_rejected() {
        for tag in [ReferenceKind::INVALID_TAG, ReferenceKind::MAX_TAG, 200] {
            let bytes = frame(tag, 8, &[0; 8]);
            assert!(matches!(decode(&bytes), Err(RefError::CorruptReference(_))));
        }
    }

    #[test]
    fn zero_length_rejected() {
        for kind in ReferenceKind::ALL {
            let bytes = frame(kind.tag(), 0, &[]);
            assert!(matches!(decode(&bytes), Err(RefError::CorruptReference(_))));
        }
    }

    #[test]
    fn object_length_must_be_address_width() {
        let bytes = frame(1, 4, &[0; 4]);
        assert!(matches!(decode(&bytes), Err(RefError::CorruptReference(_))));
    }

    #[test]
    fn truncated_input_rejected() {
        assert!(matches!(decode(&[]), Err(RefError::CorruptReference(_))));
        assert!(matches!(decode(&[2, 1, 0]), Err(RefError::CorruptReference(_))));
        let bytes = frame(2, 10, &[1; 9]);
        assert!(matches!(decode(&bytes), Err(RefError::CorruptReference(_))));
    }

    #[test]
    fn oversized_length_rejected_before_allocation() {
        let bytes = frame(2, u64::MAX, &[1; 4]);
        assert!(matches!(decode(&bytes), Err(RefError::CorruptReference(_))));
        let bytes = frame(2, 100, &[1; 100]);
        assert!(matches!(
            decode_with_limit(&bytes, 64),
            Err(RefError::CorruptReference(_))
        ));
        assert!(decode_with_limit(&bytes, 100).is_ok());
    }

    #[test]
    fn stream_of_references() {
        let refs = vec![
            object(0x2000),
            serialized(ReferenceKind::Attribute, &[0, 0x20, 0, 0, 0, 0, 0, 0, 1, 0, b'u']),
            object(0x4000),
        ];
        let bytes = encode_all(&refs).unwrap();
        assert_eq!(bytes.len(), refs.iter().map(encoded_len).sum::<usize>());
        let decoded = decode_all(&bytes).unwrap();
        assert_eq!(decoded, refs);
    }

    #[test]
    fn stream_with_trailing_garbage_fails() {
        let mut bytes = encode_all(&[object(0x2000)]).unwrap();
        bytes.push(9);
        assert!(decode_all(&bytes).is_err());
    }

    fn arb_reference() -> impl Strategy<Value = Reference> {
        prop_oneof![
            any::<u64>().prop_map(object),
            (
                2u8..ReferenceKind::MAX_TAG,
                proptest::collection::vec(any::<u8>(), 1..128)
            )
                .prop_map(|(tag, bytes)| {
                    serialized(ReferenceKind::from_tag(tag).unwrap(), &bytes)
                }),
        ]
    }

    proptest! {
        #[test]
        fn roundtrip_preserves_equality(r in arb_reference()) {
            let bytes = encode(&r).unwrap();
            prop_assert_eq!(bytes.len(), encode_into(&r, None));
            let (decoded, consumed) = decode(&bytes).unwrap();
            prop_assert_eq!(consumed, bytes.len());
            prop_assert_eq!(decoded.kind(), r.kind());
            prop_assert_eq!(decoded, r);
        }

        #[test]
        fn garbage_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            if let Ok((_, consumed)) = decode(&bytes) {
                prop_assert!(consumed <= bytes.len());
            }
        }
    }
}
