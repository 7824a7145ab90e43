use crate::error::{NodeError, NodeResult};

/// Encode a u64 as a LEB128 variable-length integer.
pub fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer starting at `offset`.
///
/// Returns `(value, bytes_consumed)`.
pub fn decode_varint(data: &[u8], offset: usize) -> NodeResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.get(offset..).unwrap_or_default().iter().enumerate() {
        if shift >= 64 {
            return Err(NodeError::Corrupt {
                offset,
                reason: "varint overflow".into(),
            });
        }
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(NodeError::Corrupt {
        offset,
        reason: "truncated varint".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn small_value_is_one_byte() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 42);
        assert_eq!(buf, vec![42]);
        assert_eq!(decode_varint(&buf, 0).unwrap(), (42, 1));
    }

    #[test]
    fn zero() {
        let mut buf = Vec::new();
        encode_varint(&mut buf, 0);
        assert_eq!(decode_varint(&buf, 0).unwrap(), (0, 1));
    }

    #[test]
    fn decode_at_offset() {
        let mut buf = vec![0xFF, 0xFF];
        encode_varint(&mut buf, 300);
        assert_eq!(decode_varint(&buf, 2).unwrap(), (300, 2));
    }

    #[test]
    fn truncated() {
        let err = decode_varint(&[0x80], 0).unwrap_err();
        assert!(matches!(err, NodeError::Corrupt { .. }));
    }

    #[test]
    fn offset_past_end_is_truncated() {
        assert!(decode_varint(&[1, 2], 5).is_err());
    }

    #[test]
    fn overlong_encoding_overflows() {
        let err = decode_varint(&[0xFF; 11], 0).unwrap_err();
        assert!(matches!(err, NodeError::Corrupt { reason, .. } if reason.contains("overflow")));
    }

    proptest! {
        #[test]
        fn any_u64_roundtrips(value in any::<u64>()) {
            let mut buf = Vec::new();
            encode_varint(&mut buf, value);
            let (decoded, used) = decode_varint(&buf, 0).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(used, buf.len());
        }
    }
}
