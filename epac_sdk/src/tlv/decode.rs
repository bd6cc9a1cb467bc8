use super::error::DecodeError;

fn take<'a>(stream: &mut &'a [u8], len: usize) -> Result<&'a [u8], DecodeError> {
    if stream.len() < len {
        return Err(DecodeError::UnexpectedEnd);
    }

    let (head, tail) = stream.split_at(len);
    *stream = tail;

    Ok(head)
}

/// Decode a VAR-NUMBER and forward the stream past it
pub fn decode_var_number(stream: &mut &[u8]) -> Result<u64, DecodeError> {
    let first = take(stream, 1)?[0];

    let width = match first {
        253 => 2,
        254 => 4,
        255 => 8,
        small => return Ok(small as u64),
    };

    decode_nonneg_integer(take(stream, width)?)
}

/// Decode the value of a non-negative integer element (1, 2, 4 or 8 bytes)
pub fn decode_nonneg_integer(value: &[u8]) -> Result<u64, DecodeError> {
    match value.len() {
        1 | 2 | 4 | 8 => Ok(value.iter().fold(0u64, |acc, &b| acc << 8 | b as u64)),
        _ => Err(DecodeError::InvalidNumber),
    }
}

/// Look at the type of the next element without consuming it
pub fn peek_type(stream: &[u8]) -> Result<u64, DecodeError> {
    let mut probe = stream;
    decode_var_number(&mut probe)
}

/// Decode any TLV element, returning its type and value
pub fn decode_tlv<'a>(stream: &mut &'a [u8]) -> Result<(u64, &'a [u8]), DecodeError> {
    let tlv_type = decode_var_number(stream)?;
    let len = decode_var_number(stream)?;
    let len = usize::try_from(len).map_err(|_| DecodeError::InvalidLength)?;
    let value = take(stream, len).map_err(|_| DecodeError::InvalidLength)?;

    Ok((tlv_type, value))
}

/// Decode a TLV element that must have the given type
pub fn decode_expected<'a>(tlv_type: u64, stream: &mut &'a [u8]) -> Result<&'a [u8], DecodeError> {
    let found = peek_type(stream)?;
    if found != tlv_type {
        return Err(DecodeError::UnexpectedType {
            expected: tlv_type,
            found,
        });
    }

    decode_tlv(stream).map(|(_, value)| value)
}

/// Decode a TLV element of the given type if it is next in the stream
pub fn decode_optional<'a>(
    tlv_type: u64,
    stream: &mut &'a [u8],
) -> Result<Option<&'a [u8]>, DecodeError> {
    if stream.is_empty() || peek_type(stream)? != tlv_type {
        return Ok(None);
    }

    decode_tlv(stream).map(|(_, value)| Some(value))
}

/// Decode an optional non-negative integer element
pub fn decode_optional_nonneg(tlv_type: u64, stream: &mut &[u8]) -> Result<Option<u64>, DecodeError> {
    decode_optional(tlv_type, stream)?
        .map(decode_nonneg_integer)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::encode::encode_tlv;

    #[test]
    fn truncated_input() {
        let mut data = Vec::new();
        encode_tlv(0x15, b"hello", &mut data);

        for cut in 0..data.len() {
            let mut stream = &data[..cut];
            assert!(decode_tlv(&mut stream).is_err());
        }

        let mut stream = &data[..];
        assert_eq!(decode_tlv(&mut stream).unwrap(), (0x15, &b"hello"[..]));
        assert!(stream.is_empty());
    }

    #[test]
    fn unexpected_type() {
        let mut data = Vec::new();
        encode_tlv(0x15, b"x", &mut data);

        let mut stream = &data[..];
        assert_eq!(
            decode_expected(0x07, &mut stream),
            Err(DecodeError::UnexpectedType {
                expected: 0x07,
                found: 0x15
            })
        );
        assert_eq!(decode_optional(0x07, &mut stream), Ok(None));
    }

    #[test]
    fn invalid_integer_width() {
        assert_eq!(
            decode_nonneg_integer(&[1, 2, 3]),
            Err(DecodeError::InvalidNumber)
        );
        assert_eq!(decode_nonneg_integer(&[1, 0]), Ok(256));
    }
}
