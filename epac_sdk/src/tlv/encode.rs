/// Encode a VAR-NUMBER: 1 byte below 253, otherwise a marker byte
/// followed by a 2, 4 or 8 byte big-endian value
pub fn encode_var_number(number: u64, stream: &mut impl for<'a> Extend<&'a u8>) {
    if number < 253 {
        stream.extend(&[number as u8]);
    } else if number <= u16::MAX as u64 {
        stream.extend(&[253]);
        stream.extend(&(number as u16).to_be_bytes());
    } else if number <= u32::MAX as u64 {
        stream.extend(&[254]);
        stream.extend(&(number as u32).to_be_bytes());
    } else {
        stream.extend(&[255]);
        stream.extend(&number.to_be_bytes());
    }
}

/// Encode a type-length-value element
pub fn encode_tlv(tlv_type: u64, value: &[u8], stream: &mut impl for<'a> Extend<&'a u8>) {
    encode_var_number(tlv_type, stream);
    encode_var_number(value.len() as u64, stream);
    stream.extend(value);
}

/// Encode a non-negative integer using the shortest of 1, 2, 4 or 8 bytes
pub fn encode_nonneg_integer(number: u64, stream: &mut impl for<'a> Extend<&'a u8>) {
    if number <= u8::MAX as u64 {
        stream.extend(&[number as u8]);
    } else if number <= u16::MAX as u64 {
        stream.extend(&(number as u16).to_be_bytes());
    } else if number <= u32::MAX as u64 {
        stream.extend(&(number as u32).to_be_bytes());
    } else {
        stream.extend(&number.to_be_bytes());
    }
}

/// Encode a TLV element whose value is a non-negative integer
pub fn encode_nonneg_tlv(tlv_type: u64, number: u64, stream: &mut impl for<'a> Extend<&'a u8>) {
    let mut value = Vec::with_capacity(8);
    encode_nonneg_integer(number, &mut value);
    encode_tlv(tlv_type, &value, stream);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_number_widths() {
        let mut out = Vec::new();
        encode_var_number(252, &mut out);
        assert_eq!(out, [252]);

        out.clear();
        encode_var_number(0x0320, &mut out);
        assert_eq!(out, [253, 0x03, 0x20]);

        out.clear();
        encode_var_number(0x1_0000, &mut out);
        assert_eq!(out, [254, 0, 1, 0, 0]);
    }

    #[test]
    fn shortest_integer() {
        let mut out = Vec::new();
        encode_nonneg_tlv(0x0c, 4000, &mut out);
        assert_eq!(out, [0x0c, 2, 0x0f, 0xa0]);
    }
}
