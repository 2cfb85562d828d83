/// Internet checksum (RFC 1071) over `data`.
///
/// Words are accumulated low byte first and the folded, inverted sum is
/// byte-swapped at the end, so the returned value is ready to be written
/// into a header in network byte order.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);

    for word in &mut chunks {
        let value = word[0] as u32 + ((word[1] as u32) << 8);
        sum = sum.wrapping_add(value);
    }

    // Trailing byte of an odd-length input goes in alone
    if let [last] = chunks.remainder() {
        sum = sum.wrapping_add(*last as u32);
    }

    sum = (sum >> 16) + (sum & 0xFFFF);
    sum += sum >> 16;

    let answer = !sum as u16;
    answer.swap_bytes()
}

/// True when `data` (checksum field included) sums to zero.
#[cfg(test)]
pub fn verify(data: &[u8]) -> bool {
    checksum(data) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // Straightforward big-endian RFC 1071 sum used as a cross-check.
    fn reference(data: &[u8]) -> u16 {
        let mut sum: u32 = 0;
        let mut i = 0;
        while i + 1 < data.len() {
            sum += u16::from_be_bytes([data[i], data[i + 1]]) as u32;
            i += 2;
        }
        if i < data.len() {
            sum += (data[i] as u32) << 8;
        }
        while sum >> 16 != 0 {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
        !(sum as u16)
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(checksum(&[]), 0xFFFF);
    }

    #[test]
    fn test_zeros() {
        assert_eq!(checksum(&[0u8; 20]), 0xFFFF);
    }

    #[test]
    fn test_all_ones_folds_to_zero() {
        assert_eq!(checksum(&[0xFFu8; 20]), 0);
    }

    #[test]
    fn test_rfc1071_example() {
        // Example bytes from RFC 1071 section 3: sum is 0xddf2
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data), !0xddf2u16);
    }

    #[test]
    fn test_matches_reference_even_and_odd() {
        let inputs: [&[u8]; 5] = [
            b"Q",
            b"abc",
            &[0x08, 0x00, 0x00, 0x00, 0x12, 0x34, 0x00, 0x01],
            &[0x45, 0x00, 0x00, 0x54, 0xa6, 0xf2, 0x40, 0x00, 0x40, 0x01, 0x7f],
            &[0xde, 0xad, 0xbe, 0xef, 0x01],
        ];
        for data in inputs {
            assert_eq!(checksum(data), reference(data), "input {:02x?}", data);
        }
    }

    #[test]
    fn test_carry_heavy_input() {
        let data = vec![0xFEu8; 4097];
        assert_eq!(checksum(&data), reference(&data));
    }

    #[test]
    fn test_verify_after_insertion() {
        let mut data = vec![0x08, 0x00, 0x00, 0x00, 0xab, 0xcd, 0x00, 0x07, b'Q', b'Q', b'Q'];
        let sum = checksum(&data);
        data[2..4].copy_from_slice(&sum.to_be_bytes());
        assert!(verify(&data));
    }
}
