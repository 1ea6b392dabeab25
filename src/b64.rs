//! The crypt-style base64 variant shared by both hash formats.
//!
//! Not RFC 4648: the alphabet starts with `.` and `/`, and bytes are packed
//! little-endian with the low 6 bits emitted first. The ordering is part of
//! the on-disk format and must never change.

// Symbol order is load-bearing; index N is the encoding of value N.
pub(crate) const ALPHABET: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode raw bytes, 3-byte groups to 4 symbols, low bits first.
///
/// A trailing 1-byte group yields 2 symbols and a 2-byte group yields 3;
/// no padding is ever appended, so the output is always `ceil(len*8/6)`
/// symbols long.
pub(crate) fn encode(input: &[u8]) -> String {
    let mut output = String::with_capacity((input.len() * 8 + 5) / 6);

    for chunk in input.chunks(3) {
        let mut value = chunk[0] as u32;
        if let Some(&b) = chunk.get(1) {
            value |= (b as u32) << 8;
        }
        if let Some(&b) = chunk.get(2) {
            value |= (b as u32) << 16;
        }

        output.push(ALPHABET[(value & 0x3f) as usize] as char);
        output.push(ALPHABET[(value >> 6 & 0x3f) as usize] as char);
        if chunk.len() > 1 {
            output.push(ALPHABET[(value >> 12 & 0x3f) as usize] as char);
        }
        if chunk.len() > 2 {
            output.push(ALPHABET[(value >> 18 & 0x3f) as usize] as char);
        }
    }

    output
}

/// Symbol to 6-bit value; `None` for anything outside the alphabet.
pub(crate) fn index_of(symbol: u8) -> Option<u8> {
    ALPHABET.iter().position(|&c| c == symbol).map(|i| i as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_order_regression() {
        assert_eq!(ALPHABET[0], b'.');
        assert_eq!(ALPHABET[1], b'/');
        assert_eq!(ALPHABET[63], b'z');

        // A single byte below 64 encodes to its own alphabet symbol.
        for (index, &symbol) in ALPHABET.iter().enumerate() {
            assert_eq!(encode(&[index as u8]).as_bytes()[0], symbol);
        }
        assert_eq!(encode(&[0]), "..");
    }

    #[test]
    fn output_lengths_are_exact() {
        assert_eq!(encode(&[]).len(), 0);
        assert_eq!(encode(&[0u8; 1]).len(), 2);
        assert_eq!(encode(&[0u8; 2]).len(), 3);
        assert_eq!(encode(&[0u8; 3]).len(), 4);
        assert_eq!(encode(&[0u8; 6]).len(), 8);
        assert_eq!(encode(&[0u8; 16]).len(), 22);
    }

    #[test]
    fn packs_low_bits_first() {
        // 0x636261: bits 0-5 = 33 'V', 6-11 = 9 '7', 12-17 = 51 'n', 18-23 = 24 'M'.
        assert_eq!(encode(b"abc"), "V7nM");
        // 0xff: low 6 bits = 63 'z', remaining 2 bits zero-extended = 3 '1'.
        assert_eq!(encode(&[0xff]), "z1");
    }

    #[test]
    fn lookup_round_trips() {
        for (index, &symbol) in ALPHABET.iter().enumerate() {
            assert_eq!(index_of(symbol), Some(index as u8));
        }
        assert_eq!(index_of(b'='), None);
        assert_eq!(index_of(b'$'), None);
        assert_eq!(index_of(b' '), None);
    }
}
