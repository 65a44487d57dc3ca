/// Lowercase hexadecimal encoding of binary data.
pub fn encode(bytes: &[u8]) -> String {
    fn hex_digit(b: u8) -> char {
        match b {
            0..=9 => (b + b'0') as char,
            _ => (b - 10 + b'a') as char,
        }
    }

    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(hex_digit(b >> 4));
        out.push(hex_digit(b & 0b00001111));
    }
    out
}

/// Decodes lowercase or uppercase hexadecimal into `out`, which must be
/// exactly half the length of `s`. Returns `None` on any bad digit or length.
pub fn decode_into(s: &str, out: &mut [u8]) -> Option<()> {
    fn unhex_digit(h: u8) -> Option<u8> {
        match h {
            b'0'..=b'9' => Some(h - b'0'),
            b'a'..=b'f' => Some(h - b'a' + 10),
            b'A'..=b'F' => Some(h - b'A' + 10),
            _ => None,
        }
    }

    let s = s.as_bytes();
    if s.len() != out.len() * 2 {
        return None;
    }
    for (i, pair) in s.chunks_exact(2).enumerate() {
        out[i] = (unhex_digit(pair[0])? << 4) | unhex_digit(pair[1])?;
    }
    Some(())
}

#[test]
fn test_hex_round_trip() {
    let example: &[u8] = b"hello, world";
    let hex = encode(example);
    let mut bytes = vec![0u8; example.len()];
    decode_into(&hex, &mut bytes).unwrap();
    assert_eq!(example, &bytes[..]);
}

#[test]
fn test_hex_rejects_bad_input() {
    let mut out = [0u8; 2];
    assert!(decode_into("abc", &mut out).is_none());
    assert!(decode_into("zz00", &mut out).is_none());
    assert!(decode_into("AbCd", &mut out).is_some());
    assert_eq!(out, [0xab, 0xcd]);
}
