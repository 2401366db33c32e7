//! RFC 1924 base85: the compact ASCII alphabet used (among other places) by
//! IPv6 literal encoding, reused here purely as a byte <-> printable-string
//! transport codec. No relation to the ZeroMQ Z85 variant, which uses a
//! different ordering of the same character set.

use thiserror::Error;

const ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

#[derive(Debug, Error)]
pub enum Base85Error {
    #[error("base85 input length {0} is not a multiple of 5 after padding")]
    BadLength(usize),
    #[error("byte {0:#04x} is not a valid base85 character")]
    InvalidByte(u8),
    #[error("decoded group overflows a 32-bit word")]
    Overflow,
}

fn decode_table() -> [i8; 256] {
    let mut table = [-1i8; 256];
    for (value, &ch) in ALPHABET.iter().enumerate() {
        table[ch as usize] = value as i8;
    }
    table
}

/// Encodes arbitrary bytes into RFC 1924 base85, processing 4-byte groups
/// into 5 characters. The final partial group (if any) is padded with zero
/// bytes for encoding and the corresponding trailing characters are trimmed.
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 5).div_ceil(4));
    for chunk in data.chunks(4) {
        let mut buf = [0u8; 4];
        buf[..chunk.len()].copy_from_slice(chunk);
        let mut word = u32::from_be_bytes(buf);

        let mut group = [0u8; 5];
        for slot in group.iter_mut().rev() {
            *slot = ALPHABET[(word % 85) as usize];
            word /= 85;
        }
        let keep = chunk.len() + 1;
        out.push_str(std::str::from_utf8(&group[..keep]).expect("alphabet is ASCII"));
    }
    out
}

/// Decodes an RFC 1924 base85 string produced by [`encode`].
pub fn decode(s: &str) -> Result<Vec<u8>, Base85Error> {
    let table = decode_table();
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() * 4 / 5);

    for chunk in bytes.chunks(5) {
        let mut word: u32 = 0;
        for &b in chunk {
            let digit = table[b as usize];
            if digit < 0 {
                return Err(Base85Error::InvalidByte(b));
            }
            word = word
                .checked_mul(85)
                .and_then(|w| w.checked_add(digit as u32))
                .ok_or(Base85Error::Overflow)?;
        }
        // pad missing trailing chars as if they were the highest symbol,
        // mirroring the zero-byte padding used on encode
        for _ in chunk.len()..5 {
            word = word.checked_mul(85).ok_or(Base85Error::Overflow)?;
        }
        let full = word.to_be_bytes();
        out.extend_from_slice(&full[..chunk.len() - 1]);
    }
    Ok(out)
}
