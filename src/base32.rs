const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Error type for base32 decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Base32Error {
    /// A character outside `A-Z2-7` after padding and whitespace were stripped
    #[error("Invalid RFC 4648 base32 character '{character}' at position {position}")]
    InvalidCharacter {
        /// The offending character
        character: char,
        /// Position in the normalized (whitespace-free) input
        position: usize,
    },
}

/// Encode `bytes` as RFC 4648 base32.
///
/// With `include_padding` the output is padded with `=` to a multiple of 8 symbols.
pub fn encode(bytes: &[u8], include_padding: bool) -> String {
    let mut output = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut buffer: u16 = 0;
    let mut bits_left: u32 = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u16;
        bits_left += 8;
        while bits_left >= 5 {
            bits_left -= 5;
            output.push(ALPHABET[((buffer >> bits_left) & 0x1f) as usize] as char);
        }
    }

    if bits_left > 0 {
        output.push(ALPHABET[((buffer << (5 - bits_left)) & 0x1f) as usize] as char);
    }

    if include_padding {
        while output.len() % 8 != 0 {
            output.push('=');
        }
    }
    output
}

/// Decode RFC 4648 base32 text.
///
/// Whitespace anywhere and trailing `=` are ignored, lower case is accepted.
/// Trailing bits that do not fill a whole byte are dropped.
pub fn decode(text: &str) -> Result<Vec<u8>, Base32Error> {
    let normalized: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let trimmed = normalized.trim_end_matches('=');

    let mut output = Vec::with_capacity(trimmed.len() * 5 / 8);
    let mut buffer: u16 = 0;
    let mut bits_left: u32 = 0;

    for (position, character) in trimmed.chars().enumerate() {
        let value = symbol_value(character.to_ascii_uppercase())
            .ok_or(Base32Error::InvalidCharacter { character, position })?;
        buffer = (buffer << 5) | value;
        bits_left += 5;
        if bits_left >= 8 {
            bits_left -= 8;
            output.push((buffer >> bits_left) as u8);
            buffer &= (1 << bits_left) - 1;
        }
    }
    Ok(output)
}

fn symbol_value(c: char) -> Option<u16> {
    match c {
        'A'..='Z' => Some(c as u16 - 'A' as u16),
        '2'..='7' => Some(c as u16 - '2' as u16 + 26),
        _ => None,
    }
}
