use std::fmt;
use std::fmt::Write as _;

#[derive(Debug)]
pub enum LoadError {
    Read(std::io::Error),
    EmptySource,
    EmptyBytecode,
    UnalignedBytecode(usize),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Read(err) => write!(f, "unreadable source: {err}"),
            LoadError::EmptySource => write!(f, "empty source"),
            LoadError::EmptyBytecode => write!(f, "empty bytecode source"),
            LoadError::UnalignedBytecode(len) => {
                write!(f, "invalid bytecode source: {len} bytes is not a multiple of 4")
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Decodes a hex program text into bytecode. Characters outside
/// `[0-9A-Fa-f]` separate digits and are discarded; consecutive digits
/// pair into bytes, high nibble first. A trailing unpaired digit is
/// dropped.
pub fn decode_source(text: &str) -> Result<Vec<u8>, LoadError> {
    if text.is_empty() {
        return Err(LoadError::EmptySource);
    }

    let mut bytes = Vec::new();
    let mut pending: Option<u32> = None;
    for ch in text.chars() {
        let Some(digit) = ch.to_digit(16) else {
            continue;
        };
        match pending.take() {
            Some(high) => bytes.push(((high << 4) | digit) as u8),
            None => pending = Some(digit),
        }
    }

    if bytes.len() % 4 != 0 {
        return Err(LoadError::UnalignedBytecode(bytes.len()));
    }
    if bytes.is_empty() {
        return Err(LoadError::EmptyBytecode);
    }
    Ok(bytes)
}

/// Renders bytecode as hex text, one 4-byte instruction per line.
pub fn encode_source(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (index, byte) in bytes.iter().enumerate() {
        let _ = write!(out, "{byte:02X}");
        if index % 4 == 3 {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_hex_pairs() {
        let bytes = decode_source("01000007").expect("source should decode");
        assert_eq!(bytes, vec![0x01, 0x00, 0x00, 0x07]);
    }

    #[test]
    fn separators_and_case_are_ignored() {
        let bytes = decode_source("0a 00,B0-01\n;ff 00 00 02").expect("source should decode");
        assert_eq!(bytes, vec![0x0A, 0x00, 0xB0, 0x01, 0xFF, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(matches!(decode_source(""), Err(LoadError::EmptySource)));
    }

    #[test]
    fn text_without_hex_digits_is_rejected() {
        assert!(matches!(
            decode_source("!! ** ~~\n"),
            Err(LoadError::EmptyBytecode)
        ));
    }

    #[test]
    fn unaligned_byte_counts_are_rejected() {
        assert!(matches!(
            decode_source("AA BB CC"),
            Err(LoadError::UnalignedBytecode(3))
        ));
    }

    #[test]
    fn trailing_nibble_is_dropped_before_alignment_check() {
        assert!(matches!(
            decode_source("ABC"),
            Err(LoadError::UnalignedBytecode(1))
        ));
    }

    #[test]
    fn encode_decode_round_trips() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = encode_source(&bytes);
        let decoded = decode_source(&text).expect("encoded source should decode");
        assert_eq!(decoded, bytes);
    }
}
