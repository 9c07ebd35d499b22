//! Text encoding detection and strict decoding for pedigree files.
//!
//! Pedigree tables are frequently produced by spreadsheet software and
//! saved in whatever code page the workstation uses. Detection order:
//! 1. BOM (UTF-8, UTF-16 LE/BE)
//! 2. UTF-16 without BOM, recognized by null byte patterns
//! 3. UTF-8 validation (ASCII is reported as UTF-8)
//! 4. chardetng statistical detection for legacy encodings

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::error::{FamsplitError, Result};

/// How the pedigree file's encoding is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingChoice {
    /// Infer the encoding from the raw bytes
    #[default]
    Auto,
    /// Always decode with this encoding
    Forced(&'static Encoding),
}

impl FromStr for EncodingChoice {
    type Err = FamsplitError;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim();
        if label.eq_ignore_ascii_case("auto") {
            return Ok(EncodingChoice::Auto);
        }
        Encoding::for_label(label.as_bytes())
            .map(EncodingChoice::Forced)
            .ok_or_else(|| FamsplitError::UnknownEncoding(label.to_string()))
    }
}

impl fmt::Display for EncodingChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingChoice::Auto => write!(f, "auto"),
            EncodingChoice::Forced(enc) => write!(f, "{}", enc.name()),
        }
    }
}

impl EncodingChoice {
    /// Resolve the encoding to use for `buffer`.
    pub fn resolve(&self, buffer: &[u8]) -> &'static Encoding {
        match *self {
            EncodingChoice::Auto => detect_encoding(buffer),
            EncodingChoice::Forced(enc) => enc,
        }
    }
}

/// Detect the character encoding of a byte buffer.
pub fn detect_encoding(buffer: &[u8]) -> &'static Encoding {
    if buffer.is_empty() {
        return UTF_8;
    }

    if let Some((encoding, _bom_len)) = Encoding::for_bom(buffer) {
        return encoding;
    }

    if let Some(encoding) = detect_utf16_without_bom(buffer) {
        return encoding;
    }

    if std::str::from_utf8(buffer).is_ok() {
        return UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(buffer, true);
    detector.guess(None, true)
}

/// ASCII text in UTF-16 has a null byte in every other position.
fn detect_utf16_without_bom(buffer: &[u8]) -> Option<&'static Encoding> {
    let total_pairs = buffer.len() / 2;
    if total_pairs <= 4 {
        return None;
    }

    let nulls_at_odd = buffer
        .iter()
        .skip(1)
        .step_by(2)
        .filter(|&&b| b == 0)
        .count();
    let nulls_at_even = buffer.iter().step_by(2).filter(|&&b| b == 0).count();

    if nulls_at_odd > total_pairs * 3 / 4 && nulls_at_even < total_pairs / 4 {
        return Some(UTF_16LE);
    }
    if nulls_at_even > total_pairs * 3 / 4 && nulls_at_odd < total_pairs / 4 {
        return Some(UTF_16BE);
    }

    None
}

/// Decode `buffer` with `encoding`, failing on any malformed sequence.
///
/// A leading BOM for the same encoding is stripped.
pub fn decode_strict(buffer: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, had_errors) = encoding.decode_with_bom_removal(buffer);
    if had_errors {
        return Err(FamsplitError::Decode {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(text.into_owned())
}

/// Human readable name of the encoding, reporting pure ASCII as such.
pub fn describe(buffer: &[u8], encoding: &'static Encoding) -> String {
    if encoding == UTF_8 && buffer.is_ascii() {
        "ascii".to_string()
    } else {
        encoding.name().to_string()
    }
}

/// Read a whole text file and decode it according to `choice`.
///
/// Returns the decoded text and the encoding that was used.
pub fn read_text_file(
    path: &Path,
    choice: EncodingChoice,
) -> Result<(String, &'static Encoding)> {
    if !path.exists() {
        return Err(FamsplitError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let buffer = std::fs::read(path)?;
    let encoding = choice.resolve(&buffer);

    match choice {
        EncodingChoice::Auto => {
            log::info!("Detected encoding: {}", describe(&buffer, encoding))
        }
        EncodingChoice::Forced(_) => log::info!("Using encoding: {}", encoding.name()),
    }

    let text = decode_strict(&buffer, encoding)?;
    Ok((text, encoding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::GBK;

    #[test]
    fn test_detect_ascii_and_utf8() {
        assert_eq!(detect_encoding(b"FAM1\tS1\t0\t0\t1\t2\n"), UTF_8);
        assert_eq!(detect_encoding("FAM1 张三 0 0 1 2".as_bytes()), UTF_8);
        assert_eq!(detect_encoding(b""), UTF_8);
    }

    #[test]
    fn test_detect_bom() {
        let mut text = vec![0xEF, 0xBB, 0xBF];
        text.extend_from_slice(b"FAM1 S1 0 0 1 2");
        assert_eq!(detect_encoding(&text), UTF_8);

        let text: Vec<u8> = vec![0xFF, 0xFE, b'F', 0x00, b'1', 0x00];
        assert_eq!(detect_encoding(&text), UTF_16LE);

        let text: Vec<u8> = vec![0xFE, 0xFF, 0x00, b'F', 0x00, b'1'];
        assert_eq!(detect_encoding(&text), UTF_16BE);
    }

    #[test]
    fn test_detect_utf16_le_without_bom() {
        let text: Vec<u8> = "FAM1 S1 0 0 1 2"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(detect_encoding(&text), UTF_16LE);
        assert_eq!(decode_strict(&text, UTF_16LE).unwrap(), "FAM1 S1 0 0 1 2");
    }

    #[test]
    fn test_detect_legacy_latin() {
        let text = b"Jos\xe9 Fran\xe7ois Ren\xe9e Andr\xe9 caf\xe9 na\xefve r\xe9sum\xe9 \xe9l\xe8ve";
        let encoding = detect_encoding(text);
        assert_ne!(encoding, UTF_8);
        assert!(decode_strict(text, encoding).is_ok());
    }

    #[test]
    fn test_decode_strict_rejects_invalid_bytes() {
        let err = decode_strict(b"FAM1 S\xff1 0 0 1 2", UTF_8).unwrap_err();
        assert!(matches!(err, FamsplitError::Decode { ref encoding } if encoding == "UTF-8"));
    }

    #[test]
    fn test_decode_strict_strips_bom() {
        let text = b"\xEF\xBB\xBFFAM1 S1";
        assert_eq!(decode_strict(text, UTF_8).unwrap(), "FAM1 S1");
    }

    #[test]
    fn test_forced_gbk() {
        let (bytes, _, _) = GBK.encode("家系1 张三 0 0 1 2");
        let choice: EncodingChoice = "gbk".parse().unwrap();
        assert_eq!(choice, EncodingChoice::Forced(GBK));
        let encoding = choice.resolve(&bytes);
        assert_eq!(decode_strict(&bytes, encoding).unwrap(), "家系1 张三 0 0 1 2");
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!("auto".parse::<EncodingChoice>().unwrap(), EncodingChoice::Auto);
        assert_eq!("AUTO".parse::<EncodingChoice>().unwrap(), EncodingChoice::Auto);
        assert_eq!(
            "utf8".parse::<EncodingChoice>().unwrap(),
            EncodingChoice::Forced(UTF_8)
        );
        assert!(matches!(
            "klingon".parse::<EncodingChoice>(),
            Err(FamsplitError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(b"abc", UTF_8), "ascii");
        assert_eq!(describe("é".as_bytes(), UTF_8), "UTF-8");
        assert_eq!(describe(b"abc", GBK), "GBK");
    }
}
