use std::fmt;

use chardetng::EncodingDetector;
use encoding_rs::{
    BIG5, EUC_JP, EUC_KR, Encoding, GBK, ISO_8859_2, ISO_8859_5, ISO_8859_7, KOI8_U, SHIFT_JIS,
    UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252, WINDOWS_1253,
    WINDOWS_1254,
};

const SNIFF_BYTES: usize = 8192;

pub const MIME_EMPTY: &str = "inode/x-empty";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_SHELL: &str = "text/x-shellscript";
pub const MIME_BINARY: &str = "application/octet-stream";
pub const MIME_ELF: &str = "application/x-executable";
pub const MIME_MACH_O: &str = "application/x-mach-binary";
pub const MIME_PE: &str = "application/x-dosexec";

const MAGIC: &[(&[u8], &str)] = &[
    (b"\x7fELF", MIME_ELF),
    (b"\xfe\xed\xfa\xce", MIME_MACH_O),
    (b"\xfe\xed\xfa\xcf", MIME_MACH_O),
    (b"\xce\xfa\xed\xfe", MIME_MACH_O),
    (b"\xcf\xfa\xed\xfe", MIME_MACH_O),
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"BZh", "application/x-bzip2"),
    (b"\xfd7zXZ\x00", "application/x-xz"),
    (b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
];

pub fn mime_type(bytes: &[u8]) -> &'static str {
    if bytes.is_empty() {
        return MIME_EMPTY;
    }
    if is_pe(bytes) {
        return MIME_PE;
    }
    if let Some((_, mime)) = MAGIC.iter().find(|(magic, _)| bytes.starts_with(magic)) {
        return mime;
    }
    if detect_bom(bytes).is_some() {
        return MIME_TEXT;
    }

    let head = &bytes[..bytes.len().min(SNIFF_BYTES)];
    if !looks_textual(head) {
        return MIME_BINARY;
    }
    if head.starts_with(b"#!") {
        return MIME_SHELL;
    }
    MIME_TEXT
}

/// DOS stub followed by the `PE\0\0` signature at the offset stored in
/// `e_lfanew`.
fn is_pe(bytes: &[u8]) -> bool {
    if !bytes.starts_with(b"MZ") {
        return false;
    }
    let Some(&[a, b, c, d]) = bytes.get(0x3C..0x40) else {
        return false;
    };
    let Ok(offset) = usize::try_from(u32::from_le_bytes([a, b, c, d])) else {
        return false;
    };
    offset
        .checked_add(4)
        .and_then(|end| bytes.get(offset..end))
        .is_some_and(|signature| signature == b"PE\0\0")
}

/// Whether byte-wise line edits keep the text valid. A BOM other than
/// UTF-8 means multi-byte code units.
pub fn is_ascii_compatible(bytes: &[u8]) -> bool {
    detect_bom(bytes).is_none_or(|encoding| encoding == UTF_8)
}

pub fn is_text(mime: &str) -> bool {
    mime.starts_with("text/")
}

pub fn is_native_executable(mime: &str) -> bool {
    matches!(mime, MIME_ELF | MIME_MACH_O | MIME_PE)
}

fn looks_textual(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    let suspicious = head
        .iter()
        .filter(|&&b| b.is_ascii_control() && !matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b | 0x08))
        .count();
    suspicious * 100 <= head.len()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    Bom,
    Sniff,
    Detector,
}

impl fmt::Display for EncodingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EncodingSource::Bom => "bom",
            EncodingSource::Sniff => "sniff",
            EncodingSource::Detector => "detector",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct EncodingDecision {
    pub encoding: &'static Encoding,
    pub source: EncodingSource,
    pub ascii: bool,
}

impl EncodingDecision {
    pub fn is_utf8(&self) -> bool {
        self.encoding == UTF_8
    }

    pub fn label(&self) -> &'static str {
        if self.ascii { "us-ascii" } else { self.encoding.name() }
    }
}

/// Sniff the encoding of `bytes`, falling back to statistical detection.
/// `None` means the encoding could not be determined.
pub fn detect_encoding(bytes: &[u8]) -> Option<EncodingDecision> {
    if let Some(encoding) = detect_bom(bytes) {
        return Some(EncodingDecision {
            encoding,
            source: EncodingSource::Bom,
            ascii: false,
        });
    }
    if bytes.contains(&0) {
        return None;
    }
    if std::str::from_utf8(bytes).is_ok() {
        return Some(EncodingDecision {
            encoding: UTF_8,
            source: EncodingSource::Sniff,
            ascii: bytes.is_ascii(),
        });
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, false);
    is_safe_candidate(encoding).then_some(EncodingDecision {
        encoding,
        source: EncodingSource::Detector,
        ascii: false,
    })
}

/// Detector guesses accepted as a real answer; anything else is unknown.
fn is_safe_candidate(encoding: &'static Encoding) -> bool {
    [
        WINDOWS_1250,
        WINDOWS_1251,
        WINDOWS_1252,
        WINDOWS_1253,
        WINDOWS_1254,
        ISO_8859_2,
        ISO_8859_5,
        ISO_8859_7,
        KOI8_U,
        SHIFT_JIS,
        EUC_JP,
        EUC_KR,
        GBK,
        BIG5,
    ]
    .contains(&encoding)
}

fn detect_bom(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return Some(UTF_8);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return Some(UTF_16LE);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return Some(UTF_16BE);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_has_empty_mime() {
        assert_eq!(mime_type(b""), MIME_EMPTY);
    }

    #[test]
    fn plain_and_shell_text() {
        assert_eq!(mime_type(b"hello\nworld\n"), MIME_TEXT);
        assert_eq!(mime_type(b"#!/bin/sh\necho hi\n"), MIME_SHELL);
        assert!(is_text(mime_type("čšž\n".as_bytes())));
        assert!(is_text(mime_type(b"caf\xe9\n")));
    }

    #[test]
    fn binary_content_is_not_text() {
        assert_eq!(mime_type(b"\x7fELF\x02\x01\x01\x00"), MIME_ELF);
        assert_eq!(mime_type(b"abc\x00def"), MIME_BINARY);
        assert!(!is_text(mime_type(b"\x89PNG\r\n\x1a\n....")));
    }

    #[test]
    fn pe_needs_its_signature() {
        assert_eq!(mime_type(b"MZ-Tools notes  \nline two\n"), MIME_TEXT);
        assert_eq!(mime_type(b"MZ"), MIME_TEXT);

        let mut image = vec![0u8; 0x80];
        image[..2].copy_from_slice(b"MZ");
        image[0x3C..0x40].copy_from_slice(&0x40u32.to_le_bytes());
        image[0x40..0x44].copy_from_slice(b"PE\0\0");
        assert_eq!(mime_type(&image), MIME_PE);

        image[0x3C..0x40].copy_from_slice(&0x7Eu32.to_le_bytes());
        assert_ne!(mime_type(&image), MIME_PE);
    }

    #[test]
    fn wide_boms_are_not_ascii_compatible() {
        assert!(is_ascii_compatible(b"plain\n"));
        assert!(is_ascii_compatible(b"\xEF\xBB\xBFutf-8\n"));
        assert!(!is_ascii_compatible(&[0xFF, 0xFE, 0x61, 0x00, 0x0A, 0x00]));
        assert!(!is_ascii_compatible(&[0xFE, 0xFF, 0x00, 0x61]));
    }

    #[test]
    fn utf8_and_ascii_are_sniffed() {
        let ascii = detect_encoding(b"hello world").expect("ascii");
        assert!(ascii.is_utf8());
        assert_eq!(ascii.label(), "us-ascii");
        let utf8 = detect_encoding("žluťoučký kůň".as_bytes()).expect("utf-8");
        assert_eq!(utf8.source, EncodingSource::Sniff);
        assert_eq!(utf8.label(), "UTF-8");
    }

    #[test]
    fn bom_detection_takes_precedence() {
        let decision = detect_encoding(&[0xFF, 0xFE, 0x61, 0x00]).expect("bom");
        assert_eq!(decision.source, EncodingSource::Bom);
        assert_eq!(decision.encoding.name(), "UTF-16LE");
    }

    #[test]
    fn legacy_bytes_use_detector() {
        let (bytes, _, _) =
            WINDOWS_1252.encode("Le café était très déjà prêt, où est la fenêtre?\n");
        let decision = detect_encoding(&bytes).expect("detected");
        assert_eq!(decision.source, EncodingSource::Detector);
        assert!(!decision.is_utf8());
    }

    #[test]
    fn binary_has_no_encoding() {
        assert!(detect_encoding(b"\x00\x01\x02").is_none());
    }
}
