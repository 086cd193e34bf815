use encoding_rs::{Encoding, ISO_8859_2, WINDOWS_1252};

use super::{Normalization, NormalizationKind, TEXT_FILTERS, replace_content};
use crate::error::Result;
use crate::file::File;
use crate::filter::FilterKind;
use crate::report::Reporter;
use crate::sniff::{self, EncodingDecision};

/// Legacy encodings converted to UTF-8 without asking.
fn is_convertible(encoding: &'static Encoding) -> bool {
    encoding == ISO_8859_2 || encoding == WINDOWS_1252
}

enum Outcome {
    Clean,
    Converted { content: Vec<u8>, from: &'static str },
    Manual(String),
}

fn decide(content: &[u8]) -> Outcome {
    if content.is_empty() {
        return Outcome::Clean;
    }
    match sniff::detect_encoding(content) {
        None => Outcome::Manual("unknown encoding".to_string()),
        Some(decision) if decision.is_utf8() => Outcome::Clean,
        Some(decision) if is_convertible(decision.encoding) => convert(content, &decision),
        Some(decision) => Outcome::Manual(format!(
            "{} encoding must be converted to UTF-8 manually",
            decision.label()
        )),
    }
}

fn convert(content: &[u8], decision: &EncodingDecision) -> Outcome {
    match decision
        .encoding
        .decode_without_bom_handling_and_without_replacement(content)
    {
        Some(text) => Outcome::Converted {
            content: text.into_owned().into_bytes(),
            from: decision.label(),
        },
        None => Outcome::Manual(format!(
            "{} content has invalid sequences, convert it manually",
            decision.label()
        )),
    }
}

pub struct EncodingNormalization;

impl Normalization for EncodingNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::Encoding
    }

    fn filters(&self) -> &'static [FilterKind] {
        TEXT_FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        match decide(file.pending_content()?) {
            Outcome::Clean => {}
            Outcome::Converted { content, from } => {
                replace_content(file, reporter, self.kind(), content, || {
                    format!("converted from {from} to UTF-8")
                })?;
            }
            Outcome::Manual(message) => reporter.error(file, self.kind().name(), message),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;
    use crate::sniff::EncodingSource;
    use std::fs;
    use tempfile::tempdir;

    fn apply(content: &[u8]) -> (File, Reporter, tempfile::TempDir) {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("text.txt");
        fs::write(&path, content).expect("write");
        let mut file = File::new(&path, temp.path());
        let mut reporter = Reporter::new();
        EncodingNormalization
            .apply(&mut file, &mut reporter)
            .expect("apply");
        (file, reporter, temp)
    }

    #[test]
    fn utf8_and_ascii_untouched() {
        let (_, reporter, _temp) = apply("žluťoučký kůň\n".as_bytes());
        assert!(reporter.is_empty());
        let (_, reporter, _temp) = apply(b"plain ascii\n");
        assert!(reporter.is_empty());
    }

    #[test]
    fn allowed_encoding_converted() {
        let decision = EncodingDecision {
            encoding: WINDOWS_1252,
            source: EncodingSource::Detector,
            ascii: false,
        };
        match convert(b"caf\xe9 cr\xe8me\n", &decision) {
            Outcome::Converted { content, from } => {
                assert_eq!(content, "café crème\n".as_bytes());
                assert_eq!(from, "windows-1252");
            }
            _ => panic!("expected conversion"),
        }
    }

    #[test]
    fn latin1_file_converted_end_to_end() {
        let text = "Le cœur déçu mais l'âme plutôt naïve, Louÿs rêva de crapaüter en \
                    canoë au delà des îles, près du mälströn où brûlent les novæ. \
                    Voilà une phrase française très ordinaire, écrite à la hâte.\n";
        let (bytes, _, _) = WINDOWS_1252.encode(text);
        let (file, reporter, _temp) = apply(&bytes);
        assert_eq!(file.pending_content().expect("pending"), text.as_bytes());
        let entries = reporter.entries(file.path());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, Severity::Fixable);
    }

    #[test]
    fn other_encodings_are_manual() {
        let (file, reporter, _temp) = apply(&[0xFF, 0xFE, b'a', 0x00, b'\n', 0x00]);
        assert_eq!(file.pending_content().expect("pending"), &[0xFF, 0xFE, b'a', 0x00, b'\n', 0x00]);
        let entries = reporter.entries(file.path());
        assert_eq!(entries[0].severity, Severity::Manual);
        assert!(entries[0].message.starts_with("UTF-16LE"));
    }

    #[test]
    fn undetectable_encoding_is_unknown() {
        let (file, reporter, _temp) = apply(b"text\x00with nul \xff\n");
        assert_eq!(reporter.entries(file.path())[0].message, "unknown encoding");
    }
}
