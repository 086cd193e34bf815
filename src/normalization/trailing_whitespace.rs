use std::sync::LazyLock;

use regex::bytes::Regex;

use super::{CONTENT_FILTERS, Normalization, NormalizationKind, replace_content};
use crate::error::Result;
use crate::file::File;
use crate::filter::FilterKind;
use crate::report::Reporter;

/// Blank runs before a line break or the end of content, including the
/// Unicode space separators editors tend to leave behind.
static TRAILING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\t \x{00A0}\x{1680}\x{2000}-\x{200A}\x{202F}\x{205F}\x{3000}]+(\r\n|\n|\r|\z)")
        .expect("valid regex literal")
});

/// Strip trailing blanks from every line. Returns the new content and the
/// number of lines touched.
pub fn strip_trailing_whitespace(content: &[u8]) -> (Vec<u8>, usize) {
    let lines = TRAILING.find_iter(content).count();
    if lines == 0 {
        return (content.to_vec(), 0);
    }
    (TRAILING.replace_all(content, &b"${1}"[..]).into_owned(), lines)
}

pub struct TrailingWhitespaceNormalization;

impl Normalization for TrailingWhitespaceNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::TrailingWhitespace
    }

    fn filters(&self) -> &'static [FilterKind] {
        CONTENT_FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        let (content, lines) = strip_trailing_whitespace(file.pending_content()?);
        replace_content(file, reporter, self.kind(), content, || {
            format!("removed trailing whitespace from {lines} line(s)")
        })?;
        Ok(())
    }
}
