use super::{CONTENT_FILTERS, Normalization, NormalizationKind, replace_content};
use crate::eol;
use crate::error::Result;
use crate::file::File;
use crate::filter::FilterKind;
use crate::report::Reporter;

/// Drop blank lines beyond `max` in every run between the first and last
/// non-blank byte, so at most `max + 1` breaks follow each other there.
/// Leading and trailing blank runs are left to the other EOL units. Returns
/// the new content and the number of dropped lines.
pub fn collapse_blank_lines(content: &[u8], max: usize) -> (Vec<u8>, usize) {
    let Some(start) = content.iter().position(|b| !b.is_ascii_whitespace()) else {
        return (content.to_vec(), 0);
    };
    let end = content
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(content.len(), |idx| idx + 1);

    let mut out = Vec::with_capacity(content.len());
    out.extend_from_slice(&content[..start]);
    let mut blank = 0;
    let mut dropped = 0;
    for (line, eol) in eol::split_lines(&content[start..end]) {
        if line.iter().all(u8::is_ascii_whitespace) {
            blank += 1;
            if blank > max {
                dropped += 1;
                continue;
            }
        } else {
            blank = 0;
        }
        out.extend_from_slice(line);
        if let Some(eol) = eol {
            out.extend_from_slice(eol.as_bytes());
        }
    }
    out.extend_from_slice(&content[end..]);
    (out, dropped)
}

pub struct MiddleEolNormalization {
    max: usize,
}

impl MiddleEolNormalization {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl Normalization for MiddleEolNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::MiddleEol
    }

    fn filters(&self) -> &'static [FilterKind] {
        CONTENT_FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        let (content, dropped) = collapse_blank_lines(file.pending_content()?, self.max);
        replace_content(file, reporter, self.kind(), content, || {
            format!("removed {dropped} blank line(s)")
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_run_collapsed_to_max() {
        let (out, dropped) = collapse_blank_lines(b"\nlorem \n\n\n\nipsum", 1);
        assert_eq!(out, b"\nlorem \n\nipsum");
        assert_eq!(dropped, 2);
    }

    #[test]
    fn whitespace_only_lines_count_as_blank() {
        let (out, _) = collapse_blank_lines(b"a\r\n \r\n\t\r\n\r\nb\r\n", 1);
        assert_eq!(out, b"a\r\n \r\nb\r\n");
    }

    #[test]
    fn zero_max_removes_every_blank_line() {
        let (out, dropped) = collapse_blank_lines(b"a\n\nb\n\n\nc", 0);
        assert_eq!(out, b"a\nb\nc");
        assert_eq!(dropped, 3);
    }

    #[test]
    fn edges_are_preserved() {
        let input = b"\n\n\n  a\n\n\n\nb  \n\n\n";
        let (out, _) = collapse_blank_lines(input, 2);
        assert_eq!(out, b"\n\n\n  a\n\n\nb  \n\n\n");
    }

    #[test]
    fn blank_content_untouched() {
        assert_eq!(collapse_blank_lines(b"\n\n \n", 0).0, b"\n\n \n");
        assert_eq!(collapse_blank_lines(b"", 1).0, b"");
    }
}
