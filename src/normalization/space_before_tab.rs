use super::{CONTENT_FILTERS, Normalization, NormalizationKind, replace_content};
use crate::eol;
use crate::error::Result;
use crate::file::File;
use crate::filter::FilterKind;
use crate::report::Reporter;

fn indentation_len(line: &[u8]) -> usize {
    line.iter()
        .position(|byte| !matches!(byte, b' ' | b'\t'))
        .unwrap_or(line.len())
}

/// Remove spaces followed by a tab inside the indentation of each line.
/// Returns the new content and the number of lines touched.
pub fn strip_space_before_tab(content: &[u8]) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(content.len());
    let mut lines = 0;
    for (line, eol) in eol::split_lines(content) {
        let (indent, rest) = line.split_at(indentation_len(line));
        match indent.iter().rposition(|byte| *byte == b'\t') {
            Some(last_tab) if indent[..last_tab].contains(&b' ') => {
                lines += 1;
                out.extend(indent[..last_tab].iter().filter(|byte| **byte == b'\t'));
                out.extend_from_slice(&indent[last_tab..]);
            }
            _ => out.extend_from_slice(indent),
        }
        out.extend_from_slice(rest);
        if let Some(eol) = eol {
            out.extend_from_slice(eol.as_bytes());
        }
    }
    (out, lines)
}

pub struct SpaceBeforeTabNormalization;

impl Normalization for SpaceBeforeTabNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::SpaceBeforeTab
    }

    fn filters(&self) -> &'static [FilterKind] {
        CONTENT_FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        let (content, lines) = strip_space_before_tab(file.pending_content()?);
        replace_content(file, reporter, self.kind(), content, || {
            format!("removed space before tab on {lines} line(s)")
        })?;
        Ok(())
    }
}
