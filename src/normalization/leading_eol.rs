use super::{CONTENT_FILTERS, Normalization, NormalizationKind, replace_content};
use crate::eol;
use crate::error::Result;
use crate::file::File;
use crate::filter::FilterKind;
use crate::report::Reporter;

/// Drop every CR and LF before the first other byte.
pub fn trim_leading_eol(content: &[u8]) -> &[u8] {
    let start = content
        .iter()
        .position(|byte| !matches!(byte, b'\r' | b'\n'))
        .unwrap_or(content.len());
    &content[start..]
}

pub struct LeadingEolNormalization;

impl Normalization for LeadingEolNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::LeadingEol
    }

    fn filters(&self) -> &'static [FilterKind] {
        CONTENT_FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        let pending = file.pending_content()?;
        let trimmed = trim_leading_eol(pending);
        let removed = eol::count(&pending[..pending.len() - trimmed.len()]).total();
        let content = trimmed.to_vec();
        replace_content(file, reporter, self.kind(), content, || {
            format!("removed {removed} leading EOL(s)")
        })?;
        Ok(())
    }
}
