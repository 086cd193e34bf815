use std::cmp::Ordering;

use super::{CONTENT_FILTERS, Normalization, NormalizationKind, replace_content};
use crate::eol::{self, Eol};
use crate::error::Result;
use crate::file::File;
use crate::filter::FilterKind;
use crate::report::Reporter;

/// Keep at most `max` of the trailing line breaks of `content`, in their
/// original form. Non-empty content always ends with a break: when none is
/// left, the prevailing break of the text is appended, or `default` when the
/// text has none. With `max == 1`, content made only of breaks becomes empty.
pub fn trim_final_eol(content: &[u8], max: usize, default: Eol) -> Vec<u8> {
    let breaks = eol::trailing_breaks(content);
    let trailing: usize = breaks.iter().map(|eol| eol.as_bytes().len()).sum();
    let body = &content[..content.len() - trailing];

    let mut out = body.to_vec();
    if body.is_empty() && max <= 1 {
        return out;
    }
    for eol in breaks.iter().take(max) {
        out.extend_from_slice(eol.as_bytes());
    }
    if !body.is_empty() && out.len() == body.len() {
        let eol = eol::prevailing(body).unwrap_or(default);
        out.extend_from_slice(eol.as_bytes());
    }
    out
}

pub struct FinalEolNormalization {
    max: usize,
    default: Eol,
}

impl FinalEolNormalization {
    pub fn new(max: usize, default: Eol) -> Self {
        Self { max, default }
    }
}

impl Normalization for FinalEolNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::FinalEol
    }

    fn filters(&self) -> &'static [FilterKind] {
        CONTENT_FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        let pending = file.pending_content()?;
        let before = eol::trailing_breaks(pending).len();
        let content = trim_final_eol(pending, self.max, self.default);
        let after = eol::trailing_breaks(&content).len();
        replace_content(file, reporter, self.kind(), content, || {
            match after.cmp(&before) {
                Ordering::Greater => "added missing final EOL".to_string(),
                Ordering::Equal => "replaced final EOL".to_string(),
                Ordering::Less => format!("removed {} final EOL(s)", before - after),
            }
        })?;
        Ok(())
    }
}
