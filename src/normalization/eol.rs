use std::rc::Rc;

use super::{CONTENT_FILTERS, Normalization, NormalizationKind, replace_content};
use crate::eol::{self, Eol};
use crate::error::Result;
use crate::file::File;
use crate::filter::FilterKind;
use crate::git::Git;
use crate::report::Reporter;

/// Replace every line break with `target`. With `keep_cr`, lone CR bytes are
/// data and stay as they are.
pub fn unify(content: &[u8], target: Eol, keep_cr: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    for (line, eol) in eol::split_lines(content) {
        out.extend_from_slice(line);
        match eol {
            Some(Eol::Cr) if keep_cr => out.push(b'\r'),
            Some(_) => out.extend_from_slice(target.as_bytes()),
            None => {}
        }
    }
    out
}

pub struct EolNormalization {
    target: Eol,
    keep_cr: bool,
    git: Rc<Git>,
}

impl EolNormalization {
    pub fn new(target: Eol, keep_cr: bool, git: Rc<Git>) -> Self {
        Self {
            target,
            keep_cr,
            git,
        }
    }

    /// Files with the `eol=crlf` attribute keep CRLF whatever the target.
    fn target_for(&self, file: &File) -> Eol {
        if self.target != Eol::Crlf && self.git.crlf_files(file.root()).contains(file.path()) {
            Eol::Crlf
        } else {
            self.target
        }
    }

    fn describe(&self, pending: &[u8], target: Eol) -> String {
        let counts = eol::count(pending);
        let converted: Vec<String> = Eol::ALL
            .into_iter()
            .filter(|eol| *eol != target && !(self.keep_cr && *eol == Eol::Cr))
            .filter(|eol| counts.get(*eol) > 0)
            .map(|eol| format!("{} {eol}", counts.get(eol)))
            .collect();
        format!("converted {} to {target}", converted.join(", "))
    }
}

impl Normalization for EolNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::Eol
    }

    fn filters(&self) -> &'static [FilterKind] {
        CONTENT_FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        let target = self.target_for(file);
        let pending = file.pending_content()?;
        let content = unify(pending, target, self.keep_cr);
        let message = self.describe(pending, target);
        replace_content(file, reporter, self.kind(), content, || message)?;
        Ok(())
    }
}
