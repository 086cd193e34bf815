use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Eol {
    Lf,
    Crlf,
    Cr,
}

impl Eol {
    /// Tie-break order used by [`prevailing`].
    pub const ALL: [Eol; 3] = [Eol::Lf, Eol::Crlf, Eol::Cr];

    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Eol::Lf => b"\n",
            Eol::Crlf => b"\r\n",
            Eol::Cr => b"\r",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lf" => Some(Eol::Lf),
            "crlf" => Some(Eol::Crlf),
            "cr" => Some(Eol::Cr),
            _ => None,
        }
    }
}

impl fmt::Display for Eol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Eol::Lf => "LF",
            Eol::Crlf => "CRLF",
            Eol::Cr => "CR",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EolCounts {
    pub lf: usize,
    pub crlf: usize,
    pub cr: usize,
}

impl EolCounts {
    pub fn get(&self, eol: Eol) -> usize {
        match eol {
            Eol::Lf => self.lf,
            Eol::Crlf => self.crlf,
            Eol::Cr => self.cr,
        }
    }

    pub fn total(&self) -> usize {
        self.lf + self.crlf + self.cr
    }

    fn bump(&mut self, eol: Eol) {
        match eol {
            Eol::Lf => self.lf += 1,
            Eol::Crlf => self.crlf += 1,
            Eol::Cr => self.cr += 1,
        }
    }
}

/// Split `content` into `(line, break)` pairs. The break of the last pair is
/// `None` when the content does not end with a line break.
pub fn split_lines(content: &[u8]) -> Vec<(&[u8], Option<Eol>)> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut idx = 0;
    while idx < content.len() {
        match content[idx] {
            b'\n' => {
                lines.push((&content[start..idx], Some(Eol::Lf)));
                idx += 1;
                start = idx;
            }
            b'\r' if content.get(idx + 1) == Some(&b'\n') => {
                lines.push((&content[start..idx], Some(Eol::Crlf)));
                idx += 2;
                start = idx;
            }
            b'\r' => {
                lines.push((&content[start..idx], Some(Eol::Cr)));
                idx += 1;
                start = idx;
            }
            _ => idx += 1,
        }
    }
    if start < content.len() {
        lines.push((&content[start..], None));
    }
    lines
}

pub fn count(content: &[u8]) -> EolCounts {
    let mut counts = EolCounts::default();
    for (_, eol) in split_lines(content) {
        if let Some(eol) = eol {
            counts.bump(eol);
        }
    }
    counts
}

/// Most frequent break kind; `None` when the content has no breaks.
pub fn prevailing(content: &[u8]) -> Option<Eol> {
    let counts = count(content);
    let mut best: Option<(Eol, usize)> = None;
    for eol in Eol::ALL {
        let n = counts.get(eol);
        if n == 0 {
            continue;
        }
        match best {
            Some((_, current)) if current >= n => {}
            _ => best = Some((eol, n)),
        }
    }
    best.map(|(eol, _)| eol)
}

/// Break sequences at the end of `content`, nearest to the text first.
pub fn trailing_breaks(content: &[u8]) -> Vec<Eol> {
    let mut breaks = Vec::new();
    let mut end = content.len();
    loop {
        let rest = &content[..end];
        let eol = if rest.ends_with(b"\r\n") {
            Eol::Crlf
        } else if rest.ends_with(b"\n") {
            Eol::Lf
        } else if rest.ends_with(b"\r") {
            Eol::Cr
        } else {
            break;
        };
        end -= eol.as_bytes().len();
        breaks.push(eol);
    }
    breaks.reverse();
    breaks
}
