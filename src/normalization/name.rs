use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use super::{Normalization, NormalizationKind, rename, resolve_collision};
use crate::error::Result;
use crate::file::File;
use crate::filter::FilterKind;
use crate::report::Reporter;

const FILTERS: &[FilterKind] = &[
    FilterKind::NoGit,
    FilterKind::NoVendor,
    FilterKind::NoNodeModules,
];

/// Letters without a canonical decomposition to ASCII.
const LITERALS: [(char, &str); 20] = [
    ('đ', "dz"),
    ('Đ', "DZ"),
    ('ß', "ss"),
    ('ẞ', "SS"),
    ('æ', "ae"),
    ('Æ', "AE"),
    ('œ', "oe"),
    ('Œ', "OE"),
    ('ø', "o"),
    ('Ø', "O"),
    ('ł', "l"),
    ('Ł', "L"),
    ('þ', "th"),
    ('Þ', "TH"),
    ('ð', "d"),
    ('Ð', "D"),
    ('ı', "i"),
    ('ħ', "h"),
    ('Ħ', "H"),
    ('ŧ', "t"),
];

static AMPERSAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*&\s*").expect("valid regex literal"));
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s-]+").expect("valid regex literal"));

/// ASCII-friendly slug of a file stem.
pub fn slugify(stem: &str) -> String {
    let mut literal = String::with_capacity(stem.len());
    for ch in stem.chars() {
        match LITERALS.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => literal.push_str(to),
            None => literal.push(ch),
        }
    }
    let stripped: String = literal.nfd().filter(|ch| !is_combining_mark(*ch)).nfc().collect();
    let joined = AMPERSAND.replace_all(&stripped, "&");
    let dashed = SEPARATORS.replace_all(&joined, "-");
    dashed.trim_matches('-').to_string()
}

pub struct NameNormalization;

impl NameNormalization {
    /// Stem and extension to slug; directories are slugged whole.
    fn split(file: &File) -> Result<(String, Option<String>)> {
        if file.is_dir()? {
            return Ok((file.pending_name().to_string(), None));
        }
        Ok((
            file.stem().to_string(),
            file.extension().map(str::to_string),
        ))
    }
}

impl Normalization for NameNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::Name
    }

    fn filters(&self) -> &'static [FilterKind] {
        FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        if !file.has_utf8_name() {
            return Ok(());
        }
        let (stem, extension) = Self::split(file)?;
        let slug = slugify(&stem);
        if slug.is_empty() || slug == stem {
            return Ok(());
        }
        let name = resolve_collision(file, &slug, extension.as_deref());
        rename(file, reporter, self.kind(), name);
        Ok(())
    }
}
