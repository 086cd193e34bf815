//! Normalization units. Each unit declares the filters a file must pass and
//! rewrites the pending content, name or permissions of a [`File`].

mod encoding;
mod eol;
mod extension;
mod final_eol;
mod indentation;
mod leading_eol;
mod middle_eol;
mod name;
mod permissions;
mod space_before_tab;
mod trailing_whitespace;

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::file::File;
use crate::filter::{FilterKind, FilterManager};
use crate::io;
use crate::report::Reporter;

pub use encoding::EncodingNormalization;
pub use eol::{EolNormalization, unify};
pub use extension::ExtensionNormalization;
pub use final_eol::{FinalEolNormalization, trim_final_eol};
pub use indentation::{IndentationNormalization, expand_tabs};
pub use leading_eol::{LeadingEolNormalization, trim_leading_eol};
pub use middle_eol::{MiddleEolNormalization, collapse_blank_lines};
pub use name::{NameNormalization, slugify};
pub use permissions::{PermissionsNormalization, Presets};
pub use space_before_tab::{SpaceBeforeTabNormalization, strip_space_before_tab};
pub use trailing_whitespace::{TrailingWhitespaceNormalization, strip_trailing_whitespace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalizationKind {
    Encoding,
    TrailingWhitespace,
    FinalEol,
    Eol,
    LeadingEol,
    MiddleEol,
    SpaceBeforeTab,
    Indentation,
    Extension,
    Name,
    Permissions,
}

impl NormalizationKind {
    /// Option key of the normalization.
    pub fn name(self) -> &'static str {
        match self {
            NormalizationKind::Encoding => "encoding",
            NormalizationKind::TrailingWhitespace => "trailing-whitespace",
            NormalizationKind::FinalEol => "final-eol",
            NormalizationKind::Eol => "eol",
            NormalizationKind::LeadingEol => "leading-eol",
            NormalizationKind::MiddleEol => "middle-eol",
            NormalizationKind::SpaceBeforeTab => "space-before-tab",
            NormalizationKind::Indentation => "indentation",
            NormalizationKind::Extension => "extension",
            NormalizationKind::Name => "name",
            NormalizationKind::Permissions => "permissions",
        }
    }
}

impl fmt::Display for NormalizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Filters of units reading text in any encoding.
pub const TEXT_FILTERS: &[FilterKind] = &[
    FilterKind::NoLink,
    FilterKind::File,
    FilterKind::NoGit,
    FilterKind::NoVendor,
    FilterKind::NoNodeModules,
    FilterKind::NoPatch,
    FilterKind::Text,
];

/// Filters of units editing content line by line.
pub const CONTENT_FILTERS: &[FilterKind] = &[
    FilterKind::NoLink,
    FilterKind::File,
    FilterKind::NoGit,
    FilterKind::NoVendor,
    FilterKind::NoNodeModules,
    FilterKind::NoPatch,
    FilterKind::Text,
    FilterKind::AsciiCompatible,
];

pub trait Normalization {
    fn kind(&self) -> NormalizationKind;

    fn filters(&self) -> &'static [FilterKind];

    /// Rewrite the pending state of `file`, reporting at most one message.
    /// Called only for files that passed [`Normalization::filters`].
    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()>;

    /// Apply the unit when `file` passes its filters. Returns whether the
    /// unit ran.
    fn normalize(
        &self,
        file: &mut File,
        filters: &FilterManager,
        reporter: &mut Reporter,
    ) -> Result<bool> {
        if !filters.filter(self.kind(), self.filters(), file)? {
            return Ok(false);
        }
        self.apply(file, reporter)?;
        Ok(true)
    }
}

/// Replace the pending content and log `message` when `content` differs
/// from it.
fn replace_content(
    file: &mut File,
    reporter: &mut Reporter,
    kind: NormalizationKind,
    content: Vec<u8>,
    message: impl FnOnce() -> String,
) -> Result<bool> {
    if content.as_slice() == file.pending_content()? {
        return Ok(false);
    }
    let message = message();
    debug!(path = %file.display_path(), normalization = kind.name(), %message, "content changed");
    reporter.log(file, kind.name(), message);
    file.set_pending_content(content);
    Ok(true)
}

/// Pick a name for `stem` and `extension` in the directory of `file` that no
/// other entry uses, appending `_1`, `_2`, ... to the stem if needed.
pub fn resolve_collision(file: &File, stem: &str, extension: Option<&str>) -> String {
    let compose = |suffix: Option<usize>| {
        let mut name = stem.to_string();
        if let Some(suffix) = suffix {
            name.push_str(&format!("_{suffix}"));
        }
        if let Some(extension) = extension {
            name.push('.');
            name.push_str(extension);
        }
        name
    };

    let dir = file.path().parent().unwrap_or_else(|| Path::new("."));
    let candidate = compose(None);
    if !collides(file, dir, &candidate) {
        return candidate;
    }
    let mut suffix = 1;
    loop {
        let candidate = compose(Some(suffix));
        if !collides(file, dir, &candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

fn collides(file: &File, dir: &Path, name: &str) -> bool {
    if name == file.name() {
        return false;
    }
    let target = dir.join(name);
    io::exists(&target) && !io::same_entry(file.path(), &target)
}

/// Rename `file` to `name` when it differs from the pending name.
fn rename(
    file: &mut File,
    reporter: &mut Reporter,
    kind: NormalizationKind,
    name: String,
) -> bool {
    if name == file.pending_name() {
        return false;
    }
    reporter.log(file, kind.name(), format!("{} -> {}", file.pending_name(), name));
    debug!(path = %file.display_path(), normalization = kind.name(), %name, "rename planned");
    file.set_pending_name(name);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn own_name_is_not_a_collision() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("foo-bar.txt");
        fs::write(&path, "a").expect("write");
        let file = File::new(&path, temp.path());
        assert_eq!(resolve_collision(&file, "foo-bar", Some("txt")), "foo-bar.txt");
    }

    #[test]
    fn existing_names_get_numeric_suffix() {
        let temp = tempdir().expect("temp dir");
        for name in ["foo-bar.txt", "foo-bar_1.txt", "foo bar.txt"] {
            fs::write(temp.path().join(name), name).expect("write");
        }
        let file = File::new(temp.path().join("foo bar.txt"), temp.path());
        let name = resolve_collision(&file, "foo-bar", Some("txt"));
        assert_eq!(name, "foo-bar_2.txt");
        assert!(!temp.path().join(&name).exists());
    }

    #[test]
    fn suffix_goes_before_missing_extension() {
        let temp = tempdir().expect("temp dir");
        fs::create_dir(temp.path().join("my-dir")).expect("dir");
        fs::create_dir(temp.path().join("My Dir")).expect("dir");
        let file = File::new(temp.path().join("My Dir"), temp.path());
        assert_eq!(resolve_collision(&file, "my-dir", None), "my-dir_1");
    }
}
