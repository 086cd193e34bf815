use super::{Normalization, NormalizationKind, rename, resolve_collision};
use crate::error::Result;
use crate::file::File;
use crate::filter::FilterKind;
use crate::report::Reporter;

const FILTERS: &[FilterKind] = &[
    FilterKind::File,
    FilterKind::NoGit,
    FilterKind::NoVendor,
    FilterKind::NoNodeModules,
];

/// Names whose case and extension belong to the tool that writes them.
const SPECIAL_NAMES: [&str; 4] = [".DS_Store", "Thumbs.db", "desktop.ini", ".directory"];

const ALIASES: [(&str, &str); 4] = [
    ("jpeg", "jpg"),
    ("jpe", "jpg"),
    ("tiff", "tif"),
    ("mpeg", "mpg"),
];

/// Canonical form of `extension`.
pub fn canonical_extension(extension: &str) -> String {
    let lower = extension.trim_end_matches(['-', ' ']).to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(lower)
}

pub struct ExtensionNormalization;

impl Normalization for ExtensionNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::Extension
    }

    fn filters(&self) -> &'static [FilterKind] {
        FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        if !file.has_utf8_name() || SPECIAL_NAMES.contains(&file.pending_name()) {
            return Ok(());
        }
        let Some(extension) = file.extension() else {
            return Ok(());
        };
        let canonical = canonical_extension(extension);
        if canonical.is_empty() || canonical == extension {
            return Ok(());
        }
        let name = resolve_collision(file, file.stem(), Some(&canonical));
        rename(file, reporter, self.kind(), name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn apply(temp: &tempfile::TempDir, name: &str) -> (File, Reporter) {
        let path = temp.path().join(name);
        fs::write(&path, "x").expect("write");
        let mut file = File::new(&path, temp.path());
        let mut reporter = Reporter::new();
        ExtensionNormalization
            .apply(&mut file, &mut reporter)
            .expect("apply");
        (file, reporter)
    }

    #[test]
    fn canonical_forms() {
        assert_eq!(canonical_extension("JPEG"), "jpg");
        assert_eq!(canonical_extension("Jpe"), "jpg");
        assert_eq!(canonical_extension("TIFF"), "tif");
        assert_eq!(canonical_extension("txt- "), "txt");
        assert_eq!(canonical_extension("TAR.GZ"), "tar.gz");
    }

    #[test]
    fn extension_lowercased() {
        let temp = tempdir().expect("temp dir");
        let (file, reporter) = apply(&temp, "Photo.JPEG");
        assert_eq!(file.pending_name(), "Photo.jpg");
        assert_eq!(reporter.entries(file.path())[0].message, "Photo.JPEG -> Photo.jpg");
    }

    #[test]
    fn special_and_extensionless_names_skipped() {
        let temp = tempdir().expect("temp dir");
        for name in ["Thumbs.db", "desktop.ini", "README", ".bashrc"] {
            let (file, reporter) = apply(&temp, name);
            assert_eq!(file.pending_name(), name);
            assert!(reporter.is_empty());
        }
    }

    #[test]
    fn collision_gets_suffix() {
        let temp = tempdir().expect("temp dir");
        fs::write(temp.path().join("scan.pdf"), "taken").expect("write");
        let (file, _) = apply(&temp, "scan.PDF");
        assert_eq!(file.pending_name(), "scan_1.pdf");
    }
}
