use super::{CONTENT_FILTERS, Normalization, NormalizationKind};
use crate::eol;
use crate::error::Result;
use crate::file::File;
use crate::filter::FilterKind;
use crate::options::Indentation;
use crate::report::Reporter;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Usage {
    spaces: usize,
    tabs: usize,
}

impl Usage {
    fn of(content: &[u8]) -> Self {
        let mut usage = Usage::default();
        for (line, _) in eol::split_lines(content) {
            let indent = leading_blanks(line);
            if indent.contains(&b' ') {
                usage.spaces += 1;
            }
            if indent.contains(&b'\t') {
                usage.tabs += 1;
            }
        }
        usage
    }

    fn mixed(&self) -> bool {
        self.spaces > 0 && self.tabs > 0
    }
}

fn leading_blanks(line: &[u8]) -> &[u8] {
    let len = line
        .iter()
        .position(|byte| !matches!(byte, b' ' | b'\t'))
        .unwrap_or(line.len());
    &line[..len]
}

/// Replace each tab of the indentation with `size` spaces.
pub fn expand_tabs(content: &[u8], size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    for (line, eol) in eol::split_lines(content) {
        let indent = leading_blanks(line);
        for byte in indent {
            match byte {
                b'\t' => out.extend(std::iter::repeat_n(b' ', size)),
                other => out.push(*other),
            }
        }
        out.extend_from_slice(&line[indent.len()..]);
        if let Some(eol) = eol {
            out.extend_from_slice(eol.as_bytes());
        }
    }
    out
}

pub struct IndentationNormalization {
    target: Indentation,
    size: usize,
}

impl IndentationNormalization {
    pub fn new(target: Indentation, size: usize) -> Self {
        Self { target, size }
    }
}

impl Normalization for IndentationNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::Indentation
    }

    fn filters(&self) -> &'static [FilterKind] {
        CONTENT_FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        let usage = Usage::of(file.pending_content()?);
        let name = self.kind().name();
        match self.target {
            Indentation::Tab if usage.mixed() => {
                reporter.error(file, name, "mixed indentation, convert spaces to tabs manually");
            }
            Indentation::Tab if usage.spaces > 0 => {
                reporter.error(file, name, "space indentation, convert to tabs manually");
            }
            Indentation::Space if usage.tabs > 0 => {
                let content = expand_tabs(file.pending_content()?, self.size);
                let prefix = if usage.mixed() { "mixed indentation, " } else { "" };
                reporter.log(
                    file,
                    name,
                    format!(
                        "{prefix}converted tabs to {} spaces on {} line(s)",
                        self.size, usage.tabs
                    ),
                );
                file.set_pending_content(content);
            }
            Indentation::Tab | Indentation::Space => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;
    use std::fs;
    use tempfile::tempdir;

    fn run(content: &str, target: Indentation) -> (File, Reporter, tempfile::TempDir) {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("code.txt");
        fs::write(&path, content).expect("write");
        let mut file = File::new(&path, temp.path());
        let mut reporter = Reporter::new();
        IndentationNormalization::new(target, 4)
            .apply(&mut file, &mut reporter)
            .expect("apply");
        (file, reporter, temp)
    }

    #[test]
    fn tabs_expanded_for_space_target() {
        let (file, reporter, _temp) = run("fn a() {\n\tif x {\n\t\ty();\t// tab\n\t}\n}\n", Indentation::Space);
        assert_eq!(
            file.pending_content().expect("pending"),
            b"fn a() {\n    if x {\n        y();\t// tab\n    }\n}\n"
        );
        let entries = reporter.entries(file.path());
        assert_eq!(entries[0].severity, Severity::Fixable);
        assert_eq!(entries[0].message, "converted tabs to 4 spaces on 3 line(s)");
    }

    #[test]
    fn mixed_file_named_in_message() {
        let (file, reporter, _temp) = run("a\n  b\n\tc\n", Indentation::Space);
        assert_eq!(file.pending_content().expect("pending"), b"a\n  b\n    c\n");
        assert!(reporter.entries(file.path())[0].message.starts_with("mixed indentation"));
    }

    #[test]
    fn spaces_are_manual_for_tab_target() {
        let (file, reporter, _temp) = run("a\n    b\n", Indentation::Tab);
        assert_eq!(file.pending_content().expect("pending"), b"a\n    b\n");
        assert_eq!(reporter.entries(file.path())[0].severity, Severity::Manual);
    }

    #[test]
    fn consistent_files_are_clean() {
        let (_, reporter, _temp) = run("a\n\tb\n", Indentation::Tab);
        assert!(reporter.is_empty());
        let (_, reporter, _temp) = run("a\n  b\n", Indentation::Space);
        assert!(reporter.is_empty());
    }
}
