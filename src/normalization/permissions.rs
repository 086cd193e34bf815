use std::path::Path;
use std::rc::Rc;

use tracing::trace;

use super::{Normalization, NormalizationKind};
use crate::error::Result;
use crate::file::{EntryKind, File};
use crate::filter::FilterKind;
use crate::git::Git;
use crate::report::Reporter;
use crate::sniff;

const FILTERS: &[FilterKind] = &[
    FilterKind::NoLink,
    FilterKind::NoVendor,
    FilterKind::NoNodeModules,
];

const SHEBANGS: [&[u8]; 3] = [b"#!/bin/sh", b"#!/bin/bash", b"#!/usr/bin/env "];
const GITWEB_CONFIG: &str = "gitweb_config.perl";

/// Permission bits for each class of entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presets {
    pub file: u32,
    pub executable: u32,
    pub directory: u32,
    pub protected: u32,
}

impl Presets {
    pub fn for_umask(umask: u32) -> Self {
        if umask & 0o777 == 0o002 {
            Self {
                file: 0o664,
                executable: 0o775,
                directory: 0o775,
                protected: 0o444,
            }
        } else {
            Self {
                file: 0o644,
                executable: 0o755,
                directory: 0o755,
                protected: 0o444,
            }
        }
    }
}

pub struct PermissionsNormalization {
    presets: Presets,
    git: Rc<Git>,
}

impl PermissionsNormalization {
    pub fn new(presets: Presets, git: Rc<Git>) -> Self {
        Self { presets, git }
    }

    /// Whether `path` lies below the `section` directory (`objects`,
    /// `hooks`) of a git directory.
    fn in_git_section(&self, path: &Path, section: &str) -> bool {
        let Some(git_dir) = self.git.git_dir_of(path) else {
            return false;
        };
        let Ok(relative) = path.strip_prefix(&git_dir) else {
            return false;
        };
        let mut components = relative.components();
        components
            .next()
            .is_some_and(|first| first.as_os_str() == section)
            && components.next().is_some()
    }

    fn target(&self, file: &File) -> Result<u32> {
        if file.is_dir()? {
            return Ok(self.presets.directory);
        }
        let path = file.path();
        if self.in_git_section(path, "objects") {
            return Ok(self.presets.protected);
        }
        if self.in_git_section(path, "hooks") {
            return Ok(self.presets.executable);
        }
        if file.name() == GITWEB_CONFIG {
            return Ok(self.presets.file);
        }
        if is_self_executing(file.pending_content()?) {
            return Ok(self.presets.executable);
        }
        Ok(self.presets.file)
    }
}

/// Native executables and scripts starting with a known shebang.
pub fn is_self_executing(content: &[u8]) -> bool {
    let mime = sniff::mime_type(content);
    if sniff::is_native_executable(mime) {
        return true;
    }
    sniff::is_text(mime) && SHEBANGS.iter().any(|shebang| content.starts_with(shebang))
}

impl Normalization for PermissionsNormalization {
    fn kind(&self) -> NormalizationKind {
        NormalizationKind::Permissions
    }

    fn filters(&self) -> &'static [FilterKind] {
        FILTERS
    }

    fn apply(&self, file: &mut File, reporter: &mut Reporter) -> Result<()> {
        if !matches!(file.kind()?, EntryKind::File | EntryKind::Dir) {
            return Ok(());
        }
        let current = file.pending_permissions()?;
        let target = self.target(file)?;
        trace!(
            path = %file.display_path(),
            current = %format!("{current:o}"),
            target = %format!("{target:o}"),
            "permissions"
        );
        if current == target {
            return Ok(());
        }
        reporter.log(
            file,
            self.kind().name(),
            format!("{current:04o} -> {target:04o}"),
        );
        file.set_pending_permissions(target);
        Ok(())
    }
}
