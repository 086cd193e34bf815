use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::file::File;
use crate::io;

type Prune = Box<dyn Fn(&Path) -> bool>;

/// Yields a [`File`] for every entry below a root, children before their
/// directory. Links are not followed.
pub struct Walker {
    root: PathBuf,
    exclude: Option<GlobSet>,
    prune: Option<Prune>,
}

impl Walker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
            exclude: None,
            prune: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Skip entries whose path relative to the root matches one of
    /// `patterns`. Excluded directories are not descended into.
    pub fn exclude(mut self, patterns: &[String]) -> Result<Self> {
        self.exclude = build_globs(patterns)?;
        Ok(self)
    }

    /// Skip entries for which `predicate` returns true, with their subtree.
    pub fn prune(mut self, predicate: impl Fn(&Path) -> bool + 'static) -> Self {
        self.prune = Some(Box::new(predicate));
        self
    }

    fn skips(&self, path: &Path) -> bool {
        if self.prune.as_ref().is_some_and(|prune| prune(path)) {
            return true;
        }
        let Some(set) = &self.exclude else {
            return false;
        };
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        set.is_match(normalize_slashes(relative))
    }

    /// Walk the tree from the start. A root that is not a directory yields
    /// itself, rooted at its parent.
    pub fn files(&self) -> Box<dyn Iterator<Item = Result<File>> + '_> {
        if !io::is_dir(&self.root) {
            return Box::new(std::iter::once(File::open(&self.root)));
        }
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .contents_first(true)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.skips(entry.path()));
        Box::new(walker.map(|entry| match entry {
            Ok(entry) => Ok(File::new(entry.into_path(), &self.root)),
            Err(source) => Err(Error::Walk {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.root.clone()),
                source,
            }),
        }))
    }
}

fn normalize_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn build_globs(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| Error::Glob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }

    builder.build().map(Some).map_err(|source| Error::Glob {
        pattern: patterns.join(", "),
        source,
    })
}
