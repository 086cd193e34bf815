//! Eligibility predicates and the per-normalization filter chains.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use tracing::trace;

use crate::error::Result;
use crate::file::File;
use crate::git::Git;
use crate::io;
use crate::normalization::NormalizationKind;
use crate::sniff;

const VCS_DIRS: [&str; 6] = [".git", ".svn", ".hg", ".bzr", "CVS", "_darcs"];
const PATCH_EXTENSIONS: [&str; 2] = ["patch", "diff"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    File,
    Text,
    AsciiCompatible,
    NoGit,
    NoVendor,
    NoNodeModules,
    NoLink,
    NoPatch,
}

impl FilterKind {
    pub fn name(self) -> &'static str {
        match self {
            FilterKind::File => "file",
            FilterKind::Text => "text",
            FilterKind::AsciiCompatible => "ascii-compatible",
            FilterKind::NoGit => "no-git",
            FilterKind::NoVendor => "no-vendor",
            FilterKind::NoNodeModules => "no-node-modules",
            FilterKind::NoLink => "no-link",
            FilterKind::NoPatch => "no-patch",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A predicate deciding whether a normalization may touch `file`.
/// Implementations only read the file.
pub trait Filter {
    fn filter(&self, file: &File) -> Result<bool>;
}

pub struct FileFilter;

impl Filter for FileFilter {
    fn filter(&self, file: &File) -> Result<bool> {
        file.is_file()
    }
}

pub struct NoLinkFilter;

impl Filter for NoLinkFilter {
    fn filter(&self, file: &File) -> Result<bool> {
        Ok(!file.is_symlink()?)
    }
}

#[derive(Default)]
pub struct TextFilter {
    known: RefCell<HashMap<PathBuf, bool>>,
}

impl Filter for TextFilter {
    fn filter(&self, file: &File) -> Result<bool> {
        if let Some(known) = self.known.borrow().get(file.path()) {
            return Ok(*known);
        }
        let content = file.content()?;
        let text = content.is_empty() || sniff::is_text(sniff::mime_type(content));
        self.known
            .borrow_mut()
            .insert(file.path().to_path_buf(), text);
        Ok(text)
    }
}

/// Rejects content whose BOM announces UTF-16, where line edits on single
/// bytes would split code units.
pub struct AsciiCompatibleFilter;

impl Filter for AsciiCompatibleFilter {
    fn filter(&self, file: &File) -> Result<bool> {
        Ok(sniff::is_ascii_compatible(file.pending_content()?))
    }
}

pub struct NoGitFilter {
    git: Rc<Git>,
}

impl NoGitFilter {
    pub fn new(git: Rc<Git>) -> Self {
        Self { git }
    }
}

impl Filter for NoGitFilter {
    fn filter(&self, file: &File) -> Result<bool> {
        let path = file.path();
        let in_vcs = path.components().any(|component| match component {
            Component::Normal(name) => VCS_DIRS.iter().any(|vcs| name == OsStr::new(vcs)),
            _ => false,
        });
        Ok(!in_vcs && !self.git.is_bare_repo(path) && self.git.git_dir_of(path).is_none())
    }
}

/// Excludes entries below a dependency directory, recognised only when its
/// marker files exist.
pub struct DependencyFilter {
    dir_name: &'static str,
    is_marked: fn(&Path) -> bool,
    known: RefCell<HashMap<PathBuf, bool>>,
}

impl DependencyFilter {
    pub fn vendor() -> Self {
        Self {
            dir_name: "vendor",
            is_marked: |dir| io::is_file(&dir.join("autoload.php")) && io::is_dir(&dir.join("composer")),
            known: RefCell::default(),
        }
    }

    pub fn node_modules() -> Self {
        Self {
            dir_name: "node_modules",
            is_marked: |dir| {
                io::is_file(&dir.join(".package-lock.json"))
                    || dir
                        .parent()
                        .is_some_and(|parent| io::is_file(&parent.join("package-lock.json")))
            },
            known: RefCell::default(),
        }
    }

    fn is_dependency_dir(&self, dir: &Path) -> bool {
        if let Some(known) = self.known.borrow().get(dir) {
            return *known;
        }
        let marked = (self.is_marked)(dir);
        self.known.borrow_mut().insert(dir.to_path_buf(), marked);
        marked
    }
}

impl Filter for DependencyFilter {
    fn filter(&self, file: &File) -> Result<bool> {
        let inside = file.path().ancestors().any(|ancestor| {
            ancestor.file_name().is_some_and(|name| name == self.dir_name)
                && self.is_dependency_dir(ancestor)
        });
        Ok(!inside)
    }
}

pub type PatchCache = Rc<RefCell<HashMap<PathBuf, bool>>>;

pub struct NoPatchFilter {
    cache: PatchCache,
}

impl NoPatchFilter {
    pub fn new(cache: PatchCache) -> Self {
        Self { cache }
    }
}

impl Filter for NoPatchFilter {
    fn filter(&self, file: &File) -> Result<bool> {
        if let Some(is_patch) = self.cache.borrow().get(file.path()) {
            return Ok(!is_patch);
        }
        let is_patch = file
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                PATCH_EXTENSIONS
                    .iter()
                    .any(|patch| ext.eq_ignore_ascii_case(patch))
            });
        self.cache
            .borrow_mut()
            .insert(file.path().to_path_buf(), is_patch);
        Ok(!is_patch)
    }
}

type Chain = Rc<[Rc<dyn Filter>]>;

/// Resolves and memoizes the filter chain of every normalization.
pub struct FilterManager {
    git: Rc<Git>,
    patch_cache: PatchCache,
    instances: RefCell<HashMap<FilterKind, Rc<dyn Filter>>>,
    chains: RefCell<HashMap<NormalizationKind, Chain>>,
}

impl FilterManager {
    pub fn new(git: Rc<Git>) -> Self {
        Self {
            git,
            patch_cache: PatchCache::default(),
            instances: RefCell::default(),
            chains: RefCell::default(),
        }
    }

    fn build(&self, kind: FilterKind) -> Rc<dyn Filter> {
        match kind {
            FilterKind::File => Rc::new(FileFilter),
            FilterKind::Text => Rc::new(TextFilter::default()),
            FilterKind::AsciiCompatible => Rc::new(AsciiCompatibleFilter),
            FilterKind::NoGit => Rc::new(NoGitFilter::new(Rc::clone(&self.git))),
            FilterKind::NoVendor => Rc::new(DependencyFilter::vendor()),
            FilterKind::NoNodeModules => Rc::new(DependencyFilter::node_modules()),
            FilterKind::NoLink => Rc::new(NoLinkFilter),
            FilterKind::NoPatch => Rc::new(NoPatchFilter::new(Rc::clone(&self.patch_cache))),
        }
    }

    fn instance(&self, kind: FilterKind) -> Rc<dyn Filter> {
        if let Some(filter) = self.instances.borrow().get(&kind) {
            return Rc::clone(filter);
        }
        let filter = self.build(kind);
        self.instances.borrow_mut().insert(kind, Rc::clone(&filter));
        filter
    }

    fn chain(&self, kind: NormalizationKind, filters: &[FilterKind]) -> Chain {
        if let Some(chain) = self.chains.borrow().get(&kind) {
            return Rc::clone(chain);
        }
        let chain: Chain = filters.iter().map(|filter| self.instance(*filter)).collect();
        self.chains.borrow_mut().insert(kind, Rc::clone(&chain));
        chain
    }

    /// Run the filters of normalization `kind` in declaration order,
    /// stopping at the first failure.
    pub fn filter(
        &self,
        kind: NormalizationKind,
        filters: &[FilterKind],
        file: &File,
    ) -> Result<bool> {
        let chain = self.chain(kind, filters);
        for (filter, filter_kind) in chain.iter().zip(filters) {
            if !filter.filter(file)? {
                trace!(
                    path = %file.display_path(),
                    normalization = kind.name(),
                    filter = filter_kind.name(),
                    "filtered out"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn file_in(root: &Path, relative: &str, content: &[u8]) -> File {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("dirs");
        fs::write(&path, content).expect("write");
        File::new(path, root)
    }

    #[test]
    fn file_filter_rejects_directories() {
        let temp = tempdir().expect("temp dir");
        let dir = File::new(temp.path(), temp.path());
        assert!(!FileFilter.filter(&dir).expect("filter"));
        let file = file_in(temp.path(), "a.txt", b"a");
        assert!(FileFilter.filter(&file).expect("filter"));
    }

    #[test]
    fn text_filter_accepts_empty_and_text() {
        let temp = tempdir().expect("temp dir");
        let filter = TextFilter::default();
        assert!(filter.filter(&file_in(temp.path(), "empty", b"")).expect("empty"));
        assert!(filter.filter(&file_in(temp.path(), "t.txt", b"text\n")).expect("text"));
        assert!(!filter
            .filter(&file_in(temp.path(), "b.bin", b"\x00\x01binary"))
            .expect("binary"));
    }

    #[test]
    fn vcs_segments_are_excluded() {
        let temp = tempdir().expect("temp dir");
        let filter = NoGitFilter::new(Rc::new(Git::new()));
        let inside = file_in(temp.path(), ".git/config", b"[core]\n");
        let svn = file_in(temp.path(), "sub/.svn/entries", b"12\n");
        let outside = file_in(temp.path(), "src/git.rs", b"fn main() {}\n");
        assert!(!filter.filter(&inside).expect("git"));
        assert!(!filter.filter(&svn).expect("svn"));
        assert!(filter.filter(&outside).expect("outside"));
    }

    #[test]
    fn utf16_text_is_not_ascii_compatible() {
        let temp = tempdir().expect("temp dir");
        let wide = file_in(temp.path(), "wide.txt", &[0xFF, 0xFE, 0x61, 0x00, 0x0A, 0x00]);
        let narrow = file_in(temp.path(), "narrow.txt", b"\xEF\xBB\xBFa\n");
        assert!(TextFilter::default().filter(&wide).expect("text"));
        assert!(!AsciiCompatibleFilter.filter(&wide).expect("utf-16"));
        assert!(AsciiCompatibleFilter.filter(&narrow).expect("utf-8"));
    }

    #[test]
    fn bare_repo_contents_are_excluded() {
        let temp = tempdir().expect("temp dir");
        let repo = temp.path().join("mirror.git");
        for dir in ["branches", "objects", "refs", "hooks", "info"] {
            fs::create_dir_all(repo.join(dir)).expect("bare dir");
        }
        fs::write(repo.join("HEAD"), "ref: refs/heads/main\n").expect("HEAD");
        fs::write(repo.join("config"), "[core]\n\tbare = true\n").expect("config");

        let filter = NoGitFilter::new(Rc::new(Git::new()));
        let exclude = file_in(temp.path(), "mirror.git/info/exclude", b"*.o  \n");
        let description = file_in(temp.path(), "mirror.git/description", b"mirror  \n");
        let beside = file_in(temp.path(), "notes.txt", b"notes\n");
        assert!(!filter.filter(&exclude).expect("nested"));
        assert!(!filter.filter(&description).expect("top level"));
        assert!(!filter.filter(&File::new(&repo, temp.path())).expect("repo dir"));
        assert!(filter.filter(&beside).expect("outside"));
    }

    #[test]
    fn vendor_requires_markers() {
        let temp = tempdir().expect("temp dir");
        let filter = DependencyFilter::vendor();
        let lookalike = file_in(temp.path(), "app/vendor/lib.php", b"<?php\n");
        assert!(filter.filter(&lookalike).expect("no markers"));

        let real = file_in(temp.path(), "vendor/acme/lib.php", b"<?php\n");
        fs::write(temp.path().join("vendor/autoload.php"), "<?php\n").expect("autoload");
        assert!(filter.filter(&real).expect("only autoload"));

        let filter = DependencyFilter::vendor();
        fs::create_dir_all(temp.path().join("vendor/composer")).expect("composer dir");
        assert!(!filter.filter(&real).expect("both markers"));
    }

    #[test]
    fn node_modules_requires_lock_file() {
        let temp = tempdir().expect("temp dir");
        let file = file_in(temp.path(), "node_modules/left-pad/index.js", b"module.exports = 1;\n");
        assert!(DependencyFilter::node_modules().filter(&file).expect("no lock"));
        fs::write(temp.path().join("package-lock.json"), "{}").expect("lock");
        assert!(!DependencyFilter::node_modules().filter(&file).expect("lock"));
    }

    #[test]
    fn patch_results_are_shared() {
        let temp = tempdir().expect("temp dir");
        let cache = PatchCache::default();
        let first = NoPatchFilter::new(Rc::clone(&cache));
        let second = NoPatchFilter::new(Rc::clone(&cache));
        let patch = file_in(temp.path(), "fix.PATCH", b"--- a\n+++ b\n");
        assert!(!first.filter(&patch).expect("patch"));
        assert_eq!(cache.borrow().get(patch.path()), Some(&true));
        assert!(!second.filter(&patch).expect("cached"));
        assert!(first.filter(&file_in(temp.path(), "a.txt", b"")).expect("txt"));
    }

    #[cfg(unix)]
    #[test]
    fn links_are_excluded() {
        let temp = tempdir().expect("temp dir");
        let target = file_in(temp.path(), "target.txt", b"x");
        let link = temp.path().join("link.txt");
        std::os::unix::fs::symlink(target.path(), &link).expect("symlink");
        assert!(!NoLinkFilter.filter(&File::new(&link, temp.path())).expect("link"));
        assert!(NoLinkFilter.filter(&target).expect("target"));
    }

    #[test]
    fn manager_short_circuits_and_reuses_chain() {
        let temp = tempdir().expect("temp dir");
        let manager = FilterManager::new(Rc::new(Git::new()));
        let filters = [FilterKind::File, FilterKind::NoPatch, FilterKind::Text];
        let patch = file_in(temp.path(), "fix.diff", b"--- a\n");
        let text = file_in(temp.path(), "a.txt", b"text\n");
        let dir = File::new(temp.path().join("sub"), temp.path());
        fs::create_dir(dir.path()).expect("dir");

        assert!(!manager
            .filter(NormalizationKind::Eol, &filters, &patch)
            .expect("patch"));
        assert!(!manager
            .filter(NormalizationKind::Eol, &filters, &dir)
            .expect("dir"));
        assert!(manager
            .filter(NormalizationKind::Eol, &filters, &text)
            .expect("text"));
        assert_eq!(manager.chains.borrow().len(), 1);
        assert_eq!(manager.patch_cache.borrow().get(patch.path()), Some(&true));
    }
}
