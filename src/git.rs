//! Git metadata oracle.
//!
//! Bare repository layout checks are done on the filesystem; repository and
//! attribute queries shell out to the `git` binary. All answers are memoized
//! for the lifetime of the oracle, which is one run.

use std::cell::{OnceCell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::rc::Rc;

use tracing::{debug, warn};

use crate::file::File;
use crate::io;

const GIT_DIR_NAME: &str = ".git";
const BARE_DIRS: [&str; 5] = ["branches", "objects", "refs", "hooks", "info"];
const BARE_FILES: [&str; 2] = ["config", "HEAD"];

/// Strips `GIT_DIR` and `GIT_WORK_TREE` so the explicit `-C` path wins.
fn git_cmd() -> Command {
    let mut cmd = Command::new("git");
    cmd.env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    cmd
}

#[derive(Debug, Default)]
pub struct Git {
    available: OnceCell<bool>,
    repos: RefCell<HashMap<PathBuf, bool>>,
    bare: RefCell<HashMap<PathBuf, bool>>,
    crlf: RefCell<HashMap<PathBuf, Rc<HashSet<PathBuf>>>>,
}

impl Git {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn available(&self) -> bool {
        *self.available.get_or_init(|| {
            let found = git_cmd()
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            if !found {
                warn!("git binary not found; treating every directory as outside a repository");
            }
            found
        })
    }

    /// Whether `dir` is inside a git work tree or git directory.
    pub fn has_git(&self, dir: &Path) -> bool {
        if let Some(known) = self.repos.borrow().get(dir) {
            return *known;
        }
        let found = self.available()
            && git_cmd()
                .arg("-C")
                .arg(dir)
                .arg("rev-parse")
                .arg("--git-dir")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
        self.repos.borrow_mut().insert(dir.to_path_buf(), found);
        found
    }

    /// Whether `dir` has the layout of a bare repository.
    pub fn is_bare_repo(&self, dir: &Path) -> bool {
        if let Some(known) = self.bare.borrow().get(dir) {
            return *known;
        }
        let bare = BARE_DIRS.iter().all(|name| io::is_dir(&dir.join(name)))
            && BARE_FILES.iter().all(|name| io::is_file(&dir.join(name)));
        if bare {
            debug!(dir = %dir.display(), "bare repository detected");
        }
        self.bare.borrow_mut().insert(dir.to_path_buf(), bare);
        bare
    }

    /// Nearest enclosing `.git` directory or bare repository of `path`.
    pub fn git_dir_of(&self, path: &Path) -> Option<PathBuf> {
        path.ancestors()
            .skip(1)
            .find(|ancestor| {
                ancestor.file_name().is_some_and(|name| name == GIT_DIR_NAME)
                    || self.is_bare_repo(ancestor)
            })
            .map(Path::to_path_buf)
    }

    pub fn is_in_git_dir(&self, file: &File) -> bool {
        self.git_dir_of(file.path()).is_some()
    }

    /// Absolute paths below `dir` whose attributes request `eol=crlf`.
    pub fn crlf_files(&self, dir: &Path) -> Rc<HashSet<PathBuf>> {
        if let Some(known) = self.crlf.borrow().get(dir) {
            return Rc::clone(known);
        }
        let files = Rc::new(if self.has_git(dir) {
            self.list_crlf_files(dir)
        } else {
            HashSet::new()
        });
        self.crlf
            .borrow_mut()
            .insert(dir.to_path_buf(), Rc::clone(&files));
        files
    }

    fn list_crlf_files(&self, dir: &Path) -> HashSet<PathBuf> {
        let output = match git_cmd()
            .arg("-C")
            .arg(dir)
            .arg("ls-files")
            .arg("--eol")
            .arg("-z")
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => output,
            Ok(_) | Err(_) => {
                warn!(dir = %dir.display(), "git ls-files failed; assuming no eol attributes");
                return HashSet::new();
            }
        };
        parse_eol_listing(&String::from_utf8_lossy(&output.stdout))
            .map(|relative| dir.join(relative))
            .collect()
    }
}

fn parse_eol_listing(listing: &str) -> impl Iterator<Item = &str> {
    listing
        .split('\0')
        .filter_map(|record| record.split_once('\t'))
        .filter(|(info, _)| {
            info.split_whitespace()
                .any(|field| field.trim_start_matches("attr/") == "eol=crlf")
        })
        .map(|(_, path)| path)
}
