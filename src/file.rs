//! File handle tracking original and pending state of one filesystem entry.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::diff;
use crate::error::Result;
use crate::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Other,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    kind: EntryKind,
    mode: u32,
}

#[derive(Debug)]
pub struct File {
    path: PathBuf,
    root: PathBuf,
    relative: PathBuf,
    entry: OnceCell<Entry>,
    content: OnceCell<Vec<u8>>,
    pending_content: Option<Vec<u8>>,
    name: String,
    pending_name: Option<String>,
    pending_permissions: Option<u32>,
    extension: OnceCell<Option<String>>,
}

impl File {
    pub fn new(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let root = root.into();
        let relative = path
            .strip_prefix(&root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            root,
            relative,
            entry: OnceCell::new(),
            content: OnceCell::new(),
            pending_content: None,
            name,
            pending_name: None,
            pending_permissions: None,
            extension: OnceCell::new(),
        }
    }

    /// Open a single entry; its parent directory becomes the root.
    pub fn open(path: &Path) -> Result<Self> {
        io::symlink_metadata(path)?;
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.clone());
        Ok(Self::new(path, root))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Relative path for messages, falling back to the name at the root.
    pub fn display_path(&self) -> String {
        if self.relative.as_os_str().is_empty() {
            self.name.clone()
        } else {
            self.relative.display().to_string()
        }
    }

    fn entry(&self) -> Result<Entry> {
        if let Some(entry) = self.entry.get() {
            return Ok(*entry);
        }
        let meta = io::symlink_metadata(&self.path)?;
        let file_type = meta.file_type();
        let kind = if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };
        let entry = Entry {
            kind,
            mode: io::mode(&meta),
        };
        Ok(*self.entry.get_or_init(|| entry))
    }

    pub fn kind(&self) -> Result<EntryKind> {
        Ok(self.entry()?.kind)
    }

    pub fn is_file(&self) -> Result<bool> {
        Ok(self.kind()? == EntryKind::File)
    }

    pub fn is_dir(&self) -> Result<bool> {
        Ok(self.kind()? == EntryKind::Dir)
    }

    pub fn is_symlink(&self) -> Result<bool> {
        Ok(self.kind()? == EntryKind::Symlink)
    }

    /// Original bytes on disk, read once.
    pub fn content(&self) -> Result<&[u8]> {
        if let Some(content) = self.content.get() {
            return Ok(content);
        }
        let bytes = io::read(&self.path)?;
        Ok(self.content.get_or_init(|| bytes))
    }

    pub fn pending_content(&self) -> Result<&[u8]> {
        match &self.pending_content {
            Some(pending) => Ok(pending),
            None => self.content(),
        }
    }

    pub fn set_pending_content(&mut self, content: Vec<u8>) {
        self.pending_content = Some(content);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pending_name(&self) -> &str {
        self.pending_name.as_deref().unwrap_or(&self.name)
    }

    pub fn set_pending_name(&mut self, name: impl Into<String>) {
        self.pending_name = Some(name.into());
        self.extension = OnceCell::new();
    }

    /// False when the on-disk name is not valid UTF-8 and must not be
    /// rewritten from its lossy form.
    pub fn has_utf8_name(&self) -> bool {
        self.path
            .file_name()
            .is_some_and(|name| name.to_str().is_some())
    }

    pub fn permissions(&self) -> Result<u32> {
        Ok(self.entry()?.mode)
    }

    pub fn pending_permissions(&self) -> Result<u32> {
        match self.pending_permissions {
            Some(mode) => Ok(mode),
            None => self.permissions(),
        }
    }

    pub fn set_pending_permissions(&mut self, mode: u32) {
        self.pending_permissions = Some(mode);
    }

    /// Extension of the pending name, `tar.gz` counted as one.
    pub fn extension(&self) -> Option<&str> {
        self.extension
            .get_or_init(|| extension_of(self.pending_name()).map(str::to_string))
            .as_deref()
    }

    /// Pending name without its extension.
    pub fn stem(&self) -> &str {
        let name = self.pending_name();
        match self.extension() {
            Some(ext) => &name[..name.len() - ext.len() - 1],
            None => name,
        }
    }

    /// Diff of original and pending content, `None` when they are equal.
    pub fn diff(&self, context: usize) -> Result<Option<String>> {
        if !self.content_changed() {
            return Ok(None);
        }
        Ok(Some(diff::render(self.content()?, self.pending_content()?, context)))
    }

    fn content_changed(&self) -> bool {
        match (&self.pending_content, self.content.get()) {
            (Some(pending), Some(original)) => pending != original,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn name_changed(&self) -> bool {
        self.pending_name
            .as_deref()
            .is_some_and(|pending| pending != self.name)
    }

    fn permissions_changed(&self) -> bool {
        match (self.pending_permissions, self.entry.get()) {
            (Some(pending), Some(entry)) => pending != entry.mode,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    pub fn has_changed(&self) -> bool {
        self.content_changed() || self.name_changed() || self.permissions_changed()
    }

    /// Write pending content, then permissions, then the rename. A failed
    /// step keeps its pending value and skips the steps after it.
    pub fn commit(&mut self) -> Result<()> {
        let entry = self.entry()?;

        if self.content_changed() {
            if let Some(pending) = &self.pending_content {
                io::write_atomic(&self.path, pending, Some(entry.mode))?;
                info!(path = %self.path.display(), bytes = pending.len(), "content written");
            }
            if let Some(pending) = self.pending_content.take() {
                self.content = OnceCell::from(pending);
            }
        }

        if self.permissions_changed() && entry.kind != EntryKind::Symlink {
            if let Some(mode) = self.pending_permissions {
                io::set_mode(&self.path, mode)?;
                info!(path = %self.path.display(), mode = %format!("{mode:o}"), "permissions set");
                self.entry = OnceCell::from(Entry { mode, ..entry });
                self.pending_permissions = None;
            }
        }

        if self.name_changed() {
            if let Some(name) = self.pending_name.clone() {
                let target = self.path.with_file_name(&name);
                io::rename(&self.path, &target)?;
                info!(from = %self.path.display(), to = %target.display(), "renamed");
                self.relative = self.relative.with_file_name(&name);
                self.path = target;
                self.name = name;
                self.pending_name = None;
                self.extension = OnceCell::new();
            }
        }

        debug!(path = %self.path.display(), "commit finished");
        Ok(())
    }
}

fn extension_of(name: &str) -> Option<&str> {
    const TAR_GZ: &str = ".tar.gz";
    if name.len() > TAR_GZ.len() && name.to_ascii_lowercase().ends_with(TAR_GZ) {
        return Some(&name[name.len() - TAR_GZ.len() + 1..]);
    }
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn content_is_cached_and_pending_defaults_to_original() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "one").expect("write");
        let mut file = File::new(&path, temp.path());
        assert_eq!(file.content().expect("content"), b"one");
        fs::write(&path, "two").expect("rewrite");
        assert_eq!(file.content().expect("content"), b"one");
        assert_eq!(file.pending_content().expect("pending"), b"one");

        file.set_pending_content(b"three".to_vec());
        assert_eq!(file.content().expect("content"), b"one");
        assert_eq!(file.pending_content().expect("pending"), b"three");
        assert!(file.has_changed());
    }

    #[test]
    fn diff_shows_pending_changes() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "a \n").expect("write");
        let mut file = File::new(&path, temp.path());
        file.content().expect("content");
        assert_eq!(file.diff(3).expect("diff"), None);
        file.set_pending_content(b"a\n".to_vec());
        assert_eq!(file.diff(3).expect("diff").as_deref(), Some("- a \n+ a\n"));
    }

    #[test]
    fn read_error_is_propagated() {
        let temp = tempdir().expect("temp dir");
        let file = File::new(temp.path().join("missing.txt"), temp.path());
        assert!(matches!(file.content(), Err(Error::Read { .. })));
    }

    #[test]
    fn extension_follows_pending_name() {
        let temp = tempdir().expect("temp dir");
        let mut file = File::new(temp.path().join("archive.TAR.GZ"), temp.path());
        assert_eq!(file.extension(), Some("TAR.GZ"));
        assert_eq!(file.stem(), "archive");

        file.set_pending_name("photo.jpeg");
        assert_eq!(file.extension(), Some("jpeg"));
        assert_eq!(file.stem(), "photo");

        file.set_pending_name(".bashrc");
        assert_eq!(file.extension(), None);
        assert_eq!(file.stem(), ".bashrc");
    }

    #[test]
    fn unchanged_values_do_not_count_as_change() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "same").expect("write");
        let mut file = File::new(&path, temp.path());
        file.set_pending_content(b"same".to_vec());
        file.set_pending_name("a.txt");
        let mode = file.permissions().expect("mode");
        file.set_pending_permissions(mode);
        assert!(!file.has_changed());
    }

    #[test]
    fn commit_writes_content_and_renames() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("Foo Bar.TXT");
        fs::write(&path, "text  \n").expect("write");
        let mut file = File::new(&path, temp.path());
        file.content().expect("content");
        file.set_pending_content(b"text\n".to_vec());
        file.set_pending_name("foo-bar.txt");
        file.commit().expect("commit");

        let renamed = temp.path().join("foo-bar.txt");
        assert_eq!(fs::read_to_string(&renamed).expect("read"), "text\n");
        assert!(!path.exists());
        assert_eq!(file.path(), renamed);
        assert_eq!(file.relative(), Path::new("foo-bar.txt"));
        assert!(!file.has_changed());
    }

    #[test]
    fn commit_refuses_to_overwrite_existing_name() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "a").expect("write a");
        fs::write(temp.path().join("b.txt"), "b").expect("write b");
        let mut file = File::new(&path, temp.path());
        file.set_pending_name("b.txt");

        let err = file.commit().expect_err("collision");
        assert!(matches!(err, Error::RenameTargetExists { .. }));
        assert_eq!(
            fs::read_to_string(temp.path().join("b.txt")).expect("read"),
            "b"
        );
    }

    #[cfg(unix)]
    #[test]
    fn commit_applies_permissions() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("run.sh");
        fs::write(&path, "#!/bin/sh\n").expect("write");
        io::set_mode(&path, 0o644).expect("chmod");
        let mut file = File::new(&path, temp.path());
        file.set_pending_permissions(0o755);
        assert!(file.has_changed());
        file.commit().expect("commit");

        let meta = io::symlink_metadata(&path).expect("metadata");
        assert_eq!(io::mode(&meta), 0o755);
    }
}
