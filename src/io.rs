//! Filesystem helpers returning typed [`Error`]s.
//!
//! Every read, write and rename performed by [`crate::file::File`], the git
//! oracle and the walker goes through here so failures always carry the path
//! and the attempted operation.

use std::fs::{self, Metadata};
use std::io::Write;
use std::path::Path;

use time::OffsetDateTime;

use crate::error::{Error, Result};

const DEFAULT_UMASK: u32 = 0o022;

pub fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn symlink_metadata(path: &Path) -> Result<Metadata> {
    fs::symlink_metadata(path).map_err(|source| Error::Metadata {
        path: path.to_path_buf(),
        source,
    })
}

/// True when anything (file, directory, dangling link) occupies `path`.
pub fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

pub fn is_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

pub fn is_file(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Whether two paths name the same filesystem entry, e.g. a case-only
/// rename on a case-insensitive filesystem.
pub fn same_entry(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}

/// Replace the content of `path` through a sibling temp file, keeping `mode`
/// on the replacement.
pub fn write_atomic(path: &Path, data: &[u8], mode: Option<u32>) -> Result<()> {
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let unique = format!(
        ".tidytree-tmp-{}-{}",
        std::process::id(),
        OffsetDateTime::now_utc().unix_timestamp_nanos()
    );
    let temp_path = base_dir.join(unique);
    {
        let mut file = fs::File::create(&temp_path).map_err(write_err)?;
        file.write_all(data).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
    }
    if let Some(mode) = mode {
        if let Err(err) = set_mode(&temp_path, mode) {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }
    }
    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        write_err(source)
    })
}

/// Rename `from` to `to`, refusing to replace an existing different entry.
pub fn rename(from: &Path, to: &Path) -> Result<()> {
    if exists(to) && !same_entry(from, to) {
        return Err(Error::RenameTargetExists {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
    }
    fs::rename(from, to).map_err(|source| Error::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
pub fn mode(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
pub fn mode(meta: &Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| {
        Error::Permissions {
            path: path.to_path_buf(),
            mode,
            source,
        }
    })
}

#[cfg(not(unix))]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    let meta = symlink_metadata(path)?;
    let mut permissions = meta.permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, permissions).map_err(|source| Error::Permissions {
        path: path.to_path_buf(),
        mode,
        source,
    })
}

/// Current process umask, read without modifying it.
pub fn umask() -> u32 {
    fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| parse_umask(&status))
        .unwrap_or(DEFAULT_UMASK)
}

fn parse_umask(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Umask:"))
        .and_then(|value| u32::from_str_radix(value.trim(), 8).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn umask_parsed_from_status() {
        let status = "Name:\tcat\nUmask:\t0002\nState:\tR (running)\n";
        assert_eq!(parse_umask(status), Some(0o002));
        assert_eq!(parse_umask("Name:\tcat\n"), None);
    }

    #[test]
    fn rename_refuses_existing_target() {
        let temp = tempdir().expect("temp dir");
        let from = temp.path().join("a.txt");
        let to = temp.path().join("b.txt");
        fs::write(&from, "a").expect("write a");
        fs::write(&to, "b").expect("write b");

        let err = rename(&from, &to).expect_err("target exists");
        assert!(matches!(err, Error::RenameTargetExists { .. }));
        assert_eq!(fs::read_to_string(&to).expect("read b"), "b");
    }

    #[test]
    fn write_atomic_replaces_content() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("file.txt");
        fs::write(&path, "old").expect("write");
        write_atomic(&path, b"new", None).expect("atomic write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "new");
        let leftovers = fs::read_dir(temp.path()).expect("read dir").count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_keeps_requested_mode() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("script.sh");
        fs::write(&path, "#!/bin/sh\n").expect("write");
        write_atomic(&path, b"#!/bin/sh\necho\n", Some(0o750)).expect("atomic write");
        let meta = symlink_metadata(&path).expect("metadata");
        assert_eq!(mode(&meta), 0o750);
    }
}
