use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value '{value}' for option '{option}' (expected {expected})")]
    InvalidOption {
        option: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("unable to load config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("unable to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read metadata for {}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to set permissions {mode:o} on {}", path.display())]
    Permissions {
        path: PathBuf,
        mode: u32,
        #[source]
        source: io::Error,
    },

    #[error("unable to rename {} to {}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The rename destination is taken by a different entry.
    #[error("cannot rename {} to {}: target already exists", from.display(), to.display())]
    RenameTargetExists { from: PathBuf, to: PathBuf },

    #[error("unable to walk {}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid exclude glob '{pattern}'")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
