pub mod changelog;
pub mod config;
pub mod diff;
pub mod eol;
pub mod error;
pub mod file;
pub mod filter;
pub mod git;
pub mod io;
pub mod normalization;
pub mod normalizator;
pub mod options;
pub mod report;
pub mod sniff;
pub mod walk;

pub use error::{Error, Result};
pub use file::File;
pub use normalizator::Normalizator;
pub use options::{Config, RawOptions};
pub use report::{Reporter, Severity};
pub use walk::Walker;
