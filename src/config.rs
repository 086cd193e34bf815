//! Option files. YAML unless the extension says JSON.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::io;
use crate::options::RawOptions;

pub const CONFIG_NAMES: [&str; 3] = [".tidytree.yml", ".tidytree.yaml", ".tidytree.json"];

pub fn load(path: &Path) -> Result<RawOptions> {
    let data = io::read(path)?;
    let config_err = |message: String| Error::Config {
        path: path.to_path_buf(),
        message,
    };
    if path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
    {
        serde_json::from_slice(&data).map_err(|err| config_err(err.to_string()))
    } else if data.iter().all(u8::is_ascii_whitespace) {
        Ok(RawOptions::default())
    } else {
        serde_yaml::from_slice(&data).map_err(|err| config_err(err.to_string()))
    }
}

/// First option file found directly in `dir`.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    let found = CONFIG_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| io::is_file(candidate));
    if let Some(path) = &found {
        debug!(path = %path.display(), "config file found");
    }
    found
}
