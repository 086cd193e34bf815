//! Option values as given by the user and the resolved run configuration.

use serde::{Deserialize, Deserializer};

use crate::eol::Eol;
use crate::error::{Error, Result};

pub const DEFAULT_MAX_EOL: usize = 1;
pub const DEFAULT_INDENTATION_SIZE: usize = 4;

/// A valued option: `false` disables it, `true` asks for its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting<T> {
    Disabled,
    Default,
    Explicit(T),
}

impl<T> Setting<T> {
    fn resolve_with<U>(
        &self,
        default: U,
        parse: impl FnOnce(&T) -> Result<U>,
    ) -> Result<Option<U>> {
        match self {
            Setting::Disabled => Ok(None),
            Setting::Default => Ok(Some(default)),
            Setting::Explicit(value) => parse(value).map(Some),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Setting<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw<T> {
            Flag(bool),
            Value(T),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => Setting::Disabled,
            Raw::Flag(true) => Setting::Default,
            Raw::Value(value) => Setting::Explicit(value),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indentation {
    Space,
    Tab,
}

/// Options as read from a config file or the command line. `None` means
/// the option was not mentioned.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawOptions {
    #[serde(default)]
    pub encoding: Option<bool>,
    #[serde(default)]
    pub eol: Option<Setting<String>>,
    #[serde(default)]
    pub keep_cr: Option<bool>,
    #[serde(default)]
    pub extension: Option<bool>,
    #[serde(default)]
    pub final_eol: Option<Setting<usize>>,
    #[serde(default)]
    pub leading_eol: Option<bool>,
    #[serde(default)]
    pub middle_eol: Option<Setting<usize>>,
    #[serde(default)]
    pub name: Option<bool>,
    #[serde(default)]
    pub permissions: Option<bool>,
    #[serde(default)]
    pub space_before_tab: Option<bool>,
    #[serde(default)]
    pub trailing_whitespace: Option<bool>,
    #[serde(default)]
    pub indentation: Option<Setting<String>>,
    #[serde(default)]
    pub indentation_size: Option<usize>,
}

impl RawOptions {
    /// Values set in `overrides` replace the ones in `self`.
    pub fn merge(mut self, overrides: RawOptions) -> RawOptions {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if overrides.$field.is_some() {
                    self.$field = overrides.$field;
                })*
            };
        }
        take!(
            encoding,
            eol,
            keep_cr,
            extension,
            final_eol,
            leading_eol,
            middle_eol,
            name,
            permissions,
            space_before_tab,
            trailing_whitespace,
            indentation,
            indentation_size
        );
        self
    }

    /// Whether any normalization switch was mentioned. Modifiers such as
    /// `keep-cr` and `indentation-size` do not count.
    fn any_switch(&self) -> bool {
        self.encoding.is_some()
            || self.eol.is_some()
            || self.extension.is_some()
            || self.final_eol.is_some()
            || self.leading_eol.is_some()
            || self.middle_eol.is_some()
            || self.name.is_some()
            || self.permissions.is_some()
            || self.space_before_tab.is_some()
            || self.trailing_whitespace.is_some()
            || self.indentation.is_some()
    }

    pub fn resolve(&self) -> Result<Config> {
        let indentation_size = match self.indentation_size {
            Some(0) => {
                return Err(Error::InvalidOption {
                    option: "indentation-size",
                    value: "0".into(),
                    expected: "a positive integer",
                });
            }
            Some(size) => size,
            None => DEFAULT_INDENTATION_SIZE,
        };
        let keep_cr = self.keep_cr.unwrap_or(false);

        if !self.any_switch() {
            return Ok(Config {
                keep_cr,
                indentation_size,
                ..Config::default()
            });
        }

        let eol = match &self.eol {
            Some(setting) => setting.resolve_with(Eol::Lf, |value| parse_eol(value))?,
            None => None,
        };
        let indentation = match &self.indentation {
            Some(setting) => {
                setting.resolve_with(Indentation::Space, |value| parse_indentation(value))?
            }
            None => None,
        };
        let max = |setting: &Option<Setting<usize>>| match setting {
            Some(setting) => setting.resolve_with(DEFAULT_MAX_EOL, |value| Ok(*value)),
            None => Ok(None),
        };

        Ok(Config {
            encoding: self.encoding.unwrap_or(false),
            eol,
            keep_cr,
            extension: self.extension.unwrap_or(false),
            final_eol: max(&self.final_eol)?,
            leading_eol: self.leading_eol.unwrap_or(false),
            middle_eol: max(&self.middle_eol)?,
            name: self.name.unwrap_or(false),
            permissions: self.permissions.unwrap_or(false),
            space_before_tab: self.space_before_tab.unwrap_or(false),
            trailing_whitespace: self.trailing_whitespace.unwrap_or(false),
            indentation,
            indentation_size,
        })
    }
}

fn parse_eol(value: &str) -> Result<Eol> {
    match Eol::parse(value) {
        Some(eol @ (Eol::Lf | Eol::Crlf)) => Ok(eol),
        _ => Err(Error::InvalidOption {
            option: "eol",
            value: value.to_string(),
            expected: "lf or crlf",
        }),
    }
}

fn parse_indentation(value: &str) -> Result<Indentation> {
    match value.trim().to_ascii_lowercase().as_str() {
        "space" | "spaces" => Ok(Indentation::Space),
        "tab" | "tabs" => Ok(Indentation::Tab),
        _ => Err(Error::InvalidOption {
            option: "indentation",
            value: value.to_string(),
            expected: "space or tab",
        }),
    }
}

/// Resolved configuration of one run. `None` disables a valued step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub encoding: bool,
    pub eol: Option<Eol>,
    pub keep_cr: bool,
    pub extension: bool,
    pub final_eol: Option<usize>,
    pub leading_eol: bool,
    pub middle_eol: Option<usize>,
    pub name: bool,
    pub permissions: bool,
    pub space_before_tab: bool,
    pub trailing_whitespace: bool,
    pub indentation: Option<Indentation>,
    pub indentation_size: usize,
}

impl Default for Config {
    /// Every switch on, `eol=lf`, `final-eol=1`, `middle-eol=1`.
    fn default() -> Self {
        Self {
            encoding: true,
            eol: Some(Eol::Lf),
            keep_cr: false,
            extension: true,
            final_eol: Some(DEFAULT_MAX_EOL),
            leading_eol: true,
            middle_eol: Some(DEFAULT_MAX_EOL),
            name: true,
            permissions: true,
            space_before_tab: true,
            trailing_whitespace: true,
            indentation: None,
            indentation_size: DEFAULT_INDENTATION_SIZE,
        }
    }
}
