//! Runs the enabled normalizations over files in a fixed order.

use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::eol::Eol;
use crate::error::{Error, Result};
use crate::file::File;
use crate::filter::FilterManager;
use crate::git::Git;
use crate::io;
use crate::normalization::{
    EncodingNormalization, EolNormalization, ExtensionNormalization, FinalEolNormalization,
    IndentationNormalization, LeadingEolNormalization, MiddleEolNormalization, NameNormalization,
    Normalization, NormalizationKind, PermissionsNormalization, Presets,
    SpaceBeforeTabNormalization, TrailingWhitespaceNormalization, resolve_collision,
};
use crate::options::Config;
use crate::report::Reporter;

pub struct Normalizator {
    config: Config,
    filters: FilterManager,
    units: Vec<Box<dyn Normalization>>,
    reporter: Reporter,
    processed: HashSet<PathBuf>,
}

impl Normalizator {
    pub fn new(config: Config) -> Self {
        Self::with_git(config, Rc::new(Git::new()))
    }

    pub fn with_git(config: Config, git: Rc<Git>) -> Self {
        let presets = Presets::for_umask(io::umask());
        Self::with_presets(config, git, presets)
    }

    pub fn with_presets(config: Config, git: Rc<Git>, presets: Presets) -> Self {
        let units = build_units(&config, &git, presets);
        debug!(
            units = ?units.iter().map(|unit| unit.kind().name()).collect::<Vec<_>>(),
            "normalizations enabled"
        );
        Self {
            config,
            filters: FilterManager::new(git),
            units,
            reporter: Reporter::new(),
            processed: HashSet::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Run every enabled normalization on `file`. A path is normalized once
    /// per run; later calls do nothing.
    pub fn normalize(&mut self, file: &mut File) -> Result<()> {
        if !self.processed.insert(file.path().to_path_buf()) {
            return Ok(());
        }
        for unit in &self.units {
            if unit.kind() == NormalizationKind::LeadingEol
                && !leading_eol_allowed(&self.config, file)?
            {
                debug!(path = %file.display_path(), "leading-eol skipped for blank content");
                continue;
            }
            unit.normalize(file, &self.filters, &mut self.reporter)?;
        }
        Ok(())
    }

    /// True when no normalization reported anything for `file`.
    pub fn is_normalized(&self, file: &File) -> bool {
        !self.reporter.has_entries(file.path())
    }

    /// Normalize `file` if not done yet, then write its pending state.
    /// Returns whether anything was written.
    pub fn save(&mut self, file: &mut File) -> Result<bool> {
        self.normalize(file)?;
        if !file.has_changed() {
            return Ok(false);
        }
        match file.commit() {
            Ok(()) => {}
            Err(Error::RenameTargetExists { to, .. }) => {
                let name = resolve_collision(file, file.stem(), file.extension());
                warn!(
                    path = %file.display_path(),
                    taken = %to.display(),
                    %name,
                    "rename target appeared, using another name"
                );
                file.set_pending_name(name);
                file.commit()?;
            }
            Err(err) => return Err(err),
        }
        Ok(true)
    }
}

/// Leading breaks are kept when final-eol has reduced the content to blank
/// lines it decided to keep.
fn leading_eol_allowed(config: &Config, file: &File) -> Result<bool> {
    if config.final_eol.is_none() || !file.is_file()? {
        return Ok(true);
    }
    Ok(!file.pending_content()?.trim_ascii().is_empty())
}

fn build_units(config: &Config, git: &Rc<Git>, presets: Presets) -> Vec<Box<dyn Normalization>> {
    let mut units: Vec<Box<dyn Normalization>> = Vec::new();
    if config.encoding {
        units.push(Box::new(EncodingNormalization));
    }
    if config.trailing_whitespace {
        units.push(Box::new(TrailingWhitespaceNormalization));
    }
    if let Some(max) = config.final_eol {
        let default = config.eol.unwrap_or(Eol::Lf);
        units.push(Box::new(FinalEolNormalization::new(max, default)));
    }
    if let Some(target) = config.eol {
        units.push(Box::new(EolNormalization::new(
            target,
            config.keep_cr,
            Rc::clone(git),
        )));
    }
    if config.leading_eol {
        units.push(Box::new(LeadingEolNormalization));
    }
    if let Some(max) = config.middle_eol {
        units.push(Box::new(MiddleEolNormalization::new(max)));
    }
    if config.space_before_tab {
        units.push(Box::new(SpaceBeforeTabNormalization));
    }
    if let Some(target) = config.indentation {
        units.push(Box::new(IndentationNormalization::new(
            target,
            config.indentation_size,
        )));
    }
    if config.extension {
        units.push(Box::new(ExtensionNormalization));
    }
    if config.name {
        units.push(Box::new(NameNormalization));
    }
    if config.permissions {
        units.push(Box::new(PermissionsNormalization::new(
            presets,
            Rc::clone(git),
        )));
    }
    units
}
