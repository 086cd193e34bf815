use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, ValueHint};
use serde::Serialize;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tidytree::changelog::record_change;
use tidytree::git::Git;
use tidytree::options::Setting;
use tidytree::{File, Normalizator, RawOptions, Severity, Walker, config, io};

#[derive(Debug, Parser)]
#[command(
    name = "tidytree",
    version,
    about = "Normalize line endings, whitespace, encodings, names and permissions in a tree"
)]
struct Cli {
    #[arg(value_name = "PATH", value_hint = ValueHint::AnyPath, default_value = ".")]
    paths: Vec<PathBuf>,
    /// Write the changes instead of only reporting them.
    #[arg(long, action = ArgAction::SetTrue)]
    fix: bool,
    /// Option file (YAML, or JSON by extension). Defaults to `.tidytree.yml`
    /// in the first path.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,
    /// Print a diff of every content change.
    #[arg(long, action = ArgAction::SetTrue)]
    diff: bool,
    #[arg(long, default_value_t = 3)]
    context: usize,
    /// One JSON object per report entry.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    /// Append committed changes to this JSONL file.
    #[arg(long = "change-log", value_name = "FILE", value_hint = ValueHint::FilePath)]
    change_log: Option<PathBuf>,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[command(flatten)]
    options: OptionArgs,
}

/// Normalization switches. Naming any of them disables the others unless
/// they are named too.
#[derive(Debug, Clone, Args)]
struct OptionArgs {
    #[arg(long, action = ArgAction::SetTrue)]
    encoding: bool,
    /// Target line ending: lf (default) or crlf.
    #[arg(long, value_name = "EOL", num_args = 0..=1)]
    eol: Option<Option<String>>,
    /// Leave lone CR bytes alone when unifying line endings. A kept CR right
    /// before a converted break reads as CRLF on the next run and is
    /// converted then.
    #[arg(long = "keep-cr", action = ArgAction::SetTrue)]
    keep_cr: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    extension: bool,
    /// Keep at most MAX final line breaks (default 1).
    #[arg(long = "final-eol", value_name = "MAX", num_args = 0..=1)]
    final_eol: Option<Option<usize>>,
    #[arg(long = "leading-eol", action = ArgAction::SetTrue)]
    leading_eol: bool,
    /// Keep at most MAX consecutive blank lines (default 1).
    #[arg(long = "middle-eol", value_name = "MAX", num_args = 0..=1)]
    middle_eol: Option<Option<usize>>,
    #[arg(long, action = ArgAction::SetTrue)]
    name: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    permissions: bool,
    #[arg(long = "space-before-tab", action = ArgAction::SetTrue)]
    space_before_tab: bool,
    #[arg(long = "trailing-whitespace", action = ArgAction::SetTrue)]
    trailing_whitespace: bool,
    /// Indentation style: space (default) or tab.
    #[arg(long, value_name = "STYLE", num_args = 0..=1)]
    indentation: Option<Option<String>>,
    #[arg(long = "indentation-size", value_name = "N")]
    indentation_size: Option<usize>,
}

impl OptionArgs {
    fn to_raw(&self) -> RawOptions {
        RawOptions {
            encoding: self.encoding.then_some(true),
            eol: self.eol.clone().map(setting),
            keep_cr: self.keep_cr.then_some(true),
            extension: self.extension.then_some(true),
            final_eol: self.final_eol.map(setting),
            leading_eol: self.leading_eol.then_some(true),
            middle_eol: self.middle_eol.map(setting),
            name: self.name.then_some(true),
            permissions: self.permissions.then_some(true),
            space_before_tab: self.space_before_tab.then_some(true),
            trailing_whitespace: self.trailing_whitespace.then_some(true),
            indentation: self.indentation.clone().map(setting),
            indentation_size: self.indentation_size,
        }
    }
}

fn setting<T>(value: Option<T>) -> Setting<T> {
    value.map_or(Setting::Default, Setting::Explicit)
}

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    path: &'a str,
    normalization: &'a str,
    severity: Severity,
    message: &'a str,
}

#[derive(Debug, Default)]
struct RunStats {
    checked: usize,
    clean: usize,
    fixable: usize,
    manual: usize,
    fixed: usize,
}

impl RunStats {
    fn print(&self, label: &str) {
        if self.checked == 0 {
            return;
        }
        println!(
            "{label} summary: checked={}, clean={}, fixable={}, manual={}, fixed={}",
            self.checked, self.clean, self.fixable, self.manual, self.fixed
        );
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            error!("{error:?}");
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let layer = fmt::layer().compact().with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry().with(layer).with(filter).init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let raw = load_options(&cli)?;
    let config = raw.resolve().context("invalid options")?;
    debug!(?config, "resolved configuration");

    let mut normalizator = Normalizator::with_git(config, Rc::new(Git::new()));
    let mut stats = RunStats::default();
    for root in &cli.paths {
        let walker = Walker::new(root)
            .exclude(&cli.exclude)
            .context("building exclude globs")?;
        for file in walker.files() {
            let mut file = file.with_context(|| format!("walking {}", root.display()))?;
            process(&cli, root, &mut normalizator, &mut file, &mut stats)?;
        }
    }

    stats.print("tidytree");
    if !cli.fix && stats.fixable > 0 && !cli.json {
        println!("dry-run: rerun with --fix to write these changes.");
    }
    let dirty = if cli.fix {
        stats.manual > 0
    } else {
        stats.fixable + stats.manual > 0
    };
    Ok(if dirty {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

/// Option file values overridden by the command line.
fn load_options(cli: &Cli) -> Result<RawOptions> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => cli.paths.first().and_then(|first| {
            let dir = if io::is_dir(first) {
                first.as_path()
            } else {
                first.parent().unwrap_or_else(|| Path::new("."))
            };
            config::discover(dir)
        }),
    };
    let from_file = match path {
        Some(path) => config::load(&path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => RawOptions::default(),
    };
    Ok(from_file.merge(cli.options.to_raw()))
}

fn shown_path(root: &Path, file: &File) -> String {
    if io::is_dir(root) {
        root.join(file.relative()).display().to_string()
    } else {
        root.display().to_string()
    }
}

fn process(
    cli: &Cli,
    root: &Path,
    normalizator: &mut Normalizator,
    file: &mut File,
    stats: &mut RunStats,
) -> Result<()> {
    stats.checked += 1;
    normalizator
        .normalize(file)
        .with_context(|| format!("normalizing {}", file.display_path()))?;
    if normalizator.is_normalized(file) {
        stats.clean += 1;
        return Ok(());
    }

    let shown = shown_path(root, file);
    let entries = normalizator.reporter().entries(file.path()).to_vec();
    for entry in &entries {
        if cli.json {
            let row = ReportRow {
                path: &shown,
                normalization: entry.normalization,
                severity: entry.severity,
                message: &entry.message,
            };
            println!("{}", serde_json::to_string(&row)?);
        } else {
            println!(
                "{shown}: [{}] {} ({})",
                entry.normalization, entry.message, entry.severity
            );
        }
    }
    if cli.diff && !cli.json {
        if let Some(diff) = file.diff(cli.context)? {
            println!("--- preview: {shown} ---");
            print!("{diff}");
        }
    }

    let manual = entries.iter().any(|entry| entry.severity == Severity::Manual);
    let fixable = entries.iter().any(|entry| entry.severity == Severity::Fixable);
    if manual {
        stats.manual += 1;
    }
    if fixable {
        stats.fixable += 1;
    }
    if !cli.fix || !fixable {
        return Ok(());
    }

    let original = file.path().to_path_buf();
    let written = normalizator
        .save(file)
        .with_context(|| format!("writing {shown}"))?;
    if written {
        stats.fixed += 1;
        if let Some(log) = &cli.change_log {
            let changes: Vec<String> = entries
                .iter()
                .filter(|entry| entry.severity == Severity::Fixable)
                .map(|entry| format!("{}: {}", entry.normalization, entry.message))
                .collect();
            record_change(log, &original, "fixed", &changes)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_flags_ask_for_defaults() {
        let cli = Cli::parse_from(["tidytree", "--final-eol", "--eol", "crlf", "src"]);
        let raw = cli.options.to_raw();
        assert_eq!(raw.final_eol, Some(Setting::Default));
        assert_eq!(raw.eol, Some(Setting::Explicit("crlf".to_string())));
        assert_eq!(raw.name, None);
        assert_eq!(cli.paths, vec![PathBuf::from("src")]);
    }

    #[test]
    fn no_flags_leave_options_unset() {
        let cli = Cli::parse_from(["tidytree"]);
        let config = cli.options.to_raw().resolve().expect("defaults");
        assert_eq!(config, tidytree::Config::default());
        assert_eq!(cli.paths, vec![PathBuf::from(".")]);
    }

    #[test]
    fn keep_cr_help_mentions_follow_up_run() {
        use clap::CommandFactory;

        let command = Cli::command();
        let help = command
            .get_arguments()
            .find(|arg| arg.get_id() == "keep_cr")
            .and_then(|arg| arg.get_help())
            .map(ToString::to_string)
            .expect("keep-cr help");
        assert!(help.contains("next run"));
    }

    #[test]
    fn explicit_max_values_parsed() {
        let cli = Cli::parse_from(["tidytree", "--middle-eol", "2", "--keep-cr"]);
        let config = cli.options.to_raw().resolve().expect("config");
        assert_eq!(config.middle_eol, Some(2));
        assert!(config.keep_cr);
        assert_eq!(config.final_eol, None);
    }
}
