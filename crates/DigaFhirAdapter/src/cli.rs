//! # Command line handling
//!
//! ## Command Line Options
//!
//! ```text
//! -h,  --help                 prints the help
//! -in, --input-dir <DIR>      directory with FHIR XML-input files (required)
//! -out, --output-file <FILE>  output file for combined json data,
//!                             - for stdout, default 'DigaVerzeichnis.json'
//!      --log-level <LEVEL>    log level when RUST_LOG is unset [env: DIGA_LOG_LEVEL]
//! ```
//!
//! The single-dash long forms `-in` and `-out` are rewritten to their
//! double-dash equivalents before the arguments reach clap.
//!
//! Any usage problem (help requested, `--input-dir` missing, unknown options,
//! leftover arguments) is returned as a [`UsageError`]. The binary prints the
//! help text for all of them and exits successfully.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use thiserror::Error;

/// Output file used when `--output-file` is not given.
pub const DEFAULT_OUTPUT_FILE: &str = "DigaVerzeichnis.json";

/// `--output-file` value selecting standard output.
pub const STDOUT_MARKER: &str = "-";

/// Log level used when neither `RUST_LOG` nor `--log-level` is given.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable read for the log level.
pub const LOG_LEVEL_ENV: &str = "DIGA_LOG_LEVEL";

#[derive(Parser, Debug)]
#[command(name = "diga-api-fhir-adapter")]
#[command(about = "Combines the FHIR XML export of the DiGA directory into one JSON document")]
#[command(override_usage = "diga-api-fhir-adapter [options]")]
#[command(disable_help_flag = true)]
#[command(
    after_help = "The single-dash forms -in and -out are accepted for --input-dir and --output-file."
)]
pub struct Args {
    /// prints the help
    #[arg(short = 'h', long = "help")]
    pub help: bool,

    /// directory with FHIR XML-input files (also -in)
    #[arg(long = "input-dir", value_name = "DIR")]
    pub input_dir: Option<String>,

    /// output file for combined json data, - for stdout, default 'DigaVerzeichnis.json' (also -out)
    #[arg(long = "output-file", value_name = "FILE", allow_hyphen_values = true)]
    pub output_file: Option<String>,

    /// log level used when RUST_LOG is not set
    #[arg(long, env = LOG_LEVEL_ENV, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// arguments left over after the options
    #[arg(hide = true)]
    pub leftover: Vec<String>,
}

/// Where the combined JSON document is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// Resolve the `--output-file` value, falling back to [`DEFAULT_OUTPUT_FILE`].
    pub fn from_arg(value: Option<&str>) -> Self {
        match value {
            Some(STDOUT_MARKER) => OutputTarget::Stdout,
            Some(path) if !path.is_empty() => OutputTarget::File(PathBuf::from(path)),
            _ => OutputTarget::File(PathBuf::from(DEFAULT_OUTPUT_FILE)),
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputTarget::Stdout => f.write_str("standard output"),
            OutputTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Resolved settings of one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub output: OutputTarget,
    pub log_level: String,
}

/// Reasons to print the usage text instead of converting.
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Help requested")]
    HelpRequested,

    #[error("Missing required option: input-dir")]
    MissingInputDir,

    #[error("Unexpected arguments: {}", .0.join(" "))]
    UnexpectedArguments(Vec<String>),

    #[error("Parsing failed. Reason: {0}")]
    Invalid(String),
}

impl UsageError {
    /// Whether the problem should be logged before the help text is shown.
    pub fn is_error(&self) -> bool {
        !matches!(self, UsageError::HelpRequested)
    }
}

/// Rewrite the single-dash long options `-in` and `-out` to `--input-dir` and
/// `--output-file`. Arguments after `--` are left untouched.
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            match text {
                "-in" => OsString::from("--input-dir"),
                "-out" => OsString::from("--output-file"),
                _ => {
                    if let Some(value) = text.strip_prefix("-in=") {
                        OsString::from(format!("--input-dir={}", value))
                    } else if let Some(value) = text.strip_prefix("-out=") {
                        OsString::from(format!("--output-file={}", value))
                    } else {
                        arg
                    }
                }
            }
        })
        .collect()
}

/// Resolve the process arguments (including the program name) into a [`Config`].
pub fn resolve_args<I, T>(args: I) -> Result<Config, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args = Args::try_parse_from(normalize_legacy_flags(args))
        .map_err(|e| UsageError::Invalid(clap_reason(&e)))?;

    if args.help {
        return Err(UsageError::HelpRequested);
    }

    let input_dir = match args.input_dir {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => return Err(UsageError::MissingInputDir),
    };

    if !args.leftover.is_empty() {
        return Err(UsageError::UnexpectedArguments(args.leftover));
    }

    Ok(Config {
        input_dir,
        output: OutputTarget::from_arg(args.output_file.as_deref()),
        log_level: args.log_level,
    })
}

/// First line of a clap error without its `error: ` prefix.
fn clap_reason(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

/// Log level for runs whose arguments could not be resolved.
///
/// Reads [`LOG_LEVEL_ENV`] and falls back to [`DEFAULT_LOG_LEVEL`].
pub fn fallback_log_level() -> String {
    log_level_or_default(std::env::var(LOG_LEVEL_ENV).ok())
}

fn log_level_or_default(value: Option<String>) -> String {
    value
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// The help text printed for every [`UsageError`].
pub fn usage() -> String {
    Args::command().render_help().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(args: &[&str]) -> Result<Config, UsageError> {
        let mut full = vec!["diga-api-fhir-adapter"];
        full.extend_from_slice(args);
        resolve_args(full)
    }

    #[test]
    fn test_legacy_flags_are_rewritten() {
        let normalized = normalize_legacy_flags(["prog", "-in", "data", "-out=-", "--", "-in"]);
        assert_eq!(
            normalized,
            vec!["prog", "--input-dir", "data", "--output-file=-", "--", "-in"]
        );
    }

    #[test]
    fn test_legacy_input_dir_with_default_output() {
        let config = resolve(&["-in", "export"]).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("export"));
        assert_eq!(
            config.output,
            OutputTarget::File(PathBuf::from(DEFAULT_OUTPUT_FILE))
        );
    }

    #[test]
    fn test_long_flags_and_stdout() {
        let config = resolve(&["--input-dir", "export", "--output-file", "-"]).unwrap();
        assert_eq!(config.output, OutputTarget::Stdout);

        let config = resolve(&["-in=export", "-out", "catalog.json"]).unwrap();
        assert_eq!(
            config.output,
            OutputTarget::File(PathBuf::from("catalog.json"))
        );
    }

    #[test]
    fn test_help_wins_over_other_arguments() {
        assert!(matches!(
            resolve(&["-in", "export", "-h"]),
            Err(UsageError::HelpRequested)
        ));
        assert!(matches!(resolve(&["--help"]), Err(UsageError::HelpRequested)));
    }

    #[test]
    fn test_missing_input_dir() {
        assert!(matches!(resolve(&[]), Err(UsageError::MissingInputDir)));
        assert!(matches!(
            resolve(&["-out", "x.json"]),
            Err(UsageError::MissingInputDir)
        ));
        assert!(matches!(
            resolve(&["-in", ""]),
            Err(UsageError::MissingInputDir)
        ));
    }

    #[test]
    fn test_leftover_arguments() {
        let err = resolve(&["-in", "export", "stray"]).unwrap_err();
        assert!(matches!(err, UsageError::UnexpectedArguments(ref v) if v == &["stray"]));
        assert!(err.is_error());
    }

    #[test]
    fn test_unknown_option_is_invalid() {
        let err = resolve(&["-in", "export", "--verbose"]).unwrap_err();
        assert!(matches!(err, UsageError::Invalid(_)));
        assert!(err.to_string().starts_with("Parsing failed. Reason:"));
    }

    #[test]
    fn test_output_target_from_arg() {
        assert_eq!(OutputTarget::from_arg(Some("-")), OutputTarget::Stdout);
        assert_eq!(
            OutputTarget::from_arg(Some("")),
            OutputTarget::File(PathBuf::from(DEFAULT_OUTPUT_FILE))
        );
        assert_eq!(OutputTarget::Stdout.to_string(), "standard output");
    }

    #[test]
    fn test_usage_mentions_options() {
        let text = usage();
        assert!(text.contains("--input-dir"));
        assert!(text.contains("--output-file"));
        assert!(text.contains("-in and -out"));
        assert!(text.contains("(also -in)"));
        assert!(text.contains("(also -out)"));
    }

    #[test]
    fn test_log_level_fallback() {
        assert_eq!(log_level_or_default(Some("debug".to_string())), "debug");
        assert_eq!(log_level_or_default(Some("  ".to_string())), DEFAULT_LOG_LEVEL);
        assert_eq!(log_level_or_default(None), DEFAULT_LOG_LEVEL);
    }
}
