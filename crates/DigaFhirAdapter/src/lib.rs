//! # DiGA FHIR adapter
//!
//! Command-line plumbing around [`diga_verzeichnis`]: resolves the arguments,
//! opens the four FHIR XML documents of a DiGA directory export, merges them
//! into one catalog and writes it as pretty-printed JSON to a file or to
//! standard output.
//!
//! ```bash
//! # writes ./DigaVerzeichnis.json
//! diga-api-fhir-adapter -in ./export
//!
//! # JSON to standard output, logs stay on standard error
//! diga-api-fhir-adapter --input-dir ./export --output-file -
//! ```

pub mod cli;
pub mod error;
pub mod inputs;
pub mod output;

use std::io::IsTerminal;

use diga_verzeichnis::parse_catalog;
use tracing::{error, info};

pub use cli::{Config, OutputTarget, UsageError, resolve_args, usage};
pub use error::{AdapterError, AdapterResult, EXIT_FAILURE, EXIT_SUCCESS};

/// Install the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Logs are written to standard
/// error so that standard output only ever carries the JSON document.
pub fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter(level).into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

/// Filter directive enabling `level` for the adapter binary and both crates.
pub fn log_filter(level: &str) -> String {
    format!(
        "diga_api_fhir_adapter={level},diga_fhir_adapter={level},diga_verzeichnis={level}"
    )
}

/// Convert the export in `config.input_dir` and write the JSON document.
///
/// A failure while writing the document is logged and does not fail the run.
pub fn run(config: &Config) -> AdapterResult<()> {
    info!(
        "Converting DiGA export in {} to {}",
        config.input_dir.display(),
        config.output
    );

    let sources = inputs::open_inputs(&config.input_dir)?;
    let catalog = parse_catalog(sources)?;
    let json = output::render_catalog(&catalog)?;

    if let Err(e) = output::write_output(&config.output, &json) {
        error!("{}", e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const EMPTY_BUNDLE: &str = r#"<Bundle xmlns="http://hl7.org/fhir"><type value="searchset"/></Bundle>"#;

    fn write_empty_export(dir: &Path) {
        for kind in diga_verzeichnis::DocumentKind::ALL {
            fs::write(dir.join(kind.file_name()), EMPTY_BUNDLE).unwrap();
        }
    }

    fn config(input_dir: &Path, output: OutputTarget) -> Config {
        Config {
            input_dir: input_dir.to_path_buf(),
            output,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_log_filter_covers_binary_target() {
        let filter = log_filter("warn");
        assert!(filter.contains("diga_api_fhir_adapter=warn"));
        assert!(filter.contains("diga_fhir_adapter=warn"));
        assert!(filter.contains("diga_verzeichnis=warn"));
    }

    #[test]
    fn test_run_writes_json_file() {
        let temp_dir = TempDir::new().unwrap();
        write_empty_export(temp_dir.path());
        let output_path = temp_dir.path().join("catalog.json");

        run(&config(temp_dir.path(), OutputTarget::File(output_path.clone()))).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!({ "entries": [] }));
    }

    #[test]
    fn test_run_fails_without_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let output_path = temp_dir.path().join("catalog.json");

        let err = run(&config(temp_dir.path(), OutputTarget::File(output_path.clone())))
            .unwrap_err();
        assert!(matches!(err, AdapterError::MissingInput { .. }));
        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert!(!output_path.exists());
    }

    #[test]
    fn test_run_reports_malformed_input() {
        let temp_dir = TempDir::new().unwrap();
        write_empty_export(temp_dir.path());
        fs::write(temp_dir.path().join("Organizations.xml"), "<Bundle>").unwrap();

        let err = run(&config(temp_dir.path(), OutputTarget::Stdout)).unwrap_err();
        assert!(matches!(err, AdapterError::Catalog(_)));
        assert!(err.to_string().contains("Organizations.xml"));
    }

    #[test]
    fn test_write_failure_does_not_fail_run() {
        let temp_dir = TempDir::new().unwrap();
        write_empty_export(temp_dir.path());
        let unwritable = PathBuf::from(temp_dir.path()).join("no-such-dir").join("out.json");

        assert!(run(&config(temp_dir.path(), OutputTarget::File(unwritable))).is_ok());
    }
}
