//! Rendering the catalog as JSON and writing it to its destination.

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use diga_verzeichnis::DigaCatalog;
use tracing::{debug, info};

use crate::cli::OutputTarget;
use crate::error::{AdapterError, AdapterResult};

/// Render the catalog as pretty-printed JSON.
pub fn render_catalog(catalog: &DigaCatalog) -> AdapterResult<String> {
    Ok(serde_json::to_string_pretty(catalog)?)
}

/// Write the rendered JSON to standard output or a file.
///
/// Standard output receives the document as is, without a trailing newline.
/// A file is created when missing and truncated otherwise.
pub fn write_output(target: &OutputTarget, json: &str) -> AdapterResult<()> {
    let result = match target {
        OutputTarget::Stdout => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_all(&mut handle, json)
        }
        OutputTarget::File(path) => write_file(path, json),
    };

    result.map_err(|source| AdapterError::Write {
        target: target.to_string(),
        source,
    })
}

fn write_file(path: &Path, json: &str) -> io::Result<()> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => {
            info!("File created: {}", path.display());
            file
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            info!(
                "File '{}' already exists. File will be overwritten.",
                path.display()
            );
            File::create(path)?
        }
        Err(e) => return Err(e),
    };

    write_all(&mut file, json)?;
    file.sync_all()?;
    debug!("Wrote {} bytes to {}", json.len(), path.display());
    Ok(())
}

fn write_all<W: Write>(writer: &mut W, json: &str) -> io::Result<()> {
    writer.write_all(json.as_bytes())?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use diga_verzeichnis::DigaEntry;
    use std::fs;
    use tempfile::TempDir;

    fn catalog() -> DigaCatalog {
        DigaCatalog {
            entries: vec![DigaEntry {
                id: "ce-1".to_string(),
                diga_id: Some("00451".to_string()),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_render_is_pretty_printed() {
        let json = render_catalog(&catalog()).unwrap();
        assert!(json.starts_with("{\n  \"entries\": ["));
        assert!(json.contains("\"digaId\": \"00451\""));
        assert!(!json.ends_with('\n'));
    }

    #[test]
    fn test_write_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.json");

        write_output(&OutputTarget::File(path.clone()), "{}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.json");
        fs::write(&path, "previous content that is longer").unwrap();

        write_output(&OutputTarget::File(path.clone()), "{\"entries\": []}").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"entries\": []}");
    }

    #[test]
    fn test_write_failure_names_target() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing-dir").join("out.json");

        let err = write_output(&OutputTarget::File(path), "{}").unwrap_err();
        assert!(matches!(err, AdapterError::Write { .. }));
        assert!(err.to_string().contains("out.json"));
    }

    #[test]
    fn test_write_all_to_buffer() {
        let mut buffer = Vec::new();
        write_all(&mut buffer, "{}").unwrap();
        assert_eq!(buffer, b"{}");
    }
}
