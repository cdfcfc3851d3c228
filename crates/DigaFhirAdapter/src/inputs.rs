//! Locating and opening the four input documents.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use diga_verzeichnis::{CatalogSources, DocumentKind};
use tracing::debug;

use crate::error::{AdapterError, AdapterResult};

/// Open the four input documents inside `input_dir`.
///
/// Fails on the first document that can not be opened. Documents opened
/// before the failure are closed again when the error is returned.
pub fn open_inputs(input_dir: &Path) -> AdapterResult<CatalogSources<BufReader<File>>> {
    let open = |kind: DocumentKind| -> AdapterResult<BufReader<File>> {
        let path = input_dir.join(kind.file_name());
        let file = File::open(&path).map_err(|source| AdapterError::MissingInput {
            path: path.clone(),
            source,
        })?;
        debug!("Opened {}", path.display());
        Ok(BufReader::new(file))
    };

    Ok(CatalogSources {
        catalog_entries: open(DocumentKind::CatalogEntries)?,
        device_definitions: open(DocumentKind::DeviceDefinitions)?,
        charge_item_definitions: open(DocumentKind::ChargeItemDefinitions)?,
        organizations: open(DocumentKind::Organizations)?,
    })
}
