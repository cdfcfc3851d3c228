//! # DiGA FHIR directory
//!
//! Reads the FHIR XML export of the German directory of digital health
//! applications (DiGA-Verzeichnis) and merges its four documents into a
//! single serializable [`DigaCatalog`].
//!
//! The export consists of four documents, each usually a FHIR `Bundle`:
//!
//! - `CatalogEntries.xml` - one `CatalogEntry` per listed DiGA
//! - `DeviceDefinitions.xml` - the apps and their modules
//! - `ChargeItemDefinitions.xml` - prescription units with PZN and price
//! - `Organizations.xml` - the manufacturers
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::fs::File;
//! use diga_verzeichnis::{CatalogSources, parse_catalog};
//!
//! let catalog = parse_catalog(CatalogSources {
//!     catalog_entries: File::open("export/CatalogEntries.xml")?,
//!     device_definitions: File::open("export/DeviceDefinitions.xml")?,
//!     charge_item_definitions: File::open("export/ChargeItemDefinitions.xml")?,
//!     organizations: File::open("export/Organizations.xml")?,
//! })?;
//!
//! println!("{}", serde_json::to_string_pretty(&catalog)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod document;
pub mod error;
pub mod fhir_xml;
pub mod model;
pub mod parser;
pub mod resources;

pub use document::DocumentKind;
pub use error::{DigaError, DigaResult};
pub use model::{
    Address, DeviceName, DeviceProperty, DigaApp, DigaCatalog, DigaEntry, DigaModule, Identifier,
    Manufacturer, Price, PrescriptionUnit, Telecom,
};
pub use parser::{CatalogSources, parse_catalog};
