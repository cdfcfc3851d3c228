//! The four FHIR documents that make up a DiGA catalog export.

use std::fmt;

/// One of the four input documents of the DiGA directory.
///
/// Each document is a FHIR XML file (usually a `Bundle`) holding resources of a
/// single type. The file names are fixed by the export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    CatalogEntries,
    DeviceDefinitions,
    ChargeItemDefinitions,
    Organizations,
}

impl DocumentKind {
    /// All document kinds, in the order they are opened and parsed.
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::CatalogEntries,
        DocumentKind::DeviceDefinitions,
        DocumentKind::ChargeItemDefinitions,
        DocumentKind::Organizations,
    ];

    /// File name of the document inside the input directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DocumentKind::CatalogEntries => "CatalogEntries.xml",
            DocumentKind::DeviceDefinitions => "DeviceDefinitions.xml",
            DocumentKind::ChargeItemDefinitions => "ChargeItemDefinitions.xml",
            DocumentKind::Organizations => "Organizations.xml",
        }
    }

    /// FHIR resource type carried by the document.
    pub fn resource_type(self) -> &'static str {
        match self {
            DocumentKind::CatalogEntries => "CatalogEntry",
            DocumentKind::DeviceDefinitions => "DeviceDefinition",
            DocumentKind::ChargeItemDefinitions => "ChargeItemDefinition",
            DocumentKind::Organizations => "Organization",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}
