//! The consolidated DiGA catalog produced from the four FHIR documents.
//!
//! These types are the JSON output of the adapter. Keys are camelCase and
//! absent optional values are omitted, so the serialized form stays close to
//! the FHIR source documents.

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The merged DiGA directory: one entry per CatalogEntry resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigaCatalog {
    #[serde(default)]
    pub entries: Vec<DigaEntry>,
}

impl DigaCatalog {
    /// Number of catalog entries with a resolved app.
    pub fn resolved_apps(&self) -> usize {
        self.entries.iter().filter(|e| e.app.is_some()).count()
    }
}

/// A listed digital health application, built from one CatalogEntry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigaEntry {
    /// Logical id of the CatalogEntry resource
    pub id: String,

    /// DiGA id from the CatalogEntry identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diga_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diga_id_system: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub entry_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub orderable: Option<bool>,

    /// Start of the listing period (FHIR date or dateTime)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listed_from: Option<String>,

    /// End of the listing period (FHIR date or dateTime)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listed_until: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<FixedOffset>>,

    /// The DeviceDefinition referenced by the entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<DigaApp>,
}

/// A DiGA application with its manufacturer, modules and prescription units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigaApp {
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<DeviceName>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<DeviceProperty>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<Manufacturer>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prescription_units: Vec<PrescriptionUnit>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<DigaModule>,
}

/// A DeviceDefinition whose `parentDevice` is the app.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigaModule {
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<DeviceName>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<DeviceProperty>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prescription_units: Vec<PrescriptionUnit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceName {
    pub name: String,
    /// FHIR device-nametype code, e.g. `user-friendly-name`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub name_type: Option<String>,
}

/// A DeviceDefinition property such as supported platforms or languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProperty {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// A prescribable unit (Verordnungseinheit), built from a ChargeItemDefinition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionUnit {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Pharmacy product number (PZN)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pzn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<Price>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Price component type (`base`, `surcharge`, `deduction`, ...)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Written as a JSON number
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// The manufacturer Organization of an app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manufacturer {
    pub id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecoms: Vec<Telecom>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Telecom {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}
