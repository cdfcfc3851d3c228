//! Typed views of the FHIR resources read from the input documents.
//!
//! Only the elements that end up in the catalog are read. Unknown elements,
//! extensions and narrative are ignored.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use roxmltree::Node;
use rust_decimal::Decimal;
use tracing::warn;

use crate::document::DocumentKind;
use crate::error::{DigaError, DigaResult};
use crate::fhir_xml::{
    Reference, ResourceNode, child, children, concept_code, concept_text, primitive, value,
    value_at, values,
};
use crate::model::{Address, DeviceName, DeviceProperty, Identifier, Manufacturer, Price, Telecom};

/// Common accessors used to index resources for reference resolution.
pub trait FhirResource: Sized {
    /// The document the resource type is read from.
    const DOCUMENT: DocumentKind;

    /// Build the resource from its XML element.
    ///
    /// Returns `Ok(None)` for resources that can not be referenced at all
    /// (neither `id` nor Bundle `fullUrl`).
    fn from_node(resource: &ResourceNode<'_, '_>) -> DigaResult<Option<Self>>;

    fn id(&self) -> &str;

    fn full_url(&self) -> Option<&str>;
}

/// Logical id of a resource, falling back to the Bundle entry `fullUrl`.
fn resource_key(
    resource: &ResourceNode<'_, '_>,
    document: DocumentKind,
) -> Option<(String, Option<String>)> {
    let full_url = resource.full_url.map(str::to_string);
    match value(resource.node, "id") {
        Some(id) => Some((id.to_string(), full_url)),
        None => match full_url {
            Some(url) => Some((url.clone(), Some(url))),
            None => {
                warn!(
                    "Skipping {} without id in {}",
                    document.resource_type(),
                    document
                );
                None
            }
        },
    }
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

fn identifiers(node: Node<'_, '_>) -> Vec<Identifier> {
    children(node, "identifier")
        .map(|i| Identifier {
            system: owned(value(i, "system")),
            value: owned(value(i, "value")),
        })
        .filter(|i| i.system.is_some() || i.value.is_some())
        .collect()
}

fn last_updated(
    node: Node<'_, '_>,
    document: DocumentKind,
    id: &str,
) -> Option<DateTime<FixedOffset>> {
    let raw = value_at(node, &["meta", "lastUpdated"])?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts),
        Err(e) => {
            warn!(
                "Ignoring invalid meta.lastUpdated '{}' of {}/{} in {}: {}",
                raw,
                document.resource_type(),
                id,
                document,
                e
            );
            None
        }
    }
}

/// A CatalogEntry listing one DiGA.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntryResource {
    pub id: String,
    pub full_url: Option<String>,
    pub last_updated: Option<DateTime<FixedOffset>>,
    pub identifier: Option<Identifier>,
    pub entry_type: Option<String>,
    pub status: Option<String>,
    pub orderable: Option<bool>,
    pub referenced_item: Option<Reference>,
    pub validity_start: Option<String>,
    pub validity_end: Option<String>,
    pub valid_to: Option<String>,
}

impl FhirResource for CatalogEntryResource {
    const DOCUMENT: DocumentKind = DocumentKind::CatalogEntries;

    fn from_node(resource: &ResourceNode<'_, '_>) -> DigaResult<Option<Self>> {
        let Some((id, full_url)) = resource_key(resource, Self::DOCUMENT) else {
            return Ok(None);
        };
        let node = resource.node;

        let orderable = match value(node, "orderable") {
            Some("true") => Some(true),
            Some("false") => Some(false),
            Some(other) => {
                return Err(DigaError::InvalidValue {
                    document: Self::DOCUMENT,
                    element: format!("CatalogEntry/{}.orderable", id),
                    value: other.to_string(),
                });
            }
            None => None,
        };

        Ok(Some(CatalogEntryResource {
            last_updated: last_updated(node, Self::DOCUMENT, &id),
            identifier: identifiers(node).into_iter().next(),
            entry_type: child(node, "type").and_then(concept_text),
            status: owned(value(node, "status")),
            orderable,
            referenced_item: Reference::from_child(node, "referencedItem"),
            validity_start: owned(value_at(node, &["validityPeriod", "start"])),
            validity_end: owned(value_at(node, &["validityPeriod", "end"])),
            valid_to: owned(value(node, "validTo")),
            id,
            full_url,
        }))
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn full_url(&self) -> Option<&str> {
        self.full_url.as_deref()
    }
}

/// A DeviceDefinition describing a DiGA app or one of its modules.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDefinitionResource {
    pub id: String,
    pub full_url: Option<String>,
    pub identifiers: Vec<Identifier>,
    pub names: Vec<DeviceName>,
    pub version: Option<String>,
    pub properties: Vec<DeviceProperty>,
    pub manufacturer: Option<Reference>,
    pub parent_device: Option<Reference>,
}

fn device_property(node: Node<'_, '_>) -> DeviceProperty {
    let mut values: Vec<String> = children(node, "valueCode")
        .filter_map(concept_text)
        .collect();
    for quantity in children(node, "valueQuantity") {
        match (value(quantity, "value"), value(quantity, "unit")) {
            (Some(v), Some(unit)) => values.push(format!("{} {}", v, unit)),
            (Some(v), None) => values.push(v.to_string()),
            _ => {}
        }
    }

    DeviceProperty {
        property_type: child(node, "type").and_then(concept_text),
        values,
    }
}

impl FhirResource for DeviceDefinitionResource {
    const DOCUMENT: DocumentKind = DocumentKind::DeviceDefinitions;

    fn from_node(resource: &ResourceNode<'_, '_>) -> DigaResult<Option<Self>> {
        let Some((id, full_url)) = resource_key(resource, Self::DOCUMENT) else {
            return Ok(None);
        };
        let node = resource.node;

        let names = children(node, "deviceName")
            .filter_map(|n| {
                value(n, "name").map(|name| DeviceName {
                    name: name.to_string(),
                    name_type: owned(value(n, "type")),
                })
            })
            .collect();

        // R4 carries version as a plain string, R5 as a backbone element
        let version = child(node, "version").and_then(|v| {
            primitive(v).or_else(|| value(v, "value")).map(str::to_string)
        });

        Ok(Some(DeviceDefinitionResource {
            identifiers: identifiers(node),
            names,
            version,
            properties: children(node, "property").map(device_property).collect(),
            manufacturer: Reference::from_child(node, "manufacturerReference"),
            parent_device: Reference::from_child(node, "parentDevice"),
            id,
            full_url,
        }))
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn full_url(&self) -> Option<&str> {
        self.full_url.as_deref()
    }
}

/// A ChargeItemDefinition describing a prescription unit and its price.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeItemDefinitionResource {
    pub id: String,
    pub full_url: Option<String>,
    pub url: Option<String>,
    pub pzn: Option<String>,
    pub title: Option<String>,
    pub status: Option<String>,
    pub instances: Vec<Reference>,
    pub prices: Vec<Price>,
}

impl FhirResource for ChargeItemDefinitionResource {
    const DOCUMENT: DocumentKind = DocumentKind::ChargeItemDefinitions;

    fn from_node(resource: &ResourceNode<'_, '_>) -> DigaResult<Option<Self>> {
        let Some((id, full_url)) = resource_key(resource, Self::DOCUMENT) else {
            return Ok(None);
        };
        let node = resource.node;

        let mut prices = Vec::new();
        for group in children(node, "propertyGroup") {
            for component in children(group, "priceComponent") {
                let amount = match value_at(component, &["amount", "value"]) {
                    Some(raw) => Some(Decimal::from_str(raw).map_err(|_| {
                        DigaError::InvalidValue {
                            document: Self::DOCUMENT,
                            element: format!("ChargeItemDefinition/{}.priceComponent.amount", id),
                            value: raw.to_string(),
                        }
                    })?),
                    None => None,
                };
                prices.push(Price {
                    price_type: owned(value(component, "type")),
                    code: child(component, "code").and_then(concept_code),
                    amount,
                    currency: owned(value_at(component, &["amount", "currency"])),
                });
            }
        }

        Ok(Some(ChargeItemDefinitionResource {
            url: owned(value(node, "url")),
            pzn: identifiers(node).into_iter().find_map(|i| i.value),
            title: owned(value(node, "title")),
            status: owned(value(node, "status")),
            instances: children(node, "instance")
                .filter_map(Reference::from_element)
                .collect(),
            prices,
            id,
            full_url,
        }))
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn full_url(&self) -> Option<&str> {
        self.full_url.as_deref()
    }
}

/// An Organization, the manufacturer of one or more apps.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationResource {
    pub full_url: Option<String>,
    pub manufacturer: Manufacturer,
}

fn address(node: Node<'_, '_>) -> Address {
    Address {
        lines: values(node, "line"),
        postal_code: owned(value(node, "postalCode")),
        city: owned(value(node, "city")),
        country: owned(value(node, "country")),
    }
}

impl FhirResource for OrganizationResource {
    const DOCUMENT: DocumentKind = DocumentKind::Organizations;

    fn from_node(resource: &ResourceNode<'_, '_>) -> DigaResult<Option<Self>> {
        let Some((id, full_url)) = resource_key(resource, Self::DOCUMENT) else {
            return Ok(None);
        };
        let node = resource.node;

        let telecoms = children(node, "telecom")
            .map(|t| Telecom {
                system: owned(value(t, "system")),
                value: owned(value(t, "value")),
            })
            .filter(|t| t.value.is_some())
            .collect();

        Ok(Some(OrganizationResource {
            full_url,
            manufacturer: Manufacturer {
                id,
                identifiers: identifiers(node),
                name: owned(value(node, "name")),
                aliases: values(node, "alias"),
                telecoms,
                addresses: children(node, "address").map(address).collect(),
            },
        }))
    }

    fn id(&self) -> &str {
        &self.manufacturer.id
    }

    fn full_url(&self) -> Option<&str> {
        self.full_url.as_deref()
    }
}
