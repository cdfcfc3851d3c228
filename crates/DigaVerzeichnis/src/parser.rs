//! Cross-referencing of the four FHIR documents into a [`DigaCatalog`].
//!
//! The documents reference each other by literal FHIR references:
//!
//! ```text
//! CatalogEntry.referencedItem           -> DeviceDefinition (the app)
//! DeviceDefinition.parentDevice         -> DeviceDefinition (module -> app)
//! DeviceDefinition.manufacturerReference -> Organization
//! ChargeItemDefinition.instance         -> DeviceDefinition (app or module)
//! ```
//!
//! References are resolved by Bundle `fullUrl` first and by logical id second.
//! A reference that resolves to nothing is logged and left empty in the output.

use std::collections::HashMap;
use std::io::Read;

use tracing::{debug, info, warn};

use crate::document::DocumentKind;
use crate::error::{DigaError, DigaResult};
use crate::fhir_xml::{self, Reference};
use crate::model::{DigaApp, DigaCatalog, DigaEntry, DigaModule, PrescriptionUnit};
use crate::resources::{
    CatalogEntryResource, ChargeItemDefinitionResource, DeviceDefinitionResource, FhirResource,
    OrganizationResource,
};

/// The four input streams of one catalog conversion.
///
/// Every stream is read to the end by [`parse_catalog`] and dropped before it
/// returns, on success and on error.
#[derive(Debug)]
pub struct CatalogSources<R> {
    pub catalog_entries: R,
    pub device_definitions: R,
    pub charge_item_definitions: R,
    pub organizations: R,
}

/// Read the four documents and merge them into one catalog.
///
/// # Errors
///
/// Fails if a stream can not be read, a document is not well-formed XML, a
/// document root is neither a `Bundle` nor the expected resource, or a value
/// the catalog depends on (prices, `orderable`) is malformed.
pub fn parse_catalog<R: Read>(sources: CatalogSources<R>) -> DigaResult<DigaCatalog> {
    let catalog_text = read_document(sources.catalog_entries, DocumentKind::CatalogEntries)?;
    let device_text = read_document(sources.device_definitions, DocumentKind::DeviceDefinitions)?;
    let charge_text = read_document(
        sources.charge_item_definitions,
        DocumentKind::ChargeItemDefinitions,
    )?;
    let organization_text = read_document(sources.organizations, DocumentKind::Organizations)?;

    let entries = read_resources::<CatalogEntryResource>(&catalog_text)?;
    let devices = ResourceIndex::new(read_resources::<DeviceDefinitionResource>(&device_text)?);
    let charge_items =
        ResourceIndex::new(read_resources::<ChargeItemDefinitionResource>(&charge_text)?);
    let organizations =
        ResourceIndex::new(read_resources::<OrganizationResource>(&organization_text)?);

    let linker = CatalogLinker::new(&devices, &charge_items, &organizations);
    let catalog = DigaCatalog {
        entries: entries.iter().map(|entry| linker.entry(entry)).collect(),
    };

    info!(
        "Parsed {} catalog entries ({} with app), {} device definitions, {} charge item definitions, {} organizations",
        catalog.entries.len(),
        catalog.resolved_apps(),
        devices.len(),
        charge_items.len(),
        organizations.len()
    );

    Ok(catalog)
}

fn read_document<R: Read>(mut reader: R, document: DocumentKind) -> DigaResult<String> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| DigaError::Read { document, source })?;
    debug!("Read {} bytes from {}", bytes.len(), document);
    String::from_utf8(bytes).map_err(|source| DigaError::Encoding { document, source })
}

fn read_resources<T: FhirResource>(text: &str) -> DigaResult<Vec<T>> {
    let doc = fhir_xml::parse_document(text, T::DOCUMENT)?;
    let mut items = Vec::new();
    for resource in fhir_xml::resources(&doc, T::DOCUMENT)? {
        if let Some(item) = T::from_node(&resource)? {
            items.push(item);
        }
    }
    Ok(items)
}

/// Resources of one type, addressable by logical id and Bundle `fullUrl`.
struct ResourceIndex<T> {
    items: Vec<T>,
    by_id: HashMap<String, usize>,
    by_full_url: HashMap<String, usize>,
}

impl<T: FhirResource> ResourceIndex<T> {
    /// Index the resources, keeping the first of several resources sharing an id.
    fn new(resources: Vec<T>) -> Self {
        let mut items = Vec::with_capacity(resources.len());
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut by_full_url: HashMap<String, usize> = HashMap::new();

        for resource in resources {
            if by_id.contains_key(resource.id()) {
                warn!(
                    "Ignoring duplicate {}/{} in {}",
                    T::DOCUMENT.resource_type(),
                    resource.id(),
                    T::DOCUMENT
                );
                continue;
            }
            let index = items.len();
            by_id.insert(resource.id().to_string(), index);
            if let Some(url) = resource.full_url() {
                by_full_url.entry(url.to_string()).or_insert(index);
            }
            items.push(resource);
        }

        ResourceIndex {
            items,
            by_id,
            by_full_url,
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn position(&self, reference: &Reference) -> Option<usize> {
        self.by_full_url
            .get(reference.as_str())
            .or_else(|| {
                reference
                    .target_id(T::DOCUMENT.resource_type())
                    .and_then(|id| self.by_id.get(id))
            })
            .copied()
    }

    /// Resolve a reference, logging when it points at nothing.
    fn resolve(&self, reference: &Reference, referrer: &str) -> Option<(usize, &T)> {
        match self.position(reference) {
            Some(index) => Some((index, &self.items[index])),
            None => {
                warn!(
                    "{} references unknown {} '{}'",
                    referrer,
                    T::DOCUMENT.resource_type(),
                    reference.as_str()
                );
                None
            }
        }
    }
}

/// Pre-computed relations between the indexed resources.
struct CatalogLinker<'a> {
    devices: &'a ResourceIndex<DeviceDefinitionResource>,
    charge_items: &'a ResourceIndex<ChargeItemDefinitionResource>,
    organizations: &'a ResourceIndex<OrganizationResource>,
    /// Device index -> indices of its module devices, in document order
    modules: HashMap<usize, Vec<usize>>,
    /// Device index -> indices of the charge items naming it as instance
    units: HashMap<usize, Vec<usize>>,
}

impl<'a> CatalogLinker<'a> {
    fn new(
        devices: &'a ResourceIndex<DeviceDefinitionResource>,
        charge_items: &'a ResourceIndex<ChargeItemDefinitionResource>,
        organizations: &'a ResourceIndex<OrganizationResource>,
    ) -> Self {
        let mut modules: HashMap<usize, Vec<usize>> = HashMap::new();
        for (index, device) in devices.items.iter().enumerate() {
            let Some(parent) = &device.parent_device else {
                continue;
            };
            let referrer = format!("DeviceDefinition/{}", device.id);
            match devices.resolve(parent, &referrer) {
                Some((parent_index, _)) if parent_index == index => {
                    warn!("{} names itself as parentDevice", referrer);
                }
                Some((parent_index, _)) => modules.entry(parent_index).or_default().push(index),
                None => {}
            }
        }

        let mut units: HashMap<usize, Vec<usize>> = HashMap::new();
        for (index, item) in charge_items.items.iter().enumerate() {
            let referrer = format!("ChargeItemDefinition/{}", item.id);
            if item.instances.is_empty() {
                debug!("{} has no instance reference", referrer);
            }
            for instance in &item.instances {
                if let Some((device_index, _)) = devices.resolve(instance, &referrer) {
                    let list = units.entry(device_index).or_default();
                    if !list.contains(&index) {
                        list.push(index);
                    }
                }
            }
        }

        CatalogLinker {
            devices,
            charge_items,
            organizations,
            modules,
            units,
        }
    }

    fn entry(&self, entry: &CatalogEntryResource) -> DigaEntry {
        let referrer = format!("CatalogEntry/{}", entry.id);
        let app = match &entry.referenced_item {
            Some(reference) => self
                .devices
                .resolve(reference, &referrer)
                .map(|(index, device)| self.app(index, device)),
            None => {
                warn!("{} has no referencedItem", referrer);
                None
            }
        };

        DigaEntry {
            id: entry.id.clone(),
            diga_id: entry.identifier.as_ref().and_then(|i| i.value.clone()),
            diga_id_system: entry.identifier.as_ref().and_then(|i| i.system.clone()),
            entry_type: entry.entry_type.clone(),
            status: entry.status.clone(),
            orderable: entry.orderable,
            listed_from: entry.validity_start.clone(),
            listed_until: entry.validity_end.clone(),
            valid_to: entry.valid_to.clone(),
            last_updated: entry.last_updated,
            app,
        }
    }

    fn app(&self, index: usize, device: &DeviceDefinitionResource) -> DigaApp {
        let manufacturer = device.manufacturer.as_ref().and_then(|reference| {
            self.organizations
                .resolve(reference, &format!("DeviceDefinition/{}", device.id))
                .map(|(_, organization)| organization.manufacturer.clone())
        });

        let modules = self
            .modules
            .get(&index)
            .map(|children| {
                children
                    .iter()
                    .map(|&child| self.module(child, &self.devices.items[child]))
                    .collect()
            })
            .unwrap_or_default();

        DigaApp {
            id: device.id.clone(),
            identifiers: device.identifiers.clone(),
            names: device.names.clone(),
            version: device.version.clone(),
            properties: device.properties.clone(),
            manufacturer,
            prescription_units: self.prescription_units(index),
            modules,
        }
    }

    fn module(&self, index: usize, device: &DeviceDefinitionResource) -> DigaModule {
        DigaModule {
            id: device.id.clone(),
            identifiers: device.identifiers.clone(),
            names: device.names.clone(),
            version: device.version.clone(),
            properties: device.properties.clone(),
            prescription_units: self.prescription_units(index),
        }
    }

    fn prescription_units(&self, device_index: usize) -> Vec<PrescriptionUnit> {
        let Some(indices) = self.units.get(&device_index) else {
            return Vec::new();
        };
        indices
            .iter()
            .map(|&i| {
                let item = &self.charge_items.items[i];
                PrescriptionUnit {
                    id: item.id.clone(),
                    url: item.url.clone(),
                    pzn: item.pzn.clone(),
                    title: item.title.clone(),
                    status: item.status.clone(),
                    prices: item.prices.clone(),
                }
            })
            .collect()
    }
}
