//! Helpers for reading FHIR resources from their XML representation.
//!
//! FHIR XML stores primitive values in a `value` attribute
//! (`<status value="active"/>`) and nests complex types as child elements.
//! Elements are matched by local name only, so documents with or without the
//! `http://hl7.org/fhir` default namespace are read the same way.

use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;

use crate::document::DocumentKind;
use crate::error::{DigaError, DigaResult};

/// A resource element found in a document, with the `fullUrl` of its Bundle entry.
#[derive(Debug, Clone, Copy)]
pub struct ResourceNode<'a, 'input> {
    pub node: Node<'a, 'input>,
    pub full_url: Option<&'a str>,
}

/// Parse the text of an input document.
pub fn parse_document(text: &str, document: DocumentKind) -> DigaResult<Document<'_>> {
    Document::parse_with_options(
        text,
        ParsingOptions {
            allow_dtd: false,
            ..Default::default()
        },
    )
    .map_err(|source| DigaError::Xml { document, source })
}

/// Collect the resources of the document's resource type.
///
/// A `Bundle` root yields every `entry/resource` of the expected type in
/// document order. A root element of the expected type yields itself.
pub fn resources<'a, 'input>(
    doc: &'a Document<'input>,
    document: DocumentKind,
) -> DigaResult<Vec<ResourceNode<'a, 'input>>> {
    let root = doc.root_element();
    let expected = document.resource_type();

    if root.has_tag_name(expected) {
        return Ok(vec![ResourceNode {
            node: root,
            full_url: None,
        }]);
    }

    if !root.has_tag_name("Bundle") {
        return Err(DigaError::UnexpectedRoot {
            document,
            expected,
            found: root.tag_name().name().to_string(),
        });
    }

    let mut found = Vec::new();
    for entry in children(root, "entry") {
        let Some(resource) = child(entry, "resource").and_then(first_element) else {
            continue;
        };
        if !resource.has_tag_name(expected) {
            debug!(
                "Skipping {} entry in {}",
                resource.tag_name().name(),
                document
            );
            continue;
        }
        found.push(ResourceNode {
            node: resource,
            full_url: value(entry, "fullUrl"),
        });
    }

    Ok(found)
}

fn first_element<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element())
}

/// First child element with the given local name.
pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.has_tag_name(name))
}

/// All child elements with the given local name.
pub fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.has_tag_name(name))
}

/// The `value` attribute of an element, ignoring blank values.
pub fn primitive<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute("value")
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// The primitive value of the named child element.
pub fn value<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(primitive)
}

/// The primitive value at a path of child elements, e.g. `["validityPeriod", "start"]`.
pub fn value_at<'a>(node: Node<'a, '_>, path: &[&str]) -> Option<&'a str> {
    let (last, parents) = path.split_last()?;
    let mut current = node;
    for name in parents {
        current = child(current, name)?;
    }
    value(current, last)
}

/// Primitive values of all child elements with the given name.
pub fn values(node: Node<'_, '_>, name: &str) -> Vec<String> {
    node.children()
        .filter(|n| n.is_element() && n.has_tag_name(name))
        .filter_map(primitive)
        .map(str::to_string)
        .collect()
}

/// Human readable text of a CodeableConcept.
///
/// Prefers `text`, then the first coding's `display`, then its `code`.
pub fn concept_text(node: Node<'_, '_>) -> Option<String> {
    if let Some(text) = value(node, "text") {
        return Some(text.to_string());
    }
    let codings: Vec<Node> = node
        .children()
        .filter(|n| n.is_element() && n.has_tag_name("coding"))
        .collect();
    codings
        .iter()
        .find_map(|c| value(*c, "display"))
        .or_else(|| codings.iter().find_map(|c| value(*c, "code")))
        .map(str::to_string)
}

/// First coding code of a CodeableConcept.
pub fn concept_code(node: Node<'_, '_>) -> Option<String> {
    node.children()
        .filter(|n| n.is_element() && n.has_tag_name("coding"))
        .find_map(|c| value(c, "code"))
        .map(str::to_string)
}

/// A literal FHIR reference such as `DeviceDefinition/123`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference(String);

impl Reference {
    pub fn new(raw: impl Into<String>) -> Self {
        Reference(raw.into())
    }

    /// Read the `reference` element of a Reference-typed element.
    pub fn from_element(node: Node<'_, '_>) -> Option<Self> {
        value(node, "reference").map(Reference::new)
    }

    /// Read the Reference-typed child element with the given name.
    pub fn from_child(node: Node<'_, '_>, name: &str) -> Option<Self> {
        child(node, name).and_then(Reference::from_element)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The logical id the reference points to, if it targets `resource_type`.
    ///
    /// Accepts relative (`Type/id`), absolute (`https://host/fhir/Type/id`) and
    /// version-specific (`Type/id/_history/2`) references. Contained (`#id`)
    /// and `urn:` references have no logical id and return `None`.
    pub fn target_id(&self, resource_type: &str) -> Option<&str> {
        if self.0.starts_with('#') || self.0.starts_with("urn:") {
            return None;
        }

        let mut segments: Vec<&str> = self.0.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() >= 4 && segments[segments.len() - 2] == "_history" {
            segments.truncate(segments.len() - 2);
        }

        match segments.as_slice() {
            [.., ty, id] if *ty == resource_type => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Bundle xmlns="http://hl7.org/fhir">
  <type value="searchset"/>
  <entry>
    <fullUrl value="urn:uuid:5a1c"/>
    <resource>
      <Organization>
        <id value="org-1"/>
        <name value="  ACME Health  "/>
      </Organization>
    </resource>
  </entry>
  <entry>
    <resource>
      <OperationOutcome>
        <id value="oo"/>
      </OperationOutcome>
    </resource>
  </entry>
  <entry>
    <resource>
      <Organization>
        <id value="org-2"/>
      </Organization>
    </resource>
  </entry>
</Bundle>"#;

    #[test]
    fn test_bundle_yields_resources_of_expected_type() {
        let doc = parse_document(BUNDLE, DocumentKind::Organizations).unwrap();
        let found = resources(&doc, DocumentKind::Organizations).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(value(found[0].node, "id"), Some("org-1"));
        assert_eq!(found[0].full_url, Some("urn:uuid:5a1c"));
        assert_eq!(value(found[0].node, "name"), Some("ACME Health"));
        assert_eq!(found[1].full_url, None);
    }

    #[test]
    fn test_single_resource_root() {
        let xml = r#"<Organization xmlns="http://hl7.org/fhir"><id value="solo"/></Organization>"#;
        let doc = parse_document(xml, DocumentKind::Organizations).unwrap();
        let found = resources(&doc, DocumentKind::Organizations).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(value(found[0].node, "id"), Some("solo"));
    }

    #[test]
    fn test_unexpected_root_is_rejected() {
        let xml = r#"<Patient xmlns="http://hl7.org/fhir"><id value="p"/></Patient>"#;
        let doc = parse_document(xml, DocumentKind::Organizations).unwrap();
        let err = resources(&doc, DocumentKind::Organizations).unwrap_err();
        assert!(matches!(
            err,
            DigaError::UnexpectedRoot { ref found, .. } if found == "Patient"
        ));
    }

    #[test]
    fn test_malformed_xml_names_document() {
        let err = parse_document("<Bundle><entry></Bundle>", DocumentKind::CatalogEntries)
            .unwrap_err();
        assert_eq!(err.document(), DocumentKind::CatalogEntries);
        assert!(err.to_string().contains("CatalogEntries.xml"));
    }

    #[test]
    fn test_value_at_and_blank_values() {
        let xml = r#"<CatalogEntry>
            <validityPeriod><start value="2020-10-07"/><end value=""/></validityPeriod>
        </CatalogEntry>"#;
        let doc = parse_document(xml, DocumentKind::CatalogEntries).unwrap();
        let root = doc.root_element();
        assert_eq!(value_at(root, &["validityPeriod", "start"]), Some("2020-10-07"));
        assert_eq!(value_at(root, &["validityPeriod", "end"]), None);
        assert_eq!(value_at(root, &["missing", "start"]), None);
    }

    #[test]
    fn test_concept_text_preference() {
        let xml = r#"<type>
            <coding><code value="app"/></coding>
            <coding><code value="x"/><display value="Application"/></coding>
        </type>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();
        assert_eq!(concept_text(root).as_deref(), Some("Application"));
        assert_eq!(concept_code(root).as_deref(), Some("app"));

        let with_text = r#"<type><coding><code value="app"/></coding><text value="Web"/></type>"#;
        let doc = Document::parse(with_text).unwrap();
        assert_eq!(concept_text(doc.root_element()).as_deref(), Some("Web"));
    }

    #[test]
    fn test_reference_target_id() {
        let relative = Reference::new("DeviceDefinition/abc");
        assert_eq!(relative.target_id("DeviceDefinition"), Some("abc"));
        assert_eq!(relative.target_id("Organization"), None);

        let absolute = Reference::new("https://diga.bfarm.de/api/fhir/v2.0/Organization/42");
        assert_eq!(absolute.target_id("Organization"), Some("42"));

        let versioned = Reference::new("DeviceDefinition/abc/_history/3");
        assert_eq!(versioned.target_id("DeviceDefinition"), Some("abc"));

        assert_eq!(Reference::new("#contained").target_id("Organization"), None);
        assert_eq!(Reference::new("urn:uuid:1234").target_id("Organization"), None);
    }
}
