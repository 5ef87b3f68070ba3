//! Schema Registry
//!
//! Node and relationship types are plain data consumed by two generic loader
//! routines. Adding an entity type means adding a declaration here; the loader
//! control flow never changes.
//!
//! Relationship declarations name only the *fields* that carry their join keys.
//! The coercion applied to a join key is always the identity coercion of the
//! endpoint node type, looked up through the registry, so the two can never
//! disagree.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{RecordError, SchemaError};
use crate::record::Record;
use crate::value::{Coercion, NodeKey, Properties};

/// One source field mapped onto one target property
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyMapping {
    pub source_field: String,
    pub target: String,
    pub coercion: Coercion,
}

impl PropertyMapping {
    pub fn new(source_field: impl Into<String>, target: impl Into<String>, coercion: Coercion) -> Self {
        Self {
            source_field: source_field.into(),
            target: target.into(),
            coercion,
        }
    }
}

/// A validated node type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeType {
    label: String,
    source: String,
    identity: PropertyMapping,
    properties: Vec<PropertyMapping>,
}

impl NodeType {
    pub fn builder(label: impl Into<String>, source: impl Into<String>) -> NodeTypeBuilder {
        NodeTypeBuilder {
            label: label.into(),
            source: source.into(),
            identity: None,
            properties: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name of the record source this type is loaded from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn identity(&self) -> &PropertyMapping {
        &self.identity
    }

    /// Non-identity property mappings in declaration order
    pub fn properties(&self) -> &[PropertyMapping] {
        &self.properties
    }

    /// Coerce `field` of `record` the way this type's identity key is coerced
    ///
    /// Used for the identity field itself and for every relationship join key
    /// that points at this type.
    pub fn key_from_field(&self, record: &Record, field: &str) -> Result<NodeKey, RecordError> {
        let value = self
            .identity
            .coercion
            .coerce(field, record.get(field))?
            .ok_or_else(|| RecordError::MissingIdentity {
                field: field.to_string(),
            })?;

        // Identity coercions are restricted to keyable kinds at build time
        NodeKey::try_from(value).map_err(|other| RecordError::Coercion {
            field: field.to_string(),
            coercion: self.identity.coercion,
            value: other.to_string(),
            reason: "not usable as an identity".to_string(),
        })
    }

    /// Apply the full mapping to a record
    ///
    /// Fields that coerce to "no value" are left out of the property set.
    pub fn map_record(&self, record: &Record) -> Result<(NodeKey, Properties), RecordError> {
        let key = self.key_from_field(record, &self.identity.source_field)?;

        let mut properties = Properties::new();
        for mapping in &self.properties {
            if let Some(value) = mapping
                .coercion
                .coerce(&mapping.source_field, record.get(&mapping.source_field))?
            {
                properties.insert(mapping.target.clone(), value);
            }
        }

        Ok((key, properties))
    }
}

/// Builder for [`NodeType`]
#[derive(Debug, Clone)]
pub struct NodeTypeBuilder {
    label: String,
    source: String,
    identity: Option<PropertyMapping>,
    properties: Vec<PropertyMapping>,
}

impl NodeTypeBuilder {
    pub fn identity(mut self, source_field: &str, target: &str, coercion: Coercion) -> Self {
        self.identity = Some(PropertyMapping::new(source_field, target, coercion));
        self
    }

    pub fn property(mut self, source_field: &str, target: &str, coercion: Coercion) -> Self {
        self.properties
            .push(PropertyMapping::new(source_field, target, coercion));
        self
    }

    /// Shorthand for a run of string-typed properties
    pub fn strings(mut self, pairs: &[(&str, &str)]) -> Self {
        for (source_field, target) in pairs {
            self = self.property(source_field, target, Coercion::String);
        }
        self
    }

    pub fn build(self) -> Result<NodeType, SchemaError> {
        validate_identifier(&self.label)?;
        if self.source.trim().is_empty() {
            return Err(SchemaError::MissingSource(self.label));
        }

        let identity = self
            .identity
            .ok_or_else(|| SchemaError::MissingIdentity(self.label.clone()))?;
        if !identity.coercion.is_keyable() {
            return Err(SchemaError::UnsupportedIdentity {
                label: self.label,
                coercion: identity.coercion,
            });
        }

        let mut seen = HashSet::new();
        for mapping in std::iter::once(&identity).chain(self.properties.iter()) {
            validate_identifier(&mapping.target)?;
            if !seen.insert(mapping.target.as_str()) {
                return Err(SchemaError::DuplicateProperty {
                    owner: self.label.clone(),
                    property: mapping.target.clone(),
                });
            }
        }

        Ok(NodeType {
            label: self.label,
            source: self.source,
            identity,
            properties: self.properties,
        })
    }
}

/// One end of a relationship: the node type and the field holding its key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub label: String,
    pub join_field: String,
}

impl Endpoint {
    pub fn new(label: impl Into<String>, join_field: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            join_field: join_field.into(),
        }
    }
}

/// A directed relationship type between two node types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipType {
    name: String,
    source: String,
    from: Endpoint,
    to: Endpoint,
}

impl RelationshipType {
    pub fn new(name: impl Into<String>, source: impl Into<String>, from: Endpoint, to: Endpoint) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            from,
            to,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn from(&self) -> &Endpoint {
        &self.from
    }

    pub fn to(&self) -> &Endpoint {
        &self.to
    }

    /// Whether either end of this relationship is of the given node type
    pub fn touches(&self, label: &str) -> bool {
        self.from.label == label || self.to.label == label
    }
}

/// Read-only catalog of node and relationship types, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaRegistry {
    nodes: Vec<NodeType>,
    relationships: Vec<RelationshipType>,
}

impl SchemaRegistry {
    /// Validate and assemble a catalog
    pub fn new(nodes: Vec<NodeType>, relationships: Vec<RelationshipType>) -> Result<Self, SchemaError> {
        let mut labels = HashSet::new();
        for node in &nodes {
            if !labels.insert(node.label.as_str()) {
                return Err(SchemaError::DuplicateNodeType(node.label.clone()));
            }
        }

        let mut names = HashSet::new();
        for rel in &relationships {
            validate_identifier(&rel.name)?;
            if rel.source.trim().is_empty() {
                return Err(SchemaError::MissingSource(rel.name.clone()));
            }
            if !names.insert(rel.name.as_str()) {
                return Err(SchemaError::DuplicateRelationshipType(rel.name.clone()));
            }
            for endpoint in [&rel.from, &rel.to] {
                if !labels.contains(endpoint.label.as_str()) {
                    return Err(SchemaError::UnknownEndpoint {
                        rel_type: rel.name.clone(),
                        label: endpoint.label.clone(),
                    });
                }
            }
        }

        Ok(Self {
            nodes,
            relationships,
        })
    }

    pub fn node_types(&self) -> &[NodeType] {
        &self.nodes
    }

    pub fn relationship_types(&self) -> &[RelationshipType] {
        &self.relationships
    }

    pub fn node_type(&self, label: &str) -> Option<&NodeType> {
        self.nodes.iter().find(|n| n.label == label)
    }

    pub fn relationship_type(&self, name: &str) -> Option<&RelationshipType> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Node types at both ends of `rel`
    ///
    /// Endpoints are checked in [`SchemaRegistry::new`], so `None` only occurs
    /// for a relationship type that was not taken from this registry.
    pub fn endpoints(&self, rel: &RelationshipType) -> Option<(&NodeType, &NodeType)> {
        Some((self.node_type(&rel.from.label)?, self.node_type(&rel.to.label)?))
    }

    /// Distinct record source names, in first-use order
    pub fn source_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .map(|n| n.source.as_str())
            .chain(self.relationships.iter().map(|r| r.source.as_str()))
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// The Northwind catalog: customers, orders, products, suppliers,
    /// categories and reviews
    pub fn northwind() -> Result<Self, SchemaError> {
        use Coercion::{DateOrNull, Float, Integer};

        let customer = NodeType::builder("Customer", "customers")
            .identity("customerID", "id", Coercion::String)
            .strings(&[
                ("companyName", "company_name"),
                ("contactName", "contact_name"),
                ("contactTitle", "contact_title"),
                ("address", "address"),
                ("city", "city"),
                ("region", "region"),
                ("postalCode", "postal_code"),
                ("country", "country"),
                ("phone", "phone"),
                ("fax", "fax"),
            ])
            .build()?;

        let order = NodeType::builder("Order", "orders")
            .identity("orderID", "id", Integer)
            .property("numProduct", "num_products", Integer)
            .property("unitPrice", "unit_price", Integer)
            .property("quantity", "quantity", Integer)
            .property("discount", "discount", Float)
            .property("orderDate", "order_date", DateOrNull)
            .property("requiredDate", "required_date", DateOrNull)
            .property("shippedDate", "shipped_date", DateOrNull)
            .strings(&[
                ("shipVia", "ship_via"),
                ("freight", "freight"),
                ("shipName", "ship_name"),
                ("shipCity", "ship_city"),
                ("shipPostalCode", "ship_postal_code"),
                ("shipCountry", "ship_country"),
            ])
            .build()?;

        let product = NodeType::builder("Product", "products")
            .identity("productID", "id", Integer)
            .strings(&[
                ("productName", "product_name"),
                ("quantityPerUnit", "quantity_per_unit"),
            ])
            .property("unitPrice", "unit_price", Float)
            .property("unitsInStock", "units_in_stock", Integer)
            .property("unitsOnOrder", "units_on_order", Integer)
            .property("reorderLevel", "reorder_level", Integer)
            .property("discontinued", "discontinued", Integer)
            .build()?;

        let supplier = NodeType::builder("Supplier", "suppliers")
            .identity("supplierID", "id", Integer)
            .strings(&[
                ("companyName", "company_name"),
                ("contactName", "contact_name"),
                ("contactTitle", "contact_title"),
                ("address", "supplier_address"),
                ("city", "supplier_city"),
                ("region", "supplier_region"),
                ("postalCode", "supplier_postal_code"),
                ("country", "supplier_country"),
                ("phone", "supplier_phone"),
                ("fax", "supplier_fax"),
            ])
            .build()?;

        let category = NodeType::builder("Category", "categories")
            .identity("categoryID", "id", Integer)
            .strings(&[
                ("categoryName", "category_name"),
                ("description", "category_description"),
            ])
            .build()?;

        let review = NodeType::builder("Review", "reviews")
            .identity("reviewID", "id", Integer)
            .property("reviews", "text", Coercion::String)
            .build()?;

        let relationships = vec![
            RelationshipType::new(
                "PURCHASED",
                "orders",
                Endpoint::new("Customer", "customerID"),
                Endpoint::new("Order", "orderID"),
            ),
            RelationshipType::new(
                "ORDERS",
                "orders",
                Endpoint::new("Order", "orderID"),
                Endpoint::new("Product", "productID"),
            ),
            RelationshipType::new(
                "SUPPLIES",
                "products",
                Endpoint::new("Supplier", "supplierID"),
                Endpoint::new("Product", "productID"),
            ),
            RelationshipType::new(
                "PART_OF",
                "products",
                Endpoint::new("Product", "productID"),
                Endpoint::new("Category", "categoryID"),
            ),
            RelationshipType::new(
                "WRITES",
                "reviews",
                Endpoint::new("Order", "orderID"),
                Endpoint::new("Review", "reviewID"),
            ),
        ];

        Self::new(
            vec![customer, order, product, supplier, category, review],
            relationships,
        )
    }
}

/// Labels, relationship names and property names end up inside store
/// statements, so they are restricted to plain identifiers
fn validate_identifier(name: &str) -> Result<(), SchemaError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}
