//! The AST produced by parsing and consumed by class generation.
//!
//! Every parse result is an [`AstNode`]: a kind, an optional declared
//! name, a typed attribute bag, and ordered children. Child order is
//! semantically significant — it becomes property and inheritance
//! declaration order in the generated model.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::base::{cap_first, field_type_for};
use crate::dom::TreeNode;

/// Semantic role of an AST node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AstKind {
    /// A concrete type declaration (complex type or element with body).
    Class,
    /// A named property bag with no runtime identity of its own.
    Group,
    /// A plain typed property.
    Field,
    /// A reference to another declared class.
    Reference,
    /// A named field-group reference (becomes an inheritance edge).
    Fields,
    /// A set of mutually exclusive option slots.
    Choice,
    /// A type alias declaration.
    AliasType,
    /// A closed enumeration declaration.
    Enumeration,
    /// One literal of an enumeration.
    EnumValue,
    /// Ordered list container produced by sibling collection.
    Sibblings,
    /// Marker for a successfully asserted end-of-sequence.
    Empty,
}

/// Attribute keys an [`AstNode`] may carry.
///
/// The set is closed except for namespace declarations (which keep their
/// prefix in the key) and pass-through attributes copied verbatim from the
/// input element.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attr {
    FieldName,
    FieldType,
    Ref,
    Base,
    Type,
    Value,
    Values,
    Array,
    Optional,
    /// Marks a declaration exposed as a document element.
    Element,
    Abstract,
    Pattern,
    MinInclusive,
    MaxInclusive,
    /// Nested anonymous type carried by a field.
    NestedType,
    /// The document's target namespace URI.
    TargetNamespace,
    /// An `xmlns` declaration; the payload is the bound prefix
    /// (empty for the default namespace).
    Xmlns(SmolStr),
    /// Any other input attribute, preserved as-is.
    Other(SmolStr),
}

impl Attr {
    /// Classify a raw attribute name from the input tree.
    pub fn from_name(name: &str) -> Attr {
        match name {
            "type" => Attr::Type,
            "base" => Attr::Base,
            "ref" => Attr::Ref,
            "value" => Attr::Value,
            "abstract" => Attr::Abstract,
            "pattern" => Attr::Pattern,
            "minInclusive" => Attr::MinInclusive,
            "maxInclusive" => Attr::MaxInclusive,
            "targetNamespace" => Attr::TargetNamespace,
            "xmlns" => Attr::Xmlns(SmolStr::default()),
            _ => match name.strip_prefix("xmlns:") {
                Some(prefix) => Attr::Xmlns(SmolStr::from(prefix)),
                None => Attr::Other(SmolStr::from(name)),
            },
        }
    }
}

/// Attribute payloads.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Text(SmolStr),
    Flag(bool),
    /// Enumeration literals in declaration order.
    Values(Vec<SmolStr>),
    /// A nested AST subtree (anonymous type).
    Node(Box<AstNode>),
}

/// The universal parse-result and generation-input unit.
#[derive(Clone, Debug, PartialEq)]
pub struct AstNode {
    /// Fixed at construction; never changed by merge.
    pub kind: AstKind,
    pub name: Option<SmolStr>,
    attributes: FxHashMap<Attr, AttrValue>,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(kind: AstKind) -> Self {
        Self {
            kind,
            name: None,
            attributes: FxHashMap::default(),
            children: Vec::new(),
        }
    }

    /// Set the declared name.
    pub fn named(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set one attribute.
    pub fn prop(mut self, key: Attr, value: AttrValue) -> Self {
        self.attributes.insert(key, value);
        self
    }

    /// Append a child node.
    pub fn with_child(mut self, child: AstNode) -> Self {
        self.children.push(child);
        self
    }

    /// Text payload of an attribute, if present and textual.
    pub fn text(&self, key: &Attr) -> Option<&str> {
        match self.attributes.get(key) {
            Some(AttrValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Boolean payload of an attribute; absent counts as `false`.
    pub fn flag(&self, key: &Attr) -> bool {
        matches!(self.attributes.get(key), Some(AttrValue::Flag(true)))
    }

    /// Enumeration literals, if present.
    pub fn values(&self, key: &Attr) -> Option<&[SmolStr]> {
        match self.attributes.get(key) {
            Some(AttrValue::Values(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Nested AST payload, if present.
    pub fn node(&self, key: &Attr) -> Option<&AstNode> {
        match self.attributes.get(key) {
            Some(AttrValue::Node(n)) => Some(n),
            _ => None,
        }
    }

    /// Iterate all attributes.
    pub fn attributes(&self) -> impl Iterator<Item = (&Attr, &AttrValue)> {
        self.attributes.iter()
    }

    /// Combine a head result with the result of what followed it.
    ///
    /// The merged node keeps `self`'s kind. `name` and `children` default
    /// to `self`'s but are overwritten when `other` sets them; attributes
    /// are `self`'s overwritten key-by-key by `other`'s (second operand
    /// wins on conflicts). This gives sequential grammar composition
    /// "result so far, refined by what follows" semantics.
    pub fn merge(&self, other: &AstNode) -> AstNode {
        let mut result = AstNode::new(self.kind);
        result.name = other.name.clone().or_else(|| self.name.clone());
        result.children = if other.children.is_empty() {
            self.children.clone()
        } else {
            other.children.clone()
        };
        result.attributes = self.attributes.clone();
        for (k, v) in &other.attributes {
            result.attributes.insert(k.clone(), v.clone());
        }
        result
    }

    /// Copy an input element's attributes into the bag.
    ///
    /// `name` becomes the node name; `maxOccurs`/`minOccurs` become the
    /// `Array`/`Optional` flags; everything else is stored under its
    /// classified key.
    pub fn add_attribs<N: TreeNode>(mut self, node: &N) -> Self {
        for (key, value) in node.attributes() {
            match key.as_str() {
                "name" => self.name = Some(value),
                "maxOccurs" => {
                    self.attributes
                        .insert(Attr::Array, AttrValue::Flag(value == "unbounded"));
                }
                "minOccurs" => {
                    self.attributes
                        .insert(Attr::Optional, AttrValue::Flag(value == "0"));
                }
                _ => {
                    self.attributes
                        .insert(Attr::from_name(&key), AttrValue::Text(value));
                }
            }
        }
        self
    }

    /// Fill in `FieldName`/`FieldType` from an element declaration.
    ///
    /// The type defaults to the mapped `type` attribute but can be forced
    /// with `fld_type` (used for group references and nested types).
    pub fn add_field<N: TreeNode>(self, node: &N, fld_type: Option<SmolStr>) -> Self {
        let ty = fld_type
            .unwrap_or_else(|| field_type_for(node.attribute("type").unwrap_or_default(), None));
        let name = node.attribute("name").unwrap_or_default();
        self.prop(Attr::FieldName, AttrValue::Text(SmolStr::from(name)))
            .prop(Attr::FieldType, AttrValue::Text(ty))
            .add_attribs(node)
    }
}

// ============================================================================
// LEAF FACTORY HELPERS
// ============================================================================

/// Bare node of a kind.
pub fn ast_node(kind: AstKind) -> AstNode {
    AstNode::new(kind)
}

/// A `Class` node named after the element's capitalized `name` attribute.
pub fn ast_class<N: TreeNode>(node: &N) -> AstNode {
    let name = node.attribute("name").map(cap_first);
    let result = AstNode::new(AstKind::Class).add_attribs(node);
    match name {
        Some(name) => result.named(name),
        None => result,
    }
}

/// A bare `Field` node.
pub fn ast_field() -> AstNode {
    AstNode::new(AstKind::Field)
}

/// An `EnumValue` leaf carrying one literal.
pub fn ast_enum_value(value: &str) -> AstNode {
    AstNode::new(AstKind::EnumValue).prop(Attr::Value, AttrValue::Text(SmolStr::from(value)))
}
