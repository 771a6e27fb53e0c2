//! Standalone output model handed to the external renderer.
//!
//! The model is deliberately renderer-agnostic: method bodies and
//! constructors are structured data, not source text. An external
//! [`ModelRenderer`] owns all textual emission, including any
//! syntax-specific visibility or scope rewriting.
//!
//! ```text
//! ClassModel
//! ├── imports: Vec<Import>                   (one per resolved prefix)
//! ├── classes: IndexMap<SmolStr, ClassDef>   (emission order preserved)
//! ├── aliases: Vec<AliasDef>
//! └── enums:   Vec<EnumDef>
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use smol_str::SmolStr;

/// Name of the hidden per-instance property recording the concrete
/// emitted class of a value whose static type is an ancestor or union.
pub const DISCRIMINATOR: &str = "@class";

/// A property or parameter type: a name plus array-ness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeRef {
    pub name: SmolStr,
    pub array: bool,
}

impl TypeRef {
    /// A plain (non-array) type.
    pub fn scalar(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            array: false,
        }
    }

    /// An array of `name`.
    pub fn array_of(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            array: true,
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.array {
            write!(f, "{}[]", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// One declared property of a class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PropertyDef {
    pub name: SmolStr,
    pub ty: TypeRef,
    /// Absent-if-empty rather than required.
    pub optional: bool,
}

/// A choice-option setter.
///
/// Calling the method assigns its argument to the `sets` slot and removes
/// every slot in `clears`, enforcing "at most one populated slot" at
/// runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodDef {
    pub name: SmolStr,
    pub param_type: TypeRef,
    pub clears: Vec<SmolStr>,
    pub sets: SmolStr,
}

/// One step of a synthesized constructor body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum CtorStep {
    /// Construct an emitted class from the corresponding input field.
    /// When `optional` and the field is absent, the property stays unset.
    Construct {
        prop: SmolStr,
        class: SmolStr,
        optional: bool,
    },
    /// Map each input array element through per-element construction;
    /// raw elements pass through when the element type is not emitted.
    ConstructArray {
        prop: SmolStr,
        element_class: Option<SmolStr>,
    },
    /// Assign the input field verbatim.
    Assign { prop: SmolStr },
}

/// The synthesized single-argument hydrating constructor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CtorDef {
    /// Delegate to the superclass constructor with the same input first.
    pub calls_super: bool,
    /// Value stamped into the [`DISCRIMINATOR`] property.
    pub discriminator: SmolStr,
    pub steps: Vec<CtorStep>,
}

/// An emitted class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassDef {
    pub name: SmolStr,
    pub is_abstract: bool,
    /// Inheritance edges in declaration order; the first is the
    /// superclass, the rest are flattened into the property list.
    pub extends: Vec<SmolStr>,
    /// Ordered properties, [`DISCRIMINATOR`] first once emitted.
    pub properties: Vec<PropertyDef>,
    pub methods: Vec<MethodDef>,
    pub ctor: Option<CtorDef>,
}

impl ClassDef {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            is_abstract: false,
            extends: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            ctor: None,
        }
    }

    /// The single superclass the linearization follows.
    pub fn superclass(&self) -> Option<&str> {
        self.extends.first().map(|s| s.as_str())
    }

    pub fn add_extends(&mut self, name: impl Into<SmolStr>) {
        self.extends.push(name.into());
    }

    /// The lone array-typed property of a wrapper class, if this class
    /// qualifies for elision.
    pub fn lone_array_property(&self) -> Option<&PropertyDef> {
        match &self.properties[..] {
            [only] if only.ty.array => Some(only),
            _ => None,
        }
    }
}

/// One member of an emitted enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnumMember {
    /// Sanitized identifier.
    pub name: SmolStr,
    /// The literal value as declared.
    pub value: SmolStr,
}

/// An emitted closed enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnumDef {
    pub name: SmolStr,
    pub members: Vec<EnumMember>,
}

/// The right-hand side of a type alias.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum AliasKind {
    /// A single named type.
    Reference(SmolStr),
    /// A union of literal texts (quoted strings or integers).
    Union(Vec<SmolStr>),
}

/// An emitted type alias.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AliasDef {
    pub name: SmolStr,
    pub ty: AliasKind,
}

/// A requested cross-document import.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Import {
    /// Namespace alias the dotted references use.
    pub alias: SmolStr,
    /// Module path from the caller-supplied prefix map.
    pub module: SmolStr,
}

/// The complete generation output.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClassModel {
    pub imports: Vec<Import>,
    /// Classes keyed by name, in emission (dependency) order.
    pub classes: IndexMap<SmolStr, ClassDef>,
    pub aliases: Vec<AliasDef>,
    pub enums: Vec<EnumDef>,
}

impl ClassModel {
    /// Look up an emitted class by name.
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    /// True when generation produced nothing (e.g. total parse failure).
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.aliases.is_empty() && self.enums.is_empty()
    }

    /// Class names in emission order.
    pub fn class_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.classes.keys()
    }
}

/// Boundary to the external source-text renderer.
///
/// The core never formats source; a renderer turns the abstract model
/// into target-language text, applying its own visibility and scope
/// rewriting.
pub trait ModelRenderer {
    type Error;

    fn render(&self, model: &ClassModel) -> Result<String, Self::Error>;
}
