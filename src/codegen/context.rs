//! Per-invocation generation state.
//!
//! Every `generate` call owns a fresh [`GenContext`]; no registry is
//! shared across invocations, so concurrent generations cannot interfere.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::debug;

use super::error::GenerateError;
use crate::parser::{AstNode, Attr, AttrValue};

/// URI of the XML Schema meta-namespace.
pub(crate) const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Caller-supplied configuration for one generation run.
#[derive(Clone, Debug)]
pub struct GenOptions {
    /// Name of the synthesized schema-root class (defaults to `Schema`).
    pub schema_name: Option<SmolStr>,
    /// Prefix stamped before the class name in discriminator values.
    pub class_prefix: SmolStr,
    /// Module alias used when re-qualifying types that live in the
    /// document's default namespace.
    pub default_alias: SmolStr,
    /// Namespace prefix → module path, for cross-document imports.
    /// Absent entries are tolerated: references stay dotted, unresolved.
    pub modules: FxHashMap<SmolStr, SmolStr>,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            schema_name: None,
            class_prefix: SmolStr::from("."),
            default_alias: SmolStr::from("xmlns"),
            modules: FxHashMap::default(),
        }
    }
}

impl GenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema_name(mut self, name: impl Into<SmolStr>) -> Self {
        self.schema_name = Some(name.into());
        self
    }

    pub fn with_class_prefix(mut self, prefix: impl Into<SmolStr>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    pub fn with_default_alias(mut self, alias: impl Into<SmolStr>) -> Self {
        self.default_alias = alias.into();
        self
    }

    /// Map a namespace prefix to the module providing its types.
    pub fn with_module(mut self, prefix: impl Into<SmolStr>, module: impl Into<SmolStr>) -> Self {
        self.modules.insert(prefix.into(), module.into());
        self
    }
}

/// Mutable registries for one generation run.
pub(crate) struct GenContext {
    /// Prefix bound to the XML Schema meta-namespace.
    #[allow(dead_code)]
    pub meta_prefix: SmolStr,
    /// Prefix bound to the document's own target namespace.
    pub home_prefix: Option<SmolStr>,
    /// The document's default namespace URI.
    pub default_ns: Option<SmolStr>,
    /// Names declared at the document's top level.
    pub defined_types: FxHashSet<SmolStr>,
    /// Reserved group type name → emitted (abstract) class name.
    pub groups: FxHashMap<SmolStr, SmolStr>,
    /// Prefix → module path, copied from the options.
    modules: FxHashMap<SmolStr, SmolStr>,
    /// Requested imports; `None` marks a prefix with no known module.
    pub imports: IndexMap<SmolStr, Option<SmolStr>>,
}

impl GenContext {
    /// Extract namespace bindings from the document root's attributes.
    ///
    /// The meta-namespace prefix must be uniquely determined; so must the
    /// home prefix whenever a target namespace is declared. A document
    /// without a target namespace simply has no home prefix.
    pub fn from_root(ast: &AstNode, options: &GenOptions) -> Result<Self, GenerateError> {
        let mut meta: Vec<SmolStr> = Vec::new();
        let mut default_ns: Option<SmolStr> = None;
        let mut target_uri: Option<SmolStr> = None;

        for (key, value) in ast.attributes() {
            let AttrValue::Text(text) = value else { continue };
            match key {
                Attr::Xmlns(prefix) => {
                    if text.as_str() == XSD_NS && !meta.contains(prefix) {
                        meta.push(prefix.clone());
                    }
                    if prefix.is_empty() {
                        default_ns = Some(text.clone());
                    }
                }
                Attr::TargetNamespace => target_uri = Some(text.clone()),
                _ => {}
            }
        }

        let meta_prefix = match &meta[..] {
            [one] => one.clone(),
            [] => {
                return Err(GenerateError::AmbiguousNamespace(
                    "no prefix bound to the XML Schema namespace".into(),
                ));
            }
            many => {
                return Err(GenerateError::AmbiguousNamespace(format!(
                    "multiple prefixes bound to the XML Schema namespace: {}",
                    many.join(", ")
                )));
            }
        };

        let home_prefix = match &target_uri {
            None => None,
            Some(uri) => {
                let mut candidates: Vec<SmolStr> = Vec::new();
                for (key, value) in ast.attributes() {
                    if let (Attr::Xmlns(prefix), AttrValue::Text(text)) = (key, value) {
                        if text == uri {
                            let candidate = if prefix.is_empty() {
                                options.default_alias.clone()
                            } else {
                                prefix.clone()
                            };
                            if !candidates.contains(&candidate) {
                                candidates.push(candidate);
                            }
                        }
                    }
                }
                match &candidates[..] {
                    [] => None,
                    [one] => Some(one.clone()),
                    many => {
                        return Err(GenerateError::AmbiguousNamespace(format!(
                            "multiple prefixes bound to the target namespace: {}",
                            many.join(", ")
                        )));
                    }
                }
            }
        };

        debug!(
            meta = meta_prefix.as_str(),
            home = home_prefix.as_deref().unwrap_or("<none>"),
            "resolved namespace bindings"
        );

        Ok(Self {
            meta_prefix,
            home_prefix,
            default_ns,
            defined_types: FxHashSet::default(),
            groups: FxHashMap::default(),
            modules: options.modules.clone(),
            imports: IndexMap::new(),
        })
    }

    /// True when `prefix` is the document's home prefix.
    pub fn is_home(&self, prefix: &str) -> bool {
        self.home_prefix.as_deref() == Some(prefix)
    }

    /// Request a one-time import for a namespace prefix.
    ///
    /// Prefixes without a module mapping still resolve to dotted
    /// references; they just never produce an import.
    pub fn request_import(&mut self, prefix: &str) {
        if self.imports.contains_key(prefix) {
            return;
        }
        let module = self.modules.get(prefix).cloned();
        if module.is_none() {
            debug!(prefix, "no module mapping for prefix; reference stays unresolved");
        }
        self.imports.insert(SmolStr::from(prefix), module);
    }
}
