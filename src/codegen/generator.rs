//! The class generation engine.
//!
//! Consumes a parsed schema AST and produces an ordered [`ClassModel`]:
//! top-level declaration passes, class body construction, depth-based
//! topological emission, redundant-wrapper elision, group flattening,
//! and hydrating-constructor synthesis.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::{debug, trace};

use super::context::{GenContext, GenOptions, XSD_NS};
use super::error::GenerateError;
use super::model::{
    AliasDef, AliasKind, ClassDef, ClassModel, CtorDef, CtorStep, DISCRIMINATOR, EnumDef,
    EnumMember, Import, MethodDef, PropertyDef, TypeRef,
};
use super::patterns::pattern_to_alias;
use crate::base::{cap_first, field_type_for, low_first, sanitize_member};
use crate::dom::XmlDocument;
use crate::grammar::{GROUP_PREFIX, xsd_grammar};
use crate::parser::{AstKind, AstNode, Attr};

const DEFAULT_SCHEMA_NAME: &str = "Schema";

/// Generates a [`ClassModel`] from a schema document.
///
/// The generator itself is stateless and reusable; every call owns a
/// fresh [`GenContext`].
#[derive(Clone, Debug, Default)]
pub struct ClassGenerator {
    options: GenOptions,
}

impl ClassGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: GenOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GenOptions {
        &self.options
    }

    /// Parse schema text and generate its class model.
    ///
    /// A document the grammar does not recognize yields an *empty* model,
    /// never an error; detecting emptiness is the caller's concern.
    pub fn generate_from_xml(&self, xsd: &str) -> Result<ClassModel, GenerateError> {
        let doc = XmlDocument::parse(xsd)?;
        let schema_name = self
            .options
            .schema_name
            .clone()
            .unwrap_or_else(|| SmolStr::from(DEFAULT_SCHEMA_NAME));
        let grammar = xsd_grammar(&schema_name);
        match grammar.parse(&doc.root()) {
            Some(ast) => self.generate(&ast),
            None => {
                debug!("document did not match the schema grammar; yielding an empty model");
                Ok(ClassModel::default())
            }
        }
    }

    /// Generate the class model for an already-parsed document AST.
    pub fn generate(&self, ast: &AstNode) -> Result<ClassModel, GenerateError> {
        let mut ctx = GenContext::from_root(ast, &self.options)?;
        let mut draft = ClassModel::default();

        let children = significant_children(ast);
        for child in &children {
            if let Some(name) = &child.name {
                ctx.defined_types.insert(name.clone());
                ctx.defined_types.insert(cap_first(name));
            }
        }

        // types living in a non-meta default namespace come from elsewhere
        if let Some(default_ns) = ctx.default_ns.clone() {
            if default_ns != XSD_NS {
                ctx.request_import(&self.options.default_alias);
            }
        }

        let root_name = cap_first(
            ast.name
                .as_deref()
                .or(self.options.schema_name.as_deref())
                .unwrap_or(DEFAULT_SCHEMA_NAME),
        );
        let mut root_class = ClassDef::new(root_name.clone());

        for child in &children {
            if child.kind == AstKind::AliasType {
                self.add_alias(&ctx, &mut draft, &mut root_class, child);
            }
        }

        // schema-root class is emitted first; its body fills in below
        draft
            .classes
            .insert(root_name.clone(), ClassDef::new(root_name.clone()));

        for child in &children {
            if child.kind == AstKind::Group {
                let class_name = self.add_class_for_ast(&mut draft, &mut ctx, child);
                if let Some(name) = &child.name {
                    ctx.groups
                        .insert(SmolStr::from(format!("{GROUP_PREFIX}{name}")), class_name);
                }
            }
        }

        for child in &children {
            if child.kind == AstKind::Class {
                self.add_class_for_ast(&mut draft, &mut ctx, child);
                if child.flag(&Attr::Element) {
                    add_root_property(&mut root_class, child);
                }
            }
        }

        for child in &children {
            if child.kind == AstKind::Enumeration {
                let name = child.name.as_deref().unwrap_or_default();
                let members = child
                    .values(&Attr::Values)
                    .unwrap_or_default()
                    .iter()
                    .map(|v| EnumMember {
                        name: sanitize_member(v),
                        value: v.clone(),
                    })
                    .collect();
                draft.enums.push(EnumDef {
                    name: cap_first(name),
                    members,
                });
                if child.flag(&Attr::Element) {
                    add_root_property(&mut root_class, child);
                }
            }
        }

        draft.classes.insert(root_name, root_class);

        Ok(self.sorted_model(&ctx, &draft))
    }

    // =========================================================================
    // Top-level declarations
    // =========================================================================

    fn add_alias(
        &self,
        ctx: &GenContext,
        draft: &mut ClassModel,
        root_class: &mut ClassDef,
        node: &AstNode,
    ) {
        let name = node.name.as_deref().unwrap_or_default();
        let raw_type = node.text(&Attr::Type).unwrap_or_default();
        let mut alias_ty: String = field_type_for(raw_type, None).to_string();

        if let Some(pattern) = node.text(&Attr::Pattern) {
            alias_ty = pattern_to_alias(pattern, &alias_ty);
        }

        // a narrow inclusive integer range becomes the union of its values
        if let (Some(min), Some(max)) = (
            node.text(&Attr::MinInclusive),
            node.text(&Attr::MaxInclusive),
        ) {
            if let (Ok(lo), Ok(hi)) = (min.parse::<i64>(), max.parse::<i64>()) {
                if hi >= lo && hi - lo < 100 {
                    alias_ty = (lo..=hi)
                        .map(|n| n.to_string())
                        .collect::<Vec<_>>()
                        .join("|");
                }
            }
        }

        let mut self_referential = false;
        let dotted = alias_ty
            .split_once('.')
            .map(|(ns, local)| (SmolStr::from(ns), SmolStr::from(local)));
        if let Some((ns, local)) = dotted {
            if ctx.is_home(&ns) {
                self_referential = name == local.as_str();
                alias_ty = cap_first(&local).to_string();
            }
        }

        if !self_referential && !name.eq_ignore_ascii_case(&alias_ty) {
            let lowered = alias_ty.to_lowercase();
            if lowered.contains("string") || lowered.contains("number") {
                alias_ty = lowered;
            }
            let ty = if alias_ty.contains('|') {
                AliasKind::Union(alias_ty.split('|').map(SmolStr::from).collect())
            } else {
                AliasKind::Reference(SmolStr::from(alias_ty))
            };
            draft.aliases.push(AliasDef {
                name: cap_first(name),
                ty,
            });
        } else {
            trace!(alias = name, "skipping self-referential alias");
        }

        if node.flag(&Attr::Element) {
            add_root_property(root_class, node);
        }
    }

    // =========================================================================
    // Class bodies
    // =========================================================================

    /// Emit a class (or abstract group class) for an AST node, returning
    /// its emitted name. Nested anonymous types are emitted after their
    /// declaring class.
    fn add_class_for_ast(
        &self,
        draft: &mut ClassModel,
        ctx: &mut GenContext,
        node: &AstNode,
    ) -> SmolStr {
        let name = cap_first(node.name.as_deref().unwrap_or_default());
        // placeholder keeps declaring-class-before-nested-class order
        draft
            .classes
            .insert(name.clone(), ClassDef::new(name.clone()));

        let mut class = ClassDef::new(name.clone());
        class.is_abstract = node.kind == AstKind::Group;

        if let Some(base) = node.text(&Attr::Base) {
            class.add_extends(resolve_supertype(ctx, base));
        }

        for child in significant_children(node) {
            match child.kind {
                AstKind::Fields => {
                    let reference = child.text(&Attr::Ref).unwrap_or_default();
                    let supertype = match reference.split_once(':') {
                        Some((ns, local)) if ctx.is_home(ns) => cap_first(local),
                        Some((ns, local)) => {
                            ctx.request_import(ns);
                            SmolStr::from(format!("{}.{}", ns.to_lowercase(), cap_first(local)))
                        }
                        None => cap_first(reference),
                    };
                    class.add_extends(supertype);
                }

                AstKind::Reference => self.add_reference(ctx, &mut class, child),

                AstKind::Choice => self.add_choice_methods(&mut class, child),

                AstKind::Field => self.add_field(draft, ctx, &mut class, child),

                _ => {}
            }
        }

        trace!(
            class = class.name.as_str(),
            properties = class.properties.len(),
            "built class body"
        );
        draft.classes.insert(name.clone(), class);
        name
    }

    fn add_reference(&self, ctx: &GenContext, class: &mut ClassDef, child: &AstNode) {
        let reference = child.text(&Attr::Ref).unwrap_or_default();
        let array = child.flag(&Attr::Array);
        let (ns, local) = match reference.split_once(':') {
            Some((ns, local)) => (Some(ns), local),
            None => (None, reference),
        };
        let type_name = match ns {
            Some(ns) if ctx.is_home(ns) => cap_first(local),
            Some(ns) => SmolStr::from(format!("{ns}.{}", cap_first(local))),
            None => cap_first(local),
        };
        class.properties.push(PropertyDef {
            name: SmolStr::from(local),
            ty: TypeRef {
                name: type_name,
                array,
            },
            // a repeated reference is absent-if-empty rather than required
            optional: array,
        });
    }

    fn add_choice_methods(&self, class: &mut ClassDef, choice: &AstNode) {
        let option_name = |option: &AstNode| -> SmolStr {
            match option.text(&Attr::FieldName) {
                Some(name) => SmolStr::from(name),
                None => {
                    let reference = option.text(&Attr::Ref).unwrap_or_default();
                    SmolStr::from(reference.rsplit(':').next().unwrap_or_default())
                }
            }
        };
        let names: Vec<SmolStr> = choice.children.iter().map(option_name).collect();

        for option in &choice.children {
            let method_name = option_name(option);
            let param_type = match option.text(&Attr::FieldType) {
                Some(ty) => SmolStr::from(ty),
                None => cap_first(method_name.as_str()),
            };
            class.methods.push(MethodDef {
                name: method_name.clone(),
                param_type: TypeRef::scalar(param_type),
                clears: names
                    .iter()
                    .filter(|n| **n != method_name)
                    .cloned()
                    .collect(),
                sets: method_name,
            });
        }
    }

    fn add_field(
        &self,
        draft: &mut ClassModel,
        ctx: &mut GenContext,
        class: &mut ClassDef,
        child: &AstNode,
    ) {
        let field_name = child.text(&Attr::FieldName).unwrap_or_default();
        let raw_type = child.text(&Attr::Type).unwrap_or_default();
        let mut fld_type = SmolStr::from(child.text(&Attr::FieldType).unwrap_or("any"));
        let nested = child.node(&Attr::NestedType);

        let dotted = fld_type
            .split_once('.')
            .map(|(ns, local)| (SmolStr::from(ns), SmolStr::from(local)));
        if let Some((ns, local)) = dotted {
            if ctx.is_home(&ns) {
                fld_type = cap_first(&local);
            } else {
                ctx.request_import(&ns);
            }
        } else if nested.is_none() && !fld_type.starts_with(GROUP_PREFIX) {
            // types without a namespace that are not declared locally live
            // in the document's default namespace and must be re-qualified
            let foreign_default = ctx
                .default_ns
                .as_deref()
                .is_some_and(|ns| ns != XSD_NS);
            let home_is_default_alias = ctx.is_home(&self.options.default_alias);
            if foreign_default
                && !home_is_default_alias
                && !ctx.defined_types.contains(fld_type.as_str())
            {
                fld_type = field_type_for(raw_type, Some(&self.options.default_alias));
            }
        }

        class.properties.push(PropertyDef {
            name: SmolStr::from(field_name),
            ty: TypeRef {
                name: fld_type,
                array: child.flag(&Attr::Array),
            },
            optional: child.flag(&Attr::Optional),
        });

        if let Some(nested) = nested {
            self.add_class_for_ast(draft, ctx, nested);
        }
    }

    // =========================================================================
    // Topological emission
    // =========================================================================

    /// Copy classes into the output in non-decreasing hierarchy depth,
    /// eliding redundant array wrappers, flattening groups, and
    /// synthesizing constructors along the way.
    ///
    /// Depth discovery and emission proceed as repeated full passes,
    /// advancing the known maximum depth until covered; an inheritance
    /// cycle reports the hop count at first revisit, so the loop is
    /// bounded by `max_depth + 1` passes.
    fn sorted_model(&self, ctx: &GenContext, draft: &ClassModel) -> ClassModel {
        let mut out = ClassModel {
            imports: ctx
                .imports
                .iter()
                .filter_map(|(alias, module)| {
                    module.as_ref().map(|m| Import {
                        alias: alias.clone(),
                        module: m.clone(),
                    })
                })
                .collect(),
            aliases: draft.aliases.clone(),
            enums: draft.enums.clone(),
            ..ClassModel::default()
        };

        let mut redundant: Vec<SmolStr> = Vec::new();
        let mut depth = 0u32;
        let mut max_depth = 1u32;

        while depth <= max_depth {
            for class in draft.classes.values() {
                let class_depth = hierarchy_depth(class, draft);
                if class_depth > max_depth {
                    max_depth = class_depth;
                }
                if class_depth != depth {
                    continue;
                }
                trace!(
                    class = class.name.as_str(),
                    depth = class_depth,
                    "emitting class"
                );

                let mut def = ClassDef::new(class.name.clone());
                def.is_abstract = class.is_abstract;
                def.methods = class.methods.clone();
                def.extends = class.superclass().map(SmolStr::from).into_iter().collect();

                let mut flatten_guard = Vec::new();
                add_property_flattened(
                    &mut def,
                    PropertyDef {
                        name: SmolStr::from(DISCRIMINATOR),
                        ty: TypeRef::scalar("string"),
                        optional: false,
                    },
                    draft,
                    ctx,
                    &mut redundant,
                    &mut flatten_guard,
                );

                // inheritance edges beyond the first degrade to property
                // flattening, like groups
                for extra in class.extends.iter().skip(1) {
                    match draft.classes.get(extra.as_str()) {
                        Some(source) => {
                            for prop in &source.properties {
                                add_property_flattened(
                                    &mut def,
                                    prop.clone(),
                                    draft,
                                    ctx,
                                    &mut redundant,
                                    &mut flatten_guard,
                                );
                            }
                        }
                        None => {
                            debug!(
                                class = class.name.as_str(),
                                edge = extra.as_str(),
                                "dropping unresolvable extra inheritance edge"
                            );
                        }
                    }
                }

                for prop in &class.properties {
                    add_property_flattened(
                        &mut def,
                        prop.clone(),
                        draft,
                        ctx,
                        &mut redundant,
                        &mut flatten_guard,
                    );
                }

                synthesize_ctor(&mut def, draft, &self.options);
                out.classes.insert(def.name.clone(), def);
            }
            depth += 1;
        }

        // wrapper classes vanish globally once elided at a use site
        if !redundant.is_empty() {
            debug!(classes = ?redundant, "removing redundant array wrapper classes");
            out.classes.retain(|name, _| !redundant.contains(name));
        }
        out
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Expose an element-flagged declaration on the schema-root class.
fn add_root_property(root_class: &mut ClassDef, node: &AstNode) {
    let name = node.name.as_deref().unwrap_or_default();
    root_class.properties.push(PropertyDef {
        name: low_first(name),
        ty: TypeRef::scalar(cap_first(name)),
        optional: false,
    });
}

/// Resolve a `base` attribute into a supertype name.
fn resolve_supertype(ctx: &GenContext, base: &str) -> SmolStr {
    match base.split_once(':') {
        Some((ns, local)) if ctx.is_home(ns) => cap_first(local),
        Some((ns, local)) => SmolStr::from(format!("{}.{}", ns.to_lowercase(), cap_first(local))),
        None => cap_first(base),
    }
}

/// Number of superclass hops to a class with no local superclass.
///
/// Cycle-safe: revisiting a class ends the walk at the hop count reached,
/// keeping the discovered maximum depth finite (termination law).
fn hierarchy_depth(class: &ClassDef, model: &ClassModel) -> u32 {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    seen.insert(class.name.as_str());
    let mut depth = 0;
    let mut current = class.superclass();
    while let Some(superclass) = current {
        if !seen.insert(superclass) {
            break;
        }
        depth += 1;
        current = model
            .classes
            .get(superclass)
            .and_then(|c| c.superclass());
    }
    depth
}

/// Copy one resolved property onto a class, applying wrapper elision and
/// group flattening.
fn add_property_flattened(
    def: &mut ClassDef,
    mut prop: PropertyDef,
    draft: &ClassModel,
    ctx: &GenContext,
    redundant: &mut Vec<SmolStr>,
    guard: &mut Vec<SmolStr>,
) {
    // group-typed properties dissolve into the group's own property list
    if prop.ty.name.starts_with(GROUP_PREFIX) {
        if guard.contains(&prop.ty.name) {
            debug!(group = prop.ty.name.as_str(), "circular group reference; skipping");
            return;
        }
        if let Some(group) = ctx
            .groups
            .get(prop.ty.name.as_str())
            .and_then(|class_name| draft.classes.get(class_name.as_str()))
        {
            guard.push(prop.ty.name.clone());
            for group_prop in &group.properties {
                add_property_flattened(def, group_prop.clone(), draft, ctx, redundant, guard);
            }
            guard.pop();
            return;
        }
    }

    // a class holding exactly one array is indistinguishable from the
    // bare array: rewrite the use site and drop the wrapper
    if let Some(inner) = draft
        .classes
        .get(prop.ty.name.as_str())
        .and_then(|c| c.lone_array_property())
    {
        if !redundant.contains(&prop.ty.name) {
            redundant.push(prop.ty.name.clone());
        }
        prop.ty = inner.ty.clone();
    }

    def.properties.push(prop);
}

/// Synthesize the single-argument hydrating constructor.
fn synthesize_ctor(def: &mut ClassDef, draft: &ClassModel, options: &GenOptions) {
    // super-delegation only when the superclass is emitted alongside us
    let calls_super = def
        .superclass()
        .map(|s| draft.classes.contains_key(s))
        .unwrap_or(false);
    let discriminator = SmolStr::from(format!("{}{}", options.class_prefix, def.name));

    let mut steps = Vec::new();
    for prop in &def.properties {
        if prop.name == DISCRIMINATOR {
            continue;
        }
        let is_class = draft.classes.contains_key(prop.ty.name.as_str());
        let step = if is_class && !prop.ty.array {
            CtorStep::Construct {
                prop: prop.name.clone(),
                class: prop.ty.name.clone(),
                optional: prop.optional,
            }
        } else if prop.ty.array {
            CtorStep::ConstructArray {
                prop: prop.name.clone(),
                element_class: is_class.then(|| prop.ty.name.clone()),
            }
        } else {
            CtorStep::Assign {
                prop: prop.name.clone(),
            }
        };
        steps.push(step);
    }

    def.ctor = Some(CtorDef {
        calls_super,
        discriminator,
        steps,
    });
}

/// Iterate a node's children with `Sibblings` containers dissolved.
fn significant_children(node: &AstNode) -> Vec<&AstNode> {
    fn walk<'a>(children: &'a [AstNode], out: &mut Vec<&'a AstNode>) {
        for child in children {
            if child.kind == AstKind::Sibblings {
                walk(&child.children, out);
            } else {
                out.push(child);
            }
        }
    }
    let mut out = Vec::new();
    walk(&node.children, &mut out);
    out
}
