//! The concrete XSD grammar, assembled on the parslet engine.
//!
//! Rules are organized the way a schema reads: a `schema` root collecting
//! top-level declarations, content-model rules for `sequence`/`choice`
//! bodies, and leaf rules for element/attribute/group references. The
//! grammar produces exactly the [`AstNode`] shapes the generation engine
//! dispatches on:
//!
//! - `complexType name=…` / `element` with a body → `Class`
//! - `group name=…` / `attributeGroup name=…` → `Group`
//! - `element name=… type=…` inside a sequence → `Field`
//! - `element ref=…` → `Reference`
//! - `group ref=…` → `Field` typed with the reserved [`GROUP_PREFIX`]
//! - `attributeGroup ref=…` → `Fields`
//! - `choice` → `Choice`
//! - `simpleType` restrictions → `AliasType` or `Enumeration`

use smol_str::SmolStr;

use crate::base::{QName, cap_first, low_first};
use crate::dom::{TreeNode, has_child_named};
use crate::parser::{
    AstKind, AstNode, Attr, AttrValue, Grammar, GrammarBuilder, Terminal, ast_class, ast_field,
};

/// Reserved type-name prefix marking group references for flattening.
pub const GROUP_PREFIX: &str = "group_";

// ============================================================================
// MERGERS
// ============================================================================

/// Collapse collected `EnumValue` children into the `Values` attribute.
fn merge_enum_values(head: &AstNode, tail: &AstNode) -> AstNode {
    let merged = head.merge(tail);
    let values: Vec<SmolStr> = merged
        .children
        .iter()
        .filter(|c| c.kind == AstKind::EnumValue)
        .filter_map(|c| c.text(&Attr::Value).map(SmolStr::from))
        .collect();
    let mut result = merged.prop(Attr::Values, AttrValue::Values(values));
    result.children.clear();
    result
}

/// Collapse collected facet children (pattern, bounds) into attributes.
fn merge_facets(head: &AstNode, tail: &AstNode) -> AstNode {
    let mut merged = head.merge(tail);
    let facets = std::mem::take(&mut merged.children);
    let mut result = merged;
    for facet in facets {
        for (key, value) in facet.attributes() {
            result = result.prop(key.clone(), value.clone());
        }
    }
    result
}

/// Attach an anonymous type body to the field that declared it.
///
/// The nested class is named after the capitalized field name, which also
/// becomes the field's type.
fn merge_nested_type(head: &AstNode, tail: &AstNode) -> AstNode {
    let type_name = cap_first(head.text(&Attr::FieldName).unwrap_or_default());
    let nested = tail.clone().named(type_name.clone());
    head.clone()
        .prop(Attr::FieldType, AttrValue::Text(type_name))
        .prop(Attr::NestedType, AttrValue::Node(Box::new(nested)))
}

// ============================================================================
// GRAMMAR ASSEMBLY
// ============================================================================

/// Build the XSD grammar.
///
/// `schema_name` names the root AST node (and thereby the synthesized
/// schema-root class).
pub fn xsd_grammar<N: TreeNode>(schema_name: &str) -> Grammar<N> {
    let schema_name = SmolStr::from(schema_name);
    let mut b = GrammarBuilder::new();

    // bound after the content-model rules exist (nested anonymous types
    // recurse back into them)
    let p_elm_nested = b.proxy();

    // ------------------------------------------------------------------
    // leaf rules shared by sequences, choices, and attribute bodies
    // ------------------------------------------------------------------

    let elm_ref = b.matcher(Terminal::new("element:ref", |n: &N| {
        n.attribute("ref")
            .map(|_| AstNode::new(AstKind::Reference).add_attribs(n))
    }));

    let elm_field = b.matcher(Terminal::new("element:typed", |n: &N| {
        n.attribute("name")?;
        n.attribute("type")?;
        Some(ast_field().add_field(n, None))
    }));

    let group_ref = b.matcher(Terminal::new("group:ref", |n: &N| {
        let reference = n.attribute("ref")?;
        let local = QName::parse(reference).local;
        Some(
            ast_field()
                .prop(Attr::FieldName, AttrValue::Text(low_first(&local)))
                .prop(
                    Attr::FieldType,
                    AttrValue::Text(SmolStr::from(format!("{GROUP_PREFIX}{local}"))),
                )
                .add_attribs(n),
        )
    }));

    let attr_field = b.matcher(Terminal::new("attribute", |n: &N| {
        n.attribute("name")?;
        n.attribute("type")?;
        let optional = n.attribute("use") != Some("required");
        Some(
            ast_field()
                .add_field(n, None)
                .prop(Attr::Optional, AttrValue::Flag(optional)),
        )
    }));

    let attr_group_ref = b.matcher(Terminal::new("attributeGroup:ref", |n: &N| {
        n.attribute("ref")
            .map(|_| AstNode::new(AstKind::Fields).add_attribs(n))
    }));

    let choice_chain = b.matcher(Terminal::new("choice", |_: &N| {
        Some(AstNode::new(AstKind::Choice))
    }));
    b.children(choice_chain, vec![elm_ref, elm_field]);

    let field_opts = vec![
        elm_ref,
        elm_field,
        p_elm_nested,
        group_ref,
        choice_chain,
        attr_field,
        attr_group_ref,
    ];

    let seq_chain = b.matcher(Terminal::new("sequence", |_: &N| {
        Some(AstNode::new(AstKind::Sibblings))
    }));
    b.children(seq_chain, field_opts.clone());

    let body_opts = vec![seq_chain, choice_chain, attr_field, attr_group_ref];

    // element name=… with a nested anonymous complexType
    let elm_nested = b.matcher_with(
        Terminal::new("element:nested", |n: &N| {
            n.attribute("name")?;
            if n.attribute("type").is_some() {
                return None;
            }
            Some(ast_field().add_field(n, Some(SmolStr::from("any"))))
        }),
        merge_nested_type,
    );
    b.child(elm_nested, Terminal::new("complexType", |n: &N| Some(ast_class(n))));
    b.children(elm_nested, body_opts.clone());
    b.bind(p_elm_nested, elm_nested);

    // ------------------------------------------------------------------
    // simpleType restrictions
    // ------------------------------------------------------------------

    let enum_value = b.matcher(Terminal::new("enumeration", |n: &N| {
        n.attribute("value")
            .map(crate::parser::ast_enum_value)
    }));

    // the restriction's base is the alias's underlying type
    let restriction_node = |n: &N| {
        let node = AstNode::new(AstKind::AliasType).add_attribs(n);
        match n.attribute("base") {
            Some(base) => node.prop(Attr::Type, AttrValue::Text(SmolStr::from(base))),
            None => node,
        }
    };
    let t_restriction_enum = move |n: &N| {
        if !has_child_named(n, "enumeration") {
            return None;
        }
        Some(restriction_node(n))
    };
    let t_restriction_plain = move |n: &N| Some(restriction_node(n));

    let facet_pattern = b.matcher(Terminal::new("pattern", |n: &N| {
        n.attribute("value").map(|v| {
            AstNode::new(AstKind::AliasType).prop(Attr::Pattern, AttrValue::Text(SmolStr::from(v)))
        })
    }));
    let facet_min = b.matcher(Terminal::new("minInclusive", |n: &N| {
        n.attribute("value").map(|v| {
            AstNode::new(AstKind::AliasType)
                .prop(Attr::MinInclusive, AttrValue::Text(SmolStr::from(v)))
        })
    }));
    let facet_max = b.matcher(Terminal::new("maxInclusive", |n: &N| {
        n.attribute("value").map(|v| {
            AstNode::new(AstKind::AliasType)
                .prop(Attr::MaxInclusive, AttrValue::Text(SmolStr::from(v)))
        })
    }));
    let facet_opts = vec![facet_pattern, facet_min, facet_max];

    let named_enum = b.matcher_with(
        Terminal::new("simpleType:enum", |n: &N| {
            n.attribute("name")
                .map(|name| AstNode::new(AstKind::Enumeration).named(name))
        }),
        merge_enum_values,
    );
    b.child(named_enum, Terminal::new("restriction:enum", t_restriction_enum));
    b.children(named_enum, vec![enum_value]);

    let named_alias = b.matcher_with(
        Terminal::new("simpleType:alias", |n: &N| {
            n.attribute("name")
                .map(|name| AstNode::new(AstKind::AliasType).named(name))
        }),
        merge_facets,
    );
    b.child(named_alias, Terminal::new("restriction", t_restriction_plain));
    b.children(named_alias, facet_opts.clone());

    // ------------------------------------------------------------------
    // top-level declarations
    // ------------------------------------------------------------------

    // document element backed by an inline enumeration
    let el_enum = b.matcher_with(
        Terminal::new("element:enum", |n: &N| {
            let name = n.attribute("name")?;
            if n.attribute("type").is_some() {
                return None;
            }
            Some(
                AstNode::new(AstKind::Enumeration)
                    .named(name)
                    .prop(Attr::Element, AttrValue::Flag(true)),
            )
        }),
        merge_enum_values,
    );
    b.child(el_enum, Terminal::new("simpleType", |_: &N| {
        Some(AstNode::new(AstKind::Empty))
    }));
    b.child(el_enum, Terminal::new("restriction:enum", t_restriction_enum));
    b.children(el_enum, vec![enum_value]);

    // document element backed by an inline plain restriction
    let el_alias_restr = b.matcher_with(
        Terminal::new("element:restr", |n: &N| {
            let name = n.attribute("name")?;
            if n.attribute("type").is_some() {
                return None;
            }
            Some(
                AstNode::new(AstKind::AliasType)
                    .named(name)
                    .prop(Attr::Element, AttrValue::Flag(true)),
            )
        }),
        merge_facets,
    );
    b.child(el_alias_restr, Terminal::new("simpleType", |_: &N| {
        Some(AstNode::new(AstKind::Empty))
    }));
    b.child(el_alias_restr, Terminal::new("restriction", t_restriction_plain));
    b.children(el_alias_restr, facet_opts);

    // document element with an inline complex body
    let el_class = b.matcher(Terminal::new("element:class", |n: &N| {
        let name = n.attribute("name")?;
        if n.attribute("type").is_some() {
            return None;
        }
        Some(
            AstNode::new(AstKind::Class)
                .add_attribs(n)
                .named(cap_first(name))
                .prop(Attr::Element, AttrValue::Flag(true)),
        )
    }));
    b.child(el_class, Terminal::new("complexType", |_: &N| {
        Some(AstNode::new(AstKind::Empty))
    }));
    b.children(el_class, body_opts.clone());

    // document element referencing a declared type: a named alias
    let el_alias = b.matcher(Terminal::new("element:alias", |n: &N| {
        let name = n.attribute("name")?;
        n.attribute("type")?;
        Some(
            AstNode::new(AstKind::AliasType)
                .add_attribs(n)
                .named(name)
                .prop(Attr::Element, AttrValue::Flag(true)),
        )
    }));

    // complexType with complexContent/extension (inherited base)
    let t_complex_named = |n: &N| n.attribute("name").map(|_| ast_class(n));
    let t_complex_content = |_: &N| Some(AstNode::new(AstKind::Empty));
    let t_extension = |n: &N| {
        n.attribute("base")
            .map(|_| AstNode::new(AstKind::Empty).add_attribs(n))
    };

    let complex_ext = b.matcher(Terminal::new("complexType:ext", t_complex_named));
    b.child(complex_ext, Terminal::new("complexContent", t_complex_content));
    b.child(complex_ext, Terminal::new("extension", t_extension));
    b.child(complex_ext, Terminal::new("sequence", |_: &N| {
        Some(AstNode::new(AstKind::Sibblings))
    }));
    b.children(complex_ext, field_opts);

    // extension that only inherits, no own sequence
    let complex_ext_base = b.matcher(Terminal::new("complexType:base", t_complex_named));
    b.child(complex_ext_base, Terminal::new("complexContent", t_complex_content));
    b.child(complex_ext_base, Terminal::new("extension", t_extension));

    let complex_named = b.matcher(Terminal::new("complexType:named", t_complex_named));
    b.children(complex_named, body_opts.clone());

    let group_decl = b.matcher(Terminal::new("group:decl", |n: &N| {
        n.attribute("name")
            .map(|_| AstNode::new(AstKind::Group).add_attribs(n))
    }));
    b.child(group_decl, Terminal::new("sequence", |_: &N| {
        Some(AstNode::new(AstKind::Sibblings))
    }));
    b.children(group_decl, vec![elm_ref, elm_field, group_ref, attr_field]);

    let attr_group_decl = b.matcher(Terminal::new("attributeGroup:decl", |n: &N| {
        n.attribute("name")
            .map(|_| AstNode::new(AstKind::Group).add_attribs(n))
    }));
    b.children(attr_group_decl, vec![attr_field, attr_group_ref]);

    let top_opts = vec![
        el_enum,
        el_alias_restr,
        el_class,
        el_alias,
        complex_ext,
        complex_ext_base,
        complex_named,
        group_decl,
        attr_group_decl,
        named_enum,
        named_alias,
    ];

    let schema = b.matcher(Terminal::new("schema", move |n: &N| {
        Some(
            AstNode::new(AstKind::Class)
                .add_attribs(n)
                .named(schema_name.clone()),
        )
    }));
    b.children(schema, top_opts);

    b.build(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{XmlDocument, XmlElement};

    fn parse(xsd: &str) -> AstNode {
        let doc = XmlDocument::parse(xsd).unwrap();
        let grammar: Grammar<XmlElement> = xsd_grammar("demo");
        grammar.parse(&doc.root()).expect("schema should parse")
    }

    const HEADER: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:tns="urn:demo" targetNamespace="urn:demo""#;

    #[test]
    fn test_schema_root_and_namespaces() {
        let ast = parse(&format!(r#"<xs:schema {HEADER}></xs:schema>"#));
        assert_eq!(ast.kind, AstKind::Class);
        assert_eq!(ast.name.as_deref(), Some("demo"));
        assert_eq!(
            ast.text(&Attr::Xmlns(SmolStr::from("xs"))),
            Some("http://www.w3.org/2001/XMLSchema")
        );
        assert_eq!(ast.text(&Attr::TargetNamespace), Some("urn:demo"));
    }

    #[test]
    fn test_complex_type_with_sequence() {
        let ast = parse(&format!(
            r#"<xs:schema {HEADER}>
                 <xs:complexType name="item">
                   <xs:annotation><xs:documentation>doc</xs:documentation></xs:annotation>
                   <xs:sequence>
                     <xs:element name="label" type="xs:string"/>
                     <xs:element ref="tns:other" maxOccurs="unbounded"/>
                   </xs:sequence>
                   <xs:attribute name="id" type="xs:int" use="required"/>
                 </xs:complexType>
               </xs:schema>"#
        ));
        let class = &ast.children[0];
        assert_eq!(class.kind, AstKind::Class);
        assert_eq!(class.name.as_deref(), Some("Item"));

        // sequence arrives as a Sibblings container, attribute directly
        let seq = &class.children[0];
        assert_eq!(seq.kind, AstKind::Sibblings);
        assert_eq!(seq.children[0].kind, AstKind::Field);
        assert_eq!(seq.children[0].text(&Attr::FieldName), Some("label"));
        assert_eq!(seq.children[1].kind, AstKind::Reference);
        assert!(seq.children[1].flag(&Attr::Array));

        let attr = &class.children[1];
        assert_eq!(attr.kind, AstKind::Field);
        assert_eq!(attr.text(&Attr::FieldName), Some("id"));
        assert!(!attr.flag(&Attr::Optional));
    }

    #[test]
    fn test_extension_and_group() {
        let ast = parse(&format!(
            r#"<xs:schema {HEADER}>
                 <xs:group name="G">
                   <xs:sequence>
                     <xs:element name="a" type="xs:string"/>
                   </xs:sequence>
                 </xs:group>
                 <xs:complexType name="C">
                   <xs:complexContent>
                     <xs:extension base="tns:Base">
                       <xs:sequence>
                         <xs:group ref="tns:G"/>
                         <xs:element name="b" type="xs:int"/>
                       </xs:sequence>
                     </xs:extension>
                   </xs:complexContent>
                 </xs:complexType>
               </xs:schema>"#
        ));
        let group = &ast.children[0];
        assert_eq!(group.kind, AstKind::Group);
        assert_eq!(group.name.as_deref(), Some("G"));

        let class = &ast.children[1];
        assert_eq!(class.text(&Attr::Base), Some("tns:Base"));
        let group_field = &class.children[0];
        assert_eq!(group_field.text(&Attr::FieldType), Some("group_G"));
        assert_eq!(class.children[1].text(&Attr::FieldName), Some("b"));
    }

    #[test]
    fn test_enum_and_alias() {
        let ast = parse(&format!(
            r#"<xs:schema {HEADER}>
                 <xs:element name="color">
                   <xs:simpleType>
                     <xs:restriction base="xs:string">
                       <xs:enumeration value="RED"/>
                       <xs:enumeration value="GREEN"/>
                     </xs:restriction>
                   </xs:simpleType>
                 </xs:element>
                 <xs:simpleType name="percent">
                   <xs:restriction base="xs:int">
                     <xs:minInclusive value="0"/>
                     <xs:maxInclusive value="100"/>
                   </xs:restriction>
                 </xs:simpleType>
               </xs:schema>"#
        ));
        let color = &ast.children[0];
        assert_eq!(color.kind, AstKind::Enumeration);
        assert!(color.flag(&Attr::Element));
        assert_eq!(
            color.values(&Attr::Values).unwrap(),
            &[SmolStr::from("RED"), SmolStr::from("GREEN")]
        );

        let percent = &ast.children[1];
        assert_eq!(percent.kind, AstKind::AliasType);
        assert_eq!(percent.text(&Attr::MinInclusive), Some("0"));
        assert_eq!(percent.text(&Attr::MaxInclusive), Some("100"));
    }

    #[test]
    fn test_nested_anonymous_type() {
        let ast = parse(&format!(
            r#"<xs:schema {HEADER}>
                 <xs:complexType name="outer">
                   <xs:sequence>
                     <xs:element name="position">
                       <xs:complexType>
                         <xs:sequence>
                           <xs:element name="x" type="xs:double"/>
                         </xs:sequence>
                       </xs:complexType>
                     </xs:element>
                   </xs:sequence>
                 </xs:complexType>
               </xs:schema>"#
        ));
        let outer = &ast.children[0];
        let seq = &outer.children[0];
        let field = &seq.children[0];
        assert_eq!(field.kind, AstKind::Field);
        assert_eq!(field.text(&Attr::FieldType), Some("Position"));
        let nested = field.node(&Attr::NestedType).unwrap();
        assert_eq!(nested.kind, AstKind::Class);
        assert_eq!(nested.name.as_deref(), Some("Position"));
    }

    #[test]
    fn test_unrecognized_root_fails() {
        let doc = XmlDocument::parse("<not-a-schema/>").unwrap();
        let grammar: Grammar<XmlElement> = xsd_grammar("demo");
        assert!(grammar.parse(&doc.root()).is_none());
    }
}
