//! Hydration Tests - Constructors, Round-Trips, Choice Invariant
//!
//! Exercises the executable meaning of synthesized constructors and
//! choice setters, plus the linearization termination law on cyclic
//! inheritance graphs.

use rstest::rstest;
use serde_json::{Value, json};
use smol_str::SmolStr;
use xsdgen::codegen::hydrate::{apply_choice, hydrate, strip_discriminators};
use xsdgen::parser::{AstKind, AstNode, Attr, AttrValue};
use xsdgen::{ClassGenerator, ClassModel};

const XSD: &str = "http://www.w3.org/2001/XMLSchema";

fn schema(body: &str) -> String {
    format!(
        r#"<xs:schema xmlns:xs="{XSD}" xmlns:tns="urn:demo" targetNamespace="urn:demo">{body}</xs:schema>"#
    )
}

fn generate(body: &str) -> ClassModel {
    ClassGenerator::new()
        .generate_from_xml(&schema(body))
        .unwrap()
}

fn nested_model() -> ClassModel {
    generate(
        r#"<xs:complexType name="outer">
             <xs:sequence>
               <xs:element name="inner" type="tns:inner"/>
               <xs:element name="tags" type="xs:string" maxOccurs="unbounded"/>
               <xs:element name="kids" type="tns:inner" maxOccurs="unbounded"/>
               <xs:element name="extra" type="tns:inner" minOccurs="0"/>
             </xs:sequence>
           </xs:complexType>
           <xs:complexType name="inner">
             <xs:sequence><xs:element name="v" type="xs:string"/></xs:sequence>
           </xs:complexType>"#,
    )
}

// ============================================================================
// Constructor semantics
// ============================================================================

#[test]
fn test_hydrate_stamps_discriminators_recursively() {
    let model = nested_model();
    let instance = hydrate(
        &model,
        "Outer",
        &json!({"inner": {"v": "a"}, "tags": ["x"], "kids": [{"v": "b"}]}),
    );

    assert_eq!(instance["@class"], ".Outer");
    assert_eq!(instance["inner"]["@class"], ".Inner");
    assert_eq!(instance["inner"]["v"], "a");
    assert_eq!(instance["kids"][0]["@class"], ".Inner");
    // raw elements pass through untouched
    assert_eq!(instance["tags"], json!(["x"]));
    // optional + absent stays unset
    assert!(instance.get("extra").is_none());
}

#[test]
fn test_hydrate_superclass_chain() {
    let model = generate(
        r#"<xs:complexType name="special">
             <xs:complexContent>
               <xs:extension base="tns:plain">
                 <xs:sequence><xs:element name="extra" type="xs:string"/></xs:sequence>
               </xs:extension>
             </xs:complexContent>
           </xs:complexType>
           <xs:complexType name="plain">
             <xs:sequence><xs:element name="common" type="xs:string"/></xs:sequence>
           </xs:complexType>"#,
    );

    let instance = hydrate(&model, "Special", &json!({"common": "c", "extra": "e"}));
    // superclass properties are filled from the same input, and the
    // concrete class wins the discriminator
    assert_eq!(instance["common"], "c");
    assert_eq!(instance["extra"], "e");
    assert_eq!(instance["@class"], ".Special");
}

#[test]
fn test_hydrate_unknown_class_passes_through() {
    let model = nested_model();
    let value = json!({"anything": 1});
    assert_eq!(hydrate(&model, "NotEmitted", &value), value);
}

// ============================================================================
// Round-trip law
// ============================================================================

#[rstest]
#[case(json!({"inner": {"v": "a"}, "tags": ["x", "y"], "kids": [{"v": "b"}, {"v": "c"}]}))]
#[case(json!({"inner": {"v": "a"}, "tags": [], "kids": [], "extra": {"v": "opt"}}))]
fn test_round_trip(#[case] plain: Value) {
    let model = nested_model();

    let first = hydrate(&model, "Outer", &plain);
    let stripped = strip_discriminators(&first);
    let second = hydrate(&model, "Outer", &stripped);

    assert_eq!(first, second);
}

// ============================================================================
// Choice invariant
// ============================================================================

fn choice_model() -> ClassModel {
    generate(
        r#"<xs:complexType name="contact">
             <xs:choice>
               <xs:element name="email" type="xs:string"/>
               <xs:element name="phone" type="xs:string"/>
               <xs:element name="fax" type="xs:string"/>
             </xs:choice>
           </xs:complexType>"#,
    )
}

#[rstest]
#[case("email", "phone")]
#[case("phone", "email")]
#[case("email", "fax")]
#[case("fax", "email")]
#[case("phone", "fax")]
#[case("fax", "phone")]
fn test_choice_leaves_exactly_one_slot(#[case] first: &str, #[case] second: &str) {
    let model = choice_model();
    let mut instance = hydrate(&model, "Contact", &json!({}));

    assert!(apply_choice(&model, "Contact", &mut instance, first, json!("1")));
    assert!(apply_choice(&model, "Contact", &mut instance, second, json!("2")));

    let slots = ["email", "phone", "fax"];
    let populated: Vec<&str> = slots
        .iter()
        .copied()
        .filter(|s| instance.get(s).is_some())
        .collect();
    assert_eq!(populated, vec![second]);
    assert_eq!(instance[second], "2");
}

#[test]
fn test_choice_unknown_method_is_rejected() {
    let model = choice_model();
    let mut instance = hydrate(&model, "Contact", &json!({}));
    assert!(!apply_choice(
        &model,
        "Contact",
        &mut instance,
        "pager",
        json!("1")
    ));
}

// ============================================================================
// Termination law on cyclic inheritance
// ============================================================================

fn cyclic_ast() -> AstNode {
    AstNode::new(AstKind::Class)
        .named("Cyclic")
        .prop(
            Attr::Xmlns(SmolStr::from("xs")),
            AttrValue::Text(SmolStr::from(XSD)),
        )
        .prop(
            Attr::Xmlns(SmolStr::from("tns")),
            AttrValue::Text(SmolStr::from("urn:c")),
        )
        .prop(
            Attr::TargetNamespace,
            AttrValue::Text(SmolStr::from("urn:c")),
        )
        .with_child(
            AstNode::new(AstKind::Class)
                .named("X")
                .prop(Attr::Base, AttrValue::Text(SmolStr::from("tns:Y"))),
        )
        .with_child(
            AstNode::new(AstKind::Class)
                .named("Y")
                .prop(Attr::Base, AttrValue::Text(SmolStr::from("tns:X"))),
        )
}

#[test]
fn test_mutual_base_cycle_terminates() {
    // a two-class mutual-base cycle must not hang the linearization
    let model = ClassGenerator::new().generate(&cyclic_ast()).unwrap();

    let x = model.class("X").unwrap();
    let y = model.class("Y").unwrap();
    assert_eq!(x.superclass(), Some("Y"));
    assert_eq!(y.superclass(), Some("X"));
}

#[test]
fn test_hydrating_cyclic_hierarchy_terminates() {
    let model = ClassGenerator::new().generate(&cyclic_ast()).unwrap();
    let instance = hydrate(&model, "X", &json!({}));
    assert_eq!(instance["@class"], ".X");
}
