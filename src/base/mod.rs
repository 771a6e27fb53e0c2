//! Foundation helpers for the xsdgen toolchain.
//!
//! This module provides the small, dependency-free primitives used
//! throughout the compiler:
//! - [`cap_first`], [`low_first`] - identifier casing
//! - [`sanitize_member`] - enum member sanitizing
//! - [`QName`] - `prefix:local` qualified name splitting
//! - [`field_type_for`] - XSD primitive → target primitive mapping
//!
//! This module has NO dependencies on other xsdgen modules.

use smol_str::SmolStr;

/// Capitalize the first character, leaving the rest untouched.
pub fn cap_first(s: &str) -> SmolStr {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => {
            let mut out = String::with_capacity(s.len());
            out.extend(c.to_uppercase());
            out.push_str(chars.as_str());
            SmolStr::from(out)
        }
        None => SmolStr::default(),
    }
}

/// Lowercase the first character, leaving the rest untouched.
pub fn low_first(s: &str) -> SmolStr {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => {
            let mut out = String::with_capacity(s.len());
            out.extend(c.to_lowercase());
            out.push_str(chars.as_str());
            SmolStr::from(out)
        }
        None => SmolStr::default(),
    }
}

/// Rewrite an enumeration literal into a legal identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, so values like
/// `"A+"` or `"no-break"` stay distinguishable as `A_` and `no_break`.
pub fn sanitize_member(s: &str) -> SmolStr {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .into()
}

/// A `prefix:local` qualified name as it appears in schema attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<SmolStr>,
    pub local: SmolStr,
}

impl QName {
    /// Split a raw attribute value into prefix and local part.
    ///
    /// `"tns:Item"` → prefix `tns`, local `Item`; `"Item"` → no prefix.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(SmolStr::from(prefix)),
                local: SmolStr::from(local),
            },
            None => Self {
                prefix: None,
                local: SmolStr::from(raw),
            },
        }
    }
}

/// Map a raw XSD type reference to a target-language type name.
///
/// Built-in XSD primitives collapse to the target primitives; anything else
/// is namespace-qualified: `ns:Local` becomes `ns.Local` (prefix lowered,
/// local part capitalized). When `default_alias` is given and the raw type
/// carries no prefix, the type is re-qualified under that alias — the rule
/// for schemas whose element types live in the document's default namespace.
pub fn field_type_for(raw: &str, default_alias: Option<&str>) -> SmolStr {
    let key = raw
        .rsplit(':')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mapped = match key.as_str() {
        "string" | "base64binary" => Some("string"),
        "float" | "double" | "int" | "integer" | "long" | "positiveinteger"
        | "nonnegativeinteger" | "decimal" => Some("number"),
        "datetime" | "date" => Some("Date"),
        "boolean" => Some("boolean"),
        _ => None,
    };
    if let Some(primitive) = mapped {
        return SmolStr::from(primitive);
    }
    if raw.is_empty() {
        return SmolStr::from("any");
    }

    let qualified = match default_alias {
        Some(alias) if !raw.contains(':') => {
            format!("{}.{}", alias.to_lowercase(), cap_first(raw))
        }
        _ => {
            let parts: Vec<&str> = raw.split(':').collect();
            let last = parts.len() - 1;
            parts
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    if i < last {
                        p.to_lowercase()
                    } else {
                        cap_first(p).to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(".")
        }
    };
    if qualified == "Number" {
        return SmolStr::from("number");
    }
    SmolStr::from(qualified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("item", "Item")]
    #[case("Item", "Item")]
    #[case("", "")]
    fn test_cap_first(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(cap_first(input), expected);
    }

    #[rstest]
    #[case("xs:string", "string")]
    #[case("xs:positiveInteger", "number")]
    #[case("xs:dateTime", "Date")]
    #[case("xs:boolean", "boolean")]
    #[case("tns:Item", "tns.Item")]
    #[case("TNS:item", "tns.Item")]
    #[case("", "any")]
    fn test_field_type_for(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(field_type_for(raw, None), expected);
    }

    #[test]
    fn test_field_type_default_alias() {
        assert_eq!(field_type_for("item", Some("xmlns")), "xmlns.Item");
        // primitives win over qualification
        assert_eq!(field_type_for("string", Some("xmlns")), "string");
    }

    #[test]
    fn test_sanitize_member() {
        assert_eq!(sanitize_member("A+"), "A_");
        assert_eq!(sanitize_member("no-break space"), "no_break_space");
    }

    #[test]
    fn test_qname() {
        let q = QName::parse("tns:Item");
        assert_eq!(q.prefix.as_deref(), Some("tns"));
        assert_eq!(q.local, "Item");
        assert_eq!(QName::parse("Item").prefix, None);
    }
}
