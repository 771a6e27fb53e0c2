//! Heuristic rewriting of value patterns into alias types.
//!
//! A restriction pattern occasionally pins an alias down to something
//! more useful than its base type: an alternation of plain literals
//! becomes a literal union, an all-digits pattern becomes a number.
//! Anything more expressive keeps the underlying type.

/// Rewrite `pattern` into an alias type, or fall back to `fallback`.
pub(crate) fn pattern_to_alias(pattern: &str, fallback: &str) -> String {
    if let Some(literals) = literal_alternation(pattern) {
        return literals
            .iter()
            .map(|l| format!("\"{l}\""))
            .collect::<Vec<_>>()
            .join("|");
    }
    if is_digit_pattern(pattern) {
        return "number".to_string();
    }
    fallback.to_string()
}

/// `A|B|C` with purely literal branches.
fn literal_alternation(pattern: &str) -> Option<Vec<&str>> {
    let branches: Vec<&str> = pattern.split('|').collect();
    if branches.len() < 2 {
        return None;
    }
    let literal = |b: &&str| {
        !b.is_empty()
            && b.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' '))
    };
    branches.iter().all(literal).then_some(branches)
}

/// Patterns built only from digit classes and repetition, like
/// `[0-9]{4}` or `\d+`.
fn is_digit_pattern(pattern: &str) -> bool {
    let stripped = pattern.replace("[0-9]", "").replace("\\d", "");
    if stripped.len() == pattern.len() {
        return false;
    }
    stripped
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '{' | '}' | ',' | '+' | '*' | '?'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A|B|C", "\"A\"|\"B\"|\"C\"")]
    #[case("on|off", "\"on\"|\"off\"")]
    #[case("[0-9]{4}", "number")]
    #[case("\\d+", "number")]
    #[case("[A-Z]{2}[0-9]*", "string")]
    #[case("literal", "string")]
    fn test_pattern_to_alias(#[case] pattern: &str, #[case] expected: &str) {
        assert_eq!(pattern_to_alias(pattern, "string"), expected);
    }
}
