//! Parslet combinator engine for tree-shaped input.
//!
//! The parser does not lex text: it walks an already-tokenized element
//! tree (anything implementing [`crate::dom::TreeNode`]) and builds
//! [`AstNode`] values. Grammars are assembled once from composable rules
//! ("parslets") and then applied to any number of documents.
//!
//! ## Architecture
//!
//! ```text
//! TreeNode position (element, or end-of-chain)
//!     ↓
//! Grammar rules: Terminal / Matcher / OneOf / Sibblings / Empty / Proxy
//!     ↓
//! AstNode tree (merged bottom-up, ordered children)
//! ```
//!
//! A rule either produces an [`AstNode`] or fails with `None`; failure is
//! total within a rule — no partial results escape, and enclosing rules
//! fall through to their next alternative (or fail themselves).

pub mod ast;
pub mod parslet;

pub use ast::{
    AstKind, AstNode, Attr, AttrValue, ast_class, ast_enum_value, ast_field, ast_node,
};
pub use parslet::{Descent, Grammar, GrammarBuilder, Merger, RuleId, Terminal};
