//! # xsdgen-base
//!
//! Core library for XSD schema parsing, AST, and class model generation.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! codegen   → class generation engine, output model, hydration runtime
//!   ↓
//! grammar   → XSD grammar built on the parslet engine
//!   ↓
//! parser    → parslet combinator engine, AST model
//!   ↓
//! dom       → read-only element tree boundary, quick-xml document
//!   ↓
//! base      → primitives (casing, qualified names, primitive type mapping)
//! ```
//!
//! A schema document flows through the pipeline as:
//! input tree → parslet grammar → [`parser::AstNode`] → generation engine →
//! [`codegen::ClassModel`] → external renderer.

// ============================================================================
// MODULES (dependency order: base → dom → parser → grammar → codegen)
// ============================================================================

/// Foundation helpers: casing, qualified names, primitive type mapping
pub mod base;

/// Read-only element tree boundary and the quick-xml backed document
pub mod dom;

/// Parslet combinator engine and the AST it produces
pub mod parser;

/// The concrete XSD grammar, assembled on the parslet engine
pub mod grammar;

/// Class generation engine, output model, and hydration runtime
pub mod codegen;

// Re-export the types most callers need
pub use codegen::{ClassGenerator, ClassModel, GenOptions, GenerateError, ModelRenderer};
pub use dom::{TreeNode, XmlDocument, XmlElement};
pub use grammar::xsd_grammar;
pub use parser::{AstKind, AstNode, Attr, AttrValue, Descent, Grammar, GrammarBuilder, Terminal};
