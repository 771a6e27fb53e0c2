//! Class generation: AST → ordered class/enum model.
//!
//! The engine consumes the AST produced by parsing and emits a
//! [`ClassModel`]: dependency-ordered classes with inheritance, choice
//! methods, synthesized hydrating constructors, plus type aliases, enums,
//! and cross-document import requests.
//!
//! ## Architecture
//!
//! ```text
//! AstNode (document root)
//!     ↓
//! GenContext          per-invocation namespaces, groups, imports
//!     ↓
//! ClassGenerator      declaration passes, body construction
//!     ↓
//! topological pass    depth ordering, wrapper elision, group flattening,
//!                     constructor synthesis
//!     ↓
//! ClassModel          handed to an external ModelRenderer
//! ```
//!
//! All mutable state lives in a per-call generation context; concurrent
//! generations never share registries.

pub mod context;
mod error;
mod generator;
pub mod hydrate;
pub mod model;
mod patterns;

pub use context::GenOptions;
pub use error::GenerateError;
pub use generator::ClassGenerator;
pub use model::{
    AliasDef, AliasKind, ClassDef, ClassModel, CtorDef, CtorStep, DISCRIMINATOR, EnumDef,
    EnumMember, Import, MethodDef, ModelRenderer, PropertyDef, TypeRef,
};
