//! Error types for class generation.

use thiserror::Error;

use crate::dom::DomError;

/// Errors that can occur while generating a class model.
///
/// A document that fails to parse is *not* an error: generation yields an
/// empty model and the caller decides whether emptiness is meaningful.
/// Only defects that poison all downstream resolution are surfaced here.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The meta-namespace or target-namespace prefix cannot be uniquely
    /// determined from the document's attributes.
    #[error("ambiguous namespace declaration: {0}")]
    AmbiguousNamespace(String),

    /// The input XML could not be read at all.
    #[error(transparent)]
    Dom(#[from] DomError),
}
