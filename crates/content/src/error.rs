//! Content loading failures.

use thiserror::Error;

/// Anything that can go wrong while parsing or resolving a catalog.
#[derive(Debug, Error)]
pub enum ContentError {
    /// A RON document failed to parse.
    #[error("failed to parse {file}: {source}")]
    Parse {
        file: &'static str,
        #[source]
        source: ron::error::SpannedError,
    },

    /// A modifier or magnitude named an attribute no attribute set defines.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// A contained-effect, cost or cooldown reference has no catalog entry.
    #[error("unknown effect '{0}'")]
    UnknownEffect(String),

    /// Two entries in one catalog share a name.
    #[error("duplicate definition '{0}'")]
    Duplicate(String),

    /// Contained effects form a reference cycle.
    #[error("effect '{0}' contains itself, directly or through another effect")]
    CyclicContainment(String),
}
