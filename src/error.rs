// src/error.rs
//! Error handling for the material subsystem.
//!
//! Every variant is a programmer error: misuse of the material API or a broken
//! shading-type invariant. Nothing here is repaired at runtime; callers get an
//! `Err` that names the offending material and the invariant it broke.

use std::thread::ThreadId;
use thiserror::Error;

/// Main error type for the crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MaterialError {
    /// A texture, cubemap or shader has no resolved render resource.
    #[error("material '{material}': {what} has no render resource")]
    NullArgument { material: String, what: String },

    /// Texture/cubemap slot access past the end of the list.
    #[error("material '{material}': {what} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        material: String,
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A mutation or a build that would leave the material in an illegal state.
    #[error("material '{material}': {reason}")]
    InvalidStateTransition { material: String, reason: String },

    /// Shading-type name that is not one of unlit, blinn, custom or skybox.
    #[error("unsupported shading type '{0}'")]
    UnsupportedShadingType(String),

    /// Render group requested from a thread other than the render thread.
    #[error("material '{material}': render group requested on {actual:?}, render thread is {expected:?}")]
    ConcurrencyViolation {
        material: String,
        expected: ThreadId,
        actual: ThreadId,
    },

    /// Malformed manager configuration.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Simple custom message.
    #[error("{0}")]
    Custom(String),

    /// Context chaining.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        #[source]
        source: Box<MaterialError>,
    },
}

impl MaterialError {
    #[inline]
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::Custom(msg.into())
    }

    /// Wrap with a context message (chainable).
    #[inline]
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    #[inline]
    pub(crate) fn invalid_state(material: &str, reason: impl Into<String>) -> Self {
        Self::InvalidStateTransition {
            material: material.to_owned(),
            reason: reason.into(),
        }
    }

    #[inline]
    pub(crate) fn null_argument(material: &str, what: impl Into<String>) -> Self {
        Self::NullArgument {
            material: material.to_owned(),
            what: what.into(),
        }
    }

    #[inline]
    pub(crate) fn out_of_bounds(material: &str, what: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            material: material.to_owned(),
            what,
            index,
            len,
        }
    }

    // === kind checks ===
    #[inline]
    pub fn is_null_argument(&self) -> bool {
        matches!(self.root(), Self::NullArgument { .. })
    }

    #[inline]
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self.root(), Self::IndexOutOfBounds { .. })
    }

    #[inline]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self.root(), Self::InvalidStateTransition { .. })
    }

    #[inline]
    pub fn is_concurrency_violation(&self) -> bool {
        matches!(self.root(), Self::ConcurrencyViolation { .. })
    }

    /// Innermost error beneath any context wrappers.
    pub fn root(&self) -> &MaterialError {
        let mut err = self;
        while let Self::WithContext { source, .. } = err {
            err = source;
        }
        err
    }
}

/// Convenient `Result` alias, use `crate::Result<T>` everywhere.
pub type Result<T> = std::result::Result<T, MaterialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MaterialError::out_of_bounds("crate_lid", "texture", 3, 1);
        assert_eq!(
            err.to_string(),
            "material 'crate_lid': texture index 3 out of bounds (len 1)"
        );

        let err = MaterialError::UnsupportedShadingType("toon".into());
        assert_eq!(err.to_string(), "unsupported shading type 'toon'");
    }

    #[test]
    fn test_context_keeps_kind() {
        let err = MaterialError::invalid_state("sky", "needs exactly one cubemap")
            .context("building render group");
        assert!(err.is_invalid_state());
        assert!(!err.is_null_argument());
        assert_eq!(
            err.to_string(),
            "building render group: material 'sky': needs exactly one cubemap"
        );
    }
}
