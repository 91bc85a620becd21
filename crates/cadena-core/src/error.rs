//! Error types for pipeline construction and execution.

use thiserror::Error;

/// Convenience alias used throughout the cadena crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the processor registry, the pipe algebra and the
/// execution engine.
///
/// All variants are raised synchronously at the point of violation; the
/// engine never retries a failed stage.
#[derive(Debug, Error)]
pub enum Error {
    /// A processor id does not match `^[a-z][_a-z0-9]*$`.
    #[error("processor type '{type_name}' has malformed id '{id}'")]
    MalformedId {
        /// Type whose registration was rejected.
        type_name: String,
        /// The offending id.
        id: String,
    },

    /// Two distinct processor types claim the same id.
    #[error("duplicate processor id '{id}': registered by '{existing}', claimed by '{new}'")]
    DuplicateId {
        /// The contested id.
        id: String,
        /// Type that already holds the registration.
        existing: String,
        /// Type that attempted to re-register it.
        new: String,
    },

    /// No processor registered under the requested id.
    #[error("no processor registered with id '{id}'")]
    NotFound {
        /// The unknown id.
        id: String,
    },

    /// The pipe algebra was handed something that cannot become a stage.
    #[error("cannot add {what} to a pipe")]
    UnsupportedPipeElement {
        /// Description of the rejected element.
        what: String,
    },

    /// A stage was driven outside its contract.
    #[error("processor '{id}': {reason}")]
    UnsupportedOperation {
        /// Id of the offending stage.
        id: String,
        /// What the stage refused to do.
        reason: String,
    },

    /// `run()` was invoked on a pipe with no source.
    #[error("cannot run an empty pipe")]
    EmptyPipe,

    /// A stage's backing resource (file, codec) failed.
    #[error("stage '{id}' failed: {source}")]
    Stage {
        /// Id of the failing stage.
        id: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Create a [`Error::MalformedId`].
    pub fn malformed_id(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Error::MalformedId {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// Create a [`Error::DuplicateId`] naming both colliding types.
    pub fn duplicate_id(
        id: impl Into<String>,
        existing: impl Into<String>,
        new: impl Into<String>,
    ) -> Self {
        Error::DuplicateId {
            id: id.into(),
            existing: existing.into(),
            new: new.into(),
        }
    }

    /// Create a [`Error::NotFound`].
    pub fn not_found(id: impl Into<String>) -> Self {
        Error::NotFound { id: id.into() }
    }

    /// Create a [`Error::UnsupportedPipeElement`].
    pub fn unsupported_element(what: impl Into<String>) -> Self {
        Error::UnsupportedPipeElement { what: what.into() }
    }

    /// Create a [`Error::UnsupportedOperation`].
    pub fn unsupported_operation(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::UnsupportedOperation {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a backend failure as a [`Error::Stage`].
    pub fn stage(
        id: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Stage {
            id: id.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "mock")
    }

    // --- factory methods ---

    #[test]
    fn malformed_id_factory_produces_correct_variant() {
        let err = Error::malformed_id("BadStage", "Bad-Id");
        assert!(matches!(err, Error::MalformedId { .. }));
    }

    #[test]
    fn stage_factory_boxes_the_source() {
        let err = Error::stage("wav_enc", mock_io_err());
        assert!(matches!(err, Error::Stage { .. }));
        assert!(err.source().is_some());
    }

    // --- display ---

    #[test]
    fn duplicate_id_names_both_types() {
        let err = Error::duplicate_id("gain", "Gain", "OtherGain");
        let msg = err.to_string();
        assert!(msg.contains("gain"));
        assert!(msg.contains("Gain"));
        assert!(msg.contains("OtherGain"));
    }

    #[test]
    fn unsupported_operation_mentions_stage_id() {
        let err = Error::unsupported_operation("wav_dec", "source stage does not accept input");
        assert_eq!(
            err.to_string(),
            "processor 'wav_dec': source stage does not accept input"
        );
    }

    #[test]
    fn not_found_display() {
        assert_eq!(
            Error::not_found("mystery").to_string(),
            "no processor registered with id 'mystery'"
        );
    }

    #[test]
    fn empty_pipe_display() {
        assert_eq!(Error::EmptyPipe.to_string(), "cannot run an empty pipe");
    }

    // --- source chain ---

    #[test]
    fn taxonomy_variants_have_no_source() {
        assert!(Error::not_found("x").source().is_none());
        assert!(Error::EmptyPipe.source().is_none());
        assert!(Error::unsupported_element("an integer").source().is_none());
    }
}
