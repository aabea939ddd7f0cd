//! User-facing error classification.
//!
//! Silent errors are precondition failures the user can fix themselves.
//! The CLI prints only their message, without a cause chain.

use thiserror::Error;

use crate::core::provisioner::ProvisionError;

/// An error whose message is the whole story
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SilentError(pub String);

impl SilentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Message of the first silent error in the chain, if any
pub fn silent_message(err: &anyhow::Error) -> Option<String> {
    err.chain()
        .find(|cause| {
            cause.is::<SilentError>()
                || cause
                    .downcast_ref::<ProvisionError>()
                    .map(ProvisionError::is_silent)
                    .unwrap_or(false)
        })
        .map(|cause| cause.to_string())
}

/// Check whether any error in the chain should be reported silently
pub fn is_silent(err: &anyhow::Error) -> bool {
    silent_message(err).is_some()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use anyhow::Context;

    use super::*;

    #[test]
    fn test_silent_error_detected_through_context() {
        let err = Err::<(), _>(SilentError::new("nope"))
            .context("while scaffolding")
            .unwrap_err();
        assert!(is_silent(&err));
        assert_eq!(silent_message(&err), Some("nope".to_string()));
    }

    #[test]
    fn test_directory_exists_is_silent() {
        let err = anyhow::Error::new(ProvisionError::DirectoryExists {
            path: PathBuf::from("app"),
        });
        assert!(is_silent(&err));
    }

    #[test]
    fn test_plain_error_is_loud() {
        assert!(!is_silent(&anyhow::anyhow!("boom")));
    }
}
