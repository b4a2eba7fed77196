//! Error type shared by the watcher and the reconciler, plus the classification helpers that
//! decide what happens after a failure.

use kube::error::ErrorResponse;
use thiserror::Error;

/// Errors produced by the namespace isolator.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to list namespaces: {0}")]
    List(#[source] kube::Error),

    #[error("failed to open namespace watch: {0}")]
    Watch(#[source] kube::Error),

    #[error("namespace watch stream failed: {0}")]
    Stream(#[source] kube::Error),

    #[error("namespace watch returned error status: {0}")]
    Status(#[source] ErrorResponse),

    #[error("event channel closed")]
    ChannelClosed,

    #[error("failed to create network policy in namespace {namespace}: {source}")]
    CreatePolicy {
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// What the watch loop does after an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// The watch position aged out of the server's history; list again and resume.
    Relist,
    /// Nothing this controller can safely paper over.
    Fatal,
}

impl Error {
    /// Map an error to the watch loop's next move. Only an expired position is recoverable.
    pub fn recovery(&self) -> Recovery {
        match self {
            Error::Status(status) if is_expired(status) => Recovery::Relist,
            Error::Watch(kube::Error::Api(status)) if is_expired(status) => Recovery::Relist,
            // A watch request rejected with 410 surfaces as the first item of the stream.
            Error::Stream(kube::Error::Api(status)) if is_expired(status) => Recovery::Relist,
            _ => Recovery::Fatal,
        }
    }
}

/// True if the status says the requested resource version is too old (410 Gone / Expired).
pub fn is_expired(status: &ErrorResponse) -> bool {
    status.code == 410 || status.reason == "Expired" || status.reason == "Gone"
}

/// True if a create call was rejected because the object is already there (409 Conflict).
pub fn is_already_exists(error: &kube::Error) -> bool {
    matches!(
        error,
        kube::Error::Api(ErrorResponse { code, reason, .. })
            if *code == 409 || reason == "AlreadyExists"
    )
}
