//! Informer error types.
//!
//! Steady-state failures (transport, expired cursors, handler failures) are
//! absorbed by the reflector loop and only ever logged; the one error that is
//! meant to stop a process is [`InformerError::SchemaConfirmation`].

use resource_client::ClientError;
use thiserror::Error;

/// Errors surfaced by the informer crate.
#[derive(Debug, Error)]
pub enum InformerError {
    /// A schema could neither be found nor created at startup
    #[error("Schema {name} could not be confirmed: {source}")]
    SchemaConfirmation {
        /// Qualified schema name
        name: String,
        /// Underlying client failure
        #[source]
        source: ClientError,
    },

    /// A handler callback returned an error or panicked
    #[error("Handler failed on {kind} of {collection} {key}: {message}")]
    HandlerFailure {
        /// Collection the notification belongs to
        collection: String,
        /// Object key the notification was for
        key: String,
        /// Notification kind (add/update/delete)
        kind: &'static str,
        /// Error or panic message
        message: String,
    },

    /// `Controller::run` was called on a controller that already ran
    #[error("Controller for {0} was already started")]
    AlreadyStarted(String),
}
