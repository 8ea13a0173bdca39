//! Error types for the setup surface.
//!
//! The marshalling hot path has no error type: cycled handles and missing
//! overrides resolve to benign defaults, host failures travel through return
//! values. Only installing a runtime, registering classes and resolving
//! method binds can fail.

/// Result type for setup operations
pub type BindResult<T> = Result<T, BindError>;

/// Setup error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// A process-global runtime is already installed
    #[error("a global runtime is already installed")]
    HostAlreadyInstalled,

    /// No process-global runtime has been installed
    #[error("no global runtime installed")]
    HostNotInstalled,

    /// The class name is already taken by a registered guest class
    #[error("class '{class}' is already registered")]
    ClassAlreadyRegistered {
        /// Class name
        class: String,
    },

    /// The class is not registered with this runtime
    #[error("class '{class}' is not registered")]
    UnknownClass {
        /// Class name
        class: String,
    },

    /// The host has no method with this name and signature hash
    #[error("host has no method {class}::{method} (hash {hash})")]
    MethodBindNotFound {
        /// Owning class
        class: String,
        /// Method name
        method: String,
        /// Signature hash, zero if unchecked
        hash: i64,
    },
}
