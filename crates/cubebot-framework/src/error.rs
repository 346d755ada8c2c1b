//! Error types for the Cubebot framework.

use std::any::Any;

use thiserror::Error;

use crate::handler::HandlerKind;

/// A boxed, thread-safe error. Handler callbacks may return any error via `?`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by handler callbacks and initializers.
pub type HandlerResult = Result<(), BoxError>;

// =============================================================================
// UserError
// =============================================================================

/// An expected, user-facing failure.
///
/// The run contract recognises this error, replies with its message verbatim,
/// and does not log it. All other errors are treated as genuine failures and
/// answered with a generic message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UserError {
    /// Text shown to the user.
    pub message: String,
    /// Visibility override. `None` falls back to the handler's policy.
    pub ephemeral: Option<bool>,
}

impl UserError {
    /// Creates a user error that follows the handler's ephemeral policy.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ephemeral: None,
        }
    }

    /// Creates a user error only the invoking user can see.
    pub fn ephemeral(message: impl Into<String>) -> Self {
        Self::new(message).with_ephemeral(true)
    }

    /// Overrides the visibility of the error reply.
    pub fn with_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = Some(ephemeral);
        self
    }
}

/// Creates a [`UserError`] from a format string.
///
/// ```rust,ignore
/// return Err(user_error!("Rule {} does not exist", id).into());
/// ```
#[macro_export]
macro_rules! user_error {
    ($($arg:tt)*) => {
        $crate::UserError::new(format!($($arg)*))
    };
}

/// Returns early from a handler with a [`UserError`].
///
/// ```rust,ignore
/// if message.is_empty() {
///     user_err!("You cannot send an empty message!");
/// }
/// ```
#[macro_export]
macro_rules! user_err {
    ($($arg:tt)*) => {
        return Err($crate::UserError::new(format!($($arg)*)).into())
    };
}

/// A handler callback panicked.
#[derive(Debug, Clone, Error)]
#[error("handler panicked: {message}")]
pub struct HandlerPanic {
    pub message: String,
}

impl HandlerPanic {
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self { message }
    }
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised while assembling the handler registry.
///
/// All of these are fatal at startup.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A handler was registered with an empty routing key.
    #[error("{kind} handler in module '{module}' has an empty key")]
    EmptyKey {
        kind: HandlerKind,
        module: &'static str,
    },

    /// A modal key contains the `:` correlation delimiter and could never be routed.
    #[error("{kind} key '{key}' in module '{module}' must not contain ':'")]
    InvalidKey {
        kind: HandlerKind,
        key: String,
        module: &'static str,
    },

    /// Two handlers of the same kind share a key.
    #[error("duplicate {kind} key '{key}' registered by '{first}' and '{second}'")]
    DuplicateKey {
        kind: HandlerKind,
        key: String,
        first: &'static str,
        second: &'static str,
    },

    /// A module was included more than once.
    #[error("module '{0}' is included more than once")]
    DuplicateModule(&'static str),

    /// A module rejected its own definitions.
    #[error("module '{module}' failed to register: {message}")]
    Definition {
        module: &'static str,
        message: String,
    },
}

impl RegistryError {
    /// Creates a definition error.
    pub fn definition(module: &'static str, message: impl Into<String>) -> Self {
        Self::Definition {
            module,
            message: message.into(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

// =============================================================================
// Startup and Modal Errors
// =============================================================================

/// An initializer failed; startup must abort.
#[derive(Debug, Error)]
#[error("initializer '{name}' failed: {source}")]
pub struct InitError {
    pub name: String,
    #[source]
    pub source: BoxError,
}

/// Errors raised by [`ModalConstructor`](crate::modal::ModalConstructor).
#[derive(Debug, Clone, Error)]
pub enum ModalError {
    /// The modal builder rewrote the generated custom id.
    #[error("modal builder changed the custom id from '{expected}' to '{actual}'")]
    CustomIdChanged { expected: String, actual: String },
}

/// Errors raised by [`ConfigBag`](crate::config_bag::ConfigBag).
#[derive(Debug, Error)]
pub enum ConfigBagError {
    /// The file uses a key reserved by the bag itself.
    #[error("Cannot use the reserved property {key} in {file}")]
    ReservedKey { key: String, file: String },

    /// The bag was never loaded, or its file did not match the expected shape.
    #[error("configuration '{file}' is not loaded")]
    NotLoaded { file: String },

    /// Writing the file failed.
    #[error("failed to write '{file}': {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// Serializing the contents failed.
    #[error("failed to serialize '{file}': {source}")]
    Serialize {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}
