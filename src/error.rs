use thiserror::Error;

/// Errors surfaced by the gateway core.
///
/// Connectivity problems inside the publish path are deliberately *not* part
/// of this taxonomy: the reliable publisher reports them as a boolean outcome
/// after its bounded retry, and callers re-submit if they need delivery.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration is missing or malformed for the requested operation
    /// (e.g. no section for the active cloud profile).
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation was invoked before its collaborator was registered.
    /// This marks a wiring bug and is intentionally loud.
    #[error("collaborator not registered for role: {0}")]
    NotRegistered(&'static str),

    /// A registrant does not expose an operation its role requires.
    #[error("{role} registration rejected: missing capability {capability:?}")]
    MissingCapability {
        role: &'static str,
        capability: crate::registry::Capability,
    },

    /// Registration attempted against a role this core does not know.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// Serial transport failure (open, read, write).
    #[error("serial error: {0}")]
    Serial(String),

    /// Cloud collaborator failure outside the bounded publish retry.
    #[error("cloud error: {0}")]
    Cloud(String),

    /// Wrapper around IO errors (config file access, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
