//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`BridgeError`]
//! via `#[from]`.

/// Top-level error returned by domain and application operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A device lookup failed.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A registration violated a domain invariant.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// An inbound payload could not be turned into a device command.
    #[error("invalid command")]
    Normalize(#[from] NormalizeError),

    /// A hub could not be started.
    #[error("hub {index} failed to start")]
    HubLaunch {
        index: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// The requested device does not exist in the registry.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Domain invariant violations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The accessory id is empty once formatted into a registry key.
    #[error("accessory id must not be empty")]
    EmptyId,

    /// The accessory name is empty.
    #[error("name must not be empty")]
    EmptyName,

    /// Another accessory already owns the registry key.
    #[error("key {uuid} already belongs to accessory {existing_id}")]
    DuplicateUuid { uuid: String, existing_id: String },
}

/// Reasons a raw command could not be normalized.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The payload shape carries no recognizable instruction.
    #[error("unrecognized command payload: {0}")]
    Unrecognized(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_not_found_with_entity_and_id() {
        let err = NotFoundError {
            entity: "Device",
            id: "kitchen".to_string(),
        };
        assert_eq!(err.to_string(), "Device kitchen not found");
    }

    #[test]
    fn should_convert_not_found_into_bridge_error() {
        let err: BridgeError = NotFoundError {
            entity: "Device",
            id: "x".to_string(),
        }
        .into();
        assert!(matches!(err, BridgeError::NotFound(_)));
    }

    #[test]
    fn should_convert_normalize_error_into_bridge_error() {
        let err: BridgeError = NormalizeError::Unrecognized("null".to_string()).into();
        assert!(matches!(err, BridgeError::Normalize(_)));
    }
}
