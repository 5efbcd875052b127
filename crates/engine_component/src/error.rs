//! Component-layer error types.

use crate::encoder::EncodeError;

/// Errors raised by the component type registry and by typed storages.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// No component type is registered under this name.
    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    /// A different Rust type is already registered under this name.
    #[error("component type name already taken: {0}")]
    DuplicateComponentType(String),

    /// The component type declares no encoder and cannot be (de)serialised.
    #[error("component type is not serializable: {0}")]
    NotSerializable(String),

    /// A component value failed to decode.
    #[error("failed to decode component: {0}")]
    Encode(#[from] EncodeError),
}
