//! Registry and scene error types.

use engine_component::{ComponentError, Entity};

/// Errors raised by [`Registry`](crate::Registry) operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No component type is registered under this name.
    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    /// A strict accessor found the entity without the requested component.
    #[error("{entity} has no {component} component")]
    MissingComponent {
        component: &'static str,
        entity: Entity,
    },

    /// The handle was released and cleaned up; it must not be used again.
    #[error("{0} was released and cleaned up")]
    StaleHandle(Entity),

    /// A handle is zero or could not be parsed from a document key.
    #[error("invalid entity handle: {0:?}")]
    InvalidHandle(String),

    /// A scene document does not have the `{ handle: { type: fields } }` shape.
    #[error("malformed scene document: {0}")]
    InvalidDocument(String),

    /// The storage registered under a type name holds a different Rust type.
    #[error("component type name {0} is bound to a different Rust type")]
    TypeConflict(&'static str),

    #[error(transparent)]
    Component(ComponentError),
}

impl From<ComponentError> for RegistryError {
    fn from(err: ComponentError) -> Self {
        match err {
            ComponentError::UnknownComponentType(name) => Self::UnknownComponentType(name),
            other => Self::Component(other),
        }
    }
}

/// Errors raised while saving or loading scenes.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("scene I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("scene JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode MessagePack snapshot: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode MessagePack snapshot: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
