//! Core [`Component`] trait and type identity.
//!
//! Every piece of data stored in a registry implements [`Component`]. A
//! component is a plain value: it carries no handle of its own and knows
//! nothing about the registry that stores it.
//!
//! ## Type identity
//!
//! Component types are addressed by a stable **string name** so that scene
//! documents can name them. [`ComponentTypeId`] is the FNV-1a 64-bit hash of
//! that name and is what storage tables are keyed by.

use serde::{Deserialize, Serialize};

use crate::encoder::Encoder;

/// Key of a component type in factory and storage tables.
///
/// Derived from [`Component::type_name`] so the same name maps to the same id
/// in every process, which is what lets scene documents refer to types by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;

    /// FNV-1a (64-bit) of `name`.
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::OFFSET;
        let mut i = 0;
        while i < bytes.len() {
            hash = (hash ^ bytes[i] as u64).wrapping_mul(Self::PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// The id of component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

/// The core component trait.
///
/// `Default` is required because a registry can lazily create a component
/// ([`get`-style auto-vivifying access](crate::storage::Storage::get_or_default))
/// and because decoding starts from the default value. `Clone` is required
/// for entity copies and whole-storage clones.
///
/// A type that wants to be persisted additionally overrides
/// [`Component::encoder`], normally by pointing it at the field list the
/// [`encoder!`](crate::encoder!) macro generates.
///
/// # Examples
///
/// ```rust
/// use engine_component::{Component, Encodable, Encoder, encoder};
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// encoder!(Health {
///     "current" => current: f32,
///     "max" => max: f32,
/// });
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
///     fn encoder() -> Option<&'static Encoder<Self>> { Some(Self::encoding()) }
/// }
/// ```
pub trait Component: Clone + Default + 'static {
    /// Name used in scene documents and name-based lookups. Must be unique
    /// per process.
    fn type_name() -> &'static str;

    /// Storage table key, derived from the name.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }

    /// The field list used to persist this component, if it has one.
    ///
    /// Types returning `None` are kept in memory like any other component
    /// but are skipped when a scene is saved.
    fn encoder() -> Option<&'static Encoder<Self>> {
        None
    }
}
