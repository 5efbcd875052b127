//! # engine_ecs
//!
//! The entity registry and everything built directly on it:
//!
//! - [`Registry`] — storages, handles, deferred deletion, joins, queries.
//! - [`Bundle`] — tuples of components for [`Registry::create_entity`].
//! - [`components`] — `Info`, `Ref`, `Proto`, `Instance`, `Relation`.
//! - [`hierarchy`] — parent/child walks and prototype instantiation.
//! - [`scene`] — JSON scene documents, scene files, MessagePack snapshots.

pub mod bundle;
pub mod components;
pub mod error;
pub mod hierarchy;
mod join;
mod query;
pub mod registry;
pub mod scene;

pub use bundle::Bundle;
pub use components::{Info, Instance, Proto, Ref, Relation, register_all_components};
pub use error::{RegistryError, SceneError};
pub use hierarchy::{add_children, ancestors, has_ancestor_component, instantiate};
pub use registry::{EntityInfo, Registry};
pub use scene::{from_msgpack, load_scene, persistable_entities, save_scene, to_msgpack};
