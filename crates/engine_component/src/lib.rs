//! # engine_component
//!
//! The "C" in ECS: what a component is, how values of one component type are
//! stored, and how they are converted to and from JSON.
//!
//! This crate provides:
//!
//! - [`Component`] trait — the contract all registry data must satisfy.
//! - [`Entity`] / [`EntityAllocator`] — opaque `u64` handles.
//! - [`Storage`] / [`TypedStorage`] — ordered per-type storage, typed and erased.
//! - [`ComponentFactory`] — name → storage constructor table.
//! - [`Encoder`] / [`Reflect`] / [`encoder!`] — field-list reflection encoder.
//! - [`QueryDescriptor`] — run-time entity selection by component names.

pub mod component;
pub mod encoder;
pub mod entity;
pub mod error;
pub mod factory;
pub mod query;
pub mod storage;

pub use component::{Component, ComponentTypeId};
pub use encoder::{Encodable, EncodeError, Encoder, Field, MapKey, Reflect};
pub use entity::{Entity, EntityAllocator};
pub use error::ComponentError;
pub use factory::ComponentFactory;
pub use query::QueryDescriptor;
pub use storage::{Storage, TypedStorage};

// `encoder!` expands to `$crate::serde_json` paths.
pub use serde_json;
