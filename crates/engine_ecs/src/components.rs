//! Core components shared by every registry: naming, prototypes, and the
//! parent/child hierarchy.

use engine_component::{
    Component, ComponentError, ComponentFactory, Encodable, Encoder, Entity, encoder,
};
use engine_math::Transform;

/// Display name and persistence scope of an entity.
///
/// `scope == 0` marks entities that belong in saved scenes; anything else is
/// runtime-only (editor cameras, viewports, and the like).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub name: String,
    pub scope: i32,
    pub active: bool,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            name: String::new(),
            scope: 0,
            active: true,
        }
    }
}

encoder!(Info {
    "name" => name: String,
    "scope" => scope: i32,
    "active" => active: bool,
});

impl Component for Info {
    fn type_name() -> &'static str {
        "Info"
    }

    fn encoder() -> Option<&'static Encoder<Self>> {
        Some(Self::encoding())
    }
}

/// Placeholder that should be replaced by an instance of the prototype
/// loaded from `path`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ref {
    pub path: String,
}

encoder!(Ref {
    "ref" => path: String,
});

impl Component for Ref {
    fn type_name() -> &'static str {
        "Ref"
    }

    fn encoder() -> Option<&'static Encoder<Self>> {
        Some(Self::encoding())
    }
}

/// Root of a prototype subtree loaded from `path`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proto {
    pub path: String,
}

encoder!(Proto {
    "proto" => path: String,
});

impl Component for Proto {
    fn type_name() -> &'static str {
        "Proto"
    }

    fn encoder() -> Option<&'static Encoder<Self>> {
        Some(Self::encoding())
    }
}

/// Marks an entity produced by instantiating a prototype. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Instance;

impl Component for Instance {
    fn type_name() -> &'static str {
        "Instance"
    }
}

/// Parent link and ordered child list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relation {
    pub parent: Entity,
    pub children: Vec<Entity>,
}

impl Relation {
    pub fn add(&mut self, child: Entity) {
        self.children.push(child);
    }
}

encoder!(Relation {
    "parent" => parent: Entity,
    "children" => children: Vec<Entity>,
});

impl Component for Relation {
    fn type_name() -> &'static str {
        "Relation"
    }

    fn encoder() -> Option<&'static Encoder<Self>> {
        Some(Self::encoding())
    }
}

/// Build a factory holding the core components and [`Transform`].
///
/// Called once at start-up; callers register their own types on the result
/// before sharing it.
pub fn register_all_components() -> Result<ComponentFactory, ComponentError> {
    let mut factory = ComponentFactory::new();
    factory.register::<Info>()?;
    factory.register::<Ref>()?;
    factory.register::<Proto>()?;
    factory.register::<Instance>()?;
    factory.register::<Relation>()?;
    factory.register::<Transform>()?;
    Ok(factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_all_components() {
        let factory = register_all_components().unwrap();
        assert_eq!(
            factory.type_names(),
            vec!["Info", "Instance", "Proto", "Ref", "Relation", "Transform"]
        );
    }

    #[test]
    fn test_info_defaults_active() {
        let info = Info::default();
        assert!(info.active);
        assert_eq!(info.scope, 0);
    }

    #[test]
    fn test_ref_and_proto_keys() {
        let r = Ref {
            path: "models/tree.glb".into(),
        };
        assert_eq!(
            Ref::encoding().serialize(&r),
            json!({"ref": "models/tree.glb"})
        );
        let p = Proto {
            path: "models/tree.glb".into(),
        };
        assert_eq!(
            Proto::encoding().serialize(&p),
            json!({"proto": "models/tree.glb"})
        );
    }

    #[test]
    fn test_relation_encodes_handles_as_numbers() {
        let mut rel = Relation {
            parent: Entity(1),
            children: Vec::new(),
        };
        rel.add(Entity(2));
        rel.add(Entity(3));
        assert_eq!(
            Relation::encoding().serialize(&rel),
            json!({"parent": 1, "children": [2, 3]})
        );
    }

    #[test]
    fn test_instance_is_not_serializable() {
        assert!(Instance::encoder().is_none());
    }
}
