//! Reflection encoder: field-list driven JSON conversion.
//!
//! A persisted type lists its fields once, as `(name, accessor)` pairs, and
//! gets generic JSON conversion from that list. Each field value is converted
//! through [`Reflect`], which dispatches on the kind of value:
//!
//! 1. a type with its own field list → nested JSON object,
//! 2. a sequence (`Vec`, `VecDeque`) → array, element by element,
//! 3. a map with unique keys (`BTreeMap`, `HashMap`) → object keyed by the
//!    stringified key ([`MapKey`]), value by value,
//! 4. anything else → a JSON-native scalar.
//!
//! Decoding works in place: a field absent from the input object keeps its
//! current value, so older documents load into newer component layouts.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::hash::Hash;

use glam::{Quat, Vec2, Vec3, Vec4};
use serde_json::{Map, Value};

use crate::entity::Entity;

/// Errors raised while converting a value from JSON.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The JSON value has the wrong shape for the target type.
    #[error("expected {expected}, found {found}")]
    Mismatch {
        /// What the target type needs.
        expected: &'static str,
        /// What the document contained.
        found: &'static str,
    },

    /// A map key could not be parsed back into the key type.
    #[error("invalid map key: {0:?}")]
    InvalidKey(String),

    /// A nested field failed; wraps the underlying error with its name.
    #[error("field '{field}': {source}")]
    Field {
        /// Name of the failing field.
        field: &'static str,
        /// What went wrong inside it.
        #[source]
        source: Box<EncodeError>,
    },
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(expected: &'static str, found: &Value) -> EncodeError {
    EncodeError::Mismatch {
        expected,
        found: kind(found),
    }
}

/// Conversion of a single value to and from JSON.
pub trait Reflect: Sized {
    /// Encode `self` as JSON.
    fn to_json(&self) -> Value;

    /// Build a new value from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if `value` does not have the expected shape.
    fn from_json(value: &Value) -> Result<Self, EncodeError>;

    /// Decode JSON into an existing value.
    ///
    /// Scalars and containers are replaced wholesale; types with a field
    /// list override this to update only the fields present in `value`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if `value` does not have the expected shape.
    fn decode_into(&mut self, value: &Value) -> Result<(), EncodeError> {
        *self = Self::from_json(value)?;
        Ok(())
    }
}

macro_rules! reflect_scalar {
    ($($ty:ty => $expected:literal),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn to_json(&self) -> Value {
                    Value::from(self.clone())
                }

                fn from_json(value: &Value) -> Result<Self, EncodeError> {
                    <$ty as serde::Deserialize>::deserialize(value)
                        .map_err(|_| mismatch($expected, value))
                }
            }
        )*
    };
}

reflect_scalar! {
    bool => "bool",
    u8 => "unsigned integer",
    u16 => "unsigned integer",
    u32 => "unsigned integer",
    u64 => "unsigned integer",
    usize => "unsigned integer",
    i8 => "integer",
    i16 => "integer",
    i32 => "integer",
    i64 => "integer",
    isize => "integer",
    String => "string",
}

// JSON numbers cannot carry NaN or infinities, so those travel as strings.
macro_rules! reflect_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn to_json(&self) -> Value {
                    if self.is_finite() {
                        Value::from(*self)
                    } else if self.is_nan() {
                        Value::from("NaN")
                    } else if self.is_sign_positive() {
                        Value::from("Infinity")
                    } else {
                        Value::from("-Infinity")
                    }
                }

                fn from_json(value: &Value) -> Result<Self, EncodeError> {
                    match value.as_str() {
                        Some("NaN") => Ok(<$ty>::NAN),
                        Some("Infinity") => Ok(<$ty>::INFINITY),
                        Some("-Infinity") => Ok(<$ty>::NEG_INFINITY),
                        _ => <$ty as serde::Deserialize>::deserialize(value)
                            .map_err(|_| mismatch("number", value)),
                    }
                }
            }
        )*
    };
}

reflect_float!(f32, f64);

impl Reflect for Entity {
    fn to_json(&self) -> Value {
        Value::from(self.id())
    }

    fn from_json(value: &Value) -> Result<Self, EncodeError> {
        u64::from_json(value)
            .map(Entity)
            .map_err(|_| mismatch("entity handle", value))
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn to_json(&self) -> Value {
        match self {
            Some(inner) => inner.to_json(),
            None => Value::Null,
        }
    }

    fn from_json(value: &Value) -> Result<Self, EncodeError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_json(other).map(Some),
        }
    }
}

fn decode_array<T: Reflect, C: FromIterator<T>>(value: &Value) -> Result<C, EncodeError> {
    let items = value.as_array().ok_or_else(|| mismatch("array", value))?;
    items.iter().map(T::from_json).collect()
}

impl<T: Reflect> Reflect for Vec<T> {
    fn to_json(&self) -> Value {
        Value::Array(self.iter().map(Reflect::to_json).collect())
    }

    fn from_json(value: &Value) -> Result<Self, EncodeError> {
        decode_array::<T, _>(value)
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn to_json(&self) -> Value {
        Value::Array(self.iter().map(Reflect::to_json).collect())
    }

    fn from_json(value: &Value) -> Result<Self, EncodeError> {
        decode_array::<T, _>(value)
    }
}

/// A key type usable in an encoded map. JSON object keys are strings, so
/// every key needs a lossless string form.
pub trait MapKey: Sized {
    /// The string used as the JSON object key.
    fn to_key(&self) -> String;

    /// Parse a JSON object key back into the key type.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::InvalidKey`] if the string does not parse.
    fn from_key(key: &str) -> Result<Self, EncodeError>;
}

impl MapKey for String {
    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str) -> Result<Self, EncodeError> {
        Ok(key.to_owned())
    }
}

macro_rules! map_key_parse {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MapKey for $ty {
                fn to_key(&self) -> String {
                    self.to_string()
                }

                fn from_key(key: &str) -> Result<Self, EncodeError> {
                    key.parse().map_err(|_| EncodeError::InvalidKey(key.to_owned()))
                }
            }
        )*
    };
}

map_key_parse!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, bool);

impl MapKey for Entity {
    fn to_key(&self) -> String {
        self.id().to_string()
    }

    fn from_key(key: &str) -> Result<Self, EncodeError> {
        key.parse().map_err(|_| EncodeError::InvalidKey(key.to_owned()))
    }
}

fn encode_map<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> Value
where
    K: MapKey + 'a,
    V: Reflect + 'a,
{
    let mut object = Map::new();
    for (key, value) in entries {
        object.insert(key.to_key(), value.to_json());
    }
    Value::Object(object)
}

fn decode_map<K: MapKey, V: Reflect, C: FromIterator<(K, V)>>(
    value: &Value,
) -> Result<C, EncodeError> {
    let object = value.as_object().ok_or_else(|| mismatch("object", value))?;
    object
        .iter()
        .map(|(key, value)| -> Result<(K, V), EncodeError> {
            Ok((K::from_key(key)?, V::from_json(value)?))
        })
        .collect()
}

impl<K: MapKey + Ord, V: Reflect> Reflect for BTreeMap<K, V> {
    fn to_json(&self) -> Value {
        encode_map(self.iter())
    }

    fn from_json(value: &Value) -> Result<Self, EncodeError> {
        decode_map::<K, V, _>(value)
    }
}

impl<K: MapKey + Eq + Hash, V: Reflect> Reflect for HashMap<K, V> {
    fn to_json(&self) -> Value {
        encode_map(self.iter())
    }

    fn from_json(value: &Value) -> Result<Self, EncodeError> {
        decode_map::<K, V, _>(value)
    }
}

fn decode_floats<const N: usize>(
    value: &Value,
    expected: &'static str,
) -> Result<[f32; N], EncodeError> {
    let items: Vec<f32> = Vec::from_json(value).map_err(|_| mismatch(expected, value))?;
    items.try_into().map_err(|_| mismatch(expected, value))
}

macro_rules! reflect_glam {
    ($($ty:ty => $n:literal, $expected:literal, $ctor:path);* $(;)?) => {
        $(
            impl Reflect for $ty {
                fn to_json(&self) -> Value {
                    self.to_array().to_vec().to_json()
                }

                fn from_json(value: &Value) -> Result<Self, EncodeError> {
                    decode_floats::<$n>(value, $expected).map(|a| $ctor(&a))
                }
            }
        )*
    };
}

reflect_glam! {
    Vec2 => 2, "array of 2 numbers", Vec2::from_slice;
    Vec3 => 3, "array of 3 numbers", Vec3::from_slice;
    Vec4 => 4, "array of 4 numbers", Vec4::from_slice;
    Quat => 4, "array of 4 numbers", Quat::from_slice;
}

type EncodeFn<C> = Box<dyn Fn(&C) -> Value + Send + Sync>;
type DecodeFn<C> = Box<dyn Fn(&mut C, &Value) -> Result<(), EncodeError> + Send + Sync>;

/// One named field of an encodable type.
pub struct Field<C> {
    name: &'static str,
    encode: EncodeFn<C>,
    decode: DecodeFn<C>,
}

impl<C: 'static> Field<C> {
    /// Describe a field by name and a pair of accessors.
    #[must_use]
    pub fn new<T: Reflect + 'static>(
        name: &'static str,
        get: fn(&C) -> &T,
        get_mut: fn(&mut C) -> &mut T,
    ) -> Self {
        Self {
            name,
            encode: Box::new(move |owner: &C| get(owner).to_json()),
            decode: Box::new(move |owner: &mut C, value: &Value| get_mut(owner).decode_into(value)),
        }
    }

    /// The JSON key of this field.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The ordered field list of an encodable type.
pub struct Encoder<C> {
    fields: Vec<Field<C>>,
}

impl<C: 'static> Encoder<C> {
    /// Create an encoder from its fields, in output order.
    #[must_use]
    pub fn new(fields: Vec<Field<C>>) -> Self {
        Self { fields }
    }

    /// Names of all fields, in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(Field::name)
    }

    /// Encode every field of `value` into a JSON object.
    #[must_use]
    pub fn serialize(&self, value: &C) -> Value {
        let mut object = Map::new();
        for field in &self.fields {
            object.insert(field.name.to_owned(), (field.encode)(value));
        }
        Value::Object(object)
    }

    /// Decode the fields present in `json` into `value`.
    ///
    /// Fields missing from `json` are left untouched; keys that name no
    /// field are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Mismatch`] if `json` is not an object, or
    /// [`EncodeError::Field`] naming the first field that failed to decode.
    pub fn unserialize(&self, value: &mut C, json: &Value) -> Result<(), EncodeError> {
        let object = json.as_object().ok_or_else(|| mismatch("object", json))?;
        for field in &self.fields {
            if let Some(item) = object.get(field.name) {
                (field.decode)(value, item).map_err(|source| EncodeError::Field {
                    field: field.name,
                    source: Box::new(source),
                })?;
            }
        }
        Ok(())
    }
}

impl<C> std::fmt::Debug for Encoder<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.fields.iter().map(|field| field.name))
            .finish()
    }
}

/// A type with a static field list.
///
/// Implemented by the [`encoder!`](crate::encoder!) macro, which also
/// implements [`Reflect`] so the type can be nested inside other encodable
/// types, sequences, and maps.
pub trait Encodable: Default + 'static {
    /// The cached field list for this type.
    fn encoding() -> &'static Encoder<Self>;
}

/// Declare the persisted fields of a struct.
///
/// Generates an [`Encodable`] implementation whose field list is built once
/// and cached, plus a [`Reflect`] implementation that routes through it.
///
/// ```rust
/// use engine_component::encoder;
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Info {
///     name: String,
///     active: bool,
/// }
///
/// encoder!(Info {
///     "name" => name: String,
///     "active" => active: bool,
/// });
/// ```
#[macro_export]
macro_rules! encoder {
    ($ty:ty { $($key:literal => $field:ident : $fty:ty),+ $(,)? }) => {
        impl $crate::encoder::Encodable for $ty {
            fn encoding() -> &'static $crate::encoder::Encoder<Self> {
                static ENCODER: ::std::sync::OnceLock<$crate::encoder::Encoder<$ty>> =
                    ::std::sync::OnceLock::new();
                ENCODER.get_or_init(|| {
                    $crate::encoder::Encoder::new(::std::vec![
                        $(
                            $crate::encoder::Field::new(
                                $key,
                                {
                                    fn get(owner: &$ty) -> &$fty {
                                        &owner.$field
                                    }
                                    get
                                },
                                {
                                    fn get_mut(owner: &mut $ty) -> &mut $fty {
                                        &mut owner.$field
                                    }
                                    get_mut
                                },
                            ),
                        )+
                    ])
                })
            }
        }

        impl $crate::encoder::Reflect for $ty {
            fn to_json(&self) -> $crate::serde_json::Value {
                <$ty as $crate::encoder::Encodable>::encoding().serialize(self)
            }

            fn from_json(
                value: &$crate::serde_json::Value,
            ) -> ::std::result::Result<Self, $crate::encoder::EncodeError> {
                let mut decoded = <$ty as ::std::default::Default>::default();
                $crate::encoder::Reflect::decode_into(&mut decoded, value)?;
                Ok(decoded)
            }

            fn decode_into(
                &mut self,
                value: &$crate::serde_json::Value,
            ) -> ::std::result::Result<(), $crate::encoder::EncodeError> {
                <$ty as $crate::encoder::Encodable>::encoding().unserialize(self, value)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Bounds {
        min: Vec3,
        max: Vec3,
        empty: bool,
    }

    crate::encoder!(Bounds {
        "min" => min: Vec3,
        "max" => max: Vec3,
        "empty" => empty: bool,
    });

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Inventory {
        owner: Entity,
        label: Option<String>,
        slots: Vec<Vec<u32>>,
        counts: BTreeMap<String, i64>,
        by_entity: HashMap<Entity, Bounds>,
        history: VecDeque<f64>,
        bounds: Bounds,
    }

    crate::encoder!(Inventory {
        "owner" => owner: Entity,
        "label" => label: Option<String>,
        "slots" => slots: Vec<Vec<u32>>,
        "counts" => counts: BTreeMap<String, i64>,
        "byEntity" => by_entity: HashMap<Entity, Bounds>,
        "history" => history: VecDeque<f64>,
        "bounds" => bounds: Bounds,
    });

    fn sample() -> Inventory {
        let mut by_entity = HashMap::new();
        by_entity.insert(
            Entity(4),
            Bounds {
                min: Vec3::new(-1.0, -2.0, -3.0),
                max: Vec3::new(1.0, 2.0, 3.0),
                empty: false,
            },
        );
        Inventory {
            owner: Entity(7),
            label: Some("backpack".to_string()),
            slots: vec![vec![1, 2, 3], vec![], vec![9]],
            counts: BTreeMap::from([("arrows".to_string(), 20), ("gold".to_string(), -5)]),
            by_entity,
            history: VecDeque::from([0.5, 1.25]),
            bounds: Bounds {
                min: Vec3::ZERO,
                max: Vec3::ONE,
                empty: true,
            },
        }
    }

    #[test]
    fn test_nested_sequence_and_map_round_trip() {
        let original = sample();
        let json = original.to_json();
        let restored = Inventory::from_json(&json).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_encoded_shape() {
        let json = sample().to_json();
        assert_eq!(json["owner"], json!(7));
        assert_eq!(json["label"], json!("backpack"));
        assert_eq!(json["slots"], json!([[1, 2, 3], [], [9]]));
        assert_eq!(json["counts"], json!({"arrows": 20, "gold": -5}));
        assert_eq!(json["byEntity"]["4"]["max"], json!([1.0, 2.0, 3.0]));
        assert_eq!(json["bounds"]["empty"], json!(true));
    }

    #[test]
    fn test_missing_fields_keep_current_value() {
        let mut value = sample();
        Inventory::encoding()
            .unserialize(&mut value, &json!({"label": null, "bounds": {"empty": false}}))
            .unwrap();
        assert_eq!(value.label, None);
        assert!(!value.bounds.empty);
        // Untouched fields, including the nested ones, survive.
        assert_eq!(value.bounds.max, Vec3::ONE);
        assert_eq!(value.owner, Entity(7));
    }

    #[test]
    fn test_type_mismatch_names_the_field() {
        let err = Inventory::from_json(&json!({"slots": "nope"})).unwrap_err();
        match err {
            EncodeError::Field { field, source } => {
                assert_eq!(field, "slots");
                assert!(matches!(*source, EncodeError::Mismatch { expected: "array", found: "string" }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_object_input_is_rejected() {
        assert!(matches!(
            Bounds::from_json(&json!([1, 2])),
            Err(EncodeError::Mismatch { expected: "object", .. })
        ));
    }

    #[test]
    fn test_invalid_map_key() {
        let result = BTreeMap::<u32, bool>::from_json(&json!({"x": true}));
        assert!(matches!(result, Err(EncodeError::InvalidKey(key)) if key == "x"));
    }

    #[test]
    fn test_glam_arity_is_checked() {
        assert!(Vec3::from_json(&json!([1.0, 2.0])).is_err());
        assert_eq!(Quat::from_json(&json!([0.0, 0.0, 0.0, 1.0])).unwrap(), Quat::IDENTITY);
    }

    #[test]
    fn test_scalars_reject_wrong_kinds() {
        assert!(u8::from_json(&json!(300)).is_err());
        assert!(bool::from_json(&json!(1)).is_err());
        assert_eq!(f32::from_json(&json!(2)).unwrap(), 2.0);
        assert_eq!(String::from_json(&json!("hi")).unwrap(), "hi");
    }

    #[test]
    fn test_non_finite_floats_survive_json() {
        assert_eq!(f32::INFINITY.to_json(), json!("Infinity"));
        assert_eq!(f64::NEG_INFINITY.to_json(), json!("-Infinity"));
        assert!(f32::from_json(&f32::NAN.to_json()).unwrap().is_nan());
        assert_eq!(f64::from_json(&json!("-Infinity")).unwrap(), f64::NEG_INFINITY);
        assert!(f32::from_json(&json!("inf")).is_err());
        assert!(f32::from_json(&Value::Null).is_err());

        let bounds = Bounds {
            min: Vec3::new(f32::NEG_INFINITY, 0.0, 1.0),
            max: Vec3::new(f32::INFINITY, f32::NAN, 2.0),
            empty: false,
        };
        let restored = Bounds::from_json(&bounds.to_json()).unwrap();
        assert_eq!(restored.min, bounds.min);
        assert!(restored.max.y.is_nan());
        assert_eq!(restored.max.x, f32::INFINITY);
        assert_eq!(restored.max.z, 2.0);
    }

    #[test]
    fn test_field_names_in_declaration_order() {
        let names: Vec<_> = Bounds::encoding().field_names().collect();
        assert_eq!(names, vec!["min", "max", "empty"]);
    }
}
