//! Variants.
//!
//! [`Variant`] is the handle to a host variant; [`VariantValue`] is its
//! content as a closed Rust enum. Converting between the two goes through the
//! host's per-type constructors and extractors.

use tether_sys::{
    Aabb, Basis, NodePathWire, ObjectWire, PackedArrayWire, Quaternion, Rect2, Rid, Slot,
    StringNameWire, StringWire, TextKind, Transform3D, VariantType, VariantWire, Vector2, Vector3,
    WireForm, WireKind,
};

use super::held::{handle_bridge, Held};
use super::packed::{new_packed, PackedElement};
use super::{Array, Callable, Dictionary, NodePath, ObjectRef, StringName};
use crate::bridge::{text_from_owned, FromHost};
use crate::frame::RET_WORDS;
use crate::registry::{Handle, Ownership};
use crate::runtime::Runtime;

/// Handle to a host variant.
///
/// Nil holds no handle and encodes as the all-zero wire.
pub struct Variant {
    held: Option<Held>,
}

handle_bridge!(Variant, VariantWire, WireKind::Variant);

/// Content of a variant.
#[derive(Clone, Debug, Default)]
pub enum VariantValue {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    StringName(StringName),
    NodePath(NodePath),
    Vector2(Vector2),
    Vector3(Vector3),
    Quaternion(Quaternion),
    Basis(Basis),
    Transform3D(Transform3D),
    Aabb(Aabb),
    Rect2(Rect2),
    Rid(Rid),
    Object(Option<ObjectRef>),
    Callable(Callable),
    Array(Array),
    Dictionary(Dictionary),
    PackedByteArray(Vec<u8>),
    PackedInt32Array(Vec<i32>),
    PackedInt64Array(Vec<i64>),
    PackedFloat32Array(Vec<f32>),
    PackedFloat64Array(Vec<f64>),
    PackedVector2Array(Vec<Vector2>),
    PackedVector3Array(Vec<Vector3>),
    /// A host type with no guest-side representation here.
    Unsupported(VariantType),
}

impl VariantValue {
    /// Host tag of this value
    pub fn get_type(&self) -> VariantType {
        match self {
            VariantValue::Nil => VariantType::Nil,
            VariantValue::Bool(_) => VariantType::Bool,
            VariantValue::Int(_) => VariantType::Int,
            VariantValue::Float(_) => VariantType::Float,
            VariantValue::String(_) => VariantType::String,
            VariantValue::StringName(_) => VariantType::StringName,
            VariantValue::NodePath(_) => VariantType::NodePath,
            VariantValue::Vector2(_) => VariantType::Vector2,
            VariantValue::Vector3(_) => VariantType::Vector3,
            VariantValue::Quaternion(_) => VariantType::Quaternion,
            VariantValue::Basis(_) => VariantType::Basis,
            VariantValue::Transform3D(_) => VariantType::Transform3D,
            VariantValue::Aabb(_) => VariantType::Aabb,
            VariantValue::Rect2(_) => VariantType::Rect2,
            VariantValue::Rid(_) => VariantType::Rid,
            VariantValue::Object(_) => VariantType::Object,
            VariantValue::Callable(_) => VariantType::Callable,
            VariantValue::Array(_) => VariantType::Array,
            VariantValue::Dictionary(_) => VariantType::Dictionary,
            VariantValue::PackedByteArray(_) => VariantType::PackedByteArray,
            VariantValue::PackedInt32Array(_) => VariantType::PackedInt32Array,
            VariantValue::PackedInt64Array(_) => VariantType::PackedInt64Array,
            VariantValue::PackedFloat32Array(_) => VariantType::PackedFloat32Array,
            VariantValue::PackedFloat64Array(_) => VariantType::PackedFloat64Array,
            VariantValue::PackedVector2Array(_) => VariantType::PackedVector2Array,
            VariantValue::PackedVector3Array(_) => VariantType::PackedVector3Array,
            VariantValue::Unsupported(ty) => *ty,
        }
    }
}

/// Build a variant from a slot value. The host copies reference payloads.
fn construct<T: Slot>(rt: &Runtime, ty: VariantType, value: T) -> VariantWire {
    let mut buf = [0u64; RET_WORDS];
    // SAFETY: every slot type that can sit in a variant fits RET_WORDS.
    unsafe {
        std::ptr::write_unaligned(buf.as_mut_ptr() as *mut T, value);
        rt.host().variant_from(ty, buf.as_ptr())
    }
}

/// Extract a slot value. Reference payloads come back as new owned
/// references.
fn extract<T: Slot>(rt: &Runtime, ty: VariantType, wire: VariantWire) -> T {
    let mut buf = [0u64; RET_WORDS];
    // SAFETY: as above; the host writes a `ty` or zeroes.
    unsafe {
        rt.host().variant_to(ty, wire, buf.as_mut_ptr());
        std::ptr::read_unaligned(buf.as_ptr() as *const T)
    }
}

fn construct_text(rt: &Runtime, kind: TextKind, text: &str) -> VariantWire {
    let host = rt.host();
    let wire = host.string_new(kind, text);
    let variant = construct(rt, kind.variant_type(), wire);
    host.wire_destroy(kind.wire_kind(), StringWire(wire).into_raw());
    variant
}

fn construct_packed<T: PackedElement>(rt: &Runtime, elements: &[T]) -> VariantWire {
    let wire = new_packed(rt, elements);
    let variant = construct(rt, T::KIND.variant_type(), wire);
    rt.host()
        .wire_destroy(WireKind::Packed(T::KIND), wire.into_raw());
    variant
}

fn extract_packed<T: PackedElement>(rt: &Runtime, wire: VariantWire) -> Vec<T> {
    let packed: PackedArrayWire = extract(rt, T::KIND.variant_type(), wire);
    Vec::<T>::from_owned(packed, rt)
}

impl Variant {
    /// The nil variant
    pub fn nil() -> Self {
        Self { held: None }
    }

    /// Build a host variant holding `value`.
    pub fn new(rt: &Runtime, value: impl Into<VariantValue>) -> Self {
        Self::from_value(rt, value.into())
    }

    /// Build a host variant from its content.
    pub fn from_value(rt: &Runtime, value: VariantValue) -> Self {
        let wire = match &value {
            VariantValue::Nil => return Self::nil(),
            VariantValue::Bool(v) => construct(rt, VariantType::Bool, *v),
            VariantValue::Int(v) => construct(rt, VariantType::Int, *v),
            VariantValue::Float(v) => construct(rt, VariantType::Float, *v),
            VariantValue::String(v) => construct_text(rt, TextKind::String, v),
            VariantValue::StringName(v) => construct_text(rt, TextKind::StringName, v.as_str()),
            VariantValue::NodePath(v) => construct_text(rt, TextKind::NodePath, v.as_str()),
            VariantValue::Vector2(v) => construct(rt, VariantType::Vector2, *v),
            VariantValue::Vector3(v) => construct(rt, VariantType::Vector3, *v),
            VariantValue::Quaternion(v) => construct(rt, VariantType::Quaternion, *v),
            VariantValue::Basis(v) => construct(rt, VariantType::Basis, *v),
            VariantValue::Transform3D(v) => construct(rt, VariantType::Transform3D, *v),
            VariantValue::Aabb(v) => construct(rt, VariantType::Aabb, *v),
            VariantValue::Rect2(v) => construct(rt, VariantType::Rect2, *v),
            VariantValue::Rid(v) => construct(rt, VariantType::Rid, *v),
            VariantValue::Object(v) => {
                let ptr = v.as_ref().and_then(ObjectRef::ptr);
                construct(rt, VariantType::Object, ptr.map(ObjectWire::from_ptr).unwrap_or_default())
            }
            VariantValue::Callable(v) => construct(rt, VariantType::Callable, v.packed()),
            VariantValue::Array(v) => construct(rt, VariantType::Array, v.packed()),
            VariantValue::Dictionary(v) => construct(rt, VariantType::Dictionary, v.packed()),
            VariantValue::PackedByteArray(v) => construct_packed(rt, v),
            VariantValue::PackedInt32Array(v) => construct_packed(rt, v),
            VariantValue::PackedInt64Array(v) => construct_packed(rt, v),
            VariantValue::PackedFloat32Array(v) => construct_packed(rt, v),
            VariantValue::PackedFloat64Array(v) => construct_packed(rt, v),
            VariantValue::PackedVector2Array(v) => construct_packed(rt, v),
            VariantValue::PackedVector3Array(v) => construct_packed(rt, v),
            VariantValue::Unsupported(ty) => {
                log::warn!("cannot build a {:?} variant from guest data", ty);
                return Self::nil();
            }
        };
        Self::from_wire_owned(rt, wire)
    }

    pub(crate) fn from_wire_owned(rt: &Runtime, wire: VariantWire) -> Self {
        Self {
            held: Held::owned(rt, WireKind::Variant, wire.into_raw()),
        }
    }

    fn wire(&self) -> Option<(&Runtime, VariantWire)> {
        let held = self.held.as_ref()?;
        Some((held.runtime(), VariantWire::from_raw(held.wire()?)))
    }

    /// Wire form to lend to the host. Nil or cycled packs as zero.
    pub(crate) fn packed(&self) -> VariantWire {
        self.wire().map(|(_, wire)| wire).unwrap_or_default()
    }

    /// Registry handle, `None` for nil
    pub fn handle(&self) -> Option<Handle> {
        self.held.as_ref().map(Held::handle)
    }

    /// Host tag. A cycled variant reads as nil.
    pub fn get_type(&self) -> VariantType {
        match self.wire() {
            Some((rt, wire)) => rt.host().variant_type(wire),
            None => VariantType::Nil,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.get_type() == VariantType::Nil
    }

    /// Content of the variant. Reference payloads come back as new owned
    /// handles, independent of this variant.
    pub fn value(&self) -> VariantValue {
        let Some((rt, wire)) = self.wire() else {
            return VariantValue::Nil;
        };
        let ty = rt.host().variant_type(wire);
        match ty {
            VariantType::Nil => VariantValue::Nil,
            VariantType::Bool => VariantValue::Bool(extract(rt, ty, wire)),
            VariantType::Int => VariantValue::Int(extract(rt, ty, wire)),
            VariantType::Float => VariantValue::Float(extract(rt, ty, wire)),
            VariantType::String => {
                let text: StringWire = extract(rt, ty, wire);
                VariantValue::String(text_from_owned(rt, TextKind::String, text.0))
            }
            VariantType::StringName => {
                let text: StringNameWire = extract(rt, ty, wire);
                VariantValue::StringName(StringName::from_owned(text, rt))
            }
            VariantType::NodePath => {
                let text: NodePathWire = extract(rt, ty, wire);
                VariantValue::NodePath(NodePath::from_owned(text, rt))
            }
            VariantType::Vector2 => VariantValue::Vector2(extract(rt, ty, wire)),
            VariantType::Vector3 => VariantValue::Vector3(extract(rt, ty, wire)),
            VariantType::Quaternion => VariantValue::Quaternion(extract(rt, ty, wire)),
            VariantType::Basis => VariantValue::Basis(extract(rt, ty, wire)),
            VariantType::Transform3D => VariantValue::Transform3D(extract(rt, ty, wire)),
            VariantType::Aabb => VariantValue::Aabb(extract(rt, ty, wire)),
            VariantType::Rect2 => VariantValue::Rect2(extract(rt, ty, wire)),
            VariantType::Rid => VariantValue::Rid(extract(rt, ty, wire)),
            VariantType::Object => {
                let object: ObjectWire = extract(rt, ty, wire);
                VariantValue::Object(ObjectRef::from_ptr(rt, object.as_ptr(), Ownership::Owned))
            }
            VariantType::Callable => {
                VariantValue::Callable(Callable::from_owned(extract(rt, ty, wire), rt))
            }
            VariantType::Array => VariantValue::Array(Array::from_owned(extract(rt, ty, wire), rt)),
            VariantType::Dictionary => {
                VariantValue::Dictionary(Dictionary::from_owned(extract(rt, ty, wire), rt))
            }
            VariantType::PackedByteArray => VariantValue::PackedByteArray(extract_packed(rt, wire)),
            VariantType::PackedInt32Array => {
                VariantValue::PackedInt32Array(extract_packed(rt, wire))
            }
            VariantType::PackedInt64Array => {
                VariantValue::PackedInt64Array(extract_packed(rt, wire))
            }
            VariantType::PackedFloat32Array => {
                VariantValue::PackedFloat32Array(extract_packed(rt, wire))
            }
            VariantType::PackedFloat64Array => {
                VariantValue::PackedFloat64Array(extract_packed(rt, wire))
            }
            VariantType::PackedVector2Array => {
                VariantValue::PackedVector2Array(extract_packed(rt, wire))
            }
            VariantType::PackedVector3Array => {
                VariantValue::PackedVector3Array(extract_packed(rt, wire))
            }
            other => VariantValue::Unsupported(other),
        }
    }

    /// Content converted to `T`, if the variant holds one.
    pub fn to<T: TryFrom<VariantValue>>(&self) -> Option<T> {
        T::try_from(self.value()).ok()
    }
}

impl std::fmt::Debug for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Variant").field(&self.value()).finish()
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! value_conversions {
    ($($ty:ty => $case:ident),* $(,)?) => {
        $(
            impl From<$ty> for VariantValue {
                fn from(value: $ty) -> Self {
                    VariantValue::$case(value)
                }
            }

            impl TryFrom<VariantValue> for $ty {
                type Error = VariantValue;

                fn try_from(value: VariantValue) -> Result<Self, VariantValue> {
                    match value {
                        VariantValue::$case(inner) => Ok(inner),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

value_conversions!(
    bool => Bool,
    i64 => Int,
    f64 => Float,
    String => String,
    StringName => StringName,
    NodePath => NodePath,
    Vector2 => Vector2,
    Vector3 => Vector3,
    Quaternion => Quaternion,
    Basis => Basis,
    Transform3D => Transform3D,
    Aabb => Aabb,
    Rect2 => Rect2,
    Rid => Rid,
    Callable => Callable,
    Array => Array,
    Dictionary => Dictionary,
    Vec<u8> => PackedByteArray,
    Vec<i32> => PackedInt32Array,
    Vec<i64> => PackedInt64Array,
    Vec<f32> => PackedFloat32Array,
    Vec<f64> => PackedFloat64Array,
    Vec<Vector2> => PackedVector2Array,
    Vec<Vector3> => PackedVector3Array,
);

impl From<i32> for VariantValue {
    fn from(value: i32) -> Self {
        VariantValue::Int(value as i64)
    }
}

impl From<f32> for VariantValue {
    fn from(value: f32) -> Self {
        VariantValue::Float(value as f64)
    }
}

impl From<&str> for VariantValue {
    fn from(value: &str) -> Self {
        VariantValue::String(value.to_string())
    }
}

impl From<ObjectRef> for VariantValue {
    fn from(value: ObjectRef) -> Self {
        VariantValue::Object(Some(value))
    }
}

impl TryFrom<VariantValue> for ObjectRef {
    type Error = VariantValue;

    fn try_from(value: VariantValue) -> Result<Self, VariantValue> {
        match value {
            VariantValue::Object(Some(object)) => Ok(object),
            other => Err(other),
        }
    }
}

impl TryFrom<VariantValue> for i32 {
    type Error = VariantValue;

    fn try_from(value: VariantValue) -> Result<Self, VariantValue> {
        match value {
            VariantValue::Int(v) => i32::try_from(v).map_err(|_| VariantValue::Int(v)),
            other => Err(other),
        }
    }
}

impl TryFrom<VariantValue> for f32 {
    type Error = VariantValue;

    fn try_from(value: VariantValue) -> Result<Self, VariantValue> {
        match value {
            VariantValue::Float(v) => Ok(v as f32),
            other => Err(other),
        }
    }
}
