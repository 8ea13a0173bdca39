//! Wire forms: the exact byte layouts the host ABI expects.
//!
//! Reference types are opaque payloads of one to three words owned by the host. This crate
//! never looks inside them; it only moves them between slots, the handle
//! registry and the host's constructors/destructors.

use bytemuck::{Pod, Zeroable};

/// Width of one ABI word in bytes. Every slot is a whole number of words.
pub const WORD: usize = std::mem::size_of::<u64>();

/// Largest wire form of a reference type, in words (a variant).
pub const MAX_REF_WORDS: usize = 3;

macro_rules! wire_newtype {
    ($(#[$meta:meta])* $name:ident($repr:ty)) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Pod, Zeroable)]
        pub struct $name(pub $repr);

        impl $name {
            /// True for the all-zero wire, which the host treats as
            /// default-constructed.
            #[inline]
            pub fn is_null(&self) -> bool {
                *self == Self::default()
            }
        }

        impl WireForm for $name {
            #[inline]
            fn into_raw(self) -> RawWire {
                let mut raw = RawWire::default();
                let bytes = bytemuck::bytes_of(&self);
                bytemuck::bytes_of_mut(&mut raw.0)[..bytes.len()].copy_from_slice(bytes);
                raw
            }

            #[inline]
            fn from_raw(raw: RawWire) -> Self {
                let size = std::mem::size_of::<Self>();
                bytemuck::pod_read_unaligned(&bytemuck::bytes_of(&raw.0)[..size])
            }
        }
    };
}

/// Width-erased storage for any reference wire form (up to three words).
///
/// The handle registry stores every kind of reference in this shape; the
/// [`WireKind`] next to it says how many words are meaningful.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Pod, Zeroable)]
pub struct RawWire(pub [u64; MAX_REF_WORDS]);

/// Conversion between a typed wire form and [`RawWire`].
pub trait WireForm: Copy {
    /// Widen into registry storage.
    fn into_raw(self) -> RawWire;
    /// Narrow back from registry storage.
    fn from_raw(raw: RawWire) -> Self;
}

wire_newtype!(
    /// A host variant: 3 words, tag plus payload.
    VariantWire([u64; 3])
);
wire_newtype!(
    /// A host string reference.
    StringWire(u64)
);
wire_newtype!(
    /// A host interned-name reference.
    StringNameWire(u64)
);
wire_newtype!(
    /// A host node-path reference.
    NodePathWire(u64)
);
wire_newtype!(
    /// A host generic array reference.
    ArrayWire(u64)
);
wire_newtype!(
    /// A host dictionary reference.
    DictionaryWire(u64)
);
wire_newtype!(
    /// A host packed-array reference; the element kind travels out of band.
    PackedArrayWire(u64)
);
wire_newtype!(
    /// A host callable: 2 words.
    CallableWire([u64; 2])
);
wire_newtype!(
    /// An engine object pointer, as a word.
    ObjectWire(u64)
);

impl ObjectWire {
    /// Wire form of an engine pointer.
    #[inline]
    pub fn from_ptr(ptr: crate::ObjectPtr) -> Self {
        ObjectWire(ptr as usize as u64)
    }

    /// Engine pointer carried by this wire.
    #[inline]
    pub fn as_ptr(self) -> crate::ObjectPtr {
        self.0 as usize as crate::ObjectPtr
    }
}

/// Resource ID: an opaque 8-byte name for a host-side resource.
///
/// Not reference-counted. Lifetime is managed by explicit `free_rid` calls on
/// the server that issued it, so copying an RID carries no ownership.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Rid(u64);

impl Rid {
    /// The invalid RID.
    pub const INVALID: Rid = Rid(0);

    /// Wrap a raw 64-bit id.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Rid(raw)
    }

    /// Raw 64-bit id.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this RID names anything at all.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Debug for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rid({:#018x})", self.0)
    }
}

/// Host-assigned identity of an engine object. Zero means "no object".
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Pod, Zeroable)]
pub struct InstanceId(pub u64);

impl InstanceId {
    /// Whether this id can name an object.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Element kind of a packed array.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PackedKind {
    /// `u8` elements
    Byte,
    /// `i32` elements
    Int32,
    /// `i64` elements
    Int64,
    /// `f32` elements
    Float32,
    /// `f64` elements
    Float64,
    /// [`Vector2`](crate::Vector2) elements
    Vector2,
    /// [`Vector3`](crate::Vector3) elements
    Vector3,
}

impl PackedKind {
    /// Variant tag of the packed array holding this element kind.
    pub const fn variant_type(self) -> VariantType {
        match self {
            PackedKind::Byte => VariantType::PackedByteArray,
            PackedKind::Int32 => VariantType::PackedInt32Array,
            PackedKind::Int64 => VariantType::PackedInt64Array,
            PackedKind::Float32 => VariantType::PackedFloat32Array,
            PackedKind::Float64 => VariantType::PackedFloat64Array,
            PackedKind::Vector2 => VariantType::PackedVector2Array,
            PackedKind::Vector3 => VariantType::PackedVector3Array,
        }
    }

    /// Size of one element in bytes.
    pub const fn element_size(self) -> usize {
        match self {
            PackedKind::Byte => 1,
            PackedKind::Int32 | PackedKind::Float32 => 4,
            PackedKind::Int64 | PackedKind::Float64 | PackedKind::Vector2 => 8,
            PackedKind::Vector3 => 12,
        }
    }
}

/// Which of the three text types a string wire belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TextKind {
    /// Mutable host string
    String,
    /// Interned name
    StringName,
    /// Scene-tree path
    NodePath,
}

impl TextKind {
    /// Registry kind for wires of this text type.
    pub const fn wire_kind(self) -> WireKind {
        match self {
            TextKind::String => WireKind::String,
            TextKind::StringName => WireKind::StringName,
            TextKind::NodePath => WireKind::NodePath,
        }
    }

    /// Variant tag for values of this text type.
    pub const fn variant_type(self) -> VariantType {
        match self {
            TextKind::String => VariantType::String,
            TextKind::StringName => VariantType::StringName,
            TextKind::NodePath => VariantType::NodePath,
        }
    }
}

/// Kind of a reference wire, as tracked by the handle registry and passed to
/// the host's generic copy/destroy entry points.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum WireKind {
    Variant,
    String,
    StringName,
    NodePath,
    Array,
    Dictionary,
    Callable,
    Object,
    Packed(PackedKind),
}

impl WireKind {
    /// Number of meaningful words in a wire of this kind.
    pub const fn words(self) -> usize {
        match self {
            WireKind::Variant => 3,
            WireKind::Callable => 2,
            _ => 1,
        }
    }
}

/// Host variant tags. The set is closed and defined by the host.
#[repr(i32)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum VariantType {
    #[default]
    Nil = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    String = 4,
    Vector2 = 5,
    Vector2i = 6,
    Rect2 = 7,
    Rect2i = 8,
    Vector3 = 9,
    Vector3i = 10,
    Transform2D = 11,
    Vector4 = 12,
    Vector4i = 13,
    Plane = 14,
    Quaternion = 15,
    Aabb = 16,
    Basis = 17,
    Transform3D = 18,
    Projection = 19,
    Color = 20,
    StringName = 21,
    NodePath = 22,
    Rid = 23,
    Object = 24,
    Callable = 25,
    Signal = 26,
    Dictionary = 27,
    Array = 28,
    PackedByteArray = 29,
    PackedInt32Array = 30,
    PackedInt64Array = 31,
    PackedFloat32Array = 32,
    PackedFloat64Array = 33,
    PackedStringArray = 34,
    PackedVector2Array = 35,
    PackedVector3Array = 36,
    PackedColorArray = 37,
    PackedVector4Array = 38,
}

impl VariantType {
    const ALL: [VariantType; 39] = [
        VariantType::Nil,
        VariantType::Bool,
        VariantType::Int,
        VariantType::Float,
        VariantType::String,
        VariantType::Vector2,
        VariantType::Vector2i,
        VariantType::Rect2,
        VariantType::Rect2i,
        VariantType::Vector3,
        VariantType::Vector3i,
        VariantType::Transform2D,
        VariantType::Vector4,
        VariantType::Vector4i,
        VariantType::Plane,
        VariantType::Quaternion,
        VariantType::Aabb,
        VariantType::Basis,
        VariantType::Transform3D,
        VariantType::Projection,
        VariantType::Color,
        VariantType::StringName,
        VariantType::NodePath,
        VariantType::Rid,
        VariantType::Object,
        VariantType::Callable,
        VariantType::Signal,
        VariantType::Dictionary,
        VariantType::Array,
        VariantType::PackedByteArray,
        VariantType::PackedInt32Array,
        VariantType::PackedInt64Array,
        VariantType::PackedFloat32Array,
        VariantType::PackedFloat64Array,
        VariantType::PackedStringArray,
        VariantType::PackedVector2Array,
        VariantType::PackedVector3Array,
        VariantType::PackedColorArray,
        VariantType::PackedVector4Array,
    ];

    /// Tag from its host ordinal, if the host and this crate agree on it.
    pub fn from_ord(ord: i32) -> Option<Self> {
        usize::try_from(ord).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Host ordinal of this tag.
    #[inline]
    pub const fn ord(self) -> i32 {
        self as i32
    }

    /// Wire kind of the payload when this tag names a reference type.
    pub const fn reference_kind(self) -> Option<WireKind> {
        Some(match self {
            VariantType::String => WireKind::String,
            VariantType::StringName => WireKind::StringName,
            VariantType::NodePath => WireKind::NodePath,
            VariantType::Array => WireKind::Array,
            VariantType::Dictionary => WireKind::Dictionary,
            VariantType::Callable => WireKind::Callable,
            VariantType::Object => WireKind::Object,
            VariantType::PackedByteArray => WireKind::Packed(PackedKind::Byte),
            VariantType::PackedInt32Array => WireKind::Packed(PackedKind::Int32),
            VariantType::PackedInt64Array => WireKind::Packed(PackedKind::Int64),
            VariantType::PackedFloat32Array => WireKind::Packed(PackedKind::Float32),
            VariantType::PackedFloat64Array => WireKind::Packed(PackedKind::Float64),
            VariantType::PackedVector2Array => WireKind::Packed(PackedKind::Vector2),
            VariantType::PackedVector3Array => WireKind::Packed(PackedKind::Vector3),
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_wire_preserves_words() {
        let v = VariantWire([1, 2, 3]);
        assert_eq!(VariantWire::from_raw(v.into_raw()), v);

        let c = CallableWire([7, 9]);
        let raw = c.into_raw();
        assert_eq!(raw.0, [7, 9, 0]);
        assert_eq!(CallableWire::from_raw(raw), c);

        let s = StringWire(42);
        assert_eq!(s.into_raw().0, [42, 0, 0]);
    }

    #[test]
    fn test_null_wires() {
        assert!(VariantWire::default().is_null());
        assert!(!ArrayWire(5).is_null());
        assert!(!Rid::INVALID.is_valid());
        assert!(Rid::new(0xDEAD_BEEF_CAFE_BABE).is_valid());
    }

    #[test]
    fn test_variant_type_ordinals() {
        assert_eq!(VariantType::from_ord(0), Some(VariantType::Nil));
        assert_eq!(VariantType::from_ord(23), Some(VariantType::Rid));
        assert_eq!(VariantType::from_ord(36), Some(VariantType::PackedVector3Array));
        assert_eq!(VariantType::from_ord(39), None);
        assert_eq!(VariantType::from_ord(-1), None);
        for (i, ty) in VariantType::ALL.iter().enumerate() {
            assert_eq!(ty.ord() as usize, i);
        }
    }

    #[test]
    fn test_reference_kinds() {
        assert_eq!(VariantType::Int.reference_kind(), None);
        assert_eq!(
            VariantType::PackedVector3Array.reference_kind(),
            Some(WireKind::Packed(PackedKind::Vector3))
        );
        assert_eq!(WireKind::Variant.words(), 3);
        assert_eq!(WireKind::Callable.words(), 2);
        assert_eq!(WireKind::Array.words(), 1);
    }
}
