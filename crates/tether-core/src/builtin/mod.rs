//! Handle-backed host values and their guest-side views.

mod collections;
pub(crate) mod held;
mod object;
mod packed;
mod text;
mod variant;

pub use collections::{Array, Callable, Dictionary};
pub use object::ObjectRef;
pub use packed::{
    Packed, PackedByteArray, PackedElement, PackedFloat32Array, PackedFloat64Array,
    PackedInt32Array, PackedInt64Array, PackedVector2Array, PackedVector3Array,
};
pub use text::{NodePath, StringName};
pub use variant::{Variant, VariantValue};
