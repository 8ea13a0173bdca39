//! Tether SYS - raw ABI layer
//!
//! Byte layouts, slot addressing and the host interface trait. Nothing in
//! this crate owns a host value; ownership tracking lives in `tether-core`.

mod host;
mod math;
mod slot;
mod wire;

pub use host::{
    ClassRecord, CreateInstanceFn, FreeInstanceFn, GetVirtualFn, HostInterface, InstancePtr,
    MethodBindPtr, ObjectPtr, Trampoline,
};
pub use math::{Aabb, Basis, Quaternion, Rect2, Transform3D, Vector2, Vector3};
pub use slot::{ArgCursor, ArgsAddr, RetAddr, Slot};
pub use wire::{
    ArrayWire, CallableWire, DictionaryWire, InstanceId, NodePathWire, PackedArrayWire,
    PackedKind, RawWire, Rid, StringNameWire, StringWire, TextKind, VariantType, VariantWire,
    WireForm, WireKind, ObjectWire, MAX_REF_WORDS, WORD,
};
