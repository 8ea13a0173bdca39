//! Tether Core - host/guest marshalling runtime
//!
//! Everything needed to call into a host engine through its pointer-call
//! interface and to let the host call back into guest code:
//!
//! - [`CallFrame`] packs guest values into the host's argument layout
//! - [`HandleRegistry`] tracks every host value the guest holds
//! - [`FromHost`]/[`ToHost`] convert between wire forms and guest types
//! - [`call_virtual`] runs a guest override behind a host trampoline
//! - the façade macros ([`host_class!`], [`host_methods!`],
//!   [`virtual_interface!`], [`host_enum!`]) generate class bindings
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tether_core::prelude::*;
//!
//! let rt = Runtime::new(Arc::new(my_host));
//! rt.register_class::<MyPhysicsServer>()?;
//! let tree: Tree = rt.construct().expect("host refused to build a Tree");
//! tree.clear();
//! ```

pub mod bridge;
pub mod builtin;
pub mod class;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod macros;
pub mod method;
pub mod options;
pub mod registry;
pub mod runtime;

pub use tether_sys as sys;

pub use bridge::{FromHost, Scope, ToHost};
pub use builtin::{
    Array, Callable, Dictionary, NodePath, ObjectRef, Packed, PackedByteArray, PackedElement,
    PackedFloat32Array, PackedFloat64Array, PackedInt32Array, PackedInt64Array,
    PackedVector2Array, PackedVector3Array, StringName, Variant, VariantValue,
};
pub use class::{BaseMut, GuestClass, HostClass, InstanceMut, InstanceStorage};
pub use dispatch::{call_virtual, DecodeArgs, VirtualSlot, VirtualTable};
pub use error::{BindError, BindResult};
pub use frame::{frame_stats, CallFrame, FrameStats};
pub use options::RuntimeOptions;
pub use registry::{Handle, HandleRegistry, Ownership, RegistryStats};
pub use runtime::Runtime;

pub use tether_sys::{
    Aabb, Basis, InstanceId, Quaternion, Rect2, Rid, Transform3D, VariantType, Vector2, Vector3,
};

/// Everything a class binding or a guest class needs.
pub mod prelude {
    pub use crate::{
        Aabb, Array, BaseMut, Basis, Callable, Dictionary, FromHost, GuestClass, HostClass, InstanceId,
        NodePath, ObjectRef, Packed, PackedVector3Array, Quaternion, Rect2, Rid, Runtime,
        StringName, ToHost, Transform3D, Variant, VariantType, VariantValue, Vector2, Vector3,
    };
}
