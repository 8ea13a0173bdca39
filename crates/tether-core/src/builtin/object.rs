//! Engine object references.

use tether_sys::{InstanceId, ObjectPtr, ObjectWire, WireForm, WireKind};

use super::held::Held;
use crate::bridge::{FromHost, Scope, ToHost};
use crate::class::HostClass;
use crate::frame::CallFrame;
use crate::registry::{Handle, Ownership};
use crate::runtime::Runtime;

/// Handle to an engine object.
///
/// Every use re-checks the object's instance id with the host. An object the
/// host has freed in the meantime is reported, its handle is cycled and the
/// use yields nothing.
pub struct ObjectRef {
    held: Option<Held>,
    rt: Runtime,
    id: InstanceId,
}

impl ObjectRef {
    /// Wrap an engine pointer. `None` for null or for a pointer the host no
    /// longer recognises.
    pub fn from_ptr(rt: &Runtime, ptr: ObjectPtr, ownership: Ownership) -> Option<Self> {
        let id = Self::assert_instance(rt, ptr)?;
        Some(Self {
            held: Held::insert(rt, WireKind::Object, ObjectWire::from_ptr(ptr).into_raw(), ownership),
            rt: rt.clone(),
            id,
        })
    }

    fn assert_instance(rt: &Runtime, ptr: ObjectPtr) -> Option<InstanceId> {
        if ptr.is_null() {
            return None;
        }
        let id = rt.host().object_instance_id(ptr);
        if !id.is_valid() {
            log::warn!("host passed an unknown object {:p}", ptr);
            return None;
        }
        Some(id)
    }

    /// Engine pointer, if the object is still alive.
    pub fn ptr(&self) -> Option<ObjectPtr> {
        let held = self.held.as_ref()?;
        let ptr = ObjectWire::from_raw(held.wire()?).as_ptr();
        if self.rt.host().object_from_instance_id(self.id) != ptr {
            log::warn!(
                "object {} was freed while still referenced",
                self.id.0
            );
            self.rt.handles().end(held.handle());
            return None;
        }
        Some(ptr)
    }

    /// Host identity of the object, stable across its lifetime.
    pub fn instance_id(&self) -> InstanceId {
        self.id
    }

    /// Whether the object is alive and this handle still names it.
    pub fn is_instance_valid(&self) -> bool {
        let Some(held) = &self.held else {
            return false;
        };
        if !self.rt.handles().is_live(held.handle()) {
            return false;
        }
        !self.rt.host().object_from_instance_id(self.id).is_null()
    }

    /// Destroy the engine object.
    pub fn free(self) {
        let ptr = self.ptr();
        if let Some(held) = &self.held {
            self.rt.handles().take(held.handle());
        }
        if let Some(ptr) = ptr {
            self.rt.host().object_destroy(ptr);
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    /// Registry handle, `None` if the reference was already unusable when
    /// this copy was made.
    pub fn handle(&self) -> Option<Handle> {
        self.held.as_ref().map(Held::handle)
    }

    fn packed(&self) -> ObjectWire {
        self.ptr().map(ObjectWire::from_ptr).unwrap_or_default()
    }
}

impl Clone for ObjectRef {
    fn clone(&self) -> Self {
        Self {
            held: self.held.as_ref().and_then(Held::duplicate),
            rt: self.rt.clone(),
            id: self.id,
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRef")
            .field("instance_id", &self.id.0)
            .field("handle", &self.handle())
            .finish()
    }
}

impl FromHost for Option<ObjectRef> {
    type Wire = ObjectWire;

    fn from_borrowed(wire: ObjectWire, scope: &mut Scope<'_>) -> Self {
        let rt = scope.runtime().clone();
        let id = ObjectRef::assert_instance(&rt, wire.as_ptr())?;
        Some(ObjectRef {
            held: Held::borrowed(scope, WireKind::Object, wire.into_raw()),
            rt,
            id,
        })
    }

    fn from_owned(wire: ObjectWire, rt: &Runtime) -> Self {
        ObjectRef::from_ptr(rt, wire.as_ptr(), Ownership::Owned)
    }
}

impl ToHost for ObjectRef {
    type Wire = ObjectWire;

    fn to_arg(&self, _frame: &mut CallFrame<'_>) -> ObjectWire {
        self.packed()
    }

    fn to_host(&self, _rt: &Runtime) -> Option<ObjectWire> {
        self.ptr()?;
        self.held
            .as_ref()
            .and_then(Held::copy)
            .map(ObjectWire::from_raw)
    }

    fn into_host(self, _rt: &Runtime) -> Option<ObjectWire> {
        self.ptr()?;
        self.held
            .and_then(Held::transfer)
            .map(ObjectWire::from_raw)
    }
}

impl ToHost for Option<&ObjectRef> {
    type Wire = ObjectWire;

    fn to_arg(&self, frame: &mut CallFrame<'_>) -> ObjectWire {
        self.map(|obj| obj.to_arg(frame)).unwrap_or_default()
    }

    fn to_host(&self, rt: &Runtime) -> Option<ObjectWire> {
        match self {
            Some(obj) => obj.to_host(rt),
            None => Some(ObjectWire::default()),
        }
    }
}

impl<T: HostClass> FromHost for Option<T> {
    type Wire = ObjectWire;

    fn from_borrowed(wire: ObjectWire, scope: &mut Scope<'_>) -> Self {
        Option::<ObjectRef>::from_borrowed(wire, scope).map(T::from_object)
    }

    fn from_owned(wire: ObjectWire, rt: &Runtime) -> Self {
        Option::<ObjectRef>::from_owned(wire, rt).map(T::from_object)
    }
}

impl<T: HostClass> ToHost for Option<T> {
    type Wire = ObjectWire;

    fn to_arg(&self, frame: &mut CallFrame<'_>) -> ObjectWire {
        self.as_ref()
            .map(|obj| obj.as_object().to_arg(frame))
            .unwrap_or_default()
    }

    fn to_host(&self, rt: &Runtime) -> Option<ObjectWire> {
        match self {
            Some(obj) => obj.as_object().to_host(rt),
            None => Some(ObjectWire::default()),
        }
    }

    fn into_host(self, rt: &Runtime) -> Option<ObjectWire> {
        match self {
            Some(obj) => obj.into_object().into_host(rt),
            None => Some(ObjectWire::default()),
        }
    }
}
