//! Packed arrays.
//!
//! A guest `Vec<T>` is the semantic value of a host packed array: decoding
//! copies the elements out, encoding builds a new packed array. [`Packed`] is
//! the handle-backed form for code that wants to keep the host's storage.

use std::marker::PhantomData;

use bytemuck::Pod;
use tether_sys::{PackedArrayWire, PackedKind, RawWire, Vector2, Vector3, WireForm, WireKind};

use super::held::Held;
use crate::bridge::{FromHost, Scope, ToHost};
use crate::frame::CallFrame;
use crate::runtime::Runtime;

/// Element type of a host packed array.
pub trait PackedElement: Pod {
    const KIND: PackedKind;
}

macro_rules! packed_element {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(impl PackedElement for $ty {
            const KIND: PackedKind = PackedKind::$kind;
        })*
    };
}

packed_element!(
    u8 => Byte,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Vector2 => Vector2,
    Vector3 => Vector3,
);

pub type PackedByteArray = Packed<u8>;
pub type PackedInt32Array = Packed<i32>;
pub type PackedInt64Array = Packed<i64>;
pub type PackedFloat32Array = Packed<f32>;
pub type PackedFloat64Array = Packed<f64>;
pub type PackedVector2Array = Packed<Vector2>;
pub type PackedVector3Array = Packed<Vector3>;

fn raw(wire: PackedArrayWire) -> RawWire {
    wire.into_raw()
}

pub(crate) fn read_elements<T: PackedElement>(rt: &Runtime, wire: PackedArrayWire) -> Vec<T> {
    if wire.is_null() {
        return Vec::new();
    }
    let host = rt.host();
    let len = host.packed_len(T::KIND, wire);
    let data = host.packed_data(T::KIND, wire);
    if len == 0 || data.is_null() {
        return Vec::new();
    }
    let size = std::mem::size_of::<T>();
    // SAFETY: the host guarantees `len` elements at `data` until the array is
    // next modified, and nothing runs between here and the copy.
    let bytes = unsafe { std::slice::from_raw_parts(data, len * size) };
    bytes
        .chunks_exact(size)
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

pub(crate) fn new_packed<T: PackedElement>(rt: &Runtime, elements: &[T]) -> PackedArrayWire {
    let bytes: &[u8] = bytemuck::cast_slice(elements);
    // SAFETY: `bytes` covers exactly `elements.len()` elements of `T::KIND`.
    unsafe {
        rt.host()
            .packed_new(T::KIND, bytes.as_ptr(), elements.len())
    }
}

impl<T: PackedElement> FromHost for Vec<T> {
    type Wire = PackedArrayWire;

    fn from_borrowed(wire: PackedArrayWire, scope: &mut Scope<'_>) -> Self {
        read_elements(scope.runtime(), wire)
    }

    fn from_owned(wire: PackedArrayWire, rt: &Runtime) -> Self {
        let elements = read_elements(rt, wire);
        if !wire.is_null() {
            rt.host()
                .wire_destroy(WireKind::Packed(T::KIND), raw(wire));
        }
        elements
    }
}

impl<T: PackedElement> ToHost for [T] {
    type Wire = PackedArrayWire;

    fn to_arg(&self, frame: &mut CallFrame<'_>) -> PackedArrayWire {
        let wire = new_packed(frame.runtime(), self);
        frame.own_temp(WireKind::Packed(T::KIND), raw(wire));
        wire
    }

    fn to_host(&self, rt: &Runtime) -> Option<PackedArrayWire> {
        Some(new_packed(rt, self))
    }
}

impl<T: PackedElement> ToHost for Vec<T> {
    type Wire = PackedArrayWire;

    fn to_arg(&self, frame: &mut CallFrame<'_>) -> PackedArrayWire {
        self.as_slice().to_arg(frame)
    }

    fn to_host(&self, rt: &Runtime) -> Option<PackedArrayWire> {
        self.as_slice().to_host(rt)
    }
}

/// Handle to a host packed array.
pub struct Packed<T: PackedElement> {
    held: Option<Held>,
    _element: PhantomData<T>,
}

impl<T: PackedElement> Packed<T> {
    fn wrap(held: Option<Held>) -> Self {
        Self {
            held,
            _element: PhantomData,
        }
    }

    /// Copy `elements` into a new host packed array.
    pub fn from_slice(rt: &Runtime, elements: &[T]) -> Self {
        let wire = new_packed(rt, elements);
        Self::wrap(Held::owned(rt, WireKind::Packed(T::KIND), raw(wire)))
    }

    fn wire(&self) -> Option<(&Runtime, PackedArrayWire)> {
        let held = self.held.as_ref()?;
        Some((held.runtime(), PackedArrayWire::from_raw(held.wire()?)))
    }

    pub fn len(&self) -> usize {
        self.wire()
            .map(|(rt, wire)| rt.host().packed_len(T::KIND, wire))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the element at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        let (rt, wire) = self.wire()?;
        let host = rt.host();
        if index >= host.packed_len(T::KIND, wire) {
            return None;
        }
        let size = std::mem::size_of::<T>();
        // SAFETY: index is in bounds of the host's element storage.
        let bytes = unsafe {
            std::slice::from_raw_parts(host.packed_data(T::KIND, wire).add(index * size), size)
        };
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    /// Copy of every element.
    pub fn to_vec(&self) -> Vec<T> {
        match self.wire() {
            Some((rt, wire)) => read_elements(rt, wire),
            None => Vec::new(),
        }
    }
}

impl<T: PackedElement> Default for Packed<T> {
    fn default() -> Self {
        Self::wrap(None)
    }
}

impl<T: PackedElement> Clone for Packed<T> {
    fn clone(&self) -> Self {
        Self::wrap(self.held.as_ref().and_then(Held::duplicate))
    }
}

impl<T: PackedElement + std::fmt::Debug> std::fmt::Debug for Packed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

impl<T: PackedElement> FromHost for Packed<T> {
    type Wire = PackedArrayWire;

    fn from_borrowed(wire: PackedArrayWire, scope: &mut Scope<'_>) -> Self {
        Self::wrap(Held::borrowed(scope, WireKind::Packed(T::KIND), raw(wire)))
    }

    fn from_owned(wire: PackedArrayWire, rt: &Runtime) -> Self {
        Self::wrap(Held::owned(rt, WireKind::Packed(T::KIND), raw(wire)))
    }
}

impl<T: PackedElement> ToHost for Packed<T> {
    type Wire = PackedArrayWire;

    fn to_arg(&self, _frame: &mut CallFrame<'_>) -> PackedArrayWire {
        self.wire().map(|(_, wire)| wire).unwrap_or_default()
    }

    fn to_host(&self, _rt: &Runtime) -> Option<PackedArrayWire> {
        match &self.held {
            None => Some(PackedArrayWire::default()),
            Some(held) => held.copy().map(PackedArrayWire::from_raw),
        }
    }

    fn into_host(self, _rt: &Runtime) -> Option<PackedArrayWire> {
        match self.held {
            None => Some(PackedArrayWire::default()),
            Some(held) => held.transfer().map(PackedArrayWire::from_raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tether_test::MockHost;

    #[test]
    fn test_vec_encode_transfers() {
        let host = Arc::new(MockHost::new());
        let rt = Runtime::new(host.clone());

        let points = vec![Vector3::RIGHT, Vector3::UP, Vector3::BACK];
        let wire = points.to_host(&rt).unwrap();
        assert_eq!(host.refcount(wire.0), Some(1));
        assert_eq!(Vec::<Vector3>::from_owned(wire, &rt), points);
        assert_eq!(host.live_refs(), 0);
    }

    #[test]
    fn test_handle_backed_access() {
        let host = Arc::new(MockHost::new());
        let rt = Runtime::new(host.clone());

        let packed = PackedInt32Array::from_slice(&rt, &[3, 1, 4]);
        assert_eq!(packed.len(), 3);
        assert_eq!(packed.get(2), Some(4));
        assert_eq!(packed.get(3), None);

        let copy = packed.clone();
        assert_eq!(copy.to_vec(), vec![3, 1, 4]);
        drop(packed);
        drop(copy);
        assert_eq!(host.live_refs(), 0);
    }

    #[test]
    fn test_empty_default_has_no_handle() {
        let rt = Runtime::new(Arc::new(MockHost::new()));
        let empty = PackedByteArray::default();
        assert!(empty.is_empty());
        assert_eq!(empty.into_host(&rt), Some(PackedArrayWire::default()));
    }
}
