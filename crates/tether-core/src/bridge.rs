//! Value bridge between host wire forms and guest values.
//!
//! [`FromHost`] decodes and [`ToHost`] encodes. Each impl names the wire type
//! that occupies its slot, so a trampoline or call frame never needs to know
//! more than `T::Wire`.
//!
//! Ownership follows the three cases the host ABI has:
//! - callback arguments are lent to us: [`FromHost::from_borrowed`] records
//!   any handle it creates in the trampoline's [`Scope`];
//! - host call results are handed to us: [`FromHost::from_owned`] takes
//!   ownership;
//! - values we return from a callback are handed to the host:
//!   [`ToHost::into_host`] transfers ownership, or yields `None` when the value
//!   sits behind a cycled handle and nothing should be written.

use std::ffi::c_void;

use tether_sys::{
    Aabb, Basis, InstanceId, Quaternion, RawWire, Rect2, Rid, Slot, StringWire, TextKind,
    Transform3D, Vector2, Vector3,
};

use crate::frame::CallFrame;
use crate::registry::{Handle, Ownership};
use crate::runtime::Runtime;

/// Decode a host wire value into a guest value.
pub trait FromHost: Sized {
    /// Wire form in the argument or return slot
    type Wire: Slot;

    /// Decode a value the host lends for the duration of a callback.
    fn from_borrowed(wire: Self::Wire, scope: &mut Scope<'_>) -> Self;

    /// Decode a value the host has handed over to us.
    fn from_owned(wire: Self::Wire, rt: &Runtime) -> Self;
}

/// Encode a guest value as a host wire value.
pub trait ToHost {
    /// Wire form in the argument or return slot
    type Wire: Slot;

    /// Encode as an argument of a host call. The host only borrows it;
    /// anything created for the call belongs to `frame`.
    fn to_arg(&self, frame: &mut CallFrame<'_>) -> Self::Wire;

    /// Encode as a new owned host value. `None` if the value is unusable.
    fn to_host(&self, rt: &Runtime) -> Option<Self::Wire>;

    /// Hand the value itself over to the host. `None` if it is unusable.
    fn into_host(self, rt: &Runtime) -> Option<Self::Wire>
    where
        Self: Sized,
    {
        self.to_host(rt)
    }
}

// ============================================================================
// Deferred cleanup
// ============================================================================

/// Borrowed handles acquired while decoding one callback's arguments.
///
/// Dropping the scope ends them in reverse order of acquisition. Handles the
/// guest already dropped are skipped.
pub struct Scope<'rt> {
    rt: &'rt Runtime,
    borrowed: Vec<Handle>,
}

impl<'rt> Scope<'rt> {
    pub fn new(rt: &'rt Runtime) -> Self {
        Self {
            rt,
            borrowed: Vec::new(),
        }
    }

    pub fn runtime(&self) -> &'rt Runtime {
        self.rt
    }

    /// Mirror a lent host reference under a borrowed handle released with
    /// this scope.
    pub fn borrow(&mut self, kind: tether_sys::WireKind, wire: RawWire) -> Handle {
        let handle = self.rt.handles().insert(kind, wire, Ownership::Borrowed);
        self.borrowed.push(handle);
        handle
    }

    /// Handles acquired so far
    pub fn len(&self) -> usize {
        self.borrowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.borrowed.is_empty()
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        let handles = self.rt.handles();
        while let Some(handle) = self.borrowed.pop() {
            handles.take(handle);
        }
    }
}

// ============================================================================
// Plain data
// ============================================================================

macro_rules! identity_bridge {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromHost for $ty {
                type Wire = $ty;

                #[inline]
                fn from_borrowed(wire: $ty, _scope: &mut Scope<'_>) -> Self {
                    wire
                }

                #[inline]
                fn from_owned(wire: $ty, _rt: &Runtime) -> Self {
                    wire
                }
            }

            impl ToHost for $ty {
                type Wire = $ty;

                #[inline]
                fn to_arg(&self, _frame: &mut CallFrame<'_>) -> $ty {
                    *self
                }

                #[inline]
                fn to_host(&self, _rt: &Runtime) -> Option<$ty> {
                    Some(*self)
                }
            }
        )*
    };
}

identity_bridge!(
    (),
    bool,
    i64,
    f64,
    Rid,
    InstanceId,
    Vector2,
    Vector3,
    Quaternion,
    Basis,
    Transform3D,
    Aabb,
    Rect2,
    *mut c_void,
    *const c_void,
);

// Guest-native integers travel as the host's 64-bit int.
macro_rules! int_bridge {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromHost for $ty {
                type Wire = i64;

                #[inline]
                fn from_borrowed(wire: i64, _scope: &mut Scope<'_>) -> Self {
                    narrow_int!(wire, $ty)
                }

                #[inline]
                fn from_owned(wire: i64, _rt: &Runtime) -> Self {
                    narrow_int!(wire, $ty)
                }
            }

            impl ToHost for $ty {
                type Wire = i64;

                #[inline]
                fn to_arg(&self, _frame: &mut CallFrame<'_>) -> i64 {
                    widen_int!(*self, $ty)
                }

                #[inline]
                fn to_host(&self, _rt: &Runtime) -> Option<i64> {
                    Some(widen_int!(*self, $ty))
                }
            }
        )*
    };
}

macro_rules! narrow_int {
    ($wire:expr, $ty:ty) => {{
        let wire = $wire;
        if cfg!(debug_assertions) {
            match <$ty>::try_from(wire) {
                Ok(value) => value,
                Err(_) => {
                    log::warn!(
                        "host int {} out of range for {}, saturating",
                        wire,
                        stringify!($ty)
                    );
                    if wire < 0 {
                        <$ty>::MIN
                    } else {
                        <$ty>::MAX
                    }
                }
            }
        } else {
            wire as $ty
        }
    }};
}

// Only `u64` and `usize` can exceed the wire.
macro_rules! widen_int {
    ($value:expr, $ty:ty) => {{
        let value = $value;
        if cfg!(debug_assertions) {
            i64::try_from(value).unwrap_or_else(|_| {
                log::warn!(
                    "{} {} out of range for the host int, saturating",
                    stringify!($ty),
                    value
                );
                i64::MAX
            })
        } else {
            value as i64
        }
    }};
}

int_bridge!(i8, i16, i32, u8, u16, u32, u64, isize, usize);

// Guest `f32` travels as the host's 64-bit float.
impl FromHost for f32 {
    type Wire = f64;

    #[inline]
    fn from_borrowed(wire: f64, _scope: &mut Scope<'_>) -> Self {
        wire as f32
    }

    #[inline]
    fn from_owned(wire: f64, _rt: &Runtime) -> Self {
        wire as f32
    }
}

impl ToHost for f32 {
    type Wire = f64;

    #[inline]
    fn to_arg(&self, _frame: &mut CallFrame<'_>) -> f64 {
        *self as f64
    }

    #[inline]
    fn to_host(&self, _rt: &Runtime) -> Option<f64> {
        Some(*self as f64)
    }
}

impl<A: ToHost + ?Sized> ToHost for &A {
    type Wire = A::Wire;

    fn to_arg(&self, frame: &mut CallFrame<'_>) -> A::Wire {
        (**self).to_arg(frame)
    }

    fn to_host(&self, rt: &Runtime) -> Option<A::Wire> {
        (**self).to_host(rt)
    }
}

// ============================================================================
// Text
// ============================================================================

pub(crate) fn text_from_borrowed(rt: &Runtime, kind: TextKind, wire: u64) -> String {
    if wire == 0 {
        return String::new();
    }
    rt.host().string_text(kind, wire)
}

pub(crate) fn text_from_owned(rt: &Runtime, kind: TextKind, wire: u64) -> String {
    let text = text_from_borrowed(rt, kind, wire);
    if wire != 0 {
        rt.host()
            .wire_destroy(kind.wire_kind(), RawWire([wire, 0, 0]));
    }
    text
}

pub(crate) fn text_to_arg(frame: &mut CallFrame<'_>, kind: TextKind, text: &str) -> u64 {
    let wire = frame.runtime().host().string_new(kind, text);
    frame.own_temp(kind.wire_kind(), RawWire([wire, 0, 0]));
    wire
}

impl FromHost for String {
    type Wire = StringWire;

    fn from_borrowed(wire: StringWire, scope: &mut Scope<'_>) -> Self {
        text_from_borrowed(scope.runtime(), TextKind::String, wire.0)
    }

    fn from_owned(wire: StringWire, rt: &Runtime) -> Self {
        text_from_owned(rt, TextKind::String, wire.0)
    }
}

impl ToHost for str {
    type Wire = StringWire;

    fn to_arg(&self, frame: &mut CallFrame<'_>) -> StringWire {
        StringWire(text_to_arg(frame, TextKind::String, self))
    }

    fn to_host(&self, rt: &Runtime) -> Option<StringWire> {
        Some(StringWire(rt.host().string_new(TextKind::String, self)))
    }
}

impl ToHost for String {
    type Wire = StringWire;

    fn to_arg(&self, frame: &mut CallFrame<'_>) -> StringWire {
        self.as_str().to_arg(frame)
    }

    fn to_host(&self, rt: &Runtime) -> Option<StringWire> {
        self.as_str().to_host(rt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tether_test::MockHost;

    #[test]
    fn test_narrowing_saturates_in_debug() {
        let rt = Runtime::new(Arc::new(MockHost::new()));
        let mut scope = Scope::new(&rt);
        assert_eq!(i32::from_borrowed(42, &mut scope), 42);
        assert_eq!(u8::from_owned(-1, &rt), if cfg!(debug_assertions) { 0 } else { 255 });
        if cfg!(debug_assertions) {
            assert_eq!(i32::from_owned(i64::MAX, &rt), i32::MAX);
        }
    }

    #[test]
    fn test_widening_saturates_in_debug() {
        let rt = Runtime::new(Arc::new(MockHost::new()));
        assert_eq!(7u64.to_host(&rt), Some(7));
        assert_eq!((-3i8).to_host(&rt), Some(-3));
        assert_eq!((i64::MAX as u64).to_host(&rt), Some(i64::MAX));
        let expected = if cfg!(debug_assertions) { i64::MAX } else { -1 };
        assert_eq!(u64::MAX.to_host(&rt), Some(expected));

        let mut frame = CallFrame::new(&rt);
        frame.push(&u64::MAX);
        assert_eq!(frame.words(), &[expected as u64]);
    }

    #[test]
    fn test_f32_widens() {
        let rt = Runtime::new(Arc::new(MockHost::new()));
        assert_eq!(1.5f32.to_host(&rt), Some(1.5f64));
        assert_eq!(f32::from_owned(0.25, &rt), 0.25);
    }

    #[test]
    fn test_string_ownership() {
        let host = Arc::new(MockHost::new());
        let rt = Runtime::new(host.clone());

        let wire = "hello".to_host(&rt).unwrap();
        assert_eq!(host.refcount(wire.0), Some(1));

        {
            let mut scope = Scope::new(&rt);
            assert_eq!(String::from_borrowed(wire, &mut scope), "hello");
        }
        assert_eq!(host.refcount(wire.0), Some(1));

        assert_eq!(String::from_owned(wire, &rt), "hello");
        assert_eq!(host.refcount(wire.0), None);
    }

    #[test]
    fn test_null_string_is_empty() {
        let rt = Runtime::new(Arc::new(MockHost::new()));
        assert_eq!(String::from_owned(StringWire::default(), &rt), "");
    }
}
