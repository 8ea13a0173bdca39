//! ABI address primitives.
//!
//! The host passes arguments as one contiguous tuple of word-aligned slots
//! and receives results through a single return slot. A slot's width is
//! fixed per type: `ceil(size_of::<T>() / WORD)` words. Values narrower than
//! a word sit at the start of their slot.

use std::ptr;

use bytemuck::Zeroable;

use crate::math::{Aabb, Basis, Quaternion, Rect2, Transform3D, Vector2, Vector3};
use crate::wire::*;

/// A type that may be stored directly in an argument or return slot.
///
/// # Safety
///
/// Implementors must be plain data whose every bit pattern written by the
/// host is a valid value, and whose layout is the host's layout. The `i32`
/// impl exists for enum slots; guest-native integers and `f32` scalars are
/// widened by the value bridge instead.
pub unsafe trait Slot: Copy + Zeroable + 'static {
    /// Width of this slot in words.
    const WORDS: usize = std::mem::size_of::<Self>().div_ceil(WORD);
}

macro_rules! impl_slot {
    ($($ty:ty),* $(,)?) => {
        $(unsafe impl Slot for $ty {})*
    };
}

impl_slot!(
    (),
    bool,
    i32,
    i64,
    u64,
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
    VariantWire,
    StringWire,
    StringNameWire,
    NodePathWire,
    ArrayWire,
    DictionaryWire,
    PackedArrayWire,
    CallableWire,
    ObjectWire,
);

// Pointers to host-side structs passed by address (e.g. motion results).
unsafe impl<T: 'static> Slot for *mut T {}
unsafe impl<T: 'static> Slot for *const T {}

/// Start of a packed argument tuple supplied by the host (or by a call frame).
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ArgsAddr(*const u64);

impl ArgsAddr {
    /// Wrap a raw pointer to the first argument word.
    #[inline]
    pub const fn new(ptr: *const u64) -> Self {
        ArgsAddr(ptr)
    }

    /// An argument address for methods that take no arguments.
    #[inline]
    pub const fn null() -> Self {
        ArgsAddr(ptr::null())
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    #[inline]
    pub fn as_ptr(self) -> *const u64 {
        self.0
    }

    /// Read the slot that starts `word_offset` words into the tuple.
    ///
    /// The offset of argument `i` is the sum of the widths of arguments
    /// `0..i`; [`ArgCursor`] does that bookkeeping.
    ///
    /// # Safety
    ///
    /// The tuple must contain a `T` at that offset. No bounds check is made.
    #[inline]
    pub unsafe fn load<T: Slot>(self, word_offset: usize) -> T {
        ptr::read_unaligned(self.0.add(word_offset) as *const T)
    }
}

/// Sequential reader over an argument tuple.
#[derive(Debug)]
pub struct ArgCursor {
    addr: ArgsAddr,
    offset: usize,
}

impl ArgCursor {
    pub fn new(addr: ArgsAddr) -> Self {
        Self { addr, offset: 0 }
    }

    /// Read the next argument and advance past its slot.
    ///
    /// # Safety
    ///
    /// The next argument in the tuple must be a `T`.
    #[inline]
    pub unsafe fn next<T: Slot>(&mut self) -> T {
        if T::WORDS == 0 {
            return T::zeroed();
        }
        let value = self.addr.load::<T>(self.offset);
        self.offset += T::WORDS;
        value
    }

    /// Words consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Return slot supplied by the caller. May be null when nothing is returned.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RetAddr(*mut u64);

impl RetAddr {
    #[inline]
    pub const fn new(ptr: *mut u64) -> Self {
        RetAddr(ptr)
    }

    #[inline]
    pub const fn null() -> Self {
        RetAddr(ptr::null_mut())
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    #[inline]
    pub fn as_ptr(self) -> *mut u64 {
        self.0
    }

    /// Write `value` into the return slot. Does nothing if the slot is null.
    ///
    /// # Safety
    ///
    /// A non-null slot must be at least `T::WORDS` words long.
    #[inline]
    pub unsafe fn store<T: Slot>(self, value: T) {
        if self.0.is_null() || T::WORDS == 0 {
            return;
        }
        ptr::write_unaligned(self.0 as *mut T, value);
    }

    /// Read back what the callee wrote.
    ///
    /// # Safety
    ///
    /// The slot must be non-null and hold a `T`.
    #[inline]
    pub unsafe fn load<T: Slot>(self) -> T {
        ptr::read_unaligned(self.0 as *const T)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_widths() {
        assert_eq!(<()>::WORDS, 0);
        assert_eq!(bool::WORDS, 1);
        assert_eq!(i32::WORDS, 1);
        assert_eq!(i64::WORDS, 1);
        assert_eq!(Rid::WORDS, 1);
        assert_eq!(Vector3::WORDS, 2);
        assert_eq!(Transform3D::WORDS, 6);
        assert_eq!(Aabb::WORDS, 3);
        assert_eq!(VariantWire::WORDS, 3);
        assert_eq!(CallableWire::WORDS, 2);
    }

    #[test]
    fn test_cursor_walks_mixed_widths() {
        // (i64, Vector3, bool, VariantWire)
        let mut words = [0u64; 1 + 2 + 1 + 3];
        words[0] = 7;
        let v = Vector3::new(1.0, 2.0, 3.0);
        bytemuck::cast_slice_mut::<u64, u8>(&mut words[1..3])[..12].copy_from_slice(bytemuck::bytes_of(&v));
        words[3] = 1;
        words[4..7].copy_from_slice(&[10, 11, 12]);

        let mut cursor = ArgCursor::new(ArgsAddr::new(words.as_ptr()));
        unsafe {
            assert_eq!(cursor.next::<i64>(), 7);
            assert_eq!(cursor.next::<Vector3>(), v);
            assert!(cursor.next::<bool>());
            assert_eq!(cursor.next::<VariantWire>(), VariantWire([10, 11, 12]));
        }
        assert_eq!(cursor.offset(), 7);
    }

    #[test]
    fn test_store_to_null_is_noop() {
        unsafe { RetAddr::null().store(5i64) };
    }

    #[test]
    fn test_store_enum_bit_pattern() {
        let mut slot = [u64::MAX; 1];
        let ret = RetAddr::new(slot.as_mut_ptr());
        unsafe { ret.store(-2i32) };
        // Only the 4 enum bytes are written.
        assert_eq!(slot[0] & 0xFFFF_FFFF, 0xFFFF_FFFE);
        assert_eq!(unsafe { ret.load::<i32>() }, -2);
    }
}
