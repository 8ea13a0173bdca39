//! Call frames for guest-to-host method calls.
//!
//! A frame is a word buffer that arguments are appended to in call order,
//! plus a zeroed return slot. Buffers come from a small per-thread pool and
//! go back to it when the frame drops; temporaries created while encoding
//! arguments (strings, packed arrays, ...) are destroyed at the same point,
//! in reverse order of creation. Dropping happens on every exit path,
//! including unwinding out of a guest panic.

use std::cell::{Cell, RefCell};

use bytemuck::Zeroable;
use tether_sys::{ArgsAddr, MethodBindPtr, ObjectPtr, RawWire, RetAddr, Slot, WireKind};

use crate::bridge::ToHost;
use crate::runtime::Runtime;

/// Words reserved for the return slot; wide enough for any fixed-layout
/// return value.
pub const RET_WORDS: usize = 8;

thread_local! {
    static POOL: RefCell<Vec<Vec<u64>>> = const { RefCell::new(Vec::new()) };
    static STATS: Cell<FrameStats> = const { Cell::new(FrameStats { created: 0, outstanding: 0 }) };
}

/// Frame counters for the current thread.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct FrameStats {
    /// Frames ever created on this thread
    pub created: u64,
    /// Frames not yet released
    pub outstanding: usize,
}

/// Frame counters for the current thread.
pub fn frame_stats() -> FrameStats {
    STATS.with(|s| s.get())
}

fn update_stats(f: impl FnOnce(&mut FrameStats)) {
    STATS.with(|s| {
        let mut stats = s.get();
        f(&mut stats);
        s.set(stats);
    });
}

/// Argument buffer and return slot for one host method call.
pub struct CallFrame<'rt> {
    rt: &'rt Runtime,
    words: Vec<u64>,
    args: usize,
    ret: [u64; RET_WORDS],
    temps: Vec<(WireKind, RawWire)>,
}

impl<'rt> CallFrame<'rt> {
    /// Acquire a frame, reusing a pooled buffer when one is available.
    pub fn new(rt: &'rt Runtime) -> Self {
        let words = POOL
            .with(|pool| pool.borrow_mut().pop())
            .unwrap_or_else(|| Vec::with_capacity(rt.options().frame_words));
        update_stats(|s| {
            s.created += 1;
            s.outstanding += 1;
        });
        Self {
            rt,
            words,
            args: 0,
            ret: [0; RET_WORDS],
            temps: Vec::new(),
        }
    }

    /// The runtime this frame calls through
    pub fn runtime(&self) -> &'rt Runtime {
        self.rt
    }

    /// Append a value already in wire form.
    pub fn arg<T: Slot>(&mut self, value: T) -> &mut Self {
        let start = self.words.len();
        self.words.resize(start + T::WORDS, 0);
        if T::WORDS > 0 {
            // SAFETY: the buffer was just grown by `T::WORDS` words at `start`.
            unsafe {
                std::ptr::write_unaligned(self.words.as_mut_ptr().add(start) as *mut T, value);
            }
        }
        self.args += 1;
        self
    }

    /// Encode a guest value and append it.
    pub fn push<A: ToHost + ?Sized>(&mut self, value: &A) -> &mut Self {
        let wire = value.to_arg(self);
        self.arg(wire)
    }

    /// Hand a host reference created for this call to the frame, which
    /// destroys it when the call is over.
    pub fn own_temp(&mut self, kind: WireKind, wire: RawWire) {
        self.temps.push((kind, wire));
    }

    /// Number of arguments appended so far
    pub fn arg_count(&self) -> usize {
        self.args
    }

    /// Arguments appended so far, in words
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Address of argument `index`. Only `0` is meaningful to the host,
    /// which walks the tuple itself; any later `arg` invalidates it.
    pub fn array(&self, index: usize) -> ArgsAddr {
        if self.words.is_empty() {
            return ArgsAddr::null();
        }
        debug_assert_eq!(index, 0, "host calls take the tuple start");
        ArgsAddr::new(self.words.as_ptr())
    }

    /// The return slot typed as `T`. Null when `T` has no width.
    pub fn ret<T: Slot>(&mut self) -> RetAddr {
        debug_assert!(T::WORDS <= RET_WORDS, "return type wider than the slot");
        if T::WORDS == 0 {
            return RetAddr::null();
        }
        RetAddr::new(self.ret.as_mut_ptr())
    }

    /// Read the return slot as `T`.
    pub fn read_ret<T: Slot>(&self) -> T {
        if T::WORDS == 0 {
            return T::zeroed();
        }
        // SAFETY: the slot is RET_WORDS long and every Slot type is valid for
        // any bit pattern the host wrote (including all zeroes).
        unsafe { std::ptr::read_unaligned(self.ret.as_ptr() as *const T) }
    }

    /// Invoke `method` on `object` with the arguments appended so far and
    /// return what it wrote into the return slot.
    pub fn call<T: Slot>(&mut self, method: MethodBindPtr, object: ObjectPtr) -> T {
        let args = self.array(0);
        let ret = self.ret::<T>();
        // SAFETY: the façade built the argument tuple for this method bind.
        unsafe {
            self.rt
                .host()
                .method_bind_ptrcall(method, object, args, ret);
        }
        self.read_ret::<T>()
    }
}

impl Drop for CallFrame<'_> {
    fn drop(&mut self) {
        let host = self.rt.host();
        while let Some((kind, wire)) = self.temps.pop() {
            host.wire_destroy(kind, wire);
        }

        let mut words = std::mem::take(&mut self.words);
        words.clear();
        let keep = self.rt.options().frame_pool_size;
        POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < keep {
                pool.push(words);
            }
        });
        update_stats(|s| s.outstanding -= 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tether_sys::{Vector3, WORD};
    use tether_test::MockHost;

    #[test]
    fn test_args_packed_by_width() {
        let rt = Runtime::new(Arc::new(MockHost::new()));
        let mut frame = CallFrame::new(&rt);
        frame
            .arg(3i64)
            .arg(Vector3::new(1.0, 2.0, 3.0))
            .arg(true);

        assert_eq!(frame.arg_count(), 3);
        assert_eq!(frame.words().len(), 1 + 2 + 1);
        let args = frame.array(0);
        unsafe {
            assert_eq!(args.load::<i64>(0), 3);
            assert_eq!(args.load::<Vector3>(1), Vector3::new(1.0, 2.0, 3.0));
            assert!(args.load::<bool>(3));
        }
        assert_eq!(std::mem::size_of::<[u64; RET_WORDS]>(), RET_WORDS * WORD);
    }

    #[test]
    fn test_frame_release_balances() {
        let rt = Runtime::new(Arc::new(MockHost::new()));
        let before = frame_stats();
        {
            let mut frame = CallFrame::new(&rt);
            frame.arg(1i64);
            assert_eq!(frame_stats().outstanding, before.outstanding + 1);
        }
        let after = frame_stats();
        assert_eq!(after.outstanding, before.outstanding);
        assert_eq!(after.created, before.created + 1);
    }

    #[test]
    fn test_void_return_slot_is_null() {
        let rt = Runtime::new(Arc::new(MockHost::new()));
        let mut frame = CallFrame::new(&rt);
        assert!(frame.ret::<()>().is_null());
        assert!(!frame.ret::<i64>().is_null());
        assert!(frame.array(0).is_null());
    }

    #[test]
    fn test_temps_destroyed_on_drop() {
        let host = Arc::new(MockHost::new());
        let rt = Runtime::new(host.clone());
        {
            let mut frame = CallFrame::new(&rt);
            frame.push("temporary");
            assert_eq!(host.live_refs(), 1);
        }
        assert_eq!(host.live_refs(), 0);
    }
}
