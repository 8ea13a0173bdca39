//! Host-to-guest virtual dispatch.
//!
//! Every trampoline the façade macros generate is a two-line
//! `unsafe extern "C" fn` that forwards to [`call_virtual`], which does the
//! actual work: recover the instance, decode the arguments into a [`Scope`],
//! run the guest method, encode the result and release the scope.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rustc_hash::FxHashMap;
use tether_sys::{ArgCursor, ArgsAddr, InstancePtr, RetAddr, Trampoline};

use crate::bridge::{FromHost, Scope, ToHost};
use crate::class::{GuestClass, InstanceStorage};

/// One overrideable method: the host's name for it and the trampoline that
/// implements it.
#[derive(Clone, Copy, Debug)]
pub struct VirtualSlot {
    pub name: &'static str,
    pub trampoline: Trampoline,
}

/// Name → trampoline table for one registered class.
#[derive(Default, Debug)]
pub struct VirtualTable {
    entries: FxHashMap<&'static str, Trampoline>,
}

impl VirtualTable {
    pub fn new(slots: impl IntoIterator<Item = VirtualSlot>) -> Self {
        Self {
            entries: slots
                .into_iter()
                .map(|slot| (slot.name, slot.trampoline))
                .collect(),
        }
    }

    /// Trampoline for `name`; `None` means the host keeps its default.
    pub fn get(&self, name: &str) -> Option<Trampoline> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Installed method names, unordered
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

/// A tuple of callback arguments, decoded in order from a packed tuple.
pub trait DecodeArgs: Sized {
    /// Decode every argument, recording borrowed handles in `scope`.
    ///
    /// # Safety
    ///
    /// `args` must hold this tuple's wire forms in order.
    unsafe fn decode(args: ArgsAddr, scope: &mut Scope<'_>) -> Self;
}

macro_rules! decode_args_tuple {
    ($($name:ident),*) => {
        impl<$($name: FromHost),*> DecodeArgs for ($($name,)*) {
            #[allow(unused_variables, unused_mut, clippy::unused_unit)]
            unsafe fn decode(args: ArgsAddr, scope: &mut Scope<'_>) -> Self {
                let mut cursor = ArgCursor::new(args);
                ($($name::from_borrowed(cursor.next::<$name::Wire>(), scope),)*)
            }
        }
    };
}

decode_args_tuple!();
decode_args_tuple!(A);
decode_args_tuple!(A, B);
decode_args_tuple!(A, B, C);
decode_args_tuple!(A, B, C, D);
decode_args_tuple!(A, B, C, D, E);
decode_args_tuple!(A, B, C, D, E, F);
decode_args_tuple!(A, B, C, D, E, F, G);
decode_args_tuple!(A, B, C, D, E, F, G, H);
decode_args_tuple!(A, B, C, D, E, F, G, H, I);
decode_args_tuple!(A, B, C, D, E, F, G, H, I, J);

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Body of every trampoline.
///
/// A guest panic is contained here and nothing is written. So is a call that
/// re-enters an instance already inside one of its own methods, unless that
/// method yielded the instance through [`GuestClass::base_mut`].
///
/// # Safety
///
/// `instance` must be the storage pointer the host received from
/// `create_instance` for `T`, and `args`/`ret` must match `method`'s
/// signature.
pub unsafe fn call_virtual<T, A, R, F>(
    instance: InstancePtr,
    args: ArgsAddr,
    ret: RetAddr,
    method: &'static str,
    body: F,
) where
    T: GuestClass,
    A: DecodeArgs,
    R: ToHost,
    F: FnOnce(&mut T, A) -> R,
{
    if instance.is_null() {
        log::error!("{}::{} called without an instance", T::CLASS_NAME, method);
        return;
    }
    let storage = &*(instance as *const InstanceStorage<T>);
    let rt = storage.runtime();
    log::trace!("dispatch {}::{}", T::CLASS_NAME, method);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut scope = Scope::new(rt);
        let decoded = A::decode(args, &mut scope);

        let Some(mut user) = storage.borrow_mut() else {
            log::error!(
                "{}::{} re-entered an instance that is already in use; call the host through `base_mut()` to allow this",
                T::CLASS_NAME,
                method
            );
            return None;
        };
        let result = body(&mut *user, decoded);
        drop(user);

        // Nowhere to put it: dropping the result releases what it holds.
        if ret.is_null() {
            return None;
        }
        // Encode before the scope releases the arguments: the result may be
        // one of them.
        result.into_host(rt)
    }));

    match outcome {
        Ok(Some(wire)) => ret.store(wire),
        Ok(None) => {}
        Err(payload) => log::error!(
            "{}::{} panicked: {}",
            T::CLASS_NAME,
            method,
            panic_message(&*payload)
        ),
    }
}
