use tether_sys::{RawWire, WireKind};

use crate::bridge::Scope;
use crate::registry::{Handle, Ownership};
use crate::runtime::Runtime;

/// A registry slot holding one host reference, released on drop.
///
/// Owned references are destroyed through the host; borrowed ones only end
/// their guest-side mirror.
pub(crate) struct Held {
    rt: Runtime,
    handle: Handle,
    kind: WireKind,
}

impl Held {
    /// Take ownership of `wire`. The all-zero wire needs no handle.
    pub(crate) fn owned(rt: &Runtime, kind: WireKind, wire: RawWire) -> Option<Self> {
        Self::insert(rt, kind, wire, Ownership::Owned)
    }

    /// Mirror a reference lent for the duration of `scope`.
    pub(crate) fn borrowed(scope: &mut Scope<'_>, kind: WireKind, wire: RawWire) -> Option<Self> {
        if wire == RawWire::default() {
            return None;
        }
        let handle = scope.borrow(kind, wire);
        Some(Self {
            rt: scope.runtime().clone(),
            handle,
            kind,
        })
    }

    pub(crate) fn insert(
        rt: &Runtime,
        kind: WireKind,
        wire: RawWire,
        ownership: Ownership,
    ) -> Option<Self> {
        if wire == RawWire::default() {
            return None;
        }
        Some(Self {
            rt: rt.clone(),
            handle: rt.handles().insert(kind, wire, ownership),
            kind,
        })
    }

    pub(crate) fn runtime(&self) -> &Runtime {
        &self.rt
    }

    pub(crate) fn handle(&self) -> Handle {
        self.handle
    }

    /// Current wire form. Logs and misses when cycled.
    pub(crate) fn wire(&self) -> Option<RawWire> {
        self.rt.handles().get(self.handle)
    }

    /// A new owned host reference to the same value.
    pub(crate) fn copy(&self) -> Option<RawWire> {
        let wire = self.wire()?;
        Some(self.rt.host().wire_copy(self.kind, wire))
    }

    /// Same value under a new owned handle.
    pub(crate) fn duplicate(&self) -> Option<Self> {
        let wire = self.copy()?;
        Self::owned(&self.rt, self.kind, wire)
    }

    /// End the handle and give its reference away. A borrowed reference is
    /// not ours to give, so the host gets a copy.
    pub(crate) fn transfer(self) -> Option<RawWire> {
        let released = self.rt.handles().end(self.handle)?;
        match released.ownership {
            Ownership::Owned => Some(released.wire),
            Ownership::Borrowed => Some(self.rt.host().wire_copy(self.kind, released.wire)),
        }
    }
}

impl Drop for Held {
    fn drop(&mut self) {
        if let Some(released) = self.rt.handles().take(self.handle) {
            if released.ownership == Ownership::Owned {
                self.rt.host().wire_destroy(released.kind, released.wire);
            }
        }
    }
}

/// `FromHost`, `ToHost` and `Clone` for a type shaped `struct T { held: Option<Held> }`.
macro_rules! handle_bridge {
    ($ty:ident, $wire:ty, $kind:expr) => {
        impl $crate::bridge::FromHost for $ty {
            type Wire = $wire;

            fn from_borrowed(wire: $wire, scope: &mut $crate::bridge::Scope<'_>) -> Self {
                use tether_sys::WireForm;
                $ty {
                    held: $crate::builtin::held::Held::borrowed(scope, $kind, wire.into_raw()),
                }
            }

            fn from_owned(wire: $wire, rt: &$crate::Runtime) -> Self {
                use tether_sys::WireForm;
                $ty {
                    held: $crate::builtin::held::Held::owned(rt, $kind, wire.into_raw()),
                }
            }
        }

        impl $crate::bridge::ToHost for $ty {
            type Wire = $wire;

            fn to_arg(&self, _frame: &mut $crate::CallFrame<'_>) -> $wire {
                use tether_sys::WireForm;
                self.held
                    .as_ref()
                    .and_then(|held| held.wire())
                    .map(<$wire>::from_raw)
                    .unwrap_or_default()
            }

            fn to_host(&self, _rt: &$crate::Runtime) -> Option<$wire> {
                use tether_sys::WireForm;
                match &self.held {
                    None => Some(<$wire>::default()),
                    Some(held) => held.copy().map(<$wire>::from_raw),
                }
            }

            fn into_host(self, _rt: &$crate::Runtime) -> Option<$wire> {
                use tether_sys::WireForm;
                match self.held {
                    None => Some(<$wire>::default()),
                    Some(held) => held.transfer().map(<$wire>::from_raw),
                }
            }
        }

        impl Clone for $ty {
            fn clone(&self) -> Self {
                $ty {
                    held: self.held.as_ref().and_then(|held| held.duplicate()),
                }
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                $ty { held: None }
            }
        }
    };
}

pub(crate) use handle_bridge;
