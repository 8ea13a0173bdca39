//! Interned names and scene paths.
//!
//! Both decode to guest-owned text; no host reference outlives the
//! conversion, so neither needs a handle.

use std::fmt;

use tether_sys::{NodePathWire, StringNameWire, TextKind};

use crate::bridge::{text_from_borrowed, text_from_owned, text_to_arg, FromHost, Scope, ToHost};
use crate::frame::CallFrame;
use crate::runtime::Runtime;

macro_rules! text_type {
    ($(#[$meta:meta])* $name:ident, $wire:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Default, Debug)]
        pub struct $name(String);

        impl $name {
            pub fn new(text: impl Into<String>) -> Self {
                Self(text.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl From<&str> for $name {
            fn from(text: &str) -> Self {
                Self(text.to_string())
            }
        }

        impl From<String> for $name {
            fn from(text: String) -> Self {
                Self(text)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromHost for $name {
            type Wire = $wire;

            fn from_borrowed(wire: $wire, scope: &mut Scope<'_>) -> Self {
                Self(text_from_borrowed(scope.runtime(), $kind, wire.0))
            }

            fn from_owned(wire: $wire, rt: &Runtime) -> Self {
                Self(text_from_owned(rt, $kind, wire.0))
            }
        }

        impl ToHost for $name {
            type Wire = $wire;

            fn to_arg(&self, frame: &mut CallFrame<'_>) -> $wire {
                $wire(text_to_arg(frame, $kind, &self.0))
            }

            fn to_host(&self, rt: &Runtime) -> Option<$wire> {
                Some($wire(rt.host().string_new($kind, &self.0)))
            }
        }
    };
}

text_type!(
    /// An interned host name (method names, signal names, class names).
    StringName,
    StringNameWire,
    TextKind::StringName
);

text_type!(
    /// A path through the scene tree.
    NodePath,
    NodePathWire,
    TextKind::NodePath
);
