//! Façade-template macros.
//!
//! A host class binding is four macro invocations:
//! [`host_class!`](crate::host_class) declares the instance type,
//! [`host_methods!`](crate::host_methods) its guest-to-host methods,
//! [`virtual_interface!`](crate::virtual_interface) its overrideable methods
//! and [`host_enum!`](crate::host_enum) each of its enums.

/// Declare a façade type for a host class.
///
/// ```ignore
/// host_class! {
///     /// A tree control.
///     pub struct Tree: "Control";
/// }
/// ```
#[macro_export]
macro_rules! host_class {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $parent:literal;
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        $vis struct $name {
            object: $crate::ObjectRef,
        }

        impl $crate::HostClass for $name {
            const CLASS_NAME: &'static str = stringify!($name);
            const PARENT_CLASS: &'static str = $parent;

            fn from_object(object: $crate::ObjectRef) -> Self {
                Self { object }
            }

            fn as_object(&self) -> &$crate::ObjectRef {
                &self.object
            }

            fn into_object(self) -> $crate::ObjectRef {
                self.object
            }
        }

        impl $name {
            /// Ask the host for a new object of this class.
            pub fn construct(rt: &$crate::Runtime) -> Option<Self> {
                rt.construct::<Self>()
            }
        }

        impl $crate::ToHost for $name {
            type Wire = $crate::sys::ObjectWire;

            fn to_arg(&self, frame: &mut $crate::CallFrame<'_>) -> Self::Wire {
                $crate::ToHost::to_arg(&self.object, frame)
            }

            fn to_host(&self, rt: &$crate::Runtime) -> Option<Self::Wire> {
                $crate::ToHost::to_host(&self.object, rt)
            }

            fn into_host(self, rt: &$crate::Runtime) -> Option<Self::Wire> {
                $crate::ToHost::into_host(self.object, rt)
            }
        }
    };
}

/// Generate guest-to-host instance methods.
///
/// Each line names the Rust method, its arguments, its return type and the
/// host method it calls, optionally with the host's signature hash.
///
/// ```ignore
/// host_methods! {
///     impl Tree {
///         pub fn get_column_width(&self, column: i32) -> i32 = "get_column_width";
///         pub fn clear(&self) = "clear", hash = 3218959716;
///     }
/// }
/// ```
#[macro_export]
macro_rules! host_methods {
    (@hash) => { 0 };
    (@hash $hash:literal) => { $hash };
    (
        impl $class:ty {
            $(
                $(#[$meta:meta])*
                $vis:vis fn $name:ident(&self $(, $arg:ident : $arg_ty:ty)* $(,)?) $(-> $ret:ty)?
                    = $method:literal $(, hash = $hash:literal)?;
            )*
        }
    ) => {
        impl $class {
            $(
                $(#[$meta])*
                $vis fn $name(&self $(, $arg: $arg_ty)*) $(-> $ret)? {
                    $crate::method::ptrcall(
                        <Self as $crate::HostClass>::as_object(self),
                        <Self as $crate::HostClass>::CLASS_NAME,
                        $method,
                        $crate::host_methods!(@hash $($hash)?),
                        |_frame| {
                            $( _frame.push(&$arg); )*
                        },
                    )
                }
            )*
        }
    };
}

/// Generate the overrideable interface of a host class.
///
/// Produces a trait whose methods all default to doing nothing and returning
/// the zero value, plus `Class::VIRTUAL_NAMES` and
/// `Class::virtual_slots::<T>()`, which binds one trampoline per method to the
/// guest class `T`.
#[macro_export]
macro_rules! virtual_interface {
    (
        $(#[$meta:meta])*
        $vis:vis trait $trait_name:ident for $class:ty {
            $(
                $(#[$fn_meta:meta])*
                fn $name:ident(&mut self $(, $arg:ident : $arg_ty:ty)* $(,)?) $(-> $ret:ty)?
                    = $virtual:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        #[allow(clippy::too_many_arguments)]
        $vis trait $trait_name: $crate::GuestClass<Base = $class> {
            $(
                $(#[$fn_meta])*
                fn $name(&mut self $(, $arg: $arg_ty)*) $(-> $ret)? {
                    let _ = ($($arg,)*);
                    ::core::default::Default::default()
                }
            )*
        }

        impl $class {
            /// Host names of every overrideable method, in declaration order.
            pub const VIRTUAL_NAMES: &'static [&'static str] = &[$($virtual),*];

            /// Every overrideable method bound to the guest class `T`.
            #[allow(clippy::too_many_arguments)]
            pub fn virtual_slots<T: $trait_name>() -> ::std::vec::Vec<$crate::VirtualSlot> {
                ::std::vec![
                    $({
                        unsafe extern "C" fn trampoline<T: $trait_name>(
                            instance: $crate::sys::InstancePtr,
                            args: $crate::sys::ArgsAddr,
                            ret: $crate::sys::RetAddr,
                        ) {
                            $crate::dispatch::call_virtual::<T, ($($arg_ty,)*), _, _>(
                                instance,
                                args,
                                ret,
                                $virtual,
                                |this: &mut T, ($($arg,)*): ($($arg_ty,)*)| {
                                    <T as $trait_name>::$name(this $(, $arg)*)
                                },
                            );
                        }
                        $crate::VirtualSlot {
                            name: $virtual,
                            trampoline: trampoline::<T>,
                        }
                    }),*
                ]
            }
        }
    };
}

/// Declare a host enum: a 4-byte integer newtype with one constant per case.
///
/// Unknown values survive a round trip untouched. The `flags` form adds
/// bitwise operations.
#[macro_export]
macro_rules! host_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            ord: i32,
        }

        impl $name {
            $(
                $(#[$vmeta])*
                pub const $variant: $name = $name { ord: $value };
            )*

            /// Host ordinal
            pub const fn ord(self) -> i32 {
                self.ord
            }

            pub const fn from_ord(ord: i32) -> Self {
                Self { ord }
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                $(
                    if self.ord == $value {
                        return f.write_str(concat!(stringify!($name), "::", stringify!($variant)));
                    }
                )*
                write!(f, "{}({})", stringify!($name), self.ord)
            }
        }

        impl $crate::FromHost for $name {
            type Wire = i32;

            fn from_borrowed(wire: i32, _scope: &mut $crate::Scope<'_>) -> Self {
                Self { ord: wire }
            }

            fn from_owned(wire: i32, _rt: &$crate::Runtime) -> Self {
                Self { ord: wire }
            }
        }

        impl $crate::ToHost for $name {
            type Wire = i32;

            fn to_arg(&self, _frame: &mut $crate::CallFrame<'_>) -> i32 {
                self.ord
            }

            fn to_host(&self, _rt: &$crate::Runtime) -> Option<i32> {
                Some(self.ord)
            }
        }
    };
    (
        $(#[$meta:meta])*
        $vis:vis flags $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),* $(,)?
        }
    ) => {
        $crate::host_enum! {
            $(#[$meta])*
            $vis enum $name {
                $( $(#[$vmeta])* $variant = $value ),*
            }
        }

        impl $name {
            /// Whether every bit of `other` is set
            pub const fn contains(self, other: $name) -> bool {
                self.ord & other.ord == other.ord
            }
        }

        impl ::std::ops::BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                $name { ord: self.ord | rhs.ord }
            }
        }

        impl ::std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.ord |= rhs.ord;
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::host_enum! {
        /// Test enum
        enum Shape {
            SPHERE = 2,
            BOX = 3,
        }
    }

    crate::host_enum! {
        flags Drop {
            DISABLED = 0,
            ON_ITEM = 1,
            INBETWEEN = 2,
        }
    }

    #[test]
    fn test_enum_ordinals() {
        assert_eq!(Shape::BOX.ord(), 3);
        assert_eq!(Shape::from_ord(2), Shape::SPHERE);
        assert_eq!(format!("{:?}", Shape::SPHERE), "Shape::SPHERE");
        assert_eq!(format!("{:?}", Shape::from_ord(9)), "Shape(9)");
        assert_eq!(std::mem::size_of::<Shape>(), 4);
    }

    #[test]
    fn test_flags() {
        let both = Drop::ON_ITEM | Drop::INBETWEEN;
        assert!(both.contains(Drop::ON_ITEM));
        assert!(!Drop::ON_ITEM.contains(Drop::INBETWEEN));
        assert_eq!(both.ord(), 3);
    }
}
