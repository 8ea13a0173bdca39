//! Host classes, guest classes and the class registry.
//!
//! A *host class* is an engine class seen from the guest: a façade type
//! wrapping an [`ObjectRef`]. A *guest class* extends a host class; the host
//! creates its instances through callbacks registered here and asks for its
//! virtual overrides by name.

use std::cell::{Cell, RefCell, UnsafeCell};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Weak;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tether_sys::{
    ClassRecord, InstanceId, InstancePtr, ObjectPtr, StringNameWire, TextKind, Trampoline,
};

use crate::builtin::ObjectRef;
use crate::dispatch::{VirtualSlot, VirtualTable};
use crate::error::{BindError, BindResult};
use crate::registry::Ownership;
use crate::runtime::{Runtime, RuntimeInner};

/// An engine class exposed to the guest.
pub trait HostClass: Sized + 'static {
    /// Name the host knows the class by
    const CLASS_NAME: &'static str;
    /// Name of the class it inherits from
    const PARENT_CLASS: &'static str;

    fn from_object(object: ObjectRef) -> Self;
    fn as_object(&self) -> &ObjectRef;
    fn into_object(self) -> ObjectRef;

    fn instance_id(&self) -> InstanceId {
        self.as_object().instance_id()
    }

    fn is_instance_valid(&self) -> bool {
        self.as_object().is_instance_valid()
    }

    /// Destroy the engine object.
    fn free(self) {
        self.into_object().free()
    }
}

/// A guest class extending a host class.
pub trait GuestClass: Sized + 'static {
    /// Host class being extended
    type Base: HostClass;

    /// Name to register the class under
    const CLASS_NAME: &'static str;

    /// Host names of the virtual methods this class overrides. Everything
    /// else keeps the host's default.
    const OVERRIDES: &'static [&'static str] = &[];

    /// Build the guest state for a freshly constructed engine object.
    fn init(base: Self::Base) -> Self;

    /// The engine object this instance is attached to.
    fn base(&self) -> &Self::Base;

    /// The engine object, with this instance released for as long as the
    /// guard lives. Host calls made through it may call back into any of
    /// this instance's overrides.
    ///
    /// Calls made through [`base`](Self::base) while an override is running
    /// keep the instance borrowed, and a callback into it is refused.
    fn base_mut(&mut self) -> BaseMut<'_, Self> {
        BaseMut::new(self)
    }

    /// Every virtual slot of the base class, bound to this class. Usually
    /// `Base::virtual_slots::<Self>()`.
    fn virtual_slots() -> Vec<VirtualSlot>;
}

/// Borrow state of one instance.
///
/// Exclusive access is available while every mutable borrow has been
/// yielded through a [`BaseMut`] and no shared borrow is live.
#[derive(Default, Debug)]
pub(crate) struct BorrowFlags {
    mutable: Cell<u32>,
    yielded: Cell<u32>,
    shared: Cell<u32>,
}

impl BorrowFlags {
    fn writable(&self) -> bool {
        self.mutable.get() == self.yielded.get() && self.shared.get() == 0
    }

    fn readable(&self) -> bool {
        self.mutable.get() == self.yielded.get()
    }
}

fn bump(cell: &Cell<u32>, delta: i32) {
    cell.set(cell.get().wrapping_add_signed(delta));
}

thread_local! {
    /// Instances mutably borrowed on this thread, innermost last.
    static ACTIVE: RefCell<Vec<(*const (), *const BorrowFlags)>> = const { RefCell::new(Vec::new()) };
}

/// Guest state attached to an engine object. A pointer to this is what the
/// host passes back as the instance of every virtual call.
pub struct InstanceStorage<T> {
    rt: Runtime,
    flags: BorrowFlags,
    user: UnsafeCell<T>,
}

impl<T: GuestClass> InstanceStorage<T> {
    /// Recover the storage from the host's instance pointer.
    ///
    /// # Safety
    ///
    /// `instance` must come from `create_instance` for `T` and the object
    /// must still be alive.
    pub unsafe fn from_instance<'a>(instance: InstancePtr) -> &'a Self {
        &*(instance as *const Self)
    }

    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    /// Exclusive access to the guest state, or `None` if a borrow of it is
    /// live and has not been yielded.
    pub fn borrow_mut(&self) -> Option<InstanceMut<'_, T>> {
        if !self.flags.writable() {
            return None;
        }
        bump(&self.flags.mutable, 1);
        ACTIVE.with(|active| {
            active
                .borrow_mut()
                .push((self.user.get() as *const (), &self.flags as *const BorrowFlags))
        });
        Some(InstanceMut { storage: self })
    }

    /// Read the guest state. Panics if an override is running on it outside
    /// a [`BaseMut`] guard.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        assert!(
            self.flags.readable(),
            "{} is mutably borrowed",
            T::CLASS_NAME
        );
        let _shared = SharedGuard::new(&self.flags);
        // SAFETY: no unyielded mutable borrow is live, and `borrow_mut`
        // refuses while this shared one is.
        f(unsafe { &*self.user.get() })
    }
}

struct SharedGuard<'a>(&'a BorrowFlags);

impl<'a> SharedGuard<'a> {
    fn new(flags: &'a BorrowFlags) -> Self {
        bump(&flags.shared, 1);
        Self(flags)
    }
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        bump(&self.0.shared, -1);
    }
}

/// Exclusive access to an instance's guest state.
pub struct InstanceMut<'a, T> {
    storage: &'a InstanceStorage<T>,
}

impl<T> Deref for InstanceMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: `borrow_mut` granted exclusive access for this guard.
        unsafe { &*self.storage.user.get() }
    }
}

impl<T> DerefMut for InstanceMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above.
        unsafe { &mut *self.storage.user.get() }
    }
}

impl<T> Drop for InstanceMut<'_, T> {
    fn drop(&mut self) {
        bump(&self.storage.flags.mutable, -1);
        let user = self.storage.user.get() as *const ();
        ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(index) = active.iter().rposition(|(ptr, _)| *ptr == user) {
                active.remove(index);
            }
        });
    }
}

/// A view of a guest instance's engine object that releases the instance
/// while it lives. Obtained from [`GuestClass::base_mut`].
pub struct BaseMut<'a, T: GuestClass> {
    base: T::Base,
    flags: Option<*const BorrowFlags>,
    _instance: PhantomData<&'a mut T>,
}

impl<'a, T: GuestClass> BaseMut<'a, T> {
    fn new(instance: &'a mut T) -> Self {
        let user = instance as *const T as *const ();
        let flags = ACTIVE.with(|active| {
            active
                .borrow()
                .iter()
                .rev()
                .find(|(ptr, _)| *ptr == user)
                .map(|(_, flags)| *flags)
        });
        if let Some(flags) = flags {
            // SAFETY: the entry is live while the storage's `InstanceMut`
            // is, and that guard outlives `instance`.
            bump(unsafe { &(*flags).yielded }, 1);
        }

        Self {
            base: T::Base::from_object(instance.base().as_object().clone()),
            flags,
            _instance: PhantomData,
        }
    }
}

impl<T: GuestClass> Deref for BaseMut<'_, T> {
    type Target = T::Base;

    fn deref(&self) -> &T::Base {
        &self.base
    }
}

impl<T: GuestClass> Drop for BaseMut<'_, T> {
    fn drop(&mut self) {
        if let Some(flags) = self.flags {
            // SAFETY: see `BaseMut::new`.
            bump(unsafe { &(*flags).yielded }, -1);
        }
    }
}

// ============================================================================
// Class registry
// ============================================================================

/// Registration data the host callbacks read through their userdata pointer.
pub(crate) struct ClassEntry {
    name: &'static str,
    runtime: Weak<RuntimeInner>,
    overrides: &'static [&'static str],
    slots: fn() -> Vec<VirtualSlot>,
    table: OnceCell<VirtualTable>,
}

impl ClassEntry {
    /// The override table, built on first use.
    fn table(&self) -> &VirtualTable {
        self.table.get_or_init(|| {
            let slots = (self.slots)();
            for name in self.overrides {
                if !slots.iter().any(|slot| slot.name == *name) {
                    log::warn!("{} overrides unknown virtual {}", self.name, name);
                }
            }
            let table = VirtualTable::new(
                slots
                    .into_iter()
                    .filter(|slot| self.overrides.contains(&slot.name)),
            );
            log::debug!("{}: {} virtual override(s) installed", self.name, table.len());
            table
        })
    }
}

/// Guest classes registered with one runtime, by name.
pub(crate) struct ClassRegistry {
    entries: RwLock<FxHashMap<&'static str, Box<ClassEntry>>>,
    order: RwLock<Vec<&'static str>>,
}

impl ClassRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Record `T` and build the record to hand the host.
    pub(crate) fn register<T: GuestClass>(&self, rt: &Runtime) -> BindResult<ClassRecord> {
        let mut entries = self.entries.write();
        if entries.contains_key(T::CLASS_NAME) {
            return Err(BindError::ClassAlreadyRegistered {
                class: T::CLASS_NAME.to_string(),
            });
        }

        let entry = Box::new(ClassEntry {
            name: T::CLASS_NAME,
            runtime: rt.downgrade(),
            overrides: T::OVERRIDES,
            slots: T::virtual_slots,
            table: OnceCell::new(),
        });
        // The box's heap address is stable for as long as it stays in the map.
        let userdata = &*entry as *const ClassEntry as *mut c_void;
        entries.insert(T::CLASS_NAME, entry);
        self.order.write().push(T::CLASS_NAME);

        Ok(ClassRecord {
            class_name: T::CLASS_NAME,
            parent_name: <T::Base as HostClass>::CLASS_NAME,
            userdata,
            create_instance: create_instance::<T>,
            free_instance: free_instance::<T>,
            get_virtual,
        })
    }

    pub(crate) fn contains(&self, class: &str) -> bool {
        self.entries.read().contains_key(class)
    }

    /// Hand every class to `unregister`, newest first, then forget them.
    /// Entries stay alive until the host has let go of their userdata.
    pub(crate) fn unregister_all(&self, mut unregister: impl FnMut(&'static str)) {
        let names: Vec<_> = self.order.read().iter().rev().copied().collect();
        for name in names {
            unregister(name);
        }
        self.order.write().clear();
        self.entries.write().clear();
    }
}

// ============================================================================
// Host callbacks
// ============================================================================

unsafe fn entry<'a>(userdata: *mut c_void) -> &'a ClassEntry {
    &*(userdata as *const ClassEntry)
}

/// Build a `T` around a new engine object of its base class.
unsafe extern "C" fn create_instance<T: GuestClass>(userdata: *mut c_void) -> ObjectPtr {
    let entry = entry(userdata);
    let Some(rt) = Runtime::upgrade(&entry.runtime) else {
        log::error!("{}: runtime is gone, cannot create an instance", entry.name);
        return std::ptr::null_mut();
    };

    let host = rt.host();
    let object = host.construct_object(<T::Base as HostClass>::CLASS_NAME);
    if object.is_null() {
        log::error!(
            "{}: host could not construct base {}",
            entry.name,
            <T::Base as HostClass>::CLASS_NAME
        );
        return std::ptr::null_mut();
    }

    // The instance does not own the object it is attached to.
    let Some(base) = ObjectRef::from_ptr(&rt, object, Ownership::Borrowed) else {
        return std::ptr::null_mut();
    };

    let user = match catch_unwind(AssertUnwindSafe(|| T::init(T::Base::from_object(base)))) {
        Ok(user) => user,
        Err(_) => {
            log::error!("{}::init panicked", T::CLASS_NAME);
            host.object_destroy(object);
            return std::ptr::null_mut();
        }
    };

    log::trace!("{}: created instance on {:p}", T::CLASS_NAME, object);
    let storage = Box::new(InstanceStorage {
        rt: rt.clone(),
        flags: BorrowFlags::default(),
        user: UnsafeCell::new(user),
    });
    host.object_set_instance(object, T::CLASS_NAME, Box::into_raw(storage) as InstancePtr);
    object
}

/// Drop the guest state of a dying engine object.
unsafe extern "C" fn free_instance<T: GuestClass>(_userdata: *mut c_void, instance: InstancePtr) {
    if instance.is_null() {
        return;
    }
    let storage = Box::from_raw(instance as *mut InstanceStorage<T>);
    if catch_unwind(AssertUnwindSafe(move || drop(storage))).is_err() {
        log::error!("{} panicked while being dropped", T::CLASS_NAME);
    }
}

/// Look up an override by host method name.
unsafe extern "C" fn get_virtual(userdata: *mut c_void, name: StringNameWire) -> Option<Trampoline> {
    let entry = entry(userdata);
    let rt = Runtime::upgrade(&entry.runtime)?;
    let name = rt.host().string_text(TextKind::StringName, name.0);
    let found = entry.table().get(&name);
    log::trace!("{}: virtual {} -> {}", entry.name, name, found.is_some());
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tether_test::MockHost;

    struct Plain(ObjectRef);

    impl HostClass for Plain {
        const CLASS_NAME: &'static str = "Object";
        const PARENT_CLASS: &'static str = "";

        fn from_object(object: ObjectRef) -> Self {
            Self(object)
        }

        fn as_object(&self) -> &ObjectRef {
            &self.0
        }

        fn into_object(self) -> ObjectRef {
            self.0
        }
    }

    macro_rules! guest {
        ($name:ident) => {
            struct $name {
                base: Plain,
            }

            impl GuestClass for $name {
                type Base = Plain;
                const CLASS_NAME: &'static str = stringify!($name);

                fn init(base: Plain) -> Self {
                    Self { base }
                }

                fn base(&self) -> &Plain {
                    &self.base
                }

                fn virtual_slots() -> Vec<VirtualSlot> {
                    Vec::new()
                }
            }
        };
    }

    guest!(First);
    guest!(Second);

    #[test]
    fn test_unregister_all_keeps_entries_until_the_host_lets_go() {
        let rt = Runtime::new(Arc::new(MockHost::new()));
        let registry = ClassRegistry::new();
        let records = [
            registry.register::<First>(&rt).unwrap(),
            registry.register::<Second>(&rt).unwrap(),
        ];

        let mut unregistered = Vec::new();
        registry.unregister_all(|name| {
            assert!(registry.contains(name));
            let record = records.iter().find(|r| r.class_name == name).unwrap();
            assert_eq!(unsafe { entry(record.userdata) }.name, name);
            unregistered.push(name);
        });

        assert_eq!(unregistered, vec!["Second", "First"]);
        assert!(!registry.contains("First"));
        assert!(!registry.contains("Second"));
        assert!(registry.register::<First>(&rt).is_ok());
    }
}
