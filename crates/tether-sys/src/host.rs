//! The host interface.
//!
//! Everything the marshalling layer needs from the engine goes through
//! [`HostInterface`]. A real engine implements it over its C function
//! table; tests implement it over in-memory tables.

use std::ffi::c_void;

use crate::slot::{ArgsAddr, RetAddr};
use crate::wire::*;

/// Opaque engine object pointer.
pub type ObjectPtr = *mut c_void;

/// Opaque pointer to guest instance storage, handed back on every virtual call.
pub type InstancePtr = *mut c_void;

/// Opaque pointer to a resolved host method.
pub type MethodBindPtr = *const c_void;

/// Host-callable entry point for one virtual method.
///
/// Receives the guest instance, the packed argument tuple and the return
/// slot (which may be null).
pub type Trampoline = unsafe extern "C" fn(InstancePtr, ArgsAddr, RetAddr);

/// Creates a host object with guest storage attached. Receives the class
/// record's userdata.
pub type CreateInstanceFn = unsafe extern "C" fn(*mut c_void) -> ObjectPtr;

/// Frees guest storage when the host object dies.
pub type FreeInstanceFn = unsafe extern "C" fn(*mut c_void, InstancePtr);

/// Looks up a virtual trampoline by method name.
pub type GetVirtualFn = unsafe extern "C" fn(*mut c_void, StringNameWire) -> Option<Trampoline>;

/// Registration record for a guest class.
#[derive(Clone, Copy, Debug)]
pub struct ClassRecord {
    /// Name the host will know the class by.
    pub class_name: &'static str,
    /// Host class being extended.
    pub parent_name: &'static str,
    /// Passed back to every callback below.
    pub userdata: *mut c_void,
    pub create_instance: CreateInstanceFn,
    pub free_instance: FreeInstanceFn,
    pub get_virtual: GetVirtualFn,
}

// SAFETY: userdata points at a registry entry that outlives the registration
// and is only read.
unsafe impl Send for ClassRecord {}
unsafe impl Sync for ClassRecord {}

/// Engine services used by the marshalling layer.
///
/// Reference wires follow one rule: a wire returned by the host is owned by
/// the caller, a wire passed to the host is borrowed by it. Methods that
/// keep a value (`array_push`, `dictionary_set`, `variant_from`) copy it.
pub trait HostInterface: Send + Sync {
    // ------------------------------------------------------------------
    // Generic reference management
    // ------------------------------------------------------------------

    /// Make a new owned reference to the same host value.
    fn wire_copy(&self, kind: WireKind, wire: RawWire) -> RawWire;

    /// Drop one owned reference. A no-op for objects that are not
    /// reference-counted.
    fn wire_destroy(&self, kind: WireKind, wire: RawWire);

    // ------------------------------------------------------------------
    // Variants
    // ------------------------------------------------------------------

    /// Tag of a variant.
    fn variant_type(&self, variant: VariantWire) -> VariantType;

    /// Build a variant from a value of type `ty`. Reference payloads are
    /// copied, not consumed.
    ///
    /// # Safety
    ///
    /// `src` must point at a slot holding a `ty` (ignored for `Nil`).
    unsafe fn variant_from(&self, ty: VariantType, src: *const u64) -> VariantWire;

    /// Extract a value of type `ty`. Reference payloads written to `out` are
    /// new owned references. Writes the zero value when the tag differs.
    ///
    /// # Safety
    ///
    /// `out` must point at a slot wide enough for a `ty`.
    unsafe fn variant_to(&self, ty: VariantType, variant: VariantWire, out: *mut u64);

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Create an owned string of the given text type.
    fn string_new(&self, kind: TextKind, text: &str) -> u64;

    /// Contents of a string wire as UTF-8.
    fn string_text(&self, kind: TextKind, wire: u64) -> String;

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    fn array_new(&self) -> ArrayWire;
    fn array_len(&self, array: ArrayWire) -> i64;
    /// Owned copy of the element at `index`; a nil variant when out of range.
    fn array_get(&self, array: ArrayWire, index: i64) -> VariantWire;
    fn array_push(&self, array: ArrayWire, value: VariantWire);

    fn dictionary_new(&self) -> DictionaryWire;
    fn dictionary_len(&self, dict: DictionaryWire) -> i64;
    /// Owned copy of the value under `key`.
    fn dictionary_get(&self, dict: DictionaryWire, key: VariantWire) -> Option<VariantWire>;
    fn dictionary_set(&self, dict: DictionaryWire, key: VariantWire, value: VariantWire);
    /// Owned array of the dictionary's keys, in insertion order.
    fn dictionary_keys(&self, dict: DictionaryWire) -> ArrayWire;

    /// Create a packed array by copying `len` elements.
    ///
    /// # Safety
    ///
    /// `data` must point at `len * kind.element_size()` readable bytes.
    unsafe fn packed_new(&self, kind: PackedKind, data: *const u8, len: usize) -> PackedArrayWire;
    fn packed_len(&self, kind: PackedKind, packed: PackedArrayWire) -> usize;
    /// Start of the element storage. Valid until the array is next modified
    /// or destroyed.
    fn packed_data(&self, kind: PackedKind, packed: PackedArrayWire) -> *const u8;

    // ------------------------------------------------------------------
    // Callables
    // ------------------------------------------------------------------

    fn callable_new(&self, object: InstanceId, method: &str) -> CallableWire;
    fn callable_object(&self, callable: CallableWire) -> InstanceId;
    fn callable_method(&self, callable: CallableWire) -> String;

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Construct an engine object of a host or registered guest class.
    /// Null if the class is unknown.
    fn construct_object(&self, class: &str) -> ObjectPtr;

    /// Destroy an engine object, running guest `free_instance` if attached.
    fn object_destroy(&self, object: ObjectPtr);

    fn object_instance_id(&self, object: ObjectPtr) -> InstanceId;

    /// The live object with this id, or null once it has been freed.
    fn object_from_instance_id(&self, id: InstanceId) -> ObjectPtr;

    /// Attach guest storage to a freshly constructed object.
    fn object_set_instance(&self, object: ObjectPtr, class: &str, instance: InstancePtr);

    // ------------------------------------------------------------------
    // Methods and classes
    // ------------------------------------------------------------------

    /// Resolve a host method. `hash` of zero skips the signature check.
    /// Null when no such method exists.
    fn method_bind(&self, class: &str, method: &str, hash: i64) -> MethodBindPtr;

    /// Call a resolved method with a packed argument tuple.
    ///
    /// # Safety
    ///
    /// `args` and `ret` must match the method's signature.
    unsafe fn method_bind_ptrcall(
        &self,
        method: MethodBindPtr,
        object: ObjectPtr,
        args: ArgsAddr,
        ret: RetAddr,
    );

    fn register_class(&self, record: &ClassRecord);
    fn unregister_class(&self, class: &str);
}
