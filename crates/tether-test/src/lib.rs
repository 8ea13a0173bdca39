//! Tether Test - in-process mock host
//!
//! [`MockHost`] implements [`HostInterface`] over plain hash maps. Every
//! reference value it hands out is refcounted, so a test can assert that the
//! guest released exactly what it owned: [`MockHost::live_refs`] is zero
//! once every guest value is gone, and [`MockHost::faults`] records any
//! destroy of a reference that no longer exists.
//!
//! Object pointers are fake addresses; they are never dereferenced.

use std::ffi::c_void;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tether_sys::{
    ArgsAddr, ArrayWire, CallableWire, ClassRecord, DictionaryWire, HostInterface, InstanceId,
    InstancePtr, MethodBindPtr, ObjectPtr, PackedArrayWire, PackedKind, RawWire, RetAddr, Slot,
    TextKind, Trampoline, VariantType, VariantWire, WireKind, WORD,
};

/// Host-side implementation of a method, called with the object, the packed
/// argument tuple and the return slot.
pub type MethodFn = Arc<dyn Fn(&MockHost, ObjectPtr, ArgsAddr, RetAddr) + Send + Sync>;

/// Host classes known before any guest registration.
const BUILTIN_CLASSES: &[(&str, Option<&str>, bool)] = &[
    ("Object", None, false),
    ("RefCounted", Some("Object"), true),
    ("Node", Some("Object"), false),
    ("Control", Some("Node"), false),
    ("Tree", Some("Control"), false),
    ("TreeItem", Some("Object"), false),
    ("PhysicsServer3D", Some("Object"), false),
    ("PhysicsServer3DExtension", Some("PhysicsServer3D"), false),
    ("PhysicsDirectSpaceState3D", Some("Object"), false),
    ("PhysicsDirectBodyState3D", Some("Object"), false),
];

const FIRST_OBJECT_ADDR: usize = 0x1000;
const OBJECT_ADDR_STEP: usize = 0x10;

// ============================================================================
// Stored values
// ============================================================================

#[derive(Debug)]
enum HostValue {
    Text(String),
    Array(Vec<VariantWire>),
    Dictionary(Vec<(VariantWire, VariantWire)>),
    Packed(PackedKind, Vec<u8>),
    Callable(InstanceId, String),
    /// Variant payload too wide to sit inline
    Blob(Vec<u8>),
}

#[derive(Debug)]
struct RefEntry {
    count: u32,
    value: HostValue,
}

struct ObjectEntry {
    class: String,
    id: InstanceId,
    refcount: Option<u32>,
    instance: Option<AttachedInstance>,
}

#[derive(Clone, Copy)]
struct AttachedInstance {
    storage: usize,
    userdata: usize,
    free: Option<tether_sys::FreeInstanceFn>,
}

struct ClassInfo {
    parent: Option<String>,
    refcounted: bool,
    record: Option<ClassRecord>,
}

struct MethodEntry {
    class: String,
    method: String,
    hash: Option<i64>,
    body: MethodFn,
}

/// Payload layout of a variant tag in this mock.
enum Payload {
    None,
    Inline(usize),
    Blob(usize),
    Ref,
    Callable,
    Object,
}

fn payload(ty: VariantType) -> Payload {
    use VariantType as T;
    match ty {
        T::Nil => Payload::None,
        T::Bool => Payload::Inline(1),
        T::Int | T::Float | T::Rid | T::Vector2 | T::Vector2i => Payload::Inline(8),
        T::Vector3 | T::Vector3i => Payload::Inline(12),
        T::Rect2 | T::Rect2i | T::Vector4 | T::Vector4i | T::Plane | T::Quaternion | T::Color => {
            Payload::Inline(16)
        }
        T::Transform2D | T::Aabb => Payload::Blob(24),
        T::Basis => Payload::Blob(36),
        T::Transform3D => Payload::Blob(48),
        T::Projection => Payload::Blob(64),
        T::Callable | T::Signal => Payload::Callable,
        T::Object => Payload::Object,
        _ => Payload::Ref,
    }
}

fn payload_bytes(ty: VariantType) -> usize {
    match payload(ty) {
        Payload::None => 0,
        Payload::Inline(n) | Payload::Blob(n) => n,
        Payload::Ref | Payload::Object => WORD,
        Payload::Callable => 2 * WORD,
    }
}

fn tag_of(wire: VariantWire) -> VariantType {
    i32::try_from(wire.0[0])
        .ok()
        .and_then(VariantType::from_ord)
        .unwrap_or_default()
}

// ============================================================================
// State
// ============================================================================

struct State {
    next_ref: u64,
    refs: FxHashMap<u64, RefEntry>,
    next_addr: usize,
    next_id: u64,
    objects: FxHashMap<usize, ObjectEntry>,
    ids: FxHashMap<u64, usize>,
    classes: FxHashMap<String, ClassInfo>,
    methods: Vec<MethodEntry>,
    calls: Vec<String>,
    faults: Vec<String>,
}

impl State {
    fn new() -> Self {
        let mut classes = FxHashMap::default();
        for (name, parent, refcounted) in BUILTIN_CLASSES {
            classes.insert(
                name.to_string(),
                ClassInfo {
                    parent: parent.map(str::to_string),
                    refcounted: *refcounted,
                    record: None,
                },
            );
        }
        Self {
            next_ref: 1,
            refs: FxHashMap::default(),
            next_addr: FIRST_OBJECT_ADDR,
            next_id: 1,
            objects: FxHashMap::default(),
            ids: FxHashMap::default(),
            classes,
            methods: Vec::new(),
            calls: Vec::new(),
            faults: Vec::new(),
        }
    }

    fn alloc(&mut self, value: HostValue) -> u64 {
        let id = self.next_ref;
        self.next_ref += 1;
        self.refs.insert(id, RefEntry { count: 1, value });
        id
    }

    fn value(&self, id: u64) -> Option<&HostValue> {
        self.refs.get(&id).map(|entry| &entry.value)
    }

    fn value_mut(&mut self, id: u64) -> Option<&mut HostValue> {
        self.refs.get_mut(&id).map(|entry| &mut entry.value)
    }

    fn incref(&mut self, id: u64) {
        if id == 0 {
            return;
        }
        match self.refs.get_mut(&id) {
            Some(entry) => entry.count += 1,
            None => self.faults.push(format!("copy of dead reference {}", id)),
        }
    }

    fn decref(&mut self, id: u64, doomed: &mut Vec<usize>) {
        if id == 0 {
            return;
        }
        let Some(entry) = self.refs.get_mut(&id) else {
            self.faults.push(format!("destroy of dead reference {}", id));
            return;
        };
        entry.count -= 1;
        if entry.count > 0 {
            return;
        }
        let Some(entry) = self.refs.remove(&id) else {
            return;
        };
        match entry.value {
            HostValue::Array(items) => {
                for item in items {
                    self.release_variant(item, doomed);
                }
            }
            HostValue::Dictionary(pairs) => {
                for (key, value) in pairs {
                    self.release_variant(key, doomed);
                    self.release_variant(value, doomed);
                }
            }
            _ => {}
        }
    }

    fn is_refcounted(&self, class: &str) -> bool {
        let mut current = Some(class);
        while let Some(name) = current {
            let Some(info) = self.classes.get(name) else {
                return false;
            };
            if info.refcounted {
                return true;
            }
            current = info.parent.as_deref();
        }
        false
    }

    fn incref_object(&mut self, addr: usize) {
        if let Some(count) = self
            .objects
            .get_mut(&addr)
            .and_then(|entry| entry.refcount.as_mut())
        {
            *count += 1;
        }
    }

    fn decref_object(&mut self, addr: usize, doomed: &mut Vec<usize>) {
        if let Some(count) = self
            .objects
            .get_mut(&addr)
            .and_then(|entry| entry.refcount.as_mut())
        {
            *count = count.saturating_sub(1);
            if *count == 0 {
                doomed.push(addr);
            }
        }
    }

    fn retain_variant(&mut self, wire: VariantWire) {
        match payload(tag_of(wire)) {
            Payload::Blob(_) | Payload::Ref | Payload::Callable => self.incref(wire.0[1]),
            Payload::Object => self.incref_object(wire.0[1] as usize),
            Payload::None | Payload::Inline(_) => {}
        }
    }

    fn release_variant(&mut self, wire: VariantWire, doomed: &mut Vec<usize>) {
        match payload(tag_of(wire)) {
            Payload::Blob(_) | Payload::Ref | Payload::Callable => self.decref(wire.0[1], doomed),
            Payload::Object => self.decref_object(wire.0[1] as usize, doomed),
            Payload::None | Payload::Inline(_) => {}
        }
    }

    fn text(&self, wire: VariantWire) -> Option<&str> {
        match self.value(wire.0[1]) {
            Some(HostValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    fn same_key(&self, a: VariantWire, b: VariantWire) -> bool {
        let ty = tag_of(a);
        if ty != tag_of(b) {
            return false;
        }
        match (ty, payload(ty)) {
            (VariantType::String | VariantType::StringName | VariantType::NodePath, _) => {
                self.text(a) == self.text(b)
            }
            (_, Payload::Blob(_)) => match (self.value(a.0[1]), self.value(b.0[1])) {
                (Some(HostValue::Blob(x)), Some(HostValue::Blob(y))) => x == y,
                _ => false,
            },
            _ => a == b,
        }
    }

    fn object_addr(&self, object: ObjectPtr) -> Option<usize> {
        let addr = object as usize;
        self.objects.contains_key(&addr).then_some(addr)
    }
}

// ============================================================================
// Mock host
// ============================================================================

/// An in-memory host.
pub struct MockHost {
    state: Mutex<State>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::new()),
        }
    }

    /// Make `class` constructible.
    pub fn declare_class(&self, class: &str, parent: &str, refcounted: bool) {
        self.state.lock().classes.insert(
            class.to_string(),
            ClassInfo {
                parent: Some(parent.to_string()),
                refcounted,
                record: None,
            },
        );
    }

    /// Install the host side of `class::method`.
    pub fn bind_method<F>(&self, class: &str, method: &str, body: F)
    where
        F: Fn(&MockHost, ObjectPtr, ArgsAddr, RetAddr) + Send + Sync + 'static,
    {
        self.bind(class, method, None, Arc::new(body));
    }

    /// Like [`bind_method`](Self::bind_method), but resolving only with
    /// `hash` (or with the zero hash).
    pub fn bind_method_with_hash<F>(&self, class: &str, method: &str, hash: i64, body: F)
    where
        F: Fn(&MockHost, ObjectPtr, ArgsAddr, RetAddr) + Send + Sync + 'static,
    {
        self.bind(class, method, Some(hash), Arc::new(body));
    }

    fn bind(&self, class: &str, method: &str, hash: Option<i64>, body: MethodFn) {
        let mut state = self.state.lock();
        state
            .methods
            .retain(|entry| !(entry.class == class && entry.method == method));
        state.methods.push(MethodEntry {
            class: class.to_string(),
            method: method.to_string(),
            hash,
            body,
        });
    }

    /// Refcount of a reference, `None` once destroyed.
    pub fn refcount(&self, id: u64) -> Option<u32> {
        self.state.lock().refs.get(&id).map(|entry| entry.count)
    }

    /// Number of reference values still alive.
    pub fn live_refs(&self) -> usize {
        self.state.lock().refs.len()
    }

    /// Number of engine objects still alive.
    pub fn object_count(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Reference bookkeeping errors seen so far.
    pub fn faults(&self) -> Vec<String> {
        self.state.lock().faults.clone()
    }

    /// Every `Class.method` ptrcall made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Text content of a string wire, if it is alive.
    pub fn text(&self, id: u64) -> Option<String> {
        match self.state.lock().value(id) {
            Some(HostValue::Text(text)) => Some(text.clone()),
            _ => None,
        }
    }

    /// Class name of a live object.
    pub fn object_class(&self, object: ObjectPtr) -> Option<String> {
        let state = self.state.lock();
        state
            .objects
            .get(&(object as usize))
            .map(|entry| entry.class.clone())
    }

    /// Guest storage attached to `object`, null if none.
    pub fn instance_of(&self, object: ObjectPtr) -> InstancePtr {
        let state = self.state.lock();
        state
            .objects
            .get(&(object as usize))
            .and_then(|entry| entry.instance)
            .map_or(std::ptr::null_mut(), |instance| instance.storage as InstancePtr)
    }

    /// Ask a registered class for its override of `method`.
    pub fn virtual_for(&self, class: &str, method: &str) -> Option<Trampoline> {
        let record = self.state.lock().classes.get(class)?.record?;
        let name = self.string_new(TextKind::StringName, method);
        // SAFETY: the record came from `register_class` and is still registered.
        let found = unsafe { (record.get_virtual)(record.userdata, tether_sys::StringNameWire(name)) };
        self.wire_destroy(WireKind::StringName, RawWire([name, 0, 0]));
        found
    }

    /// Call `object`'s override of `method` the way the engine would.
    /// Returns `false` when the class keeps the host default.
    ///
    /// # Safety
    ///
    /// `args` and `ret` must match the virtual's signature.
    pub unsafe fn call_virtual(
        &self,
        object: ObjectPtr,
        method: &str,
        args: ArgsAddr,
        ret: RetAddr,
    ) -> bool {
        let Some(class) = self.object_class(object) else {
            return false;
        };
        let Some(trampoline) = self.virtual_for(&class, method) else {
            return false;
        };
        trampoline(self.instance_of(object), args, ret);
        true
    }

    fn destroy_doomed(&self, doomed: Vec<usize>) {
        for addr in doomed {
            self.object_destroy(addr as ObjectPtr);
        }
    }

    fn array_items(&self, array: ArrayWire) -> Vec<VariantWire> {
        match self.state.lock().value(array.0) {
            Some(HostValue::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }
}

impl HostInterface for MockHost {
    fn wire_copy(&self, kind: WireKind, wire: RawWire) -> RawWire {
        let mut state = self.state.lock();
        match kind {
            WireKind::Variant => state.retain_variant(VariantWire([wire.0[0], wire.0[1], wire.0[2]])),
            WireKind::Object => state.incref_object(wire.0[0] as usize),
            _ => state.incref(wire.0[0]),
        }
        wire
    }

    fn wire_destroy(&self, kind: WireKind, wire: RawWire) {
        let mut doomed = Vec::new();
        {
            let mut state = self.state.lock();
            match kind {
                WireKind::Variant => {
                    state.release_variant(VariantWire([wire.0[0], wire.0[1], wire.0[2]]), &mut doomed)
                }
                WireKind::Object => state.decref_object(wire.0[0] as usize, &mut doomed),
                _ => state.decref(wire.0[0], &mut doomed),
            }
        }
        self.destroy_doomed(doomed);
    }

    fn variant_type(&self, variant: VariantWire) -> VariantType {
        tag_of(variant)
    }

    unsafe fn variant_from(&self, ty: VariantType, src: *const u64) -> VariantWire {
        let mut wire = VariantWire([ty.ord() as u64, 0, 0]);
        let bytes = payload_bytes(ty);
        if bytes == 0 {
            return wire;
        }
        let data = std::slice::from_raw_parts(src as *const u8, bytes).to_vec();
        let mut state = self.state.lock();
        match payload(ty) {
            Payload::None => {}
            Payload::Inline(_) | Payload::Callable => {
                bytemuck::cast_slice_mut::<u64, u8>(&mut wire.0[1..])[..bytes].copy_from_slice(&data);
                if matches!(payload(ty), Payload::Callable) {
                    state.incref(wire.0[1]);
                }
            }
            Payload::Blob(_) => wire.0[1] = state.alloc(HostValue::Blob(data)),
            Payload::Ref => {
                wire.0[1] = std::ptr::read_unaligned(src);
                state.incref(wire.0[1]);
            }
            Payload::Object => {
                wire.0[1] = std::ptr::read_unaligned(src);
                state.incref_object(wire.0[1] as usize);
            }
        }
        wire
    }

    unsafe fn variant_to(&self, ty: VariantType, variant: VariantWire, out: *mut u64) {
        let bytes = payload_bytes(ty);
        let out = std::slice::from_raw_parts_mut(out as *mut u8, bytes);
        out.fill(0);
        if tag_of(variant) != ty {
            return;
        }
        let mut state = self.state.lock();
        match payload(ty) {
            Payload::None => {}
            Payload::Inline(_) | Payload::Callable => {
                out.copy_from_slice(&bytemuck::cast_slice::<u64, u8>(&variant.0[1..])[..bytes]);
                if matches!(payload(ty), Payload::Callable) {
                    state.incref(variant.0[1]);
                }
            }
            Payload::Blob(_) => {
                if let Some(HostValue::Blob(data)) = state.value(variant.0[1]) {
                    out.copy_from_slice(data);
                }
            }
            Payload::Ref => {
                out.copy_from_slice(&variant.0[1].to_ne_bytes());
                state.incref(variant.0[1]);
            }
            Payload::Object => {
                out.copy_from_slice(&variant.0[1].to_ne_bytes());
                state.incref_object(variant.0[1] as usize);
            }
        }
    }

    fn string_new(&self, _kind: TextKind, text: &str) -> u64 {
        self.state.lock().alloc(HostValue::Text(text.to_string()))
    }

    fn string_text(&self, _kind: TextKind, wire: u64) -> String {
        self.text(wire).unwrap_or_default()
    }

    fn array_new(&self) -> ArrayWire {
        ArrayWire(self.state.lock().alloc(HostValue::Array(Vec::new())))
    }

    fn array_len(&self, array: ArrayWire) -> i64 {
        self.array_items(array).len() as i64
    }

    fn array_get(&self, array: ArrayWire, index: i64) -> VariantWire {
        let mut state = self.state.lock();
        let item = match state.value(array.0) {
            Some(HostValue::Array(items)) => usize::try_from(index)
                .ok()
                .and_then(|i| items.get(i).copied()),
            _ => None,
        };
        match item {
            Some(item) => {
                state.retain_variant(item);
                item
            }
            None => VariantWire::default(),
        }
    }

    fn array_push(&self, array: ArrayWire, value: VariantWire) {
        let mut state = self.state.lock();
        state.retain_variant(value);
        match state.value_mut(array.0) {
            Some(HostValue::Array(items)) => items.push(value),
            _ => state.faults.push(format!("push into dead array {}", array.0)),
        }
    }

    fn dictionary_new(&self) -> DictionaryWire {
        DictionaryWire(self.state.lock().alloc(HostValue::Dictionary(Vec::new())))
    }

    fn dictionary_len(&self, dict: DictionaryWire) -> i64 {
        match self.state.lock().value(dict.0) {
            Some(HostValue::Dictionary(pairs)) => pairs.len() as i64,
            _ => 0,
        }
    }

    fn dictionary_get(&self, dict: DictionaryWire, key: VariantWire) -> Option<VariantWire> {
        let mut state = self.state.lock();
        let found = match state.value(dict.0) {
            Some(HostValue::Dictionary(pairs)) => pairs
                .iter()
                .find(|(k, _)| state.same_key(*k, key))
                .map(|(_, v)| *v),
            _ => None,
        }?;
        state.retain_variant(found);
        Some(found)
    }

    fn dictionary_set(&self, dict: DictionaryWire, key: VariantWire, value: VariantWire) {
        let mut doomed = Vec::new();
        {
            let mut state = self.state.lock();
            let position = match state.value(dict.0) {
                Some(HostValue::Dictionary(pairs)) => {
                    Some(pairs.iter().position(|(k, _)| state.same_key(*k, key)))
                }
                _ => None,
            };
            let Some(position) = position else {
                state.faults.push(format!("set on dead dictionary {}", dict.0));
                return;
            };
            state.retain_variant(value);
            let old = match (position, state.value_mut(dict.0)) {
                (Some(i), Some(HostValue::Dictionary(pairs))) => {
                    Some(std::mem::replace(&mut pairs[i].1, value))
                }
                (None, Some(HostValue::Dictionary(pairs))) => {
                    pairs.push((key, value));
                    None
                }
                _ => None,
            };
            match old {
                Some(old) => state.release_variant(old, &mut doomed),
                None => state.retain_variant(key),
            }
        }
        self.destroy_doomed(doomed);
    }

    fn dictionary_keys(&self, dict: DictionaryWire) -> ArrayWire {
        let mut state = self.state.lock();
        let keys: Vec<VariantWire> = match state.value(dict.0) {
            Some(HostValue::Dictionary(pairs)) => pairs.iter().map(|(k, _)| *k).collect(),
            _ => Vec::new(),
        };
        for key in &keys {
            state.retain_variant(*key);
        }
        ArrayWire(state.alloc(HostValue::Array(keys)))
    }

    unsafe fn packed_new(&self, kind: PackedKind, data: *const u8, len: usize) -> PackedArrayWire {
        let bytes = if len == 0 {
            Vec::new()
        } else {
            std::slice::from_raw_parts(data, len * kind.element_size()).to_vec()
        };
        PackedArrayWire(self.state.lock().alloc(HostValue::Packed(kind, bytes)))
    }

    fn packed_len(&self, kind: PackedKind, packed: PackedArrayWire) -> usize {
        match self.state.lock().value(packed.0) {
            Some(HostValue::Packed(stored, bytes)) if *stored == kind => {
                bytes.len() / kind.element_size()
            }
            _ => 0,
        }
    }

    fn packed_data(&self, kind: PackedKind, packed: PackedArrayWire) -> *const u8 {
        match self.state.lock().value(packed.0) {
            Some(HostValue::Packed(stored, bytes)) if *stored == kind => bytes.as_ptr(),
            _ => std::ptr::null(),
        }
    }

    fn callable_new(&self, object: InstanceId, method: &str) -> CallableWire {
        let id = self
            .state
            .lock()
            .alloc(HostValue::Callable(object, method.to_string()));
        CallableWire([id, 0])
    }

    fn callable_object(&self, callable: CallableWire) -> InstanceId {
        match self.state.lock().value(callable.0[0]) {
            Some(HostValue::Callable(object, _)) => *object,
            _ => InstanceId::default(),
        }
    }

    fn callable_method(&self, callable: CallableWire) -> String {
        match self.state.lock().value(callable.0[0]) {
            Some(HostValue::Callable(_, method)) => method.clone(),
            _ => String::new(),
        }
    }

    fn construct_object(&self, class: &str) -> ObjectPtr {
        let record = {
            let mut state = self.state.lock();
            let Some(info) = state.classes.get(class) else {
                state.faults.push(format!("construct of unknown class {}", class));
                return std::ptr::null_mut();
            };
            let record = info.record;
            match record {
                Some(record) => record,
                None => {
                    let refcount = state.is_refcounted(class).then_some(1);
                    let addr = state.next_addr;
                    state.next_addr += OBJECT_ADDR_STEP;
                    let id = InstanceId(state.next_id);
                    state.next_id += 1;
                    state.objects.insert(
                        addr,
                        ObjectEntry {
                            class: class.to_string(),
                            id,
                            refcount,
                            instance: None,
                        },
                    );
                    state.ids.insert(id.0, addr);
                    return addr as ObjectPtr;
                }
            }
        };
        // SAFETY: the record came from `register_class`.
        unsafe { (record.create_instance)(record.userdata) }
    }

    fn object_destroy(&self, object: ObjectPtr) {
        let entry = {
            let mut state = self.state.lock();
            let Some(entry) = state.objects.remove(&(object as usize)) else {
                state.faults.push(format!("destroy of dead object {:p}", object));
                return;
            };
            state.ids.remove(&entry.id.0);
            entry
        };
        if let Some(AttachedInstance {
            storage,
            userdata,
            free: Some(free),
        }) = entry.instance
        {
            // SAFETY: the storage was attached by the class that owns `free`.
            unsafe { free(userdata as *mut c_void, storage as InstancePtr) };
        }
    }

    fn object_instance_id(&self, object: ObjectPtr) -> InstanceId {
        let state = self.state.lock();
        state
            .objects
            .get(&(object as usize))
            .map(|entry| entry.id)
            .unwrap_or_default()
    }

    fn object_from_instance_id(&self, id: InstanceId) -> ObjectPtr {
        let state = self.state.lock();
        state
            .ids
            .get(&id.0)
            .map_or(std::ptr::null_mut(), |addr| *addr as ObjectPtr)
    }

    fn object_set_instance(&self, object: ObjectPtr, class: &str, instance: InstancePtr) {
        let mut state = self.state.lock();
        let record = state.classes.get(class).and_then(|info| info.record);
        let Some(addr) = state.object_addr(object) else {
            state.faults.push(format!("instance set on dead object {:p}", object));
            return;
        };
        if let Some(entry) = state.objects.get_mut(&addr) {
            entry.class = class.to_string();
            entry.instance = Some(AttachedInstance {
                storage: instance as usize,
                userdata: record.map_or(0, |r| r.userdata as usize),
                free: record.map(|r| r.free_instance),
            });
        }
    }

    fn method_bind(&self, class: &str, method: &str, hash: i64) -> MethodBindPtr {
        let state = self.state.lock();
        let mut current = Some(class);
        while let Some(name) = current {
            let found = state
                .methods
                .iter()
                .position(|entry| entry.class == name && entry.method == method);
            if let Some(index) = found {
                let expected = state.methods[index].hash;
                if hash != 0 && expected.is_some_and(|expected| expected != hash) {
                    return std::ptr::null();
                }
                return (index + 1) as MethodBindPtr;
            }
            current = state
                .classes
                .get(name)
                .and_then(|info| info.parent.as_deref());
        }
        std::ptr::null()
    }

    unsafe fn method_bind_ptrcall(
        &self,
        method: MethodBindPtr,
        object: ObjectPtr,
        args: ArgsAddr,
        ret: RetAddr,
    ) {
        let body = {
            let mut state = self.state.lock();
            let Some(entry) = (method as usize)
                .checked_sub(1)
                .and_then(|index| state.methods.get(index))
            else {
                state.faults.push(format!("call through bad bind {:p}", method));
                return;
            };
            let call = format!("{}.{}", entry.class, entry.method);
            let body = entry.body.clone();
            state.calls.push(call);
            body
        };
        body(self, object, args, ret);
    }

    fn register_class(&self, record: &ClassRecord) {
        let mut state = self.state.lock();
        let refcounted = state.is_refcounted(record.parent_name);
        state.classes.insert(
            record.class_name.to_string(),
            ClassInfo {
                parent: Some(record.parent_name.to_string()),
                refcounted,
                record: Some(*record),
            },
        );
    }

    fn unregister_class(&self, class: &str) {
        self.state.lock().classes.remove(class);
    }
}

// ============================================================================
// Argument and return buffers
// ============================================================================

/// Builds a packed argument tuple the way the engine lays one out.
#[derive(Default, Debug)]
pub struct ArgBuffer {
    words: Vec<u64>,
}

impl ArgBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one argument slot.
    pub fn push<T: Slot>(&mut self, value: T) -> &mut Self {
        let start = self.words.len();
        self.words.resize(start + T::WORDS, 0);
        if T::WORDS > 0 {
            // SAFETY: the slot was just sized to hold a `T`.
            unsafe { std::ptr::write_unaligned(self.words[start..].as_mut_ptr() as *mut T, value) };
        }
        self
    }

    pub fn addr(&self) -> ArgsAddr {
        if self.words.is_empty() {
            ArgsAddr::null()
        } else {
            ArgsAddr::new(self.words.as_ptr())
        }
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }
}

/// A zeroed return slot wide enough for any value.
#[derive(Debug)]
pub struct RetBuffer {
    words: [u64; 8],
}

impl Default for RetBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl RetBuffer {
    pub fn new() -> Self {
        Self::filled(0)
    }

    /// A slot pre-filled with `word`, to detect whether anything was written.
    pub fn filled(word: u64) -> Self {
        Self { words: [word; 8] }
    }

    pub fn addr(&mut self) -> RetAddr {
        RetAddr::new(self.words.as_mut_ptr())
    }

    /// What the callee wrote.
    pub fn read<T: Slot>(&self) -> T {
        // SAFETY: the buffer is larger than any slot type.
        unsafe { std::ptr::read_unaligned(self.words.as_ptr() as *const T) }
    }

    pub fn words(&self) -> &[u64; 8] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_refcounts() {
        let host = MockHost::new();
        let id = host.string_new(TextKind::String, "abc");
        assert_eq!(host.refcount(id), Some(1));
        host.wire_copy(WireKind::String, RawWire([id, 0, 0]));
        assert_eq!(host.refcount(id), Some(2));
        host.wire_destroy(WireKind::String, RawWire([id, 0, 0]));
        host.wire_destroy(WireKind::String, RawWire([id, 0, 0]));
        assert_eq!(host.live_refs(), 0);
        assert!(host.faults().is_empty());

        host.wire_destroy(WireKind::String, RawWire([id, 0, 0]));
        assert_eq!(host.faults().len(), 1);
    }

    #[test]
    fn test_array_releases_elements() {
        let host = MockHost::new();
        let text = host.string_new(TextKind::String, "x");
        let variant = unsafe { host.variant_from(VariantType::String, &text) };
        host.wire_destroy(WireKind::String, RawWire([text, 0, 0]));

        let array = host.array_new();
        host.array_push(array, variant);
        host.wire_destroy(WireKind::Variant, RawWire(variant.0));
        assert_eq!(host.array_len(array), 1);

        host.wire_destroy(WireKind::Array, RawWire([array.0, 0, 0]));
        assert_eq!(host.live_refs(), 0);
    }

    #[test]
    fn test_objects() {
        let host = MockHost::new();
        let tree = host.construct_object("Tree");
        let id = host.object_instance_id(tree);
        assert!(id.is_valid());
        assert_eq!(host.object_from_instance_id(id), tree);
        host.object_destroy(tree);
        assert!(host.object_from_instance_id(id).is_null());
        assert!(host.construct_object("Nope").is_null());
    }

    #[test]
    fn test_method_bind_hash() {
        let host = MockHost::new();
        host.bind_method_with_hash("Tree", "clear", 42, |_, _, _, _| {});
        assert!(!host.method_bind("Tree", "clear", 42).is_null());
        assert!(!host.method_bind("Tree", "clear", 0).is_null());
        assert!(host.method_bind("Tree", "clear", 7).is_null());
        assert!(host.method_bind("Tree", "missing", 0).is_null());
    }

    #[test]
    fn test_arg_buffer_layout() {
        let mut args = ArgBuffer::new();
        args.push(1i64).push(true).push(tether_sys::Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(args.words().len(), 4);
        assert_eq!(args.words()[0], 1);
        assert_eq!(args.words()[1] & 0xff, 1);
    }
}
