//! Generic arrays, dictionaries and callables.

use tether_sys::{ArrayWire, CallableWire, DictionaryWire, InstanceId, WireForm, WireKind};

use super::held::{handle_bridge, Held};
use super::Variant;
use crate::runtime::Runtime;

// ============================================================================
// Array
// ============================================================================

/// Handle to a host array of variants.
///
/// The default value holds no handle and encodes as the host's empty array.
pub struct Array {
    held: Option<Held>,
}

handle_bridge!(Array, ArrayWire, WireKind::Array);

impl Array {
    /// A new, empty host array.
    pub fn new(rt: &Runtime) -> Self {
        let wire = rt.host().array_new();
        Self {
            held: Held::owned(rt, WireKind::Array, wire.into_raw()),
        }
    }

    /// A new host array holding `values` in order.
    pub fn from_variants<'a>(rt: &Runtime, values: impl IntoIterator<Item = &'a Variant>) -> Self {
        let array = Self::new(rt);
        for value in values {
            array.push(value);
        }
        array
    }

    fn wire(&self) -> Option<(&Runtime, ArrayWire)> {
        let held = self.held.as_ref()?;
        Some((held.runtime(), ArrayWire::from_raw(held.wire()?)))
    }

    pub fn len(&self) -> usize {
        self.wire()
            .map(|(rt, wire)| rt.host().array_len(wire).max(0) as usize)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owned copy of the element at `index`.
    pub fn get(&self, index: usize) -> Option<Variant> {
        let (rt, wire) = self.wire()?;
        if index >= self.len() {
            return None;
        }
        let value = rt.host().array_get(wire, index as i64);
        Some(Variant::from_wire_owned(rt, value))
    }

    /// Append a copy of `value`. Does nothing on an array without a handle.
    pub fn push(&self, value: &Variant) {
        match self.wire() {
            Some((rt, wire)) => rt.host().array_push(wire, value.packed()),
            None => log::warn!("push to an array with no host storage ignored"),
        }
    }

    /// Owned copies of every element.
    pub fn to_vec(&self) -> Vec<Variant> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Array").field("len", &self.len()).finish()
    }
}

// ============================================================================
// Dictionary
// ============================================================================

/// Handle to a host dictionary keyed by variants.
pub struct Dictionary {
    held: Option<Held>,
}

handle_bridge!(Dictionary, DictionaryWire, WireKind::Dictionary);

impl Dictionary {
    /// A new, empty host dictionary.
    pub fn new(rt: &Runtime) -> Self {
        let wire = rt.host().dictionary_new();
        Self {
            held: Held::owned(rt, WireKind::Dictionary, wire.into_raw()),
        }
    }

    fn wire(&self) -> Option<(&Runtime, DictionaryWire)> {
        let held = self.held.as_ref()?;
        Some((held.runtime(), DictionaryWire::from_raw(held.wire()?)))
    }

    pub fn len(&self) -> usize {
        self.wire()
            .map(|(rt, wire)| rt.host().dictionary_len(wire).max(0) as usize)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owned copy of the value under `key`.
    pub fn get(&self, key: &Variant) -> Option<Variant> {
        let (rt, wire) = self.wire()?;
        rt.host()
            .dictionary_get(wire, key.packed())
            .map(|value| Variant::from_wire_owned(rt, value))
    }

    pub fn contains_key(&self, key: &Variant) -> bool {
        self.get(key).is_some()
    }

    /// Store copies of `key` and `value`.
    pub fn set(&self, key: &Variant, value: &Variant) {
        match self.wire() {
            Some((rt, wire)) => rt.host().dictionary_set(wire, key.packed(), value.packed()),
            None => log::warn!("set on a dictionary with no host storage ignored"),
        }
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Array {
        match self.wire() {
            Some((rt, wire)) => {
                let keys = rt.host().dictionary_keys(wire);
                Array {
                    held: Held::owned(rt, WireKind::Array, keys.into_raw()),
                }
            }
            None => Array::default(),
        }
    }
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary").field("len", &self.len()).finish()
    }
}

// ============================================================================
// Callable
// ============================================================================

/// Handle to a host callable: an object plus a method name.
pub struct Callable {
    held: Option<Held>,
}

handle_bridge!(Callable, CallableWire, WireKind::Callable);

impl Callable {
    /// Callable for `method` on the object with id `object`.
    pub fn new(rt: &Runtime, object: InstanceId, method: &str) -> Self {
        let wire = rt.host().callable_new(object, method);
        Self {
            held: Held::owned(rt, WireKind::Callable, wire.into_raw()),
        }
    }

    fn wire(&self) -> Option<(&Runtime, CallableWire)> {
        let held = self.held.as_ref()?;
        Some((held.runtime(), CallableWire::from_raw(held.wire()?)))
    }

    pub fn is_null(&self) -> bool {
        self.wire().is_none()
    }

    /// Target object id, invalid for a null callable.
    pub fn object_id(&self) -> InstanceId {
        self.wire()
            .map(|(rt, wire)| rt.host().callable_object(wire))
            .unwrap_or_default()
    }

    /// Target method name, empty for a null callable.
    pub fn method(&self) -> String {
        self.wire()
            .map(|(rt, wire)| rt.host().callable_method(wire))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callable")
            .field("object", &self.object_id().0)
            .field("method", &self.method())
            .finish()
    }
}

// Packing for host calls that only borrow the value.
impl Array {
    pub(crate) fn packed(&self) -> ArrayWire {
        self.wire().map(|(_, wire)| wire).unwrap_or_default()
    }
}

impl Dictionary {
    pub(crate) fn packed(&self) -> DictionaryWire {
        self.wire().map(|(_, wire)| wire).unwrap_or_default()
    }
}

impl Callable {
    pub(crate) fn packed(&self) -> CallableWire {
        self.wire().map(|(_, wire)| wire).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ToHost;
    use std::sync::Arc;
    use tether_test::MockHost;

    #[test]
    fn test_array_push_get() {
        let host = Arc::new(MockHost::new());
        let rt = Runtime::new(host.clone());

        let array = Array::new(&rt);
        array.push(&Variant::new(&rt, 7i64));
        array.push(&Variant::new(&rt, "seven"));
        assert_eq!(array.len(), 2);
        assert_eq!(array.get(0).and_then(|v| v.to::<i64>()), Some(7));
        assert_eq!(array.get(1).and_then(|v| v.to::<String>()), Some("seven".to_string()));
        assert!(array.get(2).is_none());

        drop(array);
        assert_eq!(host.live_refs(), 0);
    }

    #[test]
    fn test_dictionary_roundtrip() {
        let host = Arc::new(MockHost::new());
        let rt = Runtime::new(host.clone());

        let dict = Dictionary::new(&rt);
        let key = Variant::new(&rt, "gravity");
        dict.set(&key, &Variant::new(&rt, 9.8f64));
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&key).and_then(|v| v.to::<f64>()), Some(9.8));
        assert!(!dict.contains_key(&Variant::new(&rt, "mass")));
        assert_eq!(dict.keys().len(), 1);

        drop((dict, key));
        assert_eq!(host.live_refs(), 0);
    }

    #[test]
    fn test_callable_fields() {
        let host = Arc::new(MockHost::new());
        let rt = Runtime::new(host.clone());
        let callable = Callable::new(&rt, InstanceId(42), "on_contact");
        assert_eq!(callable.object_id(), InstanceId(42));
        assert_eq!(callable.method(), "on_contact");
        assert!(Callable::default().is_null());
    }

    #[test]
    fn test_default_array_encodes_zero() {
        let rt = Runtime::new(Arc::new(MockHost::new()));
        assert_eq!(Array::default().into_host(&rt), Some(ArrayWire::default()));
        assert!(Array::default().is_empty());
    }
}
