//! Host-to-guest virtual dispatch through generated trampolines.

use std::sync::Arc;

use parking_lot::Mutex;
use tether_core::sys::{
    ArgsAddr, HostInterface, ObjectPtr, RawWire, RetAddr, StringWire, TextKind, VariantType,
    VariantWire, WireKind,
};
use tether_core::{
    host_class, host_enum, host_methods, virtual_interface, BindError, GuestClass, HostClass,
    Callable, InstanceStorage, Runtime, Variant, VirtualSlot,
};
use tether_test::{ArgBuffer, MockHost, RetBuffer};

host_class! {
    pub struct Widget: "Object";
}

host_methods! {
    impl Widget {
        pub fn relay(&self) = "relay";
        pub fn nest(&self) -> i64 = "nest";
    }
}

host_enum! {
    pub enum Mode {
        IDLE = 0,
        BUSY = 1,
    }
}

virtual_interface! {
    pub trait IWidget for Widget {
        fn scale(&mut self, factor: i32, amount: f64) -> f64 = "_scale";
        fn echo(&mut self, value: Variant) -> Variant = "_echo";
        fn describe(&mut self, value: Variant) -> String = "_describe";
        fn mode(&mut self) -> Mode = "_mode";
        fn stale(&mut self) -> Variant = "_stale";
        fn explode(&mut self) -> i64 = "_explode";
        fn poke(&mut self) = "_poke";
        fn unused(&mut self) -> i64 = "_unused";
        fn outer(&mut self) -> i64 = "_outer";
        fn inner(&mut self) -> i64 = "_inner";
        fn call_back(&mut self, target: Callable, times: i64) -> i64 = "_call_back";
    }
}

struct Gadget {
    base: Widget,
    pokes: u32,
    seen: Vec<String>,
}

impl GuestClass for Gadget {
    type Base = Widget;
    const CLASS_NAME: &'static str = "Gadget";
    const OVERRIDES: &'static [&'static str] = &[
        "_scale", "_echo", "_describe", "_mode", "_stale", "_explode", "_poke", "_outer",
        "_inner", "_call_back",
    ];

    fn init(base: Widget) -> Self {
        Self {
            base,
            pokes: 0,
            seen: Vec::new(),
        }
    }

    fn base(&self) -> &Widget {
        &self.base
    }

    fn virtual_slots() -> Vec<VirtualSlot> {
        Widget::virtual_slots::<Self>()
    }
}

impl IWidget for Gadget {
    fn scale(&mut self, factor: i32, amount: f64) -> f64 {
        factor as f64 * amount
    }

    fn echo(&mut self, value: Variant) -> Variant {
        value
    }

    fn describe(&mut self, value: Variant) -> String {
        let text = value.to::<String>().unwrap_or_default();
        self.seen.push(text.clone());
        text
    }

    fn mode(&mut self) -> Mode {
        Mode::BUSY
    }

    fn stale(&mut self) -> Variant {
        let rt = self.base.as_object().runtime();
        let variant = Variant::new(rt, 7i64);
        if let Some(handle) = variant.handle() {
            rt.handles().end(handle);
        }
        variant
    }

    fn explode(&mut self) -> i64 {
        panic!("boom");
    }

    fn poke(&mut self) {
        self.pokes += 1;
        self.base.relay();
    }

    fn outer(&mut self) -> i64 {
        self.pokes += 1;
        let nested = self.base_mut().nest();
        self.pokes += 1;
        nested
    }

    fn inner(&mut self) -> i64 {
        self.seen.push("inner".to_string());
        77
    }

    fn call_back(&mut self, target: Callable, times: i64) -> i64 {
        let method = target.method();
        let result = method.len() as i64 * times;
        self.seen.push(method);
        result
    }
}

fn setup() -> (Arc<MockHost>, Runtime, Widget) {
    let _ = env_logger::builder().is_test(true).try_init();
    let host = Arc::new(MockHost::new());
    host.declare_class("Widget", "Object", false);
    let rt = Runtime::new(host.clone());
    rt.register_class::<Gadget>().expect("first registration");
    let widget: Widget = rt.construct_as("Gadget").expect("Gadget is registered");
    (host, rt, widget)
}

fn ptr(widget: &Widget) -> ObjectPtr {
    widget.as_object().ptr().expect("widget is alive")
}

fn gadget<'a>(host: &MockHost, widget: &Widget) -> &'a InstanceStorage<Gadget> {
    let instance = host.instance_of(ptr(widget));
    assert!(!instance.is_null());
    unsafe { InstanceStorage::from_instance(instance) }
}

/// A host string variant. The variant holds the only reference to `id`.
fn string_variant(host: &MockHost, text: &str) -> (u64, VariantWire) {
    let id = host.string_new(TextKind::String, text);
    let variant = unsafe { host.variant_from(VariantType::String, &id) };
    host.wire_destroy(WireKind::String, RawWire([id, 0, 0]));
    (id, variant)
}

fn assert_balanced(rt: &Runtime) {
    let stats = rt.handles().stats();
    assert_eq!(
        stats.acquired_borrowed - stats.released_borrowed,
        stats.live_borrowed as u64
    );
}

#[test]
fn test_construct_attaches_guest_state() {
    let (host, rt, widget) = setup();
    assert_eq!(host.object_class(ptr(&widget)).as_deref(), Some("Gadget"));
    assert!(rt.is_registered("Gadget"));
    assert_eq!(gadget(&host, &widget).with(|g| g.pokes), 0);
    // The instance's own base reference is the only borrowed handle.
    assert_eq!(rt.handles().stats().live_borrowed, 1);
}

#[test]
fn test_scalar_arguments_and_return() {
    let (host, rt, widget) = setup();
    let mut args = ArgBuffer::new();
    args.push(3i64).push(1.5f64);
    let mut ret = RetBuffer::new();

    assert!(unsafe { host.call_virtual(ptr(&widget), "_scale", args.addr(), ret.addr()) });
    assert_eq!(ret.read::<f64>(), 4.5);
    assert_balanced(&rt);
}

#[test]
fn test_null_return_slot_is_never_written() {
    let (host, _rt, widget) = setup();
    let mut args = ArgBuffer::new();
    args.push(2i64).push(2.0f64);
    assert!(unsafe { host.call_virtual(ptr(&widget), "_scale", args.addr(), RetAddr::null()) });
}

#[test]
fn test_enum_return_writes_four_bytes() {
    let (host, _rt, widget) = setup();
    let mut ret = RetBuffer::filled(u64::MAX);

    assert!(unsafe { host.call_virtual(ptr(&widget), "_mode", ArgsAddr::null(), ret.addr()) });
    assert_eq!(ret.read::<i32>(), Mode::BUSY.ord());
    assert_eq!(ret.words()[1], u64::MAX);
}

#[test]
fn test_borrowed_argument_leaves_host_refcount() {
    let (host, rt, widget) = setup();
    let (id, variant) = string_variant(&host, "box");
    let mut args = ArgBuffer::new();
    args.push(variant);
    let mut ret = RetBuffer::new();

    assert_eq!(host.refcount(id), Some(1));
    assert!(unsafe { host.call_virtual(ptr(&widget), "_describe", args.addr(), ret.addr()) });
    assert_eq!(host.refcount(id), Some(1));
    assert_balanced(&rt);

    let text: StringWire = ret.read();
    assert_eq!(host.text(text.0).as_deref(), Some("box"));
    assert_eq!(gadget(&host, &widget).with(|g| g.seen.clone()), vec!["box".to_string()]);

    host.wire_destroy(WireKind::String, RawWire([text.0, 0, 0]));
    host.wire_destroy(WireKind::Variant, RawWire(variant.0));
    assert_eq!(host.live_refs(), 0);
    assert!(host.faults().is_empty());
}

#[test]
fn test_echoed_borrow_gives_the_host_a_copy() {
    let (host, rt, widget) = setup();
    let (id, variant) = string_variant(&host, "echo");
    let mut args = ArgBuffer::new();
    args.push(variant);
    let mut ret = RetBuffer::new();

    assert!(unsafe { host.call_virtual(ptr(&widget), "_echo", args.addr(), ret.addr()) });
    let out: VariantWire = ret.read();
    assert_eq!(out, variant);
    assert_eq!(host.refcount(id), Some(2));
    assert_balanced(&rt);

    host.wire_destroy(WireKind::Variant, RawWire(out.0));
    host.wire_destroy(WireKind::Variant, RawWire(variant.0));
    assert_eq!(host.live_refs(), 0);
    assert!(host.faults().is_empty());
}

#[test]
fn test_cycled_return_is_not_written() {
    let (host, rt, widget) = setup();
    let mut ret = RetBuffer::filled(0xA5A5_A5A5_A5A5_A5A5);
    let cycled_before = rt.handles().stats().cycled_uses;

    assert!(unsafe { host.call_virtual(ptr(&widget), "_stale", ArgsAddr::null(), ret.addr()) });
    assert!(ret.words().iter().all(|&word| word == 0xA5A5_A5A5_A5A5_A5A5));
    assert!(rt.handles().stats().cycled_uses > cycled_before);
}

#[test]
fn test_panic_is_contained() {
    let (host, rt, widget) = setup();
    let mut ret = RetBuffer::filled(42);

    assert!(unsafe { host.call_virtual(ptr(&widget), "_explode", ArgsAddr::null(), ret.addr()) });
    assert_eq!(ret.read::<i64>(), 42);
    assert_balanced(&rt);

    // The instance is not left borrowed.
    let mut args = ArgBuffer::new();
    args.push(2i64).push(0.25f64);
    let mut ret = RetBuffer::new();
    assert!(unsafe { host.call_virtual(ptr(&widget), "_scale", args.addr(), ret.addr()) });
    assert_eq!(ret.read::<f64>(), 0.5);
}

#[test]
fn test_unyielded_reentry_is_refused() {
    let (host, _rt, widget) = setup();
    let inner = Arc::new(Mutex::new(None));
    let sink = inner.clone();
    host.bind_method("Widget", "relay", move |host, object, _, _| {
        let dispatched =
            unsafe { host.call_virtual(object, "_poke", ArgsAddr::null(), RetAddr::null()) };
        *sink.lock() = Some(dispatched);
    });

    assert!(unsafe { host.call_virtual(ptr(&widget), "_poke", ArgsAddr::null(), RetAddr::null()) });

    // Dispatched, but the body never ran: `relay` went through `self.base`.
    assert_eq!(*inner.lock(), Some(true));
    assert_eq!(gadget(&host, &widget).with(|g| g.pokes), 1);
    assert_eq!(host.calls(), vec!["Widget.relay".to_string()]);
}

#[test]
fn test_nested_callback_through_base_mut_is_delivered() {
    let (host, rt, widget) = setup();
    host.bind_method("Widget", "nest", |host, object, _, ret| unsafe {
        let mut inner = RetBuffer::new();
        assert!(host.call_virtual(object, "_inner", ArgsAddr::null(), inner.addr()));
        ret.store(inner.read::<i64>());
    });
    let mut ret = RetBuffer::new();

    assert!(unsafe { host.call_virtual(ptr(&widget), "_outer", ArgsAddr::null(), ret.addr()) });

    assert_eq!(ret.read::<i64>(), 77);
    let storage = gadget(&host, &widget);
    assert_eq!(storage.with(|g| g.seen.clone()), vec!["inner".to_string()]);
    assert_eq!(storage.with(|g| g.pokes), 2);
    assert_balanced(&rt);
    assert_eq!(host.live_refs(), 0);

    // The yield ended with the guard: plain re-entry is refused again.
    let mut instance = storage.borrow_mut().expect("not borrowed between calls");
    assert!(storage.borrow_mut().is_none());
    instance.pokes = 0;
    drop(instance);
    assert_eq!(storage.with(|g| g.pokes), 0);
}

#[test]
fn test_null_return_slot_releases_reference_result() {
    let (host, rt, widget) = setup();
    let (id, variant) = string_variant(&host, "dropped");
    let mut args = ArgBuffer::new();
    args.push(variant);

    assert!(unsafe { host.call_virtual(ptr(&widget), "_describe", args.addr(), RetAddr::null()) });
    assert_eq!(gadget(&host, &widget).with(|g| g.seen.clone()), vec!["dropped".to_string()]);
    assert_eq!(host.refcount(id), Some(1));
    assert_balanced(&rt);

    host.wire_destroy(WireKind::Variant, RawWire(variant.0));
    assert_eq!(host.live_refs(), 0);
    assert!(host.faults().is_empty());
}

#[test]
fn test_callable_argument_spans_two_words() {
    let (host, rt, widget) = setup();
    let target = host.callable_new(widget.instance_id(), "ping");
    let mut args = ArgBuffer::new();
    args.push(target).push(3i64);
    let mut ret = RetBuffer::new();

    assert!(unsafe { host.call_virtual(ptr(&widget), "_call_back", args.addr(), ret.addr()) });

    assert_eq!(ret.read::<i64>(), 12);
    assert_eq!(gadget(&host, &widget).with(|g| g.seen.clone()), vec!["ping".to_string()]);
    assert_eq!(host.refcount(target.0[0]), Some(1));
    assert_balanced(&rt);

    host.wire_destroy(WireKind::Callable, RawWire([target.0[0], target.0[1], 0]));
    assert_eq!(host.live_refs(), 0);
    assert!(host.faults().is_empty());
}

#[test]
fn test_override_lookup() {
    let (host, _rt, _widget) = setup();
    assert!(host.virtual_for("Gadget", "_scale").is_some());
    assert!(host.virtual_for("Gadget", "_unused").is_none());
    assert!(host.virtual_for("Gadget", "_nope").is_none());
    assert_eq!(Widget::VIRTUAL_NAMES.len(), 11);
}

#[test]
fn test_registration_lifecycle() {
    let (host, rt, widget) = setup();
    assert_eq!(
        rt.register_class::<Gadget>(),
        Err(BindError::ClassAlreadyRegistered {
            class: "Gadget".to_string()
        })
    );

    widget.free();
    assert_eq!(host.object_count(), 0);
    assert_eq!(rt.handles().stats().live_borrowed, 0);

    rt.deinitialize();
    assert!(!rt.is_registered("Gadget"));
    assert!(host.virtual_for("Gadget", "_scale").is_none());
    assert!(rt.register_class::<Gadget>().is_ok());
}
