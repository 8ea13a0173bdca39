//! Guest-to-host calls through generated instance methods.

use std::sync::Arc;

use parking_lot::Mutex;
use tether_core::sys::{HostInterface, PackedKind, StringWire, TextKind};
use tether_core::{
    frame_stats, host_class, host_methods, BindError, HostClass, Runtime, Transform3D, Vector3,
};
use tether_test::MockHost;

host_class! {
    pub struct Widget: "Object";
}

host_methods! {
    impl Widget {
        pub fn get_size(&self, column: i32) -> i32 = "get_size";
        pub fn set_label(&self, label: &str) = "set_label";
        pub fn get_label(&self) -> String = "get_label";
        pub fn get_origin(&self) -> Transform3D = "get_origin";
        pub fn get_points(&self) -> Vec<Vector3> = "get_points";
        pub fn get_hashed(&self) -> i64 = "get_hashed", hash = 99;
        pub fn missing(&self) -> i64 = "missing";
    }
}

fn setup() -> (Arc<MockHost>, Runtime, Widget) {
    let _ = env_logger::builder().is_test(true).try_init();
    let host = Arc::new(MockHost::new());
    host.declare_class("Widget", "Object", false);
    let rt = Runtime::new(host.clone());
    let widget = Widget::construct(&rt).expect("Widget is declared");
    (host, rt, widget)
}

#[test]
fn test_primitive_arg_and_return() {
    let (host, _rt, widget) = setup();
    host.bind_method("Widget", "get_size", |_, _, args, ret| unsafe {
        let column: i64 = args.load(0);
        ret.store(column * 10);
    });

    let before = frame_stats();
    assert_eq!(widget.get_size(2), 20);
    let after = frame_stats();

    assert_eq!(after.created, before.created + 1);
    assert_eq!(after.outstanding, 0);
    assert_eq!(host.calls(), vec!["Widget.get_size".to_string()]);
}

#[test]
fn test_string_argument_is_a_frame_temporary() {
    let (host, _rt, widget) = setup();
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    host.bind_method("Widget", "set_label", move |host, _, args, _| {
        let label: StringWire = unsafe { args.load(0) };
        *sink.lock() = host.text(label.0);
    });

    widget.set_label("hello");

    assert_eq!(seen.lock().as_deref(), Some("hello"));
    assert_eq!(host.live_refs(), 0);
}

#[test]
fn test_owned_string_return_is_released() {
    let (host, _rt, widget) = setup();
    host.bind_method("Widget", "get_label", |host, _, _, ret| unsafe {
        ret.store(StringWire(host.string_new(TextKind::String, "from host")));
    });

    assert_eq!(widget.get_label(), "from host");
    assert_eq!(host.live_refs(), 0);
}

#[test]
fn test_wide_and_packed_returns() {
    let (host, _rt, widget) = setup();
    let origin = Transform3D::from_origin(Vector3::new(4.0, 5.0, 6.0));
    host.bind_method("Widget", "get_origin", move |_, _, _, ret| unsafe {
        ret.store(origin);
    });
    host.bind_method("Widget", "get_points", |host, _, _, ret| unsafe {
        let points = [Vector3::RIGHT, Vector3::UP];
        let bytes: &[u8] = bytemuck::cast_slice(&points);
        ret.store(host.packed_new(PackedKind::Vector3, bytes.as_ptr(), points.len()));
    });

    assert_eq!(widget.get_origin(), origin);
    assert_eq!(widget.get_points(), vec![Vector3::RIGHT, Vector3::UP]);
    assert_eq!(host.live_refs(), 0);
}

#[test]
fn test_unresolvable_methods_yield_zero() {
    let (host, rt, widget) = setup();
    host.bind_method_with_hash("Widget", "get_hashed", 7, |_, _, _, ret| unsafe {
        ret.store(1i64);
    });

    assert_eq!(widget.get_hashed(), 0);
    assert_eq!(widget.missing(), 0);
    assert!(host.calls().is_empty());
    assert_eq!(
        rt.method_bind("Widget", "get_hashed", 99),
        Err(BindError::MethodBindNotFound {
            class: "Widget".to_string(),
            method: "get_hashed".to_string(),
            hash: 99,
        })
    );
    assert!(rt.method_bind("Widget", "get_hashed", 7).is_ok());
}

#[test]
fn test_freed_object_cycles_its_handle() {
    let (host, rt, widget) = setup();
    host.bind_method("Widget", "get_size", |_, _, _, ret| unsafe {
        ret.store(5i64);
    });
    assert_eq!(widget.get_size(0), 5);

    let ptr = widget.as_object().ptr().unwrap();
    host.object_destroy(ptr);

    assert_eq!(widget.get_size(0), 0);
    assert!(!widget.is_instance_valid());
    assert_eq!(widget.get_size(0), 0);
    assert!(rt.handles().stats().cycled_uses >= 1);
    assert_eq!(host.calls().len(), 1);
}

#[test]
fn test_free_destroys_the_object() {
    let (host, _rt, widget) = setup();
    let id = widget.instance_id();
    assert!(widget.is_instance_valid());
    widget.free();
    assert_eq!(host.object_count(), 0);
    assert!(host.object_from_instance_id(id).is_null());
}

#[test]
fn test_global_runtime() {
    let (_host, rt, _widget) = setup();
    assert_eq!(Runtime::global().err(), Some(BindError::HostNotInstalled));
    assert!(Runtime::try_global().is_none());

    rt.clone().install_global().expect("first install");
    assert!(Runtime::global().is_ok());
    assert_eq!(rt.install_global(), Err(BindError::HostAlreadyInstalled));
}
