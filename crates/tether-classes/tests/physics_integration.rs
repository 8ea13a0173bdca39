//! A guest physics server driven the way the engine drives one.

use std::sync::Arc;

use tether_classes::{
    BodyAxis, BodyMode, BodyParameter, IPhysicsServer3DExtension, PhysicsServer3DExtension,
    ProcessInfo,
};
use tether_core::sys::{
    ArgsAddr, HostInterface, ObjectPtr, PackedArrayWire, PackedKind, RawWire, RetAddr, TextKind,
    VariantType, VariantWire, WireKind,
};
use tether_core::{
    GuestClass, HostClass, InstanceStorage, Rid, Runtime, Variant, Vector3, VirtualSlot,
};
use tether_test::{ArgBuffer, MockHost, RetBuffer};

const BODY_RID: u64 = 0xDEAD_BEEF_CAFE_BABE;

struct MyPhysics {
    base: PhysicsServer3DExtension,
    shapes: Vec<(Rid, String)>,
    contacts: Vec<Vector3>,
    modes: Vec<(Rid, BodyMode)>,
    locked: BodyAxis,
    elapsed: f64,
    steps: u32,
}

impl GuestClass for MyPhysics {
    type Base = PhysicsServer3DExtension;
    const CLASS_NAME: &'static str = "MyPhysics";
    const OVERRIDES: &'static [&'static str] = &[
        "_body_create",
        "_shape_set_data",
        "_space_get_contacts",
        "_body_get_param",
        "_body_set_mode",
        "_body_get_mode",
        "_body_set_axis_lock",
        "_body_is_axis_locked",
        "_get_process_info",
        "_step",
    ];

    fn init(base: PhysicsServer3DExtension) -> Self {
        Self {
            base,
            shapes: Vec::new(),
            contacts: vec![
                glam::Vec3::new(1.0, 2.0, 3.0).into(),
                glam::Vec3::new(-1.0, 0.0, 0.5).into(),
                glam::Vec3::ZERO.into(),
            ],
            modes: Vec::new(),
            locked: BodyAxis::default(),
            elapsed: 0.0,
            steps: 0,
        }
    }

    fn base(&self) -> &PhysicsServer3DExtension {
        &self.base
    }

    fn virtual_slots() -> Vec<VirtualSlot> {
        PhysicsServer3DExtension::virtual_slots::<Self>()
    }
}

impl IPhysicsServer3DExtension for MyPhysics {
    fn body_create(&mut self) -> Rid {
        Rid::new(BODY_RID)
    }

    fn shape_set_data(&mut self, shape: Rid, data: Variant) {
        let text = data.to::<String>().unwrap_or_default();
        self.shapes.push((shape, text));
    }

    fn space_get_contacts(&mut self, _space: Rid) -> Vec<Vector3> {
        self.contacts.clone()
    }

    fn body_get_param(&mut self, _body: Rid, _param: BodyParameter) -> Variant {
        let rt = self.base.as_object().runtime();
        let value = Variant::new(rt, 2.5f64);
        if let Some(handle) = value.handle() {
            rt.handles().end(handle);
        }
        value
    }

    fn body_set_mode(&mut self, body: Rid, mode: BodyMode) {
        self.modes.retain(|(rid, _)| *rid != body);
        self.modes.push((body, mode));
    }

    fn body_get_mode(&mut self, body: Rid) -> BodyMode {
        self.modes
            .iter()
            .find(|(rid, _)| *rid == body)
            .map(|(_, mode)| *mode)
            .unwrap_or_default()
    }

    fn body_set_axis_lock(&mut self, _body: Rid, axis: BodyAxis, lock: bool) {
        if lock {
            self.locked |= axis;
        }
    }

    fn body_is_axis_locked(&mut self, _body: Rid, axis: BodyAxis) -> bool {
        self.locked.contains(axis)
    }

    fn get_process_info(&mut self, process_info: ProcessInfo) -> i64 {
        if process_info == ProcessInfo::ACTIVE_OBJECTS {
            self.modes.len() as i64
        } else {
            0
        }
    }

    fn step(&mut self, step: f64) {
        self.elapsed += step;
        self.steps += 1;
    }
}

fn setup() -> (Arc<MockHost>, Runtime, PhysicsServer3DExtension) {
    let _ = env_logger::builder().is_test(true).try_init();
    let host = Arc::new(MockHost::new());
    let rt = Runtime::new(host.clone());
    rt.register_class::<MyPhysics>().expect("register MyPhysics");
    let server: PhysicsServer3DExtension =
        rt.construct_as("MyPhysics").expect("construct MyPhysics");
    (host, rt, server)
}

fn object(server: &PhysicsServer3DExtension) -> ObjectPtr {
    server.as_object().ptr().expect("server is alive")
}

fn state<'a>(host: &MockHost, server: &PhysicsServer3DExtension) -> &'a InstanceStorage<MyPhysics> {
    unsafe { InstanceStorage::from_instance(host.instance_of(object(server))) }
}

#[test]
fn test_body_create_returns_rid() {
    let (host, _rt, server) = setup();
    let mut ret = RetBuffer::new();

    assert!(unsafe { host.call_virtual(object(&server), "_body_create", ArgsAddr::null(), ret.addr()) });
    assert_eq!(ret.read::<Rid>(), Rid::new(BODY_RID));
    assert_eq!(ret.read::<u64>(), 0xDEAD_BEEF_CAFE_BABE);
}

#[test]
fn test_shape_data_is_borrowed() {
    let (host, rt, server) = setup();
    let text = host.string_new(TextKind::String, "box");
    let data = unsafe { host.variant_from(VariantType::String, &text) };
    host.wire_destroy(WireKind::String, RawWire([text, 0, 0]));
    assert_eq!(host.refcount(text), Some(1));

    let mut args = ArgBuffer::new();
    args.push(Rid::new(7)).push(data);
    assert!(unsafe { host.call_virtual(object(&server), "_shape_set_data", args.addr(), RetAddr::null()) });

    assert_eq!(host.refcount(text), Some(1));
    assert_eq!(
        state(&host, &server).with(|s| s.shapes.clone()),
        vec![(Rid::new(7), "box".to_string())]
    );
    let stats = rt.handles().stats();
    assert_eq!(stats.acquired_borrowed - stats.released_borrowed, stats.live_borrowed as u64);

    host.wire_destroy(WireKind::Variant, RawWire(data.0));
    assert_eq!(host.live_refs(), 0);
}

#[test]
fn test_contacts_come_back_as_packed_array() {
    let (host, _rt, server) = setup();
    let mut args = ArgBuffer::new();
    args.push(Rid::new(1));
    let mut ret = RetBuffer::new();

    assert!(unsafe { host.call_virtual(object(&server), "_space_get_contacts", args.addr(), ret.addr()) });

    let packed: PackedArrayWire = ret.read();
    assert_eq!(host.packed_len(PackedKind::Vector3, packed), 3);
    let data = host.packed_data(PackedKind::Vector3, packed) as *const Vector3;
    let contacts: Vec<Vector3> = (0..3)
        .map(|i| unsafe { data.add(i).read_unaligned() })
        .collect();
    assert_eq!(contacts[0], Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(contacts[1], Vector3::new(-1.0, 0.0, 0.5));
    assert_eq!(contacts[2], Vector3::ZERO);

    host.wire_destroy(WireKind::Packed(PackedKind::Vector3), RawWire([packed.0, 0, 0]));
    assert_eq!(host.live_refs(), 0);
}

#[test]
fn test_cycled_param_is_not_written() {
    let (host, _rt, server) = setup();
    let mut args = ArgBuffer::new();
    args.push(Rid::new(BODY_RID)).push(BodyParameter::MASS.ord());
    let mut ret = RetBuffer::filled(0x5A5A_5A5A_5A5A_5A5A);

    assert!(unsafe { host.call_virtual(object(&server), "_body_get_param", args.addr(), ret.addr()) });

    let untouched: VariantWire = ret.read();
    assert_eq!(untouched.0, [0x5A5A_5A5A_5A5A_5A5A; 3]);
}

#[test]
fn test_only_listed_overrides_are_installed() {
    let (host, _rt, _server) = setup();
    assert!(host.virtual_for("MyPhysics", "_step").is_some());
    assert!(host.virtual_for("MyPhysics", "_body_create").is_some());
    assert!(host.virtual_for("MyPhysics", "_finish").is_none());
    assert!(host.virtual_for("MyPhysics", "_init").is_none());
    assert!(host.virtual_for("MyPhysics", "_not_a_virtual").is_none());
}

#[test]
fn test_step_accumulates() {
    let (host, _rt, server) = setup();
    for _ in 0..4 {
        let mut args = ArgBuffer::new();
        args.push(0.25f64);
        assert!(unsafe { host.call_virtual(object(&server), "_step", args.addr(), RetAddr::null()) });
    }
    assert_eq!(state(&host, &server).with(|s| (s.steps, s.elapsed)), (4, 1.0));
}

#[test]
fn test_enum_and_flag_arguments() {
    let (host, _rt, server) = setup();
    let body = Rid::new(BODY_RID);

    let mut args = ArgBuffer::new();
    args.push(body).push(BodyMode::RIGID.ord());
    assert!(unsafe { host.call_virtual(object(&server), "_body_set_mode", args.addr(), RetAddr::null()) });

    let mut args = ArgBuffer::new();
    args.push(body);
    let mut ret = RetBuffer::new();
    assert!(unsafe { host.call_virtual(object(&server), "_body_get_mode", args.addr(), ret.addr()) });
    assert_eq!(BodyMode::from_ord(ret.read::<i32>()), BodyMode::RIGID);

    let mut args = ArgBuffer::new();
    args.push(body).push(BodyAxis::LINEAR_Y.ord()).push(true);
    assert!(unsafe { host.call_virtual(object(&server), "_body_set_axis_lock", args.addr(), RetAddr::null()) });

    for (axis, expected) in [(BodyAxis::LINEAR_Y, true), (BodyAxis::ANGULAR_Z, false)] {
        let mut args = ArgBuffer::new();
        args.push(body).push(axis.ord());
        let mut ret = RetBuffer::new();
        assert!(unsafe { host.call_virtual(object(&server), "_body_is_axis_locked", args.addr(), ret.addr()) });
        assert_eq!(ret.read::<bool>(), expected);
    }

    let mut args = ArgBuffer::new();
    args.push(ProcessInfo::ACTIVE_OBJECTS.ord());
    let mut ret = RetBuffer::new();
    assert!(unsafe { host.call_virtual(object(&server), "_get_process_info", args.addr(), ret.addr()) });
    assert_eq!(ret.read::<i64>(), 1);
}

#[test]
fn test_motion_exclusion_queries_reach_the_host() {
    let (host, _rt, server) = setup();
    host.bind_method_with_hash(
        "PhysicsServer3DExtension",
        "body_test_motion_is_excluding_body",
        4155700596,
        |_, _, args, ret| unsafe {
            let body: Rid = args.load(0);
            ret.store(body == Rid::new(BODY_RID));
        },
    );

    assert!(server.body_test_motion_is_excluding_body(Rid::new(BODY_RID)));
    assert!(!server.body_test_motion_is_excluding_body(Rid::new(3)));
    // No bind for this one: the zero value.
    assert!(!server.body_test_motion_is_excluding_object(server.instance_id()));
}
