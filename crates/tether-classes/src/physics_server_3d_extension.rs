//! `PhysicsServer3DExtension`: the base for physics engines written as
//! guest classes.
//!
//! Nearly everything here flows host to guest. A guest physics server
//! implements [`IPhysicsServer3DExtension`] and lists the methods it
//! overrides in [`GuestClass::OVERRIDES`](tether_core::GuestClass::OVERRIDES).

use std::ffi::c_void;

use tether_core::{
    host_class, host_enum, host_methods, virtual_interface, Aabb, Array, Callable, InstanceId,
    ObjectRef, Rid, Transform3D, Variant, Vector3,
};

host_class! {
    /// Extension point for a custom physics server.
    pub struct PhysicsServer3DExtension: "PhysicsServer3D";
}

host_class! {
    /// Query interface of one physics space.
    pub struct PhysicsDirectSpaceState3D: "Object";
}

host_class! {
    /// Direct access to one body's simulation state.
    pub struct PhysicsDirectBodyState3D: "Object";
}

host_methods! {
    impl PhysicsServer3DExtension {
        /// Whether `body` is excluded from the motion test in progress.
        pub fn body_test_motion_is_excluding_body(&self, body: Rid) -> bool
            = "body_test_motion_is_excluding_body", hash = 4155700596;
        /// Whether the object with this id is excluded from the motion test in progress.
        pub fn body_test_motion_is_excluding_object(&self, object: InstanceId) -> bool
            = "body_test_motion_is_excluding_object", hash = 1116898809;
    }
}

host_methods! {
    impl PhysicsDirectBodyState3D {
        pub fn get_transform(&self) -> Transform3D = "get_transform";
        pub fn get_linear_velocity(&self) -> Vector3 = "get_linear_velocity";
        pub fn get_angular_velocity(&self) -> Vector3 = "get_angular_velocity";
        pub fn get_step(&self) -> f64 = "get_step";
        pub fn is_sleeping(&self) -> bool = "is_sleeping";
    }
}

host_enum! {
    pub enum ShapeType {
        WORLD_BOUNDARY = 0,
        SEPARATION_RAY = 1,
        SPHERE = 2,
        BOX = 3,
        CAPSULE = 4,
        CYLINDER = 5,
        CONVEX_POLYGON = 6,
        CONCAVE_POLYGON = 7,
        HEIGHTMAP = 8,
        SOFT_BODY = 9,
        CUSTOM = 10,
    }
}

host_enum! {
    pub enum SpaceParameter {
        CONTACT_RECYCLE_RADIUS = 0,
        CONTACT_MAX_SEPARATION = 1,
        CONTACT_MAX_ALLOWED_PENETRATION = 2,
        CONTACT_DEFAULT_BIAS = 3,
        BODY_LINEAR_VELOCITY_SLEEP_THRESHOLD = 4,
        BODY_ANGULAR_VELOCITY_SLEEP_THRESHOLD = 5,
        BODY_TIME_TO_SLEEP = 6,
        SOLVER_ITERATIONS = 7,
    }
}

host_enum! {
    pub enum AreaParameter {
        GRAVITY_OVERRIDE_MODE = 0,
        GRAVITY = 1,
        GRAVITY_VECTOR = 2,
        GRAVITY_IS_POINT = 3,
        GRAVITY_POINT_UNIT_DISTANCE = 4,
        LINEAR_DAMP_OVERRIDE_MODE = 5,
        LINEAR_DAMP = 6,
        ANGULAR_DAMP_OVERRIDE_MODE = 7,
        ANGULAR_DAMP = 8,
        PRIORITY = 9,
        WIND_FORCE_MAGNITUDE = 10,
        WIND_SOURCE = 11,
        WIND_DIRECTION = 12,
        WIND_ATTENUATION_FACTOR = 13,
    }
}

host_enum! {
    /// How an area's gravity and damping combine with the space's.
    pub enum AreaSpaceOverrideMode {
        DISABLED = 0,
        COMBINE = 1,
        COMBINE_REPLACE = 2,
        REPLACE = 3,
        REPLACE_COMBINE = 4,
    }
}

host_enum! {
    pub enum BodyMode {
        STATIC = 0,
        KINEMATIC = 1,
        RIGID = 2,
        RIGID_LINEAR = 3,
    }
}

host_enum! {
    pub enum BodyParameter {
        BOUNCE = 0,
        FRICTION = 1,
        MASS = 2,
        INERTIA = 3,
        CENTER_OF_MASS = 4,
        GRAVITY_SCALE = 5,
        LINEAR_DAMP_MODE = 6,
        ANGULAR_DAMP_MODE = 7,
        LINEAR_DAMP = 8,
        ANGULAR_DAMP = 9,
        MAX = 10,
    }
}

host_enum! {
    pub enum BodyDampMode {
        COMBINE = 0,
        REPLACE = 1,
    }
}

host_enum! {
    pub enum BodyState {
        TRANSFORM = 0,
        LINEAR_VELOCITY = 1,
        ANGULAR_VELOCITY = 2,
        SLEEPING = 3,
        CAN_SLEEP = 4,
    }
}

host_enum! {
    pub enum JointType {
        PIN = 0,
        HINGE = 1,
        SLIDER = 2,
        CONE_TWIST = 3,
        TYPE_6DOF = 4,
        MAX = 5,
    }
}

host_enum! {
    pub enum PinJointParam {
        BIAS = 0,
        DAMPING = 1,
        IMPULSE_CLAMP = 2,
    }
}

host_enum! {
    pub enum HingeJointParam {
        BIAS = 0,
        LIMIT_UPPER = 1,
        LIMIT_LOWER = 2,
        LIMIT_BIAS = 3,
        LIMIT_SOFTNESS = 4,
        LIMIT_RELAXATION = 5,
        MOTOR_TARGET_VELOCITY = 6,
        MOTOR_MAX_IMPULSE = 7,
    }
}

host_enum! {
    pub enum HingeJointFlag {
        USE_LIMIT = 0,
        ENABLE_MOTOR = 1,
    }
}

host_enum! {
    pub enum SliderJointParam {
        LINEAR_LIMIT_UPPER = 0,
        LINEAR_LIMIT_LOWER = 1,
        LINEAR_LIMIT_SOFTNESS = 2,
        LINEAR_LIMIT_RESTITUTION = 3,
        LINEAR_LIMIT_DAMPING = 4,
        LINEAR_MOTION_SOFTNESS = 5,
        LINEAR_MOTION_RESTITUTION = 6,
        LINEAR_MOTION_DAMPING = 7,
        LINEAR_ORTHOGONAL_SOFTNESS = 8,
        LINEAR_ORTHOGONAL_RESTITUTION = 9,
        LINEAR_ORTHOGONAL_DAMPING = 10,
        ANGULAR_LIMIT_UPPER = 11,
        ANGULAR_LIMIT_LOWER = 12,
        ANGULAR_LIMIT_SOFTNESS = 13,
        ANGULAR_LIMIT_RESTITUTION = 14,
        ANGULAR_LIMIT_DAMPING = 15,
        ANGULAR_MOTION_SOFTNESS = 16,
        ANGULAR_MOTION_RESTITUTION = 17,
        ANGULAR_MOTION_DAMPING = 18,
        ANGULAR_ORTHOGONAL_SOFTNESS = 19,
        ANGULAR_ORTHOGONAL_RESTITUTION = 20,
        ANGULAR_ORTHOGONAL_DAMPING = 21,
        MAX = 22,
    }
}

host_enum! {
    pub enum ConeTwistJointParam {
        SWING_SPAN = 0,
        TWIST_SPAN = 1,
        BIAS = 2,
        SOFTNESS = 3,
        RELAXATION = 4,
    }
}

host_enum! {
    pub enum G6dofJointAxisParam {
        LINEAR_LOWER_LIMIT = 0,
        LINEAR_UPPER_LIMIT = 1,
        LINEAR_LIMIT_SOFTNESS = 2,
        LINEAR_RESTITUTION = 3,
        LINEAR_DAMPING = 4,
        LINEAR_MOTOR_TARGET_VELOCITY = 5,
        LINEAR_MOTOR_FORCE_LIMIT = 6,
        LINEAR_SPRING_STIFFNESS = 7,
        LINEAR_SPRING_DAMPING = 8,
        LINEAR_SPRING_EQUILIBRIUM_POINT = 9,
        ANGULAR_LOWER_LIMIT = 10,
        ANGULAR_UPPER_LIMIT = 11,
        ANGULAR_LIMIT_SOFTNESS = 12,
        ANGULAR_DAMPING = 13,
        ANGULAR_RESTITUTION = 14,
        ANGULAR_FORCE_LIMIT = 15,
        ANGULAR_ERP = 16,
        ANGULAR_MOTOR_TARGET_VELOCITY = 17,
        ANGULAR_MOTOR_FORCE_LIMIT = 18,
        ANGULAR_SPRING_STIFFNESS = 19,
        ANGULAR_SPRING_DAMPING = 20,
        ANGULAR_SPRING_EQUILIBRIUM_POINT = 21,
        MAX = 22,
    }
}

host_enum! {
    pub enum G6dofJointAxisFlag {
        ENABLE_LINEAR_LIMIT = 0,
        ENABLE_ANGULAR_LIMIT = 1,
        ENABLE_ANGULAR_SPRING = 2,
        ENABLE_LINEAR_SPRING = 3,
        ENABLE_MOTOR = 4,
        ENABLE_LINEAR_MOTOR = 5,
        MAX = 6,
    }
}

host_enum! {
    /// Axes a body can be locked on. Values combine as bit flags.
    pub flags BodyAxis {
        LINEAR_X = 1,
        LINEAR_Y = 2,
        LINEAR_Z = 4,
        ANGULAR_X = 8,
        ANGULAR_Y = 16,
        ANGULAR_Z = 32,
    }
}

host_enum! {
    pub enum ProcessInfo {
        ACTIVE_OBJECTS = 0,
        COLLISION_PAIRS = 1,
        ISLAND_COUNT = 2,
    }
}

host_enum! {
    pub enum Vector3Axis {
        X = 0,
        Y = 1,
        Z = 2,
    }
}

virtual_interface! {
    /// Overrideable methods of [`PhysicsServer3DExtension`].
    ///
    /// Every method defaults to doing nothing and returning the zero value.
    /// Only the methods named in the class's `OVERRIDES` are installed; the
    /// host keeps its own behavior for the rest.
    pub trait IPhysicsServer3DExtension for PhysicsServer3DExtension {
        // Shapes
        fn world_boundary_shape_create(&mut self) -> Rid = "_world_boundary_shape_create";
        fn separation_ray_shape_create(&mut self) -> Rid = "_separation_ray_shape_create";
        fn sphere_shape_create(&mut self) -> Rid = "_sphere_shape_create";
        fn box_shape_create(&mut self) -> Rid = "_box_shape_create";
        fn capsule_shape_create(&mut self) -> Rid = "_capsule_shape_create";
        fn cylinder_shape_create(&mut self) -> Rid = "_cylinder_shape_create";
        fn convex_polygon_shape_create(&mut self) -> Rid = "_convex_polygon_shape_create";
        fn concave_polygon_shape_create(&mut self) -> Rid = "_concave_polygon_shape_create";
        fn heightmap_shape_create(&mut self) -> Rid = "_heightmap_shape_create";
        fn custom_shape_create(&mut self) -> Rid = "_custom_shape_create";
        fn shape_set_data(&mut self, shape: Rid, data: Variant) = "_shape_set_data";
        fn shape_set_custom_solver_bias(&mut self, shape: Rid, bias: f64)
            = "_shape_set_custom_solver_bias";
        fn shape_set_margin(&mut self, shape: Rid, margin: f64) = "_shape_set_margin";
        fn shape_get_margin(&mut self, shape: Rid) -> f64 = "_shape_get_margin";
        fn shape_get_type(&mut self, shape: Rid) -> ShapeType = "_shape_get_type";
        fn shape_get_data(&mut self, shape: Rid) -> Variant = "_shape_get_data";
        fn shape_get_custom_solver_bias(&mut self, shape: Rid) -> f64
            = "_shape_get_custom_solver_bias";

        // Spaces
        fn space_create(&mut self) -> Rid = "_space_create";
        fn space_set_active(&mut self, space: Rid, active: bool) = "_space_set_active";
        fn space_is_active(&mut self, space: Rid) -> bool = "_space_is_active";
        fn space_set_param(&mut self, space: Rid, param: SpaceParameter, value: f64)
            = "_space_set_param";
        fn space_get_param(&mut self, space: Rid, param: SpaceParameter) -> f64
            = "_space_get_param";
        fn space_get_direct_state(&mut self, space: Rid) -> Option<PhysicsDirectSpaceState3D>
            = "_space_get_direct_state";
        fn space_set_debug_contacts(&mut self, space: Rid, max_contacts: i32)
            = "_space_set_debug_contacts";
        fn space_get_contacts(&mut self, space: Rid) -> Vec<Vector3> = "_space_get_contacts";
        fn space_get_contact_count(&mut self, space: Rid) -> i32 = "_space_get_contact_count";

        // Areas
        fn area_create(&mut self) -> Rid = "_area_create";
        fn area_set_space(&mut self, area: Rid, space: Rid) = "_area_set_space";
        fn area_get_space(&mut self, area: Rid) -> Rid = "_area_get_space";
        fn area_add_shape(&mut self, area: Rid, shape: Rid, transform: Transform3D, disabled: bool)
            = "_area_add_shape";
        fn area_set_shape(&mut self, area: Rid, shape_idx: i32, shape: Rid) = "_area_set_shape";
        fn area_set_shape_transform(&mut self, area: Rid, shape_idx: i32, transform: Transform3D)
            = "_area_set_shape_transform";
        fn area_set_shape_disabled(&mut self, area: Rid, shape_idx: i32, disabled: bool)
            = "_area_set_shape_disabled";
        fn area_get_shape_count(&mut self, area: Rid) -> i32 = "_area_get_shape_count";
        fn area_get_shape(&mut self, area: Rid, shape_idx: i32) -> Rid = "_area_get_shape";
        fn area_get_shape_transform(&mut self, area: Rid, shape_idx: i32) -> Transform3D
            = "_area_get_shape_transform";
        fn area_remove_shape(&mut self, area: Rid, shape_idx: i32) = "_area_remove_shape";
        fn area_clear_shapes(&mut self, area: Rid) = "_area_clear_shapes";
        fn area_attach_object_instance_id(&mut self, area: Rid, id: InstanceId)
            = "_area_attach_object_instance_id";
        fn area_get_object_instance_id(&mut self, area: Rid) -> InstanceId
            = "_area_get_object_instance_id";
        fn area_set_param(&mut self, area: Rid, param: AreaParameter, value: Variant)
            = "_area_set_param";
        fn area_set_transform(&mut self, area: Rid, transform: Transform3D)
            = "_area_set_transform";
        fn area_get_param(&mut self, area: Rid, param: AreaParameter) -> Variant
            = "_area_get_param";
        fn area_get_transform(&mut self, area: Rid) -> Transform3D = "_area_get_transform";
        fn area_set_collision_layer(&mut self, area: Rid, layer: u32)
            = "_area_set_collision_layer";
        fn area_get_collision_layer(&mut self, area: Rid) -> u32 = "_area_get_collision_layer";
        fn area_set_collision_mask(&mut self, area: Rid, mask: u32) = "_area_set_collision_mask";
        fn area_get_collision_mask(&mut self, area: Rid) -> u32 = "_area_get_collision_mask";
        fn area_set_monitorable(&mut self, area: Rid, monitorable: bool)
            = "_area_set_monitorable";
        fn area_set_ray_pickable(&mut self, area: Rid, enable: bool) = "_area_set_ray_pickable";
        fn area_set_monitor_callback(&mut self, area: Rid, callback: Callable)
            = "_area_set_monitor_callback";
        fn area_set_area_monitor_callback(&mut self, area: Rid, callback: Callable)
            = "_area_set_area_monitor_callback";

        // Bodies
        fn body_create(&mut self) -> Rid = "_body_create";
        fn body_set_space(&mut self, body: Rid, space: Rid) = "_body_set_space";
        fn body_get_space(&mut self, body: Rid) -> Rid = "_body_get_space";
        fn body_set_mode(&mut self, body: Rid, mode: BodyMode) = "_body_set_mode";
        fn body_get_mode(&mut self, body: Rid) -> BodyMode = "_body_get_mode";
        fn body_add_shape(&mut self, body: Rid, shape: Rid, transform: Transform3D, disabled: bool)
            = "_body_add_shape";
        fn body_set_shape(&mut self, body: Rid, shape_idx: i32, shape: Rid) = "_body_set_shape";
        fn body_set_shape_transform(&mut self, body: Rid, shape_idx: i32, transform: Transform3D)
            = "_body_set_shape_transform";
        fn body_set_shape_disabled(&mut self, body: Rid, shape_idx: i32, disabled: bool)
            = "_body_set_shape_disabled";
        fn body_get_shape_count(&mut self, body: Rid) -> i32 = "_body_get_shape_count";
        fn body_get_shape(&mut self, body: Rid, shape_idx: i32) -> Rid = "_body_get_shape";
        fn body_get_shape_transform(&mut self, body: Rid, shape_idx: i32) -> Transform3D
            = "_body_get_shape_transform";
        fn body_remove_shape(&mut self, body: Rid, shape_idx: i32) = "_body_remove_shape";
        fn body_clear_shapes(&mut self, body: Rid) = "_body_clear_shapes";
        fn body_attach_object_instance_id(&mut self, body: Rid, id: InstanceId)
            = "_body_attach_object_instance_id";
        fn body_get_object_instance_id(&mut self, body: Rid) -> InstanceId
            = "_body_get_object_instance_id";
        fn body_set_enable_continuous_collision_detection(&mut self, body: Rid, enable: bool)
            = "_body_set_enable_continuous_collision_detection";
        fn body_is_continuous_collision_detection_enabled(&mut self, body: Rid) -> bool
            = "_body_is_continuous_collision_detection_enabled";
        fn body_set_collision_layer(&mut self, body: Rid, layer: u32)
            = "_body_set_collision_layer";
        fn body_get_collision_layer(&mut self, body: Rid) -> u32 = "_body_get_collision_layer";
        fn body_set_collision_mask(&mut self, body: Rid, mask: u32) = "_body_set_collision_mask";
        fn body_get_collision_mask(&mut self, body: Rid) -> u32 = "_body_get_collision_mask";
        fn body_set_collision_priority(&mut self, body: Rid, priority: f64)
            = "_body_set_collision_priority";
        fn body_get_collision_priority(&mut self, body: Rid) -> f64
            = "_body_get_collision_priority";
        fn body_set_user_flags(&mut self, body: Rid, flags: u32) = "_body_set_user_flags";
        fn body_get_user_flags(&mut self, body: Rid) -> u32 = "_body_get_user_flags";
        fn body_set_param(&mut self, body: Rid, param: BodyParameter, value: Variant)
            = "_body_set_param";
        fn body_get_param(&mut self, body: Rid, param: BodyParameter) -> Variant
            = "_body_get_param";
        fn body_reset_mass_properties(&mut self, body: Rid) = "_body_reset_mass_properties";
        fn body_set_state(&mut self, body: Rid, state: BodyState, value: Variant)
            = "_body_set_state";
        fn body_get_state(&mut self, body: Rid, state: BodyState) -> Variant = "_body_get_state";
        fn body_apply_central_impulse(&mut self, body: Rid, impulse: Vector3)
            = "_body_apply_central_impulse";
        fn body_apply_impulse(&mut self, body: Rid, impulse: Vector3, position: Vector3)
            = "_body_apply_impulse";
        fn body_apply_torque_impulse(&mut self, body: Rid, impulse: Vector3)
            = "_body_apply_torque_impulse";
        fn body_apply_central_force(&mut self, body: Rid, force: Vector3)
            = "_body_apply_central_force";
        fn body_apply_force(&mut self, body: Rid, force: Vector3, position: Vector3)
            = "_body_apply_force";
        fn body_apply_torque(&mut self, body: Rid, torque: Vector3) = "_body_apply_torque";
        fn body_add_constant_central_force(&mut self, body: Rid, force: Vector3)
            = "_body_add_constant_central_force";
        fn body_add_constant_force(&mut self, body: Rid, force: Vector3, position: Vector3)
            = "_body_add_constant_force";
        fn body_add_constant_torque(&mut self, body: Rid, torque: Vector3)
            = "_body_add_constant_torque";
        fn body_set_constant_force(&mut self, body: Rid, force: Vector3)
            = "_body_set_constant_force";
        fn body_get_constant_force(&mut self, body: Rid) -> Vector3 = "_body_get_constant_force";
        fn body_set_constant_torque(&mut self, body: Rid, torque: Vector3)
            = "_body_set_constant_torque";
        fn body_get_constant_torque(&mut self, body: Rid) -> Vector3
            = "_body_get_constant_torque";
        fn body_set_axis_velocity(&mut self, body: Rid, axis_velocity: Vector3)
            = "_body_set_axis_velocity";
        fn body_set_axis_lock(&mut self, body: Rid, axis: BodyAxis, lock: bool)
            = "_body_set_axis_lock";
        fn body_is_axis_locked(&mut self, body: Rid, axis: BodyAxis) -> bool
            = "_body_is_axis_locked";
        fn body_add_collision_exception(&mut self, body: Rid, excepted_body: Rid)
            = "_body_add_collision_exception";
        fn body_remove_collision_exception(&mut self, body: Rid, excepted_body: Rid)
            = "_body_remove_collision_exception";
        fn body_get_collision_exceptions(&mut self, body: Rid) -> Array
            = "_body_get_collision_exceptions";
        fn body_set_max_contacts_reported(&mut self, body: Rid, amount: i32)
            = "_body_set_max_contacts_reported";
        fn body_get_max_contacts_reported(&mut self, body: Rid) -> i32
            = "_body_get_max_contacts_reported";
        fn body_set_contacts_reported_depth_threshold(&mut self, body: Rid, threshold: f64)
            = "_body_set_contacts_reported_depth_threshold";
        fn body_get_contacts_reported_depth_threshold(&mut self, body: Rid) -> f64
            = "_body_get_contacts_reported_depth_threshold";
        fn body_set_omit_force_integration(&mut self, body: Rid, enable: bool)
            = "_body_set_omit_force_integration";
        fn body_is_omitting_force_integration(&mut self, body: Rid) -> bool
            = "_body_is_omitting_force_integration";
        fn body_set_state_sync_callback(&mut self, body: Rid, callable: Callable)
            = "_body_set_state_sync_callback";
        fn body_set_force_integration_callback(
            &mut self,
            body: Rid,
            callable: Callable,
            userdata: Variant,
        ) = "_body_set_force_integration_callback";
        fn body_set_ray_pickable(&mut self, body: Rid, enable: bool) = "_body_set_ray_pickable";
        /// `result` points at the host's motion-result struct, or is null.
        fn body_test_motion(
            &mut self,
            body: Rid,
            from: Transform3D,
            motion: Vector3,
            margin: f64,
            max_collisions: i32,
            collide_separation_ray: bool,
            recovery_as_collision: bool,
            result: *mut c_void,
        ) -> bool = "_body_test_motion";
        fn body_get_direct_state(&mut self, body: Rid) -> Option<PhysicsDirectBodyState3D>
            = "_body_get_direct_state";

        // Soft bodies
        fn soft_body_create(&mut self) -> Rid = "_soft_body_create";
        fn soft_body_update_rendering_server(
            &mut self,
            body: Rid,
            rendering_server_handler: Option<ObjectRef>,
        ) = "_soft_body_update_rendering_server";
        fn soft_body_set_space(&mut self, body: Rid, space: Rid) = "_soft_body_set_space";
        fn soft_body_get_space(&mut self, body: Rid) -> Rid = "_soft_body_get_space";
        fn soft_body_set_ray_pickable(&mut self, body: Rid, enable: bool)
            = "_soft_body_set_ray_pickable";
        fn soft_body_set_collision_layer(&mut self, body: Rid, layer: u32)
            = "_soft_body_set_collision_layer";
        fn soft_body_get_collision_layer(&mut self, body: Rid) -> u32
            = "_soft_body_get_collision_layer";
        fn soft_body_set_collision_mask(&mut self, body: Rid, mask: u32)
            = "_soft_body_set_collision_mask";
        fn soft_body_get_collision_mask(&mut self, body: Rid) -> u32
            = "_soft_body_get_collision_mask";
        fn soft_body_add_collision_exception(&mut self, body: Rid, body_b: Rid)
            = "_soft_body_add_collision_exception";
        fn soft_body_remove_collision_exception(&mut self, body: Rid, body_b: Rid)
            = "_soft_body_remove_collision_exception";
        fn soft_body_get_collision_exceptions(&mut self, body: Rid) -> Array
            = "_soft_body_get_collision_exceptions";
        fn soft_body_set_state(&mut self, body: Rid, state: BodyState, variant: Variant)
            = "_soft_body_set_state";
        fn soft_body_get_state(&mut self, body: Rid, state: BodyState) -> Variant
            = "_soft_body_get_state";
        fn soft_body_set_transform(&mut self, body: Rid, transform: Transform3D)
            = "_soft_body_set_transform";
        fn soft_body_set_simulation_precision(&mut self, body: Rid, simulation_precision: i32)
            = "_soft_body_set_simulation_precision";
        fn soft_body_get_simulation_precision(&mut self, body: Rid) -> i32
            = "_soft_body_get_simulation_precision";
        fn soft_body_set_total_mass(&mut self, body: Rid, total_mass: f64)
            = "_soft_body_set_total_mass";
        fn soft_body_get_total_mass(&mut self, body: Rid) -> f64 = "_soft_body_get_total_mass";
        fn soft_body_set_linear_stiffness(&mut self, body: Rid, linear_stiffness: f64)
            = "_soft_body_set_linear_stiffness";
        fn soft_body_get_linear_stiffness(&mut self, body: Rid) -> f64
            = "_soft_body_get_linear_stiffness";
        fn soft_body_set_pressure_coefficient(&mut self, body: Rid, pressure_coefficient: f64)
            = "_soft_body_set_pressure_coefficient";
        fn soft_body_get_pressure_coefficient(&mut self, body: Rid) -> f64
            = "_soft_body_get_pressure_coefficient";
        fn soft_body_set_damping_coefficient(&mut self, body: Rid, damping_coefficient: f64)
            = "_soft_body_set_damping_coefficient";
        fn soft_body_get_damping_coefficient(&mut self, body: Rid) -> f64
            = "_soft_body_get_damping_coefficient";
        fn soft_body_set_drag_coefficient(&mut self, body: Rid, drag_coefficient: f64)
            = "_soft_body_set_drag_coefficient";
        fn soft_body_get_drag_coefficient(&mut self, body: Rid) -> f64
            = "_soft_body_get_drag_coefficient";
        fn soft_body_set_mesh(&mut self, body: Rid, mesh: Rid) = "_soft_body_set_mesh";
        fn soft_body_get_bounds(&mut self, body: Rid) -> Aabb = "_soft_body_get_bounds";
        fn soft_body_move_point(&mut self, body: Rid, point_index: i32, global_position: Vector3)
            = "_soft_body_move_point";
        fn soft_body_get_point_global_position(&mut self, body: Rid, point_index: i32) -> Vector3
            = "_soft_body_get_point_global_position";
        fn soft_body_remove_all_pinned_points(&mut self, body: Rid)
            = "_soft_body_remove_all_pinned_points";
        fn soft_body_pin_point(&mut self, body: Rid, point_index: i32, pin: bool)
            = "_soft_body_pin_point";
        fn soft_body_is_point_pinned(&mut self, body: Rid, point_index: i32) -> bool
            = "_soft_body_is_point_pinned";

        // Joints
        fn joint_create(&mut self) -> Rid = "_joint_create";
        fn joint_clear(&mut self, joint: Rid) = "_joint_clear";
        fn joint_make_pin(
            &mut self,
            joint: Rid,
            body_a: Rid,
            local_a: Vector3,
            body_b: Rid,
            local_b: Vector3,
        ) = "_joint_make_pin";
        fn pin_joint_set_param(&mut self, joint: Rid, param: PinJointParam, value: f64)
            = "_pin_joint_set_param";
        fn pin_joint_get_param(&mut self, joint: Rid, param: PinJointParam) -> f64
            = "_pin_joint_get_param";
        fn pin_joint_set_local_a(&mut self, joint: Rid, local_a: Vector3)
            = "_pin_joint_set_local_a";
        fn pin_joint_get_local_a(&mut self, joint: Rid) -> Vector3 = "_pin_joint_get_local_a";
        fn pin_joint_set_local_b(&mut self, joint: Rid, local_b: Vector3)
            = "_pin_joint_set_local_b";
        fn pin_joint_get_local_b(&mut self, joint: Rid) -> Vector3 = "_pin_joint_get_local_b";
        fn joint_make_hinge(
            &mut self,
            joint: Rid,
            body_a: Rid,
            hinge_a: Transform3D,
            body_b: Rid,
            hinge_b: Transform3D,
        ) = "_joint_make_hinge";
        fn joint_make_hinge_simple(
            &mut self,
            joint: Rid,
            body_a: Rid,
            pivot_a: Vector3,
            axis_a: Vector3,
            body_b: Rid,
            pivot_b: Vector3,
            axis_b: Vector3,
        ) = "_joint_make_hinge_simple";
        fn hinge_joint_set_param(&mut self, joint: Rid, param: HingeJointParam, value: f64)
            = "_hinge_joint_set_param";
        fn hinge_joint_get_param(&mut self, joint: Rid, param: HingeJointParam) -> f64
            = "_hinge_joint_get_param";
        fn hinge_joint_set_flag(&mut self, joint: Rid, flag: HingeJointFlag, enabled: bool)
            = "_hinge_joint_set_flag";
        fn hinge_joint_get_flag(&mut self, joint: Rid, flag: HingeJointFlag) -> bool
            = "_hinge_joint_get_flag";
        fn joint_make_slider(
            &mut self,
            joint: Rid,
            body_a: Rid,
            local_ref_a: Transform3D,
            body_b: Rid,
            local_ref_b: Transform3D,
        ) = "_joint_make_slider";
        fn slider_joint_set_param(&mut self, joint: Rid, param: SliderJointParam, value: f64)
            = "_slider_joint_set_param";
        fn slider_joint_get_param(&mut self, joint: Rid, param: SliderJointParam) -> f64
            = "_slider_joint_get_param";
        fn joint_make_cone_twist(
            &mut self,
            joint: Rid,
            body_a: Rid,
            local_ref_a: Transform3D,
            body_b: Rid,
            local_ref_b: Transform3D,
        ) = "_joint_make_cone_twist";
        fn cone_twist_joint_set_param(&mut self, joint: Rid, param: ConeTwistJointParam, value: f64)
            = "_cone_twist_joint_set_param";
        fn cone_twist_joint_get_param(&mut self, joint: Rid, param: ConeTwistJointParam) -> f64
            = "_cone_twist_joint_get_param";
        fn joint_make_generic_6dof(
            &mut self,
            joint: Rid,
            body_a: Rid,
            local_ref_a: Transform3D,
            body_b: Rid,
            local_ref_b: Transform3D,
        ) = "_joint_make_generic_6dof";
        fn generic_6dof_joint_set_param(
            &mut self,
            joint: Rid,
            axis: Vector3Axis,
            param: G6dofJointAxisParam,
            value: f64,
        ) = "_generic_6dof_joint_set_param";
        fn generic_6dof_joint_get_param(
            &mut self,
            joint: Rid,
            axis: Vector3Axis,
            param: G6dofJointAxisParam,
        ) -> f64 = "_generic_6dof_joint_get_param";
        fn generic_6dof_joint_set_flag(
            &mut self,
            joint: Rid,
            axis: Vector3Axis,
            flag: G6dofJointAxisFlag,
            enable: bool,
        ) = "_generic_6dof_joint_set_flag";
        fn generic_6dof_joint_get_flag(
            &mut self,
            joint: Rid,
            axis: Vector3Axis,
            flag: G6dofJointAxisFlag,
        ) -> bool = "_generic_6dof_joint_get_flag";
        fn joint_get_type(&mut self, joint: Rid) -> JointType = "_joint_get_type";
        fn joint_set_solver_priority(&mut self, joint: Rid, priority: i32)
            = "_joint_set_solver_priority";
        fn joint_get_solver_priority(&mut self, joint: Rid) -> i32
            = "_joint_get_solver_priority";
        fn joint_disable_collisions_between_bodies(&mut self, joint: Rid, disable: bool)
            = "_joint_disable_collisions_between_bodies";
        fn joint_is_disabled_collisions_between_bodies(&mut self, joint: Rid) -> bool
            = "_joint_is_disabled_collisions_between_bodies";

        // Lifecycle
        fn free_rid(&mut self, rid: Rid) = "_free_rid";
        fn set_active(&mut self, active: bool) = "_set_active";
        /// Called once before the first step.
        fn initialize(&mut self) = "_init";
        fn step(&mut self, step: f64) = "_step";
        fn sync(&mut self) = "_sync";
        fn flush_queries(&mut self) = "_flush_queries";
        fn end_sync(&mut self) = "_end_sync";
        /// Called once at shutdown.
        fn finish(&mut self) = "_finish";
        fn is_flushing_queries(&mut self) -> bool = "_is_flushing_queries";
        fn get_process_info(&mut self, process_info: ProcessInfo) -> i64 = "_get_process_info";
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_names() {
        let names = PhysicsServer3DExtension::VIRTUAL_NAMES;
        assert!(names.len() > 160);
        assert!(names.contains(&"_step"));
        assert!(names.contains(&"_body_test_motion"));
        let mut sorted = names.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
    }

    #[test]
    fn test_enum_ordinals() {
        assert_eq!(ShapeType::BOX.ord(), 3);
        assert_eq!(JointType::TYPE_6DOF.ord(), 4);
        assert_eq!(
            (BodyAxis::LINEAR_X | BodyAxis::ANGULAR_Z).ord(),
            1 | 32
        );
        assert_eq!(G6dofJointAxisParam::ANGULAR_SPRING_EQUILIBRIUM_POINT.ord(), 21);
    }
}
