//! Tether Classes - host class façades
//!
//! Each module binds one host class: its instance methods, its overrideable
//! interface and its enums, all generated by the `tether-core` macros.

mod physics_server_3d_extension;
mod tree;

pub use physics_server_3d_extension::{
    AreaParameter, AreaSpaceOverrideMode, BodyAxis, BodyDampMode, BodyMode, BodyParameter,
    BodyState, ConeTwistJointParam, G6dofJointAxisFlag, G6dofJointAxisParam, HingeJointFlag,
    HingeJointParam, IPhysicsServer3DExtension, JointType, PhysicsDirectBodyState3D,
    PhysicsDirectSpaceState3D, PhysicsServer3DExtension, PinJointParam, ProcessInfo, ShapeType,
    SliderJointParam, SpaceParameter, Vector3Axis,
};
pub use tree::{DropModeFlags, ITree, SelectMode, Tree, TreeItem};
