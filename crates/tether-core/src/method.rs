//! Guest-to-host method calls.

use bytemuck::Zeroable;

use crate::bridge::FromHost;
use crate::builtin::ObjectRef;
use crate::frame::CallFrame;

/// Call `class::method` on `object`.
///
/// `build` appends the arguments. The frame is released before the result
/// is decoded. A freed object or an unresolvable method yields `R`'s zero
/// value; the cause is logged.
pub fn ptrcall<R: FromHost>(
    object: &ObjectRef,
    class: &'static str,
    method: &'static str,
    hash: i64,
    build: impl FnOnce(&mut CallFrame<'_>),
) -> R {
    let rt = object.runtime();
    let Some(ptr) = object.ptr() else {
        return R::from_owned(Zeroable::zeroed(), rt);
    };
    let bind = match rt.method_bind(class, method, hash) {
        Ok(bind) => bind,
        Err(err) => {
            log::error!("{}", err);
            return R::from_owned(Zeroable::zeroed(), rt);
        }
    };

    let wire = {
        let mut frame = CallFrame::new(rt);
        build(&mut frame);
        frame.call::<R::Wire>(bind, ptr)
    };
    R::from_owned(wire, rt)
}
