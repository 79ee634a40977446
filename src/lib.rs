//! Calling-convention layer for compiled closures.
//!
//! Compiled entry points take up to three arguments in fixed slots and reach the rest
//! through an argument cursor laid out like the platform's variadic register-save
//! record. Extra return values travel through a per-thread multiple-value channel.

pub mod callconv;
pub mod gc;
pub mod runtime;
pub mod vm;

pub mod prelude {
    pub use crate::callconv::{
        apply_va_list, invoke, invoke0, invoke1, invoke2, invoke3, invoke_frame,
        invoke_general, invoke_thunk, Arguments, Arity, CallArgs, EntryPoint, Frame,
        ReturnValue, VaList,
    };
    pub use crate::gc::{Trace, Visitor};
    pub use crate::runtime::{
        object::Closure,
        value::{Decoded, Value},
    };
    pub use crate::vm::{enter, thread::Thread, values::MultipleValues};
}
