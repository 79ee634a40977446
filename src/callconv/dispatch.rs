use crate::{
    runtime::{object::Closure, value::Value},
    vm::thread::Thread,
};

use super::{
    arch::{RegisterSaveArea, ARGS_IN_REGISTERS},
    frame::Frame,
    valist::VaList,
    ReturnValue,
};

/// Upper bound on the number of arguments a single call may pass.
pub const CALL_ARGUMENTS_LIMIT: usize = 64;

/// The invocation paths a call site can take.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arity {
    Zero,
    One,
    Two,
    Three,
    /// More arguments than fixed slots; the tail goes through a cursor.
    Many,
}

impl Arity {
    #[inline(always)]
    pub const fn of(nargs: usize) -> Self {
        match nargs {
            0 => Arity::Zero,
            1 => Arity::One,
            2 => Arity::Two,
            3 => Arity::Three,
            _ => Arity::Many,
        }
    }

    /// Arguments this path passes in fixed slots.
    pub const fn fixed_count(self) -> usize {
        match self {
            Arity::Zero => 0,
            Arity::One => 1,
            Arity::Two => 2,
            Arity::Three | Arity::Many => ARGS_IN_REGISTERS,
        }
    }

    pub const fn needs_cursor(self) -> bool {
        matches!(self, Arity::Many)
    }
}

#[inline(always)]
pub fn invoke0(thread: &mut Thread, closure: &Closure) -> ReturnValue {
    (closure.entry())(
        thread,
        closure,
        None,
        0,
        Value::NOTHING,
        Value::NOTHING,
        Value::NOTHING,
    )
}

#[inline(always)]
pub fn invoke1(thread: &mut Thread, closure: &Closure, a0: Value) -> ReturnValue {
    (closure.entry())(thread, closure, None, 1, a0, Value::NOTHING, Value::NOTHING)
}

#[inline(always)]
pub fn invoke2(thread: &mut Thread, closure: &Closure, a0: Value, a1: Value) -> ReturnValue {
    (closure.entry())(thread, closure, None, 2, a0, a1, Value::NOTHING)
}

#[inline(always)]
pub fn invoke3(
    thread: &mut Thread,
    closure: &Closure,
    a0: Value,
    a1: Value,
    a2: Value,
) -> ReturnValue {
    (closure.entry())(thread, closure, None, 3, a0, a1, a2)
}

/// Calls through the cursor path regardless of the argument count. The first three
/// arguments are spilled into a register-save record on this stack frame and the rest
/// of `args` serves as the overflow area, so no argument is copied to the heap.
pub fn invoke_general(thread: &mut Thread, closure: &Closure, args: &[Value]) -> ReturnValue {
    debug_assert!(
        args.len() <= CALL_ARGUMENTS_LIMIT,
        "{} arguments exceed the call limit",
        args.len()
    );
    let mut fixed = [Value::NOTHING; ARGS_IN_REGISTERS];
    let split = Arity::of(args.len()).fixed_count();
    fixed[..split].copy_from_slice(&args[..split]);
    let overflow = &args[split..];

    let mut save = RegisterSaveArea::new();
    let mut arglist =
        VaList::from_registers(&mut save, overflow, closure.as_value(), args.len(), fixed);
    log::trace!(target: "lcc-call", "{}: {} arguments through cursor", closure.name(), args.len());

    (closure.entry())(
        thread,
        closure,
        Some(&mut arglist),
        args.len(),
        fixed[0],
        fixed[1],
        fixed[2],
    )
}

/// Picks the cheapest path for `args.len()`.
#[inline]
pub fn invoke(thread: &mut Thread, closure: &Closure, args: &[Value]) -> ReturnValue {
    match Arity::of(args.len()) {
        Arity::Zero => invoke0(thread, closure),
        Arity::One => invoke1(thread, closure, args[0]),
        Arity::Two => invoke2(thread, closure, args[0], args[1]),
        Arity::Three => invoke3(thread, closure, args[0], args[1], args[2]),
        Arity::Many => invoke_general(thread, closure, args),
    }
}

/// Calls `closure` with no arguments but with a cursor that carries the closure, for
/// callees that always expect one.
pub fn invoke_thunk(thread: &mut Thread, closure: &Closure) -> ReturnValue {
    let mut save = RegisterSaveArea::new();
    let mut arglist = VaList::from_registers(
        &mut save,
        &[],
        closure.as_value(),
        0,
        [Value::NOTHING; ARGS_IN_REGISTERS],
    );

    (closure.entry())(
        thread,
        closure,
        Some(&mut arglist),
        0,
        Value::NOTHING,
        Value::NOTHING,
        Value::NOTHING,
    )
}

/// Calls `closure` with the arguments already materialized in `frame`. The cursor is
/// mapped onto the frame's own storage.
pub fn invoke_frame(thread: &mut Thread, closure: &Closure, frame: &mut Frame) -> ReturnValue {
    let nargs = frame.len();
    debug_assert!(nargs <= CALL_ARGUMENTS_LIMIT);
    let fixed = frame.fixed_arguments();
    let mut arglist = VaList::from_frame(frame, closure.as_value());
    log::trace!(target: "lcc-call", "{}: {} arguments from frame", closure.name(), nargs);

    (closure.entry())(
        thread,
        closure,
        Some(&mut arglist),
        nargs,
        fixed[0],
        fixed[1],
        fixed[2],
    )
}

/// Re-dispatches the remaining arguments of `args` to `closure`.
pub fn apply_va_list(thread: &mut Thread, closure: &Closure, args: &mut VaList<'_>) -> ReturnValue {
    let nargs = args.remaining_count();
    let fixed = args.fixed_arguments();
    let mut arglist = args.forward(closure.as_value());
    log::trace!(target: "lcc-call", "{}: applying {} arguments", closure.name(), nargs);

    (closure.entry())(
        thread,
        closure,
        Some(&mut arglist),
        nargs,
        fixed[0],
        fixed[1],
        fixed[2],
    )
}

/// Argument shapes a call site can hand to [`Thread::call`]. Tuples select a fixed
/// fast path at compile time.
pub trait Arguments {
    fn arity(&self) -> Arity;

    fn invoke(self, thread: &mut Thread, closure: &Closure) -> ReturnValue;
}

impl Arguments for () {
    fn arity(&self) -> Arity {
        Arity::Zero
    }

    #[inline(always)]
    fn invoke(self, thread: &mut Thread, closure: &Closure) -> ReturnValue {
        invoke0(thread, closure)
    }
}

impl Arguments for (Value,) {
    fn arity(&self) -> Arity {
        Arity::One
    }

    #[inline(always)]
    fn invoke(self, thread: &mut Thread, closure: &Closure) -> ReturnValue {
        invoke1(thread, closure, self.0)
    }
}

impl Arguments for (Value, Value) {
    fn arity(&self) -> Arity {
        Arity::Two
    }

    #[inline(always)]
    fn invoke(self, thread: &mut Thread, closure: &Closure) -> ReturnValue {
        invoke2(thread, closure, self.0, self.1)
    }
}

impl Arguments for (Value, Value, Value) {
    fn arity(&self) -> Arity {
        Arity::Three
    }

    #[inline(always)]
    fn invoke(self, thread: &mut Thread, closure: &Closure) -> ReturnValue {
        invoke3(thread, closure, self.0, self.1, self.2)
    }
}

impl Arguments for &[Value] {
    fn arity(&self) -> Arity {
        Arity::of(self.len())
    }

    fn invoke(self, thread: &mut Thread, closure: &Closure) -> ReturnValue {
        invoke(thread, closure, self)
    }
}

impl<const N: usize> Arguments for [Value; N] {
    fn arity(&self) -> Arity {
        Arity::of(N)
    }

    fn invoke(self, thread: &mut Thread, closure: &Closure) -> ReturnValue {
        invoke(thread, closure, &self)
    }
}

impl Arguments for &mut Frame {
    fn arity(&self) -> Arity {
        Arity::of(self.len())
    }

    fn invoke(self, thread: &mut Thread, closure: &Closure) -> ReturnValue {
        invoke_frame(thread, closure, self)
    }
}
