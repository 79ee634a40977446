//! The closure calling convention.
//!
//! Every compiled entry point has the same shape: the execution context, the closure
//! being invoked, an optional argument cursor, the argument count and three fixed
//! argument slots. The first three arguments always arrive in the fixed slots;
//! anything past them is reached through the cursor. Unused fixed slots hold
//! [`Value::NOTHING`].

use std::iter::FusedIterator;

use crate::{
    runtime::{object::Closure, value::Value},
    vm::{thread::Thread, values::MultipleValues},
};

pub mod arch;
pub mod dispatch;
pub mod frame;
pub mod valist;

pub use arch::{RegisterSaveArea, ARGS_IN_REGISTERS};
pub use dispatch::*;
pub use frame::Frame;
pub use valist::VaList;

pub type EntryPoint = fn(
    thread: &mut Thread,
    closure: &Closure,
    arglist: Option<&mut VaList<'_>>,
    nargs: usize,
    arg0: Value,
    arg1: Value,
    arg2: Value,
) -> ReturnValue;

/// What an entry point hands back: the primary value plus the number of values
/// produced. When `nvals > 1` every value, the primary included, is waiting in the
/// thread's multiple-value channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct ReturnValue {
    pub value: Value,
    pub nvals: usize,
}

impl ReturnValue {
    #[inline(always)]
    pub const fn single(value: Value) -> Self {
        Self { value, nvals: 1 }
    }

    #[inline(always)]
    pub const fn none() -> Self {
        Self {
            value: Value::NIL,
            nvals: 0,
        }
    }
}

/// Callee-side view of the incoming arguments.
pub struct CallArgs<'c, 'a> {
    arglist: Option<&'c mut VaList<'a>>,
    nargs: usize,
    fixed: [Value; ARGS_IN_REGISTERS],
}

impl<'c, 'a> CallArgs<'c, 'a> {
    #[inline(always)]
    pub fn new(
        arglist: Option<&'c mut VaList<'a>>,
        nargs: usize,
        arg0: Value,
        arg1: Value,
        arg2: Value,
    ) -> Self {
        Self {
            arglist,
            nargs,
            fixed: [arg0, arg1, arg2],
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nargs
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nargs == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Value {
        debug_assert!(index < self.nargs, "argument {index} of {}", self.nargs);
        if index < ARGS_IN_REGISTERS {
            return self.fixed[index];
        }

        match &self.arglist {
            Some(arglist) => arglist.at(index),
            None => panic!("argument {index} requested but the call carried no cursor"),
        }
    }

    pub fn iter(&self) -> CallArgsIter<'_, 'c, 'a> {
        CallArgsIter {
            args: self,
            index: 0,
        }
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().collect()
    }

    /// Copies the passed arguments into `buffer`.
    pub fn copy_into(&self, buffer: &mut MultipleValues) {
        buffer.set_size(self.nargs);
        for i in 0..self.nargs {
            buffer.set(i, self.get(i));
        }
    }

    /// Copies the passed arguments into the thread's call-arguments buffer and
    /// returns them from there.
    pub fn copy_to_call_args<'t>(&self, thread: &'t mut Thread) -> &'t [Value] {
        self.copy_into(thread.call_args_mut());
        thread.call_args().as_slice()
    }

    /// Runs `f` with a cursor over the arguments. A call that came through a fast path
    /// carries no cursor; its register arguments are spilled into a record on this
    /// stack frame instead.
    pub fn with_va_list<R>(self, closure: &Closure, f: impl FnOnce(&mut VaList<'_>) -> R) -> R {
        match self.arglist {
            Some(arglist) => f(arglist),
            None => {
                debug_assert!(!Arity::of(self.nargs).needs_cursor());
                let mut save = RegisterSaveArea::new();
                let mut arglist = VaList::from_registers(
                    &mut save,
                    &[],
                    closure.as_value(),
                    self.nargs,
                    self.fixed,
                );
                f(&mut arglist)
            }
        }
    }
}

/// Iterator over the arguments of a [`CallArgs`].
pub struct CallArgsIter<'s, 'c, 'a> {
    args: &'s CallArgs<'c, 'a>,
    index: usize,
}

impl Iterator for CallArgsIter<'_, '_, '_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        if self.index < self.args.nargs {
            let value = self.args.get(self.index);
            self.index += 1;
            Some(value)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.args.nargs - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for CallArgsIter<'_, '_, '_> {}
impl FusedIterator for CallArgsIter<'_, '_, '_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixnums(n: usize) -> Vec<Value> {
        (0..n as i64).map(|i| Value::fixnum(100 + i)).collect()
    }

    fn noop(
        _: &mut Thread,
        _: &Closure,
        _: Option<&mut VaList<'_>>,
        _: usize,
        _: Value,
        _: Value,
        _: Value,
    ) -> ReturnValue {
        ReturnValue::none()
    }

    #[test]
    fn fixed_slots_without_cursor() {
        let args = CallArgs::new(None, 2, Value::TRUE, Value::FALSE, Value::NOTHING);
        assert_eq!(args.len(), 2);
        assert_eq!(args.to_vec(), vec![Value::TRUE, Value::FALSE]);
    }

    #[test]
    fn past_fixed_slots_reads_cursor() {
        let values = fixnums(5);
        let mut save = RegisterSaveArea::new();
        let mut va = VaList::from_registers(
            &mut save,
            &values[3..],
            Value::NIL,
            5,
            [values[0], values[1], values[2]],
        );
        let args = CallArgs::new(Some(&mut va), 5, values[0], values[1], values[2]);
        assert_eq!(args.to_vec(), values);

        let mut buffer = MultipleValues::new();
        args.copy_into(&mut buffer);
        assert_eq!(buffer.as_slice(), &values[..]);
    }

    #[test]
    fn iter_reports_exact_length() {
        let values = fixnums(4);
        let mut save = RegisterSaveArea::new();
        let mut va = VaList::from_registers(
            &mut save,
            &values[3..],
            Value::NIL,
            4,
            [values[0], values[1], values[2]],
        );
        let args = CallArgs::new(Some(&mut va), 4, values[0], values[1], values[2]);
        let mut iter = args.iter();
        assert_eq!(iter.len(), 4);
        iter.next();
        assert_eq!(iter.len(), 3);
        assert_eq!(iter.collect::<Vec<_>>(), values[1..]);
    }

    #[test]
    fn copy_to_call_args_fills_thread_buffer() {
        let mut thread = Thread::new();
        let args = CallArgs::new(None, 2, Value::TRUE, Value::fixnum(9), Value::NOTHING);
        assert_eq!(args.copy_to_call_args(&mut thread), &[Value::TRUE, Value::fixnum(9)]);
        assert_eq!(thread.call_args().size(), 2);
        assert_eq!(thread.multiple_values().size(), 0);
    }

    #[test]
    fn with_va_list_spills_fast_path_arguments() {
        let closure = Closure::new("noop", noop, vec![]);
        let args = CallArgs::new(None, 3, Value::fixnum(1), Value::fixnum(2), Value::fixnum(3));
        let seen = args.with_va_list(&closure, |va| {
            assert_eq!(va.closure(), closure.as_value());
            va.to_vec()
        });
        assert_eq!(seen, vec![Value::fixnum(1), Value::fixnum(2), Value::fixnum(3)]);
    }

    #[test]
    fn return_value_constructors() {
        assert_eq!(ReturnValue::single(Value::TRUE).nvals, 1);
        assert_eq!(ReturnValue::none(), ReturnValue { value: Value::NIL, nvals: 0 });
    }
}
