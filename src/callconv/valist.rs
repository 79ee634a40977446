use std::{fmt, iter::FusedIterator, marker::PhantomData};

use crate::{
    gc::{Trace, Visitor},
    runtime::value::Value,
};

use super::{
    arch::{RawVaList, RegisterSaveArea, ARGS_IN_REGISTERS},
    frame::Frame,
};

/// A cursor over the arguments of one call.
///
/// The cursor never owns its arguments. It reads them from a register-save record
/// and an overflow area, or from an argument [`Frame`], for the lifetime `'a`.
/// Sequential reads only move the register offset marker and the remaining count;
/// no argument is ever moved, so [`VaList::at`] and [`VaList::next`] share one index
/// space.
pub struct VaList<'a> {
    raw: RawVaList,
    remaining: usize,
    closure: Value,
    marker: PhantomData<&'a mut [Value]>,
}

impl<'a> VaList<'a> {
    /// Spills the register arguments of a call into `save` and returns a cursor over
    /// them followed by `overflow`.
    pub fn from_registers(
        save: &'a mut RegisterSaveArea,
        overflow: &'a [Value],
        closure: Value,
        nargs: usize,
        fixed: [Value; ARGS_IN_REGISTERS],
    ) -> Self {
        debug_assert!(
            nargs <= ARGS_IN_REGISTERS + overflow.len(),
            "{nargs} arguments but only {} overflow slots",
            overflow.len()
        );
        let raw = unsafe {
            RawVaList::spill(
                save.registers.as_mut_ptr(),
                overflow.as_ptr(),
                closure,
                nargs,
                fixed,
            )
        };
        debug_assert!(raw.is_at_start());

        Self {
            raw,
            remaining: nargs,
            closure,
            marker: PhantomData,
        }
    }

    /// Maps a cursor directly onto the storage of `frame`. Nothing is copied.
    pub fn from_frame(frame: &'a mut Frame, closure: Value) -> Self {
        let len = frame.len();
        let raw = unsafe { RawVaList::from_frame(frame.elements_mut_ptr(), closure, len) };
        debug_assert!(raw.is_at_start());

        Self {
            raw,
            remaining: len,
            closure,
            marker: PhantomData,
        }
    }

    /// A cursor over the trailing `remaining` arguments of this one, sharing its
    /// backing store.
    pub fn tail(&mut self, remaining: usize) -> VaList<'_> {
        debug_assert!(
            remaining <= self.remaining,
            "tail of {remaining} arguments from a cursor holding {}",
            self.remaining
        );
        let mut raw = self.raw;
        for _ in remaining..self.remaining {
            unsafe { raw.advance() };
        }

        VaList {
            raw,
            remaining,
            closure: self.closure,
            marker: PhantomData,
        }
    }

    /// A cursor over the same arguments on behalf of `closure`. The closure is written
    /// into the closure register; `self` keeps reporting its own closure.
    pub fn forward(&mut self, closure: Value) -> VaList<'_> {
        let mut raw = self.raw;
        unsafe { raw.spill_closure(closure) };

        VaList {
            raw,
            remaining: self.remaining,
            closure,
            marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn at(&self, index: usize) -> Value {
        debug_assert!(
            index < self.remaining,
            "argument index {index} out of range for {} remaining",
            self.remaining
        );
        unsafe { self.raw.indexed_arg(index) }
    }

    #[allow(clippy::should_implement_trait)]
    #[inline]
    pub fn next(&mut self) -> Value {
        let value = self.next_raw();
        self.decrement_count();
        value
    }

    /// Reads the next argument by moving only the register offset marker, like a
    /// bare `va_arg`. The remaining count is left alone until the caller settles it
    /// with [`VaList::decrement_count`].
    #[inline]
    pub fn next_raw(&mut self) -> Value {
        debug_assert!(self.remaining > 0, "read past the last argument");
        unsafe { self.raw.next_arg() }
    }

    #[inline]
    pub fn skip(&mut self) {
        debug_assert!(self.remaining > 0, "skipped past the last argument");
        unsafe { self.raw.advance() };
        self.remaining -= 1;
    }

    #[inline(always)]
    pub fn remaining_count(&self) -> usize {
        self.remaining
    }

    /// Accounts for an argument consumed from the front without going through
    /// [`VaList::skip`], i.e. after [`VaList::next_raw`].
    #[inline]
    pub fn decrement_count(&mut self) {
        debug_assert!(self.remaining > 0, "argument count underflow");
        self.remaining -= 1;
    }

    #[inline(always)]
    pub fn closure(&self) -> Value {
        self.closure
    }

    /// Argument count of the call this cursor was built for, as spilled into the
    /// nargs register.
    pub fn number_of_arguments(&self) -> usize {
        unsafe { self.raw.number_of_arguments() }
    }

    /// True while no argument has been consumed.
    pub fn is_at_start(&self) -> bool {
        self.raw.is_at_start()
    }

    /// Register-resident arguments left before reads reach the overflow area.
    pub fn registers_remaining(&self) -> usize {
        self.raw.registers_remaining().min(self.remaining)
    }

    /// The first three remaining arguments, padded with the nothing marker.
    pub fn fixed_arguments(&self) -> [Value; ARGS_IN_REGISTERS] {
        let mut fixed = [Value::NOTHING; ARGS_IN_REGISTERS];
        for (i, slot) in fixed.iter_mut().enumerate().take(self.remaining) {
            *slot = self.at(i);
        }
        fixed
    }

    pub fn iter(&self) -> Args<'_, 'a> {
        Args {
            list: self,
            index: 0,
        }
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().collect()
    }
}

impl Trace for VaList<'_> {
    fn trace(&self, visitor: &mut dyn Visitor) {
        // The closure register is scanned with the record; a forwarded record may
        // hold a different one.
        let spilled = unsafe { self.raw.closure() };
        if self.closure.is_object() && self.closure != spilled {
            visitor.visit(self.closure);
        }
        unsafe { self.raw.trace(self.remaining, visitor) }
    }
}

impl fmt::Debug for VaList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaList")
            .field("closure", &self.closure)
            .field("remaining", &self.remaining)
            .field("gp_offset", &self.raw.gp_offset)
            .field("args", &self.to_vec())
            .finish()
    }
}

/// Non-consuming iterator over the remaining arguments of a [`VaList`].
pub struct Args<'b, 'a> {
    list: &'b VaList<'a>,
    index: usize,
}

impl Iterator for Args<'_, '_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        if self.index < self.list.remaining {
            let value = self.list.at(self.index);
            self.index += 1;
            Some(value)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.list.remaining - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Args<'_, '_> {}
impl FusedIterator for Args<'_, '_> {}
