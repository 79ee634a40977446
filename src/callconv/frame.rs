use std::fmt;

use crate::{
    gc::{Trace, Visitor},
    runtime::value::Value,
};

use super::arch::{
    ARGS_IN_REGISTERS, FRAME_IDX_OVERFLOW_ARGS, FRAME_IDX_REGISTER_ARGUMENTS_START,
};

/// An owned, length-tagged block of call arguments.
///
/// The storage starts with the internal register slots (closure, rest, nargs) so that a
/// [`VaList`](super::valist::VaList) can use the frame itself as its register-save
/// record: the first three arguments land in the emulated registers and the rest in
/// the overflow area, without copying.
pub struct Frame {
    elements: Box<[Value]>,
    length: usize,
    capacity: usize,
}

impl Frame {
    pub fn new(capacity: usize) -> Self {
        let slots = (FRAME_IDX_REGISTER_ARGUMENTS_START + capacity).max(FRAME_IDX_OVERFLOW_ARGS);
        Self {
            elements: vec![Value::NOTHING; slots].into_boxed_slice(),
            length: 0,
            capacity,
        }
    }

    pub fn from_slice(args: &[Value]) -> Self {
        let mut frame = Self::new(args.len());
        frame.arguments_mut()[..args.len()].copy_from_slice(args);
        frame.length = args.len();
        frame
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&mut self, value: Value) {
        assert!(
            self.length < self.capacity(),
            "frame capacity {} exceeded",
            self.capacity()
        );
        let index = self.length;
        self.arguments_mut()[index] = value;
        self.length += 1;
    }

    #[inline]
    pub fn get(&self, index: usize) -> Value {
        self.as_slice()[index]
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: Value) {
        let length = self.length;
        self.arguments_mut()[..length][index] = value;
    }

    /// Drops every argument. Released slots go back to the nothing marker so the
    /// collector never sees stale references.
    pub fn clear(&mut self) {
        let length = self.length;
        self.arguments_mut()[..length].fill(Value::NOTHING);
        self.length = 0;
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.elements[FRAME_IDX_REGISTER_ARGUMENTS_START..][..self.length]
    }

    /// The first three arguments, padded with the nothing marker.
    pub fn fixed_arguments(&self) -> [Value; ARGS_IN_REGISTERS] {
        let args = &self.elements[FRAME_IDX_REGISTER_ARGUMENTS_START..];
        [args[0], args[1], args[2]]
    }

    fn arguments_mut(&mut self) -> &mut [Value] {
        &mut self.elements[FRAME_IDX_REGISTER_ARGUMENTS_START..]
    }

    pub(crate) fn elements_mut_ptr(&mut self) -> *mut Value {
        self.elements.as_mut_ptr()
    }
}

impl Trace for Frame {
    fn trace(&self, visitor: &mut dyn Visitor) {
        visitor.visit_slice(&self.elements[..FRAME_IDX_REGISTER_ARGUMENTS_START]);
        visitor.visit_slice(self.as_slice());
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
