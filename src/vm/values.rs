use std::fmt;

use crate::{
    gc::{Trace, Visitor},
    runtime::value::Value,
};

/// Capacity of a [`MultipleValues`] channel.
pub const MULTIPLE_VALUES_LIMIT: usize = 64;

/// Fixed-capacity buffer for values returned beyond the primary one.
///
/// Contents are only meaningful between the return of the call that filled the
/// buffer and the next call that fills it again.
pub struct MultipleValues {
    size: usize,
    values: [Value; MULTIPLE_VALUES_LIMIT],
}

impl MultipleValues {
    pub const fn new() -> Self {
        Self {
            size: 0,
            values: [Value::NOTHING; MULTIPLE_VALUES_LIMIT],
        }
    }

    pub const fn capacity(&self) -> usize {
        MULTIPLE_VALUES_LIMIT
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn set_size(&mut self, size: usize) {
        assert!(
            size <= MULTIPLE_VALUES_LIMIT,
            "{size} values exceed the multiple-value limit"
        );
        self.size = size;
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: Value) {
        debug_assert!(index < self.size, "slot {index} beyond size {}", self.size);
        self.values[index] = value;
    }

    #[inline]
    pub fn read(&self, index: usize) -> Value {
        debug_assert!(index < self.size, "slot {index} beyond size {}", self.size);
        self.values[index]
    }

    /// Sets the size to `values.len()` and fills the slots.
    pub fn load(&mut self, values: &[Value]) {
        self.set_size(values.len());
        self.values[..values.len()].copy_from_slice(values);
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values[..self.size]
    }
}

impl Default for MultipleValues {
    fn default() -> Self {
        Self::new()
    }
}

impl Trace for MultipleValues {
    fn trace(&self, visitor: &mut dyn Visitor) {
        visitor.visit_slice(self.as_slice());
    }
}

impl fmt::Debug for MultipleValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
