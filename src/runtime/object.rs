use std::{fmt, ptr::NonNull};

use crate::{
    callconv::EntryPoint,
    gc::{Trace, Visitor},
};

use super::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectKind {
    Closure,
}

/// Header shared by every heap object a [`Value`] may point to.
#[derive(Debug)]
#[repr(C, align(8))]
pub struct ObjectHeader {
    pub kind: ObjectKind,
}

/// A compiled closure: an entry point plus its captured state.
///
/// Closures are allocated by whoever owns the heap. The calling convention only
/// ever copies the reference produced by [`Closure::as_value`].
#[repr(C)]
pub struct Closure {
    header: ObjectHeader,
    entry: EntryPoint,
    name: &'static str,
    captured: Box<[Value]>,
}

impl Closure {
    pub fn new(name: &'static str, entry: EntryPoint, captured: Vec<Value>) -> Self {
        Self {
            header: ObjectHeader {
                kind: ObjectKind::Closure,
            },
            entry,
            name,
            captured: captured.into_boxed_slice(),
        }
    }

    #[inline(always)]
    pub fn entry(&self) -> EntryPoint {
        self.entry
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn captured(&self) -> &[Value] {
        &self.captured
    }

    #[inline]
    pub fn as_value(&self) -> Value {
        Value::object(NonNull::from(&self.header))
    }
}

impl Trace for Closure {
    fn trace(&self, visitor: &mut dyn Visitor) {
        visitor.visit_slice(&self.captured);
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("captured", &self.captured)
            .finish()
    }
}
