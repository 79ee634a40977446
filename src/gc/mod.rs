//! Root enumeration for argument-holding memory.
//!
//! A collector stops every mutator at a safepoint and then asks each region that can
//! hold tagged references (register-save records, overflow areas, frames, value
//! channels) to report the heap references it currently holds.

use crate::runtime::value::Value;

pub trait Visitor {
    fn visit(&mut self, value: Value);

    /// Reports every heap reference in `slots`. Immediates and the nothing
    /// marker are skipped.
    fn visit_slice(&mut self, slots: &[Value]) {
        for &slot in slots {
            if slot.is_object() {
                self.visit(slot);
            }
        }
    }
}

impl<F: FnMut(Value)> Visitor for F {
    fn visit(&mut self, value: Value) {
        self(value)
    }
}

pub trait Trace {
    fn trace(&self, visitor: &mut dyn Visitor);
}

/// Collects every reference reported by `root`.
pub fn collect_roots<T: Trace + ?Sized>(root: &T) -> Vec<Value> {
    let mut roots = Vec::new();
    root.trace(&mut |value: Value| roots.push(value));
    roots
}
