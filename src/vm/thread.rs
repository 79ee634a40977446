use std::{
    panic::AssertUnwindSafe,
    sync::atomic::{AtomicU64, Ordering},
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::{
    callconv::{Arguments, ReturnValue},
    gc::{Trace, Visitor},
    runtime::{object::Closure, value::Value},
};

use super::values::MultipleValues;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

/// An execution context: one logical call stack and the per-stack channels the
/// calling convention needs.
pub struct Thread {
    id: u64,
    multiple_values: MultipleValues,
    call_args: MultipleValues,
}

impl Thread {
    pub fn new() -> Self {
        Self {
            id: NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed),
            multiple_values: MultipleValues::new(),
            call_args: MultipleValues::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline(always)]
    pub fn multiple_values(&self) -> &MultipleValues {
        &self.multiple_values
    }

    #[inline(always)]
    pub fn multiple_values_mut(&mut self) -> &mut MultipleValues {
        &mut self.multiple_values
    }

    pub fn call_args(&self) -> &MultipleValues {
        &self.call_args
    }

    pub fn call_args_mut(&mut self) -> &mut MultipleValues {
        &mut self.call_args
    }

    /// Returns `values` from the running entry point: all of them go into the
    /// multiple-value channel and the first one becomes the primary value.
    #[inline]
    pub fn values(&mut self, values: &[Value]) -> ReturnValue {
        self.multiple_values.load(values);
        ReturnValue {
            value: values.first().copied().unwrap_or(Value::NIL),
            nvals: values.len(),
        }
    }

    #[inline(always)]
    pub fn call<A: Arguments>(&mut self, closure: &Closure, args: A) -> ReturnValue {
        log::trace!(target: "lcc-call", "{}: {:?} call", closure.name(), args.arity());
        args.invoke(self, closure)
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

impl Trace for Thread {
    fn trace(&self, visitor: &mut dyn Visitor) {
        self.multiple_values.trace(visitor);
        self.call_args.trace(visitor);
    }
}

pub struct Threads {
    threads: Mutex<Vec<*mut Thread>>,
}

impl Threads {
    pub fn new() -> Self {
        Self {
            threads: Mutex::new(vec![]),
        }
    }

    pub fn add_thread(&self, thread: *mut Thread) {
        self.threads.lock().push(thread);
    }

    pub fn remove_thread(&self, thread: *mut Thread) {
        self.threads.lock().retain(|th| *th != thread);
    }

    pub fn num(&self) -> usize {
        self.threads.lock().len()
    }

    /// Enumerates the roots of every registered thread.
    ///
    /// # Safety
    ///
    /// Every registered thread must be stopped at a safepoint for the duration of
    /// the call.
    pub unsafe fn trace_all(&self, visitor: &mut dyn Visitor) {
        let threads = self.threads.lock();
        for thread in threads.iter() {
            (**thread).trace(visitor);
        }
    }
}

impl Default for Threads {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Sync for Threads {}
unsafe impl Send for Threads {}

static THREADS: Lazy<Threads> = Lazy::new(Threads::new);

pub fn threads() -> &'static Threads {
    &THREADS
}

/// Runs `f` inside a fresh execution context registered with the thread list. The
/// context is deregistered even if `f` panics.
pub fn enter<F, R>(f: F) -> R
where
    F: FnOnce(&mut Thread) -> R,
{
    let mut thread = Thread::new();
    let id = thread.id;
    let raw = &mut thread as *mut Thread;
    threads().add_thread(raw);
    log::debug!(target: "lcc-thread", "thread #{} entered", id);

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| f(&mut thread)));

    threads().remove_thread(raw);
    log::debug!(target: "lcc-thread", "thread #{} left", id);

    match result {
        Ok(result) => result,
        Err(err) => std::panic::resume_unwind(err),
    }
}
