//! Register-save record modelled on the System V x86-64 `va_list`.
//!
//! The six integer argument registers are `%rdi, %rsi, %rdx, %rcx, %r8, %r9`. A
//! compiled entry point receives the closure, the cursor, the argument count and the
//! first three arguments in them; anything else lives in the caller's overflow area.
//! Spilling writes those registers into the record and rewinds `gp_offset` so that the
//! next sequential read yields the first logical argument.
//!
//! ```text
//!   reg_save_area                          overflow_arg_area
//!   +---------+---------+---------+        +---------+---------+-----
//!   | closure |  rest   |  nargs  |        |  arg3   |  arg4   | ...
//!   +---------+---------+---------+        +---------+---------+-----
//!   |  arg0   |  arg1   |  arg2   |
//!   +---------+---------+---------+
//!        ^
//!        gp_offset = 24 at the start of a call
//! ```

use std::mem::size_of;

use crate::{gc::Visitor, runtime::value::Value};

/// Integer registers the ABI uses for arguments.
pub const ABI_ARGS_IN_REGISTERS: usize = 6;
/// Logical arguments passed in registers after the closure, cursor and count.
pub const ARGS_IN_REGISTERS: usize = 3;

pub const CLOSURE_REGISTER: usize = 0;
pub const REST_REGISTER: usize = 1;
pub const OVERFLOW_SAVE_REGISTER: usize = REST_REGISTER;
pub const NARGS_REGISTER: usize = 2;
pub const ARG0_REGISTER: usize = 3;
pub const ARG1_REGISTER: usize = 4;
pub const ARG2_REGISTER: usize = 5;

pub const WORD_SIZE: u32 = size_of::<Value>() as u32;

/// `gp_offset` once every register slot has been consumed.
pub const GP_OFFSET_LIMIT: u32 = WORD_SIZE * ABI_ARGS_IN_REGISTERS as u32;
/// `gp_offset` positioned at `arg0`.
pub const GP_OFFSET_START: u32 = WORD_SIZE * (ABI_ARGS_IN_REGISTERS - ARGS_IN_REGISTERS) as u32;
/// `fp_offset` claiming every floating-point register was already consumed. Floats
/// never travel through this convention.
pub const FP_OFFSET_EXHAUSTED: u32 = 304;

/// Frame slots: the three internal registers are followed directly by the arguments.
pub const FRAME_IDX_REGISTER_SAVE_AREA: usize = 0;
pub const FRAME_IDX_REGISTER_ARGUMENTS_START: usize = ARG0_REGISTER;
pub const FRAME_IDX_OVERFLOW_ARGS: usize = ABI_ARGS_IN_REGISTERS;

/// Storage for the emulated integer register file.
#[derive(Clone, Copy, Debug, Default)]
#[repr(C)]
pub struct RegisterSaveArea {
    pub registers: [Value; ABI_ARGS_IN_REGISTERS],
}

impl RegisterSaveArea {
    pub const fn new() -> Self {
        Self {
            registers: [Value::NOTHING; ABI_ARGS_IN_REGISTERS],
        }
    }
}

#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RawVaList {
    pub gp_offset: u32,
    pub fp_offset: u32,
    pub overflow_arg_area: *const Value,
    pub reg_save_area: *mut Value,
}

impl RawVaList {
    /// Writes the closure, the argument count and the three fixed arguments into
    /// `reg_save_area` and points `overflow_arg_area` at `overflow`.
    ///
    /// # Safety
    ///
    /// `reg_save_area` must be valid for `ABI_ARGS_IN_REGISTERS` writes. `overflow` must
    /// stay valid for as long as the returned record is read.
    pub unsafe fn spill(
        reg_save_area: *mut Value,
        overflow: *const Value,
        closure: Value,
        nargs: usize,
        fixed: [Value; ARGS_IN_REGISTERS],
    ) -> Self {
        let mut raw = Self {
            gp_offset: GP_OFFSET_LIMIT,
            fp_offset: FP_OFFSET_EXHAUSTED,
            overflow_arg_area: overflow,
            reg_save_area,
        };
        raw.spill_closure(closure);
        raw.spill_number_of_arguments(nargs);
        // The overflow pointer itself is not a tagged reference, so the rest
        // register only carries the nothing marker.
        reg_save_area.add(OVERFLOW_SAVE_REGISTER).write(Value::NOTHING);
        reg_save_area.add(ARG0_REGISTER).write(fixed[0]);
        reg_save_area.add(ARG1_REGISTER).write(fixed[1]);
        reg_save_area.add(ARG2_REGISTER).write(fixed[2]);
        raw.gp_offset = GP_OFFSET_START;
        raw
    }

    /// Maps the record onto frame storage laid out with the `FRAME_IDX_*` slots.
    ///
    /// # Safety
    ///
    /// `elements` must point at frame storage holding `FRAME_IDX_REGISTER_ARGUMENTS_START + len`
    /// slots (and never fewer than `FRAME_IDX_OVERFLOW_ARGS`) that outlives the record.
    pub unsafe fn from_frame(elements: *mut Value, closure: Value, len: usize) -> Self {
        let mut raw = Self {
            gp_offset: (FRAME_IDX_REGISTER_ARGUMENTS_START - FRAME_IDX_REGISTER_SAVE_AREA) as u32
                * WORD_SIZE,
            fp_offset: FP_OFFSET_EXHAUSTED,
            overflow_arg_area: elements.add(FRAME_IDX_OVERFLOW_ARGS),
            reg_save_area: elements.add(FRAME_IDX_REGISTER_SAVE_AREA),
        };
        raw.spill_closure(closure);
        raw.spill_number_of_arguments(len);
        raw.reg_save_area
            .add(OVERFLOW_SAVE_REGISTER)
            .write(Value::NOTHING);
        raw
    }

    #[inline]
    pub unsafe fn spill_closure(&mut self, closure: Value) {
        self.reg_save_area.add(CLOSURE_REGISTER).write(closure);
    }

    #[inline]
    pub unsafe fn spill_number_of_arguments(&mut self, nargs: usize) {
        self.reg_save_area
            .add(NARGS_REGISTER)
            .write(Value::fixnum(nargs as i64));
    }

    /// Register slots not yet consumed by sequential reads.
    #[inline(always)]
    pub fn registers_remaining(&self) -> usize {
        debug_assert!(
            self.gp_offset <= GP_OFFSET_LIMIT && self.gp_offset % WORD_SIZE == 0,
            "gp_offset in unexpected state: {}",
            self.gp_offset
        );
        ((GP_OFFSET_LIMIT - self.gp_offset) / WORD_SIZE) as usize
    }

    #[inline(always)]
    pub fn is_at_start(&self) -> bool {
        self.gp_offset == GP_OFFSET_START
    }

    /// Resolves logical index `idx` relative to the current read position.
    ///
    /// # Safety
    ///
    /// `idx` must be below the number of unread arguments backing the record.
    #[inline(always)]
    pub unsafe fn indexed_arg(&self, idx: usize) -> Value {
        let x = idx as isize - self.registers_remaining() as isize;
        if x < 0 {
            *self
                .reg_save_area
                .offset(x + ABI_ARGS_IN_REGISTERS as isize)
        } else {
            *self.overflow_arg_area.offset(x)
        }
    }

    /// Moves past one argument the way `va_arg` does.
    ///
    /// # Safety
    ///
    /// At least one unread argument must back the record.
    #[inline(always)]
    pub unsafe fn advance(&mut self) {
        if self.gp_offset < GP_OFFSET_LIMIT {
            self.gp_offset += WORD_SIZE;
        } else {
            self.overflow_arg_area = self.overflow_arg_area.add(1);
        }
    }

    #[inline(always)]
    pub unsafe fn next_arg(&mut self) -> Value {
        let value = self.indexed_arg(0);
        self.advance();
        value
    }

    #[inline]
    pub unsafe fn closure(&self) -> Value {
        *self.reg_save_area.add(CLOSURE_REGISTER)
    }

    #[inline]
    pub unsafe fn number_of_arguments(&self) -> usize {
        (*self.reg_save_area.add(NARGS_REGISTER))
            .as_fixnum()
            .unwrap_or_default() as usize
    }

    /// Reports the register slots plus the `remaining` unread arguments.
    ///
    /// # Safety
    ///
    /// `remaining` must not exceed the unread arguments backing the record.
    pub unsafe fn trace(&self, remaining: usize, visitor: &mut dyn Visitor) {
        let registers =
            std::slice::from_raw_parts(self.reg_save_area as *const Value, ABI_ARGS_IN_REGISTERS);
        visitor.visit_slice(registers);
        let overflow = remaining.saturating_sub(self.registers_remaining());
        if overflow != 0 {
            visitor.visit_slice(std::slice::from_raw_parts(self.overflow_arg_area, overflow));
        }
    }
}
