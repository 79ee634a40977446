//! Platform register-save layouts. Everything that knows how arguments sit in
//! the emulated register file lives below this module.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        mod x86_64;
        use x86_64 as arch;
    } else {
        compile_error!("no register-save layout is defined for this target");
    }
}

pub use arch::*;
