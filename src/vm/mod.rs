pub mod options;
pub mod thread;
pub mod values;

pub use thread::{enter, threads, Thread};
