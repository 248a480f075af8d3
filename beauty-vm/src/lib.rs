//! Tree walking evaluator for analyzed beauty programs.

pub mod vm;

pub use vm::{run, Vm, VmConfig, DEFAULT_MAX_CALL_DEPTH};
