//! Device code generation: lowers a scheduled kernel loop nest to shader
//! source text.
//!
//! ```text
//! Stmt ─→ c_like::CLikeLowering (generic C-family lowering)
//!              └→ wgsl::WgslLowering (WGSL overrides) ─→ device::WebGpuCodegen
//! ```
//!
//! GPU-mapped loops are recognised by the suffix of their induction
//! variable (`.__thread_id_x`, `.__block_id_y`, ...). The loop's `ForType`
//! says which kind of GPU loop it is; the suffix says which axis.

pub mod c_like;
pub mod device;
mod error;
pub mod layout;
pub mod wgsl;

pub use device::{create_device_codegen, DeviceCodegen, WebGpuCodegen};
pub use error::CodegenError;
pub use layout::{KernelInfo, ScalarValue};

/// Induction-variable suffixes of GPU thread loops, by axis.
pub const THREAD_ID_SUFFIXES: [&str; 4] = [
    ".__thread_id_x",
    ".__thread_id_y",
    ".__thread_id_z",
    ".__thread_id_w",
];

/// Induction-variable suffixes of GPU block loops, by axis.
pub const BLOCK_ID_SUFFIXES: [&str; 4] = [
    ".__block_id_x",
    ".__block_id_y",
    ".__block_id_z",
    ".__block_id_w",
];

/// Axis index (0..=3) of a GPU thread loop variable.
pub fn thread_axis(name: &str) -> Option<usize> {
    THREAD_ID_SUFFIXES.iter().position(|s| name.ends_with(s))
}

/// Axis index (0..=3) of a GPU block loop variable.
pub fn block_axis(name: &str) -> Option<usize> {
    BLOCK_ID_SUFFIXES.iter().position(|s| name.ends_with(s))
}

pub fn is_gpu_thread_var(name: &str) -> bool {
    thread_axis(name).is_some()
}

pub fn is_gpu_block_var(name: &str) -> bool {
    block_axis(name).is_some()
}

/// True when `name` follows the GPU loop naming convention.
pub fn is_gpu_var(name: &str) -> bool {
    is_gpu_thread_var(name) || is_gpu_block_var(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_axes() {
        assert_eq!(thread_axis("f.s0.x.__thread_id_x"), Some(0));
        assert_eq!(thread_axis("f.s0.y.__thread_id_y"), Some(1));
        assert_eq!(thread_axis("f.s0.c.__thread_id_z"), Some(2));
        assert_eq!(thread_axis("f.s0.c.__thread_id_w"), Some(3));
        assert_eq!(thread_axis("f.s0.x.__block_id_x"), None);
    }

    #[test]
    fn test_gpu_var_requires_dotted_suffix() {
        assert!(is_gpu_var("out.s0.x.__block_id_y"));
        assert!(is_gpu_block_var("out.s0.x.__block_id_y"));
        assert!(!is_gpu_thread_var("out.s0.x.__block_id_y"));
        assert!(!is_gpu_var("__thread_id_x"));
        assert!(!is_gpu_var("f.s0.x"));
        assert!(!is_gpu_var("f.s0.__thread_id_x.inner"));
    }
}
