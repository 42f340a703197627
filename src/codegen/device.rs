//! DeviceCodegen: the driver-facing interface of a GPU source backend.
//!
//! A driver calls `init_module()` once per pipeline, `add_kernel()` for
//! each kernel in order, then `compile_to_src()` to collect the module.

use super::layout::KernelInfo;
use super::wgsl::WgslLowering;
use super::CodegenError;
use crate::config::CodegenConfig;
use crate::ir::{DeviceArgument, Stmt};

/// Emits one shader module per pipeline, kernel by kernel.
pub trait DeviceCodegen {
    /// Name of the GPU API this backend targets.
    fn api_unique_name(&self) -> &'static str;

    /// Discard any previous module and start a new one.
    fn init_module(&mut self);

    /// Append the kernel `name` to the module and return its metadata.
    fn add_kernel(
        &mut self,
        body: &Stmt,
        name: &str,
        args: &[DeviceArgument],
    ) -> Result<&KernelInfo, CodegenError>;

    /// The module source as bytes, terminated by a single NUL.
    fn compile_to_src(&self) -> Vec<u8>;

    /// Name of the most recently added kernel.
    fn current_kernel_name(&self) -> &str;

    /// Write the module source to stderr.
    fn dump(&self);

    /// Name of `name` as seen by the GPU runtime.
    fn print_gpu_name(&self, name: &str) -> String {
        name.to_string()
    }

    /// Metadata of every kernel added so far.
    fn kernels(&self) -> &[KernelInfo];
}

/// Create a device backend for the given API name.
pub fn create_device_codegen(api: &str, config: &CodegenConfig) -> Option<Box<dyn DeviceCodegen>> {
    match api {
        "webgpu" | "wgsl" => Some(Box::new(WebGpuCodegen::new(config))),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ModuleState {
    NotInitialized,
    Ready,
}

/// WGSL backend session. Owns the module text and the kernels emitted
/// into it.
#[derive(Debug)]
pub struct WebGpuCodegen {
    wgsl: WgslLowering,
    state: ModuleState,
    cur_kernel_name: String,
    kernels: Vec<KernelInfo>,
}

impl WebGpuCodegen {
    pub fn new(config: &CodegenConfig) -> Self {
        Self {
            wgsl: WgslLowering::new(config),
            state: ModuleState::NotInitialized,
            cur_kernel_name: String::new(),
            kernels: Vec::new(),
        }
    }

    /// The module text emitted so far, without the trailing NUL.
    pub fn source(&self) -> &str {
        self.wgsl.source()
    }

    /// Content hash of the module text, suitable as a pipeline cache key.
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.source().as_bytes()).to_hex().to_string()
    }
}

impl DeviceCodegen for WebGpuCodegen {
    fn api_unique_name(&self) -> &'static str {
        "webgpu"
    }

    fn init_module(&mut self) {
        tracing::debug!("WebGPU: init_module");
        self.wgsl.init_module();
        self.cur_kernel_name.clear();
        self.kernels.clear();
        self.state = ModuleState::Ready;
    }

    fn add_kernel(
        &mut self,
        body: &Stmt,
        name: &str,
        args: &[DeviceArgument],
    ) -> Result<&KernelInfo, CodegenError> {
        tracing::debug!(kernel = name, args = args.len(), "WebGPU: add_kernel");
        if self.state != ModuleState::Ready {
            return Err(CodegenError::ModuleNotInitialized {
                kernel: name.to_string(),
            });
        }
        self.cur_kernel_name = name.to_string();
        let info = self.wgsl.add_kernel(body, name, args)?;
        self.kernels.push(info);
        let index = self.kernels.len() - 1;
        Ok(&self.kernels[index])
    }

    fn compile_to_src(&self) -> Vec<u8> {
        let source = self.source();
        tracing::debug!(kernels = self.kernels.len(), "WebGPU: compile_to_src\n{}", source);
        let mut bytes = Vec::with_capacity(source.len() + 1);
        bytes.extend_from_slice(source.as_bytes());
        bytes.push(0);
        bytes
    }

    fn current_kernel_name(&self) -> &str {
        &self.cur_kernel_name
    }

    fn dump(&self) {
        eprintln!("{}", self.source());
    }

    fn kernels(&self) -> &[KernelInfo] {
        &self.kernels
    }
}
