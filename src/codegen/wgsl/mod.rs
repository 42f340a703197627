//! WGSL dialect of the C-family lowering.
//!
//! Overrides the node kinds whose WGSL spelling differs from C: casts are
//! constructor calls, integer literals must be 32-bit, `min`/`max` are
//! builtins, `select` replaces the ternary operator, and GPU loops become
//! reads of the dispatch builtins instead of software loops.

pub mod binding;
pub mod names;
pub mod types;
pub mod workgroup;

use super::c_like::{self, CLikeLowering, EmitterState};
use super::layout::KernelInfo;
use super::{block_axis, is_gpu_var, thread_axis, CodegenError};
use crate::config::CodegenConfig;
use crate::ir::simplify::is_const_zero;
use crate::ir::{BinOp, DeviceArgument, Expr, For, ForType, Stmt, Type};

pub use binding::{bind_resources, Bindings};
pub use names::mangle;
pub use types::map_type;
pub use workgroup::infer_workgroup_size;

type Result<T> = std::result::Result<T, CodegenError>;

/// Helper every module starts with; float literals are emitted through it
/// so their bit patterns survive exactly.
pub const PRELUDE: &str = "fn float_from_bits(x : i32) -> f32 {return bitcast<f32>(x);}\n";

const AXES: [char; 3] = ['x', 'y', 'z'];

#[derive(Debug)]
pub struct WgslLowering {
    state: EmitterState,
    max_workgroup_invocations: u32,
}

impl WgslLowering {
    pub fn new(config: &CodegenConfig) -> Self {
        Self {
            state: EmitterState::new(config),
            max_workgroup_invocations: config.max_workgroup_invocations,
        }
    }

    pub fn source(&self) -> &str {
        self.state.source()
    }

    /// Start a fresh module: clears all text and writes the prelude.
    pub fn init_module(&mut self) {
        self.state.reset_module();
        self.state.write(PRELUDE);
    }

    /// Emit the bindings and the compute entry point of one kernel.
    pub fn add_kernel(
        &mut self,
        body: &Stmt,
        name: &str,
        args: &[DeviceArgument],
    ) -> Result<KernelInfo> {
        self.state.reset_kernel();
        tracing::trace!(kernel = name, body = %body, "lowering kernel");

        let bindings = bind_resources(&mut self.state, name, args)?;
        let workgroup_size = infer_workgroup_size(body)?;

        let info = KernelInfo {
            name: name.to_string(),
            workgroup_size,
            buffers: bindings.buffers,
            uniforms: bindings.uniforms,
        };
        if info.invocations() > u64::from(self.max_workgroup_invocations) {
            tracing::warn!(
                kernel = name,
                invocations = info.invocations(),
                limit = self.max_workgroup_invocations,
                "workgroup exceeds the configured invocation limit"
            );
        }

        let [x, y, z] = workgroup_size;
        let unit = self.state.indent_unit();
        self.state
            .write_line(&format!("@compute @workgroup_size({}, {}, {})", x, y, z));
        self.state.write_line(&format!("fn {}(", name));
        self.state.write_line(&format!(
            "{}@builtin(local_invocation_id) local_id : vec3<u32>,",
            unit
        ));
        self.state.write_line(&format!(
            "{}@builtin(workgroup_id) group_id : vec3<u32>,",
            unit
        ));
        self.state.write_line(")");
        self.state.open_scope();

        if let Some(uniforms) = &info.uniforms {
            for field in &uniforms.fields {
                let value = format!("{}.{}", uniforms.var_name, field.mangled);
                self.print_let(field.ty, &field.name, &value)?;
            }
        }

        self.print_stmt(body)?;
        self.state.close_scope(&format!("shader {}", name));
        self.state.write_line("");
        Ok(info)
    }
}

/// Dispatch builtin read by a GPU loop variable, e.g. `local_id.x`.
fn simt_intrinsic(name: &str) -> Result<String> {
    let (builtin, axis) = match (thread_axis(name), block_axis(name)) {
        (Some(axis), _) => ("local_id", axis),
        (None, Some(axis)) => ("group_id", axis),
        (None, None) => {
            return Err(CodegenError::InvalidWorkgroupAxis {
                name: name.to_string(),
            })
        }
    };
    match AXES.get(axis) {
        Some(c) => Ok(format!("{}.{}", builtin, c)),
        None => Err(CodegenError::InvalidWorkgroupAxis {
            name: name.to_string(),
        }),
    }
}

impl CLikeLowering for WgslLowering {
    fn state(&self) -> &EmitterState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EmitterState {
        &mut self.state
    }

    fn print_type(&self, ty: Type) -> Result<String> {
        map_type(ty)
    }

    fn print_name(&self, name: &str) -> String {
        mangle(name, &self.state)
    }

    fn print_assignment(&mut self, ty: Type, rhs: &str) -> Result<String> {
        map_type(ty)?;
        Ok(self
            .state
            .assign(rhs, |id| format!("let {} = {};", id, rhs)))
    }

    fn print_let(&mut self, _ty: Type, name: &str, value: &str) -> Result<()> {
        let line = format!("let {} = {};", self.print_name(name), value);
        self.state.write_line(&line);
        Ok(())
    }

    fn print_mutable_decl(&self, ty: Type, name: &str, init: &str) -> Result<String> {
        Ok(format!("var {} : {} = {}", name, map_type(ty)?, init))
    }

    fn visit_int_imm(&mut self, ty: Type, value: i64) -> Result<String> {
        if ty.bits != 32 {
            return Err(CodegenError::UnsupportedIntWidth { ty });
        }
        self.print_assignment(ty, &value.to_string())
    }

    fn visit_uint_imm(&mut self, ty: Type, value: u64) -> Result<String> {
        if ty.is_bool() {
            return Ok(if value == 0 { "false" } else { "true" }.to_string());
        }
        if ty.bits != 32 {
            return Err(CodegenError::UnsupportedIntWidth { ty });
        }
        self.print_assignment(ty, &format!("{}u", value))
    }

    fn visit_cast(&mut self, ty: Type, value: &Expr) -> Result<String> {
        let v = self.print_expr(value)?;
        let rhs = format!("{}({})", map_type(ty)?, v);
        self.print_assignment(ty, &rhs)
    }

    fn visit_min(&mut self, ty: Type, a: &Expr, b: &Expr) -> Result<String> {
        self.print_expr(&Expr::call(ty, BinOp::Min.symbol(), vec![a.clone(), b.clone()]))
    }

    fn visit_max(&mut self, ty: Type, a: &Expr, b: &Expr) -> Result<String> {
        self.print_expr(&Expr::call(ty, BinOp::Max.symbol(), vec![a.clone(), b.clone()]))
    }

    fn visit_select(
        &mut self,
        ty: Type,
        cond: &Expr,
        true_value: &Expr,
        false_value: &Expr,
    ) -> Result<String> {
        let c = self.print_expr(cond)?;
        let t = self.print_expr(true_value)?;
        let f = self.print_expr(false_value)?;
        self.print_assignment(ty, &format!("select({}, {}, {})", f, t, c))
    }

    fn visit_for(&mut self, op: &For) -> Result<()> {
        if op.for_type == ForType::GpuLane {
            return Err(CodegenError::UnsupportedLoopKind {
                name: op.name.clone(),
                for_type: op.for_type,
                reason: "the WebGPU backend does not support GPU lane loops",
            });
        }

        if is_gpu_var(&op.name) {
            if !matches!(op.for_type, ForType::GpuBlock | ForType::GpuThread) {
                return Err(CodegenError::UnsupportedLoopKind {
                    name: op.name.clone(),
                    for_type: op.for_type,
                    reason: "kernel loop must be either gpu block or gpu thread",
                });
            }
            if !is_const_zero(&op.min) {
                return Err(CodegenError::NonZeroGpuLoopMinimum {
                    name: op.name.clone(),
                    min: op.min.to_string(),
                });
            }
            let value = format!("i32({})", simt_intrinsic(&op.name)?);
            self.print_let(Type::i32(), &op.name, &value)?;
            return self.print_stmt(&op.body);
        }

        if op.for_type == ForType::Parallel {
            return Err(CodegenError::UnsupportedLoopKind {
                name: op.name.clone(),
                for_type: op.for_type,
                reason: "cannot use parallel loops inside WebGPU shaders",
            });
        }
        c_like::lower_serial_for(self, op)
    }
}

#[cfg(test)]
mod tests;
