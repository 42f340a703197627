//! Workgroup size inference from GPU thread loops.

use crate::codegen::{is_gpu_var, thread_axis, CodegenError};
use crate::ir::simplify::const_int;
use crate::ir::visit::{walk_for, Visitor};
use crate::ir::{For, ForType, Stmt};

/// Collect the workgroup size from the constant extents of the GPU thread
/// loops in `body`. Axes without a thread loop stay at 1.
///
/// When several thread loops share an axis the last one visited wins.
pub fn infer_workgroup_size(body: &Stmt) -> Result<[u32; 3], CodegenError> {
    let mut inferencer = WorkgroupInferencer {
        size: [1, 1, 1],
    };
    inferencer.visit_stmt(body)?;
    Ok(inferencer.size)
}

struct WorkgroupInferencer {
    size: [u32; 3],
}

impl Visitor for WorkgroupInferencer {
    type Error = CodegenError;

    fn visit_for(&mut self, op: &For) -> Result<(), CodegenError> {
        if !is_gpu_var(&op.name) || op.for_type != ForType::GpuThread {
            return self.visit_stmt(&op.body);
        }

        let axis = match thread_axis(&op.name) {
            Some(axis) if axis < 3 => axis,
            _ => {
                return Err(CodegenError::InvalidWorkgroupAxis {
                    name: op.name.clone(),
                })
            }
        };
        let Some(extent) = const_int(&op.extent) else {
            return Err(CodegenError::DynamicWorkgroupSizeUnsupported {
                name: op.name.clone(),
                extent: op.extent.to_string(),
            });
        };
        if extent <= 0 {
            return Err(CodegenError::NonPositiveWorkgroupSize {
                name: op.name.clone(),
                value: extent,
            });
        }
        let value = u32::try_from(extent).map_err(|_| CodegenError::WorkgroupSizeOverflow {
            name: op.name.clone(),
            value: extent,
        })?;

        tracing::trace!(loop_var = %op.name, axis, value, "workgroup dimension");
        self.size[axis] = value;
        walk_for(self, op)
    }
}
