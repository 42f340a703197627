//! GPU-side checks for emitted modules.
//!
//! Uses wgpu to hand generated WGSL to a real device: `validate_wgsl` runs
//! the driver's shader validation, `run_kernel` dispatches one kernel with
//! the bind groups described by its `KernelInfo`. Both need an adapter;
//! `try_create_device` returns `None` on machines without one.

use std::sync::mpsc;

use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::codegen::layout::UniformPackError;
use crate::codegen::{KernelInfo, ScalarValue};

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("shader validation failed: {0}")]
    Validation(String),

    #[error("kernel '{kernel}' has {expected} buffers, got {found}")]
    BufferCount {
        kernel: String,
        expected: usize,
        found: usize,
    },

    #[error("buffer '{0}' is empty")]
    EmptyBuffer(String),

    #[error(transparent)]
    Uniforms(#[from] UniformPackError),

    #[error("readback failed: {0}")]
    Readback(String),
}

/// Try to create a wgpu device and queue.
/// Returns None if no GPU adapter is available.
pub fn try_create_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))?;
    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("kernelgen-gpu"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
        },
        None,
    ))
    .ok()?;
    tracing::debug!(adapter = ?adapter.get_info().name, "created GPU device");
    Some((device, queue))
}

/// Compile `source` on `device` and report the first validation error.
pub fn validate_wgsl(device: &wgpu::Device, source: &str) -> Result<(), GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let _module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("kernelgen-validate"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(GpuError::Validation(err.to_string())),
        None => Ok(()),
    }
}

fn layout_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Dispatch kernel `info` from module `source` over `workgroups` groups.
///
/// `buffers` holds the contents of each buffer argument as 32-bit words, in
/// binding order; they are overwritten with the device contents after the
/// dispatch. `scalars` fill the uniform struct in field order.
pub fn run_kernel(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    source: &str,
    info: &KernelInfo,
    buffers: &mut [Vec<u32>],
    scalars: &[ScalarValue],
    workgroups: [u32; 3],
) -> Result<(), GpuError> {
    if buffers.len() != info.buffers.len() {
        return Err(GpuError::BufferCount {
            kernel: info.name.clone(),
            expected: info.buffers.len(),
            found: buffers.len(),
        });
    }
    if let Some((binding, _)) = info.buffers.iter().zip(buffers.iter()).find(|(_, b)| b.is_empty()) {
        return Err(GpuError::EmptyBuffer(binding.name.clone()));
    }
    let uniform_bytes = match &info.uniforms {
        Some(block) => Some(block.pack(scalars)?),
        None => None,
    };

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(info.name.as_str()),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let storage = wgpu::BufferBindingType::Storage { read_only: false };
    let buffer_entries: Vec<_> = info
        .buffers
        .iter()
        .map(|b| layout_entry(b.binding, storage))
        .collect();
    let buffer_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("kernelgen-buffers"),
        entries: &buffer_entries,
    });
    let uniform_layout = uniform_bytes.as_ref().map(|_| {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kernelgen-uniforms"),
            entries: &[layout_entry(0, wgpu::BufferBindingType::Uniform)],
        })
    });
    let mut layouts = vec![&buffer_layout];
    layouts.extend(uniform_layout.as_ref());
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("kernelgen-layout"),
        bind_group_layouts: &layouts,
        push_constant_ranges: &[],
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(info.name.as_str()),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: Some(info.name.as_str()),
        compilation_options: Default::default(),
        cache: None,
    });

    let gpu_buffers: Vec<wgpu::Buffer> = info
        .buffers
        .iter()
        .zip(buffers.iter())
        .map(|(b, words)| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(b.name.as_str()),
                contents: bytemuck::cast_slice(words),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            })
        })
        .collect();
    let buffer_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("kernelgen-buffers"),
        layout: &buffer_layout,
        entries: &info
            .buffers
            .iter()
            .zip(&gpu_buffers)
            .map(|(b, buf)| wgpu::BindGroupEntry {
                binding: b.binding,
                resource: buf.as_entire_binding(),
            })
            .collect::<Vec<_>>(),
    });
    let uniform_buf = uniform_bytes.as_ref().map(|bytes| {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("kernelgen-args"),
            contents: bytes,
            usage: wgpu::BufferUsages::UNIFORM,
        })
    });
    let uniform_group = match (&uniform_layout, &uniform_buf) {
        (Some(layout), Some(buf)) => Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("kernelgen-uniforms"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buf.as_entire_binding(),
            }],
        })),
        _ => None,
    };

    let staging: Vec<wgpu::Buffer> = gpu_buffers
        .iter()
        .map(|buf| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("kernelgen-staging"),
                size: buf.size(),
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })
        .collect();

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some(info.name.as_str()),
    });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(info.name.as_str()),
            timestamp_writes: None,
        });
        pass.set_pipeline(&pipeline);
        pass.set_bind_group(0, &buffer_group, &[]);
        if let Some(group) = &uniform_group {
            pass.set_bind_group(1, group, &[]);
        }
        let [x, y, z] = workgroups;
        pass.dispatch_workgroups(x, y, z);
    }
    for (src, dst) in gpu_buffers.iter().zip(&staging) {
        encoder.copy_buffer_to_buffer(src, 0, dst, 0, src.size());
    }
    queue.submit(std::iter::once(encoder.finish()));

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(GpuError::Validation(err.to_string()));
    }

    for (buf, words) in staging.iter().zip(buffers.iter_mut()) {
        let slice = buf.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| GpuError::Readback(e.to_string()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;
        {
            let data = slice.get_mapped_range();
            words.copy_from_slice(bytemuck::cast_slice(&data));
        }
        buf.unmap();
    }
    tracing::debug!(kernel = %info.name, ?workgroups, "kernel dispatched");
    Ok(())
}
