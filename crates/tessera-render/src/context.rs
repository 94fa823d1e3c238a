//! GPU device acquisition.

use crate::error::{RenderError, RenderResult};

/// A globally shared graphics context.
pub struct GraphicsContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GraphicsContext {
    /// Creates a new graphics context synchronously.
    ///
    /// See [`GraphicsContext::new`] for the asynchronous version.
    pub fn new_sync() -> RenderResult<&'static Self> {
        pollster::block_on(Self::new())
    }

    /// Creates a new graphics context asynchronously.
    ///
    /// Returns a static reference to simplify the public API and lifecycle.
    pub async fn new() -> RenderResult<&'static Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterUnavailable)?;

        tracing::info!(adapter = ?adapter.get_info().name, "acquired GPU adapter");

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                ..Default::default()
            })
            .await
            .map_err(|source| RenderError::DeviceRequest { source })?;

        Ok(Box::leak(Box::new(Self {
            instance,
            adapter,
            device,
            queue,
        })))
    }
}
