use anyhow::{anyhow, Context as AnyhowContext};

use crate::protocol::{RenderTarget, WorkerError};

/// Owns the wgpu surface/device/queue for one render target.
///
/// Created inside whichever execution context ends up rendering; the
/// surface acquisition step is the transfer point whose failure triggers
/// the same-thread fallback.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: (u32, u32),
    pub surface_format: wgpu::TextureFormat,
}

impl GpuContext {
    pub(crate) fn new(target: &dyn RenderTarget, width: u32, height: u32) -> Result<Self, WorkerError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        // Surface acquisition is the handoff: everything that fails here
        // is retryable on the host thread, everything after is not.
        let surface = Self::acquire_surface(&instance, target)
            .map_err(|err| WorkerError::SurfaceHandoff(format!("{err:#}")))?;

        let (device, queue, config, surface_format) =
            Self::configure(&instance, &surface, width, height)
                .map_err(|err| WorkerError::Fatal(format!("{err:#}")))?;
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size: (width.max(1), height.max(1)),
            surface_format,
        })
    }

    fn acquire_surface(
        instance: &wgpu::Instance,
        target: &dyn RenderTarget,
    ) -> anyhow::Result<wgpu::Surface<'static>> {
        let window_handle = target
            .window_handle()
            .map_err(|err| anyhow!("failed to acquire window handle: {err}"))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| anyhow!("failed to acquire display handle: {err}"))?;

        // The executor keeps the target Arc alive for the lifetime of the
        // surface, which is what makes the raw-handle path sound.
        unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")
    }

    fn configure(
        instance: &wgpu::Instance,
        surface: &wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<(
        wgpu::Device,
        wgpu::Queue,
        wgpu::SurfaceConfiguration,
        wgpu::TextureFormat,
    )> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected GPU adapter"
        );

        let limits = adapter.limits();
        let surface_caps = surface.get_capabilities(&adapter);

        // Gradient colors are gamma-encoded hex values; write them to a
        // non-sRGB swapchain so no extra encoding is applied.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or_else(|| {
                let fallback = surface_caps.formats[0];
                tracing::warn!(
                    ?fallback,
                    "no linear (non-sRGB) surface format available; falling back"
                );
                fallback
            });

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("gradient device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .unwrap_or_else(|| surface_caps.present_modes[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        Ok((device, queue, config, surface_format))
    }

    /// Reconfigures the backing buffer. Zero-area requests are a no-op.
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            tracing::debug!(width, height, "ignoring zero-area resize");
            return;
        }

        self.size = (width, height);
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }
}
