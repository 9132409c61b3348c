use std::sync::Arc;

use winit::window::Window;

use crate::capability::AdapterProfile;
use crate::host::SurfaceError;
use crate::runtime::Viewport;

pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub surface: Option<wgpu::Surface<'static>>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub adapter_profile: AdapterProfile,
}

impl GpuContext {
    pub(crate) fn new(window: Arc<Window>, viewport: Viewport) -> Result<Self, SurfaceError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(window)
            .map_err(|err| SurfaceError::Context(err.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| SurfaceError::Adapter(err.to_string()))?;

        let limits = adapter.limits();
        let adapter_profile = AdapterProfile::from_wgpu(&adapter.get_info(), &limits);
        tracing::debug!(
            name = %adapter_profile.name,
            backend = %adapter_profile.backend,
            device_type = %adapter_profile.device_type,
            software = adapter_profile.software,
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        if viewport.width > max_dimension || viewport.height > max_dimension {
            return Err(SurfaceError::Allocation(format!(
                "GPU max texture dimension is {max_dimension}, requested surface is {}x{}",
                viewport.width, viewport.height
            )));
        }

        let caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = caps.formats.first() else {
            return Err(SurfaceError::Context(
                "surface is incompatible with the selected adapter".into(),
            ));
        };
        // Palette stops are authored in display space, so write them untouched.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or_else(|| {
                tracing::warn!(?first_format, "no non-sRGB surface format; colors will shift");
                first_format
            });
        let alpha_mode = [
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::Opaque,
        ]
        .into_iter()
        .find(|mode| caps.alpha_modes.contains(mode))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoVsync
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("liquid ether device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| SurfaceError::Context(err.to_string()))?;

        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(error = %err, "uncaptured GPU error");
        }));

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: viewport.width,
            height: viewport.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::debug!(?format, ?alpha_mode, ?present_mode, "configured surface");

        Ok(Self {
            _instance: instance,
            surface: Some(surface),
            device,
            queue,
            config,
            adapter_profile,
        })
    }

    pub(crate) fn resize(&mut self, viewport: Viewport) {
        self.config.width = viewport.width;
        self.config.height = viewport.height;
        if let Some(surface) = self.surface.as_ref() {
            surface.configure(&self.device, &self.config);
        }
    }
}
