//! Capability probing and the GPU/fallback decision.
//!
//! Detection is an explicit probe: try to acquire a high-performance adapter
//! and report what came back. The policy then decides whether the GPU path is
//! worth attempting on this device.

use std::fmt;

use serde::Serialize;

use crate::types::RuntimeSettings;

/// Adapter facts captured during a probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: String,
    pub device_type: String,
    pub driver: String,
    pub max_texture_dimension: u32,
    pub software: bool,
}

const SOFTWARE_ADAPTERS: &[&str] = &["llvmpipe", "softpipe", "swiftshader", "lavapipe", "warp"];

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        let lowered = info.name.to_ascii_lowercase();
        let software = info.device_type == wgpu::DeviceType::Cpu
            || SOFTWARE_ADAPTERS.iter().any(|name| lowered.contains(name));
        Self {
            name: info.name.clone(),
            backend: format!("{:?}", info.backend),
            device_type: format!("{:?}", info.device_type),
            driver: info.driver.clone(),
            max_texture_dimension: limits.max_texture_dimension_2d,
            software,
        }
    }

    pub fn is_software(&self) -> bool {
        self.software
    }
}

/// What graphics acceleration the probe found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphicsSupport {
    Unavailable { reason: String },
    Available { adapter: AdapterProfile },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityReport {
    pub graphics: GraphicsSupport,
    pub hardware_concurrency: usize,
}

impl CapabilityReport {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            graphics: GraphicsSupport::Unavailable {
                reason: reason.into(),
            },
            hardware_concurrency: host_concurrency(),
        }
    }

    pub fn adapter(&self) -> Option<&AdapterProfile> {
        match &self.graphics {
            GraphicsSupport::Available { adapter } => Some(adapter),
            GraphicsSupport::Unavailable { .. } => None,
        }
    }
}

/// Anything that can answer "is the GPU path viable here".
pub trait CapabilityProbe {
    fn probe(&self) -> CapabilityReport;
}

/// Returns a fixed report. Used by the headless host and tests.
#[derive(Debug, Clone)]
pub struct StaticProbe(pub CapabilityReport);

impl CapabilityProbe for StaticProbe {
    fn probe(&self) -> CapabilityReport {
        self.0.clone()
    }
}

/// Probes by requesting a high-performance adapter from wgpu.
#[derive(Debug, Clone)]
pub struct WgpuProbe {
    pub backends: wgpu::Backends,
}

impl Default for WgpuProbe {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
        }
    }
}

impl CapabilityProbe for WgpuProbe {
    fn probe(&self) -> CapabilityReport {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: self.backends,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }));
        let hardware_concurrency = host_concurrency();
        match adapter {
            Ok(adapter) => {
                let profile = AdapterProfile::from_wgpu(&adapter.get_info(), &adapter.limits());
                tracing::debug!(
                    name = %profile.name,
                    backend = %profile.backend,
                    software = profile.software,
                    "probed GPU adapter"
                );
                CapabilityReport {
                    graphics: GraphicsSupport::Available { adapter: profile },
                    hardware_concurrency,
                }
            }
            Err(err) => {
                tracing::debug!(error = %err, "no GPU adapter available");
                CapabilityReport {
                    graphics: GraphicsSupport::Unavailable {
                        reason: err.to_string(),
                    },
                    hardware_concurrency,
                }
            }
        }
    }
}

pub fn host_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Why the controller ended up on the CSS path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FallbackReason {
    Forced,
    NoGraphics { detail: String },
    SoftwareRenderer { adapter: String },
    LowEndDevice { threads: usize, required: usize },
    InitFailed { detail: String },
    DrawFailed { detail: String },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::Forced => f.write_str("fallback forced by configuration"),
            FallbackReason::NoGraphics { detail } => write!(f, "no graphics adapter: {detail}"),
            FallbackReason::SoftwareRenderer { adapter } => {
                write!(f, "adapter '{adapter}' is a software rasterizer")
            }
            FallbackReason::LowEndDevice { threads, required } => write!(
                f,
                "device reports {threads} hardware threads, {required} required"
            ),
            FallbackReason::InitFailed { detail } => {
                write!(f, "GPU initialisation failed: {detail}")
            }
            FallbackReason::DrawFailed { detail } => write!(f, "GPU draw failed: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum Decision {
    Gpu,
    Fallback(FallbackReason),
}

/// Thresholds applied to a [`CapabilityReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityPolicy {
    pub force_fallback: bool,
    pub allow_software: bool,
    pub min_concurrency: usize,
}

impl Default for CapabilityPolicy {
    fn default() -> Self {
        Self::from_runtime(&RuntimeSettings::default())
    }
}

impl CapabilityPolicy {
    pub fn from_runtime(runtime: &RuntimeSettings) -> Self {
        Self {
            force_fallback: runtime.force_fallback,
            allow_software: runtime.allow_software,
            min_concurrency: runtime.min_concurrency,
        }
    }

    pub fn decide(&self, report: &CapabilityReport) -> Decision {
        if self.force_fallback {
            return Decision::Fallback(FallbackReason::Forced);
        }
        let adapter = match &report.graphics {
            GraphicsSupport::Unavailable { reason } => {
                return Decision::Fallback(FallbackReason::NoGraphics {
                    detail: reason.clone(),
                })
            }
            GraphicsSupport::Available { adapter } => adapter,
        };
        if adapter.software && !self.allow_software {
            return Decision::Fallback(FallbackReason::SoftwareRenderer {
                adapter: adapter.name.clone(),
            });
        }
        if report.hardware_concurrency < self.min_concurrency {
            return Decision::Fallback(FallbackReason::LowEndDevice {
                threads: report.hardware_concurrency,
                required: self.min_concurrency,
            });
        }
        Decision::Gpu
    }
}
