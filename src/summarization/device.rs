//! Execution backend selection.
//!
//! Capability detection runs once when the model runtime is built. The result is an opaque
//! [`ExecutionContext`] handed to the generation client; the summarization pipeline carries it
//! around without inspecting it.

use std::path::Path;

/// Device files whose presence indicates a usable accelerator.
const ACCELERATOR_PROBES: &[&str] = &["/dev/nvidia0", "/dev/nvidiactl", "/dev/kfd"];

/// Operator preference for the execution device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DevicePreference {
    /// Probe the host and use an accelerator when one is present.
    #[default]
    Auto,
    /// Always run on general-purpose cores.
    Cpu,
    /// Always request accelerator offload.
    Accelerator,
}

impl std::str::FromStr for DevicePreference {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "accelerator" | "gpu" | "cuda" => Ok(Self::Accelerator),
            _ => Err(()),
        }
    }
}

/// Device the model is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// General-purpose cores.
    Cpu,
    /// GPU or other accelerator.
    Accelerator,
}

/// Numeric precision used for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Full single precision.
    F32,
    /// Half precision.
    F16,
}

/// Backend choice made once at startup and never changed mid-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    device: Device,
    precision: Precision,
}

impl ExecutionContext {
    /// Resolve a preference against the host's capabilities.
    pub fn detect(preference: DevicePreference) -> Self {
        Self::resolve(preference, accelerator_available())
    }

    fn resolve(preference: DevicePreference, accelerator_present: bool) -> Self {
        let device = match preference {
            DevicePreference::Cpu => Device::Cpu,
            DevicePreference::Accelerator => Device::Accelerator,
            DevicePreference::Auto if accelerator_present => Device::Accelerator,
            DevicePreference::Auto => Device::Cpu,
        };
        Self::for_device(device)
    }

    /// Context for an explicit device, pairing it with that device's precision.
    pub fn for_device(device: Device) -> Self {
        let precision = match device {
            Device::Accelerator => Precision::F16,
            Device::Cpu => Precision::F32,
        };
        Self { device, precision }
    }

    /// Device the model runs on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Precision used for inference.
    pub fn precision(&self) -> Precision {
        self.precision
    }
}

fn accelerator_available() -> bool {
    if std::env::var("CUDA_VISIBLE_DEVICES")
        .map(|value| !value.trim().is_empty() && value.trim() != "-1")
        .unwrap_or(false)
    {
        return true;
    }
    ACCELERATOR_PROBES
        .iter()
        .any(|probe| Path::new(probe).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_follows_host_capability() {
        let with_gpu = ExecutionContext::resolve(DevicePreference::Auto, true);
        assert_eq!(with_gpu.device(), Device::Accelerator);
        assert_eq!(with_gpu.precision(), Precision::F16);

        let without = ExecutionContext::resolve(DevicePreference::Auto, false);
        assert_eq!(without.device(), Device::Cpu);
        assert_eq!(without.precision(), Precision::F32);
    }

    #[test]
    fn explicit_preference_wins() {
        let forced = ExecutionContext::resolve(DevicePreference::Cpu, true);
        assert_eq!(forced.device(), Device::Cpu);
    }

    #[test]
    fn parses_preference_aliases() {
        assert_eq!("GPU".parse(), Ok(DevicePreference::Accelerator));
        assert_eq!(" auto ".parse(), Ok(DevicePreference::Auto));
        assert!("tpu".parse::<DevicePreference>().is_err());
    }
}
