//! Device selection for candle inference.

use super::error::{MLError, Result};
use candle_core::Device;
use tracing::{debug, info};

/// A device specifier such as `cpu`, `cuda`, `cuda:1`, `metal` or `metal:0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSpec {
    Cpu,
    Cuda(usize),
    Metal(usize),
}

impl DeviceSpec {
    /// Parse a specifier, case-insensitively. A missing ordinal means `0`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim().to_lowercase();
        let (kind, ordinal) = match spec.split_once(':') {
            Some((kind, ordinal)) => {
                let ordinal = ordinal
                    .parse::<usize>()
                    .map_err(|_| MLError::device(format!("Invalid device ordinal in '{}'", spec)))?;
                (kind.to_string(), ordinal)
            }
            None => (spec.clone(), 0),
        };

        match kind.as_str() {
            "cpu" if ordinal == 0 => Ok(DeviceSpec::Cpu),
            "cuda" | "gpu" => Ok(DeviceSpec::Cuda(ordinal)),
            "metal" | "mps" => Ok(DeviceSpec::Metal(ordinal)),
            _ => Err(MLError::device(format!("Unknown device '{}'", spec))),
        }
    }

    /// Instantiate the candle device.
    pub fn open(self) -> Result<Device> {
        match self {
            DeviceSpec::Cpu => Ok(Device::Cpu),
            DeviceSpec::Cuda(n) => Device::new_cuda(n)
                .map_err(|e| MLError::device(format!("CUDA device {} unavailable: {}", n, e))),
            DeviceSpec::Metal(n) => Device::new_metal(n)
                .map_err(|e| MLError::device(format!("Metal device {} unavailable: {}", n, e))),
        }
    }
}

impl std::fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceSpec::Cpu => write!(f, "cpu"),
            DeviceSpec::Cuda(n) => write!(f, "cuda:{}", n),
            DeviceSpec::Metal(n) => write!(f, "metal:{}", n),
        }
    }
}

/// Resolve an optional specifier to a device and its display name.
///
/// `None` auto-detects: CUDA first, then Metal, else CPU.
pub fn resolve_device(spec: Option<&str>) -> Result<(Device, String)> {
    if let Some(spec) = spec {
        let spec = DeviceSpec::parse(spec)?;
        let device = spec.open()?;
        info!(device = %spec, "Using configured device");
        return Ok((device, spec.to_string()));
    }

    let spec = best_available();
    let device = spec.open()?;
    info!(device = %spec, "Auto-detected inference device");
    Ok((device, spec.to_string()))
}

fn best_available() -> DeviceSpec {
    if candle_core::utils::cuda_is_available() && Device::new_cuda(0).is_ok() {
        return DeviceSpec::Cuda(0);
    }

    if candle_core::utils::metal_is_available() && Device::new_metal(0).is_ok() {
        return DeviceSpec::Metal(0);
    }

    debug!("No accelerator available, falling back to CPU");
    DeviceSpec::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_specifiers() {
        assert_eq!(DeviceSpec::parse("cpu").unwrap(), DeviceSpec::Cpu);
        assert_eq!(DeviceSpec::parse(" CPU ").unwrap(), DeviceSpec::Cpu);
        assert_eq!(DeviceSpec::parse("cuda").unwrap(), DeviceSpec::Cuda(0));
        assert_eq!(DeviceSpec::parse("cuda:2").unwrap(), DeviceSpec::Cuda(2));
        assert_eq!(DeviceSpec::parse("metal").unwrap(), DeviceSpec::Metal(0));
        assert_eq!(DeviceSpec::parse("mps").unwrap(), DeviceSpec::Metal(0));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(matches!(DeviceSpec::parse("tpu"), Err(MLError::Device(_))));
        assert!(matches!(DeviceSpec::parse("cuda:x"), Err(MLError::Device(_))));
        assert!(matches!(DeviceSpec::parse("cpu:1"), Err(MLError::Device(_))));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(DeviceSpec::Cpu.to_string(), "cpu");
        assert_eq!(DeviceSpec::Cuda(1).to_string(), "cuda:1");
        assert_eq!(DeviceSpec::Metal(0).to_string(), "metal:0");
    }

    #[test]
    fn test_resolve_cpu() {
        let (device, name) = resolve_device(Some("cpu")).unwrap();
        assert!(device.is_cpu());
        assert_eq!(name, "cpu");
    }

    #[test]
    fn test_auto_detect_always_resolves() {
        let (_, name) = resolve_device(None).unwrap();
        assert!(["cpu", "cuda:0", "metal:0"].contains(&name.as_str()));
    }
}
