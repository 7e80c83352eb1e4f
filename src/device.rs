use candle_core::Device;
use tracing::{info, warn};

use crate::error::Result;

/// Picks the compute device once at startup. Accelerators are only probed when
/// the matching cargo feature is compiled in.
pub fn select_device(force_cpu: bool) -> Result<Device> {
    if force_cpu {
        info!("CPU forced from the command line");
        return Ok(Device::Cpu);
    }

    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("Using CUDA device");
                return Ok(device);
            }
            Err(e) => warn!("CUDA not available: {}, falling back to CPU", e),
        }
    }

    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("Using Metal device");
                return Ok(device);
            }
            Err(e) => warn!("Metal not available: {}, falling back to CPU", e),
        }
    }

    if cfg!(not(any(feature = "cuda", feature = "metal"))) {
        warn!("Built without accelerator support, generation will run on CPU");
    }
    Ok(Device::Cpu)
}

pub fn device_label(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "CPU",
        Device::Cuda(_) => "CUDA",
        Device::Metal(_) => "Metal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_cpu_is_cpu() {
        let device = select_device(true).unwrap();
        assert!(device.is_cpu());
        assert_eq!(device_label(&device), "CPU");
    }
}
