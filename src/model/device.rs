use crate::{Result, config::DevicePreference};
use candle_core::{
    Device,
    utils::{cuda_is_available, metal_is_available},
};
use tracing::info;

/// Picks the compute device: CUDA, then Metal, then the CPU. Accelerators
/// are only reported available when the matching cargo feature is enabled.
pub fn select_device(preference: DevicePreference) -> Result<Device> {
    if preference == DevicePreference::Cpu {
        info!("Using CPU (configured)");
        return Ok(Device::Cpu);
    }

    if cuda_is_available() {
        info!("Using CUDA");
        Ok(Device::new_cuda(0)?)
    } else if metal_is_available() {
        info!("Using Metal");
        Ok(Device::new_metal(0)?)
    } else {
        info!("Using CPU");
        Ok(Device::Cpu)
    }
}

pub fn device_name(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}
