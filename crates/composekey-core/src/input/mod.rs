// Composekey Input Layer
// Device detection and filtering

mod device;
mod filter;

pub use device::{is_keyboard, is_virtual_device, DeviceCapabilities};
pub use filter::DeviceFilter;

/// Name prefix shared by every device this program creates
pub const VIRTUAL_DEVICE_PREFIX: &str = "Composekey (virtual)";
