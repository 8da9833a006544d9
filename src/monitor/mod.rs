//! Device health monitoring.

pub mod device;
pub mod poller;

pub use device::{DeviceApi, DeviceError, DeviceState, SolarmanClient};
pub use poller::{DevicePoller, PollOutcome};
