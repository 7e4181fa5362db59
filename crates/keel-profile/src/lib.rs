//! Typed hardware snapshot consumed by the patch engine.
//!
//! A [`HardwareProfile`] is a plain, immutable description of the machine the
//! caller wants to boot: CPU topology, GPUs, chipset, storage/network/audio
//! devices, USB controllers and the target OS version. Probing is a
//! collaborator concern; this crate only models and validates the result.

mod error;
mod ids;
mod profile;

pub use error::ProfileError;
pub use ids::{DeviceId, OsVersion, OsVersionRange};
pub use profile::{
    AudioCodec, CpuInfo, CpuVendor, GpuInfo, GpuVendor, HardwareProfile, NetworkAdapter,
    NetworkKind, StorageController, StorageKind, UsbController, UsbPort,
};
