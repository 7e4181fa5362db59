use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::ids::{DeviceId, OsVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuVendor {
    Intel,
    Amd,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub vendor: CpuVendor,
    /// Microarchitecture generation (e.g. 12 for Alder Lake, 4 for Zen 4).
    pub generation: u8,
    pub performance_cores: u16,
    pub efficiency_cores: u16,
    pub logical_processors: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuVendor {
    Intel,
    Amd,
    Nvidia,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub vendor: GpuVendor,
    pub device: DeviceId,
    /// Architecture family name as the compatibility database spells it
    /// (e.g. "ice-lake", "navi23").
    pub family: String,
    pub integrated: bool,
    /// Coarse VRAM bucket (0 = shared memory, then powers of two in GiB);
    /// used for nearest-capability spoof selection.
    pub vram_class: u8,
    pub display_outputs: u8,
    /// This GPU drives the display; exactly one GPU may carry the flag.
    pub primary: bool,
    /// Present in the machine but to be hidden from the target OS.
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageKind {
    Nvme,
    Ahci,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageController {
    pub device: DeviceId,
    pub kind: StorageKind,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkKind {
    Wifi,
    Ethernet,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAdapter {
    pub device: DeviceId,
    pub kind: NetworkKind,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioCodec {
    /// Codec identifier as reported by the HDA controller.
    pub codec_id: u32,
    /// Preferred layout hint forwarded to the audio driver, when known.
    pub layout: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbPort {
    pub name: String,
    pub internal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsbController {
    pub device: DeviceId,
    pub ports: Vec<UsbPort>,
}

/// Immutable snapshot of the machine relevant to boot-compatibility planning.
///
/// Construct the value, then call [`HardwareProfile::validate`] before handing
/// it to a run; the pipeline re-validates on entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub cpu: CpuInfo,
    pub gpus: Vec<GpuInfo>,
    /// Chipset / platform controller hub identifier.
    pub chipset: DeviceId,
    pub storage: Vec<StorageController>,
    pub network: Vec<NetworkAdapter>,
    pub audio: Vec<AudioCodec>,
    pub usb: Vec<UsbController>,
    pub target_os: OsVersion,
    /// Whether the target installation drives a display at all. Headless
    /// targets relax the primary-GPU requirement.
    pub display_required: bool,
    /// Suppress firmware TPM devices (the target OS trips over them).
    pub suppress_tpm: bool,
}

impl HardwareProfile {
    pub fn validate(&self) -> Result<(), ProfileError> {
        let cores = self
            .cpu
            .performance_cores
            .saturating_add(self.cpu.efficiency_cores);
        if cores > self.cpu.logical_processors {
            return Err(ProfileError::InconsistentTopology {
                performance: self.cpu.performance_cores,
                efficiency: self.cpu.efficiency_cores,
                logical: self.cpu.logical_processors,
            });
        }

        if self.gpus.is_empty() {
            return Err(ProfileError::MissingRequiredField("gpus"));
        }

        let mut primary: Option<&GpuInfo> = None;
        for gpu in &self.gpus {
            if !gpu.primary {
                continue;
            }
            if let Some(first) = primary {
                return Err(ProfileError::MultiplePrimaryGpus {
                    first: first.device,
                    second: gpu.device,
                });
            }
            primary = Some(gpu);
        }
        if self.display_required && primary.is_none() {
            return Err(ProfileError::MissingRequiredField("primary gpu"));
        }
        if let Some(gpu) = primary {
            if gpu.disabled {
                return Err(ProfileError::MissingRequiredField("enabled primary gpu"));
            }
        }

        Ok(())
    }

    /// GPUs that will be visible to the target OS.
    pub fn active_gpus(&self) -> impl Iterator<Item = &GpuInfo> {
        self.gpus.iter().filter(|g| !g.disabled)
    }

    pub fn primary_gpu(&self) -> Option<&GpuInfo> {
        self.gpus.iter().find(|g| g.primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu(device: DeviceId, primary: bool) -> GpuInfo {
        GpuInfo {
            vendor: GpuVendor::Intel,
            device,
            family: "ice-lake".into(),
            integrated: true,
            vram_class: 0,
            display_outputs: 3,
            primary,
            disabled: false,
        }
    }

    fn profile() -> HardwareProfile {
        HardwareProfile {
            cpu: CpuInfo {
                vendor: CpuVendor::Intel,
                generation: 10,
                performance_cores: 4,
                efficiency_cores: 0,
                logical_processors: 8,
            },
            gpus: vec![gpu(DeviceId::new(0x8086, 0x8a52), true)],
            chipset: DeviceId::new(0x8086, 0x3482),
            storage: Vec::new(),
            network: Vec::new(),
            audio: Vec::new(),
            usb: Vec::new(),
            target_os: OsVersion::new(13, 0),
            display_required: true,
            suppress_tpm: false,
        }
    }

    #[test]
    fn valid_profile_passes() {
        profile().validate().unwrap();
    }

    #[test]
    fn core_counts_must_fit_logical_processors() {
        let mut p = profile();
        p.cpu.performance_cores = 6;
        p.cpu.efficiency_cores = 4;
        p.cpu.logical_processors = 8;
        assert!(matches!(
            p.validate(),
            Err(ProfileError::InconsistentTopology { .. })
        ));
    }

    #[test]
    fn at_least_one_gpu_required() {
        let mut p = profile();
        p.gpus.clear();
        assert_eq!(
            p.validate(),
            Err(ProfileError::MissingRequiredField("gpus"))
        );
    }

    #[test]
    fn exactly_one_primary_gpu_when_display_required() {
        let mut p = profile();
        p.gpus.push(gpu(DeviceId::new(0x1002, 0x73ff), true));
        assert!(matches!(
            p.validate(),
            Err(ProfileError::MultiplePrimaryGpus { .. })
        ));

        let mut p = profile();
        p.gpus[0].primary = false;
        assert_eq!(
            p.validate(),
            Err(ProfileError::MissingRequiredField("primary gpu"))
        );

        // Headless targets do not need a primary GPU.
        p.display_required = false;
        p.validate().unwrap();
    }
}
