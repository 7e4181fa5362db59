use serde::{Deserialize, Serialize};
use serde_json::Value;

use keel_profile::{DeviceId, OsVersionRange};

/// How an entry matches hardware identifiers, from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdMatch {
    /// Exact vendor+device pair.
    Exact(DeviceId),
    /// All devices of one vendor inside an inclusive device-id range
    /// (an architecture family).
    Family {
        vendor: u16,
        first: u16,
        last: u16,
    },
    /// Every device of a vendor.
    Vendor(u16),
}

impl IdMatch {
    pub fn matches(&self, id: DeviceId) -> bool {
        match *self {
            IdMatch::Exact(exact) => exact == id,
            IdMatch::Family {
                vendor,
                first,
                last,
            } => id.vendor == vendor && (first..=last).contains(&id.device),
            IdMatch::Vendor(vendor) => id.vendor == vendor,
        }
    }

    /// Sort key for specificity: lower is more specific. Family ranges break
    /// ties by size, so the smallest enclosing range wins.
    pub(crate) fn specificity(&self) -> (u8, u32) {
        match *self {
            IdMatch::Exact(_) => (0, 0),
            IdMatch::Family { first, last, .. } => (1, u32::from(last) - u32::from(first)),
            IdMatch::Vendor(_) => (2, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    Gpu,
    WifiAdapter,
    EthernetAdapter,
    NvmeController,
    AhciController,
    AudioCodec,
    UsbController,
    Tpm,
    Platform,
    Other,
}

/// How a device of this class gets hidden from the target OS. Fixed by the
/// database entry, not user-selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressionPolicy {
    /// Property override on the OS-enumerable device.
    Property,
    /// Firmware-level: `_STA` reports the device as not present.
    AcpiStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRequirement {
    pub id: String,
    /// Platform-mandatory drivers load first, in declaration order.
    #[serde(default)]
    pub mandatory: bool,
    /// Identifier of a driver this one must load after.
    #[serde(default)]
    pub depends_on: Option<String>,
    #[serde(default)]
    pub load_hint: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySpec {
    /// Dotted config key path, e.g. `"Kernel.Quirks.ProvideCpuTopology"`.
    pub key_path: String,
    pub value: Value,
}

/// A GPU the target OS supports natively, offered as a spoof target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuSpoofCandidate {
    pub device: DeviceId,
    /// Coarse VRAM bucket (0 = shared, then powers of two in GiB).
    pub vram_class: u8,
    pub display_outputs: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Quirk {
    /// The reported device id must be replaced with a supported one.
    SpoofRequired,
    /// The device only works without a display attached.
    HeadlessOnly,
    /// Minimum sleep state a wake-capable method under this device's scope
    /// may declare; lower immediate values get patched up to this.
    MinWakeState(u64),
}

/// One row of the database: an identifier pattern and the capability facts
/// that apply to matching hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityEntry {
    pub matcher: IdMatch,
    pub class: DeviceClass,
    pub supported_os: OsVersionRange,
    #[serde(default)]
    pub drivers: Vec<DriverRequirement>,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
    #[serde(default)]
    pub quirks: Vec<Quirk>,
    /// Suppression policy when the profile disables a matching device.
    #[serde(default)]
    pub suppression: Option<SuppressionPolicy>,
    /// ACPI hardware ids (`_HID`) identifying matching devices in the
    /// namespace, for firmware-level suppression.
    #[serde(default)]
    pub acpi_hids: Vec<String>,
    /// Namespace node names identifying matching devices when no `_HID`
    /// is declared.
    #[serde(default)]
    pub acpi_names: Vec<String>,
    /// Spoof targets for `Quirk::SpoofRequired` GPU entries.
    #[serde(default)]
    pub spoof_candidates: Vec<GpuSpoofCandidate>,
}

impl CompatibilityEntry {
    pub fn has_quirk(&self, quirk: &Quirk) -> bool {
        self.quirks.contains(quirk)
    }

    pub fn min_wake_state(&self) -> Option<u64> {
        self.quirks.iter().find_map(|q| match q {
            Quirk::MinWakeState(v) => Some(*v),
            _ => None,
        })
    }
}
