use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ProfileError;

/// PCI-style vendor/device identifier pair.
///
/// The textual form is `"VVVV:DDDD"` with lowercase hex and no `0x` prefix
/// (the form `lspci -n` and the compatibility database rows use).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId {
    pub vendor: u16,
    pub device: u16,
}

impl DeviceId {
    pub const fn new(vendor: u16, device: u16) -> Self {
        Self { vendor, device }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor, self.device)
    }
}

impl FromStr for DeviceId {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ProfileError::UnrecognizedIdentifier(s.to_owned());
        let (vendor, device) = s.split_once(':').ok_or_else(bad)?;
        if vendor.len() != 4 || device.len() != 4 {
            return Err(bad());
        }
        let vendor = u16::from_str_radix(vendor, 16).map_err(|_| bad())?;
        let device = u16::from_str_radix(device, 16).map_err(|_| bad())?;
        Ok(Self { vendor, device })
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Target OS version (major.minor).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OsVersion {
    pub major: u16,
    pub minor: u16,
}

impl OsVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Inclusive OS version range; `max: None` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsVersionRange {
    pub min: OsVersion,
    #[serde(default)]
    pub max: Option<OsVersion>,
}

impl OsVersionRange {
    pub const fn from(min: OsVersion) -> Self {
        Self { min, max: None }
    }

    pub fn contains(&self, v: OsVersion) -> bool {
        v >= self.min && self.max.map_or(true, |max| v <= max)
    }
}
