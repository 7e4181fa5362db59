//! Planner passes, in execution order. Each pass owns one subsystem and
//! appends directives to its own bucket; cross-pass state is limited to the
//! entry selections the drivers pass consumes.

pub(crate) mod cpu;
pub(crate) mod drivers;
pub(crate) mod gpu;
pub(crate) mod identity;
pub(crate) mod sleep;
pub(crate) mod suppress;

use keel_aml::AmlNode;
use keel_compat::CompatibilityEntry;

/// Whether a namespace device belongs to `entry`, by `_HID` or by node name.
pub(crate) fn entry_matches_device(entry: &CompatibilityEntry, node: &AmlNode) -> bool {
    if let Some(hid) = node.hardware_id() {
        if entry
            .acpi_hids
            .iter()
            .any(|h| h.eq_ignore_ascii_case(&hid))
        {
            return true;
        }
    }
    entry
        .acpi_names
        .iter()
        .any(|n| n.eq_ignore_ascii_case(node.name().trimmed()))
}
