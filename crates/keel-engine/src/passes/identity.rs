use keel_compat::DeviceClass;

use crate::directive::{PatchDirective, Subsystem};
use crate::engine::PlanCtx;

/// Platform identity pass. Emits the chipset entry's non-kernel properties
/// (`PlatformInfo.*` and friends); the `Kernel.*` subset belongs to the CPU
/// power pass. A missing platform entry was already warned about there.
pub(crate) fn run<'a>(ctx: &mut PlanCtx<'a>) {
    let profile = ctx.profile;
    let db = ctx.db;

    let Some(entry) = db.lookup_class(profile.chipset, DeviceClass::Platform) else {
        return;
    };

    for prop in &entry.properties {
        if prop.key_path.starts_with("Kernel.") {
            continue;
        }
        ctx.emit(
            Subsystem::Identity,
            PatchDirective::PropertyOverride {
                key_path: prop.key_path.clone(),
                value: prop.value.clone(),
            },
        );
    }
}
