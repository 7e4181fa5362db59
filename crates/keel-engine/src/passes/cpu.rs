use serde_json::json;

use keel_compat::DeviceClass;

use crate::directive::{PatchDirective, Subsystem};
use crate::engine::PlanCtx;

/// CPU power-management pass. Driven by the chipset's platform entry: its
/// `Kernel.*` properties are the power-management knobs. Hybrid topologies
/// additionally get an explicit core-layout hint, since the target OS
/// schedules efficiency cores wrongly without one.
pub(crate) fn run<'a>(ctx: &mut PlanCtx<'a>) {
    let profile = ctx.profile;
    let db = ctx.db;

    let Some(entry) = db.lookup_class(profile.chipset, DeviceClass::Platform) else {
        ctx.warn(
            Subsystem::CpuPower,
            profile.chipset.to_string(),
            "no platform entry for the chipset; skipping power-management properties",
        );
        return;
    };

    for prop in &entry.properties {
        if !prop.key_path.starts_with("Kernel.") {
            continue;
        }
        ctx.emit(
            Subsystem::CpuPower,
            PatchDirective::PropertyOverride {
                key_path: prop.key_path.clone(),
                value: prop.value.clone(),
            },
        );
    }

    if profile.cpu.efficiency_cores > 0 {
        ctx.emit(
            Subsystem::CpuPower,
            PatchDirective::PropertyOverride {
                key_path: "Kernel.Quirks.ProvideCpuTopology".to_owned(),
                value: json!({
                    "performance": profile.cpu.performance_cores,
                    "efficiency": profile.cpu.efficiency_cores,
                    "logical": profile.cpu.logical_processors,
                }),
            },
        );
    }

    ctx.selected.push(entry);
}
