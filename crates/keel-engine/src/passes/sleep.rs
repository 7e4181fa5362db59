use keel_aml::{body, AmlData, AmlNode, AmlObject, AmlPath, NameSeg};
use keel_compat::CompatibilityDb;

use crate::directive::{NodeEditOp, PatchDirective, Subsystem};
use crate::engine::PlanCtx;

/// Sleep/wake pass. Scans every parsed table for `_PRW` wake declarations
/// and raises sleep states below the device's wake floor. The floor comes
/// from a `MinWakeState` quirk on the entry matching the device's `_HID` or
/// name, falling back to the database-wide default.
pub(crate) fn run<'a>(ctx: &mut PlanCtx<'a>) {
    let db = ctx.db;
    let tables = ctx.tables;
    let default_floor = db.policy().default_min_wake_state;
    let prw = NameSeg::new("_PRW");

    for (index, table) in tables.iter().enumerate() {
        for (path, node) in table.root.walk(AmlPath::root()) {
            if !matches!(
                node.object(),
                AmlObject::Device | AmlObject::Processor { .. }
            ) {
                continue;
            }
            let Some(wake) = node.child(prw) else {
                continue;
            };
            let floor = wake_floor(db, node).unwrap_or(default_floor);
            let wake_path = path.child(prw);

            match wake.object() {
                // Name (_PRW, Package () { pin, state, ... })
                AmlObject::Name(AmlData::Package(elements)) => match elements.get(1) {
                    Some(AmlData::Integer(state)) if *state < floor => {
                        ctx.emit(
                            Subsystem::SleepWake,
                            PatchDirective::AcpiNodeEdit {
                                table: index,
                                path: wake_path,
                                op: NodeEditOp::SetPackageElement {
                                    index: 1,
                                    value: floor,
                                },
                            },
                        );
                    }
                    Some(AmlData::Integer(_)) => {}
                    _ => ctx.warn(
                        Subsystem::SleepWake,
                        wake_path.to_string(),
                        "wake package carries no immediate sleep state; left unpatched",
                    ),
                },
                // Method (_PRW) { Return (Package () { ... }) }
                AmlObject::Method { body: raw, .. } => {
                    match body::decode_return_package(raw) {
                        Some(mut elements) if elements.len() >= 2 && elements[1] < floor => {
                            elements[1] = floor;
                            ctx.emit(
                                Subsystem::SleepWake,
                                PatchDirective::AcpiNodeEdit {
                                    table: index,
                                    path: wake_path,
                                    op: NodeEditOp::ReplaceMethodBody(body::return_package(
                                        &elements,
                                    )),
                                },
                            );
                        }
                        Some(_) => {}
                        None => ctx.warn(
                            Subsystem::SleepWake,
                            wake_path.to_string(),
                            "wake method body is not a literal package; left unpatched",
                        ),
                    }
                }
                _ => ctx.warn(
                    Subsystem::SleepWake,
                    wake_path.to_string(),
                    "unexpected object kind for a wake declaration",
                ),
            }
        }
    }
}

fn wake_floor(db: &CompatibilityDb, device: &AmlNode) -> Option<u64> {
    let hid = device.hardware_id();
    db.entries()
        .iter()
        .filter(|e| {
            hid.as_deref()
                .map_or(false, |h| e.acpi_hids.iter().any(|x| x.eq_ignore_ascii_case(h)))
                || e.acpi_names
                    .iter()
                    .any(|n| n.eq_ignore_ascii_case(device.name().trimmed()))
        })
        .find_map(|e| e.min_wake_state())
}
