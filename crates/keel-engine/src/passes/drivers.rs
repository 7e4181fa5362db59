use serde_json::Value;

use keel_compat::CompatibilityEntry;
use keel_profile::DeviceId;

use crate::directive::{PatchDirective, Subsystem};
use crate::engine::PlanCtx;

/// Driver pass. Collects the entries earlier passes selected, looks up the
/// rest of the profile's enabled peripherals, and emits one selection per
/// distinct driver id. Disabled (suppressed) devices never reach this pass,
/// so they contribute no drivers.
pub(crate) fn run<'a>(ctx: &mut PlanCtx<'a>) {
    let profile = ctx.profile;
    let db = ctx.db;
    let mut entries: Vec<&'a CompatibilityEntry> = std::mem::take(&mut ctx.selected);

    let peripherals = profile
        .network
        .iter()
        .filter(|n| !n.disabled)
        .map(|n| n.device)
        .chain(
            profile
                .storage
                .iter()
                .filter(|s| !s.disabled)
                .map(|s| s.device),
        )
        .chain(profile.usb.iter().map(|u| u.device));

    for id in peripherals {
        match db.lookup(id) {
            Some(entry) if entry.supported_os.contains(profile.target_os) => {
                emit_properties(ctx, entry);
                entries.push(entry);
            }
            Some(_) => ctx.warn(
                Subsystem::Drivers,
                id.to_string(),
                "not supported on the target OS version; no driver selected",
            ),
            None => ctx.warn(
                Subsystem::Drivers,
                id.to_string(),
                "no compatibility entry; no driver selected",
            ),
        }
    }

    for codec in &profile.audio {
        // HDA codec ids pack vendor and device into one 32-bit word.
        let id = DeviceId::new((codec.codec_id >> 16) as u16, codec.codec_id as u16);
        match db.lookup(id) {
            Some(entry) if entry.supported_os.contains(profile.target_os) => {
                emit_properties(ctx, entry);
                if let Some(layout) = codec.layout {
                    ctx.emit(
                        Subsystem::Drivers,
                        PatchDirective::PropertyOverride {
                            key_path: format!("DeviceProperties.{id}.layout-id"),
                            value: Value::from(layout),
                        },
                    );
                }
                entries.push(entry);
            }
            _ => ctx.warn(
                Subsystem::Drivers,
                id.to_string(),
                "no audio entry for this codec; sound left to OS defaults",
            ),
        }
    }

    let mut seen: Vec<&str> = Vec::new();
    for entry in entries {
        for req in &entry.drivers {
            // Duplicate requirements for one driver collapse to the first.
            if seen.contains(&req.id.as_str()) {
                continue;
            }
            seen.push(&req.id);
            ctx.emit(
                Subsystem::Drivers,
                PatchDirective::DriverSelection {
                    id: req.id.clone(),
                    mandatory: req.mandatory,
                    load_hint: req.load_hint,
                    depends_on: req.depends_on.clone(),
                },
            );
        }
    }
}

fn emit_properties<'a>(ctx: &mut PlanCtx<'a>, entry: &CompatibilityEntry) {
    for prop in &entry.properties {
        ctx.emit(
            Subsystem::Drivers,
            PatchDirective::PropertyOverride {
                key_path: prop.key_path.clone(),
                value: prop.value.clone(),
            },
        );
    }
}
