use serde_json::Value;

use keel_aml::{body, sta_zero_override, AmlData, AmlNode, AmlObject, AmlPath, NameSeg};
use keel_compat::{CompatibilityEntry, SuppressionPolicy};
use keel_profile::DeviceId;

use crate::directive::{NodeEditOp, PatchDirective, Subsystem};
use crate::engine::PlanCtx;
use crate::passes::entry_matches_device;

/// Hardware ids firmware TPM devices declare.
const TPM_HIDS: [&str; 2] = ["PNP0C31", "MSFT0101"];
/// Node names TPM devices hide behind when they declare no `_HID`.
const TPM_NAMES: [&str; 4] = ["TPM", "TPM2", "PTT", "FTPM"];

/// Suppression pass. Devices the profile disables get hidden by whatever
/// policy their database entry declares; firmware TPMs get `_STA` overridden
/// to zero from a supplemental SSDT when the profile asks for it.
pub(crate) fn run<'a>(ctx: &mut PlanCtx<'a>) {
    let profile = ctx.profile;
    let db = ctx.db;

    let mut disabled: Vec<DeviceId> = Vec::new();
    disabled.extend(profile.gpus.iter().filter(|g| g.disabled).map(|g| g.device));
    disabled.extend(
        profile
            .network
            .iter()
            .filter(|n| n.disabled)
            .map(|n| n.device),
    );
    disabled.extend(
        profile
            .storage
            .iter()
            .filter(|s| s.disabled)
            .map(|s| s.device),
    );

    for id in disabled {
        let Some(entry) = db.lookup(id) else {
            ctx.warn(
                Subsystem::Suppression,
                id.to_string(),
                "no compatibility entry; cannot pick a suppression policy",
            );
            continue;
        };
        let policy = match entry.suppression {
            Some(policy) => policy,
            None => {
                ctx.warn(
                    Subsystem::Suppression,
                    id.to_string(),
                    "entry declares no suppression policy; using a property override",
                );
                SuppressionPolicy::Property
            }
        };
        match policy {
            SuppressionPolicy::Property => emit_property_suppression(ctx, id),
            SuppressionPolicy::AcpiStatus => suppress_in_namespace(ctx, entry, id),
        }
    }

    if profile.suppress_tpm {
        suppress_tpm(ctx);
    }
}

fn emit_property_suppression(ctx: &mut PlanCtx<'_>, id: DeviceId) {
    ctx.emit(
        Subsystem::Suppression,
        PatchDirective::PropertyOverride {
            key_path: format!("DeviceProperties.{id}.disable-device"),
            value: Value::Bool(true),
        },
    );
}

/// Hide `id` at the firmware level: force `_STA` of every matching namespace
/// device to report "not present".
fn suppress_in_namespace<'a>(ctx: &mut PlanCtx<'a>, entry: &CompatibilityEntry, id: DeviceId) {
    let tables = ctx.tables;
    let sta = NameSeg::new("_STA");
    let mut found = false;

    for (index, table) in tables.iter().enumerate() {
        for (path, node) in table.root.walk(AmlPath::root()) {
            if !matches!(node.object(), AmlObject::Device) || !entry_matches_device(entry, node) {
                continue;
            }
            found = true;
            match node.child(sta).map(AmlNode::object) {
                Some(AmlObject::Method { .. }) => ctx.emit(
                    Subsystem::Suppression,
                    PatchDirective::AcpiNodeEdit {
                        table: index,
                        path: path.child(sta),
                        op: NodeEditOp::ReplaceMethodBody(body::return_zero()),
                    },
                ),
                Some(AmlObject::Name(AmlData::Integer(_))) => ctx.emit(
                    Subsystem::Suppression,
                    PatchDirective::AcpiNodeEdit {
                        table: index,
                        path: path.child(sta),
                        op: NodeEditOp::SetNameInteger(0),
                    },
                ),
                Some(_) => ctx.warn(
                    Subsystem::Suppression,
                    path.child(sta).to_string(),
                    "status object is neither a method nor an integer; left unpatched",
                ),
                // No _STA at all: inject one that reports "not present".
                None => ctx.emit(
                    Subsystem::Suppression,
                    PatchDirective::AcpiNodeInsert {
                        table: Some(index),
                        parent: path,
                        node: AmlNode::method("_STA", 0, false, body::return_zero()),
                    },
                ),
            }
        }
    }

    if !found {
        ctx.warn(
            Subsystem::Suppression,
            id.to_string(),
            "no matching namespace device; falling back to a property override",
        );
        emit_property_suppression(ctx, id);
    }
}

fn suppress_tpm(ctx: &mut PlanCtx<'_>) {
    let tables = ctx.tables;
    let mut found = false;

    for table in tables {
        for (path, node) in table.root.walk(AmlPath::root()) {
            if !matches!(node.object(), AmlObject::Device) {
                continue;
            }
            let is_tpm = node
                .hardware_id()
                .map_or(false, |hid| {
                    TPM_HIDS.iter().any(|h| h.eq_ignore_ascii_case(&hid))
                })
                || TPM_NAMES
                    .iter()
                    .any(|n| n.eq_ignore_ascii_case(node.name().trimmed()));
            if !is_tpm {
                continue;
            }
            found = true;
            // Overriding from a supplemental SSDT keeps the base tables
            // untouched for this device.
            ctx.emit(
                Subsystem::Suppression,
                PatchDirective::AcpiNodeInsert {
                    table: None,
                    parent: AmlPath::root(),
                    node: sta_zero_override(&path),
                },
            );
        }
    }

    if !found {
        ctx.warn(
            Subsystem::Suppression,
            "tpm",
            "suppression requested but no TPM device found in the namespace",
        );
    }
}
