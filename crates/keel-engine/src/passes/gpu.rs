use serde_json::Value;

use keel_compat::{DeviceClass, Quirk};
use keel_profile::GpuInfo;

use crate::directive::{PatchDirective, Subsystem};
use crate::engine::{EngineError, PlanCtx};

/// GPU pass. Every enabled GPU must have a support path; anything less is the
/// planner's only hard stop. Emits spoof overrides for `SpoofRequired`
/// entries and the entry's property set, minus display properties on
/// headless targets.
pub(crate) fn run<'a>(ctx: &mut PlanCtx<'a>) -> Result<(), EngineError> {
    let profile = ctx.profile;
    let db = ctx.db;

    for gpu in profile.active_gpus() {
        let entry = db
            .lookup_class(gpu.device, DeviceClass::Gpu)
            .ok_or(EngineError::UnsupportedGpu { device: gpu.device })?;
        if !entry.supported_os.contains(profile.target_os) {
            return Err(EngineError::GpuOsUnsupported {
                device: gpu.device,
                os: profile.target_os,
            });
        }

        let headless = !profile.display_required || entry.has_quirk(&Quirk::HeadlessOnly);
        if gpu.primary && profile.display_required && entry.has_quirk(&Quirk::HeadlessOnly) {
            ctx.warn(
                Subsystem::Gpu,
                gpu.device.to_string(),
                "primary GPU only works headless; display output will not come from it",
            );
        }

        if entry.has_quirk(&Quirk::SpoofRequired) {
            let target = entry
                .spoof_candidates
                .iter()
                .min_by_key(|c| {
                    (
                        c.vram_class.abs_diff(gpu.vram_class),
                        c.display_outputs.abs_diff(gpu.display_outputs),
                        c.device,
                    )
                })
                // Spoof-required with nothing to spoof as is no support path.
                .ok_or(EngineError::UnsupportedGpu { device: gpu.device })?;
            ctx.emit(
                Subsystem::Gpu,
                PatchDirective::PropertyOverride {
                    key_path: device_key(gpu, "device-id"),
                    value: Value::String(target.device.to_string()),
                },
            );
        }

        for prop in &entry.properties {
            if headless && prop.key_path.starts_with("Display.") {
                continue;
            }
            ctx.emit(
                Subsystem::Gpu,
                PatchDirective::PropertyOverride {
                    key_path: prop.key_path.clone(),
                    value: prop.value.clone(),
                },
            );
        }

        ctx.selected.push(entry);
    }
    Ok(())
}

fn device_key(gpu: &GpuInfo, leaf: &str) -> String {
    format!("DeviceProperties.{}.{leaf}", gpu.device)
}
