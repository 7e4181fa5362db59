use thiserror::Error;

use keel_aml::AmlTable;
use keel_compat::{CompatibilityDb, CompatibilityEntry};
use keel_profile::{DeviceId, HardwareProfile, OsVersion};

use crate::directive::{PatchDirective, PatchPlan, Subsystem, Warning};
use crate::passes;

/// The one hard stop: a GPU with no support path cannot produce a bootable
/// configuration, so no partial plan is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no compatibility entry supports GPU {device}")]
    UnsupportedGpu { device: DeviceId },
    #[error("GPU {device} has no support path on target OS {os}")]
    GpuOsUnsupported { device: DeviceId, os: OsVersion },
}

/// Run all planner passes over the profile, the database and the parsed
/// tables. Every non-GPU problem degrades to a [`Warning`] on the plan.
pub fn build_plan(
    profile: &HardwareProfile,
    db: &CompatibilityDb,
    tables: &[AmlTable],
) -> Result<PatchPlan, EngineError> {
    let mut ctx = PlanCtx::new(profile, db, tables);
    passes::gpu::run(&mut ctx)?;
    passes::cpu::run(&mut ctx);
    passes::identity::run(&mut ctx);
    passes::sleep::run(&mut ctx);
    passes::suppress::run(&mut ctx);
    passes::drivers::run(&mut ctx);
    Ok(ctx.finish())
}

/// Shared planner state. Passes read the inputs and append directives into
/// their own bucket; ordering and deduplication happen once, in `finish`.
pub(crate) struct PlanCtx<'a> {
    pub(crate) profile: &'a HardwareProfile,
    pub(crate) db: &'a CompatibilityDb,
    pub(crate) tables: &'a [AmlTable],
    /// Entries whose driver requirements the drivers pass must emit, in
    /// selection order.
    pub(crate) selected: Vec<&'a CompatibilityEntry>,
    buckets: Vec<Vec<PatchDirective>>,
    warnings: Vec<Warning>,
}

impl<'a> PlanCtx<'a> {
    fn new(profile: &'a HardwareProfile, db: &'a CompatibilityDb, tables: &'a [AmlTable]) -> Self {
        Self {
            profile,
            db,
            tables,
            selected: Vec::new(),
            buckets: vec![Vec::new(); Subsystem::PASS_COUNT],
            warnings: Vec::new(),
        }
    }

    pub(crate) fn emit(&mut self, pass: Subsystem, directive: PatchDirective) {
        tracing::debug!(pass = %pass, ?directive, "planned");
        self.buckets[pass as usize].push(directive);
    }

    pub(crate) fn warn(&mut self, pass: Subsystem, subject: impl Into<String>, message: &str) {
        let warning = Warning {
            subsystem: pass,
            subject: subject.into(),
            message: message.to_owned(),
        };
        tracing::warn!(pass = %pass, subject = %warning.subject, message);
        self.warnings.push(warning);
    }

    fn finish(mut self) -> PatchPlan {
        let mut directives: Vec<PatchDirective> = Vec::new();
        for bucket in &mut self.buckets {
            // Stable sort: property overrides keep emission order, node edits
            // order by table and path, driver selections by id.
            bucket.sort_by_cached_key(sort_key);
            for directive in bucket.drain(..) {
                // Identical directives collapse to the first occurrence, so
                // re-planning the same inputs never stacks edits.
                if !directives.contains(&directive) {
                    directives.push(directive);
                }
            }
        }
        PatchPlan {
            directives,
            warnings: self.warnings,
        }
    }
}

fn sort_key(directive: &PatchDirective) -> (u8, usize, String) {
    match directive {
        PatchDirective::PropertyOverride { .. } => (0, 0, String::new()),
        PatchDirective::AcpiNodeEdit { table, path, .. } => (1, *table, path.to_string()),
        PatchDirective::AcpiNodeInsert { table, parent, .. } => {
            (1, table.map_or(usize::MAX, |t| t), parent.to_string())
        }
        PatchDirective::DriverSelection { id, .. } => (2, 0, id.clone()),
    }
}
