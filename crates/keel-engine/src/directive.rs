use std::fmt;

use serde_json::Value;

use keel_aml::{AmlNode, AmlPath, NameSeg};

/// Local edit applied to one existing namespace node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEditOp {
    Rename(NameSeg),
    /// Swap in a pre-encoded AML method body.
    ReplaceMethodBody(Vec<u8>),
    SetNameInteger(u64),
    /// Replace one immediate integer element of a `Name (..., Package (...))`.
    SetPackageElement { index: usize, value: u64 },
}

/// One planned change. Directives are declarative; nothing is applied until
/// the assembler runs the plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchDirective {
    /// Edit the node at `path` in the run's table `table` (index into the
    /// parsed-table list).
    AcpiNodeEdit {
        table: usize,
        path: AmlPath,
        op: NodeEditOp,
    },
    /// Insert `node` under `parent`. `table: None` routes the node into the
    /// run's supplemental SSDT instead of an existing table.
    AcpiNodeInsert {
        table: Option<usize>,
        parent: AmlPath,
        node: AmlNode,
    },
    /// A driver the assembled configuration must load.
    DriverSelection {
        id: String,
        mandatory: bool,
        load_hint: u32,
        depends_on: Option<String>,
    },
    /// Set one dotted key path in the configuration document.
    PropertyOverride { key_path: String, value: Value },
}

/// Where a directive or warning came from. Planner variants are listed in
/// pass execution order, which is also the directive ordering domain;
/// `Acpi` and `Assembly` only ever tag warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Subsystem {
    Gpu,
    CpuPower,
    Identity,
    SleepWake,
    Suppression,
    Drivers,
    Acpi,
    Assembly,
}

impl Subsystem {
    /// Planner passes only; `Assembly` has no directive bucket.
    pub(crate) const PASS_COUNT: usize = 6;

    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Gpu => "gpu",
            Subsystem::CpuPower => "cpu-power",
            Subsystem::Identity => "identity",
            Subsystem::SleepWake => "sleep-wake",
            Subsystem::Suppression => "suppression",
            Subsystem::Drivers => "drivers",
            Subsystem::Acpi => "acpi",
            Subsystem::Assembly => "assembly",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-fatal planning diagnostic. Warnings never abort a run; they travel
/// with the plan so callers can surface them next to the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub subsystem: Subsystem,
    /// What the warning is about: a device id, a namespace path, a key path.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.subsystem, self.subject, self.message)
    }
}

/// Output of [`crate::build_plan`]: deduplicated directives in deterministic
/// order (pass order, then namespace path for node edits, then driver id),
/// plus everything the planner wants to tell the user.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatchPlan {
    pub directives: Vec<PatchDirective>,
    pub warnings: Vec<Warning>,
}

impl PatchPlan {
    pub fn driver_ids(&self) -> impl Iterator<Item = &str> {
        self.directives.iter().filter_map(|d| match d {
            PatchDirective::DriverSelection { id, .. } => Some(id.as_str()),
            _ => None,
        })
    }
}
