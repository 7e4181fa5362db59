//! Boot-compatibility patching for commodity firmware.
//!
//! Given a [`HardwareProfile`] of the target machine, a [`CompatibilityDb`]
//! of known hardware, the machine's raw ACPI tables and a configuration
//! template, [`run`] produces everything a boot volume needs: a merged
//! configuration document, patched tables with valid checksums, an optional
//! supplemental SSDT and an ordered driver list.
//!
//! The member crates do the work:
//!
//! - `keel-profile`: the hardware model and its validation rules
//! - `keel-aml`: ACPI table parsing, editing and re-encoding
//! - `keel-compat`: the static hardware → capability database
//! - `keel-engine`: the pure planning passes producing a [`PatchPlan`]
//! - `keel-assemble`: applying a plan deterministically
//!
//! Runs are deterministic and idempotent: equal inputs give byte-equal
//! outputs, and feeding a run's patched tables back in changes nothing.

mod run;

pub use run::{run, RunError, RunOutput};

pub use keel_aml::{AmlParseError, AmlTable, SdtHeader};
pub use keel_assemble::{
    AssembleError, AssembledOutput, ConfigDocument, ConfigTemplate, SUPPLEMENTAL_SSDT_NAME,
};
pub use keel_compat::{CompatibilityDb, CompatibilityEntry, DbPolicy, DeviceClass, IdMatch};
pub use keel_engine::{EngineError, PatchDirective, PatchPlan, Subsystem, Warning};
pub use keel_profile::{
    DeviceId, HardwareProfile, OsVersion, OsVersionRange, ProfileError,
};
