//! Static compatibility database: hardware identifier → capability facts.
//!
//! The database is a flat, declaration-ordered list of [`CompatibilityEntry`]
//! rows plus a few global policy knobs. It is loaded once per run (from JSON
//! or built programmatically) and never written afterwards, so it can be
//! shared by reference across parse workers and the rule engine.
//!
//! Lookup picks the most specific matching row: exact device id, then the
//! smallest enclosing family range, then a vendor-only wildcard. Ties at
//! equal specificity go to the first-declared row, so database authors can
//! rely on declaration order.

mod db;
mod entry;

pub use db::{CompatibilityDb, DbError, DbPolicy};
pub use entry::{
    CompatibilityEntry, DeviceClass, DriverRequirement, GpuSpoofCandidate, IdMatch, PropertySpec,
    Quirk, SuppressionPolicy,
};
