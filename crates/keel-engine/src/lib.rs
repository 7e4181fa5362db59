//! Patch-rule engine: hardware profile + compatibility database + parsed
//! tables → a declarative [`PatchPlan`].
//!
//! Planning is pure; nothing is applied here. Passes run in a fixed order
//! (GPU, CPU power, identity, sleep/wake, suppression, drivers) and the
//! finished plan is deduplicated and deterministically ordered, so equal
//! inputs always produce byte-equal plans. Every problem short of a GPU with
//! no support path degrades to a [`Warning`] on the plan rather than an
//! error.

mod directive;
mod engine;
mod passes;

pub use directive::{NodeEditOp, PatchDirective, PatchPlan, Subsystem, Warning};
pub use engine::{build_plan, EngineError};
