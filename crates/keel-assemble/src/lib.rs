//! Configuration assembly: turn a [`keel_engine::PatchPlan`] into artifacts.
//!
//! - [`assemble`]: merge property overrides into a [`ConfigTemplate`], apply
//!   node edits to the parsed tables and re-encode the ones they touch,
//!   build the supplemental SSDT, and put the selected drivers in load order
//! - merging is last-write-wins; every collision surfaces as a warning
//! - driver order is mandatory-first, then load hints, constrained by
//!   dependency edges; a cycle is the assembler's only ordering error
//!
//! Assembly is deterministic: the same plan over the same inputs yields
//! byte-identical tables and configuration text.

mod assemble;
mod config;
mod drivers;
mod error;

pub use assemble::{assemble, AssembledOutput, SUPPLEMENTAL_SSDT_NAME};
pub use config::{ConfigDocument, ConfigTemplate};
pub use error::AssembleError;
