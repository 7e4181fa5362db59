//! ACPI table decoding, editing and re-encoding.
//!
//! This crate implements the subset of AML the patch planner needs: the
//! structural opcodes that shape the namespace (Scope/Device/Method/Name/
//! Processor/OperationRegion/Field). Anything else is preserved as raw byte
//! spans so an edited table re-encodes losslessly. It provides:
//!
//! - [`AmlTable::parse`]: SDT header + AML body into a navigable node tree
//! - [`find`]: exact-path and single-level-wildcard namespace queries
//! - local edits on [`AmlNode`] (rename, replace body, insert/remove child)
//! - [`encode`]: post-order re-serialization with recomputed package lengths
//!   and a zero-mod-256 table checksum
//! - [`SsdtBuilder`]: supplemental SSDTs carrying `_STA`-override stanzas
//!
//! It is not a general AML interpreter; method bodies stay as raw opcode
//! sequences apart from the `Return (...)` shapes the sleep/wake rules read.

mod build;
mod encode;
mod error;
mod node;
mod opcodes;
mod parse;
mod path;
mod table;

pub use build::{body, sta_zero_override, SsdtBuilder};
pub use encode::{encode, encode_pkg_length, pkg_length_for_payload, MAX_PKG_LENGTH};
pub use error::{AmlEditError, AmlEncodeError, AmlParseError, AmlPathError};
pub use node::{find, AmlData, AmlNode, AmlObject, AmlTerm, Walk};
pub use opcodes::{eisa_id_to_string, eisa_id_to_u32};
pub use path::{AmlPath, NameSeg, PathPattern};
pub use table::{AmlTable, SdtHeader, DSDT_SIGNATURE, SSDT_SIGNATURE};
