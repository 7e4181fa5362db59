use std::fmt;

use crate::error::AmlParseError;
use crate::node::{AmlNode, AmlObject};
use crate::path::NameSeg;

pub const DSDT_SIGNATURE: [u8; 4] = *b"DSDT";
pub const SSDT_SIGNATURE: [u8; 4] = *b"SSDT";

pub(crate) const SDT_HEADER_LEN: usize = 36;

/// Decoded System Description Table header.
///
/// `length` and `checksum` reflect the parsed buffer; both are recomputed by
/// [`crate::encode`], which fixes the checksum so the byte sum of the full
/// buffer is zero modulo 256.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SdtHeader {
    pub signature: [u8; 4],
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: [u8; 4],
    pub creator_revision: u32,
}

impl SdtHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, AmlParseError> {
        if bytes.len() < SDT_HEADER_LEN {
            return Err(AmlParseError::TooShort { len: bytes.len() });
        }
        Ok(Self {
            signature: bytes[0..4].try_into().unwrap(),
            length: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            revision: bytes[8],
            checksum: bytes[9],
            oem_id: bytes[10..16].try_into().unwrap(),
            oem_table_id: bytes[16..24].try_into().unwrap(),
            oem_revision: u32::from_le_bytes(bytes[24..28].try_into().unwrap()),
            creator_id: bytes[28..32].try_into().unwrap(),
            creator_revision: u32::from_le_bytes(bytes[32..36].try_into().unwrap()),
        })
    }

    /// Serialize with a caller-supplied total length and a zeroed checksum
    /// byte; the encoder fills the checksum in last.
    pub(crate) fn to_bytes(self, total_len: u32) -> [u8; SDT_HEADER_LEN] {
        let mut out = [0u8; SDT_HEADER_LEN];
        out[0..4].copy_from_slice(&self.signature);
        out[4..8].copy_from_slice(&total_len.to_le_bytes());
        out[8] = self.revision;
        out[9] = 0; // checksum filled in by the encoder
        out[10..16].copy_from_slice(&self.oem_id);
        out[16..24].copy_from_slice(&self.oem_table_id);
        out[24..28].copy_from_slice(&self.oem_revision.to_le_bytes());
        out[28..32].copy_from_slice(&self.creator_id);
        out[32..36].copy_from_slice(&self.creator_revision.to_le_bytes());
        out
    }

    pub fn signature_str(&self) -> String {
        String::from_utf8_lossy(&self.signature).into_owned()
    }
}

impl fmt::Debug for SdtHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdtHeader")
            .field("signature", &self.signature_str())
            .field("length", &self.length)
            .field("revision", &self.revision)
            .field("checksum", &self.checksum)
            .field("oem_id", &String::from_utf8_lossy(&self.oem_id))
            .field("oem_table_id", &String::from_utf8_lossy(&self.oem_table_id))
            .field("oem_revision", &self.oem_revision)
            .finish()
    }
}

/// A parsed ACPI table: header plus the namespace tree decoded from its AML
/// body. The synthetic root node is a scope holding the table's top-level
/// terms; it is not itself part of the namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct AmlTable {
    pub header: SdtHeader,
    pub root: AmlNode,
}

impl AmlTable {
    /// Construct a fresh table (builder path, used for supplemental SSDTs and
    /// test fixtures). OEM fields follow the conventions of the tables this
    /// tool emits.
    pub fn new(signature: [u8; 4], oem_table_id: [u8; 8], children: Vec<AmlNode>) -> Self {
        let header = SdtHeader {
            signature,
            length: 0, // recomputed on encode
            revision: 2,
            checksum: 0,
            oem_id: *b"KEEL  ",
            oem_table_id,
            oem_revision: 1,
            creator_id: *b"KEEL",
            creator_revision: 1,
        };
        Self {
            header,
            root: AmlNode::with_children(NameSeg::new("ROOT"), AmlObject::Scope, children),
        }
    }

    pub fn is_dsdt(&self) -> bool {
        self.header.signature == DSDT_SIGNATURE
    }
}
