use crate::node::{AmlNode, AmlObject};
use crate::path::{AmlPath, NameSeg};
use crate::table::{AmlTable, SSDT_SIGNATURE};

/// Pre-encoded AML method-body fragments.
///
/// The rule engine replaces method bodies with these rather than source-level
/// expressions; the shapes below are the only ones the planner ever needs to
/// read back.
pub mod body {
    use crate::encode::encode_integer;
    use crate::opcodes::{
        OP_BYTE_PREFIX, OP_DWORD_PREFIX, OP_ONE, OP_ONES, OP_PACKAGE, OP_QWORD_PREFIX,
        OP_RETURN, OP_WORD_PREFIX, OP_ZERO,
    };

    /// `Return (value)`
    pub fn return_integer(value: u64) -> Vec<u8> {
        let mut out = vec![OP_RETURN];
        encode_integer(value, &mut out);
        out
    }

    /// `Return (Zero)`, the `_STA` body that hides a device from the OS.
    pub fn return_zero() -> Vec<u8> {
        return_integer(0)
    }

    /// `Return (Package () { ... })` with integer elements.
    pub fn return_package(elements: &[u64]) -> Vec<u8> {
        assert!(elements.len() <= 0xFF, "AML package too large");
        let mut content = vec![elements.len() as u8];
        for &el in elements {
            encode_integer(el, &mut content);
        }
        let pkg_len = crate::encode::pkg_length_for_payload(content.len())
            .expect("wake packages are tiny");

        let mut out = vec![OP_RETURN, OP_PACKAGE];
        out.extend_from_slice(&pkg_len);
        out.extend_from_slice(&content);
        out
    }

    fn decode_integer(bytes: &[u8], pos: usize) -> Option<(u64, usize)> {
        match *bytes.get(pos)? {
            OP_ZERO => Some((0, pos + 1)),
            OP_ONE => Some((1, pos + 1)),
            OP_ONES => Some((u64::MAX, pos + 1)),
            OP_BYTE_PREFIX => Some((*bytes.get(pos + 1)? as u64, pos + 2)),
            OP_WORD_PREFIX => Some((
                u16::from_le_bytes(bytes.get(pos + 1..pos + 3)?.try_into().ok()?) as u64,
                pos + 3,
            )),
            OP_DWORD_PREFIX => Some((
                u32::from_le_bytes(bytes.get(pos + 1..pos + 5)?.try_into().ok()?) as u64,
                pos + 5,
            )),
            OP_QWORD_PREFIX => Some((
                u64::from_le_bytes(bytes.get(pos + 1..pos + 9)?.try_into().ok()?),
                pos + 9,
            )),
            _ => None,
        }
    }

    fn parse_pkg_length(bytes: &[u8], offset: usize) -> Option<(usize, usize)> {
        let b0 = *bytes.get(offset)?;
        let follow = (b0 >> 6) as usize;
        let mut len = (b0 & 0x3F) as usize;
        if follow > 0 {
            len &= 0x0F;
            for i in 0..follow {
                let b = *bytes.get(offset + 1 + i)?;
                len |= (b as usize) << (4 + i * 8);
            }
        }
        Some((len, 1 + follow))
    }

    /// Decode a body of the exact shape `Return (integer)`.
    pub fn decode_return_integer(body: &[u8]) -> Option<u64> {
        if body.first() != Some(&OP_RETURN) {
            return None;
        }
        let (value, end) = decode_integer(body, 1)?;
        (end == body.len()).then_some(value)
    }

    /// Decode a body of the exact shape `Return (Package () { int, ... })`.
    pub fn decode_return_package(body: &[u8]) -> Option<Vec<u64>> {
        if body.first() != Some(&OP_RETURN) || body.get(1) != Some(&OP_PACKAGE) {
            return None;
        }
        let (pkg_len, consumed) = parse_pkg_length(body, 2)?;
        if 2 + pkg_len != body.len() {
            return None;
        }
        let mut pos = 2 + consumed;
        let count = *body.get(pos)? as usize;
        pos += 1;
        let mut out = Vec::with_capacity(count);
        while pos < body.len() {
            let (value, next) = decode_integer(body, pos)?;
            out.push(value);
            pos = next;
        }
        (out.len() == count).then_some(out)
    }
}

/// Build the subtree that overrides a device's `_STA` to `Return (Zero)`:
/// nested scopes re-opening the device path, with the method innermost.
/// This is how a supplemental SSDT hides a firmware device (TPM and friends)
/// without touching the DSDT.
pub fn sta_zero_override(device_path: &AmlPath) -> AmlNode {
    assert!(
        !device_path.is_root(),
        "_STA override needs a device path, not the namespace root"
    );
    let mut node = AmlNode::method("_STA", 0, false, body::return_zero());
    for &seg in device_path.segs().iter().rev() {
        node = AmlNode::with_children(seg, AmlObject::Scope, vec![node]);
    }
    node
}

/// Builder for supplemental SSDTs emitted alongside the patched base tables.
#[derive(Debug, Clone)]
pub struct SsdtBuilder {
    oem_table_id: [u8; 8],
    children: Vec<AmlNode>,
}

impl SsdtBuilder {
    pub fn new(oem_table_id: &str) -> Self {
        let bytes = oem_table_id.as_bytes();
        assert!(bytes.len() <= 8, "OEM table id must be at most 8 bytes");
        let mut id = [b' '; 8];
        id[..bytes.len()].copy_from_slice(bytes);
        Self {
            oem_table_id: id,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, node: AmlNode) {
        self.children.push(node);
    }

    /// Append a `_STA → Zero` override for the device at `path`.
    pub fn disable_device(&mut self, path: &AmlPath) {
        self.children.push(sta_zero_override(path));
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn build(self) -> AmlTable {
        AmlTable::new(SSDT_SIGNATURE, self.oem_table_id, self.children)
    }
}
