use crate::error::AmlEncodeError;
use crate::node::{AmlData, AmlNode, AmlObject, AmlTerm};
use crate::opcodes::*;
use crate::table::AmlTable;

/// Maximum value a 4-byte AML PkgLength can encode (28 bits).
pub const MAX_PKG_LENGTH: usize = 0x0FFF_FFFF;

/// Encode a raw PkgLength value.
pub fn encode_pkg_length(len: usize) -> Result<Vec<u8>, AmlEncodeError> {
    if len > MAX_PKG_LENGTH {
        return Err(AmlEncodeError::PackageTooLarge { len });
    }

    if len <= 0x3F {
        return Ok(vec![len as u8]);
    }
    if len <= 0x0FFF {
        return Ok(vec![0x40 | (len as u8 & 0x0F), (len >> 4) as u8]);
    }
    if len <= 0x000F_FFFF {
        return Ok(vec![
            0x80 | (len as u8 & 0x0F),
            (len >> 4) as u8,
            (len >> 12) as u8,
        ]);
    }
    Ok(vec![
        0xC0 | (len as u8 & 0x0F),
        (len >> 4) as u8,
        (len >> 12) as u8,
        (len >> 20) as u8,
    ])
}

/// PkgLength for a package whose payload is `payload_len` bytes. The encoded
/// value includes the PkgLength field itself (but not the opcode bytes), so
/// the value depends on its own encoded width; iterate until it settles.
pub fn pkg_length_for_payload(payload_len: usize) -> Result<Vec<u8>, AmlEncodeError> {
    let mut total = payload_len
        .checked_add(1)
        .ok_or(AmlEncodeError::PackageTooLarge { len: payload_len })?;
    loop {
        let enc = encode_pkg_length(total)?;
        let next = payload_len
            .checked_add(enc.len())
            .ok_or(AmlEncodeError::PackageTooLarge { len: payload_len })?;
        if next == total {
            return Ok(enc);
        }
        total = next;
    }
}

/// Re-serialize a parsed (and possibly edited) table.
///
/// Package lengths are recomputed bottom-up (a node's length is known only
/// after its children encode, so encoding is post-order), then the header
/// length is rewritten and the checksum fixed so the byte sum of the whole
/// buffer is zero modulo 256.
pub fn encode(table: &AmlTable) -> Result<Vec<u8>, AmlEncodeError> {
    let mut body = Vec::new();
    for term in table.root.terms() {
        encode_term(term, &mut body)?;
    }

    let total_len = crate::table::SDT_HEADER_LEN + body.len();
    let mut out = Vec::with_capacity(total_len);
    out.extend_from_slice(&table.header.to_bytes(total_len as u32));
    out.extend_from_slice(&body);

    let sum: u8 = out.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    out[9] = (0u8).wrapping_sub(sum);
    Ok(out)
}

fn encode_term(term: &AmlTerm, out: &mut Vec<u8>) -> Result<(), AmlEncodeError> {
    match term {
        AmlTerm::Raw(raw) => {
            out.extend_from_slice(raw);
            Ok(())
        }
        AmlTerm::Node(node) => encode_node(node, out),
    }
}

fn encode_node(node: &AmlNode, out: &mut Vec<u8>) -> Result<(), AmlEncodeError> {
    let name = node.name();
    match node.object() {
        AmlObject::Scope => {
            let mut content = Vec::new();
            content.extend_from_slice(name.as_bytes());
            encode_children(node, &mut content)?;
            wrap_package(&[OP_SCOPE], content, out)
        }
        AmlObject::Device => {
            let mut content = Vec::new();
            content.extend_from_slice(name.as_bytes());
            encode_children(node, &mut content)?;
            wrap_package(&[EXT_PREFIX, EXT_DEVICE], content, out)
        }
        AmlObject::Processor {
            proc_id,
            pblk_addr,
            pblk_len,
        } => {
            let mut content = Vec::new();
            content.extend_from_slice(name.as_bytes());
            content.push(*proc_id);
            content.extend_from_slice(&pblk_addr.to_le_bytes());
            content.push(*pblk_len);
            encode_children(node, &mut content)?;
            wrap_package(&[EXT_PREFIX, EXT_PROCESSOR], content, out)
        }
        AmlObject::Method { flags, body } => {
            let mut content = Vec::with_capacity(5 + body.len());
            content.extend_from_slice(name.as_bytes());
            content.push(*flags);
            content.extend_from_slice(body);
            wrap_package(&[OP_METHOD], content, out)
        }
        AmlObject::Name(data) => {
            out.push(OP_NAME);
            out.extend_from_slice(name.as_bytes());
            encode_data(data, out)
        }
        AmlObject::OpRegion {
            space,
            offset,
            length,
        } => {
            out.push(EXT_PREFIX);
            out.push(EXT_OP_REGION);
            out.extend_from_slice(name.as_bytes());
            out.push(*space);
            out.extend_from_slice(offset);
            out.extend_from_slice(length);
            Ok(())
        }
        AmlObject::Field { flags, units } => {
            let mut content = Vec::with_capacity(5 + units.len());
            content.extend_from_slice(name.as_bytes());
            content.push(*flags);
            content.extend_from_slice(units);
            wrap_package(&[EXT_PREFIX, EXT_FIELD], content, out)
        }
    }
}

fn encode_children(node: &AmlNode, out: &mut Vec<u8>) -> Result<(), AmlEncodeError> {
    for term in node.terms() {
        encode_term(term, out)?;
    }
    Ok(())
}

fn wrap_package(
    opcode: &[u8],
    content: Vec<u8>,
    out: &mut Vec<u8>,
) -> Result<(), AmlEncodeError> {
    let pkg_len = pkg_length_for_payload(content.len())?;
    out.extend_from_slice(opcode);
    out.extend_from_slice(&pkg_len);
    out.extend_from_slice(&content);
    Ok(())
}

pub(crate) fn encode_integer(value: u64, out: &mut Vec<u8>) {
    match value {
        0 => out.push(OP_ZERO),
        1 => out.push(OP_ONE),
        v if v <= u8::MAX as u64 => {
            out.push(OP_BYTE_PREFIX);
            out.push(v as u8);
        }
        v if v <= u16::MAX as u64 => {
            out.push(OP_WORD_PREFIX);
            out.extend_from_slice(&(v as u16).to_le_bytes());
        }
        v if v <= u32::MAX as u64 => {
            out.push(OP_DWORD_PREFIX);
            out.extend_from_slice(&(v as u32).to_le_bytes());
        }
        v => {
            out.push(OP_QWORD_PREFIX);
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
}

fn encode_data(data: &AmlData, out: &mut Vec<u8>) -> Result<(), AmlEncodeError> {
    match data {
        AmlData::Integer(v) => {
            encode_integer(*v, out);
            Ok(())
        }
        AmlData::String(s) => {
            out.push(OP_STRING_PREFIX);
            out.extend_from_slice(s.as_bytes());
            out.push(0);
            Ok(())
        }
        AmlData::Buffer(bytes) => {
            let mut content = Vec::with_capacity(bytes.len() + 5);
            encode_integer(bytes.len() as u64, &mut content);
            content.extend_from_slice(bytes);
            wrap_package(&[OP_BUFFER], content, out)
        }
        AmlData::Package(elements) => {
            if elements.len() > 0xFF {
                return Err(AmlEncodeError::PackageCountOverflow {
                    count: elements.len(),
                });
            }
            let mut content = Vec::new();
            content.push(elements.len() as u8);
            for el in elements {
                encode_data(el, &mut content)?;
            }
            wrap_package(&[OP_PACKAGE], content, out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkg_length_boundaries() {
        assert_eq!(encode_pkg_length(0x00).unwrap(), vec![0x00]);
        assert_eq!(encode_pkg_length(0x3F).unwrap(), vec![0x3F]);
        assert_eq!(encode_pkg_length(0x40).unwrap(), vec![0x40, 0x04]);
        assert_eq!(encode_pkg_length(0x0FFF).unwrap().len(), 2);
        assert_eq!(encode_pkg_length(0x1000).unwrap().len(), 3);
        assert_eq!(encode_pkg_length(0x000F_FFFF).unwrap().len(), 3);
        assert_eq!(encode_pkg_length(0x0010_0000).unwrap().len(), 4);
        assert_eq!(encode_pkg_length(MAX_PKG_LENGTH).unwrap().len(), 4);
        assert_eq!(
            encode_pkg_length(MAX_PKG_LENGTH + 1),
            Err(AmlEncodeError::PackageTooLarge {
                len: MAX_PKG_LENGTH + 1
            })
        );
    }

    #[test]
    fn pkg_length_self_inclusion_converges() {
        // Payload 0x3E fits a 1-byte field (total 0x3F); payload 0x3F forces
        // a 2-byte field because the total would no longer fit 6 bits.
        assert_eq!(pkg_length_for_payload(0x3E).unwrap(), vec![0x3F]);
        assert_eq!(pkg_length_for_payload(0x3F).unwrap().len(), 2);
    }

    #[test]
    fn integer_encodings_are_minimal() {
        let mut out = Vec::new();
        encode_integer(0, &mut out);
        encode_integer(1, &mut out);
        encode_integer(0xAB, &mut out);
        encode_integer(0x1234, &mut out);
        assert_eq!(out, vec![0x00, 0x01, 0x0A, 0xAB, 0x0B, 0x34, 0x12]);
    }
}
