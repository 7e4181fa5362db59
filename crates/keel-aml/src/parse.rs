use crate::error::AmlParseError;
use crate::node::{AmlData, AmlNode, AmlObject, AmlTerm};
use crate::opcodes::*;
use crate::path::{AmlPath, NameSeg};
use crate::table::{AmlTable, SdtHeader, SDT_HEADER_LEN};

impl AmlTable {
    /// Decode a full ACPI table buffer (SDT header + AML body).
    ///
    /// Any length field that would walk past the end of the buffer, and any
    /// unrecognized opcode in a position where a new term must start, fails
    /// with [`AmlParseError::MalformedEncoding`] carrying the byte offset.
    pub fn parse(bytes: &[u8]) -> Result<Self, AmlParseError> {
        let header = SdtHeader::parse(bytes)?;
        if header.length as usize != bytes.len() {
            return Err(AmlParseError::LengthMismatch {
                declared: header.length,
                actual: bytes.len(),
            });
        }

        let mut cur = Cursor {
            bytes,
            pos: SDT_HEADER_LEN,
        };
        let mut root = AmlNode::with_children(NameSeg::new("ROOT"), AmlObject::Scope, Vec::new());
        parse_term_list(&mut cur, bytes.len(), &mut root, &AmlPath::root())?;
        Ok(Self { header, root })
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn err(&self) -> AmlParseError {
        AmlParseError::MalformedEncoding { offset: self.pos }
    }

    fn u8(&mut self) -> Result<u8, AmlParseError> {
        let b = *self.bytes.get(self.pos).ok_or_else(|| self.err())?;
        self.pos += 1;
        Ok(b)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], AmlParseError> {
        let end = self.pos.checked_add(n).ok_or_else(|| self.err())?;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| self.err())?;
        self.pos = end;
        Ok(slice)
    }

    fn u16_le(&mut self) -> Result<u16, AmlParseError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32_le(&mut self) -> Result<u32, AmlParseError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64_le(&mut self) -> Result<u64, AmlParseError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn name_seg(&mut self) -> Result<NameSeg, AmlParseError> {
        let offset = self.pos;
        let raw: [u8; 4] = self.take(4)?.try_into().unwrap();
        NameSeg::from_bytes(raw, offset)
    }
}

/// Read a PkgLength field and return the end offset of the package. The
/// encoded length counts from the first byte of the field itself; a package
/// may never extend past `end`.
fn read_pkg_end(cur: &mut Cursor<'_>, end: usize) -> Result<usize, AmlParseError> {
    let start = cur.pos;
    let b0 = cur.u8()?;
    let follow = (b0 >> 6) as usize;
    let mut len = (b0 & 0x3F) as usize;
    if follow > 0 {
        // With follow bytes, only the low nibble of the lead byte is used.
        len &= 0x0F;
        for i in 0..follow {
            let b = cur.u8()?;
            len |= (b as usize) << (4 + i * 8);
        }
    }
    let pkg_end = start
        .checked_add(len)
        .ok_or(AmlParseError::MalformedEncoding { offset: start })?;
    if pkg_end < cur.pos || pkg_end > end {
        return Err(AmlParseError::MalformedEncoding { offset: start });
    }
    Ok(pkg_end)
}

struct ParsedName {
    anchored: bool,
    parents: usize,
    segs: Vec<NameSeg>,
}

fn parse_name_string(cur: &mut Cursor<'_>) -> Result<ParsedName, AmlParseError> {
    let mut anchored = false;
    let mut parents = 0usize;
    if cur.peek() == Some(NAME_ROOT_PREFIX) {
        cur.pos += 1;
        anchored = true;
    } else {
        while cur.peek() == Some(NAME_PARENT_PREFIX) {
            cur.pos += 1;
            parents += 1;
        }
    }

    let segs = match cur.peek() {
        Some(NAME_NULL) => {
            cur.pos += 1;
            Vec::new()
        }
        Some(NAME_DUAL_PREFIX) => {
            cur.pos += 1;
            vec![cur.name_seg()?, cur.name_seg()?]
        }
        Some(NAME_MULTI_PREFIX) => {
            cur.pos += 1;
            let count = cur.u8()? as usize;
            let mut segs = Vec::with_capacity(count);
            for _ in 0..count {
                segs.push(cur.name_seg()?);
            }
            segs
        }
        Some(b) if is_lead_name_char(b) => vec![cur.name_seg()?],
        _ => return Err(cur.err()),
    };

    Ok(ParsedName {
        anchored,
        parents,
        segs,
    })
}

/// Insert a parsed node among `parent`'s terms. Re-opened scopes merge into
/// the existing scope node; any other sibling name collision violates the
/// path-uniqueness invariant.
fn insert_node(
    parent: &mut AmlNode,
    node: AmlNode,
    path: &AmlPath,
) -> Result<(), AmlParseError> {
    if let Some(existing) = parent.child_mut(node.name()) {
        let both_scopes = matches!(existing.object(), AmlObject::Scope)
            && matches!(node.object(), AmlObject::Scope);
        if both_scopes {
            let child_path = path.child(node.name());
            for term in node.into_terms() {
                match term {
                    AmlTerm::Node(n) => insert_node(existing, n, &child_path)?,
                    AmlTerm::Raw(raw) => existing.push_term(AmlTerm::Raw(raw)),
                }
            }
            return Ok(());
        }
        return Err(AmlParseError::DuplicatePath {
            path: path.child(node.name()).to_string(),
        });
    }
    parent.push_term(AmlTerm::Node(node));
    Ok(())
}

fn parse_term_list(
    cur: &mut Cursor<'_>,
    end: usize,
    parent: &mut AmlNode,
    path: &AmlPath,
) -> Result<(), AmlParseError> {
    while cur.pos < end {
        let start = cur.pos;
        let op = cur.u8()?;
        match op {
            OP_SCOPE => {
                let pkg_end = read_pkg_end(cur, end)?;
                let name = parse_name_string(cur)?;
                if name.parents > 0 || name.segs.is_empty() {
                    return Err(AmlParseError::MalformedEncoding { offset: start });
                }
                // A root-anchored scope re-opens a path from the table root;
                // only supported where the term list *is* the root's.
                if name.anchored && !path.is_root() {
                    return Err(AmlParseError::MalformedEncoding { offset: start });
                }

                // Build the (possibly multi-segment) scope chain, parse the
                // body into the innermost scope, then merge into the tree.
                let mut chain_path = path.clone();
                for &seg in &name.segs {
                    chain_path = chain_path.child(seg);
                }
                let mut inner = AmlNode::new(*name.segs.last().unwrap(), AmlObject::Scope);
                parse_term_list(cur, pkg_end, &mut inner, &chain_path)?;
                let mut node = inner;
                for &seg in name.segs[..name.segs.len() - 1].iter().rev() {
                    node = AmlNode::with_children(seg, AmlObject::Scope, vec![node]);
                }
                insert_node(parent, node, path)?;
            }
            OP_NAME => {
                let name = parse_single_seg(cur, start)?;
                let data = parse_data_object(cur, end)?;
                insert_node(parent, AmlNode::new(name, AmlObject::Name(data)), path)?;
            }
            OP_METHOD => {
                let pkg_end = read_pkg_end(cur, end)?;
                let name = parse_single_seg(cur, start)?;
                let flags = cur.u8()?;
                // The declared package must at least cover its own name and
                // flags; anything shorter would leave the cursor past the
                // package boundary.
                if cur.pos > pkg_end {
                    return Err(AmlParseError::MalformedEncoding { offset: start });
                }
                let body = cur.take(pkg_end - cur.pos)?.to_vec();
                insert_node(
                    parent,
                    AmlNode::new(name, AmlObject::Method { flags, body }),
                    path,
                )?;
            }
            OP_ALIAS => {
                parse_name_string(cur)?;
                parse_name_string(cur)?;
                parent.push_term(AmlTerm::Raw(cur.bytes[start..cur.pos].to_vec()));
            }
            OP_CREATE_DWORD_FIELD | OP_CREATE_WORD_FIELD | OP_CREATE_BYTE_FIELD
            | OP_CREATE_BIT_FIELD | OP_CREATE_QWORD_FIELD => {
                parse_term_arg(cur)?; // source buffer
                parse_term_arg(cur)?; // index
                parse_name_string(cur)?;
                parent.push_term(AmlTerm::Raw(cur.bytes[start..cur.pos].to_vec()));
            }
            EXT_PREFIX => {
                let ext = cur.u8()?;
                match ext {
                    EXT_DEVICE => {
                        let pkg_end = read_pkg_end(cur, end)?;
                        let name = parse_single_seg(cur, start)?;
                        let mut node = AmlNode::new(name, AmlObject::Device);
                        parse_term_list(cur, pkg_end, &mut node, &path.child(name))?;
                        insert_node(parent, node, path)?;
                    }
                    EXT_PROCESSOR => {
                        let pkg_end = read_pkg_end(cur, end)?;
                        let name = parse_single_seg(cur, start)?;
                        let proc_id = cur.u8()?;
                        let pblk_addr = cur.u32_le()?;
                        let pblk_len = cur.u8()?;
                        let mut node = AmlNode::new(
                            name,
                            AmlObject::Processor {
                                proc_id,
                                pblk_addr,
                                pblk_len,
                            },
                        );
                        parse_term_list(cur, pkg_end, &mut node, &path.child(name))?;
                        insert_node(parent, node, path)?;
                    }
                    EXT_OP_REGION => {
                        let name = parse_single_seg(cur, start)?;
                        let space = cur.u8()?;
                        let offset = parse_term_arg(cur)?;
                        let length = parse_term_arg(cur)?;
                        insert_node(
                            parent,
                            AmlNode::new(
                                name,
                                AmlObject::OpRegion {
                                    space,
                                    offset,
                                    length,
                                },
                            ),
                            path,
                        )?;
                    }
                    EXT_FIELD => {
                        let pkg_end = read_pkg_end(cur, end)?;
                        let region = parse_single_seg(cur, start)?;
                        let flags = cur.u8()?;
                        if cur.pos > pkg_end {
                            return Err(AmlParseError::MalformedEncoding { offset: start });
                        }
                        let units = cur.take(pkg_end - cur.pos)?.to_vec();
                        insert_node(
                            parent,
                            AmlNode::new(region, AmlObject::Field { flags, units }),
                            path,
                        )?;
                    }
                    EXT_MUTEX => {
                        parse_name_string(cur)?;
                        cur.u8()?; // sync flags
                        parent.push_term(AmlTerm::Raw(cur.bytes[start..cur.pos].to_vec()));
                    }
                    EXT_EVENT => {
                        parse_name_string(cur)?;
                        parent.push_term(AmlTerm::Raw(cur.bytes[start..cur.pos].to_vec()));
                    }
                    EXT_CREATE_FIELD => {
                        parse_term_arg(cur)?; // source buffer
                        parse_term_arg(cur)?; // bit index
                        parse_term_arg(cur)?; // bit count
                        parse_name_string(cur)?;
                        parent.push_term(AmlTerm::Raw(cur.bytes[start..cur.pos].to_vec()));
                    }
                    EXT_POWER_RES | EXT_THERMAL_ZONE | EXT_INDEX_FIELD | EXT_BANK_FIELD => {
                        let pkg_end = read_pkg_end(cur, end)?;
                        cur.take(pkg_end.saturating_sub(cur.pos))?;
                        parent.push_term(AmlTerm::Raw(cur.bytes[start..pkg_end].to_vec()));
                    }
                    _ => return Err(AmlParseError::MalformedEncoding { offset: start }),
                }
            }
            _ => return Err(AmlParseError::MalformedEncoding { offset: start }),
        }
    }
    Ok(())
}

/// Definitions we model carry plain single-segment names in practice; a
/// multi-segment name here is treated as malformed rather than silently
/// misplaced in the tree.
fn parse_single_seg(cur: &mut Cursor<'_>, start: usize) -> Result<NameSeg, AmlParseError> {
    let name = parse_name_string(cur)?;
    if name.anchored || name.parents > 0 || name.segs.len() != 1 {
        return Err(AmlParseError::MalformedEncoding { offset: start });
    }
    Ok(name.segs[0])
}

fn parse_data_object(cur: &mut Cursor<'_>, end: usize) -> Result<AmlData, AmlParseError> {
    let start = cur.pos;
    let op = cur.u8()?;
    match op {
        OP_ZERO => Ok(AmlData::Integer(0)),
        OP_ONE => Ok(AmlData::Integer(1)),
        OP_ONES => Ok(AmlData::Integer(u64::MAX)),
        OP_BYTE_PREFIX => Ok(AmlData::Integer(cur.u8()? as u64)),
        OP_WORD_PREFIX => Ok(AmlData::Integer(cur.u16_le()? as u64)),
        OP_DWORD_PREFIX => Ok(AmlData::Integer(cur.u32_le()? as u64)),
        OP_QWORD_PREFIX => Ok(AmlData::Integer(cur.u64_le()?)),
        OP_STRING_PREFIX => {
            let mut out = Vec::new();
            loop {
                let b = cur.u8()?;
                if b == 0 {
                    break;
                }
                out.push(b);
            }
            String::from_utf8(out)
                .map(AmlData::String)
                .map_err(|_| AmlParseError::MalformedEncoding { offset: start })
        }
        OP_BUFFER => {
            let pkg_end = read_pkg_end(cur, end)?;
            // Buffer size must be an immediate integer in the tables we edit.
            match parse_data_object(cur, pkg_end)? {
                AmlData::Integer(_) => {}
                _ => return Err(AmlParseError::MalformedEncoding { offset: start }),
            }
            if cur.pos > pkg_end {
                return Err(AmlParseError::MalformedEncoding { offset: start });
            }
            let data = cur.take(pkg_end - cur.pos)?.to_vec();
            Ok(AmlData::Buffer(data))
        }
        OP_PACKAGE => {
            let pkg_end = read_pkg_end(cur, end)?;
            let _num_elements = cur.u8()?;
            let mut elements = Vec::new();
            while cur.pos < pkg_end {
                elements.push(parse_data_object(cur, pkg_end)?);
            }
            Ok(AmlData::Package(elements))
        }
        _ => Err(AmlParseError::MalformedEncoding { offset: start }),
    }
}

/// Capture one term argument (immediate integer or a name reference) as a raw
/// span, so region offsets/lengths re-encode verbatim.
fn parse_term_arg(cur: &mut Cursor<'_>) -> Result<Vec<u8>, AmlParseError> {
    let start = cur.pos;
    match cur.peek().ok_or_else(|| cur.err())? {
        OP_ZERO | OP_ONE | OP_ONES => {
            cur.pos += 1;
        }
        OP_BYTE_PREFIX => {
            cur.pos += 1;
            cur.u8()?;
        }
        OP_WORD_PREFIX => {
            cur.pos += 1;
            cur.u16_le()?;
        }
        OP_DWORD_PREFIX => {
            cur.pos += 1;
            cur.u32_le()?;
        }
        OP_QWORD_PREFIX => {
            cur.pos += 1;
            cur.u64_le()?;
        }
        b if b == NAME_ROOT_PREFIX
            || b == NAME_PARENT_PREFIX
            || b == NAME_DUAL_PREFIX
            || b == NAME_MULTI_PREFIX
            || is_lead_name_char(b) =>
        {
            parse_name_string(cur)?;
        }
        _ => return Err(cur.err()),
    }
    Ok(cur.bytes[start..cur.pos].to_vec())
}
