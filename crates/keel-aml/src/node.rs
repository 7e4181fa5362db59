use crate::error::AmlEditError;
use crate::opcodes::eisa_id_to_string;
use crate::path::{AmlPath, NameSeg, PathPattern};

/// Decoded data object held by a `Name` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmlData {
    Integer(u64),
    String(String),
    Buffer(Vec<u8>),
    Package(Vec<AmlData>),
}

impl AmlData {
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            AmlData::Integer(v) => Some(*v),
            _ => None,
        }
    }
}

/// What a namespace node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmlObject {
    Scope,
    Device,
    Processor {
        proc_id: u8,
        pblk_addr: u32,
        pblk_len: u8,
    },
    /// Method bodies stay raw; callers replace them with pre-encoded AML.
    Method { flags: u8, body: Vec<u8> },
    Name(AmlData),
    /// Region offset/length are preserved as raw term-arg spans.
    OpRegion {
        space: u8,
        offset: Vec<u8>,
        length: Vec<u8>,
    },
    /// Field group over the region the node is named after; units stay raw.
    Field { flags: u8, units: Vec<u8> },
}

/// One term in a body: either a named namespace node or a raw span this
/// library does not model (mutexes, aliases, power resources, ...). Raw
/// spans re-encode verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmlTerm {
    Node(AmlNode),
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmlNode {
    name: NameSeg,
    object: AmlObject,
    children: Vec<AmlTerm>,
}

impl AmlNode {
    pub fn new(name: NameSeg, object: AmlObject) -> Self {
        Self {
            name,
            object,
            children: Vec::new(),
        }
    }

    pub fn with_children(name: NameSeg, object: AmlObject, children: Vec<AmlNode>) -> Self {
        Self {
            name,
            object,
            children: children.into_iter().map(AmlTerm::Node).collect(),
        }
    }

    pub fn scope(name: &str, children: Vec<AmlNode>) -> Self {
        Self::with_children(NameSeg::new(name), AmlObject::Scope, children)
    }

    pub fn device(name: &str, children: Vec<AmlNode>) -> Self {
        Self::with_children(NameSeg::new(name), AmlObject::Device, children)
    }

    pub fn name_value(name: &str, data: AmlData) -> Self {
        Self::new(NameSeg::new(name), AmlObject::Name(data))
    }

    pub fn method(name: &str, arg_count: u8, serialized: bool, body: Vec<u8>) -> Self {
        assert!(arg_count <= 7, "AML methods take at most 7 arguments");
        let flags = (arg_count & 0x07) | if serialized { 0x08 } else { 0x00 };
        Self::new(NameSeg::new(name), AmlObject::Method { flags, body })
    }

    pub fn name(&self) -> NameSeg {
        self.name
    }

    pub fn object(&self) -> &AmlObject {
        &self.object
    }

    pub fn terms(&self) -> &[AmlTerm] {
        &self.children
    }

    pub(crate) fn push_term(&mut self, term: AmlTerm) {
        self.children.push(term);
    }

    pub(crate) fn into_terms(self) -> Vec<AmlTerm> {
        self.children
    }

    /// Child namespace nodes, skipping raw spans.
    pub fn nodes(&self) -> impl Iterator<Item = &AmlNode> {
        self.children.iter().filter_map(|t| match t {
            AmlTerm::Node(n) => Some(n),
            AmlTerm::Raw(_) => None,
        })
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut AmlNode> {
        self.children.iter_mut().filter_map(|t| match t {
            AmlTerm::Node(n) => Some(n),
            AmlTerm::Raw(_) => None,
        })
    }

    pub fn child(&self, name: NameSeg) -> Option<&AmlNode> {
        self.nodes().find(|n| n.name == name)
    }

    pub fn child_mut(&mut self, name: NameSeg) -> Option<&mut AmlNode> {
        self.nodes_mut().find(|n| n.name == name)
    }

    /// Descend along `segs` starting from this node.
    pub fn descend(&self, segs: &[NameSeg]) -> Option<&AmlNode> {
        let mut cur = self;
        for &seg in segs {
            cur = cur.child(seg)?;
        }
        Some(cur)
    }

    pub fn descend_mut(&mut self, segs: &[NameSeg]) -> Option<&mut AmlNode> {
        let mut cur = self;
        for &seg in segs {
            cur = cur.child_mut(seg)?;
        }
        Some(cur)
    }

    // ---- local edits -------------------------------------------------------

    pub fn rename(&mut self, name: NameSeg) {
        self.name = name;
    }

    pub fn set_method_body(&mut self, body: Vec<u8>) -> Result<(), AmlEditError> {
        match &mut self.object {
            AmlObject::Method { body: slot, .. } => {
                *slot = body;
                Ok(())
            }
            _ => Err(AmlEditError::NotAMethod),
        }
    }

    pub fn set_name_integer(&mut self, value: u64) -> Result<(), AmlEditError> {
        match &mut self.object {
            AmlObject::Name(AmlData::Integer(slot)) => {
                *slot = value;
                Ok(())
            }
            _ => Err(AmlEditError::NotAnInteger),
        }
    }

    /// Replace one immediate integer element of a `Name (..., Package (...))`
    /// without touching the surrounding structure.
    pub fn set_package_element(&mut self, index: usize, value: u64) -> Result<(), AmlEditError> {
        match &mut self.object {
            AmlObject::Name(AmlData::Package(elements)) => match elements.get_mut(index) {
                Some(AmlData::Integer(slot)) => {
                    *slot = value;
                    Ok(())
                }
                Some(_) => Err(AmlEditError::NotAnInteger),
                None => Err(AmlEditError::IndexOutOfRange { index }),
            },
            _ => Err(AmlEditError::NotAPackage),
        }
    }

    pub fn insert_child(&mut self, node: AmlNode) -> Result<(), AmlEditError> {
        if self.child(node.name).is_some() {
            return Err(AmlEditError::DuplicateChild {
                name: node.name.to_string(),
            });
        }
        self.children.push(AmlTerm::Node(node));
        Ok(())
    }

    pub fn remove_child(&mut self, name: NameSeg) -> Result<AmlNode, AmlEditError> {
        let pos = self.children.iter().position(|t| match t {
            AmlTerm::Node(n) => n.name == name,
            AmlTerm::Raw(_) => false,
        });
        match pos {
            Some(pos) => match self.children.remove(pos) {
                AmlTerm::Node(n) => Ok(n),
                AmlTerm::Raw(_) => unreachable!(),
            },
            None => Err(AmlEditError::NoSuchChild {
                name: name.to_string(),
            }),
        }
    }

    // ---- device helpers ----------------------------------------------------

    /// `_HID` of a Device node in textual form: string HIDs verbatim,
    /// integer HIDs unpacked from their EISA encoding.
    pub fn hardware_id(&self) -> Option<String> {
        let hid = self.child(NameSeg::new("_HID"))?;
        match hid.object() {
            AmlObject::Name(AmlData::String(s)) => Some(s.clone()),
            AmlObject::Name(AmlData::Integer(v)) => {
                u32::try_from(*v).ok().and_then(eisa_id_to_string)
            }
            _ => None,
        }
    }

    /// Pre-order walk of the subtree rooted here. `base` is this node's own
    /// path; children are yielded with their full paths.
    pub fn walk<'a>(&'a self, base: AmlPath) -> Walk<'a> {
        let mut stack = Vec::new();
        for node in self.nodes().collect::<Vec<_>>().into_iter().rev() {
            stack.push((base.child(node.name), node));
        }
        Walk { stack }
    }
}

/// Pre-order namespace iterator; re-walking yields identical results on an
/// unchanged tree.
pub struct Walk<'a> {
    stack: Vec<(AmlPath, &'a AmlNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (AmlPath, &'a AmlNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, node) = self.stack.pop()?;
        for child in node.nodes().collect::<Vec<_>>().into_iter().rev() {
            self.stack.push((path.child(child.name), child));
        }
        Some((path, node))
    }
}

/// Lazy namespace query: exact paths or single-level `*` wildcards.
///
/// Querying again re-walks the tree and produces identical results if it is
/// unchanged.
pub fn find<'a>(
    root: &'a AmlNode,
    pattern: &'a PathPattern,
) -> impl Iterator<Item = (AmlPath, &'a AmlNode)> + 'a {
    root.walk(AmlPath::root())
        .filter(move |(path, _)| pattern.matches(path))
}
