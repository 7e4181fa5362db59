use std::fmt;
use std::str::FromStr;

use crate::error::{AmlParseError, AmlPathError};
use crate::opcodes::{is_lead_name_char, is_name_char};

/// Four-byte ACPI name segment, case-normalized to uppercase.
///
/// Shorter names pad with `_` on the right, matching how iasl spells them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameSeg([u8; 4]);

impl NameSeg {
    /// Builder-side constructor; panics on names AML cannot encode.
    pub fn new(name: &str) -> Self {
        let bytes = name.as_bytes();
        assert!(
            !bytes.is_empty() && bytes.len() <= 4,
            "ACPI name segment must be 1..=4 bytes, got {name:?}"
        );
        let mut out = [b'_'; 4];
        out[..bytes.len()].copy_from_slice(bytes);
        for b in &mut out {
            *b = b.to_ascii_uppercase();
        }
        assert!(
            is_lead_name_char(out[0]) && out[1..].iter().all(|&b| is_name_char(b)),
            "invalid ACPI name segment {name:?}"
        );
        Self(out)
    }

    /// Parser-side constructor; normalizes case once, at decode time.
    pub fn from_bytes(raw: [u8; 4], offset: usize) -> Result<Self, AmlParseError> {
        let mut out = raw;
        for b in &mut out {
            *b = b.to_ascii_uppercase();
        }
        if !is_lead_name_char(out[0]) || !out[1..].iter().all(|&b| is_name_char(b)) {
            return Err(AmlParseError::MalformedEncoding { offset });
        }
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Constructors only admit ASCII.
        std::str::from_utf8(&self.0).unwrap()
    }

    /// Name without the `_` padding iasl-style spellings drop.
    pub fn trimmed(&self) -> &str {
        self.as_str().trim_end_matches('_')
    }
}

impl fmt::Display for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for NameSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameSeg({})", self.as_str())
    }
}

/// Absolute namespace path (root-anchored).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AmlPath {
    segs: Vec<NameSeg>,
}

impl AmlPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segs(segs: Vec<NameSeg>) -> Self {
        Self { segs }
    }

    pub fn segs(&self) -> &[NameSeg] {
        &self.segs
    }

    pub fn is_root(&self) -> bool {
        self.segs.is_empty()
    }

    pub fn child(&self, seg: NameSeg) -> Self {
        let mut segs = self.segs.clone();
        segs.push(seg);
        Self { segs }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segs.is_empty() {
            return None;
        }
        Some(Self {
            segs: self.segs[..self.segs.len() - 1].to_vec(),
        })
    }

    pub fn last(&self) -> Option<NameSeg> {
        self.segs.last().copied()
    }
}

impl fmt::Display for AmlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\\")?;
        for (i, seg) in self.segs.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(seg.as_str())?;
        }
        Ok(())
    }
}

impl fmt::Debug for AmlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AmlPath({self})")
    }
}

fn checked_seg(path: &str, seg: &str) -> Result<NameSeg, AmlPathError> {
    let bytes = seg.as_bytes();
    let valid = (1..=4).contains(&bytes.len())
        && is_lead_name_char(bytes[0])
        && bytes[1..].iter().all(|&b| is_name_char(b));
    if !valid {
        return Err(AmlPathError::InvalidSegment {
            path: path.to_owned(),
            seg: seg.to_owned(),
        });
    }
    Ok(NameSeg::new(seg))
}

impl FromStr for AmlPath {
    type Err = AmlPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('\\').unwrap_or(s);
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let segs = rest
            .split('.')
            .map(|seg| checked_seg(s, seg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segs })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternSeg {
    Exact(NameSeg),
    /// Single-level wildcard (`*`): matches exactly one segment.
    Any,
}

/// Namespace query pattern: an absolute path where any segment may be `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segs: Vec<PatternSeg>,
}

impl PathPattern {
    pub fn matches(&self, path: &AmlPath) -> bool {
        if path.segs.len() != self.segs.len() {
            return false;
        }
        self.segs
            .iter()
            .zip(path.segs.iter())
            .all(|(p, s)| match p {
                PatternSeg::Any => true,
                PatternSeg::Exact(seg) => seg == s,
            })
    }

    /// Whether `path` could be a strict ancestor of a matching path.
    pub fn matches_prefix(&self, path: &AmlPath) -> bool {
        if path.segs.len() >= self.segs.len() {
            return false;
        }
        self.segs
            .iter()
            .zip(path.segs.iter())
            .all(|(p, s)| match p {
                PatternSeg::Any => true,
                PatternSeg::Exact(seg) => seg == s,
            })
    }
}

impl FromStr for PathPattern {
    type Err = AmlPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('\\').unwrap_or(s);
        if rest.is_empty() {
            return Err(AmlPathError::EmptyPattern);
        }
        let segs = rest
            .split('.')
            .map(|seg| {
                if seg == "*" {
                    Ok(PatternSeg::Any)
                } else {
                    checked_seg(s, seg).map(PatternSeg::Exact)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segs })
    }
}

impl From<&AmlPath> for PathPattern {
    fn from(path: &AmlPath) -> Self {
        Self {
            segs: path.segs.iter().map(|&s| PatternSeg::Exact(s)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_seg_pads_and_uppercases() {
        assert_eq!(NameSeg::new("sb").as_str(), "SB__");
        assert_eq!(NameSeg::new("_PRW").as_str(), "_PRW");
        assert_eq!(NameSeg::new("gfx0").trimmed(), "GFX0");
    }

    #[test]
    fn parse_time_case_normalization() {
        let seg = NameSeg::from_bytes(*b"tpm_", 0).unwrap();
        assert_eq!(seg.as_str(), "TPM_");
        assert!(NameSeg::from_bytes(*b"1BAD", 7).is_err());
    }

    #[test]
    fn path_display_and_parse() {
        let path: AmlPath = "\\_SB.PCI0.GFX0".parse().unwrap();
        assert_eq!(path.to_string(), "\\_SB_.PCI0.GFX0");
        assert_eq!(path.segs().len(), 3);
        assert_eq!(AmlPath::root().to_string(), "\\");
    }

    #[test]
    fn bad_path_strings_are_typed_errors() {
        assert_eq!(
            "\\_SB.TOOLONG".parse::<AmlPath>(),
            Err(AmlPathError::InvalidSegment {
                path: "\\_SB.TOOLONG".to_owned(),
                seg: "TOOLONG".to_owned(),
            })
        );
        assert_eq!(
            "\\_SB.1BAD".parse::<AmlPath>(),
            Err(AmlPathError::InvalidSegment {
                path: "\\_SB.1BAD".to_owned(),
                seg: "1BAD".to_owned(),
            })
        );
        assert_eq!("".parse::<PathPattern>(), Err(AmlPathError::EmptyPattern));
    }

    #[test]
    fn pattern_wildcard_is_single_level() {
        let pat: PathPattern = "\\_SB.*.WIFI".parse().unwrap();
        assert!(pat.matches(&"\\_SB.PCI0.WIFI".parse().unwrap()));
        assert!(!pat.matches(&"\\_SB.WIFI".parse().unwrap()));
        assert!(!pat.matches(&"\\_SB.PCI0.RP05.WIFI".parse().unwrap()));
        assert!(pat.matches_prefix(&"\\_SB.PCI0".parse().unwrap()));
        assert!(!pat.matches_prefix(&"\\_PR".parse().unwrap()));
    }
}
