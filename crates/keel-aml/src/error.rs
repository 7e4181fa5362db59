use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmlParseError {
    #[error("table is shorter than an SDT header ({len} bytes)")]
    TooShort { len: usize },

    #[error("header declares {declared} bytes but the buffer holds {actual}")]
    LengthMismatch { declared: u32, actual: usize },

    #[error("malformed AML encoding at offset {offset:#x}")]
    MalformedEncoding { offset: usize },

    #[error("duplicate namespace path {path}")]
    DuplicatePath { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmlEncodeError {
    #[error("package payload of {len} bytes exceeds the 28-bit PkgLength maximum")]
    PackageTooLarge { len: usize },

    #[error("package holds {count} elements (AML maximum is 255)")]
    PackageCountOverflow { count: usize },
}

/// Path or pattern strings that cannot name an AML namespace location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmlPathError {
    #[error("empty path pattern")]
    EmptyPattern,

    #[error("invalid segment {seg:?} in {path:?}")]
    InvalidSegment { path: String, seg: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmlEditError {
    #[error("node is not a Method")]
    NotAMethod,

    #[error("node does not hold a Package")]
    NotAPackage,

    #[error("node does not hold an Integer")]
    NotAnInteger,

    #[error("package element {index} out of range")]
    IndexOutOfRange { index: usize },

    #[error("no child named {name}")]
    NoSuchChild { name: String },

    #[error("a sibling named {name} already exists")]
    DuplicateChild { name: String },
}
