use log::warn;
use serde::Serialize;

/// Failure of a primitive read.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReadError {
    #[error("read of {needed} bytes at {offset:#x} runs past the end ({available} bytes left)")]
    OutOfBounds {
        offset: u64,
        needed: usize,
        available: usize,
    },
    #[error("descriptor length at {offset:#x} has more than 4 continuation bytes")]
    DescriptorLength { offset: u64 },
}

impl ReadError {
    /// Shift the reported offset by `base`, turning a slice-relative offset
    /// into an absolute one.
    pub(crate) fn rebase(self, base: u64) -> Self {
        match self {
            ReadError::OutOfBounds {
                offset,
                needed,
                available,
            } => ReadError::OutOfBounds {
                offset: offset + base,
                needed,
                available,
            },
            ReadError::DescriptorLength { offset } => ReadError::DescriptorLength {
                offset: offset + base,
            },
        }
    }
}

/// The only fatal outcome of a decode.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("no boxes found: {reason} at {offset:#x}")]
    MalformedTopLevel { offset: u64, reason: &'static str },
}

/// A recoverable condition met while decoding. The tree is still returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Diagnostic {
    #[error("{box_type} at {offset:#x} truncated: declared {declared} bytes, only {adjusted} left")]
    TruncatedBox {
        box_type: String,
        offset: u64,
        declared: u64,
        adjusted: u64,
    },
    #[error("{box_type} at {offset:#x} has zero length, skipping its header")]
    ZeroLengthBox { box_type: String, offset: u64 },
    #[error("{box_type} at {offset:#x} declares {size} bytes, less than its header")]
    InvalidBoxSize {
        box_type: String,
        offset: u64,
        size: u64,
    },
    #[error("{box_type} at {offset:#x}: fields cut short: {error}")]
    OutOfBounds {
        box_type: String,
        offset: u64,
        error: ReadError,
    },
    #[error("descriptor at {offset:#x}: expected tag {expected}, found {found}")]
    DescriptorMismatch { offset: u64, expected: u8, found: u8 },
    #[error("{box_type} at {offset:#x}: unsupported width code {code} for {field}")]
    UnsupportedFieldWidth {
        box_type: String,
        offset: u64,
        field: &'static str,
        code: u8,
    },
    #[error("{box_type} at {offset:#x}: nesting deeper than {max_depth}, children not scanned")]
    DepthLimit {
        box_type: String,
        offset: u64,
        max_depth: usize,
    },
    #[error("parsing ended at {offset:#x} but range ends at {end:#x}")]
    TrailingBytes { offset: u64, end: u64 },
}

/// Ordered sink for diagnostics; every entry is logged as it is recorded.
#[derive(Debug, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn push(&mut self, d: Diagnostic) {
        warn!("{d}");
        self.0.push(d);
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.0
    }
}
