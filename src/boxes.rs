use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn as_str_lossy(&self) -> String {
        self.0
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }

    /// Display name with surrounding whitespace and control bytes removed,
    /// so `"url "` reads as `"url"`.
    pub fn trimmed(&self) -> String {
        let b = &self.0;
        let start = b.iter().position(|&c| c > b' ').unwrap_or(b.len());
        let end = b.iter().rposition(|&c| c > b' ').map_or(start, |p| p + 1);
        b[start..end]
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect()
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl Serialize for FourCC {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

/// Header of one box as it appears on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHeader {
    pub start: u64,       // absolute offset of the first header byte
    pub size: u64,        // declared total size; the 64-bit value when extended
    pub typ: FourCC,
    pub header_size: u64, // 8, or 16 for the extended form
}

/// Decoded field map of one box, in field order.
pub type Attributes = IndexMap<&'static str, AttrValue>;

/// One decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    UInt(u64),
    Int(i64),
    Bool(bool),
    Text(String),
    List(Vec<AttrValue>),
    Object(Attributes),
}

impl AttrValue {
    /// `0x`-prefixed lowercase hex of an integer.
    pub fn hex(v: impl fmt::LowerHex) -> Self {
        AttrValue::Text(format!("{v:#x}"))
    }

    /// `0x`-prefixed lowercase hex of a byte string.
    pub fn hex_bytes(b: &[u8]) -> Self {
        AttrValue::Text(format!("0x{}", hex::encode(b)))
    }

    /// Decimal string, used for times that may need the full 64-bit range.
    pub fn decimal(v: u64) -> Self {
        AttrValue::Text(v.to_string())
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AttrValue::UInt(v) => Some(*v),
            AttrValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Attributes> {
        match self {
            AttrValue::Object(m) => Some(m),
            _ => None,
        }
    }
}

impl From<u8> for AttrValue {
    fn from(v: u8) -> Self {
        AttrValue::UInt(v.into())
    }
}

impl From<u16> for AttrValue {
    fn from(v: u16) -> Self {
        AttrValue::UInt(v.into())
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        AttrValue::UInt(v.into())
    }
}

impl From<u64> for AttrValue {
    fn from(v: u64) -> Self {
        AttrValue::UInt(v)
    }
}

impl From<i16> for AttrValue {
    fn from(v: i16) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(v.into())
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<FourCC> for AttrValue {
    fn from(v: FourCC) -> Self {
        AttrValue::Text(v.as_str_lossy())
    }
}

impl From<Vec<AttrValue>> for AttrValue {
    fn from(v: Vec<AttrValue>) -> Self {
        AttrValue::List(v)
    }
}

impl From<Attributes> for AttrValue {
    fn from(v: Attributes) -> Self {
        AttrValue::Object(v)
    }
}

/// One decoded box. Built once by the scanner and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxNode {
    /// Four-character type, trimmed for display (e.g. `"ftyp"`, `"url"`).
    #[serde(rename = "type")]
    pub typ: String,
    #[serde(skip)]
    pub fourcc: FourCC,
    /// Absolute offset of the header's first byte.
    pub offset: u64,
    /// Total size including the header, clamped if the box was truncated.
    pub size: u64,
    pub header_size: u64,
    pub attributes: Attributes,
    pub children: Vec<BoxNode>,
}

impl BoxNode {
    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    /// Absolute byte range of the body (everything after the header).
    pub fn body_range(&self) -> std::ops::Range<u64> {
        let start = (self.offset + self.header_size).min(self.offset + self.size);
        start..self.offset + self.size
    }
}
