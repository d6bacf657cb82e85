use crate::{
    boxes::BoxNode,
    error::{DecodeError, Diagnostic},
    parser::Scanner,
    util::hex_dump,
};
use serde::Serialize;

/// Knobs for a decode call.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Deepest level whose containers are still scanned for children.
    /// Top-level boxes are at depth 0.
    pub max_depth: usize,
    /// Run field decoders and keep their attributes. When false the tree is
    /// structural only.
    pub decode_fields: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: 64,
            decode_fields: true,
        }
    }
}

/// Result of decoding a buffer.
#[derive(Debug, Clone, Serialize)]
pub struct Tree {
    /// Top-level boxes in file order
    pub boxes: Vec<BoxNode>,
    /// Recoverable conditions, in the order they were met
    pub diagnostics: Vec<Diagnostic>,
    /// Offset where top-level scanning stopped
    pub consumed: u64,
    /// Length of the decoded buffer
    pub len: u64,
}

impl Tree {
    /// True when top-level scanning covered the whole buffer.
    pub fn is_complete(&self) -> bool {
        self.consumed == self.len
    }

    /// Depth-first, pre-order walk yielding each node with its depth.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![(0, self.boxes.iter())],
        }
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Nodes matching a dotted path such as `moov.trak[0].mdia.minf.stbl`.
    ///
    /// The first segment matches top-level boxes, every later one the
    /// children of the previous matches. `[i]` keeps only the i-th match
    /// among each parent's children.
    pub fn select(&self, path: &str) -> Vec<&BoxNode> {
        let mut current: Vec<&BoxNode> = Vec::new();

        for (depth, seg) in path.split('.').enumerate() {
            let (name, idx) = parse_segment(seg);
            let mut next = Vec::new();

            if depth == 0 {
                pick(&self.boxes, name, idx, &mut next);
            } else {
                for b in &current {
                    pick(&b.children, name, idx, &mut next);
                }
            }

            current = next;
            if current.is_empty() {
                break;
            }
        }

        current
    }

    /// Every node whose type is `typ`, in walk order.
    pub fn find_all<'a>(&'a self, typ: &'a str) -> impl Iterator<Item = &'a BoxNode> + 'a {
        self.iter().map(|(_, b)| b).filter(move |b| b.typ == typ)
    }
}

fn pick<'a>(list: &'a [BoxNode], name: &str, idx: Option<usize>, out: &mut Vec<&'a BoxNode>) {
    let mut matches = list.iter().filter(|b| b.typ == name);
    match idx {
        Some(i) => out.extend(matches.nth(i)),
        None => out.extend(matches),
    }
}

fn parse_segment(seg: &str) -> (&str, Option<usize>) {
    if let Some(l) = seg.find('[') {
        let name = &seg[..l];
        if let Some(r) = seg[l + 1..].find(']') {
            let idx = seg[l + 1..l + 1 + r].parse::<usize>().ok();
            return (name, idx);
        }
        (name, None)
    } else {
        (seg, None)
    }
}

/// Depth-first iterator over a [`Tree`].
pub struct Iter<'a> {
    stack: Vec<(usize, std::slice::Iter<'a, BoxNode>)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (usize, &'a BoxNode);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (depth, siblings) = self.stack.last_mut()?;
            let depth = *depth;
            match siblings.next() {
                Some(node) => {
                    if !node.children.is_empty() {
                        self.stack.push((depth + 1, node.children.iter()));
                    }
                    return Some((depth, node));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Decode `buf` into a box tree with default options.
///
/// # Example
/// ```
/// let mut buf = 20u32.to_be_bytes().to_vec();
/// buf.extend_from_slice(b"ftypisom");
/// buf.extend_from_slice(&0x200u32.to_be_bytes());
/// buf.extend_from_slice(b"isom");
///
/// let tree = mp4scope::decode(&buf)?;
/// assert_eq!(tree.boxes[0].typ, "ftyp");
/// assert!(tree.is_complete());
/// # Ok::<(), mp4scope::DecodeError>(())
/// ```
pub fn decode(buf: &[u8]) -> Result<Tree, DecodeError> {
    decode_with(buf, &DecodeOptions::default())
}

/// Decode `buf` into a box tree.
///
/// Fails only when the buffer does not start with a usable box; every other
/// problem is recorded in [`Tree::diagnostics`] and the partial tree is
/// returned.
pub fn decode_with(buf: &[u8], opts: &DecodeOptions) -> Result<Tree, DecodeError> {
    let scanned = Scanner::new(buf, opts).scan()?;
    Ok(Tree {
        boxes: scanned.boxes,
        diagnostics: scanned.diagnostics,
        consumed: scanned.consumed,
        len: buf.len() as u64,
    })
}

/// Result of a hex dump operation containing the formatted hex output.
#[derive(Debug, Serialize)]
pub struct HexDump {
    /// Starting offset of the dumped data
    pub offset: u64,
    /// Number of bytes actually dumped
    pub length: u64,
    /// Formatted hex dump with addresses and ASCII column
    pub hex: String,
}

/// Hex-dump up to `max_len` bytes of `buf` starting at `offset`.
///
/// Never reads past the end of `buf`; the returned length may be smaller
/// than `max_len`.
pub fn hex_range(buf: &[u8], offset: u64, max_len: u64) -> HexDump {
    let available = (buf.len() as u64).saturating_sub(offset);
    let to_read = available.min(max_len);

    if to_read == 0 {
        return HexDump {
            offset,
            length: 0,
            hex: String::new(),
        };
    }

    let start = offset as usize;
    let data = &buf[start..start + to_read as usize];
    HexDump {
        offset,
        length: to_read,
        hex: hex_dump(data, offset),
    }
}
