//! Box scanner: walks a byte range into an ordered list of [`BoxNode`]s.

use crate::api::DecodeOptions;
use crate::boxes::{Attributes, BoxHeader, BoxNode, FourCC};
use crate::error::{DecodeError, Diagnostic, Diagnostics, ReadError};
use crate::known_boxes::KnownBox;
use crate::reader::{Reader, read_u32, read_u64};
use crate::registry::{DecodeContext, FieldDecoder, lookup};
use log::{debug, trace};

const HEADER_SIZE: u64 = 8;
const EXTENDED_HEADER_SIZE: u64 = 16;

/// Reads the box header at absolute `offset`. A 32-bit size of 1 means the
/// real size follows as a 64-bit value.
pub fn read_box_header(buf: &[u8], offset: u64) -> Result<BoxHeader, ReadError> {
    let at = usize::try_from(offset).unwrap_or(usize::MAX);
    let size32 = read_u32(buf, at)?;
    let typ = FourCC(read_u32(buf, at.saturating_add(4))?.to_be_bytes());

    let (size, header_size) = if size32 == 1 {
        (read_u64(buf, at.saturating_add(8))?, EXTENDED_HEADER_SIZE)
    } else {
        (u64::from(size32), HEADER_SIZE)
    };

    Ok(BoxHeader {
        start: offset,
        size,
        typ,
        header_size,
    })
}

/// Scanner state for one decode call.
pub(crate) struct Scanner<'a> {
    buf: &'a [u8],
    opts: &'a DecodeOptions,
    diagnostics: Diagnostics,
}

/// Output of a top-level scan.
pub(crate) struct Scanned {
    pub boxes: Vec<BoxNode>,
    pub diagnostics: Vec<Diagnostic>,
    pub consumed: u64,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(buf: &'a [u8], opts: &'a DecodeOptions) -> Self {
        Self {
            buf,
            opts,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Scans the whole buffer. Fails only when the first box is not usable.
    pub(crate) fn scan(mut self) -> Result<Scanned, DecodeError> {
        let len = self.buf.len() as u64;
        let first = read_box_header(self.buf, 0).map_err(|_| DecodeError::MalformedTopLevel {
            offset: 0,
            reason: "buffer shorter than a box header",
        })?;

        let reason = if first.size == 0 {
            Some("zero-length first box")
        } else if first.size < first.header_size {
            Some("first box smaller than its header")
        } else if first.size > len {
            Some("first box runs past the end of the buffer")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(DecodeError::MalformedTopLevel { offset: 0, reason });
        }

        let (boxes, consumed) = self.scan_range(0, len, 0);
        debug!("scanned {} top-level boxes, {consumed} of {len} bytes", boxes.len());
        Ok(Scanned {
            boxes,
            diagnostics: self.diagnostics.into_inner(),
            consumed,
        })
    }

    /// Scans `[start, end)` into sibling boxes. Returns them with the offset
    /// where scanning stopped.
    fn scan_range(&mut self, start: u64, end: u64, depth: usize) -> (Vec<BoxNode>, u64) {
        let mut nodes = Vec::new();
        let mut pos = start;
        let buf = self.buf;
        let range = &buf[..end as usize];

        while pos < end {
            let Ok(hdr) = read_box_header(range, pos) else {
                break;
            };
            trace!(
                "{:>width$}{} at {:#x}, size {}",
                "",
                hdr.typ,
                hdr.start,
                hdr.size,
                width = depth * 2
            );

            if hdr.size == 0 {
                self.diagnostics.push(Diagnostic::ZeroLengthBox {
                    box_type: hdr.typ.trimmed(),
                    offset: pos,
                });
                nodes.push(empty_node(&hdr));
                pos += hdr.header_size;
                continue;
            }

            if hdr.size < hdr.header_size {
                self.diagnostics.push(Diagnostic::InvalidBoxSize {
                    box_type: hdr.typ.trimmed(),
                    offset: pos,
                    size: hdr.size,
                });
                break;
            }

            let remaining = end - pos;
            let mut size = hdr.size;
            if size > remaining {
                self.diagnostics.push(Diagnostic::TruncatedBox {
                    box_type: hdr.typ.trimmed(),
                    offset: pos,
                    declared: size,
                    adjusted: remaining,
                });
                size = remaining;
            }

            nodes.push(self.build_node(&hdr, size, depth));
            pos += size;
        }

        if pos != end {
            self.diagnostics
                .push(Diagnostic::TrailingBytes { offset: pos, end });
        }
        (nodes, pos)
    }

    fn build_node(&mut self, hdr: &BoxHeader, size: u64, depth: usize) -> BoxNode {
        let kind = KnownBox::from(hdr.typ);
        let class = kind.class();
        let body_start = hdr.start + hdr.header_size;
        let body_end = hdr.start + size;
        let buf = self.buf;
        let body = &buf[body_start as usize..body_end as usize];

        let mut attributes = Attributes::new();
        let mut child_start = body_start;

        if self.opts.decode_fields || class.has_fields() {
            match lookup(kind) {
                FieldDecoder::Registered(dec) => {
                    // Structural-only decodes still need the decoder to find
                    // where the nested boxes start.
                    let mut discarded = Attributes::new();
                    let out = if self.opts.decode_fields {
                        &mut attributes
                    } else {
                        &mut discarded
                    };
                    let mut r = Reader::new(body, body_start);
                    let mut cx = DecodeContext {
                        typ: hdr.typ,
                        offset: hdr.start,
                        diagnostics: &mut self.diagnostics,
                    };
                    match dec.decode(&mut r, out, &mut cx) {
                        Ok(()) => child_start = body_start + r.position() as u64,
                        Err(error) => {
                            cx.report(Diagnostic::OutOfBounds {
                                box_type: hdr.typ.trimmed(),
                                offset: hdr.start,
                                error,
                            });
                            child_start = body_end;
                        }
                    }
                }
                FieldDecoder::Unregistered => {
                    debug!("no field decoder for {} at {:#x}", hdr.typ, hdr.start);
                }
            }
        }

        let mut children = Vec::new();
        if class.has_children() {
            if depth >= self.opts.max_depth {
                self.diagnostics.push(Diagnostic::DepthLimit {
                    box_type: hdr.typ.trimmed(),
                    offset: hdr.start,
                    max_depth: self.opts.max_depth,
                });
            } else {
                children = self.scan_range(child_start, body_end, depth + 1).0;
            }
        }

        BoxNode {
            typ: hdr.typ.trimmed(),
            fourcc: hdr.typ,
            offset: hdr.start,
            size,
            header_size: hdr.header_size,
            attributes,
            children,
        }
    }
}

fn empty_node(hdr: &BoxHeader) -> BoxNode {
    BoxNode {
        typ: hdr.typ.trimmed(),
        fourcc: hdr.typ,
        offset: hdr.start,
        size: 0,
        header_size: hdr.header_size,
        attributes: Attributes::new(),
        children: Vec::new(),
    }
}
