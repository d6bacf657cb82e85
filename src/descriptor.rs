//! MPEG-4 descriptor chain inside `esds`.
//!
//! The chain is walked as ES_Descriptor (tag 3), DecoderConfigDescriptor
//! (tag 4), DecoderSpecificInfo (tag 5). Each descriptor is a tag byte, a
//! variable-length size, and a payload. Only the fixed parts needed to reach
//! the next descriptor are interpreted.

use crate::boxes::{AttrValue, Attributes};
use crate::error::{Diagnostic, ReadError};
use crate::reader::Reader;
use crate::registry::{BoxDecoder, DecodeContext, full_box};

pub const ES_DESCRIPTOR_TAG: u8 = 0x03;
pub const DECODER_CONFIG_TAG: u8 = 0x04;
pub const DECODER_SPECIFIC_INFO_TAG: u8 = 0x05;

/// Reads a descriptor tag and its length. A tag other than `expected` is
/// reported and ends the walk (`Ok(None)`).
fn open_descriptor(
    r: &mut Reader<'_>,
    cx: &mut DecodeContext<'_>,
    expected: u8,
) -> Result<Option<u32>, ReadError> {
    let offset = r.absolute();
    let tag = r.u8()?;
    if tag != expected {
        cx.report(Diagnostic::DescriptorMismatch {
            offset,
            expected,
            found: tag,
        });
        return Ok(None);
    }
    r.descriptor_length().map(Some)
}

pub struct EsdsDecoder;

impl BoxDecoder for EsdsDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;

        if open_descriptor(r, cx, ES_DESCRIPTOR_TAG)?.is_none() {
            return Ok(());
        }
        out.insert("EsId", r.u16()?.into());
        r.skip(1)?; // stream dependence / URL / OCR flags and priority

        if open_descriptor(r, cx, DECODER_CONFIG_TAG)?.is_none() {
            return Ok(());
        }
        out.insert("ObjectTypeIndication", AttrValue::hex(r.u8()?));
        r.skip(1 + 3)?; // stream type, upstream flag, buffer size
        out.insert("MaxBitrate", r.u32()?.into());
        out.insert("AvgBitrate", r.u32()?.into());

        if let Some(len) = open_descriptor(r, cx, DECODER_SPECIFIC_INFO_TAG)? {
            out.insert("DecoderConfig", AttrValue::hex_bytes(r.bytes(len as usize)?));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::FourCC;
    use crate::error::Diagnostics;

    fn esds_body(dsi_tag: u8) -> Vec<u8> {
        let mut body = vec![0, 0, 0, 0];
        body.extend_from_slice(&[ES_DESCRIPTOR_TAG, 0x80, 0x80, 0x80, 0x19]);
        body.extend_from_slice(&[0x00, 0x01, 0x00]);
        body.extend_from_slice(&[DECODER_CONFIG_TAG, 0x11]);
        body.extend_from_slice(&[0x40, 0x15, 0x00, 0x00, 0x00]);
        body.extend_from_slice(&128_000u32.to_be_bytes());
        body.extend_from_slice(&96_000u32.to_be_bytes());
        body.extend_from_slice(&[dsi_tag, 0x02, 0x12, 0x10]);
        body
    }

    fn run(body: &[u8]) -> (Attributes, Result<(), ReadError>, Vec<Diagnostic>) {
        let mut diags = Diagnostics::default();
        let mut out = Attributes::new();
        let res = {
            let mut cx = DecodeContext {
                typ: FourCC(*b"esds"),
                offset: 0,
                diagnostics: &mut diags,
            };
            EsdsDecoder.decode(&mut Reader::new(body, 8), &mut out, &mut cx)
        };
        (out, res, diags.into_inner())
    }

    #[test]
    fn full_chain_yields_decoder_config() {
        let (out, res, diags) = run(&esds_body(DECODER_SPECIFIC_INFO_TAG));
        assert!(res.is_ok());
        assert!(diags.is_empty());
        assert_eq!(out["EsId"], AttrValue::UInt(1));
        assert_eq!(out["ObjectTypeIndication"].as_str(), Some("0x40"));
        assert_eq!(out["MaxBitrate"], AttrValue::UInt(128_000));
        assert_eq!(out["AvgBitrate"], AttrValue::UInt(96_000));
        assert_eq!(out["DecoderConfig"].as_str(), Some("0x1210"));
    }

    #[test]
    fn wrong_tag_stops_the_walk() {
        let (out, res, diags) = run(&esds_body(0x06));
        assert!(res.is_ok());
        assert!(out.get("DecoderConfig").is_none());
        assert_eq!(out["MaxBitrate"], AttrValue::UInt(128_000));
        assert_eq!(
            diags,
            vec![Diagnostic::DescriptorMismatch {
                offset: 8 + 4 + 5 + 3 + 2 + 13,
                expected: DECODER_SPECIFIC_INFO_TAG,
                found: 0x06,
            }]
        );
    }

    #[test]
    fn missing_es_descriptor() {
        let (out, res, diags) = run(&[0, 0, 0, 0, 0x04, 0x00]);
        assert!(res.is_ok());
        assert_eq!(out.len(), 2);
        assert_eq!(diags.len(), 1);
    }
}
