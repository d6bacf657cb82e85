//! File type, movie/track/media headers and the other `moov`-level boxes.

use crate::boxes::{AttrValue, Attributes};
use crate::error::ReadError;
use crate::reader::Reader;
use crate::registry::{BoxDecoder, DecodeContext, duration_text, full_box};

fn lang_from_u16(code: u16) -> String {
    if code == 0 {
        return "und".to_string();
    }
    let c1 = ((code >> 10) & 0x1F) as u8 + 0x60;
    let c2 = ((code >> 5) & 0x1F) as u8 + 0x60;
    let c3 = (code & 0x1F) as u8 + 0x60;
    format!("{}{}{}", c1 as char, c2 as char, c3 as char)
}

/// creation_time + modification_time, 32- or 64-bit by version.
fn times(r: &mut Reader<'_>, out: &mut Attributes, version: u8) -> Result<(), ReadError> {
    let wide = version == 1;
    out.insert("CreationTime", AttrValue::decimal(r.u32_or_u64(wide)?));
    out.insert("ModificationTime", AttrValue::decimal(r.u32_or_u64(wide)?));
    Ok(())
}

// ftyp / styp: major + minor + compatible brands
pub struct FtypDecoder;

impl BoxDecoder for FtypDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        out.insert("MajorBrand", r.fourcc()?.into());
        out.insert("MinorVersion", AttrValue::hex(r.u32()?));

        let mut brands = Vec::new();
        while r.remaining() >= 4 {
            brands.push(r.fourcc()?.into());
        }
        out.insert("CompatibleBrands", AttrValue::List(brands));
        Ok(())
    }
}

// mvhd: times, timescale, duration, next track id
pub struct MvhdDecoder;

impl BoxDecoder for MvhdDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        times(r, out, version)?;
        let timescale = r.u32()?;
        out.insert("Timescale", timescale.into());
        let duration = r.u32_or_u64(version == 1)?;
        out.insert("Duration", duration_text(duration, timescale));

        // rate, volume, reserved, matrix, pre_defined
        r.skip(4 + 2 + 10 + 36 + 24)?;
        out.insert("NextTrackId", r.u32()?.into());
        Ok(())
    }
}

// tkhd: track id, duration, width, height
pub struct TkhdDecoder;

impl BoxDecoder for TkhdDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        times(r, out, version)?;
        out.insert("TrackId", r.u32()?.into());
        r.skip(4)?; // reserved
        out.insert("Duration", AttrValue::decimal(r.u32_or_u64(version == 1)?));

        // reserved[2], layer, alternate_group, volume, reserved, matrix
        r.skip(8 + 8 + 36)?;

        // 16.16 fixed point, integer part only
        out.insert("Width", (r.u32()? >> 16).into());
        out.insert("Height", (r.u32()? >> 16).into());
        Ok(())
    }
}

// mdhd: times, timescale, duration, language
pub struct MdhdDecoder;

impl BoxDecoder for MdhdDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        times(r, out, version)?;
        let timescale = r.u32()?;
        out.insert("Timescale", timescale.into());
        let duration = r.u32_or_u64(version == 1)?;
        out.insert("Duration", duration_text(duration, timescale));
        out.insert("Language", lang_from_u16(r.u16()?).into());
        Ok(())
    }
}

// hdlr: handler type + name
pub struct HdlrDecoder;

impl BoxDecoder for HdlrDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        r.skip(4)?; // pre_defined
        out.insert("HandlerType", r.fourcc()?.into());
        r.skip(12)?; // reserved
        out.insert("Name", r.rest_as_text()?.into());
        Ok(())
    }
}

pub struct VmhdDecoder;

impl BoxDecoder for VmhdDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        out.insert("GraphicsMode", r.u16()?.into());
        Ok(())
    }
}

pub struct SmhdDecoder;

impl BoxDecoder for SmhdDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        // 8.8 fixed point, signed
        out.insert("Balance", r.i16()?.into());
        Ok(())
    }
}

/// Boxes whose only decoded content is the FullBox header (`sthd`, and
/// `meta`, whose nested boxes follow it).
pub struct FullBoxOnlyDecoder;

impl BoxDecoder for FullBoxOnlyDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out).map(|_| ())
    }
}

pub struct DrefDecoder;

impl BoxDecoder for DrefDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        out.insert("Entries", r.u32()?.into());
        Ok(())
    }
}

// elst: edit list, one entry per edit
pub struct ElstDecoder;

impl BoxDecoder for ElstDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        let entry_count = r.u32()?;

        out.insert("Entries", AttrValue::List(Vec::new()));
        for _ in 0..entry_count {
            let mut entry = Attributes::new();
            if version == 1 {
                entry.insert("SegmentDuration", AttrValue::decimal(r.u64()?));
                entry.insert("MediaTime", r.i64()?.into());
            } else {
                entry.insert("SegmentDuration", r.u32()?.into());
                entry.insert("MediaTime", r.i32()?.into());
            }
            entry.insert("MediaRateInteger", r.i16()?.into());
            entry.insert("MediaRateFraction", r.i16()?.into());
            push_entry(out, "Entries", entry);
        }
        Ok(())
    }
}

/// Append a completed entry to the list attribute `key`, which the caller
/// inserted (empty) before the loop so that entries decoded before a read
/// failure are kept.
pub(crate) fn push_entry(out: &mut Attributes, key: &'static str, entry: Attributes) {
    if let Some(AttrValue::List(list)) = out.get_mut(key) {
        list.push(AttrValue::Object(entry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::FourCC;
    use crate::error::Diagnostics;

    fn run(dec: &dyn BoxDecoder, body: &[u8]) -> (Attributes, Result<(), ReadError>) {
        let mut diags = Diagnostics::default();
        let mut cx = DecodeContext {
            typ: FourCC(*b"test"),
            offset: 0,
            diagnostics: &mut diags,
        };
        let mut out = Attributes::new();
        let res = dec.decode(&mut Reader::new(body, 8), &mut out, &mut cx);
        (out, res)
    }

    #[test]
    fn mdhd_v0_with_language() {
        let mut body = vec![0, 0, 0, 0];
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(&48000u32.to_be_bytes());
        body.extend_from_slice(&96000u32.to_be_bytes());
        // "eng"
        body.extend_from_slice(&0x15c7u16.to_be_bytes());
        body.extend_from_slice(&[0, 0]);

        let (out, res) = run(&MdhdDecoder, &body);
        assert!(res.is_ok());
        assert_eq!(out["CreationTime"].as_str(), Some("1"));
        assert_eq!(out["Timescale"], AttrValue::UInt(48000));
        assert_eq!(out["Duration"].as_str(), Some("96000 (2 sec)"));
        assert_eq!(out["Language"].as_str(), Some("eng"));
    }

    #[test]
    fn mvhd_v1_uses_64_bit_times() {
        let mut body = vec![1, 0, 0, 0];
        body.extend_from_slice(&u64::MAX.to_be_bytes());
        body.extend_from_slice(&3u64.to_be_bytes());
        body.extend_from_slice(&1000u32.to_be_bytes());
        body.extend_from_slice(&5000u64.to_be_bytes());
        body.extend_from_slice(&[0; 76]);
        body.extend_from_slice(&7u32.to_be_bytes());

        let (out, res) = run(&MvhdDecoder, &body);
        assert!(res.is_ok());
        assert_eq!(out["CreationTime"].as_str(), Some("18446744073709551615"));
        assert_eq!(out["Duration"].as_str(), Some("5000 (5 sec)"));
        assert_eq!(out["NextTrackId"], AttrValue::UInt(7));
    }

    #[test]
    fn truncated_tkhd_keeps_leading_fields() {
        let mut body = vec![0, 0, 0, 3];
        body.extend_from_slice(&[0; 8]);
        body.extend_from_slice(&9u32.to_be_bytes());

        let (out, res) = run(&TkhdDecoder, &body);
        assert!(matches!(res, Err(ReadError::OutOfBounds { .. })));
        assert_eq!(out["TrackId"], AttrValue::UInt(9));
        assert!(out.get("Width").is_none());
    }

    #[test]
    fn hdlr_name_strips_nul() {
        let mut body = vec![0; 8];
        body[4..8].copy_from_slice(b"vide");
        let mut full = vec![0, 0, 0, 0];
        full.extend_from_slice(&body);
        full.extend_from_slice(&[0; 12]);
        full.extend_from_slice(b"VideoHandler\0");

        let (out, res) = run(&HdlrDecoder, &full);
        assert!(res.is_ok());
        assert_eq!(out["HandlerType"].as_str(), Some("vide"));
        assert_eq!(out["Name"].as_str(), Some("VideoHandler"));
    }

    #[test]
    fn elst_decodes_every_entry() {
        let mut body = vec![0, 0, 0, 0];
        body.extend_from_slice(&2u32.to_be_bytes());
        for (dur, time) in [(100u32, -1i32), (200, 0)] {
            body.extend_from_slice(&dur.to_be_bytes());
            body.extend_from_slice(&time.to_be_bytes());
            body.extend_from_slice(&1i16.to_be_bytes());
            body.extend_from_slice(&0i16.to_be_bytes());
        }

        let (out, res) = run(&ElstDecoder, &body);
        assert!(res.is_ok());
        let entries = out["Entries"].as_list().unwrap();
        assert_eq!(entries.len(), 2);
        let first = entries[0].as_object().unwrap();
        assert_eq!(first["MediaTime"], AttrValue::Int(-1));
        assert_eq!(first["MediaRateInteger"], AttrValue::Int(1));
    }

    #[test]
    fn tkhd_v1_full_record() {
        let mut body = vec![1, 0, 0, 0x07];
        body.extend_from_slice(&0x1_0000_0001u64.to_be_bytes());
        body.extend_from_slice(&0x1_0000_0002u64.to_be_bytes());
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(&[0; 4]);
        body.extend_from_slice(&90_000u64.to_be_bytes());
        body.extend_from_slice(&[0; 52]);
        body.extend_from_slice(&((1280u32 << 16) | 0x8000).to_be_bytes());
        body.extend_from_slice(&(720u32 << 16).to_be_bytes());

        let (out, res) = run(&TkhdDecoder, &body);
        assert!(res.is_ok());
        assert_eq!(out["Version"], AttrValue::UInt(1));
        assert_eq!(out["CreationTime"].as_str(), Some("4294967297"));
        assert_eq!(out["ModificationTime"].as_str(), Some("4294967298"));
        assert_eq!(out["TrackId"], AttrValue::UInt(2));
        assert_eq!(out["Duration"].as_str(), Some("90000"));
        assert_eq!(out["Width"], AttrValue::UInt(1280));
        assert_eq!(out["Height"], AttrValue::UInt(720));
    }
}
